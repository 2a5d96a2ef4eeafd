use super::check_payload;
use crate::clock::{Clock, FixedClock, SystemClock};
use crate::compute::calendar::{self, IntervalUnit};
use crate::compute::money::{self, Money};
use crate::config;
use crate::display::format_report;
use crate::forms;
use crate::session::FormSession;
use crate::store::{FieldPath, Value, DATE_FORMAT};
use chrono::NaiveDate;
use pyo3::exceptions::{PyKeyError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use std::sync::Arc;

fn parse_date(s: &str) -> PyResult<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
        .map_err(|e| PyValueError::new_err(format!("Invalid date '{}': {}", s, e)))
}

fn parse_path(s: &str) -> PyResult<FieldPath> {
    FieldPath::parse(s).map_err(|e| PyValueError::new_err(e.to_string()))
}

fn to_json<T: serde::Serialize>(value: &T) -> PyResult<String> {
    serde_json::to_string(value).map_err(|e| PyRuntimeError::new_err(e.to_string()))
}

fn clock_for(today: Option<&str>) -> PyResult<Arc<dyn Clock>> {
    Ok(match today {
        Some(t) => Arc::new(FixedClock(parse_date(t)?)),
        None => Arc::new(SystemClock),
    })
}

/// Working days between two ISO dates, inclusive, with optional half days.
#[pyfunction]
#[pyo3(signature = (start, end, half_start=false, half_end=false))]
fn weekday_span(start: &str, end: &str, half_start: bool, half_end: bool) -> PyResult<f64> {
    Ok(calendar::weekday_span(parse_date(start)?, parse_date(end)?, half_start, half_end))
}

/// `today + amount × unit` as an ISO date.
#[pyfunction]
#[pyo3(signature = (amount, unit, today=None))]
fn provisional_date(amount: i64, unit: &str, today: Option<&str>) -> PyResult<String> {
    let unit: IntervalUnit = unit.parse().map_err(PyValueError::new_err)?;
    let reference = clock_for(today)?.today();
    calendar::offset_date(reference, amount, unit)
        .map(|d| d.format(DATE_FORMAT).to_string())
        .ok_or_else(|| PyValueError::new_err("Date out of range"))
}

#[pyfunction]
#[pyo3(signature = (balance, amount=None))]
fn remaining_balance(balance: &str, amount: Option<&str>) -> PyResult<String> {
    let balance = Money::parse(balance).map_err(|e| PyValueError::new_err(e.to_string()))?;
    let paid = amount.and_then(|a| Money::parse(a).ok());
    Ok(money::remaining_balance(balance, paid).to_string())
}

/// Validates a JSON payload against a JSON form definition. Returns the result as JSON.
#[pyfunction]
fn validate_json(definition: &str, values: &str, today: &str) -> PyResult<String> {
    let schema = config::load_schema(definition).map_err(|e| PyValueError::new_err(e.to_string()))?;
    let (_, result) = check_payload(&schema, values, parse_date(today)?)
        .map_err(|e| PyValueError::new_err(e.to_string()))?;
    to_json(&result)
}

/// A live built-in form, driven from Python one event at a time.
#[pyclass(name = "_FormSession")]
pub struct PyFormSession {
    inner: FormSession,
}

#[pymethods]
impl PyFormSession {
    #[new]
    #[pyo3(signature = (form, today=None))]
    pub fn new(form: &str, today: Option<&str>) -> PyResult<Self> {
        let schema = forms::by_name(form)
            .ok_or_else(|| PyKeyError::new_err(format!("Unknown form '{}'", form)))?
            .map_err(|errs| {
                let msg = errs.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("\n");
                PyRuntimeError::new_err(msg)
            })?;
        Ok(Self { inner: FormSession::new(Arc::new(schema), clock_for(today)?) })
    }

    /// Sets a field from a JSON-encoded value (`"\"Other\""`, `"true"`, `"2"`).
    pub fn change(&mut self, path: &str, value: &str) -> PyResult<()> {
        let value: Value = serde_json::from_str(value).map_err(|e| PyValueError::new_err(e.to_string()))?;
        self.inner
            .change(&parse_path(path)?, value)
            .map(|_| ())
            .map_err(|e| PyValueError::new_err(e.to_string()))
    }

    pub fn clear(&mut self, path: &str) -> PyResult<()> {
        self.inner.clear(&parse_path(path)?).map(|_| ()).map_err(|e| PyValueError::new_err(e.to_string()))
    }

    pub fn blur(&mut self, path: &str) -> PyResult<()> {
        self.inner.blur(&parse_path(path)?).map(|_| ()).map_err(|e| PyValueError::new_err(e.to_string()))
    }

    pub fn recompute(&mut self, path: &str) -> PyResult<()> {
        self.inner.recompute(&parse_path(path)?).map(|_| ()).map_err(|e| PyValueError::new_err(e.to_string()))
    }

    pub fn is_visible(&self, path: &str) -> PyResult<bool> {
        Ok(self.inner.is_visible(&parse_path(path)?))
    }

    /// Currently displayed issues as a JSON list.
    pub fn issues_json(&self) -> PyResult<String> {
        to_json(&self.inner.visible_issues())
    }

    pub fn values_json(&self) -> PyResult<String> {
        to_json(self.inner.values())
    }

    /// Returns `(True, payload)` on success or `(False, issues)` as JSON.
    pub fn submit(&mut self) -> PyResult<(bool, String)> {
        match self.inner.submit() {
            Ok(submission) => Ok((true, submission.to_json().map_err(|e| PyRuntimeError::new_err(e.to_string()))?)),
            Err(result) => Ok((false, to_json(&result.issues)?)),
        }
    }

    pub fn report(&self) -> String {
        format_report(self.inner.schema(), self.inner.values(), self.inner.result())
    }
}

/// Defines the `optic_forms._core` Python module.
#[pymodule]
fn _core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(weekday_span, m)?)?;
    m.add_function(wrap_pyfunction!(provisional_date, m)?)?;
    m.add_function(wrap_pyfunction!(remaining_balance, m)?)?;
    m.add_function(wrap_pyfunction!(validate_json, m)?)?;
    m.add_class::<PyFormSession>()?;
    Ok(())
}
