//! Derived fields: values computed from other fields rather than typed by the user.

use super::calendar::{offset_date, weekday_span, IntervalUnit};
use super::money::{remaining_balance, Money};
use crate::clock::Context;
use crate::store::{FieldPath, FormValue, Value};
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

pub type CustomCompute = dyn Fn(&FormValue, &Context) -> Option<Value> + Send + Sync;

#[derive(Clone)]
pub struct CustomCalculator {
    pub name: String,
    pub inputs: Vec<FieldPath>,
    pub compute: Arc<CustomCompute>,
}

impl fmt::Debug for CustomCalculator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomCalculator").field("name", &self.name).field("inputs", &self.inputs).finish()
    }
}

/// How a derived value is produced from the snapshot.
#[derive(Debug, Clone)]
pub enum Calculator {
    /// Leave duration in working days, half-days included.
    WeekdaySpan {
        start: FieldPath,
        end: FieldPath,
        half_start: Option<FieldPath>,
        half_end: Option<FieldPath>,
    },
    /// Provisional date `from + amount × unit`. Without `from` the reference is today.
    DateOffset { from: Option<FieldPath>, amount: FieldPath, unit: FieldPath },
    /// `max(balance - amount, 0)`, formatted to the cent.
    RemainingBalance { balance: FieldPath, amount: FieldPath },
    Custom(CustomCalculator),
}

impl Calculator {
    /// The fields this calculator reads, in a stable order.
    pub fn inputs(&self) -> SmallVec<[FieldPath; 4]> {
        let mut out = SmallVec::new();
        match self {
            Calculator::WeekdaySpan { start, end, half_start, half_end } => {
                out.push(start.clone());
                out.push(end.clone());
                out.extend(half_start.iter().cloned());
                out.extend(half_end.iter().cloned());
            }
            Calculator::DateOffset { from, amount, unit } => {
                out.extend(from.iter().cloned());
                out.push(amount.clone());
                out.push(unit.clone());
            }
            Calculator::RemainingBalance { balance, amount } => {
                out.push(balance.clone());
                out.push(amount.clone());
            }
            Calculator::Custom(c) => out.extend(c.inputs.iter().cloned()),
        }
        out
    }

    /// True when the result depends on the injected date as well as on field values.
    pub fn reads_clock(&self) -> bool {
        matches!(self, Calculator::DateOffset { from: None, .. } | Calculator::Custom(_))
    }

    /// Computes the value, or `None` when the inputs are incomplete
    /// (the target is then left empty rather than showing a stale value).
    pub fn compute(&self, values: &FormValue, ctx: &Context) -> Option<Value> {
        match self {
            Calculator::WeekdaySpan { start, end, half_start, half_end } => {
                let start = values.get(start)?.as_date()?;
                let end = values.get(end)?.as_date()?;
                let flag = |p: &Option<FieldPath>| {
                    p.as_ref().and_then(|p| values.get(p)).and_then(Value::as_bool).unwrap_or(false)
                };
                Some(Value::Number(weekday_span(start, end, flag(half_start), flag(half_end))))
            }
            Calculator::DateOffset { from, amount, unit } => {
                let reference = match from {
                    Some(p) => values.get(p)?.as_date()?,
                    None => ctx.today,
                };
                let n = values.get(amount)?.as_number()?;
                if n.fract() != 0.0 || n.abs() > i64::MAX as f64 {
                    return None;
                }
                let unit: IntervalUnit = values.get(unit)?.as_text()?.parse().ok()?;
                offset_date(reference, n as i64, unit).map(Value::from)
            }
            Calculator::RemainingBalance { balance, amount } => {
                let balance: Money = values.get(balance)?.as_money()?;
                let paid = values.get(amount).and_then(Value::as_money);
                Some(Value::from(remaining_balance(balance, paid)))
            }
            Calculator::Custom(c) => (c.compute)(values, ctx),
        }
    }
}

/// A field whose value is computed from others.
///
/// `overridable` fields accept a manual value from the user (a provisional date
/// the user may then pick by hand); the manual value wins until an explicit
/// recompute. Non-overridable fields are read-only.
#[derive(Debug, Clone)]
pub struct DerivedField {
    pub target: FieldPath,
    pub calculator: Calculator,
    pub overridable: bool,
    pub depends_on: SmallVec<[FieldPath; 4]>,
}

impl DerivedField {
    pub fn new(target: FieldPath, calculator: Calculator) -> Self {
        let depends_on = calculator.inputs();
        Self { target, calculator, overridable: false, depends_on }
    }

    pub fn overridable(mut self) -> Self {
        self.overridable = true;
        self
    }
}
