//! Staff leave request: date range, half-days, and the computed working-day duration.
use super::p;
use crate::clock::Context;
use crate::compute::{Calculator, DerivedField};
use crate::error::SchemaError;
use crate::rules::{Condition, CrossFieldRule, CustomRule, FieldCheck};
use crate::session::ValidationMode;
use crate::store::{FieldPath, FormSchema, FormValue, Value};
use crate::validation::{Issue, IssueKind};
use std::sync::Arc;

pub const NAME: &str = "leave_request";

pub const LEAVE_TYPES: [&str; 6] = ["Annual", "Sick", "Personal", "Bereavement", "Unpaid", "Other"];

pub fn schema() -> Result<FormSchema, Vec<SchemaError>> {
    let start = p("start_date")?;
    let end = p("end_date")?;
    let duration = p("duration_days")?;

    let no_working_days = {
        let (start, end, duration) = (start.clone(), end.clone(), duration.clone());
        CustomRule {
            name: "working days in range".into(),
            reads: vec![start.clone(), end.clone(), duration.clone()],
            check: Arc::new(move |values: &FormValue, _ctx: &Context| {
                let dates_ok = values.get(&start).and_then(Value::as_date).is_some()
                    && values.get(&end).and_then(Value::as_date).is_some();
                let days = values.get(&duration).and_then(Value::as_number).unwrap_or(0.0);
                if dates_ok && days == 0.0 && !values.is_blank(&end) {
                    vec![Issue::new(end.clone(), IssueKind::Range, "Selected dates contain no working days")]
                } else {
                    Vec::new()
                }
            }),
        }
    };

    FormSchema::builder(NAME)
        .field(p("employee_name")?)
        .field(p("leave_type")?)
        .visible_when(p("leave_type_other")?, Condition::equals(p("leave_type")?, "Other"))
        .field(start.clone())
        .field(end.clone())
        .default_value(p("half_day_start")?, false)
        .default_value(p("half_day_end")?, false)
        .field(p("reason")?)
        .check_with_message(p("employee_name")?, FieldCheck::Required, "Employee name is required")
        .check_with_message(p("leave_type")?, FieldCheck::Required, "Select a leave type")
        .check(p("leave_type")?, FieldCheck::OneOf(LEAVE_TYPES.iter().map(|s| s.to_string()).collect()))
        .rule(CrossFieldRule::required_when(
            Condition::equals(p("leave_type")?, "Other"),
            p("leave_type_other")?,
            "Please specify the leave type",
        ))
        .check_with_message(start.clone(), FieldCheck::Required, "Start date is required")
        .check(start.clone(), FieldCheck::Date)
        .check_with_message(end.clone(), FieldCheck::Required, "End date is required")
        .check(end.clone(), FieldCheck::Date)
        .rule(CrossFieldRule::DateOrder {
            start: start.clone(),
            end: end.clone(),
            message: "End date cannot be before start date".into(),
        })
        .rule(CrossFieldRule::Custom(no_working_days))
        .check(p("reason")?, FieldCheck::MaxLength(500))
        .derived(DerivedField::new(
            duration,
            Calculator::WeekdaySpan {
                start,
                end,
                half_start: Some(p("half_day_start")?),
                half_end: Some(p("half_day_end")?),
            },
        ))
        .mode(ValidationMode::OnTouched)
        .build()
}

/// The path of the computed duration, for the rendering layer.
pub fn duration_path() -> FieldPath {
    FieldPath::key("duration_days")
}
