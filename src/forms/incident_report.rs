//! Clinic incident report with yes/no follow-up details and a provisional follow-up date.
use super::p;
use crate::compute::{Calculator, DerivedField};
use crate::error::SchemaError;
use crate::rules::{Condition, CrossFieldRule, FieldCheck};
use crate::session::{RevalidateMode, ValidationMode};
use crate::store::FormSchema;

pub const NAME: &str = "incident_report";

pub const SEVERITIES: [&str; 4] = ["Minor", "Moderate", "Serious", "Critical"];
pub const INTERVAL_UNITS: [&str; 3] = ["days", "weeks", "months"];

pub fn schema() -> Result<FormSchema, Vec<SchemaError>> {
    let injured = Condition::equals(p("injury_occurred")?, "Yes");
    let treated = Condition::equals(p("treatment_given")?, "Yes");
    let follow_up = Condition::is_true(p("follow_up_required")?);

    FormSchema::builder(NAME)
        .field(p("incident_date")?)
        .field(p("location")?)
        .field(p("severity")?)
        .field(p("description")?)
        .default_value(p("injury_occurred")?, "No")
        .visible_when(p("injury_details")?, injured.clone())
        .default_value(p("treatment_given")?, "No")
        .visible_when(p("treatment_details")?, treated.clone())
        .default_value(p("follow_up_required")?, false)
        .default_value(p("follow_up_interval")?, 2.0)
        .default_value(p("follow_up_unit")?, "weeks")
        .field(p("reported_by")?)
        .field(p("witness_email")?)
        .check_with_message(p("incident_date")?, FieldCheck::Required, "Incident date is required")
        .check(p("incident_date")?, FieldCheck::Date)
        .rule(CrossFieldRule::NotAfterToday {
            path: p("incident_date")?,
            message: "Incident date cannot be in the future".into(),
        })
        .check_with_message(p("location")?, FieldCheck::Required, "Location is required")
        .check(p("severity")?, FieldCheck::OneOf(SEVERITIES.iter().map(|s| s.to_string()).collect()))
        .check_with_message(p("description")?, FieldCheck::Required, "Describe what happened")
        .check_with_message(
            p("description")?,
            FieldCheck::MinLength(10),
            "Description must be at least 10 characters",
        )
        .rule(CrossFieldRule::required_when(
            injured,
            p("injury_details")?,
            "Describe the injury",
        ))
        .rule(CrossFieldRule::required_when(
            treated,
            p("treatment_details")?,
            "Describe the treatment given",
        ))
        .check(p("follow_up_interval")?, FieldCheck::Positive)
        .rule(CrossFieldRule::required_when(
            follow_up.clone(),
            p("follow_up_interval")?,
            "Enter a follow-up interval",
        ))
        .check(p("follow_up_unit")?, FieldCheck::OneOf(INTERVAL_UNITS.iter().map(|s| s.to_string()).collect()))
        .check_with_message(p("reported_by")?, FieldCheck::Required, "Reporter name is required")
        .check(p("witness_email")?, FieldCheck::Email)
        .derived(
            DerivedField::new(
                p("follow_up_date")?,
                Calculator::DateOffset {
                    from: None,
                    amount: p("follow_up_interval")?,
                    unit: p("follow_up_unit")?,
                },
            )
            .overridable(),
        )
        .visible_when(p("follow_up_date")?, follow_up)
        .check(p("follow_up_date")?, FieldCheck::Date)
        .mode(ValidationMode::OnBlur)
        .revalidate_mode(RevalidateMode::OnChange)
        .build()
}
