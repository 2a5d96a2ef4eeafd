//! The back-office forms, declared on the rule engine.
//!
//! Each module exposes `schema()`, which builds (and checks) the declaration.
//! A declaration error here is a bug in this crate, caught by the tests below.
pub mod incident_report;
pub mod leave_request;
pub mod lens_order;
pub mod patient_intake;
pub mod payment_entry;

use crate::error::SchemaError;
use crate::store::{FieldPath, FormSchema};

/// Parses a path literal inside a form declaration.
pub(crate) fn p(s: &str) -> Result<FieldPath, Vec<SchemaError>> {
    FieldPath::parse(s).map_err(|e| vec![e.into()])
}

/// Builds a form by name.
pub fn by_name(name: &str) -> Option<Result<FormSchema, Vec<SchemaError>>> {
    match name {
        leave_request::NAME => Some(leave_request::schema()),
        incident_report::NAME => Some(incident_report::schema()),
        payment_entry::NAME => Some(payment_entry::schema()),
        lens_order::NAME => Some(lens_order::schema()),
        patient_intake::NAME => Some(patient_intake::schema()),
        _ => None,
    }
}

pub const ALL: [&str; 5] = [
    leave_request::NAME,
    incident_report::NAME,
    payment_entry::NAME,
    lens_order::NAME,
    patient_intake::NAME,
];

#[cfg(test)]
pub(crate) mod testing {
    use crate::clock::{Clock, FixedClock};
    use crate::store::FieldPath;
    use chrono::NaiveDate;
    use std::sync::Arc;

    pub fn p(s: &str) -> FieldPath {
        FieldPath::parse(s).unwrap()
    }

    /// Wednesday 2025-01-01.
    pub fn clock() -> Arc<dyn Clock> {
        Arc::new(FixedClock(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()))
    }
}
