//! Entry points for host languages.
//!
//! The helpers here take and return JSON text so any host can call them; the
//! pyo3 module that wraps them is only built with the `python` feature.
#[cfg(feature = "python")]
pub mod python;

use crate::clock::Context;
use crate::compute::{DerivedLedger, Deriver};
use crate::store::{FormSchema, FormValue};
use crate::validation::ValidationResult;
use chrono::NaiveDate;

/// Derives and validates a submitted payload in one stateless pass.
///
/// Returns the snapshot with calculated fields filled in, and the result.
/// A hand-picked value on an overridable derived field is kept as sent.
pub fn check_payload(
    schema: &FormSchema,
    payload: &str,
    today: NaiveDate,
) -> Result<(FormValue, ValidationResult), serde_json::Error> {
    let mut values: FormValue = serde_json::from_str(payload)?;
    let ctx = Context::new(today);
    let deriver = Deriver::new(schema);
    let mut ledger = DerivedLedger::new();
    deriver.adopt(&values, &mut ledger, &ctx);
    deriver.derive(&mut values, &mut ledger, &ctx);
    let result = schema.validate(&values, &ctx);
    Ok((values, result))
}
