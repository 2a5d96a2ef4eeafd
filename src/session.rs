//! A live form: the single mutable owner of one form's snapshot.
//!
//! The rendering layer pushes edits in (`change`, `blur`, `clear`), reads
//! issues and visibility back out, and calls `submit` when the user clicks the
//! button. Every pass underneath is the pure derive/validate pair; the session
//! only decides *when* to run them.

use crate::clock::{Clock, Context};
use crate::compute::{DerivedLedger, Deriver};
use crate::error::SessionError;
use crate::store::{FieldPath, FormSchema, FormValue, Value};
use crate::validation::{Issue, ValidationResult};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// When edits trigger validation before the first submit attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationMode {
    /// Only the submit button validates.
    #[default]
    OnSubmit,
    OnBlur,
    OnChange,
    /// First on blur; after a field has been touched, on every change to it.
    OnTouched,
    /// Both blur and change.
    All,
}

/// When edits trigger validation after a submit attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevalidateMode {
    #[default]
    OnChange,
    OnBlur,
    OnSubmit,
}

/// A snapshot that passed validation, handed to the submission collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub form: String,
    pub values: FormValue,
}

impl Submission {
    /// The JSON body the submit handler sends or logs.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.values)
    }

    pub fn from_json(form: impl Into<String>, payload: &str) -> serde_json::Result<Self> {
        Ok(Self { form: form.into(), values: serde_json::from_str(payload)? })
    }
}

pub struct FormSession {
    schema: Arc<FormSchema>,
    clock: Arc<dyn Clock>,
    values: FormValue,
    ledger: DerivedLedger,
    touched: HashSet<FieldPath>,
    /// Fields whose issues are on display. Everything is shown after a submit attempt.
    active: HashSet<FieldPath>,
    submit_count: u32,
    validated: bool,
    result: ValidationResult,
}

impl FormSession {
    /// Mounts a form: seeds defaults and computes derived fields.
    pub fn new(schema: Arc<FormSchema>, clock: Arc<dyn Clock>) -> Self {
        let values = schema.defaults();
        let mut session = Self::mount(schema, clock, values);
        session.derive();
        session
    }

    /// Mounts a form pre-filled with existing values (editing a saved record).
    ///
    /// A saved value on an overridable derived field that differs from what
    /// its inputs give is treated as the user's manual choice.
    pub fn with_values(schema: Arc<FormSchema>, clock: Arc<dyn Clock>, values: FormValue) -> Self {
        let mut session = Self::mount(schema, clock, values);
        let ctx = session.context();
        Deriver::new(&session.schema).adopt(&session.values, &mut session.ledger, &ctx);
        session.derive();
        session
    }

    fn mount(schema: Arc<FormSchema>, clock: Arc<dyn Clock>, values: FormValue) -> Self {
        Self {
            schema,
            clock,
            values,
            ledger: DerivedLedger::new(),
            touched: HashSet::new(),
            active: HashSet::new(),
            submit_count: 0,
            validated: false,
            result: ValidationResult::clean(),
        }
    }

    pub fn schema(&self) -> &FormSchema {
        &self.schema
    }

    pub fn values(&self) -> &FormValue {
        &self.values
    }

    pub fn get(&self, path: &FieldPath) -> Option<&Value> {
        self.values.get(path)
    }

    /// The full result of the last validation pass.
    pub fn result(&self) -> &ValidationResult {
        &self.result
    }

    /// Issues the rendering layer should currently show, in rule order.
    pub fn visible_issues(&self) -> Vec<&Issue> {
        self.result
            .issues
            .iter()
            .filter(|i| self.submit_count > 0 || self.active.contains(&i.field_path))
            .collect()
    }

    pub fn issues_for(&self, path: &FieldPath) -> Vec<&Issue> {
        self.visible_issues().into_iter().filter(|i| &i.field_path == path).collect()
    }

    pub fn is_visible(&self, path: &FieldPath) -> bool {
        self.schema.is_visible(path, &self.values)
    }

    pub fn is_touched(&self, path: &FieldPath) -> bool {
        self.touched.contains(path)
    }

    pub fn is_overridden(&self, path: &FieldPath) -> bool {
        self.ledger.is_overridden(path)
    }

    pub fn submit_count(&self) -> u32 {
        self.submit_count
    }

    /// The user typed, picked or toggled a value.
    pub fn change(&mut self, path: &FieldPath, value: impl Into<Value>) -> Result<&ValidationResult, SessionError> {
        self.edit(path, Some(value.into()))
    }

    /// The user emptied a field. It becomes absent, not an empty string.
    pub fn clear(&mut self, path: &FieldPath) -> Result<&ValidationResult, SessionError> {
        self.edit(path, None)
    }

    /// The user left a field.
    pub fn blur(&mut self, path: &FieldPath) -> Result<&ValidationResult, SessionError> {
        self.ensure_declared(path)?;
        self.touched.insert(path.clone());

        let triggers = if self.submit_count > 0 {
            self.schema.revalidate_mode() == RevalidateMode::OnBlur
        } else {
            matches!(
                self.schema.mode(),
                ValidationMode::OnBlur | ValidationMode::OnTouched | ValidationMode::All
            )
        };
        if triggers {
            self.active.insert(path.clone());
            self.run_validation();
        }
        Ok(&self.result)
    }

    /// Drops a manual override on a derived field and recomputes it.
    pub fn recompute(&mut self, target: &FieldPath) -> Result<&ValidationResult, SessionError> {
        if self.schema.derived_field(target).is_none() {
            return Err(SessionError::NotDerived(target.to_string()));
        }
        let ctx = self.context();
        Deriver::new(&self.schema).recompute(target, &mut self.values, &mut self.ledger, &ctx);
        if self.validated {
            self.run_validation();
        }
        Ok(&self.result)
    }

    /// Validates everything now and shows every issue (an explicit "check form" action).
    pub fn trigger(&mut self) -> &ValidationResult {
        self.run_validation();
        self.active.extend(self.result.issues.iter().map(|i| i.field_path.clone()));
        &self.result
    }

    /// Validates the whole form. On success hands back the snapshot and resets
    /// the form to its defaults; on failure every issue is put on display.
    pub fn submit(&mut self) -> Result<Submission, ValidationResult> {
        self.submit_count += 1;
        self.run_validation();

        if !self.result.valid {
            debug!("{}: submit blocked by {} issue(s)", self.schema.name(), self.result.issues.len());
            return Err(self.result.clone());
        }

        let submission = Submission { form: self.schema.name().to_string(), values: self.values.clone() };
        info!("{}: submitted {} field(s)", self.schema.name(), submission.values.len());
        self.reset();
        Ok(submission)
    }

    /// Back to defaults with no touched, override or submit state.
    pub fn reset(&mut self) {
        self.values = self.schema.defaults();
        self.ledger.clear();
        self.touched.clear();
        self.active.clear();
        self.submit_count = 0;
        self.validated = false;
        self.result = ValidationResult::clean();
        self.derive();
    }

    fn edit(&mut self, path: &FieldPath, value: Option<Value>) -> Result<&ValidationResult, SessionError> {
        self.ensure_declared(path)?;
        if let Some(derived) = self.schema.derived_field(path) {
            if !derived.overridable {
                return Err(SessionError::ReadOnly(path.to_string()));
            }
        }

        match value {
            Some(v) => {
                self.values.set(path, v)?;
            }
            None => {
                self.values.remove(path);
            }
        }
        if self.schema.derived_field(path).is_some() {
            self.ledger.mark_overridden(path);
        }
        self.derive();

        let triggers = if self.submit_count > 0 {
            self.schema.revalidate_mode() == RevalidateMode::OnChange
        } else {
            match self.schema.mode() {
                ValidationMode::OnChange | ValidationMode::All => true,
                ValidationMode::OnTouched => self.touched.contains(path),
                ValidationMode::OnBlur | ValidationMode::OnSubmit => false,
            }
        };

        if triggers {
            self.active.insert(path.clone());
            self.run_validation();
        } else if self.validated && self.schema.is_governing(path) {
            // A governing field changed: refresh so a conditional issue whose
            // condition no longer holds disappears straight away.
            self.run_validation();
        }
        Ok(&self.result)
    }

    fn ensure_declared(&self, path: &FieldPath) -> Result<(), SessionError> {
        if self.schema.is_declared(path) {
            Ok(())
        } else {
            Err(SessionError::UnknownField(path.to_string()))
        }
    }

    fn context(&self) -> Context {
        Context::from_clock(self.clock.as_ref())
    }

    fn derive(&mut self) {
        let ctx = self.context();
        Deriver::new(&self.schema).derive(&mut self.values, &mut self.ledger, &ctx);
    }

    fn run_validation(&mut self) {
        let ctx = self.context();
        self.result = self.schema.validate(&self.values, &ctx);
        self.validated = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::compute::derived::{Calculator, DerivedField};
    use crate::rules::{Condition, CrossFieldRule, FieldCheck};
    use chrono::NaiveDate;

    fn p(s: &str) -> FieldPath {
        FieldPath::parse(s).unwrap()
    }

    fn clock() -> Arc<dyn Clock> {
        Arc::new(FixedClock(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()))
    }

    fn payment_schema(mode: ValidationMode) -> Arc<FormSchema> {
        payment_schema_with(mode, RevalidateMode::default())
    }

    fn payment_schema_with(mode: ValidationMode, revalidate: RevalidateMode) -> Arc<FormSchema> {
        Arc::new(
            FormSchema::builder("payment")
                .default_value(p("balance"), "150.00")
                .default_value(p("method"), "Card")
                .field(p("amount"))
                .field(p("notes"))
                .visible_when(p("method_other"), Condition::equals(p("method"), "Other"))
                .check(p("amount"), FieldCheck::Required)
                .rule(CrossFieldRule::required_when(
                    Condition::equals(p("method"), "Other"),
                    p("method_other"),
                    "Please specify the payment method",
                ))
                .rule(CrossFieldRule::WithinBalance { balance: p("balance"), amount: p("amount") })
                .derived(DerivedField::new(
                    p("remaining"),
                    Calculator::RemainingBalance { balance: p("balance"), amount: p("amount") },
                ))
                .mode(mode)
                .revalidate_mode(revalidate)
                .build()
                .unwrap(),
        )
    }

    fn shown(session: &FormSession) -> Vec<String> {
        session.visible_issues().iter().map(|i| i.field_path.to_string()).collect()
    }

    #[test]
    fn test_mount_seeds_defaults_and_derived_values() {
        let session = FormSession::new(payment_schema(ValidationMode::OnSubmit), clock());
        assert_eq!(session.get(&p("method")), Some(&Value::text("Card")));
        assert_eq!(session.get(&p("remaining")), Some(&Value::text("150.00")));
        assert!(session.get(&p("notes")).is_none());
        assert!(session.result().valid);
    }

    #[test]
    fn test_on_submit_mode_waits_for_submit() {
        let mut session = FormSession::new(payment_schema(ValidationMode::OnSubmit), clock());
        session.change(&p("amount"), "200.00").unwrap();
        session.blur(&p("amount")).unwrap();
        assert!(session.visible_issues().is_empty());
        assert_eq!(session.get(&p("remaining")), Some(&Value::text("0.00")));

        let result = session.submit().unwrap_err();
        assert_eq!(result.issues.len(), 1);
        assert_eq!(session.issues_for(&p("amount"))[0].message, "Amount exceeds outstanding balance");

        // After a failed submit, changes revalidate immediately.
        session.change(&p("amount"), "100.00").unwrap();
        assert!(session.visible_issues().is_empty());
    }

    #[test]
    fn test_on_blur_mode_shows_only_blurred_fields() {
        let mut session = FormSession::new(payment_schema(ValidationMode::OnBlur), clock());
        session.change(&p("method"), "Other").unwrap();
        assert!(session.visible_issues().is_empty());

        session.blur(&p("amount")).unwrap();
        let shown: Vec<String> = session.visible_issues().iter().map(|i| i.field_path.to_string()).collect();
        assert_eq!(shown, vec!["amount"]);
        // The specify box is invalid too, but it has not been visited yet.
        assert_eq!(session.result().issues.len(), 2);
    }

    #[test]
    fn test_governing_change_clears_conditional_issue_without_blur() {
        let mut session = FormSession::new(payment_schema(ValidationMode::OnBlur), clock());
        session.change(&p("method"), "Other").unwrap();
        session.blur(&p("method_other")).unwrap();
        assert_eq!(session.issues_for(&p("method_other")).len(), 1);

        // Switching the method back, with no blur, drops the stale issue.
        session.change(&p("method"), "Cash").unwrap();
        assert!(session.issues_for(&p("method_other")).is_empty());
        assert!(!session.is_visible(&p("method_other")));
    }

    #[test]
    fn test_on_touched_mode() {
        let mut session = FormSession::new(payment_schema(ValidationMode::OnTouched), clock());
        session.change(&p("amount"), "0").unwrap();
        assert!(session.visible_issues().is_empty());

        session.blur(&p("amount")).unwrap();
        assert_eq!(session.issues_for(&p("amount"))[0].message, "Amount must be greater than zero");

        session.change(&p("amount"), "25").unwrap();
        assert!(session.issues_for(&p("amount")).is_empty());
    }

    #[test]
    fn test_derived_field_without_override_is_read_only() {
        let mut session = FormSession::new(payment_schema(ValidationMode::OnChange), clock());
        assert_eq!(
            session.change(&p("remaining"), "1.00").unwrap_err(),
            SessionError::ReadOnly("remaining".into())
        );
        assert_eq!(
            session.change(&p("nope"), "1").unwrap_err(),
            SessionError::UnknownField("nope".into())
        );
        assert_eq!(session.recompute(&p("amount")).unwrap_err(), SessionError::NotDerived("amount".into()));
    }

    #[test]
    fn test_successful_submit_resets_to_defaults() {
        let mut session = FormSession::new(payment_schema(ValidationMode::OnChange), clock());
        session.change(&p("amount"), "50").unwrap();
        session.change(&p("notes"), "Paid at front desk").unwrap();

        let submission = session.submit().unwrap();
        assert_eq!(submission.form, "payment");
        assert_eq!(submission.values.get(&p("remaining")), Some(&Value::text("100.00")));

        // Round-trip through the payload keeps every field, and absent ones stay absent.
        let back = Submission::from_json("payment", &submission.to_json().unwrap()).unwrap();
        assert_eq!(back, submission);
        assert!(back.values.get(&p("method_other")).is_none());

        assert!(session.get(&p("amount")).is_none());
        assert_eq!(session.submit_count(), 0);
    }

    #[test]
    fn test_clear_makes_field_absent() {
        let mut session = FormSession::new(payment_schema(ValidationMode::OnChange), clock());
        session.change(&p("notes"), "x").unwrap();
        session.clear(&p("notes")).unwrap();
        assert!(session.get(&p("notes")).is_none());
        assert!(!session.submit().unwrap_err().issues.is_empty());
    }

    #[test]
    fn test_overridable_follow_up_date() {
        let schema = Arc::new(
            FormSchema::builder("follow_up")
                .default_value(p("interval"), 2.0)
                .default_value(p("unit"), "weeks")
                .derived(
                    DerivedField::new(
                        p("follow_up_date"),
                        Calculator::DateOffset { from: None, amount: p("interval"), unit: p("unit") },
                    )
                    .overridable(),
                )
                .build()
                .unwrap(),
        );
        let mut session = FormSession::new(schema, clock());
        assert_eq!(session.get(&p("follow_up_date")), Some(&Value::text("2025-01-15")));

        session.change(&p("follow_up_date"), "2025-01-17").unwrap();
        session.change(&p("unit"), "months").unwrap();
        assert!(session.is_overridden(&p("follow_up_date")));
        assert_eq!(session.get(&p("follow_up_date")), Some(&Value::text("2025-01-17")));

        session.recompute(&p("follow_up_date")).unwrap();
        assert_eq!(session.get(&p("follow_up_date")), Some(&Value::text("2025-03-01")));

        session.reset();
        assert_eq!(session.get(&p("follow_up_date")), Some(&Value::text("2025-01-15")));
        assert!(!session.is_overridden(&p("follow_up_date")));
    }

    #[test]
    fn test_with_values_derives_from_the_saved_record() {
        let saved = FormValue::new()
            .with("balance", "150.00")
            .with("method", "Card")
            .with("amount", "40")
            .with("remaining", "999.00");
        let mut session = FormSession::with_values(payment_schema(ValidationMode::OnChange), clock(), saved);

        // A read-only derived value is always recalculated.
        assert_eq!(session.get(&p("remaining")), Some(&Value::text("110.00")));
        assert!(session.visible_issues().is_empty());
        assert!(session.submit().is_ok());
    }

    #[test]
    fn test_trigger_shows_every_issue_before_submit() {
        let mut session = FormSession::new(payment_schema(ValidationMode::OnSubmit), clock());
        session.change(&p("method"), "Other").unwrap();
        assert!(session.visible_issues().is_empty());

        assert!(!session.trigger().valid);
        assert_eq!(shown(&session), vec!["amount", "method_other"]);
        assert_eq!(session.submit_count(), 0);

        session.change(&p("method"), "Cash").unwrap();
        assert_eq!(shown(&session), vec!["amount"]);
    }

    #[test]
    fn test_all_mode_validates_on_change_and_blur() {
        let mut session = FormSession::new(payment_schema(ValidationMode::All), clock());
        session.change(&p("amount"), "200").unwrap();
        assert_eq!(session.issues_for(&p("amount"))[0].message, "Amount exceeds outstanding balance");

        session.change(&p("method"), "Other").unwrap();
        assert!(session.issues_for(&p("method_other")).is_empty());
        session.blur(&p("method_other")).unwrap();
        assert_eq!(shown(&session), vec!["method_other", "amount"]);
    }

    #[test]
    fn test_revalidate_on_submit_keeps_issues_until_next_submit() {
        let mut session =
            FormSession::new(payment_schema_with(ValidationMode::OnChange, RevalidateMode::OnSubmit), clock());
        session.change(&p("amount"), "200").unwrap();
        assert!(session.submit().is_err());

        session.change(&p("amount"), "100").unwrap();
        session.blur(&p("amount")).unwrap();
        assert_eq!(session.issues_for(&p("amount"))[0].message, "Amount exceeds outstanding balance");

        assert!(session.submit().is_ok());
    }

    #[test]
    fn test_revalidate_on_blur_after_failed_submit() {
        let mut session =
            FormSession::new(payment_schema_with(ValidationMode::OnSubmit, RevalidateMode::OnBlur), clock());
        session.change(&p("amount"), "200").unwrap();
        assert_eq!(session.submit().unwrap_err().issues.len(), 1);

        session.change(&p("amount"), "100").unwrap();
        assert_eq!(session.issues_for(&p("amount")).len(), 1);

        session.blur(&p("amount")).unwrap();
        assert!(session.visible_issues().is_empty());
    }
}
