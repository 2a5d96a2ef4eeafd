//! Front-desk payment entry against a patient's outstanding balance.
use super::p;
use crate::compute::{Calculator, DerivedField};
use crate::error::SchemaError;
use crate::rules::{Condition, CrossFieldRule, FieldCheck};
use crate::session::ValidationMode;
use crate::store::FormSchema;
use regex::Regex;

pub const NAME: &str = "payment_entry";

pub const METHODS: [&str; 5] = ["Cash", "Card", "Insurance", "Bank transfer", "Other"];

pub fn schema() -> Result<FormSchema, Vec<SchemaError>> {
    let invoice = Regex::new(r"^INV-[0-9]{4,}$")
        .map_err(|e| vec![SchemaError::Pattern { path: "invoice_number".into(), reason: e.to_string() }])?;
    let other = Condition::equals(p("method")?, "Other");

    FormSchema::builder(NAME)
        .field(p("patient_name")?)
        .field(p("invoice_number")?)
        .field(p("balance")?)
        .field(p("amount")?)
        .default_value(p("method")?, "Card")
        .visible_when(p("method_other")?, other.clone())
        .field(p("payment_date")?)
        .field(p("reference")?)
        .check_with_message(p("patient_name")?, FieldCheck::Required, "Patient name is required")
        .check_with_message(p("invoice_number")?, FieldCheck::Pattern(invoice), "Invoice numbers look like INV-0001")
        .check_with_message(p("balance")?, FieldCheck::Required, "Outstanding balance is required")
        .check(p("balance")?, FieldCheck::Money)
        .check_with_message(p("amount")?, FieldCheck::Required, "Enter the amount paid")
        .rule(CrossFieldRule::WithinBalance { balance: p("balance")?, amount: p("amount")? })
        .check(p("method")?, FieldCheck::OneOf(METHODS.iter().map(|s| s.to_string()).collect()))
        .rule(CrossFieldRule::required_when(other, p("method_other")?, "Please specify the payment method"))
        .check(p("payment_date")?, FieldCheck::Date)
        .rule(CrossFieldRule::NotAfterToday {
            path: p("payment_date")?,
            message: "Payment date cannot be in the future".into(),
        })
        .check(p("reference")?, FieldCheck::MaxLength(64))
        .derived(DerivedField::new(
            p("remaining_balance")?,
            Calculator::RemainingBalance { balance: p("balance")?, amount: p("amount")? },
        ))
        .mode(ValidationMode::OnChange)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::testing::{clock, p};
    use crate::session::FormSession;
    use crate::store::Value;
    use crate::validation::IssueKind;
    use rstest::rstest;
    use std::sync::Arc;

    fn session() -> FormSession {
        let mut s = FormSession::new(Arc::new(schema().unwrap()), clock());
        s.change(&p("patient_name"), "A. Moreau").unwrap();
        s.change(&p("balance"), "150.00").unwrap();
        s
    }

    #[test]
    fn test_overpayment_flags_amount_and_clamps_remaining() {
        let mut s = session();
        s.change(&p("amount"), "200").unwrap();

        let issues = s.issues_for(&p("amount"));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].message, "Amount exceeds outstanding balance");
        assert_eq!(s.get(&p("remaining_balance")), Some(&Value::text("0.00")));
    }

    #[rstest]
    #[case("abc", Some("Enter a valid amount"))]
    #[case("0", Some("Amount must be greater than zero"))]
    #[case("-5", Some("Amount must be greater than zero"))]
    #[case("150.004", None)]
    #[case("$1,500.00", Some("Amount exceeds outstanding balance"))]
    #[case("49.99", None)]
    fn test_amount_against_balance(#[case] amount: &str, #[case] expected: Option<&str>) {
        let mut s = session();
        s.change(&p("amount"), amount).unwrap();
        let issues = s.issues_for(&p("amount"));
        assert_eq!(issues.first().map(|i| i.message.as_str()), expected);
    }

    #[test]
    fn test_other_method_with_blank_detail_is_exactly_one_issue() {
        let mut s = session();
        s.change(&p("amount"), "50").unwrap();
        s.change(&p("method"), "Other").unwrap();

        let result = s.submit().unwrap_err();
        assert_eq!(result.issues.len(), 1);
        assert_eq!(result.issues[0].field_path, p("method_other"));
        assert_eq!(result.issues[0].kind, IssueKind::ConditionallyRequired);
        assert_eq!(result.issues[0].message, "Please specify the payment method");
    }

    #[test]
    fn test_invoice_pattern_only_checked_when_filled() {
        let mut s = session();
        s.change(&p("amount"), "50").unwrap();
        s.change(&p("invoice_number"), "12345").unwrap();
        assert_eq!(s.issues_for(&p("invoice_number"))[0].message, "Invoice numbers look like INV-0001");

        s.clear(&p("invoice_number")).unwrap();
        let submission = s.submit().unwrap();
        assert_eq!(submission.values.get(&p("remaining_balance")), Some(&Value::text("100.00")));
        assert!(submission.values.get(&p("invoice_number")).is_none());
    }
}
