//! The central validator that runs every declared rule against a snapshot.
use super::issue::{Issue, ValidationResult};
use crate::clock::Context;
use crate::rules::Rule;
use crate::store::{FormSchema, FormValue};
use log::debug;

/// Runs rules in declaration order and collects every issue.
///
/// Like a linter, it never stops at the first problem: the rendering layer
/// shows all of them at once, in the order the rules were declared.
pub struct Validator<'a> {
    rules: &'a [Rule],
    visibility: Option<&'a FormSchema>,
}

impl<'a> Validator<'a> {
    pub fn new(rules: &'a [Rule]) -> Self {
        Self { rules, visibility: None }
    }

    /// Drops issues on fields the schema currently hides, so a field is never
    /// reported invalid while the user cannot see it.
    pub fn with_visibility(mut self, schema: &'a FormSchema) -> Self {
        self.visibility = Some(schema);
        self
    }

    pub fn validate(&self, values: &FormValue, ctx: &Context) -> ValidationResult {
        let mut issues: Vec<Issue> = Vec::new();
        for rule in self.rules {
            rule.evaluate(values, ctx, &mut issues);
        }

        if let Some(schema) = self.visibility {
            issues.retain(|issue| schema.is_visible(&issue.field_path, values));
        }

        debug!("Validation pass: {} rule(s), {} issue(s)", self.rules.len(), issues.len());
        ValidationResult::from_issues(issues)
    }
}

/// Validates `values` against `rules` with no visibility filtering.
pub fn validate(values: &FormValue, rules: &[Rule], ctx: &Context) -> ValidationResult {
    Validator::new(rules).validate(values, ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{Condition, CrossFieldRule, FieldCheck, FieldRule};
    use crate::store::FieldPath;
    use chrono::NaiveDate;

    fn p(s: &str) -> FieldPath {
        FieldPath::parse(s).unwrap()
    }

    fn ctx() -> Context {
        Context::new(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap())
    }

    fn payment_rules() -> Vec<Rule> {
        vec![
            FieldRule::new(p("method"), FieldCheck::Required).into(),
            CrossFieldRule::required_when(
                Condition::equals(p("method"), "Other"),
                p("method_other"),
                "Please specify the payment method",
            )
            .into(),
            CrossFieldRule::WithinBalance { balance: p("balance"), amount: p("amount") }.into(),
            FieldRule::new(p("amount"), FieldCheck::Required).into(),
        ]
    }

    #[test]
    fn test_issues_follow_rule_declaration_order() {
        let form = FormValue::new()
            .with("method", "Other")
            .with("balance", "150.00")
            .with("amount", "200.00");
        let result = validate(&form, &payment_rules(), &ctx());

        assert!(!result.valid);
        let fields: Vec<String> = result.issues.iter().map(|i| i.field_path.to_string()).collect();
        assert_eq!(fields, vec!["method_other", "amount"]);
        assert_eq!(result.issues[1].message, "Amount exceeds outstanding balance");
    }

    #[test]
    fn test_validate_is_deterministic() {
        let form = FormValue::new().with("method", "Other").with("amount", "abc");
        let rules = payment_rules();
        assert_eq!(validate(&form, &rules, &ctx()), validate(&form, &rules, &ctx()));
    }

    #[test]
    fn test_filling_specify_field_removes_only_that_issue() {
        let rules = payment_rules();
        let mut form = FormValue::new().with("method", "Other").with("balance", "150.00");
        let before = validate(&form, &rules, &ctx());
        assert_eq!(before.issues.len(), 2); // method_other + amount required

        form.set(&p("method_other"), "Gift voucher".into()).unwrap();
        let after = validate(&form, &rules, &ctx());
        assert_eq!(after.issues.len(), 1);
        assert_eq!(after.issues[0].field_path, p("amount"));
    }

    #[test]
    fn test_hidden_fields_are_not_reported() {
        let schema = FormSchema::builder("payment")
            .field(p("method"))
            .visible_when(p("method_other"), Condition::equals(p("method"), "Other"))
            .check(p("method_other"), FieldCheck::MinLength(3))
            .build()
            .unwrap();

        // A leftover short value in a box that is no longer shown.
        let hidden = FormValue::new().with("method", "Card").with("method_other", "x");
        assert!(schema.validate(&hidden, &ctx()).valid);
        let shown = hidden.clone().with("method", "Other");
        assert!(!schema.validate(&shown, &ctx()).valid);
    }
}
