//! Construction-time integrity checks for a form declaration.
//!
//! Catches the programmer errors (a rule pointing at a field that does not
//! exist, two calculators for one field, ...) before any user ever types.
use crate::compute::derived::DerivedField;
use crate::error::SchemaError;
use crate::rules::{Condition, Rule};
use crate::store::registry::FieldSpec;
use crate::store::FieldPath;
use std::collections::HashSet;

/// Checks every reference in the declaration and collects *all* problems.
pub fn validate(fields: &[FieldSpec], rules: &[Rule], derived: &[DerivedField]) -> Result<(), Vec<SchemaError>> {
    let mut errors = Vec::new();

    let mut seen = HashSet::new();
    for spec in fields {
        if !seen.insert(spec.path.clone()) {
            errors.push(SchemaError::DuplicateField(spec.path.to_string()));
        }
        if spec.default.is_some() && spec.path.is_template() {
            errors.push(SchemaError::TemplateDefault(spec.path.to_string()));
        }
    }

    for spec in fields {
        if let Some(cond) = &spec.visible_when {
            check_paths(fields, format!("Visibility of '{}'", spec.path), cond.reads(), &mut errors);
        }
    }

    for (i, rule) in rules.iter().enumerate() {
        check_paths(fields, format!("Rule #{} ({})", i + 1, rule_label(rule)), rule.reads(), &mut errors);
    }

    let mut targets = HashSet::new();
    for field in derived {
        if field.target.is_template() {
            errors.push(SchemaError::TemplateTarget(field.target.to_string()));
        }
        if !targets.insert(field.target.clone()) {
            errors.push(SchemaError::DuplicateDerived(field.target.to_string()));
        }
        check_paths(
            fields,
            format!("Calculator for '{}'", field.target),
            field.depends_on.iter().collect(),
            &mut errors,
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_paths(fields: &[FieldSpec], owner: String, paths: Vec<&FieldPath>, errors: &mut Vec<SchemaError>) {
    for path in paths {
        let template = path.template();
        if !fields.iter().any(|f| f.path == template) {
            errors.push(SchemaError::UnknownField { rule: owner.clone(), path: path.to_string() });
        }
    }
}

fn rule_label(rule: &Rule) -> String {
    use crate::rules::CrossFieldRule as C;
    match rule {
        Rule::Field(r) => format!("check on '{}'", r.path),
        Rule::Cross(C::RequiredWhen { dependent, when, .. }) => {
            format!("'{}' required when {}", dependent, describe(when))
        }
        Rule::Cross(C::DateOrder { end, .. }) => format!("date order of '{}'", end),
        Rule::Cross(C::NotAfterToday { path, .. }) => format!("'{}' not after today", path),
        Rule::Cross(C::NotBeforeToday { path, .. }) => format!("'{}' not before today", path),
        Rule::Cross(C::WithinBalance { amount, .. }) => format!("balance guard on '{}'", amount),
        Rule::Cross(C::Custom(c)) => format!("custom rule '{}'", c.name),
    }
}

fn describe(cond: &Condition) -> String {
    match cond {
        Condition::Equals { path, .. } | Condition::OneOf { path, .. } => format!("'{}' matches", path),
        Condition::IsTrue { path } => format!("'{}' is set", path),
        Condition::NotBlank { path } => format!("'{}' is filled", path),
        Condition::Not { .. } | Condition::All { .. } | Condition::Any { .. } => "a compound condition".into(),
    }
}
