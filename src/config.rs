//! Declarative form definitions.
//!
//! A form can be described in JSON instead of Rust. The definition is parsed
//! with serde and then goes through the same `FormSchemaBuilder` checks as a
//! form declared in code, so a bad reference fails here and not at first use.
//!
//! ```json
//! {
//!   "name": "payment",
//!   "mode": "on_blur",
//!   "fields": [
//!     { "path": "method", "default": "Card", "checks": [{ "check": "required" }] },
//!     { "path": "method_other", "visible_when": { "when": "equals", "path": "method", "value": "Other" } },
//!     { "path": "balance" },
//!     { "path": "amount", "checks": [{ "check": "required", "message": "Enter the amount paid" }] }
//!   ],
//!   "rules": [
//!     { "rule": "required_when", "if": { "when": "equals", "path": "method", "value": "Other" },
//!       "dependent": "method_other", "message": "Please specify the payment method" },
//!     { "rule": "within_balance", "balance": "balance", "amount": "amount" }
//!   ],
//!   "derived": [
//!     { "target": "remaining", "calculator": "remaining_balance", "balance": "balance", "amount": "amount" }
//!   ]
//! }
//! ```
use crate::compute::calendar::IntervalUnit;
use crate::compute::{Calculator, DerivedField};
use crate::error::ConfigError;
use crate::rules::{Condition, CrossFieldRule, FieldCheck, FieldRule};
use crate::session::{RevalidateMode, ValidationMode};
use crate::store::{FieldPath, FieldSpec, FormSchema, Value};
use log::debug;
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormDefinition {
    pub name: String,
    #[serde(default)]
    pub mode: ValidationMode,
    #[serde(default)]
    pub revalidate_mode: RevalidateMode,
    #[serde(default)]
    pub fields: Vec<FieldDefinition>,
    #[serde(default)]
    pub rules: Vec<RuleDefinition>,
    #[serde(default)]
    pub derived: Vec<DerivedDefinition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub path: FieldPath,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible_when: Option<Condition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub checks: Vec<CheckDefinition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckDefinition {
    #[serde(flatten)]
    pub kind: CheckKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "check", rename_all = "snake_case")]
pub enum CheckKind {
    Required,
    MinLength { length: usize },
    MaxLength { length: usize },
    /// A regular expression, compiled when the schema is built.
    Pattern { pattern: String },
    Email,
    Phone,
    Number,
    Range {
        #[serde(default)]
        min: Option<f64>,
        #[serde(default)]
        max: Option<f64>,
    },
    Positive,
    OneOf { options: Vec<String> },
    Date,
    Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum RuleDefinition {
    RequiredWhen {
        #[serde(rename = "if")]
        condition: Condition,
        dependent: FieldPath,
        #[serde(default)]
        message: Option<String>,
    },
    DateOrder {
        start: FieldPath,
        end: FieldPath,
        #[serde(default)]
        message: Option<String>,
    },
    NotAfterToday {
        path: FieldPath,
        #[serde(default)]
        message: Option<String>,
    },
    NotBeforeToday {
        path: FieldPath,
        #[serde(default)]
        message: Option<String>,
    },
    WithinBalance { balance: FieldPath, amount: FieldPath },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedDefinition {
    pub target: FieldPath,
    #[serde(default)]
    pub overridable: bool,
    #[serde(flatten)]
    pub calculator: CalculatorDefinition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "calculator", rename_all = "snake_case")]
pub enum CalculatorDefinition {
    WeekdaySpan {
        start: FieldPath,
        end: FieldPath,
        #[serde(default)]
        half_start: Option<FieldPath>,
        #[serde(default)]
        half_end: Option<FieldPath>,
    },
    DateOffset {
        #[serde(default)]
        from: Option<FieldPath>,
        amount: FieldPath,
        unit: FieldPath,
        /// Seeds the unit field when the form mounts.
        #[serde(default)]
        default_unit: Option<IntervalUnit>,
    },
    RemainingBalance { balance: FieldPath, amount: FieldPath },
}

impl FormDefinition {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Compiles patterns and runs every construction-time check.
    pub fn into_schema(self) -> Result<FormSchema, ConfigError> {
        let mut builder = FormSchema::builder(self.name.as_str())
            .mode(self.mode)
            .revalidate_mode(self.revalidate_mode);
        let mut checks = Vec::new();

        for field in self.fields {
            for check in field.checks {
                let rule = FieldRule::new(field.path.clone(), compile_check(&field.path, check.kind)?);
                checks.push(match check.message {
                    Some(message) => rule.with_message(message),
                    None => rule,
                });
            }
            builder = builder.field_spec(FieldSpec {
                path: field.path,
                default: field.default,
                visible_when: field.visible_when,
            });
        }
        for check in checks {
            builder = builder.rule(check);
        }

        for rule in self.rules {
            builder = builder.rule(cross_rule(rule));
        }

        for derived in self.derived {
            let calculator = match derived.calculator {
                CalculatorDefinition::WeekdaySpan { start, end, half_start, half_end } => {
                    Calculator::WeekdaySpan { start, end, half_start, half_end }
                }
                CalculatorDefinition::DateOffset { from, amount, unit, default_unit } => {
                    if let Some(default_unit) = default_unit {
                        builder = builder.default_value(unit.clone(), default_unit.to_string());
                    }
                    Calculator::DateOffset { from, amount, unit }
                }
                CalculatorDefinition::RemainingBalance { balance, amount } => {
                    Calculator::RemainingBalance { balance, amount }
                }
            };
            let field = DerivedField::new(derived.target, calculator);
            builder = builder.derived(if derived.overridable { field.overridable() } else { field });
        }

        let schema = builder.build()?;
        debug!("Loaded form '{}' with {} field(s)", schema.name(), schema.fields().len());
        Ok(schema)
    }
}

/// Parses and builds a form definition in one step.
pub fn load_schema(json: &str) -> Result<FormSchema, ConfigError> {
    FormDefinition::from_json(json)?.into_schema()
}

fn compile_check(path: &FieldPath, kind: CheckKind) -> Result<FieldCheck, ConfigError> {
    Ok(match kind {
        CheckKind::Required => FieldCheck::Required,
        CheckKind::MinLength { length } => FieldCheck::MinLength(length),
        CheckKind::MaxLength { length } => FieldCheck::MaxLength(length),
        CheckKind::Pattern { pattern } => FieldCheck::Pattern(
            Regex::new(&pattern).map_err(|source| ConfigError::Pattern { path: path.to_string(), source })?,
        ),
        CheckKind::Email => FieldCheck::Email,
        CheckKind::Phone => FieldCheck::Phone,
        CheckKind::Number => FieldCheck::Number,
        CheckKind::Range { min, max } => FieldCheck::Range { min, max },
        CheckKind::Positive => FieldCheck::Positive,
        CheckKind::OneOf { options } => FieldCheck::OneOf(options),
        CheckKind::Date => FieldCheck::Date,
        CheckKind::Money => FieldCheck::Money,
    })
}

fn cross_rule(rule: RuleDefinition) -> CrossFieldRule {
    match rule {
        RuleDefinition::RequiredWhen { condition, dependent, message } => CrossFieldRule::RequiredWhen {
            when: condition,
            dependent,
            message: message.unwrap_or_else(|| "This field is required".into()),
        },
        RuleDefinition::DateOrder { start, end, message } => CrossFieldRule::DateOrder {
            start,
            end,
            message: message.unwrap_or_else(|| "End date cannot be before start date".into()),
        },
        RuleDefinition::NotAfterToday { path, message } => CrossFieldRule::NotAfterToday {
            path,
            message: message.unwrap_or_else(|| "Date cannot be in the future".into()),
        },
        RuleDefinition::NotBeforeToday { path, message } => CrossFieldRule::NotBeforeToday {
            path,
            message: message.unwrap_or_else(|| "Date cannot be in the past".into()),
        },
        RuleDefinition::WithinBalance { balance, amount } => CrossFieldRule::WithinBalance { balance, amount },
    }
}
