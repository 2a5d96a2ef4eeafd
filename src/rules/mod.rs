//! Validation rules: single-field checks, whole-form checks, and the
//! conditions both of them (and field visibility) are phrased in.

pub mod condition;
pub mod cross;
pub mod field;

pub use condition::Condition;
pub use cross::{CrossFieldRule, CustomRule};
pub use field::{FieldCheck, FieldRule};

use crate::clock::Context;
use crate::store::{FieldPath, FormValue};
use crate::validation::Issue;

/// A declared rule. Rules are stateless and evaluated in declaration order.
#[derive(Debug, Clone)]
pub enum Rule {
    Field(FieldRule),
    Cross(CrossFieldRule),
}

impl Rule {
    /// Every field path the rule reads, in declaration order.
    pub fn reads(&self) -> Vec<&FieldPath> {
        match self {
            Rule::Field(rule) => vec![&rule.path],
            Rule::Cross(rule) => rule.reads(),
        }
    }

    pub fn evaluate(&self, values: &FormValue, ctx: &Context, out: &mut Vec<Issue>) {
        match self {
            Rule::Field(rule) => rule.evaluate(values, out),
            Rule::Cross(rule) => rule.evaluate(values, ctx, out),
        }
    }
}

impl From<FieldRule> for Rule {
    fn from(rule: FieldRule) -> Self {
        Rule::Field(rule)
    }
}

impl From<CrossFieldRule> for Rule {
    fn from(rule: CrossFieldRule) -> Self {
        Rule::Cross(rule)
    }
}
