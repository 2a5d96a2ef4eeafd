//! Predicates over a form snapshot.
//!
//! The same `Condition` drives both "is this field shown?" and "is this field
//! required right now?", so visibility and validation read one source of truth.

use crate::store::{FieldPath, FormValue, Value};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "when", rename_all = "snake_case")]
pub enum Condition {
    /// The field currently holds `value`.
    Equals { path: FieldPath, value: Value },
    /// The field currently holds any of `values`.
    OneOf { path: FieldPath, values: Vec<Value> },
    /// A checkbox or yes/no radio is set.
    IsTrue { path: FieldPath },
    NotBlank { path: FieldPath },
    Not { condition: Box<Condition> },
    All { conditions: Vec<Condition> },
    Any { conditions: Vec<Condition> },
}

impl Condition {
    pub fn equals(path: FieldPath, value: impl Into<Value>) -> Self {
        Condition::Equals { path, value: value.into() }
    }

    pub fn one_of<V: Into<Value>>(path: FieldPath, values: impl IntoIterator<Item = V>) -> Self {
        Condition::OneOf { path, values: values.into_iter().map(Into::into).collect() }
    }

    pub fn is_true(path: FieldPath) -> Self {
        Condition::IsTrue { path }
    }

    pub fn not_blank(path: FieldPath) -> Self {
        Condition::NotBlank { path }
    }

    pub fn negate(self) -> Self {
        Condition::Not { condition: Box::new(self) }
    }

    /// Evaluates against a snapshot.
    ///
    /// `scope` is the concrete path the caller is working on; any `[*]` in the
    /// condition's paths is bound to the indices of `scope`, so a rule over
    /// `persons[*]` reads the governing field of the same person. An absent
    /// governing field never matches.
    pub fn holds(&self, values: &FormValue, scope: &FieldPath) -> bool {
        match self {
            Condition::Equals { path, value } => values
                .get(&path.bind(scope))
                .map_or(false, |v| v.same_as(value)),
            Condition::OneOf { path, values: options } => values
                .get(&path.bind(scope))
                .map_or(false, |v| options.iter().any(|o| v.same_as(o))),
            Condition::IsTrue { path } => values
                .get(&path.bind(scope))
                .and_then(Value::as_bool)
                .unwrap_or(false),
            Condition::NotBlank { path } => !values.is_blank(&path.bind(scope)),
            Condition::Not { condition } => !condition.holds(values, scope),
            Condition::All { conditions } => conditions.iter().all(|c| c.holds(values, scope)),
            Condition::Any { conditions } => conditions.iter().any(|c| c.holds(values, scope)),
        }
    }

    /// Every field path this condition reads.
    pub fn reads(&self) -> Vec<&FieldPath> {
        let mut out = Vec::new();
        self.collect_reads(&mut out);
        out
    }

    fn collect_reads<'a>(&'a self, out: &mut Vec<&'a FieldPath>) {
        match self {
            Condition::Equals { path, .. }
            | Condition::OneOf { path, .. }
            | Condition::IsTrue { path }
            | Condition::NotBlank { path } => out.push(path),
            Condition::Not { condition } => condition.collect_reads(out),
            Condition::All { conditions } | Condition::Any { conditions } => {
                for c in conditions {
                    c.collect_reads(out);
                }
            }
        }
    }
}
