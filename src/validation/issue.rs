//! Defines the issue types produced by a validation pass.
use crate::store::FieldPath;
use serde::{Deserialize, Serialize};

/// The specific category of an issue.
///
// This enum allows for programmatic inspection of issues, which is more
// robust than string matching on the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// A required value is missing.
    Required,
    /// A value required only because another field has a particular value.
    ConditionallyRequired,
    /// Text that does not have the expected shape (length, pattern, email, date, number).
    Format,
    /// A number or date outside its allowed range.
    Range,
    /// Two dates in the wrong order.
    DateOrder,
    /// A monetary amount that is not acceptable against the balance.
    Balance,
    /// Raised by a custom rule.
    Custom,
}

/// A single user-correctable problem, tied to the field it should render next to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub field_path: FieldPath,
    pub kind: IssueKind,
    pub message: String,
}

impl Issue {
    pub fn new(field_path: FieldPath, kind: IssueKind, message: impl Into<String>) -> Self {
        Self { field_path, kind, message: message.into() }
    }
}

/// The outcome of one validation pass. Issues are in rule-declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub issues: Vec<Issue>,
}

impl ValidationResult {
    pub fn from_issues(issues: Vec<Issue>) -> Self {
        Self { valid: issues.is_empty(), issues }
    }

    /// A result with nothing to show, e.g. before the first validation trigger.
    pub fn clean() -> Self {
        Self::from_issues(Vec::new())
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn issues_for<'a>(&'a self, path: &'a FieldPath) -> impl Iterator<Item = &'a Issue> + 'a {
        self.issues.iter().filter(move |i| &i.field_path == path)
    }

    /// The first message for a field, which is what a form renders under the input.
    pub fn first_message<'a>(&'a self, path: &'a FieldPath) -> Option<&'a str> {
        self.issues_for(path).next().map(|i| i.message.as_str())
    }
}
