//! Single-field rule primitives.

use crate::store::{FieldPath, FormValue, Value};
use crate::validation::{Issue, IssueKind};
use regex::Regex;
use std::sync::OnceLock;

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid"))
}

fn phone_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\+?[0-9][0-9 ()\-]{6,19}$").expect("phone pattern is valid"))
}

/// A predicate over one field's raw value.
///
/// Every check except `Required` passes on a blank value: an optional field
/// that was left empty is fine, and only a conditional requirement can make it not fine.
#[derive(Debug, Clone)]
pub enum FieldCheck {
    Required,
    MinLength(usize),
    MaxLength(usize),
    Pattern(Regex),
    Email,
    Phone,
    /// Parses as a finite number.
    Number,
    Range { min: Option<f64>, max: Option<f64> },
    /// Strictly greater than zero.
    Positive,
    /// One of a fixed set of select-box options.
    OneOf(Vec<String>),
    /// An ISO `YYYY-MM-DD` calendar date.
    Date,
    /// A monetary amount with at most cent precision after rounding.
    Money,
}

impl FieldCheck {
    /// Returns the issue kind and default message when `value` fails the check.
    pub fn check(&self, value: Option<&Value>) -> Option<(IssueKind, String)> {
        let value = match value {
            Some(v) if !v.is_blank() => v,
            _ => {
                return match self {
                    FieldCheck::Required => Some((IssueKind::Required, "This field is required".into())),
                    _ => None,
                }
            }
        };

        let text_len = || value.as_text().map(|s| s.trim().chars().count());
        let fail = |kind: IssueKind, msg: String| Some((kind, msg));

        match self {
            FieldCheck::Required => None,
            FieldCheck::MinLength(min) => match text_len() {
                Some(len) if len < *min => fail(IssueKind::Format, format!("Must be at least {} characters", min)),
                _ => None,
            },
            FieldCheck::MaxLength(max) => match text_len() {
                Some(len) if len > *max => fail(IssueKind::Format, format!("Must be at most {} characters", max)),
                _ => None,
            },
            FieldCheck::Pattern(re) => match value.as_text() {
                Some(s) if re.is_match(s.trim()) => None,
                _ => fail(IssueKind::Format, "Invalid format".into()),
            },
            FieldCheck::Email => match value.as_text() {
                Some(s) if email_regex().is_match(s.trim()) => None,
                _ => fail(IssueKind::Format, "Enter a valid email address".into()),
            },
            FieldCheck::Phone => match value.as_text() {
                Some(s) if phone_regex().is_match(s.trim()) => None,
                _ => fail(IssueKind::Format, "Enter a valid phone number".into()),
            },
            FieldCheck::Number => match value.as_number() {
                Some(_) => None,
                None => fail(IssueKind::Format, "Must be a number".into()),
            },
            FieldCheck::Range { min, max } => match value.as_number() {
                None => fail(IssueKind::Format, "Must be a number".into()),
                Some(n) if min.map_or(false, |m| n < m) => {
                    fail(IssueKind::Range, format!("Must be at least {}", min.unwrap_or_default()))
                }
                Some(n) if max.map_or(false, |m| n > m) => {
                    fail(IssueKind::Range, format!("Must be at most {}", max.unwrap_or_default()))
                }
                Some(_) => None,
            },
            FieldCheck::Positive => match value.as_number() {
                Some(n) if n > 0.0 => None,
                Some(_) => fail(IssueKind::Range, "Must be greater than zero".into()),
                None => fail(IssueKind::Format, "Must be a number".into()),
            },
            FieldCheck::OneOf(options) => {
                let matched = options.iter().any(|o| value.same_as(&Value::text(o.as_str())));
                if matched {
                    None
                } else {
                    fail(IssueKind::Format, "Select a valid option".into())
                }
            }
            FieldCheck::Date => match value.as_date() {
                Some(_) => None,
                None => fail(IssueKind::Format, "Enter a valid date".into()),
            },
            FieldCheck::Money => match value {
                Value::Number(_) | Value::Text(_) if value.as_money().is_some() => None,
                _ => fail(IssueKind::Format, "Enter a valid amount".into()),
            },
        }
    }
}

/// A check bound to a field (or to every element of a repeated group).
#[derive(Debug, Clone)]
pub struct FieldRule {
    pub path: FieldPath,
    pub check: FieldCheck,
    /// Replaces the check's default message.
    pub message: Option<String>,
}

impl FieldRule {
    pub fn new(path: FieldPath, check: FieldCheck) -> Self {
        Self { path, check, message: None }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub(crate) fn evaluate(&self, values: &FormValue, out: &mut Vec<Issue>) {
        for concrete in values.expand(&self.path) {
            if let Some((kind, default_msg)) = self.check.check(values.get(&concrete)) {
                let message = self.message.clone().unwrap_or(default_msg);
                out.push(Issue::new(concrete, kind, message));
            }
        }
    }
}
