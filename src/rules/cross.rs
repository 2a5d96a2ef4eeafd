//! Whole-form rules that may raise issues on a field other than the one that triggered them.

use super::condition::Condition;
use crate::clock::Context;
use crate::compute::money::{check_payment, BalanceCheck, Money, MoneyError};
use crate::store::{FieldPath, FormValue, Value};
use crate::validation::{Issue, IssueKind};
use std::fmt;
use std::sync::Arc;

pub type CustomCheck = dyn Fn(&FormValue, &Context) -> Vec<Issue> + Send + Sync;

/// A named one-off rule. `reads` must list every field the closure looks at so
/// the schema can check them at construction time.
#[derive(Clone)]
pub struct CustomRule {
    pub name: String,
    pub reads: Vec<FieldPath>,
    pub check: Arc<CustomCheck>,
}

impl fmt::Debug for CustomRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomRule").field("name", &self.name).field("reads", &self.reads).finish()
    }
}

#[derive(Debug, Clone)]
pub enum CrossFieldRule {
    /// "Governing field has value V ⇒ dependent field must be filled in."
    ///
    /// Covers every "Other, please specify" box and every "Yes ⇒ give details" field.
    RequiredWhen { when: Condition, dependent: FieldPath, message: String },
    /// The end date must not be before the start date.
    DateOrder { start: FieldPath, end: FieldPath, message: String },
    /// The date must not be later than today (incident date, date of birth).
    NotAfterToday { path: FieldPath, message: String },
    /// The date must not be earlier than today (appointments, leave start).
    NotBeforeToday { path: FieldPath, message: String },
    /// The payment amount must be positive and no more than the outstanding balance.
    WithinBalance { balance: FieldPath, amount: FieldPath },
    Custom(CustomRule),
}

impl CrossFieldRule {
    pub fn required_when(when: Condition, dependent: FieldPath, message: impl Into<String>) -> Self {
        CrossFieldRule::RequiredWhen { when, dependent, message: message.into() }
    }

    /// Every field path this rule reads.
    pub fn reads(&self) -> Vec<&FieldPath> {
        match self {
            CrossFieldRule::RequiredWhen { when, dependent, .. } => {
                let mut paths = when.reads();
                paths.push(dependent);
                paths
            }
            CrossFieldRule::DateOrder { start, end, .. } => vec![start, end],
            CrossFieldRule::NotAfterToday { path, .. } | CrossFieldRule::NotBeforeToday { path, .. } => vec![path],
            CrossFieldRule::WithinBalance { balance, amount } => vec![balance, amount],
            CrossFieldRule::Custom(rule) => rule.reads.iter().collect(),
        }
    }

    pub(crate) fn evaluate(&self, values: &FormValue, ctx: &Context, out: &mut Vec<Issue>) {
        match self {
            CrossFieldRule::RequiredWhen { when, dependent, message } => {
                for target in values.expand(dependent) {
                    if when.holds(values, &target) && values.is_blank(&target) {
                        out.push(Issue::new(target, IssueKind::ConditionallyRequired, message.clone()));
                    }
                }
            }
            CrossFieldRule::DateOrder { start, end, message } => {
                for end_path in values.expand(end) {
                    let start_date = values.get(&start.bind(&end_path)).and_then(Value::as_date);
                    let end_date = values.get(&end_path).and_then(Value::as_date);
                    if let (Some(s), Some(e)) = (start_date, end_date) {
                        if e < s {
                            out.push(Issue::new(end_path, IssueKind::DateOrder, message.clone()));
                        }
                    }
                }
            }
            CrossFieldRule::NotAfterToday { path, message } => {
                for concrete in values.expand(path) {
                    if values.get(&concrete).and_then(Value::as_date).map_or(false, |d| d > ctx.today) {
                        out.push(Issue::new(concrete, IssueKind::Range, message.clone()));
                    }
                }
            }
            CrossFieldRule::NotBeforeToday { path, message } => {
                for concrete in values.expand(path) {
                    if values.get(&concrete).and_then(Value::as_date).map_or(false, |d| d < ctx.today) {
                        out.push(Issue::new(concrete, IssueKind::Range, message.clone()));
                    }
                }
            }
            CrossFieldRule::WithinBalance { balance, amount } => {
                for amount_path in values.expand(amount) {
                    if let Some(issue) = balance_issue(values, &balance.bind(&amount_path), amount_path) {
                        out.push(issue);
                    }
                }
            }
            CrossFieldRule::Custom(rule) => out.extend((rule.check)(values, ctx)),
        }
    }
}

fn balance_issue(values: &FormValue, balance_path: &FieldPath, amount_path: FieldPath) -> Option<Issue> {
    let raw_amount = match values.get(&amount_path) {
        None => Err(MoneyError::Empty),
        Some(Value::Number(n)) => Money::from_f64(*n).ok_or_else(|| MoneyError::Invalid(n.to_string())),
        Some(Value::Text(s)) => Money::parse(s),
        Some(other) => Err(MoneyError::Invalid(format!("{:?}", other))),
    };
    // An unreadable balance still lets the positivity check run.
    let balance = values
        .get(balance_path)
        .and_then(Value::as_money)
        .unwrap_or(Money::from_cents(i64::MAX));

    let (kind, message) = match check_payment(balance, raw_amount) {
        BalanceCheck::Ok | BalanceCheck::Blank => return None,
        BalanceCheck::Invalid => (IssueKind::Format, "Enter a valid amount"),
        BalanceCheck::NotPositive => (IssueKind::Balance, "Amount must be greater than zero"),
        BalanceCheck::ExceedsBalance => (IssueKind::Balance, "Amount exceeds outstanding balance"),
    };
    Some(Issue::new(amount_path, kind, message))
}
