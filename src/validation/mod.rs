//! Runs declared rules against a form snapshot and reports issues.
//!
//! Validation never fails: every problem the user can fix is an `Issue` in
//! the returned `ValidationResult`.

pub use self::issue::{Issue, IssueKind, ValidationResult};
pub use self::validator::{validate, Validator};

mod issue;
mod validator;
