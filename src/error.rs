//! Programmer-facing errors. User input problems are `Issue`s, never errors.
use crate::store::PathError;
use thiserror::Error;

/// A malformed form declaration, reported when the schema is built.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error(transparent)]
    Path(#[from] PathError),
    #[error("Field '{0}' is declared more than once")]
    DuplicateField(String),
    #[error("{rule} refers to undeclared field '{path}'")]
    UnknownField { rule: String, path: String },
    #[error("Field '{0}' has more than one calculator")]
    DuplicateDerived(String),
    #[error("Derived field '{0}' must be a concrete path, not a template")]
    TemplateTarget(String),
    #[error("Derived fields form a cycle through '{0}'")]
    DerivedCycle(String),
    #[error("Default for '{0}' must be a concrete path, not a template")]
    TemplateDefault(String),
    #[error("Invalid pattern for '{path}': {reason}")]
    Pattern { path: String, reason: String },
}

/// Misuse of a live form session by the rendering layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Unknown field '{0}'")]
    UnknownField(String),
    #[error("Field '{0}' is calculated and cannot be edited")]
    ReadOnly(String),
    #[error("Field '{0}' is not a derived field")]
    NotDerived(String),
    #[error(transparent)]
    Path(#[from] PathError),
}

/// A declarative form definition that could not be turned into a schema.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid form definition: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid pattern for '{path}': {source}")]
    Pattern {
        path: String,
        #[source]
        source: regex::Error,
    },
    #[error("Invalid form schema:\n{}", join_errors(.0))]
    Schema(Vec<SchemaError>),
}

impl From<Vec<SchemaError>> for ConfigError {
    fn from(errors: Vec<SchemaError>) -> Self {
        ConfigError::Schema(errors)
    }
}

fn join_errors(errors: &[SchemaError]) -> String {
    errors.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n")
}
