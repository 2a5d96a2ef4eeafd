// Derived-field validation engine for the clinic back-office forms.
//
// Rules are declared once per form (`store::FormSchema`), evaluated as a pure
// function of the form snapshot (`validation`), and driven by user events
// through a `session::FormSession`. With the `python` feature the core is
// also exposed as the `_core` extension module.

pub mod analysis;
pub mod bindings;
pub mod clock;
pub mod compute;
pub mod config;
pub mod display;
pub mod error;
pub mod forms;
pub mod rules;
pub mod session;
pub mod store;
pub mod validation;

pub use clock::{Clock, Context, FixedClock, SystemClock};
pub use compute::{Calculator, DerivedField, Money};
pub use config::{load_schema, FormDefinition};
pub use error::{ConfigError, SchemaError, SessionError};
pub use rules::{Condition, CrossFieldRule, FieldCheck, FieldRule};
pub use session::{FormSession, RevalidateMode, Submission, ValidationMode};
pub use store::{FieldPath, FormSchema, FormValue, Value};
pub use validation::{validate, Issue, IssueKind, ValidationResult};
