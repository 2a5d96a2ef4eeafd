//! Form state: field paths, raw values, and the declared schema.
pub mod path;
pub mod registry;
pub mod types;

pub use path::{FieldPath, PathError, Segment};
pub use registry::{FieldSpec, FormSchema, FormSchemaBuilder};
pub use types::{FormValue, Value, DATE_FORMAT};
