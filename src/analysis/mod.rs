//! Static checks run once when a schema is built.
pub mod topology;
pub mod validation;
