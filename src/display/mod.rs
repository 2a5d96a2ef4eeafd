//! Plain-text renderings for logs and host bindings.
pub mod report;

pub use report::format_report;
