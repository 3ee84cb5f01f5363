//! Shared data model for the batchtrace workspace.
//!
//! Exported batch-trace data is a set of JSON collections describing a
//! process hierarchy (recipes -> steps -> sequences -> operations ->
//! functions) plus sensor and operator reference collections. This crate
//! defines the record shape those collections share, the kind and
//! collection enums, execution-window classification, and the
//! modification-code rewrite applied at index build time.

mod error;
mod kind;
mod modification;
mod record;
mod time;
mod window;

pub use error::{ModelError, Result};
pub use kind::{Collection, EntityKind};
pub use modification::normalize_modification;
pub use record::{fields, DateWrapper, FieldValue, Record};
pub use time::TimeMs;
pub use window::WindowState;
