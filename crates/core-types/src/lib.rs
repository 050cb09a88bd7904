//! Shared data structures for the revenue model workspace.
//!
//! Every data source (query API rows, CSV exports) is normalised into a
//! [`Table`] of loosely typed [`Value`]s before any calculation runs.

pub mod error;
pub mod table;
pub mod value;

// Re-export the core types to provide a clean public API.
pub use error::CoreError;
pub use table::{Row, Table};
pub use value::Value;
