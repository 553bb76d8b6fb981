//! I/O module
//!
//! Handles CSV export of transaction histories.
//!
//! # Components
//!
//! - `export` - History serialization to CSV (writer-based and file-based)

pub mod export;

pub use export::{export_history_to_file, write_history_csv};
