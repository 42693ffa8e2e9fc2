//! Input/output helpers.
//!
//! - CSV/workbook ingest + validation (`ingest`, `workbook`)
//! - filtered-view CSV export (`export`)

pub mod export;
pub mod ingest;
pub mod workbook;

pub use export::*;
pub use ingest::*;
