//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - input records and the sorted `Dataset`
//! - filter criteria and the `FilteredView` they select
//! - aggregation outputs (`BucketKey`, `PeriodBucket`, `DailyPoint`)
//! - metrics and maintenance alerts

pub mod types;

pub use types::*;
