//! Filtering, aggregation and metrics over loaded records.
//!
//! Every stage is a pure function from its input to a new value:
//! `filter` -> {`aggregate`, `metrics`}.

pub mod aggregate;
pub mod filter;
pub mod metrics;

pub use aggregate::{
    consumption_series_by_type, group_by_period, group_by_site, group_by_type, raw_series, resample_daily,
};
pub use filter::{default_criteria, filter};
pub use metrics::{compute_metrics, maintenance_alerts};
