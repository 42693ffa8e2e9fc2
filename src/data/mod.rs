//! Demo data generation.

pub mod sample;

pub use sample::{generate_sample, write_sample_csv, write_sample_file, SampleConfig};
