//! `solar-dash` library crate.
//!
//! The binary (`solar-dash`) is a thin wrapper around this library so that:
//!
//! - the loading and analysis pipeline is testable without spawning processes
//! - the CLI, the TUI and the exports all share one pipeline

pub mod analysis;
pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod plot;
pub mod report;
pub mod tui;
