//! Output module for reporting on the stored graph
//!
//! This module handles:
//! - Loading graph statistics from storage
//! - Printing them for the `--stats` command

pub mod stats;

pub use stats::{load_statistics, print_statistics, run_duration_seconds, CrawlStatistics};
