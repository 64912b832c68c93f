//! Statistics generation from the crawl database
//!
//! This module provides functionality for extracting and displaying
//! graph statistics from the storage layer.

use crate::storage::{EdgeKind, RunRecord, Storage};
use crate::Result;
use std::collections::HashMap;

/// Graph statistics summary
#[derive(Debug, Clone)]
pub struct CrawlStatistics {
    /// Count of edges by kind
    pub edges_by_kind: HashMap<EdgeKind, u64>,

    /// Articles with a stored text record
    pub texts: u64,

    /// Cached equivalence records, including empty ones for missing pages
    pub equivalences: u64,

    /// Distinct unvisited frontier targets
    pub frontier: u64,

    /// Most recent run, if any
    pub latest_run: Option<RunRecord>,
}

impl CrawlStatistics {
    pub fn total_edges(&self) -> u64 {
        self.edges_by_kind.values().sum()
    }
}

/// Loads statistics from storage
pub fn load_statistics(storage: &dyn Storage) -> Result<CrawlStatistics> {
    Ok(CrawlStatistics {
        edges_by_kind: storage.count_edges_by_kind()?,
        texts: storage.count_texts()?,
        equivalences: storage.count_equivalences()?,
        frontier: storage.count_frontier()?,
        latest_run: storage.get_latest_run()?,
    })
}

/// Seconds between a run's start and finish, if it finished
pub fn run_duration_seconds(run: &RunRecord) -> Option<u64> {
    let started = run.started_at.parse::<chrono::DateTime<chrono::Utc>>().ok()?;
    let finished = run
        .finished_at
        .as_ref()?
        .parse::<chrono::DateTime<chrono::Utc>>()
        .ok()?;
    u64::try_from((finished - started).num_seconds()).ok()
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Graph Statistics ===\n");

    println!("Overview:");
    println!("  Articles crawled: {}", stats.texts);
    println!("  Equivalence records: {}", stats.equivalences);
    println!("  Frontier size: {}", stats.frontier);
    println!("  Total edges: {}", stats.total_edges());
    println!();

    println!("Edges by Kind:");
    let total = stats.total_edges();
    for kind in EdgeKind::all() {
        let count = stats.edges_by_kind.get(&kind).copied().unwrap_or(0);
        let percentage = if total > 0 {
            (count as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", kind.to_db_string(), count, percentage);
    }
    println!();

    match &stats.latest_run {
        Some(run) => {
            println!("Latest Run:");
            println!("  ID: {}", run.id);
            println!("  Status: {}", run.status.to_db_string());
            println!("  Started: {}", run.started_at);
            if let Some(finished) = &run.finished_at {
                println!("  Finished: {}", finished);
            }
            if let Some(seconds) = run_duration_seconds(run) {
                println!("  Duration: {}s", seconds);
            }
            println!("  Rounds: {}", run.rounds);
            println!("  Articles attempted: {}", run.articles);
        }
        None => println!("No runs recorded"),
    }
}
