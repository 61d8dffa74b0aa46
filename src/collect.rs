//! Collector fan-in.
//!
//! Collectors pull resources from paged provider APIs and may run
//! concurrently, one thread each; their partial graphs flow through a
//! channel into a single accumulator. The merge in the receiving loop is
//! the only serialization point the concurrency model requires.

use std::sync::mpsc;
use std::thread;

use tracing::warn;

use crate::error::{Result, StratusError};
use crate::graph::Graph;

pub type Collector = Box<dyn FnOnce() -> Result<Graph> + Send + 'static>;

/// Runs every collector on its own thread and merges their graphs into
/// one for the given region. Any collector failure fails the collection
/// as a whole, with every failure reported together.
pub fn fan_in(region: &str, collectors: Vec<Collector>) -> Result<Graph> {
    let (tx, rx) = mpsc::channel();
    let mut handles = Vec::new();
    for collector in collectors {
        let tx = tx.clone();
        handles.push(thread::spawn(move || {
            let _ = tx.send(collector());
        }));
    }
    drop(tx);

    let mut merged = Graph::in_region(region);
    let mut failures = Vec::new();
    for outcome in rx {
        match outcome {
            Ok(graph) => merged.merge(&graph),
            Err(e) => {
                warn!(error = %e, "collector failed");
                failures.push(e.to_string());
            }
        }
    }
    for handle in handles {
        if handle.join().is_err() {
            failures.push("collector thread panicked".to_owned());
        }
    }
    if failures.is_empty() {
        Ok(merged)
    } else {
        Err(StratusError::Execution(format!(
            "collection failed: {}",
            failures.join("; ")
        )))
    }
}
