//! hmmpool - Parallel batch homology search
//!
//! hmmpool runs many independent query-model searches against one shared
//! sequence database on a pool of worker threads, and merges the per-worker
//! results into a single hit list whose content does not depend on the
//! number of workers.
//!
//! # Architecture
//!
//! - **Work queue**: FIFO of queries plus one sentinel per worker, with a
//!   task-count `join` and cooperative cancellation
//! - **Workers**: one thread each, owning a private engine and accumulator
//! - **Coordinator**: spawns workers, feeds the queue, reports the first
//!   failure or merges the results
//! - **Pluggable engines**: anything implementing `SearchEngine`, built per
//!   worker by an `EngineFactory`
//! - **Comprehensive stats**: per-worker latency histograms and counters

pub mod config;
pub mod coordinator;
pub mod engine;
pub mod error;
pub mod hits;
pub mod input;
pub mod model;
pub mod output;
pub mod queue;
pub mod sequence;
pub mod stats;
pub mod worker;

// Re-export commonly used types
pub use config::Config;
pub use coordinator::{search_all, Coordinator, SearchOutcome};
pub use engine::{EngineFactory, SearchEngine};
pub use error::SearchError;
pub use hits::{Hit, TopHits};

/// Result type used throughout hmmpool
pub type Result<T> = anyhow::Result<T>;
