//! # ps-sweep
//!
//! Parallel img_size sweep orchestration for PixelSweep.
//!
//! Provides the candidate schedule, a fixed-size worker pool with bounded
//! task-per-worker retirement, submission-order result aggregation with
//! deterministic tie-break, and persistence of the winning model.

pub mod aggregator;
pub mod generator;
pub mod persist;
pub mod pool;
pub mod runner;

pub use aggregator::ResultAggregator;
pub use generator::candidate_schedule;
pub use persist::ModelPersister;
pub use pool::{TaskHandle, WorkerPool};
pub use runner::SweepRunner;
