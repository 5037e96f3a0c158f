//! Scheduler core module
//!
//! The ready-queue structure itself plus its error types. The policy layer
//! (time slices, priority inheritance, load balancing) lives with the
//! external scheduler that drives these operations.

pub mod error;
pub mod priority_queue;

pub use error::{SchedulerError, SchedulerResult};
pub use priority_queue::{KPriorityQueue, KThreadIter};
