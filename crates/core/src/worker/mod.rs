//! Worker pool for offloading blocking work.
//!
//! Chunked file writes and child process waits go through a [`WorkerPool`]
//! so the orchestration task yields while they run. The pool is an explicit
//! handle: the engine owns one and passes clones to every component that
//! needs it.

mod error;
mod pool;

pub use error::WorkerError;
pub use pool::{PoolStatus, WorkerPool};
