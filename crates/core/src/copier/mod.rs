//! Chunked copies of input files into scratch space.
//!
//! [`copy_into`] duplicates a source file into a scope directory under the
//! same basename. Each chunk is read and written as one job on the
//! [`WorkerPool`](crate::worker::WorkerPool), so many copies can interleave
//! without blocking the orchestration task. The destination is flushed,
//! synced and closed before the resulting [`Artifact`](crate::Artifact) is
//! returned.

mod chunked;
mod error;

pub use chunked::{copy_into, DEFAULT_CHUNK_SIZE};
pub use error::CopyError;
