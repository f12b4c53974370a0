//! Unit operations: external commands that can be configured now and bound
//! to an upstream artifact later.
//!
//! A [`UnitOperation`] wraps one command template. If its source is the
//! reserved [`PLACEHOLDER`], the operation is *curried* and waits for an
//! input via [`UnitOperation::bind`]; otherwise it can run immediately with
//! [`UnitOperation::execute`]. Commands are run as argument vectors, never
//! through a shell.
//!
//! # Example
//!
//! ```ignore
//! use rasterchain_core::operation::{OperationOptions, UnitOperation};
//!
//! let to_byte = UnitOperation::curried(
//!     &dir,
//!     "gdal_translate",
//!     OperationOptions::new().with("ot", "Byte").with("of", "GTiff"),
//!     runner.clone(),
//! )?;
//!
//! let result = to_byte.bind(&copied).await?;
//! if result.failed() {
//!     // the command exited non-zero or was skipped
//! }
//! ```

mod error;
mod options;
mod runner;
mod template;
mod unit;

pub use error::{OperationError, RunnerError};
pub use options::{OperationOptions, DST_KEY, OUTPUT_FORMAT_KEY, SRC_KEY};
pub use runner::{CommandRunner, CommandStatus, ProcessRunner};
pub use template::{CommandTemplate, ResolvedCommand, Segment, PLACEHOLDER};
pub use unit::{ExecutionOutcome, OperationState, UnitOperation};
