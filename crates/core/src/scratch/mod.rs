//! Scratch directories whose lifetime is bound to a block of work.
//!
//! A [`ScratchScope`] creates a uniquely named directory and removes it
//! recursively when released. Release happens exactly once: explicitly via
//! [`ScratchScope::release`], or from `Drop` on early returns and panics.
//! Removal failures are logged and counted, never returned.
//!
//! # Example
//!
//! ```ignore
//! use rasterchain_core::scratch::ScratchScope;
//!
//! let answer = ScratchScope::scoped(&root, "mgd", "", |dir| async move {
//!     tokio::fs::write(dir.join("tempfile.txt"), b"Test").await?;
//!     Ok::<_, anyhow::Error>(42)
//! })
//! .await?;
//! ```

mod error;
mod scope;

pub use error::ScratchError;
pub use scope::{ScopeDir, ScratchScope, DEFAULT_PREFIX};
