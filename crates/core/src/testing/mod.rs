//! Testing utilities and mock implementations.
//!
//! [`MockRunner`] stands in for real raster tools so pipelines can be tested
//! without GDAL installed.
//!
//! # Example
//!
//! ```rust,ignore
//! use rasterchain_core::testing::MockRunner;
//!
//! let runner = Arc::new(MockRunner::new());
//! runner.set_exit_code("gdal_translate", 1).await;
//!
//! // Build operations with `runner.clone()` ...
//!
//! assert_eq!(runner.invocation_count().await, 1);
//! ```

mod mock_runner;

pub use mock_runner::MockRunner;

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::path::{Path, PathBuf};

    /// Writes a file of `len` deterministic bytes and returns its path.
    pub fn write_fixture(dir: &Path, name: &str, len: usize) -> PathBuf {
        let path = dir.join(name);
        let data: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
        std::fs::write(&path, data).expect("Failed to write fixture");
        path
    }

    /// Writes a 1 KiB stand-in for a GeoTIFF named `input.tif`.
    pub fn raster_fixture(dir: &Path) -> PathBuf {
        write_fixture(dir, "input.tif", 1024)
    }
}
