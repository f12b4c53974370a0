use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::copier::DEFAULT_CHUNK_SIZE;
use crate::scratch::DEFAULT_PREFIX;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub scratch: ScratchConfig,
    #[serde(default)]
    pub copy: CopyConfig,
    #[serde(default)]
    pub workers: WorkerConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
}

/// Where scratch scopes are created and how they are named
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScratchConfig {
    /// Parent directory of every scope (default: system temp dir)
    #[serde(default = "default_scratch_root")]
    pub root: PathBuf,
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default)]
    pub suffix: String,
}

impl Default for ScratchConfig {
    fn default() -> Self {
        Self {
            root: default_scratch_root(),
            prefix: default_prefix(),
            suffix: String::new(),
        }
    }
}

fn default_scratch_root() -> PathBuf {
    std::env::temp_dir().join("rasterchain")
}

fn default_prefix() -> String {
    DEFAULT_PREFIX.to_string()
}

/// Copy pipeline configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CopyConfig {
    /// Bytes per chunk job (default: 1024)
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

impl Default for CopyConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
        }
    }
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

/// Worker pool configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkerConfig {
    /// Maximum blocking jobs and child processes running at once
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
        }
    }
}

fn default_max_concurrent() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

/// External command execution configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ExecutionConfig {
    /// Kill a command after this many seconds (default: no deadline)
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Capture stderr into logs instead of passing it through
    #[serde(default)]
    pub capture_stderr: bool,
}

impl ExecutionConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Paths of wrapped tools
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ToolsConfig {
    #[serde(default = "default_gdal_translate")]
    pub gdal_translate: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            gdal_translate: default_gdal_translate(),
        }
    }
}

fn default_gdal_translate() -> String {
    "gdal_translate".to_string()
}
