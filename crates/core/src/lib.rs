pub mod artifact;
pub mod chain;
pub mod config;
pub mod copier;
pub mod engine;
pub mod metrics;
pub mod operation;
pub mod scratch;
pub mod testing;
pub mod worker;

pub use artifact::Artifact;
pub use chain::{chain, Pipeline, Stage, Upstream};
pub use config::{
    load_config, load_config_from_str, validate_config, ConfigError, CopyConfig, EngineConfig,
    ExecutionConfig, ScratchConfig, ToolsConfig, WorkerConfig,
};
pub use copier::{copy_into, CopyError, DEFAULT_CHUNK_SIZE};
pub use engine::{Engine, EngineError, COPY_SCOPE_PREFIX, OPERATION_SCOPE_PREFIX};
pub use operation::{
    CommandRunner, CommandStatus, CommandTemplate, ExecutionOutcome, OperationError,
    OperationOptions, OperationState, ProcessRunner, ResolvedCommand, RunnerError, Segment,
    UnitOperation, PLACEHOLDER,
};
pub use scratch::{ScopeDir, ScratchError, ScratchScope};
pub use worker::{PoolStatus, WorkerError, WorkerPool};
