//! End-to-end tests with real child processes.
#![cfg(unix)]

use std::path::Path;

use tempfile::TempDir;

use rasterchain_core::{
    testing::fixtures, Engine, EngineConfig, EngineError, ExecutionOutcome, OperationOptions,
    OperationState, Pipeline, Stage,
};

fn engine(root: &Path) -> Engine {
    let mut config = EngineConfig::default();
    config.scratch.root = root.to_path_buf();
    config.execution.timeout_secs = Some(30);
    config.execution.capture_stderr = true;
    Engine::new(config)
}

#[tokio::test]
async fn test_cp_chain_produces_identical_output() {
    let sources = TempDir::new().unwrap();
    let root = TempDir::new().unwrap();
    let input = fixtures::raster_fixture(sources.path());
    let engine = engine(root.path());
    let inner = engine.clone();

    let (failed, size) = engine
        .with_copied_file(&input, |dir, copied| async move {
            let first = inner.operation(&dir, "cp", OperationOptions::new().dst("first.tif"))?;
            let second = inner.operation(&dir, "cp", OperationOptions::new().dst("second.tif"))?;
            let result = Pipeline::new(copied).then(first).then(second).run().await?;
            let size = std::fs::metadata(result.artifact().output())
                .map(|m| m.len())
                .unwrap_or(0);
            Ok::<_, EngineError>((result.failed(), size))
        })
        .await
        .unwrap();

    assert!(!failed);
    assert_eq!(size, 1024);
}

#[tokio::test]
async fn test_false_fails_softly_and_stops_chain() {
    let sources = TempDir::new().unwrap();
    let root = TempDir::new().unwrap();
    let input = fixtures::raster_fixture(sources.path());
    let engine = engine(root.path());
    let inner = engine.clone();

    let stage = engine
        .with_copied_file(&input, |dir, copied| async move {
            let broken = inner.operation(&dir, "false", OperationOptions::new().dst("a.tif"))?;
            let after = inner.operation(&dir, "cp", OperationOptions::new().dst("b.tif"))?;
            let result = Pipeline::new(copied).then(broken).then(after).run().await?;
            assert!(!result.artifact().output().exists());
            Ok::<_, EngineError>(result)
        })
        .await
        .unwrap();

    assert!(stage.failed());
    match stage {
        Stage::Operation(op) => {
            assert_eq!(op.state(), OperationState::Executed(ExecutionOutcome::Skipped))
        }
        Stage::Artifact(_) => panic!("expected an operation stage"),
    }
}
