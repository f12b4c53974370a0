//! Chunked copy implementation.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::Path;
use tracing::{info, trace, warn};

use super::error::CopyError;
use crate::artifact::Artifact;
use crate::metrics::{COPIES_TOTAL, COPY_BYTES};
use crate::scratch::ScopeDir;
use crate::worker::WorkerPool;

/// Default chunk size in bytes.
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// Copies `source` into `dir` under the same basename.
///
/// The returned artifact is never failed; copy problems are returned as
/// errors because there is no output to hand downstream.
pub async fn copy_into(
    pool: &WorkerPool,
    dir: &ScopeDir,
    source: &Path,
    chunk_size: usize,
) -> Result<Artifact, CopyError> {
    if chunk_size == 0 {
        return Err(CopyError::InvalidChunkSize { chunk_size });
    }
    let file_name = source.file_name().ok_or_else(|| CopyError::InvalidSource {
        path: source.to_path_buf(),
    })?;
    let destination = dir.join(file_name);

    match copy_chunks(pool, source, &destination, chunk_size).await {
        Ok(bytes) => {
            COPIES_TOTAL.with_label_values(&["success"]).inc();
            COPY_BYTES.inc_by(bytes);
            info!(
                source = %source.display(),
                destination = %destination.display(),
                bytes,
                "Copied file into scratch scope"
            );
            Ok(Artifact::succeeded(destination))
        }
        Err(e) => {
            COPIES_TOTAL.with_label_values(&["error"]).inc();
            warn!(source = %source.display(), error = %e, "Copy into scratch scope failed");
            Err(e)
        }
    }
}

/// Open handles and the reusable chunk buffer, moved in and out of each job.
struct ChunkState {
    reader: File,
    writer: File,
    buffer: Vec<u8>,
}

impl ChunkState {
    /// Copies one chunk, returning the number of bytes moved (0 at end of file).
    fn copy_chunk(&mut self) -> io::Result<usize> {
        let read = loop {
            match self.reader.read(&mut self.buffer) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        };
        if read > 0 {
            self.writer.write_all(&self.buffer[..read])?;
        }
        Ok(read)
    }

    /// Flushes and syncs the destination, then closes both files.
    fn finish(mut self) -> io::Result<()> {
        self.writer.flush()?;
        self.writer.sync_all()
    }
}

async fn copy_chunks(
    pool: &WorkerPool,
    source: &Path,
    destination: &Path,
    chunk_size: usize,
) -> Result<u64, CopyError> {
    let (src, dst) = (source.to_path_buf(), destination.to_path_buf());
    let (mut state, expected) = pool
        .run_blocking(move || open_pair(&src, &dst, chunk_size))
        .await??;

    let mut total = 0u64;
    loop {
        let (next, read) = pool
            .run_blocking(move || {
                let mut state = state;
                let read = state.copy_chunk()?;
                Ok::<_, io::Error>((state, read))
            })
            .await?
            .map_err(|e| CopyError::io(source, destination, e))?;
        state = next;
        if read == 0 {
            break;
        }
        total += read as u64;
        trace!(destination = %destination.display(), total, "Wrote chunk");
    }

    pool.run_blocking(move || state.finish())
        .await?
        .map_err(|e| CopyError::io(source, destination, e))?;

    let actual = tokio::fs::metadata(destination)
        .await
        .map_err(|e| CopyError::io(source, destination, e))?
        .len();
    if actual != expected || total != expected {
        return Err(CopyError::SizeMismatch {
            path: destination.to_path_buf(),
            expected,
            actual,
        });
    }

    Ok(total)
}

fn open_pair(
    source: &Path,
    destination: &Path,
    chunk_size: usize,
) -> Result<(ChunkState, u64), CopyError> {
    let reader = File::open(source).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            CopyError::SourceNotFound {
                path: source.to_path_buf(),
            }
        } else {
            CopyError::io(source, destination, e)
        }
    })?;
    let expected = reader
        .metadata()
        .map_err(|e| CopyError::io(source, destination, e))?
        .len();

    // create_new: outputs are created exclusively under the scope.
    let writer = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(destination)
        .map_err(|e| CopyError::io(source, destination, e))?;

    Ok((
        ChunkState {
            reader,
            writer,
            buffer: vec![0u8; chunk_size],
        },
        expected,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scratch::ScratchScope;
    use tempfile::TempDir;

    fn write_source(dir: &TempDir, name: &str, len: usize) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let data: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
        std::fs::write(&path, data).unwrap();
        path
    }

    #[tokio::test]
    async fn test_copy_preserves_size_name_and_content() {
        let sources = TempDir::new().unwrap();
        let root = TempDir::new().unwrap();
        let source = write_source(&sources, "input.tif", 5000);
        let pool = WorkerPool::new("test", 2);
        let scope = ScratchScope::acquire(root.path(), "cpy", "").await.unwrap();

        let artifact = copy_into(&pool, &scope.dir(), &source, DEFAULT_CHUNK_SIZE)
            .await
            .unwrap();

        assert!(!artifact.is_failed());
        assert!(scope.dir().contains(artifact.output()));
        assert_eq!(artifact.output().file_name().unwrap(), "input.tif");
        assert_eq!(
            std::fs::read(artifact.output()).unwrap(),
            std::fs::read(&source).unwrap()
        );
        // open + 5 data chunks + end-of-file + finish
        assert_eq!(pool.status().total_processed, 8);
    }

    #[tokio::test]
    async fn test_copy_empty_file() {
        let sources = TempDir::new().unwrap();
        let root = TempDir::new().unwrap();
        let source = write_source(&sources, "empty.tif", 0);
        let pool = WorkerPool::new("test", 1);
        let scope = ScratchScope::acquire(root.path(), "cpy", "").await.unwrap();

        let artifact = copy_into(&pool, &scope.dir(), &source, 16).await.unwrap();
        assert_eq!(std::fs::metadata(artifact.output()).unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_missing_source() {
        let root = TempDir::new().unwrap();
        let pool = WorkerPool::new("test", 1);
        let scope = ScratchScope::acquire(root.path(), "cpy", "").await.unwrap();

        let result = copy_into(
            &pool,
            &scope.dir(),
            Path::new("/nonexistent/input.tif"),
            DEFAULT_CHUNK_SIZE,
        )
        .await;
        assert!(matches!(result, Err(CopyError::SourceNotFound { .. })));
    }

    #[tokio::test]
    async fn test_zero_chunk_size_rejected() {
        let sources = TempDir::new().unwrap();
        let root = TempDir::new().unwrap();
        let source = write_source(&sources, "input.tif", 10);
        let pool = WorkerPool::new("test", 1);
        let scope = ScratchScope::acquire(root.path(), "cpy", "").await.unwrap();

        let result = copy_into(&pool, &scope.dir(), &source, 0).await;
        assert!(matches!(
            result,
            Err(CopyError::InvalidChunkSize { chunk_size: 0 })
        ));
    }

    #[tokio::test]
    async fn test_source_without_file_name() {
        let root = TempDir::new().unwrap();
        let pool = WorkerPool::new("test", 1);
        let scope = ScratchScope::acquire(root.path(), "cpy", "").await.unwrap();

        let result = copy_into(&pool, &scope.dir(), Path::new("/"), DEFAULT_CHUNK_SIZE).await;
        assert!(matches!(result, Err(CopyError::InvalidSource { .. })));
    }

    #[tokio::test]
    async fn test_second_copy_into_same_scope_fails() {
        let sources = TempDir::new().unwrap();
        let root = TempDir::new().unwrap();
        let source = write_source(&sources, "input.tif", 100);
        let pool = WorkerPool::new("test", 1);
        let scope = ScratchScope::acquire(root.path(), "cpy", "").await.unwrap();

        copy_into(&pool, &scope.dir(), &source, DEFAULT_CHUNK_SIZE)
            .await
            .unwrap();
        let second = copy_into(&pool, &scope.dir(), &source, DEFAULT_CHUNK_SIZE).await;
        assert!(matches!(second, Err(CopyError::Io { .. })));
    }
}
