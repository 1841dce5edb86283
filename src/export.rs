/// Export pipeline: stream a backend capture to its destination file.
///
/// Exactly two terminal outcomes: `Ok(bytes_written)` once the stream is
/// fully flushed, or an `ExportError` naming the fault. Releasing the profile
/// handle on either outcome is the caller's job.
use crate::backend::ExportStream;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

#[derive(Debug)]
pub enum ExportError {
    /// Failed to create the destination file.
    Create {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed while copying or flushing capture bytes.
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl std::fmt::Display for ExportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportError::Create { path, source } => {
                write!(f, "failed to create {}: {}", path.display(), source)
            }
            ExportError::Write { path, source } => {
                write!(f, "failed to write {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExportError::Create { source, .. } | ExportError::Write { source, .. } => Some(source),
        }
    }
}

/// Copy the export stream to `path` and flush it.
pub async fn write_artifact(mut stream: ExportStream, path: &Path) -> Result<u64, ExportError> {
    let mut file = tokio::fs::File::create(path)
        .await
        .map_err(|source| ExportError::Create {
            path: path.to_path_buf(),
            source,
        })?;
    let bytes = tokio::io::copy(&mut stream, &mut file)
        .await
        .map_err(|source| ExportError::Write {
            path: path.to_path_buf(),
            source,
        })?;
    file.flush().await.map_err(|source| ExportError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_write_artifact_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("trace-test.cpuprofile");
        let stream: ExportStream = Box::new(std::io::Cursor::new(b"capture-bytes".to_vec()));

        let bytes = write_artifact(stream, &path).await.unwrap();
        assert_eq!(bytes, 13);
        assert_eq!(std::fs::read(&path).unwrap(), b"capture-bytes");
    }

    #[tokio::test]
    async fn test_write_artifact_missing_directory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("no-such-dir").join("out.heapsnapshot");
        let stream: ExportStream = Box::new(std::io::Cursor::new(Vec::new()));

        let err = write_artifact(stream, &path).await.unwrap_err();
        assert!(matches!(err, ExportError::Create { .. }));
        assert!(err.to_string().contains("failed to create"));
    }
}
