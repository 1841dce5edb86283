use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

/// The two kinds of capture artifact the profiler produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// A sampled execution profile over a time interval.
    Trace,
    /// An instantaneous capture of heap state.
    Snapshot,
}

impl ArtifactKind {
    pub fn prefix(self) -> &'static str {
        match self {
            ArtifactKind::Trace => "trace",
            ArtifactKind::Snapshot => "heapdump",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ArtifactKind::Trace => "cpuprofile",
            ArtifactKind::Snapshot => "heapsnapshot",
        }
    }
}

/// Build the filename `{kind}-{timestamp}.{ext}`.
///
/// The timestamp is millisecond-precision UTC ISO-8601, so filenames of the
/// same kind compare lexically in creation order.
pub fn artifact_filename(kind: ArtifactKind, at: DateTime<Utc>) -> String {
    format!(
        "{}-{}.{}",
        kind.prefix(),
        at.format("%Y-%m-%dT%H:%M:%S%.3fZ"),
        kind.extension()
    )
}

/// Destination path for a new artifact of the given kind, stamped with the
/// current time.
pub fn artifact_path(output_dir: &Path, kind: ArtifactKind) -> PathBuf {
    output_dir.join(artifact_filename(kind, Utc::now()))
}
