use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Profiler configuration, loaded from `sigprof.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProfilerConfig {
    /// Longest spacing between two signals still treated as one
    /// double-signal snapshot request, in milliseconds.
    pub debounce_ms: u64,
    /// Directory artifacts are written to; created on `install()`.
    pub output_dir: PathBuf,
    /// OS signals that feed the capture-request channel (e.g. "SIGUSR1").
    /// All configured signals feed the same logical channel.
    pub signals: Vec<String>,
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 50,
            output_dir: PathBuf::from("."),
            signals: vec!["SIGUSR1".to_string()],
        }
    }
}

impl ProfilerConfig {
    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Load configuration from a TOML file. A missing file yields defaults;
    /// an unreadable or malformed file is an error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Read { path, source } => {
                write!(f, "failed to read config {}: {}", path.display(), source)
            }
            ConfigError::Parse { path, source } => {
                write!(f, "failed to parse config {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Read { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
        }
    }
}
