//! Signal-triggered runtime profiler.
//!
//! A single qualifying signal toggles an execution trace; two signals within
//! the debounce window (default 50ms) take a heap snapshot instead. Captures
//! come from a pluggable [`ProfileBackend`] and are exported to timestamped
//! files, one export at a time; signals arriving mid-export are rejected, not
//! queued.
//!
//! ```no_run
//! use sigprof::{ProcStatsBackend, ProfilerConfig, SignalProfiler};
//!
//! # async fn run() -> Result<(), sigprof::ProfilerError> {
//! let mut profiler = SignalProfiler::new(ProfilerConfig::default(), ProcStatsBackend::new());
//! let mut events = profiler.subscribe();
//! profiler.install()?;
//! // ... the process now responds to SIGUSR1 ...
//! profiler.uninstall();
//! # Ok(())
//! # }
//! ```

pub mod artifact;
pub mod backend;
pub mod config;
pub mod events;
pub mod export;
pub mod procstats;
pub mod profiler;
pub mod state;

pub use backend::{BackendError, ExportStream, ProfileBackend, ProfileHandle};
pub use config::{ConfigError, ProfilerConfig};
pub use events::ProfilerEvent;
pub use export::ExportError;
pub use procstats::ProcStatsBackend;
pub use profiler::{ProfilerError, SignalProfiler};
pub use state::ProfilerState;
