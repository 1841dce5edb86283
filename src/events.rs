use std::path::PathBuf;

/// Lifecycle notifications emitted by the profiler.
///
/// Subscribers receive every event in processing order: one `Signal` per
/// qualifying signal, a `Busy` for each signal rejected while a capture is in
/// flight, and exactly one `Finish` or `Error` per export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfilerEvent {
    /// A qualifying signal was received (e.g. "SIGUSR1").
    Signal { name: String },
    /// A signal arrived while a capture/export was in flight and was dropped.
    Busy,
    /// An artifact was written successfully.
    Finish { path: PathBuf },
    /// Export failed; no artifact was produced this time.
    Error { message: String },
}
