use tokio::io::AsyncRead;

/// Opaque reference to a completed capture, owned by the backend until
/// released. The core never inspects a handle; it only passes it back to
/// [`ProfileBackend::export`] and [`ProfileBackend::release`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProfileHandle(u64);

impl ProfileHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(self) -> u64 {
        self.0
    }
}

/// Byte stream produced by exporting a capture.
pub type ExportStream = Box<dyn AsyncRead + Send + Unpin>;

/// Errors surfaced by a profiling backend.
#[derive(Debug)]
pub enum BackendError {
    /// The handle does not refer to a live capture (already released, or
    /// never issued by this backend).
    UnknownHandle(ProfileHandle),
    /// The backend failed to open a serialization stream for the capture.
    Stream {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::UnknownHandle(handle) => {
                write!(f, "unknown profile handle {}", handle.id())
            }
            BackendError::Stream { source } => {
                write!(f, "failed to open export stream: {}", source)
            }
        }
    }
}

impl std::error::Error for BackendError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BackendError::UnknownHandle(_) => None,
            BackendError::Stream { source } => Some(source.as_ref()),
        }
    }
}

/// Capture and export primitives supplied by a profiling implementation.
///
/// The profiler drives a backend from its single actor task, so
/// implementations need no internal synchronization. `start_trace` and
/// `stop_trace` bracket an execution trace; `take_snapshot` captures
/// immediately. Handles returned by `stop_trace`/`take_snapshot` stay owned
/// by the backend until `release`, which the profiler calls exactly once per
/// handle after the export settles (or fails to start).
pub trait ProfileBackend: Send + 'static {
    /// Begin collecting an execution trace.
    fn start_trace(&mut self);

    /// Stop the current trace. `None` means no trace data was available.
    fn stop_trace(&mut self) -> Option<ProfileHandle>;

    /// Capture a heap snapshot. `None` means the capture was unavailable.
    fn take_snapshot(&mut self) -> Option<ProfileHandle>;

    /// Open a byte stream serializing the capture behind `handle`.
    fn export(&mut self, handle: ProfileHandle) -> Result<ExportStream, BackendError>;

    /// Discard the capture behind `handle`, freeing backend resources.
    fn release(&mut self, handle: ProfileHandle);
}
