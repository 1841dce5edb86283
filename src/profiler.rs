/// Signal-triggered profiler: owns the state machine, the OS signal
/// listeners, and the export coordination.
///
/// All state lives on a single actor task. Signal arrivals, subscription
/// registrations, and export completions are messages into that task; the
/// debounce timer is a `select!` arm over an optional deadline. Export byte
/// copying runs on a spawned task, but the profile handle stays with the
/// actor so it is released exactly once.
use crate::artifact::{artifact_path, ArtifactKind};
use crate::backend::{ProfileBackend, ProfileHandle};
use crate::config::ProfilerConfig;
use crate::events::ProfilerEvent;
use crate::export::{write_artifact, ExportError};
use crate::state::{SignalDisposition, StateMachine};
use std::path::PathBuf;
use std::time::Duration;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Errors from profiler lifecycle operations.
#[derive(Debug)]
pub enum ProfilerError {
    /// Failed to create the artifact output directory.
    OutputDir {
        path: PathBuf,
        source: std::io::Error,
    },
    /// A configured signal name is not supported.
    UnknownSignal(String),
    /// The OS rejected the signal handler registration.
    Register {
        signal: String,
        source: std::io::Error,
    },
}

impl std::fmt::Display for ProfilerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProfilerError::OutputDir { path, source } => {
                write!(
                    f,
                    "failed to create output directory {}: {}",
                    path.display(),
                    source
                )
            }
            ProfilerError::UnknownSignal(name) => write!(f, "unknown signal name: {}", name),
            ProfilerError::Register { signal, source } => {
                write!(f, "failed to register handler for {}: {}", signal, source)
            }
        }
    }
}

impl std::error::Error for ProfilerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProfilerError::OutputDir { source, .. } | ProfilerError::Register { source, .. } => {
                Some(source)
            }
            ProfilerError::UnknownSignal(_) => None,
        }
    }
}

enum Msg {
    Signal { name: String },
    Subscribe(mpsc::UnboundedSender<ProfilerEvent>),
    ExportSettled { result: Result<u64, ExportError>, path: PathBuf },
}

/// Signal-triggered profiler over a pluggable [`ProfileBackend`].
///
/// Must be constructed inside a tokio runtime. OS signals are only routed
/// after [`install`](Self::install); [`trigger`](Self::trigger) injects a
/// capture request directly, installed or not. Dropping the profiler
/// uninstalls the listeners and stops the actor.
pub struct SignalProfiler {
    config: ProfilerConfig,
    tx: mpsc::UnboundedSender<Msg>,
    actor: JoinHandle<()>,
    listeners: Vec<JoinHandle<()>>,
}

impl SignalProfiler {
    pub fn new<B: ProfileBackend>(config: ProfilerConfig, backend: B) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let actor = Actor {
            rx,
            tx: tx.clone(),
            backend,
            machine: StateMachine::new(config.debounce_window()),
            window: config.debounce_window(),
            output_dir: config.output_dir.clone(),
            subscribers: Vec::new(),
            deadline: None,
            in_flight: None,
        };
        let actor = tokio::spawn(actor.run());
        Self {
            config,
            tx,
            actor,
            listeners: Vec::new(),
        }
    }

    /// Subscribe to lifecycle events. Events already emitted are not replayed.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<ProfilerEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let _ = self.tx.send(Msg::Subscribe(tx));
        rx
    }

    /// Inject a qualifying capture request, as if the named signal arrived.
    pub fn trigger(&self, name: &str) {
        let _ = self.tx.send(Msg::Signal {
            name: name.to_string(),
        });
    }

    /// Register handlers for the configured signals and create the output
    /// directory. Idempotent: a second call while installed is a no-op.
    pub fn install(&mut self) -> Result<(), ProfilerError> {
        if !self.listeners.is_empty() {
            return Ok(());
        }
        std::fs::create_dir_all(&self.config.output_dir).map_err(|source| {
            ProfilerError::OutputDir {
                path: self.config.output_dir.clone(),
                source,
            }
        })?;
        for name in &self.config.signals {
            let kind = parse_signal_name(name)
                .ok_or_else(|| ProfilerError::UnknownSignal(name.clone()))?;
            let mut stream = signal(kind).map_err(|source| ProfilerError::Register {
                signal: name.clone(),
                source,
            })?;
            let tx = self.tx.clone();
            let name = name.clone();
            self.listeners.push(tokio::spawn(async move {
                while stream.recv().await.is_some() {
                    let _ = tx.send(Msg::Signal { name: name.clone() });
                }
            }));
        }
        tracing::info!(signals = ?self.config.signals, "signal handlers installed");
        Ok(())
    }

    /// Stop routing OS signals to the state machine. Idempotent.
    /// An in-flight export is unaffected and settles normally.
    pub fn uninstall(&mut self) {
        for listener in self.listeners.drain(..) {
            listener.abort();
        }
    }

    pub fn is_installed(&self) -> bool {
        !self.listeners.is_empty()
    }
}

impl Drop for SignalProfiler {
    fn drop(&mut self) {
        self.uninstall();
        self.actor.abort();
    }
}

/// Map a configured signal name to a tokio [`SignalKind`].
fn parse_signal_name(name: &str) -> Option<SignalKind> {
    match name {
        "SIGUSR1" | "USR1" => Some(SignalKind::user_defined1()),
        "SIGUSR2" | "USR2" => Some(SignalKind::user_defined2()),
        "SIGHUP" | "HUP" => Some(SignalKind::hangup()),
        _ => None,
    }
}

struct Actor<B: ProfileBackend> {
    rx: mpsc::UnboundedReceiver<Msg>,
    tx: mpsc::UnboundedSender<Msg>,
    backend: B,
    machine: StateMachine,
    window: Duration,
    output_dir: PathBuf,
    subscribers: Vec<mpsc::UnboundedSender<ProfilerEvent>>,
    deadline: Option<Instant>,
    in_flight: Option<ProfileHandle>,
}

impl<B: ProfileBackend> Actor<B> {
    async fn run(mut self) {
        loop {
            let deadline = self.deadline;
            tokio::select! {
                msg = self.rx.recv() => match msg {
                    Some(msg) => self.handle(msg),
                    None => break,
                },
                _ = sleep_or_pending(deadline) => self.timer_fired(),
            }
        }
    }

    fn handle(&mut self, msg: Msg) {
        match msg {
            Msg::Subscribe(tx) => self.subscribers.push(tx),
            Msg::Signal { name } => self.on_signal(&name),
            Msg::ExportSettled { result, path } => self.on_export_settled(result, path),
        }
    }

    fn on_signal(&mut self, name: &str) {
        self.emit(ProfilerEvent::Signal {
            name: name.to_string(),
        });
        let now = Instant::now();
        match self.machine.on_signal(now.into_std()) {
            SignalDisposition::RejectBusy => {
                tracing::warn!(signal = name, "still busy, cannot start/stop a capture now");
                self.emit(ProfilerEvent::Busy);
            }
            SignalDisposition::ArmTimer => {
                tracing::debug!(
                    signal = name,
                    window_ms = self.window.as_millis() as u64,
                    "first signal, waiting for a possible pair"
                );
                self.deadline = Some(now + self.window);
            }
            SignalDisposition::TakeSnapshot => {
                self.deadline = None;
                tracing::info!("capturing heap snapshot");
                match self.backend.take_snapshot() {
                    Some(handle) => self.begin_export(handle, ArtifactKind::Snapshot),
                    None => {
                        tracing::warn!("unable to obtain heap snapshot");
                        self.machine.on_settled();
                    }
                }
            }
            SignalDisposition::StopTrace => match self.backend.stop_trace() {
                Some(handle) => self.begin_export(handle, ArtifactKind::Trace),
                None => {
                    tracing::warn!("unable to obtain execution profile");
                    self.machine.on_settled();
                }
            },
        }
    }

    fn timer_fired(&mut self) {
        self.deadline = None;
        if self.machine.on_timer_fired() {
            tracing::info!("capturing execution profile");
            self.backend.start_trace();
        }
    }

    fn begin_export(&mut self, handle: ProfileHandle, kind: ArtifactKind) {
        let path = artifact_path(&self.output_dir, kind);
        match self.backend.export(handle) {
            Ok(stream) => {
                self.in_flight = Some(handle);
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    let result = write_artifact(stream, &path).await;
                    let _ = tx.send(Msg::ExportSettled { result, path });
                });
            }
            Err(error) => {
                tracing::warn!(%error, "unable to open export stream");
                self.backend.release(handle);
                self.emit(ProfilerEvent::Error {
                    message: error.to_string(),
                });
                self.machine.on_settled();
            }
        }
    }

    fn on_export_settled(&mut self, result: Result<u64, ExportError>, path: PathBuf) {
        if let Some(handle) = self.in_flight.take() {
            self.backend.release(handle);
        }
        match result {
            Ok(bytes) => {
                tracing::info!(path = %path.display(), bytes, "saved capture");
                self.emit(ProfilerEvent::Finish { path });
            }
            Err(error) => {
                tracing::warn!(%error, "unable to save capture");
                self.emit(ProfilerEvent::Error {
                    message: error.to_string(),
                });
            }
        }
        self.machine.on_settled();
    }

    fn emit(&mut self, event: ProfilerEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

async fn sleep_or_pending(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
