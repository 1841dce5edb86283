use clap::Parser;
use sigprof::{ProcStatsBackend, ProfilerConfig, ProfilerEvent, SignalProfiler};
use std::path::PathBuf;

/// Signal-triggered runtime profiler: send the process one signal to toggle
/// an execution trace, or two in quick succession to take a heap snapshot.
/// Artifacts are written to timestamped files in the output directory.
#[derive(Parser, Debug)]
#[command(name = "sigprof", version, about)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "sigprof.toml")]
    config: PathBuf,

    /// Output directory (overrides config)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Debounce window in milliseconds (overrides config)
    #[arg(long)]
    debounce_ms: Option<u64>,

    /// Signal to listen on, e.g. SIGUSR1 (repeatable, overrides config)
    #[arg(short, long)]
    signal: Vec<String>,

    /// Extra logging (state transitions, debounce decisions)
    #[arg(short, long)]
    verbose: bool,

    /// Only errors
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.quiet {
        "warn"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .init();

    let mut config = match ProfilerConfig::load(&cli.config) {
        Ok(config) => config,
        Err(error) => {
            tracing::error!(%error, "cannot load configuration");
            std::process::exit(1);
        }
    };
    if let Some(output_dir) = cli.output_dir {
        config.output_dir = output_dir;
    }
    if let Some(debounce_ms) = cli.debounce_ms {
        config.debounce_ms = debounce_ms;
    }
    if !cli.signal.is_empty() {
        config.signals = cli.signal;
    }

    let mut profiler = SignalProfiler::new(config.clone(), ProcStatsBackend::new());
    let mut events = profiler.subscribe();
    if let Err(error) = profiler.install() {
        tracing::error!(%error, "cannot install signal handlers");
        std::process::exit(1);
    }

    tracing::info!(
        pid = std::process::id(),
        signals = ?config.signals,
        output_dir = %config.output_dir.display(),
        debounce_ms = config.debounce_ms,
        "armed; signal this process to capture"
    );

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutting down");
                break;
            }
            Some(event) = events.recv() => match event {
                ProfilerEvent::Signal { name } => tracing::debug!(signal = %name, "capture request"),
                ProfilerEvent::Busy => tracing::warn!("capture request dropped, export in flight"),
                ProfilerEvent::Finish { path } => tracing::info!(path = %path.display(), "artifact written"),
                ProfilerEvent::Error { message } => tracing::warn!(%message, "capture failed"),
            }
        }
    }
    profiler.uninstall();
}
