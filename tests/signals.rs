//! End-to-end signal handling: real SIGUSR1 delivery through the installed
//! profiler, plus uninstall and double-install behavior.
//!
//! Everything runs in one test function: signal handlers are process-global,
//! so parallel test functions raising SIGUSR1 would interfere.

use nix::sys::signal::{raise, Signal};
use sigprof::{ProcStatsBackend, ProfilerConfig, ProfilerEvent, SignalProfiler};
use std::time::Duration;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::timeout;

async fn wait_for(
    events: &mut UnboundedReceiver<ProfilerEvent>,
    matches: impl Fn(&ProfilerEvent) -> bool,
) -> ProfilerEvent {
    timeout(Duration::from_secs(5), async {
        loop {
            let event = events.recv().await.expect("event channel closed");
            if matches(&event) {
                return event;
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

fn artifact_names(dir: &std::path::Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn test_signal_lifecycle_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let config = ProfilerConfig {
        debounce_ms: 40,
        output_dir: dir.path().to_path_buf(),
        signals: vec!["SIGUSR1".to_string()],
    };
    let mut profiler = SignalProfiler::new(config, ProcStatsBackend::new());
    let mut events = profiler.subscribe();

    profiler.install().unwrap();
    profiler.install().unwrap(); // idempotent, must not double-register
    assert!(profiler.is_installed());

    // One physical signal: exactly one Signal event, then the debounce timer
    // starts a trace. No artifact yet.
    raise(Signal::SIGUSR1).unwrap();
    let event = wait_for(&mut events, |e| matches!(e, ProfilerEvent::Signal { .. })).await;
    assert_eq!(
        event,
        ProfilerEvent::Signal {
            name: "SIGUSR1".to_string()
        }
    );
    tokio::time::sleep(Duration::from_millis(250)).await;
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
    assert!(artifact_names(dir.path()).is_empty());

    // Second signal, well past the window: stops the trace and exports it.
    raise(Signal::SIGUSR1).unwrap();
    let finish = wait_for(&mut events, |e| matches!(e, ProfilerEvent::Finish { .. })).await;
    let first_artifact = match finish {
        ProfilerEvent::Finish { path } => path.file_name().unwrap().to_string_lossy().into_owned(),
        _ => unreachable!(),
    };
    assert!(first_artifact.starts_with("trace-"));
    assert!(first_artifact.ends_with(".cpuprofile"));
    assert_eq!(artifact_names(dir.path()), vec![first_artifact.clone()]);

    // Uninstalled: the signal is lost, zero notifications of any kind.
    profiler.uninstall();
    assert!(!profiler.is_installed());
    raise(Signal::SIGUSR1).unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
    assert_eq!(artifact_names(dir.path()).len(), 1);

    // Reinstall: capture works again; a full toggle yields a second artifact.
    profiler.install().unwrap();
    raise(Signal::SIGUSR1).unwrap();
    wait_for(&mut events, |e| matches!(e, ProfilerEvent::Signal { .. })).await;
    tokio::time::sleep(Duration::from_millis(250)).await;
    raise(Signal::SIGUSR1).unwrap();
    wait_for(&mut events, |e| matches!(e, ProfilerEvent::Finish { .. })).await;

    // Two trace artifacts now; lexical order equals creation order.
    let names = artifact_names(dir.path());
    assert_eq!(names.len(), 2);
    assert_eq!(names[0], first_artifact);

    profiler.uninstall();
}
