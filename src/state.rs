/// Debounce / mode-disambiguation state machine.
///
/// A single isolated signal toggles execution tracing; two signals spaced
/// closer than the debounce window request a heap snapshot instead. The
/// backend cannot retroactively un-start a trace, so a lone signal only
/// commits to trace mode after the window has passed without a second signal.
///
/// Pure state, no timers or I/O: the owner feeds in signal arrivals (with a
/// monotonic `now`), timer expiries, and capture settlements, and acts on the
/// returned dispositions.
use std::time::{Duration, Instant};

/// Where the profiler is in its capture lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfilerState {
    /// Nothing pending.
    Idle,
    /// A first signal arrived; waiting out the debounce window before
    /// committing to trace mode.
    PendingTraceStart,
    /// An execution trace is being collected.
    Tracing,
    /// A capture or export is in flight; further signals are rejected.
    Busy,
}

/// What the owner should do in response to a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalDisposition {
    /// First signal of a potential pair: arm the debounce timer.
    ArmTimer,
    /// Second signal within the window: take a heap snapshot now.
    TakeSnapshot,
    /// Signal while tracing: stop the trace and export it.
    StopTrace,
    /// Signal while busy: drop it and emit a busy notification.
    RejectBusy,
}

#[derive(Debug)]
pub struct StateMachine {
    state: ProfilerState,
    window: Duration,
    last_signal: Option<Instant>,
}

impl StateMachine {
    pub fn new(window: Duration) -> Self {
        Self {
            state: ProfilerState::Idle,
            window,
            last_signal: None,
        }
    }

    pub fn state(&self) -> ProfilerState {
        self.state
    }

    /// Process a qualifying signal arriving at `now`.
    ///
    /// The last-signal timestamp is only updated by signals that become the
    /// first of a potential pair; it is consumed when the pair is matched or
    /// the timer fires, and signals rejected while Busy never touch it.
    pub fn on_signal(&mut self, now: Instant) -> SignalDisposition {
        match self.state {
            ProfilerState::Busy => SignalDisposition::RejectBusy,
            ProfilerState::Tracing => {
                // Stopping is a single unambiguous action: no debounce here.
                self.state = ProfilerState::Busy;
                self.last_signal = None;
                SignalDisposition::StopTrace
            }
            ProfilerState::Idle | ProfilerState::PendingTraceStart => {
                let paired = self
                    .last_signal
                    .is_some_and(|last| now.duration_since(last) < self.window);
                if paired {
                    self.state = ProfilerState::Busy;
                    self.last_signal = None;
                    SignalDisposition::TakeSnapshot
                } else {
                    self.state = ProfilerState::PendingTraceStart;
                    self.last_signal = Some(now);
                    SignalDisposition::ArmTimer
                }
            }
        }
    }

    /// The debounce timer expired with no second signal.
    ///
    /// Returns `true` if the machine moved to Tracing and the owner should
    /// start the trace. A stale expiry in any other state is a no-op.
    pub fn on_timer_fired(&mut self) -> bool {
        if self.state == ProfilerState::PendingTraceStart {
            self.state = ProfilerState::Tracing;
            self.last_signal = None;
            true
        } else {
            false
        }
    }

    /// A capture settled: the export finished (either outcome) or the backend
    /// produced no handle. Returns the machine to Idle.
    pub fn on_settled(&mut self) {
        self.state = ProfilerState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_millis(50);

    fn machine() -> (StateMachine, Instant) {
        (StateMachine::new(WINDOW), Instant::now())
    }

    #[test]
    fn test_single_signal_arms_timer() {
        let (mut sm, t0) = machine();
        assert_eq!(sm.on_signal(t0), SignalDisposition::ArmTimer);
        assert_eq!(sm.state(), ProfilerState::PendingTraceStart);
    }

    #[test]
    fn test_timer_expiry_starts_tracing() {
        let (mut sm, t0) = machine();
        sm.on_signal(t0);
        assert!(sm.on_timer_fired());
        assert_eq!(sm.state(), ProfilerState::Tracing);
    }

    #[test]
    fn test_pair_within_window_takes_snapshot() {
        let (mut sm, t0) = machine();
        sm.on_signal(t0);
        let second = sm.on_signal(t0 + Duration::from_millis(10));
        assert_eq!(second, SignalDisposition::TakeSnapshot);
        assert_eq!(sm.state(), ProfilerState::Busy);
    }

    #[test]
    fn test_pair_at_exact_window_boundary_is_not_a_pair() {
        let (mut sm, t0) = machine();
        sm.on_signal(t0);
        // window is exclusive: spacing == window re-arms instead of snapshotting
        assert_eq!(sm.on_signal(t0 + WINDOW), SignalDisposition::ArmTimer);
        assert_eq!(sm.state(), ProfilerState::PendingTraceStart);
    }

    #[test]
    fn test_signal_while_tracing_stops_the_trace() {
        let (mut sm, t0) = machine();
        sm.on_signal(t0);
        sm.on_timer_fired();
        let stop = sm.on_signal(t0 + Duration::from_secs(5));
        assert_eq!(stop, SignalDisposition::StopTrace);
        assert_eq!(sm.state(), ProfilerState::Busy);
    }

    #[test]
    fn test_stop_is_not_debounced() {
        let (mut sm, t0) = machine();
        sm.on_signal(t0);
        sm.on_timer_fired();
        // back-to-back signals while tracing: first stops, second is rejected
        let t1 = t0 + Duration::from_millis(100);
        assert_eq!(sm.on_signal(t1), SignalDisposition::StopTrace);
        assert_eq!(
            sm.on_signal(t1 + Duration::from_millis(1)),
            SignalDisposition::RejectBusy
        );
    }

    #[test]
    fn test_signal_while_busy_is_rejected_and_state_unchanged() {
        let (mut sm, t0) = machine();
        sm.on_signal(t0);
        sm.on_signal(t0 + Duration::from_millis(1));
        assert_eq!(sm.state(), ProfilerState::Busy);
        assert_eq!(
            sm.on_signal(t0 + Duration::from_millis(2)),
            SignalDisposition::RejectBusy
        );
        assert_eq!(sm.state(), ProfilerState::Busy);
    }

    #[test]
    fn test_rejected_signal_does_not_count_toward_a_pair() {
        let (mut sm, t0) = machine();
        sm.on_signal(t0);
        sm.on_signal(t0 + Duration::from_millis(1)); // snapshot, now Busy
        sm.on_signal(t0 + Duration::from_millis(2)); // rejected
        sm.on_settled();
        // next signal right after settling is a fresh first signal, not the
        // second of a pair with the rejected one
        assert_eq!(
            sm.on_signal(t0 + Duration::from_millis(3)),
            SignalDisposition::ArmTimer
        );
    }

    #[test]
    fn test_settle_returns_to_idle_and_cycle_repeats() {
        let (mut sm, t0) = machine();
        sm.on_signal(t0);
        sm.on_signal(t0 + Duration::from_millis(5));
        sm.on_settled();
        assert_eq!(sm.state(), ProfilerState::Idle);

        let t1 = t0 + Duration::from_secs(1);
        assert_eq!(sm.on_signal(t1), SignalDisposition::ArmTimer);
        assert!(sm.on_timer_fired());
        assert_eq!(
            sm.on_signal(t1 + Duration::from_secs(1)),
            SignalDisposition::StopTrace
        );
        sm.on_settled();
        assert_eq!(sm.state(), ProfilerState::Idle);
    }

    #[test]
    fn test_stale_timer_expiry_is_a_noop() {
        let (mut sm, t0) = machine();
        assert!(!sm.on_timer_fired());
        assert_eq!(sm.state(), ProfilerState::Idle);

        sm.on_signal(t0);
        sm.on_signal(t0 + Duration::from_millis(1)); // Busy
        assert!(!sm.on_timer_fired());
        assert_eq!(sm.state(), ProfilerState::Busy);
    }
}
