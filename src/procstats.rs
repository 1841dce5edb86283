/// Built-in [`ProfileBackend`] backed by `/proc/self` counters.
///
/// Stands in for a native profiling library so the binary works out of the
/// box: a trace records CPU-time deltas between start and stop, a snapshot
/// records the current memory fields from `/proc/self/status`. Captures are
/// serialized as pretty-printed JSON documents.
use crate::backend::{BackendError, ExportStream, ProfileBackend, ProfileHandle};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::io;
use std::time::Instant;

/// Memory/status fields included in a heap snapshot.
const SNAPSHOT_FIELDS: &[&str] = &["VmSize", "VmRSS", "VmHWM", "VmData", "VmStk", "Threads"];

#[derive(Debug)]
struct TraceStart {
    started_at: DateTime<Utc>,
    begun: Instant,
    utime_ticks: u64,
    stime_ticks: u64,
}

#[derive(Debug, Default)]
pub struct ProcStatsBackend {
    next_id: u64,
    captures: HashMap<u64, Vec<u8>>,
    trace_start: Option<TraceStart>,
}

impl ProcStatsBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn store(&mut self, doc: serde_json::Value) -> Option<ProfileHandle> {
        match serde_json::to_vec_pretty(&doc) {
            Ok(bytes) => {
                self.next_id += 1;
                self.captures.insert(self.next_id, bytes);
                Some(ProfileHandle::new(self.next_id))
            }
            Err(error) => {
                tracing::warn!(%error, "failed to serialize capture");
                None
            }
        }
    }
}

impl ProfileBackend for ProcStatsBackend {
    fn start_trace(&mut self) {
        match read_cpu_ticks() {
            Ok((utime_ticks, stime_ticks)) => {
                self.trace_start = Some(TraceStart {
                    started_at: Utc::now(),
                    begun: Instant::now(),
                    utime_ticks,
                    stime_ticks,
                });
            }
            Err(error) => {
                tracing::warn!(%error, "failed to read /proc/self/stat, trace unavailable");
                self.trace_start = None;
            }
        }
    }

    fn stop_trace(&mut self) -> Option<ProfileHandle> {
        let start = self.trace_start.take()?;
        let (utime_ticks, stime_ticks) = match read_cpu_ticks() {
            Ok(ticks) => ticks,
            Err(error) => {
                tracing::warn!(%error, "failed to read /proc/self/stat at trace stop");
                return None;
            }
        };
        let doc = serde_json::json!({
            "kind": "execution-trace",
            "pid": std::process::id(),
            "started_at": start.started_at,
            "stopped_at": Utc::now(),
            "wall_ms": start.begun.elapsed().as_millis() as u64,
            "utime_ticks": utime_ticks.saturating_sub(start.utime_ticks),
            "stime_ticks": stime_ticks.saturating_sub(start.stime_ticks),
        });
        self.store(doc)
    }

    fn take_snapshot(&mut self) -> Option<ProfileHandle> {
        let status = match std::fs::read_to_string("/proc/self/status") {
            Ok(text) => text,
            Err(error) => {
                tracing::warn!(%error, "failed to read /proc/self/status");
                return None;
            }
        };
        let doc = serde_json::json!({
            "kind": "heap-snapshot",
            "pid": std::process::id(),
            "captured_at": Utc::now(),
            "status_kb": parse_status_fields(&status),
        });
        self.store(doc)
    }

    fn export(&mut self, handle: ProfileHandle) -> Result<ExportStream, BackendError> {
        match self.captures.get(&handle.id()) {
            Some(bytes) => Ok(Box::new(io::Cursor::new(bytes.clone()))),
            None => Err(BackendError::UnknownHandle(handle)),
        }
    }

    fn release(&mut self, handle: ProfileHandle) {
        self.captures.remove(&handle.id());
    }
}

fn read_cpu_ticks() -> io::Result<(u64, u64)> {
    let stat = std::fs::read_to_string("/proc/self/stat")?;
    parse_stat_cpu(&stat).ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidData, "unparseable /proc/self/stat")
    })
}

/// Extract (utime, stime) in clock ticks from a `/proc/<pid>/stat` line.
///
/// The comm field may contain spaces and parentheses, so parsing starts after
/// the last `)`; utime and stime are then the 12th and 13th fields.
fn parse_stat_cpu(stat: &str) -> Option<(u64, u64)> {
    let rest = stat.rsplit_once(')')?.1;
    let mut fields = rest.split_ascii_whitespace();
    let utime = fields.nth(11)?.parse().ok()?;
    let stime = fields.next()?.parse().ok()?;
    Some((utime, stime))
}

/// Pull the snapshot fields out of `/proc/<pid>/status` text.
///
/// Values are in kB except `Threads`, which is a plain count.
fn parse_status_fields(text: &str) -> BTreeMap<String, u64> {
    let mut fields = BTreeMap::new();
    for line in text.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        if !SNAPSHOT_FIELDS.contains(&key) {
            continue;
        }
        let number = value.trim().trim_end_matches("kB").trim();
        if let Ok(parsed) = number.parse::<u64>() {
            fields.insert(key.to_string(), parsed);
        }
    }
    fields
}
