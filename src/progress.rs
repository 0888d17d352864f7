//! Cleanup progress reporting.
//!
//! Reports each step of an orphan cleanup so users see which collection is
//! being deleted and which ones failed. Progress is emitted on **stderr** so
//! stdout remains parseable for scripts.

use std::io::Write;

/// A single progress event for an orphan cleanup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CleanupEvent {
    /// About to delete orphan `n` of `total`.
    Deleting { name: String, n: u64, total: u64 },
    /// The delete for `name` failed; the batch continues.
    Failed { name: String, message: String },
    /// Batch finished.
    Done { deleted: u64, failed: u64 },
}

/// Receives cleanup progress. Implementations write to stderr (human or JSON).
pub trait CleanupReporter: Send + Sync {
    fn report(&self, event: CleanupEvent);
}

/// Human-friendly progress on stderr: "cleanup  deleting  2 / 5  kb_old".
pub struct StderrProgress;

impl CleanupReporter for StderrProgress {
    fn report(&self, event: CleanupEvent) {
        let mut err = std::io::stderr().lock();
        let _ = writeln!(err, "{}", event_line(&event));
        let _ = err.flush();
    }
}

fn event_line(event: &CleanupEvent) -> String {
    match event {
        CleanupEvent::Deleting { name, n, total } => {
            let width = total.to_string().len();
            format!("cleanup  deleting  {n:>width$} / {total}  {name}")
        }
        CleanupEvent::Failed { name, message } => {
            format!("cleanup  FAILED    {name}: {message}")
        }
        CleanupEvent::Done { deleted, failed } => {
            format!("cleanup  done  {deleted} deleted, {failed} failed")
        }
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl CleanupReporter for JsonProgress {
    fn report(&self, event: CleanupEvent) {
        let obj = event_json(&event);
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

fn event_json(event: &CleanupEvent) -> serde_json::Value {
    match event {
        CleanupEvent::Deleting { name, n, total } => serde_json::json!({
            "event": "progress",
            "phase": "deleting",
            "collection": name,
            "n": n,
            "total": total
        }),
        CleanupEvent::Failed { name, message } => serde_json::json!({
            "event": "failed",
            "collection": name,
            "message": message
        }),
        CleanupEvent::Done { deleted, failed } => serde_json::json!({
            "event": "done",
            "deleted": deleted,
            "failed": failed
        }),
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl CleanupReporter for NoProgress {
    fn report(&self, _event: CleanupEvent) {}
}

/// Where cleanup progress goes.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Human lines when stderr is a terminal, nothing when piped.
    pub fn detect() -> Self {
        match atty::is(atty::Stream::Stderr) {
            true => ProgressMode::Human,
            false => ProgressMode::Off,
        }
    }

    pub fn reporter(self) -> Box<dyn CleanupReporter> {
        match self {
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
            ProgressMode::Off => Box::new(NoProgress),
        }
    }
}
