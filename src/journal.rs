//! JSONL session journal with daily rotation.
//!
//! Notifications are queued on a bounded channel and written by a single
//! blocking-pool thread; a full queue drops the event instead of stalling the caller.

use std::fs::{create_dir_all, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use common::{Notification, Reporter};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::warn;
use uuid::Uuid;

const BOT_JOURNAL_DIR: &str = "trivia-bot";
const JOURNAL_QUEUE_DEPTH: usize = 256;

pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn resolve_repo_root() -> Option<PathBuf> {
    let mut cursor = std::env::current_dir().ok()?;
    loop {
        if cursor.join(".git").is_dir() {
            return Some(cursor);
        }
        if !cursor.pop() {
            return None;
        }
    }
}

/// Configured directory, else `<repo root>/JOURNAL/trivia-bot`, else a
/// relative `JOURNAL/trivia-bot`.
pub fn resolve_journal_dir(configured: Option<&str>) -> PathBuf {
    if let Some(raw) = configured {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed);
        }
    }

    if let Some(root) = resolve_repo_root() {
        return root.join("JOURNAL").join(BOT_JOURNAL_DIR);
    }

    PathBuf::from("JOURNAL").join(BOT_JOURNAL_DIR)
}

pub struct SessionJournal {
    dir: PathBuf,
    day_key: String,
    file: File,
}

impl SessionJournal {
    pub fn open(dir: PathBuf) -> std::io::Result<Self> {
        create_dir_all(&dir)?;
        let day_key = Utc::now().format("%Y-%m-%d").to_string();
        let file = Self::open_day_file(&dir, &day_key)?;
        Ok(Self { dir, day_key, file })
    }

    fn open_day_file(dir: &Path, day_key: &str) -> std::io::Result<File> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join(format!("session-{}.jsonl", day_key)))
    }

    fn rotate_if_needed(&mut self) -> std::io::Result<()> {
        let today = Utc::now().format("%Y-%m-%d").to_string();
        if today != self.day_key {
            self.file = Self::open_day_file(&self.dir, &today)?;
            self.day_key = today;
        }
        Ok(())
    }

    pub fn write_event(&mut self, event: &Value) {
        let write_result = (|| -> std::io::Result<()> {
            self.rotate_if_needed()?;
            let line = serde_json::to_string(event).unwrap_or_else(|_| "{}".to_string());
            writeln!(self.file, "{}", line)?;
            self.file.flush()?;
            Ok(())
        })();

        if let Err(e) = write_result {
            warn!("Session journal write failed: {}", e);
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Queues journal events for the writer task.
#[derive(Clone)]
pub struct JournalReporter {
    run_id: String,
    tx: mpsc::Sender<Value>,
}

impl JournalReporter {
    /// Start the writer on the blocking pool, since file writes block. It
    /// exits once every reporter clone is dropped.
    pub fn spawn(mut journal: SessionJournal) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<Value>(JOURNAL_QUEUE_DEPTH);
        let handle = tokio::task::spawn_blocking(move || {
            while let Some(event) = rx.blocking_recv() {
                journal.write_event(&event);
            }
        });
        let reporter = Self {
            run_id: Uuid::new_v4().to_string(),
            tx,
        };
        (reporter, handle)
    }

    /// Journal an event that is not a stage notification (start, shutdown).
    pub fn record(&self, kind: &str, detail: Value) {
        self.enqueue(json!({
            "ts": now_iso(),
            "run": self.run_id,
            "kind": kind,
            "detail": detail,
        }));
    }

    fn enqueue(&self, event: Value) {
        if let Err(e) = self.tx.try_send(event) {
            warn!("Session journal dropped an event: {}", e);
        }
    }
}

impl Reporter for JournalReporter {
    fn notify(&self, notification: Notification) {
        let mut event = json!({
            "ts": now_iso(),
            "run": self.run_id,
            "kind": notification.stage(),
            "payload": notification.payload(),
        });
        match &notification {
            Notification::Prediction(p) => {
                event["per_method_best"] = json!(p.per_method_best);
            }
            Notification::Outcome {
                predicted,
                accuracy,
                ..
            } => {
                event["predicted"] = json!(predicted);
                event["accuracy"] = json!(accuracy);
            }
            Notification::Ended { reason } => {
                event["reason"] = json!(reason);
            }
            _ => {}
        }
        self.enqueue(event);
    }
}
