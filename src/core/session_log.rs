//! Session log
//!
//! Append-only record of everything the tool did during one session.
//! Entries live in memory (what the console shows, cleared on request) and are
//! mirrored line by line into a per-session file that is never truncated.
//! Writes to the file are best-effort: a failing disk never fails the session.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use chrono::{DateTime, Local, NaiveTime};
use crossbeam_channel::{Receiver, Sender};
use regex_lite::Regex;

use super::log_entry::{Classification, LogEntry, PersistedLine};

/// Notice appended after the in-memory view is cleared
pub const CLEARED_NOTICE: &str = "Log window cleared by user.";

/// Change notification delivered to subscribers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEvent {
    /// An entry was appended
    Appended(LogEntry),
    /// The in-memory view was emptied
    Cleared,
}

struct Inner {
    entries: Vec<LogEntry>,
    mirror: Option<PathBuf>,
    subscribers: Vec<Sender<LogEvent>>,
}

/// Shared handle to the session log. Cloning is cheap; all clones append to
/// the same sequence and file.
#[derive(Clone)]
pub struct SessionLog {
    inner: Arc<Mutex<Inner>>,
}

impl SessionLog {
    /// Open a session log whose mirror lives in `log_dir`, named after the
    /// session start time.
    pub fn open(log_dir: &Path, started_at: DateTime<Local>) -> Self {
        if let Err(e) = std::fs::create_dir_all(log_dir) {
            tracing::warn!("Could not create log directory {}: {}", log_dir.display(), e);
        }
        Self::with_mirror(Some(log_dir.join(mirror_file_name(started_at))))
    }

    /// A session log without a file mirror
    pub fn in_memory() -> Self {
        Self::with_mirror(None)
    }

    fn with_mirror(mirror: Option<PathBuf>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                entries: Vec::new(),
                mirror,
                subscribers: Vec::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panicking subscriber must not take the log down with it
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Append an entry to memory and the file mirror, then notify subscribers.
    ///
    /// The whole line is written under the lock with a single write, so
    /// concurrent appends never interleave inside a line.
    pub fn append(&self, entry: LogEntry) {
        let mut inner = self.lock();

        if let Some(path) = &inner.mirror {
            write_mirror_line(path, &entry.format_line());
        }
        inner.entries.push(entry.clone());

        let event = LogEvent::Appended(entry);
        inner
            .subscribers
            .retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn info(&self, text: impl Into<String>) {
        self.append(LogEntry::info(text));
    }

    pub fn error(&self, text: impl Into<String>) {
        self.append(LogEntry::error(text));
    }

    /// Empty the in-memory view. The file mirror is left untouched.
    pub fn clear(&self) {
        {
            let mut inner = self.lock();
            inner.entries.clear();
            inner.subscribers.retain(|tx| tx.send(LogEvent::Cleared).is_ok());
        }
        self.info(CLEARED_NOTICE);
    }

    /// Snapshot of the in-memory entries, in append order
    pub fn entries(&self) -> Vec<LogEntry> {
        self.lock().entries.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Path of the file mirror, if this log has one
    pub fn mirror_path(&self) -> Option<PathBuf> {
        self.lock().mirror.clone()
    }

    /// Receive a [`LogEvent`] for every subsequent append and clear.
    ///
    /// Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> Receiver<LogEvent> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.lock().subscribers.push(tx);
        rx
    }

    /// Stop publishing to every current subscriber. Each receiver still gets
    /// the events already sent, then sees the channel disconnect.
    pub fn detach_subscribers(&self) {
        self.lock().subscribers.clear();
    }
}

/// File name of the mirror for a session started at `started_at`
pub fn mirror_file_name(started_at: DateTime<Local>) -> String {
    format!("log_{}.txt", started_at.format("%Y%m%d_%H%M"))
}

fn write_mirror_line(path: &Path, line: &str) {
    let result = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .and_then(|mut file| file.write_all(line.as_bytes()));

    if let Err(e) = result {
        tracing::debug!("Log mirror write to {} failed: {}", path.display(), e);
    }
}

fn persisted_line_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"^\[(\d{2}:\d{2}:\d{2})\] ?(.*)$").expect("Invalid persisted line regex")
    })
}

/// Parse one persisted line. Classification is recovered from the markers.
pub fn parse_persisted_line(line: &str) -> Option<PersistedLine> {
    let line = line.trim_end_matches(['\r', '\n']);
    let caps = persisted_line_regex().captures(line)?;
    let time = NaiveTime::parse_from_str(caps.get(1)?.as_str(), "%H:%M:%S").ok()?;
    let marked = caps.get(2).map(|m| m.as_str()).unwrap_or_default();

    let classification = Classification::from_marked_text(marked);
    let text = classification
        .marker()
        .and_then(|marker| marked.strip_prefix(marker))
        .map(|rest| rest.strip_prefix(' ').unwrap_or(rest))
        .unwrap_or(marked);

    Some(PersistedLine {
        time,
        text: text.to_string(),
        classification,
    })
}

/// Read a mirror file back. Lines that do not look like log lines are skipped.
pub fn read_mirror(path: &Path) -> std::io::Result<Vec<PersistedLine>> {
    let content = std::fs::read_to_string(path)?;
    Ok(content.lines().filter_map(parse_persisted_line).collect())
}
