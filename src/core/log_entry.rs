//! Log entry model - one timestamped, classified line of the session log

use chrono::{DateTime, Local, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

/// Marker written in front of script standard output lines
pub const EXTERNAL_MARKER: &str = "[PS]";

/// Marker written in front of error lines
pub const ERROR_MARKER: &str = "[ERROR]";

/// Presentation category of a log line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// Messages produced by the tool itself
    Info,
    /// Standard error of a script, or a failure reported by the tool
    Error,
    /// Standard output of a script
    ExternalOutput,
}

impl Classification {
    /// Marker prefix used in the persisted line, if any
    pub fn marker(&self) -> Option<&'static str> {
        match self {
            Classification::Info => None,
            Classification::Error => Some(ERROR_MARKER),
            Classification::ExternalOutput => Some(EXTERNAL_MARKER),
        }
    }

    /// Recover a classification from marked text.
    ///
    /// Only used when reading a persisted log back: live entries carry their
    /// classification from the stream that produced them.
    pub fn from_marked_text(text: &str) -> Self {
        if text.contains(ERROR_MARKER) {
            Classification::Error
        } else if text.starts_with(EXTERNAL_MARKER) {
            Classification::ExternalOutput
        } else {
            Classification::Info
        }
    }
}

/// A single line of the session log. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    timestamp: DateTime<Local>,
    text: String,
    classification: Classification,
}

impl LogEntry {
    /// Create an entry stamped with the current wall-clock time
    pub fn new(classification: Classification, text: impl Into<String>) -> Self {
        Self::at(Local::now(), classification, text)
    }

    /// Create an entry with an explicit timestamp (truncated to whole seconds)
    pub fn at(
        timestamp: DateTime<Local>,
        classification: Classification,
        text: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: timestamp.with_nanosecond(0).unwrap_or(timestamp),
            text: text.into(),
            classification,
        }
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self::new(Classification::Info, text)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(Classification::Error, text)
    }

    pub fn external(text: impl Into<String>) -> Self {
        Self::new(Classification::ExternalOutput, text)
    }

    pub fn timestamp(&self) -> DateTime<Local> {
        self.timestamp
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn classification(&self) -> Classification {
        self.classification
    }

    /// Text with the classification marker in front, as shown to the user
    pub fn display_text(&self) -> String {
        match self.classification.marker() {
            Some(marker) => format!("{} {}", marker, self.text),
            None => self.text.clone(),
        }
    }

    /// Format as a persisted line: `[HH:MM:SS] <text>` plus a newline
    pub fn format_line(&self) -> String {
        format!(
            "[{}] {}\n",
            self.timestamp.format("%H:%M:%S"),
            self.display_text()
        )
    }
}

/// A line read back from a persisted log file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedLine {
    pub time: NaiveTime,
    pub text: String,
    pub classification: Classification,
}
