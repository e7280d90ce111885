//! Console view of the session log
//!
//! Runs on its own thread, renders every [`LogEvent`] as it arrives and
//! flushes the terminal through a [`Debouncer`] so a chatty script does not
//! force a write per line.

use std::io::{self, BufWriter, Write};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use console::{Style, Term};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use serde::Serialize;

use super::debounce::Debouncer;
use crate::core::{Classification, LogEntry, LogEvent};

/// How entries are written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// `[HH:MM:SS] text`, coloured by classification
    Text,
    /// One JSON object per line
    Json,
}

#[derive(Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum JsonEvent<'a> {
    Entry(&'a LogEntry),
    Cleared,
}

pub struct ConsoleView<W: Write> {
    out: W,
    format: OutputFormat,
    colors: bool,
    /// Terminal to wipe when the log is cleared
    term: Option<Term>,
    debouncer: Debouncer,
}

impl ConsoleView<BufWriter<io::Stdout>> {
    /// View writing to stdout, coloured when stdout is a terminal
    pub fn stdout(format: OutputFormat, redraw_interval: Duration) -> Self {
        let term = Term::stdout();
        let interactive = term.is_term();
        let mut view = Self::new(BufWriter::new(io::stdout()), format, redraw_interval);
        view.colors = interactive && console::colors_enabled();
        view.term = interactive.then_some(term);
        view
    }
}

impl<W: Write + Send + 'static> ConsoleView<W> {
    /// View writing to any sink, without colours
    pub fn new(out: W, format: OutputFormat, redraw_interval: Duration) -> Self {
        Self {
            out,
            format,
            colors: false,
            term: None,
            debouncer: Debouncer::new(redraw_interval),
        }
    }

    /// Render events on a background thread until the log stops publishing.
    ///
    /// The thread returns the writer so callers can inspect what was written.
    pub fn spawn(self, events: Receiver<LogEvent>) -> io::Result<JoinHandle<W>> {
        std::thread::Builder::new()
            .name("console-view".to_string())
            .spawn(move || self.run(events))
    }

    fn run(mut self, events: Receiver<LogEvent>) -> W {
        loop {
            let received = match self.debouncer.time_until_due(Instant::now()) {
                Some(wait) => events.recv_timeout(wait),
                None => events.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };

            match received {
                Ok(event) => {
                    self.render(&event);
                    self.debouncer.signal(Instant::now());
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }

            if self.debouncer.poll(Instant::now()) {
                self.redraw();
            }
        }

        self.debouncer.take_pending();
        self.redraw();
        self.out
    }

    fn render(&mut self, event: &LogEvent) {
        let result = match (self.format, event) {
            (OutputFormat::Text, LogEvent::Appended(entry)) => {
                let line = self.styled_line(entry);
                write!(self.out, "{}", line)
            }
            (OutputFormat::Text, LogEvent::Cleared) => {
                // Pending output belongs to the view being wiped
                let _ = self.out.flush();
                match &self.term {
                    Some(term) => term.clear_screen(),
                    None => Ok(()),
                }
            }
            (OutputFormat::Json, LogEvent::Appended(entry)) => self.write_json(&JsonEvent::Entry(entry)),
            (OutputFormat::Json, LogEvent::Cleared) => self.write_json(&JsonEvent::Cleared),
        };

        if let Err(e) = result {
            tracing::debug!("Console write failed: {}", e);
        }
    }

    fn styled_line(&self, entry: &LogEntry) -> String {
        let line = entry.format_line();
        if !self.colors {
            return line;
        }
        let style = match entry.classification() {
            Classification::Error => Style::new().red(),
            Classification::ExternalOutput => Style::new().blue(),
            Classification::Info => return line,
        };
        format!("{}\n", style.apply_to(line.trim_end_matches('\n')))
    }

    fn write_json(&mut self, event: &JsonEvent<'_>) -> io::Result<()> {
        let json = serde_json::to_string(event).map_err(io::Error::other)?;
        writeln!(self.out, "{}", json)
    }

    fn redraw(&mut self) {
        if let Err(e) = self.out.flush() {
            tracing::debug!("Console flush failed: {}", e);
        }
    }
}
