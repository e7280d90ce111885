//! Script Runner
//!
//! Starts one of the help desk scripts through the configured interpreter,
//! streams its standard output and standard error into the session log line by
//! line, and reports the exit code when it finishes.
//!
//! Output is read on two independent tasks (one per stream). Both feed a single
//! forwarder task, which is the only writer to the session log for that job.
//! The exit is awaited on a supervisor task, so [`ScriptRunner::run`] returns
//! as soon as the process is started.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::elevation::ElevationGate;
use super::scripts::{KnownScript, ScriptCatalog};
use crate::core::{Classification, JobFailure, JobState, JobStateSender, LogEntry, ScriptJob, SessionLog};
use crate::settings::{Interpreter, Settings};

/// CREATE_NO_WINDOW
#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// How long output readers may keep draining after a cancelled child is killed
const CANCEL_DRAIN: Duration = Duration::from_millis(500);

/// How long output readers may keep draining after the child exits on its own.
/// A background grandchild can hold the pipes open long after that.
const EXIT_DRAIN: Duration = Duration::from_secs(2);

/// Runs scripts one at a time and records everything in the session log
pub struct ScriptRunner {
    catalog: ScriptCatalog,
    interpreter: Interpreter,
    gate: ElevationGate,
    log: SessionLog,
    /// Name of the script currently running, if any
    active: Arc<Mutex<Option<String>>>,
}

impl ScriptRunner {
    pub fn new(settings: &Settings, log: SessionLog) -> Self {
        Self {
            catalog: ScriptCatalog::new(&settings.scripts_dir, &settings.interpreter.extension),
            interpreter: settings.interpreter.clone(),
            gate: ElevationGate::new(settings.elevation),
            log,
            active: Arc::new(Mutex::new(None)),
        }
    }

    pub fn log(&self) -> &SessionLog {
        &self.log
    }

    /// Whether a script is running right now
    #[cfg(test)]
    pub fn is_busy(&self) -> bool {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Log the script's banner, then run it
    pub fn run_known(&self, script: KnownScript) -> ScriptJob {
        self.log.info(script.banner());
        self.run(script.file_stem())
    }

    /// Start the script called `name`.
    ///
    /// Returns immediately. If the script cannot be started the returned job
    /// is already `Failed` and the reason has been logged; otherwise it is
    /// `Running` and reaches `Completed` once the process exits and all of its
    /// output has been logged.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn run(&self, name: &str) -> ScriptJob {
        let started = match self.start(name) {
            Ok(started) => started,
            Err(failure) => {
                tracing::warn!(script = name, "Script not started: {}", failure);
                self.log.error(failure.to_string());
                return ScriptJob::rejected(name, failure);
            }
        };

        let (job, state) = ScriptJob::new(name);
        tracing::debug!(job = %job.id(), script = name, "Supervising script");
        state.transition(JobState::Running);
        tokio::spawn(supervise(started, self.log.clone(), state, job.cancellation()));
        job
    }

    fn start(&self, name: &str) -> Result<StartedScript, JobFailure> {
        let path = self.catalog.resolve(name)?;
        let slot = ActiveSlot::claim(&self.active, name)?;

        if !self.gate.permits_start() {
            return Err(JobFailure::ElevationRequired);
        }

        let program = find_interpreter(&self.interpreter.program)?;
        self.log.info(format!("Running script: {}", path.display()));

        let child = self
            .command(&program, &path)
            .spawn()
            .map_err(|e| JobFailure::SpawnFailed(e.to_string()))?;

        tracing::info!(script = name, pid = ?child.id(), "Script started");

        Ok(StartedScript {
            label: script_label(&path),
            child,
            slot,
        })
    }

    fn command(&self, program: &Path, script: &Path) -> Command {
        let mut cmd = Command::new(program);
        cmd.args(&self.interpreter.args)
            .arg(script)
            .current_dir(self.catalog.dir())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        #[cfg(windows)]
        cmd.creation_flags(CREATE_NO_WINDOW);

        cmd
    }
}

/// A spawned script waiting to be supervised
struct StartedScript {
    label: String,
    child: Child,
    slot: ActiveSlot,
}

/// Marks the runner busy for as long as it is alive
struct ActiveSlot {
    active: Arc<Mutex<Option<String>>>,
}

impl ActiveSlot {
    fn claim(active: &Arc<Mutex<Option<String>>>, name: &str) -> Result<Self, JobFailure> {
        let mut current = active.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(running) = current.as_ref() {
            return Err(JobFailure::Busy(running.clone()));
        }
        *current = Some(name.to_string());
        Ok(Self {
            active: Arc::clone(active),
        })
    }
}

impl Drop for ActiveSlot {
    fn drop(&mut self) {
        *self.active.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

enum Exit {
    Status(std::io::Result<std::process::ExitStatus>),
    Cancelled,
}

async fn supervise(
    started: StartedScript,
    log: SessionLog,
    state: JobStateSender,
    cancel: CancellationToken,
) {
    let StartedScript {
        label,
        mut child,
        slot,
    } = started;

    let (tx, rx) = mpsc::unbounded_channel();
    let forwarder = tokio::spawn(forward_entries(rx, log));

    let mut readers = Vec::with_capacity(2);
    if let Some(stdout) = child.stdout.take() {
        readers.push(tokio::spawn(pump_lines(stdout, Classification::ExternalOutput, tx.clone())));
    }
    if let Some(stderr) = child.stderr.take() {
        readers.push(tokio::spawn(pump_lines(stderr, Classification::Error, tx.clone())));
    }

    let exit = tokio::select! {
        status = child.wait() => Exit::Status(status),
        _ = cancel.cancelled() => {
            if let Err(e) = child.kill().await {
                tracing::warn!("Failed to kill {}: {}", label, e);
            }
            Exit::Cancelled
        }
    };

    let deadline = match exit {
        Exit::Cancelled => CANCEL_DRAIN,
        Exit::Status(_) => EXIT_DRAIN,
    };
    drain_with_deadline(readers, deadline, &label).await;

    let (final_entry, final_state) = match exit {
        Exit::Status(Ok(status)) => {
            let code = status.code().unwrap_or(-1);
            tracing::info!(script = %label, code, "Script finished");
            (
                LogEntry::info(format!("[DONE] {} exited with code {}", label, code)),
                JobState::Completed(code),
            )
        }
        Exit::Status(Err(e)) => {
            tracing::warn!("Lost track of {}: {}", label, e);
            (
                LogEntry::error(format!("Failed to wait for {}: {}", label, e)),
                JobState::Completed(-1),
            )
        }
        Exit::Cancelled => {
            tracing::info!(script = %label, "Script cancelled");
            (
                LogEntry::error(format!("{} was cancelled", label)),
                JobState::Failed(JobFailure::Cancelled),
            )
        }
    };

    let _ = tx.send(final_entry);
    drop(tx);
    let _ = forwarder.await;

    drop(slot);
    state.transition(final_state);
}

/// Wait for readers to hit EOF, aborting any still open after `deadline`.
///
/// The deadline is shared by all readers, counted from the call.
async fn drain_with_deadline(readers: Vec<JoinHandle<()>>, deadline: Duration, label: &str) {
    let until = tokio::time::Instant::now() + deadline;
    for mut reader in readers {
        if tokio::time::timeout_at(until, &mut reader).await.is_err() {
            tracing::debug!("Output of {} still open after exit, detaching", label);
            reader.abort();
        }
    }
}

/// Append forwarded entries to the session log, in arrival order
async fn forward_entries(mut rx: mpsc::UnboundedReceiver<LogEntry>, log: SessionLog) {
    while let Some(entry) = rx.recv().await {
        log.append(entry);
    }
}

/// Read `reader` line by line and forward each non-empty line
async fn pump_lines<R>(reader: R, classification: Classification, tx: mpsc::UnboundedSender<LogEntry>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let text = String::from_utf8_lossy(&buf);
                let line = text.trim_end_matches(['\r', '\n']);
                if line.is_empty() {
                    continue;
                }
                if tx.send(LogEntry::new(classification, line)).is_err() {
                    break;
                }
            }
            Err(e) => {
                tracing::debug!("Stopped reading {:?} output: {}", classification, e);
                break;
            }
        }
    }
}

/// Locate the interpreter, either as a path or in PATH
fn find_interpreter(program: &str) -> Result<PathBuf, JobFailure> {
    let as_path = Path::new(program);
    if as_path.components().count() > 1 {
        return if as_path.is_file() {
            Ok(as_path.to_path_buf())
        } else {
            Err(JobFailure::SpawnFailed(format!("Interpreter not found: {}", program)))
        };
    }
    which::which(program).map_err(|_| {
        JobFailure::SpawnFailed(format!(
            "Interpreter '{}' not found. Install it or add it to PATH.",
            program
        ))
    })
}

fn script_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::ElevationPolicy;

    fn settings_for(scripts_dir: &Path, program: &str) -> Settings {
        Settings {
            scripts_dir: scripts_dir.to_path_buf(),
            log_dir: scripts_dir.join("Logs"),
            elevation: ElevationPolicy::Inherit,
            redraw_interval_ms: 10,
            interpreter: Interpreter {
                program: program.to_string(),
                args: Vec::new(),
                extension: "sh".to_string(),
            },
        }
    }

    fn write_script(dir: &Path, stem: &str, body: &str) {
        std::fs::write(dir.join(format!("{}.sh", stem)), body).unwrap();
    }

    fn runner_in(dir: &Path) -> ScriptRunner {
        ScriptRunner::new(&settings_for(dir, "sh"), SessionLog::in_memory())
    }

    /// Entries logged after the "Running script" line
    fn output_after_start(log: &SessionLog) -> Vec<LogEntry> {
        log.entries()
            .into_iter()
            .skip_while(|e| !e.text().starts_with("Running script:"))
            .skip(1)
            .collect()
    }

    #[test]
    fn test_script_label() {
        assert_eq!(script_label(Path::new("Scripts/Setup.ps1")), "Setup.ps1");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_background_grandchild_does_not_hold_completion() {
        let dir = tempfile::tempdir().unwrap();
        write_script(dir.path(), "Setup", "sleep 6 &\necho hi\nexit 0\n");
        let runner = runner_in(dir.path());

        let started = std::time::Instant::now();
        let state = runner.run("Setup").wait().await;

        assert_eq!(state, JobState::Completed(0));
        assert!(started.elapsed() < Duration::from_secs(5));
        let texts: Vec<String> = output_after_start(runner.log())
            .iter()
            .map(|e| e.text().to_string())
            .collect();
        assert_eq!(texts, ["hi", "[DONE] Setup.sh exited with code 0"]);
        assert!(!runner.is_busy());
    }

    #[test]
    fn test_missing_interpreter() {
        let err = find_interpreter("helpdesk-no-such-interpreter").unwrap_err();
        assert!(matches!(err, JobFailure::SpawnFailed(msg) if msg.contains("helpdesk-no-such-interpreter")));
    }

    #[tokio::test]
    async fn test_missing_script_never_starts() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner_in(dir.path());

        let job = runner.run("NonexistentScript");

        assert!(matches!(job.state(), JobState::Failed(JobFailure::ScriptNotFound(_))));
        assert!(matches!(job.start_error(), Some(JobFailure::ScriptNotFound(_))));
        assert!(!runner.is_busy());

        let entries = runner.log().entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].classification(), Classification::Error);
        assert!(entries[0].text().contains("NonexistentScript"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stdout_lines_then_done() {
        let dir = tempfile::tempdir().unwrap();
        write_script(dir.path(), "Setup", "echo one\necho two\necho three\nexit 0\n");
        let runner = runner_in(dir.path());

        let job = runner.run("setup");
        assert!(matches!(job.state(), JobState::Running | JobState::Completed(_)));
        assert_eq!(job.wait().await, JobState::Completed(0));

        let output = output_after_start(runner.log());
        let texts: Vec<&str> = output.iter().map(|e| e.text()).collect();
        assert_eq!(texts, vec!["one", "two", "three", "[DONE] Setup.sh exited with code 0"]);
        for entry in &output[..3] {
            assert_eq!(entry.classification(), Classification::ExternalOutput);
        }
        assert_eq!(output[3].classification(), Classification::Info);
        assert!(!runner.is_busy());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stderr_line_and_nonzero_exit() {
        let dir = tempfile::tempdir().unwrap();
        write_script(dir.path(), "Restrict", "echo 'access denied' >&2\nexit 1\n");
        let runner = runner_in(dir.path());

        let job = runner.run("Restrict");
        assert_eq!(job.wait().await, JobState::Completed(1));

        let output = output_after_start(runner.log());
        assert_eq!(output.len(), 2);
        assert_eq!(output[0].classification(), Classification::Error);
        assert_eq!(output[0].text(), "access denied");
        assert_eq!(output[1].text(), "[DONE] Restrict.sh exited with code 1");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_blank_lines_and_crlf_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        write_script(dir.path(), "Undo", "printf 'a\\r\\n\\n\\nb'\n");
        let runner = runner_in(dir.path());

        assert_eq!(runner.run("Undo").wait().await, JobState::Completed(0));

        let texts: Vec<String> = output_after_start(runner.log())
            .iter()
            .map(|e| e.text().to_string())
            .collect();
        assert_eq!(texts, vec!["a", "b", "[DONE] Undo.sh exited with code 0"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_second_run_rejected_while_busy_then_cancel() {
        let dir = tempfile::tempdir().unwrap();
        write_script(dir.path(), "Setup", "exec sleep 30\n");
        write_script(dir.path(), "Undo", "echo undo\n");
        let runner = runner_in(dir.path());

        let first = runner.run("Setup");
        assert_eq!(first.state(), JobState::Running);
        assert!(runner.is_busy());

        let second = runner.run("Undo");
        assert_eq!(second.state(), JobState::Failed(JobFailure::Busy("Setup".to_string())));

        first.cancel();
        assert_eq!(first.wait().await, JobState::Failed(JobFailure::Cancelled));
        assert!(!runner.is_busy());

        let last = runner.log().entries().pop().unwrap();
        assert_eq!(last.classification(), Classification::Error);
        assert!(last.text().contains("cancelled"));

        // Free again once the first job is over
        assert_eq!(runner.run("Undo").wait().await, JobState::Completed(0));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_elevation_required() {
        if crate::host::elevation::is_elevated() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        write_script(dir.path(), "Setup", "echo should-not-run\n");
        let settings = Settings {
            elevation: ElevationPolicy::Require,
            ..settings_for(dir.path(), "sh")
        };
        let runner = ScriptRunner::new(&settings, SessionLog::in_memory());

        let job = runner.run("Setup");

        assert_eq!(job.state(), JobState::Failed(JobFailure::ElevationRequired));
        assert!(runner
            .log()
            .entries()
            .iter()
            .all(|e| e.text() != "should-not-run"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_spawn_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        write_script(dir.path(), "Setup", "echo hi\n");
        let runner = ScriptRunner::new(
            &settings_for(dir.path(), "helpdesk-no-such-interpreter"),
            SessionLog::in_memory(),
        );

        let job = runner.run("Setup");

        assert!(matches!(job.state(), JobState::Failed(JobFailure::SpawnFailed(_))));
        let entries = runner.log().entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].classification(), Classification::Error);
        assert!(!runner.is_busy());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_known_logs_banner_first() {
        let dir = tempfile::tempdir().unwrap();
        write_script(dir.path(), "Restrict", "echo ok\n");
        let runner = runner_in(dir.path());

        runner.run_known(KnownScript::Restrict).wait().await;

        let entries = runner.log().entries();
        assert_eq!(entries[0].text(), "=== APPLY RESTRICTIONS ===");
        assert!(entries[1].text().starts_with("Running script:"));
    }
}
