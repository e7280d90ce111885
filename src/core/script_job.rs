//! Script job - one execution attempt of a named script and its lifecycle

use std::path::PathBuf;

use thiserror::Error;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Why a job ended without a normal exit
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobFailure {
    #[error("Script not found: {}", .0.display())]
    ScriptNotFound(PathBuf),

    #[error("Failed to start script: {0}")]
    SpawnFailed(String),

    #[error("Administrator rights are required. Re-run from an elevated prompt ('Run as Administrator').")]
    ElevationRequired,

    #[error("Another script is already running: {0}")]
    Busy(String),

    #[error("Cancelled")]
    Cancelled,
}

impl JobFailure {
    /// Whether the failure happened before any process was started
    pub fn is_pre_start(&self) -> bool {
        !matches!(self, JobFailure::Cancelled)
    }
}

/// Lifecycle state of a [`ScriptJob`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    NotStarted,
    Running,
    Completed(i32),
    Failed(JobFailure),
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed(_) | JobState::Failed(_))
    }
}

/// Handle to a script job. Clones observe the same job.
#[derive(Debug, Clone)]
pub struct ScriptJob {
    id: Uuid,
    script: String,
    state: watch::Receiver<JobState>,
    cancel: CancellationToken,
}

/// Write side of a job's state, owned by whoever drives the job
#[derive(Debug)]
pub(crate) struct JobStateSender {
    tx: watch::Sender<JobState>,
}

impl JobStateSender {
    /// Move to `next`. Terminal states are final; later transitions are ignored.
    pub(crate) fn transition(&self, next: JobState) {
        self.tx.send_if_modified(|current| {
            if current.is_terminal() {
                return false;
            }
            *current = next;
            true
        });
    }
}

impl ScriptJob {
    /// Create a job in `NotStarted` together with its state sender
    pub(crate) fn new(script: impl Into<String>) -> (Self, JobStateSender) {
        let (tx, rx) = watch::channel(JobState::NotStarted);
        let job = Self {
            id: Uuid::new_v4(),
            script: script.into(),
            state: rx,
            cancel: CancellationToken::new(),
        };
        (job, JobStateSender { tx })
    }

    /// Create a job that failed before it could start
    pub(crate) fn rejected(script: impl Into<String>, failure: JobFailure) -> Self {
        let (job, sender) = Self::new(script);
        sender.transition(JobState::Failed(failure));
        job
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn script(&self) -> &str {
        &self.script
    }

    /// Current state
    pub fn state(&self) -> JobState {
        self.state.borrow().clone()
    }

    /// The pre-start failure, if the job never got a process
    pub fn start_error(&self) -> Option<JobFailure> {
        match self.state() {
            JobState::Failed(failure) if failure.is_pre_start() => Some(failure),
            _ => None,
        }
    }

    /// Request cancellation. Has no effect once the job is terminal.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub(crate) fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait until the job reaches a terminal state and return it
    pub async fn wait(&self) -> JobState {
        let mut rx = self.state.clone();
        let terminal = rx
            .wait_for(JobState::is_terminal)
            .await
            .map(|state| state.clone());
        // Driver went away without finishing; report what we last saw
        terminal.unwrap_or_else(|_| rx.borrow().clone())
    }
}
