//! Command-line interface

pub mod admin;
pub mod config;
pub mod logs;
pub mod run;
pub mod scripts;
pub mod shell;

use std::io::{BufWriter, Stdout};
use std::path::PathBuf;
use std::thread::JoinHandle;

use clap::{Args, Parser, Subcommand};

use crate::core::SessionLog;
use crate::host::ScriptRunner;
use crate::settings::Settings;
use crate::view::{ConsoleView, OutputFormat};

/// Process exit codes
pub mod exit_codes {
    use crate::core::{JobFailure, JobState};

    pub const SUCCESS: i32 = 0;
    pub const UNEXPECTED_FAILURE: i32 = 1;
    /// The script exited with one of the reserved codes below. Its real code
    /// is in the `[DONE]` entry of the session log.
    pub const SCRIPT_CODE_REMAPPED: i32 = 125;
    /// The script could not be started (interpreter, elevation, busy)
    pub const NOT_STARTED: i32 = 126;
    /// The script does not exist
    pub const SCRIPT_NOT_FOUND: i32 = 127;
    /// The script was cancelled with Ctrl-C
    pub const CANCELLED: i32 = 130;

    /// Codes a script's own exit code is never passed through as
    pub const RESERVED: [i32; 4] = [SCRIPT_CODE_REMAPPED, NOT_STARTED, SCRIPT_NOT_FOUND, CANCELLED];

    /// Exit code reported for a finished job
    pub fn for_job(state: &JobState) -> i32 {
        match state {
            JobState::Completed(code) => for_script_exit(*code),
            JobState::Failed(JobFailure::ScriptNotFound(_)) => SCRIPT_NOT_FOUND,
            JobState::Failed(JobFailure::Cancelled) => CANCELLED,
            JobState::Failed(_) => NOT_STARTED,
            JobState::NotStarted | JobState::Running => UNEXPECTED_FAILURE,
        }
    }

    /// The script's exit code, unless it would read as one of the tool's own outcomes
    pub fn for_script_exit(code: i32) -> i32 {
        if RESERVED.contains(&code) {
            SCRIPT_CODE_REMAPPED
        } else {
            code
        }
    }
}

#[derive(Parser)]
#[command(
    name = "helpdesk-shell",
    about = "Help Desk Shell - run the Setup, Restrict and Undo scripts with a live session log",
    version,
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Settings file (defaults to the per-user config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory containing the scripts
    #[arg(long, global = true, env = "HELPDESK_SCRIPTS_DIR")]
    pub scripts_dir: Option<PathBuf>,

    /// Directory receiving the session log files
    #[arg(long, global = true, env = "HELPDESK_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// Enable debug diagnostics on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit diagnostics on stderr as JSON
    #[arg(long, global = true)]
    pub json_output: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one script and stream its output
    Run(RunArgs),

    /// Interactive menu (the default when no command is given)
    Shell,

    /// List the known scripts and whether they are installed
    Scripts,

    /// Show or open the session log directory
    Logs(LogsArgs),

    /// Report whether this process has administrator rights
    CheckAdmin,

    /// Inspect or create the settings file
    Config(ConfigArgs),
}

#[derive(Args)]
pub struct RunArgs {
    /// Script name: setup, restrict, undo, or the stem of another script in the scripts directory
    pub script: String,

    /// Print log entries as JSON lines
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct LogsArgs {
    /// Open the log directory in the file browser
    #[arg(long)]
    pub open: bool,

    /// Print the most recent session log
    #[arg(long, conflicts_with = "open")]
    pub last: bool,
}

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective settings as TOML
    Show,
    /// Print the settings file location
    Path,
    /// Write the default settings file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// One session: the session log, its file mirror and the console view
pub struct Session {
    pub settings: Settings,
    pub log: SessionLog,
    view: JoinHandle<BufWriter<Stdout>>,
}

impl Session {
    /// Open the session log and start rendering it on stdout
    pub fn start(settings: Settings, format: OutputFormat) -> anyhow::Result<Self> {
        let log = SessionLog::open(&settings.log_dir, chrono::Local::now());
        let view = ConsoleView::stdout(format, settings.redraw_interval()).spawn(log.subscribe())?;

        log.info("Help Desk Shell started.");
        if let Some(path) = log.mirror_path() {
            tracing::debug!("Session log mirrored to {}", path.display());
        }

        Ok(Self {
            settings,
            log,
            view,
        })
    }

    pub fn runner(&self) -> ScriptRunner {
        ScriptRunner::new(&self.settings, self.log.clone())
    }

    /// Stop the console view after it has written everything logged so far
    pub fn finish(self) {
        self.log.detach_subscribers();
        if self.view.join().is_err() {
            tracing::warn!("Console view thread panicked");
        }
    }
}
