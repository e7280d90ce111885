//! Settings for Help Desk Shell
//!
//! Everything that used to be process-wide state (where the scripts live,
//! where the session log goes, how scripts are launched) is collected here
//! and passed explicitly to the runner and the session log.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Settings file name inside the config directory
pub const SETTINGS_FILE: &str = "config.toml";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to read settings from {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid settings in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to write settings to {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("No config directory available on this system")]
    NoConfigDir,
}

/// Whether scripts must run with administrator rights
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElevationPolicy {
    /// Refuse to start a script unless this process is elevated
    #[default]
    Require,
    /// Run scripts with whatever rights this process has
    Inherit,
}

/// How a script file is launched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Interpreter {
    /// Program to run, looked up in PATH when not absolute
    pub program: String,
    /// Fixed arguments placed before the script path
    pub args: Vec<String>,
    /// Script file extension, without the dot
    pub extension: String,
}

impl Default for Interpreter {
    #[cfg(windows)]
    fn default() -> Self {
        Self {
            program: "powershell.exe".to_string(),
            // -STA so scripts can still show message boxes
            args: ["-NoProfile", "-ExecutionPolicy", "Bypass", "-STA", "-File"]
                .map(String::from)
                .to_vec(),
            extension: "ps1".to_string(),
        }
    }

    #[cfg(not(windows))]
    fn default() -> Self {
        Self {
            program: "pwsh".to_string(),
            args: ["-NoProfile", "-NonInteractive", "-File"]
                .map(String::from)
                .to_vec(),
            extension: "ps1".to_string(),
        }
    }
}

/// Application settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory holding Setup/Restrict/Undo
    pub scripts_dir: PathBuf,
    /// Directory receiving one log file per session
    pub log_dir: PathBuf,
    pub elevation: ElevationPolicy,
    /// Minimum interval between console redraws, in milliseconds
    pub redraw_interval_ms: u64,
    pub interpreter: Interpreter,
}

impl Default for Settings {
    fn default() -> Self {
        let base = app_base_dir();
        Self {
            scripts_dir: base.join("Scripts"),
            log_dir: base.join("Logs"),
            elevation: ElevationPolicy::default(),
            redraw_interval_ms: 300,
            interpreter: Interpreter::default(),
        }
    }
}

impl Settings {
    /// Default location of the settings file
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "HelpDeskShell").map(|dirs| dirs.config_dir().join(SETTINGS_FILE))
    }

    /// Load settings from `path`, or from the default location.
    ///
    /// A missing file yields the defaults; a malformed one is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match Self::default_path() {
                Some(p) => p,
                None => return Ok(Self::default()),
            },
        };

        if !path.exists() {
            tracing::debug!("No settings file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path).map_err(|source| SettingsError::Read {
            path: path.clone(),
            source,
        })?;
        let settings = toml::from_str(&content).map_err(|source| SettingsError::Parse {
            path: path.clone(),
            source,
        })?;
        tracing::debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Serialize to TOML
    pub fn to_toml(&self) -> Result<String, SettingsError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Write settings to `path`, or to the default location
    pub fn save(&self, path: Option<&Path>) -> Result<PathBuf, SettingsError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_path().ok_or(SettingsError::NoConfigDir)?,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| SettingsError::Write {
                path: path.clone(),
                source,
            })?;
        }
        std::fs::write(&path, self.to_toml()?).map_err(|source| SettingsError::Write {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }

    /// Apply command-line overrides
    pub fn with_overrides(mut self, scripts_dir: Option<PathBuf>, log_dir: Option<PathBuf>) -> Self {
        if let Some(dir) = scripts_dir {
            self.scripts_dir = dir;
        }
        if let Some(dir) = log_dir {
            self.log_dir = dir;
        }
        self
    }

    pub fn redraw_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.redraw_interval_ms)
    }
}

/// Directory of the running executable, falling back to the working directory
fn app_base_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}
