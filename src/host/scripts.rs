//! Script catalog - maps logical script names to files in the scripts directory

use std::path::{Path, PathBuf};

use crate::core::JobFailure;

/// The scripts shipped with the tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KnownScript {
    Setup,
    Restrict,
    Undo,
}

impl KnownScript {
    pub const ALL: [KnownScript; 3] = [KnownScript::Setup, KnownScript::Restrict, KnownScript::Undo];

    /// File stem inside the scripts directory
    pub fn file_stem(&self) -> &'static str {
        match self {
            KnownScript::Setup => "Setup",
            KnownScript::Restrict => "Restrict",
            KnownScript::Undo => "Undo",
        }
    }

    /// Banner logged before the script is started
    pub fn banner(&self) -> &'static str {
        match self {
            KnownScript::Setup => "=== SETUP START ===",
            KnownScript::Restrict => "=== APPLY RESTRICTIONS ===",
            KnownScript::Undo => "=== UNDO START ===",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            KnownScript::Setup => "Prepare the machine for restricted use",
            KnownScript::Restrict => "Apply the restriction policies",
            KnownScript::Undo => "Remove the restriction policies",
        }
    }

    /// Match a logical name case-insensitively
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|s| s.file_stem().eq_ignore_ascii_case(name))
    }
}

/// Resolves script names inside one directory
#[derive(Debug, Clone)]
pub struct ScriptCatalog {
    dir: PathBuf,
    extension: String,
}

impl ScriptCatalog {
    pub fn new(dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            extension: extension.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Where `name` would live: `<dir>/<Name>.<ext>`
    pub fn path_for(&self, name: &str) -> PathBuf {
        let stem = KnownScript::from_name(name)
            .map(|s| s.file_stem())
            .unwrap_or(name);
        self.dir.join(format!("{}.{}", stem, self.extension))
    }

    /// Resolve `name` to an existing script file.
    ///
    /// Names that would escape the scripts directory never resolve.
    pub fn resolve(&self, name: &str) -> Result<PathBuf, JobFailure> {
        let path = self.path_for(name);
        if !is_plain_name(name) || !path.is_file() {
            return Err(JobFailure::ScriptNotFound(path));
        }
        Ok(path)
    }

    /// Known scripts with their expected path and whether it exists
    pub fn list(&self) -> Vec<(KnownScript, PathBuf, bool)> {
        KnownScript::ALL
            .into_iter()
            .map(|script| {
                let path = self.path_for(script.file_stem());
                let present = path.is_file();
                (script, path, present)
            })
            .collect()
    }
}

fn is_plain_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && !name.contains("..")
        && !name.contains(['/', '\\', ':'])
}
