//! `logs` command - locate, open or print the session logs

use std::path::{Path, PathBuf};

use anyhow::Context;
use console::style;

use crate::core::{read_mirror, Classification, SessionLog};
use crate::settings::Settings;

use super::LogsArgs;

pub fn run(args: LogsArgs, settings: &Settings) -> anyhow::Result<()> {
    let dir = &settings.log_dir;

    if args.open {
        open::that(dir).with_context(|| format!("Failed to open log folder {}", dir.display()))?;
        return Ok(());
    }

    if args.last {
        let path = latest_log(dir)?
            .with_context(|| format!("No session logs found in {}", dir.display()))?;
        println!("{}", style(path.display()).dim());
        for line in read_mirror(&path)? {
            let text = match line.classification.marker() {
                Some(marker) => format!("{} {}", marker, line.text),
                None => line.text,
            };
            let rendered = format!("[{}] {}", line.time.format("%H:%M:%S"), text);
            match line.classification {
                Classification::Error => println!("{}", style(rendered).red()),
                Classification::ExternalOutput => println!("{}", style(rendered).blue()),
                Classification::Info => println!("{}", rendered),
            }
        }
        return Ok(());
    }

    println!("{}", dir.display());
    Ok(())
}

/// Open the log folder, recording a failure in the session log
pub fn open_folder(dir: &Path, log: &SessionLog) {
    if let Err(e) = open::that(dir) {
        log.error(format!("Failed to open log folder: {}", e));
    }
}

/// Most recent `log_*.txt` in `dir`. File names sort by session start time.
pub fn latest_log(dir: &Path) -> std::io::Result<Option<PathBuf>> {
    if !dir.is_dir() {
        return Ok(None);
    }

    let mut latest: Option<PathBuf> = None;
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_log = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with("log_") && n.ends_with(".txt"));
        if is_log && latest.as_ref().map_or(true, |best| path.file_name() > best.file_name()) {
            latest = Some(path);
        }
    }
    Ok(latest)
}
