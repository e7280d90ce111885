//! `config` command

use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::settings::Settings;

use super::{ConfigAction, ConfigArgs};

pub fn run(args: ConfigArgs, settings: &Settings, config_path: Option<&Path>) -> anyhow::Result<()> {
    match args.action {
        ConfigAction::Show => {
            print!("{}", settings.to_toml()?);
        }
        ConfigAction::Path => {
            println!("{}", settings_path(config_path)?.display());
        }
        ConfigAction::Init { force } => {
            let path = settings_path(config_path)?;
            if path.exists() && !force {
                anyhow::bail!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                );
            }
            let written = Settings::default().save(Some(&path))?;
            println!("Wrote {}", written.display());
        }
    }
    Ok(())
}

fn settings_path(config_path: Option<&Path>) -> anyhow::Result<PathBuf> {
    match config_path {
        Some(p) => Ok(p.to_path_buf()),
        None => Settings::default_path().context("No config directory available on this system"),
    }
}
