//! Help Desk Shell - runs the help desk PowerShell scripts with administrator
//! rights and keeps a live, timestamped session log.
//!
//! - `helpdesk-shell` / `helpdesk-shell shell`: interactive menu
//! - `helpdesk-shell run <setup|restrict|undo>`: run one script and exit with its code
//! - Every session is mirrored to `Logs/log_YYYYMMDD_HHMM.txt`

mod cli;
mod core;
mod host;
mod logging;
mod settings;
mod view;

use clap::Parser;
use cli::{exit_codes, Cli, Commands};
use settings::Settings;

fn main() {
    let exit_code = run();
    std::process::exit(exit_code);
}

fn run() -> i32 {
    let cli = Cli::parse();

    if let Err(e) = logging::init(cli.verbose, cli.json_output) {
        eprintln!("Failed to initialize logging: {}", e);
        return exit_codes::UNEXPECTED_FAILURE;
    }

    let settings = match Settings::load(cli.config.as_deref()) {
        Ok(settings) => settings.with_overrides(cli.scripts_dir.clone(), cli.log_dir.clone()),
        Err(e) => {
            eprintln!("Error: {}", e);
            return exit_codes::UNEXPECTED_FAILURE;
        }
    };

    match cli.command {
        Some(Commands::Run(args)) => {
            let rt = match runtime() {
                Some(rt) => rt,
                None => return exit_codes::UNEXPECTED_FAILURE,
            };
            rt.block_on(async {
                match cli::run::run(args, settings).await {
                    Ok(code) => code,
                    Err(e) => {
                        eprintln!("Error: {}", e);
                        exit_codes::UNEXPECTED_FAILURE
                    }
                }
            })
        }
        Some(Commands::Shell) | None => {
            let rt = match runtime() {
                Some(rt) => rt,
                None => return exit_codes::UNEXPECTED_FAILURE,
            };
            rt.block_on(async {
                match cli::shell::run(settings).await {
                    Ok(()) => exit_codes::SUCCESS,
                    Err(e) => {
                        eprintln!("Error: {}", e);
                        exit_codes::UNEXPECTED_FAILURE
                    }
                }
            })
        }
        Some(Commands::Scripts) => report(cli::scripts::run(&settings)),
        Some(Commands::Logs(args)) => report(cli::logs::run(args, &settings)),
        Some(Commands::CheckAdmin) => cli::admin::run(&settings),
        Some(Commands::Config(args)) => {
            report(cli::config::run(args, &settings, cli.config.as_deref()))
        }
    }
}

/// Create the tokio runtime for commands that run scripts
fn runtime() -> Option<tokio::runtime::Runtime> {
    match tokio::runtime::Runtime::new() {
        Ok(rt) => Some(rt),
        Err(e) => {
            eprintln!("Failed to create runtime: {}", e);
            None
        }
    }
}

fn report(result: anyhow::Result<()>) -> i32 {
    match result {
        Ok(()) => exit_codes::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            exit_codes::UNEXPECTED_FAILURE
        }
    }
}
