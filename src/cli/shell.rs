//! `shell` command - interactive menu with the help desk actions

use std::fmt;

use inquire::{InquireError, Select};

use crate::host::KnownScript;
use crate::settings::Settings;
use crate::view::OutputFormat;

use super::{logs, run::run_script, Session};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Run(KnownScript),
    ViewLogFolder,
    ClearLog,
    Quit,
}

impl Action {
    fn menu() -> Vec<Action> {
        vec![
            Action::Run(KnownScript::Setup),
            Action::Run(KnownScript::Restrict),
            Action::Run(KnownScript::Undo),
            Action::ViewLogFolder,
            Action::ClearLog,
            Action::Quit,
        ]
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Run(KnownScript::Setup) => write!(f, "Setup"),
            Action::Run(KnownScript::Restrict) => write!(f, "Apply Restrictions"),
            Action::Run(KnownScript::Undo) => write!(f, "Undo Restrictions"),
            Action::ViewLogFolder => write!(f, "View Log Folder"),
            Action::ClearLog => write!(f, "Clear Log"),
            Action::Quit => write!(f, "Quit"),
        }
    }
}

pub async fn run(settings: Settings) -> anyhow::Result<()> {
    let session = Session::start(settings, OutputFormat::Text)?;
    let runner = session.runner();

    loop {
        // Let the view flush before the prompt takes over the terminal
        tokio::time::sleep(session.settings.redraw_interval()).await;

        let choice = tokio::task::spawn_blocking(|| {
            Select::new("What would you like to do?", Action::menu()).prompt()
        })
        .await?;

        let action = match choice {
            Ok(action) => action,
            Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => break,
            Err(e) => {
                drop(runner);
                session.finish();
                return Err(e.into());
            }
        };

        match action {
            Action::Run(script) => {
                run_script(&runner, script.file_stem()).await;
            }
            Action::ViewLogFolder => logs::open_folder(&session.settings.log_dir, runner.log()),
            Action::ClearLog => runner.log().clear(),
            Action::Quit => break,
        }
    }

    drop(runner);
    session.finish();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_menu_mirrors_the_five_actions() {
        let labels: Vec<String> = Action::menu().iter().map(|a| a.to_string()).collect();
        assert_eq!(
            labels,
            vec![
                "Setup",
                "Apply Restrictions",
                "Undo Restrictions",
                "View Log Folder",
                "Clear Log",
                "Quit"
            ]
        );
    }
}
