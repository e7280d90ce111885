//! `run` command - run one script to completion

use crate::core::{JobState, ScriptJob};
use crate::host::{KnownScript, ScriptRunner};
use crate::settings::Settings;
use crate::view::OutputFormat;

use super::{exit_codes, RunArgs, Session};

pub async fn run(args: RunArgs, settings: Settings) -> anyhow::Result<i32> {
    let format = if args.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };
    let session = Session::start(settings, format)?;
    let runner = session.runner();

    let state = run_script(&runner, &args.script).await;

    drop(runner);
    session.finish();

    let code = exit_codes::for_job(&state);
    if let JobState::Completed(script_code) = state {
        if code != script_code {
            eprintln!(
                "Script exited with code {}, which is reserved; reporting {}",
                script_code, code
            );
        }
    }
    Ok(code)
}

/// Start `name`, report a failed start on stderr, and wait for the job.
///
/// Ctrl-C cancels the running script.
pub async fn run_script(runner: &ScriptRunner, name: &str) -> JobState {
    let job = start(runner, name);
    if let Some(failure) = job.start_error() {
        eprintln!("Error: {}", failure);
        return job.state();
    }
    wait_or_cancel(&job).await
}

fn start(runner: &ScriptRunner, name: &str) -> ScriptJob {
    match KnownScript::from_name(name) {
        Some(script) => runner.run_known(script),
        None => runner.run(name),
    }
}

async fn wait_or_cancel(job: &ScriptJob) -> JobState {
    tokio::select! {
        state = job.wait() => state,
        Ok(()) = tokio::signal::ctrl_c() => {
            tracing::info!(script = job.script(), "Ctrl-C received, cancelling");
            job.cancel();
            job.wait().await
        }
    }
}
