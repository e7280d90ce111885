//! Diagnostic logging using tracing
//!
//! This is the tool's own trace output on stderr. What the user sees as "the
//! log" is the session log, which has its own file mirror.
//!
//! The default filter is `warn`: script output is streamed to the same
//! terminal, and info-level runner events would interleave with it. `-v`
//! switches to `debug`; `RUST_LOG` overrides the default otherwise.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the logging system
pub fn init(verbose: bool, json: bool) -> anyhow::Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
            .try_init()?;
    }

    Ok(())
}
