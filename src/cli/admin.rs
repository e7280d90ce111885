//! `check-admin` command

use crate::host::is_elevated;
use crate::settings::{ElevationPolicy, Settings};

use super::exit_codes;

pub fn run(settings: &Settings) -> i32 {
    if is_elevated() {
        println!("Running with administrator rights.");
        return exit_codes::SUCCESS;
    }

    println!("Not running with administrator rights.");
    if settings.elevation == ElevationPolicy::Require {
        println!("Scripts will not start. Right-click the executable and choose 'Run as Administrator'.");
    }
    exit_codes::UNEXPECTED_FAILURE
}
