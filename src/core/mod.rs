//! Core data models: log entries, the session log and script jobs

#![allow(dead_code)]

mod log_entry;
mod script_job;
mod session_log;

pub use log_entry::*;
pub use script_job::*;
pub use session_log::*;
