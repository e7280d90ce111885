//! Host module for privilege checks and script execution

pub mod elevation;
pub mod script_runner;
pub mod scripts;

pub use elevation::is_elevated;
pub use script_runner::ScriptRunner;
pub use scripts::{KnownScript, ScriptCatalog};
