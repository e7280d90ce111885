//! Presentation of the session log on the terminal

pub mod console;
pub mod debounce;

pub use console::{ConsoleView, OutputFormat};
