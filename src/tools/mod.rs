// Wrappers around the external programs the pipeline delegates to.

pub mod browser;
pub mod command;
pub mod ghostscript;
pub mod ocr;
pub mod unpaper;

pub use command::{probe_tools, CommandOutput, SystemRunner, ToolCommand, ToolStatus};
