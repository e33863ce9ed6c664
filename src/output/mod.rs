//! Rendering run reports for the terminal or as JSON

pub mod formatter;

pub use formatter::{formatter_for, ConsoleFormatter, JsonFormatter, OutputFormat, OutputFormatter};
