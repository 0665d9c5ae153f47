//! Rendering of lint warnings for the terminal and for machines.

mod json;
mod text;

pub use json::JsonFormatter;
pub use text::TextFormatter;

use crate::rule::LintWarning;
use std::io::{self, Write};
use std::str::FromStr;

pub trait OutputFormatter {
    /// Render the warnings of one file; empty string when there is nothing to show
    fn format_warnings(&self, warnings: &[LintWarning], file_path: &str) -> String;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl OutputFormat {
    pub fn create_formatter(&self) -> Box<dyn OutputFormatter> {
        match self {
            OutputFormat::Text => Box::new(TextFormatter),
            OutputFormat::Json => Box::new(JsonFormatter),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("Unknown output format: {other}")),
        }
    }
}

/// Where formatted diagnostics go
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputWriter {
    use_stderr: bool,
}

impl OutputWriter {
    pub fn new(use_stderr: bool) -> Self {
        Self { use_stderr }
    }

    pub fn writeln(&self, content: &str) -> io::Result<()> {
        if self.use_stderr {
            let mut handle = io::stderr().lock();
            writeln!(handle, "{content}")
        } else {
            let mut handle = io::stdout().lock();
            writeln!(handle, "{content}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("text".parse::<OutputFormat>(), Ok(OutputFormat::Text));
        assert_eq!("JSON".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert!("sarif".parse::<OutputFormat>().is_err());
    }
}
