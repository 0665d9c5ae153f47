use super::OutputFormatter;
use crate::rule::{LintWarning, Severity};
use colored::*;

/// `file:line:column: [RULE] message`, one warning per line
pub struct TextFormatter;

impl OutputFormatter for TextFormatter {
    fn format_warnings(&self, warnings: &[LintWarning], file_path: &str) -> String {
        let mut output = String::new();

        for warning in warnings {
            let rule_name = warning.rule_name.as_deref().unwrap_or("unknown");
            let rule = format!("[{rule_name:5}]");
            let rule = match warning.severity {
                Severity::Error => rule.red(),
                Severity::Warning => rule.yellow(),
            };

            let line = format!(
                "{}:{}:{}: {} {}",
                file_path.blue().underline(),
                warning.line.to_string().cyan(),
                warning.column.to_string().cyan(),
                rule,
                warning.message
            );
            output.push_str(&line);
            output.push('\n');
        }

        output.pop();
        output
    }
}
