use super::OutputFormatter;
use crate::rule::LintWarning;
use serde_json::json;

/// One JSON array per file
pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn format_warnings(&self, warnings: &[LintWarning], file_path: &str) -> String {
        let entries: Vec<_> = warnings
            .iter()
            .map(|w| {
                json!({
                    "file": file_path,
                    "line": w.line,
                    "column": w.column,
                    "end_line": w.end_line,
                    "end_column": w.end_column,
                    "rule": w.rule_name,
                    "message": w.message,
                    "severity": w.severity,
                })
            })
            .collect();

        serde_json::to_string_pretty(&entries).unwrap_or_else(|_| "[]".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::Severity;

    #[test]
    fn test_json_format() {
        let warning = LintWarning {
            rule_name: Some("SL001".to_string()),
            message: "selector `.foo` should appear before pseudo-selectors".to_string(),
            line: 1,
            column: 8,
            end_line: 1,
            end_column: 12,
            severity: Severity::Warning,
        };
        let output = JsonFormatter.format_warnings(&[warning], "site.css");
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(parsed[0]["file"], "site.css");
        assert_eq!(parsed[0]["rule"], "SL001");
        assert_eq!(parsed[0]["severity"], "Warning");
        assert_eq!(parsed[0]["column"], 8);
    }
}
