pub mod config;
pub mod exit_codes;
pub mod image_source;
pub mod output;
pub mod project;
pub mod quick_info;
pub mod resolver;
pub mod rule;
pub mod rule_config_serde;
pub mod rules;
pub mod syntax;

pub use rules::*;

use crate::rule::{CheckerContext, Diagnostic, ItemCheckResult, LintResult, LintWarning, Rule};
use crate::syntax::SyntaxTree;
use std::time::Instant;

/// Whether any rule could fire on this content at all
fn has_pseudo_selectors(content: &str) -> bool {
    content.contains(':')
}

/// Run rules over a parsed tree in document order
///
/// Each item is handed to the rules registered for its kind, in rule order,
/// until one of them returns [`ItemCheckResult::Stop`].
pub fn check_tree(tree: &SyntaxTree, rules: &[Box<dyn Rule>]) -> Vec<Diagnostic> {
    let mut ctx = CheckerContext::new(tree);

    for item in tree.iter() {
        let kind = tree.kind(item);
        for rule in rules.iter().filter(|rule| rule.item_kinds().contains(&kind)) {
            if rule.check_item(item, &mut ctx) == ItemCheckResult::Stop {
                break;
            }
        }
    }

    ctx.into_diagnostics()
}

/// Lint stylesheet content with the given rules
pub fn lint(content: &str, rules: &[Box<dyn Rule>], verbose: bool) -> LintResult {
    if content.is_empty() || !has_pseudo_selectors(content) {
        return Ok(Vec::new());
    }

    let start = Instant::now();
    let tree = syntax::parse(content);
    let diagnostics = check_tree(&tree, rules);

    let profile_rules = std::env::var("STYLELENS_PROFILE").is_ok();
    if profile_rules {
        eprintln!("[LINT] {} items {:?}", tree.len(), start.elapsed());
    }
    if verbose {
        log::debug!("Checked {} items with {} rules in {:?}", tree.len(), rules.len(), start.elapsed());
    }

    Ok(diagnostics
        .iter()
        .map(|diagnostic| LintWarning::from_diagnostic(&tree, diagnostic))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::rule::{ErrorFlags, Severity};
    use crate::syntax::{ItemId, ItemKind};

    fn default_rules() -> Vec<Box<dyn Rule>> {
        rules::all_rules(&Config::default())
    }

    #[derive(Clone)]
    struct StopOnPseudo;

    impl Rule for StopOnPseudo {
        fn name(&self) -> &'static str {
            "XX900"
        }

        fn description(&self) -> &'static str {
            "Claims every pseudo selector"
        }

        fn item_kinds(&self) -> &'static [ItemKind] {
            &[ItemKind::PseudoElementSelector, ItemKind::PseudoClassSelector]
        }

        fn check_item(&self, item: ItemId, ctx: &mut CheckerContext<'_>) -> ItemCheckResult {
            ctx.add_error(Diagnostic {
                item,
                message: "claimed".to_string(),
                flags: ErrorFlags::NONE,
                rule_name: self.name(),
            });
            ItemCheckResult::Stop
        }

        fn from_config(_config: &Config) -> Box<dyn Rule> {
            Box::new(StopOnPseudo)
        }
    }

    #[test]
    fn test_has_pseudo_selectors() {
        assert!(!has_pseudo_selectors("a { }"));
        assert!(has_pseudo_selectors("a:hover {}"));
    }

    #[test]
    fn test_lint_empty_content() {
        assert!(lint("", &default_rules(), false).unwrap().is_empty());
    }

    #[test]
    fn test_lint_reports_pseudo_element_first() {
        let warnings = lint("a::before:hover { color: red; }", &default_rules(), false).unwrap();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].severity, Severity::Error);
        assert_eq!(warnings[0].line, 1);
        assert_eq!(warnings[0].column, 2);
        assert_eq!(warnings[0].rule_name.as_deref(), Some("SL001"));
    }

    #[test]
    fn test_lint_clean_stylesheet() {
        let css = "a:hover::before { content: ''; }\nul li:first-child { margin: 0; }";
        assert!(lint(css, &default_rules(), false).unwrap().is_empty());
    }

    #[test]
    fn test_stop_skips_later_rules() {
        let tree = syntax::parse("a::before:hover {}");
        let rules: Vec<Box<dyn Rule>> = vec![Box::new(StopOnPseudo), Box::new(SL001PseudoOrder::new())];
        let diagnostics = check_tree(&tree, &rules);

        assert_eq!(diagnostics.len(), 2);
        assert!(diagnostics.iter().all(|d| d.rule_name == "XX900"));
    }
}
