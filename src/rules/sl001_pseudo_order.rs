use crate::rule::{CheckerContext, Diagnostic, ErrorFlags, ItemCheckResult, Rule};
use crate::rule_config_serde::{self, RuleConfig};
use crate::syntax::{ItemId, ItemKind};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct SL001Config {
    /// Report plain selectors written after a pseudo selector (`a:hover.active`)
    #[serde(default = "default_true")]
    pub selector_placement: bool,
}

fn default_true() -> bool {
    true
}

impl Default for SL001Config {
    fn default() -> Self {
        Self {
            selector_placement: true,
        }
    }
}

impl RuleConfig for SL001Config {
    const RULE_NAME: &'static str = "SL001";
}

const ITEM_KINDS: &[ItemKind] = &[
    ItemKind::PseudoClassSelector,
    ItemKind::PseudoClassFunctionSelector,
    ItemKind::PseudoElementFunctionSelector,
    ItemKind::PseudoElementSelector,
];

/// Pseudo-elements come last in a compound selector
///
/// `a::before:hover` is reported as an error on `::before`. A plain selector
/// glued to the end of a pseudo selector, as in `a:hover.active`, gets an
/// advisory on the plain selector. Vendor-prefixed pseudos are left alone.
#[derive(Clone, Default)]
pub struct SL001PseudoOrder {
    config: SL001Config,
}

impl SL001PseudoOrder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config_struct(config: SL001Config) -> Self {
        Self { config }
    }

    fn is_vendor_prefixed(text: &str) -> bool {
        text.trim_start_matches(':').starts_with('-')
    }
}

impl Rule for SL001PseudoOrder {
    fn name(&self) -> &'static str {
        "SL001"
    }

    fn description(&self) -> &'static str {
        "Pseudo-elements should follow pseudo-classes and other selectors"
    }

    fn item_kinds(&self) -> &'static [ItemKind] {
        ITEM_KINDS
    }

    fn check_item(&self, item: ItemId, ctx: &mut CheckerContext<'_>) -> ItemCheckResult {
        let tree = ctx.tree();
        let text = tree.text(item);

        if Self::is_vendor_prefixed(text) {
            return ItemCheckResult::Continue;
        }

        let Some(next) = tree.next_sibling(item) else {
            return ItemCheckResult::Continue;
        };
        let next_text = tree.text(next);

        if next_text.starts_with(':') {
            if tree.kind(item).is_pseudo_element() && !tree.kind(next).is_pseudo_element() {
                ctx.add_error(Diagnostic {
                    item,
                    message: format!("pseudo-element `{text}` must not precede pseudo-class `{next_text}`"),
                    flags: ErrorFlags::TASK_LIST_ERROR | ErrorFlags::UNDERLINE_RED,
                    rule_name: self.name(),
                });
            }
        } else if self.config.selector_placement && tree.item(item).after_end == tree.item(next).start {
            ctx.add_error(Diagnostic {
                item: next,
                message: format!("selector `{next_text}` should appear before pseudo-selectors"),
                flags: ErrorFlags::NONE,
                rule_name: self.name(),
            });
        }

        ItemCheckResult::Continue
    }

    fn default_config_section(&self) -> Option<(String, toml::Value)> {
        rule_config_serde::default_section::<SL001Config>()
    }

    fn from_config(config: &crate::config::Config) -> Box<dyn Rule>
    where
        Self: Sized,
    {
        Box::new(Self::from_config_struct(rule_config_serde::load_rule_config(config)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::SyntaxTree;

    /// One compound selector made of the given (kind, text) tokens, back to back
    fn compound(tokens: &[(ItemKind, &str)]) -> (SyntaxTree, Vec<ItemId>) {
        let source: String = tokens.iter().map(|(_, t)| *t).collect();
        let mut tree = SyntaxTree::new(source.as_str());
        let root = tree.root();
        let parent = tree.push(root, ItemKind::SimpleSelector, 0, source.len());
        let mut offset = 0;
        let ids = tokens
            .iter()
            .map(|(kind, text)| {
                let id = tree.push(parent, *kind, offset, offset + text.len());
                offset += text.len();
                id
            })
            .collect();
        (tree, ids)
    }

    fn check(rule: &SL001PseudoOrder, tree: &SyntaxTree, item: ItemId) -> Vec<Diagnostic> {
        let mut ctx = CheckerContext::new(tree);
        assert_eq!(rule.check_item(item, &mut ctx), ItemCheckResult::Continue);
        ctx.into_diagnostics()
    }

    #[test]
    fn test_pseudo_element_before_pseudo_class() {
        let (tree, ids) = compound(&[
            (ItemKind::PseudoElementSelector, "::before"),
            (ItemKind::PseudoClassSelector, ":hover"),
        ]);
        let diagnostics = check(&SL001PseudoOrder::new(), &tree, ids[0]);

        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].item, ids[0]);
        assert_eq!(
            diagnostics[0].message,
            "pseudo-element `::before` must not precede pseudo-class `:hover`"
        );
        assert!(diagnostics[0].flags.contains(ErrorFlags::TASK_LIST_ERROR));
        assert!(diagnostics[0].flags.contains(ErrorFlags::UNDERLINE_RED));
    }

    #[test]
    fn test_two_pseudo_elements_are_fine() {
        let (tree, ids) = compound(&[
            (ItemKind::PseudoElementSelector, "::after"),
            (ItemKind::PseudoElementFunctionSelector, "::part(label)"),
        ]);
        assert!(check(&SL001PseudoOrder::new(), &tree, ids[0]).is_empty());
    }

    #[test]
    fn test_pseudo_class_before_pseudo_element_is_fine() {
        let (tree, ids) = compound(&[
            (ItemKind::PseudoClassSelector, ":hover"),
            (ItemKind::PseudoElementSelector, "::before"),
        ]);
        assert!(check(&SL001PseudoOrder::new(), &tree, ids[0]).is_empty());
    }

    #[test]
    fn test_selector_after_pseudo_is_advisory() {
        let (tree, ids) = compound(&[
            (ItemKind::PseudoClassSelector, ":hover"),
            (ItemKind::ClassSelector, ".foo"),
        ]);
        let diagnostics = check(&SL001PseudoOrder::new(), &tree, ids[0]);

        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].item, ids[1]);
        assert_eq!(diagnostics[0].message, "selector `.foo` should appear before pseudo-selectors");
        assert_eq!(diagnostics[0].flags, ErrorFlags::NONE);
    }

    #[test]
    fn test_selector_placement_can_be_disabled() {
        let (tree, ids) = compound(&[
            (ItemKind::PseudoClassSelector, ":hover"),
            (ItemKind::ClassSelector, ".foo"),
        ]);
        let rule = SL001PseudoOrder::from_config_struct(SL001Config {
            selector_placement: false,
        });
        assert!(check(&rule, &tree, ids[0]).is_empty());
    }

    #[test]
    fn test_separated_selector_is_not_reported() {
        let mut tree = SyntaxTree::new(":hover .foo");
        let root = tree.root();
        let parent = tree.push(root, ItemKind::SimpleSelector, 0, 11);
        let hover = tree.push(parent, ItemKind::PseudoClassSelector, 0, 6);
        tree.push(parent, ItemKind::ClassSelector, 7, 11);

        assert!(check(&SL001PseudoOrder::new(), &tree, hover).is_empty());
    }

    #[test]
    fn test_vendor_prefixed_is_skipped() {
        let (tree, ids) = compound(&[
            (ItemKind::PseudoElementSelector, "-webkit-:hover"),
            (ItemKind::PseudoClassSelector, ":hover"),
        ]);
        assert!(check(&SL001PseudoOrder::new(), &tree, ids[0]).is_empty());

        let (tree, ids) = compound(&[
            (ItemKind::PseudoElementSelector, "::-webkit-scrollbar"),
            (ItemKind::PseudoClassSelector, ":hover"),
        ]);
        assert!(check(&SL001PseudoOrder::new(), &tree, ids[0]).is_empty());
    }

    #[test]
    fn test_last_item_has_nothing_to_compare() {
        let (tree, ids) = compound(&[(ItemKind::PseudoElementSelector, "::before")]);
        assert!(check(&SL001PseudoOrder::new(), &tree, ids[0]).is_empty());
    }
}
