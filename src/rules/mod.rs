mod sl001_pseudo_order;

pub use sl001_pseudo_order::{SL001Config, SL001PseudoOrder};

use crate::config::GlobalConfig;
use crate::rule::Rule;
use std::collections::HashSet;

/// Returns all rule instances for config validation and CLI
pub fn all_rules(config: &crate::config::Config) -> Vec<Box<dyn Rule>> {
    type RuleCtor = fn(&crate::config::Config) -> Box<dyn Rule>;
    const RULES: &[(&str, RuleCtor)] = &[("SL001", SL001PseudoOrder::from_config)];
    RULES.iter().map(|(_, ctor)| ctor(config)).collect()
}

/// Apply `enable`/`disable` from the global config
pub fn filter_rules(rules: &[Box<dyn Rule>], global_config: &GlobalConfig) -> Vec<Box<dyn Rule>> {
    let disabled_rules: HashSet<String> = global_config.disable.iter().map(|r| r.to_ascii_uppercase()).collect();
    let enabled_rules: HashSet<String> = global_config.enable.iter().map(|r| r.to_ascii_uppercase()).collect();

    // 'disable = ["all"]' turns everything off unless listed in 'enable'
    let disable_all = disabled_rules.contains("ALL");

    rules
        .iter()
        .filter(|rule| {
            let name = rule.name();
            if disable_all || !enabled_rules.is_empty() {
                enabled_rules.contains(name) && (disable_all || !disabled_rules.contains(name))
            } else {
                !disabled_rules.contains(name)
            }
        })
        .map(|rule| dyn_clone::clone_box(&**rule))
        .collect()
}
