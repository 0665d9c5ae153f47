use stylelens_lib::config::parse_config;
use stylelens_lib::lint;
use stylelens_lib::rule::{LintWarning, Rule, Severity};
use stylelens_lib::rules::{SL001PseudoOrder, all_rules};

fn check(css: &str) -> Vec<LintWarning> {
    let rules: Vec<Box<dyn Rule>> = vec![Box::new(SL001PseudoOrder::new())];
    lint(css, &rules, false).unwrap()
}

#[test]
fn test_pseudo_element_before_pseudo_class() {
    let result = check("a::before:hover { color: red; }");

    assert_eq!(result.len(), 1);
    assert_eq!(result[0].severity, Severity::Error);
    assert_eq!(result[0].line, 1);
    assert_eq!(result[0].column, 2);
    assert_eq!(result[0].end_column, 10);
    assert_eq!(
        result[0].message,
        "pseudo-element `::before` must not precede pseudo-class `:hover`"
    );
}

#[test]
fn test_correct_order_is_clean() {
    assert!(check("a:hover::before { content: ''; }").is_empty());
    assert!(check("li:not(.done)::marker { color: gray; }").is_empty());
    assert!(check("a.external:visited { color: purple; }").is_empty());
}

#[test]
fn test_pseudo_element_before_functional_pseudo_class() {
    let result = check("a::after:not(.x) {}");
    assert_eq!(result.len(), 1);
    assert!(result[0].message.contains("`:not(.x)`"));
}

#[test]
fn test_legacy_single_colon_pseudo_element() {
    let result = check("p:first-line:hover {}");
    assert_eq!(result.len(), 1);
    assert!(result[0].message.contains("`:first-line`"));
}

#[test]
fn test_consecutive_pseudo_elements_are_not_reported() {
    assert!(check("a::before::after {}").is_empty());
}

#[test]
fn test_vendor_prefixed_pseudo_is_skipped() {
    assert!(check("input::-webkit-input-placeholder:hover {}").is_empty());
    assert!(check("input::-moz-placeholder:focus {}").is_empty());
}

#[test]
fn test_selector_after_pseudo_is_advisory() {
    let result = check("a:hover.active {}");

    assert_eq!(result.len(), 1);
    assert_eq!(result[0].severity, Severity::Warning);
    assert_eq!(result[0].column, 8);
    assert_eq!(result[0].message, "selector `.active` should appear before pseudo-selectors");
}

#[test]
fn test_id_and_attribute_after_pseudo() {
    let result = check("a:hover#main {}\na:focus[href] {}");
    assert_eq!(result.len(), 2);
    assert!(result[0].message.contains("`#main`"));
    assert_eq!(result[1].line, 2);
    assert!(result[1].message.contains("`[href]`"));
}

#[test]
fn test_descendant_selector_is_not_adjacent() {
    assert!(check("a:hover .child {}").is_empty());
    assert!(check("a:hover > .child {}").is_empty());
}

#[test]
fn test_each_selector_in_a_group_is_checked() {
    let result = check("a::before:hover, b::after:focus {}");
    assert_eq!(result.len(), 2);
    assert_eq!(result[0].column, 2);
    assert_eq!(result[1].column, 19);
}

#[test]
fn test_nested_in_media_query() {
    let css = "@media (min-width: 600px) {\n  nav a::after:hover { opacity: 1; }\n}\n";
    let result = check(css);
    assert_eq!(result.len(), 1);
    assert_eq!(result[0].line, 2);
    assert_eq!(result[0].column, 8);
}

#[test]
fn test_declarations_are_not_selectors() {
    assert!(check("a { background: url(data:image/png;base64,AAAA); margin: 0; }").is_empty());
}

#[test]
fn test_selector_placement_config() {
    let config = parse_config("[SL001]\nselector-placement = false\n").unwrap();
    let rules = all_rules(&config);

    assert!(lint("a:hover.active {}", &rules, false).unwrap().is_empty());
    assert_eq!(lint("a::before:hover {}", &rules, false).unwrap().len(), 1);
}
