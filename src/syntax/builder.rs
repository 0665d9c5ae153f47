//! Builds a [`SyntaxTree`] from stylesheet text using the `cssparser` crate.
//!
//! The tokenizer does all the lexing; this module only groups tokens into
//! rule sets, selectors, declarations and `url(...)` references and records
//! their byte ranges. Malformed input never fails the build: the affected
//! items are marked invalid and parsing resumes with the next token.

use super::{ItemId, ItemKind, SyntaxTree};
use cssparser::{Delimiter, ParseError, Parser, ParserInput, Token};

type BuildResult<'i> = Result<(), ParseError<'i, ()>>;

/// CSS2 pseudo-elements that are still written with a single colon
const LEGACY_PSEUDO_ELEMENTS: &[&str] = &["before", "after", "first-line", "first-letter"];

/// At-rules whose block holds rule sets rather than declarations
const CONDITIONAL_AT_RULES: &[&str] = &["media", "supports", "document", "layer", "container", "scope"];

/// Parse stylesheet text into a syntax tree
pub fn parse(css: &str) -> SyntaxTree {
    let mut tree = SyntaxTree::new(css);
    let mut input = ParserInput::new(css);
    let mut parser = Parser::new(&mut input);
    let root = tree.root();

    if let Err(e) = build_rule_list(&mut parser, &mut tree, root) {
        log::debug!("Stylesheet parse stopped early: {e:?}");
    }

    tree
}

fn offset(p: &Parser<'_, '_>) -> usize {
    p.position().byte_index()
}

/// Skip whitespace and comments without consuming the following token
fn skip_trivia(p: &mut Parser<'_, '_>) {
    loop {
        let state = p.state();
        match p.next_including_whitespace_and_comments() {
            Ok(Token::WhiteSpace(_)) | Ok(Token::Comment(_)) => continue,
            _ => {
                p.reset(&state);
                break;
            }
        }
    }
}

/// Consume the remainder of the block the parser has just entered
fn skip_block<'i>(p: &mut Parser<'i, '_>) {
    let skipped: BuildResult<'i> = p.parse_nested_block(|nested| {
        while nested.next_including_whitespace_and_comments().is_ok() {}
        Ok(())
    });
    if let Err(e) = skipped {
        log::debug!("Failed to skip block: {e:?}");
    }
}

fn build_rule_list<'i>(p: &mut Parser<'i, '_>, tree: &mut SyntaxTree, parent: ItemId) -> BuildResult<'i> {
    loop {
        skip_trivia(p);
        let start = offset(p);
        let state = p.state();
        let token = match p.next_including_whitespace_and_comments() {
            Ok(t) => t.clone(),
            Err(_) => break,
        };

        match token {
            Token::CDO | Token::CDC => {}
            Token::AtKeyword(name) => build_at_rule(p, tree, parent, start, &name)?,
            _ => {
                p.reset(&state);
                build_rule_set(p, tree, parent)?;
            }
        }
    }
    Ok(())
}

fn build_at_rule<'i>(
    p: &mut Parser<'i, '_>,
    tree: &mut SyntaxTree,
    parent: ItemId,
    start: usize,
    name: &str,
) -> BuildResult<'i> {
    let at_rule = tree.push(parent, ItemKind::AtRule, start, offset(p));

    loop {
        let token_start = offset(p);
        let token = match p.next_including_whitespace_and_comments() {
            Ok(t) => t.clone(),
            Err(_) => break,
        };

        match token {
            Token::Semicolon => break,
            Token::CurlyBracketBlock => {
                let block = tree.push(at_rule, ItemKind::RuleBlock, token_start, offset(p));
                let holds_rules = CONDITIONAL_AT_RULES.iter().any(|r| name.eq_ignore_ascii_case(r));
                p.parse_nested_block(|nested| {
                    if holds_rules {
                        build_rule_list(nested, tree, block)
                    } else {
                        build_declarations(nested, tree, block)
                    }
                })?;
                tree.set_after_end(block, offset(p));
                break;
            }
            other => push_value(p, tree, at_rule, other, token_start)?,
        }
    }

    tree.set_after_end(at_rule, offset(p));
    Ok(())
}

/// Selector group followed by a declaration block
fn build_rule_set<'i>(p: &mut Parser<'i, '_>, tree: &mut SyntaxTree, parent: ItemId) -> BuildResult<'i> {
    let rule = tree.push(parent, ItemKind::RuleSet, offset(p), offset(p));
    let mut selector: Option<ItemId> = None;
    let mut compound: Option<ItemId> = None;

    loop {
        let token_start = offset(p);
        let token = match p.next_including_whitespace_and_comments() {
            Ok(t) => t.clone(),
            Err(_) => {
                // Selector with no block
                tree.mark_invalid(rule);
                break;
            }
        };

        match token {
            Token::CurlyBracketBlock => {
                let block = tree.push(rule, ItemKind::RuleBlock, token_start, offset(p));
                p.parse_nested_block(|nested| build_declarations(nested, tree, block))?;
                tree.set_after_end(block, offset(p));
                break;
            }
            Token::Semicolon => {
                tree.mark_invalid(rule);
                break;
            }
            Token::Comment(_) => {}
            Token::WhiteSpace(_) => compound = None,
            Token::Comma => {
                selector = None;
                compound = None;
            }
            Token::Delim(c @ ('>' | '+' | '~')) => {
                let sel = *selector.get_or_insert_with(|| tree.push(rule, ItemKind::Selector, token_start, token_start));
                tree.push(sel, ItemKind::Combinator, token_start, token_start + c.len_utf8());
                tree.set_after_end(sel, offset(p));
                compound = None;
            }
            other => {
                let sel = *selector.get_or_insert_with(|| tree.push(rule, ItemKind::Selector, token_start, token_start));
                let comp =
                    *compound.get_or_insert_with(|| tree.push(sel, ItemKind::SimpleSelector, token_start, token_start));
                push_selector_token(p, tree, comp, other, token_start);
                tree.set_after_end(comp, offset(p));
                tree.set_after_end(sel, offset(p));
            }
        }
    }

    tree.set_after_end(rule, offset(p));
    Ok(())
}

/// Classify one token of a compound selector, consuming any tokens it owns
fn push_selector_token<'i>(p: &mut Parser<'i, '_>, tree: &mut SyntaxTree, compound: ItemId, token: Token<'i>, start: usize) {
    match token {
        Token::Ident(_) | Token::Delim('*') | Token::Delim('&') => {
            tree.push(compound, ItemKind::ElementName, start, offset(p));
        }
        Token::IDHash(_) | Token::Hash(_) => {
            tree.push(compound, ItemKind::IdSelector, start, offset(p));
        }
        Token::Delim('.') => {
            let valid = expect_ident(p);
            let id = tree.push(compound, ItemKind::ClassSelector, start, offset(p));
            if !valid {
                tree.mark_invalid(id);
            }
        }
        Token::SquareBracketBlock => {
            skip_block(p);
            tree.push(compound, ItemKind::AttributeSelector, start, offset(p));
        }
        Token::Colon => push_pseudo(p, tree, compound, start),
        Token::Function(_) | Token::ParenthesisBlock => {
            skip_block(p);
            let id = tree.push(compound, ItemKind::Token, start, offset(p));
            tree.mark_invalid(id);
        }
        _ => {
            let id = tree.push(compound, ItemKind::Token, start, offset(p));
            tree.mark_invalid(id);
        }
    }
}

/// Consume an identifier if one follows immediately
fn expect_ident(p: &mut Parser<'_, '_>) -> bool {
    let state = p.state();
    match p.next_including_whitespace_and_comments() {
        Ok(Token::Ident(_)) => true,
        _ => {
            p.reset(&state);
            false
        }
    }
}

/// `:name`, `:name(...)`, `::name` or `::name(...)`; the first colon is consumed
fn push_pseudo<'i>(p: &mut Parser<'i, '_>, tree: &mut SyntaxTree, compound: ItemId, start: usize) {
    let state = p.state();
    let double_colon = matches!(p.next_including_whitespace_and_comments(), Ok(Token::Colon));
    if !double_colon {
        p.reset(&state);
    }

    let state = p.state();
    let name = match p.next_including_whitespace_and_comments() {
        Ok(t) => t.clone(),
        Err(_) => {
            let id = tree.push(compound, ItemKind::Token, start, offset(p));
            tree.mark_invalid(id);
            return;
        }
    };

    let kind = match (&name, double_colon) {
        (Token::Ident(_), true) => ItemKind::PseudoElementSelector,
        (Token::Function(_), true) => ItemKind::PseudoElementFunctionSelector,
        (Token::Ident(ident), false)
            if LEGACY_PSEUDO_ELEMENTS.iter().any(|e| ident.eq_ignore_ascii_case(e)) =>
        {
            ItemKind::PseudoElementSelector
        }
        (Token::Ident(_), false) => ItemKind::PseudoClassSelector,
        (Token::Function(_), false) => ItemKind::PseudoClassFunctionSelector,
        _ => {
            p.reset(&state);
            let id = tree.push(compound, ItemKind::Token, start, offset(p));
            tree.mark_invalid(id);
            return;
        }
    };

    if matches!(name, Token::Function(_)) {
        skip_block(p);
    }
    tree.push(compound, kind, start, offset(p));
}

fn build_declarations<'i>(p: &mut Parser<'i, '_>, tree: &mut SyntaxTree, parent: ItemId) -> BuildResult<'i> {
    loop {
        skip_trivia(p);
        if p.is_exhausted() {
            break;
        }

        let start = offset(p);
        let state = p.state();
        if let Ok(Token::AtKeyword(name)) = p.next_including_whitespace_and_comments().cloned() {
            build_at_rule(p, tree, parent, start, &name)?;
            continue;
        }
        p.reset(&state);

        let declaration = tree.push(parent, ItemKind::Declaration, start, start);
        let mut last_end = start;
        p.parse_until_after(Delimiter::Semicolon, |nested| {
            build_values(nested, tree, declaration, &mut last_end)
        })?;
        tree.set_after_end(declaration, last_end);
    }
    Ok(())
}

fn build_values<'i>(
    p: &mut Parser<'i, '_>,
    tree: &mut SyntaxTree,
    parent: ItemId,
    last_end: &mut usize,
) -> BuildResult<'i> {
    loop {
        let token_start = offset(p);
        let token = match p.next_including_whitespace_and_comments() {
            Ok(t) => t.clone(),
            Err(_) => break,
        };
        if matches!(token, Token::WhiteSpace(_) | Token::Comment(_)) {
            continue;
        }
        push_value(p, tree, parent, token, token_start)?;
        *last_end = offset(p);
    }
    Ok(())
}

/// Record one value token; functions, blocks and urls are descended into
fn push_value<'i>(
    p: &mut Parser<'i, '_>,
    tree: &mut SyntaxTree,
    parent: ItemId,
    token: Token<'i>,
    start: usize,
) -> BuildResult<'i> {
    let mut nested_end = start;
    match token {
        Token::WhiteSpace(_) | Token::Comment(_) => {}
        Token::UnquotedUrl(_) => push_unquoted_url(tree, parent, start, offset(p)),
        Token::BadUrl(_) => {
            let url = tree.push(parent, ItemKind::Url, start, offset(p));
            tree.mark_invalid(url);
        }
        Token::Function(name) if name.eq_ignore_ascii_case("url") || name.eq_ignore_ascii_case("src") => {
            let url = tree.push(parent, ItemKind::Url, start, offset(p));
            p.parse_nested_block(|nested| build_quoted_url(nested, tree, url))?;
            tree.set_after_end(url, offset(p));
            if tree.find_child(url, ItemKind::UrlString).is_none() {
                tree.mark_invalid(url);
            }
        }
        Token::Function(_) => {
            let function = tree.push(parent, ItemKind::Function, start, offset(p));
            p.parse_nested_block(|nested| build_values(nested, tree, function, &mut nested_end))?;
            tree.set_after_end(function, offset(p));
        }
        Token::ParenthesisBlock | Token::SquareBracketBlock | Token::CurlyBracketBlock => {
            let block = tree.push(parent, ItemKind::Token, start, offset(p));
            p.parse_nested_block(|nested| build_values(nested, tree, block, &mut nested_end))?;
            tree.set_after_end(block, offset(p));
        }
        Token::BadString(_) => {
            let id = tree.push(parent, ItemKind::Token, start, offset(p));
            tree.mark_invalid(id);
        }
        _ => {
            tree.push(parent, ItemKind::Token, start, offset(p));
        }
    }
    Ok(())
}

/// `url( "..." )`: the string token becomes the url string item
fn build_quoted_url<'i>(p: &mut Parser<'i, '_>, tree: &mut SyntaxTree, url: ItemId) -> BuildResult<'i> {
    loop {
        let token_start = offset(p);
        match p.next_including_whitespace_and_comments() {
            Ok(Token::QuotedString(_)) => {
                if tree.find_child(url, ItemKind::UrlString).is_none() {
                    tree.push(url, ItemKind::UrlString, token_start, offset(p));
                }
            }
            Ok(Token::BadString(_)) => {
                let id = tree.push(url, ItemKind::UrlString, token_start, offset(p));
                tree.mark_invalid(id);
            }
            Ok(_) => {}
            Err(_) => break,
        }
    }
    Ok(())
}

/// `url(path)` arrives as one token; carve the path out of its source slice
fn push_unquoted_url(tree: &mut SyntaxTree, parent: ItemId, start: usize, after_end: usize) {
    let url = tree.push(parent, ItemKind::Url, start, after_end);
    let slice = tree.source().get(start..after_end).unwrap_or("");

    let Some(open) = slice.find('(') else {
        tree.mark_invalid(url);
        return;
    };
    let close = if slice.ends_with(')') { slice.len() - 1 } else { slice.len() };
    let inner = &slice[open + 1..close.max(open + 1)];
    let leading = inner.len() - inner.trim_start().len();
    let trimmed_len = inner.trim().len();

    let inner_start = start + open + 1 + leading;
    tree.push(url, ItemKind::UrlString, inner_start, inner_start + trimmed_len);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds_with_text(tree: &SyntaxTree, kind: ItemKind) -> Vec<String> {
        tree.iter()
            .filter(|&id| tree.kind(id) == kind)
            .map(|id| tree.text(id).to_string())
            .collect()
    }

    #[test]
    fn test_rule_set_structure() {
        let tree = parse("a:hover.foo > b::before { color: red; }");
        assert_eq!(kinds_with_text(&tree, ItemKind::RuleSet).len(), 1);
        assert_eq!(kinds_with_text(&tree, ItemKind::Selector), vec!["a:hover.foo > b::before"]);
        assert_eq!(
            kinds_with_text(&tree, ItemKind::SimpleSelector),
            vec!["a:hover.foo", "b::before"]
        );
        assert_eq!(kinds_with_text(&tree, ItemKind::Combinator), vec![">"]);
        assert_eq!(kinds_with_text(&tree, ItemKind::PseudoClassSelector), vec![":hover"]);
        assert_eq!(kinds_with_text(&tree, ItemKind::PseudoElementSelector), vec!["::before"]);
        assert_eq!(kinds_with_text(&tree, ItemKind::ClassSelector), vec![".foo"]);
        assert_eq!(kinds_with_text(&tree, ItemKind::Declaration), vec!["color: red"]);
    }

    #[test]
    fn test_selector_group_splits_on_comma() {
        let tree = parse("a::after, b:focus {}");
        assert_eq!(kinds_with_text(&tree, ItemKind::Selector), vec!["a::after", "b:focus"]);
    }

    #[test]
    fn test_pseudo_functions() {
        let tree = parse("li:nth-child(2n + 1)::slotted(span) {}");
        assert_eq!(
            kinds_with_text(&tree, ItemKind::PseudoClassFunctionSelector),
            vec![":nth-child(2n + 1)"]
        );
        assert_eq!(
            kinds_with_text(&tree, ItemKind::PseudoElementFunctionSelector),
            vec!["::slotted(span)"]
        );
    }

    #[test]
    fn test_legacy_single_colon_pseudo_elements() {
        let tree = parse("p:first-line, p:AFTER {}");
        assert_eq!(
            kinds_with_text(&tree, ItemKind::PseudoElementSelector),
            vec![":first-line", ":AFTER"]
        );
        assert!(kinds_with_text(&tree, ItemKind::PseudoClassSelector).is_empty());
    }

    #[test]
    fn test_unquoted_url() {
        let tree = parse("a { background: url( img/a.png ) no-repeat; }");
        assert_eq!(kinds_with_text(&tree, ItemKind::Url), vec!["url( img/a.png )"]);
        assert_eq!(kinds_with_text(&tree, ItemKind::UrlString), vec!["img/a.png"]);
    }

    #[test]
    fn test_quoted_url() {
        let tree = parse(r#"a { background-image: url("../img/b.gif"); }"#);
        assert_eq!(kinds_with_text(&tree, ItemKind::UrlString), vec![r#""../img/b.gif""#]);
        let url = tree.iter().find(|&id| tree.kind(id) == ItemKind::Url).unwrap();
        assert!(tree.item(url).valid);
    }

    #[test]
    fn test_url_inside_function_and_at_rules() {
        let css = r#"
@import url("base.css");
@font-face { src: url(font.woff) format("woff"); }
@media screen { .x { background: image-set(url(a.png) 1x); } }
"#;
        let tree = parse(css);
        assert_eq!(
            kinds_with_text(&tree, ItemKind::UrlString),
            vec![r#""base.css""#, "font.woff", "a.png"]
        );
        assert_eq!(kinds_with_text(&tree, ItemKind::AtRule).len(), 3);
    }

    #[test]
    fn test_empty_url_is_invalid() {
        let tree = parse("a { background: url(); }");
        let url = tree.iter().find(|&id| tree.kind(id) == ItemKind::Url).unwrap();
        let string = tree.find_child(url, ItemKind::UrlString).unwrap();
        assert_eq!(tree.text(string), "");
    }

    #[test]
    fn test_unterminated_rule_is_invalid() {
        let tree = parse("a:hover");
        let rule = tree.iter().find(|&id| tree.kind(id) == ItemKind::RuleSet).unwrap();
        assert!(!tree.item(rule).valid);
    }

    #[test]
    fn test_empty_source() {
        let tree = parse("");
        assert!(tree.is_empty());
    }
}
