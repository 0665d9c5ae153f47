//! Parsed stylesheet tree.
//!
//! Items live in an arena owned by [`SyntaxTree`] and are addressed by
//! [`ItemId`]. The tree is produced once by a builder and is read-only for
//! everything downstream: rules and the quick-info provider only navigate it.

pub mod builder;

pub use builder::parse;

/// Handle to an item inside a [`SyntaxTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(usize);

impl ItemId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Closed set of node kinds produced by the tree builder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    StyleSheet,
    RuleSet,
    AtRule,
    /// One selector of a (possibly comma separated) selector group
    Selector,
    /// Compound selector: the tokens between two combinators
    SimpleSelector,
    ElementName,
    ClassSelector,
    IdSelector,
    AttributeSelector,
    PseudoClassSelector,
    PseudoClassFunctionSelector,
    PseudoElementSelector,
    PseudoElementFunctionSelector,
    Combinator,
    RuleBlock,
    Declaration,
    Function,
    /// A whole `url(...)` reference
    Url,
    /// The string inside a `url(...)`, quotes included
    UrlString,
    Token,
}

impl ItemKind {
    pub fn is_pseudo_element(self) -> bool {
        matches!(
            self,
            ItemKind::PseudoElementSelector | ItemKind::PseudoElementFunctionSelector
        )
    }

    pub fn is_pseudo_class(self) -> bool {
        matches!(
            self,
            ItemKind::PseudoClassSelector | ItemKind::PseudoClassFunctionSelector
        )
    }

    pub fn is_pseudo(self) -> bool {
        self.is_pseudo_class() || self.is_pseudo_element()
    }

    pub fn name(self) -> &'static str {
        match self {
            ItemKind::StyleSheet => "stylesheet",
            ItemKind::RuleSet => "rule-set",
            ItemKind::AtRule => "at-rule",
            ItemKind::Selector => "selector",
            ItemKind::SimpleSelector => "simple-selector",
            ItemKind::ElementName => "element-name",
            ItemKind::ClassSelector => "class-selector",
            ItemKind::IdSelector => "id-selector",
            ItemKind::AttributeSelector => "attribute-selector",
            ItemKind::PseudoClassSelector => "pseudo-class",
            ItemKind::PseudoClassFunctionSelector => "pseudo-class-function",
            ItemKind::PseudoElementSelector => "pseudo-element",
            ItemKind::PseudoElementFunctionSelector => "pseudo-element-function",
            ItemKind::Combinator => "combinator",
            ItemKind::RuleBlock => "rule-block",
            ItemKind::Declaration => "declaration",
            ItemKind::Function => "function",
            ItemKind::Url => "url",
            ItemKind::UrlString => "url-string",
            ItemKind::Token => "token",
        }
    }
}

/// A node of the parsed stylesheet
///
/// `start` and `after_end` are byte offsets into the tree's source; the
/// item's text is the half-open range between them.
#[derive(Debug, Clone)]
pub struct SyntaxItem {
    pub kind: ItemKind,
    pub start: usize,
    pub after_end: usize,
    pub valid: bool,
    parent: Option<ItemId>,
    children: Vec<ItemId>,
}

impl SyntaxItem {
    pub fn len(&self) -> usize {
        self.after_end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.after_end
    }

    pub fn parent(&self) -> Option<ItemId> {
        self.parent
    }

    pub fn children(&self) -> &[ItemId] {
        &self.children
    }
}

/// Arena-backed stylesheet tree
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    source: String,
    items: Vec<SyntaxItem>,
}

impl SyntaxTree {
    /// Create a tree holding only the root stylesheet item
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let root = SyntaxItem {
            kind: ItemKind::StyleSheet,
            start: 0,
            after_end: source.len(),
            valid: true,
            parent: None,
            children: Vec::new(),
        };
        Self {
            source,
            items: vec![root],
        }
    }

    pub fn root(&self) -> ItemId {
        ItemId(0)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Number of items, root included
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.len() == 1
    }

    /// Append a child to `parent`. Children must be pushed in source order.
    pub fn push(&mut self, parent: ItemId, kind: ItemKind, start: usize, after_end: usize) -> ItemId {
        let id = ItemId(self.items.len());
        self.items.push(SyntaxItem {
            kind,
            start,
            after_end: after_end.max(start),
            valid: true,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.items[parent.0].children.push(id);
        id
    }

    pub fn set_after_end(&mut self, id: ItemId, after_end: usize) {
        let item = &mut self.items[id.0];
        item.after_end = after_end.max(item.start);
    }

    pub fn mark_invalid(&mut self, id: ItemId) {
        self.items[id.0].valid = false;
    }

    pub fn item(&self, id: ItemId) -> &SyntaxItem {
        &self.items[id.0]
    }

    pub fn kind(&self, id: ItemId) -> ItemKind {
        self.items[id.0].kind
    }

    /// Raw source slice covered by the item
    pub fn text(&self, id: ItemId) -> &str {
        let item = &self.items[id.0];
        self.source.get(item.start..item.after_end).unwrap_or("")
    }

    pub fn next_sibling(&self, id: ItemId) -> Option<ItemId> {
        let parent = self.items[id.0].parent?;
        let siblings = &self.items[parent.0].children;
        let pos = siblings.iter().position(|&s| s == id)?;
        siblings.get(pos + 1).copied()
    }

    /// The item itself followed by each of its ancestors up to the root
    pub fn ancestors_or_self(&self, id: ItemId) -> impl Iterator<Item = ItemId> + '_ {
        std::iter::successors(Some(id), move |&current| self.items[current.0].parent)
    }

    /// Nearest item, starting with `id` itself, whose kind satisfies `pred`
    pub fn find_ancestor(&self, id: ItemId, pred: impl Fn(ItemKind) -> bool) -> Option<ItemId> {
        self.ancestors_or_self(id).find(|&a| pred(self.kind(a)))
    }

    pub fn find_child(&self, id: ItemId, kind: ItemKind) -> Option<ItemId> {
        self.items[id.0]
            .children
            .iter()
            .copied()
            .find(|&c| self.kind(c) == kind)
    }

    /// Innermost item covering `offset`, or ending exactly at it
    ///
    /// Returns `None` when the offset is outside the source or only the root
    /// stylesheet covers it.
    pub fn item_before_position(&self, offset: usize) -> Option<ItemId> {
        if offset > self.source.len() {
            return None;
        }

        let mut current = self.root();
        loop {
            let children = &self.items[current.0].children;
            let covering = children
                .iter()
                .copied()
                .find(|&c| {
                    let item = &self.items[c.0];
                    item.start <= offset && offset < item.after_end
                })
                .or_else(|| {
                    children.iter().rev().copied().find(|&c| {
                        let item = &self.items[c.0];
                        item.start < offset && item.after_end == offset
                    })
                });

            match covering {
                Some(child) => current = child,
                None => break,
            }
        }

        (current != self.root()).then_some(current)
    }

    /// All items in document order (pre-order), root first
    pub fn iter(&self) -> impl Iterator<Item = ItemId> + '_ {
        let mut stack = vec![self.root()];
        std::iter::from_fn(move || {
            let id = stack.pop()?;
            stack.extend(self.items[id.0].children.iter().rev().copied());
            Some(id)
        })
    }

    /// Convert a byte offset to a 1-indexed (line, column) pair
    ///
    /// Columns count characters, not bytes.
    pub fn offset_to_line_col(&self, offset: usize) -> (usize, usize) {
        let offset = offset.min(self.source.len());
        let before = &self.source[..floor_char_boundary(&self.source, offset)];
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map_or(0, |i| i + 1);
        let column = before[line_start..].chars().count() + 1;
        (line, column)
    }

    /// Convert a 1-indexed (line, column) pair back to a byte offset
    pub fn line_col_to_offset(&self, line: usize, column: usize) -> Option<usize> {
        let line_start = if line <= 1 {
            0
        } else {
            self.source
                .match_indices('\n')
                .nth(line - 2)
                .map(|(i, _)| i + 1)?
        };
        let line_text = self.source[line_start..].split('\n').next().unwrap_or("");
        let column_offset = line_text
            .char_indices()
            .nth(column.saturating_sub(1))
            .map_or(line_text.len(), |(i, _)| i);
        Some(line_start + column_offset)
    }
}

fn floor_char_boundary(s: &str, mut offset: usize) -> usize {
    while offset > 0 && !s.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}
