//! Hover previews for images referenced from `url(...)` tokens.
//!
//! An [`ImageQuickInfo`] is owned by one open document. The syntax tree is
//! obtained lazily from a [`TreeSource`] because the host that produces it
//! may not be ready when the first hover arrives; a failed attempt is simply
//! retried on the next call. Once obtained the tree is kept as is.

use crate::image_source::ImageSource;
use crate::resolver::{self, ImageReference, ResolutionContext};
use crate::syntax::{self, ItemKind, SyntaxTree};
use std::fs;
use std::path::PathBuf;

/// The tree could not be produced yet
#[derive(Debug, thiserror::Error)]
#[error("syntax tree unavailable: {0}")]
pub struct TreeUnavailable(pub String);

/// Supplies the parsed tree of a document
pub trait TreeSource {
    fn syntax_tree(&self) -> Result<SyntaxTree, TreeUnavailable>;
}

impl<F> TreeSource for F
where
    F: Fn() -> Result<SyntaxTree, TreeUnavailable>,
{
    fn syntax_tree(&self) -> Result<SyntaxTree, TreeUnavailable> {
        self()
    }
}

/// Parses a stylesheet file on demand
#[derive(Debug, Clone)]
pub struct FileTreeSource {
    path: PathBuf,
}

impl FileTreeSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TreeSource for FileTreeSource {
    fn syntax_tree(&self) -> Result<SyntaxTree, TreeUnavailable> {
        fs::read_to_string(&self.path)
            .map(|content| syntax::parse(&content))
            .map_err(|e| TreeUnavailable(format!("{}: {e}", self.path.display())))
    }
}

/// The document text a hover was triggered on
#[derive(Debug, Clone, Copy)]
pub struct DocumentSnapshot<'a> {
    pub text: &'a str,
    pub version: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanTrackingMode {
    /// Edges stay put when text is inserted exactly at them
    EdgeNegative,
    /// Edges move past text inserted exactly at them
    EdgePositive,
}

/// A span over a snapshot that follows later edits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackingSpan {
    pub version: u64,
    pub start: usize,
    pub length: usize,
    pub mode: SpanTrackingMode,
}

impl TrackingSpan {
    pub fn end(&self) -> usize {
        self.start + self.length
    }

    /// Map the span through an insertion of `len` bytes at `position`
    pub fn translate_insert(&self, position: usize, len: usize) -> Self {
        let shift = |point: usize| {
            if position < point || (position == point && self.mode == SpanTrackingMode::EdgePositive) {
                point + len
            } else {
                point
            }
        };
        let start = shift(self.start);
        let end = shift(self.end());
        Self {
            version: self.version + 1,
            start,
            length: end - start,
            mode: self.mode,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuickInfoContent {
    Image(ImageSource),
    Text(String),
}

/// What the host shows in the tooltip, and where
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuickInfo {
    pub content: Vec<QuickInfoContent>,
    pub applicable_to: TrackingSpan,
    pub reference: ImageReference,
}

pub struct ImageQuickInfo<S> {
    source: S,
    tree: Option<SyntaxTree>,
}

impl<S: TreeSource> ImageQuickInfo<S> {
    pub fn new(source: S) -> Self {
        Self { source, tree: None }
    }

    /// Obtain the tree if we do not have it yet. Safe to call repeatedly.
    pub fn ensure_tree_initialized(&mut self) -> bool {
        if self.tree.is_none() {
            match self.source.syntax_tree() {
                Ok(tree) => self.tree = Some(tree),
                Err(e) => log::debug!("Quick info not ready: {e}"),
            }
        }
        self.tree.is_some()
    }

    pub fn tree(&self) -> Option<&SyntaxTree> {
        self.tree.as_ref()
    }

    /// Quote-trimmed text of the url string enclosing `offset`
    pub fn url_text_at(&self, offset: usize) -> Option<&str> {
        let tree = self.tree.as_ref()?;

        let item = tree.item_before_position(offset)?;
        if !tree.item(item).valid {
            return None;
        }

        let url = tree.find_ancestor(item, |kind| kind == ItemKind::Url)?;
        let string = tree.find_child(url, ItemKind::UrlString)?;
        if !tree.item(string).valid {
            return None;
        }

        let text = tree.text(string).trim_matches(['\'', '"']);
        (!text.is_empty()).then_some(text)
    }

    /// Build the tooltip for a hover at `offset`, or `None` to show nothing
    pub fn augment(
        &mut self,
        offset: usize,
        snapshot: &DocumentSnapshot<'_>,
        ctx: &ResolutionContext<'_>,
    ) -> Option<QuickInfo> {
        if !self.ensure_tree_initialized() || offset > snapshot.text.len() {
            return None;
        }

        let url = self.url_text_at(offset)?;

        let applicable_to = TrackingSpan {
            version: snapshot.version,
            start: offset,
            length: 1,
            mode: SpanTrackingMode::EdgeNegative,
        };

        let resolved = resolver::resolve(url, ctx)?;
        let source = resolved.source?;
        let label = source.dimensions_label();

        Some(QuickInfo {
            content: vec![QuickInfoContent::Image(source), QuickInfoContent::Text(label)],
            applicable_to,
            reference: resolved.reference,
        })
    }
}
