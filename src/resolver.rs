//! Turns the text of a `url(...)` token into something previewable.
//!
//! Resolution happens in two steps. [`resolve_reference`] classifies the text
//! and, for relative paths, finds the concrete file it points at, falling back
//! to the bundled placeholder when nothing exists there. [`load`] then decodes
//! the image behind a reference. Neither step fails: misses and decode errors
//! degrade to the placeholder or to a reference without an image source.

use crate::image_source::{self, ImageSource};
use std::fmt;
use std::path::{MAIN_SEPARATOR_STR, Path, PathBuf};

/// Identity of the bundled "no preview available" image
pub const PLACEHOLDER_RESOURCE: &str = "stylelens:resources/nopreview.png";

/// Looks up the project root for a document
///
/// The returned string is either a local directory or a remote origin such as
/// `http://localhost:8080`.
pub trait ProjectRoots {
    fn project_root(&self, document: &Path) -> Option<String>;
}

impl<F> ProjectRoots for F
where
    F: Fn(&Path) -> Option<String>,
{
    fn project_root(&self, document: &Path) -> Option<String> {
        self(document)
    }
}

/// Ambient information needed to resolve relative references
#[derive(Clone, Copy)]
pub struct ResolutionContext<'a> {
    /// Absolute path of the active document
    pub document: Option<&'a Path>,
    pub roots: &'a dyn ProjectRoots,
}

impl<'a> ResolutionContext<'a> {
    pub fn new(document: Option<&'a Path>, roots: &'a dyn ProjectRoots) -> Self {
        Self { document, roots }
    }
}

impl fmt::Debug for ResolutionContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolutionContext")
            .field("document", &self.document)
            .finish_non_exhaustive()
    }
}

/// Where an image reference points
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageReference {
    /// An inline `data:` URI, kept verbatim
    DataUri(String),
    /// A remote URL; never fetched
    Remote(String),
    /// An existing local file
    Local(PathBuf),
    /// Nothing found; shows the bundled placeholder
    Placeholder,
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageReference::DataUri(text) | ImageReference::Remote(text) => f.write_str(text),
            ImageReference::Local(path) => write!(f, "{}", path.display()),
            ImageReference::Placeholder => f.write_str(PLACEHOLDER_RESOURCE),
        }
    }
}

/// A reference together with its decoded image, if any
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImage {
    pub reference: ImageReference,
    pub source: Option<ImageSource>,
}

/// Resolve and load in one go. `None` only for empty text.
pub fn resolve(raw: &str, ctx: &ResolutionContext<'_>) -> Option<ResolvedImage> {
    resolve_reference(raw, ctx).map(load)
}

/// Classify `raw` and resolve it to a concrete reference
pub fn resolve_reference(raw: &str, ctx: &ResolutionContext<'_>) -> Option<ImageReference> {
    let text = raw.trim_matches(['\'', '"']);
    if text.is_empty() {
        return None;
    }

    if text.starts_with("data:") {
        return Some(ImageReference::DataUri(text.to_string()));
    }

    if text.starts_with("//") {
        return Some(ImageReference::Remote(format!("http:{text}")));
    }

    if is_remote(text) || text.contains(";base64,") {
        return Some(ImageReference::Remote(text.to_string()));
    }

    let Some(document) = ctx.document else {
        log::debug!("No active document to resolve '{text}' against");
        return Some(ImageReference::Placeholder);
    };

    let candidate = if text.starts_with('/') {
        let root = ctx.roots.project_root(document).unwrap_or_default();
        if root.contains("://") {
            // Remote project roots are trusted without verification
            return Some(ImageReference::Remote(format!(
                "{}{}",
                root.trim_end_matches('/'),
                text
            )));
        }
        if root.is_empty() {
            log::debug!("No project root for {}", document.display());
            return Some(ImageReference::Placeholder);
        }
        Path::new(&root).join(to_native(strip_query(text).trim_start_matches('/')))
    } else {
        document_relative(document, strip_query(text))
    };

    if candidate.is_file() {
        Some(ImageReference::Local(candidate))
    } else {
        log::debug!("Image not found at {}", candidate.display());
        Some(ImageReference::Placeholder)
    }
}

/// Decode the image a reference points at
pub fn load(reference: ImageReference) -> ResolvedImage {
    let source = match &reference {
        ImageReference::DataUri(text) => image_source::decode_data_uri(text).and_then(image_source::decode),
        ImageReference::Local(path) => image_source::load_file(path),
        ImageReference::Placeholder => image_source::placeholder(),
        ImageReference::Remote(_) => None,
    };
    ResolvedImage { reference, source }
}

fn is_remote(text: &str) -> bool {
    text.starts_with("http://") || text.starts_with("https://")
}

/// Cache busters and font hacks (`?v=2`, `#iefix`) are not part of the file name
fn strip_query(text: &str) -> &str {
    text.split(['?', '#']).next().unwrap_or(text)
}

fn to_native(path: &str) -> String {
    path.replace('/', MAIN_SEPARATOR_STR)
}

/// Each `../` removed from the path moves the base directory up one level
fn document_relative(document: &Path, text: &str) -> PathBuf {
    let mut dir = document.parent().unwrap_or(Path::new(""));
    let mut relative = text.to_string();

    while let Some(index) = relative.find("../") {
        relative.replace_range(index..index + 3, "");
        if let Some(parent) = dir.parent() {
            dir = parent;
        }
    }

    dir.join(to_native(&relative))
}
