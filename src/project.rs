//! Project root lookup used for root-relative (`/img/a.png`) references.

use crate::config::{CONFIG_FILES, Config};
use crate::resolver::ProjectRoots;
use std::path::{Path, PathBuf};

const MAX_DEPTH: usize = 100;

/// Resolves the project root of a document from configuration or the filesystem
#[derive(Debug, Clone, Default)]
pub struct ProjectRootResolver {
    /// `global.project-root`: a local directory or a remote origin
    explicit: Option<String>,
    /// Directory relative explicit roots are anchored to
    base_dir: Option<PathBuf>,
}

impl ProjectRootResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_explicit_root(mut self, root: impl Into<String>) -> Self {
        self.explicit = Some(root.into());
        self
    }

    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    pub fn from_config(config: &Config, config_dir: Option<&Path>) -> Self {
        Self {
            explicit: config.global.project_root.clone(),
            base_dir: config_dir.map(Path::to_path_buf),
        }
    }

    fn explicit_root(&self) -> Option<String> {
        let root = self.explicit.as_deref()?.trim();
        if root.is_empty() {
            return None;
        }
        if root.contains("://") {
            return Some(root.to_string());
        }

        let path = Path::new(root);
        let resolved = match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        };
        Some(resolved.to_string_lossy().into_owned())
    }
}

impl ProjectRoots for ProjectRootResolver {
    fn project_root(&self, document: &Path) -> Option<String> {
        if let Some(root) = self.explicit_root() {
            return Some(root);
        }
        let start = document.parent()?;
        Some(find_project_root_from(start).to_string_lossy().into_owned())
    }
}

/// Walk up from `start_dir` to the nearest directory holding `.git` or a
/// config file. Falls back to `start_dir` itself.
pub fn find_project_root_from(start_dir: &Path) -> PathBuf {
    let mut current = start_dir.to_path_buf();

    for _ in 0..MAX_DEPTH {
        if current.join(".git").exists() || CONFIG_FILES.iter().any(|name| current.join(name).is_file()) {
            log::debug!("[stylelens] Project root: {}", current.display());
            return current;
        }

        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => break,
        }
    }

    log::debug!(
        "[stylelens] No project marker found, using document directory: {}",
        start_dir.display()
    );
    start_dir.to_path_buf()
}
