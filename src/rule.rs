//! Rule trait and the diagnostic types rules produce.

use crate::syntax::{ItemId, ItemKind, SyntaxTree};
use dyn_clone::DynClone;
use serde::Serialize;
use std::fmt;
use std::ops::BitOr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LintError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type LintResult = Result<Vec<LintWarning>, LintError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => f.write_str("error"),
            Severity::Warning => f.write_str("warning"),
        }
    }
}

/// How a diagnostic is presented by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ErrorFlags(u8);

impl ErrorFlags {
    pub const NONE: Self = Self(0);
    /// Listed in the task list as an error
    pub const TASK_LIST_ERROR: Self = Self(1);
    pub const UNDERLINE_RED: Self = Self(1 << 1);

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn severity(self) -> Severity {
        if self.contains(Self::TASK_LIST_ERROR) {
            Severity::Error
        } else {
            Severity::Warning
        }
    }
}

impl BitOr for ErrorFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// A finding attached to a syntax item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub item: ItemId,
    pub message: String,
    pub flags: ErrorFlags,
    pub rule_name: &'static str,
}

/// A diagnostic located by line and column, ready for output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LintWarning {
    pub rule_name: Option<String>,
    pub message: String,
    pub line: usize,
    pub column: usize,
    pub end_line: usize,
    pub end_column: usize,
    pub severity: Severity,
}

impl LintWarning {
    pub fn from_diagnostic(tree: &SyntaxTree, diagnostic: &Diagnostic) -> Self {
        let item = tree.item(diagnostic.item);
        let (line, column) = tree.offset_to_line_col(item.start);
        let (end_line, end_column) = tree.offset_to_line_col(item.after_end);
        Self {
            rule_name: Some(diagnostic.rule_name.to_string()),
            message: diagnostic.message.clone(),
            line,
            column,
            end_line,
            end_column,
            severity: diagnostic.flags.severity(),
        }
    }
}

/// What the checker does after a rule has looked at an item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemCheckResult {
    /// Let the remaining rules see the item too
    Continue,
    /// Skip the remaining rules for this item
    Stop,
}

/// Sink rules report into while a tree is checked
pub struct CheckerContext<'a> {
    tree: &'a SyntaxTree,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> CheckerContext<'a> {
    pub fn new(tree: &'a SyntaxTree) -> Self {
        Self {
            tree,
            diagnostics: Vec::new(),
        }
    }

    pub fn tree(&self) -> &'a SyntaxTree {
        self.tree
    }

    pub fn add_error(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

pub trait Rule: DynClone + Send + Sync {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// Item kinds the checker should hand to this rule
    fn item_kinds(&self) -> &'static [ItemKind];

    fn check_item(&self, item: ItemId, ctx: &mut CheckerContext<'_>) -> ItemCheckResult;

    /// Default `[RULE]` section for generated config files
    fn default_config_section(&self) -> Option<(String, toml::Value)> {
        None
    }

    fn from_config(config: &crate::config::Config) -> Box<dyn Rule>
    where
        Self: Sized;
}

dyn_clone::clone_trait_object!(Rule);
