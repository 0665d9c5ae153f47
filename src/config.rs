//! This module defines configuration structures and loading logic for stylelens.
//! Configuration lives in `.stylelens.toml`, discovered by walking up from the
//! working directory, and can be overridden from the command line.

use crate::rules;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Config file names, in order of precedence
pub const CONFIG_FILES: &[&str] = &[".stylelens.toml", "stylelens.toml"];

/// File extensions checked when walking directories
pub const STYLESHEET_EXTENSIONS: &[&str] = &["css", "less", "scss"];

const MAX_DEPTH: usize = 100;

/// Normalizes configuration keys (rule names, option names) to lowercase kebab-case.
pub fn normalize_key(key: &str) -> String {
    // Rule names like sl001 are uppercased
    if key.len() == 5 && key.to_ascii_lowercase().starts_with("sl") && key[2..].chars().all(|c| c.is_ascii_digit()) {
        key.to_ascii_uppercase()
    } else {
        key.replace('_', "-").to_ascii_lowercase()
    }
}

/// Represents a rule-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct RuleConfig {
    /// Configuration values for the rule
    #[serde(flatten)]
    pub values: BTreeMap<String, toml::Value>,
}

/// Represents the complete configuration loaded from .stylelens.toml
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Global configuration options
    #[serde(default)]
    pub global: GlobalConfig,

    /// Rule-specific configurations, keyed by rule name (e.g. SL001)
    #[serde(flatten)]
    pub rules: BTreeMap<String, RuleConfig>,
}

/// Global configuration options
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "kebab-case")]
pub struct GlobalConfig {
    /// Enabled rules
    #[serde(default)]
    pub enable: Vec<String>,

    /// Disabled rules
    #[serde(default)]
    pub disable: Vec<String>,

    /// Files to exclude
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Respect .gitignore files when scanning directories
    #[serde(default = "default_true", alias = "respect_gitignore")]
    pub respect_gitignore: bool,

    /// Root for `/`-prefixed image references: a directory or a remote origin
    #[serde(default, alias = "project_root", skip_serializing_if = "Option::is_none")]
    pub project_root: Option<String>,

    /// Output format for check results ("text" or "json")
    #[serde(default, alias = "output_format", skip_serializing_if = "Option::is_none")]
    pub output_format: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            enable: Vec::new(),
            disable: Vec::new(),
            exclude: Vec::new(),
            respect_gitignore: true,
            project_root: None,
            output_format: None,
        }
    }
}

/// Errors that can occur when loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file
    #[error("Failed to read config file at {path}: {source}")]
    IoError { source: io::Error, path: String },

    /// Failed to parse the configuration content
    #[error("Failed to parse config: {0}")]
    ParseError(String),

    /// Configuration file already exists
    #[error("Configuration file already exists at {path}")]
    FileExists { path: String },
}

/// Create a default configuration file at the specified path
pub fn create_default_config(path: &str) -> Result<(), ConfigError> {
    if Path::new(path).exists() {
        return Err(ConfigError::FileExists { path: path.to_string() });
    }

    let mut content = String::from(
        r#"# stylelens configuration file

[global]
# Rules to disable
# disable = ["SL001"]

# Rules to enable exclusively (if provided, only these rules will run)
# enable = ["SL001"]

# File/directory patterns to exclude from checking
exclude = ["node_modules", "dist", "build", "*.min.css"]

# Respect .gitignore files when scanning directories (default: true)
respect-gitignore = true

# Root for image references starting with '/': a directory, relative to this
# file, or a remote origin such as "http://localhost:8080"
# project-root = "public"
"#,
    );

    for rule in rules::all_rules(&Config::default()) {
        if let Some((name, value)) = rule.default_config_section() {
            let mut section = toml::Table::new();
            section.insert(name, value);
            if let Ok(rendered) = toml::to_string(&section) {
                content.push('\n');
                content.push_str(&rendered);
            }
        }
    }

    fs::write(path, content).map_err(|source| ConfigError::IoError {
        source,
        path: path.to_string(),
    })
}

/// Get a rule-specific configuration value
/// Tries both kebab-case and snake_case variants of the key
pub fn get_rule_config_value<T: serde::de::DeserializeOwned>(config: &Config, rule_name: &str, key: &str) -> Option<T> {
    let rule_config = config.rules.get(&rule_name.to_ascii_uppercase())?;

    let key_variants = [
        key.to_string(),
        normalize_key(key),
        key.replace('-', "_"),
        key.replace('_', "-"),
    ];

    for variant in &key_variants {
        if let Some(value) = rule_config.values.get(variant)
            && let Ok(result) = T::deserialize(value.clone())
        {
            return Some(result);
        }
    }

    None
}

/// Parse config file content
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let mut config: Config = toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;

    // Rule section names are case-insensitive
    config.rules = std::mem::take(&mut config.rules)
        .into_iter()
        .map(|(name, rule)| (normalize_key(&name), rule))
        .collect();

    let known: HashSet<&str> = rules::all_rules(&Config::default()).iter().map(|r| r.name()).collect();
    for name in config.rules.keys() {
        if !known.contains(name.as_str()) {
            log::warn!("Unknown rule section in config: [{name}]");
        }
    }

    Ok(config)
}

/// Configuration together with where it came from
#[derive(Debug, Clone, Default)]
pub struct SourcedConfig {
    pub config: Config,
    /// The file the configuration was read from, if any
    pub config_file: Option<PathBuf>,
}

impl SourcedConfig {
    /// Directory of the loaded config file; relative settings are anchored here
    pub fn config_dir(&self) -> Option<&Path> {
        self.config_file.as_deref().and_then(Path::parent)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::IoError {
            source,
            path: path.display().to_string(),
        })?;
        let config = parse_config(&content)?;
        Ok(Self {
            config,
            config_file: Some(path.to_path_buf()),
        })
    }

    /// Load the explicit config file, or discover one upward from the working
    /// directory. `isolated` ignores config files and uses defaults.
    pub fn load_with_discovery(config_path: Option<&str>, isolated: bool) -> Result<Self, ConfigError> {
        if isolated {
            log::debug!("[stylelens-config] Isolated mode, using defaults");
            return Ok(Self::default());
        }

        if let Some(path) = config_path {
            return Self::from_file(Path::new(path));
        }

        match std::env::current_dir() {
            Ok(dir) => Self::discover_from(&dir),
            Err(e) => {
                log::debug!("[stylelens-config] Failed to get current directory: {e}");
                Ok(Self::default())
            }
        }
    }

    /// Walk up from `start_dir` looking for a config file. Stops at `.git`.
    pub fn discover_from(start_dir: &Path) -> Result<Self, ConfigError> {
        let mut current = start_dir.to_path_buf();

        for _ in 0..MAX_DEPTH {
            log::debug!("[stylelens-config] Searching for config in: {}", current.display());

            for name in CONFIG_FILES {
                let candidate = current.join(name);
                if candidate.is_file() {
                    log::debug!("[stylelens-config] Found config file: {}", candidate.display());
                    return Self::from_file(&candidate);
                }
            }

            if current.join(".git").exists() {
                log::debug!("[stylelens-config] Stopping at .git directory");
                break;
            }

            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => break,
            }
        }

        Ok(Self::default())
    }
}

impl From<SourcedConfig> for Config {
    fn from(sourced: SourcedConfig) -> Self {
        sourced.config
    }
}
