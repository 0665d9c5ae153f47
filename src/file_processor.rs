//! File discovery and per-file linting for the `check` command

use colored::*;
use core::error::Error;
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use ignore::overrides::OverrideBuilder;
use std::collections::HashSet;
use std::path::Path;
use stylelens_lib::config::{self as stylelens_config, STYLESHEET_EXTENSIONS, normalize_key};
use stylelens_lib::output::{OutputFormat, OutputWriter};
use stylelens_lib::rule::{LintWarning, Rule};

/// Pattern "dir/path" also matches everything below it; glob patterns are kept as-is
fn expand_directory_pattern(pattern: &str) -> Vec<String> {
    if pattern.contains('*') || pattern.contains('?') || pattern.contains('[') {
        return vec![pattern.to_string()];
    }

    let base = pattern.trim_end_matches('/');
    vec![base.to_string(), format!("{base}/**")]
}

fn split_rule_list(list: Option<&str>) -> Option<HashSet<String>> {
    list.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(normalize_key)
            .collect()
    })
}

/// Rules to run, after config `enable`/`disable` and the CLI overrides
pub fn get_enabled_rules(args: &crate::CheckArgs, config: &stylelens_config::Config) -> Vec<Box<dyn Rule>> {
    let all_rules = stylelens_lib::rules::all_rules(config);

    let cli_enable_set = split_rule_list(args.enable.as_deref());
    let cli_disable_set = split_rule_list(args.disable.as_deref());

    let mut final_rules = match &cli_enable_set {
        // CLI --enable replaces the config selection entirely
        Some(enabled) => all_rules
            .into_iter()
            .filter(|rule| enabled.contains(&normalize_key(rule.name())))
            .collect(),
        None => stylelens_lib::rules::filter_rules(&all_rules, &config.global),
    };

    if let Some(disabled) = &cli_disable_set {
        final_rules.retain(|rule| !disabled.contains(&normalize_key(rule.name())));
    }

    if args.verbose {
        println!("Enabled rules:");
        for rule in &final_rules {
            println!("  - {} ({})", rule.name(), rule.description());
        }
        println!();
    }

    final_rules
}

/// Collect stylesheet files under `paths`, honoring excludes and ignore files
pub fn find_stylesheet_files(
    paths: &[String],
    args: &crate::CheckArgs,
    config: &stylelens_config::Config,
) -> Result<Vec<String>, Box<dyn Error>> {
    let first_path = paths.first().cloned().unwrap_or_else(|| ".".to_string());
    let mut walk_builder = WalkBuilder::new(first_path);
    for path in paths.iter().skip(1) {
        walk_builder.add(path);
    }

    let mut types_builder = ignore::types::TypesBuilder::new();
    for ext in STYLESHEET_EXTENSIONS {
        types_builder.add("stylesheet", &format!("*.{ext}"))?;
    }
    types_builder.select("stylesheet");
    walk_builder.types(types_builder.build()?);

    let exclude_patterns: Vec<String> = match args.exclude.as_deref() {
        Some(cli_exclude) => cli_exclude
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .flat_map(expand_directory_pattern)
            .collect(),
        None => config
            .global
            .exclude
            .iter()
            .flat_map(|p| expand_directory_pattern(p))
            .collect(),
    };

    if args.verbose {
        eprintln!("Exclude patterns: {exclude_patterns:?}");
    }

    if !exclude_patterns.is_empty() {
        let mut override_builder = OverrideBuilder::new(".");
        for pattern in &exclude_patterns {
            let exclude_rule = if pattern.starts_with('!') {
                pattern.clone()
            } else {
                format!("!{pattern}")
            };
            if let Err(e) = override_builder.add(&exclude_rule) {
                eprintln!("Warning: Invalid exclude pattern '{pattern}': {e}");
            }
        }
        match override_builder.build() {
            Ok(overrides) => {
                walk_builder.overrides(overrides);
            }
            Err(e) => eprintln!("Error building path overrides: {e}"),
        }
    }

    let use_gitignore = args.respect_gitignore && config.global.respect_gitignore;
    walk_builder.ignore(use_gitignore);
    walk_builder.git_ignore(use_gitignore);
    walk_builder.git_global(use_gitignore);
    walk_builder.git_exclude(use_gitignore);
    walk_builder.parents(use_gitignore);
    walk_builder.hidden(false);
    walk_builder.require_git(false);
    walk_builder.add_custom_ignore_filename(".stylelintignore");

    let exclude_matcher = build_exclude_matcher(&exclude_patterns);
    let mut file_paths = Vec::new();

    // Explicit files are linted even with an unknown extension, unless excluded
    for path_str in paths {
        let path = Path::new(path_str);
        if !path.exists() {
            return Err(format!("File not found: {path_str}").into());
        }
        if path.is_file() {
            let cleaned = path_str.strip_prefix("./").unwrap_or(path_str);
            if !is_excluded(&exclude_matcher, Path::new(cleaned)) {
                file_paths.push(cleaned.to_string());
            }
        }
    }

    for result in walk_builder.build() {
        match result {
            Ok(entry) => {
                let path = entry.path();
                if !entry.file_type().is_some_and(|ft| ft.is_file()) || paths.iter().any(|p| Path::new(p) == path) {
                    continue;
                }
                let cleaned = path.to_string_lossy();
                let cleaned = cleaned.strip_prefix("./").unwrap_or(&cleaned).to_string();
                file_paths.push(cleaned);
            }
            Err(e) => return Err(format!("Error walking directory: {e}").into()),
        }
    }

    file_paths.sort();
    file_paths.dedup();
    Ok(file_paths)
}

fn build_exclude_matcher(patterns: &[String]) -> GlobSet {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        if let Ok(glob) = Glob::new(pattern.trim_start_matches('!')) {
            builder.add(glob);
        }
    }
    builder.build().unwrap_or_else(|_| GlobSet::empty())
}

fn is_excluded(matcher: &GlobSet, path: &Path) -> bool {
    matcher.is_match(path) || path.components().any(|c| matcher.is_match(c.as_os_str()))
}

/// Lint one file and return its warnings, sorted by position
pub fn process_file(file_path: &str, rules: &[Box<dyn Rule>], verbose: bool, silent: bool) -> Vec<LintWarning> {
    let start_time = std::time::Instant::now();

    let content = match crate::read_file_efficiently(Path::new(file_path)) {
        Ok(content) => content,
        Err(e) => {
            if !silent {
                eprintln!("{}: {e}", "Error".red().bold());
            }
            return Vec::new();
        }
    };

    let mut warnings = match stylelens_lib::lint(&content, rules, verbose) {
        Ok(warnings) => warnings,
        Err(e) => {
            log::error!("Linting {file_path} failed: {e}");
            Vec::new()
        }
    };
    warnings.sort_by(|a, b| (a.line, a.column).cmp(&(b.line, b.column)));

    if verbose {
        log::debug!("Processed {file_path} in {:?}", start_time.elapsed());
    }

    warnings
}

/// Lint every file and print the results; returns (files with issues, total warnings)
pub fn process_files(
    files: &[String],
    rules: &[Box<dyn Rule>],
    output_format: OutputFormat,
    output_writer: &OutputWriter,
    verbose: bool,
    silent: bool,
) -> (usize, usize) {
    #[cfg(feature = "parallel")]
    let results: Vec<(String, Vec<LintWarning>)> = {
        use rayon::prelude::*;
        files
            .par_iter()
            .map(|file| (file.clone(), process_file(file, rules, verbose, silent)))
            .collect()
    };
    #[cfg(not(feature = "parallel"))]
    let results: Vec<(String, Vec<LintWarning>)> = files
        .iter()
        .map(|file| (file.clone(), process_file(file, rules, verbose, silent)))
        .collect();

    let formatter = output_format.create_formatter();
    let mut files_with_issues = 0;
    let mut total_warnings = 0;

    for (file, warnings) in &results {
        if warnings.is_empty() {
            continue;
        }
        files_with_issues += 1;
        total_warnings += warnings.len();

        if !silent {
            let formatted = formatter.format_warnings(warnings, file);
            if !formatted.is_empty() {
                output_writer.writeln(&formatted).unwrap_or_else(|e| {
                    eprintln!("Error writing output: {e}");
                });
            }
        }
    }

    (files_with_issues, total_warnings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_directory_pattern() {
        assert_eq!(expand_directory_pattern("vendor/"), vec!["vendor", "vendor/**"]);
        assert_eq!(expand_directory_pattern("*.min.css"), vec!["*.min.css"]);
    }

    #[test]
    fn test_exclude_matcher() {
        let matcher = build_exclude_matcher(&expand_directory_pattern("vendor"));
        assert!(is_excluded(&matcher, Path::new("vendor/reset.css")));
        assert!(!is_excluded(&matcher, Path::new("css/site.css")));

        let matcher = build_exclude_matcher(&["*.min.css".to_string()]);
        assert!(is_excluded(&matcher, Path::new("dist/app.min.css")));
    }
}
