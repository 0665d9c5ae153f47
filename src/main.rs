use anyhow::{Context, bail};
use clap::{ArgAction, Args, Parser, Subcommand};
use colored::*;
use core::error::Error;
use memmap2::Mmap;
use std::fs;
use std::path::{Path, PathBuf};

use stylelens_lib::config as stylelens_config;
use stylelens_lib::config::normalize_key;
use stylelens_lib::exit_codes::exit;
use stylelens_lib::output::{OutputFormat, OutputWriter};
use stylelens_lib::project::ProjectRootResolver;
use stylelens_lib::quick_info::{DocumentSnapshot, FileTreeSource, ImageQuickInfo};
use stylelens_lib::resolver::{self, ResolutionContext};
use stylelens_lib::rule::Rule;

mod file_processor;

/// Threshold for using memory-mapped I/O (1MB)
const MMAP_THRESHOLD: u64 = 1024 * 1024;

/// Read a file, memory-mapping it when it is large (bundled stylesheets)
pub fn read_file_efficiently(path: &Path) -> Result<String, Box<dyn Error>> {
    let metadata = fs::metadata(path)?;

    if metadata.len() > MMAP_THRESHOLD {
        let file = fs::File::open(path)?;
        // SAFETY: the file is only read, and a concurrent truncation at worst yields invalid UTF-8
        let mmap = unsafe { Mmap::map(&file)? };
        String::from_utf8(mmap.to_vec()).map_err(|e| format!("Invalid UTF-8 in file {}: {}", path.display(), e).into())
    } else {
        fs::read_to_string(path).map_err(|e| format!("Failed to read file {}: {}", path.display(), e).into())
    }
}

fn load_config_with_cli_error_handling(config_path: Option<&str>, isolated: bool) -> stylelens_config::SourcedConfig {
    match stylelens_config::SourcedConfig::load_with_discovery(config_path, isolated) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {}", "Config error".red().bold(), e);
            exit::tool_error();
        }
    }
}

#[derive(Parser)]
#[command(author, version, about, long_about = None, arg_required_else_help = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Control colored output: auto, always, never
    #[arg(long, global = true, default_value = "auto", value_parser = ["auto", "always", "never"])]
    color: String,

    /// Path to configuration file
    #[arg(long, global = true)]
    config: Option<String>,

    /// Ignore all configuration files and use built-in defaults
    #[arg(long, global = true)]
    no_config: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Check stylesheets for selector ordering problems
    Check(CheckArgs),
    /// Show the image preview for a url(...) reference in a stylesheet
    Hover(HoverArgs),
    /// Resolve an image reference as it would be written inside url(...)
    Resolve {
        /// The url text, with or without quotes
        url: String,
        /// Stylesheet the reference appears in
        #[arg(long)]
        document: Option<PathBuf>,
    },
    /// Show information about a rule or list all rules
    Rule {
        /// Rule name (optional)
        rule: Option<String>,
    },
    /// Initialize a new configuration file
    Init,
    /// Show configuration or query a specific key
    Config {
        #[command(subcommand)]
        subcmd: Option<ConfigSubcommand>,
        /// Show only the default configuration values
        #[arg(long)]
        defaults: bool,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigSubcommand {
    /// Query a specific config key (e.g. global.exclude or SL001.selector-placement)
    Get { key: String },
    /// Show the absolute path of the configuration file that was loaded
    File,
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Files or directories to check
    #[arg(required = false)]
    paths: Vec<String>,

    /// Disable specific rules (comma-separated)
    #[arg(short, long)]
    disable: Option<String>,

    /// Enable only specific rules (comma-separated)
    #[arg(short, long)]
    enable: Option<String>,

    /// Exclude specific files or directories (comma-separated glob patterns)
    #[arg(long)]
    exclude: Option<String>,

    /// Respect .gitignore files when scanning directories
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    respect_gitignore: bool,

    /// Output format: text or json
    #[arg(long, short = 'o')]
    output: Option<String>,

    /// Print diagnostics, but nothing else
    #[arg(short, long)]
    quiet: bool,

    /// Print nothing; only the exit status reports violations
    #[arg(short, long)]
    silent: bool,

    /// Output diagnostics to stderr instead of stdout
    #[arg(long)]
    stderr: bool,

    #[arg(skip)]
    verbose: bool,
}

#[derive(Args, Debug)]
struct HoverArgs {
    /// Stylesheet to inspect
    file: PathBuf,

    /// Byte offset of the cursor
    #[arg(long, conflicts_with_all = ["line", "column"], required_unless_present = "line")]
    offset: Option<usize>,

    /// 1-based line of the cursor
    #[arg(long, requires = "column")]
    line: Option<usize>,

    /// 1-based column of the cursor, in characters
    #[arg(long, requires = "line")]
    column: Option<usize>,
}

fn main() {
    // Restore default SIGPIPE so piping into `head` does not panic on a closed stdout
    #[cfg(unix)]
    {
        // SAFETY: resetting a signal disposition before any threads are spawned
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }

    let cli = Cli::parse();

    let level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    env_logger::Builder::from_default_env().filter_level(level).init();

    match cli.color.as_str() {
        "always" => colored::control::set_override(true),
        "never" => colored::control::set_override(false),
        _ => colored::control::unset_override(),
    }

    // Catch panics and report them as tool errors
    let result = std::panic::catch_unwind(move || run(cli));
    match result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            eprintln!("{}: {:#}", "Error".red().bold(), e);
            exit::tool_error();
        }
        Err(e) => {
            eprintln!("[stylelens panic handler] Uncaught panic: {e:?}");
            exit::tool_error();
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Init => match stylelens_config::create_default_config(".stylelens.toml") {
            Ok(()) => println!("Created default configuration file: .stylelens.toml"),
            Err(e) => {
                eprintln!("{}: Failed to create config file: {}", "Error".red().bold(), e);
                exit::tool_error();
            }
        },
        Commands::Check(mut args) => {
            args.verbose = cli.verbose;
            run_check(&args, cli.config.as_deref(), cli.no_config);
        }
        Commands::Hover(args) => run_hover(&args, cli.config.as_deref(), cli.no_config)?,
        Commands::Resolve { url, document } => run_resolve(&url, document.as_deref(), cli.config.as_deref(), cli.no_config)?,
        Commands::Rule { rule } => {
            let all_rules = stylelens_lib::rules::all_rules(&stylelens_config::Config::default());
            match rule {
                Some(query) => {
                    let query = normalize_key(&query);
                    let Some(rule) = all_rules.iter().find(|r| r.name().eq_ignore_ascii_case(&query)) else {
                        eprintln!("{}: Rule '{}' not found.", "Error".red().bold(), query);
                        eprintln!("\nUse 'stylelens rule' to see all available rules.");
                        exit::tool_error();
                    };
                    print_rule(rule.as_ref());
                }
                None => {
                    println!("Available rules:");
                    for rule in &all_rules {
                        println!("  {} - {}", rule.name(), rule.description());
                    }
                }
            }
        }
        Commands::Config { subcmd, defaults } => {
            let sourced = if defaults {
                stylelens_config::SourcedConfig::default()
            } else {
                load_config_with_cli_error_handling(cli.config.as_deref(), cli.no_config)
            };
            match subcmd {
                Some(ConfigSubcommand::File) => match &sourced.config_file {
                    Some(path) => {
                        let absolute = fs::canonicalize(path).unwrap_or_else(|_| path.clone());
                        println!("{}", absolute.display());
                    }
                    None => println!("No configuration file loaded (using defaults)"),
                },
                Some(ConfigSubcommand::Get { key }) => {
                    let config = with_default_rule_sections(sourced.into());
                    match config_value(&config, &key)? {
                        Some(value) => println!("{key} = {value}"),
                        None => {
                            eprintln!("{}: Unknown config key: {key}", "Error".red().bold());
                            exit::tool_error();
                        }
                    }
                }
                None => {
                    let config = with_default_rule_sections(sourced.into());
                    let rendered = toml::to_string_pretty(&config).context("Failed to serialize config to TOML")?;
                    println!("{rendered}");
                }
            }
        }
    }
    Ok(())
}

fn print_rule(rule: &dyn Rule) {
    println!("{}", format!("{} - {}", rule.name(), rule.description()).bold());
    if let Some((name, section)) = rule.default_config_section() {
        println!("\n{}", "Default Configuration:".bold());
        println!("{}", format!("[{name}]").dimmed());
        if let Ok(config_str) = toml::to_string_pretty(&section) {
            for line in config_str.lines() {
                println!("{}", line.dimmed());
            }
        }
    }
}

/// Fill in the defaults of rules the config does not mention, so every option is visible
fn with_default_rule_sections(mut config: stylelens_config::Config) -> stylelens_config::Config {
    for rule in stylelens_lib::rules::all_rules(&config) {
        if let Some((name, toml::Value::Table(table))) = rule.default_config_section() {
            let entry = config.rules.entry(name).or_default();
            for (key, value) in table {
                entry.values.entry(key).or_insert(value);
            }
        }
    }
    config
}

/// Look up `section.key`; sections and keys are matched case-insensitively
fn config_value(config: &stylelens_config::Config, key: &str) -> anyhow::Result<Option<toml::Value>> {
    let Some((section, field)) = key.split_once('.') else {
        bail!("Config key must look like 'section.key', got '{key}'");
    };
    if !section.eq_ignore_ascii_case("global") {
        return Ok(stylelens_config::get_rule_config_value(config, section, field));
    }

    let rendered = toml::to_string(&config.global).context("Failed to serialize config")?;
    let global: toml::Table = toml::from_str(&rendered).context("Failed to read back config")?;
    Ok(global.get(normalize_key(field).as_str()).cloned())
}

fn run_check(args: &CheckArgs, config_path: Option<&str>, isolated: bool) {
    let sourced = load_config_with_cli_error_handling(config_path, isolated);
    let config: stylelens_config::Config = sourced.into();

    let output_format = match args
        .output
        .as_deref()
        .or(config.global.output_format.as_deref())
        .unwrap_or("text")
        .parse::<OutputFormat>()
    {
        Ok(format) => format,
        Err(e) => {
            eprintln!("{}: {}", "Error".red().bold(), e);
            exit::tool_error();
        }
    };

    let rules = file_processor::get_enabled_rules(args, &config);
    let files = match file_processor::find_stylesheet_files(&args.paths, args, &config) {
        Ok(files) => files,
        Err(e) => {
            eprintln!("{}: {}", "Error".red().bold(), e);
            exit::tool_error();
        }
    };

    let quiet = args.quiet || args.silent || output_format == OutputFormat::Json;
    if files.is_empty() {
        if !quiet {
            println!("No stylesheet files found to check.");
        }
        return;
    }

    let output_writer = OutputWriter::new(args.stderr);
    let start_time = std::time::Instant::now();
    let (files_with_issues, total_warnings) =
        file_processor::process_files(&files, &rules, output_format, &output_writer, args.verbose, args.silent);

    if !quiet {
        let duration_ms = start_time.elapsed().as_millis();
        if total_warnings > 0 {
            println!(
                "\n{} Found {} issues in {} files ({} files checked in {}ms)",
                "Issues:".yellow().bold(),
                total_warnings,
                files_with_issues,
                files.len(),
                duration_ms
            );
        } else {
            println!(
                "{} No issues found in {} files ({}ms)",
                "Success:".green().bold(),
                files.len(),
                duration_ms
            );
        }
    }

    if total_warnings > 0 {
        exit::violations_found();
    }
}

fn project_roots(config_path: Option<&str>, isolated: bool) -> ProjectRootResolver {
    let sourced = load_config_with_cli_error_handling(config_path, isolated);
    ProjectRootResolver::from_config(&sourced.config, sourced.config_dir())
}

fn absolute(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

fn run_hover(args: &HoverArgs, config_path: Option<&str>, isolated: bool) -> anyhow::Result<()> {
    let document = absolute(&args.file);
    let text = fs::read_to_string(&document).with_context(|| format!("Failed to read {}", document.display()))?;
    let roots = project_roots(config_path, isolated);
    let ctx = ResolutionContext::new(Some(document.as_path()), &roots);

    let mut session = ImageQuickInfo::new(FileTreeSource::new(&document));
    if !session.ensure_tree_initialized() {
        bail!("Could not parse {}", document.display());
    }

    let offset = match (args.offset, args.line, args.column) {
        (Some(offset), _, _) => offset,
        (None, Some(line), Some(column)) => session
            .tree()
            .and_then(|tree| tree.line_col_to_offset(line, column))
            .with_context(|| format!("Position {line}:{column} is outside the document"))?,
        _ => bail!("Either --offset or --line and --column are required"),
    };

    let snapshot = DocumentSnapshot { text: &text, version: 0 };
    match session.augment(offset, &snapshot, &ctx) {
        Some(info) => {
            println!("{}", info.reference);
            for content in &info.content {
                if let stylelens_lib::quick_info::QuickInfoContent::Text(label) = content {
                    println!("{label}");
                }
            }
        }
        None => println!("No image preview at offset {offset}"),
    }
    Ok(())
}

fn run_resolve(url: &str, document: Option<&Path>, config_path: Option<&str>, isolated: bool) -> anyhow::Result<()> {
    let document = document.map(absolute);
    let roots = project_roots(config_path, isolated);
    let ctx = ResolutionContext::new(document.as_deref(), &roots);

    let Some(resolved) = resolver::resolve(url, &ctx) else {
        bail!("Empty image reference");
    };

    println!("{}", resolved.reference);
    match &resolved.source {
        Some(source) => println!("{}", source.dimensions_label()),
        None => println!("{}", "(no preview)".dimmed()),
    }
    Ok(())
}
