//! Command-line interface for factmine.

use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::RunConfig;
use crate::error::ConfigError;
use crate::executor::{
    AnalysisExecutor, ExecutionOutcome, ExecutorHook, RunSummary, TaggingExecutor,
};
use crate::extract::gradle::{GradleDependencies, GradlePlugins, GradleProperties};
use crate::extract::imports::ImportsExtraction;
use crate::extract::metrics::ProjectMetrics;
use crate::extract::modules::ModulesListing;
use crate::extract::Extraction;
use crate::logging;
use crate::parser;
use crate::report;

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Batch fact mining over corpora of source-code projects.
///
/// Each subcommand runs one extraction over every project of a corpus and
/// writes one artifact per project. A project that fails is reported and
/// skipped; the others still run.
#[derive(Parser)]
#[command(name = "factmine")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Mine import directives from Kotlin, Java and Python sources
    Imports(ImportsArgs),
    /// Mine dependency declarations from Gradle build scripts
    #[command(visible_alias = "deps")]
    Dependencies(RunArgs),
    /// Mine declared and applied Gradle plugins
    Plugins(RunArgs),
    /// Mine gradle.properties entries
    Properties(RunArgs),
    /// List the modules of multi-module projects
    Modules(RunArgs),
    /// Count files, lines and characters of Kotlin sources per module
    Metrics(RunArgs),
    /// Classify projects (android, other)
    Tag(TagArgs),
    /// Run every extraction and the classification
    All(RunArgs),
}

/// Arguments shared by every run.
#[derive(Parser)]
pub struct RunArgs {
    /// Corpus root: one project, or a directory of projects
    pub corpus: PathBuf,

    /// Directory artifacts are written to
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Artifact name pattern, with {project}, {analysis} and {ext}
    #[arg(long)]
    pub file_name: Option<String>,

    /// Output format: lines, csv, tsv, or json
    #[arg(short, long)]
    pub format: Option<String>,

    /// Corpus mode: auto, single, or batch
    #[arg(short, long)]
    pub mode: Option<String>,

    /// Projects analyzed concurrently
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Per-project timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Parse the units of one project in parallel
    #[arg(long)]
    pub parallel_units: bool,

    /// Path to config YAML file (default: auto-discover)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Write a JSON run summary to this file
    #[arg(long)]
    pub summary: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Errors only, no progress bar
    #[arg(short, long)]
    pub quiet: bool,

    /// Exit with status 1 when any project failed
    #[arg(long)]
    pub strict: bool,
}

/// Arguments for the imports command.
#[derive(Parser)]
pub struct ImportsArgs {
    #[command(flatten)]
    pub run: RunArgs,

    /// Languages to scan, comma-separated: kotlin, java, python
    #[arg(short, long, value_delimiter = ',')]
    pub languages: Vec<String>,

    /// Keep only the first occurrence of each import
    #[arg(long)]
    pub distinct: bool,

    /// Keep imports of the project's own packages
    #[arg(long)]
    pub keep_project_packages: bool,
}

/// Arguments for the tag command.
#[derive(Parser)]
pub struct TagArgs {
    #[command(flatten)]
    pub run: RunArgs,

    /// Look for the build root below single-child wrapper directories
    #[arg(long)]
    pub resolve_root: bool,
}

/// Drives a progress bar from executor callbacks.
struct ProgressHook {
    bar: ProgressBar,
}

impl ProgressHook {
    fn new(analysis: &str) -> Self {
        let bar = ProgressBar::new(0);
        if let Ok(style) =
            ProgressStyle::default_bar().template("{spinner:.green} {prefix} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            bar.set_style(style.progress_chars("█▓▒░"));
        }
        bar.set_prefix(analysis.to_string());
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar }
    }
}

impl ExecutorHook for ProgressHook {
    fn run_started(&self, projects: usize) {
        self.bar.set_length(projects as u64);
    }

    fn project_finished(&self, outcome: &ExecutionOutcome) {
        self.bar.set_message(outcome.project().to_string());
        self.bar.inc(1);
    }
}

impl Drop for ProgressHook {
    fn drop(&mut self) {
        self.bar.finish_and_clear();
    }
}

/// Load the config file, then apply command-line overrides.
///
/// The file is `--config`, else one discovered in the corpus root, else one
/// in the current directory.
fn load_config(args: &RunArgs) -> Result<RunConfig, ConfigError> {
    let path = args
        .config
        .clone()
        .or_else(|| RunConfig::discover(&args.corpus))
        .or_else(|| RunConfig::discover(Path::new(".")));

    let mut config = match path {
        Some(path) => {
            tracing::debug!(config = %path.display(), "loading config");
            RunConfig::parse_file(&path)?
        }
        None => RunConfig::default(),
    };

    if let Some(dir) = &args.output_dir {
        config.output_dir = dir.clone();
    }
    if let Some(name) = &args.file_name {
        config.file_name = Some(name.clone());
    }
    if let Some(format) = &args.format {
        config.format = Some(format.clone());
    }
    if let Some(mode) = &args.mode {
        config.mode = mode.clone();
    }
    if let Some(jobs) = args.jobs {
        config.jobs = jobs;
    }
    if let Some(timeout) = args.timeout {
        config.timeout_secs = Some(timeout);
    }
    if args.parallel_units {
        config.parallel_units = true;
    }
    if let Some(summary) = &args.summary {
        config.summary_file = Some(summary.clone());
    }
    Ok(config)
}

/// Everything a run needs before executors are built.
fn prepare(args: &RunArgs, overlay: impl FnOnce(&mut RunConfig)) -> Result<RunConfig, ConfigError> {
    logging::init_logger(args.verbose, args.quiet);
    parser::init();

    let mut config = load_config(args)?;
    overlay(&mut config);
    config.validate()?;
    Ok(config)
}

fn progress(args: &RunArgs, analysis: &str) -> Option<Arc<ProgressHook>> {
    (!args.quiet && std::io::stderr().is_terminal()).then(|| Arc::new(ProgressHook::new(analysis)))
}

fn run_extraction<E: Extraction>(
    extraction: E,
    config: &RunConfig,
    args: &RunArgs,
) -> Result<RunSummary, ConfigError> {
    let mut executor = AnalysisExecutor::new(extraction, config)?;
    let hook = progress(args, executor.extraction().name());
    if let Some(hook) = &hook {
        executor = executor.with_hook(hook.clone());
    }
    executor.run(&args.corpus, config.run_mode()?)
}

fn run_tagging(config: &RunConfig, args: &RunArgs) -> Result<RunSummary, ConfigError> {
    let mut executor = TaggingExecutor::new(config)?;
    let hook = progress(args, crate::extract::tagging::ANALYSIS_NAME);
    if let Some(hook) = &hook {
        executor = executor.with_hook(hook.clone());
    }
    executor.run(&args.corpus, config.run_mode()?)
}

/// Report the runs and pick the exit code. Project failures are part of a
/// completed run; only `--strict` turns them into [`EXIT_FAILED`].
fn finish(config: &RunConfig, args: &RunArgs, runs: &[RunSummary]) -> anyhow::Result<i32> {
    if !args.quiet {
        report::write_pretty(&args.corpus, &config.output_dir, runs);
    }
    if let Some(path) = &config.summary_file {
        report::write_summary_json(path, &args.corpus, runs)?;
    }

    if args.strict && runs.iter().any(|run| run.failed() > 0) {
        Ok(EXIT_FAILED)
    } else {
        Ok(EXIT_SUCCESS)
    }
}

/// Run one extraction command, mapping invocation errors to [`EXIT_ERROR`].
fn run_single(
    args: &RunArgs,
    overlay: impl FnOnce(&mut RunConfig),
    run: impl FnOnce(&RunConfig) -> Result<RunSummary, ConfigError>,
) -> anyhow::Result<i32> {
    let config = match prepare(args, overlay) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Ok(EXIT_ERROR);
        }
    };

    match run(&config) {
        Ok(summary) => finish(&config, args, &[summary]),
        Err(e) => {
            eprintln!("Error: {}", e);
            Ok(EXIT_ERROR)
        }
    }
}

/// Run the imports command.
pub fn run_imports(args: &ImportsArgs) -> anyhow::Result<i32> {
    let overlay = |config: &mut RunConfig| {
        if !args.languages.is_empty() {
            config.imports.languages = args.languages.clone();
        }
        if args.distinct {
            config.imports.distinct = true;
        }
        if args.keep_project_packages {
            config.imports.exclude_project_packages = false;
        }
    };
    run_single(&args.run, overlay, |config| {
        run_extraction(ImportsExtraction::from_config(config)?, config, &args.run)
    })
}

/// Run the dependencies command.
pub fn run_dependencies(args: &RunArgs) -> anyhow::Result<i32> {
    run_single(args, |_| {}, |config| {
        run_extraction(GradleDependencies::new(), config, args)
    })
}

/// Run the plugins command.
pub fn run_plugins(args: &RunArgs) -> anyhow::Result<i32> {
    run_single(args, |_| {}, |config| run_extraction(GradlePlugins::new(), config, args))
}

/// Run the properties command.
pub fn run_properties(args: &RunArgs) -> anyhow::Result<i32> {
    run_single(args, |_| {}, |config| {
        run_extraction(GradleProperties::new(), config, args)
    })
}

/// Run the modules command.
pub fn run_modules(args: &RunArgs) -> anyhow::Result<i32> {
    run_single(args, |_| {}, |config| run_extraction(ModulesListing::new(), config, args))
}

/// Run the metrics command.
pub fn run_metrics(args: &RunArgs) -> anyhow::Result<i32> {
    run_single(args, |_| {}, |config| run_extraction(ProjectMetrics::new(), config, args))
}

/// Run the tag command.
pub fn run_tag(args: &TagArgs) -> anyhow::Result<i32> {
    let overlay = |config: &mut RunConfig| {
        if args.resolve_root {
            config.resolve_root = true;
        }
    };
    run_single(&args.run, overlay, |config| run_tagging(config, &args.run))
}

fn run_every(config: &RunConfig, args: &RunArgs) -> Result<Vec<RunSummary>, ConfigError> {
    Ok(vec![
        run_extraction(ImportsExtraction::from_config(config)?, config, args)?,
        run_extraction(GradleDependencies::new(), config, args)?,
        run_extraction(GradlePlugins::new(), config, args)?,
        run_extraction(GradleProperties::new(), config, args)?,
        run_extraction(ModulesListing::new(), config, args)?,
        run_extraction(ProjectMetrics::new(), config, args)?,
        run_tagging(config, args)?,
    ])
}

/// Run the all command: every extraction, then tagging, into one output
/// directory. Each artifact keeps its extraction's default format unless
/// `--format` forces one.
pub fn run_all(args: &RunArgs) -> anyhow::Result<i32> {
    let config = match prepare(args, |_| {}).and_then(|config| {
        config.validate_shared()?;
        Ok(config)
    }) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Ok(EXIT_ERROR);
        }
    };

    let runs = run_every(&config, args);
    match runs {
        Ok(runs) => finish(&config, args, &runs),
        Err(e) => {
            eprintln!("Error: {}", e);
            Ok(EXIT_ERROR)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_overrides_apply_over_defaults() {
        let cli = Cli::parse_from([
            "factmine",
            "dependencies",
            "corpus",
            "--format",
            "json",
            "-j",
            "3",
            "--timeout",
            "60",
            "--mode",
            "batch",
        ]);
        let Commands::Dependencies(args) = cli.command else {
            panic!("expected dependencies command");
        };
        let config = load_config(&args).unwrap();
        assert_eq!(config.format.as_deref(), Some("json"));
        assert_eq!(config.jobs, 3);
        assert_eq!(config.timeout_secs, Some(60));
        assert_eq!(config.mode, "batch");
        assert_eq!(config.output_dir, PathBuf::from("factmine-out"));
    }

    #[test]
    fn test_import_languages_are_comma_separated() {
        let cli = Cli::parse_from(["factmine", "imports", "corpus", "-l", "kotlin,python", "--distinct"]);
        let Commands::Imports(args) = cli.command else {
            panic!("expected imports command");
        };
        assert_eq!(args.languages, vec!["kotlin", "python"]);
        assert!(args.distinct);
    }

    #[test]
    fn test_all_rejects_pattern_without_analysis() {
        let corpus = tempfile::TempDir::new().unwrap();
        let out = tempfile::TempDir::new().unwrap();
        let corpus_arg = corpus.path().to_string_lossy().to_string();
        let out_arg = out.path().to_string_lossy().to_string();

        let cli = Cli::parse_from([
            "factmine",
            "all",
            corpus_arg.as_str(),
            "-o",
            out_arg.as_str(),
            "--file-name",
            "{project}.{ext}",
            "-q",
        ]);
        let Commands::All(args) = cli.command else {
            panic!("expected all command");
        };
        assert_eq!(run_all(&args).unwrap(), EXIT_ERROR);
        assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 0);

        // One extraction per run may drop the analysis name.
        let config = load_config(&args).unwrap();
        assert!(config.validate().is_ok());
        assert!(matches!(
            config.validate_shared(),
            Err(ConfigError::InvalidFileName { .. })
        ));
    }

    #[test]
    fn test_failures_exit_zero_unless_strict() {
        let dir = tempfile::TempDir::new().unwrap();
        let outcome = crate::executor::ExecutionOutcome::failed(
            "broken",
            dir.path(),
            "mandatory unit failed to parse".to_string(),
            0,
        );
        let runs = vec![RunSummary {
            analysis: "gradle_plugins".to_string(),
            outcomes: vec![outcome],
            elapsed_ms: 0,
        }];
        let corpus = dir.path().to_string_lossy().to_string();

        let lenient = Cli::parse_from(["factmine", "plugins", corpus.as_str(), "-q"]);
        let strict = Cli::parse_from(["factmine", "plugins", corpus.as_str(), "-q", "--strict"]);
        let (Commands::Plugins(lenient), Commands::Plugins(strict)) = (lenient.command, strict.command) else {
            panic!("expected plugins command");
        };
        let config = RunConfig::default();
        assert_eq!(finish(&config, &lenient, &runs).unwrap(), EXIT_SUCCESS);
        assert_eq!(finish(&config, &strict, &runs).unwrap(), EXIT_FAILED);
    }
}
