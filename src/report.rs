//! Run summaries.
//!
//! Supports two outputs:
//! - Pretty: colored terminal summary on stdout
//! - JSON: machine-readable summary file (`--summary`)

use std::fs;
use std::path::Path;

use colored::*;
use serde::Serialize;

use crate::executor::{ExecutionOutcome, RunSummary};

/// Most failures listed individually in the pretty summary.
const MAX_LISTED_FAILURES: usize = 20;

// =============================================================================
// JSON Format
// =============================================================================

#[derive(Serialize)]
pub struct JsonSummary<'a> {
    pub version: &'static str,
    pub corpus: String,
    pub runs: &'a [RunSummary],
    pub projects: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub facts: usize,
}

impl<'a> JsonSummary<'a> {
    pub fn new(corpus: &Path, runs: &'a [RunSummary]) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            corpus: corpus.display().to_string(),
            runs,
            projects: runs.iter().map(|r| r.outcomes.len()).sum(),
            succeeded: runs.iter().map(RunSummary::succeeded).sum(),
            failed: runs.iter().map(RunSummary::failed).sum(),
            facts: runs.iter().map(RunSummary::total_facts).sum(),
        }
    }
}

/// Write the summary of `runs` as pretty JSON to `path`.
pub fn write_summary_json(path: &Path, corpus: &Path, runs: &[RunSummary]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut json = serde_json::to_string_pretty(&JsonSummary::new(corpus, runs))?;
    json.push('\n');
    fs::write(path, json)?;
    Ok(())
}

// =============================================================================
// Pretty Format
// =============================================================================

/// Print a colored summary of `runs` to stdout.
pub fn write_pretty(corpus: &Path, output_dir: &Path, runs: &[RunSummary]) {
    println!();
    print!("  ");
    print!("{}", "factmine".cyan().bold());
    println!(" v{}", env!("CARGO_PKG_VERSION"));
    println!();

    print!("  {}", "Corpus: ".dimmed());
    println!("{}", corpus.display());
    print!("  {}", "Output: ".dimmed());
    println!("{}", output_dir.display());
    println!();

    for run in runs {
        write_run(run);
    }

    let failed: usize = runs.iter().map(RunSummary::failed).sum();
    if failed == 0 {
        println!("  {}", "✓ all projects succeeded".green());
    } else {
        println!(
            "  {}",
            format!("✗ {} project failure(s)", failed).red()
        );
    }
    println!();
}

fn write_run(run: &RunSummary) {
    print!("  {:<22}", run.analysis.bold());
    print!("{} ok", run.succeeded().to_string().green());
    if run.failed() > 0 {
        print!("  {} failed", run.failed().to_string().red());
    }
    print!("  {} facts", run.total_facts());
    println!("  {}", format!("({} ms)", run.elapsed_ms).dimmed());

    let failures: Vec<&ExecutionOutcome> = run.outcomes.iter().filter(|o| !o.is_success()).collect();
    for outcome in failures.iter().take(MAX_LISTED_FAILURES) {
        println!(
            "    {} {}: {}",
            "✗".red(),
            outcome.project(),
            outcome.error().unwrap_or("unknown error").dimmed()
        );
    }
    if failures.len() > MAX_LISTED_FAILURES {
        println!(
            "    {}",
            format!("... and {} more", failures.len() - MAX_LISTED_FAILURES).dimmed()
        );
    }

    let warnings: usize = run.outcomes.iter().map(|o| o.warnings().len()).sum();
    if warnings > 0 {
        println!(
            "    {}",
            format!("{} warning(s), rerun with --verbose for details", warnings).yellow()
        );
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_json_summary_totals() {
        let dir = TempDir::new().unwrap();
        let runs = vec![
            RunSummary {
                analysis: "gradle_modules".to_string(),
                outcomes: Vec::new(),
                elapsed_ms: 1,
            },
            RunSummary {
                analysis: "project_tags".to_string(),
                outcomes: Vec::new(),
                elapsed_ms: 2,
            },
        ];
        let path = dir.path().join("reports").join("summary.json");
        write_summary_json(&path, Path::new("corpus"), &runs).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["corpus"], "corpus");
        assert_eq!(json["projects"], 0);
        assert_eq!(json["runs"][1]["analysis"], "project_tags");
    }
}
