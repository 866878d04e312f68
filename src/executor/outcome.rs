//! Per-project outcomes and run summaries.

use std::path::{Path, PathBuf};

use serde::Serialize;

/// Final state of one project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    Succeeded,
    Failed,
}

/// What happened to one project.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionOutcome {
    project: String,
    root: PathBuf,
    status: ProjectStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    artifact: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    facts: usize,
    units: usize,
    warnings: Vec<String>,
    elapsed_ms: u64,
}

impl ExecutionOutcome {
    pub(crate) fn succeeded(
        project: &str,
        root: &Path,
        artifact: PathBuf,
        facts: usize,
        units: usize,
        warnings: Vec<String>,
        elapsed_ms: u64,
    ) -> Self {
        Self {
            project: project.to_string(),
            root: root.to_path_buf(),
            status: ProjectStatus::Succeeded,
            artifact: Some(artifact),
            error: None,
            facts,
            units,
            warnings,
            elapsed_ms,
        }
    }

    pub(crate) fn failed(project: &str, root: &Path, error: String, elapsed_ms: u64) -> Self {
        Self {
            project: project.to_string(),
            root: root.to_path_buf(),
            status: ProjectStatus::Failed,
            artifact: None,
            error: Some(error),
            facts: 0,
            units: 0,
            warnings: Vec::new(),
            elapsed_ms,
        }
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn status(&self) -> ProjectStatus {
        self.status
    }

    pub fn is_success(&self) -> bool {
        self.status == ProjectStatus::Succeeded
    }

    /// Written artifact, for succeeded projects.
    pub fn artifact(&self) -> Option<&Path> {
        self.artifact.as_deref()
    }

    /// Human-readable failure cause, for failed projects.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Number of records written.
    pub fn facts(&self) -> usize {
        self.facts
    }

    /// Number of units analyzed.
    pub fn units(&self) -> usize {
        self.units
    }

    /// Tolerated problems: skipped units and analyzer failures.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }
}

/// Outcomes of one run, in project discovery order.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub analysis: String,
    pub outcomes: Vec<ExecutionOutcome>,
    pub elapsed_ms: u64,
}

impl RunSummary {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn total_facts(&self) -> usize {
        self.outcomes.iter().map(|o| o.facts).sum()
    }

    pub fn outcome(&self, project: &str) -> Option<&ExecutionOutcome> {
        self.outcomes.iter().find(|o| o.project == project)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_counts() {
        let summary = RunSummary {
            analysis: "gradle_dependencies".to_string(),
            outcomes: vec![
                ExecutionOutcome::succeeded("a", Path::new("/c/a"), "out/a.csv".into(), 3, 1, Vec::new(), 5),
                ExecutionOutcome::failed("b", Path::new("/c/b"), "boom".to_string(), 1),
                ExecutionOutcome::succeeded("c", Path::new("/c/c"), "out/c.csv".into(), 0, 1, Vec::new(), 2),
            ],
            elapsed_ms: 9,
        };
        assert_eq!(summary.succeeded(), 2);
        assert_eq!(summary.failed(), 1);
        assert_eq!(summary.total_facts(), 3);
        assert_eq!(summary.outcome("b").and_then(|o| o.error()), Some("boom"));
        assert!(summary.outcome("b").unwrap().artifact().is_none());
    }

    #[test]
    fn test_outcome_json_omits_absent_fields() {
        let outcome = ExecutionOutcome::failed("b", Path::new("/c/b"), "boom".to_string(), 1);
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "failed");
        assert!(json.get("artifact").is_none());
    }
}
