//! Project execution.
//!
//! This module provides:
//! - `AnalysisExecutor`: runs one extraction over every project of a corpus
//! - `TaggingExecutor`: classifies projects, with optional root resolution
//! - `ExecutionOutcome` / `RunSummary`: per-project results of a run
//! - `ExecutorHook`: observer notified as projects finish
//!
//! Projects are independent: each one runs on a bounded worker pool, inside
//! a panic guard and an optional timeout, and a failed project is recorded in
//! its outcome without affecting the others.

mod outcome;
mod runner;
mod tagging;

use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use outcome::{ExecutionOutcome, ProjectStatus, RunSummary};
pub use runner::{AnalysisExecutor, ProjectFacts};
pub use tagging::{find_build_root, TaggingExecutor};

/// Replaces a project's nominal root before analysis. `None` keeps it.
pub type RootResolver = Arc<dyn Fn(&Path) -> Option<PathBuf> + Send + Sync>;

/// Observes a run. Called from worker threads.
pub trait ExecutorHook: Send + Sync {
    /// Called once, before any project runs.
    fn run_started(&self, _projects: usize) {}

    fn project_finished(&self, outcome: &ExecutionOutcome);
}
