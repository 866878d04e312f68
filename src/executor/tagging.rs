//! The tagging executor.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::outcome::RunSummary;
use super::runner::AnalysisExecutor;
use super::ExecutorHook;
use crate::config::{RunConfig, RunMode};
use crate::error::{ConfigError, ProjectError};
use crate::extract::gradle::BUILD_DESCRIPTORS;
use crate::extract::tagging::ProjectTagging;
use crate::project::{Project, ProjectTag, SKIPPED_DIRS};

/// Wrapper directories descended at most.
const MAX_WRAPPER_DEPTH: usize = 8;

/// Classifies projects and writes their tags.
pub struct TaggingExecutor {
    inner: AnalysisExecutor<ProjectTagging>,
}

impl TaggingExecutor {
    /// Tagging with the built-in taggers. With `resolve_root` set,
    /// [`find_build_root`] is installed as the root resolver.
    pub fn new(config: &RunConfig) -> Result<Self, ConfigError> {
        Self::with_tagging(ProjectTagging::new(), config)
    }

    pub fn with_tagging(tagging: ProjectTagging, config: &RunConfig) -> Result<Self, ConfigError> {
        let mut inner = AnalysisExecutor::new(tagging, config)?;
        if config.resolve_root {
            inner = inner.with_root_resolver(find_build_root);
        }
        Ok(Self { inner })
    }

    pub fn with_root_resolver(
        self,
        resolver: impl Fn(&Path) -> Option<PathBuf> + Send + Sync + 'static,
    ) -> Self {
        Self {
            inner: self.inner.with_root_resolver(resolver),
        }
    }

    pub fn with_hook(self, hook: Arc<dyn ExecutorHook>) -> Self {
        Self {
            inner: self.inner.with_hook(hook),
        }
    }

    pub fn execute(&self, corpus_root: &Path) -> Result<RunSummary, ConfigError> {
        self.inner.execute(corpus_root)
    }

    pub fn execute_all_projects(&self, corpus_root: &Path) -> Result<RunSummary, ConfigError> {
        self.inner.execute_all_projects(corpus_root)
    }

    pub fn run(&self, corpus_root: &Path, mode: RunMode) -> Result<RunSummary, ConfigError> {
        self.inner.run(corpus_root, mode)
    }

    /// `project` with its primary tag assigned, without writing anything.
    pub fn tag_project(&self, project: &Project) -> Result<Project, ProjectError> {
        let facts = self.inner.analyze(project)?;
        let tag = facts
            .records
            .first()
            .and_then(|record| record.tags.first().copied())
            .unwrap_or(ProjectTag::Other);
        Ok(project.clone().with_tag(tag))
    }
}

/// Build root below a wrapper directory.
///
/// Archived projects often nest the real build under single-child
/// directories (`repo-main/repo/build.gradle`). Descends while the current
/// directory has exactly one visible subdirectory and returns the first one
/// holding a build script. `None` when `nominal` already has one, or when no
/// such chain exists.
pub fn find_build_root(nominal: &Path) -> Option<PathBuf> {
    if has_build_script(nominal) {
        return None;
    }

    let mut dir = nominal.to_path_buf();
    for _ in 0..MAX_WRAPPER_DEPTH {
        let children = visible_subdirs(&dir)?;
        let [only] = children.as_slice() else {
            return None;
        };
        if has_build_script(only) {
            return Some(only.clone());
        }
        dir = only.clone();
    }
    None
}

fn has_build_script(dir: &Path) -> bool {
    BUILD_DESCRIPTORS.iter().any(|name| dir.join(name).is_file())
}

fn visible_subdirs(dir: &Path) -> Option<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).ok()?;
    Some(
        entries
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
            .filter(|entry| {
                let name = entry.file_name();
                let name = name.to_string_lossy();
                !name.starts_with('.') && !SKIPPED_DIRS.contains(&name.as_ref())
            })
            .map(|entry| entry.path())
            .collect(),
    )
}
