//! Module discovery collaborators.

use std::path::Path;

use crate::error::ProjectError;

/// Lists the sub-modules a project directory declares.
///
/// Paths are relative to `root`, `/`-separated. A single-module directory
/// returns an empty list.
pub trait ModuleLister: Send + Sync {
    fn included_modules(&self, root: &Path) -> Result<Vec<String>, ProjectError>;
}

/// Treats every project as single-module.
pub struct NoModules;

impl ModuleLister for NoModules {
    fn included_modules(&self, _root: &Path) -> Result<Vec<String>, ProjectError> {
        Ok(Vec::new())
    }
}

impl<F> ModuleLister for F
where
    F: Fn(&Path) -> Result<Vec<String>, ProjectError> + Send + Sync,
{
    fn included_modules(&self, root: &Path) -> Result<Vec<String>, ProjectError> {
        self(root)
    }
}
