//! Projects, modules and analysis units.
//!
//! This module provides:
//! - `Project`: one output identity, a leaf or a root with sub-modules
//! - `AnalysisUnit`: one file scheduled for parsing
//! - `UnitScope`: which files of a project an extraction reads
//! - `ProjectWalker`: discovery of projects, modules and units

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

pub mod modules;
pub mod walker;

pub use modules::{ModuleLister, NoModules};
pub use walker::{ProjectWalker, SKIPPED_DIRS};

/// Module path of the project root.
pub const ROOT_MODULE: &str = ".";

/// One parseable file of a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisUnit {
    path: PathBuf,
    relative_path: String,
    module: String,
    mandatory: bool,
}

impl AnalysisUnit {
    pub fn new(
        path: impl Into<PathBuf>,
        relative_path: impl Into<String>,
        module: impl Into<String>,
        mandatory: bool,
    ) -> Self {
        Self {
            path: path.into(),
            relative_path: relative_path.into(),
            module: module.into(),
            mandatory,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Project-relative path with `/` separators.
    pub fn relative_path(&self) -> &str {
        &self.relative_path
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    /// A mandatory unit that fails to parse fails the whole project.
    pub fn mandatory(&self) -> bool {
        self.mandatory
    }
}

/// A sub-module of a composite project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    /// Module path relative to the project root, `/`-separated.
    pub relative: String,
    /// Directory of the module.
    pub root: PathBuf,
}

/// Classification assigned by a tagging run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectTag {
    Android,
    Other,
}

impl ProjectTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectTag::Android => "android",
            ProjectTag::Other => "other",
        }
    }
}

impl fmt::Display for ProjectTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A project in the corpus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    name: String,
    root: PathBuf,
    boundary: PathBuf,
    modules: Vec<Module>,
    tag: Option<ProjectTag>,
}

impl Project {
    /// A leaf project whose modules may not leave `root`.
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            name: name.into(),
            boundary: root.clone(),
            root,
            modules: Vec::new(),
            tag: None,
        }
    }

    /// Project directory `root`, named after its last path component.
    pub fn from_dir(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self::new(dir_name(&root), root)
    }

    /// Directory that module paths must stay inside.
    pub fn with_boundary(mut self, boundary: impl Into<PathBuf>) -> Self {
        self.boundary = boundary.into();
        self
    }

    pub fn with_modules(mut self, modules: Vec<Module>) -> Self {
        self.modules = modules;
        self
    }

    pub fn with_tag(mut self, tag: ProjectTag) -> Self {
        self.tag = Some(tag);
        self
    }

    /// Output identity of the project.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn boundary(&self) -> &Path {
        &self.boundary
    }

    /// Resolved sub-modules in listed order.
    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    pub fn is_composite(&self) -> bool {
        !self.modules.is_empty()
    }

    pub fn tag(&self) -> Option<ProjectTag> {
        self.tag
    }

    /// The root followed by each module, as (module path, directory) pairs.
    pub fn module_roots(&self) -> impl Iterator<Item = (&str, &Path)> {
        std::iter::once((ROOT_MODULE, self.root.as_path())).chain(
            self.modules
                .iter()
                .map(|m| (m.relative.as_str(), m.root.as_path())),
        )
    }
}

/// Which files of a project an extraction reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitScope {
    /// Every source file with one of `extensions`, anywhere in the project.
    Sources { extensions: Vec<&'static str> },
    /// Named descriptor files at the project root and optionally at each
    /// module root. The root descriptor is mandatory; with `required`, a
    /// project without any descriptor fails.
    Descriptors {
        names: &'static [&'static str],
        modules: bool,
        required: bool,
    },
}

/// Last path component of `path`, falling back to the whole path.
pub(crate) fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .or_else(|| {
            path.canonicalize()
                .ok()
                .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        })
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// Join a module path and a path inside it.
pub(crate) fn join_relative(module: &str, rest: &str) -> String {
    if module == ROOT_MODULE || module.is_empty() {
        rest.to_string()
    } else if rest.is_empty() {
        module.to_string()
    } else {
        format!("{}/{}", module, rest)
    }
}
