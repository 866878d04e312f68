//! Discovery of projects, modules and analysis units.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use globset::GlobSet;
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::{
    dir_name, join_relative, AnalysisUnit, Module, ModuleLister, NoModules, Project, UnitScope,
    ROOT_MODULE,
};
use crate::config::{RunConfig, RunMode};
use crate::error::{ConfigError, ProjectError};
use crate::extract::gradle::GradleSettingsModules;

/// Directory names never descended into when collecting sources.
pub const SKIPPED_DIRS: &[&str] = &[
    "build",
    "out",
    "target",
    "node_modules",
    ".gradle",
    "__pycache__",
    "venv",
    ".venv",
];

/// Finds projects in a corpus and the units inside each project.
pub struct ProjectWalker {
    markers: Vec<String>,
    excluded: GlobSet,
    lister: Box<dyn ModuleLister>,
}

impl ProjectWalker {
    /// Walker recognizing `markers`, with no exclusions and no module discovery.
    pub fn new(markers: Vec<String>) -> Self {
        Self {
            markers,
            excluded: GlobSet::empty(),
            lister: Box::new(NoModules),
        }
    }

    /// Walker for a run: configured markers and exclusions, Gradle settings
    /// files as the module source.
    pub fn from_config(config: &RunConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(config.markers.clone())
            .with_excluded(config.exclusion_set()?)
            .with_module_lister(GradleSettingsModules::new()))
    }

    /// Exclude project-relative paths matching `excluded` from source walks.
    pub fn with_excluded(mut self, excluded: GlobSet) -> Self {
        self.excluded = excluded;
        self
    }

    pub fn with_module_lister(mut self, lister: impl ModuleLister + 'static) -> Self {
        self.lister = Box::new(lister);
        self
    }

    /// Whether `dir` directly contains a project marker.
    pub fn has_marker(&self, dir: &Path) -> bool {
        self.markers.iter().any(|marker| dir.join(marker).is_file())
    }

    /// Projects under `corpus_root`, sorted by name.
    ///
    /// In `Auto` mode the corpus root is one project if it carries a marker;
    /// otherwise every immediate child directory with a marker is one.
    pub fn discover_projects(&self, corpus_root: &Path, mode: RunMode) -> Vec<Project> {
        self.discover_projects_with(corpus_root, mode, &|_: &Path| false)
    }

    /// Like [`discover_projects`](Self::discover_projects), additionally
    /// accepting child directories without a marker for which `accept` holds.
    pub fn discover_projects_with(
        &self,
        corpus_root: &Path,
        mode: RunMode,
        accept: &dyn Fn(&Path) -> bool,
    ) -> Vec<Project> {
        let single = match mode {
            RunMode::Single => true,
            RunMode::Batch => false,
            RunMode::Auto => self.has_marker(corpus_root),
        };
        if single {
            return vec![Project::new(dir_name(corpus_root), corpus_root)];
        }

        let mut projects = Vec::new();
        for entry in WalkDir::new(corpus_root)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(error = %err, "skipping unreadable corpus entry");
                    continue;
                }
            };
            let name = entry.file_name().to_string_lossy();
            if !entry.file_type().is_dir() || name.starts_with('.') {
                continue;
            }
            if self.has_marker(entry.path()) || accept(entry.path()) {
                projects.push(Project::new(name, entry.path()));
            } else {
                debug!(path = %entry.path().display(), "no project marker, skipping");
            }
        }
        projects
    }

    /// Resolve the project's modules recursively.
    ///
    /// Each module directory is asked for its own modules. Modules are
    /// deduplicated by canonical path; modules resolving outside the project
    /// boundary are dropped with a warning. A listed module that does not
    /// exist fails the project.
    pub fn expand_modules(&self, project: Project) -> Result<Project, ProjectError> {
        let root = canonical(project.root())?;
        let boundary = canonical(project.boundary())?;

        let mut visited = HashSet::from([root]);
        let mut modules = Vec::new();
        self.collect_modules(
            project.root(),
            ROOT_MODULE,
            &boundary,
            &mut visited,
            &mut modules,
        )?;

        if !modules.is_empty() {
            debug!(project = project.name(), count = modules.len(), "resolved modules");
        }
        Ok(project.with_modules(modules))
    }

    fn collect_modules(
        &self,
        dir: &Path,
        prefix: &str,
        boundary: &Path,
        visited: &mut HashSet<PathBuf>,
        modules: &mut Vec<Module>,
    ) -> Result<(), ProjectError> {
        for listed in self.lister.included_modules(dir)? {
            let Some(path) = normalize_module_path(&listed) else {
                continue;
            };
            let candidate = dir.join(&path);
            if !candidate.is_dir() {
                return Err(ProjectError::discovery(
                    &candidate,
                    format!("listed module {:?} does not exist", listed),
                ));
            }

            let resolved = canonical(&candidate)?;
            if !resolved.starts_with(boundary) {
                warn!(
                    module = %listed,
                    path = %candidate.display(),
                    "module resolves outside the project, skipping"
                );
                continue;
            }
            if !visited.insert(resolved) {
                debug!(module = %listed, "module already visited");
                continue;
            }

            let relative = join_relative(prefix, &path);
            modules.push(Module {
                relative: relative.clone(),
                root: candidate.clone(),
            });
            self.collect_modules(&candidate, &relative, boundary, visited, modules)?;
        }
        Ok(())
    }

    /// Units of `project` selected by `scope`, in deterministic order: root
    /// first, then modules in listed order, file names sorted within each.
    pub fn discover_units(
        &self,
        project: &Project,
        scope: &UnitScope,
    ) -> Result<Vec<AnalysisUnit>, ProjectError> {
        match scope {
            UnitScope::Sources { extensions } => self.source_units(project, extensions),
            UnitScope::Descriptors {
                names,
                modules,
                required,
            } => descriptor_units(project, names, *modules, *required),
        }
    }

    fn source_units(
        &self,
        project: &Project,
        extensions: &[&str],
    ) -> Result<Vec<AnalysisUnit>, ProjectError> {
        let module_dirs: HashSet<&Path> = project.modules().iter().map(|m| m.root.as_path()).collect();
        let composite = project.is_composite();
        let mut units = Vec::new();

        for (module, module_root) in project.module_roots() {
            let entries = WalkDir::new(module_root)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|e| {
                    if e.depth() == 0 {
                        return true;
                    }
                    let relative = unit_relative(module, module_root, e.path());
                    if self.excluded.is_match(&relative) {
                        return false;
                    }
                    if !e.file_type().is_dir() {
                        return true;
                    }
                    let name = e.file_name().to_string_lossy();
                    // Skip hidden and build output directories
                    if name.starts_with('.') || SKIPPED_DIRS.contains(&name.as_ref()) {
                        return false;
                    }
                    // Modules are walked on their own; unlisted nested projects not at all
                    if module_dirs.contains(e.path()) {
                        return false;
                    }
                    !(composite && self.has_marker(e.path()))
                });

            for entry in entries {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(err) if err.depth() == 0 => {
                        return Err(ProjectError::Walk {
                            path: module_root.to_path_buf(),
                            source: err,
                        });
                    }
                    Err(err) => {
                        warn!(project = project.name(), error = %err, "skipping unreadable entry");
                        continue;
                    }
                };
                if !entry.file_type().is_file() {
                    continue;
                }
                let ext = entry.path().extension().and_then(|e| e.to_str()).unwrap_or("");
                if !extensions.contains(&ext) {
                    continue;
                }
                units.push(AnalysisUnit::new(
                    entry.path(),
                    unit_relative(module, module_root, entry.path()),
                    module,
                    false,
                ));
            }
        }

        Ok(units)
    }
}

fn descriptor_units(
    project: &Project,
    names: &[&str],
    with_modules: bool,
    required: bool,
) -> Result<Vec<AnalysisUnit>, ProjectError> {
    let roots: Vec<(&str, &Path)> = if with_modules {
        project.module_roots().collect()
    } else {
        vec![(ROOT_MODULE, project.root())]
    };

    let mut units = Vec::new();
    for (module, dir) in roots {
        for name in names {
            let path = dir.join(name);
            if path.is_file() {
                units.push(AnalysisUnit::new(
                    path,
                    join_relative(module, name),
                    module,
                    module == ROOT_MODULE,
                ));
            }
        }
    }

    if required && units.is_empty() {
        return Err(ProjectError::MissingDescriptor {
            root: project.root().to_path_buf(),
            expected: names.join(", "),
        });
    }
    Ok(units)
}

fn canonical(path: &Path) -> Result<PathBuf, ProjectError> {
    path.canonicalize()
        .map_err(|e| ProjectError::discovery(path, e.to_string()))
}

/// `a/./b/` -> `a/b`; empty paths yield `None`.
fn normalize_module_path(listed: &str) -> Option<String> {
    let parts: Vec<&str> = listed
        .split(['/', '\\'])
        .filter(|part| !part.is_empty() && *part != ".")
        .collect();
    (!parts.is_empty()).then(|| parts.join("/"))
}

/// Project-relative, `/`-separated path of `path` inside `module_root`.
fn unit_relative(module: &str, module_root: &Path, path: &Path) -> String {
    let rest = path
        .strip_prefix(module_root)
        .unwrap_or(path)
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/");
    join_relative(module, &rest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_MARKERS;
    use globset::{Glob, GlobSetBuilder};
    use std::fs;
    use tempfile::TempDir;

    fn walker() -> ProjectWalker {
        ProjectWalker::new(DEFAULT_MARKERS.iter().map(|m| m.to_string()).collect())
    }

    fn touch(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    /// Lists modules from a `modules.txt` file, one per line.
    fn list_file(root: &Path) -> Result<Vec<String>, ProjectError> {
        let path = root.join("modules.txt");
        if !path.exists() {
            return Ok(Vec::new());
        }
        Ok(fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect())
    }

    fn relatives(units: &[AnalysisUnit]) -> Vec<&str> {
        units.iter().map(|u| u.relative_path()).collect()
    }

    #[test]
    fn test_root_with_marker_is_single_project() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "build.gradle.kts", "");
        touch(temp.path(), "sub/build.gradle", "");

        let projects = walker().discover_projects(temp.path(), RunMode::Auto);
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].root(), temp.path());
    }

    #[test]
    fn test_batch_projects_sorted_and_filtered() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "zeta/pom.xml", "");
        touch(temp.path(), "alpha/build.gradle", "");
        touch(temp.path(), "notes/README.md", "");
        touch(temp.path(), ".hidden/build.gradle", "");
        touch(temp.path(), "loose.txt", "");

        let projects = walker().discover_projects(temp.path(), RunMode::Auto);
        let names: Vec<_> = projects.iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }

    #[test]
    fn test_sources_skip_build_and_hidden_dirs() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "build.gradle.kts", "");
        touch(temp.path(), "src/main/kotlin/b/B.kt", "");
        touch(temp.path(), "src/main/kotlin/a/A.kt", "");
        touch(temp.path(), "build/generated/G.kt", "");
        touch(temp.path(), ".idea/X.kt", "");
        touch(temp.path(), "src/main/java/J.java", "");

        let project = Project::from_dir(temp.path());
        let units = walker()
            .discover_units(&project, &UnitScope::Sources { extensions: vec!["kt"] })
            .unwrap();
        assert_eq!(
            relatives(&units),
            vec!["src/main/kotlin/a/A.kt", "src/main/kotlin/b/B.kt"]
        );
        assert!(units.iter().all(|u| u.module() == "." && !u.mandatory()));
    }

    #[test]
    fn test_excluded_globs() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "src/Keep.kt", "");
        touch(temp.path(), "src/generated/Skip.kt", "");

        let mut builder = GlobSetBuilder::new();
        builder.add(Glob::new("**/generated/**").unwrap());
        let walker = walker().with_excluded(builder.build().unwrap());

        let project = Project::from_dir(temp.path());
        let units = walker
            .discover_units(&project, &UnitScope::Sources { extensions: vec!["kt"] })
            .unwrap();
        assert_eq!(relatives(&units), vec!["src/Keep.kt"]);
    }

    #[test]
    fn test_composite_includes_listed_modules_only() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "build.gradle.kts", "");
        touch(temp.path(), "modules.txt", "moduleA\nmoduleB\n");
        touch(temp.path(), "moduleA/build.gradle.kts", "");
        touch(temp.path(), "moduleA/src/A.kt", "");
        touch(temp.path(), "moduleB/build.gradle.kts", "");
        touch(temp.path(), "moduleB/src/B.kt", "");
        touch(temp.path(), "moduleC/build.gradle.kts", "");
        touch(temp.path(), "moduleC/src/C.kt", "");
        touch(temp.path(), "buildSrc/Root.kt", "");

        let walker = walker().with_module_lister(list_file);
        let project = walker.expand_modules(Project::from_dir(temp.path())).unwrap();
        let modules: Vec<_> = project.modules().iter().map(|m| m.relative.as_str()).collect();
        assert_eq!(modules, vec!["moduleA", "moduleB"]);

        let units = walker
            .discover_units(&project, &UnitScope::Sources { extensions: vec!["kt"] })
            .unwrap();
        assert_eq!(
            relatives(&units),
            vec!["buildSrc/Root.kt", "moduleA/src/A.kt", "moduleB/src/B.kt"]
        );
        assert_eq!(units[1].module(), "moduleA");
    }

    #[test]
    fn test_nested_modules_and_cycles() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "modules.txt", "libs\n");
        touch(temp.path(), "libs/modules.txt", "core\n../libs\n");
        touch(temp.path(), "libs/core/modules.txt", "..\n");

        let walker = walker().with_module_lister(list_file);
        let project = walker.expand_modules(Project::from_dir(temp.path())).unwrap();
        let modules: Vec<_> = project.modules().iter().map(|m| m.relative.as_str()).collect();
        assert_eq!(modules, vec!["libs", "libs/core"]);
    }

    #[test]
    fn test_missing_module_is_discovery_error() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "modules.txt", "ghost\n");

        let walker = walker().with_module_lister(list_file);
        let err = walker.expand_modules(Project::from_dir(temp.path())).unwrap_err();
        assert!(matches!(err, ProjectError::Discovery { .. }));
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn test_module_outside_boundary_is_skipped() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "project/modules.txt", "../outside\n");
        touch(temp.path(), "outside/build.gradle", "");

        let walker = walker().with_module_lister(list_file);
        let project = walker
            .expand_modules(Project::from_dir(temp.path().join("project")))
            .unwrap();
        assert!(project.modules().is_empty());

        let widened = walker
            .expand_modules(Project::from_dir(temp.path().join("project")).with_boundary(temp.path()))
            .unwrap();
        assert_eq!(widened.modules().len(), 1);
    }

    #[test]
    fn test_batch_project_cannot_claim_sibling_as_module() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "alpha/build.gradle", "");
        touch(temp.path(), "alpha/modules.txt", "core\n../beta\n");
        touch(temp.path(), "alpha/core/build.gradle", "");
        touch(temp.path(), "beta/build.gradle", "");

        let walker = walker().with_module_lister(list_file);
        let projects = walker.discover_projects(temp.path(), RunMode::Batch);
        assert_eq!(projects.len(), 2);
        assert_eq!(projects[0].boundary(), projects[0].root());

        let alpha = walker.expand_modules(projects[0].clone()).unwrap();
        let modules: Vec<&str> = alpha.modules().iter().map(|m| m.relative.as_str()).collect();
        assert_eq!(modules, vec!["core"]);
    }

    #[test]
    fn test_descriptors_root_mandatory_modules_tolerated() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "build.gradle", "");
        touch(temp.path(), "modules.txt", "app\n");
        touch(temp.path(), "app/build.gradle.kts", "");

        let walker = walker().with_module_lister(list_file);
        let project = walker.expand_modules(Project::from_dir(temp.path())).unwrap();
        let scope = UnitScope::Descriptors {
            names: &["build.gradle.kts", "build.gradle"],
            modules: true,
            required: true,
        };
        let units = walker.discover_units(&project, &scope).unwrap();
        assert_eq!(relatives(&units), vec!["build.gradle", "app/build.gradle.kts"]);
        assert!(units[0].mandatory());
        assert!(!units[1].mandatory());
    }

    #[test]
    fn test_required_descriptor_missing() {
        let temp = TempDir::new().unwrap();
        let project = Project::from_dir(temp.path());
        let scope = UnitScope::Descriptors {
            names: &["build.gradle.kts", "build.gradle"],
            modules: false,
            required: true,
        };
        let err = walker().discover_units(&project, &scope).unwrap_err();
        assert!(matches!(err, ProjectError::MissingDescriptor { .. }));

        let optional = UnitScope::Descriptors {
            names: &["gradle.properties"],
            modules: false,
            required: false,
        };
        assert!(walker().discover_units(&project, &optional).unwrap().is_empty());
    }

    #[test]
    fn test_normalize_module_path() {
        assert_eq!(normalize_module_path("a/./b/"), Some("a/b".to_string()));
        assert_eq!(normalize_module_path("./"), None);
    }
}
