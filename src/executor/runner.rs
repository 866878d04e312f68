//! The analysis executor.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, info, warn};

use super::outcome::{ExecutionOutcome, RunSummary};
use super::{ExecutorHook, RootResolver};
use crate::analysis::Collected;
use crate::config::{RunConfig, RunMode};
use crate::error::{ConfigError, ProjectError};
use crate::extract::Extraction;
use crate::output::{ArtifactNaming, OutputWriter};
use crate::parser::{frontend_for_path, parse_unit, FrontendConcurrency};
use crate::project::{AnalysisUnit, Project, ProjectWalker};

/// Aggregated records of one project, before they are written.
#[derive(Debug)]
pub struct ProjectFacts<R> {
    pub records: Vec<R>,
    /// Units discovered for the project.
    pub units: usize,
    /// Tolerated problems, one line each.
    pub warnings: Vec<String>,
}

enum UnitResult<P> {
    Analyzed(Collected<P>),
    Skipped(String),
}

/// The per-project work, shareable with a timeout worker thread.
struct ProjectAnalysis<E> {
    extraction: Arc<E>,
    walker: Arc<ProjectWalker>,
    /// Pool for parallel unit processing, bounded by the job count. Present
    /// only when units of a project may run in parallel.
    unit_pool: Option<Arc<ThreadPool>>,
    resolver: Option<RootResolver>,
}

impl<E> Clone for ProjectAnalysis<E> {
    fn clone(&self) -> Self {
        Self {
            extraction: Arc::clone(&self.extraction),
            walker: Arc::clone(&self.walker),
            unit_pool: self.unit_pool.clone(),
            resolver: self.resolver.clone(),
        }
    }
}

impl<E: Extraction> ProjectAnalysis<E> {
    fn analyze(&self, project: &Project) -> Result<ProjectFacts<E::Record>, ProjectError> {
        let project = self.prepare(project)?;
        let units = self
            .walker
            .discover_units(&project, &self.extraction.scope())?;
        debug!(project = project.name(), units = units.len(), "discovered units");

        let results: Vec<_> = match &self.unit_pool {
            Some(pool) if units.len() > 1 && all_shared(&units, registered_concurrency) => {
                pool.install(|| units.par_iter().map(|unit| self.process_unit(unit)).collect())
            }
            _ => units.iter().map(|unit| self.process_unit(unit)).collect(),
        };

        let mut collected = Collected::default();
        let mut warnings = Vec::new();
        for result in results {
            match result? {
                UnitResult::Analyzed(unit_collected) => collected.extend(unit_collected),
                UnitResult::Skipped(reason) => warnings.push(reason),
            }
        }
        for failure in &collected.failures {
            debug!(project = project.name(), "{}", failure);
            warnings.push(failure.to_string());
        }

        let records = self.extraction.aggregate(&project, collected.partials);
        Ok(ProjectFacts {
            records,
            units: units.len(),
            warnings,
        })
    }

    /// Apply root resolution and module expansion.
    fn prepare(&self, project: &Project) -> Result<Project, ProjectError> {
        let mut project = project.clone();
        if let Some(resolver) = &self.resolver {
            if let Some(root) = resolver(project.root()) {
                debug!(
                    project = project.name(),
                    root = %root.display(),
                    "using resolved project root"
                );
                project = Project::new(project.name(), root).with_boundary(project.boundary());
            }
        }
        if self.extraction.needs_modules() {
            project = self.walker.expand_modules(project)?;
        }
        Ok(project)
    }

    /// Parse and analyze one unit. Only a mandatory unit's parse error fails
    /// the project.
    fn process_unit(&self, unit: &AnalysisUnit) -> Result<UnitResult<E::Partial>, ProjectError> {
        match parse_unit(unit) {
            Ok(syntax) => Ok(UnitResult::Analyzed(self.extraction.collect(&syntax))),
            Err(err) if unit.mandatory() => Err(err.into()),
            Err(err) => {
                warn!(unit = unit.relative_path(), error = %err, "skipping unparseable unit");
                Ok(UnitResult::Skipped(format!("skipped {}: {}", unit.relative_path(), err)))
            }
        }
    }
}

/// Whether every unit goes through a front-end that may parse in parallel.
fn all_shared(units: &[AnalysisUnit], concurrency: impl Fn(&Path) -> FrontendConcurrency) -> bool {
    units
        .iter()
        .all(|unit| concurrency(unit.path()) == FrontendConcurrency::Shared)
}

/// Concurrency of the registered front-end for `path`. Units without one
/// fail on their own when parsed.
fn registered_concurrency(path: &Path) -> FrontendConcurrency {
    frontend_for_path(path).map_or(FrontendConcurrency::Shared, |f| f.concurrency())
}

/// Runs one [`Extraction`] over the projects of a corpus and writes one
/// artifact per succeeded project.
pub struct AnalysisExecutor<E> {
    core: ProjectAnalysis<E>,
    writer: OutputWriter,
    jobs: usize,
    timeout: Option<Duration>,
    hooks: Vec<Arc<dyn ExecutorHook>>,
}

impl<E: Extraction> AnalysisExecutor<E> {
    /// Executor for `extraction` configured by `config`.
    pub fn new(extraction: E, config: &RunConfig) -> Result<Self, ConfigError> {
        if config.jobs == 0 {
            return Err(ConfigError::ZeroJobs);
        }
        let format = config.output_format(extraction.default_format())?;
        let naming = ArtifactNaming::new(
            &config.output_dir,
            config.file_name.as_deref(),
            extraction.name(),
            format,
        )?;
        let walker = ProjectWalker::from_config(config)?;
        // Units may also run on a timeout worker thread, outside the project
        // pool, so they get a bounded pool of their own.
        let unit_pool = if config.parallel_units {
            let pool = ThreadPoolBuilder::new()
                .num_threads(config.jobs)
                .thread_name(|i| format!("factmine-units-{}", i))
                .build()?;
            Some(Arc::new(pool))
        } else {
            None
        };

        Ok(Self {
            core: ProjectAnalysis {
                extraction: Arc::new(extraction),
                walker: Arc::new(walker),
                unit_pool,
                resolver: None,
            },
            writer: OutputWriter::new(naming),
            jobs: config.jobs,
            timeout: config.timeout(),
            hooks: Vec::new(),
        })
    }

    pub fn with_walker(mut self, walker: ProjectWalker) -> Self {
        self.core.walker = Arc::new(walker);
        self
    }

    /// Replace project roots through `resolver` before analysis.
    pub fn with_root_resolver(
        mut self,
        resolver: impl Fn(&Path) -> Option<PathBuf> + Send + Sync + 'static,
    ) -> Self {
        self.core.resolver = Some(Arc::new(resolver));
        self
    }

    pub fn with_hook(mut self, hook: Arc<dyn ExecutorHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn extraction(&self) -> &E {
        &self.core.extraction
    }

    pub fn writer(&self) -> &OutputWriter {
        &self.writer
    }

    /// Analyze `corpus_root` as one project.
    pub fn execute(&self, corpus_root: &Path) -> Result<RunSummary, ConfigError> {
        self.run(corpus_root, RunMode::Single)
    }

    /// Analyze every project directory directly under `corpus_root`.
    pub fn execute_all_projects(&self, corpus_root: &Path) -> Result<RunSummary, ConfigError> {
        self.run(corpus_root, RunMode::Batch)
    }

    /// Discover projects under `corpus_root` according to `mode` and run
    /// each one. Only an invalid invocation is an error; project failures are
    /// recorded in the summary.
    pub fn run(&self, corpus_root: &Path, mode: RunMode) -> Result<RunSummary, ConfigError> {
        if !corpus_root.exists() {
            return Err(ConfigError::CorpusRootMissing(corpus_root.to_path_buf()));
        }
        if !corpus_root.is_dir() {
            return Err(ConfigError::CorpusRootNotDirectory(corpus_root.to_path_buf()));
        }

        let started = Instant::now();
        let projects = match &self.core.resolver {
            Some(resolver) => self.core.walker.discover_projects_with(
                corpus_root,
                mode,
                &|dir: &Path| resolver(dir).is_some(),
            ),
            None => self.core.walker.discover_projects(corpus_root, mode),
        };
        info!(
            analysis = self.core.extraction.name(),
            projects = projects.len(),
            jobs = self.jobs,
            "starting run"
        );
        for hook in &self.hooks {
            hook.run_started(projects.len());
        }

        let pool = ThreadPoolBuilder::new().num_threads(self.jobs).build()?;
        let outcomes: Vec<ExecutionOutcome> = pool.install(|| {
            projects
                .par_iter()
                .map(|project| self.execute_project(project))
                .collect()
        });

        Ok(RunSummary {
            analysis: self.core.extraction.name().to_string(),
            outcomes,
            elapsed_ms: started.elapsed().as_millis() as u64,
        })
    }

    /// Analyze one project and write its artifact.
    pub fn execute_project(&self, project: &Project) -> ExecutionOutcome {
        let started = Instant::now();
        debug!(project = project.name(), root = %project.root().display(), "analyzing project");

        let result = self.guarded(project).and_then(|facts| {
            let artifact = self.writer.write(project.name(), &facts.records)?;
            Ok((artifact, facts))
        });
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let outcome = match result {
            Ok((artifact, facts)) => {
                info!(
                    project = project.name(),
                    facts = facts.records.len(),
                    artifact = %artifact.display(),
                    "project done"
                );
                ExecutionOutcome::succeeded(
                    project.name(),
                    project.root(),
                    artifact,
                    facts.records.len(),
                    facts.units,
                    facts.warnings,
                    elapsed_ms,
                )
            }
            Err(err) => {
                warn!(project = project.name(), error = %err, "project failed");
                ExecutionOutcome::failed(project.name(), project.root(), err.to_string(), elapsed_ms)
            }
        };

        for hook in &self.hooks {
            hook.project_finished(&outcome);
        }
        outcome
    }

    /// Records of one project, without writing them.
    pub fn analyze(&self, project: &Project) -> Result<ProjectFacts<E::Record>, ProjectError> {
        self.guarded(project)
    }

    /// Run the analysis under the panic guard and, when configured, the
    /// timeout. A timed out worker is abandoned, not killed.
    fn guarded(&self, project: &Project) -> Result<ProjectFacts<E::Record>, ProjectError> {
        let Some(timeout) = self.timeout else {
            return catch_analysis(&self.core, project);
        };

        let core = self.core.clone();
        let owned = project.clone();
        let (tx, rx) = mpsc::channel();
        thread::Builder::new()
            .name(format!("factmine-{}", project.name()))
            .spawn(move || {
                // The receiver is gone once the project timed out.
                let _ = tx.send(catch_analysis(&core, &owned));
            })
            .map_err(ProjectError::Worker)?;

        match rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(ProjectError::TimedOut(timeout)),
            Err(RecvTimeoutError::Disconnected) => Err(ProjectError::Panicked(
                "analysis worker exited without a result".to_string(),
            )),
        }
    }
}

fn catch_analysis<E: Extraction>(
    core: &ProjectAnalysis<E>,
    project: &Project,
) -> Result<ProjectFacts<E::Record>, ProjectError> {
    panic::catch_unwind(AssertUnwindSafe(|| core.analyze(project)))
        .unwrap_or_else(|payload| Err(ProjectError::Panicked(panic_message(payload.as_ref()))))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{PartialResult, ResultOrder};
    use crate::extract::modules::ModuleRecord;
    use crate::output::OutputFormat;
    use crate::parser::SyntaxUnit;
    use crate::project::UnitScope;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Emits the project name; panics or stalls on request.
    struct Scripted {
        panic_in: &'static str,
        stall_in: &'static str,
    }

    impl Extraction for Scripted {
        type Partial = ();
        type Record = ModuleRecord;

        fn name(&self) -> &'static str {
            "scripted"
        }

        fn scope(&self) -> UnitScope {
            UnitScope::Descriptors {
                names: &["build.gradle.kts"],
                modules: false,
                required: true,
            }
        }

        fn default_format(&self) -> OutputFormat {
            OutputFormat::Lines
        }

        fn order(&self) -> ResultOrder {
            ResultOrder::SourceOrder
        }

        fn collect(&self, _unit: &SyntaxUnit) -> Collected<()> {
            Collected::default()
        }

        fn aggregate(&self, project: &Project, _partials: Vec<PartialResult<()>>) -> Vec<ModuleRecord> {
            if project.name() == self.panic_in {
                panic!("analysis exploded");
            }
            if project.name() == self.stall_in {
                thread::sleep(Duration::from_secs(3));
            }
            vec![ModuleRecord {
                module: project.name().to_string(),
            }]
        }
    }

    /// Reports the width of the rayon pool each unit was analyzed on.
    struct PoolWidth;

    impl Extraction for PoolWidth {
        type Partial = usize;
        type Record = ModuleRecord;

        fn name(&self) -> &'static str {
            "pool_width"
        }

        fn scope(&self) -> UnitScope {
            UnitScope::Sources {
                extensions: vec!["kt"],
            }
        }

        fn default_format(&self) -> OutputFormat {
            OutputFormat::Lines
        }

        fn order(&self) -> ResultOrder {
            ResultOrder::SourceOrder
        }

        fn collect(&self, unit: &SyntaxUnit) -> Collected<usize> {
            Collected {
                partials: vec![PartialResult::new(
                    "pool-width",
                    unit,
                    unit.root(),
                    rayon::current_num_threads(),
                )],
                failures: Vec::new(),
            }
        }

        fn aggregate(&self, _project: &Project, partials: Vec<PartialResult<usize>>) -> Vec<ModuleRecord> {
            partials
                .into_iter()
                .map(|p| ModuleRecord {
                    module: p.value.to_string(),
                })
                .collect()
        }
    }

    struct Counter(AtomicUsize);

    impl ExecutorHook for Counter {
        fn project_finished(&self, _outcome: &ExecutionOutcome) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn corpus(projects: &[&str]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for name in projects {
            fs::create_dir_all(dir.path().join(name)).unwrap();
            fs::write(dir.path().join(name).join("build.gradle.kts"), "group = \"x\"\n").unwrap();
        }
        dir
    }

    fn config(out: &Path) -> RunConfig {
        RunConfig {
            output_dir: out.to_path_buf(),
            jobs: 2,
            ..RunConfig::default()
        }
    }

    #[test]
    fn test_panic_is_isolated() {
        let corpus = corpus(&["alpha", "beta", "gamma"]);
        let out = TempDir::new().unwrap();
        let counter = Arc::new(Counter(AtomicUsize::new(0)));
        let executor = AnalysisExecutor::new(
            Scripted {
                panic_in: "beta",
                stall_in: "",
            },
            &config(out.path()),
        )
        .unwrap()
        .with_hook(counter.clone());

        let summary = executor.execute_all_projects(corpus.path()).unwrap();
        assert_eq!(summary.outcomes.len(), 3);
        assert_eq!(summary.succeeded(), 2);
        let failed = summary.outcome("beta").unwrap();
        assert!(failed.error().unwrap().contains("analysis exploded"));
        assert!(!out.path().join("beta_scripted.txt").exists());
        assert_eq!(
            fs::read_to_string(out.path().join("alpha_scripted.txt")).unwrap(),
            "alpha\n"
        );
        assert_eq!(counter.0.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_timeout_fails_project() {
        let corpus = corpus(&["fast", "slow"]);
        let out = TempDir::new().unwrap();
        let mut config = config(out.path());
        config.timeout_secs = Some(1);
        let executor = AnalysisExecutor::new(
            Scripted {
                panic_in: "",
                stall_in: "slow",
            },
            &config,
        )
        .unwrap();

        let summary = executor.execute_all_projects(corpus.path()).unwrap();
        assert!(summary.outcome("fast").unwrap().is_success());
        let slow = summary.outcome("slow").unwrap();
        assert!(!slow.is_success());
        assert!(slow.error().unwrap().contains("did not finish"));
    }

    #[test]
    fn test_units_stay_on_bounded_pool_under_timeout() {
        let corpus = corpus(&["app"]);
        for file in ["A.kt", "B.kt", "C.kt"] {
            let path = corpus.path().join("app/src").join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, "fun main() {}\n").unwrap();
        }
        let out = TempDir::new().unwrap();
        let mut config = config(out.path());
        config.parallel_units = true;
        config.timeout_secs = Some(60);
        let executor = AnalysisExecutor::new(PoolWidth, &config).unwrap();

        let summary = executor.execute_all_projects(corpus.path()).unwrap();
        assert!(summary.outcome("app").unwrap().is_success());
        assert_eq!(
            fs::read_to_string(out.path().join("app_pool_width.txt")).unwrap(),
            "2\n2\n2\n"
        );
    }

    #[test]
    fn test_serialized_frontend_keeps_units_sequential() {
        let units = vec![
            AnalysisUnit::new("/p/build.gradle", "build.gradle", ".", true),
            AnalysisUnit::new("/p/gradle.properties", "gradle.properties", ".", false),
        ];
        assert!(all_shared(&units, |_| FrontendConcurrency::Shared));
        assert!(!all_shared(&units, |path| {
            if path.extension().map_or(false, |ext| ext == "properties") {
                FrontendConcurrency::Serialized
            } else {
                FrontendConcurrency::Shared
            }
        }));
        assert!(all_shared(&units, registered_concurrency));
    }

    #[test]
    fn test_missing_corpus_root_is_config_error() {
        let out = TempDir::new().unwrap();
        let executor = AnalysisExecutor::new(
            Scripted {
                panic_in: "",
                stall_in: "",
            },
            &config(out.path()),
        )
        .unwrap();
        assert!(matches!(
            executor.execute(&out.path().join("missing")),
            Err(ConfigError::CorpusRootMissing(_))
        ));
    }

    #[test]
    fn test_zero_jobs_rejected() {
        let mut config = RunConfig::default();
        config.jobs = 0;
        assert!(matches!(
            AnalysisExecutor::new(
                Scripted {
                    panic_in: "",
                    stall_in: "",
                },
                &config
            ),
            Err(ConfigError::ZeroJobs)
        ));
    }
}
