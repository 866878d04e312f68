//! Factmine - batch fact mining over corpora of source-code projects.
//!
//! Factmine walks a corpus of projects, parses their sources and build
//! scripts, and extracts normalized facts: import directives, Gradle
//! dependencies, plugins, properties and modules, and a project
//! classification. Each project yields one deterministic artifact.
//!
//! # Architecture
//!
//! - `parser`: language front-ends producing a uniform syntax tree
//! - `analysis`: element analyzers, context controllers and aggregators
//! - `extract`: the concrete extractions built from them
//! - `project`: projects, modules and unit discovery
//! - `executor`: per-project execution with failure isolation
//! - `output`: artifact naming and record serialization
//! - `config`, `report`, `logging`, `cli`: the ambient stack of the binary
//!
//! # Adding a New Extraction
//!
//! See `src/extract/imports.rs`. Implement `ElementAnalyzer` for the node
//! kinds you need, bundle analyzers and an aggregator in a `MainAnalyzer`,
//! and expose them through the `Extraction` trait.

pub mod analysis;
pub mod cli;
pub mod config;
pub mod error;
pub mod executor;
pub mod extract;
pub mod logging;
pub mod output;
pub mod parser;
pub mod project;
pub mod report;

pub use analysis::{Aggregator, ElementAnalyzer, MainAnalyzer, PartialResult, ResultOrder};
pub use config::{RunConfig, RunMode};
pub use error::{ConfigError, OutputError, ParseError, ProjectError};
pub use executor::{AnalysisExecutor, ExecutionOutcome, RunSummary, TaggingExecutor};
pub use extract::Extraction;
pub use output::{OutputFormat, OutputWriter};
pub use parser::{SyntaxNode, SyntaxUnit};
pub use project::{AnalysisUnit, Project, ProjectTag, ProjectWalker};

/// Initialize all subsystems.
///
/// Call this once at startup.
pub fn init() {
    parser::init();
}
