//! Fact extractions.
//!
//! An extraction bundles everything an executor needs to mine one kind of
//! fact from a project:
//!
//! ```text
//!   UnitScope ──► units ──► SyntaxUnit ──► collect() ──► partials ──► aggregate() ──► records
//!   (walker)               (front-end)    (MainAnalyzer               (Aggregator)    (FactRecord)
//!                                          per language)
//! ```
//!
//! Available extractions:
//! - [`imports::ImportsExtraction`]: import directives of Kotlin, Java and Python sources
//! - [`gradle::GradleDependencies`]: dependency declarations in build scripts
//! - [`gradle::GradlePlugins`]: declared and applied plugins
//! - [`gradle::GradleProperties`]: `gradle.properties` entries
//! - [`modules::ModulesListing`]: resolved module lists
//! - [`metrics::ProjectMetrics`]: per-module size of the Kotlin sources
//! - [`tagging::ProjectTagging`]: project classification

use crate::analysis::{Collected, PartialResult, ResultOrder};
use crate::output::{FactRecord, OutputFormat};
use crate::parser::SyntaxUnit;
use crate::project::{Project, UnitScope};

pub mod gradle;
pub mod imports;
pub mod metrics;
pub mod modules;
pub mod tagging;

/// One kind of fact an executor can mine.
pub trait Extraction: Send + Sync + 'static {
    /// Value produced by element analyzers.
    type Partial: Send;
    /// Persisted fact.
    type Record: FactRecord + Send + 'static;

    /// Analysis name, substituted for `{analysis}` in artifact names.
    fn name(&self) -> &'static str;

    /// Files of a project this extraction reads.
    fn scope(&self) -> UnitScope;

    fn default_format(&self) -> OutputFormat;

    /// Order sensitivity of the aggregated result.
    fn order(&self) -> ResultOrder;

    /// Whether the project's modules must be resolved before units are discovered.
    fn needs_modules(&self) -> bool {
        match self.scope() {
            UnitScope::Sources { .. } => true,
            UnitScope::Descriptors { modules, .. } => modules,
        }
    }

    /// Run the analyzers for the unit's language. Units of other languages
    /// contribute nothing.
    fn collect(&self, unit: &SyntaxUnit) -> Collected<Self::Partial>;

    /// Fold the partials of all units of `project`, in discovery order.
    fn aggregate(
        &self,
        project: &Project,
        partials: Vec<PartialResult<Self::Partial>>,
    ) -> Vec<Self::Record>;
}
