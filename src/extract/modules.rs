//! Resolved module lists.
//!
//! Reads no units: the executor has already resolved the project's modules
//! through the walker's module lister, and the record set is that list.

use serde::Serialize;

use crate::analysis::{Collected, PartialResult, ResultOrder};
use crate::extract::Extraction;
use crate::output::{FactRecord, OutputFormat};
use crate::parser::SyntaxUnit;
use crate::project::{Project, UnitScope};

/// Analysis name of module listing.
pub const ANALYSIS_NAME: &str = "gradle_modules";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleRecord {
    pub module: String,
}

impl FactRecord for ModuleRecord {
    fn header() -> &'static [&'static str] {
        &["module"]
    }

    fn columns(&self) -> Vec<String> {
        vec![self.module.clone()]
    }
}

#[derive(Debug, Default)]
pub struct ModulesListing;

impl ModulesListing {
    pub fn new() -> Self {
        Self
    }
}

impl Extraction for ModulesListing {
    type Partial = ();
    type Record = ModuleRecord;

    fn name(&self) -> &'static str {
        ANALYSIS_NAME
    }

    fn scope(&self) -> UnitScope {
        UnitScope::Descriptors {
            names: &[],
            modules: false,
            required: false,
        }
    }

    fn default_format(&self) -> OutputFormat {
        OutputFormat::Lines
    }

    fn order(&self) -> ResultOrder {
        ResultOrder::SourceOrder
    }

    fn needs_modules(&self) -> bool {
        true
    }

    fn collect(&self, _unit: &SyntaxUnit) -> Collected<()> {
        Collected::default()
    }

    fn aggregate(&self, project: &Project, _partials: Vec<PartialResult<()>>) -> Vec<ModuleRecord> {
        project
            .modules()
            .iter()
            .map(|m| ModuleRecord {
                module: m.relative.clone(),
            })
            .collect()
    }
}
