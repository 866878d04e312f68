//! `gradle.properties` entries.

use std::sync::Arc;

use serde::Serialize;

use super::PROPERTIES_DESCRIPTORS;
use crate::analysis::{
    Aggregator, Collected, ElementAnalyzer, ListAggregator, MainAnalyzer, NoContext, PartialResult,
    ResultOrder,
};
use crate::error::AnalyzerFailure;
use crate::extract::Extraction;
use crate::output::{FactRecord, OutputFormat};
use crate::parser::properties::{split_property, PROPERTY};
use crate::parser::{SyntaxNode, SyntaxUnit};
use crate::project::{Project, UnitScope};

/// Analysis name of properties extraction.
pub const ANALYSIS_NAME: &str = "gradle_properties";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropertyRecord {
    pub module: String,
    pub key: String,
    pub value: String,
}

impl FactRecord for PropertyRecord {
    fn header() -> &'static [&'static str] {
        &["module", "key", "value"]
    }

    fn columns(&self) -> Vec<String> {
        vec![self.module.clone(), self.key.clone(), self.value.clone()]
    }
}

pub struct PropertyAnalyzer;

impl ElementAnalyzer<NoContext, PropertyRecord> for PropertyAnalyzer {
    fn name(&self) -> &'static str {
        "gradle-property"
    }

    fn target_kinds(&self) -> &'static [&'static str] {
        &[PROPERTY]
    }

    fn analyze(
        &self,
        node: &SyntaxNode,
        unit: &SyntaxUnit,
        _context: &NoContext,
    ) -> Result<Option<PropertyRecord>, AnalyzerFailure> {
        let (key, value) = split_property(unit.text(node));
        if key.is_empty() {
            return Err(self.failure(unit, node, "property without key".to_string()));
        }
        Ok(Some(PropertyRecord {
            module: unit.module().to_string(),
            key,
            value,
        }))
    }
}

/// Properties of the root and module `gradle.properties` files, in file order.
pub struct GradleProperties {
    analyzer: MainAnalyzer<NoContext, PropertyRecord, Vec<PropertyRecord>>,
}

impl GradleProperties {
    pub fn new() -> Self {
        Self {
            analyzer: MainAnalyzer::new(
                vec![Box::new(PropertyAnalyzer)
                    as Box<dyn ElementAnalyzer<NoContext, PropertyRecord>>],
                Arc::new(ListAggregator::<PropertyRecord>::new()),
            ),
        }
    }
}

impl Default for GradleProperties {
    fn default() -> Self {
        Self::new()
    }
}

impl Extraction for GradleProperties {
    type Partial = PropertyRecord;
    type Record = PropertyRecord;

    fn name(&self) -> &'static str {
        ANALYSIS_NAME
    }

    fn scope(&self) -> UnitScope {
        UnitScope::Descriptors {
            names: PROPERTIES_DESCRIPTORS,
            modules: true,
            required: false,
        }
    }

    fn default_format(&self) -> OutputFormat {
        OutputFormat::Csv
    }

    fn order(&self) -> ResultOrder {
        self.analyzer.aggregator().order()
    }

    fn collect(&self, unit: &SyntaxUnit) -> Collected<PropertyRecord> {
        match unit.language() {
            "properties" => self.analyzer.collect(unit),
            _ => Collected::default(),
        }
    }

    fn aggregate(
        &self,
        _project: &Project,
        partials: Vec<PartialResult<PropertyRecord>>,
    ) -> Vec<PropertyRecord> {
        self.analyzer.aggregator().aggregate(partials)
    }
}
