//! Size metrics of the Kotlin sources of each module.
//!
//! One row per module, the project root first, then modules in resolved
//! order. Modules without Kotlin sources get a row of zeros.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use crate::analysis::{
    Collected, ElementAnalyzer, ListAggregator, MainAnalyzer, NoContext, PartialResult, ResultOrder,
};
use crate::error::AnalyzerFailure;
use crate::extract::Extraction;
use crate::output::{FactRecord, OutputFormat};
use crate::parser::script::SCRIPT;
use crate::parser::{SyntaxNode, SyntaxUnit};
use crate::project::{Project, UnitScope, ROOT_MODULE};

/// Analysis name of project metrics.
pub const ANALYSIS_NAME: &str = "project_metrics";

/// Size of one source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FileMetrics {
    pub lines: usize,
    pub symbols: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleMetricsRecord {
    pub module: String,
    pub files_count: usize,
    pub lines_count: usize,
    pub symbols_count: usize,
}

impl FactRecord for ModuleMetricsRecord {
    fn header() -> &'static [&'static str] {
        &["module", "files_count", "lines_count", "symbols_count"]
    }

    fn columns(&self) -> Vec<String> {
        vec![
            self.module.clone(),
            self.files_count.to_string(),
            self.lines_count.to_string(),
            self.symbols_count.to_string(),
        ]
    }
}

/// Measures a whole unit at its root node.
pub struct FileMetricsAnalyzer;

impl ElementAnalyzer<NoContext, FileMetrics> for FileMetricsAnalyzer {
    fn name(&self) -> &'static str {
        "file-metrics"
    }

    fn target_kinds(&self) -> &'static [&'static str] {
        &[SCRIPT]
    }

    fn analyze(
        &self,
        _node: &SyntaxNode,
        unit: &SyntaxUnit,
        _context: &NoContext,
    ) -> Result<Option<FileMetrics>, AnalyzerFailure> {
        let source = unit.source();
        Ok(Some(FileMetrics {
            lines: source.lines().count(),
            symbols: source.chars().count(),
        }))
    }
}

pub struct ProjectMetrics {
    analyzer: MainAnalyzer<NoContext, FileMetrics, Vec<FileMetrics>>,
}

impl ProjectMetrics {
    pub fn new() -> Self {
        Self {
            analyzer: MainAnalyzer::new(
                vec![Box::new(FileMetricsAnalyzer)
                    as Box<dyn ElementAnalyzer<NoContext, FileMetrics>>],
                Arc::new(ListAggregator::<FileMetrics>::new()),
            ),
        }
    }
}

impl Default for ProjectMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Extraction for ProjectMetrics {
    type Partial = FileMetrics;
    type Record = ModuleMetricsRecord;

    fn name(&self) -> &'static str {
        ANALYSIS_NAME
    }

    fn scope(&self) -> UnitScope {
        UnitScope::Sources {
            extensions: vec!["kt"],
        }
    }

    fn default_format(&self) -> OutputFormat {
        OutputFormat::Csv
    }

    fn order(&self) -> ResultOrder {
        ResultOrder::SourceOrder
    }

    fn collect(&self, unit: &SyntaxUnit) -> Collected<FileMetrics> {
        match unit.language() {
            "kotlin" => self.analyzer.collect(unit),
            _ => Collected::default(),
        }
    }

    fn aggregate(
        &self,
        project: &Project,
        partials: Vec<PartialResult<FileMetrics>>,
    ) -> Vec<ModuleMetricsRecord> {
        let mut totals: HashMap<String, ModuleMetricsRecord> = HashMap::new();
        for partial in partials {
            let entry = totals
                .entry(partial.module.clone())
                .or_insert_with(|| empty_row(&partial.module));
            entry.files_count += 1;
            entry.lines_count += partial.value.lines;
            entry.symbols_count += partial.value.symbols;
        }

        std::iter::once(ROOT_MODULE)
            .chain(project.modules().iter().map(|m| m.relative.as_str()))
            .map(|module| totals.remove(module).unwrap_or_else(|| empty_row(module)))
            .collect()
    }
}

fn empty_row(module: &str) -> ModuleMetricsRecord {
    ModuleMetricsRecord {
        module: module.to_string(),
        files_count: 0,
        lines_count: 0,
        symbols_count: 0,
    }
}
