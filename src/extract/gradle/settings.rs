//! Modules included by `settings.gradle(.kts)`.
//!
//! `include(":app", ":libs:core")` and `include ':app'` list modules in
//! Gradle path notation; they are reported as directory paths relative to
//! the settings file (`app`, `libs/core`). `includeBuild` is not a module.

use std::path::Path;
use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::warn;

use super::SETTINGS_DESCRIPTORS;
use crate::analysis::{ElementAnalyzer, FlattenAggregator, MainAnalyzer, NoContext};
use crate::error::{AnalyzerFailure, ProjectError};
use crate::parser::{parse_unit, script, SyntaxNode, SyntaxUnit};
use crate::project::{AnalysisUnit, ModuleLister, ROOT_MODULE};

lazy_static! {
    static ref INCLUDE_RE: Regex = Regex::new(r"^include\b").unwrap();
    static ref QUOTED_RE: Regex = Regex::new(r#""([^"]*)"|'([^']*)'"#).unwrap();
}

/// Gradle project path (`:libs:core`) to relative directory (`libs/core`).
pub fn module_dir(gradle_path: &str) -> Option<String> {
    let trimmed = gradle_path.trim().trim_start_matches(':');
    let dir = trimmed
        .split(':')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/");
    (!dir.is_empty()).then_some(dir)
}

/// Reads `include` statements of a settings script.
pub struct IncludedModulesAnalyzer;

impl ElementAnalyzer<NoContext, Vec<String>> for IncludedModulesAnalyzer {
    fn name(&self) -> &'static str {
        "gradle-include"
    }

    fn target_kinds(&self) -> &'static [&'static str] {
        &[script::STATEMENT]
    }

    fn analyze(
        &self,
        node: &SyntaxNode,
        unit: &SyntaxUnit,
        _context: &NoContext,
    ) -> Result<Option<Vec<String>>, AnalyzerFailure> {
        let text = unit.text(node).trim();
        if !INCLUDE_RE.is_match(text) {
            return Ok(None);
        }

        let modules: Vec<String> = QUOTED_RE
            .captures_iter(text)
            .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
            .filter_map(|m| module_dir(m.as_str()))
            .collect();

        if modules.is_empty() {
            return Err(self.failure(unit, node, format!("no literal module path in {:?}", text)));
        }
        Ok(Some(modules))
    }
}

/// Lists a directory's modules from its settings script.
pub struct GradleSettingsModules {
    analyzer: MainAnalyzer<NoContext, Vec<String>, Vec<String>>,
}

impl GradleSettingsModules {
    pub fn new() -> Self {
        Self {
            analyzer: MainAnalyzer::new(
                vec![Box::new(IncludedModulesAnalyzer)
                    as Box<dyn ElementAnalyzer<NoContext, Vec<String>>>],
                Arc::new(FlattenAggregator::<String>::new()),
            ),
        }
    }

    /// Included modules of a parsed settings script, first occurrence kept.
    pub fn modules_of(&self, unit: &SyntaxUnit) -> Vec<String> {
        let analyzed = self.analyzer.run(unit);
        for failure in &analyzed.failures {
            warn!(
                "{}:{}: {} ({})",
                failure.path, failure.line, failure.message, failure.analyzer
            );
        }

        let mut modules: Vec<String> = Vec::with_capacity(analyzed.result.len());
        for module in analyzed.result {
            if !modules.contains(&module) {
                modules.push(module);
            }
        }
        modules
    }
}

impl Default for GradleSettingsModules {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleLister for GradleSettingsModules {
    fn included_modules(&self, root: &Path) -> Result<Vec<String>, ProjectError> {
        let Some(name) = SETTINGS_DESCRIPTORS
            .iter()
            .find(|name| root.join(name).is_file())
        else {
            return Ok(Vec::new());
        };

        let unit = AnalysisUnit::new(root.join(name), *name, ROOT_MODULE, true);
        let syntax = parse_unit(&unit)?;
        Ok(self.modules_of(&syntax))
    }
}
