//! Import directives of Kotlin, Java and Python sources.
//!
//! Produces one fully-qualified name per import, in unit discovery order and
//! then source order:
//!
//! | Source                          | Facts             |
//! |---------------------------------|-------------------|
//! | `import a.b.C as D` (Kotlin)    | `a.b.C`           |
//! | `import static a.b.C.d;` (Java) | `a.b.C.d`         |
//! | `import a.b.*`                  | `a.b`             |
//! | `import a.b, c as d` (Python)   | `a.b`, `c`        |
//! | `from x.y import z` (Python)    | `x.y.z`           |
//! | `from x import *` (Python)      | `x`               |
//! | `from . import z` (Python)      | (ignored)         |

use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;

use super::Extraction;
use crate::analysis::{
    Aggregator, Collected, ElementAnalyzer, MainAnalyzer, NoContext, PartialResult, ResultOrder,
};
use crate::config::RunConfig;
use crate::error::{AnalyzerFailure, ConfigError};
use crate::output::{FactRecord, OutputFormat};
use crate::parser::{script, SyntaxNode, SyntaxUnit};
use crate::project::{Project, UnitScope};

/// Analysis name of import extraction.
pub const ANALYSIS_NAME: &str = "import_directives";

/// Source languages import extraction understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImportLanguage {
    Kotlin,
    Java,
    Python,
}

impl ImportLanguage {
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            ImportLanguage::Kotlin => &["kt"],
            ImportLanguage::Java => &["java"],
            ImportLanguage::Python => &["py"],
        }
    }

    /// Front-end language name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportLanguage::Kotlin => "kotlin",
            ImportLanguage::Java => "java",
            ImportLanguage::Python => "python",
        }
    }
}

impl FromStr for ImportLanguage {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "kotlin" | "kt" => Ok(ImportLanguage::Kotlin),
            "java" => Ok(ImportLanguage::Java),
            "python" | "py" => Ok(ImportLanguage::Python),
            _ => Err(ConfigError::UnknownLanguage(s.to_string())),
        }
    }
}

/// What an import analyzer found at one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportFact {
    /// A package declared by the unit.
    Package(String),
    /// Imported names, in statement order.
    Imports(Vec<String>),
}

/// One imported name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportRecord {
    pub import: String,
}

impl FactRecord for ImportRecord {
    fn header() -> &'static [&'static str] {
        &["import"]
    }

    fn columns(&self) -> Vec<String> {
        vec![self.import.clone()]
    }
}

/// Import directives of brace languages (Kotlin, Java), matched on text.
struct ImportDirectiveAnalyzer {
    kinds: &'static [&'static str],
}

impl ElementAnalyzer<NoContext, ImportFact> for ImportDirectiveAnalyzer {
    fn name(&self) -> &'static str {
        "import-directive"
    }

    fn target_kinds(&self) -> &'static [&'static str] {
        self.kinds
    }

    fn analyze(
        &self,
        node: &SyntaxNode,
        unit: &SyntaxUnit,
        _context: &NoContext,
    ) -> Result<Option<ImportFact>, AnalyzerFailure> {
        let text = unit.text(node);
        match directive_name(text, "import") {
            Some(name) => Ok(Some(ImportFact::Imports(vec![name]))),
            None => Err(self.failure(unit, node, format!("cannot read import {:?}", text))),
        }
    }
}

/// Package declarations of brace languages.
struct PackageDirectiveAnalyzer {
    kinds: &'static [&'static str],
}

impl ElementAnalyzer<NoContext, ImportFact> for PackageDirectiveAnalyzer {
    fn name(&self) -> &'static str {
        "package-directive"
    }

    fn target_kinds(&self) -> &'static [&'static str] {
        self.kinds
    }

    fn analyze(
        &self,
        node: &SyntaxNode,
        unit: &SyntaxUnit,
        _context: &NoContext,
    ) -> Result<Option<ImportFact>, AnalyzerFailure> {
        let text = unit.text(node);
        match directive_name(text, "package") {
            Some(name) => Ok(Some(ImportFact::Package(name))),
            None => Err(self.failure(unit, node, format!("cannot read package {:?}", text))),
        }
    }
}

/// Name carried by an `import`/`package` directive.
///
/// Drops `static`, aliases, backticks, trailing `;` and a trailing `.*`.
fn directive_name(text: &str, keyword: &str) -> Option<String> {
    let body = text.trim().strip_prefix(keyword)?;
    let body = body.trim().trim_end_matches(';');

    let mut name = String::new();
    for (i, token) in body.split_whitespace().enumerate() {
        if i == 0 && token == "static" {
            continue;
        }
        if token == "as" {
            break;
        }
        name.push_str(token);
    }

    let name: String = name.chars().filter(|&c| c != '`').collect();
    let name = name.strip_suffix(".*").unwrap_or(&name).trim_end_matches('.');
    (!name.is_empty()).then(|| name.to_string())
}

/// `import_statement` and `import_from_statement` of the Python grammar.
struct PythonImportAnalyzer;

impl PythonImportAnalyzer {
    /// `a.b` or `a.b as c` -> `a.b`
    fn imported<'a>(unit: &'a SyntaxUnit, node: &SyntaxNode) -> Option<&'a str> {
        match node.kind() {
            "dotted_name" => Some(unit.text(node)),
            "aliased_import" => node.child_by_field("name").map(|n| unit.text(n)),
            _ => None,
        }
    }
}

impl ElementAnalyzer<NoContext, ImportFact> for PythonImportAnalyzer {
    fn name(&self) -> &'static str {
        "python-import"
    }

    fn target_kinds(&self) -> &'static [&'static str] {
        &["import_statement", "import_from_statement"]
    }

    fn analyze(
        &self,
        node: &SyntaxNode,
        unit: &SyntaxUnit,
        _context: &NoContext,
    ) -> Result<Option<ImportFact>, AnalyzerFailure> {
        if node.kind() == "import_statement" {
            let names: Vec<String> = node
                .children_by_field("name")
                .filter_map(|n| Self::imported(unit, n))
                .map(str::to_string)
                .collect();
            if names.is_empty() {
                return Err(self.failure(unit, node, "import without names".to_string()));
            }
            return Ok(Some(ImportFact::Imports(names)));
        }

        let Some(module) = node.child_by_field("module_name") else {
            return Err(self.failure(unit, node, "from-import without module".to_string()));
        };
        if module.kind() == "relative_import" {
            return Ok(None);
        }
        let module = unit.text(module);

        if node.child_of_kind("wildcard_import").is_some() {
            return Ok(Some(ImportFact::Imports(vec![module.to_string()])));
        }

        let names: Vec<String> = node
            .children_by_field("name")
            .filter_map(|n| Self::imported(unit, n))
            .map(|name| format!("{}.{}", module, name))
            .collect();
        Ok(Some(ImportFact::Imports(names)))
    }
}

/// Orders imports by discovery, drops the project's own packages and
/// optionally duplicates.
pub struct ImportsAggregator {
    exclude_project_packages: bool,
    distinct: bool,
}

impl ImportsAggregator {
    pub fn new(exclude_project_packages: bool, distinct: bool) -> Self {
        Self {
            exclude_project_packages,
            distinct,
        }
    }
}

impl Aggregator<ImportFact, Vec<ImportRecord>> for ImportsAggregator {
    fn order(&self) -> ResultOrder {
        ResultOrder::SourceOrder
    }

    fn aggregate(&self, partials: Vec<PartialResult<ImportFact>>) -> Vec<ImportRecord> {
        let packages: Vec<&str> = if self.exclude_project_packages {
            partials
                .iter()
                .filter_map(|p| match &p.value {
                    ImportFact::Package(name) => Some(name.as_str()),
                    ImportFact::Imports(_) => None,
                })
                .collect()
        } else {
            Vec::new()
        };

        let is_project_package = |import: &str| {
            packages.iter().any(|package| {
                import == *package
                    || (import.starts_with(package) && import[package.len()..].starts_with('.'))
            })
        };

        let mut seen = HashSet::new();
        let mut records = Vec::new();
        for partial in &partials {
            let ImportFact::Imports(names) = &partial.value else {
                continue;
            };
            for name in names {
                if is_project_package(name) {
                    continue;
                }
                if self.distinct && !seen.insert(name.as_str()) {
                    continue;
                }
                records.push(ImportRecord {
                    import: name.clone(),
                });
            }
        }
        records
    }
}

/// Import extraction over the configured languages.
pub struct ImportsExtraction {
    languages: Vec<ImportLanguage>,
    kotlin: MainAnalyzer<NoContext, ImportFact, Vec<ImportRecord>>,
    java: MainAnalyzer<NoContext, ImportFact, Vec<ImportRecord>>,
    python: MainAnalyzer<NoContext, ImportFact, Vec<ImportRecord>>,
    aggregator: Arc<ImportsAggregator>,
}

impl ImportsExtraction {
    pub fn new(languages: Vec<ImportLanguage>, exclude_project_packages: bool, distinct: bool) -> Self {
        let aggregator = Arc::new(ImportsAggregator::new(exclude_project_packages, distinct));
        let shared = || Arc::clone(&aggregator) as Arc<dyn Aggregator<ImportFact, Vec<ImportRecord>>>;

        let kotlin = MainAnalyzer::new(
            vec![
                Box::new(PackageDirectiveAnalyzer {
                    kinds: &[script::PACKAGE_DIRECTIVE],
                }) as Box<dyn ElementAnalyzer<NoContext, ImportFact>>,
                Box::new(ImportDirectiveAnalyzer {
                    kinds: &[script::IMPORT_DIRECTIVE],
                }),
            ],
            shared(),
        );
        let java = MainAnalyzer::new(
            vec![
                Box::new(PackageDirectiveAnalyzer {
                    kinds: &["package_declaration"],
                }) as Box<dyn ElementAnalyzer<NoContext, ImportFact>>,
                Box::new(ImportDirectiveAnalyzer {
                    kinds: &["import_declaration"],
                }),
            ],
            shared(),
        );
        let python = MainAnalyzer::new(
            vec![Box::new(PythonImportAnalyzer) as Box<dyn ElementAnalyzer<NoContext, ImportFact>>],
            shared(),
        );

        Self {
            languages,
            kotlin,
            java,
            python,
            aggregator,
        }
    }

    pub fn from_config(config: &RunConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(
            config.import_languages()?,
            config.imports.exclude_project_packages,
            config.imports.distinct,
        ))
    }

    fn enabled(&self, language: ImportLanguage) -> bool {
        self.languages.contains(&language)
    }
}

impl Extraction for ImportsExtraction {
    type Partial = ImportFact;
    type Record = ImportRecord;

    fn name(&self) -> &'static str {
        ANALYSIS_NAME
    }

    fn scope(&self) -> UnitScope {
        UnitScope::Sources {
            extensions: self
                .languages
                .iter()
                .flat_map(|l| l.extensions().iter().copied())
                .collect(),
        }
    }

    fn default_format(&self) -> OutputFormat {
        OutputFormat::Lines
    }

    fn order(&self) -> ResultOrder {
        self.aggregator.order()
    }

    fn collect(&self, unit: &SyntaxUnit) -> Collected<ImportFact> {
        match unit.language() {
            "kotlin" if self.enabled(ImportLanguage::Kotlin) => self.kotlin.collect(unit),
            "java" if self.enabled(ImportLanguage::Java) => self.java.collect(unit),
            "python" if self.enabled(ImportLanguage::Python) => self.python.collect(unit),
            _ => Collected::default(),
        }
    }

    fn aggregate(
        &self,
        _project: &Project,
        partials: Vec<PartialResult<ImportFact>>,
    ) -> Vec<ImportRecord> {
        self.aggregator.aggregate(partials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_source;
    use std::path::Path;

    fn extraction(languages: Vec<ImportLanguage>) -> ImportsExtraction {
        ImportsExtraction::new(languages, true, false)
    }

    fn imports_of(extraction: &ImportsExtraction, units: &[SyntaxUnit]) -> Vec<String> {
        let mut collected = Collected::default();
        for unit in units {
            collected.extend(extraction.collect(unit));
        }
        extraction
            .aggregate(&Project::new("demo", "."), collected.partials)
            .into_iter()
            .map(|r| r.import)
            .collect()
    }

    fn unit(name: &str, source: &str) -> SyntaxUnit {
        parse_source(Path::new(name), source.to_string()).unwrap()
    }

    #[test]
    fn test_kotlin_imports_in_source_order() {
        let extraction = extraction(vec![ImportLanguage::Kotlin]);
        let main = unit(
            "Main.kt",
            "package org.jetbrains.research.ml.kotlinAnalysis\n\nimport kotlinx.coroutines.delay\nimport org.apache.commons.math3.random.JDKRandomGenerator\n\nfun main() {}\n",
        );
        assert_eq!(
            imports_of(&extraction, &[main]),
            vec![
                "kotlinx.coroutines.delay",
                "org.apache.commons.math3.random.JDKRandomGenerator"
            ]
        );
    }

    #[test]
    fn test_aliases_and_star_imports() {
        let extraction = extraction(vec![ImportLanguage::Kotlin]);
        let main = unit(
            "Main.kt",
            "import kotlin.math.max as maximum\nimport java.util.*\nimport a.`fun`.B\n",
        );
        assert_eq!(
            imports_of(&extraction, &[main]),
            vec!["kotlin.math.max", "java.util", "a.fun.B"]
        );
    }

    #[test]
    fn test_project_packages_excluded_across_units() {
        let extraction = extraction(vec![ImportLanguage::Kotlin]);
        let a = unit("A.kt", "package com.example.app\n\nimport com.example.core.Util\nimport com.examples.Other\n");
        let b = unit("B.kt", "package com.example.core\n\nimport okio.Buffer\n");
        assert_eq!(
            imports_of(&extraction, &[a, b]),
            vec!["com.examples.Other", "okio.Buffer"]
        );
    }

    #[test]
    fn test_distinct_keeps_first_occurrence() {
        let extraction = ImportsExtraction::new(vec![ImportLanguage::Kotlin], false, true);
        let a = unit("A.kt", "import b.B\nimport a.A\n");
        let b = unit("B.kt", "import a.A\nimport c.C\n");
        assert_eq!(imports_of(&extraction, &[a, b]), vec!["b.B", "a.A", "c.C"]);
    }

    #[test]
    fn test_disabled_language_contributes_nothing() {
        let extraction = extraction(vec![ImportLanguage::Java]);
        let main = unit("Main.kt", "import a.B\n");
        assert!(imports_of(&extraction, &[main]).is_empty());
    }

    #[test]
    fn test_java_imports() {
        let extraction = extraction(vec![ImportLanguage::Java]);
        let main = unit(
            "Main.java",
            "package com.example;\n\nimport java.util.List;\nimport static java.util.Collections.emptyList;\nimport org.apache.commons.math3.*;\nimport com.example.util.Strings;\n\nclass Main {}\n",
        );
        assert_eq!(
            imports_of(&extraction, &[main]),
            vec![
                "java.util.List",
                "java.util.Collections.emptyList",
                "org.apache.commons.math3"
            ]
        );
    }

    #[test]
    fn test_python_imports() {
        let extraction = extraction(vec![ImportLanguage::Python]);
        let main = unit(
            "main.py",
            "import os.path, numpy as np\nfrom collections import OrderedDict, deque as dq\nfrom pkg import *\nfrom . import sibling\n",
        );
        assert_eq!(
            imports_of(&extraction, &[main]),
            vec![
                "os.path",
                "numpy",
                "collections.OrderedDict",
                "collections.deque",
                "pkg"
            ]
        );
    }

    #[test]
    fn test_scope_follows_languages() {
        let extraction = extraction(vec![ImportLanguage::Kotlin, ImportLanguage::Python]);
        assert_eq!(
            extraction.scope(),
            UnitScope::Sources {
                extensions: vec!["kt", "py"]
            }
        );
        assert_eq!(extraction.order(), ResultOrder::SourceOrder);
    }

    #[test]
    fn test_directive_name() {
        assert_eq!(directive_name("import a.b.C;", "import"), Some("a.b.C".to_string()));
        assert_eq!(directive_name("package a.b", "package"), Some("a.b".to_string()));
        assert_eq!(directive_name("import", "import"), None);
    }

    #[test]
    fn test_unknown_language() {
        assert!(matches!(
            "cobol".parse::<ImportLanguage>(),
            Err(ConfigError::UnknownLanguage(_))
        ));
    }
}
