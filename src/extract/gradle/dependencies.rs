//! Dependency declarations in `dependencies { }` blocks.
//!
//! Statements are matched with whitespace removed, case-insensitively,
//! against three notations:
//!
//! ```text
//! implementation("org.apache.commons:commons-math3:3.6.1")       short
//! implementation group: 'junit', name: 'junit', version: '4.13'  map
//! testImplementation(kotlin("test", "1.9.0"))                    kotlin
//! ```
//!
//! Project, platform and catalog dependencies carry no coordinates and are
//! skipped.

use std::sync::Arc;

use lazy_static::lazy_static;
use phf::phf_map;
use regex::Regex;
use serde::Serialize;

use super::context::{GradleBlock, GradleBlockContext, GradleBlockController};
use super::BUILD_DESCRIPTORS;
use crate::analysis::{
    Aggregator, Collected, ElementAnalyzer, FlattenAggregator, MainAnalyzer, PartialResult, ResultOrder,
    SetAggregator,
};
use crate::error::AnalyzerFailure;
use crate::extract::Extraction;
use crate::output::{FactRecord, OutputFormat};
use crate::parser::script::{self, BLOCK_HEADER};
use crate::parser::{SyntaxNode, SyntaxUnit};
use crate::project::{Project, UnitScope};

/// Analysis name of dependency extraction.
pub const ANALYSIS_NAME: &str = "gradle_dependencies";

/// Lowercase configuration name -> canonical spelling.
static CONFIGURATIONS: phf::Map<&'static str, &'static str> = phf_map! {
    "implementation" => "implementation",
    "api" => "api",
    "compileonly" => "compileOnly",
    "compileonlyapi" => "compileOnlyApi",
    "runtimeonly" => "runtimeOnly",
    "testimplementation" => "testImplementation",
    "testcompileonly" => "testCompileOnly",
    "testruntimeonly" => "testRuntimeOnly",
    "androidtestimplementation" => "androidTestImplementation",
    "debugimplementation" => "debugImplementation",
    "releaseimplementation" => "releaseImplementation",
    "annotationprocessor" => "annotationProcessor",
    "testannotationprocessor" => "testAnnotationProcessor",
    "kapt" => "kapt",
    "kapttest" => "kaptTest",
    "ksp" => "ksp",
    "classpath" => "classpath",
    "compile" => "compile",
    "runtime" => "runtime",
    "testcompile" => "testCompile",
    "testruntime" => "testRuntime",
};

lazy_static! {
    static ref SHORT_RE: Regex = Regex::new(
        r#"(?i)^(\w+)\(?['"]([^:'",(){}]+)['":,]+([^:'",(){}]+)(?:['":,]+([^'",()]+))?['"]\)?$"#
    )
    .unwrap();
    static ref MAP_RE: Regex = Regex::new(
        r#"(?i)^(\w+?)\(?group[:=]['"]([^'",()]+)['"],name[:=]['"]([^'",()]+)['"](?:,version[:=]['"]([^'",()]+)['"])?\)?$"#
    )
    .unwrap();
    static ref KOTLIN_RE: Regex = Regex::new(
        r#"(?i)^(\w+)\(?kotlin\(['"]([^'",()]+)['"](?:,(?:version=)?['"]([^'",()]+)['"])?\)\)?$"#
    )
    .unwrap();
    static ref SINGLE_STRING_RE: Regex = Regex::new(r#"^(\w+)\(?['"]([^'"]*)['"]\)?$"#).unwrap();
    static ref ARGUMENTS_RE: Regex =
        Regex::new(r#"^(\w+)\(?((?:['"][^'"]*['"],)+['"][^'"]*['"])\)?$"#).unwrap();
    static ref QUOTED_RE: Regex = Regex::new(r#"['"]([^'"]*)['"]"#).unwrap();
}

/// One declared dependency.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct DependencyRecord {
    pub module: String,
    pub configuration: String,
    pub group_id: String,
    pub artifact_id: String,
    pub version: Option<String>,
    pub all_projects: bool,
}

impl FactRecord for DependencyRecord {
    fn header() -> &'static [&'static str] {
        &[
            "module",
            "configuration",
            "group_id",
            "artifact_id",
            "version",
            "all_projects",
        ]
    }

    fn columns(&self) -> Vec<String> {
        vec![
            self.module.clone(),
            self.configuration.clone(),
            self.group_id.clone(),
            self.artifact_id.clone(),
            self.version.clone().unwrap_or_else(|| "-".to_string()),
            self.all_projects.to_string(),
        ]
    }
}

/// Coordinates parsed from one declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coordinates {
    pub configuration: &'static str,
    pub group_id: String,
    pub artifact_id: String,
    pub version: Option<String>,
}

/// Parse a dependency declaration into the coordinates it declares.
///
/// Empty for statements that are not coordinate declarations with a known
/// configuration; `Err` for a known configuration with a string argument
/// that is not a coordinate.
pub fn parse_declaration(text: &str) -> Result<Vec<Coordinates>, String> {
    let compact: String = text.split_whitespace().collect();

    if let Some(list) = coordinate_list(&compact)? {
        return Ok(list);
    }

    let caps = SHORT_RE
        .captures(&compact)
        .or_else(|| MAP_RE.captures(&compact));

    let (configuration, group, artifact, version) = if let Some(caps) = caps {
        (
            caps[1].to_string(),
            caps[2].to_string(),
            caps[3].to_string(),
            caps.get(4).map(|m| m.as_str().to_string()),
        )
    } else if let Some(caps) = KOTLIN_RE.captures(&compact) {
        (
            caps[1].to_string(),
            "org.jetbrains.kotlin".to_string(),
            format!("kotlin-{}", &caps[2]),
            caps.get(3).map(|m| m.as_str().to_string()),
        )
    } else if let Some(caps) = SINGLE_STRING_RE.captures(&compact) {
        if configuration_key(&caps[1]).is_some() {
            return Err(format!("dependency {:?} has no group", &caps[2]));
        }
        return Ok(Vec::new());
    } else {
        return Ok(Vec::new());
    };

    let Some(configuration) = configuration_key(&configuration) else {
        return Ok(Vec::new());
    };
    Ok(vec![Coordinates {
        configuration,
        group_id: group,
        artifact_id: artifact,
        version,
    }])
}

/// Several quoted `group:artifact[:version]` strings in one declaration,
/// as in `implementation 'a:b:1', 'c:d:2'`.
///
/// `None` when the arguments are not such a list, which leaves positional
/// `'group', 'artifact', 'version'` arguments to the short notation.
fn coordinate_list(compact: &str) -> Result<Option<Vec<Coordinates>>, String> {
    let Some(caps) = ARGUMENTS_RE.captures(compact) else {
        return Ok(None);
    };
    let values: Vec<&str> = QUOTED_RE
        .captures_iter(&caps[2])
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect();
    if !values.iter().any(|v| v.contains(':')) {
        return Ok(None);
    }
    let Some(configuration) = configuration_key(&caps[1]) else {
        return Ok(Some(Vec::new()));
    };

    values
        .into_iter()
        .map(|value| {
            let mut parts = value.splitn(3, ':');
            let group = parts.next().unwrap_or_default();
            let artifact = parts.next().unwrap_or_default();
            if group.is_empty() || artifact.is_empty() {
                return Err(format!("dependency {:?} has no group", value));
            }
            Ok(Coordinates {
                configuration,
                group_id: group.to_string(),
                artifact_id: artifact.to_string(),
                version: parts.next().filter(|v| !v.is_empty()).map(str::to_string),
            })
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

fn configuration_key(name: &str) -> Option<&'static str> {
    CONFIGURATIONS.get(name.to_ascii_lowercase().as_str()).copied()
}

/// Reads declarations directly under a `dependencies` block, including
/// declarations that carry a configuration closure.
pub struct DependencyAnalyzer;

impl ElementAnalyzer<GradleBlockContext, Vec<DependencyRecord>> for DependencyAnalyzer {
    fn name(&self) -> &'static str {
        "gradle-dependency"
    }

    fn target_kinds(&self) -> &'static [&'static str] {
        &[script::STATEMENT, script::BLOCK]
    }

    fn analyze(
        &self,
        node: &SyntaxNode,
        unit: &SyntaxUnit,
        context: &GradleBlockContext,
    ) -> Result<Option<Vec<DependencyRecord>>, AnalyzerFailure> {
        if context.innermost() != Some(GradleBlock::Dependencies) {
            return Ok(None);
        }

        let text = if node.kind() == script::BLOCK {
            match node.child_of_kind(BLOCK_HEADER) {
                Some(header) => unit.text(header),
                None => return Ok(None),
            }
        } else {
            unit.text(node)
        };

        let coordinates = parse_declaration(text).map_err(|msg| self.failure(unit, node, msg))?;
        if coordinates.is_empty() {
            return Ok(None);
        }
        Ok(Some(
            coordinates
                .into_iter()
                .map(|c| DependencyRecord {
                    module: unit.module().to_string(),
                    configuration: c.configuration.to_string(),
                    group_id: c.group_id,
                    artifact_id: c.artifact_id,
                    version: c.version,
                    all_projects: context.all_projects(),
                })
                .collect(),
        ))
    }
}

/// Dependencies of every build script of a project.
pub struct GradleDependencies {
    analyzer: MainAnalyzer<GradleBlockContext, Vec<DependencyRecord>, Vec<DependencyRecord>>,
    records: SetAggregator<DependencyRecord>,
}

impl GradleDependencies {
    pub fn new() -> Self {
        let analyzer = MainAnalyzer::new(
            vec![Box::new(DependencyAnalyzer)
                as Box<dyn ElementAnalyzer<GradleBlockContext, Vec<DependencyRecord>>>],
            Arc::new(FlattenAggregator::<DependencyRecord>::new()),
        )
        .with_controller(GradleBlockController);
        Self {
            analyzer,
            records: SetAggregator::new(),
        }
    }
}

impl Default for GradleDependencies {
    fn default() -> Self {
        Self::new()
    }
}

impl Extraction for GradleDependencies {
    type Partial = DependencyRecord;
    type Record = DependencyRecord;

    fn name(&self) -> &'static str {
        ANALYSIS_NAME
    }

    fn scope(&self) -> UnitScope {
        UnitScope::Descriptors {
            names: BUILD_DESCRIPTORS,
            modules: true,
            required: true,
        }
    }

    fn default_format(&self) -> OutputFormat {
        OutputFormat::Csv
    }

    fn order(&self) -> ResultOrder {
        self.records.order()
    }

    fn collect(&self, unit: &SyntaxUnit) -> Collected<DependencyRecord> {
        match unit.language() {
            "kotlin" | "groovy" => self.analyzer.collect(unit).flat_map(|records| records),
            _ => Collected::default(),
        }
    }

    fn aggregate(
        &self,
        _project: &Project,
        partials: Vec<PartialResult<DependencyRecord>>,
    ) -> Vec<DependencyRecord> {
        self.records.aggregate(partials)
    }
}
