//! Plugin declarations and applications.
//!
//! Recognized forms:
//! - inside `plugins { }`: `id("x")`, `id 'x'`, `kotlin("jvm")`,
//!   `alias(libs.plugins.x)`, `` `java-library` `` and bare ids such as
//!   `java`, each optionally followed by `version "v"` and `apply false`
//! - anywhere: `apply plugin: 'x'` and `apply(plugin = "x")`
//! - inside `apply { }`: `plugin("x")`

use std::collections::HashSet;
use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use super::context::{GradleBlock, GradleBlockContext, GradleBlockController};
use super::BUILD_DESCRIPTORS;
use crate::analysis::{
    Aggregator, Collected, ElementAnalyzer, MainAnalyzer, PartialResult, ResultOrder,
};
use crate::error::AnalyzerFailure;
use crate::extract::Extraction;
use crate::output::{FactRecord, OutputFormat};
use crate::parser::script;
use crate::parser::{SyntaxNode, SyntaxUnit};
use crate::project::{Project, UnitScope};

/// Analysis name of plugin extraction.
pub const ANALYSIS_NAME: &str = "gradle_plugins";

lazy_static! {
    static ref APPLY_PLUGIN_RE: Regex =
        Regex::new(r#"^apply\s*\(?\s*plugin\s*[:=]\s*['"]([^'"]+)['"]\s*\)?$"#).unwrap();
    static ref PLUGIN_CALL_RE: Regex =
        Regex::new(r#"^plugin\s*\(?\s*['"]([^'"]+)['"]\s*\)?$"#).unwrap();
    static ref DECLARATION_RE: Regex = Regex::new(
        r#"^(?:id\s*\(?\s*['"](?P<id>[^'"]+)['"]\s*\)?|kotlin\s*\(\s*['"](?P<kotlin>[^'"]+)['"]\s*\)|alias\s*\(\s*(?P<alias>[\w.\-]+)\s*\)|`(?P<tick>[^`]+)`|(?P<bare>[A-Za-z_][\w\-]*(?:\.[A-Za-z_][\w\-]*)*))(?P<rest>.*)$"#
    )
    .unwrap();
    static ref VERSION_RE: Regex = Regex::new(
        r#"(?:^|\s|\.)version\s*\(?\s*(?:['"](?P<quoted>[^'"]*)['"]|(?P<expr>[\w.$]+))\s*\)?"#
    )
    .unwrap();
    static ref APPLY_FLAG_RE: Regex =
        Regex::new(r#"(?:^|\s|\.)apply\s*\(?\s*(?P<flag>true|false)\s*\)?"#).unwrap();
}

/// One declared or applied plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginRecord {
    pub module: String,
    pub plugin_id: String,
    pub version: Option<String>,
    pub args: Vec<String>,
    pub applied: bool,
    pub all_projects: bool,
}

impl FactRecord for PluginRecord {
    fn header() -> &'static [&'static str] {
        &["module", "plugin_id", "version", "args", "applied", "all_projects"]
    }

    fn columns(&self) -> Vec<String> {
        vec![
            self.module.clone(),
            self.plugin_id.clone(),
            self.version.clone().unwrap_or_default(),
            self.args.join("#"),
            self.applied.to_string(),
            self.all_projects.to_string(),
        ]
    }
}

/// A plugin reference before module and context are attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginRef {
    pub id: String,
    pub version: Option<String>,
    pub args: Vec<String>,
    pub applied: bool,
}

impl PluginRef {
    fn applied(id: &str) -> Self {
        Self {
            id: id.to_string(),
            version: None,
            args: Vec::new(),
            applied: true,
        }
    }
}

/// `apply plugin: 'x'` / `apply(plugin = "x")`.
pub fn parse_apply(text: &str) -> Option<PluginRef> {
    APPLY_PLUGIN_RE
        .captures(text.trim())
        .map(|caps| PluginRef::applied(&caps[1]))
}

/// One statement of a `plugins { }` block.
pub fn parse_plugins_entry(text: &str) -> Result<PluginRef, String> {
    let text = text.trim();
    if let Some(applied) = parse_apply(text) {
        return Ok(applied);
    }

    let caps = DECLARATION_RE
        .captures(text)
        .ok_or_else(|| format!("unrecognized plugin declaration {:?}", text))?;

    let (id, args) = if let Some(id) = caps.name("id") {
        (id.as_str().to_string(), Vec::new())
    } else if let Some(arg) = caps.name("kotlin") {
        ("kotlin".to_string(), vec![arg.as_str().to_string()])
    } else if let Some(alias) = caps.name("alias") {
        (alias.as_str().to_string(), Vec::new())
    } else if let Some(id) = caps.name("tick") {
        (id.as_str().to_string(), Vec::new())
    } else {
        let bare = caps.name("bare").map(|m| m.as_str()).unwrap_or_default();
        if bare == "id" {
            return Err(format!("plugin id is not a literal in {:?}", text));
        }
        (bare.to_string(), Vec::new())
    };

    let rest = caps.name("rest").map(|m| m.as_str()).unwrap_or_default();
    let version = VERSION_RE.captures(rest).and_then(|v| {
        v.name("quoted")
            .or_else(|| v.name("expr"))
            .map(|m| m.as_str().to_string())
    });
    let applied = APPLY_FLAG_RE
        .captures(rest)
        .map_or(true, |a| &a["flag"] == "true");

    let leftover = APPLY_FLAG_RE.replace(&VERSION_RE.replace(rest, ""), "").into_owned();
    if !leftover.trim().is_empty() {
        return Err(format!("unexpected {:?} after plugin {}", leftover.trim(), id));
    }

    Ok(PluginRef {
        id,
        version,
        args,
        applied,
    })
}

/// Reads plugin statements according to the enclosing block.
pub struct PluginAnalyzer;

impl ElementAnalyzer<GradleBlockContext, PluginRecord> for PluginAnalyzer {
    fn name(&self) -> &'static str {
        "gradle-plugin"
    }

    fn target_kinds(&self) -> &'static [&'static str] {
        &[script::STATEMENT]
    }

    fn analyze(
        &self,
        node: &SyntaxNode,
        unit: &SyntaxUnit,
        context: &GradleBlockContext,
    ) -> Result<Option<PluginRecord>, AnalyzerFailure> {
        let text = unit.text(node).trim();

        let plugin = match context.current() {
            Some(GradleBlock::Plugins) => {
                Some(parse_plugins_entry(text).map_err(|msg| self.failure(unit, node, msg))?)
            }
            Some(GradleBlock::Apply) => PLUGIN_CALL_RE
                .captures(text)
                .map(|caps| PluginRef::applied(&caps[1])),
            _ => parse_apply(text),
        };

        Ok(plugin.map(|p| PluginRecord {
            module: unit.module().to_string(),
            plugin_id: p.id,
            version: p.version,
            args: p.args,
            applied: p.applied,
            all_projects: context.all_projects(),
        }))
    }
}

/// Keeps the first occurrence of each `(module, plugin_id)` pair, marking it
/// `all_projects` when any occurrence was.
pub struct PluginsAggregator;

impl Aggregator<PluginRecord, Vec<PluginRecord>> for PluginsAggregator {
    fn order(&self) -> ResultOrder {
        ResultOrder::SourceOrder
    }

    fn aggregate(&self, partials: Vec<PartialResult<PluginRecord>>) -> Vec<PluginRecord> {
        let everywhere: HashSet<(String, String)> = partials
            .iter()
            .filter(|p| p.value.all_projects)
            .map(|p| (p.value.module.clone(), p.value.plugin_id.clone()))
            .collect();

        let mut seen = HashSet::new();
        partials
            .into_iter()
            .map(|p| p.value)
            .filter(|r| seen.insert((r.module.clone(), r.plugin_id.clone())))
            .map(|mut r| {
                r.all_projects = everywhere.contains(&(r.module.clone(), r.plugin_id.clone()));
                r
            })
            .collect()
    }
}

/// Plugins of every build script of a project.
pub struct GradlePlugins {
    analyzer: MainAnalyzer<GradleBlockContext, PluginRecord, Vec<PluginRecord>>,
}

impl GradlePlugins {
    pub fn new() -> Self {
        let analyzer = MainAnalyzer::new(
            vec![Box::new(PluginAnalyzer)
                as Box<dyn ElementAnalyzer<GradleBlockContext, PluginRecord>>],
            Arc::new(PluginsAggregator),
        )
        .with_controller(GradleBlockController);
        Self { analyzer }
    }
}

impl Default for GradlePlugins {
    fn default() -> Self {
        Self::new()
    }
}

impl Extraction for GradlePlugins {
    type Partial = PluginRecord;
    type Record = PluginRecord;

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
        self.analyzer.aggregator().order()
    }

    fn collect(&self, unit: &SyntaxUnit) -> Collected<PluginRecord> {
        match unit.language() {
            "kotlin" | "groovy" => self.analyzer.collect(unit),
            _ => Collected::default(),
        }
    }

    fn aggregate(
        &self,
        _project: &Project,
        partials: Vec<PartialResult<PluginRecord>>,
    ) -> Vec<PluginRecord> {
        self.analyzer.aggregator().aggregate(partials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_source;
    use std::path::Path;

    fn plugins(name: &str, source: &str) -> (Vec<PluginRecord>, usize) {
        let extraction = GradlePlugins::new();
        let unit = parse_source(Path::new(name), source.to_string()).unwrap();
        let collected = extraction.collect(&unit);
        let failures = collected.failures.len();
        (
            extraction.aggregate(&Project::new("demo", "."), collected.partials),
            failures,
        )
    }

    #[test]
    fn test_plugins_block_forms() {
        let entry = parse_plugins_entry(r#"id("org.springframework.boot") version "3.2.0""#).unwrap();
        assert_eq!(entry.id, "org.springframework.boot");
        assert_eq!(entry.version.as_deref(), Some("3.2.0"));
        assert!(entry.applied);

        let entry = parse_plugins_entry("id 'com.android.application' version '8.1.0' apply false").unwrap();
        assert_eq!(entry.id, "com.android.application");
        assert_eq!(entry.version.as_deref(), Some("8.1.0"));
        assert!(!entry.applied);

        let entry = parse_plugins_entry(r#"kotlin("plugin.serialization") version kotlinVersion"#).unwrap();
        assert_eq!(entry.id, "kotlin");
        assert_eq!(entry.args, vec!["plugin.serialization"]);
        assert_eq!(entry.version.as_deref(), Some("kotlinVersion"));

        assert_eq!(parse_plugins_entry("alias(libs.plugins.android.library)").unwrap().id, "libs.plugins.android.library");
        assert_eq!(parse_plugins_entry("`java-library`").unwrap().id, "java-library");
        assert_eq!(parse_plugins_entry("idea").unwrap().id, "idea");
        assert_eq!(parse_plugins_entry("apply(plugin = \"maven-publish\")").unwrap().id, "maven-publish");
    }

    #[test]
    fn test_unrecognized_entries_fail() {
        assert!(parse_plugins_entry("id(libs.plugins.detekt.get().pluginId)").is_err());
        assert!(parse_plugins_entry("java version").is_err());
    }

    #[test]
    fn test_build_script_plugins() {
        let (records, failures) = plugins(
            "build.gradle.kts",
            r#"plugins {
    kotlin("jvm") version "1.9.0"
    id("org.jetbrains.dokka") version "1.9.10" apply false
    `maven-publish`
    id(libs.plugins.detekt.get().pluginId)
}

allprojects {
    apply(plugin = "org.jetbrains.dokka")
}

apply {
    plugin("jacoco")
}
"#,
        );
        assert_eq!(failures, 1);

        let summary: Vec<_> = records
            .iter()
            .map(|r| (r.plugin_id.as_str(), r.applied, r.all_projects))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("kotlin", true, false),
                ("org.jetbrains.dokka", false, true),
                ("maven-publish", true, false),
                ("jacoco", true, false),
            ]
        );
        assert_eq!(
            records[0].columns(),
            vec![".", "kotlin", "1.9.0", "jvm", "true", "false"]
        );
    }

    #[test]
    fn test_groovy_apply_plugin() {
        let (records, failures) = plugins(
            "build.gradle",
            "apply plugin: 'com.android.application'\napply plugin: \"kotlin-android\"\nandroid {\n    compileSdk 34\n}\n",
        );
        assert_eq!(failures, 0);
        let ids: Vec<_> = records.iter().map(|r| r.plugin_id.as_str()).collect();
        assert_eq!(ids, vec!["com.android.application", "kotlin-android"]);
        assert_eq!(records[0].columns()[2], "");
    }

    #[test]
    fn test_statements_outside_blocks_are_ignored() {
        let (records, failures) = plugins("build.gradle.kts", "group = \"com.example\"\nversion = \"1.0\"\n");
        assert!(records.is_empty());
        assert_eq!(failures, 0);
    }
}
