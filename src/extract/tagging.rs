//! Project classification.
//!
//! Taggers are predicates over the dependency and plugin facts of a project's
//! root build script. Every matching tagger contributes its tag; a project no
//! tagger matches is [`ProjectTag::Other`].

use std::collections::BTreeSet;

use phf::phf_set;
use serde::Serialize;

use super::gradle::{
    DependencyRecord, GradleDependencies, GradlePlugins, PluginRecord, BUILD_DESCRIPTORS,
};
use super::Extraction;
use crate::analysis::{Collected, PartialResult, ResultOrder};
use crate::output::{FactRecord, OutputFormat};
use crate::parser::SyntaxUnit;
use crate::project::{Project, ProjectTag, UnitScope};

/// Analysis name of project tagging.
pub const ANALYSIS_NAME: &str = "project_tags";

static ANDROID_PLUGINS: phf::Set<&'static str> = phf_set! {
    "com.android.application",
    "com.android.library",
    "com.android.test",
    "com.android.dynamic-feature",
    "android",
    "android-library",
    "kotlin-android",
};

/// A root build script fact a tagger can inspect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagFact {
    Dependency(DependencyRecord),
    Plugin(PluginRecord),
}

/// Predicate assigning one tag.
pub trait ProjectTagger: Send + Sync {
    fn tag(&self) -> ProjectTag;

    fn matches(&self, facts: &[TagFact]) -> bool;
}

/// Android Gradle plugin on the build classpath or among the plugins.
pub struct AndroidProjectTagger;

impl AndroidProjectTagger {
    fn is_android_plugin(id: &str) -> bool {
        ANDROID_PLUGINS.contains(id)
            || id.starts_with("com.android.")
            || id.ends_with("android.application")
            || id.ends_with("android.library")
    }
}

impl ProjectTagger for AndroidProjectTagger {
    fn tag(&self) -> ProjectTag {
        ProjectTag::Android
    }

    fn matches(&self, facts: &[TagFact]) -> bool {
        facts.iter().any(|fact| match fact {
            TagFact::Dependency(dep) => dep.group_id.contains("com.android.tools.build"),
            TagFact::Plugin(plugin) => Self::is_android_plugin(&plugin.plugin_id),
        })
    }
}

/// Tags of one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectTagsRecord {
    pub tags: Vec<ProjectTag>,
}

impl FactRecord for ProjectTagsRecord {
    fn header() -> &'static [&'static str] {
        &["tags"]
    }

    fn columns(&self) -> Vec<String> {
        let tags: Vec<&str> = self.tags.iter().map(ProjectTag::as_str).collect();
        vec![tags.join(",")]
    }
}

/// Classifies a project from its root build script.
pub struct ProjectTagging {
    dependencies: GradleDependencies,
    plugins: GradlePlugins,
    taggers: Vec<Box<dyn ProjectTagger>>,
}

impl ProjectTagging {
    /// Tagging with the built-in taggers.
    pub fn new() -> Self {
        Self::with_taggers(vec![Box::new(AndroidProjectTagger)])
    }

    pub fn with_taggers(taggers: Vec<Box<dyn ProjectTagger>>) -> Self {
        Self {
            dependencies: GradleDependencies::new(),
            plugins: GradlePlugins::new(),
            taggers,
        }
    }

    /// Tags matching `facts`, sorted; `[Other]` when none match.
    pub fn classify(&self, facts: &[TagFact]) -> Vec<ProjectTag> {
        let tags: BTreeSet<ProjectTag> = self
            .taggers
            .iter()
            .filter(|tagger| tagger.matches(facts))
            .map(|tagger| tagger.tag())
            .collect();
        if tags.is_empty() {
            vec![ProjectTag::Other]
        } else {
            tags.into_iter().collect()
        }
    }
}

impl Default for ProjectTagging {
    fn default() -> Self {
        Self::new()
    }
}

impl Extraction for ProjectTagging {
    type Partial = TagFact;
    type Record = ProjectTagsRecord;

    fn name(&self) -> &'static str {
        ANALYSIS_NAME
    }

    fn scope(&self) -> UnitScope {
        UnitScope::Descriptors {
            names: BUILD_DESCRIPTORS,
            modules: false,
            required: false,
        }
    }

    fn default_format(&self) -> OutputFormat {
        OutputFormat::Lines
    }

    fn order(&self) -> ResultOrder {
        ResultOrder::Unordered
    }

    fn collect(&self, unit: &SyntaxUnit) -> Collected<TagFact> {
        let mut facts = self.dependencies.collect(unit).map(TagFact::Dependency);
        facts.extend(self.plugins.collect(unit).map(TagFact::Plugin));
        facts
    }

    fn aggregate(&self, _project: &Project, partials: Vec<PartialResult<TagFact>>) -> Vec<ProjectTagsRecord> {
        let facts: Vec<TagFact> = partials.into_iter().map(|p| p.value).collect();
        vec![ProjectTagsRecord {
            tags: self.classify(&facts),
        }]
    }
}
