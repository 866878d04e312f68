//! Gradle build facts.
//!
//! This module provides:
//! - Block context tracking for build scripts (`context`)
//! - Dependency declarations (`dependencies`)
//! - Declared and applied plugins (`plugins`)
//! - `gradle.properties` entries (`properties`)
//! - Module listing from settings scripts (`settings`)
//!
//! Kotlin DSL and Groovy DSL scripts share one set of analyzers; descriptors
//! are looked up in the order of the constants below, Kotlin DSL first.

pub mod context;
pub mod dependencies;
pub mod plugins;
pub mod properties;
pub mod settings;

pub use context::{GradleBlock, GradleBlockContext, GradleBlockController};
pub use dependencies::{DependencyRecord, GradleDependencies};
pub use plugins::{GradlePlugins, PluginRecord};
pub use properties::{GradleProperties, PropertyRecord};
pub use settings::GradleSettingsModules;

/// Build script names.
pub const BUILD_DESCRIPTORS: &[&str] = &["build.gradle.kts", "build.gradle"];

/// Settings script names.
pub const SETTINGS_DESCRIPTORS: &[&str] = &["settings.gradle.kts", "settings.gradle"];

pub const PROPERTIES_DESCRIPTORS: &[&str] = &["gradle.properties"];
