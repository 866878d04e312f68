//! Run configuration.
//!
//! A run is configured from an optional YAML file (`factmine.yaml`) with CLI
//! flags layered on top. Every field has a default, so an empty file is valid.
//!
//! ```yaml
//! output_dir: out
//! file_name: "{project}_{analysis}.{ext}"
//! format: csv
//! mode: batch
//! jobs: 8
//! timeout_secs: 300
//! excluded_paths:
//!   - "**/generated/**"
//! imports:
//!   languages: [kotlin, java, python]
//!   exclude_project_packages: true
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::extract::imports::ImportLanguage;
use crate::output::{ArtifactNaming, OutputFormat};

/// Default config file names to search for.
pub const DEFAULT_CONFIG_NAMES: &[&str] = &["factmine.yaml", ".factmine.yaml"];

/// Files whose presence marks a directory as a project root.
pub const DEFAULT_MARKERS: &[&str] = &[
    "build.gradle",
    "build.gradle.kts",
    "settings.gradle",
    "settings.gradle.kts",
    "pom.xml",
    "pyproject.toml",
    "setup.py",
    "requirements.txt",
];

/// How the corpus root is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Single project if the root carries a marker, otherwise batch.
    Auto,
    /// The corpus root is one project.
    Single,
    /// Every immediate child directory with a marker is a project.
    Batch,
}

impl FromStr for RunMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(RunMode::Auto),
            "single" => Ok(RunMode::Single),
            "batch" => Ok(RunMode::Batch),
            _ => Err(ConfigError::UnknownMode(s.to_string())),
        }
    }
}

/// Top-level run configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RunConfig {
    /// Directory receiving one artifact per project.
    pub output_dir: PathBuf,
    /// Artifact file name pattern; `{project}`, `{analysis}` and `{ext}` are
    /// substituted. Defaults to `{project}_{analysis}.{ext}`.
    pub file_name: Option<String>,
    /// Output format override: lines, csv, tsv or json.
    pub format: Option<String>,
    /// auto, single or batch.
    pub mode: String,
    /// Worker pool size for projects.
    pub jobs: usize,
    /// Per-project time limit.
    pub timeout_secs: Option<u64>,
    /// Parse and analyze the units of one project in parallel.
    pub parallel_units: bool,
    /// Project marker file names.
    pub markers: Vec<String>,
    /// Glob patterns for paths to exclude from unit discovery (e.g., "**/generated/**").
    pub excluded_paths: Vec<String>,
    /// Where to write the JSON run summary, if anywhere.
    pub summary_file: Option<PathBuf>,
    /// Let the tagging executor search for the buildable root below wrapper directories.
    pub resolve_root: bool,
    pub imports: ImportsConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("factmine-out"),
            file_name: None,
            format: None,
            mode: "auto".to_string(),
            jobs: default_jobs(),
            timeout_secs: None,
            parallel_units: false,
            markers: DEFAULT_MARKERS.iter().map(|m| m.to_string()).collect(),
            excluded_paths: Vec::new(),
            summary_file: None,
            resolve_root: false,
            imports: ImportsConfig::default(),
        }
    }
}

/// Configuration for import extraction.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ImportsConfig {
    /// Languages whose sources are scanned: kotlin, java, python.
    pub languages: Vec<String>,
    /// Drop imports of packages declared inside the project itself.
    pub exclude_project_packages: bool,
    /// Keep only the first occurrence of each import.
    pub distinct: bool,
}

impl Default for ImportsConfig {
    fn default() -> Self {
        Self {
            languages: vec!["kotlin".to_string(), "java".to_string()],
            exclude_project_packages: true,
            distinct: false,
        }
    }
}

fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

impl RunConfig {
    /// Parse a configuration from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse_str(&content).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse a configuration from YAML text. An empty document is the default config.
    pub fn parse_str(content: &str) -> Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    /// Look for a config file in `dir`.
    pub fn discover(dir: &Path) -> Option<PathBuf> {
        DEFAULT_CONFIG_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.is_file())
    }

    /// Check everything that can be checked before a run starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jobs == 0 {
            return Err(ConfigError::ZeroJobs);
        }
        self.run_mode()?;
        if let Some(format) = &self.format {
            format.parse::<OutputFormat>()?;
        }
        if let Some(pattern) = &self.file_name {
            ArtifactNaming::validate_pattern(pattern)?;
        }
        self.exclusion_set()?;
        self.import_languages()?;
        Ok(())
    }

    /// [`validate`](Self::validate) for runs where several extractions
    /// write into one output directory.
    pub fn validate_shared(&self) -> Result<(), ConfigError> {
        self.validate()?;
        if let Some(pattern) = &self.file_name {
            ArtifactNaming::validate_shared_pattern(pattern)?;
        }
        Ok(())
    }

    pub fn run_mode(&self) -> Result<RunMode, ConfigError> {
        self.mode.parse()
    }

    /// Output format, falling back to the extraction's default.
    pub fn output_format(&self, default: OutputFormat) -> Result<OutputFormat, ConfigError> {
        match &self.format {
            Some(format) => format.parse(),
            None => Ok(default),
        }
    }

    /// Compile `excluded_paths` into a glob set.
    pub fn exclusion_set(&self) -> Result<GlobSet, ConfigError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.excluded_paths {
            let glob = Glob::new(pattern).map_err(|source| ConfigError::InvalidGlob {
                pattern: pattern.clone(),
                source,
            })?;
            builder.add(glob);
        }
        builder.build().map_err(|source| ConfigError::InvalidGlob {
            pattern: self.excluded_paths.join(", "),
            source,
        })
    }

    pub fn import_languages(&self) -> Result<Vec<ImportLanguage>, ConfigError> {
        self.imports
            .languages
            .iter()
            .map(|language| language.parse())
            .collect()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::TempDir;

    #[test]
    fn test_empty_config_is_default() {
        let config = RunConfig::parse_str("").unwrap();
        assert_eq!(config.mode, "auto");
        assert!(config.jobs >= 1);
        assert_eq!(config.markers.len(), DEFAULT_MARKERS.len());
        assert!(config.imports.exclude_project_packages);
        config.validate().unwrap();
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = RunConfig::parse_str(
            r#"
output_dir: out
format: tsv
jobs: 2
imports:
  languages: [kotlin, python]
"#,
        )
        .unwrap();
        assert_eq!(config.output_dir, Path::new("out"));
        assert_eq!(config.jobs, 2);
        assert_eq!(config.output_format(OutputFormat::Csv).unwrap(), OutputFormat::Tsv);
        assert_eq!(
            config.import_languages().unwrap(),
            vec![ImportLanguage::Kotlin, ImportLanguage::Python]
        );
        assert!(config.imports.exclude_project_packages);
    }

    #[test]
    fn test_unknown_format_is_config_error() {
        let config = RunConfig {
            format: Some("xml".to_string()),
            ..RunConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::UnknownFormat(_))));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let zero_jobs = RunConfig {
            jobs: 0,
            ..RunConfig::default()
        };
        assert!(matches!(zero_jobs.validate(), Err(ConfigError::ZeroJobs)));

        let bad_mode = RunConfig {
            mode: "sometimes".to_string(),
            ..RunConfig::default()
        };
        assert!(matches!(bad_mode.validate(), Err(ConfigError::UnknownMode(_))));

        let bad_glob = RunConfig {
            excluded_paths: vec!["[unclosed".to_string()],
            ..RunConfig::default()
        };
        assert!(matches!(bad_glob.validate(), Err(ConfigError::InvalidGlob { .. })));

        let bad_name = RunConfig {
            file_name: Some("../escape.csv".to_string()),
            ..RunConfig::default()
        };
        assert!(matches!(bad_name.validate(), Err(ConfigError::InvalidFileName { .. })));
    }

    #[test]
    fn test_exclusion_set_matches() {
        let config = RunConfig {
            excluded_paths: vec!["**/generated/**".to_string()],
            ..RunConfig::default()
        };
        let set = config.exclusion_set().unwrap();
        assert!(set.is_match("app/generated/Foo.kt"));
        assert!(!set.is_match("app/src/Foo.kt"));
    }

    #[test]
    fn test_discover_and_parse_file() {
        let temp = TempDir::new().unwrap();
        assert!(RunConfig::discover(temp.path()).is_none());

        fs::write(temp.path().join("factmine.yaml"), "mode: batch\n").unwrap();
        let path = RunConfig::discover(temp.path()).unwrap();
        let config = RunConfig::parse_file(&path).unwrap();
        assert_eq!(config.run_mode().unwrap(), RunMode::Batch);
    }

    #[test]
    fn test_malformed_yaml_is_config_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("factmine.yaml");
        fs::write(&path, "jobs: [not, a, number]\n").unwrap();
        assert!(matches!(
            RunConfig::parse_file(&path),
            Err(ConfigError::Yaml { .. })
        ));
    }
}
