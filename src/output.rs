//! Per-project output artifacts.
//!
//! Supports four formats:
//! - Lines: one fact per line, multi-column facts comma-joined, no header
//! - CSV: header plus RFC 4180 rows
//! - TSV: header plus tab-separated rows
//! - JSON: pretty-printed array of records
//!
//! Rendering is a pure function of the records, so re-running a project
//! reproduces its artifact byte for byte.

use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

use serde::Serialize;

use crate::error::{ConfigError, OutputError};

/// Default artifact file name pattern.
pub const DEFAULT_FILE_NAME: &str = "{project}_{analysis}.{ext}";

const PLACEHOLDERS: &[&str] = &["project", "analysis", "ext"];

/// A persisted fact with a stable column layout.
pub trait FactRecord: Serialize {
    /// Column names, in output order.
    fn header() -> &'static [&'static str]
    where
        Self: Sized;

    /// Column values, in the same order as [`FactRecord::header`].
    fn columns(&self) -> Vec<String>;
}

/// Artifact serialization format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Lines,
    Csv,
    Tsv,
    Json,
}

impl OutputFormat {
    /// File extension used for `{ext}`.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Lines => "txt",
            OutputFormat::Csv => "csv",
            OutputFormat::Tsv => "tsv",
            OutputFormat::Json => "json",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lines" | "txt" => Ok(OutputFormat::Lines),
            "csv" => Ok(OutputFormat::Csv),
            "tsv" => Ok(OutputFormat::Tsv),
            "json" => Ok(OutputFormat::Json),
            _ => Err(ConfigError::UnknownFormat(s.to_string())),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Lines => "lines",
            OutputFormat::Csv => "csv",
            OutputFormat::Tsv => "tsv",
            OutputFormat::Json => "json",
        };
        f.write_str(name)
    }
}

/// Maps a project name to its artifact path.
#[derive(Debug, Clone)]
pub struct ArtifactNaming {
    dir: PathBuf,
    pattern: String,
    analysis: &'static str,
    format: OutputFormat,
}

impl ArtifactNaming {
    pub fn new(
        dir: impl Into<PathBuf>,
        pattern: Option<&str>,
        analysis: &'static str,
        format: OutputFormat,
    ) -> Result<Self, ConfigError> {
        let pattern = pattern.unwrap_or(DEFAULT_FILE_NAME);
        Self::validate_pattern(pattern)?;
        Ok(Self {
            dir: dir.into(),
            pattern: pattern.to_string(),
            analysis,
            format,
        })
    }

    /// Reject patterns that are empty, absolute, climb out of the output
    /// directory, or use unknown placeholders.
    pub fn validate_pattern(pattern: &str) -> Result<(), ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidFileName {
            pattern: pattern.to_string(),
            reason: reason.to_string(),
        };

        if pattern.trim().is_empty() {
            return Err(invalid("pattern is empty"));
        }
        let path = Path::new(pattern);
        if path.is_absolute() || pattern.starts_with('/') {
            return Err(invalid("pattern must be relative to the output directory"));
        }
        if path
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)))
        {
            return Err(invalid("pattern must not leave the output directory"));
        }

        let mut rest = pattern;
        while let Some(open) = rest.find('{') {
            let after = &rest[open + 1..];
            let Some(close) = after.find('}') else {
                return Err(invalid("unclosed '{'"));
            };
            let name = &after[..close];
            if !PLACEHOLDERS.contains(&name) {
                return Err(invalid(&format!("unknown placeholder {{{}}}", name)));
            }
            rest = &after[close + 1..];
        }
        Ok(())
    }

    /// Patterns shared by several extractions in one output directory must
    /// keep the analysis name apart.
    pub fn validate_shared_pattern(pattern: &str) -> Result<(), ConfigError> {
        Self::validate_pattern(pattern)?;
        if !pattern.contains("{analysis}") {
            return Err(ConfigError::InvalidFileName {
                pattern: pattern.to_string(),
                reason: "pattern needs {analysis} when several extractions run".to_string(),
            });
        }
        Ok(())
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Artifact path for `project`.
    ///
    /// A pattern without `{project}` is placed in a per-project directory so
    /// sibling projects never share a file.
    pub fn path_for(&self, project: &str) -> PathBuf {
        let name = self
            .pattern
            .replace("{project}", project)
            .replace("{analysis}", self.analysis)
            .replace("{ext}", self.format.extension());

        if self.pattern.contains("{project}") {
            self.dir.join(name)
        } else {
            self.dir.join(project).join(name)
        }
    }
}

/// Writes one artifact per project.
#[derive(Debug, Clone)]
pub struct OutputWriter {
    naming: ArtifactNaming,
}

impl OutputWriter {
    pub fn new(naming: ArtifactNaming) -> Self {
        Self { naming }
    }

    pub fn naming(&self) -> &ArtifactNaming {
        &self.naming
    }

    /// Render `records` and write them to the artifact of `project`,
    /// replacing any previous artifact.
    pub fn write<R: FactRecord>(&self, project: &str, records: &[R]) -> Result<PathBuf, OutputError> {
        let path = self.naming.path_for(project);
        write_records(&path, records, self.naming.format)?;
        Ok(path)
    }
}

/// Render records in `format`.
pub fn render_records<R: FactRecord>(
    records: &[R],
    format: OutputFormat,
) -> Result<String, serde_json::Error> {
    let mut out = String::new();
    match format {
        OutputFormat::Lines => {
            for record in records {
                out.push_str(&record.columns().join(","));
                out.push('\n');
            }
        }
        OutputFormat::Csv => {
            push_row(&mut out, R::header().iter().map(|h| h.to_string()), ',', csv_field);
            for record in records {
                push_row(&mut out, record.columns().into_iter(), ',', csv_field);
            }
        }
        OutputFormat::Tsv => {
            push_row(&mut out, R::header().iter().map(|h| h.to_string()), '\t', tsv_field);
            for record in records {
                push_row(&mut out, record.columns().into_iter(), '\t', tsv_field);
            }
        }
        OutputFormat::Json => {
            out = serde_json::to_string_pretty(records)?;
            out.push('\n');
        }
    }
    Ok(out)
}

/// Render and write records to `path`, creating parent directories.
pub fn write_records<R: FactRecord>(
    path: &Path,
    records: &[R],
    format: OutputFormat,
) -> Result<(), OutputError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| OutputError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let content = render_records(records, format).map_err(|source| OutputError::Serialize {
        path: path.to_path_buf(),
        source,
    })?;

    fs::write(path, content).map_err(|source| OutputError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn push_row(
    out: &mut String,
    fields: impl Iterator<Item = String>,
    separator: char,
    escape: fn(&str) -> String,
) {
    for (i, field) in fields.enumerate() {
        if i > 0 {
            out.push(separator);
        }
        out.push_str(&escape(&field));
    }
    out.push('\n');
}

/// RFC 4180: quote fields containing separators, quotes or line breaks.
fn csv_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn tsv_field(field: &str) -> String {
    field
        .replace('\\', "\\\\")
        .replace('\t', "\\t")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
}
