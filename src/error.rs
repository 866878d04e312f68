//! Error taxonomy for the extraction pipeline.
//!
//! Errors are scoped by how far they propagate:
//!
//! - [`ParseError`]: one unit could not be parsed. Tolerated units are skipped,
//!   mandatory units escalate to a [`ProjectError`].
//! - [`AnalyzerFailure`]: one node could not be interpreted. The partial is
//!   dropped and traversal continues.
//! - [`ProjectError`]: one project failed. Recorded in its outcome, the batch
//!   continues.
//! - [`OutputError`]: an artifact could not be written. Fails that project only.
//! - [`ConfigError`]: the run cannot start at all.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// A unit could not be turned into a syntax tree.
#[derive(Debug, Clone, Error)]
pub struct ParseError {
    /// Path of the offending file.
    pub path: PathBuf,
    /// 1-indexed line of the first problem, when known.
    pub line: Option<usize>,
    /// Diagnostic message from the front-end.
    pub message: String,
}

impl ParseError {
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            line: None,
            message: message.into(),
        }
    }

    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{}: {}", self.path.display(), line, self.message),
            None => write!(f, "{}: {}", self.path.display(), self.message),
        }
    }
}

/// An element analyzer could not interpret a structurally valid node.
#[derive(Debug, Clone, Error)]
#[error("{analyzer} at {path}:{line}: {message}")]
pub struct AnalyzerFailure {
    /// Name of the analyzer that gave up.
    pub analyzer: &'static str,
    /// Project-relative path of the unit.
    pub path: String,
    /// 1-indexed line of the node.
    pub line: usize,
    pub message: String,
}

/// A single project could not be analyzed.
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("project discovery failed for {path}: {reason}")]
    Discovery { path: PathBuf, reason: String },

    #[error("missing build descriptor under {root}: expected one of {expected}")]
    MissingDescriptor { root: PathBuf, expected: String },

    #[error("mandatory unit failed to parse: {0}")]
    Parse(#[from] ParseError),

    #[error("failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error(transparent)]
    Output(#[from] OutputError),

    #[error("analysis did not finish within {0:?}")]
    TimedOut(Duration),

    #[error("analysis panicked: {0}")]
    Panicked(String),

    #[error("cannot start analysis worker: {0}")]
    Worker(#[source] std::io::Error),
}

impl ProjectError {
    pub fn discovery(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        ProjectError::Discovery {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// An output artifact could not be persisted.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("cannot create output directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot serialize records for {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Invalid top-level invocation. Surfaced before any project runs.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("corpus root {0} does not exist")]
    CorpusRootMissing(PathBuf),

    #[error("corpus root {0} is not a directory")]
    CorpusRootNotDirectory(PathBuf),

    #[error("unknown output format {0:?}, must be one of: lines, csv, tsv, json")]
    UnknownFormat(String),

    #[error("unknown run mode {0:?}, must be one of: auto, single, batch")]
    UnknownMode(String),

    #[error("unknown language {0:?}, must be one of: kotlin, java, python")]
    UnknownLanguage(String),

    #[error("invalid output file name pattern {pattern:?}: {reason}")]
    InvalidFileName { pattern: String, reason: String },

    #[error("invalid glob pattern {pattern:?}: {source}")]
    InvalidGlob {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("jobs must be at least 1")]
    ZeroJobs,

    #[error("cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("cannot start worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}
