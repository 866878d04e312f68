//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use factmine::RunConfig;
use tempfile::TempDir;

/// Fixture corpus with an Android multi-module build, a Groovy library and
/// a directory that is not a project.
pub fn corpus() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("testdata").join("corpus")
}

pub fn expected(file: &str) -> String {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("testdata")
        .join("expected")
        .join(file);
    fs::read_to_string(&path).unwrap_or_else(|e| panic!("cannot read {}: {}", path.display(), e))
}

/// Run config writing into `out`, single-threaded so failures are easy to read.
pub fn config(out: &TempDir) -> RunConfig {
    RunConfig {
        output_dir: out.path().to_path_buf(),
        jobs: 1,
        ..RunConfig::default()
    }
}

pub fn artifact(out: &TempDir, file: &str) -> String {
    let path = out.path().join(file);
    fs::read_to_string(&path).unwrap_or_else(|e| panic!("cannot read {}: {}", path.display(), e))
}

/// Compare every artifact of `analysis` in `out` with its golden file.
pub fn assert_golden(out: &TempDir, analysis: &str, ext: &str) {
    for project in ["android-app", "groovy-lib"] {
        let file = format!("{}_{}.{}", project, analysis, ext);
        assert_eq!(artifact(out, &file), expected(&file), "artifact {} differs", file);
    }
    assert!(
        !out.path().join(format!("notes_{}.{}", analysis, ext)).exists(),
        "a directory without markers must not be a project"
    );
}

pub fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}
