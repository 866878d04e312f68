//! Java front-end configuration.

use crate::parser::treesitter::{Config, TreeSitterFrontend};

/// File extensions handled by the Java front-end.
pub const EXTENSIONS: &[&str] = &["java"];

/// Create a new Java front-end.
pub fn new_frontend() -> TreeSitterFrontend {
    TreeSitterFrontend::new(Config {
        language: tree_sitter_java::LANGUAGE.into(),
        language_name: "java",
        extensions: EXTENSIONS,
    })
}
