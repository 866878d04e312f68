//! Tree-sitter front-end configurations.
//!
//! Each language module provides a factory for its front-end and the tests
//! that pin the node shapes the extractors rely on.

use once_cell::sync::OnceCell;

use super::treesitter::TreeSitterFrontend;
use super::Frontend;

pub mod java;
pub mod python;

/// Static storage for the Java front-end.
static JAVA_FRONTEND: OnceCell<TreeSitterFrontend> = OnceCell::new();

/// Static storage for the Python front-end.
static PYTHON_FRONTEND: OnceCell<TreeSitterFrontend> = OnceCell::new();

/// Register all tree-sitter front-ends.
pub fn register_all() {
    JAVA_FRONTEND.get_or_init(java::new_frontend);
    PYTHON_FRONTEND.get_or_init(python::new_frontend);
}

/// Get a tree-sitter front-end by file extension (without dot).
pub fn get(ext: &str) -> Option<&'static dyn Frontend> {
    if java::EXTENSIONS.contains(&ext) {
        return Some(JAVA_FRONTEND.get_or_init(java::new_frontend) as &dyn Frontend);
    }
    if python::EXTENSIONS.contains(&ext) {
        return Some(PYTHON_FRONTEND.get_or_init(python::new_frontend) as &dyn Frontend);
    }
    None
}

/// File extensions covered by tree-sitter front-ends.
pub fn extensions() -> impl Iterator<Item = &'static str> {
    java::EXTENSIONS
        .iter()
        .chain(python::EXTENSIONS.iter())
        .copied()
}
