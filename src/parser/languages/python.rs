//! Python front-end configuration.

use crate::parser::treesitter::{Config, TreeSitterFrontend};

/// File extensions handled by the Python front-end.
pub const EXTENSIONS: &[&str] = &["py"];

/// Create a new Python front-end.
pub fn new_frontend() -> TreeSitterFrontend {
    TreeSitterFrontend::new(Config {
        language: tree_sitter_python::LANGUAGE.into(),
        language_name: "python",
        extensions: EXTENSIONS,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{Frontend, SyntaxUnit};
    use std::path::Path;

    fn parse(source: &str) -> SyntaxUnit {
        let frontend = new_frontend();
        let root = frontend.parse(Path::new("main.py"), source).unwrap();
        SyntaxUnit::new("main.py", "main.py", ".", "python", source.to_string(), root)
    }

    #[test]
    fn test_python_import_fields() {
        let unit = parse("import os.path, numpy as np\nfrom collections import OrderedDict\n");

        let statement = unit
            .preorder()
            .find(|n| n.kind() == "import_statement")
            .expect("import statement");
        let names: Vec<_> = statement.children_by_field("name").map(|n| n.kind()).collect();
        assert_eq!(names, vec!["dotted_name", "aliased_import"]);

        let from = unit
            .preorder()
            .find(|n| n.kind() == "import_from_statement")
            .expect("from import");
        let module = from.child_by_field("module_name").expect("module name");
        assert_eq!(unit.text(module), "collections");
        assert_eq!(from.line(), 2);
    }

    #[test]
    fn test_python_relative_and_wildcard_nodes() {
        let unit = parse("from . import sibling\nfrom pkg import *\n");
        let kinds: Vec<_> = unit.preorder().map(|n| n.kind()).collect();
        assert!(kinds.contains(&"relative_import"));
        assert!(kinds.contains(&"wildcard_import"));
    }

    #[test]
    fn test_python_syntax_error_is_reported() {
        let frontend = new_frontend();
        let err = frontend
            .parse(Path::new("broken.py"), "def broken(:\n    pass\n")
            .unwrap_err();
        assert_eq!(err.line, Some(1));
    }
}
