//! Language front-ends that turn analysis units into syntax trees.
//!
//! This module provides:
//! - `SyntaxNode` / `SyntaxUnit`: an owned, read-only tree shared by every front-end
//! - `Frontend` trait: abstract interface for language front-ends
//! - A registry that maps file extensions to front-ends
//!
//! Kotlin sources and Gradle scripts go through the structural script front-end
//! in [`script`]; `.properties` files through [`properties`]; Java and Python
//! through tree-sitter when the `tree-sitter` feature is enabled.

use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use once_cell::sync::OnceCell;

use crate::error::ParseError;
use crate::project::AnalysisUnit;

pub mod properties;
pub mod script;

#[cfg(feature = "tree-sitter")]
pub mod treesitter;

#[cfg(feature = "tree-sitter")]
pub mod languages;

use properties::PropertiesFrontend;
use script::{Dialect, ScriptFrontend};

/// One node of a parsed unit.
///
/// Nodes own their children and reference the unit source by byte range, so a
/// tree can outlive the parser that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxNode {
    kind: &'static str,
    field: Option<&'static str>,
    start: usize,
    end: usize,
    line: usize,
    children: Vec<SyntaxNode>,
}

impl SyntaxNode {
    /// Create a node spanning `start..end` that begins on 1-indexed `line`.
    pub fn new(kind: &'static str, start: usize, end: usize, line: usize) -> Self {
        Self {
            kind,
            field: None,
            start,
            end,
            line,
            children: Vec::new(),
        }
    }

    /// Attach the grammar field name this node occupies in its parent.
    pub fn with_field(mut self, field: Option<&'static str>) -> Self {
        self.field = field;
        self
    }

    pub fn push(&mut self, child: SyntaxNode) {
        self.children.push(child);
    }

    /// Node kind, e.g. `import_directive` or `import_from_statement`.
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Field name in the parent, if the grammar assigns one.
    pub fn field(&self) -> Option<&'static str> {
        self.field
    }

    pub fn byte_range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// 1-indexed line where the node starts.
    pub fn line(&self) -> usize {
        self.line
    }

    pub fn children(&self) -> &[SyntaxNode] {
        &self.children
    }

    /// First child occupying the given field.
    pub fn child_by_field(&self, field: &str) -> Option<&SyntaxNode> {
        self.children.iter().find(|c| c.field == Some(field))
    }

    /// All children occupying the given field, in source order.
    pub fn children_by_field<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a SyntaxNode> {
        self.children.iter().filter(move |c| c.field == Some(field))
    }

    /// First child of the given kind.
    pub fn child_of_kind(&self, kind: &str) -> Option<&SyntaxNode> {
        self.children.iter().find(|c| c.kind == kind)
    }
}

/// A parsed analysis unit: the source text plus its syntax tree.
///
/// Units are immutable; analyzers only ever see `&SyntaxUnit`.
#[derive(Debug, Clone)]
pub struct SyntaxUnit {
    path: PathBuf,
    relative_path: String,
    module: String,
    language: &'static str,
    source: String,
    root: SyntaxNode,
}

impl SyntaxUnit {
    pub fn new(
        path: impl Into<PathBuf>,
        relative_path: impl Into<String>,
        module: impl Into<String>,
        language: &'static str,
        source: String,
        root: SyntaxNode,
    ) -> Self {
        Self {
            path: path.into(),
            relative_path: relative_path.into(),
            module: module.into(),
            language,
            source,
            root,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Project-relative path with `/` separators.
    pub fn relative_path(&self) -> &str {
        &self.relative_path
    }

    /// Module the unit belongs to (`.` for the project root).
    pub fn module(&self) -> &str {
        &self.module
    }

    /// Language of the front-end that produced the tree.
    pub fn language(&self) -> &'static str {
        self.language
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn root(&self) -> &SyntaxNode {
        &self.root
    }

    /// Source text covered by a node.
    pub fn text(&self, node: &SyntaxNode) -> &str {
        self.source.get(node.byte_range()).unwrap_or("")
    }

    /// Iterate every node in preorder (parents before children, source order).
    pub fn preorder(&self) -> Preorder<'_> {
        Preorder {
            stack: vec![&self.root],
        }
    }
}

/// Preorder iterator over a syntax tree.
pub struct Preorder<'a> {
    stack: Vec<&'a SyntaxNode>,
}

impl<'a> Iterator for Preorder<'a> {
    type Item = &'a SyntaxNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

/// Whether a front-end may be used from several threads at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontendConcurrency {
    /// Parsing holds no shared state; units may be parsed in parallel.
    Shared,
    /// Parsing must be serialized per front-end instance.
    Serialized,
}

/// A language front-end.
///
/// # Thread Safety
///
/// tree_sitter::Parser is not Sync, so front-ends create parsers per call and
/// report [`FrontendConcurrency::Shared`]. A front-end wrapping stateful parser
/// machinery must report `Serialized` so the executor never parses two units
/// of one project through it concurrently.
pub trait Frontend: Send + Sync {
    /// Language identifier, e.g. "kotlin", "groovy", "java".
    fn language(&self) -> &'static str;

    /// File extensions this front-end handles (without dot).
    fn extensions(&self) -> &'static [&'static str];

    /// Parse source text into a syntax tree rooted at a single node.
    ///
    /// Returns an error when the source is not well-formed for the language.
    fn parse(&self, path: &Path, source: &str) -> Result<SyntaxNode, ParseError>;

    /// Decode the raw bytes of a unit. Sources must be UTF-8.
    fn decode(&self, path: &Path, bytes: Vec<u8>) -> Result<String, ParseError> {
        String::from_utf8(bytes).map_err(|_| ParseError::new(path, "source is not valid UTF-8"))
    }

    /// Concurrency contract of this front-end.
    fn concurrency(&self) -> FrontendConcurrency {
        FrontendConcurrency::Shared
    }
}

static KOTLIN_FRONTEND: OnceCell<ScriptFrontend> = OnceCell::new();
static GROOVY_FRONTEND: OnceCell<ScriptFrontend> = OnceCell::new();
static PROPERTIES_FRONTEND: OnceCell<PropertiesFrontend> = OnceCell::new();

/// Whether front-ends have been registered.
static REGISTERED: AtomicBool = AtomicBool::new(false);

/// Register all available front-ends.
///
/// Idempotent; lookups also initialize lazily, so this only front-loads the work.
pub fn init() {
    if REGISTERED.swap(true, Ordering::SeqCst) {
        return;
    }

    KOTLIN_FRONTEND.get_or_init(|| ScriptFrontend::new(Dialect::Kotlin));
    GROOVY_FRONTEND.get_or_init(|| ScriptFrontend::new(Dialect::Groovy));
    PROPERTIES_FRONTEND.get_or_init(PropertiesFrontend::new);

    #[cfg(feature = "tree-sitter")]
    languages::register_all();
}

/// Get the front-end for a file extension (without dot).
pub fn get_frontend(ext: &str) -> Option<&'static dyn Frontend> {
    match ext {
        "kt" | "kts" => {
            Some(KOTLIN_FRONTEND.get_or_init(|| ScriptFrontend::new(Dialect::Kotlin)) as &dyn Frontend)
        }
        "gradle" => {
            Some(GROOVY_FRONTEND.get_or_init(|| ScriptFrontend::new(Dialect::Groovy)) as &dyn Frontend)
        }
        "properties" => Some(PROPERTIES_FRONTEND.get_or_init(PropertiesFrontend::new) as &dyn Frontend),
        #[cfg(feature = "tree-sitter")]
        other => languages::get(other),
        #[cfg(not(feature = "tree-sitter"))]
        _ => None,
    }
}

/// Get the front-end responsible for a path, by its extension.
pub fn frontend_for_path(path: &Path) -> Option<&'static dyn Frontend> {
    let ext = path.extension().and_then(|e| e.to_str())?;
    get_frontend(ext)
}

/// Return all file extensions with a front-end.
pub fn supported_extensions() -> Vec<&'static str> {
    let mut exts = vec!["gradle", "kt", "kts", "properties"];
    #[cfg(feature = "tree-sitter")]
    exts.extend(languages::extensions());
    exts.sort_unstable();
    exts
}

/// Read and parse an analysis unit.
pub fn parse_unit(unit: &AnalysisUnit) -> Result<SyntaxUnit, ParseError> {
    let path = unit.path();
    let frontend = frontend_for_path(path)
        .ok_or_else(|| ParseError::new(path, "no front-end registered for this file type"))?;
    let bytes = fs::read(path).map_err(|e| ParseError::new(path, format!("cannot read file: {}", e)))?;
    let source = frontend.decode(path, bytes)?;

    let mut unit_source = parse_source(path, source)?;
    unit_source.relative_path = unit.relative_path().to_string();
    unit_source.module = unit.module().to_string();
    Ok(unit_source)
}

/// Parse in-memory source as if it were the file at `path`.
///
/// The relative path defaults to the file name and the module to the project root.
pub fn parse_source(path: &Path, source: String) -> Result<SyntaxUnit, ParseError> {
    let frontend = frontend_for_path(path)
        .ok_or_else(|| ParseError::new(path, "no front-end registered for this file type"))?;

    let source = match source.strip_prefix('\u{feff}') {
        Some(stripped) => stripped.to_string(),
        None => source,
    };
    let root = frontend.parse(path, &source)?;
    let relative = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok(SyntaxUnit::new(path, relative, ".", frontend.language(), source, root))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> SyntaxNode {
        let mut root = SyntaxNode::new("root", 0, 9, 1);
        let mut a = SyntaxNode::new("a", 0, 3, 1).with_field(Some("left"));
        a.push(SyntaxNode::new("a1", 0, 1, 1));
        root.push(a);
        root.push(SyntaxNode::new("b", 4, 9, 2).with_field(Some("right")));
        root
    }

    #[test]
    fn test_preorder_visits_parents_first() {
        let unit = SyntaxUnit::new("x", "x", ".", "test", "abc\nhello".to_string(), sample_tree());
        let kinds: Vec<_> = unit.preorder().map(|n| n.kind()).collect();
        assert_eq!(kinds, vec!["root", "a", "a1", "b"]);
    }

    #[test]
    fn test_node_text_and_fields() {
        let unit = SyntaxUnit::new("x", "x", ".", "test", "abc\nhello".to_string(), sample_tree());
        let right = unit.root().child_by_field("right").unwrap();
        assert_eq!(unit.text(right), "hello");
        assert_eq!(right.line(), 2);
        assert!(unit.root().child_by_field("missing").is_none());
    }

    #[test]
    fn test_frontend_lookup_by_extension() {
        init();
        assert_eq!(get_frontend("kt").unwrap().language(), "kotlin");
        assert_eq!(
            frontend_for_path(Path::new("app/build.gradle.kts")).unwrap().language(),
            "kotlin"
        );
        assert_eq!(
            frontend_for_path(Path::new("build.gradle")).unwrap().language(),
            "groovy"
        );
        assert_eq!(
            frontend_for_path(Path::new("gradle.properties")).unwrap().language(),
            "properties"
        );
        assert!(get_frontend("xyz").is_none());
    }

    #[test]
    fn test_parse_source_strips_bom() {
        let unit = parse_source(Path::new("Main.kt"), "\u{feff}package a.b\n".to_string()).unwrap();
        assert!(unit.source().starts_with("package"));
        assert_eq!(unit.relative_path(), "Main.kt");
        assert_eq!(unit.module(), ".");
    }

    #[test]
    fn test_parse_source_without_frontend() {
        let err = parse_source(Path::new("notes.txt"), String::new()).unwrap_err();
        assert!(err.message.contains("no front-end"));
    }
}
