//! Structural front-end for Kotlin sources and Gradle build scripts.
//!
//! Kotlin DSL (`.kts`), Groovy DSL (`.gradle`) and plain Kotlin (`.kt`) share
//! the same shape for the facts we mine: statements separated by newlines or
//! semicolons, and `{ ... }` blocks introduced by a header such as
//! `dependencies` or `allprojects`. The front-end tokenizes just enough to
//! respect comments, string literals and bracket nesting, then builds:
//!
//! ```text
//! script
//! ├── package_directive      package com.example
//! ├── import_directive       import kotlinx.coroutines.delay
//! ├── statement              group = "com.example"
//! └── block                  dependencies { ... }
//!     ├── block_header       dependencies
//!     └── statement          implementation("a:b:1.0")
//! ```
//!
//! Expressions are not parsed further; extractors match statement text.

use std::path::Path;

use super::{Frontend, SyntaxNode, SyntaxUnit};
use crate::error::ParseError;

pub const SCRIPT: &str = "script";
pub const STATEMENT: &str = "statement";
pub const BLOCK: &str = "block";
pub const BLOCK_HEADER: &str = "block_header";
pub const IMPORT_DIRECTIVE: &str = "import_directive";
pub const PACKAGE_DIRECTIVE: &str = "package_directive";

/// Surface syntax accepted by the script front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Kotlin sources and Kotlin DSL scripts.
    Kotlin,
    /// Groovy DSL build scripts.
    Groovy,
}

/// Front-end for brace-structured scripts.
pub struct ScriptFrontend {
    dialect: Dialect,
}

impl ScriptFrontend {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }
}

impl Frontend for ScriptFrontend {
    fn language(&self) -> &'static str {
        match self.dialect {
            Dialect::Kotlin => "kotlin",
            Dialect::Groovy => "groovy",
        }
    }

    fn extensions(&self) -> &'static [&'static str] {
        match self.dialect {
            Dialect::Kotlin => &["kt", "kts"],
            Dialect::Groovy => &["gradle"],
        }
    }

    fn parse(&self, path: &Path, source: &str) -> Result<SyntaxNode, ParseError> {
        let lines = LineIndex::new(source);
        let tokens = Lexer::new(source, path, &lines, self.dialect).tokenize()?;
        TreeBuilder {
            tokens,
            pos: 0,
            path,
            lines: &lines,
            src: source,
        }
        .build()
    }
}

/// Name of a block: the leading identifier of its header.
///
/// `allprojects` -> `allprojects`, `` `java-library` `` -> `java-library`,
/// `configure<JavaPluginExtension>` -> `configure`.
pub fn block_name<'a>(unit: &'a SyntaxUnit, block: &SyntaxNode) -> Option<&'a str> {
    if block.kind() != BLOCK {
        return None;
    }
    let header = block.child_of_kind(BLOCK_HEADER)?;
    let text = unit.text(header).trim_start();

    if let Some(rest) = text.strip_prefix('`') {
        return rest.split('`').next().filter(|name| !name.is_empty());
    }

    let end = text
        .find(|c: char| !(c.is_alphanumeric() || c == '_'))
        .unwrap_or(text.len());
    let name = &text[..end];
    (!name.is_empty()).then_some(name)
}

/// Byte offsets of line starts, for offset to line lookups.
struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    fn new(source: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(source.match_indices('\n').map(|(i, _)| i + 1));
        Self { starts }
    }

    /// 1-indexed line containing `offset`.
    fn line(&self, offset: usize) -> usize {
        self.starts.partition_point(|&s| s <= offset)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    Word,
    Str,
    Punct(u8),
    Open(u8),
    Close(u8),
    Newline,
    Semicolon,
}

#[derive(Debug, Clone, Copy)]
struct Token {
    kind: TokenKind,
    start: usize,
    end: usize,
}

struct Lexer<'a> {
    src: &'a [u8],
    pos: usize,
    path: &'a Path,
    lines: &'a LineIndex,
    dialect: Dialect,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str, path: &'a Path, lines: &'a LineIndex, dialect: Dialect) -> Self {
        Self {
            src: source.as_bytes(),
            pos: 0,
            path,
            lines,
            dialect,
        }
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.src.get(self.pos + offset).copied()
    }

    fn error(&self, offset: usize, message: &str) -> ParseError {
        ParseError::new(self.path, message).at_line(self.lines.line(offset))
    }

    fn tokenize(mut self) -> Result<Vec<Token>, ParseError> {
        let mut tokens = Vec::new();

        // Shebang line in executable scripts.
        if self.src.starts_with(b"#!") {
            self.skip_line();
        }

        while let Some(b) = self.peek_at(0) {
            let start = self.pos;
            let kind = match b {
                b' ' | b'\t' | b'\r' | 0x0c => {
                    self.pos += 1;
                    continue;
                }
                b'\n' => {
                    self.pos += 1;
                    TokenKind::Newline
                }
                b';' => {
                    self.pos += 1;
                    TokenKind::Semicolon
                }
                b'/' if self.peek_at(1) == Some(b'/') => {
                    self.skip_line();
                    continue;
                }
                b'/' if self.peek_at(1) == Some(b'*') => {
                    self.skip_block_comment()?;
                    continue;
                }
                // Where an operand starts, a Groovy slash opens a slashy string
                b'/' if self.dialect == Dialect::Groovy && starts_operand(tokens.last()) => {
                    self.scan_slashy()?;
                    TokenKind::Str
                }
                b'"' | b'\'' => {
                    self.scan_string()?;
                    TokenKind::Str
                }
                b'`' => {
                    self.scan_backtick()?;
                    TokenKind::Word
                }
                b'(' | b'[' | b'{' => {
                    self.pos += 1;
                    TokenKind::Open(b)
                }
                b')' | b']' | b'}' => {
                    self.pos += 1;
                    TokenKind::Close(b)
                }
                _ if is_word_byte(b) => {
                    while self.peek_at(0).is_some_and(is_word_byte) {
                        self.pos += 1;
                    }
                    TokenKind::Word
                }
                _ => {
                    self.pos += 1;
                    TokenKind::Punct(b)
                }
            };
            tokens.push(Token {
                kind,
                start,
                end: self.pos,
            });
        }

        Ok(tokens)
    }

    fn skip_line(&mut self) {
        while let Some(b) = self.peek_at(0) {
            if b == b'\n' {
                break;
            }
            self.pos += 1;
        }
    }

    /// Kotlin block comments nest, Groovy ones do not.
    fn skip_block_comment(&mut self) -> Result<(), ParseError> {
        let start = self.pos;
        self.pos += 2;
        let mut depth = 1;
        loop {
            match (self.peek_at(0), self.peek_at(1)) {
                (None, _) => return Err(self.error(start, "unterminated block comment")),
                (Some(b'*'), Some(b'/')) => {
                    self.pos += 2;
                    depth -= 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                (Some(b'/'), Some(b'*')) if self.dialect == Dialect::Kotlin => {
                    self.pos += 2;
                    depth += 1;
                }
                _ => self.pos += 1,
            }
        }
    }

    fn scan_backtick(&mut self) -> Result<(), ParseError> {
        let start = self.pos;
        self.pos += 1;
        loop {
            match self.peek_at(0) {
                None | Some(b'\n') => {
                    return Err(self.error(start, "unterminated backtick identifier"))
                }
                Some(b'`') => {
                    self.pos += 1;
                    return Ok(());
                }
                Some(_) => self.pos += 1,
            }
        }
    }

    fn scan_string(&mut self) -> Result<(), ParseError> {
        let quote = self.src[self.pos];
        if self.peek_at(1) == Some(quote) && self.peek_at(2) == Some(quote) {
            return self.scan_triple(quote);
        }

        let start = self.pos;
        self.pos += 1;
        loop {
            match self.peek_at(0) {
                None | Some(b'\n') => return Err(self.error(start, "unterminated string literal")),
                Some(b'\\') => self.pos += 2,
                Some(b'$') if quote == b'"' && self.peek_at(1) == Some(b'{') => {
                    self.pos += 2;
                    self.skip_template(start)?;
                }
                Some(b) if b == quote => {
                    self.pos += 1;
                    return Ok(());
                }
                Some(_) => self.pos += 1,
            }
        }
    }

    /// Groovy `/.../` string. It may span lines and only escapes `/`.
    fn scan_slashy(&mut self) -> Result<(), ParseError> {
        let start = self.pos;
        self.pos += 1;
        loop {
            match self.peek_at(0) {
                None => return Err(self.error(start, "unterminated slashy string")),
                Some(b'\\') if self.peek_at(1) == Some(b'/') => self.pos += 2,
                Some(b'$') if self.peek_at(1) == Some(b'{') => {
                    self.pos += 2;
                    self.skip_template(start)?;
                }
                Some(b'/') => {
                    self.pos += 1;
                    return Ok(());
                }
                Some(_) => self.pos += 1,
            }
        }
    }

    /// Raw `"""..."""` (and Groovy `'''...'''`) strings; extra closing quotes
    /// belong to the literal.
    fn scan_triple(&mut self, quote: u8) -> Result<(), ParseError> {
        let start = self.pos;
        self.pos += 3;
        loop {
            match self.peek_at(0) {
                None => return Err(self.error(start, "unterminated string literal")),
                Some(b) if b == quote
                    && self.peek_at(1) == Some(quote)
                    && self.peek_at(2) == Some(quote) =>
                {
                    self.pos += 3;
                    while self.peek_at(0) == Some(quote) {
                        self.pos += 1;
                    }
                    return Ok(());
                }
                Some(_) => self.pos += 1,
            }
        }
    }

    /// Skip a `${ ... }` template body, including nested strings.
    fn skip_template(&mut self, string_start: usize) -> Result<(), ParseError> {
        let mut depth = 1;
        loop {
            match self.peek_at(0) {
                None => return Err(self.error(string_start, "unterminated string template")),
                Some(b'{') => {
                    depth += 1;
                    self.pos += 1;
                }
                Some(b'}') => {
                    depth -= 1;
                    self.pos += 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                Some(b'"') | Some(b'\'') => self.scan_string()?,
                Some(_) => self.pos += 1,
            }
        }
    }
}

/// Whether a token following `previous` starts an operand, so that a `/`
/// there cannot be division.
fn starts_operand(previous: Option<&Token>) -> bool {
    match previous.map(|t| t.kind) {
        None | Some(TokenKind::Newline | TokenKind::Semicolon | TokenKind::Open(_)) => true,
        Some(TokenKind::Punct(b)) => b"=,:!&|?~".contains(&b),
        Some(TokenKind::Word | TokenKind::Str | TokenKind::Close(_)) => false,
    }
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || b >= 0x80
}

fn closer_for(open: u8) -> u8 {
    match open {
        b'(' => b')',
        b'[' => b']',
        _ => b'}',
    }
}

struct TreeBuilder<'a> {
    tokens: Vec<Token>,
    pos: usize,
    path: &'a Path,
    lines: &'a LineIndex,
    src: &'a str,
}

impl<'a> TreeBuilder<'a> {
    fn build(mut self) -> Result<SyntaxNode, ParseError> {
        let mut root = SyntaxNode::new(SCRIPT, 0, self.src.len(), 1);
        for node in self.statements(None)? {
            root.push(node);
        }
        Ok(root)
    }

    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn error_at(&self, token: Token, message: String) -> ParseError {
        ParseError::new(self.path, message).at_line(self.lines.line(token.start))
    }

    fn skip_separators(&mut self) {
        while let Some(tok) = self.peek() {
            if !matches!(tok.kind, TokenKind::Newline | TokenKind::Semicolon) {
                break;
            }
            self.pos += 1;
        }
    }

    /// Parse statements until end of input (top level) or the `}` closing
    /// the block opened at `open_brace`. The closing brace is left unconsumed.
    fn statements(&mut self, open_brace: Option<Token>) -> Result<Vec<SyntaxNode>, ParseError> {
        let mut nodes = Vec::new();
        loop {
            self.skip_separators();
            match self.peek() {
                None => {
                    return match open_brace {
                        Some(brace) => Err(self.error_at(brace, "unclosed '{'".to_string())),
                        None => Ok(nodes),
                    };
                }
                Some(tok) if tok.kind == TokenKind::Close(b'}') && open_brace.is_some() => {
                    return Ok(nodes);
                }
                Some(tok) => {
                    if let TokenKind::Close(b) = tok.kind {
                        return Err(self.error_at(tok, format!("unexpected '{}'", b as char)));
                    }
                    nodes.push(self.statement()?);
                }
            }
        }
    }

    fn statement(&mut self) -> Result<SyntaxNode, ParseError> {
        let first = self.pos;
        let mut open: Vec<Token> = Vec::new();

        while let Some(tok) = self.peek() {
            match tok.kind {
                TokenKind::Open(b'{') if open.is_empty() => return self.block(first),
                TokenKind::Open(_) => {
                    open.push(tok);
                    self.pos += 1;
                }
                TokenKind::Close(b) => match open.last() {
                    Some(top) => {
                        let TokenKind::Open(ob) = top.kind else { break };
                        let expected = closer_for(ob);
                        if expected != b {
                            return Err(self.error_at(
                                tok,
                                format!(
                                    "mismatched '{}', expected '{}'",
                                    b as char, expected as char
                                ),
                            ));
                        }
                        open.pop();
                        self.pos += 1;
                    }
                    None => break,
                },
                TokenKind::Newline if open.is_empty() => {
                    if self.continues_after_newline() {
                        self.pos += 1;
                    } else {
                        break;
                    }
                }
                TokenKind::Semicolon if open.is_empty() => break,
                _ => self.pos += 1,
            }
        }

        if let Some(unclosed) = open.last() {
            let TokenKind::Open(ob) = unclosed.kind else {
                return Err(self.error_at(*unclosed, "unbalanced brackets".to_string()));
            };
            return Err(self.error_at(*unclosed, format!("unclosed '{}'", ob as char)));
        }

        let head = self.tokens[first];
        let kind = match (head.kind, self.text(head)) {
            (TokenKind::Word, "import") if self.pos - first > 1 => IMPORT_DIRECTIVE,
            (TokenKind::Word, "package") if self.pos - first > 1 => PACKAGE_DIRECTIVE,
            _ => STATEMENT,
        };
        Ok(self.span_node(kind, first, self.pos))
    }

    fn block(&mut self, first: usize) -> Result<SyntaxNode, ParseError> {
        let brace = self.tokens[self.pos];
        let header = (first < self.pos).then(|| {
            self.span_node(BLOCK_HEADER, first, self.pos)
                .with_field(Some("header"))
        });
        self.pos += 1;

        let body = self.statements(Some(brace))?;
        let close = self.tokens[self.pos];
        self.pos += 1;

        let start = self.tokens[first].start;
        let mut node = SyntaxNode::new(BLOCK, start, close.end, self.lines.line(start));
        if let Some(header) = header {
            node.push(header);
        }
        for child in body {
            node.push(child);
        }
        Ok(node)
    }

    /// Node covering tokens `first..end`, ignoring trailing newlines.
    fn span_node(&self, kind: &'static str, first: usize, end: usize) -> SyntaxNode {
        let start = self.tokens[first].start;
        let last = (first..end)
            .rev()
            .find(|&i| self.tokens[i].kind != TokenKind::Newline)
            .unwrap_or(first);
        SyntaxNode::new(kind, start, self.tokens[last].end, self.lines.line(start))
    }

    fn text(&self, tok: Token) -> &str {
        self.src.get(tok.start..tok.end).unwrap_or("")
    }

    /// A newline at depth 0 continues the statement when the line ends with a
    /// binary operator or the next line starts with a member access, an elvis,
    /// a logical operator or an opening brace. `*` and `?` are excluded at line
    /// end: they close star imports and nullable types.
    fn continues_after_newline(&self) -> bool {
        let prev = self.pos.checked_sub(1).map(|i| self.tokens[i]);
        if let Some(prev) = prev {
            if let TokenKind::Punct(p) = prev.kind {
                let doubled = self.pos >= 2 && {
                    let before = self.tokens[self.pos - 2];
                    before.kind == TokenKind::Punct(p) && before.end == prev.start
                };
                match p {
                    b'.' | b',' | b'=' | b'/' | b'%' | b'&' | b'|' | b':' => return true,
                    b'+' | b'-' if !doubled => return true,
                    _ => {}
                }
            }
        }

        let next = self.tokens[self.pos + 1..]
            .iter()
            .find(|t| t.kind != TokenKind::Newline);
        match next.map(|t| t.kind) {
            Some(TokenKind::Punct(b'.')) | Some(TokenKind::Open(b'{')) => true,
            Some(TokenKind::Punct(b'?')) | Some(TokenKind::Punct(b'&')) | Some(TokenKind::Punct(b'|')) => {
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(name: &str, source: &str) -> SyntaxUnit {
        let dialect = if name.ends_with(".gradle") {
            Dialect::Groovy
        } else {
            Dialect::Kotlin
        };
        let frontend = ScriptFrontend::new(dialect);
        let root = frontend.parse(Path::new(name), source).unwrap();
        SyntaxUnit::new(name, name, ".", frontend.language(), source.to_string(), root)
    }

    fn parse_err(name: &str, source: &str) -> ParseError {
        let dialect = if name.ends_with(".gradle") {
            Dialect::Groovy
        } else {
            Dialect::Kotlin
        };
        ScriptFrontend::new(dialect)
            .parse(Path::new(name), source)
            .unwrap_err()
    }

    fn texts<'a>(unit: &'a SyntaxUnit, kind: &str) -> Vec<&'a str> {
        unit.preorder()
            .filter(|n| n.kind() == kind)
            .map(|n| unit.text(n))
            .collect()
    }

    #[test]
    fn test_kotlin_source_directives() {
        let unit = parse(
            "Main.kt",
            r#"package com.example

import kotlinx.coroutines.delay
import org.apache.commons.math3.random.*

fun main() {
    println("hello {")
}
"#,
        );

        assert_eq!(texts(&unit, PACKAGE_DIRECTIVE), vec!["package com.example"]);
        assert_eq!(
            texts(&unit, IMPORT_DIRECTIVE),
            vec![
                "import kotlinx.coroutines.delay",
                "import org.apache.commons.math3.random.*"
            ]
        );
        let imports: Vec<_> = unit
            .preorder()
            .filter(|n| n.kind() == IMPORT_DIRECTIVE)
            .map(|n| n.line())
            .collect();
        assert_eq!(imports, vec![3, 4]);
    }

    #[test]
    fn test_gradle_blocks_nest() {
        let unit = parse(
            "build.gradle.kts",
            r#"plugins {
    kotlin("jvm") version "1.9.0"
}

dependencies {
    implementation("org.apache.commons:commons-math3:3.6.1")
    testImplementation(kotlin("test")) // trailing comment }
}
"#,
        );

        let blocks: Vec<_> = unit.root().children().iter().map(|n| n.kind()).collect();
        assert_eq!(blocks, vec![BLOCK, BLOCK]);

        let deps = &unit.root().children()[1];
        assert_eq!(block_name(&unit, deps), Some("dependencies"));
        let statements: Vec<_> = deps
            .children()
            .iter()
            .filter(|n| n.kind() == STATEMENT)
            .map(|n| unit.text(n))
            .collect();
        assert_eq!(
            statements,
            vec![
                r#"implementation("org.apache.commons:commons-math3:3.6.1")"#,
                r#"testImplementation(kotlin("test"))"#,
            ]
        );
    }

    #[test]
    fn test_block_with_call_header() {
        let unit = parse(
            "build.gradle.kts",
            "dependencies {\n    implementation(\"a:b:1\") {\n        exclude(group = \"x\")\n    }\n}\n",
        );
        let headers = texts(&unit, BLOCK_HEADER);
        assert_eq!(headers, vec!["dependencies", "implementation(\"a:b:1\")"]);
    }

    #[test]
    fn test_groovy_allman_braces_and_continuations() {
        let unit = parse(
            "build.gradle",
            "allprojects\n{\n    repositories {\n        mavenCentral()\n    }\n}\ndef x = foo()\n    .bar()\n",
        );
        let root = unit.root();
        assert_eq!(root.children().len(), 2);
        assert_eq!(block_name(&unit, &root.children()[0]), Some("allprojects"));
        assert_eq!(unit.text(&root.children()[1]), "def x = foo()\n    .bar()");
    }

    #[test]
    fn test_strings_and_templates_hide_brackets() {
        let unit = parse(
            "build.gradle.kts",
            "val v = \"${project.findProperty(\"x\") ?: \"}\"}\"\nval raw = \"\"\"\n{ ( [\n\"\"\"\nval c = '}'\n",
        );
        assert_eq!(texts(&unit, STATEMENT).len(), 3);
    }

    #[test]
    fn test_semicolons_split_statements() {
        let unit = parse("build.gradle", "apply plugin: 'java'; apply plugin: 'idea'\n");
        assert_eq!(
            texts(&unit, STATEMENT),
            vec!["apply plugin: 'java'", "apply plugin: 'idea'"]
        );
    }

    #[test]
    fn test_nested_block_comments_in_kotlin() {
        let unit = parse("Main.kt", "/* outer /* inner */ still comment */\nimport a.b\n");
        assert_eq!(texts(&unit, IMPORT_DIRECTIVE), vec!["import a.b"]);
    }

    #[test]
    fn test_unterminated_string_is_error() {
        let err = parse_err("build.gradle.kts", "dependencies {\n    implementation(\"a:b:1)\n}\n");
        assert_eq!(err.line, Some(2));
        assert!(err.message.contains("unterminated string"));
    }

    #[test]
    fn test_unclosed_brace_is_error() {
        let err = parse_err("build.gradle", "android {\n    compileSdk 33\n");
        assert_eq!(err.line, Some(1));
        assert!(err.message.contains("unclosed '{'"));
    }

    #[test]
    fn test_stray_closing_brace_is_error() {
        let err = parse_err("build.gradle", "apply plugin: 'java'\n}\n");
        assert_eq!(err.line, Some(2));
    }

    #[test]
    fn test_mismatched_bracket_is_error() {
        let err = parse_err("build.gradle.kts", "foo(bar]\n");
        assert!(err.message.contains("mismatched"));
    }

    #[test]
    fn test_groovy_slashy_strings() {
        let unit = parse(
            "build.gradle",
            "def pattern = /src\\/*.kt/\ndef twice = /ab/*2\ndef half = total / 2 / 1\nversion = '1.0'\n",
        );
        assert_eq!(
            texts(&unit, STATEMENT),
            vec![
                "def pattern = /src\\/*.kt/",
                "def twice = /ab/*2",
                "def half = total / 2 / 1",
                "version = '1.0'",
            ]
        );

        let unit = parse("build.gradle", "exclude(/}/)\n");
        assert_eq!(texts(&unit, STATEMENT), vec!["exclude(/}/)"]);

        let err = parse_err("build.gradle", "def p = /open\n");
        assert!(err.message.contains("unterminated slashy string"));
    }

    #[test]
    fn test_backtick_block_name() {
        let unit = parse("build.gradle.kts", "`java-library` {\n}\n");
        assert_eq!(block_name(&unit, &unit.root().children()[0]), Some("java-library"));
    }
}
