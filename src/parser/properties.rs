//! Front-end for Java `.properties` files (`gradle.properties`).
//!
//! Each logical line becomes a `property` node. Comment lines (`#`, `!`) and
//! blank lines are dropped; a line ending in an odd number of backslashes
//! continues on the next line.

use std::path::Path;

use super::{Frontend, SyntaxNode};
use crate::error::ParseError;

pub const PROPERTIES: &str = "properties";
pub const PROPERTY: &str = "property";

/// Front-end for `.properties` files.
pub struct PropertiesFrontend;

impl PropertiesFrontend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PropertiesFrontend {
    fn default() -> Self {
        Self::new()
    }
}

impl Frontend for PropertiesFrontend {
    fn language(&self) -> &'static str {
        "properties"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["properties"]
    }

    /// UTF-8 when valid, else ISO-8859-1, the encoding `java.util.Properties`
    /// reads by default.
    fn decode(&self, _path: &Path, bytes: Vec<u8>) -> Result<String, ParseError> {
        Ok(String::from_utf8(bytes).unwrap_or_else(|err| latin1(err.as_bytes())))
    }

    fn parse(&self, _path: &Path, source: &str) -> Result<SyntaxNode, ParseError> {
        let mut root = SyntaxNode::new(PROPERTIES, 0, source.len(), 1);

        // (start offset, start line) of the logical line being continued
        let mut pending: Option<(usize, usize)> = None;
        let mut offset = 0;

        for (index, raw) in source.split_inclusive('\n').enumerate() {
            let line_no = index + 1;
            let line = raw.trim_end_matches('\n').trim_end_matches('\r');
            let line_start = offset;
            offset += raw.len();

            let (start, first_line) = match pending.take() {
                Some(open) => open,
                None => {
                    let trimmed = line.trim_start();
                    if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
                        continue;
                    }
                    (line_start + (line.len() - trimmed.len()), line_no)
                }
            };

            if ends_with_continuation(line) {
                pending = Some((start, first_line));
                continue;
            }

            root.push(SyntaxNode::new(PROPERTY, start, line_start + line.len(), first_line));
        }

        // Continuation on the last line: the property ends at end of input.
        if let Some((start, first_line)) = pending {
            let end = source.trim_end_matches(['\n', '\r']).len();
            root.push(SyntaxNode::new(PROPERTY, start, end.max(start), first_line));
        }

        Ok(root)
    }
}

fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

fn ends_with_continuation(line: &str) -> bool {
    let backslashes = line.bytes().rev().take_while(|&b| b == b'\\').count();
    backslashes % 2 == 1
}

/// Split the text of a `property` node into an unescaped key and value.
///
/// The key ends at the first unescaped `=`, `:` or whitespace; one separator
/// and surrounding whitespace are skipped before the value.
pub fn split_property(text: &str) -> (String, String) {
    let logical = join_continuations(text);
    let chars: Vec<char> = logical.chars().collect();

    let mut i = 0;
    let mut key_end = chars.len();
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 2,
            '=' | ':' | ' ' | '\t' | '\x0c' => {
                key_end = i;
                break;
            }
            _ => i += 1,
        }
    }
    let key_end = key_end.min(chars.len());

    let mut j = key_end;
    while j < chars.len() && matches!(chars[j], ' ' | '\t' | '\x0c') {
        j += 1;
    }
    if j < chars.len() && matches!(chars[j], '=' | ':') {
        j += 1;
    }
    while j < chars.len() && matches!(chars[j], ' ' | '\t' | '\x0c') {
        j += 1;
    }

    let key: String = chars[..key_end].iter().collect();
    let value: String = chars[j.min(chars.len())..].iter().collect();
    (unescape(&key), unescape(&value))
}

/// Remove `\`-newline continuations and the leading whitespace that follows.
fn join_continuations(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut lines = text.split('\n').peekable();
    while let Some(line) = lines.next() {
        let line = line.trim_end_matches('\r');
        if lines.peek().is_some() && ends_with_continuation(line) {
            out.push_str(&line[..line.len() - 1]);
            if let Some(next) = lines.peek_mut() {
                *next = next.trim_start();
            }
        } else {
            out.push_str(line);
        }
    }
    out
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\x0c'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) => out.push(decoded),
                    None => {
                        out.push_str("\\u");
                        out.push_str(&hex);
                    }
                }
            }
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::SyntaxUnit;

    fn parse(source: &str) -> SyntaxUnit {
        let root = PropertiesFrontend::new()
            .parse(Path::new("gradle.properties"), source)
            .unwrap();
        SyntaxUnit::new(
            "gradle.properties",
            "gradle.properties",
            ".",
            "properties",
            source.to_string(),
            root,
        )
    }

    fn properties(unit: &SyntaxUnit) -> Vec<(String, String)> {
        unit.root()
            .children()
            .iter()
            .map(|n| split_property(unit.text(n)))
            .collect()
    }

    #[test]
    fn test_decode_falls_back_to_latin1() {
        let frontend = PropertiesFrontend::new();
        let path = Path::new("gradle.properties");
        assert_eq!(
            frontend.decode(path, b"author=Ren\xe9\n".to_vec()).unwrap(),
            "author=Ren\u{e9}\n"
        );
        assert_eq!(
            frontend.decode(path, "author=Ren\u{e9}\n".as_bytes().to_vec()).unwrap(),
            "author=Ren\u{e9}\n"
        );
    }

    #[test]
    fn test_basic_properties() {
        let unit = parse(
            "# Project-wide Gradle settings.\norg.gradle.jvmargs=-Xmx2048m\n\nandroid.useAndroidX = true\nkotlin.code.style: official\n",
        );
        assert_eq!(
            properties(&unit),
            vec![
                ("org.gradle.jvmargs".to_string(), "-Xmx2048m".to_string()),
                ("android.useAndroidX".to_string(), "true".to_string()),
                ("kotlin.code.style".to_string(), "official".to_string()),
            ]
        );
        let lines: Vec<_> = unit.root().children().iter().map(|n| n.line()).collect();
        assert_eq!(lines, vec![2, 4, 5]);
    }

    #[test]
    fn test_continuation_lines() {
        let unit = parse("org.gradle.jvmargs=-Xmx2048m \\\n    -Dfile.encoding=UTF-8\nnext=1\n");
        assert_eq!(
            properties(&unit),
            vec![
                (
                    "org.gradle.jvmargs".to_string(),
                    "-Xmx2048m -Dfile.encoding=UTF-8".to_string()
                ),
                ("next".to_string(), "1".to_string()),
            ]
        );
    }

    #[test]
    fn test_escapes_and_whitespace_separator() {
        assert_eq!(
            split_property(r"key\:with\=seps value\tx"),
            ("key:with=seps".to_string(), "value\tx".to_string())
        );
        assert_eq!(split_property("flag"), ("flag".to_string(), String::new()));
        assert_eq!(
            split_property(r"unicode=\u0041"),
            ("unicode".to_string(), "A".to_string())
        );
    }

    #[test]
    fn test_empty_key_line_is_kept_for_analysis() {
        let unit = parse("=orphan\n");
        assert_eq!(properties(&unit), vec![(String::new(), "orphan".to_string())]);
    }

    #[test]
    fn test_comments_and_blank_file() {
        let unit = parse("! legacy comment\n\n   # indented comment\n");
        assert!(unit.root().children().is_empty());
    }
}
