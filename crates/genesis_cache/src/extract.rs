//! Line-based declaration scanning.
//!
//! Change detection does not run the parser. It finds declarations by
//! looking for header lines (`<keyword> <name>`, optionally preceded by
//! `export`), takes each declaration's extent by counting braces from its
//! header, and hashes that text. Dependencies are a deliberately naive
//! regex scan: call-like identifiers and capitalized type-like identifiers.

use std::collections::{BTreeMap, BTreeSet};

use genesis_common::ContentHash;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::cache::ElementMetadata;

static HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:export\s+)?([A-Za-z_][A-Za-z0-9_]*)\s+([A-Za-z_][A-Za-z0-9_]*)")
        .expect("valid header regex")
});

static CALL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([A-Za-z_][A-Za-z0-9_]*)\s*\(").expect("valid call regex"));

static TYPE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([A-Z][A-Za-z0-9_]*)\b").expect("valid type regex"));

static IMPORT_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*import\s+["']?([^"'\s;]+)["']?"#).expect("valid import regex")
});

/// Words that look like calls but never name a declaration.
const CONTROL_WORDS: &[&str] = &[
    "if", "else", "for", "while", "switch", "match", "return", "catch", "new", "typeof",
    "function", "await", "async", "import", "export",
];

/// Finds declarations in source text.
#[derive(Debug, Clone)]
pub struct ElementExtractor {
    keywords: BTreeSet<String>,
}

impl ElementExtractor {
    /// Creates an extractor recognizing headers introduced by `keywords`.
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keywords: keywords.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the `(kind, name)` declared on `line`, if it is a header.
    pub fn header<'a>(&self, line: &'a str) -> Option<(&'a str, &'a str)> {
        let caps = HEADER.captures(line)?;
        let kind = caps.get(1)?.as_str();
        let name = caps.get(2)?.as_str();
        self.keywords.contains(kind).then_some((kind, name))
    }

    /// Scans `content` and returns every declaration, keyed by name.
    ///
    /// When a name is declared twice the first declaration wins.
    pub fn extract(&self, content: &str) -> BTreeMap<String, ElementMetadata> {
        let lines: Vec<&str> = content.lines().collect();
        let mut elements = BTreeMap::new();

        for (index, line) in lines.iter().enumerate() {
            let Some((kind, name)) = self.header(line) else {
                continue;
            };
            if elements.contains_key(name) {
                tracing::trace!(name, line = index + 1, "duplicate declaration ignored");
                continue;
            }
            let end = self.extent_end(&lines, index);
            let text = lines[index..=end].join("\n");
            let element = ElementMetadata {
                name: name.to_string(),
                kind: kind.to_string(),
                content_hash: ContentHash::from_str_content(text.trim()),
                start_line: index + 1,
                end_line: end + 1,
                dependencies: self.dependencies(&text, name),
                output_files: Vec::new(),
            };
            elements.insert(name.to_string(), element);
        }
        elements
    }

    /// Index of the last line belonging to the declaration headed at `start`.
    ///
    /// The extent closes on the line where the brace depth returns to zero.
    /// A declaration that has not opened a brace yet ends just before the
    /// next header. With no closing brace it runs to the end of the file.
    fn extent_end(&self, lines: &[&str], start: usize) -> usize {
        let mut depth = 0i64;
        let mut opened = false;
        for (index, line) in lines.iter().enumerate().skip(start) {
            if index > start && !opened && self.header(line).is_some() {
                return index - 1;
            }
            for ch in line.chars() {
                match ch {
                    '{' => {
                        depth += 1;
                        opened = true;
                    }
                    '}' => depth -= 1,
                    _ => {}
                }
            }
            if opened && depth <= 0 {
                return index;
            }
        }
        lines.len().saturating_sub(1).max(start)
    }

    /// Names referenced in `text`, sorted, excluding `own_name`, keywords
    /// and control words.
    fn dependencies(&self, text: &str, own_name: &str) -> Vec<String> {
        let calls = CALL.captures_iter(text).filter_map(|c| c.get(1));
        let types = TYPE_NAME.captures_iter(text).filter_map(|c| c.get(1));
        calls
            .chain(types)
            .map(|m| m.as_str())
            .filter(|name| *name != own_name)
            .filter(|name| !self.keywords.contains(*name) && !CONTROL_WORDS.contains(name))
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// Import paths declared in `content`.
///
/// Recognizes `import <path>` lines and the entries of an `imports { ... }`
/// block (`path` or `path as alias`, one per line or comma-separated).
pub fn extract_imports(content: &str) -> Vec<String> {
    let mut imports = Vec::new();
    let mut in_block = false;

    for line in content.lines() {
        let trimmed = line.trim();
        if in_block {
            let (body, closes) = match trimmed.find('}') {
                Some(at) => (&trimmed[..at], true),
                None => (trimmed, false),
            };
            imports.extend(body.split(',').filter_map(import_entry));
            in_block = !closes;
        } else if let Some(rest) = trimmed.strip_prefix("imports") {
            if let Some(rest) = rest.trim_start().strip_prefix('{') {
                let (body, closes) = match rest.find('}') {
                    Some(at) => (&rest[..at], true),
                    None => (rest, false),
                };
                imports.extend(body.split(',').filter_map(import_entry));
                in_block = !closes;
            }
        } else if let Some(caps) = IMPORT_LINE.captures(line) {
            if let Some(path) = caps.get(1) {
                imports.push(path.as_str().to_string());
            }
        }
    }
    imports
}

/// The path of one `imports { }` entry, without quotes or alias.
fn import_entry(entry: &str) -> Option<String> {
    let path = entry.split(" as ").next()?.trim();
    let path = path.trim_matches(|c| c == '"' || c == '\'');
    (!path.is_empty()).then(|| path.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> ElementExtractor {
        ElementExtractor::new(["function", "component", "class", "interface", "type"])
    }

    #[test]
    fn finds_headers_with_extents() {
        let src = "\
function greet {
  Say hello to User.
}

export class Greeter {
  method hi {
  }
}
";
        let elements = extractor().extract(src);
        assert_eq!(elements.len(), 2);
        let greet = &elements["greet"];
        assert_eq!((greet.start_line, greet.end_line), (1, 3));
        assert_eq!(greet.kind, "function");
        let greeter = &elements["Greeter"];
        assert_eq!((greeter.start_line, greeter.end_line), (5, 8));
        assert_eq!(greeter.kind, "class");
    }

    #[test]
    fn unknown_keyword_is_not_a_header() {
        let ex = extractor();
        assert_eq!(ex.header("function main {"), Some(("function", "main")));
        assert_eq!(ex.header("  export type Id = string"), Some(("type", "Id")));
        assert_eq!(ex.header("method main {"), None);
        assert_eq!(ex.header("function"), None);
    }

    #[test]
    fn unclosed_declaration_runs_to_end_of_file() {
        let src = "function a {\n  body\n  more\n";
        let elements = extractor().extract(src);
        assert_eq!(elements["a"].end_line, 3);
    }

    #[test]
    fn braceless_declaration_ends_before_next_header() {
        let src = "type Id = string\ntype Name = string\nfunction f {\n}\n";
        let elements = extractor().extract(src);
        assert_eq!((elements["Id"].start_line, elements["Id"].end_line), (1, 1));
        assert_eq!((elements["Name"].start_line, elements["Name"].end_line), (2, 2));
        assert_eq!((elements["f"].start_line, elements["f"].end_line), (3, 4));
    }

    #[test]
    fn hash_ignores_surrounding_whitespace_only() {
        let ex = extractor();
        let a = ex.extract("function f {\n  x\n}\n");
        let b = ex.extract("\n\nfunction f {\n  x\n}   \n");
        let c = ex.extract("function f {\n  y\n}\n");
        assert_eq!(a["f"].content_hash, b["f"].content_hash);
        assert_ne!(a["f"].content_hash, c["f"].content_hash);
    }

    #[test]
    fn dependencies_are_calls_and_type_names() {
        let src = "function render {\n  if (ready) { draw(Canvas) }\n  render()\n  Format the Output.\n}\n";
        let elements = extractor().extract(src);
        assert_eq!(
            elements["render"].dependencies,
            vec!["Canvas", "Format", "Output", "draw"]
        );
    }

    #[test]
    fn first_duplicate_wins() {
        let src = "function f {\n  one\n}\nfunction f {\n  two\n}\n";
        let elements = extractor().extract(src);
        assert_eq!(elements.len(), 1);
        assert_eq!(elements["f"].start_line, 1);
    }

    #[test]
    fn imports_from_lines_and_blocks() {
        let src = r#"
import "./shared/utils"
import lib/math;
imports {
  "./a" as a, ./b
  ./c
}
imports { ./d }
"#;
        assert_eq!(
            extract_imports(src),
            vec!["./shared/utils", "lib/math", "./a", "./b", "./c", "./d"]
        );
    }
}
