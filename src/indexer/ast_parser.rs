use super::language::{SourceLanguage, detect_language_for_path};
use super::units::{ClassUnit, FunctionUnit, ParsedFile};
use crate::error::ParseError;
use std::path::Path;
use tree_sitter::{Node, Parser};

/// Parses one source file into its unit tree
///
/// Only direct children of the module become functions/classes, and only direct
/// children of a class body become methods. Anything nested deeper stays part of
/// its parent's source text.
pub struct AstParser {
    parser: Parser,
    language: SourceLanguage,
}

impl AstParser {
    /// Create a new AST parser for the given language
    pub fn new(language: SourceLanguage) -> Result<Self, ParseError> {
        let mut parser = Parser::new();
        parser
            .set_language(&language.grammar())
            .map_err(|e| ParseError::Grammar(e.to_string()))?;

        Ok(Self { parser, language })
    }

    /// Create a parser for the language implied by a file's extension
    pub fn for_path(path: &str) -> Result<Self, ParseError> {
        let language = detect_language_for_path(path)
            .ok_or_else(|| ParseError::UnsupportedLanguage(path.to_string()))?;
        Self::new(language)
    }

    pub fn language(&self) -> SourceLanguage {
        self.language
    }

    /// Read and parse a file; `file_path` is the identity recorded on the result
    pub fn parse_file(&mut self, path: &Path, file_path: &str) -> Result<ParsedFile, ParseError> {
        let bytes = std::fs::read(path).map_err(|e| ParseError::Read {
            file: file_path.to_string(),
            reason: e.to_string(),
        })?;
        let source = String::from_utf8(bytes).map_err(|_| ParseError::Read {
            file: file_path.to_string(),
            reason: "file is not valid UTF-8".to_string(),
        })?;

        self.parse_source(file_path, &source)
    }

    /// Parse source text into functions, classes and methods
    pub fn parse_source(&mut self, file_path: &str, source: &str) -> Result<ParsedFile, ParseError> {
        let tree = self
            .parser
            .parse(source, None)
            .ok_or_else(|| ParseError::Syntax {
                file: file_path.to_string(),
                line: 1,
            })?;

        let root = tree.root_node();
        if root.has_error() {
            return Err(ParseError::Syntax {
                file: file_path.to_string(),
                line: first_error_line(root),
            });
        }

        let lines = LineIndex::new(source);
        let mut parsed = ParsedFile {
            file_path: file_path.to_string(),
            ..Default::default()
        };

        let mut cursor = root.walk();
        for child in root.named_children(&mut cursor) {
            let Some((outer, definition)) = unwrap_definition(child) else {
                continue;
            };

            match definition.kind() {
                // One module-level name is one unit, whichever kind was bound last
                "function_definition" => {
                    if let Some(unit) = function_unit(outer, definition, source, &lines) {
                        parsed.classes.retain(|c| c.name != unit.name);
                        insert_last_wins(&mut parsed.functions, unit, |f| &f.name);
                    }
                }
                "class_definition" => {
                    if let Some(unit) = class_unit(outer, definition, source, &lines) {
                        parsed.functions.retain(|f| f.name != unit.name);
                        insert_last_wins(&mut parsed.classes, unit, |c| &c.name);
                    }
                }
                _ => {}
            }
        }

        Ok(parsed)
    }
}

/// Byte offsets of line starts, for whole-line slicing
struct LineIndex<'a> {
    source: &'a str,
    starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    fn new(source: &'a str) -> Self {
        let mut starts = vec![0];
        starts.extend(
            source
                .bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self { source, starts }
    }

    /// Text of rows `first..=last` including the final line terminator
    fn slice(&self, first: usize, last: usize) -> &'a str {
        let start = self.starts.get(first).copied().unwrap_or(self.source.len());
        let end = self
            .starts
            .get(last + 1)
            .copied()
            .unwrap_or(self.source.len());
        &self.source[start..end.max(start)]
    }
}

/// 0-based inclusive row span of a node
fn row_span(node: Node) -> (usize, usize) {
    let start = node.start_position().row;
    let end = node.end_position();
    // A node ending at column 0 stops at the previous line's terminator
    let last = if end.column == 0 && end.row > start {
        end.row - 1
    } else {
        end.row
    };
    (start, last)
}

/// Resolve `decorated_definition` to (outer node incl. decorators, definition)
fn unwrap_definition(node: Node) -> Option<(Node, Node)> {
    match node.kind() {
        "function_definition" | "class_definition" => Some((node, node)),
        "decorated_definition" => node
            .child_by_field_name("definition")
            .map(|definition| (node, definition)),
        _ => None,
    }
}

fn node_name(definition: Node, source: &str) -> Option<String> {
    definition
        .child_by_field_name("name")
        .map(|name| source[name.byte_range()].to_string())
}

fn function_unit(outer: Node, definition: Node, source: &str, lines: &LineIndex) -> Option<FunctionUnit> {
    let name = node_name(definition, source)?;
    let (first, last) = row_span(outer);

    Some(FunctionUnit {
        name,
        docstring: docstring(definition, source),
        source: lines.slice(first, last).to_string(),
        start_line: first + 1,
        end_line: last + 1,
    })
}

fn class_unit(outer: Node, definition: Node, source: &str, lines: &LineIndex) -> Option<ClassUnit> {
    let name = node_name(definition, source)?;
    let (first, last) = row_span(outer);

    let mut methods: Vec<FunctionUnit> = Vec::new();
    let mut method_rows: Vec<(usize, usize)> = Vec::new();

    if let Some(body) = definition.child_by_field_name("body") {
        let mut cursor = body.walk();
        for child in body.named_children(&mut cursor) {
            let Some((method_outer, method_def)) = unwrap_definition(child) else {
                continue;
            };
            if method_def.kind() != "function_definition" {
                continue;
            }
            if let Some(method) = function_unit(method_outer, method_def, source, lines) {
                method_rows.push(row_span(method_outer));
                insert_last_wins(&mut methods, method, |m| &m.name);
            }
        }
    }

    // Rows of every method definition are cut out, including shadowed duplicates.
    // Blank rows go too: they separate methods, so adding one must not touch the class.
    let own_source: String = (first..=last)
        .filter(|row| !method_rows.iter().any(|(s, e)| (*s..=*e).contains(row)))
        .map(|row| lines.slice(row, row))
        .filter(|line| !line.trim().is_empty())
        .collect();

    Some(ClassUnit {
        name,
        docstring: docstring(definition, source),
        source: lines.slice(first, last).to_string(),
        own_source,
        start_line: first + 1,
        end_line: last + 1,
        methods,
    })
}

/// Later definitions of the same name replace earlier ones
fn insert_last_wins<T>(items: &mut Vec<T>, item: T, name: impl Fn(&T) -> &String) {
    let new_name = name(&item).clone();
    items.retain(|existing| *name(existing) != new_name);
    items.push(item);
}

/// First statement of the body when it is a plain string literal
fn docstring(definition: Node, source: &str) -> Option<String> {
    let body = definition.child_by_field_name("body")?;
    let mut cursor = body.walk();
    let first = body
        .named_children(&mut cursor)
        .find(|child| child.kind() != "comment")?;

    if first.kind() != "expression_statement" {
        return None;
    }

    let mut inner = first.walk();
    let literal = first.named_children(&mut inner).next()?;
    if literal.kind() != "string" {
        return None;
    }

    let value = string_literal_value(&source[literal.byte_range()])?;
    let cleaned = clean_docstring(&value);
    if cleaned.is_empty() { None } else { Some(cleaned) }
}

/// Strip prefix and quotes; byte and f-strings are not docstrings
fn string_literal_value(raw: &str) -> Option<String> {
    let prefix_len = raw.find(['"', '\''])?;
    let prefix = raw[..prefix_len].to_ascii_lowercase();
    if prefix.contains('b') || prefix.contains('f') {
        return None;
    }

    let body = &raw[prefix_len..];
    let quote_len = if body.starts_with("\"\"\"") || body.starts_with("'''") {
        3
    } else {
        1
    };
    if body.len() < quote_len * 2 {
        return None;
    }

    Some(body[quote_len..body.len() - quote_len].to_string())
}

/// Normalize docstring indentation: strip the first line, dedent the rest by their
/// common margin, and drop blank lines at either end
pub(crate) fn clean_docstring(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();

    let margin = lines
        .iter()
        .skip(1)
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start().len())
        .min()
        .unwrap_or(0);

    let mut cleaned: Vec<&str> = lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            if i == 0 {
                line.trim_start()
            } else {
                line.get(margin..).unwrap_or_else(|| line.trim_start())
            }
        })
        .collect();

    while cleaned.last().is_some_and(|line| line.trim().is_empty()) {
        cleaned.pop();
    }
    let leading_blank = cleaned
        .iter()
        .take_while(|line| line.trim().is_empty())
        .count();

    cleaned[leading_blank..].join("\n")
}

fn first_error_line(root: Node) -> usize {
    find_error(root)
        .map(|node| node.start_position().row + 1)
        .unwrap_or(1)
}

fn find_error(node: Node) -> Option<Node> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if let Some(found) = find_error(child) {
            return Some(found);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> ParsedFile {
        let mut parser = AstParser::new(SourceLanguage::Python).unwrap();
        parser.parse_source("a.py", source).unwrap()
    }

    #[test]
    fn test_functions_classes_and_methods() {
        let source = r#"import os

def hello():
    """Say hello."""
    print("Hello")

class Widget:
    """A widget."""

    def __init__(self):
        self.value = 0

    def render(self):
        return self.value
"#;

        let parsed = parse(source);
        assert_eq!(parsed.file_path, "a.py");
        assert_eq!(parsed.functions.len(), 1);
        assert_eq!(parsed.functions[0].name, "hello");
        assert_eq!(parsed.functions[0].docstring.as_deref(), Some("Say hello."));

        assert_eq!(parsed.classes.len(), 1);
        let widget = &parsed.classes[0];
        assert_eq!(widget.name, "Widget");
        assert_eq!(widget.docstring.as_deref(), Some("A widget."));
        let names: Vec<&str> = widget.methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["__init__", "render"]);
        assert_eq!(parsed.unit_count(), 4);
    }

    #[test]
    fn test_source_is_verbatim_whole_lines() {
        let source = "x = 1\n\ndef foo(a, b):\n    return a + b\n\ny = 2\n";
        let parsed = parse(source);

        let foo = parsed.function("foo").unwrap();
        assert_eq!(foo.source, "def foo(a, b):\n    return a + b\n");
        assert_eq!(foo.start_line, 3);
        assert_eq!(foo.end_line, 4);
    }

    #[test]
    fn test_source_without_trailing_newline() {
        let parsed = parse("def foo():\n    return 1");
        assert_eq!(parsed.function("foo").unwrap().source, "def foo():\n    return 1");
    }

    #[test]
    fn test_class_own_source_excludes_methods() {
        let source = "class Widget:\n    \"\"\"A widget.\"\"\"\n    size = 3\n\n    def render(self):\n        return 1\n";
        let parsed = parse(source);
        let widget = parsed.class("Widget").unwrap();

        assert!(widget.source.contains("def render"));
        assert!(!widget.own_source.contains("def render"));
        assert!(!widget.own_source.contains("return 1"));
        assert!(widget.own_source.contains("size = 3"));
        assert!(widget.own_source.contains("A widget."));
    }

    #[test]
    fn test_method_edit_leaves_class_own_source_unchanged() {
        let before = parse("class C:\n    def m1(self):\n        return 1\n");
        let after = parse("class C:\n    def m1(self):\n        return 2\n");

        let before_class = before.class("C").unwrap();
        let after_class = after.class("C").unwrap();
        assert_eq!(before_class.own_source, after_class.own_source);
        assert_ne!(
            before_class.method("m1").unwrap().source,
            after_class.method("m1").unwrap().source
        );
    }

    #[test]
    fn test_added_method_leaves_class_own_source_unchanged() {
        let before = parse("class C:\n    def m1(self):\n        return 1\n");
        let after = parse(
            "class C:\n    def m1(self):\n        return 1\n\n    def m2(self):\n        return 2\n",
        );

        assert_eq!(
            before.class("C").unwrap().own_source,
            after.class("C").unwrap().own_source
        );
    }

    #[test]
    fn test_decorated_and_async_definitions() {
        let source = r#"@cache
def cached():
    return 1

async def fetch():
    return 2

class Service:
    @staticmethod
    def build():
        return Service()

    async def run(self):
        pass
"#;

        let parsed = parse(source);
        let cached = parsed.function("cached").unwrap();
        assert!(cached.source.starts_with("@cache\n"));
        assert!(parsed.function("fetch").is_some());

        let service = parsed.class("Service").unwrap();
        let build = service.method("build").unwrap();
        assert!(build.source.trim_start().starts_with("@staticmethod"));
        assert!(service.method("run").is_some());
        assert!(!service.own_source.contains("@staticmethod"));
    }

    #[test]
    fn test_nested_functions_are_not_units() {
        let source = "def outer():\n    def inner():\n        return 1\n    return inner\n";
        let parsed = parse(source);

        assert_eq!(parsed.functions.len(), 1);
        assert!(parsed.function("inner").is_none());
        assert!(parsed.function("outer").unwrap().source.contains("def inner"));
    }

    #[test]
    fn test_definitions_under_if_are_ignored() {
        let source = "import sys\n\nif sys.version_info > (3,):\n    def compat():\n        pass\n";
        let parsed = parse(source);
        assert!(parsed.functions.is_empty());
    }

    #[test]
    fn test_duplicate_names_last_definition_wins() {
        let source = "def foo():\n    return 1\n\ndef foo():\n    return 2\n";
        let parsed = parse(source);

        assert_eq!(parsed.functions.len(), 1);
        assert!(parsed.functions[0].source.contains("return 2"));
    }

    #[test]
    fn test_docstring_after_comment() {
        let source = "def foo():\n    # leading comment\n    \"\"\"Real docstring.\"\"\"\n    return 1\n";
        let parsed = parse(source);
        assert_eq!(
            parsed.function("foo").unwrap().docstring.as_deref(),
            Some("Real docstring.")
        );
    }

    #[test]
    fn test_missing_docstring() {
        let parsed = parse("def foo():\n    x = \"not a docstring\"\n    return x\n");
        assert!(parsed.function("foo").unwrap().docstring.is_none());
    }

    #[test]
    fn test_multiline_docstring_is_cleaned() {
        let source = "def foo():\n    \"\"\"Summary line.\n\n        Indented detail.\n    Body text.\n    \"\"\"\n    return 1\n";
        let parsed = parse(source);
        assert_eq!(
            parsed.function("foo").unwrap().docstring.as_deref(),
            Some("Summary line.\n\n    Indented detail.\nBody text.")
        );
    }

    #[test]
    fn test_clean_docstring_single_quotes() {
        assert_eq!(string_literal_value("'abc'").as_deref(), Some("abc"));
        assert_eq!(string_literal_value("r\"\"\"raw\"\"\"").as_deref(), Some("raw"));
        assert_eq!(string_literal_value("b'bytes'"), None);
        assert_eq!(string_literal_value("f'{x}'"), None);
    }

    #[test]
    fn test_syntax_error() {
        let mut parser = AstParser::new(SourceLanguage::Python).unwrap();
        let result = parser.parse_source("broken.py", "def broken(:\n    pass\n");

        match result {
            Err(ParseError::Syntax { file, line }) => {
                assert_eq!(file, "broken.py");
                assert!(line >= 1);
            }
            other => panic!("expected syntax error, got {:?}", other),
        }
    }

    #[test]
    fn test_rebinding_across_kinds_keeps_last_definition() {
        let parsed = parse("def foo():\n    return 1\n\nclass foo:\n    def run(self):\n        pass\n");
        assert!(parsed.function("foo").is_none());
        assert_eq!(parsed.class("foo").unwrap().methods.len(), 1);
        assert_eq!(parsed.unit_count(), 2);

        let parsed = parse("class foo:\n    pass\n\ndef foo():\n    return 1\n");
        assert!(parsed.class("foo").is_none());
        assert_eq!(parsed.function("foo").unwrap().source, "def foo():\n    return 1\n");
    }

    #[test]
    fn test_method_on_class_header_line_is_a_syntax_error() {
        let mut parser = AstParser::new(SourceLanguage::Python).unwrap();
        let result = parser.parse_source("a.py", "class C: def m(self): pass\n");
        assert!(matches!(result, Err(ParseError::Syntax { .. })));
    }

    #[test]
    fn test_empty_file() {
        let parsed = parse("");
        assert!(parsed.functions.is_empty());
        assert!(parsed.classes.is_empty());
    }

    #[test]
    fn test_unsupported_language() {
        assert!(matches!(
            AstParser::for_path("main.rs"),
            Err(ParseError::UnsupportedLanguage(_))
        ));
        assert!(AstParser::for_path("pkg/mod.py").is_ok());
    }

    #[test]
    fn test_parse_file_rejects_invalid_utf8() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("bad.py");
        std::fs::write(&path, [0x64, 0x65, 0x66, 0xff, 0xfe]).unwrap();

        let mut parser = AstParser::new(SourceLanguage::Python).unwrap();
        assert!(matches!(
            parser.parse_file(&path, "bad.py"),
            Err(ParseError::Read { .. })
        ));
    }
}
