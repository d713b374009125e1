//! Statement parser for BUILD file text.
//!
//! The parser recognizes just enough structure to edit rule attributes
//! safely: top-level call statements (`go_library(...)`) with keyword
//! arguments whose values are string literals or lists of string literals.
//! Everything else - comments, assignments, `def` blocks, computed values
//! such as `glob(...)` - is kept as an opaque byte span and reproduced
//! verbatim on output.
//!
//! Every parsed node records its span in the original text. The statement
//! list covers the input contiguously, so concatenating the spans of all
//! statements yields the input byte-for-byte; that property is what makes
//! minimal-diff editing possible.

use crate::core::DepsyncError;
use std::ops::Range;

pub(crate) type Span = Range<usize>;

/// One top-level unit of a BUILD file.
#[derive(Debug, Clone)]
pub(crate) enum Statement {
    /// Text the editor does not manage: comments, blank lines, assignments,
    /// anything that is not a call statement. Reproduced verbatim.
    Opaque(Span),
    /// A top-level call statement, usually a rule definition.
    Call(CallStmt),
}

/// A parsed call statement such as `go_library(name = "x", ...)`.
#[derive(Debug, Clone)]
pub(crate) struct CallStmt {
    /// The called function, which for rules is the rule kind.
    pub kind: String,
    /// Span from the first character of the callee to the closing paren,
    /// inclusive.
    pub span: Span,
    /// Offset of the closing paren, used as the insertion point for new
    /// attributes.
    pub close_offset: usize,
    /// Arguments in source order.
    pub args: Vec<Arg>,
}

/// One argument of a call statement.
#[derive(Debug, Clone)]
pub(crate) struct Arg {
    /// Keyword name, or `None` for positional arguments.
    pub name: Option<String>,
    pub value: ArgValue,
}

/// An argument value, structured only when it is editable.
#[derive(Debug, Clone)]
pub(crate) enum ArgValue {
    /// A single string literal, decoded.
    Str(String, Span),
    /// A list containing only string literals, decoded in order.
    List(Vec<String>, Span),
    /// Anything else; the span is reproduced verbatim.
    Opaque(Span),
}

impl ArgValue {
    pub(crate) fn span(&self) -> &Span {
        match self {
            Self::Str(_, span) | Self::List(_, span) | Self::Opaque(span) => span,
        }
    }
}

/// Parses BUILD file text into a contiguous statement list.
pub(crate) fn parse_statements(src: &str, file: &str) -> Result<Vec<Statement>, DepsyncError> {
    Parser {
        src,
        bytes: src.as_bytes(),
        pos: 0,
        file: file.to_string(),
    }
    .parse()
}

struct Parser<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    file: String,
}

impl<'a> Parser<'a> {
    fn parse(mut self) -> Result<Vec<Statement>, DepsyncError> {
        let mut statements = Vec::new();
        let mut opaque_start = 0;
        while self.pos < self.bytes.len() {
            self.skip_blank_and_comment_lines();
            if self.pos >= self.bytes.len() {
                break;
            }
            // Only column-zero calls are treated as rule statements; indented
            // code belongs to some enclosing construct and stays opaque.
            if self.at_line_start() {
                if let Some(call) = self.try_parse_call()? {
                    if opaque_start < call.span.start {
                        statements.push(Statement::Opaque(opaque_start..call.span.start));
                    }
                    opaque_start = call.span.end;
                    self.pos = call.span.end;
                    statements.push(Statement::Call(call));
                    continue;
                }
            }
            self.consume_opaque_statement();
        }
        if opaque_start < self.bytes.len() {
            statements.push(Statement::Opaque(opaque_start..self.bytes.len()));
        }
        Ok(statements)
    }

    fn error(&self, reason: impl Into<String>) -> DepsyncError {
        let line = self.src[..self.pos.min(self.src.len())]
            .bytes()
            .filter(|&b| b == b'\n')
            .count()
            + 1;
        DepsyncError::BuildFileParse {
            file: self.file.clone(),
            line,
            reason: reason.into(),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn at_line_start(&self) -> bool {
        self.pos == 0 || self.bytes[self.pos - 1] == b'\n'
    }

    /// Advances over whole lines that are blank or comment-only.
    fn skip_blank_and_comment_lines(&mut self) {
        while self.pos < self.bytes.len() && self.at_line_start() {
            let rest = &self.src[self.pos..];
            let line_end = rest.find('\n').map_or(rest.len(), |i| i + 1);
            let line = &rest[..line_end];
            let trimmed = line.trim_start();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                self.pos += line_end;
            } else {
                break;
            }
        }
    }

    /// Skips spaces, tabs, newlines and comments.
    fn skip_trivia(&mut self) {
        while let Some(b) = self.peek() {
            match b {
                b' ' | b'\t' | b'\r' | b'\n' => self.pos += 1,
                b'#' => {
                    while let Some(c) = self.peek() {
                        if c == b'\n' {
                            break;
                        }
                        self.pos += 1;
                    }
                }
                _ => break,
            }
        }
    }

    fn read_ident(&mut self) -> Option<String> {
        let start = self.pos;
        match self.peek() {
            Some(b) if b.is_ascii_alphabetic() || b == b'_' => self.pos += 1,
            _ => return None,
        }
        while let Some(b) = self.peek() {
            if b.is_ascii_alphanumeric() || b == b'_' {
                self.pos += 1;
            } else {
                break;
            }
        }
        Some(self.src[start..self.pos].to_string())
    }

    /// Attempts to parse `ident ( ... )` starting at the current position.
    /// Resets the position and returns `None` when the statement is not a
    /// call.
    fn try_parse_call(&mut self) -> Result<Option<CallStmt>, DepsyncError> {
        let start = self.pos;
        let Some(kind) = self.read_ident() else {
            return Ok(None);
        };
        while matches!(self.peek(), Some(b' ' | b'\t')) {
            self.pos += 1;
        }
        if self.peek() != Some(b'(') {
            self.pos = start;
            return Ok(None);
        }
        self.pos += 1;
        let call = self.parse_call_body(start, kind)?;
        Ok(Some(call))
    }

    fn parse_call_body(&mut self, start: usize, kind: String) -> Result<CallStmt, DepsyncError> {
        let mut args = Vec::new();
        loop {
            self.skip_trivia();
            match self.peek() {
                None => return Err(self.error("unterminated call")),
                Some(b')') => {
                    let close_offset = self.pos;
                    self.pos += 1;
                    return Ok(CallStmt {
                        kind,
                        span: start..self.pos,
                        close_offset,
                        args,
                    });
                }
                Some(_) => {
                    let name = self.try_kwarg_name();
                    let value = self.parse_value()?;
                    args.push(Arg { name, value });
                    self.skip_trivia();
                    match self.peek() {
                        Some(b',') => self.pos += 1,
                        Some(b')') => {}
                        _ => return Err(self.error("expected ',' or ')' after argument")),
                    }
                }
            }
        }
    }

    /// Parses `name =` when present, leaving the position at the value.
    fn try_kwarg_name(&mut self) -> Option<String> {
        let save = self.pos;
        let name = self.read_ident()?;
        self.skip_trivia();
        if self.peek() == Some(b'=') && self.bytes.get(self.pos + 1) != Some(&b'=') {
            self.pos += 1;
            Some(name)
        } else {
            self.pos = save;
            None
        }
    }

    fn parse_value(&mut self) -> Result<ArgValue, DepsyncError> {
        self.skip_trivia();
        let vstart = self.pos;
        match self.peek() {
            Some(b'"' | b'\'') => {
                let value = self.read_string_literal()?;
                let end = self.pos;
                if self.value_ends_here() {
                    Ok(ArgValue::Str(value, vstart..end))
                } else {
                    // Concatenation or formatting follows; give up on
                    // structure and keep the whole expression opaque.
                    self.consume_opaque_value(vstart)
                }
            }
            Some(b'[') => {
                let save = self.pos;
                match self.try_parse_string_list()? {
                    Some(items) => {
                        let end = self.pos;
                        if self.value_ends_here() {
                            Ok(ArgValue::List(items, vstart..end))
                        } else {
                            self.pos = save;
                            self.consume_opaque_value(vstart)
                        }
                    }
                    None => {
                        self.pos = save;
                        self.consume_opaque_value(vstart)
                    }
                }
            }
            Some(_) => self.consume_opaque_value(vstart),
            None => Err(self.error("expected argument value")),
        }
    }

    /// Whether the value just parsed is immediately followed by `,` or `)`.
    fn value_ends_here(&mut self) -> bool {
        let save = self.pos;
        self.skip_trivia();
        let ends = matches!(self.peek(), Some(b',' | b')'));
        self.pos = save;
        ends
    }

    /// Parses `[ "a", "b", ... ]`, returning `None` when the list contains
    /// anything other than string literals.
    fn try_parse_string_list(&mut self) -> Result<Option<Vec<String>>, DepsyncError> {
        debug_assert_eq!(self.peek(), Some(b'['));
        self.pos += 1;
        let mut items = Vec::new();
        loop {
            self.skip_trivia();
            match self.peek() {
                Some(b']') => {
                    self.pos += 1;
                    return Ok(Some(items));
                }
                Some(b'"' | b'\'') => {
                    items.push(self.read_string_literal()?);
                    self.skip_trivia();
                    match self.peek() {
                        Some(b',') => self.pos += 1,
                        Some(b']') => {}
                        _ => return Ok(None),
                    }
                }
                _ => return Ok(None),
            }
        }
    }

    /// Reads a string literal at the current position and returns its decoded
    /// value. Supports single, double and triple quoting with the common
    /// escapes.
    fn read_string_literal(&mut self) -> Result<String, DepsyncError> {
        let quote = self.peek().ok_or_else(|| self.error("expected string"))?;
        if self.bytes.get(self.pos + 1) == Some(&quote)
            && self.bytes.get(self.pos + 2) == Some(&quote)
        {
            return self.read_triple_quoted(quote);
        }
        self.pos += 1;
        let mut out = String::new();
        loop {
            match self.peek() {
                None => return Err(self.error("unterminated string literal")),
                Some(b'\n') => return Err(self.error("unterminated string literal")),
                Some(b'\\') => {
                    self.pos += 1;
                    match self.peek() {
                        Some(b'n') => out.push('\n'),
                        Some(b't') => out.push('\t'),
                        Some(b'\\') => out.push('\\'),
                        Some(b'"') => out.push('"'),
                        Some(b'\'') => out.push('\''),
                        Some(other) => {
                            out.push('\\');
                            out.push(other as char);
                        }
                        None => return Err(self.error("unterminated string literal")),
                    }
                    self.pos += 1;
                }
                Some(b) if b == quote => {
                    self.pos += 1;
                    return Ok(out);
                }
                Some(_) => {
                    // Advance by whole characters, not bytes.
                    let ch = self.src[self.pos..]
                        .chars()
                        .next()
                        .ok_or_else(|| self.error("invalid utf-8 position"))?;
                    out.push(ch);
                    self.pos += ch.len_utf8();
                }
            }
        }
    }

    fn read_triple_quoted(&mut self, quote: u8) -> Result<String, DepsyncError> {
        self.pos += 3;
        let start = self.pos;
        loop {
            if self.pos + 3 > self.bytes.len() {
                return Err(self.error("unterminated triple-quoted string"));
            }
            if self.bytes[self.pos] == quote
                && self.bytes[self.pos + 1] == quote
                && self.bytes[self.pos + 2] == quote
            {
                let value = self.src[start..self.pos].to_string();
                self.pos += 3;
                return Ok(value);
            }
            self.pos += 1;
        }
    }

    /// Consumes an unstructured value up to the next top-level `,` or `)`,
    /// balancing brackets and skipping strings and comments. Trailing
    /// whitespace is excluded from the returned span.
    fn consume_opaque_value(&mut self, vstart: usize) -> Result<ArgValue, DepsyncError> {
        let mut depth: usize = 0;
        loop {
            match self.peek() {
                None => return Err(self.error("unterminated argument value")),
                Some(b'#') => {
                    while let Some(c) = self.peek() {
                        if c == b'\n' {
                            break;
                        }
                        self.pos += 1;
                    }
                }
                Some(b'"' | b'\'') => {
                    self.read_string_literal()?;
                }
                Some(b'(' | b'[' | b'{') => {
                    depth += 1;
                    self.pos += 1;
                }
                Some(b')') if depth == 0 => break,
                Some(b',') if depth == 0 => break,
                Some(b')' | b']' | b'}') => {
                    depth = depth.saturating_sub(1);
                    self.pos += 1;
                }
                Some(_) => self.pos += 1,
            }
        }
        let mut end = self.pos;
        while end > vstart && self.bytes[end - 1].is_ascii_whitespace() {
            end -= 1;
        }
        Ok(ArgValue::Opaque(vstart..end))
    }

    /// Consumes one non-call statement: everything up to the first newline at
    /// bracket depth zero.
    fn consume_opaque_statement(&mut self) {
        let mut depth: usize = 0;
        while let Some(b) = self.peek() {
            match b {
                b'#' => {
                    while let Some(c) = self.peek() {
                        if c == b'\n' {
                            break;
                        }
                        self.pos += 1;
                    }
                }
                b'"' | b'\'' => {
                    // An unterminated literal stops at the newline, which the
                    // arm below then treats as the statement end.
                    let _ = self.read_string_literal();
                }
                b'(' | b'[' | b'{' => {
                    depth += 1;
                    self.pos += 1;
                }
                b')' | b']' | b'}' => {
                    depth = depth.saturating_sub(1);
                    self.pos += 1;
                }
                b'\n' if depth == 0 => {
                    self.pos += 1;
                    return;
                }
                _ => self.pos += 1,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> Vec<Statement> {
        parse_statements(src, "BUILD").unwrap()
    }

    fn calls(statements: &[Statement]) -> Vec<&CallStmt> {
        statements
            .iter()
            .filter_map(|s| match s {
                Statement::Call(c) => Some(c),
                Statement::Opaque(_) => None,
            })
            .collect()
    }

    #[test]
    fn test_spans_cover_input() {
        let src = "# header\n\ngo_library(\n    name = \"foo\",\n)\n\nX = 1\n";
        let statements = parse(src);
        let mut pos = 0;
        for stmt in &statements {
            let span = match stmt {
                Statement::Opaque(s) => s,
                Statement::Call(c) => &c.span,
            };
            assert_eq!(span.start, pos, "gap before {span:?}");
            pos = span.end;
        }
        assert_eq!(pos, src.len());
    }

    #[test]
    fn test_parse_simple_rule() {
        let src = "go_library(\n    name = \"foo\",\n    srcs = [\"a.go\", \"b.go\"],\n)\n";
        let statements = parse(src);
        let call = calls(&statements)[0];
        assert_eq!(call.kind, "go_library");
        assert_eq!(call.args.len(), 2);
        assert_eq!(call.args[0].name.as_deref(), Some("name"));
        match &call.args[0].value {
            ArgValue::Str(v, _) => assert_eq!(v, "foo"),
            other => panic!("expected string, got {other:?}"),
        }
        match &call.args[1].value {
            ArgValue::List(items, _) => assert_eq!(items, &["a.go", "b.go"]),
            other => panic!("expected list, got {other:?}"),
        }
    }

    #[test]
    fn test_multiline_list_with_comments() {
        let src = "go_library(\n    name = \"foo\",\n    deps = [\n        # keep first\n        \"//a:b\",\n        \"//c\",\n    ],\n)\n";
        let statements = parse(src);
        let call = calls(&statements)[0];
        match &call.args[1].value {
            ArgValue::List(items, _) => assert_eq!(items, &["//a:b", "//c"]),
            other => panic!("expected list, got {other:?}"),
        }
    }

    #[test]
    fn test_glob_value_is_opaque() {
        let src = "go_library(\n    name = \"foo\",\n    srcs = glob([\"*.go\"]),\n)\n";
        let statements = parse(src);
        let call = calls(&statements)[0];
        assert!(matches!(call.args[1].value, ArgValue::Opaque(_)));
        let span = call.args[1].value.span();
        assert_eq!(&src[span.clone()], "glob([\"*.go\"])");
    }

    #[test]
    fn test_non_call_statements_are_opaque() {
        let src = "VERSION = \"1.2.3\"\n\nsubinclude(\"//build_defs:go\")\n\ndef helper():\n    pass\n";
        let statements = parse(src);
        // subinclude is a call; the assignment and def body stay opaque.
        let call_list = calls(&statements);
        assert_eq!(call_list.len(), 1);
        assert_eq!(call_list[0].kind, "subinclude");
    }

    #[test]
    fn test_indented_call_stays_opaque() {
        let src = "def make():\n    go_library(name = \"x\")\n";
        let statements = parse(src);
        assert!(calls(&statements).is_empty());
    }

    #[test]
    fn test_concatenated_string_is_opaque() {
        let src = "go_library(\n    name = \"a\" + SUFFIX,\n)\n";
        let statements = parse(src);
        let call = calls(&statements)[0];
        assert!(matches!(call.args[0].value, ArgValue::Opaque(_)));
    }

    #[test]
    fn test_positional_args() {
        let src = "exports_files([\"LICENCE\"])\n";
        let statements = parse(src);
        let call = calls(&statements)[0];
        assert_eq!(call.args.len(), 1);
        assert!(call.args[0].name.is_none());
        assert!(matches!(call.args[0].value, ArgValue::List(_, _)));
    }

    #[test]
    fn test_trailing_comma_and_empty_list() {
        let src = "go_library(\n    name = \"foo\",\n    deps = [],\n)\n";
        let statements = parse(src);
        let call = calls(&statements)[0];
        match &call.args[1].value {
            ArgValue::List(items, _) => assert!(items.is_empty()),
            other => panic!("expected list, got {other:?}"),
        }
    }

    #[test]
    fn test_unterminated_call_is_an_error() {
        let src = "go_library(\n    name = \"foo\",\n";
        assert!(parse_statements(src, "BUILD").is_err());
    }

    #[test]
    fn test_string_escapes() {
        let src = "go_library(\n    name = \"fo\\\"o\",\n)\n";
        let statements = parse(src);
        let call = calls(&statements)[0];
        match &call.args[0].value {
            ArgValue::Str(v, _) => assert_eq!(v, "fo\"o"),
            other => panic!("expected string, got {other:?}"),
        }
    }
}
