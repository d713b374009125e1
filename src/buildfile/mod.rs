//! Reading and non-destructively editing BUILD files.
//!
//! A BUILD file is treated as a sequence of statements, most of which depsync
//! never interprets. Rule definitions (top-level call statements) are parsed
//! just deeply enough to find a rule by name or kind and to read and rewrite
//! string-list attributes. Everything else - comments, formatting,
//! assignments, computed attribute values - is carried through byte-for-byte.
//!
//! Editing follows a minimal-diff discipline: rendering an untouched file
//! reproduces the input exactly, and rewriting one attribute changes only
//! that attribute's bytes. This is what keeps hand-maintained content (a
//! `visibility` list, a comment above a dependency, a `glob(...)` call) intact
//! across runs.
//!
//! The capability surface the synchronizer relies on:
//!
//! - [`RuleFile::find_rule`] - look a rule up by name
//! - [`RuleFile::find_providing_rule`] - the unique rule of a library kind,
//!   erroring when two candidates exist
//! - [`RuleFile::attr`] / [`RuleFile::set_attr_strings`] - read and replace
//!   string-list attributes
//! - [`RuleFile::create_rule`] - append a new rule definition
//! - [`RuleFile::render`] - produce the output text

mod fileset;
mod parser;

pub use fileset::RuleFileSet;

use crate::core::DepsyncError;
use parser::{ArgValue, CallStmt, Statement, parse_statements};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// A rule attribute as seen by the synchronizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attr {
    /// The attribute is not set on the rule.
    Absent,
    /// The attribute is a string or a list of strings, decoded.
    Strings(Vec<String>),
    /// The attribute is set to something depsync does not manage, such as a
    /// `glob(...)` call; it must be left alone.
    Other,
}

/// Opaque handle to one rule inside a [`RuleFile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleHandle(RuleRef);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RuleRef {
    /// Index into the parsed statement list.
    Parsed(usize),
    /// Index into the rules created during this run.
    Created(usize),
}

#[derive(Debug, Clone)]
struct NewRule {
    kind: String,
    name: String,
    attrs: Vec<(String, Vec<String>)>,
}

/// One parsed BUILD file plus the edits queued against it.
#[derive(Debug)]
pub struct RuleFile {
    path: PathBuf,
    src: String,
    statements: Vec<Statement>,
    created: Vec<NewRule>,
    edits: HashMap<(usize, String), Vec<String>>,
}

impl RuleFile {
    /// Parses BUILD file text.
    ///
    /// # Errors
    ///
    /// Returns [`DepsyncError::BuildFileParse`] when a call statement is
    /// structurally broken (unterminated call or string literal).
    pub fn parse(path: impl Into<PathBuf>, src: impl Into<String>) -> Result<Self, DepsyncError> {
        let path = path.into();
        let src = src.into();
        let statements = parse_statements(&src, &path.to_string_lossy())?;
        Ok(Self {
            path,
            src,
            statements,
            created: Vec::new(),
            edits: HashMap::new(),
        })
    }

    /// An empty file that does not exist on disk yet.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            src: String::new(),
            statements: Vec::new(),
            created: Vec::new(),
            edits: HashMap::new(),
        }
    }

    /// Where this file lives (or will live once written).
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether any edit or rule creation is queued.
    #[must_use]
    pub fn is_modified(&self) -> bool {
        !self.edits.is_empty() || !self.created.is_empty()
    }

    fn parsed_calls(&self) -> impl Iterator<Item = (usize, &CallStmt)> {
        self.statements.iter().enumerate().filter_map(|(idx, s)| match s {
            Statement::Call(call) => Some((idx, call)),
            Statement::Opaque(_) => None,
        })
    }

    fn call_name<'a>(&'a self, call: &'a CallStmt) -> Option<&'a str> {
        call.args.iter().find_map(|arg| match (&arg.name, &arg.value) {
            (Some(n), ArgValue::Str(v, _)) if n == "name" => Some(v.as_str()),
            _ => None,
        })
    }

    /// The kind of a rule.
    #[must_use]
    pub fn rule_kind(&self, rule: RuleHandle) -> &str {
        match rule.0 {
            RuleRef::Parsed(idx) => match &self.statements[idx] {
                Statement::Call(call) => &call.kind,
                Statement::Opaque(_) => unreachable!("handle always points at a call"),
            },
            RuleRef::Created(idx) => &self.created[idx].kind,
        }
    }

    /// The name of a rule, when it has a literal one.
    #[must_use]
    pub fn rule_name(&self, rule: RuleHandle) -> Option<&str> {
        match rule.0 {
            RuleRef::Parsed(idx) => match &self.statements[idx] {
                Statement::Call(call) => self.call_name(call),
                Statement::Opaque(_) => unreachable!("handle always points at a call"),
            },
            RuleRef::Created(idx) => Some(&self.created[idx].name),
        }
    }

    /// Finds a rule by its `name` attribute.
    #[must_use]
    pub fn find_rule(&self, name: &str) -> Option<RuleHandle> {
        if let Some((idx, _)) = self
            .parsed_calls()
            .find(|(_, call)| self.call_name(call) == Some(name))
        {
            return Some(RuleHandle(RuleRef::Parsed(idx)));
        }
        self.created
            .iter()
            .position(|r| r.name == name)
            .map(|idx| RuleHandle(RuleRef::Created(idx)))
    }

    /// Finds the unique rule that provides this directory's Go package: the
    /// one named rule whose kind is in `kinds`.
    ///
    /// # Errors
    ///
    /// Returns [`DepsyncError::AmbiguousProvider`] when more than one rule
    /// qualifies; the caller skips the package rather than guessing.
    pub fn find_providing_rule(&self, kinds: &[String]) -> Result<Option<RuleHandle>, DepsyncError> {
        let mut found: Option<(RuleHandle, String)> = None;
        let parsed = self
            .parsed_calls()
            .filter(|(_, call)| kinds.iter().any(|k| k == &call.kind))
            .filter_map(|(idx, call)| {
                self.call_name(call)
                    .map(|n| (RuleHandle(RuleRef::Parsed(idx)), n.to_string()))
            });
        let created = self
            .created
            .iter()
            .enumerate()
            .filter(|(_, r)| kinds.iter().any(|k| k == &r.kind))
            .map(|(idx, r)| (RuleHandle(RuleRef::Created(idx)), r.name.clone()));
        for (handle, name) in parsed.chain(created) {
            match &found {
                None => found = Some((handle, name)),
                Some((_, first)) => {
                    return Err(DepsyncError::AmbiguousProvider {
                        dir: self
                            .path
                            .parent()
                            .map(|p| p.to_string_lossy().into_owned())
                            .unwrap_or_default(),
                        first: first.clone(),
                        second: name,
                    });
                }
            }
        }
        Ok(found.map(|(handle, _)| handle))
    }

    /// Reads an attribute, reflecting any edit already queued this run.
    #[must_use]
    pub fn attr(&self, rule: RuleHandle, attr: &str) -> Attr {
        match rule.0 {
            RuleRef::Parsed(idx) => {
                if let Some(values) = self.edits.get(&(idx, attr.to_string())) {
                    return Attr::Strings(values.clone());
                }
                let Statement::Call(call) = &self.statements[idx] else {
                    unreachable!("handle always points at a call");
                };
                match call.args.iter().find(|a| a.name.as_deref() == Some(attr)) {
                    None => Attr::Absent,
                    Some(arg) => match &arg.value {
                        ArgValue::Str(v, _) => Attr::Strings(vec![v.clone()]),
                        ArgValue::List(items, _) => Attr::Strings(items.clone()),
                        ArgValue::Opaque(_) => Attr::Other,
                    },
                }
            }
            RuleRef::Created(idx) => self.created[idx]
                .attrs
                .iter()
                .find(|(n, _)| n == attr)
                .map_or(Attr::Absent, |(_, v)| Attr::Strings(v.clone())),
        }
    }

    /// Queues a replacement of `attr` with the given string list.
    pub fn set_attr_strings(&mut self, rule: RuleHandle, attr: &str, values: Vec<String>) {
        match rule.0 {
            RuleRef::Parsed(idx) => {
                self.edits.insert((idx, attr.to_string()), values);
            }
            RuleRef::Created(idx) => {
                let attrs = &mut self.created[idx].attrs;
                if let Some(slot) = attrs.iter_mut().find(|(n, _)| n == attr) {
                    slot.1 = values;
                } else {
                    attrs.push((attr.to_string(), values));
                }
            }
        }
    }

    /// Creates a new rule of the given kind, appended at the end of the file.
    pub fn create_rule(&mut self, kind: &str, name: &str) -> RuleHandle {
        self.created.push(NewRule {
            kind: kind.to_string(),
            name: name.to_string(),
            attrs: Vec::new(),
        });
        RuleHandle(RuleRef::Created(self.created.len() - 1))
    }

    /// Renders the file with all queued edits applied.
    ///
    /// Statements without edits are reproduced from their original spans, so
    /// a render with no queued edits is byte-identical to the input.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.src.len() + 256);
        for (idx, stmt) in self.statements.iter().enumerate() {
            match stmt {
                Statement::Opaque(span) => out.push_str(&self.src[span.clone()]),
                Statement::Call(call) => {
                    let edits: Vec<(&str, &Vec<String>)> = self
                        .edits
                        .iter()
                        .filter(|((i, _), _)| *i == idx)
                        .map(|((_, attr), values)| (attr.as_str(), values))
                        .collect();
                    if edits.is_empty() {
                        out.push_str(&self.src[call.span.clone()]);
                    } else {
                        out.push_str(&self.patch_call(call, edits));
                    }
                }
            }
        }
        for rule in &self.created {
            if !out.is_empty() {
                if !out.ends_with('\n') {
                    out.push('\n');
                }
                if !out.ends_with("\n\n") {
                    out.push('\n');
                }
            }
            out.push_str(&render_new_rule(rule));
        }
        out
    }

    /// Applies attribute edits to one call statement's text.
    fn patch_call(&self, call: &CallStmt, mut edits: Vec<(&str, &Vec<String>)>) -> String {
        edits.sort_by_key(|(attr, _)| (attr_order(attr), attr.to_string()));

        let base = call.span.start;
        let mut segment = self.src[call.span.clone()].to_string();
        // (relative offset, replaced length, replacement text)
        let mut ops: Vec<(usize, usize, String)> = Vec::new();
        let mut inserted: Vec<String> = Vec::new();

        for (attr, values) in edits {
            let existing = call.args.iter().find(|a| a.name.as_deref() == Some(attr));
            if let Some(arg) = existing {
                let span = arg.value.span();
                ops.push((span.start - base, span.end - span.start, render_value(values)));
            } else {
                inserted.push(format!("{attr} = {}", render_value(values)));
            }
        }

        if !inserted.is_empty() {
            let close_rel = call.close_offset - base;
            let line_start = segment[..close_rel].rfind('\n').map_or(0, |i| i + 1);
            let own_line = segment[line_start..close_rel].trim().is_empty();
            if own_line {
                let text: String =
                    inserted.iter().map(|entry| format!("    {entry},\n")).collect();
                ops.push((line_start, 0, text));
            } else {
                let joiner = match segment[..close_rel].trim_end().chars().last() {
                    Some('(') => "",
                    Some(',') => " ",
                    _ => ", ",
                };
                ops.push((close_rel, 0, format!("{joiner}{}", inserted.join(", "))));
            }
        }

        ops.sort_by(|a, b| b.0.cmp(&a.0));
        for (offset, len, text) in ops {
            segment.replace_range(offset..offset + len, &text);
        }
        segment
    }
}

/// Managed attributes first, in conventional order; anything else after.
fn attr_order(attr: &str) -> u8 {
    match attr {
        "name" => 0,
        "srcs" => 1,
        "deps" => 2,
        _ => 3,
    }
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Renders a string list: inline up to one element, one-per-line beyond that.
fn render_value(values: &[String]) -> String {
    match values {
        [] => "[]".to_string(),
        [single] => format!("[\"{}\"]", escape(single)),
        items => {
            let mut out = String::from("[\n");
            for item in items {
                out.push_str(&format!("        \"{}\",\n", escape(item)));
            }
            out.push_str("    ]");
            out
        }
    }
}

fn render_new_rule(rule: &NewRule) -> String {
    let mut out = format!("{}(\n    name = \"{}\",\n", rule.kind, escape(&rule.name));
    for (attr, values) in &rule.attrs {
        out.push_str(&format!("    {attr} = {},\n", render_value(values)));
    }
    out.push_str(")\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIMPLE: &str = "# Libraries for the util package.\n\ngo_library(\n    name = \"util\",\n    srcs = [\"util.go\"],\n    deps = [\"//common\"],\n    visibility = [\"PUBLIC\"],\n)\n";

    #[test]
    fn test_untouched_render_is_byte_identical() {
        let file = RuleFile::parse("pkg/BUILD", SIMPLE).unwrap();
        assert!(!file.is_modified());
        assert_eq!(file.render(), SIMPLE);
    }

    #[test]
    fn test_set_attr_touches_only_that_attr() {
        let mut file = RuleFile::parse("pkg/BUILD", SIMPLE).unwrap();
        let rule = file.find_rule("util").unwrap();
        file.set_attr_strings(
            rule,
            "deps",
            vec!["//common".to_string(), "//other:lib".to_string()],
        );
        let out = file.render();
        assert!(out.contains("# Libraries for the util package."));
        assert!(out.contains("visibility = [\"PUBLIC\"],"));
        assert!(out.contains("srcs = [\"util.go\"],"));
        assert!(out.contains("\"//common\",\n        \"//other:lib\",\n    ],"));
    }

    #[test]
    fn test_set_attr_inserts_missing_attr() {
        let src = "go_library(\n    name = \"util\",\n    srcs = [\"util.go\"],\n)\n";
        let mut file = RuleFile::parse("pkg/BUILD", src).unwrap();
        let rule = file.find_rule("util").unwrap();
        file.set_attr_strings(rule, "deps", vec!["//common".to_string()]);
        assert_eq!(
            file.render(),
            "go_library(\n    name = \"util\",\n    srcs = [\"util.go\"],\n    deps = [\"//common\"],\n)\n"
        );
    }

    #[test]
    fn test_insert_into_single_line_rule() {
        let src = "go_library(name = \"util\", srcs = [\"util.go\"])\n";
        let mut file = RuleFile::parse("pkg/BUILD", src).unwrap();
        let rule = file.find_rule("util").unwrap();
        file.set_attr_strings(rule, "deps", vec!["//common".to_string()]);
        assert_eq!(
            file.render(),
            "go_library(name = \"util\", srcs = [\"util.go\"], deps = [\"//common\"])\n"
        );
    }

    #[test]
    fn test_create_rule_in_empty_file() {
        let mut file = RuleFile::empty("pkg/BUILD");
        let rule = file.create_rule("go_library", "pkg");
        file.set_attr_strings(rule, "srcs", vec!["pkg.go".to_string()]);
        file.set_attr_strings(
            rule,
            "deps",
            vec!["//a:b".to_string(), "//c".to_string()],
        );
        assert_eq!(
            file.render(),
            "go_library(\n    name = \"pkg\",\n    srcs = [\"pkg.go\"],\n    deps = [\n        \"//a:b\",\n        \"//c\",\n    ],\n)\n"
        );
    }

    #[test]
    fn test_create_rule_appends_after_existing_content() {
        let src = "subinclude(\"//build_defs:go\")\n";
        let mut file = RuleFile::parse("pkg/BUILD", src).unwrap();
        let rule = file.create_rule("go_library", "pkg");
        file.set_attr_strings(rule, "srcs", vec!["pkg.go".to_string()]);
        let out = file.render();
        assert_eq!(
            out,
            "subinclude(\"//build_defs:go\")\n\ngo_library(\n    name = \"pkg\",\n    srcs = [\"pkg.go\"],\n)\n"
        );
    }

    #[test]
    fn test_find_providing_rule() {
        let kinds = vec!["go_library".to_string(), "go_binary".to_string()];
        let src = "go_test(\n    name = \"util_test\",\n    srcs = [\"util_test.go\"],\n)\n\ngo_library(\n    name = \"util\",\n    srcs = [\"util.go\"],\n)\n";
        let file = RuleFile::parse("pkg/BUILD", src).unwrap();
        let rule = file.find_providing_rule(&kinds).unwrap().unwrap();
        assert_eq!(file.rule_name(rule), Some("util"));
        assert_eq!(file.rule_kind(rule), "go_library");
    }

    #[test]
    fn test_ambiguous_provider_is_an_error() {
        let kinds = vec!["go_library".to_string()];
        let src = "go_library(name = \"a\")\n\ngo_library(name = \"b\")\n";
        let file = RuleFile::parse("pkg/BUILD", src).unwrap();
        let err = file.find_providing_rule(&kinds).unwrap_err();
        assert!(matches!(err, DepsyncError::AmbiguousProvider { .. }));
    }

    #[test]
    fn test_attr_views() {
        let src = "go_library(\n    name = \"util\",\n    srcs = glob([\"*.go\"]),\n    deps = [\"//a\"],\n)\n";
        let file = RuleFile::parse("pkg/BUILD", src).unwrap();
        let rule = file.find_rule("util").unwrap();
        assert_eq!(file.attr(rule, "srcs"), Attr::Other);
        assert_eq!(file.attr(rule, "deps"), Attr::Strings(vec!["//a".to_string()]));
        assert_eq!(file.attr(rule, "keep_deps"), Attr::Absent);
    }

    #[test]
    fn test_attr_reflects_queued_edit() {
        let src = "go_library(\n    name = \"util\",\n    deps = [\"//a\"],\n)\n";
        let mut file = RuleFile::parse("pkg/BUILD", src).unwrap();
        let rule = file.find_rule("util").unwrap();
        file.set_attr_strings(rule, "deps", vec!["//b".to_string()]);
        assert_eq!(file.attr(rule, "deps"), Attr::Strings(vec!["//b".to_string()]));
    }

    #[test]
    fn test_created_rule_is_findable() {
        let mut file = RuleFile::empty("pkg/BUILD");
        file.create_rule("go_library", "pkg");
        let rule = file.find_rule("pkg").unwrap();
        assert_eq!(file.rule_kind(rule), "go_library");
        let kinds = vec!["go_library".to_string()];
        assert!(file.find_providing_rule(&kinds).unwrap().is_some());
    }

    #[test]
    fn test_unrelated_rules_survive_edits() {
        let src = "go_library(\n    name = \"a\",\n    deps = [\"//x\"],\n)\n\ngo_binary(\n    name = \"tool\",\n    srcs = [\"main.go\"],\n    definitions = {\"main.version\": \"1.0\"},\n)\n";
        let mut file = RuleFile::parse("pkg/BUILD", src).unwrap();
        let rule = file.find_rule("a").unwrap();
        file.set_attr_strings(rule, "deps", vec!["//y".to_string()]);
        let out = file.render();
        assert!(out.contains("definitions = {\"main.version\": \"1.0\"},"));
        assert!(out.contains("deps = [\"//y\"],"));
        assert!(!out.contains("\"//x\""));
    }
}
