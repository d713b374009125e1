//! Build label formatting and parsing.
//!
//! A build label is the canonical address of a rule. depsync produces and
//! consumes exactly five textual forms:
//!
//! | Form | Meaning |
//! |------|---------|
//! | `:name` | target in the current package (resolved where the label is used) |
//! | `//:name` | target in the workspace root package |
//! | `//pkg/dir:name` | target in a package directory |
//! | `//pkg/dir` | shorthand when the target name equals the last directory segment |
//! | `///subrepo//...` | any of the above, qualified with a subrepository |
//!
//! Because the same address can be spelled several ways (`//foo` and
//! `//foo:foo` are the same target), all comparisons inside depsync go through
//! [`BuildLabel::parse`], which normalizes shorthands into one canonical
//! tuple. [`BuildLabel`] implements `Eq` and `Hash` on that tuple so labels
//! can be diffed as plain set members.
//!
//! # Examples
//!
//! ```rust
//! use depsync::label::BuildLabel;
//!
//! assert_eq!(BuildLabel::format("foo", "pkg", ""), "//pkg:foo");
//! assert_eq!(BuildLabel::format("foo", "foo", ""), "//foo");
//!
//! let a = BuildLabel::parse("//foo").unwrap();
//! let b = BuildLabel::parse("//foo:foo").unwrap();
//! assert_eq!(a, b);
//! ```

use crate::core::DepsyncError;

/// Canonical address of a build rule.
///
/// - `subrepo`: cross-repository qualifier, `None` for the host workspace.
/// - `package`: workspace-relative package directory. `"."` is the workspace
///   root package; the empty string means "the current package", i.e. a
///   package-relative label that only becomes absolute once it is known where
///   it is used (see [`BuildLabel::resolve_relative`]).
/// - `name`: the rule name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BuildLabel {
    /// Subrepository qualifier, if any.
    pub subrepo: Option<String>,
    /// Package directory (`"."` = root, `""` = current package).
    pub package: String,
    /// Rule name.
    pub name: String,
}

impl BuildLabel {
    /// Builds a label for a rule in the host workspace.
    #[must_use]
    pub fn new(package: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            subrepo: None,
            package: package.into(),
            name: name.into(),
        }
    }

    /// Renders the canonical string form of a `(name, package, subrepo)`
    /// tuple.
    ///
    /// The rules are applied in order:
    ///
    /// 1. A non-empty `subrepo` wraps the rest as `///<subrepo>//<rest>`.
    /// 2. An empty `pkg_dir` renders as the package-relative `:<name>`.
    /// 3. `"."` (the workspace root package) renders as `//:<name>`.
    /// 4. Otherwise `//<pkg_dir>:<name>`, shortened to `//<pkg_dir>` when the
    ///    last path segment of `pkg_dir` equals `name`.
    ///
    /// An empty `pkg_dir` combined with a non-empty `subrepo` means the root
    /// package of that subrepo; both `""` and `"."` render as
    /// `///<subrepo>//:<name>`.
    #[must_use]
    pub fn format(name: &str, pkg_dir: &str, subrepo: &str) -> String {
        if !subrepo.is_empty() {
            let pkg = if pkg_dir == "." { "" } else { pkg_dir };
            let local = Self::format(name, pkg, "");
            return if let Some(stripped) = local.strip_prefix("//") {
                format!("///{subrepo}//{stripped}")
            } else {
                format!("///{subrepo}//{local}")
            };
        }
        if pkg_dir.is_empty() {
            return format!(":{name}");
        }
        if pkg_dir == "." {
            return format!("//:{name}");
        }
        let last = pkg_dir.rsplit('/').next().unwrap_or(pkg_dir);
        if last == name {
            format!("//{pkg_dir}")
        } else {
            format!("//{pkg_dir}:{name}")
        }
    }

    /// Parses any of the five accepted label forms into a canonical tuple.
    ///
    /// Shorthands are normalized so that spelling differences compare equal:
    /// `//foo` parses to the same tuple as `//foo:foo`, and
    /// `///repo//:n` to the same tuple as the root package of `repo`.
    ///
    /// # Errors
    ///
    /// Returns [`DepsyncError::InvalidLabel`] for anything outside the five
    /// forms, including empty rule names and packages with empty segments.
    pub fn parse(label: &str) -> Result<Self, DepsyncError> {
        let invalid = |reason: &str| DepsyncError::InvalidLabel {
            label: label.to_string(),
            reason: reason.to_string(),
        };

        if let Some(rest) = label.strip_prefix("///") {
            let sep = rest
                .find("//")
                .ok_or_else(|| invalid("missing '//' after subrepo name"))?;
            let subrepo = &rest[..sep];
            if subrepo.is_empty() {
                return Err(invalid("empty subrepo name"));
            }
            let mut inner = Self::parse_absolute(&rest[sep..], label)?;
            inner.subrepo = Some(subrepo.to_string());
            return Ok(inner);
        }
        if label.starts_with("//") {
            return Self::parse_absolute(label, label);
        }
        if let Some(name) = label.strip_prefix(':') {
            if name.is_empty() {
                return Err(invalid("empty rule name"));
            }
            return Ok(Self {
                subrepo: None,
                package: String::new(),
                name: name.to_string(),
            });
        }
        Err(invalid("labels must start with ':', '//' or '///'"))
    }

    /// Parses the `//...` body shared by plain and subrepo-qualified labels.
    fn parse_absolute(body: &str, original: &str) -> Result<Self, DepsyncError> {
        let invalid = |reason: &str| DepsyncError::InvalidLabel {
            label: original.to_string(),
            reason: reason.to_string(),
        };

        let body = body.strip_prefix("//").ok_or_else(|| invalid("expected '//'"))?;
        let (package, name) = match body.find(':') {
            Some(0) => (".".to_string(), body[1..].to_string()),
            Some(idx) => (body[..idx].to_string(), body[idx + 1..].to_string()),
            None => {
                // Shorthand: the target name is the last directory segment.
                let last = body.rsplit('/').next().unwrap_or(body);
                (body.to_string(), last.to_string())
            }
        };
        if name.is_empty() {
            return Err(invalid("empty rule name"));
        }
        if package != "." && (package.is_empty() || package.split('/').any(str::is_empty)) {
            return Err(invalid("empty package segment"));
        }
        Ok(Self {
            subrepo: None,
            package,
            name,
        })
    }

    /// Makes a package-relative label (`:name`) absolute by filling in the
    /// package directory it was declared in. Absolute labels are returned
    /// unchanged.
    #[must_use]
    pub fn resolve_relative(mut self, pkg_dir: &str) -> Self {
        if self.subrepo.is_none() && self.package.is_empty() {
            self.package = if pkg_dir.is_empty() { ".".to_string() } else { pkg_dir.to_string() };
        }
        self
    }
}

impl std::fmt::Display for BuildLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let subrepo = self.subrepo.as_deref().unwrap_or("");
        write!(f, "{}", Self::format(&self.name, &self.package, subrepo))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_forms() {
        assert_eq!(BuildLabel::format("foo", "", ""), ":foo");
        assert_eq!(BuildLabel::format("foo", ".", ""), "//:foo");
        assert_eq!(BuildLabel::format("foo", "pkg", ""), "//pkg:foo");
        assert_eq!(BuildLabel::format("foo", "foo", ""), "//foo");
        assert_eq!(BuildLabel::format("foo", "pkg", "repo"), "///repo//pkg:foo");
        assert_eq!(BuildLabel::format("foo", ".", "repo"), "///repo//:foo");
        assert_eq!(BuildLabel::format("foo", "", "repo"), "///repo//:foo");
    }

    #[test]
    fn test_format_nested_shorthand() {
        assert_eq!(BuildLabel::format("bar", "pkg/bar", ""), "//pkg/bar");
        assert_eq!(BuildLabel::format("baz", "pkg/bar", ""), "//pkg/bar:baz");
    }

    #[test]
    fn test_parse_forms() {
        assert_eq!(
            BuildLabel::parse(":foo").unwrap(),
            BuildLabel {
                subrepo: None,
                package: String::new(),
                name: "foo".to_string()
            }
        );
        assert_eq!(
            BuildLabel::parse("//:foo").unwrap(),
            BuildLabel::new(".", "foo")
        );
        assert_eq!(
            BuildLabel::parse("//pkg/dir:foo").unwrap(),
            BuildLabel::new("pkg/dir", "foo")
        );
        assert_eq!(
            BuildLabel::parse("//pkg/dir").unwrap(),
            BuildLabel::new("pkg/dir", "dir")
        );
        assert_eq!(
            BuildLabel::parse("///repo//pkg:foo").unwrap(),
            BuildLabel {
                subrepo: Some("repo".to_string()),
                package: "pkg".to_string(),
                name: "foo".to_string()
            }
        );
        assert_eq!(
            BuildLabel::parse("///third_party/go/mod//:module").unwrap(),
            BuildLabel {
                subrepo: Some("third_party/go/mod".to_string()),
                package: ".".to_string(),
                name: "module".to_string()
            }
        );
    }

    #[test]
    fn test_shorthand_equivalence() {
        assert_eq!(
            BuildLabel::parse("//foo").unwrap(),
            BuildLabel::parse("//foo:foo").unwrap()
        );
        assert_eq!(BuildLabel::format("foo", "foo", ""), "//foo");
    }

    #[test]
    fn test_format_parse_round_trip() {
        let cases = [
            ("foo", ".", ""),
            ("foo", "pkg", ""),
            ("foo", "foo", ""),
            ("bar", "pkg/nested/dir", ""),
            ("dir", "pkg/nested/dir", ""),
            ("foo", "pkg", "repo"),
            ("foo", ".", "repo"),
            ("module", "pkg", "third_party/go/mod"),
        ];
        for (name, pkg, subrepo) in cases {
            let rendered = BuildLabel::format(name, pkg, subrepo);
            let parsed = BuildLabel::parse(&rendered).unwrap();
            assert_eq!(parsed.name, name, "name for {rendered}");
            assert_eq!(parsed.package, pkg, "package for {rendered}");
            assert_eq!(
                parsed.subrepo.as_deref().unwrap_or(""),
                subrepo,
                "subrepo for {rendered}"
            );
            // Rendering the parsed tuple gives back the same string.
            assert_eq!(parsed.to_string(), rendered);
        }
    }

    #[test]
    fn test_relative_round_trip() {
        let parsed = BuildLabel::parse(":foo").unwrap();
        assert_eq!(parsed.to_string(), ":foo");
        let absolute = parsed.resolve_relative("pkg/dir");
        assert_eq!(absolute, BuildLabel::new("pkg/dir", "foo"));
    }

    #[test]
    fn test_resolve_relative_leaves_absolute_alone() {
        let label = BuildLabel::parse("//other:foo").unwrap();
        assert_eq!(
            label.clone().resolve_relative("pkg"),
            BuildLabel::new("other", "foo")
        );
        let root = BuildLabel::parse(":foo").unwrap().resolve_relative(".");
        assert_eq!(root, BuildLabel::new(".", "foo"));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(BuildLabel::parse("foo").is_err());
        assert!(BuildLabel::parse(":").is_err());
        assert!(BuildLabel::parse("//").is_err());
        assert!(BuildLabel::parse("//:").is_err());
        assert!(BuildLabel::parse("//pkg:").is_err());
        assert!(BuildLabel::parse("//pkg//dir:foo").is_err());
        assert!(BuildLabel::parse("/////:foo").is_err());
        assert!(BuildLabel::parse("///repo:foo").is_err());
    }
}
