//! Dotted names and relative addressing.
//!
//! ```text
//! resolve_name("bar", package = "foo.baz.qux", level = 2)
//!   ├── Drop level-1 trailing segments → "foo.baz"
//!   └── Append name → "foo.baz.bar"
//! ```

use crate::error::{ImportError, ImportResult};
use crate::module::Module;

/// Parsed dotted name with pre-split segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DottedName {
    full_name: String,
    parts: Vec<String>,
}

impl DottedName {
    /// Parse a dotted name.
    ///
    /// Returns `None` for empty names or names with empty segments
    /// (e.g. `.os` or `os..path`).
    pub fn parse(name: &str) -> Option<Self> {
        if name.is_empty() {
            return None;
        }
        let parts: Vec<String> = name.split('.').map(str::to_string).collect();
        if parts.iter().any(String::is_empty) {
            return None;
        }
        Some(Self {
            full_name: name.to_string(),
            parts,
        })
    }

    #[inline]
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    #[inline]
    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    #[inline]
    pub fn is_simple(&self) -> bool {
        self.parts.len() == 1
    }

    #[inline]
    pub fn top_level(&self) -> &str {
        &self.parts[0]
    }

    /// The last segment (the name a unit is bound under in its parent).
    #[inline]
    pub fn tail(&self) -> &str {
        &self.parts[self.parts.len() - 1]
    }

    /// Parent name, or `None` for a top-level name.
    pub fn parent(&self) -> Option<&str> {
        parent_name(&self.full_name)
    }
}

/// Parent of a dotted name, or `None` for a top-level name.
pub fn parent_name(name: &str) -> Option<&str> {
    name.rsplit_once('.').map(|(parent, _)| parent)
}

/// Last segment of a dotted name.
pub fn tail_name(name: &str) -> &str {
    name.rsplit_once('.').map_or(name, |(_, tail)| tail)
}

/// Package a unit named `name` belongs to: itself for packages, its parent
/// otherwise, and the empty string for top-level modules.
pub fn package_of(name: &str, is_package: bool) -> String {
    if is_package {
        name.to_string()
    } else {
        parent_name(name).unwrap_or("").to_string()
    }
}

/// Identity of the unit issuing a relative request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallerContext {
    /// The caller's own dotted name.
    pub name: Option<String>,
    /// Explicitly declared package; takes precedence over `name`.
    pub package: Option<String>,
    /// Whether the caller is itself a package.
    pub is_package: bool,
}

impl CallerContext {
    /// Context with an explicit package.
    #[must_use]
    pub fn with_package(package: impl Into<String>) -> Self {
        Self {
            package: Some(package.into()),
            ..Default::default()
        }
    }

    /// Context derived only from the caller's name.
    #[must_use]
    pub fn with_name(name: impl Into<String>, is_package: bool) -> Self {
        Self {
            name: Some(name.into()),
            package: None,
            is_package,
        }
    }

    /// Context describing a loaded unit.
    #[must_use]
    pub fn for_module(module: &Module) -> Self {
        Self {
            name: Some(module.name().to_string()),
            package: module.package(),
            is_package: module.is_package(),
        }
    }

    /// The package relative requests are anchored at.
    pub fn package_name(&self) -> ImportResult<String> {
        if let Some(package) = &self.package {
            return Ok(package.clone());
        }
        match &self.name {
            Some(name) if DottedName::parse(name).is_some() => {
                Ok(package_of(name, self.is_package))
            }
            Some(name) => Err(ImportError::relative(format!(
                "caller name {name:?} is not a valid dotted name"
            ))),
            None => Err(ImportError::relative(
                "relative import with no caller context",
            )),
        }
    }
}

/// Turn `(name, package, level)` into an absolute dotted name.
///
/// `level == 0` returns `name` unchanged (after rejecting an empty name).
/// `level >= 1` anchors at `package`, dropping `level - 1` trailing segments.
pub fn resolve_name(name: &str, package: &str, level: usize) -> ImportResult<String> {
    if level == 0 {
        if name.is_empty() {
            return Err(ImportError::EmptyName);
        }
        return Ok(name.to_string());
    }

    if package.is_empty() {
        return Err(ImportError::relative(
            "attempted relative import with no known parent package",
        ));
    }
    if DottedName::parse(package).is_none() {
        return Err(ImportError::relative(format!(
            "package {package:?} is not a valid dotted name"
        )));
    }

    let parts: Vec<&str> = package.split('.').collect();
    if level > parts.len() {
        return Err(ImportError::relative(format!(
            "attempted relative import beyond top-level package (level={level}, package={package})"
        )));
    }

    let base = parts[..parts.len() - (level - 1)].join(".");
    if name.is_empty() {
        Ok(base)
    } else {
        Ok(format!("{base}.{name}"))
    }
}

/// Split a request like `..pkg.mod` into its level and the remaining name.
pub fn split_relative(name: &str) -> (usize, &str) {
    let rest = name.trim_start_matches('.');
    (name.len() - rest.len(), rest)
}
