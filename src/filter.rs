//! Selection and renaming of source files by project root.
//!
//! A [`PathFilter`] holds a root prefix and a filter fragment. A filename
//! is of interest when it starts with the root and the rest of it contains
//! the fragment; the rest is then used as the file's project-relative name.
//! Both values are compared literally, so characters such as `.` or `+` in a
//! directory name carry no special meaning.

use std::path::{Component, Path, PathBuf, MAIN_SEPARATOR};

use crate::error::{Result, ShimError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathFilter {
    root: String,
    pattern: String,
}

impl PathFilter {
    /// Build a filter from an already-normalized root prefix.
    ///
    /// The root is used verbatim. Use [`PathFilter::for_root_dir`] to start
    /// from a user-supplied directory.
    pub fn new(root: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            pattern: pattern.into(),
        }
    }

    /// Build a filter for `dir` (or the current directory), normalized with
    /// [`normalize_root`].
    pub fn for_root_dir(dir: Option<&Path>, pattern: impl Into<String>) -> Result<Self> {
        Ok(Self::new(normalize_root(dir)?, pattern))
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Return the project-relative name for `filename`, or `None` when the
    /// file lies outside the root or does not contain the pattern.
    pub fn matches<'a>(&self, filename: &'a str) -> Option<&'a str> {
        let rest = filename.strip_prefix(self.root.as_str())?;
        rest.contains(self.pattern.as_str()).then_some(rest)
    }
}

/// Turn `dir` into an absolute root prefix ending in a separator.
///
/// Relative directories are resolved against the current directory and `.`
/// and `..` components are removed lexically (symlinks are not followed).
/// The filesystem root stays a single separator.
pub fn normalize_root(dir: Option<&Path>) -> Result<String> {
    let cwd = std::env::current_dir()?;
    let joined = match dir {
        Some(dir) => cwd.join(dir),
        None => cwd,
    };

    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }

    let mut root = normalized
        .to_str()
        .ok_or_else(|| {
            ShimError::Config(format!(
                "root directory is not valid UTF-8: {}",
                normalized.display()
            ))
        })?
        .to_string();
    if !root.ends_with(MAIN_SEPARATOR) {
        root.push(MAIN_SEPARATOR);
    }
    Ok(root)
}
