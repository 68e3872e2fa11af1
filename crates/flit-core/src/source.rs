//! Migration sources: where migration names and SQL text come from.
//!
//! Names are `/`-separated paths relative to the source root, e.g.
//! `example/001-first.sql`. Patterns use shell glob syntax; `*`, `?` and
//! `[...]` never match across a `/`, while `**` matches any number of
//! directories.

use crate::error::{FlitError, FlitResult};
use glob::{MatchOptions, Pattern};
use std::path::{Path, PathBuf};

/// Options every source matches names with.
pub(crate) const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// A read-only, name-addressable collection of migration files.
pub trait MigrationSource: Send + Sync {
    /// Names matching `pattern`, in no particular order.
    fn list(&self, pattern: &str) -> FlitResult<Vec<String>>;

    /// Full text of the migration called `name`.
    fn read(&self, name: &str) -> FlitResult<String>;
}

/// Parse a glob pattern, rejecting patterns that could escape the source
/// root.
pub fn compile_pattern(pattern: &str) -> FlitResult<Pattern> {
    let bad = |message: &str| FlitError::Discovery {
        pattern: pattern.to_string(),
        message: message.to_string(),
    };

    if pattern.is_empty() {
        return Err(bad("pattern is empty"));
    }
    if pattern.starts_with('/') || pattern.starts_with('\\') {
        return Err(bad("pattern must be relative to the migration root"));
    }
    if pattern.split('/').any(|segment| segment == "..") {
        return Err(bad("pattern must not contain '..'"));
    }
    // Names never carry `.` segments, so such a pattern could only match
    // nothing.
    if pattern.split('/').any(|segment| segment == ".") {
        return Err(bad("pattern must not contain '.' segments"));
    }

    Pattern::new(pattern).map_err(|e| bad(&e.to_string()))
}

/// Migrations stored as files under a directory.
#[derive(Debug, Clone)]
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    /// Read migrations from files under `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The directory names are resolved against
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Walk `dir` collecting files whose relative name matches `pattern`.
    ///
    /// `depth` bounds how many directory levels a match may sit under; `None`
    /// means unbounded (the pattern uses `**`).
    fn collect(
        &self,
        dir: &Path,
        prefix: &str,
        depth: Option<usize>,
        pattern: &Pattern,
        names: &mut Vec<String>,
    ) -> FlitResult<()> {
        let listing_error = |e: std::io::Error| FlitError::Discovery {
            pattern: pattern.as_str().to_string(),
            message: format!("{}: {}", dir.display(), e),
        };

        for entry in std::fs::read_dir(dir).map_err(listing_error)? {
            let entry = entry.map_err(listing_error)?;
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                log::warn!("Skipping non-UTF-8 path under {}", dir.display());
                continue;
            };
            let name = format!("{prefix}{file_name}");
            let path = entry.path();
            let file_type = entry.file_type().map_err(listing_error)?;

            if file_type.is_symlink() && path.is_dir() {
                // Directory links may form cycles.
                log::debug!("Not following directory link {}", path.display());
            } else if file_type.is_dir() {
                match depth {
                    Some(0) => {}
                    Some(n) => {
                        self.collect(&path, &format!("{name}/"), Some(n - 1), pattern, names)?
                    }
                    None => self.collect(&path, &format!("{name}/"), None, pattern, names)?,
                }
            } else if pattern.matches_with(&name, MATCH_OPTIONS) {
                names.push(name);
            }
        }

        Ok(())
    }
}

impl MigrationSource for DirSource {
    fn list(&self, pattern: &str) -> FlitResult<Vec<String>> {
        let compiled = compile_pattern(pattern)?;
        let depth = if pattern.contains("**") {
            None
        } else {
            Some(pattern.matches('/').count())
        };

        let mut names = Vec::new();
        self.collect(&self.root, "", depth, &compiled, &mut names)?;
        Ok(names)
    }

    fn read(&self, name: &str) -> FlitResult<String> {
        let path = self.root.join(name);
        std::fs::read_to_string(&path).map_err(|e| FlitError::Read {
            name: name.to_string(),
            message: format!("{}: {}", path.display(), e),
        })
    }
}

/// Migrations held in memory, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    files: Vec<(String, String)>,
}

impl MemorySource {
    /// Create an empty source
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a migration, replacing any previous text stored under `name`
    pub fn insert(&mut self, name: impl Into<String>, sql: impl Into<String>) -> &mut Self {
        let name = name.into();
        let sql = sql.into();
        match self.files.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = sql,
            None => self.files.push((name, sql)),
        }
        self
    }

    /// Builder-style [`insert`](Self::insert)
    pub fn with(mut self, name: impl Into<String>, sql: impl Into<String>) -> Self {
        self.insert(name, sql);
        self
    }
}

impl MigrationSource for MemorySource {
    fn list(&self, pattern: &str) -> FlitResult<Vec<String>> {
        let compiled = compile_pattern(pattern)?;
        Ok(self
            .files
            .iter()
            .filter(|(name, _)| compiled.matches_with(name, MATCH_OPTIONS))
            .map(|(name, _)| name.clone())
            .collect())
    }

    fn read(&self, name: &str) -> FlitResult<String> {
        self.files
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, sql)| sql.clone())
            .ok_or_else(|| FlitError::Read {
                name: name.to_string(),
                message: "no such migration".to_string(),
            })
    }
}

/// Migrations compiled into the binary with `rust-embed`.
///
/// ```rust,ignore
/// #[derive(rust_embed::Embed)]
/// #[folder = "migrations/"]
/// struct Migrations;
///
/// let source = EmbeddedSource::<Migrations>::new();
/// ```
#[cfg(feature = "embed")]
pub struct EmbeddedSource<E> {
    _assets: std::marker::PhantomData<fn() -> E>,
}

#[cfg(feature = "embed")]
impl<E: rust_embed::Embed> EmbeddedSource<E> {
    /// Read migrations from the assets embedded in `E`
    pub fn new() -> Self {
        Self {
            _assets: std::marker::PhantomData,
        }
    }
}

#[cfg(feature = "embed")]
impl<E: rust_embed::Embed> Default for EmbeddedSource<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "embed")]
impl<E: rust_embed::Embed> MigrationSource for EmbeddedSource<E> {
    fn list(&self, pattern: &str) -> FlitResult<Vec<String>> {
        let compiled = compile_pattern(pattern)?;
        Ok(E::iter()
            .filter(|name| compiled.matches_with(name, MATCH_OPTIONS))
            .map(|name| name.into_owned())
            .collect())
    }

    fn read(&self, name: &str) -> FlitResult<String> {
        let file = E::get(name).ok_or_else(|| FlitError::Read {
            name: name.to_string(),
            message: "not embedded".to_string(),
        })?;
        String::from_utf8(file.data.into_owned()).map_err(|e| FlitError::Read {
            name: name.to_string(),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
#[path = "source_test.rs"]
mod tests;
