//! Resource trees holding template files.
//!
//! A target ships a built-in tree (usually a [`StaticSource`] baked into the
//! binary with `include_str!`); a run may supply an override tree, typically a
//! [`DirSource`] pointing at a user's template directory. Paths are always
//! slash-separated and relative to the tree root.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Component, Path, PathBuf};

use crate::error::{io_err, SourceError};

/// A read-only tree of template resources.
pub trait TemplateSource: Send + Sync + fmt::Debug {
    /// Read the resource at `path`.
    ///
    /// A missing resource is reported as [`SourceError::NotFound`] so callers
    /// can treat optional resources as absent.
    fn read(&self, path: &str) -> Result<Vec<u8>, SourceError>;

    /// Every file in the tree, sorted.
    fn files(&self) -> Result<Vec<String>, SourceError>;
}

// ---------------------------------------------------------------------------
// StaticSource
// ---------------------------------------------------------------------------

/// In-memory resource tree.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    entries: BTreeMap<String, Vec<u8>>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a `(path, content)` table, e.g. one filled by `include_str!`.
    pub fn from_static(entries: &[(&str, &str)]) -> Self {
        let mut source = Self::new();
        for (path, content) in entries {
            source.insert(*path, *content);
        }
        source
    }

    pub fn with(mut self, path: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        self.insert(path, content);
        self
    }

    pub fn insert(&mut self, path: impl Into<String>, content: impl Into<Vec<u8>>) {
        self.entries
            .insert(normalize(&path.into()), content.into());
    }
}

impl TemplateSource for StaticSource {
    fn read(&self, path: &str) -> Result<Vec<u8>, SourceError> {
        self.entries
            .get(&normalize(path))
            .cloned()
            .ok_or_else(|| SourceError::NotFound {
                path: path.to_string(),
            })
    }

    fn files(&self) -> Result<Vec<String>, SourceError> {
        Ok(self.entries.keys().cloned().collect())
    }
}

// ---------------------------------------------------------------------------
// DirSource
// ---------------------------------------------------------------------------

/// Resource tree backed by a directory on disk.
#[derive(Debug, Clone)]
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, SourceError> {
        let rel = Path::new(path);
        let escapes = rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(SourceError::InvalidPath {
                path: path.to_string(),
            });
        }
        Ok(self.root.join(rel))
    }
}

impl TemplateSource for DirSource {
    fn read(&self, path: &str) -> Result<Vec<u8>, SourceError> {
        let full = self.resolve(path)?;
        match std::fs::read(&full) {
            Ok(buf) => Ok(buf),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(SourceError::NotFound {
                path: path.to_string(),
            }),
            Err(e) => Err(io_err(full, e)),
        }
    }

    fn files(&self) -> Result<Vec<String>, SourceError> {
        let mut found = Vec::new();
        collect_files(&self.root, &mut found)?;
        let mut files: Vec<String> = found
            .iter()
            .filter_map(|p| p.strip_prefix(&self.root).ok())
            .map(|rel| rel.to_string_lossy().replace('\\', "/"))
            .collect();
        files.sort();
        Ok(files)
    }
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), SourceError> {
    let entries = std::fs::read_dir(dir).map_err(|e| io_err(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| io_err(dir, e))?;
        let path = entry.path();
        let meta = entry.metadata().map_err(|e| io_err(&path, e))?;
        if meta.is_dir() {
            collect_files(&path, out)?;
        } else if meta.is_file() {
            out.push(path);
        }
    }
    Ok(())
}

fn normalize(path: &str) -> String {
    path.replace('\\', "/").trim_start_matches("./").to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn static_source_reads_and_lists_sorted() {
        let src = StaticSource::from_static(&[
            ("table.sql.tera", "TABLE"),
            ("header.sql.tera", "HEADER"),
        ]);
        assert_eq!(src.read("table.sql.tera").unwrap(), b"TABLE");
        assert_eq!(
            src.files().unwrap(),
            vec!["header.sql.tera".to_string(), "table.sql.tera".to_string()]
        );
    }

    #[test]
    fn static_source_missing_is_not_found() {
        let err = StaticSource::new().read("funcs.lua").unwrap_err();
        assert!(err.is_not_found(), "got: {err}");
    }

    #[test]
    fn dir_source_reads_nested_files() {
        let root = TempDir::new().unwrap();
        fs::create_dir_all(root.path().join("sqlite")).unwrap();
        fs::write(root.path().join("sqlite").join("table.sql.tera"), "nested").unwrap();
        fs::write(root.path().join("header.sql.tera"), "top").unwrap();

        let src = DirSource::new(root.path());
        assert_eq!(src.read("sqlite/table.sql.tera").unwrap(), b"nested");
        assert_eq!(
            src.files().unwrap(),
            vec!["header.sql.tera".to_string(), "sqlite/table.sql.tera".to_string()]
        );
    }

    #[test]
    fn dir_source_rejects_escaping_paths() {
        let root = TempDir::new().unwrap();
        let src = DirSource::new(root.path());
        let err = src.read("../secret").unwrap_err();
        assert!(matches!(err, SourceError::InvalidPath { .. }), "got: {err}");
    }

    #[test]
    fn dir_source_missing_file_is_not_found() {
        let root = TempDir::new().unwrap();
        let err = DirSource::new(root.path()).read("nope.tera").unwrap_err();
        assert!(err.is_not_found());
    }
}
