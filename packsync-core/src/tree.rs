//! Directory Trees - relative-path keyed file sets
//!
//! Keys are `/`-joined regardless of platform so trees compare equal across
//! operating systems.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{PipelineError, Result};

const DEFAULT_HOUSEKEEPING: &[&str] = &[".DS_Store", "Thumbs.db", "desktop.ini"];

/// Decides which files are OS or tool litter rather than asset content.
#[derive(Debug, Clone)]
pub struct HousekeepingFilter {
    names: BTreeSet<String>,
}

impl HousekeepingFilter {
    pub fn with_names(mut self, names: impl IntoIterator<Item = String>) -> Self {
        self.names.extend(names);
        self
    }

    pub fn is_housekeeping(&self, file_name: &str) -> bool {
        // AppleDouble resource forks
        file_name.starts_with("._") || self.names.contains(file_name)
    }

    fn excludes(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .map_or(false, |n| self.is_housekeeping(n))
    }
}

impl Default for HousekeepingFilter {
    fn default() -> Self {
        Self {
            names: DEFAULT_HOUSEKEEPING.iter().map(|n| n.to_string()).collect(),
        }
    }
}

/// Files under a root, keyed by normalized relative path.
#[derive(Debug, Clone)]
pub struct DirectoryTree {
    files: BTreeMap<String, PathBuf>,
    skipped: usize,
}

impl DirectoryTree {
    /// Walk `root` and collect every regular file not excluded by `filter`.
    ///
    /// Symlinks are followed, so a linked shader is keyed by the link's path.
    /// The caller checks that `root` exists; a missing root surfaces as an I/O error.
    pub fn scan(root: &Path, filter: &HousekeepingFilter) -> Result<Self> {
        let mut files = BTreeMap::new();
        let mut skipped = 0;

        for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(root).to_path_buf();
                PipelineError::io(path, e.into())
            })?;

            if !entry.file_type().is_file() {
                continue;
            }
            if filter.excludes(entry.path()) {
                skipped += 1;
                continue;
            }

            let relative = entry
                .path()
                .strip_prefix(root)
                .map_err(|_| PipelineError::invalid("root", format!("{} escapes {}", entry.path().display(), root.display())))?;
            files.insert(normalize_relative(relative), entry.path().to_path_buf());
        }

        tracing::debug!(root = %root.display(), files = files.len(), skipped, "scanned tree");
        Ok(Self { files, skipped })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Housekeeping files seen and left out.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn contains(&self, relative: &str) -> bool {
        self.files.contains_key(relative)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    /// Relative key and absolute path, in key order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.files.iter().map(|(k, v)| (k.as_str(), v.as_path()))
    }

    /// Fresh read of a file's bytes.
    pub fn read(&self, relative: &str) -> Result<Option<Vec<u8>>> {
        match self.files.get(relative) {
            Some(path) => std::fs::read(path)
                .map(Some)
                .map_err(|e| PipelineError::io(path, e)),
            None => Ok(None),
        }
    }
}

fn normalize_relative(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_scan_uses_forward_slashes_and_skips_housekeeping() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("core/include")).unwrap();
        fs::write(dir.path().join("core/include/util.glsl"), "u").unwrap();
        fs::write(dir.path().join("core/.DS_Store"), "junk").unwrap();
        fs::write(dir.path().join("._map.fsh"), "fork").unwrap();
        fs::write(dir.path().join("map.fsh"), "m").unwrap();

        let tree = DirectoryTree::scan(dir.path(), &HousekeepingFilter::default()).unwrap();
        let paths: Vec<_> = tree.paths().collect();
        assert_eq!(paths, vec!["core/include/util.glsl", "map.fsh"]);
        assert_eq!(tree.skipped(), 2);
        assert_eq!(tree.read("map.fsh").unwrap().as_deref(), Some(&b"m"[..]));
        assert_eq!(tree.read("absent").unwrap(), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_scan_follows_symlinked_files() {
        let dir = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        fs::write(outside.path().join("map.fsh"), "linked").unwrap();
        fs::create_dir_all(dir.path().join("core")).unwrap();
        std::os::unix::fs::symlink(outside.path().join("map.fsh"), dir.path().join("core/map.fsh"))
            .unwrap();

        let tree = DirectoryTree::scan(dir.path(), &HousekeepingFilter::default()).unwrap();
        assert_eq!(tree.paths().collect::<Vec<_>>(), vec!["core/map.fsh"]);
        assert_eq!(tree.read("core/map.fsh").unwrap().as_deref(), Some(&b"linked"[..]));
    }

    #[test]
    fn test_custom_housekeeping_name() {
        let filter = HousekeepingFilter::default().with_names(["notes.txt".to_string()]);
        assert!(filter.is_housekeeping("notes.txt"));
        assert!(filter.is_housekeeping("Thumbs.db"));
        assert!(!filter.is_housekeeping("map.vsh"));
    }

    #[test]
    fn test_normalize_relative() {
        let path: PathBuf = ["program", "minimap", "map.json"].iter().collect();
        assert_eq!(normalize_relative(&path), "program/minimap/map.json");
    }
}
