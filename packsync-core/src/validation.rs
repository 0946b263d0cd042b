//! Validation System - authoritative vs. mirrored shader trees
//!
//! The diff collects every divergence before reporting so one build run
//! surfaces all of them.

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::hashing::sha256_hex;
use crate::metadata::read_pack_format;
use crate::tree::{DirectoryTree, HousekeepingFilter};

#[cfg(feature = "test-hooks")]
use std::sync::atomic::{AtomicU32, Ordering};

#[cfg(feature = "test-hooks")]
static VALIDATION_CALL_COUNT: AtomicU32 = AtomicU32::new(0);

#[cfg(feature = "test-hooks")]
pub fn get_validation_call_count() -> u32 {
    VALIDATION_CALL_COUNT.load(Ordering::SeqCst)
}

#[cfg(feature = "test-hooks")]
pub fn reset_validation_call_count() {
    VALIDATION_CALL_COUNT.store(0, Ordering::SeqCst);
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentMismatch {
    pub path: String,
    pub expected_sha256: String,
    pub actual_sha256: String,
}

/// Three disjoint path sets. Empty everywhere means the trees agree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeDiff {
    /// In the authoritative tree only
    pub missing: BTreeSet<String>,
    /// In the mirrored tree only
    pub extra: BTreeSet<String>,
    /// In both with different bytes
    pub mismatched: BTreeSet<String>,
    #[serde(default)]
    pub details: Vec<ContentMismatch>,
}

impl TreeDiff {
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.extra.is_empty() && self.mismatched.is_empty()
    }

    pub fn divergence_count(&self) -> usize {
        self.missing.len() + self.extra.len() + self.mismatched.len()
    }
}

impl fmt::Display for TreeDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn list(set: &BTreeSet<String>) -> String {
            set.iter().cloned().collect::<Vec<_>>().join(", ")
        }

        let mut parts = vec![];
        if !self.missing.is_empty() {
            parts.push(format!("Missing in mirror: [{}]", list(&self.missing)));
        }
        if !self.extra.is_empty() {
            parts.push(format!("Extra in mirror: [{}]", list(&self.extra)));
        }
        if !self.mismatched.is_empty() {
            parts.push(format!("Contents differ: [{}]", list(&self.mismatched)));
        }
        if parts.is_empty() {
            write!(f, "No differences")
        } else {
            write!(f, "{}", parts.join(". "))
        }
    }
}

/// Diff two trees. Contents are read fresh and compared byte for byte.
pub fn compare_trees(authoritative: &DirectoryTree, mirrored: &DirectoryTree) -> Result<TreeDiff> {
    let mut diff = TreeDiff::default();

    for path in authoritative.paths() {
        if !mirrored.contains(path) {
            diff.missing.insert(path.to_string());
        }
    }
    for path in mirrored.paths() {
        if !authoritative.contains(path) {
            diff.extra.insert(path.to_string());
        }
    }

    for path in authoritative.paths().filter(|p| mirrored.contains(p)) {
        let (Some(expected), Some(actual)) = (authoritative.read(path)?, mirrored.read(path)?) else {
            continue;
        };
        if expected != actual {
            tracing::warn!(path, "shader contents differ");
            diff.mismatched.insert(path.to_string());
            diff.details.push(ContentMismatch {
                path: path.to_string(),
                expected_sha256: sha256_hex(&expected),
                actual_sha256: sha256_hex(&actual),
            });
        }
    }

    Ok(diff)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub pack_format: u32,
    pub expected_format: u32,
    pub authoritative_files: usize,
    pub mirrored_files: usize,
    pub diff: TreeDiff,
}

/// Checks metadata format and tree agreement for one configuration.
pub struct Validator {
    filter: HousekeepingFilter,
}

impl Validator {
    pub fn new(filter: HousekeepingFilter) -> Self {
        Self { filter }
    }

    /// Format check first, then both roots, then the tree diff.
    ///
    /// Tree divergence is reported through `valid`; format and configuration
    /// problems are errors.
    pub fn validate(&self, config: &PipelineConfig) -> Result<ValidationReport> {
        #[cfg(feature = "test-hooks")]
        VALIDATION_CALL_COUNT.fetch_add(1, Ordering::SeqCst);

        let metadata_path = config.metadata_path();
        let pack_format = read_pack_format(&metadata_path)?
            .ok_or_else(|| PipelineError::FormatMissing(metadata_path.clone()))?;
        if pack_format != config.target_version {
            return Err(PipelineError::FormatMismatch {
                observed: pack_format,
                expected: config.target_version,
            });
        }

        self.validate_trees(
            &config.authoritative_shaders(),
            &config.mirrored_root,
            pack_format,
            config.target_version,
        )
    }

    fn validate_trees(
        &self,
        authoritative_root: &Path,
        mirrored_root: &Path,
        pack_format: u32,
        expected_format: u32,
    ) -> Result<ValidationReport> {
        require_dir("authoritative", authoritative_root)?;
        require_dir("mirrored", mirrored_root)?;

        let authoritative = DirectoryTree::scan(authoritative_root, &self.filter)?;
        let mirrored = DirectoryTree::scan(mirrored_root, &self.filter)?;
        let diff = compare_trees(&authoritative, &mirrored)?;

        Ok(ValidationReport {
            valid: diff.is_clean(),
            pack_format,
            expected_format,
            authoritative_files: authoritative.len(),
            mirrored_files: mirrored.len(),
            diff,
        })
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(HousekeepingFilter::default())
    }
}

pub(crate) fn require_dir(role: &'static str, path: &Path) -> Result<()> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(PipelineError::RootMissing {
            role,
            path: path.to_path_buf(),
        })
    }
}
