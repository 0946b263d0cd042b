//! Tree Synchronizer - one-way copy from the resource pack into the mirror
//!
//! Destination files without a source counterpart are left in place;
//! validation reports them as extra.

use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::error::{PipelineError, Result};
use crate::tree::{DirectoryTree, HousekeepingFilter};
use crate::validation::require_dir;

#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub copied: Vec<String>,
    pub unchanged: Vec<String>,
    pub skipped_housekeeping: usize,
}

/// Mirror every non-housekeeping file from `source` into `dest`.
pub fn sync_tree(source: &Path, dest: &Path, filter: &HousekeepingFilter) -> Result<SyncReport> {
    require_dir("source", source)?;
    fs::create_dir_all(dest).map_err(|e| PipelineError::io(dest, e))?;

    let tree = DirectoryTree::scan(source, filter)?;
    let mut report = SyncReport {
        skipped_housekeeping: tree.skipped(),
        ..SyncReport::default()
    };

    for (relative, from) in tree.entries() {
        let to = dest.join(relative);
        let bytes = fs::read(from).map_err(|e| PipelineError::io(from, e))?;

        if to.is_file() {
            let current = fs::read(&to).map_err(|e| PipelineError::io(&to, e))?;
            if current == bytes {
                report.unchanged.push(relative.to_string());
                continue;
            }
        }

        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
        }
        fs::write(&to, &bytes).map_err(|e| PipelineError::io(&to, e))?;
        tracing::debug!(path = relative, "copied shader");
        report.copied.push(relative.to_string());
    }

    tracing::info!(
        copied = report.copied.len(),
        unchanged = report.unchanged.len(),
        "synced shader tree"
    );
    Ok(report)
}
