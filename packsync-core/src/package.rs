//! Packager - deterministic zip of the resource pack
//!
//! Entries are sorted, timestamps pinned to the zip epoch, permissions fixed.
//! Callers go through `Pipeline::package`, which validates first.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use crate::error::{PipelineError, Result};
use crate::hashing::file_sha256;
use crate::tree::{DirectoryTree, HousekeepingFilter};
use crate::validation::require_dir;

#[derive(Debug, Clone, Serialize)]
pub struct PackageReport {
    pub archive_path: PathBuf,
    pub entries: Vec<String>,
    pub sha256: String,
}

/// Archive `root` into `output_dir/archive_name`.
pub fn package_tree(
    root: &Path,
    output_dir: &Path,
    archive_name: &str,
    filter: &HousekeepingFilter,
) -> Result<PackageReport> {
    require_dir("resource pack", root)?;
    fs::create_dir_all(output_dir).map_err(|e| PipelineError::io(output_dir, e))?;

    let tree = DirectoryTree::scan(root, filter)?;
    let archive_path = output_dir.join(archive_name);
    let temp_path = output_dir.join(format!(".{}.{}.tmp", archive_name, std::process::id()));

    let result = write_archive(&tree, &temp_path);
    if let Err(err) = result {
        let _ = fs::remove_file(&temp_path);
        return Err(err);
    }
    fs::rename(&temp_path, &archive_path).map_err(|e| PipelineError::io(&archive_path, e))?;

    let sha256 = file_sha256(&archive_path)?;
    let entries: Vec<String> = tree.paths().map(str::to_string).collect();
    tracing::info!(
        archive = %archive_path.display(),
        entries = entries.len(),
        sha256 = %sha256,
        "packaged resource pack"
    );

    Ok(PackageReport {
        archive_path,
        entries,
        sha256,
    })
}

fn write_archive(tree: &DirectoryTree, path: &Path) -> Result<()> {
    let file = File::create(path).map_err(|e| PipelineError::io(path, e))?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default())
        .unix_permissions(0o644);

    for (relative, absolute) in tree.entries() {
        let bytes = fs::read(absolute).map_err(|e| PipelineError::io(absolute, e))?;
        zip.start_file(relative, options)?;
        zip.write_all(&bytes).map_err(|e| PipelineError::io(path, e))?;
        tracing::debug!(entry = relative, "archived");
    }

    let mut writer = zip.finish()?;
    writer.flush().map_err(|e| PipelineError::io(path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn pack_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let shaders = dir.path().join("assets/minecraft/shaders/core");
        fs::create_dir_all(&shaders).unwrap();
        fs::write(dir.path().join("pack.mcmeta"), "{}").unwrap();
        fs::write(shaders.join("map.fsh"), "void main() {}").unwrap();
        fs::write(shaders.join(".DS_Store"), "junk").unwrap();
        dir
    }

    #[test]
    fn test_archive_entries_sorted_without_housekeeping() {
        let pack = pack_dir();
        let out = tempfile::tempdir().unwrap();

        let report = package_tree(pack.path(), out.path(), "rp-1.0.zip", &HousekeepingFilter::default())
            .unwrap();
        assert_eq!(report.archive_path, out.path().join("rp-1.0.zip"));
        assert_eq!(
            report.entries,
            vec!["assets/minecraft/shaders/core/map.fsh", "pack.mcmeta"]
        );

        let mut archive = zip::ZipArchive::new(File::open(&report.archive_path).unwrap()).unwrap();
        let names: Vec<String> = archive.file_names().map(str::to_string).collect();
        assert_eq!(names.len(), 2);
        let mut entry = archive.by_name("pack.mcmeta").unwrap();
        let mut content = String::new();
        std::io::Read::read_to_string(&mut entry, &mut content).unwrap();
        assert_eq!(content, "{}");
    }

    #[test]
    fn test_archive_is_reproducible() {
        let pack = pack_dir();
        let out = tempfile::tempdir().unwrap();
        let filter = HousekeepingFilter::default();

        let first = package_tree(pack.path(), out.path(), "rp.zip", &filter).unwrap();
        let second = package_tree(pack.path(), out.path(), "rp.zip", &filter).unwrap();
        assert_eq!(first.sha256, second.sha256);
    }

    #[test]
    fn test_no_temp_file_left_behind() {
        let pack = pack_dir();
        let out = tempfile::tempdir().unwrap();
        package_tree(pack.path(), out.path(), "rp.zip", &HousekeepingFilter::default()).unwrap();

        let names: Vec<_> = fs::read_dir(out.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["rp.zip"]);
    }
}
