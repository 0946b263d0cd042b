//! Pack Metadata - canonical `pack.mcmeta` rewriting
//!
//! Output depends only on the preserved description and the configured
//! target version, so repeated runs are byte-identical.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::error::{PipelineError, Result};
use crate::RANGED_FORMAT_THRESHOLD;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackMetadata {
    pub pack_format: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_format: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_format: Option<u32>,
    /// Usually a string; JSON text components are kept as-is.
    pub description: Value,
}

impl PackMetadata {
    /// Canonical record for `target_version`, carrying `description` over.
    pub fn canonical(target_version: u32, description: Value) -> Self {
        let ranged = (target_version >= RANGED_FORMAT_THRESHOLD).then_some(target_version);
        Self {
            pack_format: target_version,
            min_format: ranged,
            max_format: ranged,
            description,
        }
    }

    /// Fixed field order, two-space indent, no trailing newline.
    pub fn to_canonical_string(&self) -> Result<String> {
        let mut out = String::new();
        out.push_str("{\n");
        out.push_str("  \"pack\": {\n");
        out.push_str(&format!("    \"pack_format\": {},\n", self.pack_format));
        if let (Some(min), Some(max)) = (self.min_format, self.max_format) {
            out.push_str(&format!("    \"min_format\": {},\n", min));
            out.push_str(&format!("    \"max_format\": {},\n", max));
        }
        out.push_str(&format!(
            "    \"description\": {}\n",
            serde_json::to_string(&self.description)?
        ));
        out.push_str("  }\n");
        out.push('}');
        Ok(out)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NormalizeOutcome {
    pub path: PathBuf,
    pub changed: bool,
    pub metadata: PackMetadata,
}

/// Rewrite the metadata file into canonical form for `target_version`.
///
/// The file is only written when its bytes would change.
pub fn normalize_metadata(path: &Path, target_version: u32) -> Result<NormalizeOutcome> {
    if !path.is_file() {
        return Err(PipelineError::MetadataMissing(path.to_path_buf()));
    }
    let content = fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?;

    let metadata = PackMetadata::canonical(target_version, extract_description(&content));
    let canonical = metadata.to_canonical_string()?;

    let changed = canonical != content;
    if changed {
        fs::write(path, &canonical).map_err(|e| PipelineError::io(path, e))?;
        tracing::info!(path = %path.display(), pack_format = target_version, "rewrote pack metadata");
    } else {
        tracing::debug!(path = %path.display(), "pack metadata already canonical");
    }

    Ok(NormalizeOutcome {
        path: path.to_path_buf(),
        changed,
        metadata,
    })
}

/// Read `pack_format` from the metadata file.
pub fn read_pack_format(path: &Path) -> Result<Option<u32>> {
    if !path.is_file() {
        return Err(PipelineError::MetadataMissing(path.to_path_buf()));
    }
    let content = fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?;
    Ok(extract_pack_format(&content))
}

/// Existing description, or an empty string.
pub fn extract_description(content: &str) -> Value {
    if let Ok(doc) = serde_json::from_str::<Value>(content) {
        return doc
            .get("pack")
            .and_then(|pack| pack.get("description"))
            .cloned()
            .unwrap_or_else(|| Value::String(String::new()));
    }

    // Hand-edited files are not always valid JSON.
    // A capture JSON cannot unescape (e.g. `C:\maps`) is kept as typed.
    description_pattern()
        .captures(content)
        .map(|caps| {
            serde_json::from_str::<String>(&format!("\"{}\"", &caps[1]))
                .unwrap_or_else(|_| caps[1].to_string())
        })
        .map(Value::String)
        .unwrap_or_else(|| Value::String(String::new()))
}

pub fn extract_pack_format(content: &str) -> Option<u32> {
    if let Ok(doc) = serde_json::from_str::<Value>(content) {
        return doc
            .get("pack")
            .and_then(|pack| pack.get("pack_format"))
            .and_then(Value::as_u64)
            .and_then(|v| u32::try_from(v).ok());
    }

    pack_format_pattern()
        .captures(content)
        .and_then(|caps| caps[1].parse().ok())
}

fn description_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#""description"\s*:\s*"((?:[^"\\]|\\.)*)""#).expect("valid description regex")
    })
}

fn pack_format_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r#""pack_format"\s*:\s*(\d+)"#).expect("valid pack_format regex"))
}
