//! Pipeline Configuration - the single source of truth for the pack format
//!
//! The metadata file is an output of normalization. The configured
//! `target_version` is what it is normalized to.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{PipelineError, Result};
use crate::tree::HousekeepingFilter;

const PACK_FORMAT_KEY: &str = "resourcepackPackFormat";
const PLUGIN_VERSION_KEY: &str = "pluginVersion";
const MINECRAFT_VERSION_KEY: &str = "minecraftVersion";
const BASE_NAME_KEY: &str = "resourcepackBaseName";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PipelineConfig {
    pub target_version: u32,
    pub version: String,
    #[serde(default = "default_base_name")]
    pub base_name: String,
    #[serde(default = "default_resourcepack_root")]
    pub resourcepack_root: PathBuf,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default = "default_mirrored_root")]
    pub mirrored_root: PathBuf,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_metadata_file")]
    pub metadata_file: String,
    #[serde(default)]
    pub housekeeping: Vec<String>,
}

fn default_base_name() -> String { "vanillaminimaps-resourcepack".to_string() }
fn default_resourcepack_root() -> PathBuf { PathBuf::from("resourcepack") }
fn default_namespace() -> String { "minecraft".to_string() }
fn default_mirrored_root() -> PathBuf { PathBuf::from("src/main/resources/shaders") }
fn default_output_dir() -> PathBuf { PathBuf::from("build/resourcepack") }
fn default_metadata_file() -> String { "pack.mcmeta".to_string() }

impl PipelineConfig {
    /// Configuration with default layout for the given format and version.
    pub fn new(target_version: u32, version: impl Into<String>) -> Self {
        Self {
            target_version,
            version: version.into(),
            base_name: default_base_name(),
            resourcepack_root: default_resourcepack_root(),
            namespace: default_namespace(),
            mirrored_root: default_mirrored_root(),
            output_dir: default_output_dir(),
            metadata_file: default_metadata_file(),
            housekeeping: vec![],
        }
    }

    /// Load from a `.json` or `.properties` file.
    ///
    /// Relative paths are resolved against the file's directory.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(PipelineError::ConfigMissing(path.to_path_buf()));
        }
        let content = fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?;

        let config = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str::<Self>(&content)?,
            Some("properties") => Self::from_properties(&content)?,
            _ => return Err(PipelineError::UnsupportedConfig(path.to_path_buf())),
        };

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        let config = config.resolved_against(base);
        config.check()?;
        Ok(config)
    }

    /// Parse gradle-style `key=value` properties.
    pub fn from_properties(content: &str) -> Result<Self> {
        let props = parse_properties(content);

        let format = props
            .get(PACK_FORMAT_KEY)
            .ok_or_else(|| PipelineError::MissingSetting(PACK_FORMAT_KEY.to_string()))?;
        let target_version = format
            .parse::<u32>()
            .map_err(|_| PipelineError::invalid(PACK_FORMAT_KEY, format!("'{}' is not an integer", format)))?;

        let plugin_version = props
            .get(PLUGIN_VERSION_KEY)
            .ok_or_else(|| PipelineError::MissingSetting(PLUGIN_VERSION_KEY.to_string()))?;
        let version = match props.get(MINECRAFT_VERSION_KEY) {
            Some(mc) => format!("{}-mc{}", plugin_version, mc),
            None => plugin_version.clone(),
        };

        let mut config = Self::new(target_version, version);
        if let Some(base_name) = props.get(BASE_NAME_KEY) {
            config.base_name = base_name.clone();
        }
        config.check()?;
        Ok(config)
    }

    /// Rebase every relative path onto `base`.
    pub fn resolved_against(mut self, base: &Path) -> Self {
        for path in [
            &mut self.resourcepack_root,
            &mut self.mirrored_root,
            &mut self.output_dir,
        ] {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
        self
    }

    /// Reject names that cannot form an archive filename.
    pub fn check(&self) -> Result<()> {
        check_file_component("base_name", &self.base_name)?;
        check_file_component("version", &self.version)?;
        check_file_component("metadata_file", &self.metadata_file)?;
        if self.namespace.is_empty() {
            return Err(PipelineError::MissingSetting("namespace".to_string()));
        }
        Ok(())
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.resourcepack_root.join(&self.metadata_file)
    }

    /// `<resourcepack_root>/assets/<namespace>/shaders`
    pub fn authoritative_shaders(&self) -> PathBuf {
        self.resourcepack_root
            .join("assets")
            .join(&self.namespace)
            .join("shaders")
    }

    pub fn housekeeping_filter(&self) -> HousekeepingFilter {
        HousekeepingFilter::default().with_names(self.housekeeping.iter().cloned())
    }

    /// `<base_name>-<version>.zip`
    pub fn archive_file_name(&self) -> String {
        format!("{}-{}.{}", self.base_name, self.version, crate::ARCHIVE_EXTENSION)
    }
}

fn check_file_component(key: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(PipelineError::MissingSetting(key.to_string()));
    }
    if value.contains('/') || value.contains('\\') || value == "." || value == ".." {
        return Err(PipelineError::invalid(key, format!("'{}' must be a plain file name", value)));
    }
    Ok(())
}

fn parse_properties(content: &str) -> HashMap<String, String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('!'))
        .filter_map(|line| {
            let split = line.find(|c| c == '=' || c == ':')?;
            let (key, value) = line.split_at(split);
            Some((key.trim().to_string(), value[1..].trim().to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROPERTIES: &str = "\
# plugin
pluginVersion=1.4.0
minecraftVersion = 1.21.4
resourcepackPackFormat=46
org.gradle.jvmargs=-Xmx2G
";

    #[test]
    fn test_properties_build_artifact_version() {
        let config = PipelineConfig::from_properties(PROPERTIES).unwrap();
        assert_eq!(config.target_version, 46);
        assert_eq!(config.version, "1.4.0-mc1.21.4");
        assert_eq!(config.archive_file_name(), "vanillaminimaps-resourcepack-1.4.0-mc1.21.4.zip");
    }

    #[test]
    fn test_properties_missing_format_is_configuration_error() {
        let err = PipelineConfig::from_properties("pluginVersion=1.0\n").unwrap_err();
        assert!(matches!(err, PipelineError::MissingSetting(ref k) if k == PACK_FORMAT_KEY));
    }

    #[test]
    fn test_properties_non_integer_format() {
        let err = PipelineConfig::from_properties("pluginVersion=1\nresourcepackPackFormat=abc\n")
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Configuration);
    }

    #[test]
    fn test_derived_paths() {
        let config = PipelineConfig::new(64, "1.0.0").resolved_against(Path::new("/project"));
        assert_eq!(config.metadata_path(), PathBuf::from("/project/resourcepack/pack.mcmeta"));
        assert_eq!(
            config.authoritative_shaders(),
            PathBuf::from("/project/resourcepack/assets/minecraft/shaders")
        );
        assert_eq!(
            config.mirrored_root,
            PathBuf::from("/project/src/main/resources/shaders")
        );
    }

    #[test]
    fn test_version_with_separator_rejected() {
        let config = PipelineConfig::new(64, "1.0/evil");
        assert!(config.check().is_err());
    }

    #[test]
    fn test_load_json_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("packsync.json");
        fs::write(
            &path,
            r#"{"targetVersion": 64, "version": "2.0.0", "baseName": "minimap-pack", "housekeeping": ["notes.txt"]}"#,
        )
        .unwrap();

        let config = PipelineConfig::load(&path).unwrap();
        assert_eq!(config.base_name, "minimap-pack");
        assert_eq!(config.resourcepack_root, dir.path().join("resourcepack"));
        assert!(config.housekeeping_filter().is_housekeeping("notes.txt"));
    }

    #[test]
    fn test_load_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("packsync.yaml");
        fs::write(&path, "targetVersion: 1").unwrap();
        assert!(matches!(
            PipelineConfig::load(&path),
            Err(PipelineError::UnsupportedConfig(_))
        ));
    }
}
