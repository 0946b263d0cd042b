//! Error taxonomy for the pipeline
//!
//! Every error is fatal. Nothing here is retried.

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::validation::TreeDiff;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Configuration,
    FormatMismatch,
    Validation,
    Io,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Metadata file missing: {}", .0.display())]
    MetadataMissing(PathBuf),

    #[error("{role} root missing: {}", .path.display())]
    RootMissing { role: &'static str, path: PathBuf },

    #[error("Configuration file missing: {}", .0.display())]
    ConfigMissing(PathBuf),

    #[error("Required setting absent: {0}")]
    MissingSetting(String),

    #[error("Invalid setting {key}: {message}")]
    InvalidSetting { key: String, message: String },

    #[error("Unsupported configuration format: {}", .0.display())]
    UnsupportedConfig(PathBuf),

    #[error("{} missing pack_format", .0.display())]
    FormatMissing(PathBuf),

    #[error("pack_format is {observed}, expected {expected}")]
    FormatMismatch { observed: u32, expected: u32 },

    #[error("Shader trees do not match. {0}")]
    Validation(TreeDiff),

    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PipelineError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn invalid(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidSetting {
            key: key.into(),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MetadataMissing(_)
            | Self::RootMissing { .. }
            | Self::ConfigMissing(_)
            | Self::MissingSetting(_)
            | Self::InvalidSetting { .. }
            | Self::UnsupportedConfig(_) => ErrorKind::Configuration,
            Self::FormatMissing(_) | Self::FormatMismatch { .. } => ErrorKind::FormatMismatch,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Io { .. } | Self::Archive(_) | Self::Serialization(_) => ErrorKind::Io,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_mismatch_reports_both_values() {
        let err = PipelineError::FormatMismatch { observed: 46, expected: 64 };
        assert_eq!(err.to_string(), "pack_format is 46, expected 64");
        assert_eq!(err.kind(), ErrorKind::FormatMismatch);
    }

    #[test]
    fn missing_root_is_configuration_error() {
        let err = PipelineError::RootMissing {
            role: "mirrored",
            path: PathBuf::from("src/main/resources/shaders"),
        };
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().contains("mirrored root missing"));
    }
}
