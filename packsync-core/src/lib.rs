//! PackSync Core - Resource Pack Consistency Pipeline
//!
//! # The Four Rules (Non-Negotiable)
//! 1. The Resource Pack Is Truth
//! 2. The Mirror Is Never Trusted
//! 3. Validation Gates Packaging
//! 4. Deterministic Output

pub mod config;
pub mod error;
pub mod hashing;
pub mod logging;
pub mod metadata;
pub mod package;
pub mod pipeline;
pub mod sync;
pub mod tree;
pub mod validation;

pub use config::PipelineConfig;
pub use error::{ErrorKind, PipelineError, Result};
pub use hashing::{file_sha256, sha256_hex};
pub use metadata::{normalize_metadata, NormalizeOutcome, PackMetadata};
pub use package::{package_tree, PackageReport};
pub use pipeline::{plan, Pipeline, PipelineRun, Step, StepOutcome};
pub use sync::{sync_tree, SyncReport};
pub use tree::{DirectoryTree, HousekeepingFilter};
pub use validation::{compare_trees, ContentMismatch, TreeDiff, ValidationReport, Validator};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Pack formats at or above this value carry `min_format`/`max_format`.
pub const RANGED_FORMAT_THRESHOLD: u32 = 64;

/// Extension of the produced resource pack archive.
pub const ARCHIVE_EXTENSION: &str = "zip";
