//! Pipeline Orchestrator - named steps, fail-fast
//!
//! CRITICAL: package MUST call validate internally. No bypass.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::metadata::{normalize_metadata, NormalizeOutcome};
use crate::package::{package_tree, PackageReport};
use crate::sync::{sync_tree, SyncReport};
use crate::tree::HousekeepingFilter;
use crate::validation::{ValidationReport, Validator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Step {
    NormalizeMetadata,
    Validate,
    SyncTree,
    Package,
}

impl Step {
    pub const ALL: [Step; 4] = [Step::NormalizeMetadata, Step::Validate, Step::SyncTree, Step::Package];

    pub fn name(self) -> &'static str {
        match self {
            Step::NormalizeMetadata => "normalize-metadata",
            Step::Validate => "validate",
            Step::SyncTree => "sync-tree",
            Step::Package => "package",
        }
    }

    /// Steps that must succeed immediately before this one.
    pub fn prerequisites(self) -> &'static [Step] {
        match self {
            Step::NormalizeMetadata | Step::SyncTree => &[],
            Step::Validate => &[Step::NormalizeMetadata],
            Step::Package => &[Step::Validate],
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Step {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        Step::ALL
            .into_iter()
            .find(|step| step.name() == s)
            .ok_or_else(|| PipelineError::invalid("step", format!("unknown step '{}'", s)))
    }
}

/// Expand prerequisites and drop duplicates, keeping dependency order.
pub fn plan(requested: &[Step]) -> Vec<Step> {
    fn visit(step: Step, ordered: &mut Vec<Step>) {
        if ordered.contains(&step) {
            return;
        }
        for prerequisite in step.prerequisites() {
            visit(*prerequisite, ordered);
        }
        ordered.push(step);
    }

    let mut ordered = vec![];
    for step in requested {
        visit(*step, &mut ordered);
    }
    ordered
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "step", rename_all = "kebab-case")]
pub enum StepOutcome {
    NormalizeMetadata(NormalizeOutcome),
    Validate(ValidationReport),
    SyncTree(SyncReport),
    Package(PackageReport),
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineRun {
    pub id: String,
    pub engine_version: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcomes: Vec<StepOutcome>,
}

/// The pipeline - single entry point for every build step
pub struct Pipeline {
    config: PipelineConfig,
    filter: HousekeepingFilter,
    validator: Validator,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        let filter = config.housekeeping_filter();
        Self {
            validator: Validator::new(filter.clone()),
            filter,
            config,
        }
    }

    pub fn normalize_metadata(&self) -> Result<NormalizeOutcome> {
        normalize_metadata(&self.config.metadata_path(), self.config.target_version)
    }

    /// Validate the shader trees and the metadata format.
    ///
    /// Returns the report even when trees diverge; callers that gate on it
    /// use `require_valid`.
    pub fn validate(&self) -> Result<ValidationReport> {
        let report = self.validator.validate(&self.config)?;
        if report.valid {
            tracing::info!(files = report.authoritative_files, "shader trees match");
        } else {
            tracing::warn!(divergences = report.diff.divergence_count(), "shader trees diverge");
        }
        Ok(report)
    }

    /// `validate`, turning any divergence into an error.
    pub fn require_valid(&self) -> Result<ValidationReport> {
        let report = self.validate()?;
        if !report.valid {
            return Err(PipelineError::Validation(report.diff));
        }
        Ok(report)
    }

    /// Pull the resource pack shaders into the mirrored location.
    pub fn sync_tree(&self) -> Result<SyncReport> {
        sync_tree(
            &self.config.authoritative_shaders(),
            &self.config.mirrored_root,
            &self.filter,
        )
    }

    /// Build the archive.
    ///
    /// CRITICAL: This ALWAYS validates first. No bypass possible.
    pub fn package(&self) -> Result<PackageReport> {
        self.require_valid()?;
        self.write_package()
    }

    fn write_package(&self) -> Result<PackageReport> {
        package_tree(
            &self.config.resourcepack_root,
            &self.config.output_dir,
            &self.config.archive_file_name(),
            &self.filter,
        )
    }

    /// Where `package` deposits the archive.
    pub fn archive_path(&self) -> PathBuf {
        self.config.output_dir.join(self.config.archive_file_name())
    }

    /// Run `steps` and their prerequisites in order, stopping at the first failure.
    pub fn run(&self, steps: &[Step]) -> Result<PipelineRun> {
        let id = Uuid::new_v4().to_string();
        let started_at = Utc::now();
        let mut outcomes = vec![];
        let mut validated = false;

        for step in plan(steps) {
            let span = tracing::info_span!("step", run = %id, name = step.name());
            let _enter = span.enter();
            tracing::info!("starting");

            let outcome = match step {
                Step::NormalizeMetadata => StepOutcome::NormalizeMetadata(self.normalize_metadata()?),
                Step::Validate => {
                    let report = self.require_valid()?;
                    validated = true;
                    StepOutcome::Validate(report)
                }
                Step::SyncTree => StepOutcome::SyncTree(self.sync_tree()?),
                // Validate always precedes Package in a plan.
                Step::Package if validated => StepOutcome::Package(self.write_package()?),
                Step::Package => StepOutcome::Package(self.package()?),
            };

            tracing::info!("finished");
            outcomes.push(outcome);
        }

        Ok(PipelineRun {
            id,
            engine_version: crate::ENGINE_VERSION.to_string(),
            started_at,
            finished_at: Utc::now(),
            outcomes,
        })
    }

    /// normalize-metadata, validate, package
    pub fn build(&self) -> Result<PipelineRun> {
        self.run(&[Step::Package])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_plan_expands_prerequisites() {
        assert_eq!(
            plan(&[Step::Package]),
            vec![Step::NormalizeMetadata, Step::Validate, Step::Package]
        );
    }

    #[test]
    fn test_plan_deduplicates() {
        assert_eq!(
            plan(&[Step::SyncTree, Step::Validate, Step::Package, Step::NormalizeMetadata]),
            vec![Step::SyncTree, Step::NormalizeMetadata, Step::Validate, Step::Package]
        );
    }

    #[test]
    fn test_step_names_round_trip() {
        for step in Step::ALL {
            assert_eq!(step.name().parse::<Step>().unwrap(), step);
        }
        assert!("shadow-jar".parse::<Step>().is_err());
    }
}
