//! PackSync CLI - build driver interface
//!
//! Commands: normalize-metadata, validate, sync-tree, package, build
//! Outputs JSON to stdout, logs to stderr
//! Returns 2 on validation or format failure, 1 on any other failure

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;

use packsync_core::{logging, ErrorKind, Pipeline, PipelineConfig, PipelineError, Step};

#[derive(Parser)]
#[command(name = "packsync-cli")]
#[command(about = "PackSync CLI - Resource pack consistency pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the configuration file (.json or .properties)
    #[arg(short, long, default_value = "gradle.properties")]
    config: PathBuf,

    /// Override the configured pack format
    #[arg(long)]
    target_version: Option<u32>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Rewrite pack metadata for the configured pack format
    NormalizeMetadata,

    /// Normalize metadata, then compare resource pack shaders against the mirrored copy
    Validate,

    /// Copy resource pack shaders into the mirrored location
    SyncTree,

    /// Normalize metadata and validate, then build the resource pack archive
    Package,

    /// Alias for package
    Build,
}

impl Commands {
    /// Prerequisites are added by `Pipeline::run`.
    fn step(&self) -> Step {
        match self {
            Commands::NormalizeMetadata => Step::NormalizeMetadata,
            Commands::Validate => Step::Validate,
            Commands::SyncTree => Step::SyncTree,
            Commands::Package | Commands::Build => Step::Package,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = logging::init(cli.verbose) {
        eprintln!("failed to initialise logging: {}", e);
    }

    let mut config = match PipelineConfig::load(&cli.config) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };
    if let Some(target_version) = cli.target_version {
        config.target_version = target_version;
    }

    let pipeline = Pipeline::new(config);

    report(pipeline.run(&[cli.command.step()]))
}

fn report<T: Serialize>(result: Result<T, PipelineError>) -> ExitCode {
    match result {
        Ok(value) => {
            print_json(&serde_json::json!({
                "success": true,
                "result": value,
            }));
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

fn fail(error: &PipelineError) -> ExitCode {
    tracing::error!("{}", error);

    let mut output = serde_json::json!({
        "success": false,
        "kind": error.kind(),
        "error": error.to_string(),
    });
    if let PipelineError::Validation(diff) = error {
        output["diff"] = serde_json::json!(diff);
    }
    print_json(&output);

    match error.kind() {
        ErrorKind::Validation | ErrorKind::FormatMismatch => ExitCode::from(2),
        ErrorKind::Configuration | ErrorKind::Io => ExitCode::FAILURE,
    }
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(e) => eprintln!(r#"{{"success": false, "error": "Serialization failed: {}"}}"#, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commands_run_through_step_plan() {
        assert_eq!(Commands::Validate.step(), Step::Validate);
        assert_eq!(Commands::Package.step(), Step::Package);
        assert_eq!(Commands::Build.step(), Step::Package);
        assert_eq!(
            packsync_core::plan(&[Commands::Package.step()]),
            vec![Step::NormalizeMetadata, Step::Validate, Step::Package]
        );
    }
}
