//! Release workflow orchestration
//!
//! Bridges the CLI and the release protocol: resolves configuration
//! overrides, opens the repository, runs the tagger and writes the run
//! outputs. Kept separate from clap so the workflow can be driven
//! programmatically.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::boundary::BoundaryWarning;
use crate::config::Config;
use crate::domain::ReleaseState;
use crate::error::{ReleaseError, Result};
use crate::git::Git2Repository;
use crate::output::{RunOutputs, OUTPUT_ENV};
use crate::tagger::{ReleaseOutcome, TaggerOptions, VersionTagger};

/// Arguments for the release workflow
///
/// Mirrors the CLI flags; every `Some`/`true` value overrides the config file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReleaseArgs {
    /// Path to custom config file
    pub config_path: Option<PathBuf>,

    /// Repository root folder
    pub root: Option<PathBuf>,

    /// Build descriptor relative to the root folder
    pub descriptor: Option<PathBuf>,

    /// Branch HEAD must be on
    pub branch: Option<String>,

    /// Remote to push to
    pub remote: Option<String>,

    /// Create the tag locally only
    pub no_push: bool,

    /// Preview mode - compute the tag, change nothing
    pub dry_run: bool,

    /// File the run outputs are appended to
    pub output: Option<PathBuf>,
}

/// Result of a successful release workflow
#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseReport {
    pub outcome: ReleaseOutcome,
    pub warnings: Vec<BoundaryWarning>,
    pub outputs: RunOutputs,
    /// Where the outputs were written, if anywhere
    pub output_path: Option<PathBuf>,
}

/// A failed release workflow, with the state the run had reached
#[derive(Debug, Error)]
#[error("{error}")]
pub struct ReleaseFailure {
    pub state: ReleaseState,
    pub warnings: Vec<BoundaryWarning>,
    #[source]
    pub error: ReleaseError,
}

impl From<ReleaseError> for ReleaseFailure {
    fn from(error: ReleaseError) -> Self {
        ReleaseFailure {
            state: ReleaseState::Start.fail(),
            warnings: Vec::new(),
            error,
        }
    }
}

/// Applies CLI overrides on top of the loaded configuration
pub fn apply_overrides(config: &mut Config, args: &ReleaseArgs) -> Result<()> {
    if let Some(root) = &args.root {
        config.root_folder = root.clone();
    }
    if let Some(descriptor) = &args.descriptor {
        config.descriptor = descriptor.clone();
    }
    if let Some(branch) = &args.branch {
        config.branch = Some(branch.clone());
    }
    if let Some(remote) = &args.remote {
        config.remote = remote.clone();
    }
    if args.no_push {
        config.push = false;
    }
    config.validate()
}

/// Output file from the flag, falling back to the CI step-output variable
pub fn resolve_output_path(explicit: Option<&Path>) -> Option<PathBuf> {
    explicit
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os(OUTPUT_ENV).map(PathBuf::from))
        .filter(|path| !path.as_os_str().is_empty())
}

/// Main release workflow
///
/// 1. Apply CLI overrides to the configuration
/// 2. Open the repository containing the root folder
/// 3. Run the release protocol
/// 4. Append the run outputs to the output file
pub fn run_release(
    args: &ReleaseArgs,
    mut config: Config,
) -> std::result::Result<ReleaseReport, ReleaseFailure> {
    apply_overrides(&mut config, args)?;

    let mut repo = Git2Repository::open(&config.root_folder)?;
    let descriptor = repo
        .relative_to_workdir(&config.root_folder)?
        .join(&config.descriptor);

    let mut options = TaggerOptions::from(&config);
    options.descriptor = descriptor;
    options.dry_run = args.dry_run;

    tracing::info!(
        root = %config.root_folder.display(),
        descriptor = %options.descriptor.display(),
        dry_run = options.dry_run,
        "starting release"
    );

    let mut tagger = VersionTagger::new(options);
    let outcome = match tagger.run(&mut repo) {
        Ok(outcome) => outcome,
        Err(error) => {
            return Err(ReleaseFailure {
                state: tagger.state(),
                warnings: tagger.warnings().to_vec(),
                error,
            })
        }
    };

    let outputs = RunOutputs::from_outcome(&outcome, &config);
    let output_path = resolve_output_path(args.output.as_deref());
    if let Some(path) = &output_path {
        outputs.append_to(path).map_err(|error| ReleaseFailure {
            state: tagger.state(),
            warnings: tagger.warnings().to_vec(),
            error,
        })?;
    }

    Ok(ReleaseReport {
        outcome,
        warnings: tagger.warnings().to_vec(),
        outputs,
        output_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_replace_config_values() {
        let mut config = Config::default();
        let args = ReleaseArgs {
            root: Some(PathBuf::from("app")),
            descriptor: Some(PathBuf::from("build.xml")),
            branch: Some("release".to_string()),
            remote: Some("upstream".to_string()),
            no_push: true,
            ..ReleaseArgs::default()
        };

        apply_overrides(&mut config, &args).unwrap();

        assert_eq!(config.root_folder, PathBuf::from("app"));
        assert_eq!(config.descriptor, PathBuf::from("build.xml"));
        assert_eq!(config.branch.as_deref(), Some("release"));
        assert_eq!(config.remote, "upstream");
        assert!(!config.push);
    }

    #[test]
    fn test_no_overrides_keep_config() {
        let mut config = Config::default();
        apply_overrides(&mut config, &ReleaseArgs::default()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_overrides_are_validated() {
        let mut config = Config::default();
        let args = ReleaseArgs {
            remote: Some(String::new()),
            ..ReleaseArgs::default()
        };
        assert!(apply_overrides(&mut config, &args).is_err());
    }

    #[test]
    fn test_explicit_output_path_wins() {
        assert_eq!(
            resolve_output_path(Some(Path::new("out.txt"))),
            Some(PathBuf::from("out.txt"))
        );
    }

    #[test]
    fn test_failure_from_error_starts_failed() {
        let failure = ReleaseFailure::from(ReleaseError::config("bad"));
        assert!(matches!(failure.state, ReleaseState::Failed { .. }));
        assert_eq!(failure.to_string(), "Configuration error: bad");
    }
}
