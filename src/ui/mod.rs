//! User interface module - run summaries built from the formatting primitives.
//!
//! - `formatter` - single-line styled messages
//! - This module - composite reports for a finished or failed run

use crate::boundary::BoundaryWarning;
use crate::domain::{CommitResult, ReleaseState};
use crate::error::ReleaseError;
use crate::tagger::ReleaseOutcome;

pub mod formatter;

// Re-export formatter functions for convenience
pub use formatter::{
    display_boundary_warning, display_downstream_scans, display_error,
    display_manual_push_instruction, display_proposed_tag, display_status, display_success,
};

/// Prints every warning collected during a run
pub fn display_warnings(warnings: &[BoundaryWarning]) {
    for warning in warnings {
        display_boundary_warning(warning);
    }
}

/// Prints the summary of a successful run.
///
/// Dry runs only show the computed tag and the steps that would follow.
pub fn display_outcome(outcome: &ReleaseOutcome, remote: &str, dry_run: bool) {
    let context = &outcome.context;
    let latest = context.latest_tag.as_ref().map(|t| t.to_string());
    display_proposed_tag(latest.as_deref(), &context.new_tag.to_string());

    if dry_run {
        display_status("Dry run, nothing was changed:");
        display_success(&format!(
            "  Step 1: set version {} in the build descriptor",
            context.new_tag.version_str()
        ));
        display_success(&format!("  Step 2: commit \"{}\" if it changed", context.commit_message()));
        display_success(&format!("  Step 3: tag {}", context.new_tag));
        display_success(&format!(
            "  Step 4: push {} and all tags to {}",
            context.branch_name, remote
        ));
        return;
    }

    match &outcome.commit {
        Some(CommitResult::Committed { id }) => {
            let short = &id[..id.len().min(7)];
            display_success(&format!("Committed {} ({})", context.commit_message(), short));
        }
        Some(CommitResult::Unchanged) => display_status("Descriptor unchanged, no commit needed"),
        None => {}
    }

    display_success(&format!("Created tag: {}", context.new_tag));

    if outcome.pushed {
        display_success(&format!(
            "Pushed {} and tags to {}",
            context.branch_name, remote
        ));
        println!(
            "\n{} Released {} from branch {}\n",
            console::style("✓").green(),
            context.new_tag,
            context.branch_name
        );
    } else {
        display_manual_push_instruction(&context.new_tag.to_string(), &context.branch_name, remote);
    }
}

/// Prints where a failed run stopped and what the operator has to check.
pub fn display_failure(state: ReleaseState, error: &ReleaseError) {
    display_error(&error.to_string());

    if error.is_pre_mutation() {
        display_status("The repository was not modified");
    } else if let ReleaseState::Failed { at } = state {
        display_status(&format!(
            "Run stopped after {:?}; local commits and tags were kept, reconcile with the remote manually",
            at
        ));
    }
}
