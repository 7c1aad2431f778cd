//! Pure formatting functions for UI output.
//!
//! Styling goes through `console`, which drops colors when the output is not
//! a terminal (CI logs stay readable).

use console::style;

use crate::boundary::BoundaryWarning;

/// Format and print an error message in red.
pub fn display_error(message: &str) {
    eprintln!("{} {}", style("ERROR:").red().bold(), message);
}

/// Format and print a success message with green checkmark.
pub fn display_success(message: &str) {
    println!("{} {}", style("✓").green(), message);
}

/// Format and print a status message with yellow arrow.
pub fn display_status(message: &str) {
    println!("{} {}", style("→").yellow(), message);
}

/// Display a boundary warning to the user.
pub fn display_boundary_warning(warning: &BoundaryWarning) {
    eprintln!("{} {}", style("⚠ WARNING:").yellow(), warning);
}

/// Display the proposed tag change (or initial tag).
///
/// Shows either:
/// - If updating: "From: old_tag -> To: new_tag"
/// - If initial: "Initial Tag: new_tag"
pub fn display_proposed_tag(old_tag: Option<&str>, new_tag: &str) {
    match old_tag {
        Some(old) => {
            println!("\n{}", style("Proposed Tag Change:").bold());
            println!("  From: {}", style(old).red());
            println!("  To:   {}", style(new_tag).green());
        }
        None => {
            println!("\n{}", style("Initial Tag:").bold());
            println!("  New tag: {}", style(new_tag).green());
        }
    }
}

/// Display the git command that publishes a locally created tag.
pub fn display_manual_push_instruction(tag: &str, branch: &str, remote: &str) {
    println!(
        "\n{} To publish this release later, run:\n  {}",
        style("→").yellow(),
        style(push_command(tag, branch, remote)).cyan()
    );
}

/// Git commands matching the release push: the branch, the release tag
/// forced, then the remaining tags unforced
pub fn push_command(tag: &str, branch: &str, remote: &str) -> String {
    format!(
        "git push {remote} {branch} && git push {remote} +refs/tags/{tag}:refs/tags/{tag} && git push {remote} --tags"
    )
}

/// Pipeline steps that will receive the new tag
pub fn display_downstream_scans<'a>(scans: impl IntoIterator<Item = &'a str>, new_tag: &str) {
    let scans: Vec<&str> = scans.into_iter().collect();
    if scans.is_empty() {
        return;
    }

    println!("\n{}", style("Downstream scans:").bold());
    for scan in scans {
        println!("  - {} ({})", scan, new_tag);
    }
}
