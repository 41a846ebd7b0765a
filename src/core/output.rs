//! Unified output formatting utilities for consistent CLI presentation.
//!
//! Every command prints through these helpers so errors, results and streamed
//! package-manager output share one look.
//!
//! # Design Principles
//! - **Consistent color scheme**: Red for failures, green for success, bright_black for tool output
//! - **Streams**: Results go to stdout, progress and streamed tool output to stderr
//! - **Standardized spacing**: Newline before and after summaries

use crate::core::orchestrator::JobOutcome;
use crate::core::package::MutationKind;
use crate::core::sync::SyncProgress;
use colored::*;
use std::io::Write;

/// Formats and prints an error message with consistent styling
///
/// # Format
/// ```text
///
/// ✕ Error: <message>
///
/// ```
pub fn print_error(message: &str) {
    eprintln!("\n{} {}\n", "✕ Error:".red(), message.white());
}

/// Formats and prints a success message with consistent styling
pub fn print_success(message: &str) {
    println!("\n{} {}", "✓".green(), message.white());
}

/// Formats and prints an informational message with consistent styling
pub fn print_info(message: &str) {
    println!("\n{}\n", message.white());
}

/// Formats and prints a section header with consistent styling
pub fn print_section_header(header: &str) {
    println!("\n{}:\n", header.white());
}

/// One line of streamed package-manager output, indented and muted.
pub fn print_log_line(line: &str) {
    eprintln!("   {}", line.bright_black());
}

/// Rewrites a single progress line on stderr while an inventory is synchronized.
pub fn print_sync_progress(progress: SyncProgress) {
    eprint!(
        "\r{} {:>3}% ({}/{})",
        "Checking packages".blue(),
        progress.percent(),
        progress.done,
        progress.total
    );
    let _ = std::io::stderr().flush();
}

pub fn finish_sync_progress() {
    eprintln!();
}

/// Human-readable summary of a finished job.
pub fn describe_outcome(kind: MutationKind, package: &str, outcome: &JobOutcome) -> String {
    match outcome {
        JobOutcome::Succeeded => format!("'{package}' successfully {}", kind.past_tense()),
        JobOutcome::Failed { reason } => format!("{kind} of '{package}' failed: {reason}"),
    }
}

pub fn print_outcome(kind: MutationKind, package: &str, outcome: &JobOutcome) {
    let message = describe_outcome(kind, package, outcome);
    if outcome.is_success() {
        print_success(&message);
    } else {
        print_error(&message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_success() {
        let message = describe_outcome(MutationKind::Uninstall, "flask", &JobOutcome::Succeeded);
        assert_eq!(message, "'flask' successfully uninstalled");
    }

    #[test]
    fn test_describe_failure_includes_reason() {
        let message = describe_outcome(
            MutationKind::Update,
            "flask",
            &JobOutcome::failed("exit code 1"),
        );
        assert!(message.contains("update of 'flask' failed"));
        assert!(message.contains("exit code 1"));
    }

    #[test]
    fn test_print_functions_do_not_panic() {
        print_error("Test error message");
        print_success("Operation completed");
        print_info("Information message");
        print_section_header("Installed packages");
        print_log_line("Collecting flask");
        print_sync_progress(SyncProgress { done: 1, total: 2 });
        finish_sync_progress();
    }
}
