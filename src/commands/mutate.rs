use crate::core::colors::format_package_line;
use crate::core::{
    find_package, print_info, print_log_line, print_success, CommandContext, JobOutcome,
    MutationKind, MutationOrchestrator, PackageManager, PipPilotError, Result,
};
use colored::*;
use std::io::{self, BufRead, Write};

pub fn execute_install(context: &CommandContext, package: &str, refresh: bool) -> Result<()> {
    execute_mutation(context, MutationKind::Install, package, refresh)
}

pub fn execute_update(context: &CommandContext, package: &str, refresh: bool) -> Result<()> {
    execute_mutation(context, MutationKind::Update, package, refresh)
}

pub fn execute_uninstall(
    context: &CommandContext,
    package: &str,
    yes: bool,
    refresh: bool,
) -> Result<()> {
    let package = validate_package_name(package)?;
    if !yes && !confirm_uninstall(package, io::stdin().lock())? {
        print_info("Uninstall cancelled");
        return Ok(());
    }
    execute_mutation(context, MutationKind::Uninstall, package, refresh)
}

/// Run one mutation, streaming its output, then refresh the cached inventory
/// on success.
pub fn execute_mutation(
    context: &CommandContext,
    kind: MutationKind,
    package: &str,
    refresh: bool,
) -> Result<()> {
    let package = validate_package_name(package)?;
    let orchestrator = context.orchestrator();
    cancel_on_interrupt(&orchestrator);

    let handle = orchestrator.submit(package, kind)?;
    println!("\n{} {} '{}'...", "→".blue(), capitalize(kind.as_str()), package);

    match handle.wait_with(print_log_line) {
        JobOutcome::Succeeded => {
            print_success(&format!("'{package}' successfully {}", kind.past_tense()));
        }
        JobOutcome::Failed { reason } => {
            return Err(PipPilotError::mutation_failed(format!(
                "{kind} of '{package}' ended with {reason}"
            )));
        }
    }

    if refresh {
        refresh_inventory(context, Some(package));
    }
    println!();
    Ok(())
}

/// Ctrl-C cancels the running job, which kills its process group. The job
/// runs in its own group and would not see the terminal's interrupt.
pub fn cancel_on_interrupt<M: PackageManager + ?Sized + 'static>(
    orchestrator: &MutationOrchestrator<M>,
) {
    let interrupter = orchestrator.interrupter();
    if let Err(e) = ctrlc::set_handler(move || interrupter.cancel()) {
        log::warn!("Failed to set interrupt handler: {e}");
    }
}

/// Re-synchronize after a successful mutation and show `package`'s new state
/// when it is still installed. Failures only warn: the mutation itself
/// already succeeded.
pub fn refresh_inventory(context: &CommandContext, package: Option<&str>) {
    let result = context
        .synchronizer()
        .and_then(|synchronizer| synchronizer.synchronize(context.manager.as_ref()));

    match result {
        Ok(packages) => {
            let outdated = packages.iter().filter(|record| !record.up_to_date).count();
            println!(
                "{}",
                format!(
                    "Inventory refreshed: {} packages, {} outdated",
                    packages.len(),
                    outdated
                )
                .bright_black()
            );
            if let Some(record) = package.and_then(|name| find_package(&packages, name)) {
                println!("{}", format_package_line(record, record.name.len()));
            }
        }
        Err(e) => {
            log::warn!("Inventory refresh failed: {e}");
            println!("{}", format!("Inventory refresh failed: {e}").yellow());
        }
    }
}

pub fn validate_package_name(package: &str) -> Result<&str> {
    let package = package.trim();
    if package.is_empty() {
        return Err(PipPilotError::NoPackageName);
    }
    Ok(package)
}

fn confirm_uninstall(package: &str, mut input: impl BufRead) -> Result<bool> {
    print!(
        "\n{} ",
        format!("Are you sure you want to uninstall '{package}'? [y/N]:").blue()
    );
    io::stdout().flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
