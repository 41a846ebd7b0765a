use crate::commands::mutate::{cancel_on_interrupt, refresh_inventory};
use crate::core::{
    print_info, print_log_line, print_outcome, print_section_header, print_success,
    CommandContext, JobEvent, JobOutcome, MutationKind, PackageManager, PipPilotError, Result,
};
use colored::*;

/// Update every installed package, or only the outdated ones, one job at a time.
pub fn execute_update_all(context: &CommandContext, outdated_only: bool) -> Result<()> {
    let packages = packages_to_update(context, outdated_only)?;
    if packages.is_empty() {
        print_success("Everything is up to date\n");
        return Ok(());
    }

    print_info(&format!("Updating {} packages...", packages.len()));
    let orchestrator = context.orchestrator();
    cancel_on_interrupt(&orchestrator);
    let outcomes = orchestrator.run_sequence(
        MutationKind::Update,
        &packages,
        Some(context.settings.update_all_timeout()),
        |package, event| match event {
            JobEvent::Queued => {}
            JobEvent::Started => println!("{} {}", "→".blue(), package.white()),
            JobEvent::Line(line) => print_log_line(line),
            JobEvent::Finished(outcome) => print_outcome(MutationKind::Update, package, outcome),
        },
    )?;

    let failed = failed_packages(&outcomes);
    print_section_header("Summary");
    println!(
        "   Updated {} of {} packages",
        (outcomes.len() - failed.len()).to_string().green(),
        outcomes.len()
    );
    if !failed.is_empty() {
        println!("   Failed:  {}", failed.join(", ").red());
    }

    if failed.len() < outcomes.len() {
        refresh_inventory(context, None);
    }
    println!();

    if failed.is_empty() {
        Ok(())
    } else {
        Err(PipPilotError::mutation_failed(format!(
            "{} of {} updates failed",
            failed.len(),
            outcomes.len()
        )))
    }
}

fn packages_to_update(context: &CommandContext, outdated_only: bool) -> Result<Vec<String>> {
    if outdated_only {
        let records = context
            .synchronizer()?
            .synchronize(context.manager.as_ref())?;
        return Ok(records
            .into_iter()
            .filter(|record| !record.up_to_date)
            .map(|record| record.name)
            .collect());
    }

    let installed = context
        .manager
        .list_installed(context.settings.list_timeout())
        .map_err(PipPilotError::inventory_unavailable)?;
    Ok(installed.into_iter().map(|package| package.name).collect())
}

fn failed_packages(outcomes: &[(String, JobOutcome)]) -> Vec<&str> {
    outcomes
        .iter()
        .filter(|(_, outcome)| !outcome.is_success())
        .map(|(package, _)| package.as_str())
        .collect()
}
