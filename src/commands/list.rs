use crate::core::colors::format_package_line;
use crate::core::output::{finish_sync_progress, print_sync_progress};
use crate::core::{
    filter_by_name, print_info, print_section_header, sort_by_name, sort_outdated_first,
    spawn_synchronize, CommandContext, PackageRecord, Result,
};
use colored::*;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    /// Show the last synchronized inventory without contacting pip or the registry
    pub cached: bool,
    pub outdated_first: bool,
    pub filter: Option<String>,
}

pub fn execute_list(context: &CommandContext, options: ListOptions) -> Result<()> {
    let synchronizer = context.synchronizer()?;

    if options.cached {
        let Some(entry) = synchronizer.cached(context.manager.as_ref()) else {
            print_info("No cached inventory for this environment. Run 'pip-pilot list' first.");
            return Ok(());
        };
        let synced_at = entry.synced_at.with_timezone(&chrono::Local);
        println!(
            "{}",
            format!("Cached inventory from {}", synced_at.format("%Y-%m-%d %H:%M")).bright_black()
        );
        print_inventory(entry.packages, &options);
        return Ok(());
    }

    let synchronizer = Arc::new(synchronizer);
    let handle = spawn_synchronize(Arc::clone(&synchronizer), Arc::clone(&context.manager))?;
    let result = handle.wait_with(print_sync_progress);
    finish_sync_progress();
    let packages = result?;

    print_inventory(packages, &options);

    if let Some(tool) = synchronizer.check_tool(context.manager.as_ref()) {
        print_section_header("Package manager");
        println!("{}", format_package_line(&tool, tool.name.len()));
    }
    println!();
    Ok(())
}

fn print_inventory(mut packages: Vec<PackageRecord>, options: &ListOptions) {
    if options.outdated_first {
        sort_outdated_first(&mut packages);
    } else {
        sort_by_name(&mut packages);
    }

    let shown = match &options.filter {
        Some(needle) => filter_by_name(&packages, needle),
        None => packages.iter().collect(),
    };

    let outdated = packages.iter().filter(|record| !record.up_to_date).count();
    print_section_header(&format!(
        "Installed packages ({}, {} outdated)",
        packages.len(),
        outdated
    ));

    if shown.is_empty() {
        println!("  {}", "No matching packages".bright_black());
        return;
    }

    let name_width = shown.iter().map(|record| record.name.len()).max().unwrap_or(0);
    for record in shown {
        println!("{}", format_package_line(record, name_width));
    }
}
