use crate::commands::mutate::validate_package_name;
use crate::core::{print_section_header, CommandContext, PackageManager, Registry, Result};
use colored::*;

/// Print `pip show` details for a package together with its latest registry version.
pub fn execute_show(context: &CommandContext, package: &str) -> Result<()> {
    let package = validate_package_name(package)?;

    let details = context
        .manager
        .show_details(package, context.settings.list_timeout());
    let latest = context.registry()?.latest_version(package);

    print_section_header(&format!("Package: {package}"));

    let installed = details
        .as_ref()
        .ok()
        .and_then(|text| field_value(text, "Version"));
    println!(
        "   Installed: {}",
        installed.unwrap_or("Not installed").blue()
    );
    match &latest {
        Ok(version) => println!("   Latest:    {}", version.green()),
        Err(e) => {
            log::debug!("Latest version lookup for {package} failed: {e}");
            println!("   Latest:    {}", "Could not fetch latest version".yellow());
        }
    }

    if let Ok(text) = &details {
        println!();
        for line in text.lines() {
            println!("   {}", line.white());
        }
    }
    println!();
    Ok(())
}

/// Value of a `Key: value` line in `pip show` output.
fn field_value<'a>(text: &'a str, key: &str) -> Option<&'a str> {
    text.lines().find_map(|line| {
        let (name, value) = line.split_once(':')?;
        (name.trim() == key).then(|| value.trim())
    })
}
