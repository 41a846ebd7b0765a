//! Color mapping for package staleness.
//!
//! # Color Scheme
//! - **Up to date**: Green status, white name
//! - **Outdated**: Yellow status with the installed version in red and the latest in green

use crate::core::package::PackageRecord;
use colored::*;

/// Status column text for a record.
pub fn status_label(record: &PackageRecord) -> ColoredString {
    if record.up_to_date {
        "up to date".green()
    } else {
        "update available".yellow()
    }
}

/// `installed` or `installed → latest` for outdated packages.
pub fn version_label(record: &PackageRecord) -> String {
    if record.up_to_date {
        record.installed_version.white().to_string()
    } else {
        format!(
            "{} → {}",
            record.installed_version.red(),
            record.latest_version.green()
        )
    }
}

/// Full package line padded so names line up in a column of `name_width`.
pub fn format_package_line(record: &PackageRecord, name_width: usize) -> String {
    let name = format!("{:<name_width$}", record.name);
    let name = if record.up_to_date {
        name.white()
    } else {
        name.bold()
    };
    format!("  {name}  {}  ({})", version_label(record), status_label(record))
}
