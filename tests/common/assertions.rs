//! Common assertion helpers for inventories and job event streams

#![allow(dead_code)]

use pip_pilot::{JobEvent, PackageRecord};
use predicates::prelude::*;

/// Asserts the staleness invariant on every record
pub fn assert_consistent(records: &[PackageRecord]) {
    for record in records {
        assert_eq!(
            record.up_to_date,
            record.installed_version == record.latest_version,
            "inconsistent record: {record:?}"
        );
    }
}

/// Looks a record up by name, panicking with context when missing
pub fn record<'a>(records: &'a [PackageRecord], name: &str) -> &'a PackageRecord {
    pip_pilot::find_package(records, name)
        .unwrap_or_else(|| panic!("no record for {name} in {records:?}"))
}

/// Output lines carried by a sequence of job events
pub fn lines(events: &[JobEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|event| match event {
            JobEvent::Line(line) => Some(line.clone()),
            _ => None,
        })
        .collect()
}

/// Creates a predicate that checks for a surfaced error message
pub fn has_error(message: &str) -> impl Predicate<str> {
    predicates::str::contains("Error:").and(predicates::str::contains(message.to_string()))
}
