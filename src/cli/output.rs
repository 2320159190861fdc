//! Everything the CLI prints to stdout.

use std::{fmt::Write, fs};

use crate::{
    collection::worker::{CollectionEvent, Selection},
    pipeline::ReportOutcome,
    platform::SystemInfo,
    record::summarize_by_type,
};

pub const BANNER: &str = "Employee Digital Footprint Summarizer - CLI";

pub fn banner() -> String {
    format!("{BANNER}\n{}", "=".repeat(50))
}

pub fn system_info(info: &SystemInfo) -> String {
    let mut text = String::from("System Information:");
    for (key, value) in info.entries() {
        let _ = write!(text, "\n  {key}: {value}");
    }
    text
}

/// Progress line for a collection event, if it deserves one.
pub fn progress(event: &CollectionEvent) -> Option<String> {
    match event {
        CollectionEvent::Started(category) => Some(format!("Collecting {} data...", category.noun())),
        CollectionEvent::Collected {
            category,
            count,
            suppressed: 0,
        } => Some(format!("✓ Collected {count} {}", category.plural())),
        CollectionEvent::Collected {
            category,
            count,
            suppressed,
        } => Some(format!(
            "✓ Collected {count} {} ({suppressed} sources unavailable, see logs)",
            category.plural()
        )),
        CollectionEvent::Finished(_) | CollectionEvent::Failed(_) => None,
    }
}

pub fn outcome(outcome: &ReportOutcome, selection: &Selection) -> String {
    let size = fs::metadata(&outcome.report_path)
        .map(|m| format!("{} bytes", m.len()))
        .unwrap_or_else(|_| "unknown".into());
    let metadata = match &outcome.metadata {
        Ok(path) => path.display().to_string(),
        Err(e) => format!("not saved ({e})"),
    };

    let mut text = String::from("\n✓ Report generated successfully!");
    let _ = write!(text, "\n  File: {}", outcome.report_path.display());
    let _ = write!(text, "\n  Size: {size}");
    let _ = write!(text, "\n  Metadata: {metadata}");
    let _ = write!(text, "\n\nSummary:\n  Total data points: {}", outcome.counts.total());
    for category in selection.categories() {
        let records = outcome.data.get(category);
        let _ = write!(text, "\n  {}: {} items", category.key(), records.len());
        for (kind, count) in summarize_by_type(records) {
            let _ = write!(text, "\n    {kind}: {count}");
        }
    }
    text
}
