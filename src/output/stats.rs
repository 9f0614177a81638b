//! Console summaries
//!
//! This module prints the final counts of a crawl or classification run to
//! stdout once the run has finished.

use crate::classify::PipelineSummary;
use crate::frontier::{CrawlSummary, SkipEntry};
use std::collections::HashMap;

/// Counts skip entries per reason, most frequent first
pub fn reason_breakdown(skips: &[SkipEntry]) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for entry in skips {
        *counts.entry(entry.reason.as_str()).or_insert(0) += 1;
    }

    let mut counts: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(reason, count)| (reason.to_string(), count))
        .collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    counts
}

fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (part as f64 / total as f64) * 100.0
}

/// Prints crawl statistics to stdout in a formatted manner
pub fn print_crawl_summary(summary: &CrawlSummary, skips: &[SkipEntry]) {
    println!("=== Crawl Summary ===\n");

    println!("Pages:");
    println!("  Visited: {}", summary.visited);
    println!(
        "  Fetched: {} ({:.1}%)",
        summary.fetched,
        percentage(summary.fetched, summary.visited)
    );
    println!("  Skipped: {}", summary.skipped);
    println!("  Failed:  {}", summary.failed);
    println!();

    let breakdown = reason_breakdown(skips);
    if !breakdown.is_empty() {
        println!("Skip Reasons:");
        for (reason, count) in breakdown {
            println!("  {}: {}", reason, count);
        }
        println!();
    }
}

/// Prints classification statistics to stdout
pub fn print_pipeline_summary(summary: &PipelineSummary) {
    println!("=== Classification Summary ===\n");

    println!("Segments:");
    println!("  Total:       {}", summary.segments_total);
    println!("  Processed:   {}", summary.segments_processed);
    println!("  Skipped:     {}", summary.segments_skipped);
    println!("  Unprocessed: {}", summary.segments_unprocessed);
    println!();

    let records = summary.records_accepted + summary.records_rejected;
    println!("Records:");
    println!(
        "  Accepted: {} ({:.1}%)",
        summary.records_accepted,
        percentage(summary.records_accepted, records)
    );
    println!("  Rejected: {}", summary.records_rejected);
    if summary.write_failures > 0 {
        println!("  Write failures: {}", summary.write_failures);
    }
    println!();

    println!(
        "Workers: {} started, {} failed to load the model",
        summary.workers_started, summary.workers_failed
    );
}
