//! Markdown summary generation
//!
//! This module renders the final summary of a crawl or a classification run
//! as a small markdown report.

use crate::classify::PipelineSummary;
use crate::frontier::CrawlSummary;
use crate::output::OutputResult;
use chrono::{DateTime, Utc};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Metadata about a finished run
#[derive(Debug, Clone)]
pub struct RunInfo {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,

    /// SHA-256 of the configuration file, when one was used
    pub config_hash: Option<String>,

    /// True if the run was stopped before running out of work
    pub interrupted: bool,
}

impl RunInfo {
    pub fn duration_seconds(&self) -> i64 {
        (self.finished_at - self.started_at).num_seconds().max(0)
    }
}

/// Which engine produced the summary
#[derive(Debug, Clone)]
pub enum RunKind {
    Crawl(CrawlSummary),
    Classify(PipelineSummary),
}

/// Writes the markdown summary to `output_path`
pub fn write_markdown_summary(
    info: &RunInfo,
    kind: &RunKind,
    output_path: &Path,
) -> OutputResult<()> {
    let markdown = format_markdown_summary(info, kind);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    tracing::info!("Wrote summary to {}", output_path.display());
    Ok(())
}

/// Formats a run summary as markdown
pub fn format_markdown_summary(info: &RunInfo, kind: &RunKind) -> String {
    let mut md = String::new();

    let title = match kind {
        RunKind::Crawl(_) => "Crawl Summary",
        RunKind::Classify(_) => "Classification Summary",
    };
    md.push_str(&format!("# Corpus-Harvester {}\n\n", title));

    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Started**: {}\n", info.started_at.to_rfc3339()));
    md.push_str(&format!("- **Finished**: {}\n", info.finished_at.to_rfc3339()));
    md.push_str(&format!(
        "- **Duration**: {} seconds\n",
        info.duration_seconds()
    ));
    md.push_str(&format!(
        "- **Status**: {}\n",
        if info.interrupted {
            "interrupted"
        } else {
            "completed"
        }
    ));
    if let Some(hash) = &info.config_hash {
        md.push_str(&format!("- **Config Hash**: {}\n", hash));
    }
    md.push('\n');

    match kind {
        RunKind::Crawl(summary) => {
            md.push_str("## Pages\n\n");
            md.push_str("| Outcome | Count |\n");
            md.push_str("|---------|-------|\n");
            md.push_str(&format!("| Visited | {} |\n", summary.visited));
            md.push_str(&format!("| Fetched | {} |\n", summary.fetched));
            md.push_str(&format!("| Skipped | {} |\n", summary.skipped));
            md.push_str(&format!("| Failed | {} |\n", summary.failed));
        }
        RunKind::Classify(summary) => {
            md.push_str("## Segments\n\n");
            md.push_str("| Outcome | Count |\n");
            md.push_str("|---------|-------|\n");
            md.push_str(&format!("| Total | {} |\n", summary.segments_total));
            md.push_str(&format!("| Processed | {} |\n", summary.segments_processed));
            md.push_str(&format!("| Skipped | {} |\n", summary.segments_skipped));
            md.push_str(&format!(
                "| Unprocessed | {} |\n\n",
                summary.segments_unprocessed
            ));

            md.push_str("## Records\n\n");
            md.push_str("| Outcome | Count |\n");
            md.push_str("|---------|-------|\n");
            md.push_str(&format!("| Accepted | {} |\n", summary.records_accepted));
            md.push_str(&format!("| Rejected | {} |\n", summary.records_rejected));
            md.push_str(&format!(
                "| Write failures | {} |\n\n",
                summary.write_failures
            ));

            md.push_str("## Workers\n\n");
            md.push_str(&format!("- **Started**: {}\n", summary.workers_started));
            md.push_str(&format!("- **Failed to load model**: {}\n", summary.workers_failed));
        }
    }

    md
}
