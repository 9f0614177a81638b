//! Seed lists
//!
//! Seeds live in a CSV file whose first column is a URL or a bare domain.
//! The same format is produced by [`write_domain_csv`] from URL dumps, so
//! the output of the `domains` command can be fed straight back to `crawl`.

use crate::url::{domain_of, normalize_url};
use crate::Result;
use std::collections::{BTreeSet, HashSet};
use std::path::Path;

/// Turns a seed entry into an absolute URL
///
/// Bare domains (`example.mn`) are crawled over plain http.
fn seed_url(entry: &str) -> String {
    if entry.contains("://") {
        entry.to_string()
    } else {
        format!("http://{}", entry)
    }
}

/// Reads seed URLs from the first column of a CSV file
///
/// Empty rows are skipped, entries are trimmed, duplicates (after
/// normalization) keep their first position, and entries that are not valid
/// http(s) URLs are logged and dropped.
pub fn read_seed_file(path: &Path) -> Result<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(csv_to_io)?;

    let mut seen = HashSet::new();
    let mut seeds = Vec::new();

    for (line, row) in reader.records().enumerate() {
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                tracing::warn!("Skipping unreadable seed row {}: {}", line + 1, e);
                continue;
            }
        };

        let Some(entry) = row.get(0).map(str::trim).filter(|e| !e.is_empty()) else {
            continue;
        };

        match normalize_url(&seed_url(entry)) {
            Ok(url) => {
                if seen.insert(url.to_string()) {
                    seeds.push(url.to_string());
                }
            }
            Err(e) => tracing::warn!("Skipping malformed seed {:?}: {}", entry, e),
        }
    }

    tracing::info!("Loaded {} seeds from {}", seeds.len(), path.display());
    Ok(seeds)
}

/// Collects the distinct hosts of every URL listed in the given CSV files
///
/// Ports are dropped; rows that do not hold a parseable URL are ignored.
pub fn collect_domains<P: AsRef<Path>>(paths: &[P]) -> Result<BTreeSet<String>> {
    let mut domains = BTreeSet::new();

    for path in paths {
        let path = path.as_ref();
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path)
            .map_err(csv_to_io)?;

        let before = domains.len();
        for row in reader.records().flatten() {
            if let Some(domain) = row.get(0).and_then(domain_of) {
                domains.insert(domain);
            }
        }
        tracing::debug!(
            "{}: {} new domains",
            path.display(),
            domains.len() - before
        );
    }

    Ok(domains)
}

/// Writes one quoted value per line, replacing any existing file
///
/// Used for seed domain lists and for index URL lists.
pub fn write_domain_csv<'a, I>(path: &Path, domains: I) -> Result<usize>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .from_path(path)
        .map_err(csv_to_io)?;

    let mut count = 0;
    for domain in domains {
        writer.write_record([domain.as_str()]).map_err(csv_to_io)?;
        count += 1;
    }
    writer.flush()?;

    tracing::info!("Wrote {} rows to {}", count, path.display());
    Ok(count)
}

fn csv_to_io(error: csv::Error) -> std::io::Error {
    match error.into_kind() {
        csv::ErrorKind::Io(e) => e,
        other => std::io::Error::new(std::io::ErrorKind::InvalidData, format!("{:?}", other)),
    }
}
