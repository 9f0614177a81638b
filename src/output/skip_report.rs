//! Skip report writer

use crate::frontier::SkipEntry;
use crate::output::OutputResult;
use std::path::Path;

/// Writes the skip report as CSV with a `url,reason` header
///
/// The file is replaced on every call. The header is written even when there
/// are no entries.
pub fn write_skip_report(path: &Path, entries: &[SkipEntry]) -> OutputResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["url", "reason"])?;

    for entry in entries {
        writer.write_record([entry.url.as_str(), entry.reason.as_str()])?;
    }

    writer.flush()?;
    tracing::info!("Wrote {} skip entries to {}", entries.len(), path.display());
    Ok(())
}
