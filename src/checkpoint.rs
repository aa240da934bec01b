// checkpoint.rs - Resume-point resolution from the existing output artifact
//
// There is no separate checkpoint file: the CSV output itself records how
// far a prior run got. At startup we read its last row's Domain field and
// look it up in the input list; processing resumes immediately after it.
// Best-effort: assumes the input domain order is append-stable between runs.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::{debug, warn};

use crate::executor::normalize_url;

/// Read the Domain field of the last row in the output artifact.
///
/// A missing file is not an error - it means "no checkpoint, start fresh".
pub fn last_processed_domain(output_path: &Path) -> Result<Option<String>> {
    if !output_path.exists() {
        return Ok(None);
    }

    // A zero-byte output is the same situation as a missing one: the sink
    // can leave an empty file behind if a run dies before the header flush.
    let metadata = std::fs::metadata(output_path)
        .with_context(|| format!("Failed to stat output file: {}", output_path.display()))?;
    if metadata.len() == 0 {
        return Ok(None);
    }

    let mut reader = csv::Reader::from_path(output_path)
        .with_context(|| format!("Failed to read output file: {}", output_path.display()))?;

    let headers = reader.headers()?.clone();
    let domain_idx = headers
        .iter()
        .position(|h| h == "Domain")
        .context("Output file has no 'Domain' column")?;

    let mut last = None;
    for result in reader.records() {
        let record = result.with_context(|| {
            format!("Malformed row in output file: {}", output_path.display())
        })?;
        if let Some(domain) = record.get(domain_idx) {
            last = Some(domain.to_string());
        }
    }

    Ok(last)
}

/// Compute the resume offset into the input list for a given checkpoint
/// domain.
///
/// Matching is on the normalized domain value, not the raw input line, so
/// trailing whitespace in the input file cannot break resumption. This
/// assumes no duplicate domains in the input: with duplicates, the first
/// occurrence wins and later ones would be re-scanned.
///
/// Returns 0 (restart from the beginning) when the checkpoint domain is not
/// found - the input file changed or was truncated since the last run.
pub fn resume_offset(domains: &[String], last_domain: Option<&str>) -> usize {
    let Some(last) = last_domain else {
        return 0;
    };

    let normalized_last = normalize_url(last);
    match domains.iter().position(|d| normalize_url(d) == normalized_last) {
        Some(index) => {
            debug!("Checkpoint matched input line {} ({})", index + 1, last);
            index + 1
        }
        None => {
            warn!(
                "Checkpoint domain '{}' not found in input - restarting from the beginning",
                last
            );
            0
        }
    }
}
