//! Marker-based extraction of the technology list from a fingerprint report
//!
//! The fingerprinting collaborator produces a human-readable report. The
//! technology list sits between two fixed marker lines; everything else in
//! the report is noise as far as the CSV output is concerned. Extraction is
//! isolated here so the rest of the pipeline never sees raw report text.

/// Marker line that opens the technology section
pub const TECH_START_MARKER: &str = "Detected technologies:";

/// Marker line that opens the next (unrelated) report section
pub const TECH_END_MARKER: &str = "Detected the following interesting custom headers:";

/// Extract the detected technologies from a free-text fingerprint report.
///
/// Returns the technology names joined with `", "`. A report without a
/// technologies section yields an empty string - that means "nothing
/// detected", not "detection failed".
pub fn extract_detected_technologies(report: &str) -> String {
    let Some(start) = report.find(TECH_START_MARKER) else {
        return String::new();
    };

    let section = match report[start..].find(TECH_END_MARKER) {
        Some(end) => &report[start..start + end],
        None => &report[start..],
    };

    section
        .trim()
        .lines()
        .skip(1) // the marker line itself
        .map(clean_technology_line)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Strip surrounding whitespace and a single leading list marker.
///
/// Only the leading `-` is removed; hyphens inside a name (e.g.
/// "Font-Awesome") are part of the technology name and stay.
fn clean_technology_line(line: &str) -> String {
    line.trim()
        .strip_prefix('-')
        .unwrap_or(line.trim())
        .trim()
        .to_string()
}
