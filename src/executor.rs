// executor.rs - Single-domain task execution with transient-failure retry
//
// One domain in, exactly one DomainRecord out. Connection failures are
// retried up to retry.max_attempts with a fixed delay; everything else is
// recorded as NotFound immediately. Failures never propagate out of here -
// only the record does.

use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::config::{BatchConfig, RetryConfig};
use crate::fingerprint::{Fingerprinter, ScanError};
use crate::report::extract_detected_technologies;

/// Outcome class of a processed domain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordStatus {
    Success,
    NotFound,
}

/// One output row. Immutable once produced; written exactly once.
#[derive(Debug, Clone)]
pub struct DomainRecord {
    /// 1-based position in the original input ordering, stable across
    /// resumed runs
    pub serial: u64,
    /// Normalized HTTPS URL of the domain
    pub domain: String,
    /// Comma-joined technology list, or the configured not-found label
    pub technologies: String,
    pub status: RecordStatus,
}

/// Normalize a raw input line into the URL handed to the collaborator
pub fn normalize_url(raw_domain: &str) -> String {
    let trimmed = raw_domain.trim();
    if trimmed.starts_with("https://") || trimmed.starts_with("http://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    }
}

/// Process a single domain into its DomainRecord.
///
/// Never returns an error: per-domain failures are downgraded to a
/// NotFound record so one bad domain cannot abort the batch.
pub async fn process_domain(
    serial: u64,
    raw_domain: &str,
    fingerprinter: &dyn Fingerprinter,
    retry: &RetryConfig,
    batch: &BatchConfig,
) -> DomainRecord {
    let url = normalize_url(raw_domain);

    for attempt in 1..=retry.max_attempts {
        match fingerprinter.scan(&url).await {
            Ok(report) => {
                let technologies = extract_detected_technologies(&report);
                info!("Processed domain: {} (attempt {})", url, attempt);
                return DomainRecord {
                    serial,
                    domain: url,
                    technologies,
                    status: RecordStatus::Success,
                };
            }
            Err(ScanError::Connection(msg)) => {
                if attempt < retry.max_attempts {
                    warn!(
                        "Connection error for {} (attempt {}/{}): {} - retrying in {:?}",
                        url, attempt, retry.max_attempts, msg, retry.delay()
                    );
                    sleep(retry.delay()).await;
                } else {
                    error!(
                        "Connection error for {} (attempt {}/{}): {} - giving up",
                        url, attempt, retry.max_attempts, msg
                    );
                }
            }
            Err(ScanError::WrongContentType(content_type)) => {
                error!("Wrong content type for {}: {}", url, content_type);
                break;
            }
            Err(ScanError::Request(msg)) => {
                error!("Request error for {}: {}", url, msg);
                break;
            }
        }
    }

    DomainRecord {
        serial,
        domain: url,
        technologies: batch.not_found_label.clone(),
        status: RecordStatus::NotFound,
    }
}
