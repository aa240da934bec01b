pub mod batch;
pub mod checkpoint;
pub mod cli;
pub mod config;
pub mod executor;
pub mod fingerprint;
pub mod report;
pub mod sink;

pub use batch::{BatchDriver, RunSummary};
pub use executor::{DomainRecord, RecordStatus};
pub use fingerprint::{Fingerprinter, HttpFingerprinter, ScanError};
