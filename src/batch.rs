//! Batch driver: turns a domain list into a fault-tolerant, incrementally
//! persisted CSV stream
//!
//! Supports:
//! - Chunked sequential mode: fixed-size chunks, one domain at a time,
//!   strict input order in the output
//! - Concurrent mode: bounded worker pool over the whole remainder, rows
//!   appended in completion order (serial numbers stay correct)
//! - Resume from the existing output artifact via the checkpoint resolver
//! - Error resilience: a failed domain becomes a NotFound row, never an abort

use anyhow::{Context, Result};
use futures::{stream, StreamExt};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::checkpoint::{last_processed_domain, resume_offset};
use crate::config::{AppConfig, BatchMode};
use crate::executor::{process_domain, DomainRecord, RecordStatus};
use crate::fingerprint::Fingerprinter;
use crate::sink::CsvSink;

/// A contiguous slice of the remaining domain list. Units never overlap and
/// are processed in input order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkUnit {
    /// Offset into the remaining list (not the full input)
    pub start: usize,
    pub len: usize,
}

impl WorkUnit {
    /// Remaining-count value logged after this unit completes. This is the
    /// literal `total - (start + chunk_size)` and goes negative on a short
    /// final chunk.
    pub fn remaining_after(&self, total: usize, chunk_size: usize) -> i64 {
        total as i64 - (self.start + chunk_size) as i64
    }
}

/// Partition `total` remaining domains into fixed-size contiguous units
pub fn plan_units(total: usize, chunk_size: usize) -> Vec<WorkUnit> {
    let mut units = Vec::new();
    let mut start = 0;
    while start < total {
        let len = chunk_size.min(total - start);
        units.push(WorkUnit { start, len });
        start += len;
    }
    units
}

/// Read the input domain list: one domain per line, surrounding whitespace
/// stripped, blank lines skipped. A missing or unreadable file is fatal.
pub fn read_domain_file(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read input file: {}", path.display()))?;

    Ok(content
        .lines()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .collect())
}

/// Counters for a completed run
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub total_domains: usize,
    pub resume_offset: usize,
    pub processed: usize,
    pub successes: usize,
    pub not_found: usize,
}

impl RunSummary {
    fn tally(&mut self, record: &DomainRecord) {
        self.processed += 1;
        match record.status {
            RecordStatus::Success => self.successes += 1,
            RecordStatus::NotFound => self.not_found += 1,
        }
    }
}

/// Drives the executor over the domain list and persists results
pub struct BatchDriver {
    config: AppConfig,
    fingerprinter: Arc<dyn Fingerprinter>,
}

impl BatchDriver {
    pub fn new(config: AppConfig, fingerprinter: Arc<dyn Fingerprinter>) -> Self {
        Self { config, fingerprinter }
    }

    /// Run the full pipeline: load input, resolve the resume point, process
    /// the remainder in the configured mode, appending to `output_path`.
    ///
    /// `start_override` skips checkpoint resolution and resumes at that
    /// 0-based input offset instead.
    pub async fn run(
        &self,
        input_path: &Path,
        output_path: &Path,
        start_override: Option<usize>,
    ) -> Result<RunSummary> {
        let domains = read_domain_file(input_path)?;
        info!("Total domains to process: {}", domains.len());

        let offset = match start_override {
            Some(start) => start.min(domains.len()),
            None => {
                let last = last_processed_domain(output_path)?;
                resume_offset(&domains, last.as_deref())
            }
        };
        if offset > 0 {
            info!("Resuming at input position {} of {}", offset + 1, domains.len());
        }

        let mut sink = CsvSink::open(output_path)?;

        let mut summary = RunSummary {
            total_domains: domains.len(),
            resume_offset: offset,
            ..Default::default()
        };

        let remaining = &domains[offset..];
        match self.config.batch.mode {
            BatchMode::Chunked => {
                self.run_chunked(remaining, offset, &mut sink, &mut summary).await?;
            }
            BatchMode::Concurrent => {
                self.run_concurrent(remaining, offset, &mut sink, &mut summary).await?;
            }
        }

        info!(
            "Run complete: {} processed ({} ok, {} not found), output {}",
            summary.processed,
            summary.successes,
            summary.not_found,
            sink.path().display()
        );
        Ok(summary)
    }

    /// Sequential fixed-size chunks; every record is flushed as it is
    /// produced and a progress line follows each chunk.
    async fn run_chunked(
        &self,
        remaining: &[String],
        offset: usize,
        sink: &mut CsvSink,
        summary: &mut RunSummary,
    ) -> Result<()> {
        let chunk_size = self.config.batch.chunk_size;
        let total = remaining.len();

        for unit in plan_units(total, chunk_size) {
            let chunk = &remaining[unit.start..unit.start + unit.len];

            for (i, domain) in chunk.iter().enumerate() {
                let serial = (offset + unit.start + i + 1) as u64;
                let record = process_domain(
                    serial,
                    domain,
                    self.fingerprinter.as_ref(),
                    &self.config.retry,
                    &self.config.batch,
                )
                .await;
                sink.write_record(&record)?;
                summary.tally(&record);
            }

            info!(
                "Chunk complete ({} domains), {} remaining",
                unit.len,
                unit.remaining_after(total, chunk_size)
            );
        }

        Ok(())
    }

    /// Bounded worker pool over the whole remainder. Rows are written in
    /// completion order; the single consumer loop below is the only writer,
    /// so no further serialization of the sink is needed.
    async fn run_concurrent(
        &self,
        remaining: &[String],
        offset: usize,
        sink: &mut CsvSink,
        summary: &mut RunSummary,
    ) -> Result<()> {
        let concurrency = self.config.batch.concurrency;

        let mut results = stream::iter(remaining.iter().enumerate().map(|(i, domain)| {
            let serial = (offset + i + 1) as u64;
            let fingerprinter = self.fingerprinter.clone();
            let retry = &self.config.retry;
            let batch = &self.config.batch;
            async move {
                process_domain(serial, domain, fingerprinter.as_ref(), retry, batch).await
            }
        }))
        .buffer_unordered(concurrency);

        while let Some(record) = results.next().await {
            sink.write_record(&record)?;
            summary.tally(&record);
        }

        Ok(())
    }
}
