// sink.rs - Append-only CSV result storage
//
// The output artifact doubles as the checkpoint: every appended row is
// flushed before the next work unit starts, so a crash mid-run loses at
// most the in-flight unit and the next run resumes from the last row.

use anyhow::{Context, Result};
use csv::Writer;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::executor::DomainRecord;

/// CSV header, written exactly once when the artifact starts empty
pub const CSV_HEADERS: [&str; 3] = ["Serial Number", "Domain", "Technology Stack"];

pub struct CsvSink {
    writer: Writer<File>,
    path: PathBuf,
    rows_written: usize,
}

impl CsvSink {
    /// Open the output artifact for append, creating it if needed. The
    /// header row is written iff the file is empty at open time.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create output directory: {}", parent.display()))?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open output file: {}", path.display()))?;

        let was_empty = file
            .metadata()
            .with_context(|| format!("Failed to stat output file: {}", path.display()))?
            .len()
            == 0;

        let mut writer = Writer::from_writer(file);
        if was_empty {
            writer.write_record(CSV_HEADERS)?;
            writer.flush()?;
            debug!("Wrote CSV header to {}", path.display());
        }

        Ok(Self {
            writer,
            path: path.to_path_buf(),
            rows_written: 0,
        })
    }

    /// Append one record and make it durable immediately
    pub fn write_record(&mut self, record: &DomainRecord) -> Result<()> {
        self.writer
            .write_record([
                record.serial.to_string().as_str(),
                record.domain.as_str(),
                record.technologies.as_str(),
            ])
            .with_context(|| format!("Failed to write row for {}", record.domain))?;
        self.writer.flush()?;
        self.rows_written += 1;
        Ok(())
    }

    /// Rows written by this run (not counting rows from prior runs)
    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::RecordStatus;
    use tempfile::TempDir;

    fn record(serial: u64, domain: &str, technologies: &str) -> DomainRecord {
        DomainRecord {
            serial,
            domain: format!("https://{}", domain),
            technologies: technologies.to_string(),
            status: RecordStatus::Success,
        }
    }

    #[test]
    fn test_header_written_once_for_empty_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("out.csv");

        {
            let mut sink = CsvSink::open(&path).unwrap();
            sink.write_record(&record(1, "a.com", "React, Nginx")).unwrap();
        }
        {
            let mut sink = CsvSink::open(&path).unwrap();
            sink.write_record(&record(2, "b.com", "WordPress")).unwrap();
        }

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "Serial Number,Domain,Technology Stack");
        assert_eq!(lines[1], "1,https://a.com,\"React, Nginx\"");
        assert_eq!(lines[2], "2,https://b.com,WordPress");
    }

    #[test]
    fn test_rows_durable_per_write() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("out.csv");

        let mut sink = CsvSink::open(&path).unwrap();
        sink.write_record(&record(1, "a.com", "Nginx")).unwrap();

        // Visible on disk while the sink is still open
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("https://a.com"));
        assert_eq!(sink.rows_written(), 1);
    }

    #[test]
    fn test_empty_technologies_cell() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("out.csv");

        let mut sink = CsvSink::open(&path).unwrap();
        sink.write_record(&record(1, "a.com", "")).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.lines().any(|l| l == "1,https://a.com,"));
    }

    #[test]
    fn test_creates_parent_directory() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested/dir/out.csv");
        let sink = CsvSink::open(&path).unwrap();
        assert!(sink.path().exists());
    }
}
