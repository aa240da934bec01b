use clap::Parser;

use crate::config::{AppConfig, BatchMode};

#[derive(Parser, Debug)]
#[command(name = "stackscan")]
#[command(about = "Scan a list of domains and record their web technology stacks to CSV")]
#[command(version)]
pub struct Cli {
    /// Text file with one domain per line
    #[arg(value_name = "INPUT_FILE", required_unless_present = "init")]
    pub input_file: Option<String>,

    /// Output base name; results are appended to <OUTPUT_BASE>.csv
    #[arg(value_name = "OUTPUT_BASE", required_unless_present = "init")]
    pub output_base: Option<String>,

    /// Create default configuration file at ./config/stackscan.toml and exit
    #[arg(long)]
    pub init: bool,

    /// Start at this 0-based input offset instead of resuming from the
    /// existing output file
    #[arg(long, value_name = "N")]
    pub start: Option<usize>,

    /// Domains per chunk in chunked mode (overrides config)
    #[arg(long, value_name = "N")]
    pub chunk_size: Option<usize>,

    /// Worker pool size (overrides config and implies --concurrent)
    #[arg(long, value_name = "N")]
    pub concurrency: Option<usize>,

    /// Use the bounded worker pool instead of sequential chunks.
    /// Rows land in completion order, not serial-number order.
    #[arg(long)]
    pub concurrent: bool,

    /// Technology Stack value recorded for unreachable domains (overrides config)
    #[arg(long, value_name = "LABEL")]
    pub not_found_label: Option<String>,

    /// Verbose logging (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Fold CLI overrides into the loaded configuration
    pub fn apply_to(&self, config: &mut AppConfig) {
        if let Some(chunk_size) = self.chunk_size {
            config.batch.chunk_size = chunk_size;
        }
        if let Some(concurrency) = self.concurrency {
            config.batch.concurrency = concurrency;
        }
        if self.concurrent || self.concurrency.is_some() {
            config.batch.mode = BatchMode::Concurrent;
        }
        if let Some(label) = &self.not_found_label {
            config.batch.not_found_label = label.clone();
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if let Some(0) = self.chunk_size {
            return Err("Chunk size must be greater than 0".to_string());
        }
        match self.concurrency {
            Some(0) => return Err("Concurrency must be greater than 0".to_string()),
            Some(n) if n > 100 => {
                return Err("Concurrency cannot exceed 100 to avoid overwhelming targets".to_string())
            }
            _ => {}
        }
        Ok(())
    }

    /// Output artifact path: `<output_base>.csv`
    pub fn output_path(&self) -> String {
        format!("{}.csv", self.output_base.as_deref().unwrap_or("stackscan_results"))
    }
}
