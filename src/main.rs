use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use stackscan::batch::BatchDriver;
use stackscan::cli::Cli;
use stackscan::config::AppConfig;
use stackscan::fingerprint::HttpFingerprinter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    if cli.init {
        match AppConfig::create_default_config() {
            Ok(path) => {
                println!("Created default configuration file at: {}", path.display());
                println!("Edit this file to customize settings, then run stackscan again.");
                return Ok(());
            }
            Err(e) => {
                eprintln!("Failed to create configuration file: {}", e);
                std::process::exit(1);
            }
        }
    }

    if let Err(msg) = cli.validate() {
        eprintln!("Error: {}", msg);
        std::process::exit(2);
    }

    let mut config = AppConfig::load().context("Failed to load configuration")?;
    cli.apply_to(&mut config);

    let input_file = cli.input_file.as_deref().expect("clap enforces input file");
    let output_path = cli.output_path();
    info!("Scanning domains from {} into {}", input_file, output_path);

    let fingerprinter =
        HttpFingerprinter::new(&config.http).context("Failed to build HTTP client")?;
    let driver = BatchDriver::new(config, Arc::new(fingerprinter));

    let summary = driver
        .run(Path::new(input_file), Path::new(&output_path), cli.start)
        .await?;

    println!(
        "Done: {} of {} domains processed this run ({} ok, {} not found)",
        summary.processed, summary.total_domains, summary.successes, summary.not_found
    );

    Ok(())
}

/// Timestamped, level-tagged console logging; RUST_LOG overrides the
/// verbosity flags.
fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("stackscan={}", default_level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
