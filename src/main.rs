//! OpenAPI Merge - Command-line tool for consolidating multi-file OpenAPI documents.
//!
//! Reads a root document whose `paths` and components reference other files, and writes
//! one self-contained document with every external reference resolved to a local one.
//!
//! # Usage
//!
//! ```bash
//! openapi-merge [OPTIONS]
//! ```
//!
//! # Examples
//!
//! Merge `api.yaml` into `merged_api.yaml`:
//! ```bash
//! openapi-merge
//! ```
//!
//! Merge a different root into JSON:
//! ```bash
//! openapi-merge -i api/openapi.yaml -o dist/openapi.json -f json
//! ```
//!
//! Enable verbose logging:
//! ```bash
//! openapi-merge -v
//! ```

use anyhow::Result;
use clap::Parser;
use log::info;
use openapi_merge::cli;

fn main() -> Result<()> {
    // Parse once to read the verbose flag, then validate after the logger is up
    let args = cli::CliArgs::parse();

    let log_level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    info!("OpenAPI Merge starting...");

    let args = cli::parse_args_from_parsed(args)?;
    cli::run(args)?;

    info!("OpenAPI merge completed successfully");

    Ok(())
}
