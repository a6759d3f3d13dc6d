use crate::merger::merge_to_file;
use crate::serializer::OutputFormat;
use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, error, info};
use std::path::PathBuf;

/// OpenAPI Merge - Consolidate a multi-file OpenAPI document into a single file
#[derive(Parser, Debug)]
#[command(name = "openapi-merge")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Root OpenAPI document
    #[arg(short = 'i', long = "input", value_name = "FILE", default_value = "api.yaml")]
    pub input: PathBuf,

    /// Output file path
    #[arg(short = 'o', long = "output", value_name = "FILE", default_value = "merged_api.yaml")]
    pub output: PathBuf,

    /// Output format (yaml or json)
    #[arg(short = 'f', long = "format", value_enum, default_value = "yaml")]
    pub format: OutputFormat,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

/// Parse command line arguments
pub fn parse_args() -> Result<CliArgs> {
    let args = CliArgs::parse();
    parse_args_from_parsed(args)
}

/// Validate and log already-parsed arguments
pub fn parse_args_from_parsed(args: CliArgs) -> Result<CliArgs> {
    debug!("Parsed arguments: {:?}", args);

    if !args.input.exists() {
        anyhow::bail!("Input file does not exist: {}", args.input.display());
    }

    if !args.input.is_file() {
        anyhow::bail!("Input path is not a file: {}", args.input.display());
    }

    info!("Input file: {}", args.input.display());
    info!("Output file: {}", args.output.display());
    info!("Output format: {:?}", args.format);

    Ok(args)
}

/// Run the merge workflow
pub fn run(args: CliArgs) -> Result<()> {
    info!("Starting OpenAPI merge...");

    let merged = merge_to_file(&args.input, &args.output, args.format)
        .inspect_err(|err| error!("{}", err.chain_message()))
        .with_context(|| format!("Failed to merge {}", args.input.display()))?;

    info!("Merge complete!");
    info!("Summary:");
    info!("  - Referenced files merged: {}", merged.files.len());
    for file in &merged.files {
        debug!("    {}", file.display());
    }
    info!("  - Output format: {:?}", args.format);

    println!("Merged OpenAPI document written to {}", args.output.display());
    Ok(())
}
