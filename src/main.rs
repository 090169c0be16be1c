//! Contract generator - command-line tool producing an OpenAPI 3.1 document and a
//! documentation snapshot from declared types and registered operations.
//!
//! # Usage
//!
//! ```bash
//! contract-from-source [OPTIONS] <CONFIG>
//! ```
//!
//! # Examples
//!
//! Write the document where the configuration says:
//! ```bash
//! contract-from-source contract.yaml
//! ```
//!
//! JSON document plus a documentation snapshot:
//! ```bash
//! contract-from-source contract.yaml -f json -o openapi.json -d docs.json
//! ```

use anyhow::Result;
use clap::Parser;
use contract_from_source::cli;
use log::info;

fn main() -> Result<()> {
    // Parse once to read the verbose flag before the logger exists
    let args_for_verbose = cli::CliArgs::parse();

    let log_level = if args_for_verbose.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    info!("Contract generator starting...");

    let args = cli::parse_args_from_parsed(args_for_verbose)?;

    cli::run(args)?;

    info!("Contract generation completed successfully");

    Ok(())
}
