use crate::assembler::{load_declarations, Assembler};
use crate::config::{Config, OutputFormat};
use crate::manifest::Manifest;
use crate::registry::{RegistrationWindow, Registry};
use crate::serializer::{serialize, serialize_json, write_to_file};
use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info, warn};
use std::path::PathBuf;

/// Contract generator - OpenAPI and documentation artifacts from declared types and operations
#[derive(Parser, Debug)]
#[command(name = "contract-from-source")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to the configuration file
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Output format of the OpenAPI document; overrides the configuration
    #[arg(short = 'f', long = "format", value_enum)]
    pub output_format: Option<OutputFormat>,

    /// OpenAPI output file (if not specified anywhere, outputs to stdout)
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output_path: Option<PathBuf>,

    /// Documentation snapshot output file
    #[arg(short = 'd', long = "documentation", value_name = "FILE")]
    pub documentation_path: Option<PathBuf>,

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

    if !args.config.is_file() {
        anyhow::bail!("Configuration file does not exist: {}", args.config.display());
    }

    info!("Configuration: {}", args.config.display());
    if let Some(ref format) = args.output_format {
        info!("Output format: {:?}", format);
    }
    if let Some(ref output) = args.output_path {
        info!("Output file: {}", output.display());
    }

    Ok(args)
}

/// Command line flags take precedence over the configuration file.
fn apply_overrides(config: &mut Config, args: &CliArgs) {
    if let Some(format) = args.output_format {
        config.output.format = format;
    }
    if let Some(path) = &args.output_path {
        config.output.openapi = Some(path.clone());
    }
    if let Some(path) = &args.documentation_path {
        config.output.documentation = Some(path.clone());
    }
}

/// Run the main workflow
pub fn run(args: CliArgs) -> Result<()> {
    let mut config = Config::load(&args.config)?;
    apply_overrides(&mut config, &args);

    // Step 1: Scan and parse declarations
    info!("Scanning {} declaration sources...", config.sources.len());
    let types = load_declarations(&config.sources, &config.external_types)?;
    info!("Scanned {} declared types", types.len());

    // Step 2: Register operations while the window is open
    let window = RegistrationWindow::new();
    let mut registry = Registry::new(types, window.clone());
    match &config.manifest {
        Some(path) => {
            let manifest = Manifest::load(path)?;
            info!("Registering {} operations from {}", manifest.len(), path.display());
            manifest
                .register_into(&mut registry)
                .with_context(|| format!("Manifest rejected: {}", path.display()))?;
        }
        None => warn!("No operations manifest configured, documenting types only"),
    }
    window.close();

    // Step 3: Assemble artifacts
    let artifacts = Assembler::new(config.info.clone()).assemble(registry)?;

    // Step 4: Write the OpenAPI document
    let format = config.output.format;
    info!("Serializing to {:?} format...", format);
    let content = serialize(&artifacts.openapi, format)?;
    match &config.output.openapi {
        Some(path) => {
            write_to_file(&content, path)?;
            info!("Wrote OpenAPI document to {}", path.display());
        }
        None => println!("{}", content),
    }

    // Step 5: Write the documentation snapshot
    if let Some(path) = &config.output.documentation {
        let snapshot = serialize_json(&artifacts.snapshot())?;
        write_to_file(&snapshot, path)?;
        info!("Wrote documentation snapshot to {}", path.display());
    }

    info!("Generation complete!");
    info!("Summary:");
    info!("  - Types: {}", artifacts.catalog.types.len());
    info!("  - HTTP operations: {}", artifacts.catalog.routes.len());
    info!("  - Publications: {}", artifacts.catalog.publications.len());
    info!("  - Subscriptions: {}", artifacts.catalog.subscriptions.len());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cli_parses_flags() {
        let args = CliArgs::try_parse_from([
            "contract-from-source",
            "contract.yaml",
            "-f",
            "json",
            "-o",
            "out/openapi.json",
            "-d",
            "out/docs.json",
            "-v",
        ])
        .unwrap();

        assert_eq!(args.config, PathBuf::from("contract.yaml"));
        assert_eq!(args.output_format, Some(OutputFormat::Json));
        assert_eq!(args.output_path, Some(PathBuf::from("out/openapi.json")));
        assert_eq!(args.documentation_path, Some(PathBuf::from("out/docs.json")));
        assert!(args.verbose);
    }

    #[test]
    fn test_flags_override_configuration() {
        let args = CliArgs::try_parse_from(["contract-from-source", "c.yaml", "-f", "json"]).unwrap();
        let mut config = Config::default();
        config.output.openapi = Some(PathBuf::from("configured.yaml"));

        apply_overrides(&mut config, &args);

        assert_eq!(config.output.format, OutputFormat::Json);
        assert_eq!(config.output.openapi, Some(PathBuf::from("configured.yaml")));
        assert_eq!(config.output.documentation, None);
    }

    #[test]
    fn test_missing_config_rejected() {
        let args = CliArgs::try_parse_from(["contract-from-source", "/nonexistent/contract.yaml"]).unwrap();
        assert!(parse_args_from_parsed(args).is_err());
    }
}
