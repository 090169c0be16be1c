//! Configuration consumed verbatim by the engine: API metadata, the
//! external-identifier allow-list, declaration sources and output locations.

use anyhow::{Context, Result};
use clap::ValueEnum;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Allow-list mapping a fully-qualified identifier to a fixed primitive
pub type ExternalTypes = BTreeMap<String, ExternalType>;

/// Schema primitive an external identifier stands for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalType {
    #[serde(rename = "type")]
    pub schema_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl ExternalType {
    pub fn new(schema_type: &str, format: Option<&str>) -> Self {
        Self {
            schema_type: schema_type.to_string(),
            format: format.map(str::to_string),
        }
    }
}

/// API metadata copied into the generated documents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiInfo {
    pub title: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub servers: Vec<Server>,
}

impl Default for ApiInfo {
    fn default() -> Self {
        Self {
            title: "Generated API".to_string(),
            version: "1.0.0".to_string(),
            description: None,
            servers: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Output format for the OpenAPI document
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// YAML format
    #[default]
    Yaml,
    /// JSON format
    Json,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Where the OpenAPI document is written; stdout when absent
    #[serde(default)]
    pub openapi: Option<PathBuf>,
    /// Where the documentation snapshot is written
    #[serde(default)]
    pub documentation: Option<PathBuf>,
    #[serde(default)]
    pub format: OutputFormat,
}

/// Top-level configuration file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub info: ApiInfo,
    /// Files or directories holding type declarations
    #[serde(default)]
    pub sources: Vec<PathBuf>,
    #[serde(default)]
    pub external_types: ExternalTypes,
    /// Optional operations manifest
    #[serde(default)]
    pub manifest: Option<PathBuf>,
    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    /// Loads a YAML configuration file.
    ///
    /// Relative paths inside the file are resolved against the directory
    /// containing it.
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Loading configuration from {}", path.display());
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration: {}", path.display()))?;
        let mut config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Invalid configuration: {}", path.display()))?;

        if let Some(base) = path.parent() {
            config.resolve_relative_to(base);
        }
        Ok(config)
    }

    fn resolve_relative_to(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        self.sources.iter_mut().for_each(resolve);
        self.manifest.iter_mut().for_each(resolve);
        self.output.openapi.iter_mut().for_each(resolve);
        self.output.documentation.iter_mut().for_each(resolve);
    }
}
