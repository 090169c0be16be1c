//! End-to-end assembly: declarations in, OpenAPI document and documentation
//! snapshot out.

use crate::config::{ApiInfo, ExternalTypes};
use crate::declarations::DeclarationScanner;
use crate::error::Error;
use crate::graph::TypeGraph;
use crate::model::TypeMap;
use crate::openapi_builder::{OpenApiBuilder, OpenApiDocument};
use crate::parser::{AstParser, ParsedFile};
use crate::registry::{Catalog, Registry};
use crate::render::Renderer;
use crate::scanner::FileScanner;
use crate::snapshot::Snapshot;
use anyhow::Result;
use log::{info, warn};
use std::path::PathBuf;

/// Scans and parses every declaration source, then builds the descriptor map.
///
/// A file that fails to parse is fatal: a missing declaration would surface
/// later as a confusing unknown-type error.
pub fn load_declarations(sources: &[PathBuf], external: &ExternalTypes) -> Result<TypeMap> {
    let scan_result = FileScanner::new(sources.to_vec()).scan()?;
    for warning in &scan_result.warnings {
        warn!("{}", warning);
    }
    info!("Found {} declaration files", scan_result.rust_files.len());

    let mut parsed: Vec<ParsedFile> = Vec::with_capacity(scan_result.rust_files.len());
    for (path, result) in scan_result
        .rust_files
        .iter()
        .zip(AstParser::parse_files(&scan_result.rust_files))
    {
        let file = result.map_err(|e| Error::Parse {
            file: path.clone(),
            message: format!("{:#}", e),
        })?;
        parsed.push(file);
    }

    let types = DeclarationScanner::new(external)
        .scan(&parsed)
        .map_err(Error::from)?;
    Ok(types)
}

/// Generated artifacts, owning the frozen catalog they were built from
#[derive(Debug)]
pub struct Artifacts {
    pub info: ApiInfo,
    pub catalog: Catalog,
    pub openapi: OpenApiDocument,
}

impl Artifacts {
    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot::new(
            &self.info,
            &self.catalog.types,
            &self.catalog.routes,
            &self.catalog.publications,
            &self.catalog.subscriptions,
        )
    }

    /// The documentation snapshot as pretty JSON.
    pub fn documentation_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string_pretty(&self.snapshot())?)
    }
}

pub struct Assembler {
    info: ApiInfo,
}

impl Assembler {
    pub fn new(info: ApiInfo) -> Self {
        Self { info }
    }

    /// Freezes the registry and builds every artifact.
    ///
    /// The registration window should already be closed; registrations that
    /// race with assembly would be missing from the output.
    pub fn assemble(&self, registry: Registry) -> crate::error::Result<Artifacts> {
        if registry.window().is_open() {
            warn!("Assembling while the registration window is still open");
        }
        let mut catalog = registry.into_catalog();

        TypeGraph::link_references(&mut catalog.types);
        TypeGraph::record_usage(&mut catalog.types, &catalog.consumptions);
        Renderer::render_all(&mut catalog.types, &catalog.examples)?;

        let mut builder = OpenApiBuilder::new(&self.info);
        for route in catalog.routes.values() {
            builder.add_route(route).map_err(|source| Error::Operation {
                operation_id: route.operation_id.clone(),
                source,
            })?;
        }
        let openapi = builder.build(&catalog.types)?;

        info!(
            "Assembled {} types, {} routes, {} publications, {} subscriptions",
            catalog.types.len(),
            catalog.routes.len(),
            catalog.publications.len(),
            catalog.subscriptions.len()
        );

        Ok(Artifacts {
            info: self.info.clone(),
            catalog,
            openapi,
        })
    }
}
