//! Contract generator - OpenAPI 3.1 and documentation artifacts from declared
//! Rust types and registered operations.
//!
//! Type declarations are read from source files, HTTP routes and pub/sub
//! channels are registered against them, and once the registration window
//! closes the whole set is assembled into an OpenAPI document and a
//! documentation snapshot with per-type renderings.
//!
//! # Architecture
//!
//! 1. [`scanner`] and [`parser`] - find declaration files and parse them with `syn`
//! 2. [`declarations`], [`enums`] and [`attrs`] - build the type descriptor map
//! 3. [`registry`] and [`topic`] - validate and record operations
//! 4. [`graph`] - derive `ReferencedBy` and transitive `UsedBy` edges
//! 5. [`schema_generator`] and [`render`] - schemas, examples and TypeScript text
//! 6. [`openapi_builder`], [`snapshot`] and [`assembler`] - the final artifacts
//! 7. [`serializer`] - YAML or JSON output
//!
//! # Example Usage
//!
//! ```no_run
//! use contract_from_source::{
//!     assembler::{load_declarations, Assembler},
//!     config::ApiInfo,
//!     model::FieldType,
//!     registry::{HttpMethod, OperationRegistry, ParameterLocation, RegistrationWindow, Registry, RouteSpec, TypeRef},
//!     serializer::serialize_yaml,
//! };
//! use std::collections::BTreeMap;
//! use std::path::PathBuf;
//!
//! let types = load_declarations(&[PathBuf::from("./src/api")], &BTreeMap::new()).unwrap();
//!
//! let window = RegistrationWindow::new();
//! let mut registry = Registry::new(types, window.clone());
//! registry
//!     .register_route(
//!         RouteSpec::new("listReadings", HttpMethod::Get, "/devices/{deviceID}/readings")
//!             .parameter("deviceID", ParameterLocation::Path, FieldType::string(), true, "")
//!             .response(200, TypeRef::named("Reading"), "Latest readings"),
//!     )
//!     .unwrap();
//! window.close();
//!
//! let artifacts = Assembler::new(ApiInfo::default()).assemble(registry).unwrap();
//! println!("{}", serialize_yaml(&artifacts.openapi).unwrap());
//! ```
//!
//! # Command-Line Interface
//!
//! For command-line usage, see the [`cli`] module.

pub mod assembler;
pub mod attrs;
pub mod cli;
pub mod config;
pub mod declarations;
pub mod enums;
pub mod error;
pub mod graph;
pub mod manifest;
pub mod model;
pub mod openapi_builder;
pub mod parser;
pub mod registry;
pub mod render;
pub mod scanner;
pub mod schema_generator;
pub mod serializer;
pub mod snapshot;
pub mod topic;
