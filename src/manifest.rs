//! Declarative operation manifest.
//!
//! The command line tool has no host process calling the registration
//! surface, so operations are listed in a YAML (or JSON) document and fed
//! through the same validating [`OperationRegistry`].

use crate::error::RegistrationError;
use crate::registry::{OperationRegistry, PublicationSpec, RouteSpec, SubscriptionSpec};
use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub routes: Vec<RouteSpec>,
    #[serde(default)]
    pub publications: Vec<PublicationSpec>,
    #[serde(default)]
    pub subscriptions: Vec<SubscriptionSpec>,
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Loading operation manifest from {}", path.display());
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest: {}", path.display()))?;
        // YAML is a superset of JSON, one parser covers both
        let manifest = serde_yaml::from_str(&content)
            .with_context(|| format!("Invalid manifest: {}", path.display()))?;
        Ok(manifest)
    }

    pub fn len(&self) -> usize {
        self.routes.len() + self.publications.len() + self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registers every listed operation, stopping at the first rejection.
    pub fn register_into(self, registry: &mut dyn OperationRegistry) -> Result<(), RegistrationError> {
        for route in self.routes {
            registry.register_route(route)?;
        }
        for publication in self.publications {
            registry.register_publication(publication)?;
        }
        for subscription in self.subscriptions {
            registry.register_subscription(subscription)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FieldType, TypeDescriptor, TypeKind, TypeMap};
    use crate::registry::{HttpMethod, NoopRegistry, ParameterLocation, RegistrationWindow, Registry};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    const MANIFEST: &str = r#"
routes:
  - operationId: listReadings
    method: GET
    path: /devices/{deviceID}/readings
    summary: List readings
    group: readings
    parameters:
      - name: deviceID
        in: path
        required: true
        type: { kind: primitive, type: string }
      - name: limit
        in: query
        type: { kind: primitive, type: integer, format: int32 }
    responses:
      200:
        type: Reading
        description: Latest readings
publications:
  - operationId: publishReading
    topic: devices/{deviceID}/readings
    summary: Reading published
    description: Emitted after every measurement
    group: readings
    message: Reading
    retained: true
    topicParameters:
      - name: deviceID
        description: Device identifier
        type: { kind: primitive, type: string }
subscriptions:
  - operationId: receiveCommand
    topic: devices/{deviceID}/commands
    summary: Command received
    description: Commands addressed to one device
    group: commands
    message: Reading
    handler: commands::dispatch
    topicParameters:
      - name: deviceID
        description: Device identifier
        type: { kind: primitive, type: string }
"#;

    fn types() -> TypeMap {
        let mut reading = TypeDescriptor::stub("Reading", "pub struct Reading;");
        reading.kind = TypeKind::Object;
        [("Reading".to_string(), reading)].into_iter().collect()
    }

    #[test]
    fn test_parse_manifest() {
        let manifest: Manifest = serde_yaml::from_str(MANIFEST).unwrap();

        assert_eq!(manifest.len(), 3);
        let route = &manifest.routes[0];
        assert_eq!(route.method, HttpMethod::Get);
        assert_eq!(route.parameters[0].location, ParameterLocation::Path);
        assert_eq!(route.parameters[1].ty, FieldType::primitive("integer", Some("int32")));
        assert!(!route.parameters[1].required);
        assert_eq!(route.responses[&200].ty.as_ref().map(|t| t.name()), Some("Reading"));
        assert!(manifest.publications[0].retained);
        assert_eq!(
            manifest.subscriptions[0].handler.as_ref().map(|h| h.0.as_str()),
            Some("commands::dispatch")
        );
    }

    #[test]
    fn test_register_into_registry() {
        let manifest: Manifest = serde_yaml::from_str(MANIFEST).unwrap();
        let mut registry = Registry::new(types(), RegistrationWindow::new());

        manifest.register_into(&mut registry).unwrap();

        assert_eq!(registry.operation_count(), 3);
        assert_eq!(
            registry.publications()["publishReading"].wire_topic,
            "devices/+/readings"
        );
    }

    #[test]
    fn test_register_into_noop_accepts_anything() {
        let manifest: Manifest = serde_yaml::from_str(MANIFEST).unwrap();
        assert!(manifest.register_into(&mut NoopRegistry).is_ok());
    }

    #[test]
    fn test_registration_stops_at_first_rejection() {
        let mut manifest: Manifest = serde_yaml::from_str(MANIFEST).unwrap();
        manifest.publications[0].channel.operation_id = "listReadings".to_string();
        let mut registry = Registry::new(types(), RegistrationWindow::new());

        let err = manifest.register_into(&mut registry).unwrap_err();

        assert_eq!(err, RegistrationError::DuplicateOperationId("listReadings".to_string()));
        assert_eq!(registry.operation_count(), 1);
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("operations.yaml");
        fs::write(&path, MANIFEST).unwrap();

        let manifest = Manifest::load(&path).unwrap();
        assert_eq!(manifest.routes.len(), 1);
    }

    #[test]
    fn test_empty_manifest() {
        let manifest: Manifest = serde_yaml::from_str("{}").unwrap();
        assert!(manifest.is_empty());
    }
}
