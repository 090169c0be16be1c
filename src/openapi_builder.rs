use crate::config::{ApiInfo, Server};
use crate::error::{Error, SchemaError};
use crate::model::TypeMap;
use crate::registry::{HttpMethod, RouteSpec};
use crate::schema_generator::{field_schema, type_schema, Schema};
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

pub const OPENAPI_VERSION: &str = "3.1.0";
const JSON_CONTENT: &str = "application/json";

/// OpenAPI document builder
pub struct OpenApiBuilder {
    /// OpenAPI info section
    info: Info,
    servers: Vec<Server>,
    /// Paths collection (URL path -> PathItem)
    paths: BTreeMap<String, PathItem>,
}

/// OpenAPI Info object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Info {
    /// API title
    pub title: String,
    /// API version
    pub version: String,
    /// API description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// OpenAPI PathItem object - represents all operations for a single path
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub get: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub put: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch: Option<Operation>,
}

impl PathItem {
    fn slot(&mut self, method: HttpMethod) -> &mut Option<Operation> {
        match method {
            HttpMethod::Get => &mut self.get,
            HttpMethod::Put => &mut self.put,
            HttpMethod::Post => &mut self.post,
            HttpMethod::Delete => &mut self.delete,
            HttpMethod::Options => &mut self.options,
            HttpMethod::Head => &mut self.head,
            HttpMethod::Patch => &mut self.patch,
        }
    }

    pub fn operation(&self, method: HttpMethod) -> Option<&Operation> {
        match method {
            HttpMethod::Get => self.get.as_ref(),
            HttpMethod::Put => self.put.as_ref(),
            HttpMethod::Post => self.post.as_ref(),
            HttpMethod::Delete => self.delete.as_ref(),
            HttpMethod::Options => self.options.as_ref(),
            HttpMethod::Head => self.head.as_ref(),
            HttpMethod::Patch => self.patch.as_ref(),
        }
    }
}

/// OpenAPI Operation object - represents a single API operation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub operation_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<bool>,
    /// Parameters (path, query, header)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Vec<Parameter>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBody>,
    /// Responses keyed by status code
    pub responses: BTreeMap<String, Response>,
}

/// OpenAPI Parameter object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    /// Parameter location (path, query, header)
    #[serde(rename = "in")]
    pub location: String,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub schema: Schema,
}

/// OpenAPI RequestBody object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub required: bool,
    /// Content types and their schemas
    pub content: BTreeMap<String, MediaType>,
}

/// OpenAPI MediaType object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaType {
    pub schema: Schema,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub examples: Option<BTreeMap<String, Example>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Example {
    pub value: Value,
}

/// OpenAPI Response object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<BTreeMap<String, MediaType>>,
}

/// OpenAPI Components object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Components {
    /// Schema definitions
    pub schemas: BTreeMap<String, Schema>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
}

/// Complete OpenAPI document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenApiDocument {
    pub openapi: String,
    pub info: Info,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub servers: Vec<Server>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub tags: Vec<Tag>,
    pub paths: BTreeMap<String, PathItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<Components>,
}

impl OpenApiBuilder {
    pub fn new(info: &ApiInfo) -> Self {
        debug!("Initializing OpenApiBuilder");
        Self {
            info: Info {
                title: info.title.clone(),
                version: info.version.clone(),
                description: info.description.clone(),
            },
            servers: info.servers.clone(),
            paths: BTreeMap::new(),
        }
    }

    /// Add a registered route to the document
    pub fn add_route(&mut self, route: &RouteSpec) -> Result<(), SchemaError> {
        debug!("Adding route: {} {}", route.method.as_str(), route.path);

        let parameters = if route.parameters.is_empty() {
            None
        } else {
            let params = route
                .parameters
                .iter()
                .map(|p| -> Result<Parameter, SchemaError> {
                    Ok(Parameter {
                        name: p.name.clone(),
                        location: p.location.as_str().to_string(),
                        required: p.required,
                        description: non_empty(&p.description),
                        schema: field_schema(&p.ty)
                            .map_err(|e| SchemaError::new(format!("parameter {}: {}", p.name, e)))?,
                    })
                })
                .collect::<Result<Vec<_>, SchemaError>>()?;
            Some(params)
        };

        let request_body = route.request.as_ref().and_then(|request| {
            request.ty.as_ref().map(|ty| RequestBody {
                description: non_empty(&request.description),
                required: true,
                content: json_content(Schema::reference_to(ty.name()), &request.examples),
            })
        });

        let responses = route
            .responses
            .iter()
            .map(|(status, response)| {
                let description = match non_empty(&response.description) {
                    Some(description) => description,
                    None => default_description(*status).to_string(),
                };
                let content = response
                    .ty
                    .as_ref()
                    .map(|ty| json_content(Schema::reference_to(ty.name()), &response.examples));
                (status.to_string(), Response { description, content })
            })
            .collect();

        let operation = Operation {
            operation_id: route.operation_id.clone(),
            summary: non_empty(&route.summary),
            description: non_empty(&route.description),
            tags: non_empty(&route.group).into_iter().collect(),
            deprecated: route.deprecated.as_ref().map(|_| true),
            parameters,
            request_body,
            responses,
        };

        let path_item = self.paths.entry(route.path.clone()).or_default();
        *path_item.slot(route.method) = Some(operation);
        Ok(())
    }

    /// Build the final OpenAPI document; components hold every type used by
    /// an HTTP operation.
    pub fn build(self, types: &TypeMap) -> Result<OpenApiDocument, Error> {
        debug!("Building final OpenAPI document");

        let mut schemas = BTreeMap::new();
        for descriptor in types.values().filter(|t| t.used_by_http) {
            let schema = type_schema(descriptor).map_err(|source| Error::Render {
                type_name: descriptor.name.clone(),
                source,
            })?;
            schemas.insert(descriptor.name.clone(), schema);
        }

        let tags: BTreeSet<String> = self
            .paths
            .values()
            .flat_map(|item| {
                [
                    &item.get, &item.put, &item.post, &item.delete, &item.options, &item.head,
                    &item.patch,
                ]
                .into_iter()
                .flatten()
                .flat_map(|op| op.tags.clone())
                .collect::<Vec<_>>()
            })
            .collect();

        Ok(OpenApiDocument {
            openapi: OPENAPI_VERSION.to_string(),
            info: self.info,
            servers: self.servers,
            tags: tags.into_iter().map(|name| Tag { name }).collect(),
            paths: self.paths,
            components: if schemas.is_empty() {
                None
            } else {
                Some(Components { schemas })
            },
        })
    }
}

fn non_empty(text: &str) -> Option<String> {
    if text.trim().is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

fn default_description(status: u16) -> &'static str {
    if (200..300).contains(&status) {
        "Successful response"
    } else {
        "Error response"
    }
}

fn json_content(schema: Schema, examples: &BTreeMap<String, Value>) -> BTreeMap<String, MediaType> {
    let examples = if examples.is_empty() {
        None
    } else {
        Some(
            examples
                .iter()
                .map(|(name, value)| (name.clone(), Example { value: value.clone() }))
                .collect(),
        )
    };
    let mut content = BTreeMap::new();
    content.insert(JSON_CONTENT.to_string(), MediaType { schema, examples });
    content
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FieldType, TypeDescriptor, TypeKind};
    use crate::registry::{ParameterLocation, TypeRef};
    use serde_json::json;

    fn info() -> ApiInfo {
        ApiInfo {
            title: "Fleet API".to_string(),
            version: "2.0.0".to_string(),
            description: Some("Device fleet".to_string()),
            servers: vec![Server {
                url: "https://fleet.example.com".to_string(),
                description: None,
            }],
        }
    }

    fn object(name: &str, http: bool) -> TypeDescriptor {
        let mut descriptor = TypeDescriptor::stub(name, "");
        descriptor.kind = TypeKind::Object;
        descriptor.used_by_http = http;
        descriptor
    }

    #[test]
    fn test_new_builder() {
        let builder = OpenApiBuilder::new(&info());

        assert_eq!(builder.info.title, "Fleet API");
        assert_eq!(builder.info.version, "2.0.0");
        assert_eq!(builder.servers.len(), 1);
        assert!(builder.paths.is_empty());
    }

    #[test]
    fn test_add_route_with_parameters_and_examples() {
        let mut builder = OpenApiBuilder::new(&info());
        let route = RouteSpec::new("getDevice", HttpMethod::Get, "/devices/{deviceID}")
            .summary("Get device", "Fetch one device.", "devices")
            .response(200, TypeRef::named("Device"), "")
            .response_example(200, "kitchen", json!({"id": "k1"}))
            .parameter("deviceID", ParameterLocation::Path, FieldType::string(), true, "Device id")
            .parameter("verbose", ParameterLocation::Query, FieldType::boolean(), false, "");

        builder.add_route(&route).unwrap();

        let operation = builder.paths["/devices/{deviceID}"].get.as_ref().unwrap();
        assert_eq!(operation.operation_id, "getDevice");
        assert_eq!(operation.tags, vec!["devices".to_string()]);

        let parameters = operation.parameters.as_ref().unwrap();
        assert_eq!(parameters.len(), 2);
        assert_eq!(parameters[0].location, "path");
        assert!(parameters[0].required);
        assert_eq!(parameters[0].description.as_deref(), Some("Device id"));
        assert_eq!(parameters[1].location, "query");
        assert!(parameters[1].description.is_none());

        let response = &operation.responses["200"];
        assert_eq!(response.description, "Successful response");
        let media = &response.content.as_ref().unwrap()[JSON_CONTENT];
        assert_eq!(media.schema, Schema::reference_to("Device"));
        assert_eq!(media.examples.as_ref().unwrap()["kitchen"].value, json!({"id": "k1"}));
    }

    #[test]
    fn test_add_multiple_routes_same_path() {
        let mut builder = OpenApiBuilder::new(&info());
        let list = RouteSpec::new("listDevices", HttpMethod::Get, "/devices")
            .response(200, TypeRef::named("Device"), "All devices");
        let create = RouteSpec::new("createDevice", HttpMethod::Post, "/devices")
            .request(TypeRef::named("Device"), BTreeMap::new())
            .response(201, TypeRef::named("Device"), "Created");

        builder.add_route(&list).unwrap();
        builder.add_route(&create).unwrap();

        assert_eq!(builder.paths.len(), 1);
        let item = &builder.paths["/devices"];
        assert_eq!(item.operation(HttpMethod::Get).unwrap().operation_id, "listDevices");
        let post = item.operation(HttpMethod::Post).unwrap();
        assert!(post.request_body.as_ref().unwrap().required);
        assert_eq!(post.responses["201"].description, "Created");
    }

    #[test]
    fn test_build_includes_only_http_types() {
        let mut builder = OpenApiBuilder::new(&info());
        let mut deprecated = RouteSpec::new("legacyList", HttpMethod::Get, "/legacy")
            .summary("", "", "legacy")
            .response(200, TypeRef::named("Device"), "");
        deprecated.deprecated = Some("use /devices".to_string());
        builder.add_route(&deprecated).unwrap();

        let types: TypeMap = [object("Device", true), object("Telemetry", false)]
            .into_iter()
            .map(|t| (t.name.clone(), t))
            .collect();
        let document = builder.build(&types).unwrap();

        assert_eq!(document.openapi, "3.1.0");
        assert_eq!(document.servers[0].url, "https://fleet.example.com");
        assert_eq!(document.tags.len(), 1);
        let schemas = &document.components.as_ref().unwrap().schemas;
        assert!(schemas.contains_key("Device"));
        assert!(!schemas.contains_key("Telemetry"));
        assert_eq!(
            document.paths["/legacy"].get.as_ref().unwrap().deprecated,
            Some(true)
        );
    }

    #[test]
    fn test_build_without_routes_has_no_components() {
        let document = OpenApiBuilder::new(&info()).build(&TypeMap::new()).unwrap();
        assert!(document.paths.is_empty());
        assert!(document.components.is_none());
    }
}
