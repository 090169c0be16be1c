//! Operation registration surface.
//!
//! HTTP routes, publications and subscriptions are declared once during
//! start-up through [`OperationRegistry`]. Every call is validated in full
//! before anything is stored, so a rejected registration leaves the registry
//! exactly as it was. Registration ends when the component starting the
//! transport closes the shared [`RegistrationWindow`].

use crate::error::RegistrationError;
use crate::graph::{Consumption, Transport, TypeGraph};
use crate::model::{FieldType, Shape, TypeMap, Usage};
use crate::topic::{self, TopicPattern};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Open/closed state shared between the registry and the transport.
///
/// The transition is one-way: once closed, the window never reopens.
#[derive(Debug, Clone, Default)]
pub struct RegistrationWindow {
    closed: Arc<AtomicBool>,
}

impl RegistrationWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Closes the window; later registrations are rejected.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            info!("Registration window closed");
        }
    }

    pub fn is_open(&self) -> bool {
        !self.closed.load(Ordering::SeqCst)
    }
}

/// A declared type attached to an operation
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeRef(String);

impl TypeRef {
    pub fn named(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Reference to a type carrying its own descriptor name.
    pub fn of<T: Documented>() -> Self {
        Self(T::TYPE_NAME.to_string())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Attaches the declared type name to a Rust type used in registrations.
///
/// ```ignore
/// impl Documented for Device {
///     const TYPE_NAME: &'static str = "Device";
/// }
/// ```
pub trait Documented {
    const TYPE_NAME: &'static str;
}

/// Name of the function handling a subscription
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandlerRef(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
}

impl ParameterLocation {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterLocation::Path => "path",
            ParameterLocation::Query => "query",
            ParameterLocation::Header => "header",
        }
    }
}

/// Declared HTTP parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    #[serde(rename = "in")]
    pub location: ParameterLocation,
    #[serde(rename = "type")]
    pub ty: FieldType,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

/// Request body: the declared type plus named examples
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestSpec {
    #[serde(rename = "type", default)]
    pub ty: Option<TypeRef>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub examples: BTreeMap<String, Value>,
}

/// One response: the type marker and its examples are separate fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseSpec {
    #[serde(rename = "type", default)]
    pub ty: Option<TypeRef>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub examples: BTreeMap<String, Value>,
}

/// Declaration of one HTTP route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteSpec {
    pub operation_id: String,
    pub method: HttpMethod,
    pub path: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub group: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<RequestSpec>,
    #[serde(default)]
    pub responses: BTreeMap<u16, ResponseSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<ParameterSpec>,
}

impl RouteSpec {
    pub fn new(operation_id: &str, method: HttpMethod, path: &str) -> Self {
        Self {
            operation_id: operation_id.to_string(),
            method,
            path: path.to_string(),
            summary: String::new(),
            description: String::new(),
            group: String::new(),
            deprecated: None,
            request: None,
            responses: BTreeMap::new(),
            parameters: Vec::new(),
        }
    }

    pub fn summary(mut self, summary: &str, description: &str, group: &str) -> Self {
        self.summary = summary.to_string();
        self.description = description.to_string();
        self.group = group.to_string();
        self
    }

    pub fn request(mut self, ty: TypeRef, examples: BTreeMap<String, Value>) -> Self {
        self.request = Some(RequestSpec {
            ty: Some(ty),
            description: String::new(),
            examples,
        });
        self
    }

    pub fn response(mut self, status: u16, ty: TypeRef, description: &str) -> Self {
        self.responses.insert(
            status,
            ResponseSpec {
                ty: Some(ty),
                description: description.to_string(),
                examples: BTreeMap::new(),
            },
        );
        self
    }

    /// Adds a named example to an already declared response.
    pub fn response_example(mut self, status: u16, name: &str, example: Value) -> Self {
        if let Some(response) = self.responses.get_mut(&status) {
            response.examples.insert(name.to_string(), example);
        }
        self
    }

    pub fn parameter(
        mut self,
        name: &str,
        location: ParameterLocation,
        ty: FieldType,
        required: bool,
        description: &str,
    ) -> Self {
        self.parameters.push(ParameterSpec {
            name: name.to_string(),
            location,
            ty,
            required,
            description: description.to_string(),
        });
        self
    }
}

/// Declared topic parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicParameterSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub ty: Option<FieldType>,
}

/// Fields shared by publications and subscriptions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelSpec {
    pub operation_id: String,
    pub topic: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub group: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub topic_parameters: Vec<TopicParameterSpec>,
    #[serde(default)]
    pub message: Option<TypeRef>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub examples: BTreeMap<String, Value>,
    #[serde(default)]
    pub qos: u8,
}

impl ChannelSpec {
    pub fn new(operation_id: &str, topic: &str, message: TypeRef) -> Self {
        Self {
            operation_id: operation_id.to_string(),
            topic: topic.to_string(),
            summary: String::new(),
            description: String::new(),
            group: String::new(),
            deprecated: None,
            topic_parameters: Vec::new(),
            message: Some(message),
            examples: BTreeMap::new(),
            qos: 0,
        }
    }

    pub fn summary(mut self, summary: &str, description: &str, group: &str) -> Self {
        self.summary = summary.to_string();
        self.description = description.to_string();
        self.group = group.to_string();
        self
    }

    pub fn topic_parameter(mut self, name: &str, ty: FieldType, description: &str) -> Self {
        self.topic_parameters.push(TopicParameterSpec {
            name: name.to_string(),
            description: description.to_string(),
            ty: Some(ty),
        });
        self
    }

    pub fn example(mut self, name: &str, example: Value) -> Self {
        self.examples.insert(name.to_string(), example);
        self
    }

    pub fn qos(mut self, qos: u8) -> Self {
        self.qos = qos;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicationSpec {
    #[serde(flatten)]
    pub channel: ChannelSpec,
    #[serde(default)]
    pub retained: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionSpec {
    #[serde(flatten)]
    pub channel: ChannelSpec,
    #[serde(default)]
    pub handler: Option<HandlerRef>,
}

/// Stored pub/sub operation with its derived wire topic
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelOperation {
    #[serde(flatten)]
    pub channel: ChannelSpec,
    pub wire_topic: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retained: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handler: Option<HandlerRef>,
}

/// The registration surface shared by the real registry and [`NoopRegistry`].
pub trait OperationRegistry {
    fn register_route(&mut self, spec: RouteSpec) -> Result<(), RegistrationError>;
    fn register_publication(&mut self, spec: PublicationSpec) -> Result<(), RegistrationError>;
    fn register_subscription(&mut self, spec: SubscriptionSpec) -> Result<(), RegistrationError>;
}

/// Accepts and discards every registration without validation.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRegistry;

impl OperationRegistry for NoopRegistry {
    fn register_route(&mut self, _spec: RouteSpec) -> Result<(), RegistrationError> {
        Ok(())
    }

    fn register_publication(&mut self, _spec: PublicationSpec) -> Result<(), RegistrationError> {
        Ok(())
    }

    fn register_subscription(&mut self, _spec: SubscriptionSpec) -> Result<(), RegistrationError> {
        Ok(())
    }
}

/// Consumed types of one validated operation, applied on commit
struct Plan {
    transport: Transport,
    consumed: Vec<(String, String)>,
    examples: Vec<(String, Value)>,
}

/// Validating registry over a scanned descriptor map
#[derive(Debug)]
pub struct Registry {
    types: TypeMap,
    window: RegistrationWindow,
    routes: BTreeMap<String, RouteSpec>,
    publications: BTreeMap<String, ChannelOperation>,
    subscriptions: BTreeMap<String, ChannelOperation>,
    /// Occupied method and path pairs
    route_keys: BTreeSet<(HttpMethod, String)>,
    examples: BTreeMap<String, Value>,
    consumptions: Vec<Consumption>,
}

impl Registry {
    pub fn new(types: TypeMap, window: RegistrationWindow) -> Self {
        Self {
            types,
            window,
            routes: BTreeMap::new(),
            publications: BTreeMap::new(),
            subscriptions: BTreeMap::new(),
            route_keys: BTreeSet::new(),
            examples: BTreeMap::new(),
            consumptions: Vec::new(),
        }
    }

    pub fn window(&self) -> &RegistrationWindow {
        &self.window
    }

    pub fn types(&self) -> &TypeMap {
        &self.types
    }

    pub fn routes(&self) -> &BTreeMap<String, RouteSpec> {
        &self.routes
    }

    pub fn publications(&self) -> &BTreeMap<String, ChannelOperation> {
        &self.publications
    }

    pub fn subscriptions(&self) -> &BTreeMap<String, ChannelOperation> {
        &self.subscriptions
    }

    /// Largest recorded example per type name.
    pub fn examples(&self) -> &BTreeMap<String, Value> {
        &self.examples
    }

    pub fn consumptions(&self) -> &[Consumption] {
        &self.consumptions
    }

    pub fn operation_count(&self) -> usize {
        self.routes.len() + self.publications.len() + self.subscriptions.len()
    }

    /// Hands the collected state over for assembly.
    pub fn into_catalog(self) -> Catalog {
        Catalog {
            types: self.types,
            routes: self.routes,
            publications: self.publications,
            subscriptions: self.subscriptions,
            examples: self.examples,
            consumptions: self.consumptions,
        }
    }

    fn check_identity(&self, operation_id: &str) -> Result<(), RegistrationError> {
        if !self.window.is_open() {
            return Err(RegistrationError::WindowClosed {
                operation_id: operation_id.to_string(),
            });
        }
        if operation_id.is_empty() || !operation_id.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(RegistrationError::InvalidOperationId(operation_id.to_string()));
        }
        if self.routes.contains_key(operation_id)
            || self.publications.contains_key(operation_id)
            || self.subscriptions.contains_key(operation_id)
        {
            return Err(RegistrationError::DuplicateOperationId(operation_id.to_string()));
        }
        Ok(())
    }

    fn check_type(&self, operation_id: &str, name: &str) -> Result<(), RegistrationError> {
        if self.types.contains_key(name) {
            Ok(())
        } else {
            Err(RegistrationError::UnknownType {
                operation_id: operation_id.to_string(),
                type_name: name.to_string(),
            })
        }
    }

    /// Checks every declared type inside a field type and rewrites
    /// references to enums into enum shapes.
    fn resolve_field_type(&self, operation_id: &str, ty: &mut FieldType) -> Result<(), RegistrationError> {
        match &mut ty.shape {
            Shape::Reference { name } | Shape::Enum { name } => {
                self.check_type(operation_id, name)?;
                let is_enum = self.types[name.as_str()].kind.is_enum();
                let name = std::mem::take(name);
                ty.shape = if is_enum {
                    Shape::Enum { name }
                } else {
                    Shape::Reference { name }
                };
                Ok(())
            }
            Shape::Array { items: Some(inner) } | Shape::Map { values: Some(inner) } => {
                self.resolve_field_type(operation_id, inner)
            }
            Shape::Array { items: None } => Err(RegistrationError::MissingField {
                operation_id: operation_id.to_string(),
                field: "array element type",
            }),
            _ => Ok(()),
        }
    }

    fn validate_route(&self, spec: &mut RouteSpec) -> Result<Plan, RegistrationError> {
        let id = spec.operation_id.clone();
        let invalid_path = |reason: String| RegistrationError::InvalidPath {
            operation_id: id.clone(),
            path: spec.path.clone(),
            reason,
        };

        if !spec.path.starts_with('/') {
            return Err(invalid_path("must start with '/'".to_string()));
        }
        let mut placeholders: Vec<&str> = Vec::new();
        for segment in spec.path.split('/').skip(1) {
            match topic::placeholder(segment) {
                Ok(Some(name)) if placeholders.contains(&name) => {
                    return Err(invalid_path(format!("placeholder {{{}}} appears more than once", name)));
                }
                Ok(Some(name)) => placeholders.push(name),
                Ok(None) => {}
                Err(err) => return Err(invalid_path(err.to_string())),
            }
        }

        if self.route_keys.contains(&(spec.method, spec.path.clone())) {
            return Err(RegistrationError::DuplicateRoute {
                operation_id: id,
                method: spec.method.as_str().to_string(),
                path: spec.path.clone(),
            });
        }

        let mut seen: BTreeSet<(ParameterLocation, &str)> = BTreeSet::new();
        for parameter in &spec.parameters {
            if !seen.insert((parameter.location, parameter.name.as_str())) {
                return Err(RegistrationError::DuplicateParameter {
                    operation_id: id.clone(),
                    name: parameter.name.clone(),
                    location: parameter.location.as_str().to_string(),
                });
            }
            if parameter.location == ParameterLocation::Path {
                if !placeholders.contains(&parameter.name.as_str()) {
                    return Err(RegistrationError::UnusedPathParameter {
                        operation_id: id.clone(),
                        name: parameter.name.clone(),
                    });
                }
                if !parameter.required {
                    return Err(RegistrationError::OptionalPathParameter {
                        operation_id: id.clone(),
                        name: parameter.name.clone(),
                    });
                }
            }
        }
        for name in &placeholders {
            if !seen.contains(&(ParameterLocation::Path, *name)) {
                return Err(RegistrationError::UndeclaredPathParameter {
                    operation_id: id.clone(),
                    name: name.to_string(),
                });
            }
        }

        if spec.responses.is_empty() {
            return Err(RegistrationError::MissingField {
                operation_id: id,
                field: "responses",
            });
        }

        let mut plan = Plan {
            transport: Transport::Http,
            consumed: Vec::new(),
            examples: Vec::new(),
        };

        if let Some(request) = &spec.request {
            let ty = request.ty.as_ref().ok_or_else(|| RegistrationError::MissingField {
                operation_id: id.clone(),
                field: "request type",
            })?;
            self.check_type(&id, ty.name())?;
            plan.consumed.push((ty.name().to_string(), "request".to_string()));
            for example in request.examples.values() {
                plan.examples.push((ty.name().to_string(), example.clone()));
            }
        }

        for (status, response) in &spec.responses {
            let ty = response.ty.as_ref().ok_or_else(|| RegistrationError::MissingField {
                operation_id: id.clone(),
                field: "response type",
            })?;
            self.check_type(&id, ty.name())?;
            plan.consumed.push((ty.name().to_string(), format!("response:{}", status)));
            for example in response.examples.values() {
                plan.examples.push((ty.name().to_string(), example.clone()));
            }
        }

        for parameter in &mut spec.parameters {
            self.resolve_field_type(&id, &mut parameter.ty)?;
            let mut names = BTreeSet::new();
            parameter.ty.collect_references(&mut names);
            for name in names {
                plan.consumed.push((name, format!("parameter:{}", parameter.name)));
            }
        }

        Ok(plan)
    }

    fn validate_channel(
        &self,
        channel: &mut ChannelSpec,
        role: &str,
    ) -> Result<(Plan, String), RegistrationError> {
        let id = channel.operation_id.clone();
        let missing = |field: &'static str| RegistrationError::MissingField {
            operation_id: id.clone(),
            field,
        };

        if channel.summary.trim().is_empty() {
            return Err(missing("summary"));
        }
        if channel.description.trim().is_empty() {
            return Err(missing("description"));
        }
        if channel.group.trim().is_empty() {
            return Err(missing("group"));
        }
        let message = channel.message.as_ref().ok_or_else(|| missing("message type"))?;
        if channel.qos > 2 {
            return Err(RegistrationError::InvalidQos {
                operation_id: id.clone(),
                qos: channel.qos,
            });
        }

        let topic_error = |source| RegistrationError::Topic {
            operation_id: id.clone(),
            source,
        };
        let pattern = TopicPattern::parse(&channel.topic).map_err(topic_error)?;
        pattern
            .cross_validate(&channel.topic_parameters)
            .map_err(topic_error)?;

        self.check_type(&id, message.name())?;
        let mut plan = Plan {
            transport: Transport::Messaging,
            consumed: vec![(message.name().to_string(), role.to_string())],
            examples: channel
                .examples
                .values()
                .map(|example| (message.name().to_string(), example.clone()))
                .collect(),
        };

        for parameter in &mut channel.topic_parameters {
            if let Some(ty) = parameter.ty.as_mut() {
                self.resolve_field_type(&id, ty)?;
                let mut names = BTreeSet::new();
                ty.collect_references(&mut names);
                for name in names {
                    plan.consumed.push((name, format!("topicParameter:{}", parameter.name)));
                }
            }
        }

        Ok((plan, pattern.to_wire()))
    }

    /// Applies a validated plan; nothing here can fail.
    fn commit(&mut self, operation_id: &str, plan: Plan) {
        for (type_name, role) in plan.consumed {
            TypeGraph::mark_used(&mut self.types, &type_name, plan.transport);
            self.consumptions.push(Consumption {
                type_name,
                usage: Usage::new(operation_id, role),
            });
        }
        for (type_name, example) in plan.examples {
            self.record_example(type_name, example);
        }
    }

    /// Keeps the example with the longest serialized form.
    fn record_example(&mut self, type_name: String, example: Value) {
        let size = |value: &Value| value.to_string().len();
        match self.examples.get(&type_name) {
            Some(current) if size(current) >= size(&example) => {}
            _ => {
                self.examples.insert(type_name, example);
            }
        }
    }
}

impl OperationRegistry for Registry {
    fn register_route(&mut self, mut spec: RouteSpec) -> Result<(), RegistrationError> {
        self.check_identity(&spec.operation_id)?;
        let plan = self.validate_route(&mut spec)?;

        debug!("Registered route {} {} ({})", spec.method.as_str(), spec.path, spec.operation_id);
        let id = spec.operation_id.clone();
        self.commit(&id, plan);
        self.route_keys.insert((spec.method, spec.path.clone()));
        self.routes.insert(id, spec);
        Ok(())
    }

    fn register_publication(&mut self, mut spec: PublicationSpec) -> Result<(), RegistrationError> {
        self.check_identity(&spec.channel.operation_id)?;
        let (plan, wire_topic) = self.validate_channel(&mut spec.channel, "publish")?;

        debug!("Registered publication {} on {}", spec.channel.operation_id, wire_topic);
        let id = spec.channel.operation_id.clone();
        self.commit(&id, plan);
        self.publications.insert(
            id,
            ChannelOperation {
                channel: spec.channel,
                wire_topic,
                retained: Some(spec.retained),
                handler: None,
            },
        );
        Ok(())
    }

    fn register_subscription(&mut self, mut spec: SubscriptionSpec) -> Result<(), RegistrationError> {
        self.check_identity(&spec.channel.operation_id)?;
        let (plan, wire_topic) = self.validate_channel(&mut spec.channel, "subscribe")?;
        let handler = spec.handler.ok_or_else(|| RegistrationError::MissingField {
            operation_id: spec.channel.operation_id.clone(),
            field: "handler",
        })?;

        debug!("Registered subscription {} on {}", spec.channel.operation_id, wire_topic);
        let id = spec.channel.operation_id.clone();
        self.commit(&id, plan);
        self.subscriptions.insert(
            id,
            ChannelOperation {
                channel: spec.channel,
                wire_topic,
                retained: None,
                handler: Some(handler),
            },
        );
        Ok(())
    }
}

/// Everything collected during registration, ready for assembly
#[derive(Debug)]
pub struct Catalog {
    pub types: TypeMap,
    pub routes: BTreeMap<String, RouteSpec>,
    pub publications: BTreeMap<String, ChannelOperation>,
    pub subscriptions: BTreeMap<String, ChannelOperation>,
    pub examples: BTreeMap<String, Value>,
    pub consumptions: Vec<Consumption>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TopicError;
    use crate::model::{TypeDescriptor, TypeKind};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    struct Device;

    impl Documented for Device {
        const TYPE_NAME: &'static str = "Device";
    }

    fn types() -> TypeMap {
        let mut device = TypeDescriptor::stub("Device", "");
        device.kind = TypeKind::Object;
        device.references.insert("Reading".to_string());
        let mut reading = TypeDescriptor::stub("Reading", "");
        reading.kind = TypeKind::Object;
        let mut status = TypeDescriptor::stub("SensorType", "");
        status.kind = TypeKind::StringEnum;
        [device, reading, status]
            .into_iter()
            .map(|t| (t.name.clone(), t))
            .collect()
    }

    fn registry() -> Registry {
        Registry::new(types(), RegistrationWindow::new())
    }

    fn readings_route(parameters: Vec<ParameterSpec>) -> RouteSpec {
        let mut route = RouteSpec::new("listReadings", HttpMethod::Get, "/devices/{deviceID}/readings")
            .summary("List readings", "Readings of one device.", "devices")
            .response(200, TypeRef::named("Reading"), "The readings");
        route.parameters = parameters;
        route
    }

    fn path_param(required: bool) -> ParameterSpec {
        ParameterSpec {
            name: "deviceID".to_string(),
            location: ParameterLocation::Path,
            ty: FieldType::string(),
            required,
            description: "Device identifier".to_string(),
        }
    }

    fn publication(id: &str) -> PublicationSpec {
        PublicationSpec {
            channel: ChannelSpec::new(id, "devices/{deviceID}/readings", TypeRef::of::<Device>())
                .summary("Reading published", "Emitted on every sample.", "telemetry")
                .topic_parameter("deviceID", FieldType::string(), "Device identifier"),
            retained: false,
        }
    }

    #[test]
    fn test_path_parameter_cross_check() {
        let mut registry = registry();
        registry.register_route(readings_route(vec![path_param(true)])).unwrap();
        assert_eq!(registry.routes().len(), 1);

        let mut registry = self::registry();
        assert_eq!(
            registry.register_route(readings_route(vec![])),
            Err(RegistrationError::UndeclaredPathParameter {
                operation_id: "listReadings".to_string(),
                name: "deviceID".to_string(),
            })
        );
        assert_eq!(
            registry.register_route(readings_route(vec![path_param(false)])),
            Err(RegistrationError::OptionalPathParameter {
                operation_id: "listReadings".to_string(),
                name: "deviceID".to_string(),
            })
        );
        assert!(registry.routes().is_empty());
    }

    #[test]
    fn test_unused_path_parameter_rejected() {
        let mut registry = registry();
        let mut extra = path_param(true);
        extra.name = "sensorID".to_string();
        let err = registry
            .register_route(readings_route(vec![path_param(true), extra]))
            .unwrap_err();
        assert!(matches!(err, RegistrationError::UnusedPathParameter { name, .. } if name == "sensorID"));
    }

    #[test]
    fn test_duplicate_id_across_kinds_leaves_registries_untouched() {
        let mut registry = registry();
        registry.register_publication(publication("deviceReadings")).unwrap();
        let examples_before = registry.examples().clone();
        let consumptions_before = registry.consumptions().len();

        let mut route = readings_route(vec![path_param(true)]);
        route.operation_id = "deviceReadings".to_string();
        assert_eq!(
            registry.register_route(route),
            Err(RegistrationError::DuplicateOperationId("deviceReadings".to_string()))
        );

        assert!(registry.routes().is_empty());
        assert_eq!(registry.publications().len(), 1);
        assert_eq!(registry.examples(), &examples_before);
        assert_eq!(registry.consumptions().len(), consumptions_before);
        assert!(!registry.types()["Reading"].used_by_http);
    }

    #[test]
    fn test_same_method_and_path_rejected() {
        let mut registry = registry();
        registry.register_route(readings_route(vec![path_param(true)])).unwrap();
        let consumptions_before = registry.consumptions().len();

        let mut again = readings_route(vec![path_param(true)]);
        again.operation_id = "listDeviceReadings".to_string();
        assert_eq!(
            registry.register_route(again),
            Err(RegistrationError::DuplicateRoute {
                operation_id: "listDeviceReadings".to_string(),
                method: "GET".to_string(),
                path: "/devices/{deviceID}/readings".to_string(),
            })
        );
        assert_eq!(registry.routes().keys().collect::<Vec<_>>(), vec!["listReadings"]);
        assert_eq!(registry.consumptions().len(), consumptions_before);

        let mut other_method = readings_route(vec![path_param(true)]);
        other_method.operation_id = "deleteReadings".to_string();
        other_method.method = HttpMethod::Delete;
        registry.register_route(other_method).unwrap();
        assert_eq!(registry.routes().len(), 2);
    }

    #[test]
    fn test_operation_id_letters_only() {
        let mut registry = registry();
        let mut route = readings_route(vec![path_param(true)]);
        route.operation_id = "list_readings2".to_string();
        assert_eq!(
            registry.register_route(route),
            Err(RegistrationError::InvalidOperationId("list_readings2".to_string()))
        );
    }

    #[test]
    fn test_window_closed_rejects_registration() {
        let window = RegistrationWindow::new();
        let mut registry = Registry::new(types(), window.clone());
        window.close();
        window.close();

        assert!(!registry.window().is_open());
        assert!(matches!(
            registry.register_publication(publication("deviceReadings")),
            Err(RegistrationError::WindowClosed { .. })
        ));
    }

    #[test]
    fn test_route_marks_types_transitively() {
        let mut registry = registry();
        let route = RouteSpec::new("getDevice", HttpMethod::Get, "/devices/{deviceID}")
            .response(200, TypeRef::of::<Device>(), "The device")
            .parameter("deviceID", ParameterLocation::Path, FieldType::string(), true, "Id");
        registry.register_route(route).unwrap();

        assert!(registry.types()["Device"].used_by_http);
        assert!(registry.types()["Reading"].used_by_http);
        assert!(!registry.types()["Reading"].used_by_messaging);
        assert_eq!(
            registry.consumptions()[0].usage,
            Usage::new("getDevice", "response:200")
        );
    }

    #[test]
    fn test_response_without_type_rejected() {
        let mut registry = registry();
        let mut route = RouteSpec::new("ping", HttpMethod::Get, "/ping");
        route.responses.insert(204, ResponseSpec::default());
        assert_eq!(
            registry.register_route(route),
            Err(RegistrationError::MissingField {
                operation_id: "ping".to_string(),
                field: "response type",
            })
        );
    }

    #[test]
    fn test_unknown_type_rejected() {
        let mut registry = registry();
        let route = RouteSpec::new("ping", HttpMethod::Get, "/ping").response(200, TypeRef::named("Pong"), "");
        assert_eq!(
            registry.register_route(route),
            Err(RegistrationError::UnknownType {
                operation_id: "ping".to_string(),
                type_name: "Pong".to_string(),
            })
        );
    }

    #[test]
    fn test_parameter_reference_to_enum_becomes_enum_shape() {
        let mut registry = registry();
        let route = RouteSpec::new("listByType", HttpMethod::Get, "/readings")
            .response(200, TypeRef::named("Reading"), "")
            .parameter("type", ParameterLocation::Query, FieldType::reference("SensorType"), false, "");
        registry.register_route(route).unwrap();

        let stored = &registry.routes()["listByType"].parameters[0];
        assert_eq!(stored.ty, FieldType::enumeration("SensorType"));
        assert!(registry
            .consumptions()
            .iter()
            .any(|c| c.usage == Usage::new("listByType", "parameter:type")));
    }

    #[test]
    fn test_largest_example_retained() {
        let mut registry = registry();
        registry
            .register_publication(PublicationSpec {
                channel: publication("small").channel.example("min", json!({"id": "a"})),
                retained: true,
            })
            .unwrap();
        registry
            .register_publication(PublicationSpec {
                channel: publication("large")
                    .channel
                    .example("full", json!({"id": "a", "label": "kitchen"})),
                retained: false,
            })
            .unwrap();

        assert_eq!(registry.examples()["Device"], json!({"id": "a", "label": "kitchen"}));
        assert_eq!(registry.publications()["small"].wire_topic, "devices/+/readings");
        assert_eq!(registry.publications()["small"].retained, Some(true));
    }

    #[test]
    fn test_channel_requirements() {
        let mut registry = registry();

        let mut missing_group = publication("noGroup");
        missing_group.channel.group.clear();
        assert_eq!(
            registry.register_publication(missing_group),
            Err(RegistrationError::MissingField {
                operation_id: "noGroup".to_string(),
                field: "group",
            })
        );

        let mut bad_qos = publication("badQos");
        bad_qos.channel.qos = 3;
        assert!(matches!(
            registry.register_publication(bad_qos),
            Err(RegistrationError::InvalidQos { qos: 3, .. })
        ));

        let mut wildcard = publication("wildcard");
        wildcard.channel.topic = "devices/#".to_string();
        assert!(matches!(
            registry.register_publication(wildcard),
            Err(RegistrationError::Topic {
                source: TopicError::Wildcard { wildcard: '#', .. },
                ..
            })
        ));

        let subscription = SubscriptionSpec {
            channel: publication("onReading").channel,
            handler: None,
        };
        assert_eq!(
            registry.register_subscription(subscription),
            Err(RegistrationError::MissingField {
                operation_id: "onReading".to_string(),
                field: "handler",
            })
        );
        assert_eq!(registry.operation_count(), 0);
    }

    #[test]
    fn test_noop_registry_accepts_anything() {
        let mut noop = NoopRegistry;
        let mut route = RouteSpec::new("not valid!", HttpMethod::Get, "no-slash");
        route.responses.clear();
        assert!(noop.register_route(route).is_ok());
        assert!(noop
            .register_subscription(SubscriptionSpec {
                channel: publication("x").channel,
                handler: None,
            })
            .is_ok());
    }
}
