//! Schema synthesis: pure mapping from descriptors to JSON Schema fragments
//! as embedded in an OpenAPI 3.1 document.

use crate::error::SchemaError;
use crate::model::{EnumLiteral, FieldDescriptor, FieldType, Shape, TypeDescriptor, TypeKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Prefix of every component reference
pub const COMPONENT_PREFIX: &str = "#/components/schemas/";

/// JSON Schema fragment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// Reference to a component schema
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    /// Single type or a type list when nullable
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<SchemaType>,
    /// Format for primitive types (e.g., "int32", "int64", "date-time")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<bool>,
    /// Pinned value of one enum member
    #[serde(rename = "const", skip_serializing_if = "Option::is_none")]
    pub const_value: Option<serde_json::Value>,
    /// Properties for object types
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, Schema>>,
    /// Required property names, in declaration order
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
    /// Items schema for array types
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,
    #[serde(rename = "additionalProperties", skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<AdditionalProperties>,
    #[serde(rename = "oneOf", skip_serializing_if = "Option::is_none")]
    pub one_of: Option<Vec<Schema>>,
    #[serde(rename = "allOf", skip_serializing_if = "Option::is_none")]
    pub all_of: Option<Vec<Schema>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SchemaType {
    Single(String),
    Multiple(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AdditionalProperties {
    Allowed(bool),
    Schema(Box<Schema>),
}

impl Schema {
    /// Inline schema of one primitive type
    pub fn typed(schema_type: &str) -> Self {
        Self {
            schema_type: Some(SchemaType::Single(schema_type.to_string())),
            ..Default::default()
        }
    }

    /// Pointer to a named component schema
    pub fn reference_to(name: &str) -> Self {
        Self {
            reference: Some(format!("{}{}", COMPONENT_PREFIX, name)),
            ..Default::default()
        }
    }

    /// True when the fragment is nothing but a `$ref`.
    pub fn is_bare_reference(&self) -> bool {
        self.reference.is_some()
    }

    /// Adds the `null` alternative: inline fragments gain it in their type
    /// list, everything else is wrapped in a `oneOf`.
    fn nullable(mut self) -> Self {
        let inline = self.reference.is_none();
        match self.schema_type.take() {
            Some(SchemaType::Single(single)) if inline => {
                self.schema_type = Some(SchemaType::Multiple(vec![single, "null".to_string()]));
                self
            }
            other => {
                self.schema_type = other;
                Self {
                    one_of: Some(vec![self, Schema::typed("null")]),
                    ..Default::default()
                }
            }
        }
    }

    /// Attaches a description and deprecation flag. A bare reference cannot
    /// carry siblings, so it is wrapped in an `allOf` first.
    fn annotate(self, description: &str, deprecated: bool) -> Self {
        if description.is_empty() && !deprecated {
            return self;
        }
        let mut schema = if self.is_bare_reference() {
            Self {
                all_of: Some(vec![self]),
                ..Default::default()
            }
        } else {
            self
        };
        if !description.is_empty() {
            schema.description = Some(description.to_string());
        }
        if deprecated {
            schema.deprecated = Some(true);
        }
        schema
    }
}

/// Schema fragment for a field, parameter or alias target.
pub fn field_schema(ty: &FieldType) -> Result<Schema, SchemaError> {
    let schema = match &ty.shape {
        Shape::Primitive { name, format } => Schema {
            format: format.clone(),
            ..Schema::typed(name)
        },
        Shape::Array { items } => {
            let items = items
                .as_deref()
                .ok_or_else(|| SchemaError::new("array without declared element type"))?;
            Schema {
                items: Some(Box::new(field_schema(items)?)),
                ..Schema::typed("array")
            }
        }
        Shape::Map { values } => {
            let additional = match values.as_deref() {
                Some(values) => AdditionalProperties::Schema(Box::new(field_schema(values)?)),
                None => AdditionalProperties::Allowed(false),
            };
            Schema {
                additional_properties: Some(additional),
                ..Schema::typed("object")
            }
        }
        Shape::Reference { name } | Shape::Enum { name } => Schema::reference_to(name),
    };

    Ok(if ty.nullable { schema.nullable() } else { schema })
}

/// Schema of one object property, carrying the field's documentation.
pub fn property_schema(field: &FieldDescriptor) -> Result<Schema, SchemaError> {
    let schema = field_schema(&field.ty)
        .map_err(|e| SchemaError::new(format!("field {}: {}", field.name, e.message)))?;
    Ok(schema.annotate(&field.description, field.deprecated.is_some()))
}

/// Component schema of a declared type.
pub fn type_schema(descriptor: &TypeDescriptor) -> Result<Schema, SchemaError> {
    let deprecated = descriptor.deprecated.is_some();
    match descriptor.kind {
        TypeKind::Object => {
            let mut properties = BTreeMap::new();
            let mut required = Vec::new();
            for field in &descriptor.fields {
                properties.insert(field.name.clone(), property_schema(field)?);
                if field.required {
                    required.push(field.name.clone());
                }
            }
            let schema = Schema {
                properties: Some(properties),
                required: if required.is_empty() { None } else { Some(required) },
                additional_properties: Some(AdditionalProperties::Allowed(false)),
                ..Schema::typed("object")
            };
            Ok(schema.annotate(&descriptor.description, deprecated))
        }
        TypeKind::StringEnum | TypeKind::NumberEnum => {
            if descriptor.enum_values.is_empty() {
                return Err(SchemaError::new(format!("enum {} has no members", descriptor.name)));
            }
            let alternatives = descriptor
                .enum_values
                .iter()
                .map(|value| {
                    let schema_type = match value.value {
                        EnumLiteral::Integer(_) => "integer",
                        EnumLiteral::String(_) => "string",
                    };
                    Schema {
                        const_value: Some(value.value.to_json()),
                        ..Schema::typed(schema_type)
                    }
                    .annotate(&value.description, value.deprecated.is_some())
                })
                .collect();
            let schema = Schema {
                one_of: Some(alternatives),
                ..Default::default()
            };
            Ok(schema.annotate(&descriptor.description, deprecated))
        }
        TypeKind::Alias => {
            let underlying = descriptor.underlying.as_ref().ok_or_else(|| {
                SchemaError::new(format!("alias {} has no underlying type", descriptor.name))
            })?;
            Ok(field_schema(underlying)?.annotate(&descriptor.description, deprecated))
        }
        TypeKind::Unresolved => Err(SchemaError::new(format!(
            "type {} was never resolved to a kind",
            descriptor.name
        ))),
    }
}
