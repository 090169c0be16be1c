//! Canonical descriptors shared by every stage of the pipeline.
//!
//! A [`TypeDescriptor`] starts life as a stub registered by the declaration
//! scanner, is enriched with fields, underlying types or enum values, and is
//! finally frozen once the type graph and renderings have been computed.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Name-keyed map of every declared type
pub type TypeMap = BTreeMap<String, TypeDescriptor>;

/// Kind of a declared type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    /// Registered in the first pass, not analyzed yet
    Unresolved,
    Object,
    StringEnum,
    NumberEnum,
    Alias,
}

impl TypeKind {
    pub fn is_enum(self) -> bool {
        matches!(self, TypeKind::StringEnum | TypeKind::NumberEnum)
    }
}

/// Canonical model of one named type
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDescriptor {
    pub name: String,
    pub kind: TypeKind,
    pub description: String,
    pub deprecated: Option<String>,
    /// Object fields in declaration order
    pub fields: Vec<FieldDescriptor>,
    /// Target of an alias
    pub underlying: Option<FieldType>,
    /// Enum members in declaration order
    pub enum_values: Vec<EnumValue>,
    /// Local types used directly by this one
    pub references: BTreeSet<String>,
    /// Local types that use this one directly
    pub referenced_by: BTreeSet<String>,
    pub used_by: Vec<Usage>,
    pub used_by_http: bool,
    pub used_by_messaging: bool,
    /// Raw declaration text, attributes and doc comments included
    pub source: String,
    pub representations: Option<Representations>,
}

impl TypeDescriptor {
    /// Creates a first-pass stub.
    pub fn stub(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: TypeKind::Unresolved,
            description: String::new(),
            deprecated: None,
            fields: Vec::new(),
            underlying: None,
            enum_values: Vec::new(),
            references: BTreeSet::new(),
            referenced_by: BTreeSet::new(),
            used_by: Vec::new(),
            used_by_http: false,
            used_by_messaging: false,
            source: source.into(),
            representations: None,
        }
    }
}

/// One documented field of an object type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Name on the wire
    pub name: String,
    #[serde(rename = "type")]
    pub ty: FieldType,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<String>,
    pub required: bool,
}

/// Recursive shape of a field, parameter or alias target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldType {
    #[serde(flatten)]
    pub shape: Shape,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default = "default_true")]
    pub required: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Shape {
    Primitive {
        #[serde(rename = "type")]
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        format: Option<String>,
    },
    Array {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        items: Option<Box<FieldType>>,
    },
    Map {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        values: Option<Box<FieldType>>,
    },
    Reference {
        name: String,
    },
    Enum {
        name: String,
    },
}

impl FieldType {
    fn of(shape: Shape) -> Self {
        Self {
            shape,
            nullable: false,
            required: true,
        }
    }

    pub fn primitive(name: &str, format: Option<&str>) -> Self {
        Self::of(Shape::Primitive {
            name: name.to_string(),
            format: format.map(str::to_string),
        })
    }

    pub fn string() -> Self {
        Self::primitive("string", None)
    }

    pub fn boolean() -> Self {
        Self::primitive("boolean", None)
    }

    pub fn array(items: FieldType) -> Self {
        Self::of(Shape::Array {
            items: Some(Box::new(items)),
        })
    }

    pub fn map(values: Option<FieldType>) -> Self {
        Self::of(Shape::Map {
            values: values.map(Box::new),
        })
    }

    pub fn reference(name: impl Into<String>) -> Self {
        Self::of(Shape::Reference { name: name.into() })
    }

    pub fn enumeration(name: impl Into<String>) -> Self {
        Self::of(Shape::Enum { name: name.into() })
    }

    /// Marks the type as an optional, nullable wrapper.
    pub fn optional(mut self) -> Self {
        self.nullable = true;
        self.required = false;
        self
    }

    /// Name of the declared type this shape points at, if any.
    pub fn referenced_name(&self) -> Option<&str> {
        match &self.shape {
            Shape::Reference { name } | Shape::Enum { name } => Some(name),
            _ => None,
        }
    }

    /// Collects every declared type name reachable inside this shape.
    pub fn collect_references(&self, out: &mut BTreeSet<String>) {
        match &self.shape {
            Shape::Reference { name } | Shape::Enum { name } => {
                out.insert(name.clone());
            }
            Shape::Array { items: Some(inner) } | Shape::Map { values: Some(inner) } => {
                inner.collect_references(out);
            }
            _ => {}
        }
    }
}

/// Literal value of an enum member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnumLiteral {
    Integer(i64),
    String(String),
}

impl EnumLiteral {
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            EnumLiteral::Integer(i) => serde_json::Value::from(*i),
            EnumLiteral::String(s) => serde_json::Value::from(s.clone()),
        }
    }

    pub fn kind(&self) -> TypeKind {
        match self {
            EnumLiteral::Integer(_) => TypeKind::NumberEnum,
            EnumLiteral::String(_) => TypeKind::StringEnum,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumValue {
    pub value: EnumLiteral,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<String>,
}

/// How an operation consumes a type
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    pub operation_id: String,
    pub role: String,
}

impl Usage {
    pub fn new(operation_id: &str, role: impl Into<String>) -> Self {
        Self {
            operation_id: operation_id.to_string(),
            role: role.into(),
        }
    }
}

/// Companion renderings of one type, produced after the graph is frozen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Representations {
    pub source: String,
    pub json_example: String,
    pub json_schema: String,
    pub typescript: String,
}
