//! Companion renderings of each declared type.
//!
//! Produced once, after the type graph is frozen: a JSON example, the JSON
//! Schema text, a TypeScript declaration and the declaration source as
//! written.

use crate::error::{Error, SchemaError};
use crate::model::{FieldType, Representations, Shape, TypeDescriptor, TypeKind, TypeMap};
use crate::schema_generator::type_schema;
use log::debug;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

pub struct Renderer<'a> {
    types: &'a TypeMap,
    examples: &'a BTreeMap<String, Value>,
}

impl<'a> Renderer<'a> {
    pub fn new(types: &'a TypeMap, examples: &'a BTreeMap<String, Value>) -> Self {
        Self { types, examples }
    }

    /// Renders every descriptor, aborting on the first failure.
    pub fn render_all(types: &mut TypeMap, examples: &BTreeMap<String, Value>) -> Result<(), Error> {
        let rendered = {
            let renderer = Renderer::new(types, examples);
            let mut rendered = Vec::with_capacity(types.len());
            for (name, descriptor) in types.iter() {
                let representations = renderer.render(descriptor).map_err(|source| Error::Render {
                    type_name: name.clone(),
                    source,
                })?;
                rendered.push((name.clone(), representations));
            }
            rendered
        };

        for (name, representations) in rendered {
            if let Some(descriptor) = types.get_mut(&name) {
                descriptor.representations = Some(representations);
            }
        }
        debug!("Rendered {} types", types.len());
        Ok(())
    }

    pub fn render(&self, descriptor: &TypeDescriptor) -> Result<Representations, SchemaError> {
        let schema = type_schema(descriptor)?;
        let json_schema = serde_json::to_string_pretty(&schema)
            .map_err(|e| SchemaError::new(format!("schema serialization: {}", e)))?;
        let json_example = serde_json::to_string_pretty(&self.example(descriptor))
            .map_err(|e| SchemaError::new(format!("example serialization: {}", e)))?;

        Ok(Representations {
            source: descriptor.source.clone(),
            json_example,
            json_schema,
            typescript: self.typescript(descriptor)?,
        })
    }

    /// The largest registered example, else one synthesized from the
    /// descriptor.
    pub fn example(&self, descriptor: &TypeDescriptor) -> Value {
        self.type_example(&descriptor.name, &mut Vec::new())
    }

    fn type_example(&self, name: &str, stack: &mut Vec<String>) -> Value {
        if let Some(example) = self.examples.get(name) {
            return example.clone();
        }
        // Cyclic references end in null
        if stack.iter().any(|n| n == name) {
            return Value::Null;
        }
        let Some(descriptor) = self.types.get(name) else {
            return Value::Null;
        };

        stack.push(name.to_string());
        let value = match descriptor.kind {
            TypeKind::Object => {
                let mut object = Map::new();
                for field in &descriptor.fields {
                    object.insert(field.name.clone(), self.field_example(&field.ty, stack));
                }
                Value::Object(object)
            }
            TypeKind::StringEnum | TypeKind::NumberEnum => descriptor
                .enum_values
                .first()
                .map(|v| v.value.to_json())
                .unwrap_or(Value::Null),
            TypeKind::Alias => descriptor
                .underlying
                .as_ref()
                .map(|ty| self.field_example(ty, stack))
                .unwrap_or(Value::Null),
            TypeKind::Unresolved => Value::Null,
        };
        stack.pop();
        value
    }

    fn field_example(&self, ty: &FieldType, stack: &mut Vec<String>) -> Value {
        match &ty.shape {
            Shape::Primitive { name, format } => primitive_example(name, format.as_deref()),
            Shape::Array { items } => match items {
                Some(items) => json!([self.field_example(items, stack)]),
                None => json!([]),
            },
            Shape::Map { values } => match values {
                Some(values) => json!({ "key": self.field_example(values, stack) }),
                None => json!({}),
            },
            Shape::Reference { name } | Shape::Enum { name } => self.type_example(name, stack),
        }
    }

    /// TypeScript declaration of the type.
    pub fn typescript(&self, descriptor: &TypeDescriptor) -> Result<String, SchemaError> {
        let mut out = doc_block(&descriptor.description, descriptor.deprecated.as_deref(), "");
        match descriptor.kind {
            TypeKind::Object => {
                out.push_str(&format!("export interface {} {{\n", descriptor.name));
                for field in &descriptor.fields {
                    out.push_str(&doc_block(&field.description, field.deprecated.as_deref(), "  "));
                    out.push_str(&format!(
                        "  {}{}: {};\n",
                        property_name(&field.name),
                        if field.required { "" } else { "?" },
                        ts_type(&field.ty)?
                    ));
                }
                out.push('}');
            }
            TypeKind::StringEnum | TypeKind::NumberEnum => {
                let members: Vec<String> = descriptor
                    .enum_values
                    .iter()
                    .map(|v| v.value.to_json().to_string())
                    .collect();
                out.push_str(&format!("export type {} = {};", descriptor.name, members.join(" | ")));
            }
            TypeKind::Alias => {
                let underlying = descriptor.underlying.as_ref().ok_or_else(|| {
                    SchemaError::new(format!("alias {} has no underlying type", descriptor.name))
                })?;
                out.push_str(&format!("export type {} = {};", descriptor.name, ts_type(underlying)?));
            }
            TypeKind::Unresolved => {
                return Err(SchemaError::new(format!(
                    "type {} was never resolved to a kind",
                    descriptor.name
                )));
            }
        }
        Ok(out)
    }
}

fn primitive_example(name: &str, format: Option<&str>) -> Value {
    match (name, format) {
        ("string", Some("date-time")) => json!("2024-01-01T00:00:00Z"),
        ("string", Some("date")) => json!("2024-01-01"),
        ("string", Some("uuid")) => json!("00000000-0000-0000-0000-000000000000"),
        ("string", _) => json!("string"),
        ("integer", _) => json!(0),
        ("number", _) => json!(0.0),
        ("boolean", _) => json!(false),
        _ => Value::Null,
    }
}

fn ts_type(ty: &FieldType) -> Result<String, SchemaError> {
    let text = match &ty.shape {
        Shape::Primitive { name, .. } => match name.as_str() {
            "string" => "string".to_string(),
            "integer" | "number" => "number".to_string(),
            "boolean" => "boolean".to_string(),
            _ => "unknown".to_string(),
        },
        Shape::Array { items } => {
            let items = items
                .as_deref()
                .ok_or_else(|| SchemaError::new("array without declared element type"))?;
            let inner = ts_type(items)?;
            if inner.contains(' ') {
                format!("({})[]", inner)
            } else {
                format!("{}[]", inner)
            }
        }
        Shape::Map { values } => match values.as_deref() {
            Some(values) => format!("Record<string, {}>", ts_type(values)?),
            None => "Record<string, never>".to_string(),
        },
        Shape::Reference { name } | Shape::Enum { name } => name.clone(),
    };
    Ok(if ty.nullable { format!("{} | null", text) } else { text })
}

fn property_name(name: &str) -> String {
    let valid = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');
    if valid {
        name.to_string()
    } else {
        Value::from(name).to_string()
    }
}

fn doc_block(description: &str, deprecated: Option<&str>, indent: &str) -> String {
    let mut lines: Vec<String> = description.lines().map(str::to_string).collect();
    if let Some(message) = deprecated {
        lines.push(format!("@deprecated {}", message));
    }
    match lines.len() {
        0 => String::new(),
        1 => format!("{}/** {} */\n", indent, lines[0]),
        _ => {
            let mut block = format!("{}/**\n", indent);
            for line in lines {
                if line.is_empty() {
                    block.push_str(&format!("{} *\n", indent));
                } else {
                    block.push_str(&format!("{} * {}\n", indent, line));
                }
            }
            block.push_str(&format!("{} */\n", indent));
            block
        }
    }
}
