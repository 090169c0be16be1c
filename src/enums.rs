//! Enumeration resolution.
//!
//! Two declaration forms produce enums:
//!
//! * native `enum`s whose variants are all unit variants, and
//! * const modules, where an inline `mod` groups literal constants of one
//!   declared type:
//!
//! ```ignore
//! pub type DeviceStatus = &'static str;
//!
//! pub mod device_status {
//!     use super::DeviceStatus;
//!     /// Reachable and reporting.
//!     pub const ONLINE: DeviceStatus = "online";
//!     pub const OFFLINE: DeviceStatus = "offline";
//! }
//! ```

use crate::attrs::{self, ident_name};
use crate::declarations::{is_primitive_name, DeclShape};
use crate::error::DeclarationError;
use crate::model::{EnumLiteral, EnumValue, TypeDescriptor, TypeKind, TypeMap};
use crate::parser::ParsedFile;
use log::debug;
use std::collections::BTreeMap;
use syn::spanned::Spanned;
use syn::{Expr, Item, Lit, Type, UnOp, Visibility};

/// An inline module containing `const` items
pub struct ConstBlock<'a> {
    pub module: &'a syn::ItemMod,
    pub file: &'a ParsedFile,
}

/// Enum members extracted from one const block
#[derive(Debug, Clone, PartialEq)]
pub struct ConstEnum {
    pub name: String,
    pub kind: TypeKind,
    pub values: Vec<EnumValue>,
    pub source: String,
}

/// Derive that makes serde write a unit enum as its discriminant
const SERIALIZE_REPR: &str = "Serialize_repr";

pub struct EnumResolver;

impl EnumResolver {
    /// Fills `descriptor` from a native unit-variant enum.
    ///
    /// Values are the serialized variant names. An enum deriving
    /// `Serialize_repr` serializes by discriminant instead: it is numeric and
    /// every variant must carry an explicit integer discriminant. Without that
    /// derive, discriminants do not reach the wire and are ignored.
    pub fn resolve_native(item: &syn::ItemEnum, descriptor: &mut TypeDescriptor) -> Result<(), String> {
        if item.generics.type_params().next().is_some() {
            return Err("generic declarations are not supported".to_string());
        }

        let docs = attrs::parse_docs(&item.attrs)?;
        let container = attrs::parse_serde_attributes(&item.attrs)?;
        let by_value = attrs::derives(&item.attrs, SERIALIZE_REPR);

        let mut values = Vec::new();

        for variant in &item.variants {
            let variant_name = ident_name(&variant.ident);
            if !matches!(variant.fields, syn::Fields::Unit) {
                return Err(format!(
                    "variant {} carries data, only unit variants are supported",
                    variant_name
                ));
            }
            let serde = attrs::parse_serde_attributes(&variant.attrs)
                .map_err(|e| format!("variant {}: {}", variant_name, e))?;
            if serde.skip {
                continue;
            }

            let value = if by_value {
                let (_, expr) = variant.discriminant.as_ref().ok_or_else(|| {
                    format!("variant {} needs an explicit discriminant for {}", variant_name, SERIALIZE_REPR)
                })?;
                EnumLiteral::Integer(
                    integer_literal(expr)
                        .ok_or_else(|| format!("variant {} discriminant must be an integer literal", variant_name))?,
                )
            } else {
                EnumLiteral::String(match (serde.rename, container.rename_all) {
                    (Some(rename), _) => rename,
                    (None, Some(rule)) => rule.apply_to_variant(&variant_name),
                    (None, None) => variant_name.clone(),
                })
            };

            let variant_docs = attrs::parse_docs(&variant.attrs)
                .map_err(|e| format!("variant {}: {}", variant_name, e))?;
            push_unique(&mut values, value, variant_docs)?;
        }

        if values.is_empty() {
            return Err("enum has no members".to_string());
        }
        let kind = if by_value { TypeKind::NumberEnum } else { TypeKind::StringEnum };
        debug!("Resolved native enum {} with {} values", descriptor.name, values.len());

        descriptor.kind = kind;
        descriptor.enum_values = values;
        descriptor.description = docs.description;
        descriptor.deprecated = docs.deprecated;
        Ok(())
    }

    /// Classifies a const module.
    ///
    /// Returns `Ok(None)` when the block is not an enum: its first public
    /// constant is not annotated with a simple, non-primitive identifier.
    pub fn resolve_const_block(block: &ConstBlock) -> Result<Option<ConstEnum>, DeclarationError> {
        let Some((_, items)) = &block.module.content else {
            return Ok(None);
        };

        let mut name: Option<String> = None;
        let mut kind: Option<TypeKind> = None;
        let mut values = Vec::new();

        for item in items {
            let Item::Const(constant) = item else {
                continue;
            };
            let const_name = ident_name(&constant.ident);
            let public = matches!(constant.vis, Visibility::Public(_));

            let enum_name = match name.clone() {
                None => {
                    if !public {
                        continue;
                    }
                    match simple_ident(&constant.ty) {
                        Some(ident) if !is_primitive_name(&ident) => {
                            name = Some(ident.clone());
                            ident
                        }
                        _ => return Ok(None),
                    }
                }
                Some(enum_name) => {
                    if !public {
                        return Err(DeclarationError::new(
                            &enum_name,
                            format!("constant {} must be public", const_name),
                        ));
                    }
                    match simple_ident(&constant.ty) {
                        Some(ident) if ident == enum_name => ident,
                        _ => {
                            return Err(DeclarationError::new(
                                &enum_name,
                                format!(
                                    "constant {} must be declared with type {}",
                                    const_name, enum_name
                                ),
                            ));
                        }
                    }
                }
            };

            let value = literal(&constant.expr).ok_or_else(|| {
                DeclarationError::new(
                    &enum_name,
                    format!("constant {} must be a single string or integer literal", const_name),
                )
            })?;

            match kind {
                None => kind = Some(value.kind()),
                Some(k) if k != value.kind() => {
                    return Err(DeclarationError::new(
                        &enum_name,
                        format!("constant {} mixes string and integer values", const_name),
                    ));
                }
                _ => {}
            }

            let docs = attrs::parse_docs(&constant.attrs)
                .map_err(|e| DeclarationError::new(&enum_name, format!("constant {}: {}", const_name, e)))?;
            push_unique(&mut values, value, docs).map_err(|e| DeclarationError::new(&enum_name, e))?;
        }

        let (Some(name), Some(kind)) = (name, kind) else {
            return Ok(None);
        };

        let span = block.module.span();
        Ok(Some(ConstEnum {
            name,
            kind,
            values,
            source: block.file.lines(span.start().line, span.end().line),
        }))
    }

    /// Attaches const-block members to the named descriptor, creating it when
    /// the enum type is not declared locally.
    pub fn attach(
        types: &mut TypeMap,
        shapes: &BTreeMap<String, DeclShape>,
        resolved: ConstEnum,
    ) -> Result<(), DeclarationError> {
        match shapes.get(&resolved.name) {
            Some(DeclShape::Struct) | Some(DeclShape::Enum) => {
                return Err(DeclarationError::new(
                    &resolved.name,
                    "constants can only extend a type alias or newtype",
                ));
            }
            _ => {}
        }

        let descriptor = types
            .entry(resolved.name.clone())
            .or_insert_with(|| TypeDescriptor::stub(&resolved.name, String::new()));

        match descriptor.kind {
            TypeKind::Unresolved => descriptor.kind = resolved.kind,
            k if k == resolved.kind => {}
            _ => {
                return Err(DeclarationError::new(
                    &resolved.name,
                    "constant blocks mix string and integer values",
                ));
            }
        }

        if descriptor.source.is_empty() {
            descriptor.source = resolved.source;
        } else {
            descriptor.source = format!("{}\n\n{}", descriptor.source, resolved.source);
        }

        for value in resolved.values {
            let docs = attrs::Docs {
                description: value.description,
                deprecated: value.deprecated,
            };
            push_unique(&mut descriptor.enum_values, value.value, docs)
                .map_err(|e| DeclarationError::new(&resolved.name, e))?;
        }
        Ok(())
    }
}

fn push_unique(values: &mut Vec<EnumValue>, value: EnumLiteral, docs: attrs::Docs) -> Result<(), String> {
    if values.iter().any(|v| v.value == value) {
        return Err(format!("duplicate enum value {}", value.to_json()));
    }
    values.push(EnumValue {
        value,
        description: docs.description,
        deprecated: docs.deprecated,
    });
    Ok(())
}

/// Single-segment type path without generic arguments.
fn simple_ident(ty: &Type) -> Option<String> {
    match ty {
        Type::Path(type_path) if type_path.qself.is_none() && type_path.path.segments.len() == 1 => {
            let segment = &type_path.path.segments[0];
            if segment.arguments.is_empty() {
                Some(segment.ident.to_string())
            } else {
                None
            }
        }
        _ => None,
    }
}

fn literal(expr: &Expr) -> Option<EnumLiteral> {
    if let Expr::Lit(lit) = expr {
        if let Lit::Str(s) = &lit.lit {
            return Some(EnumLiteral::String(s.value()));
        }
    }
    integer_literal(expr).map(EnumLiteral::Integer)
}

fn integer_literal(expr: &Expr) -> Option<i64> {
    match expr {
        Expr::Lit(lit) => match &lit.lit {
            Lit::Int(int) => int.base10_parse::<i64>().ok(),
            _ => None,
        },
        Expr::Unary(unary) if matches!(unary.op, UnOp::Neg(_)) => integer_literal(&unary.expr).map(|v| -v),
        Expr::Paren(paren) => integer_literal(&paren.expr),
        Expr::Group(group) => integer_literal(&group.expr),
        _ => None,
    }
}
