use crate::attrs::{self, RenameRule};
use crate::config::ExternalTypes;
use crate::enums::{ConstBlock, EnumResolver};
use crate::error::{DeclarationError, DeclarationErrors};
use crate::model::{FieldDescriptor, FieldType, TypeDescriptor, TypeKind, TypeMap};
use crate::parser::ParsedFile;
use log::{debug, info};
use quote::ToTokens;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use syn::spanned::Spanned;
use syn::{GenericArgument, Item, PathArguments, Type, Visibility};

/// Identifiers that stand for "any value" and therefore carry no contract.
const UNTYPED_PATHS: &[&str] = &["serde_json::Value", "serde_json::Map", "Value"];

const TRANSPARENT_WRAPPERS: &[&str] = &["Box", "Arc", "Rc", "Cow"];
const SEQUENCES: &[&str] = &["Vec", "VecDeque", "HashSet", "BTreeSet", "LinkedList"];
const MAPS: &[&str] = &["HashMap", "BTreeMap"];

/// Shape of a top-level declaration, fixed in the first pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclShape {
    Struct,
    Newtype,
    Alias,
    Enum,
}

/// One declared item waiting for second-pass analysis
struct Declaration<'a> {
    name: String,
    item: DeclItem<'a>,
    file: &'a ParsedFile,
}

#[derive(Clone, Copy)]
enum DeclItem<'a> {
    Struct(&'a syn::ItemStruct),
    Enum(&'a syn::ItemEnum),
    Alias(&'a syn::ItemType),
}

impl DeclItem<'_> {
    fn shape(&self) -> DeclShape {
        match self {
            DeclItem::Struct(s) => match &s.fields {
                syn::Fields::Unnamed(_) => DeclShape::Newtype,
                _ => DeclShape::Struct,
            },
            DeclItem::Enum(_) => DeclShape::Enum,
            DeclItem::Alias(_) => DeclShape::Alias,
        }
    }

    fn attrs(&self) -> &[syn::Attribute] {
        match self {
            DeclItem::Struct(s) => &s.attrs,
            DeclItem::Enum(e) => &e.attrs,
            DeclItem::Alias(a) => &a.attrs,
        }
    }

    fn generics(&self) -> &syn::Generics {
        match self {
            DeclItem::Struct(s) => &s.generics,
            DeclItem::Enum(e) => &e.generics,
            DeclItem::Alias(a) => &a.generics,
        }
    }
}

/// Reads declarations from parsed source files into canonical type descriptors.
///
/// Scanning runs in two passes so that forward references resolve regardless
/// of declaration order:
///
/// 1. every public top-level `struct`, `enum` and `type` becomes a stub, and
///    const modules are collected;
/// 2. enums are resolved, then fields and alias targets are analyzed.
///
/// Errors never stop a pass. Everything wrong with every name is collected and
/// returned together.
pub struct DeclarationScanner<'c> {
    external: &'c ExternalTypes,
}

/// Per-file lookup context for type analysis
struct TypeContext<'a> {
    kinds: &'a BTreeMap<String, TypeKind>,
    imports: &'a HashMap<String, String>,
    external: &'a ExternalTypes,
}

impl<'c> DeclarationScanner<'c> {
    pub fn new(external: &'c ExternalTypes) -> Self {
        Self { external }
    }

    /// Scans every file and returns the descriptor map.
    pub fn scan(&self, files: &[ParsedFile]) -> Result<TypeMap, DeclarationErrors> {
        let mut errors = DeclarationErrors::default();
        let mut types = TypeMap::new();
        let mut declarations: Vec<Declaration> = Vec::new();
        let mut blocks: Vec<ConstBlock> = Vec::new();
        let mut shapes: BTreeMap<String, DeclShape> = BTreeMap::new();

        // Pass 1: stubs
        for file in files {
            collect_items(&file.syntax_tree.items, file, &mut declarations, &mut blocks);
        }
        declarations.retain(|decl| {
            if shapes.contains_key(&decl.name) {
                errors.push(DeclarationError::new(&decl.name, "declared more than once"));
                return false;
            }
            shapes.insert(decl.name.clone(), decl.item.shape());
            types.insert(decl.name.clone(), TypeDescriptor::stub(&decl.name, item_source(decl)));
            true
        });
        debug!("Registered {} type stubs", types.len());

        // Enums, before fields so that references to them resolve as enums
        for decl in &declarations {
            if let DeclItem::Enum(item) = decl.item {
                if let Some(descriptor) = types.get_mut(&decl.name) {
                    if let Err(message) = EnumResolver::resolve_native(item, descriptor) {
                        errors.push(DeclarationError::new(&decl.name, message));
                    }
                }
            }
        }
        for block in &blocks {
            match EnumResolver::resolve_const_block(block) {
                Ok(Some(resolved)) => {
                    if let Err(err) = EnumResolver::attach(&mut types, &shapes, resolved) {
                        errors.push(err);
                    }
                }
                Ok(None) => {
                    debug!("Const module {} is not an enum", block.module.ident);
                }
                Err(err) => errors.push(err),
            }
        }

        // Pass 2: fields and alias targets
        let kinds: BTreeMap<String, TypeKind> = types
            .iter()
            .map(|(name, descriptor)| (name.clone(), descriptor.kind))
            .collect();
        let mut imports_by_file: HashMap<&std::path::Path, HashMap<String, String>> = HashMap::new();

        for decl in &declarations {
            if matches!(decl.item, DeclItem::Enum(_)) {
                continue;
            }
            let imports = imports_by_file
                .entry(decl.file.path.as_path())
                .or_insert_with(|| collect_imports(&decl.file.syntax_tree.items));
            let ctx = TypeContext {
                kinds: &kinds,
                imports,
                external: self.external,
            };
            let Some(descriptor) = types.get_mut(&decl.name) else {
                continue;
            };
            for message in self.analyze(decl, descriptor, &ctx) {
                errors.push(DeclarationError::new(&decl.name, message));
            }
        }

        errors.into_result()?;

        info!("Scanned {} declared types", types.len());
        Ok(types)
    }

    /// Second-pass analysis of one struct, newtype or alias.
    fn analyze(&self, decl: &Declaration, descriptor: &mut TypeDescriptor, ctx: &TypeContext) -> Vec<String> {
        let mut problems = Vec::new();

        match attrs::parse_docs(decl.item.attrs()) {
            Ok(docs) => {
                if descriptor.description.is_empty() {
                    descriptor.description = docs.description;
                }
                if descriptor.deprecated.is_none() {
                    descriptor.deprecated = docs.deprecated;
                }
            }
            Err(message) => problems.push(message),
        }

        if descriptor.kind.is_enum() {
            // A `type` or newtype hosting const-block members
            return problems;
        }

        if decl.item.generics().type_params().next().is_some()
            || decl.item.generics().const_params().next().is_some()
        {
            problems.push("generic declarations are not supported".to_string());
            return problems;
        }

        match decl.item {
            DeclItem::Alias(item) => match analyze_type(&item.ty, ctx) {
                Ok(ty) => {
                    ty.collect_references(&mut descriptor.references);
                    descriptor.underlying = Some(ty);
                    descriptor.kind = TypeKind::Alias;
                }
                Err(message) => problems.push(message),
            },
            DeclItem::Struct(item) => match &item.fields {
                syn::Fields::Unnamed(unnamed) if unnamed.unnamed.len() == 1 => {
                    match analyze_type(&unnamed.unnamed[0].ty, ctx) {
                        Ok(ty) => {
                            ty.collect_references(&mut descriptor.references);
                            descriptor.underlying = Some(ty);
                            descriptor.kind = TypeKind::Alias;
                        }
                        Err(message) => problems.push(message),
                    }
                }
                syn::Fields::Unnamed(_) => {
                    problems.push("tuple structs with more than one field are not supported".to_string());
                }
                syn::Fields::Unit => {
                    problems.push("unit structs have no wire representation".to_string());
                }
                syn::Fields::Named(named) => {
                    let container = match attrs::parse_serde_attributes(&item.attrs) {
                        Ok(container) => container,
                        Err(message) => {
                            problems.push(message);
                            return problems;
                        }
                    };
                    for field in &named.named {
                        match analyze_field(field, container.rename_all, ctx) {
                            Ok(Some(field)) => {
                                field.ty.collect_references(&mut descriptor.references);
                                descriptor.fields.push(field);
                            }
                            Ok(None) => {}
                            Err(message) => problems.push(message),
                        }
                    }
                    descriptor.kind = TypeKind::Object;
                }
            },
            DeclItem::Enum(_) => {}
        }

        problems
    }
}

/// Walks items, descending into inline modules.
fn collect_items<'a>(
    items: &'a [Item],
    file: &'a ParsedFile,
    declarations: &mut Vec<Declaration<'a>>,
    blocks: &mut Vec<ConstBlock<'a>>,
) {
    for item in items {
        let (name, decl_item) = match item {
            Item::Struct(s) if is_public(&s.vis) => (s.ident.to_string(), DeclItem::Struct(s)),
            Item::Enum(e) if is_public(&e.vis) => (e.ident.to_string(), DeclItem::Enum(e)),
            Item::Type(t) if is_public(&t.vis) => (t.ident.to_string(), DeclItem::Alias(t)),
            Item::Mod(m) => {
                if let Some((_, content)) = &m.content {
                    if content.iter().any(|i| matches!(i, Item::Const(_))) {
                        blocks.push(ConstBlock { module: m, file });
                    }
                    collect_items(content, file, declarations, blocks);
                }
                continue;
            }
            _ => continue,
        };
        declarations.push(Declaration {
            name,
            item: decl_item,
            file,
        });
    }
}

fn is_public(vis: &Visibility) -> bool {
    matches!(vis, Visibility::Public(_))
}

fn item_source(decl: &Declaration) -> String {
    let span = match decl.item {
        DeclItem::Struct(s) => s.span(),
        DeclItem::Enum(e) => e.span(),
        DeclItem::Alias(a) => a.span(),
    };
    decl.file.lines(span.start().line, span.end().line)
}

/// Maps imported identifiers to their fully-qualified paths.
fn collect_imports(items: &[Item]) -> HashMap<String, String> {
    fn walk(tree: &syn::UseTree, prefix: &mut Vec<String>, out: &mut HashMap<String, String>) {
        match tree {
            syn::UseTree::Path(path) => {
                prefix.push(path.ident.to_string());
                walk(&path.tree, prefix, out);
                prefix.pop();
            }
            syn::UseTree::Name(name) => {
                let ident = name.ident.to_string();
                if ident != "self" {
                    let mut full = prefix.clone();
                    full.push(ident.clone());
                    out.insert(ident, full.join("::"));
                } else if let Some(last) = prefix.last() {
                    out.insert(last.clone(), prefix.join("::"));
                }
            }
            syn::UseTree::Rename(rename) => {
                let mut full = prefix.clone();
                full.push(rename.ident.to_string());
                out.insert(rename.rename.to_string(), full.join("::"));
            }
            syn::UseTree::Group(group) => {
                for tree in &group.items {
                    walk(tree, prefix, out);
                }
            }
            syn::UseTree::Glob(_) => {}
        }
    }

    let mut imports = HashMap::new();
    for item in items {
        if let Item::Use(item_use) = item {
            walk(&item_use.tree, &mut Vec::new(), &mut imports);
        }
    }
    imports
}

/// Analyzes one named field; `Ok(None)` means the field is not on the wire.
fn analyze_field(
    field: &syn::Field,
    rename_all: Option<RenameRule>,
    ctx: &TypeContext,
) -> Result<Option<FieldDescriptor>, String> {
    let Some(ident) = &field.ident else {
        return Ok(None);
    };
    let rust_name = attrs::ident_name(ident);

    if !is_public(&field.vis) {
        debug!("Skipping private field {}", rust_name);
        return Ok(None);
    }

    let serde = attrs::parse_serde_attributes(&field.attrs)
        .map_err(|e| format!("field {}: {}", rust_name, e))?;
    if serde.skip {
        return Ok(None);
    }
    if serde.flatten {
        return Err(format!(
            "field {}: flattened (embedded) fields are not supported",
            rust_name
        ));
    }

    let docs = attrs::parse_docs(&field.attrs).map_err(|e| format!("field {}: {}", rust_name, e))?;
    let mut ty = analyze_type(&field.ty, ctx).map_err(|e| format!("field {}: {}", rust_name, e))?;
    let forced = attrs::parse_forced_required(&field.attrs).map_err(|e| format!("field {}: {}", rust_name, e))?;
    if forced && serde.omit_empty {
        return Err(format!(
            "field {}: #[contract(required)] conflicts with a serde option that may omit it",
            rust_name
        ));
    }
    if serde.omit_empty {
        ty.required = false;
    }
    if forced {
        ty.required = true;
    }

    let name = match (serde.rename, rename_all) {
        (Some(rename), _) => rename,
        (None, Some(rule)) => rule.apply_to_field(&rust_name),
        (None, None) => rust_name,
    };

    Ok(Some(FieldDescriptor {
        name,
        required: ty.required,
        ty,
        description: docs.description,
        deprecated: docs.deprecated,
    }))
}

/// Recursively converts a Rust type into a field type.
fn analyze_type(ty: &Type, ctx: &TypeContext) -> Result<FieldType, String> {
    match ty {
        Type::Reference(reference) => analyze_type(&reference.elem, ctx),
        Type::Paren(paren) => analyze_type(&paren.elem, ctx),
        Type::Group(group) => analyze_type(&group.elem, ctx),
        Type::Slice(slice) => Ok(FieldType::array(analyze_type(&slice.elem, ctx)?)),
        Type::Array(array) => Ok(FieldType::array(analyze_type(&array.elem, ctx)?)),
        Type::TraitObject(_) | Type::ImplTrait(_) | Type::Infer(_) => Err(format!(
            "untyped value `{}` is not allowed, declare a concrete type",
            type_text(ty)
        )),
        Type::Path(type_path) if type_path.qself.is_none() => analyze_path(&type_path.path, ctx),
        _ => Err(format!("unsupported type `{}`", type_text(ty))),
    }
}

fn analyze_path(path: &syn::Path, ctx: &TypeContext) -> Result<FieldType, String> {
    let Some(last) = path.segments.last() else {
        return Err("empty type path".to_string());
    };
    let last_name = last.ident.to_string();
    let full = full_path(path, ctx);

    if UNTYPED_PATHS.contains(&full.as_str()) && !ctx.kinds.contains_key(&full) {
        return Err(format!("untyped value `{}` is not allowed, declare a concrete type", full));
    }

    if last_name == "Option" {
        let inner = single_type_arg(last, &last_name)?;
        return Ok(analyze_type(inner, ctx)?.optional());
    }
    if TRANSPARENT_WRAPPERS.contains(&last_name.as_str()) {
        return analyze_type(single_type_arg(last, &last_name)?, ctx);
    }
    if SEQUENCES.contains(&last_name.as_str()) {
        let item = analyze_type(single_type_arg(last, &last_name)?, ctx)?;
        return Ok(FieldType::array(item));
    }
    if MAPS.contains(&last_name.as_str()) {
        let args = type_args(last);
        if args.len() < 2 {
            return Err(format!("{} needs key and value types", last_name));
        }
        let key = analyze_type(args[0], ctx)?;
        if !is_string_like(&key, ctx) {
            return Err(format!("{} keys must be strings", last_name));
        }
        let value = analyze_type(args[1], ctx)?;
        return Ok(FieldType::map(Some(value)));
    }

    if path.segments.len() == 1 || is_local_path(path) || is_std_path(path) {
        if let Some(primitive) = primitive(&last_name) {
            return Ok(primitive);
        }
    }
    if path.segments.len() == 1 || is_local_path(path) {
        if let Some(kind) = ctx.kinds.get(&last_name) {
            if !type_args(last).is_empty() {
                return Err(format!("generic arguments on {} are not supported", last_name));
            }
            return Ok(if kind.is_enum() {
                FieldType::enumeration(last_name)
            } else {
                FieldType::reference(last_name)
            });
        }
    }

    match ctx.external.get(&full) {
        Some(external) => Ok(FieldType::primitive(&external.schema_type, external.format.as_deref())),
        None => Err(format!("unresolved identifier `{}`", full)),
    }
}

/// Fully-qualified path without generic arguments, expanding imports.
fn full_path(path: &syn::Path, ctx: &TypeContext) -> String {
    let mut segments: Vec<String> = path.segments.iter().map(|s| s.ident.to_string()).collect();
    if let Some(first) = segments.first() {
        if let Some(expanded) = ctx.imports.get(first) {
            let mut full: Vec<String> = expanded.split("::").map(str::to_string).collect();
            full.extend(segments.drain(1..));
            segments = full;
        }
    }
    segments.join("::")
}

fn is_local_path(path: &syn::Path) -> bool {
    path.segments
        .first()
        .map(|s| s.ident == "crate" || s.ident == "self" || s.ident == "super")
        .unwrap_or(false)
}

fn is_std_path(path: &syn::Path) -> bool {
    path.segments
        .first()
        .map(|s| s.ident == "std" || s.ident == "core" || s.ident == "alloc")
        .unwrap_or(false)
}

fn type_args(segment: &syn::PathSegment) -> Vec<&Type> {
    match &segment.arguments {
        PathArguments::AngleBracketed(args) => args
            .args
            .iter()
            .filter_map(|arg| match arg {
                GenericArgument::Type(ty) => Some(ty),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn single_type_arg<'t>(segment: &'t syn::PathSegment, name: &str) -> Result<&'t Type, String> {
    type_args(segment)
        .into_iter()
        .next()
        .ok_or_else(|| format!("{} without a declared element type", name))
}

fn is_string_like(ty: &FieldType, ctx: &TypeContext) -> bool {
    use crate::model::Shape;
    match &ty.shape {
        Shape::Primitive { name, .. } => name == "string",
        Shape::Enum { name } => ctx.kinds.get(name) == Some(&TypeKind::StringEnum),
        // Newtype keys and aliases are trusted to serialize as strings
        Shape::Reference { .. } => true,
        _ => false,
    }
}

/// Schema primitive for a Rust primitive type name.
fn primitive(name: &str) -> Option<FieldType> {
    let (ty, format) = match name {
        "String" | "str" | "char" => ("string", None),
        "bool" => ("boolean", None),
        "i8" | "i16" | "i32" | "u8" | "u16" | "u32" => ("integer", Some("int32")),
        "i64" | "u64" | "isize" | "usize" => ("integer", Some("int64")),
        "i128" | "u128" => ("integer", None),
        "f32" => ("number", Some("float")),
        "f64" => ("number", Some("double")),
        _ => return None,
    };
    Some(FieldType::primitive(ty, format))
}

/// True for names that are Rust primitive types.
pub fn is_primitive_name(name: &str) -> bool {
    primitive(name).is_some()
}

fn type_text(ty: &Type) -> String {
    ty.to_token_stream().to_string()
}
