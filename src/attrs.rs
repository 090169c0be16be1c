//! Attribute helpers shared by the declaration scanner and the enum resolver:
//! serde options, rename rules, doc comments and deprecation markers.

use syn::punctuated::Punctuated;
use syn::{Attribute, Expr, Lit, LitStr, Meta, Token};

/// Doc-comment lines starting with one of these are tooling directives,
/// not documentation.
const LINT_DIRECTIVE_PREFIXES: &[&str] = &["nolint", "lint:"];

const DEPRECATION_MARKER: &str = "Deprecated:";

/// Namespace of field options that only affect the generated contract
pub const CONTRACT_ATTRIBUTE: &str = "contract";

/// Serde options relevant to the wire shape of a field, variant or container
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SerdeAttributes {
    pub rename: Option<String>,
    pub rename_all: Option<RenameRule>,
    pub skip: bool,
    /// `skip_serializing_if` or `default`: the field may be absent
    pub omit_empty: bool,
    pub flatten: bool,
}

/// Case conversions accepted by `#[serde(rename_all = "...")]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenameRule {
    Lower,
    Upper,
    Pascal,
    Camel,
    Snake,
    ScreamingSnake,
    Kebab,
    ScreamingKebab,
}

impl RenameRule {
    pub fn parse(rule: &str) -> Option<Self> {
        match rule {
            "lowercase" => Some(RenameRule::Lower),
            "UPPERCASE" => Some(RenameRule::Upper),
            "PascalCase" => Some(RenameRule::Pascal),
            "camelCase" => Some(RenameRule::Camel),
            "snake_case" => Some(RenameRule::Snake),
            "SCREAMING_SNAKE_CASE" => Some(RenameRule::ScreamingSnake),
            "kebab-case" => Some(RenameRule::Kebab),
            "SCREAMING-KEBAB-CASE" => Some(RenameRule::ScreamingKebab),
            _ => None,
        }
    }

    /// Applies the rule to a `snake_case` field name, the way serde does.
    pub fn apply_to_field(self, field: &str) -> String {
        match self {
            RenameRule::Lower | RenameRule::Snake => field.to_string(),
            RenameRule::Upper | RenameRule::ScreamingSnake => field.to_ascii_uppercase(),
            RenameRule::Pascal => {
                let mut pascal = String::new();
                let mut capitalize = true;
                for ch in field.chars() {
                    if ch == '_' {
                        capitalize = true;
                    } else if capitalize {
                        pascal.push(ch.to_ascii_uppercase());
                        capitalize = false;
                    } else {
                        pascal.push(ch);
                    }
                }
                pascal
            }
            RenameRule::Camel => {
                let pascal = RenameRule::Pascal.apply_to_field(field);
                lower_first(&pascal)
            }
            RenameRule::Kebab => field.replace('_', "-"),
            RenameRule::ScreamingKebab => field.to_ascii_uppercase().replace('_', "-"),
        }
    }

    /// Applies the rule to a `PascalCase` variant name, the way serde does.
    pub fn apply_to_variant(self, variant: &str) -> String {
        match self {
            RenameRule::Pascal => variant.to_string(),
            RenameRule::Lower => variant.to_ascii_lowercase(),
            RenameRule::Upper => variant.to_ascii_uppercase(),
            RenameRule::Camel => lower_first(variant),
            RenameRule::Snake => {
                let mut snake = String::new();
                for (i, ch) in variant.char_indices() {
                    if i > 0 && ch.is_uppercase() {
                        snake.push('_');
                    }
                    snake.push(ch.to_ascii_lowercase());
                }
                snake
            }
            RenameRule::ScreamingSnake => RenameRule::Snake
                .apply_to_variant(variant)
                .to_ascii_uppercase(),
            RenameRule::Kebab => RenameRule::Snake.apply_to_variant(variant).replace('_', "-"),
            RenameRule::ScreamingKebab => RenameRule::ScreamingSnake
                .apply_to_variant(variant)
                .replace('_', "-"),
        }
    }
}

fn lower_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Parses every `#[serde(...)]` attribute in `attrs`.
pub fn parse_serde_attributes(attrs: &[Attribute]) -> Result<SerdeAttributes, String> {
    let mut serde_attrs = SerdeAttributes::default();

    for attr in attrs {
        if !attr.path().is_ident("serde") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                serde_attrs.rename = Some(serialize_name(&meta)?);
            } else if meta.path.is_ident("rename_all") {
                let rule = serialize_name(&meta)?;
                let parsed = RenameRule::parse(&rule)
                    .ok_or_else(|| meta.error(format!("unknown rename_all rule {:?}", rule)))?;
                serde_attrs.rename_all = Some(parsed);
            } else if meta.path.is_ident("skip") || meta.path.is_ident("skip_serializing") {
                serde_attrs.skip = true;
            } else if meta.path.is_ident("skip_serializing_if") {
                let _: LitStr = meta.value()?.parse()?;
                serde_attrs.omit_empty = true;
            } else if meta.path.is_ident("default") {
                if meta.input.peek(syn::Token![=]) {
                    let _: LitStr = meta.value()?.parse()?;
                }
                serde_attrs.omit_empty = true;
            } else if meta.path.is_ident("flatten") {
                serde_attrs.flatten = true;
            } else {
                skip_meta_value(&meta)?;
            }
            Ok(())
        })
        .map_err(|e| format!("malformed serde attribute: {}", e))?;
    }

    Ok(serde_attrs)
}

/// True when a `#[derive(..)]` on the item names `name`, qualified or not.
pub fn derives(attrs: &[Attribute], name: &str) -> bool {
    attrs
        .iter()
        .filter(|attr| attr.path().is_ident("derive"))
        .filter_map(|attr| {
            attr.parse_args_with(Punctuated::<syn::Path, Token![,]>::parse_terminated)
                .ok()
        })
        .flatten()
        .any(|path| path.segments.last().is_some_and(|segment| segment.ident == name))
}

/// Reads `#[contract(required)]`, which keeps an `Option` field in the
/// required list: serde writes `null` for it rather than omitting it.
pub fn parse_forced_required(attrs: &[Attribute]) -> Result<bool, String> {
    let mut required = false;
    for attr in attrs {
        if !attr.path().is_ident(CONTRACT_ATTRIBUTE) {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("required") {
                required = true;
                Ok(())
            } else {
                Err(meta.error("unknown contract option, expected `required`"))
            }
        })
        .map_err(|e| format!("malformed contract attribute: {}", e))?;
    }
    Ok(required)
}

/// Reads `name = "x"` or `name(serialize = "x", deserialize = "y")`.
fn serialize_name(meta: &syn::meta::ParseNestedMeta) -> syn::Result<String> {
    if meta.input.peek(syn::Token![=]) {
        let value: LitStr = meta.value()?.parse()?;
        return Ok(value.value());
    }

    let mut serialize = None;
    meta.parse_nested_meta(|inner| {
        let value: LitStr = inner.value()?.parse()?;
        if inner.path.is_ident("serialize") {
            serialize = Some(value.value());
        }
        Ok(())
    })?;
    serialize.ok_or_else(|| meta.error("expected a serialize name"))
}

fn skip_meta_value(meta: &syn::meta::ParseNestedMeta) -> syn::Result<()> {
    if meta.input.peek(syn::Token![=]) {
        let _: Expr = meta.value()?.parse()?;
    } else if meta.input.peek(syn::token::Paren) {
        let content;
        syn::parenthesized!(content in meta.input);
        let _: proc_macro2::TokenStream = content.parse()?;
    }
    Ok(())
}

/// Documentation extracted from doc comments and `#[deprecated]`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Docs {
    pub description: String,
    pub deprecated: Option<String>,
}

/// Collects doc comments, strips lint directives and splits off the
/// deprecation paragraph.
pub fn parse_docs(attrs: &[Attribute]) -> Result<Docs, String> {
    let raw = doc_lines(attrs);
    let lines: Vec<&str> = raw
        .iter()
        .map(String::as_str)
        .filter(|line| {
            let trimmed = line.trim_start();
            !LINT_DIRECTIVE_PREFIXES
                .iter()
                .any(|prefix| trimmed.starts_with(prefix))
        })
        .collect();

    let (description, mut deprecated) = split_deprecation(&lines)?;
    if let Some(message) = deprecated_attribute(attrs)? {
        deprecated.get_or_insert(message);
    }

    Ok(Docs {
        description,
        deprecated,
    })
}

fn doc_lines(attrs: &[Attribute]) -> Vec<String> {
    let mut lines = Vec::new();
    for attr in attrs {
        if !attr.path().is_ident("doc") {
            continue;
        }
        if let Meta::NameValue(nv) = &attr.meta {
            if let Expr::Lit(expr) = &nv.value {
                if let Lit::Str(s) = &expr.lit {
                    let value = s.value();
                    for line in value.lines() {
                        lines.push(line.strip_prefix(' ').unwrap_or(line).trim_end().to_string());
                    }
                }
            }
        }
    }
    lines
}

/// Separates the `Deprecated:` paragraph from the rest of the documentation.
fn split_deprecation(lines: &[&str]) -> Result<(String, Option<String>), String> {
    let mut description: Vec<&str> = Vec::new();
    let mut deprecated: Option<Vec<String>> = None;
    let mut in_marker = false;

    for line in lines {
        let trimmed = line.trim();
        if let Some(rest) = trimmed.strip_prefix(DEPRECATION_MARKER) {
            in_marker = true;
            let message = deprecated.get_or_insert_with(Vec::new);
            if !rest.trim().is_empty() {
                message.push(rest.trim().to_string());
            }
            continue;
        }
        if in_marker {
            if trimmed.is_empty() {
                in_marker = false;
            } else if let Some(message) = deprecated.as_mut() {
                message.push(trimmed.to_string());
                continue;
            }
        }
        description.push(line);
    }

    let deprecated = match deprecated {
        Some(parts) if parts.is_empty() => {
            return Err("deprecation marker has no message".to_string());
        }
        Some(parts) => Some(parts.join(" ")),
        None => None,
    };

    Ok((collapse_blank_lines(&description), deprecated))
}

fn collapse_blank_lines(lines: &[&str]) -> String {
    let mut out: Vec<&str> = Vec::new();
    for line in lines {
        if line.trim().is_empty() && out.last().map_or(true, |l| l.trim().is_empty()) {
            continue;
        }
        out.push(line);
    }
    while out.last().is_some_and(|l| l.trim().is_empty()) {
        out.pop();
    }
    out.join("\n")
}

/// Reads `#[deprecated = ".."]` or `#[deprecated(note = "..")]`.
fn deprecated_attribute(attrs: &[Attribute]) -> Result<Option<String>, String> {
    for attr in attrs {
        if !attr.path().is_ident("deprecated") {
            continue;
        }
        let note = match &attr.meta {
            Meta::Path(_) => None,
            Meta::NameValue(nv) => match &nv.value {
                Expr::Lit(expr) => match &expr.lit {
                    Lit::Str(s) => Some(s.value()),
                    _ => None,
                },
                _ => None,
            },
            Meta::List(_) => {
                let mut note = None;
                attr.parse_nested_meta(|meta| {
                    let value: LitStr = meta.value()?.parse()?;
                    if meta.path.is_ident("note") {
                        note = Some(value.value());
                    }
                    Ok(())
                })
                .map_err(|e| format!("malformed deprecated attribute: {}", e))?;
                note
            }
        };
        return match note {
            Some(note) if !note.trim().is_empty() => Ok(Some(note.trim().to_string())),
            _ => Err("deprecated attribute has no message".to_string()),
        };
    }
    Ok(None)
}

/// Strips the raw-identifier prefix from an identifier.
pub fn ident_name(ident: &syn::Ident) -> String {
    let name = ident.to_string();
    match name.strip_prefix("r#") {
        Some(stripped) => stripped.to_string(),
        None => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn test_parse_rename_skip_and_omit() {
        let field: syn::Field = parse_quote! {
            #[serde(rename = "deviceId", skip_serializing_if = "Option::is_none")]
            pub id: Option<String>
        };
        let attrs = parse_serde_attributes(&field.attrs).unwrap();
        assert_eq!(attrs.rename.as_deref(), Some("deviceId"));
        assert!(attrs.omit_empty);
        assert!(!attrs.skip);
    }

    #[test]
    fn test_skip_serializing_if_is_not_skip() {
        let field: syn::Field = parse_quote! {
            #[serde(skip_serializing_if = "Vec::is_empty")]
            pub tags: Vec<String>
        };
        let attrs = parse_serde_attributes(&field.attrs).unwrap();
        assert!(!attrs.skip);
        assert!(attrs.omit_empty);
    }

    #[test]
    fn test_derives_matches_qualified_paths() {
        let item: syn::ItemEnum = parse_quote! {
            #[derive(Debug, Clone, serde_repr::Serialize_repr)]
            pub enum Level { Low = 1 }
        };
        assert!(derives(&item.attrs, "Serialize_repr"));
        assert!(derives(&item.attrs, "Clone"));
        assert!(!derives(&item.attrs, "Serialize"));
    }

    #[test]
    fn test_contract_required_marker() {
        let field: syn::Field = parse_quote! {
            #[contract(required)]
            pub note: Option<String>
        };
        assert_eq!(parse_forced_required(&field.attrs), Ok(true));

        let plain: syn::Field = parse_quote! { pub note: Option<String> };
        assert_eq!(parse_forced_required(&plain.attrs), Ok(false));

        let unknown: syn::Field = parse_quote! {
            #[contract(optional)]
            pub note: Option<String>
        };
        assert!(parse_forced_required(&unknown.attrs)
            .unwrap_err()
            .contains("unknown contract option"));
    }

    #[test]
    fn test_unrelated_serde_options_are_ignored() {
        let field: syn::Field = parse_quote! {
            #[serde(with = "humantime_serde", alias = "ts")]
            #[serde(bound(serialize = "T: Serialize"))]
            pub at: String
        };
        assert_eq!(parse_serde_attributes(&field.attrs).unwrap(), SerdeAttributes::default());
    }

    #[test]
    fn test_rename_with_serialize_name() {
        let field: syn::Field = parse_quote! {
            #[serde(rename(serialize = "out", deserialize = "in"))]
            pub value: u8
        };
        let attrs = parse_serde_attributes(&field.attrs).unwrap();
        assert_eq!(attrs.rename.as_deref(), Some("out"));
    }

    #[test]
    fn test_rename_rules_match_serde() {
        assert_eq!(RenameRule::Camel.apply_to_field("sensor_type"), "sensorType");
        assert_eq!(RenameRule::Pascal.apply_to_field("sensor_type"), "SensorType");
        assert_eq!(RenameRule::Kebab.apply_to_field("sensor_type"), "sensor-type");
        assert_eq!(RenameRule::Snake.apply_to_variant("OutOfRange"), "out_of_range");
        assert_eq!(RenameRule::ScreamingSnake.apply_to_variant("OutOfRange"), "OUT_OF_RANGE");
        assert_eq!(RenameRule::Camel.apply_to_variant("OutOfRange"), "outOfRange");
        assert_eq!(RenameRule::Lower.apply_to_variant("Online"), "online");
    }

    #[test]
    fn test_docs_split_deprecation_paragraph() {
        let item: syn::ItemStruct = parse_quote! {
            /// A sensor reading.
            ///
            /// Deprecated: use ReadingV2,
            /// which carries units.
            ///
            /// nolint:revive
            pub struct Reading {}
        };
        let docs = parse_docs(&item.attrs).unwrap();
        assert_eq!(docs.description, "A sensor reading.");
        assert_eq!(docs.deprecated.as_deref(), Some("use ReadingV2, which carries units."));
    }

    #[test]
    fn test_empty_deprecation_marker_is_error() {
        let item: syn::ItemStruct = parse_quote! {
            /// Old.
            /// Deprecated:
            pub struct Old {}
        };
        let err = parse_docs(&item.attrs).unwrap_err();
        assert!(err.contains("no message"));
    }

    #[test]
    fn test_deprecated_attribute_note() {
        let item: syn::ItemStruct = parse_quote! {
            #[deprecated(since = "2.0", note = "use Sensor")]
            pub struct Probe {}
        };
        let docs = parse_docs(&item.attrs).unwrap();
        assert_eq!(docs.deprecated.as_deref(), Some("use Sensor"));

        let bare: syn::ItemStruct = parse_quote! {
            #[deprecated]
            pub struct Probe {}
        };
        assert!(parse_docs(&bare.attrs).is_err());
    }
}
