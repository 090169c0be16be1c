//! Documentation snapshot: every type, operation and relationship, with all
//! collections keyed and ordered so identical input serializes identically.

use crate::config::ApiInfo;
use crate::model::{EnumValue, FieldDescriptor, FieldType, Representations, TypeKind, TypeMap, Usage};
use crate::registry::{ChannelOperation, RouteSpec};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot<'a> {
    pub info: &'a ApiInfo,
    pub types: BTreeMap<&'a str, TypeEntry<'a>>,
    pub http_operations: &'a BTreeMap<String, RouteSpec>,
    pub publications: &'a BTreeMap<String, ChannelOperation>,
    pub subscriptions: &'a BTreeMap<String, ChannelOperation>,
}

/// Snapshot view of one type descriptor
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeEntry<'a> {
    pub kind: TypeKind,
    #[serde(skip_serializing_if = "str::is_empty")]
    pub description: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<&'a str>,
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    pub fields: &'a [FieldDescriptor],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub underlying: Option<&'a FieldType>,
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    pub enum_values: &'a [EnumValue],
    pub references: &'a BTreeSet<String>,
    pub referenced_by: &'a BTreeSet<String>,
    pub used_by: &'a [Usage],
    pub used_by_http: bool,
    pub used_by_messaging: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub representations: Option<&'a Representations>,
}

impl<'a> Snapshot<'a> {
    pub fn new(
        info: &'a ApiInfo,
        types: &'a TypeMap,
        http_operations: &'a BTreeMap<String, RouteSpec>,
        publications: &'a BTreeMap<String, ChannelOperation>,
        subscriptions: &'a BTreeMap<String, ChannelOperation>,
    ) -> Self {
        let types = types
            .iter()
            .map(|(name, t)| {
                (
                    name.as_str(),
                    TypeEntry {
                        kind: t.kind,
                        description: &t.description,
                        deprecated: t.deprecated.as_deref(),
                        fields: &t.fields,
                        underlying: t.underlying.as_ref(),
                        enum_values: &t.enum_values,
                        references: &t.references,
                        referenced_by: &t.referenced_by,
                        used_by: &t.used_by,
                        used_by_http: t.used_by_http,
                        used_by_messaging: t.used_by_messaging,
                        representations: t.representations.as_ref(),
                    },
                )
            })
            .collect();

        Self {
            info,
            types,
            http_operations,
            publications,
            subscriptions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{TypeDescriptor, TypeKind};
    use serde_json::json;

    #[test]
    fn test_snapshot_field_names_are_camel_case() {
        let mut reading = TypeDescriptor::stub("Reading", "pub struct Reading;");
        reading.kind = TypeKind::Object;
        reading.referenced_by.insert("Device".to_string());
        reading.used_by.push(Usage::new("listReadings", "response:200"));
        reading.used_by_http = true;
        let types: TypeMap = [("Reading".to_string(), reading)].into_iter().collect();
        let info = ApiInfo::default();
        let empty_routes = BTreeMap::new();
        let empty_channels = BTreeMap::new();

        let snapshot = Snapshot::new(&info, &types, &empty_routes, &empty_channels, &empty_channels);
        let value = serde_json::to_value(&snapshot).unwrap();

        assert_eq!(
            value["types"]["Reading"],
            json!({
                "kind": "object",
                "references": [],
                "referencedBy": ["Device"],
                "usedBy": [{ "operationId": "listReadings", "role": "response:200" }],
                "usedByHttp": true,
                "usedByMessaging": false
            })
        );
        assert_eq!(value["httpOperations"], json!({}));
        assert_eq!(value["info"]["title"], "Generated API");
    }
}
