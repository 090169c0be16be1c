//! Derived edges over the descriptor map.
//!
//! `References` is filled by the declaration scanner. This module derives the
//! inverse `ReferencedBy` edge, the transport marks, and the transitive
//! `UsedBy` records once every operation has been registered.

use crate::model::{TypeMap, Usage};
use log::debug;
use std::collections::{BTreeMap, BTreeSet};

/// Transport kind an operation belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Http,
    Messaging,
}

/// One operation consuming one declared type in a given role
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Consumption {
    pub type_name: String,
    pub usage: Usage,
}

pub struct TypeGraph;

impl TypeGraph {
    /// Rebuilds `referenced_by` as the exact inverse of `references`.
    ///
    /// Edges pointing at names missing from the map are ignored.
    pub fn link_references(types: &mut TypeMap) {
        let mut inverse: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for (name, descriptor) in types.iter() {
            for target in &descriptor.references {
                if types.contains_key(target) {
                    inverse.entry(target.clone()).or_default().insert(name.clone());
                }
            }
        }

        for (name, descriptor) in types.iter_mut() {
            descriptor.referenced_by = inverse.remove(name).unwrap_or_default();
        }
    }

    /// Marks `name` and everything it transitively references as consumed by
    /// `transport`.
    ///
    /// Stops at types that already carry the mark, so reference cycles
    /// terminate.
    pub fn mark_used(types: &mut TypeMap, name: &str, transport: Transport) {
        let mut pending = vec![name.to_string()];
        while let Some(current) = pending.pop() {
            let Some(descriptor) = types.get_mut(&current) else {
                continue;
            };
            let mark = match transport {
                Transport::Http => &mut descriptor.used_by_http,
                Transport::Messaging => &mut descriptor.used_by_messaging,
            };
            if *mark {
                continue;
            }
            *mark = true;
            pending.extend(descriptor.references.iter().cloned());
        }
    }

    /// Appends each consumption's usage to the consumed type and to the whole
    /// set of types it transitively references, then deduplicates and sorts
    /// every `used_by` list.
    pub fn record_usage(types: &mut TypeMap, consumptions: &[Consumption]) {
        for consumption in consumptions {
            for name in Self::closure(types, &consumption.type_name) {
                if let Some(descriptor) = types.get_mut(&name) {
                    descriptor.used_by.push(consumption.usage.clone());
                }
            }
        }

        for descriptor in types.values_mut() {
            descriptor.used_by.sort();
            descriptor.used_by.dedup();
        }
        debug!("Recorded {} type usages", consumptions.len());
    }

    /// Names reachable from `root` through `references`, `root` included.
    pub fn closure(types: &TypeMap, root: &str) -> BTreeSet<String> {
        let mut visited = BTreeSet::new();
        let mut pending = vec![root.to_string()];
        while let Some(current) = pending.pop() {
            let Some(descriptor) = types.get(&current) else {
                continue;
            };
            if !visited.insert(current) {
                continue;
            }
            pending.extend(
                descriptor
                    .references
                    .iter()
                    .filter(|name| !visited.contains(*name))
                    .cloned(),
            );
        }
        visited
    }
}
