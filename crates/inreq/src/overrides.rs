//! Runtime operation overrides.
//!
//! An [`OverrideMap`] redirects fields to another operation for one decode
//! call (or for every decode of a type, when registered on the decoder)
//! without touching the static field descriptors. Keys are struct field
//! names. A value is either an operation name or a nested map for a
//! recursed struct field. The reserved key `_` sets the operation of the
//! struct itself.
//!
//! Maps deserialize from plain JSON/TOML tables:
//!
//! ```rust
//! use inreq::{Override, OverrideMap};
//!
//! let map: OverrideMap = serde_json::from_str(
//!     r#"{"val": "header", "inner": {"other": "form", "_": "recurse"}}"#,
//! ).unwrap();
//!
//! assert_eq!(map.get("val"), Some(&Override::Operation("header".to_string())));
//! assert!(matches!(map.get("inner"), Some(Override::Nested(_))));
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Key that targets the struct itself.
pub const STRUCT_KEY: &str = "_";

/// One override entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Override {
    /// Decode the field with this operation
    Operation(String),
    /// Overrides for the fields of a nested struct
    Nested(OverrideMap),
}

/// Field-name keyed override map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OverrideMap {
    entries: BTreeMap<String, Override>,
}

impl OverrideMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Redirects `field` to `operation`.
    #[must_use]
    pub fn operation(mut self, field: impl Into<String>, operation: impl Into<String>) -> Self {
        self.insert(field, Override::Operation(operation.into()));
        self
    }

    /// Sets overrides for the fields of the nested struct `field`.
    #[must_use]
    pub fn nested(mut self, field: impl Into<String>, map: OverrideMap) -> Self {
        self.insert(field, Override::Nested(map));
        self
    }

    /// Sets the operation of the struct itself.
    #[must_use]
    pub fn struct_operation(self, operation: impl Into<String>) -> Self {
        self.operation(STRUCT_KEY, operation)
    }

    /// Inserts an entry, replacing an existing one.
    pub fn insert(&mut self, field: impl Into<String>, value: Override) {
        self.entries.insert(field.into(), value);
    }

    /// Returns the entry for `field`.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Override> {
        self.entries.get(field)
    }

    /// Iterates over the entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Override)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the map has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The override layers in effect for one struct: the call's map first, then
/// the decoder's per-type defaults.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Overrides<'a> {
    call: Option<&'a OverrideMap>,
    default: Option<&'a OverrideMap>,
}

impl<'a> Overrides<'a> {
    pub(crate) fn new(call: Option<&'a OverrideMap>, default: Option<&'a OverrideMap>) -> Self {
        Self { call, default }
    }

    pub(crate) fn get(&self, field: &str) -> Option<&'a Override> {
        self.call
            .and_then(|map| map.get(field))
            .or_else(|| self.default.and_then(|map| map.get(field)))
    }

    pub(crate) fn struct_operation(&self) -> Option<&'a str> {
        match self.get(STRUCT_KEY) {
            Some(Override::Operation(operation)) => Some(operation),
            _ => None,
        }
    }

    /// Layers for the nested struct `field`. `fallback` stands in for the
    /// default layer when this level has no default entry for `field`.
    pub(crate) fn nested(&self, field: &str, fallback: Option<&'a OverrideMap>) -> Self {
        let nested = |map: Option<&'a OverrideMap>| match map.and_then(|m| m.get(field)) {
            Some(Override::Nested(map)) => Some(map),
            _ => None,
        };
        Self {
            call: nested(self.call),
            default: nested(self.default).or(fallback),
        }
    }

    pub(crate) fn entries(&self) -> impl Iterator<Item = (&'a str, &'a Override)> {
        self.call
            .into_iter()
            .chain(self.default)
            .flat_map(OverrideMap::iter)
    }
}
