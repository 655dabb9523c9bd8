// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Rule document schema and the config-source port.
//!
//! The document is a JSON object mapping group names to groups:
//!
//! ```json
//! {
//!   "floor_collision": {
//!     "type_a": ["T_FLOOR", "T_DOOR"],
//!     "cases": [
//!       { "type_b": ["T_GUNNY", "T_SWORDY"], "function": "_defaultFloorCollision" },
//!       { "type_b": ["T_CHECKPOINT"], "function": null }
//!     ]
//!   }
//! }
//! ```
//!
//! Required keys are decoded as optional so their absence surfaces as a
//! [`CompileError`](crate::CompileError) naming the group or case, rather
//! than as an opaque decode error.

use std::collections::btree_map;
use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer};

use crate::error::SourceError;

/// All collision groups of a document, keyed (and iterated) by group name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct RuleSet {
    groups: BTreeMap<String, Group>,
}

impl RuleSet {
    /// Create an empty rule set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a rule set from JSON bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, SourceError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Insert (or replace) a group.
    pub fn insert(&mut self, name: impl Into<String>, group: Group) -> Option<Group> {
        self.groups.insert(name.into(), group)
    }

    /// Look up a group by name.
    pub fn get(&self, name: &str) -> Option<&Group> {
        self.groups.get(name)
    }

    /// Groups in name order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, Group> {
        self.groups.iter()
    }

    /// Number of groups.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// `true` when the document declares no groups.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl<'a> IntoIterator for &'a RuleSet {
    type Item = (&'a String, &'a Group);
    type IntoIter = btree_map::Iter<'a, String, Group>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// A named family of cases sharing the same left-hand types.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Group {
    /// Left-hand types; `None` when the key is absent or null.
    #[serde(default)]
    pub type_a: Option<Vec<String>>,
    /// Cases in declaration order; `None` when the key is absent or null.
    #[serde(default)]
    pub cases: Option<Vec<Case>>,
}

impl Group {
    /// Build a complete group.
    pub fn new<I, S>(type_a: I, cases: Vec<Case>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            type_a: Some(type_a.into_iter().map(Into::into).collect()),
            cases: Some(cases),
        }
    }
}

/// Right-hand types paired with every `type_a` of the enclosing group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Case {
    /// Right-hand types; `None` when the key is absent or null.
    #[serde(default)]
    pub type_b: Option<Vec<String>>,
    /// Handler binding.
    ///
    /// - `None`: the `function` key is absent (malformed).
    /// - `Some(None)`: `"function": null`, the collision is ignored.
    /// - `Some(Some(name))`: dispatch to `name`.
    #[serde(default, deserialize_with = "present")]
    pub function: Option<Option<String>>,
}

impl Case {
    /// A case dispatching to `function`.
    pub fn dispatch<I, S>(type_b: I, function: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            type_b: Some(type_b.into_iter().map(Into::into).collect()),
            function: Some(Some(function.into())),
        }
    }

    /// A case whose collisions are ignored.
    pub fn ignore<I, S>(type_b: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            type_b: Some(type_b.into_iter().map(Into::into).collect()),
            function: Some(None),
        }
    }
}

// Only called when the key exists, so a JSON null still counts as present.
fn present<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// Port for whatever supplies the raw rule document.
pub trait RuleSource {
    /// Read the raw document bytes.
    fn load_raw(&self) -> Result<Vec<u8>, SourceError>;

    /// Read and decode the document.
    fn load(&self) -> Result<RuleSet, SourceError> {
        RuleSet::from_slice(&self.load_raw()?)
    }
}

/// In-memory document, mostly for tests and embedding.
#[derive(Debug, Clone, Copy)]
pub struct SliceSource<'a> {
    bytes: &'a [u8],
}

impl<'a> SliceSource<'a> {
    /// Wrap a borrowed document.
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }
}

impl RuleSource for SliceSource<'_> {
    fn load_raw(&self) -> Result<Vec<u8>, SourceError> {
        Ok(self.bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]
    use super::*;

    #[test]
    fn groups_iterate_in_name_order() {
        let doc = br#"{
            "zeta": { "type_a": ["A"], "cases": [] },
            "alpha": { "type_a": ["B"], "cases": [] }
        }"#;
        let rules = RuleSet::from_slice(doc).unwrap();
        let names: Vec<&str> = rules.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(names, ["alpha", "zeta"]);
    }

    #[test]
    fn function_key_distinguishes_absent_null_and_name() {
        let doc = br#"{
            "g": {
                "type_a": ["A"],
                "cases": [
                    { "type_b": ["B"], "function": "hit" },
                    { "type_b": ["C"], "function": null },
                    { "type_b": ["D"] }
                ]
            }
        }"#;
        let rules = RuleSet::from_slice(doc).unwrap();
        let cases = rules.get("g").and_then(|g| g.cases.as_ref()).unwrap();
        assert_eq!(cases[0].function, Some(Some("hit".to_owned())));
        assert_eq!(cases[1].function, Some(None));
        assert_eq!(cases[2].function, None);
    }

    #[test]
    fn missing_group_keys_decode_as_none() {
        let rules = RuleSet::from_slice(br#"{ "g": { "type_a": ["A"] } }"#).unwrap();
        let group = rules.get("g").unwrap();
        assert!(group.type_a.is_some());
        assert!(group.cases.is_none());
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let doc = br#"{ "g": { "type_a": [], "cases": [], "note": "x" } }"#;
        assert!(RuleSet::from_slice(doc).is_ok());
    }

    #[test]
    fn non_object_root_is_a_parse_error() {
        let err = RuleSet::from_slice(b"[1, 2]").unwrap_err();
        assert!(matches!(err, SourceError::Parse(_)));
    }

    #[test]
    fn invalid_json_is_a_parse_error() {
        let err = SliceSource::new(b"{ \"g\": ").load().unwrap_err();
        assert!(matches!(err, SourceError::Parse(_)));
    }

    #[test]
    fn wrong_field_type_is_a_parse_error() {
        let err = RuleSet::from_slice(br#"{ "g": { "type_a": 3, "cases": [] } }"#).unwrap_err();
        assert!(matches!(err, SourceError::Parse(_)));
    }
}
