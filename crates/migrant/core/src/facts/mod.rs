// Migrant
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Facts attached to knowledge graph entities.
//!
//! A fact is a named datum. Tags are simple scalars used for dependency gating,
//! properties carry structured analysis results. Names are opaque dot-separated
//! identifiers such as `ejb.sessionBean`.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;

pub mod registry;

pub use registry::{FactRegistry, WritePolicy};

/// Opaque fact identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FactName(String);

impl FactName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FactName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FactName {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for FactName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl Borrow<str> for FactName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Scalar value of a tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagValue {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl TagValue {
    /// Whether the tag counts as present for requirement checks.
    /// Only an explicit `false` is treated as absent.
    pub fn is_set(&self) -> bool {
        !matches!(self, TagValue::Bool(false))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            TagValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<bool> for TagValue {
    fn from(value: bool) -> Self {
        TagValue::Bool(value)
    }
}

impl From<i64> for TagValue {
    fn from(value: i64) -> Self {
        TagValue::Int(value)
    }
}

impl From<&str> for TagValue {
    fn from(value: &str) -> Self {
        TagValue::Text(value.to_string())
    }
}

impl From<String> for TagValue {
    fn from(value: String) -> Self {
        TagValue::Text(value)
    }
}

/// Plain, ordered view of all facts on one node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FactTable {
    pub tags: BTreeMap<FactName, TagValue>,
    pub properties: BTreeMap<FactName, serde_json::Value>,
}

impl FactTable {
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty() && self.properties.is_empty()
    }

    /// A fact is present when it is a set tag or a non-null property
    pub fn has(&self, name: &str) -> bool {
        self.tags.get(name).is_some_and(TagValue::is_set) || self.properties.get(name).is_some_and(|value| !value.is_null())
    }

    pub(crate) fn merge_flag(&mut self, name: FactName, value: bool) {
        let merged = value || self.tags.get(&name).and_then(TagValue::as_bool).unwrap_or(false);
        self.tags.insert(name, TagValue::Bool(merged));
    }
}

/// Concurrently readable fact storage owned by a graph node.
///
/// Writes are crate-private: inspectors go through a decorator, which validates
/// and stages writes before they land here.
#[derive(Debug, Default)]
pub struct FactMap {
    table: RwLock<FactTable>,
}

impl FactMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tag(&self, name: &str) -> Option<TagValue> {
        self.table.read().tags.get(name).cloned()
    }

    pub fn property(&self, name: &str) -> Option<serde_json::Value> {
        self.table.read().properties.get(name).cloned()
    }

    pub fn has(&self, name: &str) -> bool {
        self.table.read().has(name)
    }

    /// Returns a copy of every fact on this node
    pub fn snapshot(&self) -> FactTable {
        self.table.read().clone()
    }

    pub(crate) fn set_tag(&self, name: FactName, value: TagValue) {
        self.table.write().tags.insert(name, value);
    }

    pub(crate) fn set_property(&self, name: FactName, value: serde_json::Value) {
        self.table.write().properties.insert(name, value);
    }

    pub(crate) fn merge_flag(&self, name: FactName, value: bool) {
        self.table.write().merge_flag(name, value);
    }

    pub(crate) fn clear(&self) {
        let mut table = self.table.write();
        table.tags.clear();
        table.properties.clear();
    }
}
