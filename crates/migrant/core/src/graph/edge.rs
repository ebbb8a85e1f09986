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

//! Typed edges between class entities

use crate::facts::FactMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Relationship label, e.g. `ejb.home-interface`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeType(String);

impl EdgeType {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EdgeType {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl fmt::Display for EdgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of an edge: one edge per `(source, target, type)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeKey {
    pub source: String,
    pub target: String,
    pub edge_type: EdgeType,
}

impl EdgeKey {
    pub fn new(source: impl Into<String>, target: impl Into<String>, edge_type: impl Into<EdgeType>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            edge_type: edge_type.into(),
        }
    }
}

impl fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -[{}]-> {}", self.source, self.edge_type, self.target)
    }
}

/// Directed edge with its own facts
#[derive(Debug)]
pub struct Edge {
    key: EdgeKey,
    facts: FactMap,
}

impl Edge {
    pub(crate) fn new(key: EdgeKey) -> Self {
        Self { key, facts: FactMap::new() }
    }

    pub fn key(&self) -> &EdgeKey {
        &self.key
    }

    pub fn source(&self) -> &str {
        &self.key.source
    }

    pub fn target(&self) -> &str {
        &self.key.target
    }

    pub fn edge_type(&self) -> &EdgeType {
        &self.key.edge_type
    }

    pub fn facts(&self) -> &FactMap {
        &self.facts
    }
}
