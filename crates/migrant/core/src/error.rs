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

//! Error types for inspector orchestration
//!
//! Configuration errors are fatal and surface before any entity is processed.
//! Inspector errors are scoped to a single `(inspector, entity)` pair and end up
//! as `Failed` run records.

use crate::contract::InspectorId;
use crate::facts::FactName;
use thiserror::Error;

/// Fatal errors detected while registering contracts and building the plan
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("inspector '{inspector}' requires fact '{fact}' but no inspector produces it")]
    DanglingRequirement { inspector: InspectorId, fact: FactName },

    #[error("cyclic dependency between inspectors: {}", join_ids(.members))]
    CyclicDependency { members: Vec<InspectorId> },

    #[error("fact '{fact}' is produced by both '{first}' and '{second}' without being declared shared")]
    DuplicateProducer { fact: FactName, first: InspectorId, second: InspectorId },

    #[error("inspector '{0}' is registered more than once")]
    DuplicateInspector(InspectorId),

    #[error("inspector '{inspector}' needs unknown inspector '{needed}'")]
    UnknownInspector { inspector: InspectorId, needed: InspectorId },

    #[error("invalid contract for '{inspector}': {reason}")]
    InvalidContract { inspector: InspectorId, reason: String },

    #[error("fact registry is frozen; cannot register '{0}'")]
    RegistryFrozen(InspectorId),

    #[error("failed to start worker pool: {0}")]
    WorkerPool(String),
}

/// Errors raised while an inspector analyzes one entity
#[derive(Debug, Error)]
pub enum InspectorError {
    #[error("inspector '{inspector}' wrote undeclared fact '{fact}'")]
    UndeclaredFactWrite { inspector: InspectorId, fact: FactName },

    #[error("shared fact '{fact}' only accepts boolean tags")]
    NonMonotonicWrite { fact: FactName },

    #[error("file '{file}' is already linked to class '{existing}', cannot link '{requested}'")]
    LinkConflict { file: String, existing: String, requested: String },

    #[error("cannot serialize property '{fact}': {source}")]
    Serialization {
        fact: FactName,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parse error in '{path}': {message}")]
    Parse { path: String, message: String },

    #[error("{0}")]
    Failed(String),
}

impl InspectorError {
    /// Shorthand for a free-form failure
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

fn join_ids(ids: &[InspectorId]) -> String {
    ids.iter().map(|id| id.as_str()).collect::<Vec<_>>().join(", ")
}
