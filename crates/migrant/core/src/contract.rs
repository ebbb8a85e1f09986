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

//! Inspector contracts
//!
//! A contract is the static declaration an inspector registers at startup: which
//! facts must already hold on its target (`requires`), which inspectors must
//! have completed a full pass first (`need`), and which facts it may write
//! (`produces`). Contracts are immutable once built.

use crate::error::ConfigError;
use crate::facts::FactName;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::BTreeSet;
use std::fmt;

/// Stable identity of an inspector
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InspectorId(String);

impl InspectorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InspectorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for InspectorId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for InspectorId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Borrow<str> for InspectorId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Kind of graph entity an inspector runs against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    File,
    Class,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::File => f.write_str("file"),
            EntityKind::Class => f.write_str("class"),
        }
    }
}

/// Where `requires` facts are looked up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementScope {
    /// Only on the target entity itself
    #[default]
    Entity,

    /// On the target entity or any entity linked to it (file <-> class)
    Linked,
}

/// Static declaration of an inspector's dependencies and write permissions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InspectorContract {
    pub id: InspectorId,
    pub target: EntityKind,
    pub requires: BTreeSet<FactName>,
    pub need: BTreeSet<InspectorId>,
    pub produces: BTreeSet<FactName>,
    /// Boolean facts this inspector co-produces with others using OR-merge
    pub shared: BTreeSet<FactName>,
    pub scope: RequirementScope,
}

impl InspectorContract {
    /// Starts a contract for an inspector running on `target` entities
    pub fn builder(id: impl Into<InspectorId>, target: EntityKind) -> ContractBuilder {
        ContractBuilder {
            contract: InspectorContract {
                id: id.into(),
                target,
                requires: BTreeSet::new(),
                need: BTreeSet::new(),
                produces: BTreeSet::new(),
                shared: BTreeSet::new(),
                scope: RequirementScope::Entity,
            },
        }
    }

    pub fn produces(&self, fact: &str) -> bool {
        self.produces.contains(fact)
    }

    pub fn shares(&self, fact: &str) -> bool {
        self.shared.contains(fact)
    }

    /// Checks the contract's internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidContract {
            inspector: self.id.clone(),
            reason,
        };

        if self.id.as_str().trim().is_empty() {
            return Err(invalid("empty inspector id".to_string()));
        }
        if let Some(fact) = self.requires.iter().chain(&self.produces).find(|fact| fact.as_str().trim().is_empty()) {
            return Err(invalid(format!("empty fact name '{fact}'")));
        }
        if let Some(fact) = self.shared.iter().find(|fact| !self.produces.contains(*fact)) {
            return Err(invalid(format!("shared fact '{fact}' is not in produces")));
        }
        Ok(())
    }
}

/// Fluent builder for [`InspectorContract`]
#[derive(Debug, Clone)]
pub struct ContractBuilder {
    contract: InspectorContract,
}

impl ContractBuilder {
    pub fn requires(mut self, fact: impl Into<FactName>) -> Self {
        self.contract.requires.insert(fact.into());
        self
    }

    pub fn needs(mut self, inspector: impl Into<InspectorId>) -> Self {
        self.contract.need.insert(inspector.into());
        self
    }

    pub fn produces(mut self, fact: impl Into<FactName>) -> Self {
        self.contract.produces.insert(fact.into());
        self
    }

    /// Declares a boolean fact shared with other producers (monotonic OR-merge)
    pub fn shares(mut self, fact: impl Into<FactName>) -> Self {
        let fact = fact.into();
        self.contract.produces.insert(fact.clone());
        self.contract.shared.insert(fact);
        self
    }

    pub fn scope(mut self, scope: RequirementScope) -> Self {
        self.contract.scope = scope;
        self
    }

    pub fn build(self) -> InspectorContract {
        self.contract
    }
}
