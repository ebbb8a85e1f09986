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

//! Fact registry
//!
//! Tracks which inspector may write which fact. Exclusive ownership is the
//! default; a fact may have several producers only when every one of them
//! declares it shared, in which case writes OR-merge.

use crate::contract::{InspectorContract, InspectorId};
use crate::error::{ConfigError, InspectorError};
use crate::facts::FactName;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// How a validated write must be applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritePolicy {
    /// Single producer; writes overwrite
    Exclusive,
    /// Shared boolean fact; writes OR-merge
    MonotonicOr,
}

#[derive(Debug, Clone)]
struct Producer {
    inspector: InspectorId,
    shared: bool,
}

/// Universe of declared facts and their producers
#[derive(Debug, Default)]
pub struct FactRegistry {
    producers: BTreeMap<FactName, Vec<Producer>>,
    declared: HashMap<InspectorId, BTreeSet<FactName>>,
    frozen: bool,
}

impl FactRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the `produces` set of a contract
    pub fn register(&mut self, contract: &InspectorContract) -> Result<(), ConfigError> {
        if self.frozen {
            return Err(ConfigError::RegistryFrozen(contract.id.clone()));
        }
        if self.declared.contains_key(&contract.id) {
            return Err(ConfigError::DuplicateInspector(contract.id.clone()));
        }

        // Validate everything before mutating so a rejected contract leaves no trace
        for fact in &contract.produces {
            let shared = contract.shares(fact.as_str());
            if let Some(existing) = self.producers.get(fact) {
                if let Some(conflict) = existing.iter().find(|p| !(p.shared && shared)) {
                    return Err(ConfigError::DuplicateProducer {
                        fact: fact.clone(),
                        first: conflict.inspector.clone(),
                        second: contract.id.clone(),
                    });
                }
            }
        }

        for fact in &contract.produces {
            self.producers.entry(fact.clone()).or_default().push(Producer {
                inspector: contract.id.clone(),
                shared: contract.shares(fact.as_str()),
            });
        }
        self.declared.insert(contract.id.clone(), contract.produces.clone());
        Ok(())
    }

    /// Checks that `inspector` declared `fact` and reports how to apply the write
    pub fn validate_write(&self, inspector: &InspectorId, fact: &str) -> Result<WritePolicy, InspectorError> {
        let declared = self.declared.get(inspector).is_some_and(|facts| facts.contains(fact));
        if !declared {
            return Err(InspectorError::UndeclaredFactWrite {
                inspector: inspector.clone(),
                fact: FactName::from(fact),
            });
        }

        let shared = self
            .producers
            .get(fact)
            .and_then(|producers| producers.iter().find(|p| &p.inspector == inspector))
            .is_some_and(|p| p.shared);
        Ok(if shared { WritePolicy::MonotonicOr } else { WritePolicy::Exclusive })
    }

    /// Producers of `fact` in registration order
    pub fn producers_of(&self, fact: &str) -> impl Iterator<Item = &InspectorId> + '_ {
        self.producers.get(fact).into_iter().flatten().map(|p| &p.inspector)
    }

    pub fn is_declared(&self, fact: &str) -> bool {
        self.producers.contains_key(fact)
    }

    /// All facts with at least one producer
    pub fn facts(&self) -> impl Iterator<Item = &FactName> + '_ {
        self.producers.keys()
    }

    /// Makes the registry read-only
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }
}
