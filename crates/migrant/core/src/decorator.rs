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

//! Decorators: the only write path from an inspector into the graph.
//!
//! A decorator is created for exactly one `(inspector, entity)` pair. Every
//! write is checked against the fact registry and staged locally; staged
//! writes reach the graph only when the pair concludes as applied, after the
//! whole stage has finished. A failed or declined run leaves no trace.

use crate::contract::{InspectorContract, InspectorId};
use crate::error::InspectorError;
use crate::facts::{FactMap, FactName, FactRegistry, FactTable, TagValue, WritePolicy};
use crate::graph::{ClassEntity, EdgeKey, EdgeType, FileEntity, FileKind, GraphEntity, KnowledgeGraph};
use crate::report::{Outcome, Skip};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Decorator for inspectors running on project files
pub type ProjectFileDecorator<'a> = Decorator<'a, FileEntity>;

/// Decorator for inspectors running on class nodes
pub type NodeDecorator<'a> = Decorator<'a, ClassEntity>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Verdict {
    NotApplicable,
    Error(String),
}

/// Writes held back until the pair concludes
#[derive(Debug, Default)]
pub(crate) struct StagedWrites {
    facts: FactTable,
    flags: BTreeMap<FactName, bool>,
    edges: BTreeMap<EdgeKey, FactTable>,
    link: Option<(Arc<FileEntity>, String)>,
}

impl StagedWrites {
    /// Applies the staged writes to the graph. The link goes first so a
    /// conflicting link leaves the entity untouched.
    pub(crate) fn commit(self, graph: &KnowledgeGraph, facts: &FactMap) -> Result<(), InspectorError> {
        if let Some((file, fqn)) = self.link {
            let class = graph.derived_class_entity(&fqn);
            graph.link(&file, &class)?;
        }
        for (name, value) in self.facts.tags {
            facts.set_tag(name, value);
        }
        for (name, value) in self.facts.properties {
            facts.set_property(name, value);
        }
        for (name, value) in self.flags {
            facts.merge_flag(name, value);
        }
        for (key, edge_facts) in self.edges {
            let source = graph.derived_class_entity(&key.source);
            let target = graph.derived_class_entity(&key.target);
            let edge = graph.get_or_create_edge(&source, &target, key.edge_type);
            for (name, value) in edge_facts.tags {
                edge.facts().set_tag(name, value);
            }
            for (name, value) in edge_facts.properties {
                edge.facts().set_property(name, value);
            }
        }
        Ok(())
    }
}

/// Scoped handle bound to one inspector and one entity
pub struct Decorator<'a, E: GraphEntity> {
    contract: &'a InspectorContract,
    registry: &'a FactRegistry,
    graph: &'a KnowledgeGraph,
    entity: &'a Arc<E>,
    staged: StagedWrites,
    verdict: Option<Verdict>,
    violation: Option<String>,
}

impl<'a, E: GraphEntity> Decorator<'a, E> {
    pub(crate) fn new(contract: &'a InspectorContract, registry: &'a FactRegistry, graph: &'a KnowledgeGraph, entity: &'a Arc<E>) -> Self {
        Self {
            contract,
            registry,
            graph,
            entity,
            staged: StagedWrites::default(),
            verdict: None,
            violation: None,
        }
    }

    pub fn inspector(&self) -> &InspectorId {
        &self.contract.id
    }

    pub fn entity(&self) -> &Arc<E> {
        self.entity
    }

    /// Read access to the whole graph
    pub fn graph(&self) -> &KnowledgeGraph {
        self.graph
    }

    /// Sets a tag on the bound entity
    pub fn set_tag(&mut self, name: impl Into<FactName>, value: impl Into<TagValue>) -> Result<(), InspectorError> {
        let name = name.into();
        let value = value.into();
        match self.check_write(&name)? {
            WritePolicy::Exclusive => {
                self.staged.facts.tags.insert(name, value);
            }
            WritePolicy::MonotonicOr => match value {
                TagValue::Bool(flag) => {
                    let merged = self.staged.flags.get(&name).copied().unwrap_or(false) || flag;
                    self.staged.flags.insert(name, merged);
                }
                _ => return Err(self.violate(InspectorError::NonMonotonicWrite { fact: name })),
            },
        }
        Ok(())
    }

    /// Sets a structured property on the bound entity
    pub fn set_property<V: Serialize + ?Sized>(&mut self, name: impl Into<FactName>, value: &V) -> Result<(), InspectorError> {
        let name = name.into();
        if self.check_write(&name)? == WritePolicy::MonotonicOr {
            return Err(self.violate(InspectorError::NonMonotonicWrite { fact: name }));
        }
        let value = serde_json::to_value(value).map_err(|source| InspectorError::Serialization { fact: name.clone(), source })?;
        self.staged.facts.properties.insert(name, value);
        Ok(())
    }

    /// Current tag value, including writes staged by this decorator
    pub fn tag(&self, name: &str) -> Option<TagValue> {
        if let Some(value) = self.staged.facts.tags.get(name) {
            return Some(value.clone());
        }
        if let Some(flag) = self.staged.flags.get(name) {
            let committed = self.entity.facts().tag(name).and_then(|tag| tag.as_bool()).unwrap_or(false);
            return Some(TagValue::Bool(*flag || committed));
        }
        self.entity.facts().tag(name)
    }

    /// Current property value, including writes staged by this decorator
    pub fn property(&self, name: &str) -> Option<serde_json::Value> {
        self.staged.facts.properties.get(name).cloned().or_else(|| self.entity.facts().property(name))
    }

    pub fn has(&self, name: &str) -> bool {
        self.tag(name).is_some_and(|tag| tag.is_set()) || self.property(name).is_some_and(|value| !value.is_null())
    }

    /// Marks the pair as not applicable; staged writes are dropped
    pub fn not_applicable(&mut self) {
        self.verdict = Some(Verdict::NotApplicable);
    }

    /// Marks the pair as failed without raising
    pub fn error(&mut self, message: impl Into<String>) {
        self.verdict = Some(Verdict::Error(message.into()));
    }

    fn check_write(&mut self, name: &FactName) -> Result<WritePolicy, InspectorError> {
        match self.registry.validate_write(&self.contract.id, name.as_str()) {
            Ok(policy) => Ok(policy),
            Err(err) => Err(self.violate(err)),
        }
    }

    /// Remembers a contract violation so the pair fails even if the inspector swallows the error
    fn violate(&mut self, err: InspectorError) -> InspectorError {
        self.violation.get_or_insert_with(|| err.to_string());
        err
    }

    fn stage_edge_fact(&mut self, target: &str, edge_type: EdgeType) -> &mut FactTable {
        let key = EdgeKey::new(self.entity.key(), target, edge_type);
        self.staged.edges.entry(key).or_default()
    }

    /// Turns the analysis result into an outcome plus the writes to commit
    pub(crate) fn conclude(self, result: Result<(), InspectorError>) -> (Outcome, Option<StagedWrites>) {
        if let Err(err) = result {
            return (Outcome::Failed(err.to_string()), None);
        }
        if let Some(violation) = self.violation {
            return (Outcome::Failed(violation), None);
        }
        match self.verdict {
            Some(Verdict::NotApplicable) => (Outcome::NotApplicable(Skip::Declined), None),
            Some(Verdict::Error(message)) => (Outcome::Failed(message), None),
            None => (Outcome::Applied, Some(self.staged)),
        }
    }
}

impl<'a> Decorator<'a, FileEntity> {
    /// Links the bound file to the class `fqn`, creating the class on commit
    pub fn link_class(&mut self, fqn: &str) -> Result<(), InspectorError> {
        let existing = self
            .staged
            .link
            .as_ref()
            .map(|(_, staged)| staged.clone())
            .or_else(|| self.entity.linked_class());
        if let Some(existing) = existing {
            if existing != fqn {
                return Err(InspectorError::LinkConflict {
                    file: self.entity.path().to_string(),
                    existing,
                    requested: fqn.to_string(),
                });
            }
        }
        self.staged.link = Some((self.entity.clone(), fqn.to_string()));
        Ok(())
    }

    /// Class the file is linked to in committed state
    pub fn linked_class(&self) -> Option<Arc<ClassEntity>> {
        self.graph.linked_class(self.entity)
    }

    pub fn content(&self) -> Result<Arc<str>, InspectorError> {
        self.entity.read_content()
    }
}

impl<'a> Decorator<'a, ClassEntity> {
    /// Ensures an edge of `edge_type` from the bound class to `target`
    pub fn add_edge(&mut self, target: &str, edge_type: impl Into<EdgeType>) {
        self.stage_edge_fact(target, edge_type.into());
    }

    /// Sets a property on the edge from the bound class to `target`, creating the edge
    pub fn set_edge_property<V: Serialize + ?Sized>(
        &mut self,
        target: &str,
        edge_type: impl Into<EdgeType>,
        name: impl Into<FactName>,
        value: &V,
    ) -> Result<(), InspectorError> {
        let name = name.into();
        if self.check_write(&name)? == WritePolicy::MonotonicOr {
            return Err(self.violate(InspectorError::NonMonotonicWrite { fact: name }));
        }
        let value = serde_json::to_value(value).map_err(|source| InspectorError::Serialization { fact: name.clone(), source })?;
        self.stage_edge_fact(target, edge_type.into()).properties.insert(name, value);
        Ok(())
    }

    pub fn linked_files(&self) -> Vec<Arc<FileEntity>> {
        self.graph.linked_files(self.entity)
    }

    /// Content of the first linked Java source file, if any
    pub fn source(&self) -> Result<Option<Arc<str>>, InspectorError> {
        match self.linked_files().into_iter().find(|file| file.kind() == FileKind::JavaSource) {
            Some(file) => file.read_content().map(Some),
            None => Ok(None),
        }
    }
}
