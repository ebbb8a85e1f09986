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

//! Knowledge graph store
//!
//! Holds file entities, class entities and the typed edges between classes.
//! Every get-or-create operation goes through the DashMap entry API, which
//! locks the key's shard, so concurrent first-touch of a key yields a single
//! node.

use crate::error::InspectorError;
use crate::facts::FactTable;
use dashmap::DashMap;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

pub mod edge;
pub mod entity;

pub use edge::{Edge, EdgeKey, EdgeType};
pub use entity::{ClassEntity, FileEntity, FileKind, FileSource, GraphEntity};

/// Shared, concurrently accessed store of entities and edges
#[derive(Debug, Default)]
pub struct KnowledgeGraph {
    files: DashMap<String, Arc<FileEntity>>,
    classes: DashMap<String, Arc<ClassEntity>>,
    edges: DashMap<EdgeKey, Arc<Edge>>,
}

impl KnowledgeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the file entity for `path`, creating it without a content source
    pub fn get_or_create_file_entity(&self, path: &str) -> Arc<FileEntity> {
        self.add_file(path, FileSource::Unavailable)
    }

    /// Registers a file with its content source. An existing entity is returned unchanged.
    pub fn add_file(&self, path: &str, source: FileSource) -> Arc<FileEntity> {
        let path = normalize_path(path);
        if let Some(existing) = self.files.get(&path) {
            return existing.value().clone();
        }
        self.files
            .entry(path.clone())
            .or_insert_with(|| Arc::new(FileEntity::new(path, source)))
            .value()
            .clone()
    }

    /// Registers an in-memory file
    pub fn add_virtual_file(&self, path: &str, content: &str) -> Arc<FileEntity> {
        self.add_file(path, FileSource::Memory(Arc::from(content)))
    }

    /// Returns the class entity for `fqn`, marking it seeded so it survives [`reset`](Self::reset)
    pub fn get_or_create_class_entity(&self, fqn: &str) -> Arc<ClassEntity> {
        let class = self.class_entity(fqn);
        class.mark_seeded();
        class
    }

    /// Class created as a link or edge endpoint while committing inspector writes
    pub(crate) fn derived_class_entity(&self, fqn: &str) -> Arc<ClassEntity> {
        self.class_entity(fqn)
    }

    fn class_entity(&self, fqn: &str) -> Arc<ClassEntity> {
        if let Some(existing) = self.classes.get(fqn) {
            return existing.value().clone();
        }
        self.classes
            .entry(fqn.to_string())
            .or_insert_with(|| Arc::new(ClassEntity::new(fqn.to_string())))
            .value()
            .clone()
    }

    /// Returns the unique edge of `edge_type` from `source` to `target`
    pub fn get_or_create_edge(&self, source: &ClassEntity, target: &ClassEntity, edge_type: impl Into<EdgeType>) -> Arc<Edge> {
        let key = EdgeKey::new(source.fqn(), target.fqn(), edge_type);
        self.edges.entry(key.clone()).or_insert_with(|| Arc::new(Edge::new(key))).value().clone()
    }

    pub fn file(&self, path: &str) -> Option<Arc<FileEntity>> {
        self.files.get(&normalize_path(path)).map(|entry| entry.value().clone())
    }

    pub fn class(&self, fqn: &str) -> Option<Arc<ClassEntity>> {
        self.classes.get(fqn).map(|entry| entry.value().clone())
    }

    pub fn edge(&self, key: &EdgeKey) -> Option<Arc<Edge>> {
        self.edges.get(key).map(|entry| entry.value().clone())
    }

    /// All files sorted by path
    pub fn files(&self) -> Vec<Arc<FileEntity>> {
        let mut files: Vec<_> = self.files.iter().map(|entry| entry.value().clone()).collect();
        files.sort_by(|a, b| a.path().cmp(b.path()));
        files
    }

    /// All classes sorted by FQN
    pub fn classes(&self) -> Vec<Arc<ClassEntity>> {
        let mut classes: Vec<_> = self.classes.iter().map(|entry| entry.value().clone()).collect();
        classes.sort_by(|a, b| a.fqn().cmp(b.fqn()));
        classes
    }

    /// All edges sorted by key
    pub fn edges(&self) -> Vec<Arc<Edge>> {
        let mut edges: Vec<_> = self.edges.iter().map(|entry| entry.value().clone()).collect();
        edges.sort_by(|a, b| a.key().cmp(b.key()));
        edges
    }

    /// Outgoing edges of a class, sorted by key
    pub fn edges_from(&self, source: &str) -> Vec<Arc<Edge>> {
        let mut edges: Vec<_> = self
            .edges
            .iter()
            .filter(|entry| entry.key().source == source)
            .map(|entry| entry.value().clone())
            .collect();
        edges.sort_by(|a, b| a.key().cmp(b.key()));
        edges
    }

    pub fn linked_class(&self, file: &FileEntity) -> Option<Arc<ClassEntity>> {
        file.linked_class().and_then(|fqn| self.class(&fqn))
    }

    pub fn linked_files(&self, class: &ClassEntity) -> Vec<Arc<FileEntity>> {
        class.linked_files().iter().filter_map(|path| self.file(path)).collect()
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Links a file to its class. A file links to at most one class.
    pub(crate) fn link(&self, file: &FileEntity, class: &ClassEntity) -> Result<(), InspectorError> {
        let mut slot = file.link_slot().write();
        match slot.clone() {
            Some(existing) if existing != class.fqn() => {
                return Err(InspectorError::LinkConflict {
                    file: file.path().to_string(),
                    existing,
                    requested: class.fqn().to_string(),
                });
            }
            Some(_) => {}
            None => *slot = Some(class.fqn().to_string()),
        }
        class.file_slots().write().insert(file.path().to_string());
        Ok(())
    }

    /// Returns the graph to its pre-analysis state: files and seeded classes
    /// stay, derived classes go, and every fact, link and edge is dropped.
    pub fn reset(&self) {
        self.classes.retain(|_, class| class.is_seeded());
        for entry in self.files.iter() {
            entry.value().facts().clear();
            *entry.value().link_slot().write() = None;
        }
        for entry in self.classes.iter() {
            entry.value().facts().clear();
            entry.value().file_slots().write().clear();
        }
        self.edges.clear();
    }

    /// Ordered copy of the whole graph state
    pub fn snapshot(&self) -> GraphSnapshot {
        let mut snapshot = GraphSnapshot::default();
        for file in self.files() {
            if let Some(fqn) = file.linked_class() {
                snapshot.links.insert(file.path().to_string(), fqn);
            }
            snapshot.files.insert(file.path().to_string(), file.facts().snapshot());
        }
        for class in self.classes() {
            snapshot.classes.insert(class.fqn().to_string(), class.facts().snapshot());
        }
        for edge in self.edges() {
            snapshot.edges.insert(edge.key().to_string(), edge.facts().snapshot());
        }
        snapshot
    }
}

/// Plain copy of graph state, keyed and ordered for comparison
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GraphSnapshot {
    pub files: BTreeMap<String, FactTable>,
    pub classes: BTreeMap<String, FactTable>,
    /// File path to linked class FQN
    pub links: BTreeMap<String, String>,
    pub edges: BTreeMap<String, FactTable>,
}

/// Normalizes separators so the same file always maps to the same key
pub fn normalize_path(path: &str) -> String {
    let path = path.replace('\\', "/");
    path.trim_start_matches("./").to_string()
}
