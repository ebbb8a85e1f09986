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

//! Graph entities: project files and classes

use crate::contract::EntityKind;
use crate::error::InspectorError;
use crate::facts::FactMap;
use crate::graph::KnowledgeGraph;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Behaviour shared by every node an inspector can target
pub trait GraphEntity: Send + Sync + 'static {
    /// Entity kind used to match inspector contracts
    const KIND: EntityKind;

    /// Stable key (relative path or fully-qualified name)
    fn key(&self) -> &str;

    fn facts(&self) -> &FactMap;

    /// All entities of this kind, sorted by key
    fn collect(graph: &KnowledgeGraph) -> Vec<Arc<Self>>;

    /// Whether any entity linked to this one carries `fact`
    fn linked_has(&self, graph: &KnowledgeGraph, fact: &str) -> bool;
}

/// Broad classification of a project file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    JavaSource,
    ClassFile,
    XmlDescriptor,
    Other,
}

impl FileKind {
    pub fn from_path(path: &str) -> Self {
        match Path::new(path).extension().and_then(|ext| ext.to_str()) {
            Some("java") => FileKind::JavaSource,
            Some("class") => FileKind::ClassFile,
            Some("xml") => FileKind::XmlDescriptor,
            _ => FileKind::Other,
        }
    }
}

/// Where a file's content can be read from
#[derive(Debug, Clone)]
pub enum FileSource {
    Disk(PathBuf),
    Memory(Arc<str>),
    Unavailable,
}

/// One source, binary or descriptor file of the analyzed project
#[derive(Debug)]
pub struct FileEntity {
    path: String,
    kind: FileKind,
    source: FileSource,
    facts: FactMap,
    class: RwLock<Option<String>>,
}

impl FileEntity {
    pub(crate) fn new(path: String, source: FileSource) -> Self {
        Self {
            kind: FileKind::from_path(&path),
            path,
            source,
            facts: FactMap::new(),
            class: RwLock::new(None),
        }
    }

    /// Repository-relative path, `/`-separated
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn kind(&self) -> FileKind {
        self.kind
    }

    pub fn source(&self) -> &FileSource {
        &self.source
    }

    pub fn facts(&self) -> &FactMap {
        &self.facts
    }

    /// Last path segment
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// FQN of the class this file is linked to, if any
    pub fn linked_class(&self) -> Option<String> {
        self.class.read().clone()
    }

    /// Reads the file content
    pub fn read_content(&self) -> Result<Arc<str>, InspectorError> {
        match &self.source {
            FileSource::Memory(content) => Ok(content.clone()),
            FileSource::Disk(location) => std::fs::read_to_string(location).map(Arc::from).map_err(|source| InspectorError::Io {
                path: self.path.clone(),
                source,
            }),
            FileSource::Unavailable => Err(InspectorError::Io {
                path: self.path.clone(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no content source registered"),
            }),
        }
    }

    pub(crate) fn link_slot(&self) -> &RwLock<Option<String>> {
        &self.class
    }
}

impl GraphEntity for FileEntity {
    const KIND: EntityKind = EntityKind::File;

    fn key(&self) -> &str {
        &self.path
    }

    fn facts(&self) -> &FactMap {
        &self.facts
    }

    fn collect(graph: &KnowledgeGraph) -> Vec<Arc<Self>> {
        graph.files()
    }

    fn linked_has(&self, graph: &KnowledgeGraph, fact: &str) -> bool {
        graph.linked_class(self).is_some_and(|class| class.facts().has(fact))
    }
}

/// A class or interface identified by its fully-qualified name.
///
/// Classes registered through the public graph API are seeded and outlive a
/// reset. Classes that only exist because an inspector linked a file to them
/// or drew an edge to them are derived and dropped on reset.
#[derive(Debug)]
pub struct ClassEntity {
    fqn: String,
    facts: FactMap,
    files: RwLock<BTreeSet<String>>,
    seeded: AtomicBool,
}

impl ClassEntity {
    pub(crate) fn new(fqn: String) -> Self {
        Self {
            fqn,
            facts: FactMap::new(),
            files: RwLock::new(BTreeSet::new()),
            seeded: AtomicBool::new(false),
        }
    }

    pub fn is_seeded(&self) -> bool {
        self.seeded.load(Ordering::Acquire)
    }

    pub(crate) fn mark_seeded(&self) {
        self.seeded.store(true, Ordering::Release);
    }

    pub fn fqn(&self) -> &str {
        &self.fqn
    }

    pub fn facts(&self) -> &FactMap {
        &self.facts
    }

    pub fn simple_name(&self) -> &str {
        self.fqn.rsplit('.').next().unwrap_or(&self.fqn)
    }

    /// Package part of the FQN, empty for the default package
    pub fn package(&self) -> &str {
        self.fqn.rsplit_once('.').map(|(package, _)| package).unwrap_or("")
    }

    /// Paths of the files linked to this class
    pub fn linked_files(&self) -> Vec<String> {
        self.files.read().iter().cloned().collect()
    }

    pub(crate) fn file_slots(&self) -> &RwLock<BTreeSet<String>> {
        &self.files
    }
}

impl GraphEntity for ClassEntity {
    const KIND: EntityKind = EntityKind::Class;

    fn key(&self) -> &str {
        &self.fqn
    }

    fn facts(&self) -> &FactMap {
        &self.facts
    }

    fn collect(graph: &KnowledgeGraph) -> Vec<Arc<Self>> {
        graph.classes()
    }

    fn linked_has(&self, graph: &KnowledgeGraph, fact: &str) -> bool {
        graph.linked_files(self).iter().any(|file| file.facts().has(fact))
    }
}
