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

//! Migrant analysis core
//!
//! Dependency-ordered orchestration of inspectors over a shared knowledge
//! graph of project files and Java classes. Inspectors declare the facts they
//! require and produce; the engine validates those declarations, derives an
//! execution order and runs each inspector across all entities in parallel.

pub mod config;
pub mod contract;
pub mod corpus;
pub mod decorator;
pub mod dependencies;
pub mod error;
pub mod facts;
pub mod graph;
pub mod inspector;
pub mod report;
pub mod scheduler;

pub use config::{CorpusOptions, EngineConfig, SettingsError};
pub use contract::{ContractBuilder, EntityKind, InspectorContract, InspectorId, RequirementScope};
pub use corpus::{Corpus, CorpusError};
pub use decorator::{Decorator, NodeDecorator, ProjectFileDecorator};
pub use dependencies::{DependencyGraph, DependencyType, ExecutionPlan};
pub use error::{ConfigError, InspectorError};
pub use facts::{FactMap, FactName, FactRegistry, FactTable, TagValue, WritePolicy};
pub use graph::{ClassEntity, Edge, EdgeKey, EdgeType, FileEntity, FileKind, FileSource, GraphEntity, GraphSnapshot, KnowledgeGraph};
pub use inspector::Inspector;
pub use report::{EntityRef, Outcome, RunRecord, RunReport, Skip, StageSummary};
pub use scheduler::{AnalysisEngine, EngineBuilder};
