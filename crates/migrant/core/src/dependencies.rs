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

//! Dependency resolution between inspectors.
//!
//! Builds a directed graph over registered inspectors from `need` edges and
//! `produces -> requires` edges, rejects dangling requirements and cycles, and
//! derives a deterministic execution order.

use crate::contract::{InspectorContract, InspectorId};
use crate::error::ConfigError;
use crate::facts::{FactName, FactRegistry};
use petgraph::Direction;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

/// Why one inspector must run before another
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyType {
    /// Declared in the dependent's `need` set
    Need,

    /// The dependency produces a fact the dependent requires
    Fact(FactName),
}

/// Graph structure modeling inspector dependencies with topological sorting
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// The underlying directed graph; edges point from dependency to dependent
    graph: DiGraph<InspectorId, DependencyType>,

    /// Mapping from inspector IDs to node indices
    node_indices: HashMap<InspectorId, NodeIndex>,
}

impl DependencyGraph {
    /// Initializes an empty dependency graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the graph for a set of contracts, in registration order.
    ///
    /// # Errors
    /// - `DuplicateInspector` when two contracts share an id
    /// - `UnknownInspector` when a `need` names an unregistered inspector
    /// - `DanglingRequirement` when a required fact has no producer
    pub fn from_contracts<'a>(contracts: impl IntoIterator<Item = &'a InspectorContract>, registry: &FactRegistry) -> Result<Self, ConfigError> {
        let contracts: Vec<&InspectorContract> = contracts.into_iter().collect();
        let mut graph = Self::new();

        for contract in &contracts {
            if graph.node_indices.contains_key(&contract.id) {
                return Err(ConfigError::DuplicateInspector(contract.id.clone()));
            }
            graph.add_inspector(&contract.id);
        }

        for contract in &contracts {
            for needed in &contract.need {
                if !graph.node_indices.contains_key(needed) {
                    return Err(ConfigError::UnknownInspector {
                        inspector: contract.id.clone(),
                        needed: needed.clone(),
                    });
                }
                graph.add_dependency(&contract.id, needed, DependencyType::Need);
            }

            for fact in &contract.requires {
                let producers: Vec<InspectorId> = registry.producers_of(fact.as_str()).cloned().collect();
                if producers.is_empty() {
                    return Err(ConfigError::DanglingRequirement {
                        inspector: contract.id.clone(),
                        fact: fact.clone(),
                    });
                }
                for producer in &producers {
                    graph.add_dependency(&contract.id, producer, DependencyType::Fact(fact.clone()));
                }
            }
        }

        Ok(graph)
    }

    /// Adds an inspector to the graph if not present
    ///
    /// # Returns
    /// NodeIndex for the added/existing inspector
    pub fn add_inspector(&mut self, id: &InspectorId) -> NodeIndex {
        if let Some(&node_index) = self.node_indices.get(id) {
            return node_index;
        }

        let node_index = self.graph.add_node(id.clone());
        self.node_indices.insert(id.clone(), node_index);
        node_index
    }

    /// Establishes that `dependent` runs after `dependency`. Repeated edges are ignored.
    pub fn add_dependency(&mut self, dependent: &InspectorId, dependency: &InspectorId, dependency_type: DependencyType) {
        let dependent_index = self.add_inspector(dependent);
        let dependency_index = self.add_inspector(dependency);

        if self.graph.find_edge(dependency_index, dependent_index).is_none() {
            self.graph.add_edge(dependency_index, dependent_index, dependency_type);
        }
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Generates the execution order with Kahn's algorithm.
    ///
    /// Independent inspectors run in insertion order, so the same registration
    /// set always yields the same order.
    ///
    /// # Returns
    /// - Ok(Vec<InspectorId>): Valid execution order
    /// - Err(ConfigError::CyclicDependency): naming every inspector on a cycle
    pub fn topological_sort(&self) -> Result<Vec<InspectorId>, ConfigError> {
        let mut in_degree: Vec<usize> = self
            .graph
            .node_indices()
            .map(|node| self.graph.neighbors_directed(node, Direction::Incoming).count())
            .collect();

        let mut ready: BinaryHeap<Reverse<usize>> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, degree)| **degree == 0)
            .map(|(index, _)| Reverse(index))
            .collect();

        let mut order = Vec::with_capacity(in_degree.len());
        while let Some(Reverse(index)) = ready.pop() {
            let node = NodeIndex::new(index);
            order.push(self.graph[node].clone());

            for dependent in self.graph.neighbors_directed(node, Direction::Outgoing) {
                in_degree[dependent.index()] -= 1;
                if in_degree[dependent.index()] == 0 {
                    ready.push(Reverse(dependent.index()));
                }
            }
        }

        if order.len() < self.graph.node_count() {
            return Err(ConfigError::CyclicDependency {
                members: self.cycle_members(),
            });
        }
        Ok(order)
    }

    /// Inspectors that sit on a cycle, in insertion order
    fn cycle_members(&self) -> Vec<InspectorId> {
        let mut members: Vec<NodeIndex> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|component| component.len() > 1 || self.graph.find_edge(component[0], component[0]).is_some())
            .flatten()
            .collect();
        members.sort();
        members.into_iter().map(|node| self.graph[node].clone()).collect()
    }

    /// Builds the execution plan: the order plus groups of mutually independent inspectors
    pub fn execution_plan(&self) -> Result<ExecutionPlan, ConfigError> {
        let order = self.topological_sort()?;

        let mut level_of: HashMap<&InspectorId, usize> = HashMap::new();
        let mut levels: Vec<Vec<InspectorId>> = Vec::new();
        for id in &order {
            let level = self
                .dependencies_of(id.as_str())
                .iter()
                .filter_map(|dependency| level_of.get(dependency))
                .map(|level| level + 1)
                .max()
                .unwrap_or(0);
            if levels.len() <= level {
                levels.resize_with(level + 1, Vec::new);
            }
            levels[level].push(id.clone());
            level_of.insert(id, level);
        }

        Ok(ExecutionPlan { order, levels })
    }

    /// Checks if an inspector has incoming dependencies
    pub fn has_dependencies(&self, id: &str) -> bool {
        self.node_indices
            .get(id)
            .is_some_and(|&node| self.graph.neighbors_directed(node, Direction::Incoming).next().is_some())
    }

    /// Inspectors that must run before `id`
    pub fn dependencies_of(&self, id: &str) -> Vec<InspectorId> {
        self.neighbors(id, Direction::Incoming)
    }

    /// Inspectors that run after `id` because of it
    pub fn dependents_of(&self, id: &str) -> Vec<InspectorId> {
        self.neighbors(id, Direction::Outgoing)
    }

    /// Why `dependent` runs after `dependency`, if it does directly
    pub fn dependency_type(&self, dependent: &str, dependency: &str) -> Option<&DependencyType> {
        let dependent = *self.node_indices.get(dependent)?;
        let dependency = *self.node_indices.get(dependency)?;
        self.graph.find_edge(dependency, dependent).map(|edge| &self.graph[edge])
    }

    fn neighbors(&self, id: &str, direction: Direction) -> Vec<InspectorId> {
        let Some(&node) = self.node_indices.get(id) else {
            return Vec::new();
        };
        let mut neighbors: Vec<NodeIndex> = self.graph.neighbors_directed(node, direction).collect();
        neighbors.sort();
        neighbors.into_iter().map(|node| self.graph[node].clone()).collect()
    }
}

/// Ordered execution plan with groups of independent inspectors
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionPlan {
    /// Inspector ids in execution order
    order: Vec<InspectorId>,

    /// Level `n` only depends on levels `< n`
    levels: Vec<Vec<InspectorId>>,
}

impl ExecutionPlan {
    pub fn order(&self) -> &[InspectorId] {
        &self.order
    }

    pub fn levels(&self) -> &[Vec<InspectorId>] {
        &self.levels
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Check if a given inspector is in this plan
    pub fn contains(&self, id: &str) -> bool {
        self.order.iter().any(|entry| entry.as_str() == id)
    }

    /// Get the position of an inspector in the execution order
    pub fn position_of(&self, id: &str) -> Option<usize> {
        self.order.iter().position(|entry| entry.as_str() == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::EntityKind;

    fn contract(id: &str) -> crate::contract::ContractBuilder {
        InspectorContract::builder(id, EntityKind::File)
    }

    fn build(contracts: &[InspectorContract]) -> Result<DependencyGraph, ConfigError> {
        let mut registry = FactRegistry::new();
        for contract in contracts {
            registry.register(contract)?;
        }
        DependencyGraph::from_contracts(contracts, &registry)
    }

    #[test]
    fn test_requires_orders_after_producer() {
        let contracts = vec![
            contract("q").requires("x").produces("y").build(),
            contract("p").produces("x").build(),
        ];
        let graph = build(&contracts).unwrap();
        let order = graph.topological_sort().unwrap();

        assert_eq!(order, vec![InspectorId::from("p"), InspectorId::from("q")]);
        assert_eq!(graph.dependency_type("q", "p"), Some(&DependencyType::Fact("x".into())));
        assert!(graph.has_dependencies("q"));
        assert!(!graph.has_dependencies("p"));
    }

    #[test]
    fn test_need_orders_after_needed() {
        let contracts = vec![contract("b").needs("a").build(), contract("a").build()];
        let order = build(&contracts).unwrap().topological_sort().unwrap();
        assert_eq!(order, vec![InspectorId::from("a"), InspectorId::from("b")]);
    }

    #[test]
    fn test_ties_follow_registration_order() {
        let contracts = vec![contract("c").build(), contract("a").build(), contract("b").build()];
        for _ in 0..5 {
            let order = build(&contracts).unwrap().topological_sort().unwrap();
            assert_eq!(order, vec![InspectorId::from("c"), InspectorId::from("a"), InspectorId::from("b")]);
        }
    }

    #[test]
    fn test_cycle_names_members_only() {
        let contracts = vec![
            contract("a").needs("b").build(),
            contract("b").needs("a").build(),
            contract("c").needs("a").build(),
            contract("d").build(),
        ];
        let err = build(&contracts).unwrap().topological_sort().unwrap_err();
        assert_eq!(
            err,
            ConfigError::CyclicDependency {
                members: vec!["a".into(), "b".into()],
            }
        );
    }

    #[test]
    fn test_cycle_through_facts() {
        let contracts = vec![
            contract("a").requires("y").produces("x").build(),
            contract("b").requires("x").produces("y").build(),
        ];
        assert!(matches!(
            build(&contracts).unwrap().topological_sort(),
            Err(ConfigError::CyclicDependency { .. })
        ));
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let needs_itself = vec![contract("a").needs("a").build()];
        assert_eq!(
            build(&needs_itself).unwrap().topological_sort(),
            Err(ConfigError::CyclicDependency { members: vec!["a".into()] })
        );

        let requires_own_fact = vec![contract("a").requires("x").produces("x").build()];
        assert!(build(&requires_own_fact).unwrap().topological_sort().is_err());
    }

    #[test]
    fn test_dangling_requirement() {
        let contracts = vec![contract("a").requires("ghost").build()];
        assert_eq!(
            build(&contracts).unwrap_err(),
            ConfigError::DanglingRequirement {
                inspector: "a".into(),
                fact: "ghost".into(),
            }
        );
    }

    #[test]
    fn test_unknown_need() {
        let contracts = vec![contract("a").needs("ghost").build()];
        assert!(matches!(build(&contracts), Err(ConfigError::UnknownInspector { .. })));
    }

    #[test]
    fn test_shared_fact_depends_on_every_producer() {
        let contracts = vec![
            contract("p1").shares("m").build(),
            contract("p2").shares("m").build(),
            contract("q").requires("m").build(),
        ];
        let graph = build(&contracts).unwrap();
        assert_eq!(graph.dependencies_of("q"), vec![InspectorId::from("p1"), InspectorId::from("p2")]);
        assert_eq!(graph.dependents_of("p1"), vec![InspectorId::from("q")]);
    }

    #[test]
    fn test_execution_plan_levels() {
        let contracts = vec![
            contract("s1").produces("a").build(),
            contract("s2").requires("a").produces("b").build(),
            contract("s3").requires("a").produces("c").build(),
            contract("s4").requires("b").requires("c").build(),
        ];
        let plan = build(&contracts).unwrap().execution_plan().unwrap();

        assert_eq!(plan.len(), 4);
        assert_eq!(plan.levels().len(), 3);
        assert_eq!(plan.levels()[0], vec![InspectorId::from("s1")]);
        assert_eq!(plan.levels()[1], vec![InspectorId::from("s2"), InspectorId::from("s3")]);
        assert_eq!(plan.levels()[2], vec![InspectorId::from("s4")]);
        assert!(plan.contains("s3"));
        assert_eq!(plan.position_of("s4"), Some(3));
    }
}
