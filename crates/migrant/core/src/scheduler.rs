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

//! Scheduler and executor
//!
//! Runs inspectors stage by stage in dependency order. Within a stage every
//! eligible entity is analyzed in parallel on the engine's worker pool; the
//! next stage starts only after the current one has finished and committed.

use crate::config::EngineConfig;
use crate::contract::{EntityKind, InspectorContract, RequirementScope};
use crate::decorator::{Decorator, StagedWrites};
use crate::dependencies::{DependencyGraph, ExecutionPlan};
use crate::error::ConfigError;
use crate::facts::FactRegistry;
use crate::graph::{GraphEntity, KnowledgeGraph};
use crate::inspector::Inspector;
use crate::report::{EntityRef, Outcome, RunRecord, RunReport, Skip};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, info, info_span, warn};

/// Shared, read-only state handed to each stage
struct StageContext<'a> {
    graph: &'a KnowledgeGraph,
    registry: &'a FactRegistry,
    pool: &'a ThreadPool,
}

/// Type-erased inspector pass
trait Stage: Send + Sync {
    fn contract(&self) -> &InspectorContract;
    fn target_kind(&self) -> EntityKind;
    fn run(&self, ctx: &StageContext<'_>) -> Vec<RunRecord>;
}

struct InspectorStage<I>(I);

impl<I: Inspector> InspectorStage<I> {
    /// Evaluates one entity; returns the outcome and, when applied, the writes to commit
    fn evaluate(&self, entity: &Arc<I::Target>, ctx: &StageContext<'_>) -> (Outcome, Option<StagedWrites>) {
        let inspector = &self.0;
        let contract = inspector.contract();

        match panic::catch_unwind(AssertUnwindSafe(|| inspector.supports(entity))) {
            Ok(true) => {}
            Ok(false) => return (Outcome::NotApplicable(Skip::Unsupported), None),
            Err(payload) => return (Outcome::Failed(panic_reason(payload.as_ref())), None),
        }

        let missing = contract.requires.iter().find(|fact| {
            let fact = fact.as_str();
            let present = entity.facts().has(fact) || (contract.scope == RequirementScope::Linked && entity.linked_has(ctx.graph, fact));
            !present
        });
        if let Some(fact) = missing {
            return (Outcome::NotApplicable(Skip::MissingFact(fact.clone())), None);
        }

        let mut decorator = Decorator::new(contract, ctx.registry, ctx.graph, entity);
        match panic::catch_unwind(AssertUnwindSafe(|| inspector.analyze(entity, &mut decorator))) {
            Ok(result) => decorator.conclude(result),
            Err(payload) => (Outcome::Failed(panic_reason(payload.as_ref())), None),
        }
    }
}

impl<I: Inspector> Stage for InspectorStage<I> {
    fn contract(&self) -> &InspectorContract {
        self.0.contract()
    }

    fn target_kind(&self) -> EntityKind {
        <I::Target as GraphEntity>::KIND
    }

    fn run(&self, ctx: &StageContext<'_>) -> Vec<RunRecord> {
        let id = &self.0.contract().id;
        let entities = <I::Target as GraphEntity>::collect(ctx.graph);

        let evaluated: Vec<_> = ctx.pool.install(|| {
            entities
                .into_par_iter()
                .map(|entity| {
                    let (outcome, staged) = self.evaluate(&entity, ctx);
                    (entity, outcome, staged)
                })
                .collect()
        });

        // Commit only once every entity of the stage has been evaluated
        evaluated
            .into_iter()
            .map(|(entity, outcome, staged)| {
                let outcome = match staged {
                    Some(staged) => match staged.commit(ctx.graph, entity.facts()) {
                        Ok(()) => outcome,
                        Err(err) => Outcome::Failed(err.to_string()),
                    },
                    None => outcome,
                };
                let record = RunRecord {
                    inspector: id.clone(),
                    entity: EntityRef::of(entity.as_ref()),
                    outcome,
                };
                match &record.outcome {
                    Outcome::Failed(reason) => warn!(inspector = %id, entity = %record.entity, %reason, "inspector failed"),
                    outcome => debug!(inspector = %id, entity = %record.entity, %outcome, "inspector finished"),
                }
                record
            })
            .collect()
    }
}

fn panic_reason(payload: &(dyn Any + Send)) -> String {
    let message = payload
        .downcast_ref::<&str>()
        .map(|message| message.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string());
    format!("inspector panicked: {message}")
}

/// Collects inspectors and configuration before validation
pub struct EngineBuilder {
    config: EngineConfig,
    stages: Vec<Box<dyn Stage>>,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            stages: Vec::new(),
        }
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Registers an inspector; registration order breaks ties between independent inspectors
    pub fn register<I: Inspector + 'static>(mut self, inspector: I) -> Self {
        self.stages.push(Box::new(InspectorStage(inspector)));
        self
    }

    /// Validates every contract, builds the execution plan and starts the worker pool.
    ///
    /// # Errors
    /// Any [`ConfigError`]; no entity is touched when this fails.
    pub fn build(self) -> Result<AnalysisEngine, ConfigError> {
        let mut registry = FactRegistry::new();
        for stage in &self.stages {
            let contract = stage.contract();
            contract.validate()?;
            if contract.target != stage.target_kind() {
                return Err(ConfigError::InvalidContract {
                    inspector: contract.id.clone(),
                    reason: format!("contract targets {} entities but the inspector analyzes {}", contract.target, stage.target_kind()),
                });
            }
            registry.register(contract)?;
        }

        let dependencies = DependencyGraph::from_contracts(self.stages.iter().map(|stage| stage.contract()), &registry)?;
        let plan = dependencies.execution_plan()?;
        registry.freeze();

        let mut pending: Vec<Option<Box<dyn Stage>>> = self.stages.into_iter().map(Some).collect();
        let mut stages = Vec::with_capacity(pending.len());
        for id in plan.order() {
            if let Some(stage) = pending.iter_mut().find(|slot| slot.as_ref().is_some_and(|stage| &stage.contract().id == id)).and_then(Option::take) {
                stages.push(stage);
            }
        }

        let prefix = self.config.thread_name_prefix.clone();
        let pool = ThreadPoolBuilder::new()
            .num_threads(self.config.worker_threads.unwrap_or(0))
            .thread_name(move |index| format!("{prefix}-{index}"))
            .build()
            .map_err(|err| ConfigError::WorkerPool(err.to_string()))?;

        info!(inspectors = stages.len(), levels = plan.levels().len(), workers = pool.current_num_threads(), "analysis engine ready");

        Ok(AnalysisEngine {
            stages,
            plan,
            dependencies,
            registry,
            config: self.config,
            pool,
        })
    }
}

/// Validated set of inspectors ready to run against a knowledge graph
pub struct AnalysisEngine {
    stages: Vec<Box<dyn Stage>>,
    plan: ExecutionPlan,
    dependencies: DependencyGraph,
    registry: FactRegistry,
    config: EngineConfig,
    pool: ThreadPool,
}

impl AnalysisEngine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    pub fn plan(&self) -> &ExecutionPlan {
        &self.plan
    }

    pub fn dependencies(&self) -> &DependencyGraph {
        &self.dependencies
    }

    pub fn registry(&self) -> &FactRegistry {
        &self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Contracts in execution order
    pub fn contracts(&self) -> impl Iterator<Item = &InspectorContract> + '_ {
        self.stages.iter().map(|stage| stage.contract())
    }

    /// Runs one full pass. Always completes; per-entity failures are recorded in the report.
    pub fn run(&self, graph: &KnowledgeGraph) -> RunReport {
        if self.config.reset_before_run {
            graph.reset();
        }

        info!(files = graph.file_count(), classes = graph.class_count(), stages = self.stages.len(), "analysis run started");

        let ctx = StageContext {
            graph,
            registry: &self.registry,
            pool: &self.pool,
        };

        let mut report = RunReport::new();
        for (index, stage) in self.stages.iter().enumerate() {
            let id = &stage.contract().id;
            let _span = info_span!("stage", index, inspector = %id).entered();

            let records = stage.run(&ctx);
            let summary = report.push_stage(id.clone(), records);
            info!(
                target_kind = %stage.target_kind(),
                applied = summary.applied,
                not_applicable = summary.not_applicable,
                failed = summary.failed,
                "stage complete"
            );
        }

        let totals = report.totals();
        info!(applied = totals.applied, not_applicable = totals.not_applicable, failed = totals.failed, "analysis run finished");
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decorator::{NodeDecorator, ProjectFileDecorator};
    use crate::error::InspectorError;
    use crate::graph::{ClassEntity, FileEntity};

    struct Marker {
        contract: InspectorContract,
    }

    impl Inspector for Marker {
        type Target = FileEntity;

        fn contract(&self) -> &InspectorContract {
            &self.contract
        }

        fn analyze(&self, _entity: &FileEntity, decorator: &mut ProjectFileDecorator<'_>) -> Result<(), InspectorError> {
            for fact in self.contract.produces.iter().cloned() {
                decorator.set_tag(fact, true)?;
            }
            Ok(())
        }
    }

    struct ClassMarker {
        contract: InspectorContract,
    }

    impl Inspector for ClassMarker {
        type Target = ClassEntity;

        fn contract(&self) -> &InspectorContract {
            &self.contract
        }

        fn analyze(&self, _entity: &ClassEntity, _decorator: &mut NodeDecorator<'_>) -> Result<(), InspectorError> {
            Ok(())
        }
    }

    #[test]
    fn test_engine_orders_stages() {
        let engine = AnalysisEngine::builder()
            .register(Marker {
                contract: InspectorContract::builder("q", EntityKind::File).requires("x").produces("y").build(),
            })
            .register(Marker {
                contract: InspectorContract::builder("p", EntityKind::File).produces("x").build(),
            })
            .build()
            .unwrap();

        let ids: Vec<_> = engine.contracts().map(|contract| contract.id.as_str()).collect();
        assert_eq!(ids, vec!["p", "q"]);
        assert!(engine.registry().is_frozen());
    }

    #[test]
    fn test_target_kind_mismatch_rejected() {
        let result = AnalysisEngine::builder()
            .register(ClassMarker {
                contract: InspectorContract::builder("c", EntityKind::File).build(),
            })
            .build();
        assert!(matches!(result, Err(ConfigError::InvalidContract { .. })));
    }

    #[test]
    fn test_panic_reason_extraction() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_reason(payload.as_ref()), "inspector panicked: boom");

        let payload: Box<dyn Any + Send> = Box::new(String::from("bad descriptor"));
        assert_eq!(panic_reason(payload.as_ref()), "inspector panicked: bad descriptor");
    }

    #[test]
    fn test_empty_graph_runs_clean() {
        let engine = AnalysisEngine::builder()
            .register(Marker {
                contract: InspectorContract::builder("p", EntityKind::File).produces("x").build(),
            })
            .build()
            .unwrap();

        let report = engine.run(&KnowledgeGraph::new());
        assert!(report.records().is_empty());
        assert_eq!(report.stages().len(), 1);
        assert!(report.is_clean());
    }
}
