// Integration tests for dependency-ordered inspector execution
mod common;

use common::{class_rule, file_rule, init_tracing};
use migrant_core::{
    AnalysisEngine, ConfigError, EngineConfig, EntityKind, InspectorContract, InspectorError, KnowledgeGraph, Outcome, RequirementScope, Skip, TagValue,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn corpus(graph: &KnowledgeGraph, count: usize) {
    for index in 0..count {
        graph.add_virtual_file(&format!("src/com/acme/Type{index}.java"), &format!("package com.acme; class Type{index} {{}}"));
    }
}

#[test]
fn test_dependent_runs_after_producer_on_every_entity() {
    init_tracing();
    let graph = KnowledgeGraph::new();
    corpus(&graph, 64);

    let engine = AnalysisEngine::builder()
        .register(file_rule(InspectorContract::builder("q", EntityKind::File).requires("x").produces("y").build(), |_, decorator| {
            // every producer write must already be committed
            let complete = decorator.graph().files().iter().all(|file| file.facts().has("x"));
            decorator.set_tag("y", complete)
        }))
        .register(file_rule(InspectorContract::builder("p", EntityKind::File).produces("x").build(), |_, decorator| decorator.set_tag("x", true)))
        .build()
        .unwrap();

    let order: Vec<_> = engine.plan().order().iter().map(|id| id.as_str()).collect();
    assert_eq!(order, vec!["p", "q"]);

    let report = engine.run(&graph);
    assert!(report.is_clean());
    assert_eq!(report.stages()[0].applied, 64);
    assert_eq!(report.stages()[1].applied, 64);
    for file in graph.files() {
        assert_eq!(file.facts().tag("y"), Some(TagValue::Bool(true)));
    }
}

#[test]
fn test_missing_requirement_is_not_applicable() {
    init_tracing();
    let graph = KnowledgeGraph::new();
    graph.add_virtual_file("a/Marked.java", "class Marked {}");
    graph.add_virtual_file("a/Plain.java", "class Plain {}");

    let engine = AnalysisEngine::builder()
        .register(file_rule(InspectorContract::builder("p", EntityKind::File).produces("x").build(), |file, decorator| {
            if file.path().contains("Marked") {
                decorator.set_tag("x", true)?;
            }
            Ok(())
        }))
        .register(file_rule(InspectorContract::builder("q", EntityKind::File).requires("x").produces("y").build(), |_, decorator| decorator.set_tag("y", true)))
        .build()
        .unwrap();

    let report = engine.run(&graph);
    assert_eq!(report.outcome("q", EntityKind::File, "a/Marked.java"), Some(&Outcome::Applied));
    assert_eq!(report.outcome("q", EntityKind::File, "a/Plain.java"), Some(&Outcome::NotApplicable(Skip::MissingFact("x".into()))));
    assert!(!graph.file("a/Plain.java").unwrap().facts().has("y"));
}

#[test]
fn test_false_tag_does_not_satisfy_requirement() {
    init_tracing();
    let graph = KnowledgeGraph::new();
    graph.add_virtual_file("Only.java", "class Only {}");

    let engine = AnalysisEngine::builder()
        .register(file_rule(InspectorContract::builder("p", EntityKind::File).produces("x").build(), |_, decorator| decorator.set_tag("x", false)))
        .register(file_rule(InspectorContract::builder("q", EntityKind::File).requires("x").produces("y").build(), |_, decorator| decorator.set_tag("y", true)))
        .build()
        .unwrap();

    let report = engine.run(&graph);
    assert!(report.outcome("q", EntityKind::File, "Only.java").unwrap().is_not_applicable());
}

#[test]
fn test_failure_is_isolated_and_leaves_no_partial_writes() {
    init_tracing();
    let graph = KnowledgeGraph::new();
    corpus(&graph, 8);

    let engine = AnalysisEngine::builder()
        .register(file_rule(InspectorContract::builder("p", EntityKind::File).produces("x").produces("partial").build(), |file, decorator| {
            decorator.set_tag("partial", true)?;
            if file.path().ends_with("Type3.java") {
                return Err(InspectorError::failed("unreadable"));
            }
            decorator.set_tag("x", true)
        }))
        .register(file_rule(InspectorContract::builder("q", EntityKind::File).requires("x").produces("y").build(), |_, decorator| decorator.set_tag("y", true)))
        .build()
        .unwrap();

    let report = engine.run(&graph);
    let failed = "src/com/acme/Type3.java";
    assert!(report.outcome("p", EntityKind::File, failed).unwrap().is_failed());
    assert_eq!(report.failures().count(), 1);
    assert_eq!(report.stages()[0].applied, 7);

    let file = graph.file(failed).unwrap();
    assert!(!file.facts().has("partial"));
    assert!(report.outcome("q", EntityKind::File, failed).unwrap().is_not_applicable());
    assert_eq!(report.stages()[1].applied, 7);
}

#[test]
fn test_panic_is_recorded_as_failure() {
    init_tracing();
    let graph = KnowledgeGraph::new();
    graph.add_virtual_file("Boom.java", "class Boom {}");
    graph.add_virtual_file("Fine.java", "class Fine {}");

    let engine = AnalysisEngine::builder()
        .register(file_rule(InspectorContract::builder("p", EntityKind::File).produces("x").build(), |file, decorator| {
            if file.path() == "Boom.java" {
                panic!("malformed input");
            }
            decorator.set_tag("x", true)
        }))
        .build()
        .unwrap();

    let report = engine.run(&graph);
    match report.outcome("p", EntityKind::File, "Boom.java") {
        Some(Outcome::Failed(reason)) => assert!(reason.contains("malformed input")),
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(report.outcome("p", EntityKind::File, "Fine.java"), Some(&Outcome::Applied));
}

#[test]
fn test_undeclared_write_fails_even_when_swallowed() {
    init_tracing();
    let graph = KnowledgeGraph::new();
    graph.add_virtual_file("Sneaky.java", "class Sneaky {}");

    let engine = AnalysisEngine::builder()
        .register(file_rule(InspectorContract::builder("p", EntityKind::File).produces("x").build(), |_, decorator| {
            decorator.set_tag("x", true)?;
            let _ = decorator.set_tag("not.mine", true);
            Ok(())
        }))
        .build()
        .unwrap();

    let report = engine.run(&graph);
    assert!(report.outcome("p", EntityKind::File, "Sneaky.java").unwrap().is_failed());
    let file = graph.file("Sneaky.java").unwrap();
    assert!(!file.facts().has("x"));
    assert!(!file.facts().has("not.mine"));
}

#[test]
fn test_declined_pair_commits_nothing() {
    init_tracing();
    let graph = KnowledgeGraph::new();
    graph.add_virtual_file("Skip.java", "class Skip {}");

    let engine = AnalysisEngine::builder()
        .register(file_rule(InspectorContract::builder("p", EntityKind::File).produces("x").build(), |_, decorator| {
            decorator.set_tag("x", true)?;
            decorator.not_applicable();
            Ok(())
        }))
        .build()
        .unwrap();

    let report = engine.run(&graph);
    assert_eq!(report.outcome("p", EntityKind::File, "Skip.java"), Some(&Outcome::NotApplicable(Skip::Declined)));
    assert!(!graph.file("Skip.java").unwrap().facts().has("x"));
}

#[test]
fn test_shared_flag_is_or_merged() {
    init_tracing();
    let graph = KnowledgeGraph::new();
    graph.add_virtual_file("Legacy.java", "class Legacy {}");

    let engine = AnalysisEngine::builder()
        .register(file_rule(InspectorContract::builder("a", EntityKind::File).shares("migration.required").build(), |_, decorator| {
            decorator.set_tag("migration.required", true)
        }))
        .register(file_rule(InspectorContract::builder("b", EntityKind::File).shares("migration.required").build(), |_, decorator| {
            decorator.set_tag("migration.required", false)
        }))
        .build()
        .unwrap();

    let report = engine.run(&graph);
    assert!(report.is_clean());
    assert_eq!(graph.file("Legacy.java").unwrap().facts().tag("migration.required"), Some(TagValue::Bool(true)));
}

#[test]
fn test_need_orders_without_facts() {
    init_tracing();
    let graph = KnowledgeGraph::new();
    graph.add_virtual_file("One.java", "class One {}");
    let seen = Arc::new(AtomicUsize::new(0));

    let first = seen.clone();
    let second = seen.clone();
    let engine = AnalysisEngine::builder()
        .register(file_rule(InspectorContract::builder("late", EntityKind::File).needs("early").build(), move |_, _| {
            assert_eq!(second.load(Ordering::SeqCst), 1);
            Ok(())
        }))
        .register(file_rule(InspectorContract::builder("early", EntityKind::File).build(), move |_, _| {
            first.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }))
        .build()
        .unwrap();

    assert!(engine.run(&graph).is_clean());
}

#[test]
fn test_linked_scope_reads_file_facts_from_class() {
    init_tracing();
    let graph = KnowledgeGraph::new();
    graph.add_virtual_file("src/com/acme/Order.java", "package com.acme; class Order {}");

    let engine = AnalysisEngine::builder()
        .register(class_rule(
            InspectorContract::builder("classes", EntityKind::Class)
                .requires("java.source")
                .scope(RequirementScope::Linked)
                .produces("class.analyzed")
                .build(),
            |_, decorator| {
                let matched = decorator.source()?.is_some_and(|source| source.contains("class Order"));
                decorator.set_tag("class.analyzed", matched)
            },
        ))
        .register(file_rule(InspectorContract::builder("sources", EntityKind::File).produces("java.source").build(), |_, decorator| {
            decorator.set_tag("java.source", true)?;
            decorator.link_class("com.acme.Order")
        }))
        .build()
        .unwrap();

    let report = engine.run(&graph);
    assert!(report.is_clean());
    let class = graph.class("com.acme.Order").unwrap();
    assert_eq!(class.facts().tag("class.analyzed"), Some(TagValue::Bool(true)));
    assert_eq!(class.linked_files(), vec!["src/com/acme/Order.java".to_string()]);
}

#[test]
fn test_concurrent_links_create_one_class() {
    init_tracing();
    let graph = KnowledgeGraph::new();
    for index in 0..200 {
        graph.add_virtual_file(&format!("gen/Part{index}.java"), "class Shared {}");
    }

    let engine = AnalysisEngine::builder()
        .config(EngineConfig {
            worker_threads: Some(8),
            ..EngineConfig::default()
        })
        .register(file_rule(InspectorContract::builder("linker", EntityKind::File).build(), |_, decorator| decorator.link_class("com.acme.Shared")))
        .build()
        .unwrap();

    assert!(engine.run(&graph).is_clean());
    assert_eq!(graph.class_count(), 1);
    assert_eq!(graph.class("com.acme.Shared").unwrap().linked_files().len(), 200);
}

#[test]
fn test_edges_are_committed_with_properties() {
    init_tracing();
    let graph = KnowledgeGraph::new();
    graph.get_or_create_class_entity("com.acme.CartBean");

    let engine = AnalysisEngine::builder()
        .register(class_rule(InspectorContract::builder("edges", EntityKind::Class).produces("edge.kind").build(), |class, decorator| {
            if class.fqn() == "com.acme.CartBean" {
                decorator.set_edge_property("com.acme.CartHome", "home", "edge.kind", "ejb-home")?;
            }
            Ok(())
        }))
        .build()
        .unwrap();

    assert!(engine.run(&graph).is_clean());
    let edges = graph.edges_from("com.acme.CartBean");
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].target(), "com.acme.CartHome");
    assert!(graph.class("com.acme.CartHome").is_some());
    assert_eq!(edges[0].facts().property("edge.kind"), Some(serde_json::json!("ejb-home")));
}

#[test]
fn test_repeated_runs_are_idempotent() {
    init_tracing();
    let graph = KnowledgeGraph::new();
    corpus(&graph, 16);

    let engine = AnalysisEngine::builder()
        .register(file_rule(InspectorContract::builder("sources", EntityKind::File).produces("java.source").build(), |file, decorator| {
            decorator.set_tag("java.source", true)?;
            let name = file.file_name().trim_end_matches(".java").to_string();
            decorator.link_class(&format!("com.acme.{name}"))
        }))
        .register(class_rule(
            InspectorContract::builder("counter", EntityKind::Class)
                .requires("java.source")
                .scope(RequirementScope::Linked)
                .shares("migration.required")
                .build(),
            |_, decorator| decorator.set_tag("migration.required", true),
        ))
        .build()
        .unwrap();

    let first = engine.run(&graph);
    let before = graph.snapshot();
    let second = engine.run(&graph);

    assert_eq!(graph.snapshot(), before);
    assert_eq!(first, second);
    assert_eq!(graph.class_count(), 16);
}

#[test]
fn test_configuration_errors_reject_before_any_run() {
    init_tracing();
    let dangling = AnalysisEngine::builder()
        .register(file_rule(InspectorContract::builder("q", EntityKind::File).requires("x").build(), |_, _| Ok(())))
        .build();
    assert!(matches!(dangling, Err(ConfigError::DanglingRequirement { .. })));

    let cyclic = AnalysisEngine::builder()
        .register(file_rule(InspectorContract::builder("a", EntityKind::File).requires("y").produces("x").build(), |_, _| Ok(())))
        .register(file_rule(InspectorContract::builder("b", EntityKind::File).requires("x").produces("y").build(), |_, _| Ok(())))
        .build();
    match cyclic {
        Err(ConfigError::CyclicDependency { members }) => {
            let names: Vec<_> = members.iter().map(|id| id.as_str()).collect();
            assert_eq!(names, vec!["a", "b"]);
        }
        Err(other) => panic!("unexpected error {other}"),
        Ok(_) => panic!("cycle accepted"),
    }

    let duplicate = AnalysisEngine::builder()
        .register(file_rule(InspectorContract::builder("a", EntityKind::File).produces("x").build(), |_, _| Ok(())))
        .register(file_rule(InspectorContract::builder("b", EntityKind::File).produces("x").build(), |_, _| Ok(())))
        .build();
    assert!(matches!(duplicate, Err(ConfigError::DuplicateProducer { .. })));

    let self_need = AnalysisEngine::builder()
        .register(file_rule(InspectorContract::builder("a", EntityKind::File).needs("a").build(), |_, _| Ok(())))
        .build();
    assert!(matches!(self_need, Err(ConfigError::CyclicDependency { .. })));
}

#[test]
fn test_engine_without_reset_keeps_prior_facts() {
    init_tracing();
    let graph = KnowledgeGraph::new();
    graph.add_virtual_file("Keep.java", "class Keep {}");
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    let engine = AnalysisEngine::builder()
        .config(EngineConfig {
            reset_before_run: false,
            ..EngineConfig::default()
        })
        .register(file_rule(InspectorContract::builder("p", EntityKind::File).produces("x").build(), move |_, decorator| {
            let run = counter.fetch_add(1, Ordering::SeqCst) as i64;
            decorator.set_tag("x", run)
        }))
        .build()
        .unwrap();

    engine.run(&graph);
    engine.run(&graph);
    assert_eq!(graph.file("Keep.java").unwrap().facts().tag("x"), Some(TagValue::Int(1)));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}
