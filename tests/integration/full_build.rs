//! Full builds: the Contract / PremiumContract scenario, idempotence,
//! aspect degradation and datatype fallback.

use crate::integration::test_utils::{contract_store, date, orchestrator};
use modelgen::builder::{GENERATION, PUBLISHED_INTERFACE, TYPE_IMPLEMENTATION};
use modelgen::context::ContextSettings;
use modelgen::diagnostics::DiagnosticCode;
use modelgen::emit::{FsEmitter, WriteResult};
use modelgen::node::{default_kind, Aspect, NodeKind};
use modelgen::orchestrator::{BuildKind, BuildRequest, BuildState, Orchestrator};
use modelgen::source::{AttributeDef, InMemoryModelStore, KindFilter, ModelStore, SourceObject, TypeProperties};
use modelgen::GenerationContext;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

#[test]
fn test_contract_scenario() {
    let store = contract_store();
    let (emitter, orchestrator) = orchestrator(
        store.clone(),
        ContextSettings::new("motor").with_published_interfaces(false),
    );

    let report = orchestrator
        .run_build(&BuildRequest::new(), BuildKind::Full)
        .unwrap();
    assert_eq!(report.state, BuildState::Done);
    assert!(!report.is_failed());

    let of_builder = |builder: &str| -> Vec<PathBuf> {
        report
            .artifacts
            .iter()
            .filter(|a| a.builder == builder)
            .map(|a| a.path.clone())
            .collect()
    };
    assert_eq!(
        of_builder(TYPE_IMPLEMENTATION),
        vec![PathBuf::from("motor/Contract.java"), PathBuf::from("motor/PremiumContract.java")]
    );
    assert_eq!(
        of_builder(GENERATION),
        vec![
            PathBuf::from("motor/ContractGen_20240101.java"),
            PathBuf::from("motor/PremiumContractGen_20240101.java"),
        ]
    );
    assert!(of_builder(PUBLISHED_INTERFACE).is_empty());
    let premium = emitter.content("motor/PremiumContract.java").unwrap();
    assert!(premium.contains("public class PremiumContract extends Contract"));

    // the parent comes out of the same cache, without a second construction
    let cache = orchestrator.cache();
    let context = orchestrator.context();
    let constructed = cache.constructions();
    let premium = store.find("motor.PremiumContract").unwrap().unwrap();
    let contract = store.find("motor.Contract").unwrap().unwrap();
    let premium_node = cache
        .get_or_create(&premium, NodeKind::GenerationalType, &context)
        .unwrap();
    let parent = premium_node.parent_node(cache).unwrap().unwrap();
    let contract_node = cache
        .get_or_create(&contract, NodeKind::GenerationalType, &context)
        .unwrap();
    assert!(Arc::ptr_eq(&parent, &contract_node));
    assert_eq!(cache.constructions(), constructed);
}

#[test]
fn test_rebuild_reports_unchanged() {
    let dir = TempDir::new().unwrap();
    let store = contract_store();
    let emitter = Arc::new(FsEmitter::new(dir.path().join("generated")).unwrap());
    let orchestrator = Orchestrator::with_standard_builders(
        store,
        emitter,
        GenerationContext::with_builtin_datatypes(ContextSettings::new("motor")),
    );

    let first = orchestrator
        .run_build(&BuildRequest::new(), BuildKind::Full)
        .unwrap();
    assert!(!first.artifacts.is_empty());
    assert_eq!(first.count(WriteResult::Created), first.artifacts.len());

    let second = orchestrator
        .run_build(&BuildRequest::new(), BuildKind::Full)
        .unwrap();
    assert_eq!(second.artifacts.len(), first.artifacts.len());
    for record in &first.artifacts {
        let again = second.artifact(&record.path).unwrap();
        assert_eq!(again.result, WriteResult::Unchanged, "{:?}", record.path);
    }
    assert_eq!(second.written().count(), 0);
}

#[test]
fn test_aspect_degradation() {
    let store = contract_store();
    store
        .insert(SourceObject::policy_type("motor.Vehicle", TypeProperties::default()))
        .unwrap();
    let types = store.list(&KindFilter::only(&[
        modelgen::source::SourceKind::PolicyType,
        modelgen::source::SourceKind::ProductType,
    ]))
    .unwrap();

    let single = GenerationContext::with_builtin_datatypes(
        ContextSettings::new("motor").with_published_interfaces(false),
    );
    let split = GenerationContext::with_builtin_datatypes(ContextSettings::new("motor"));
    let cache = modelgen::ModelCache::new(store.clone());

    for object in &types {
        let node = cache
            .get_or_create(object, default_kind(object.kind()), &single)
            .unwrap();
        assert_eq!(
            node.qualified_name(Aspect::Interface),
            node.qualified_name(Aspect::Implementation)
        );
        for generation in node.generation_nodes(&cache).unwrap() {
            assert_eq!(
                generation.qualified_name(Aspect::Interface),
                generation.qualified_name(Aspect::Implementation)
            );
        }

        let node = cache
            .get_or_create(object, default_kind(object.kind()), &split)
            .unwrap();
        let simple = object.name();
        assert_eq!(
            node.qualified_name(Aspect::Interface),
            format!("motor.I{}", simple)
        );
        assert_eq!(
            node.qualified_name(Aspect::Implementation),
            format!("motor.internal.{}", simple)
        );
    }
}

#[test]
fn test_unresolved_datatype_reported_once() {
    let store = Arc::new(InMemoryModelStore::new());
    let props = TypeProperties {
        attributes: vec![
            AttributeDef::new("riskClass", "RiskClass"),
            AttributeDef::new("premium", "Ratio"),
            AttributeDef::new("name", "String"),
        ],
        ..TypeProperties::default()
    };
    store
        .insert_with_generations(
            SourceObject::product_type("motor.Tariff", props),
            &[date(2024, 1, 1), date(2025, 1, 1)],
        )
        .unwrap();
    let (emitter, orchestrator) = orchestrator(store, ContextSettings::new("motor"));

    let report = orchestrator
        .run_build(&BuildRequest::new(), BuildKind::Full)
        .unwrap();
    assert_eq!(report.state, BuildState::Done);
    assert!(!report.is_failed());
    let unresolved: Vec<_> = report
        .diagnostics_with(DiagnosticCode::UnresolvedDatatype)
        .collect();
    assert_eq!(unresolved.len(), 2);
    assert!(unresolved.iter().all(|d| d.object_name == "motor.Tariff"));

    let implementation = emitter.content("motor/internal/Tariff.java").unwrap();
    assert!(implementation.contains("private Object riskClass"));

    let again = orchestrator
        .run_build(&BuildRequest::new(), BuildKind::Full)
        .unwrap();
    assert_eq!(again.diagnostics_with(DiagnosticCode::UnresolvedDatatype).count(), 2);
}
