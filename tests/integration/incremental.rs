//! Incremental builds: dependants, orphan cleanup and single-generation deletion.

use crate::integration::test_utils::{changing, date, orchestrator, subtype_of};
use modelgen::context::{ContextSettings, GenerationContext};
use modelgen::diagnostics::DiagnosticCode;
use modelgen::emit::{FsEmitter, WriteResult};
use modelgen::orchestrator::{BuildKind, BuildRequest, BuildState, Orchestrator};
use modelgen::source::{AttributeDef, InMemoryModelStore, ModelStore, SourceObject, TypeProperties};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use walkdir::WalkDir;

fn files(root: &Path) -> BTreeSet<PathBuf> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path().strip_prefix(root).unwrap().to_path_buf())
        .collect()
}

fn product(rate: bool) -> TypeProperties {
    let mut attributes = vec![AttributeDef::new("name", "String")];
    if rate {
        attributes.push(changing("rate", "Decimal"));
    }
    TypeProperties {
        attributes,
        ..TypeProperties::default()
    }
}

#[test]
fn test_orphan_cleanup_without_prefix_false_positives() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("generated");
    let store = Arc::new(InMemoryModelStore::new());
    let contract = store
        .insert_with_generations(
            SourceObject::product_type("motor.Contract", product(true)),
            &[date(2024, 1, 1), date(2025, 1, 1)],
        )
        .unwrap();
    store
        .insert_with_generations(
            SourceObject::product_type("motor.ContractItem", product(true)),
            &[date(2024, 1, 1)],
        )
        .unwrap();
    let orchestrator = Orchestrator::with_standard_builders(
        store.clone(),
        Arc::new(FsEmitter::new(&output).unwrap()),
        GenerationContext::with_builtin_datatypes(ContextSettings::new("motor")),
    );
    orchestrator
        .run_build(&BuildRequest::new(), BuildKind::Full)
        .unwrap();
    // hand-written file next to the generated ones
    std::fs::write(output.join("motor/internal/ContractGen_notes.java"), "// notes").unwrap();
    let before = files(&output);

    // only the owner's tombstone: the number of generations is not known any more
    let tombstone = store.remove(&contract.id()).unwrap();
    for generation in contract.generation_ids() {
        store.remove(generation);
    }
    let report = orchestrator
        .run_build(&BuildRequest::new().with_deleted([tombstone]), BuildKind::Incremental)
        .unwrap();
    assert_eq!(report.state, BuildState::Done);

    let expected: BTreeSet<PathBuf> = [
        "motor/IContract.java",
        "motor/IContractGen.java",
        "motor/internal/Contract.java",
        "motor/internal/ContractGen_20240101.java",
        "motor/internal/ContractGen_20250101.java",
    ]
    .iter()
    .map(PathBuf::from)
    .collect();
    let deleted: BTreeSet<PathBuf> = report.deleted.iter().cloned().collect();
    assert_eq!(deleted, expected);

    let after = files(&output);
    let removed: BTreeSet<PathBuf> = before.difference(&after).cloned().collect();
    assert_eq!(removed, expected);
    assert!(after.contains(Path::new("motor/internal/ContractItem.java")));
    assert!(after.contains(Path::new("motor/internal/ContractItemGen_20240101.java")));
    assert!(after.contains(Path::new("motor/internal/ContractGen_notes.java")));

    let toc = std::fs::read_to_string(output.join("modelgen-toc.xml")).unwrap();
    assert!(!toc.contains("model=\"motor.Contract\""));
    assert!(toc.contains("model=\"motor.ContractItem\""));
}

#[test]
fn test_deleting_owner_keeps_type_named_like_its_generations() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("generated");
    let store = Arc::new(InMemoryModelStore::new());
    let contract = store
        .insert_with_generations(
            SourceObject::product_type("motor.Contract", product(true)),
            &[date(2024, 1, 1)],
        )
        .unwrap();
    // policy type whose implementation is `ContractGen`, the stem of Contract's generations
    store
        .insert(SourceObject::policy_type("motor.ContractGen", TypeProperties::default()))
        .unwrap();
    let orchestrator = Orchestrator::with_standard_builders(
        store.clone(),
        Arc::new(FsEmitter::new(&output).unwrap()),
        GenerationContext::with_builtin_datatypes(ContextSettings::new("motor")),
    );

    let report = orchestrator
        .run_build(&BuildRequest::new(), BuildKind::Full)
        .unwrap();
    assert!(output.join("motor/internal/ContractGen.java").exists());
    assert!(output.join("motor/internal/ContractGen_20240101.java").exists());

    // Contract's generation interface and ContractGen's interface share a path
    let collisions: Vec<_> = report
        .diagnostics_with(DiagnosticCode::ArtifactCollision)
        .collect();
    assert_eq!(collisions.len(), 1);
    assert_eq!(collisions[0].object_name, "motor.ContractGen");
    assert_eq!(collisions[0].subject.as_deref(), Some("motor/IContractGen.java"));
    assert!(report.is_failed());
    let interface = report.artifact("motor/IContractGen.java").unwrap();
    assert_eq!(interface.source.as_deref(), Some("motor.Contract"));
    assert_eq!(
        report
            .artifacts
            .iter()
            .filter(|a| a.path == Path::new("motor/IContractGen.java"))
            .count(),
        1
    );

    let tombstone = store.remove(&contract.id()).unwrap();
    for generation in contract.generation_ids() {
        store.remove(generation);
    }
    let report = orchestrator
        .run_build(&BuildRequest::new().with_deleted([tombstone]), BuildKind::Incremental)
        .unwrap();
    assert_eq!(report.state, BuildState::Done);

    let deleted: BTreeSet<PathBuf> = report.deleted.iter().cloned().collect();
    assert!(deleted.contains(Path::new("motor/internal/Contract.java")));
    assert!(deleted.contains(Path::new("motor/internal/ContractGen_20240101.java")));
    assert!(!deleted.contains(Path::new("motor/internal/ContractGen.java")));
    assert!(output.join("motor/internal/ContractGen.java").exists());
}

#[test]
fn test_incremental_builds_dependants_only() {
    let store = Arc::new(InMemoryModelStore::new());
    store
        .insert(SourceObject::policy_type("motor.Contract", TypeProperties::default()))
        .unwrap();
    store
        .insert(SourceObject::policy_type("motor.PremiumContract", subtype_of("motor.Contract")))
        .unwrap();
    store
        .insert(SourceObject::policy_type("motor.Vehicle", TypeProperties::default()))
        .unwrap();
    let (emitter, orchestrator) = orchestrator(store.clone(), ContextSettings::new("motor"));
    orchestrator
        .run_build(&BuildRequest::new(), BuildKind::Full)
        .unwrap();

    let changed = store.upsert(SourceObject::policy_type(
        "motor.Contract",
        TypeProperties {
            attributes: vec![AttributeDef::new("premium", "Money")],
            ..TypeProperties::default()
        },
    ));
    let report = orchestrator
        .run_build(&BuildRequest::changed([changed.id()]), BuildKind::Incremental)
        .unwrap();

    assert_eq!(report.objects, 2);
    let sources: BTreeSet<&str> = report
        .artifacts
        .iter()
        .filter_map(|a| a.source.as_deref())
        .collect();
    assert_eq!(
        sources,
        ["motor.Contract", "motor.PremiumContract"].into_iter().collect()
    );
    assert_eq!(
        report.artifact("motor/internal/Contract.java").unwrap().result,
        WriteResult::Updated
    );
    assert!(emitter
        .content("motor/internal/Contract.java")
        .unwrap()
        .contains("getPremium()"));
}

#[test]
fn test_deleting_one_generation_keeps_the_others() {
    let store = Arc::new(InMemoryModelStore::new());
    let owner = store
        .insert_with_generations(
            SourceObject::product_type("motor.Product", product(true)),
            &[date(2024, 1, 1), date(2025, 1, 1)],
        )
        .unwrap();
    let (emitter, orchestrator) = orchestrator(store.clone(), ContextSettings::new("motor"));
    orchestrator
        .run_build(&BuildRequest::new(), BuildKind::Full)
        .unwrap();
    assert!(emitter.contains("motor/internal/ProductGen_20240101.java"));

    let generations = owner.generation_ids().to_vec();
    let tombstone = store.remove(&generations[0]).unwrap();
    assert_eq!(tombstone.qualified_name, "motor.Product@2024-01-01");
    let owner = store.upsert(owner.with_generations(vec![generations[1]]));

    let report = orchestrator
        .run_build(
            &BuildRequest::changed([owner.id()]).with_deleted([tombstone]),
            BuildKind::Incremental,
        )
        .unwrap();
    assert_eq!(report.state, BuildState::Done);
    assert_eq!(
        report.deleted,
        vec![PathBuf::from("motor/internal/ProductGen_20240101.java")]
    );
    assert!(!emitter.contains("motor/internal/ProductGen_20240101.java"));
    assert!(emitter.contains("motor/internal/ProductGen_20250101.java"));
    assert_eq!(
        report
            .artifact("motor/internal/ProductGen_20250101.java")
            .unwrap()
            .result,
        WriteResult::Unchanged
    );
    assert!(store.find("motor.Product@2024-01-01").unwrap().is_none());
}
