//! Clean and locate against a file-system output directory.

use crate::integration::test_utils::contract_store;
use modelgen::context::{ContextSettings, GenerationContext};
use modelgen::emit::FsEmitter;
use modelgen::error::ApiError;
use modelgen::orchestrator::{BuildKind, BuildRequest, BuildState, Orchestrator};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

fn setup(dir: &TempDir) -> Orchestrator {
    Orchestrator::with_standard_builders(
        contract_store(),
        Arc::new(FsEmitter::new(dir.path()).unwrap()),
        GenerationContext::with_builtin_datatypes(ContextSettings::new("motor")),
    )
}

#[test]
fn test_clean_removes_derived_artifacts_only() {
    let dir = TempDir::new().unwrap();
    let orchestrator = setup(&dir);
    let built = orchestrator
        .run_build(&BuildRequest::new(), BuildKind::Full)
        .unwrap();
    std::fs::write(dir.path().join("README.md"), "keep me").unwrap();
    std::fs::write(dir.path().join("motor/internal/Helper.java"), "class Helper {}").unwrap();

    let report = orchestrator.clean().unwrap();
    assert_eq!(report.state, BuildState::Done);
    assert!(report.kind.is_none());
    assert_eq!(report.deleted.len(), built.artifacts.len());
    assert!(orchestrator.cache().is_empty());

    for record in &built.artifacts {
        assert!(!dir.path().join(&record.path).exists(), "{:?}", record.path);
    }
    assert!(dir.path().join("README.md").exists());
    assert!(dir.path().join("motor/internal/Helper.java").exists());

    // nothing left to remove
    assert!(orchestrator.clean().unwrap().deleted.is_empty());
}

#[test]
fn test_locate_types_and_generations() {
    let dir = TempDir::new().unwrap();
    let orchestrator = setup(&dir);

    assert_eq!(
        orchestrator.locate("motor.Contract").unwrap(),
        vec![
            PathBuf::from("motor/IContract.java"),
            PathBuf::from("motor/IContractGen.java"),
            PathBuf::from("motor/internal/Contract.java"),
            PathBuf::from("motor/internal/ContractGen_20240101.java"),
        ]
    );
    assert_eq!(
        orchestrator.locate("motor.Contract@2024-01-01").unwrap(),
        vec![PathBuf::from("motor/internal/ContractGen_20240101.java")]
    );
    assert!(matches!(
        orchestrator.locate("motor.Nothing"),
        Err(ApiError::UnknownObject(name)) if name == "motor.Nothing"
    ));
    // locating writes nothing
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}
