//! Builder dependencies: dependants always see their dependency's output, and
//! are skipped for an object their dependency failed on.

use modelgen::builder::{ArtefactBuilder, BuildScope, BuilderOutput, BuilderSet};
use modelgen::context::{AspectNames, ContextSettings, GenerationContext};
use modelgen::diagnostics::DiagnosticCode;
use modelgen::emit::{Artifact, ArtifactPrefix, MemoryEmitter};
use modelgen::error::BuildError;
use modelgen::orchestrator::{BuildKind, BuildRequest, BuildState, Orchestrator};
use modelgen::source::{DeletedObject, InMemoryModelStore, SourceKind, SourceObject, TypeProperties};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;

const BASE: &str = "base";
const DEPENDANT: &str = "dependant";

fn artifact(builder: &str, object: &SourceObject, suffix: &str) -> Artifact {
    Artifact {
        path: PathBuf::from(format!("{}{}.txt", object.name(), suffix)),
        content: object.qualified_name().to_string(),
        derived: true,
        builder: builder.to_string(),
        source: Some(object.id()),
    }
}

/// Publishes an output for every type except the ones named `Broken*`.
struct Base;

impl ArtefactBuilder for Base {
    fn id(&self) -> &'static str {
        BASE
    }

    fn accepts(&self, kind: SourceKind) -> bool {
        kind.is_type()
    }

    fn is_internal(&self) -> bool {
        true
    }

    fn build(&self, scope: &mut BuildScope<'_>, object: &Arc<SourceObject>) -> Result<Vec<Artifact>, BuildError> {
        if object.name().starts_with("Broken") {
            return Err(BuildError::execution(BASE, object.qualified_name(), "refused"));
        }
        let artifact = artifact(BASE, object, "");
        scope.outputs.publish(
            BASE,
            object.id(),
            BuilderOutput {
                names: AspectNames {
                    interface: object.qualified_name().to_string(),
                    implementation: object.qualified_name().to_string(),
                },
                paths: vec![artifact.path.clone()],
            },
        );
        Ok(vec![artifact])
    }

    fn delete(&self, _context: &GenerationContext, _object: &DeletedObject) -> Vec<ArtifactPrefix> {
        Vec::new()
    }
}

/// Records, per object, whether the base output was visible.
struct Dependant {
    seen: Arc<Mutex<Vec<(String, bool)>>>,
}

impl ArtefactBuilder for Dependant {
    fn id(&self) -> &'static str {
        DEPENDANT
    }

    fn accepts(&self, kind: SourceKind) -> bool {
        kind.is_type()
    }

    fn depends_on(&self) -> &[&'static str] {
        &[BASE]
    }

    fn is_internal(&self) -> bool {
        true
    }

    fn build(&self, scope: &mut BuildScope<'_>, object: &Arc<SourceObject>) -> Result<Vec<Artifact>, BuildError> {
        let visible = scope.outputs.get(BASE, &object.id()).is_some();
        self.seen
            .lock()
            .push((object.qualified_name().to_string(), visible));
        Ok(vec![artifact(DEPENDANT, object, "-dependant")])
    }

    fn delete(&self, _context: &GenerationContext, _object: &DeletedObject) -> Vec<ArtifactPrefix> {
        Vec::new()
    }
}

#[test]
fn test_dependant_never_observes_missing_output() {
    let store = Arc::new(InMemoryModelStore::new());
    for name in ["acme.Alpha", "acme.BrokenBeta", "acme.Gamma"] {
        store
            .insert(SourceObject::policy_type(name, TypeProperties::default()))
            .unwrap();
    }
    let seen = Arc::new(Mutex::new(Vec::new()));
    let builders: Vec<Box<dyn ArtefactBuilder>> =
        vec![Box::new(Base), Box::new(Dependant { seen: seen.clone() })];
    let builders = BuilderSet::new(builders).unwrap();
    let emitter = Arc::new(MemoryEmitter::new());
    let orchestrator = Orchestrator::new(
        store,
        emitter.clone(),
        GenerationContext::with_builtin_datatypes(ContextSettings::new("acme")),
        builders,
    );

    let report = orchestrator
        .run_build(&BuildRequest::new(), BuildKind::Full)
        .unwrap();

    // a failing object does not end the pass
    assert_eq!(report.state, BuildState::Done);
    assert!(report.is_failed());
    let failures: Vec<_> = report
        .diagnostics_with(DiagnosticCode::BuilderExecution)
        .collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].object_name, "acme.BrokenBeta");
    assert_eq!(failures[0].builder.as_deref(), Some(BASE));

    let seen = seen.lock().clone();
    assert_eq!(
        seen,
        vec![
            ("acme.Alpha".to_string(), true),
            ("acme.Gamma".to_string(), true),
        ]
    );
    assert!(emitter.contains("Gamma-dependant.txt"));
    assert!(!emitter.contains("BrokenBeta-dependant.txt"));
}

#[test]
fn test_dependency_declared_later_is_rejected() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let builders: Vec<Box<dyn ArtefactBuilder>> = vec![Box::new(Dependant { seen }), Box::new(Base)];
    assert!(matches!(
        BuilderSet::new(builders),
        Err(BuildError::OrchestratorProtocol(_))
    ));
}
