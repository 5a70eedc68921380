//! Builder Orchestrator
//!
//! Drives one build pass through its lifecycle:
//!
//! `NotStarted -> BeforeBuild -> Building -> AfterBuild -> Done`
//!
//! with `Failed` reachable from every non-terminal state. `before_build` runs
//! for every builder in declared order before any `build`, and `after_build`
//! for every builder in declared order after the last one. A builder failing
//! on one object is recorded as a diagnostic and the pass moves on to the next
//! object; the report is then marked failed.

use crate::builder::{ArtefactBuilder, BuildOutputs, BuildScope, BuilderSet};
use crate::cache::ModelCache;
use crate::context::GenerationContext;
use crate::diagnostics::{Diagnostic, DiagnosticCode, Diagnostics, Severity};
use crate::emit::{Artifact, SourceEmitter, WriteResult, GENERATION_SUFFIX_FORMAT};
use crate::error::{ApiError, BuildError, ModelError};
use crate::source::{DeletedObject, DependencyGraph, KindFilter, ModelStore, SourceObject};
use crate::types::StableId;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildKind {
    /// Every object in the store
    Full,
    /// Changed objects plus their transitive dependants
    Incremental,
}

impl fmt::Display for BuildKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildKind::Full => f.write_str("full"),
            BuildKind::Incremental => f.write_str("incremental"),
        }
    }
}

/// Objects to build and objects removed since the previous build
#[derive(Debug, Clone, Default)]
pub struct BuildRequest {
    pub changed: Vec<StableId>,
    pub deleted: Vec<DeletedObject>,
}

impl BuildRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn changed(ids: impl IntoIterator<Item = StableId>) -> Self {
        Self {
            changed: ids.into_iter().collect(),
            deleted: Vec::new(),
        }
    }

    pub fn with_deleted(mut self, deleted: impl IntoIterator<Item = DeletedObject>) -> Self {
        self.deleted.extend(deleted);
        self
    }
}

/// State of one build pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildState {
    NotStarted,
    BeforeBuild,
    Building,
    AfterBuild,
    Done,
    Failed,
}

impl BuildState {
    pub fn is_terminal(self) -> bool {
        matches!(self, BuildState::Done | BuildState::Failed)
    }

    pub fn allows(self, next: BuildState) -> bool {
        use BuildState::*;
        match (self, next) {
            (NotStarted, BeforeBuild)
            | (BeforeBuild, Building)
            | (Building, AfterBuild)
            | (AfterBuild, Done) => true,
            (current, Failed) => !current.is_terminal(),
            _ => false,
        }
    }

    /// Move to `next`.
    ///
    /// An illegal transition is a programming error: it panics in debug builds
    /// and is returned as `OrchestratorProtocol` otherwise.
    pub fn transition(self, next: BuildState) -> Result<BuildState, BuildError> {
        if self.allows(next) {
            return Ok(next);
        }
        let message = format!("illegal build state transition {:?} -> {:?}", self, next);
        if cfg!(debug_assertions) {
            panic!("{}", message);
        }
        Err(BuildError::OrchestratorProtocol(message))
    }
}

impl fmt::Display for BuildState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BuildState::NotStarted => "not started",
            BuildState::BeforeBuild => "before build",
            BuildState::Building => "building",
            BuildState::AfterBuild => "after build",
            BuildState::Done => "done",
            BuildState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Cooperative cancellation signal, checked between source objects.
///
/// Stays set until [`reset`](Self::reset); a cancelled orchestrator fails
/// every pass it starts.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// One emitted artifact and what the emitter did with it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactRecord {
    pub path: PathBuf,
    pub builder: String,
    /// Qualified name of the source object, if the artifact belongs to one
    pub source: Option<String>,
    pub derived: bool,
    /// Implementation-only artifact rather than part of the published surface
    pub internal: bool,
    pub result: WriteResult,
}

/// Result of a build pass or a clean
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    /// None for a clean
    pub kind: Option<BuildKind>,
    pub state: BuildState,
    pub objects: usize,
    pub artifacts: Vec<ArtifactRecord>,
    pub deleted: Vec<PathBuf>,
    pub diagnostics: Vec<Diagnostic>,
    pub duration_ms: u64,
}

impl BuildReport {
    /// Failed pass, or any error diagnostic.
    pub fn is_failed(&self) -> bool {
        self.state == BuildState::Failed
            || self.diagnostics.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn count(&self, result: WriteResult) -> usize {
        self.artifacts.iter().filter(|a| a.result == result).count()
    }

    /// Artifacts created or updated by the pass
    pub fn written(&self) -> impl Iterator<Item = &ArtifactRecord> {
        self.artifacts
            .iter()
            .filter(|a| a.result != WriteResult::Unchanged)
    }

    pub fn artifact(&self, path: impl AsRef<std::path::Path>) -> Option<&ArtifactRecord> {
        self.artifacts.iter().find(|a| a.path == path.as_ref())
    }

    pub fn diagnostics_with(&self, code: DiagnosticCode) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.code == code)
    }
}

/// Mutable bookkeeping of one pass
struct Pass {
    kind: Option<BuildKind>,
    state: BuildState,
    started: Instant,
    objects: usize,
    artifacts: Vec<ArtifactRecord>,
    /// Path -> description of the artifact that claimed it this pass
    emitted: HashMap<PathBuf, String>,
    deleted: Vec<PathBuf>,
    diagnostics: Diagnostics,
}

impl Pass {
    fn new(kind: Option<BuildKind>) -> Self {
        Self {
            kind,
            state: BuildState::NotStarted,
            started: Instant::now(),
            objects: 0,
            artifacts: Vec::new(),
            emitted: HashMap::new(),
            deleted: Vec::new(),
            diagnostics: Diagnostics::new(),
        }
    }

    fn advance(&mut self, next: BuildState) -> Result<(), BuildError> {
        self.state = self.state.transition(next)?;
        trace!(state = %self.state, "Build state changed");
        Ok(())
    }

    fn record_failure(&mut self, id: Option<StableId>, name: &str, builder: Option<&str>, err: &BuildError) {
        let code = match err {
            BuildError::Model(ModelError::Cyclic { .. }) => DiagnosticCode::CyclicModel,
            BuildError::Cancelled => DiagnosticCode::Cancelled,
            _ => DiagnosticCode::BuilderExecution,
        };
        warn!(object = %name, builder = builder.unwrap_or("-"), error = %err, "Build step failed");
        self.diagnostics
            .push(Diagnostic::error(code, id, name, builder, err.to_string()));
    }

    fn finish(self) -> BuildReport {
        let diagnostics = self.diagnostics.into_vec();
        for diagnostic in diagnostics.iter().filter(|d| d.severity != Severity::Error) {
            warn!(code = %diagnostic.code, object = %diagnostic.object_name, "{}", diagnostic.message);
        }
        BuildReport {
            kind: self.kind,
            state: self.state,
            objects: self.objects,
            artifacts: self.artifacts,
            deleted: self.deleted,
            diagnostics,
            duration_ms: self.started.elapsed().as_millis() as u64,
        }
    }
}

/// Owns the model cache and the builders for one project.
///
/// Passes are serialized: a second `run_build` waits for the running one.
pub struct Orchestrator {
    store: Arc<dyn ModelStore>,
    emitter: Arc<dyn SourceEmitter>,
    builders: BuilderSet,
    cache: ModelCache,
    context: RwLock<Arc<GenerationContext>>,
    cancellation: CancellationFlag,
    pass_lock: Mutex<()>,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn ModelStore>,
        emitter: Arc<dyn SourceEmitter>,
        context: Arc<GenerationContext>,
        builders: BuilderSet,
    ) -> Self {
        Self {
            cache: ModelCache::new(store.clone()),
            store,
            emitter,
            builders,
            context: RwLock::new(context),
            cancellation: CancellationFlag::new(),
            pass_lock: Mutex::new(()),
        }
    }

    /// Share a cancellation flag owned by the caller.
    pub fn with_cancellation(mut self, cancellation: CancellationFlag) -> Self {
        self.cancellation = cancellation;
        self
    }

    pub fn with_standard_builders(
        store: Arc<dyn ModelStore>,
        emitter: Arc<dyn SourceEmitter>,
        context: Arc<GenerationContext>,
    ) -> Self {
        Self::new(store, emitter, context, BuilderSet::standard())
    }

    pub fn context(&self) -> Arc<GenerationContext> {
        self.context.read().clone()
    }

    pub fn cache(&self) -> &ModelCache {
        &self.cache
    }

    pub fn builders(&self) -> &BuilderSet {
        &self.builders
    }

    /// Handle for cancelling running and future passes.
    pub fn cancellation(&self) -> CancellationFlag {
        self.cancellation.clone()
    }

    /// Replace the context. Switching to another project drops every cached node.
    pub fn set_context(&self, context: Arc<GenerationContext>) {
        let _pass = self.pass_lock.lock();
        let mut current = self.context.write();
        if current.project() != context.project() {
            info!(from = %current.project(), to = %context.project(), "Project changed, clearing model cache");
            self.cache.clear();
        }
        *current = context;
    }

    /// Run one build pass.
    ///
    /// Storage failures while computing the build set abort before any builder
    /// runs. Everything later ends up in the report.
    #[instrument(skip(self, request), fields(kind = %kind, changed = request.changed.len(), deleted = request.deleted.len()))]
    pub fn run_build(&self, request: &BuildRequest, kind: BuildKind) -> Result<BuildReport, BuildError> {
        let _pass_guard = self.pass_lock.lock();
        let context = self.context();
        let mut pass = Pass::new(Some(kind));
        info!(project = %context.project(), "Starting build");

        // nodes are only valid for the model state they were built from
        self.cache.clear();
        let objects = self.build_set(request, kind)?;
        pass.objects = objects.len() + request.deleted.len();
        debug!(objects = objects.len(), "Computed build set");

        let mut outputs = BuildOutputs::new();

        pass.advance(BuildState::BeforeBuild)?;
        for builder in self.builders.iter() {
            let produced = {
                let mut scope = BuildScope {
                    cache: &self.cache,
                    context: &context,
                    outputs: &mut outputs,
                    diagnostics: &mut pass.diagnostics,
                };
                builder.before_build(&mut scope)
            };
            if let Err(err) = produced.and_then(|artifacts| self.emit_all(&mut pass, builder, &artifacts)) {
                pass.record_failure(None, context.project(), Some(builder.id()), &err);
                pass.advance(BuildState::Failed)?;
                return Ok(pass.finish());
            }
        }

        pass.advance(BuildState::Building)?;
        for deleted in &request.deleted {
            if self.cancelled(&mut pass, &context)? {
                return Ok(pass.finish());
            }
            self.delete_object(&mut pass, &context, deleted);
        }
        for object in &objects {
            if self.cancelled(&mut pass, &context)? {
                return Ok(pass.finish());
            }
            self.build_object(&mut pass, &context, &mut outputs, object);
        }

        pass.advance(BuildState::AfterBuild)?;
        for builder in self.builders.iter() {
            let produced = {
                let mut scope = BuildScope {
                    cache: &self.cache,
                    context: &context,
                    outputs: &mut outputs,
                    diagnostics: &mut pass.diagnostics,
                };
                builder.after_build(&mut scope)
            };
            if let Err(err) = produced.and_then(|artifacts| self.emit_all(&mut pass, builder, &artifacts)) {
                pass.record_failure(None, context.project(), Some(builder.id()), &err);
                pass.advance(BuildState::Failed)?;
                return Ok(pass.finish());
            }
        }

        pass.advance(BuildState::Done)?;
        let report = pass.finish();
        info!(
            objects = report.objects,
            written = report.written().count(),
            unchanged = report.count(WriteResult::Unchanged),
            deleted = report.deleted.len(),
            diagnostics = report.diagnostics.len(),
            duration_ms = report.duration_ms,
            "Build completed"
        );
        Ok(report)
    }

    /// Drop the cache and every derived artifact of the objects in the store.
    #[instrument(skip(self))]
    pub fn clean(&self) -> Result<BuildReport, BuildError> {
        let _pass_guard = self.pass_lock.lock();
        let context = self.context();
        let mut pass = Pass::new(None);
        self.cache.clear();

        let objects = self.store.list(&KindFilter::All)?;
        pass.objects = objects.len();
        for builder in self.builders.iter().filter(|b| b.is_derived()) {
            let mut prefixes = builder.project_prefixes(&context);
            for object in objects.iter().filter(|o| builder.accepts(o.kind())) {
                prefixes.extend(builder.delete(&context, &DeletedObject::from(object.as_ref())));
            }
            for prefix in prefixes {
                match self.emitter.delete(&prefix) {
                    Ok(paths) => pass.deleted.extend(paths),
                    Err(err) => pass.record_failure(
                        None,
                        &prefix.stem,
                        Some(builder.id()),
                        &BuildError::Emit(err),
                    ),
                }
            }
        }
        pass.deleted.sort();
        pass.deleted.dedup();
        pass.state = if pass.diagnostics.has_errors() {
            BuildState::Failed
        } else {
            BuildState::Done
        };
        let report = pass.finish();
        info!(deleted = report.deleted.len(), "Clean completed");
        Ok(report)
    }

    /// Paths the builders produce for an object, without writing anything.
    ///
    /// A generation resolves to the artifacts of its owner carrying its date.
    /// Runs against the current model state through a scratch cache, and waits
    /// for a running pass.
    pub fn locate(&self, qualified_name: &str) -> Result<Vec<PathBuf>, ApiError> {
        let _pass_guard = self.pass_lock.lock();
        let found = self
            .store
            .find(qualified_name)?
            .ok_or_else(|| ApiError::UnknownObject(qualified_name.to_string()))?;
        let (object, date_suffix) = match found.generation_properties() {
            Some(generation) => {
                let owner = self
                    .store
                    .get(&generation.owner)?
                    .ok_or_else(|| ApiError::UnknownObject(generation.owner_name.clone()))?;
                let suffix = format!("_{}", generation.valid_from.format(GENERATION_SUFFIX_FORMAT));
                (owner, Some(suffix))
            }
            None => (found, None),
        };

        let context = self.context();
        let cache = ModelCache::new(self.store.clone());
        let mut outputs = BuildOutputs::new();
        let mut diagnostics = Diagnostics::new();
        let mut paths = Vec::new();
        for builder in self.builders.iter().filter(|b| b.accepts(object.kind())) {
            let mut scope = BuildScope {
                cache: &cache,
                context: &context,
                outputs: &mut outputs,
                diagnostics: &mut diagnostics,
            };
            let artifacts = builder.build(&mut scope, &object)?;
            paths.extend(artifacts.into_iter().map(|a| a.path));
        }

        if let Some(suffix) = date_suffix {
            paths.retain(|path| {
                path.file_stem()
                    .and_then(|s| s.to_str())
                    .map_or(false, |stem| stem.ends_with(&suffix))
            });
        }
        paths.sort();
        paths.dedup();
        Ok(paths)
    }

    fn build_set(&self, request: &BuildRequest, kind: BuildKind) -> Result<Vec<Arc<SourceObject>>, BuildError> {
        let graph = DependencyGraph::from_store(self.store.as_ref())?;
        let objects = match kind {
            BuildKind::Full => self.store.list(&KindFilter::All)?,
            BuildKind::Incremental => {
                let mut objects = Vec::new();
                for id in graph.affected(&request.changed) {
                    // ids of objects deleted meanwhile are skipped
                    if let Some(object) = self.store.get(&id)? {
                        objects.push(object);
                    }
                }
                objects
            }
        };
        Ok(graph.build_order(objects))
    }

    fn cancelled(&self, pass: &mut Pass, context: &GenerationContext) -> Result<bool, BuildError> {
        if !self.cancellation.is_cancelled() {
            return Ok(false);
        }
        info!(written = pass.artifacts.len(), "Build cancelled");
        pass.record_failure(None, context.project(), None, &BuildError::Cancelled);
        pass.advance(BuildState::Failed)?;
        Ok(true)
    }

    fn build_object(
        &self,
        pass: &mut Pass,
        context: &Arc<GenerationContext>,
        outputs: &mut BuildOutputs,
        object: &Arc<SourceObject>,
    ) {
        let mut failed: HashSet<&'static str> = HashSet::new();
        for builder in self.builders.iter().filter(|b| b.accepts(object.kind())) {
            if let Some(dependency) = builder.depends_on().iter().find(|d| failed.contains(**d)) {
                debug!(
                    object = %object.qualified_name(),
                    builder = builder.id(),
                    dependency = *dependency,
                    "Skipping builder, dependency failed"
                );
                failed.insert(builder.id());
                continue;
            }
            let produced = {
                let mut scope = BuildScope {
                    cache: &self.cache,
                    context,
                    outputs: &mut *outputs,
                    diagnostics: &mut pass.diagnostics,
                };
                builder.build(&mut scope, object)
            };
            if let Err(err) = produced.and_then(|artifacts| self.emit_all(pass, builder, &artifacts)) {
                failed.insert(builder.id());
                pass.record_failure(
                    Some(object.id()),
                    object.qualified_name(),
                    Some(builder.id()),
                    &err,
                );
            }
        }
    }

    fn delete_object(&self, pass: &mut Pass, context: &GenerationContext, object: &DeletedObject) {
        let derived = self
            .builders
            .iter()
            .filter(|b| b.is_derived() && b.accepts(object.kind));
        for builder in derived {
            if let Err(err) = self.delete_with(pass, context, builder, object) {
                pass.record_failure(
                    Some(object.id),
                    &object.qualified_name,
                    Some(builder.id()),
                    &err,
                );
            }
        }
    }

    fn delete_with(
        &self,
        pass: &mut Pass,
        context: &GenerationContext,
        builder: &dyn ArtefactBuilder,
        object: &DeletedObject,
    ) -> Result<(), BuildError> {
        for prefix in builder.delete(context, object) {
            let removed = self.emitter.delete(&prefix)?;
            debug!(
                object = %object.qualified_name,
                builder = builder.id(),
                removed = removed.len(),
                "Deleted derived artifacts"
            );
            pass.deleted.extend(removed);
        }
        Ok(())
    }

    /// Hand artifacts to the emitter. A path already written in this pass is
    /// kept as first written and reported as a collision.
    fn emit_all(&self, pass: &mut Pass, builder: &dyn ArtefactBuilder, artifacts: &[Artifact]) -> Result<(), BuildError> {
        for artifact in artifacts {
            let source = match artifact.source {
                Some(id) => self.store.get(&id)?.map(|o| o.qualified_name().to_string()),
                None => None,
            };
            let owner = match &source {
                Some(name) => format!("{} for {}", artifact.builder, name),
                None => artifact.builder.clone(),
            };
            if let Some(first) = pass.emitted.get(&artifact.path) {
                warn!(path = %artifact.path.display(), first = %first, second = %owner, "Artifact path collision");
                pass.diagnostics.push(Diagnostic::artifact_collision(
                    artifact.source,
                    source.as_deref().unwrap_or(""),
                    builder.id(),
                    &artifact.path,
                    first,
                ));
                continue;
            }

            let result = self.emitter.emit(artifact)?;
            pass.emitted.insert(artifact.path.clone(), owner);
            pass.artifacts.push(ArtifactRecord {
                path: artifact.path.clone(),
                builder: artifact.builder.clone(),
                source,
                derived: artifact.derived,
                internal: builder.is_internal(),
                result,
            });
        }
        Ok(())
    }
}
