//! Generator Model Cache
//!
//! Identity-keyed, lazily populated cache of generator model nodes. A key is
//! constructed at most once per cache scope: concurrent misses for the same key
//! wait on the same slot and observe the same instance.
//!
//! The map lock is only held to find or insert a slot. Construction runs inside
//! the slot's `OnceLock`, so constructing a node may recurse into the cache for
//! other keys (the supertype) without holding the map lock.

use crate::context::GenerationContext;
use crate::error::ModelError;
use crate::node::construct::ConstructionPath;
use crate::node::{self, CacheKey, ModelNode, NodeKind};
use crate::source::{ModelStore, SourceObject};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use tracing::{debug, instrument};

type Slot = Arc<OnceLock<Result<Arc<ModelNode>, ModelError>>>;

pub struct ModelCache {
    store: Arc<dyn ModelStore>,
    slots: Mutex<HashMap<CacheKey, Slot>>,
    constructions: AtomicUsize,
    hits: AtomicUsize,
}

impl ModelCache {
    pub fn new(store: Arc<dyn ModelStore>) -> Self {
        Self {
            store,
            slots: Mutex::new(HashMap::new()),
            constructions: AtomicUsize::new(0),
            hits: AtomicUsize::new(0),
        }
    }

    pub fn store(&self) -> &Arc<dyn ModelStore> {
        &self.store
    }

    /// Return the node for (source, kind, context), constructing it on first use.
    pub fn get_or_create(
        &self,
        source: &Arc<SourceObject>,
        kind: NodeKind,
        context: &Arc<GenerationContext>,
    ) -> Result<Arc<ModelNode>, ModelError> {
        self.get_or_create_within(source, kind, context, &ConstructionPath::default())
    }

    pub(crate) fn get_or_create_within(
        &self,
        source: &Arc<SourceObject>,
        kind: NodeKind,
        context: &Arc<GenerationContext>,
        path: &ConstructionPath,
    ) -> Result<Arc<ModelNode>, ModelError> {
        let key = CacheKey {
            source: source.id(),
            kind,
            context: context.id(),
        };
        // re-entering a slot that is being initialized on this thread would deadlock
        if path.contains(&key) {
            return Err(ModelError::Cyclic {
                path: path.cycle(source.qualified_name()),
            });
        }
        let child = path.child(key, source.qualified_name());
        self.get_or_create_with(key, || node::construct(self, source, kind, context, &child))
    }

    /// Single-flight core: run `construct` at most once for `key`.
    pub fn get_or_create_with<F>(&self, key: CacheKey, construct: F) -> Result<Arc<ModelNode>, ModelError>
    where
        F: FnOnce() -> Result<ModelNode, ModelError>,
    {
        let slot = {
            let mut slots = self.slots.lock();
            slots
                .entry(key)
                .or_insert_with(|| Arc::new(OnceLock::new()))
                .clone()
        };

        if let Some(result) = slot.get() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return result.clone();
        }

        slot.get_or_init(|| self.construct_slot(&key, construct))
            .clone()
    }

    #[instrument(skip(self, construct), fields(object = %key.source.short(), kind = %key.kind))]
    fn construct_slot<F>(&self, key: &CacheKey, construct: F) -> Result<Arc<ModelNode>, ModelError>
    where
        F: FnOnce() -> Result<ModelNode, ModelError>,
    {
        self.constructions.fetch_add(1, Ordering::Relaxed);
        let result = construct().map(Arc::new);
        match &result {
            Ok(node) => debug!(name = %node.source().qualified_name(), "Cached generator model node"),
            Err(err) => debug!(error = %err, "Node construction failed"),
        }
        result
    }

    /// Resolve a lookup key (supertype or generation reference).
    pub fn resolve_key(
        &self,
        key: &CacheKey,
        context: &Arc<GenerationContext>,
    ) -> Result<Arc<ModelNode>, ModelError> {
        debug_assert_eq!(key.context, context.id(), "key resolved under a foreign context");
        if let Some(node) = self.peek(key) {
            return Ok(node);
        }
        let source = self
            .store
            .get(&key.source)?
            .ok_or_else(|| ModelError::SourceNotFound(key.source.to_string()))?;
        self.get_or_create(&source, key.kind, context)
    }

    /// Cached node for `key`, without constructing.
    pub fn peek(&self, key: &CacheKey) -> Option<Arc<ModelNode>> {
        let slot = self.slots.lock().get(key).cloned()?;
        match slot.get() {
            Some(Ok(node)) => Some(node.clone()),
            _ => None,
        }
    }

    /// Drop every entry. Used on clean builds and project changes.
    pub fn clear(&self) {
        let mut slots = self.slots.lock();
        debug!(entries = slots.len(), "Clearing generator model cache");
        slots.clear();
    }

    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of constructor runs since creation.
    pub fn constructions(&self) -> usize {
        self.constructions.load(Ordering::Relaxed)
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::Relaxed)
    }
}
