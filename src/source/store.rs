//! Model Store
//!
//! Read interface onto the domain model store. The generator is a pure consumer:
//! it lists, looks up by identity and looks up by qualified name.

use crate::error::StorageError;
use crate::source::{DeletedObject, SourceKind, SourceObject};
use crate::types::StableId;
use chrono::NaiveDate;
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

/// Kind filter for listing source objects
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KindFilter {
    All,
    Only(BTreeSet<SourceKind>),
}

impl KindFilter {
    pub fn only(kinds: &[SourceKind]) -> Self {
        KindFilter::Only(kinds.iter().copied().collect())
    }

    pub fn matches(&self, kind: SourceKind) -> bool {
        match self {
            KindFilter::All => true,
            KindFilter::Only(kinds) => kinds.contains(&kind),
        }
    }
}

/// Domain model store interface
pub trait ModelStore: Send + Sync {
    /// List source objects of the given kinds, ordered by qualified name.
    fn list(&self, filter: &KindFilter) -> Result<Vec<Arc<SourceObject>>, StorageError>;

    fn get(&self, id: &StableId) -> Result<Option<Arc<SourceObject>>, StorageError>;

    /// Find a source object by its qualified name
    fn find(&self, qualified_name: &str) -> Result<Option<Arc<SourceObject>>, StorageError>;
}

#[derive(Default)]
struct Objects {
    by_id: HashMap<StableId, Arc<SourceObject>>,
    by_name: BTreeMap<String, StableId>,
}

/// In-memory model store
///
/// Backing store for tests and for the file loader.
#[derive(Default)]
pub struct InMemoryModelStore {
    objects: RwLock<Objects>,
}

impl InMemoryModelStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new object. Fails if the qualified name is already taken.
    pub fn insert(&self, object: SourceObject) -> Result<Arc<SourceObject>, StorageError> {
        let mut objects = self.objects.write();
        if objects.by_name.contains_key(object.qualified_name()) {
            return Err(StorageError::Duplicate(object.qualified_name().to_string()));
        }
        let object = Arc::new(object);
        objects
            .by_name
            .insert(object.qualified_name().to_string(), object.id());
        objects.by_id.insert(object.id(), object.clone());
        Ok(object)
    }

    /// Insert or replace an object, keyed by qualified name.
    pub fn upsert(&self, object: SourceObject) -> Arc<SourceObject> {
        let mut objects = self.objects.write();
        if let Some(previous) = objects.by_name.get(object.qualified_name()).copied() {
            objects.by_id.remove(&previous);
        }
        let object = Arc::new(object);
        objects
            .by_name
            .insert(object.qualified_name().to_string(), object.id());
        objects.by_id.insert(object.id(), object.clone());
        object
    }

    /// Insert a type together with one generation per date.
    ///
    /// Returns the stored type with its generation ids filled in.
    pub fn insert_with_generations(
        &self,
        object: SourceObject,
        valid_from: &[NaiveDate],
    ) -> Result<Arc<SourceObject>, StorageError> {
        let generations: Vec<SourceObject> = valid_from
            .iter()
            .map(|date| SourceObject::generation(&object, *date, BTreeMap::new()))
            .collect();
        let owner = object.with_generations(generations.iter().map(|g| g.id()).collect());
        let owner = self.insert(owner)?;
        for generation in generations {
            self.insert(generation)?;
        }
        Ok(owner)
    }

    /// Remove an object and return its tombstone.
    pub fn remove(&self, id: &StableId) -> Option<DeletedObject> {
        let mut objects = self.objects.write();
        let removed = objects.by_id.remove(id)?;
        objects.by_name.remove(removed.qualified_name());
        Some(DeletedObject::from(removed.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.objects.read().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ModelStore for InMemoryModelStore {
    fn list(&self, filter: &KindFilter) -> Result<Vec<Arc<SourceObject>>, StorageError> {
        let objects = self.objects.read();
        Ok(objects
            .by_name
            .values()
            .filter_map(|id| objects.by_id.get(id))
            .filter(|object| filter.matches(object.kind()))
            .cloned()
            .collect())
    }

    fn get(&self, id: &StableId) -> Result<Option<Arc<SourceObject>>, StorageError> {
        Ok(self.objects.read().by_id.get(id).cloned())
    }

    fn find(&self, qualified_name: &str) -> Result<Option<Arc<SourceObject>>, StorageError> {
        let objects = self.objects.read();
        Ok(objects
            .by_name
            .get(qualified_name)
            .and_then(|id| objects.by_id.get(id))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::TypeProperties;

    #[test]
    fn test_insert_and_lookup() {
        let store = InMemoryModelStore::new();
        let stored = store
            .insert(SourceObject::policy_type("acme.Contract", TypeProperties::default()))
            .unwrap();

        assert_eq!(store.get(&stored.id()).unwrap().unwrap().qualified_name(), "acme.Contract");
        assert_eq!(store.find("acme.Contract").unwrap().unwrap().id(), stored.id());
        assert!(store.find("acme.Missing").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_rejected() {
        let store = InMemoryModelStore::new();
        store
            .insert(SourceObject::policy_type("acme.Contract", TypeProperties::default()))
            .unwrap();
        let result = store.insert(SourceObject::policy_type("acme.Contract", TypeProperties::default()));
        assert!(matches!(result, Err(StorageError::Duplicate(_))));
    }

    #[test]
    fn test_list_filters_and_orders() {
        let store = InMemoryModelStore::new();
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        store
            .insert_with_generations(
                SourceObject::product_type("acme.b.Product", TypeProperties::default()),
                &[date],
            )
            .unwrap();
        store
            .insert(SourceObject::policy_type("acme.a.Contract", TypeProperties::default()))
            .unwrap();

        let all = store.list(&KindFilter::All).unwrap();
        assert_eq!(all.len(), 3);

        let types = store
            .list(&KindFilter::only(&[SourceKind::PolicyType, SourceKind::ProductType]))
            .unwrap();
        let names: Vec<&str> = types.iter().map(|o| o.qualified_name()).collect();
        assert_eq!(names, vec!["acme.a.Contract", "acme.b.Product"]);
        assert_eq!(types[1].generation_ids().len(), 1);
    }

    #[test]
    fn test_remove_returns_tombstone() {
        let store = InMemoryModelStore::new();
        let stored = store
            .insert(SourceObject::policy_type("acme.Contract", TypeProperties::default()))
            .unwrap();
        let tombstone = store.remove(&stored.id()).unwrap();
        assert_eq!(tombstone.qualified_name, "acme.Contract");
        assert!(store.is_empty());
    }
}
