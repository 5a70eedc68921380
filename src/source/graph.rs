//! Dependency graph among source objects.
//!
//! Decides which objects an incremental build must revisit and in which order
//! a build set is processed (supertypes before subtypes).

use crate::error::StorageError;
use crate::source::store::{KindFilter, ModelStore};
use crate::source::{SourceKind, SourceObject, SourceProperties};
use crate::types::StableId;
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::Arc;

pub struct DependencyGraph {
    /// id -> ids whose generated code depends on it
    dependants: HashMap<StableId, BTreeSet<StableId>>,
    /// Supertype chain length per type id
    depth: HashMap<StableId, usize>,
}

impl DependencyGraph {
    pub fn from_store(store: &dyn ModelStore) -> Result<Self, StorageError> {
        let objects = store.list(&KindFilter::All)?;
        let by_name: HashMap<&str, StableId> = objects
            .iter()
            .map(|o| (o.qualified_name(), o.id()))
            .collect();

        let mut dependants: HashMap<StableId, BTreeSet<StableId>> = HashMap::new();
        let mut supertype_of: HashMap<StableId, StableId> = HashMap::new();

        for object in &objects {
            match object.properties() {
                SourceProperties::Type(props) => {
                    if let Some(id) = props.supertype.as_deref().and_then(|n| by_name.get(n)) {
                        dependants.entry(*id).or_default().insert(object.id());
                        supertype_of.insert(object.id(), *id);
                    }
                    for assoc in &props.associations {
                        if let Some(id) = by_name.get(assoc.target.as_str()) {
                            dependants.entry(*id).or_default().insert(object.id());
                        }
                    }
                    if let Some(id) = props
                        .configuration_link
                        .as_deref()
                        .and_then(|n| by_name.get(n))
                    {
                        dependants.entry(*id).or_default().insert(object.id());
                    }
                }
                SourceProperties::Generation(props) => {
                    // generation artifacts are built through their owner
                    dependants.entry(object.id()).or_default().insert(props.owner);
                }
                SourceProperties::Table(_) | SourceProperties::Enum(_) => {}
            }
        }

        let mut depth = HashMap::new();
        for object in objects.iter().filter(|o| o.kind().is_type()) {
            let mut seen = HashSet::new();
            let mut current = object.id();
            let mut d = 0usize;
            // bounded by `seen` so a malformed cyclic chain still terminates
            while let Some(parent) = supertype_of.get(&current) {
                if !seen.insert(*parent) {
                    break;
                }
                d += 1;
                current = *parent;
            }
            depth.insert(object.id(), d);
        }

        Ok(Self { dependants, depth })
    }

    /// Changed ids plus everything depending on them, transitively.
    pub fn affected(&self, changed: &[StableId]) -> BTreeSet<StableId> {
        let mut affected: BTreeSet<StableId> = changed.iter().copied().collect();
        let mut queue: VecDeque<StableId> = changed.iter().copied().collect();
        while let Some(id) = queue.pop_front() {
            if let Some(next) = self.dependants.get(&id) {
                for dependant in next {
                    if affected.insert(*dependant) {
                        queue.push_back(*dependant);
                    }
                }
            }
        }
        affected
    }

    pub fn dependants_of(&self, id: &StableId) -> Vec<StableId> {
        self.dependants
            .get(id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Sort a build set: supertypes first, then by qualified name.
    ///
    /// Generations are dropped; their artifacts are produced through the owner.
    pub fn build_order(&self, mut objects: Vec<Arc<SourceObject>>) -> Vec<Arc<SourceObject>> {
        objects.retain(|o| o.kind() != SourceKind::Generation);
        objects.sort_by(|a, b| {
            let da = self.depth.get(&a.id()).copied().unwrap_or(0);
            let db = self.depth.get(&b.id()).copied().unwrap_or(0);
            da.cmp(&db)
                .then_with(|| a.qualified_name().cmp(b.qualified_name()))
        });
        objects
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{AssociationDef, InMemoryModelStore, TypeProperties};
    use chrono::NaiveDate;

    fn subtype_of(supertype: &str) -> TypeProperties {
        TypeProperties {
            supertype: Some(supertype.to_string()),
            ..TypeProperties::default()
        }
    }

    #[test]
    fn test_affected_includes_transitive_subtypes() {
        let store = InMemoryModelStore::new();
        let base = store
            .insert(SourceObject::policy_type("acme.Base", TypeProperties::default()))
            .unwrap();
        let mid = store
            .insert(SourceObject::policy_type("acme.Mid", subtype_of("acme.Base")))
            .unwrap();
        let leaf = store
            .insert(SourceObject::policy_type("acme.Leaf", subtype_of("acme.Mid")))
            .unwrap();
        let other = store
            .insert(SourceObject::policy_type("acme.Other", TypeProperties::default()))
            .unwrap();

        let graph = DependencyGraph::from_store(&store).unwrap();
        let affected = graph.affected(&[base.id()]);
        assert!(affected.contains(&mid.id()));
        assert!(affected.contains(&leaf.id()));
        assert!(!affected.contains(&other.id()));
    }

    #[test]
    fn test_generation_change_affects_owner() {
        let store = InMemoryModelStore::new();
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let owner = store
            .insert_with_generations(
                SourceObject::product_type("acme.Product", TypeProperties::default()),
                &[date],
            )
            .unwrap();
        let graph = DependencyGraph::from_store(&store).unwrap();
        let affected = graph.affected(&[owner.generation_ids()[0]]);
        assert!(affected.contains(&owner.id()));
    }

    #[test]
    fn test_association_target_affects_source() {
        let store = InMemoryModelStore::new();
        let coverage = store
            .insert(SourceObject::policy_type("acme.Coverage", TypeProperties::default()))
            .unwrap();
        let contract = store
            .insert(SourceObject::policy_type(
                "acme.Contract",
                TypeProperties {
                    associations: vec![AssociationDef {
                        name: "coverages".to_string(),
                        target: "acme.Coverage".to_string(),
                        min: 0,
                        max: None,
                    }],
                    ..TypeProperties::default()
                },
            ))
            .unwrap();
        let graph = DependencyGraph::from_store(&store).unwrap();
        assert_eq!(graph.dependants_of(&coverage.id()), vec![contract.id()]);
    }

    #[test]
    fn test_build_order_supertypes_first() {
        let store = InMemoryModelStore::new();
        store
            .insert(SourceObject::policy_type("acme.A", subtype_of("acme.Z")))
            .unwrap();
        store
            .insert(SourceObject::policy_type("acme.Z", TypeProperties::default()))
            .unwrap();
        let graph = DependencyGraph::from_store(&store).unwrap();
        let ordered = graph.build_order(store.list(&KindFilter::All).unwrap());
        let names: Vec<&str> = ordered.iter().map(|o| o.qualified_name()).collect();
        assert_eq!(names, vec!["acme.Z", "acme.A"]);
    }
}
