//! Property-based tests for cache identity, build determinism and artifact
//! prefix matching

use chrono::NaiveDate;
use modelgen::context::{ContextSettings, GenerationContext};
use modelgen::emit::{ArtifactPrefix, MemoryEmitter, GENERATION_SUFFIX_FORMAT};
use modelgen::node::default_kind;
use modelgen::orchestrator::{BuildKind, BuildRequest, Orchestrator};
use modelgen::source::{AttributeDef, InMemoryModelStore, KindFilter, ModelStore, SourceObject, TypeProperties};
use modelgen::ModelCache;
use proptest::prelude::*;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

const DATATYPES: &[&str] = &["String", "Integer", "Decimal", "Money", "Date", "Unknown"];

fn type_names() -> impl Strategy<Value = BTreeSet<String>> {
    prop::collection::btree_set("[A-Z][a-z]{2,8}", 1..6)
}

/// Types `m.<Name>`, each extending the previous one when `chain` is set.
fn store_with(names: &BTreeSet<String>, attributes: &[(String, usize)], chain: bool) -> Arc<InMemoryModelStore> {
    let store = Arc::new(InMemoryModelStore::new());
    let mut previous: Option<String> = None;
    for name in names {
        let qualified = format!("m.{}", name);
        let props = TypeProperties {
            supertype: if chain { previous.clone() } else { None },
            attributes: attributes
                .iter()
                .map(|(attr, datatype)| AttributeDef::new(attr, DATATYPES[*datatype % DATATYPES.len()]))
                .collect(),
            ..TypeProperties::default()
        };
        store
            .insert(SourceObject::policy_type(&qualified, props))
            .unwrap();
        previous = Some(qualified);
    }
    store
}

fn build(store: Arc<InMemoryModelStore>) -> Vec<(std::path::PathBuf, String)> {
    let emitter = Arc::new(MemoryEmitter::new());
    let orchestrator = Orchestrator::with_standard_builders(
        store,
        emitter.clone(),
        GenerationContext::with_builtin_datatypes(ContextSettings::new("m")),
    );
    orchestrator
        .run_build(&BuildRequest::new(), BuildKind::Full)
        .unwrap();
    emitter
        .paths()
        .into_iter()
        .map(|path| {
            let content = emitter.content(&path).unwrap();
            (path, content)
        })
        .collect()
}

/// Every lookup of a key hands out the instance built on the first one
#[test]
fn test_cache_identity_property() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&(type_names(), any::<bool>()), |(names, chain)| {
            let store = store_with(&names, &[], chain);
            let context = GenerationContext::with_builtin_datatypes(ContextSettings::new("m"));
            let cache = ModelCache::new(store.clone());

            let objects = store.list(&KindFilter::All).unwrap();
            for object in objects.iter().rev() {
                let first = cache
                    .get_or_create(object, default_kind(object.kind()), &context)
                    .unwrap();
                let second = cache
                    .get_or_create(object, default_kind(object.kind()), &context)
                    .unwrap();
                prop_assert!(Arc::ptr_eq(&first, &second));
            }
            prop_assert_eq!(cache.constructions(), objects.len());
            prop_assert_eq!(cache.len(), objects.len());
            Ok(())
        })
        .unwrap();
}

/// Two independent builds of the same model write identical files
#[test]
fn test_build_output_determinism_property() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(
            &(
                type_names(),
                prop::collection::vec(("[a-z]{3,8}", 0usize..DATATYPES.len()), 0..4),
                any::<bool>(),
            ),
            |(names, attributes, chain)| {
                // attribute names must be unique per type
                let mut seen = BTreeSet::new();
                let attributes: Vec<(String, usize)> = attributes
                    .into_iter()
                    .filter(|(name, _)| seen.insert(name.clone()))
                    .collect();

                let first = build(store_with(&names, &attributes, chain));
                let second = build(store_with(&names, &attributes, chain));
                prop_assert_eq!(first.len(), names.len() * 2 + 1);
                prop_assert_eq!(first, second);
                Ok(())
            },
        )
        .unwrap();
}

/// Generation prefixes match dated classes of their stem and nothing else,
/// not even the bare stem
#[test]
fn test_generation_prefix_property() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(
            &("[A-Z][a-z]{2,8}", "[A-Za-z0-9_]{1,8}", 0i64..20_000),
            |(stem, suffix, days)| {
                let prefix = ArtifactPrefix::generations_of("m/internal", &stem);
                let date = NaiveDate::from_ymd_opt(1990, 1, 1).unwrap() + chrono::Duration::days(days);
                let dated = format!("m/internal/{}_{}.java", stem, date.format(GENERATION_SUFFIX_FORMAT));
                prop_assert!(prefix.matches(Path::new(&dated)));
                let undated = format!("m/internal/{}.java", stem);
                prop_assert!(!prefix.matches(Path::new(&undated)));

                let other = format!("m/internal/{}{}.java", stem, suffix);
                prop_assert!(!prefix.matches(Path::new(&other)));
                let outside = format!("m/{}_{}.java", stem, date.format(GENERATION_SUFFIX_FORMAT));
                prop_assert!(!prefix.matches(Path::new(&outside)));
                Ok(())
            },
        )
        .unwrap();
}
