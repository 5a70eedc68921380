//! Shared fixtures for integration tests

use chrono::NaiveDate;
use modelgen::context::{ContextSettings, GenerationContext};
use modelgen::emit::MemoryEmitter;
use modelgen::orchestrator::Orchestrator;
use modelgen::source::{AttributeDef, InMemoryModelStore, SourceObject, TypeProperties};
use std::sync::Arc;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn changing(name: &str, datatype: &str) -> AttributeDef {
    let mut attribute = AttributeDef::new(name, datatype);
    attribute.changing_over_time = true;
    attribute
}

pub fn subtype_of(supertype: &str) -> TypeProperties {
    TypeProperties {
        supertype: Some(supertype.to_string()),
        ..TypeProperties::default()
    }
}

/// `motor.Contract` and `motor.PremiumContract` (extending it), both product
/// types with a generation valid from 2024-01-01.
pub fn contract_store() -> Arc<InMemoryModelStore> {
    let store = Arc::new(InMemoryModelStore::new());
    let contract = TypeProperties {
        attributes: vec![AttributeDef::new("policyNumber", "String"), changing("rate", "Decimal")],
        ..TypeProperties::default()
    };
    store
        .insert_with_generations(
            SourceObject::product_type("motor.Contract", contract),
            &[date(2024, 1, 1)],
        )
        .unwrap();
    store
        .insert_with_generations(
            SourceObject::product_type("motor.PremiumContract", subtype_of("motor.Contract")),
            &[date(2024, 1, 1)],
        )
        .unwrap();
    store
}

pub fn orchestrator(
    store: Arc<InMemoryModelStore>,
    settings: ContextSettings,
) -> (Arc<MemoryEmitter>, Orchestrator) {
    let emitter = Arc::new(MemoryEmitter::new());
    let orchestrator = Orchestrator::with_standard_builders(
        store,
        emitter.clone(),
        GenerationContext::with_builtin_datatypes(settings),
    );
    (emitter, orchestrator)
}
