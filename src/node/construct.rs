//! Node constructors, one per node kind.

use crate::cache::ModelCache;
use crate::context::{join_package, AspectNames, GenerationContext};
use crate::error::ModelError;
use crate::node::{
    classify, CacheKey, EnumNode, GenerationNode, GenerationRef, GenerationalTypeNode, ModelNode,
    NodeBody, NodeKind, SupertypeRef, TableNode, TypeNode,
};
use crate::source::{ModelStore, SourceObject, SourceProperties};
use std::sync::{Arc, OnceLock};
use tracing::trace;

/// Keys currently under construction on this call chain
#[derive(Debug, Clone, Default)]
pub(crate) struct ConstructionPath {
    entries: Vec<(CacheKey, String)>,
}

impl ConstructionPath {
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn child(&self, key: CacheKey, name: &str) -> Self {
        let mut entries = self.entries.clone();
        entries.push((key, name.to_string()));
        Self { entries }
    }

    /// Qualified names along the path, closed with `last`.
    pub fn cycle(&self, last: &str) -> Vec<String> {
        let mut path: Vec<String> = self.entries.iter().map(|(_, n)| n.clone()).collect();
        path.push(last.to_string());
        path
    }
}

pub(crate) fn construct(
    cache: &ModelCache,
    source: &Arc<SourceObject>,
    requested: NodeKind,
    context: &Arc<GenerationContext>,
    path: &ConstructionPath,
) -> Result<ModelNode, ModelError> {
    let kind = classify(source, requested)?;
    let key = CacheKey {
        source: source.id(),
        kind,
        context: context.id(),
    };
    let store = cache.store().clone();
    trace!(object = %source.qualified_name(), kind = %kind, "Constructing node");

    let (names, supertype, body, declaring) = match (kind, source.properties()) {
        (NodeKind::Type | NodeKind::GenerationalType, SourceProperties::Type(props)) => {
            check_supertype_chain(store.as_ref(), source)?;

            let supertype = match &props.supertype {
                Some(name) => {
                    let super_source = store.find(name)?.ok_or_else(|| {
                        ModelError::UnknownSupertype {
                            qualified_name: source.qualified_name().to_string(),
                            supertype: name.clone(),
                        }
                    })?;
                    let parent = cache.get_or_create_within(&super_source, kind, context, path)?;
                    Some(SupertypeRef {
                        key: *parent.key(),
                        qualified_name: name.clone(),
                        names: parent.names().clone(),
                    })
                }
                None => None,
            };

            let configuration_link = match props.configuration_link.as_deref() {
                Some(name) => store
                    .find(name)?
                    .filter(|linked| linked.kind().is_type())
                    .map(|linked| context.type_names(linked.package(), linked.name())),
                None => None,
            };
            let ty = TypeNode {
                is_abstract: props.is_abstract,
                configuration_link,
            };

            let body = if kind == NodeKind::GenerationalType {
                let mut generations = Vec::with_capacity(props.generations.len());
                for id in &props.generations {
                    let generation = store
                        .get(id)?
                        .ok_or_else(|| ModelError::SourceNotFound(id.to_string()))?;
                    let valid_from = generation
                        .generation_properties()
                        .map(|g| g.valid_from)
                        .ok_or_else(|| ModelError::KindMismatch {
                            qualified_name: generation.qualified_name().to_string(),
                            kind: generation.kind().to_string(),
                            requested: NodeKind::Generation.to_string(),
                        })?;
                    generations.push(GenerationRef {
                        key: CacheKey {
                            source: *id,
                            kind: NodeKind::Generation,
                            context: context.id(),
                        },
                        valid_from,
                    });
                }
                generations.sort_by_key(|g| g.valid_from);
                NodeBody::GenerationalType(GenerationalTypeNode { ty, generations })
            } else {
                NodeBody::Type(ty)
            };

            (
                context.type_names(source.package(), source.name()),
                supertype,
                body,
                source.clone(),
            )
        }
        (NodeKind::Generation, SourceProperties::Generation(props)) => {
            let owner = store
                .get(&props.owner)?
                .ok_or_else(|| ModelError::SourceNotFound(props.owner_name.clone()))?;
            let date_suffix = props.valid_from.format("%Y%m%d").to_string();
            let names = generation_names(context, &owner, &date_suffix);
            let body = NodeBody::Generation(GenerationNode {
                owner: CacheKey {
                    source: owner.id(),
                    kind: NodeKind::GenerationalType,
                    context: context.id(),
                },
                owner_name: owner.qualified_name().to_string(),
                valid_from: props.valid_from,
                date_suffix,
            });
            (names, None, body, owner)
        }
        (NodeKind::Table, SourceProperties::Table(props)) => {
            let name = join_package(&context.target_package(source.package()), source.name());
            let body = NodeBody::Table(TableNode {
                row_class: format!("{}Row", source.name()),
                unique_keys: props.unique_keys.clone(),
            });
            (single_name(name), None, body, source.clone())
        }
        (NodeKind::Enum, SourceProperties::Enum(props)) => {
            let name = join_package(&context.target_package(source.package()), source.name());
            let body = NodeBody::Enum(EnumNode {
                values: props.values.clone(),
            });
            (single_name(name), None, body, source.clone())
        }
        _ => {
            return Err(ModelError::KindMismatch {
                qualified_name: source.qualified_name().to_string(),
                kind: source.kind().to_string(),
                requested: kind.to_string(),
            })
        }
    };

    Ok(ModelNode {
        key,
        source: source.clone(),
        declaring,
        context: context.clone(),
        store,
        names,
        supertype,
        body,
        resolved: OnceLock::new(),
    })
}

fn single_name(name: String) -> AspectNames {
    AspectNames {
        interface: name.clone(),
        implementation: name,
    }
}

/// `<impl package>.<Owner><Gen>_<yyyymmdd>`; the published interface is shared
/// by all generations of the owner.
fn generation_names(context: &GenerationContext, owner: &SourceObject, date_suffix: &str) -> AspectNames {
    let naming = context.naming();
    let implementation = join_package(
        &context.implementation_package(owner.package()),
        &format!("{}{}_{}", owner.name(), naming.generation_suffix, date_suffix),
    );
    let interface = if context.features().published_interfaces {
        join_package(
            &context.target_package(owner.package()),
            &format!(
                "{}{}{}",
                naming.interface_prefix,
                owner.name(),
                naming.generation_suffix
            ),
        )
    } else {
        implementation.clone()
    };
    AspectNames {
        interface,
        implementation,
    }
}

/// Walk the supertype chain through the store; a revisited name is a cycle.
fn check_supertype_chain(store: &dyn ModelStore, source: &SourceObject) -> Result<(), ModelError> {
    let mut seen = vec![source.qualified_name().to_string()];
    let mut current = source.supertype().map(str::to_string);
    while let Some(name) = current {
        if seen.contains(&name) {
            seen.push(name);
            return Err(ModelError::Cyclic { path: seen });
        }
        current = store
            .find(&name)?
            .and_then(|o| o.supertype().map(str::to_string));
        seen.push(name);
    }
    Ok(())
}
