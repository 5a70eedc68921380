//! Artefact Builders
//!
//! Builders turn generator model nodes into artifacts. Each builder declares the
//! source kinds it accepts, the builders whose outputs it reads, and whether its
//! outputs are derived (fully regenerable) and internal (implementation only).
//!
//! Builders do not write anything themselves: `build` and the phase hooks return
//! artifacts and `delete` returns prefixes, and the orchestrator hands both to
//! the source emitter. That keeps the lifecycle order in one place.

pub mod generation;
pub mod java;
pub mod table;
pub mod toc;
pub mod types;
pub mod enums;

pub use enums::EnumBuilder;
pub use generation::GenerationBuilder;
pub use table::TableBuilder;
pub use toc::TocBuilder;
pub use types::{PublishedInterfaceBuilder, TypeImplementationBuilder};

use crate::cache::ModelCache;
use crate::context::{AspectNames, GenerationContext};
use crate::diagnostics::Diagnostics;
use crate::emit::{Artifact, ArtifactPrefix};
use crate::error::BuildError;
use crate::node::{ModelNode, NodeKind};
use crate::source::{DeletedObject, SourceKind, SourceObject};
use crate::types::StableId;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

/// Builder ids of the shipped builders
pub const TYPE_IMPLEMENTATION: &str = "type-implementation";
pub const PUBLISHED_INTERFACE: &str = "published-interface";
pub const GENERATION: &str = "generation";
pub const TABLE: &str = "table";
pub const ENUM: &str = "enum";
pub const TOC: &str = "toc";

/// Three-phase builder contract.
///
/// `before_build` and `after_build` run once per pass for every builder, in
/// declared order. `build` runs once per accepted source object; `delete` is
/// only called on derived builders, for objects removed since the last build.
pub trait ArtefactBuilder: Send + Sync {
    fn id(&self) -> &'static str;

    fn accepts(&self, kind: SourceKind) -> bool;

    /// Builders whose outputs this builder reads; they must be declared earlier.
    fn depends_on(&self) -> &[&'static str] {
        &[]
    }

    fn is_derived(&self) -> bool {
        true
    }

    fn is_internal(&self) -> bool;

    fn before_build(&self, _scope: &mut BuildScope<'_>) -> Result<Vec<Artifact>, BuildError> {
        Ok(Vec::new())
    }

    fn build(
        &self,
        scope: &mut BuildScope<'_>,
        object: &Arc<SourceObject>,
    ) -> Result<Vec<Artifact>, BuildError>;

    /// Prefixes covering everything `build` may have produced for `object`.
    fn delete(&self, context: &GenerationContext, object: &DeletedObject) -> Vec<ArtifactPrefix>;

    fn after_build(&self, _scope: &mut BuildScope<'_>) -> Result<Vec<Artifact>, BuildError> {
        Ok(Vec::new())
    }

    /// Project-wide artifacts not tied to one source object (removed on clean).
    fn project_prefixes(&self, _context: &GenerationContext) -> Vec<ArtifactPrefix> {
        Vec::new()
    }
}

/// Everything a builder may touch during one pass
pub struct BuildScope<'a> {
    pub cache: &'a ModelCache,
    pub context: &'a Arc<GenerationContext>,
    pub outputs: &'a mut BuildOutputs,
    pub diagnostics: &'a mut Diagnostics,
}

impl<'a> BuildScope<'a> {
    /// Node for `object` under `kind`; its diagnostics go into the pass.
    pub fn node(&mut self, object: &Arc<SourceObject>, kind: NodeKind) -> Result<Arc<ModelNode>, BuildError> {
        let node = self.cache.get_or_create(object, kind, self.context)?;
        self.diagnostics.extend(node.diagnostics().iter().cloned());
        Ok(node)
    }
}

/// What a builder produced for one object, readable by dependent builders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuilderOutput {
    pub names: AspectNames,
    pub paths: Vec<PathBuf>,
}

/// Outputs published by builders within one pass
#[derive(Debug, Default)]
pub struct BuildOutputs {
    entries: HashMap<&'static str, HashMap<StableId, BuilderOutput>>,
}

impl BuildOutputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&mut self, builder: &'static str, object: StableId, output: BuilderOutput) {
        self.entries.entry(builder).or_default().insert(object, output);
    }

    pub fn get(&self, builder: &str, object: &StableId) -> Option<&BuilderOutput> {
        self.entries.get(builder)?.get(object)
    }

    /// Outputs of one builder, in no particular order.
    pub fn of_builder(&self, builder: &str) -> impl Iterator<Item = (&StableId, &BuilderOutput)> {
        self.entries.get(builder).into_iter().flat_map(|outputs| outputs.iter())
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Builders in validated, declared order
pub struct BuilderSet {
    builders: Vec<Box<dyn ArtefactBuilder>>,
}

impl BuilderSet {
    /// Validate the declared order: ids are unique and every dependency is
    /// declared before its dependant.
    pub fn new(builders: Vec<Box<dyn ArtefactBuilder>>) -> Result<Self, BuildError> {
        let mut declared: HashSet<&'static str> = HashSet::new();
        for builder in &builders {
            for dependency in builder.depends_on() {
                if !declared.contains(dependency) {
                    return Err(BuildError::OrchestratorProtocol(format!(
                        "builder '{}' depends on '{}', which is not declared before it",
                        builder.id(),
                        dependency
                    )));
                }
            }
            if !declared.insert(builder.id()) {
                return Err(BuildError::OrchestratorProtocol(format!(
                    "builder '{}' declared twice",
                    builder.id()
                )));
            }
        }
        Ok(Self { builders })
    }

    /// The shipped builders in their fixed order.
    pub fn standard() -> Self {
        Self {
            builders: standard_builders(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn ArtefactBuilder> {
        self.builders.iter().map(|b| b.as_ref())
    }

    pub fn get(&self, id: &str) -> Option<&dyn ArtefactBuilder> {
        self.iter().find(|b| b.id() == id)
    }

    pub fn ids(&self) -> Vec<&'static str> {
        self.builders.iter().map(|b| b.id()).collect()
    }

    pub fn len(&self) -> usize {
        self.builders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.builders.is_empty()
    }
}

pub fn standard_builders() -> Vec<Box<dyn ArtefactBuilder>> {
    vec![
        Box::new(TypeImplementationBuilder),
        Box::new(PublishedInterfaceBuilder),
        Box::new(GenerationBuilder),
        Box::new(TableBuilder),
        Box::new(EnumBuilder),
        Box::new(TocBuilder),
    ]
}

/// Names of a type under the context, computed from a qualified model name.
pub(crate) fn names_of(context: &GenerationContext, qualified_name: &str) -> AspectNames {
    let (package, name) = crate::source::split_qualified_name(qualified_name);
    context.type_names(package, name)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed {
        id: &'static str,
        deps: &'static [&'static str],
    }

    impl ArtefactBuilder for Fixed {
        fn id(&self) -> &'static str {
            self.id
        }

        fn accepts(&self, _kind: SourceKind) -> bool {
            true
        }

        fn depends_on(&self) -> &[&'static str] {
            self.deps
        }

        fn is_internal(&self) -> bool {
            true
        }

        fn build(
            &self,
            _scope: &mut BuildScope<'_>,
            _object: &Arc<SourceObject>,
        ) -> Result<Vec<Artifact>, BuildError> {
            Ok(Vec::new())
        }

        fn delete(&self, _context: &GenerationContext, _object: &DeletedObject) -> Vec<ArtifactPrefix> {
            Vec::new()
        }
    }

    #[test]
    fn test_standard_order_is_valid() {
        let set = BuilderSet::new(standard_builders()).unwrap();
        assert_eq!(
            set.ids(),
            vec![TYPE_IMPLEMENTATION, PUBLISHED_INTERFACE, GENERATION, TABLE, ENUM, TOC]
        );
        assert_eq!(set.get(GENERATION).unwrap().depends_on(), &[TYPE_IMPLEMENTATION]);
    }

    #[test]
    fn test_dependency_declared_later_is_rejected() {
        let result = BuilderSet::new(vec![
            Box::new(Fixed { id: "b", deps: &["a"] }),
            Box::new(Fixed { id: "a", deps: &[] }),
        ]);
        assert!(matches!(result, Err(BuildError::OrchestratorProtocol(_))));
    }

    #[test]
    fn test_unknown_dependency_is_rejected() {
        let result = BuilderSet::new(vec![Box::new(Fixed { id: "b", deps: &["missing"] })]);
        assert!(matches!(result, Err(BuildError::OrchestratorProtocol(_))));
    }

    #[test]
    fn test_duplicate_id_is_rejected() {
        let result = BuilderSet::new(vec![
            Box::new(Fixed { id: "a", deps: &[] }),
            Box::new(Fixed { id: "a", deps: &[] }),
        ]);
        assert!(result.is_err());
    }
}
