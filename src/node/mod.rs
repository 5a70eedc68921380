//! Generator Model Node Tree
//!
//! Typed, immutable-once-built views of source objects. Every node is one
//! variant of a closed set of node kinds, picked by [`classify`] at the cache
//! boundary. Supertypes and generations are referenced by cache key only and
//! resolved through the [`ModelCache`](crate::cache::ModelCache) on demand.

mod classify;
pub(crate) mod construct;
mod resolve;

pub use classify::{classify, default_kind};
pub(crate) use construct::construct;
pub use resolve::{ResolvedAssociation, ResolvedAttribute, ResolvedColumn};

use crate::cache::ModelCache;
pub use crate::context::AspectNames;
use crate::context::{ContextId, GenerationContext};
use crate::diagnostics::Diagnostic;
use crate::error::ModelError;
use crate::source::{EnumValueDef, ModelStore, SourceObject};
use crate::types::StableId;
use chrono::NaiveDate;
use resolve::Resolved;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Requested view of a source object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    /// Policy or product type, generations ignored
    Type,
    /// Product type with explicit time generations
    GenerationalType,
    Generation,
    Table,
    Enum,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NodeKind::Type => "type",
            NodeKind::GenerationalType => "type with generations",
            NodeKind::Generation => "generation",
            NodeKind::Table => "table",
            NodeKind::Enum => "enum",
        };
        f.write_str(s)
    }
}

/// Published interface or implementation form of a generated type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Aspect {
    Interface,
    Implementation,
}

/// Cache key: (source identity, requested kind, context identity)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    pub source: StableId,
    pub kind: NodeKind,
    pub context: ContextId,
}

/// Lookup reference to the supertype's node
#[derive(Debug, Clone)]
pub struct SupertypeRef {
    pub key: CacheKey,
    pub qualified_name: String,
    pub names: AspectNames,
}

/// Lookup reference to one time generation of a generational type
#[derive(Debug, Clone)]
pub struct GenerationRef {
    pub key: CacheKey,
    pub valid_from: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct TypeNode {
    pub is_abstract: bool,
    /// Names of the configuring product type / configured policy type
    pub configuration_link: Option<AspectNames>,
}

#[derive(Debug, Clone)]
pub struct GenerationalTypeNode {
    pub ty: TypeNode,
    pub generations: Vec<GenerationRef>,
}

#[derive(Debug, Clone)]
pub struct GenerationNode {
    pub owner: CacheKey,
    pub owner_name: String,
    pub valid_from: NaiveDate,
    /// `yyyymmdd`, used in class and file names
    pub date_suffix: String,
}

#[derive(Debug, Clone)]
pub struct TableNode {
    /// Simple name of the generated row class
    pub row_class: String,
    pub unique_keys: Vec<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct EnumNode {
    pub values: Vec<EnumValueDef>,
}

/// Variant payload of a node
#[derive(Debug, Clone)]
pub enum NodeBody {
    Type(TypeNode),
    GenerationalType(GenerationalTypeNode),
    Generation(GenerationNode),
    Table(TableNode),
    Enum(EnumNode),
}

/// Generator model node for one source object, one kind and one context
pub struct ModelNode {
    key: CacheKey,
    source: Arc<SourceObject>,
    /// Object declaring the attributes (the owner, for generations)
    declaring: Arc<SourceObject>,
    context: Arc<GenerationContext>,
    store: Arc<dyn ModelStore>,
    names: AspectNames,
    supertype: Option<SupertypeRef>,
    body: NodeBody,
    resolved: OnceLock<Resolved>,
}

impl fmt::Debug for ModelNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelNode")
            .field("key", &self.key)
            .field("source", &self.source.qualified_name())
            .field("names", &self.names)
            .finish()
    }
}

impl ModelNode {
    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    pub fn kind(&self) -> NodeKind {
        self.key.kind
    }

    pub fn source(&self) -> &Arc<SourceObject> {
        &self.source
    }

    pub fn context(&self) -> &Arc<GenerationContext> {
        &self.context
    }

    pub fn body(&self) -> &NodeBody {
        &self.body
    }

    pub fn names(&self) -> &AspectNames {
        &self.names
    }

    /// Qualified target name under the given aspect.
    ///
    /// With published interfaces disabled the interface aspect is the
    /// implementation name.
    pub fn qualified_name(&self, aspect: Aspect) -> &str {
        match aspect {
            Aspect::Interface => &self.names.interface,
            Aspect::Implementation => &self.names.implementation,
        }
    }

    pub fn simple_name(&self, aspect: Aspect) -> &str {
        let name = self.qualified_name(aspect);
        name.rsplit('.').next().unwrap_or(name)
    }

    pub fn package(&self, aspect: Aspect) -> &str {
        let name = self.qualified_name(aspect);
        name.rfind('.').map_or("", |idx| &name[..idx])
    }

    pub fn supertype(&self) -> Option<&SupertypeRef> {
        self.supertype.as_ref()
    }

    pub fn parent_key(&self) -> Option<&CacheKey> {
        self.supertype.as_ref().map(|s| &s.key)
    }

    /// Supertype node, looked up through the cache. `None` without supertype.
    pub fn parent_node(&self, cache: &ModelCache) -> Result<Option<Arc<ModelNode>>, ModelError> {
        match &self.supertype {
            Some(supertype) => cache
                .resolve_key(&supertype.key, &self.context)
                .map(Some),
            None => Ok(None),
        }
    }

    /// Generation references (empty unless this is a generational type).
    pub fn generations(&self) -> &[GenerationRef] {
        match &self.body {
            NodeBody::GenerationalType(node) => &node.generations,
            _ => &[],
        }
    }

    /// Generation sub-nodes, each cached under the generation's own identity.
    pub fn generation_nodes(&self, cache: &ModelCache) -> Result<Vec<Arc<ModelNode>>, ModelError> {
        self.generations()
            .iter()
            .map(|generation| cache.resolve_key(&generation.key, &self.context))
            .collect()
    }

    pub fn resolved_attributes(&self) -> &[ResolvedAttribute] {
        &self.resolved().attributes
    }

    pub fn resolved_columns(&self) -> &[ResolvedColumn] {
        &self.resolved().columns
    }

    pub fn resolved_associations(&self) -> &[ResolvedAssociation] {
        &self.resolved().associations
    }

    /// Node-local diagnostics (unresolved datatypes and references).
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.resolved().diagnostics
    }

    fn resolved(&self) -> &Resolved {
        self.resolved.get_or_init(|| {
            resolve::resolve(
                &self.declaring,
                &self.body,
                &self.context,
                self.store.as_ref(),
            )
        })
    }
}
