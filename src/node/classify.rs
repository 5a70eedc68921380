use crate::error::ModelError;
use crate::node::NodeKind;
use crate::source::{SourceKind, SourceObject};

/// Decide whether `source` can be viewed as `requested`.
///
/// This is the only place mapping source kinds onto node variants; every cache
/// miss goes through it before a constructor runs.
pub fn classify(source: &SourceObject, requested: NodeKind) -> Result<NodeKind, ModelError> {
    let accepted = matches!(
        (source.kind(), requested),
        (SourceKind::PolicyType | SourceKind::ProductType, NodeKind::Type)
            | (SourceKind::ProductType, NodeKind::GenerationalType)
            | (SourceKind::Generation, NodeKind::Generation)
            | (SourceKind::TableStructure, NodeKind::Table)
            | (SourceKind::EnumType, NodeKind::Enum)
    );
    if accepted {
        Ok(requested)
    } else {
        Err(ModelError::KindMismatch {
            qualified_name: source.qualified_name().to_string(),
            kind: source.kind().to_string(),
            requested: requested.to_string(),
        })
    }
}

/// Node kind builders use when they do not need a specific view.
pub fn default_kind(kind: SourceKind) -> NodeKind {
    match kind {
        SourceKind::PolicyType => NodeKind::Type,
        SourceKind::ProductType => NodeKind::GenerationalType,
        SourceKind::Generation => NodeKind::Generation,
        SourceKind::TableStructure => NodeKind::Table,
        SourceKind::EnumType => NodeKind::Enum,
    }
}
