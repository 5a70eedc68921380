//! Lazy resolution of a node's derived collections.

use crate::context::{join_package, AspectNames, GenerationContext};
use crate::datatype::DatatypeDescriptor;
use crate::diagnostics::Diagnostic;
use crate::node::NodeBody;
use crate::source::{
    AssociationDef, AttributeDef, ColumnDef, ModelStore, SourceKind, SourceObject, SourceProperties,
};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct ResolvedAttribute {
    pub def: AttributeDef,
    pub field: String,
    pub getter: String,
    pub setter: String,
    /// Name of the `PROPERTY_*` constant
    pub constant: String,
    pub descriptor: Arc<DatatypeDescriptor>,
}

#[derive(Debug, Clone)]
pub struct ResolvedColumn {
    pub def: ColumnDef,
    pub field: String,
    pub getter: String,
    pub descriptor: Arc<DatatypeDescriptor>,
}

#[derive(Debug, Clone)]
pub struct ResolvedAssociation {
    pub def: AssociationDef,
    pub field: String,
    pub getter: String,
    /// None when the target is not a known type
    pub target: Option<AspectNames>,
}

#[derive(Debug, Default)]
pub(crate) struct Resolved {
    pub attributes: Vec<ResolvedAttribute>,
    pub columns: Vec<ResolvedColumn>,
    pub associations: Vec<ResolvedAssociation>,
    pub diagnostics: Vec<Diagnostic>,
}

pub(crate) fn resolve(
    declaring: &SourceObject,
    body: &NodeBody,
    context: &GenerationContext,
    store: &dyn ModelStore,
) -> Resolved {
    let mut resolved = Resolved::default();
    let naming = context.naming();

    let attributes: Vec<&AttributeDef> = match (body, declaring.properties()) {
        (NodeBody::Type(_) | NodeBody::GenerationalType(_), SourceProperties::Type(props)) => {
            props.attributes.iter().collect()
        }
        (NodeBody::Generation(_), SourceProperties::Type(props)) => props
            .attributes
            .iter()
            .filter(|a| a.changing_over_time)
            .collect(),
        (NodeBody::Enum(_), SourceProperties::Enum(props)) => props.attributes.iter().collect(),
        _ => Vec::new(),
    };

    for def in attributes {
        let descriptor = resolve_datatype(
            declaring,
            &def.name,
            &def.datatype,
            context,
            store,
            &mut resolved.diagnostics,
        );
        resolved.attributes.push(ResolvedAttribute {
            def: def.clone(),
            field: naming.member_name(&def.name),
            getter: naming.getter_name(&def.name),
            setter: naming.setter_name(&def.name),
            constant: format!("PROPERTY_{}", naming.constant_name(&def.name)),
            descriptor,
        });
    }

    if let (NodeBody::Table(_), SourceProperties::Table(props)) = (body, declaring.properties()) {
        for def in &props.columns {
            let descriptor = resolve_datatype(
                declaring,
                &def.name,
                &def.datatype,
                context,
                store,
                &mut resolved.diagnostics,
            );
            resolved.columns.push(ResolvedColumn {
                def: def.clone(),
                field: naming.member_name(&def.name),
                getter: naming.getter_name(&def.name),
                descriptor,
            });
        }
    }

    if let (NodeBody::Type(_) | NodeBody::GenerationalType(_), SourceProperties::Type(props)) =
        (body, declaring.properties())
    {
        for def in &props.associations {
            let target = match store.find(&def.target) {
                Ok(Some(target)) if target.kind().is_type() => {
                    Some(context.type_names(target.package(), target.name()))
                }
                _ => {
                    resolved.diagnostics.push(Diagnostic::unresolved_reference(
                        declaring.id(),
                        declaring.qualified_name(),
                        &def.name,
                        &def.target,
                    ));
                    None
                }
            };
            resolved.associations.push(ResolvedAssociation {
                def: def.clone(),
                field: naming.member_name(&def.name),
                getter: naming.getter_name(&def.name),
                target,
            });
        }
    }

    resolved
}

/// Registry first, then model enum types, then the generic fallback.
fn resolve_datatype(
    declaring: &SourceObject,
    property: &str,
    datatype: &str,
    context: &GenerationContext,
    store: &dyn ModelStore,
    diagnostics: &mut Vec<Diagnostic>,
) -> Arc<DatatypeDescriptor> {
    let resolution = context.datatypes().resolve(datatype);
    if !resolution.fallback {
        return resolution.descriptor;
    }

    if let Ok(Some(target)) = store.find(datatype) {
        if target.kind() == SourceKind::EnumType {
            return Arc::new(enum_descriptor(context, &target));
        }
    }

    diagnostics.push(Diagnostic::unresolved_datatype(
        declaring.id(),
        declaring.qualified_name(),
        property,
        datatype,
    ));
    resolution.descriptor
}

fn enum_descriptor(context: &GenerationContext, target: &SourceObject) -> DatatypeDescriptor {
    let class_name = join_package(&context.target_package(target.package()), target.name());
    DatatypeDescriptor {
        datatype: target.qualified_name().to_string(),
        value_of: format!("{}.getValueById({{value}})", target.name()),
        to_string: "{value}.getId()".to_string(),
        null_expression: "null".to_string(),
        generic: false,
        class_name,
    }
}
