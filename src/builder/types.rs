//! Policy and product type builders: implementation class and published interface.

use crate::builder::java::{package_dir, source_path, string_literal, JavaFile};
use crate::builder::{
    names_of, ArtefactBuilder, BuildScope, BuilderOutput, PUBLISHED_INTERFACE, TYPE_IMPLEMENTATION,
};
use crate::context::{capitalize, GenerationContext};
use crate::datatype::LanguageVariant;
use crate::emit::{Artifact, ArtifactPrefix};
use crate::error::BuildError;
use crate::node::{default_kind, Aspect, ModelNode, NodeBody, ResolvedAssociation, ResolvedAttribute, TypeNode};
use crate::source::{split_qualified_name, DeletedObject, SourceKind, SourceObject};
use std::sync::Arc;

const VISITOR_INTERFACE: &str = "org.modelgen.runtime.IModelObjectVisitor";

pub(crate) fn type_node(node: &ModelNode) -> Option<&TypeNode> {
    match node.body() {
        NodeBody::Type(ty) => Some(ty),
        NodeBody::GenerationalType(generational) => Some(&generational.ty),
        _ => None,
    }
}

/// Attributes held by the type itself.
///
/// Once a product type has generations, attributes changing over time move to
/// the generation classes.
pub(crate) fn type_level_attributes(node: &ModelNode) -> Vec<&ResolvedAttribute> {
    let has_generations = !node.generations().is_empty();
    node.resolved_attributes()
        .iter()
        .filter(|a| !(has_generations && a.def.changing_over_time))
        .collect()
}

/// Field initializer: the default value converted by the descriptor, else its null.
pub(crate) fn initializer(file: &mut JavaFile, attribute: &ResolvedAttribute, value: Option<&str>) -> String {
    match value.or(attribute.def.default_value.as_deref()) {
        Some(value) => {
            // value_of templates refer to the class by simple name
            file.import(&attribute.descriptor.class_name);
            attribute.descriptor.value_of_expr(&string_literal(value))
        }
        None => attribute.descriptor.null_expression.clone(),
    }
}

fn association_type(file: &mut JavaFile, association: &ResolvedAssociation) -> String {
    let element = match &association.target {
        Some(names) => file.import(&names.interface),
        None => "Object".to_string(),
    };
    if association.def.is_to_many() {
        format!("{}<{}>", file.import("java.util.List"), element)
    } else {
        element
    }
}

fn association_element(file: &mut JavaFile, association: &ResolvedAssociation) -> String {
    match &association.target {
        Some(names) => file.import(&names.interface),
        None => "Object".to_string(),
    }
}

/// Null-safe inequality for the delta support methods.
fn differs(variant: LanguageVariant, file: &mut JavaFile, field: &str) -> String {
    match variant {
        LanguageVariant::Java8 => {
            let objects = file.import("java.util.Objects");
            format!("!{}.equals({}, other.{})", objects, field, field)
        }
        LanguageVariant::Java5 => format!(
            "({f} == null ? other.{f} != null : !{f}.equals(other.{f}))",
            f = field
        ),
    }
}

fn link_member(context: &GenerationContext, link_interface: &str) -> (String, String) {
    let (_, simple) = split_qualified_name(link_interface);
    let prefix = &context.naming().interface_prefix;
    let bare = simple
        .strip_prefix(prefix.as_str())
        .filter(|rest| !rest.is_empty() && context.features().published_interfaces)
        .unwrap_or(simple);
    let field = context.naming().member_name(&lower_first(bare));
    let getter = format!("get{}", capitalize(&field));
    (field, getter)
}

fn lower_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Builds the implementation class of policy and product types
pub struct TypeImplementationBuilder;

impl TypeImplementationBuilder {
    fn render(&self, context: &GenerationContext, node: &ModelNode) -> String {
        let features = context.features();
        let published = features.published_interfaces;
        let package = node.package(Aspect::Implementation).to_string();
        let simple = node.simple_name(Aspect::Implementation).to_string();
        let mut file = JavaFile::new(context, &package, node.source().qualified_name());
        let ty = type_node(node);
        let is_abstract = ty.map_or(false, |t| t.is_abstract);

        let mut header = format!(
            "public {}class {}",
            if is_abstract { "abstract " } else { "" },
            simple
        );
        if let Some(supertype) = node.supertype() {
            let parent = file.import(&supertype.names.implementation);
            header.push_str(&format!(" extends {}", parent));
        }
        if published {
            let interface = file.import(node.qualified_name(Aspect::Interface));
            header.push_str(&format!(" implements {}", interface));
        }

        let attributes = type_level_attributes(node);
        let associations = node.resolved_associations();
        let link = ty
            .and_then(|t| t.configuration_link.as_ref())
            .map(|names| (file.import(&names.interface), link_member(context, &names.interface)));

        for annotation in file.type_annotations() {
            file.body.line(annotation);
        }
        file.body.open(header);

        if !published {
            for attribute in &attributes {
                file.body.line(format!(
                    "public static final String {} = {};",
                    attribute.constant,
                    string_literal(&attribute.def.name)
                ));
            }
            file.body.blank();
        }

        if let NodeBody::GenerationalType(generational) = node.body() {
            if !generational.generations.is_empty() {
                let dates: Vec<String> = generational
                    .generations
                    .iter()
                    .map(|g| string_literal(&g.valid_from.format("%Y-%m-%d").to_string()))
                    .collect();
                file.body.line(format!(
                    "public static final String[] GENERATION_VALID_FROM = {{ {} }};",
                    dates.join(", ")
                ));
                file.body.blank();
            }
        }

        for attribute in &attributes {
            let class = file.import(&attribute.descriptor.class_name);
            let init = initializer(&mut file, attribute, None);
            file.body
                .line(format!("private {} {} = {};", class, attribute.field, init));
        }
        for association in associations {
            let ty = association_type(&mut file, association);
            if association.def.is_to_many() {
                let element = association_element(&mut file, association);
                let init = file.new_list(&element);
                file.body
                    .line(format!("private {} {} = {};", ty, association.field, init));
            } else {
                file.body.line(format!("private {} {};", ty, association.field));
            }
        }
        if let Some((link_type, (field, _))) = &link {
            file.body.line(format!("private {} {};", link_type, field));
        }
        file.body.blank();

        file.body.open(format!("public {}()", simple));
        if node.supertype().is_some() {
            file.body.line("super();");
        }
        file.body.close().blank();

        for attribute in &attributes {
            let class = attribute.descriptor.simple_class_name().to_string();
            file.body
                .open(format!("public {} {}()", class, attribute.getter))
                .line(format!("return {};", attribute.field))
                .close()
                .blank();
            file.body
                .open(format!("public void {}({} newValue)", attribute.setter, class))
                .line(format!("this.{} = newValue;", attribute.field))
                .close()
                .blank();
        }

        for association in associations {
            let ty = association_type(&mut file, association);
            file.body
                .open(format!("public {} {}()", ty, association.getter))
                .line(format!("return {};", association.field))
                .close()
                .blank();
            if association.def.is_to_many() {
                let element = association_element(&mut file, association);
                file.body
                    .open(format!(
                        "public void add{}({} target)",
                        capitalize(&association.field),
                        element
                    ))
                    .line(format!("{}.add(target);", association.field))
                    .close()
                    .blank();
            } else {
                file.body
                    .open(format!(
                        "public void set{}({} target)",
                        capitalize(&association.field),
                        ty
                    ))
                    .line(format!("this.{} = target;", association.field))
                    .close()
                    .blank();
            }
        }

        if let Some((link_type, (field, getter))) = &link {
            file.body
                .open(format!("public {} {}()", link_type, getter))
                .line(format!("return {};", field))
                .close()
                .blank();
        }

        if features.copy_support {
            if !is_abstract {
                file.body
                    .open(format!("public {} newCopy()", simple))
                    .line(format!("{} copy = new {}();", simple, simple))
                    .line("copyProperties(copy);")
                    .line("return copy;")
                    .close()
                    .blank();
            }
            file.body.open(format!("protected void copyProperties({} copy)", simple));
            if node.supertype().is_some() {
                file.body.line("super.copyProperties(copy);");
            }
            for attribute in &attributes {
                file.body
                    .line(format!("copy.{f} = {f};", f = attribute.field));
            }
            for association in associations {
                if association.def.is_to_many() {
                    file.body
                        .line(format!("copy.{f}.addAll({f});", f = association.field));
                } else {
                    file.body
                        .line(format!("copy.{f} = {f};", f = association.field));
                }
            }
            file.body.close().blank();
        }

        if features.delta_support {
            file.body
                .open(format!("public boolean differsFrom({} other)", simple));
            if node.supertype().is_some() {
                file.body.open("if (super.differsFrom(other))").line("return true;").close();
            }
            let comparisons: Vec<String> = attributes
                .iter()
                .map(|a| differs(context.variant(), &mut file, &a.field))
                .collect();
            if comparisons.is_empty() {
                file.body.line("return false;");
            } else {
                file.body.line(format!("return {};", comparisons.join("\n        || ")));
            }
            file.body.close().blank();
        }

        if features.visitor_support {
            let visitor = file.import(VISITOR_INTERFACE);
            file.body
                .open(format!("public boolean accept({} visitor)", visitor))
                .line("return visitor.visit(this);")
                .close()
                .blank();
        }

        file.body.close();
        file.render()
    }
}

impl ArtefactBuilder for TypeImplementationBuilder {
    fn id(&self) -> &'static str {
        TYPE_IMPLEMENTATION
    }

    fn accepts(&self, kind: SourceKind) -> bool {
        kind.is_type()
    }

    fn is_internal(&self) -> bool {
        true
    }

    fn build(
        &self,
        scope: &mut BuildScope<'_>,
        object: &Arc<SourceObject>,
    ) -> Result<Vec<Artifact>, BuildError> {
        let node = scope.node(object, default_kind(object.kind()))?;
        let path = source_path(node.qualified_name(Aspect::Implementation));
        let content = self.render(scope.context, &node);

        scope.outputs.publish(
            TYPE_IMPLEMENTATION,
            object.id(),
            BuilderOutput {
                names: node.names().clone(),
                paths: vec![path.clone()],
            },
        );

        Ok(vec![Artifact {
            path,
            content,
            derived: self.is_derived(),
            builder: self.id().to_string(),
            source: Some(object.id()),
        }])
    }

    fn delete(&self, context: &GenerationContext, object: &DeletedObject) -> Vec<ArtifactPrefix> {
        if !object.kind.is_type() {
            return Vec::new();
        }
        let names = names_of(context, &object.qualified_name);
        let (package, simple) = split_qualified_name(&names.implementation);
        vec![ArtifactPrefix::exact(package_dir(package), simple)]
    }
}

/// Builds the published interface of policy and product types.
///
/// Emits nothing when published interfaces are disabled; the implementation
/// then carries the single name.
pub struct PublishedInterfaceBuilder;

impl PublishedInterfaceBuilder {
    fn render_type(&self, context: &GenerationContext, node: &ModelNode) -> String {
        let package = node.package(Aspect::Interface).to_string();
        let simple = node.simple_name(Aspect::Interface).to_string();
        let mut file = JavaFile::new(context, &package, node.source().qualified_name());

        let mut header = format!("public interface {}", simple);
        if let Some(supertype) = node.supertype() {
            let parent = file.import(&supertype.names.interface);
            header.push_str(&format!(" extends {}", parent));
        }
        for annotation in file.type_annotations() {
            file.body.line(annotation);
        }
        file.body.open(header);

        let attributes = type_level_attributes(node);
        for attribute in &attributes {
            file.body.line(format!(
                "String {} = {};",
                attribute.constant,
                string_literal(&attribute.def.name)
            ));
        }
        file.body.blank();

        for attribute in &attributes {
            let class = file.import(&attribute.descriptor.class_name);
            file.body
                .line(format!("{} {}();", class, attribute.getter))
                .blank()
                .line(format!("void {}({} newValue);", attribute.setter, class))
                .blank();
        }
        for association in node.resolved_associations() {
            let ty = association_type(&mut file, association);
            file.body
                .line(format!("{} {}();", ty, association.getter))
                .blank();
        }
        if let Some(link) = type_node(node).and_then(|t| t.configuration_link.as_ref()) {
            let link_type = file.import(&link.interface);
            let (_, getter) = link_member(context, &link.interface);
            file.body.line(format!("{} {}();", link_type, getter)).blank();
        }

        file.body.close();
        file.render()
    }

    fn render_generation_interface(
        &self,
        context: &GenerationContext,
        node: &ModelNode,
        interface: &str,
    ) -> String {
        let (package, simple) = split_qualified_name(interface);
        let mut file = JavaFile::new(context, package, node.source().qualified_name());
        for annotation in file.type_annotations() {
            file.body.line(annotation);
        }
        file.body.open(format!("public interface {}", simple));
        let owner = file.import(node.qualified_name(Aspect::Interface));
        file.body.line(format!("{} getOwner();", owner)).blank();
        for attribute in node
            .resolved_attributes()
            .iter()
            .filter(|a| a.def.changing_over_time)
        {
            let class = file.import(&attribute.descriptor.class_name);
            file.body
                .line(format!("{} {}();", class, attribute.getter))
                .blank();
        }
        file.body.close();
        file.render()
    }
}

impl ArtefactBuilder for PublishedInterfaceBuilder {
    fn id(&self) -> &'static str {
        PUBLISHED_INTERFACE
    }

    fn accepts(&self, kind: SourceKind) -> bool {
        kind.is_type()
    }

    fn is_internal(&self) -> bool {
        false
    }

    fn build(
        &self,
        scope: &mut BuildScope<'_>,
        object: &Arc<SourceObject>,
    ) -> Result<Vec<Artifact>, BuildError> {
        if !scope.context.features().published_interfaces {
            return Ok(Vec::new());
        }
        let node = scope.node(object, default_kind(object.kind()))?;
        let mut artifacts = vec![Artifact {
            path: source_path(node.qualified_name(Aspect::Interface)),
            content: self.render_type(scope.context, &node),
            derived: self.is_derived(),
            builder: self.id().to_string(),
            source: Some(object.id()),
        }];

        if let Some(generation) = node.generation_nodes(scope.cache)?.first() {
            let interface = generation.qualified_name(Aspect::Interface).to_string();
            artifacts.push(Artifact {
                path: source_path(&interface),
                content: self.render_generation_interface(scope.context, &node, &interface),
                derived: self.is_derived(),
                builder: self.id().to_string(),
                source: Some(object.id()),
            });
        }

        scope.outputs.publish(
            PUBLISHED_INTERFACE,
            object.id(),
            BuilderOutput {
                names: node.names().clone(),
                paths: artifacts.iter().map(|a| a.path.clone()).collect(),
            },
        );
        Ok(artifacts)
    }

    fn delete(&self, context: &GenerationContext, object: &DeletedObject) -> Vec<ArtifactPrefix> {
        if !object.kind.is_type() || !context.features().published_interfaces {
            return Vec::new();
        }
        let names = names_of(context, &object.qualified_name);
        let (package, simple) = split_qualified_name(&names.interface);
        let mut prefixes = vec![ArtifactPrefix::exact(package_dir(package), simple)];
        if object.kind == SourceKind::ProductType {
            let generation_interface = format!("{}{}", simple, context.naming().generation_suffix);
            prefixes.push(ArtifactPrefix::exact(package_dir(package), &generation_interface));
        }
        prefixes
    }
}
