//! Enum type builder.

use crate::builder::java::{package_dir, source_path, string_literal, JavaFile};
use crate::builder::{ArtefactBuilder, BuildScope, BuilderOutput, ENUM};
use crate::context::GenerationContext;
use crate::emit::{Artifact, ArtifactPrefix};
use crate::error::BuildError;
use crate::node::{Aspect, ModelNode, NodeBody, NodeKind};
use crate::source::{split_qualified_name, DeletedObject, EnumValueDef, SourceKind, SourceObject};
use std::sync::Arc;

pub struct EnumBuilder;

impl EnumBuilder {
    fn constant(context: &GenerationContext, value: &EnumValueDef) -> String {
        let name = context.naming().constant_name(&value.id);
        match name.chars().next() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => name,
            _ => format!("V_{}", name),
        }
    }

    fn render(&self, context: &GenerationContext, node: &ModelNode, values: &[EnumValueDef]) -> String {
        let package = node.package(Aspect::Implementation).to_string();
        let simple = node.simple_name(Aspect::Implementation).to_string();
        let mut file = JavaFile::new(context, &package, node.source().qualified_name());
        let attributes = node.resolved_attributes();

        for annotation in file.type_annotations() {
            file.body.line(annotation);
        }
        file.body.open(format!("public enum {}", simple));

        for (index, value) in values.iter().enumerate() {
            let mut args = vec![string_literal(&value.id)];
            for attribute in attributes {
                let arg = match value.literals.get(&attribute.def.name) {
                    Some(literal) => {
                        file.import(&attribute.descriptor.class_name);
                        attribute.descriptor.value_of_expr(&string_literal(literal))
                    }
                    None => attribute.descriptor.null_expression.clone(),
                };
                args.push(arg);
            }
            let terminator = if index + 1 == values.len() { ";" } else { "," };
            file.body.line(format!(
                "{}({}){}",
                Self::constant(context, value),
                args.join(", "),
                terminator
            ));
        }
        if values.is_empty() {
            file.body.line(";");
        }
        file.body.blank();

        file.body.line("private final String id;");
        for attribute in attributes {
            let class = file.import(&attribute.descriptor.class_name);
            file.body
                .line(format!("private final {} {};", class, attribute.field));
        }
        file.body.blank();

        let mut params = vec!["String id".to_string()];
        params.extend(
            attributes
                .iter()
                .map(|a| format!("{} {}", a.descriptor.simple_class_name(), a.field)),
        );
        file.body
            .open(format!("{}({})", simple, params.join(", ")))
            .line("this.id = id;");
        for attribute in attributes {
            file.body.line(format!("this.{f} = {f};", f = attribute.field));
        }
        file.body.close().blank();

        file.body
            .open("public String getId()")
            .line("return id;")
            .close()
            .blank();
        for attribute in attributes {
            file.body
                .open(format!(
                    "public {} {}()",
                    attribute.descriptor.simple_class_name(),
                    attribute.getter
                ))
                .line(format!("return {};", attribute.field))
                .close()
                .blank();
        }

        file.body
            .open(format!("public static {} getValueById(String id)", simple))
            .open(format!("for ({} value : values())", simple))
            .open("if (value.id.equals(id))")
            .line("return value;")
            .close()
            .close()
            .line("return null;")
            .close();

        file.body.close();
        file.render()
    }
}

impl ArtefactBuilder for EnumBuilder {
    fn id(&self) -> &'static str {
        ENUM
    }

    fn accepts(&self, kind: SourceKind) -> bool {
        kind == SourceKind::EnumType
    }

    fn is_internal(&self) -> bool {
        false
    }

    fn build(
        &self,
        scope: &mut BuildScope<'_>,
        object: &Arc<SourceObject>,
    ) -> Result<Vec<Artifact>, BuildError> {
        let node = scope.node(object, NodeKind::Enum)?;
        let values = match node.body() {
            NodeBody::Enum(body) => body.values.clone(),
            _ => {
                return Err(BuildError::execution(
                    ENUM,
                    object.qualified_name(),
                    "not an enum node",
                ))
            }
        };
        let path = source_path(node.qualified_name(Aspect::Implementation));
        let content = self.render(scope.context, &node, &values);
        scope.outputs.publish(
            ENUM,
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
        if object.kind != SourceKind::EnumType {
            return Vec::new();
        }
        let (package, simple) = split_qualified_name(&object.qualified_name);
        vec![ArtifactPrefix::exact(
            package_dir(&context.target_package(package)),
            simple,
        )]
    }
}
