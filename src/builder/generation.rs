//! Generation builder: one implementation class per time generation of a
//! product type.
//!
//! Reads the owner's implementation name published by the type builder in
//! the same pass; the generation classes call the owner's constructor.

use crate::builder::java::{package_dir, source_path, JavaFile};
use crate::builder::types::initializer;
use crate::builder::{names_of, ArtefactBuilder, BuildScope, BuilderOutput, GENERATION, TYPE_IMPLEMENTATION};
use crate::context::GenerationContext;
use crate::emit::{Artifact, ArtifactPrefix, GENERATION_SUFFIX_FORMAT};
use crate::error::BuildError;
use crate::node::{Aspect, ModelNode, NodeBody, NodeKind};
use crate::source::{split_qualified_name, DeletedObject, SourceKind, SourceObject};
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::debug;

pub struct GenerationBuilder;

const DEPENDENCIES: &[&str] = &[TYPE_IMPLEMENTATION];

impl GenerationBuilder {
    fn render(
        &self,
        context: &GenerationContext,
        generation: &ModelNode,
        owner_implementation: &str,
    ) -> Result<String, BuildError> {
        let body = match generation.body() {
            NodeBody::Generation(body) => body,
            _ => {
                return Err(BuildError::execution(
                    GENERATION,
                    generation.source().qualified_name(),
                    "not a generation node",
                ))
            }
        };
        let values = generation
            .source()
            .generation_properties()
            .map(|props| props.values.clone())
            .unwrap_or_default();

        let package = generation.package(Aspect::Implementation).to_string();
        let simple = generation.simple_name(Aspect::Implementation).to_string();
        let mut file = JavaFile::new(context, &package, generation.source().qualified_name());
        let owner = file.import(owner_implementation);

        let mut header = format!("public class {}", simple);
        if context.features().published_interfaces {
            let interface = file.import(generation.qualified_name(Aspect::Interface));
            header.push_str(&format!(" implements {}", interface));
        }
        for annotation in file.type_annotations() {
            file.body.line(annotation);
        }
        file.body.open(header);

        file.body
            .line(format!(
                "public static final String VALID_FROM = \"{}\";",
                body.valid_from.format("%Y-%m-%d")
            ))
            .blank()
            .line(format!("private final {} owner;", owner));

        let attributes = generation.resolved_attributes();
        for attribute in attributes {
            let class = file.import(&attribute.descriptor.class_name);
            let init = initializer(
                &mut file,
                attribute,
                values.get(&attribute.def.name).map(String::as_str),
            );
            file.body
                .line(format!("private {} {} = {};", class, attribute.field, init));
        }
        file.body.blank();

        file.body
            .open(format!("public {}({} owner)", simple, owner))
            .line("this.owner = owner;")
            .close()
            .blank();
        file.body
            .open(format!("public static {} createWithNewOwner()", simple))
            .line(format!("return new {}(new {}());", simple, owner))
            .close()
            .blank();
        file.body
            .open(format!("public {} getOwner()", owner))
            .line("return owner;")
            .close()
            .blank();

        for attribute in attributes {
            let class = attribute.descriptor.simple_class_name().to_string();
            file.body
                .open(format!("public {} {}()", class, attribute.getter))
                .line(format!("return {};", attribute.field))
                .close()
                .blank();
        }

        file.body.close();
        Ok(file.render())
    }
}

impl ArtefactBuilder for GenerationBuilder {
    fn id(&self) -> &'static str {
        GENERATION
    }

    /// Product types, plus deleted generations for cleanup.
    fn accepts(&self, kind: SourceKind) -> bool {
        matches!(kind, SourceKind::ProductType | SourceKind::Generation)
    }

    fn depends_on(&self) -> &[&'static str] {
        DEPENDENCIES
    }

    fn is_internal(&self) -> bool {
        true
    }

    fn build(
        &self,
        scope: &mut BuildScope<'_>,
        object: &Arc<SourceObject>,
    ) -> Result<Vec<Artifact>, BuildError> {
        if object.kind() != SourceKind::ProductType {
            return Ok(Vec::new());
        }
        let node = scope.node(object, NodeKind::GenerationalType)?;
        if node.generations().is_empty() {
            return Ok(Vec::new());
        }

        let owner_implementation = scope
            .outputs
            .get(TYPE_IMPLEMENTATION, &object.id())
            .map(|output| output.names.implementation.clone())
            .ok_or_else(|| {
                BuildError::execution(
                    GENERATION,
                    object.qualified_name(),
                    "owner implementation was not built in this pass",
                )
            })?;

        let mut artifacts = Vec::new();
        for generation in node.generation_nodes(scope.cache)? {
            scope
                .diagnostics
                .extend(generation.diagnostics().iter().cloned());
            let content = self.render(scope.context, &generation, &owner_implementation)?;
            artifacts.push(Artifact {
                path: source_path(generation.qualified_name(Aspect::Implementation)),
                content,
                derived: self.is_derived(),
                builder: self.id().to_string(),
                source: Some(object.id()),
            });
        }
        debug!(
            owner = %object.qualified_name(),
            generations = artifacts.len(),
            "Built generations"
        );

        scope.outputs.publish(
            GENERATION,
            object.id(),
            BuilderOutput {
                names: node.names().clone(),
                paths: artifacts.iter().map(|a| a.path.clone()).collect(),
            },
        );
        Ok(artifacts)
    }

    /// A deleted product type takes every dated generation class with it; a
    /// deleted generation only its own class.
    fn delete(&self, context: &GenerationContext, object: &DeletedObject) -> Vec<ArtifactPrefix> {
        let suffix = &context.naming().generation_suffix;
        match object.kind {
            SourceKind::ProductType => {
                let names = names_of(context, &object.qualified_name);
                let (package, simple) = split_qualified_name(&names.implementation);
                vec![ArtifactPrefix::generations_of(
                    package_dir(package),
                    &format!("{}{}", simple, suffix),
                )]
            }
            SourceKind::Generation => {
                // generation names are `<owner>@<yyyy-mm-dd>`
                let Some((owner, date)) = object.qualified_name.rsplit_once('@') else {
                    return Vec::new();
                };
                let Ok(valid_from) = NaiveDate::parse_from_str(date, "%Y-%m-%d") else {
                    return Vec::new();
                };
                let names = names_of(context, owner);
                let (package, simple) = split_qualified_name(&names.implementation);
                vec![ArtifactPrefix::exact(
                    package_dir(package),
                    &format!(
                        "{}{}_{}",
                        simple,
                        suffix,
                        valid_from.format(GENERATION_SUFFIX_FORMAT)
                    ),
                )]
            }
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{BuildOutputs, TypeImplementationBuilder};
    use crate::cache::ModelCache;
    use crate::context::ContextSettings;
    use crate::diagnostics::Diagnostics;
    use crate::source::{AttributeDef, InMemoryModelStore, TypeProperties};
    use std::path::PathBuf;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn product_store() -> (Arc<InMemoryModelStore>, Arc<SourceObject>) {
        let store = Arc::new(InMemoryModelStore::new());
        let mut rate = AttributeDef::new("rate", "Decimal");
        rate.changing_over_time = true;
        let props = TypeProperties {
            attributes: vec![AttributeDef::new("name", "String"), rate],
            ..TypeProperties::default()
        };
        let product = store
            .insert_with_generations(
                SourceObject::product_type("motor.Product", props),
                &[date(2025, 1, 1), date(2024, 1, 1)],
            )
            .unwrap();
        (store, product)
    }

    #[test]
    fn test_one_artifact_per_generation_after_owner() {
        let (store, product) = product_store();
        let cache = ModelCache::new(store);
        let context = GenerationContext::with_builtin_datatypes(ContextSettings::new("demo"));
        let mut outputs = BuildOutputs::new();
        let mut diagnostics = Diagnostics::new();
        let mut scope = BuildScope {
            cache: &cache,
            context: &context,
            outputs: &mut outputs,
            diagnostics: &mut diagnostics,
        };

        TypeImplementationBuilder.build(&mut scope, &product).unwrap();
        let artifacts = GenerationBuilder.build(&mut scope, &product).unwrap();
        let paths: Vec<PathBuf> = artifacts.iter().map(|a| a.path.clone()).collect();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("motor/internal/ProductGen_20240101.java"),
                PathBuf::from("motor/internal/ProductGen_20250101.java"),
            ]
        );
        assert!(artifacts[0].content.contains("public ProductGen_20240101(Product owner)"));
        assert!(artifacts[0].content.contains("implements IProductGen"));
        assert!(artifacts[0].content.contains("getRate()"));
        assert!(!artifacts[0].content.contains("getName()"));
    }

    #[test]
    fn test_missing_owner_output_is_an_execution_error() {
        let (store, product) = product_store();
        let cache = ModelCache::new(store);
        let context = GenerationContext::with_builtin_datatypes(ContextSettings::new("demo"));
        let mut outputs = BuildOutputs::new();
        let mut diagnostics = Diagnostics::new();
        let mut scope = BuildScope {
            cache: &cache,
            context: &context,
            outputs: &mut outputs,
            diagnostics: &mut diagnostics,
        };
        assert!(matches!(
            GenerationBuilder.build(&mut scope, &product),
            Err(BuildError::BuilderExecution { .. })
        ));
    }

    #[test]
    fn test_delete_prefixes() {
        let context = GenerationContext::with_builtin_datatypes(ContextSettings::new("demo"));
        let product = DeletedObject {
            id: crate::types::StableId::derive("product-type", "motor.Product"),
            kind: SourceKind::ProductType,
            qualified_name: "motor.Product".to_string(),
        };
        assert_eq!(
            GenerationBuilder.delete(&context, &product),
            vec![ArtifactPrefix::generations_of("motor/internal", "ProductGen")]
        );

        let generation = DeletedObject {
            id: crate::types::StableId::for_generation("motor.Product", date(2024, 1, 1)),
            kind: SourceKind::Generation,
            qualified_name: "motor.Product@2024-01-01".to_string(),
        };
        assert_eq!(
            GenerationBuilder.delete(&context, &generation),
            vec![ArtifactPrefix::exact("motor/internal", "ProductGen_20240101")]
        );
    }
}
