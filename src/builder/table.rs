//! Table structure builder: a table class plus its row class.

use crate::builder::java::{package_dir, source_path, JavaFile};
use crate::builder::{ArtefactBuilder, BuildScope, BuilderOutput, TABLE};
use crate::context::{capitalize, join_package, GenerationContext};
use crate::emit::{Artifact, ArtifactPrefix};
use crate::error::BuildError;
use crate::node::{Aspect, ModelNode, NodeBody, NodeKind, ResolvedColumn};
use crate::source::{split_qualified_name, DeletedObject, SourceKind, SourceObject};
use std::sync::Arc;

pub struct TableBuilder;

impl TableBuilder {
    fn render_row(&self, context: &GenerationContext, node: &ModelNode, row_class: &str) -> String {
        let package = node.package(Aspect::Implementation).to_string();
        let mut file = JavaFile::new(context, &package, node.source().qualified_name());
        let columns = node.resolved_columns();

        for annotation in file.type_annotations() {
            file.body.line(annotation);
        }
        file.body.open(format!("public final class {}", row_class));
        for column in columns {
            let class = file.import(&column.descriptor.class_name);
            file.body.line(format!("private final {} {};", class, column.field));
        }
        file.body.blank();

        let params: Vec<String> = columns
            .iter()
            .map(|c| format!("{} {}", c.descriptor.simple_class_name(), c.field))
            .collect();
        file.body.open(format!("public {}({})", row_class, params.join(", ")));
        for column in columns {
            file.body.line(format!("this.{f} = {f};", f = column.field));
        }
        file.body.close().blank();

        for column in columns {
            file.body
                .open(format!(
                    "public {} {}()",
                    column.descriptor.simple_class_name(),
                    column.getter
                ))
                .line(format!("return {};", column.field))
                .close()
                .blank();
        }
        file.body.close();
        file.render()
    }

    fn render_table(
        &self,
        context: &GenerationContext,
        node: &ModelNode,
        row_class: &str,
        unique_keys: &[Vec<String>],
    ) -> String {
        let package = node.package(Aspect::Implementation).to_string();
        let simple = node.simple_name(Aspect::Implementation).to_string();
        let mut file = JavaFile::new(context, &package, node.source().qualified_name());
        let list = file.import("java.util.List");
        let rows_init = file.new_list(row_class);

        for annotation in file.type_annotations() {
            file.body.line(annotation);
        }
        file.body.open(format!("public class {}", simple));
        file.body
            .line(format!("private final {}<{}> rows = {};", list, row_class, rows_init))
            .blank();
        file.body
            .open(format!("public void addRow({} row)", row_class))
            .line("rows.add(row);")
            .close()
            .blank();
        file.body
            .open(format!("public {}<{}> getRows()", list, row_class))
            .line("return rows;")
            .close()
            .blank();

        let columns = node.resolved_columns();
        for key in unique_keys {
            let key_columns: Vec<&ResolvedColumn> = key
                .iter()
                .filter_map(|name| columns.iter().find(|c| c.def.name == *name))
                .collect();
            if key_columns.is_empty() {
                continue;
            }
            let method: String = key_columns
                .iter()
                .map(|c| capitalize(&c.field))
                .collect();
            let params: Vec<String> = key_columns
                .iter()
                .map(|c| format!("{} {}", file.import(&c.descriptor.class_name), c.field))
                .collect();
            let condition: Vec<String> = key_columns
                .iter()
                .map(|c| format!("{f}.equals(row.{g}())", f = c.field, g = c.getter))
                .collect();
            file.body
                .open(format!(
                    "public {} findRowBy{}({})",
                    row_class,
                    method,
                    params.join(", ")
                ))
                .open(format!("for ({} row : rows)", row_class))
                .open(format!("if ({})", condition.join(" && ")))
                .line("return row;")
                .close()
                .close()
                .line("return null;")
                .close()
                .blank();
        }

        file.body.close();
        file.render()
    }
}

impl ArtefactBuilder for TableBuilder {
    fn id(&self) -> &'static str {
        TABLE
    }

    fn accepts(&self, kind: SourceKind) -> bool {
        kind == SourceKind::TableStructure
    }

    fn is_internal(&self) -> bool {
        false
    }

    fn build(
        &self,
        scope: &mut BuildScope<'_>,
        object: &Arc<SourceObject>,
    ) -> Result<Vec<Artifact>, BuildError> {
        let node = scope.node(object, NodeKind::Table)?;
        let (row_class, unique_keys) = match node.body() {
            NodeBody::Table(table) => (table.row_class.clone(), table.unique_keys.clone()),
            _ => {
                return Err(BuildError::execution(
                    TABLE,
                    object.qualified_name(),
                    "not a table node",
                ))
            }
        };
        let table_name = node.qualified_name(Aspect::Implementation).to_string();
        let row_name = join_package(node.package(Aspect::Implementation), &row_class);

        let artifacts = vec![
            Artifact {
                path: source_path(&table_name),
                content: self.render_table(scope.context, &node, &row_class, &unique_keys),
                derived: self.is_derived(),
                builder: self.id().to_string(),
                source: Some(object.id()),
            },
            Artifact {
                path: source_path(&row_name),
                content: self.render_row(scope.context, &node, &row_class),
                derived: self.is_derived(),
                builder: self.id().to_string(),
                source: Some(object.id()),
            },
        ];
        scope.outputs.publish(
            TABLE,
            object.id(),
            BuilderOutput {
                names: node.names().clone(),
                paths: artifacts.iter().map(|a| a.path.clone()).collect(),
            },
        );
        Ok(artifacts)
    }

    fn delete(&self, context: &GenerationContext, object: &DeletedObject) -> Vec<ArtifactPrefix> {
        if object.kind != SourceKind::TableStructure {
            return Vec::new();
        }
        let (package, simple) = split_qualified_name(&object.qualified_name);
        let directory = package_dir(&context.target_package(package));
        vec![
            ArtifactPrefix::exact(directory.clone(), simple),
            ArtifactPrefix::exact(directory, &format!("{}Row", simple)),
        ]
    }
}
