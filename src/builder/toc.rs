//! Table of contents builder.
//!
//! After every pass it writes `modelgen-toc.xml`, listing each generated type,
//! table and enum of the project with its target class names. The listing is
//! taken from the model store, so incremental passes keep it complete.

use crate::builder::{names_of, ArtefactBuilder, BuildScope, TOC};
use crate::context::{join_package, GenerationContext};
use crate::emit::{Artifact, ArtifactPrefix, GENERATION_SUFFIX_FORMAT};
use crate::error::BuildError;
use crate::source::{split_qualified_name, DeletedObject, KindFilter, SourceKind, SourceObject};
use crate::types::StableId;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fmt::Write;
use std::path::PathBuf;
use std::sync::Arc;

pub const TOC_STEM: &str = "modelgen-toc";

pub struct TocBuilder;

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

impl TocBuilder {
    pub fn path() -> PathBuf {
        PathBuf::from(format!("{}.xml", TOC_STEM))
    }

    fn render(&self, context: &GenerationContext, objects: &[Arc<SourceObject>]) -> String {
        let mut generations: BTreeMap<StableId, Vec<NaiveDate>> = BTreeMap::new();
        for object in objects {
            if let Some(props) = object.generation_properties() {
                generations.entry(props.owner).or_default().push(props.valid_from);
            }
        }

        let mut out = String::new();
        out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        let _ = writeln!(out, "<ModelToc project=\"{}\">", escape(context.project()));
        for object in objects {
            let kind = object.kind();
            match kind {
                SourceKind::PolicyType | SourceKind::ProductType => {
                    let names = names_of(context, object.qualified_name());
                    let dates = generations.get_mut(&object.id());
                    let open = if dates.is_some() { ">" } else { "/>" };
                    let _ = writeln!(
                        out,
                        "  <Type model=\"{}\" kind=\"{}\" implementation=\"{}\" interface=\"{}\"{}",
                        escape(object.qualified_name()),
                        kind,
                        escape(&names.implementation),
                        escape(&names.interface),
                        open
                    );
                    if let Some(dates) = dates {
                        dates.sort();
                        let (package, simple) = split_qualified_name(&names.implementation);
                        for date in dates.iter() {
                            let class = join_package(
                                package,
                                &format!(
                                    "{}{}_{}",
                                    simple,
                                    context.naming().generation_suffix,
                                    date.format(GENERATION_SUFFIX_FORMAT)
                                ),
                            );
                            let _ = writeln!(
                                out,
                                "    <Generation validFrom=\"{}\" implementation=\"{}\"/>",
                                date.format("%Y-%m-%d"),
                                escape(&class)
                            );
                        }
                        out.push_str("  </Type>\n");
                    }
                }
                SourceKind::TableStructure | SourceKind::EnumType => {
                    let (package, simple) = split_qualified_name(object.qualified_name());
                    let class = join_package(&context.target_package(package), simple);
                    let element = if kind == SourceKind::TableStructure {
                        "Table"
                    } else {
                        "Enum"
                    };
                    let _ = writeln!(
                        out,
                        "  <{} model=\"{}\" implementation=\"{}\"/>",
                        element,
                        escape(object.qualified_name()),
                        escape(&class)
                    );
                }
                SourceKind::Generation => {}
            }
        }
        out.push_str("</ModelToc>\n");
        out
    }
}

impl ArtefactBuilder for TocBuilder {
    fn id(&self) -> &'static str {
        TOC
    }

    /// Works in the after-build phase only.
    fn accepts(&self, _kind: SourceKind) -> bool {
        false
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

    fn after_build(&self, scope: &mut BuildScope<'_>) -> Result<Vec<Artifact>, BuildError> {
        // the store lists in qualified-name order
        let objects = scope.cache.store().list(&KindFilter::All)?;
        Ok(vec![Artifact {
            path: Self::path(),
            content: self.render(scope.context, &objects),
            derived: self.is_derived(),
            builder: self.id().to_string(),
            source: None,
        }])
    }

    fn project_prefixes(&self, _context: &GenerationContext) -> Vec<ArtifactPrefix> {
        vec![ArtifactPrefix::exact("", TOC_STEM)]
    }
}
