//! Java source writer shared by the shipped builders.
//!
//! Output is fully deterministic (sorted imports, no timestamps) so that
//! regenerating an unchanged object yields byte-identical content.

use crate::context::{AnnotationPolicy, GenerationContext};
use crate::datatype::LanguageVariant;
use crate::source::split_qualified_name;
use std::collections::BTreeSet;
use std::path::PathBuf;

const INDENT: &str = "    ";
const GENERATED_ANNOTATION: &str = "javax.annotation.Generated";

/// Relative path of the source file for a qualified class name.
pub fn source_path(qualified_class: &str) -> PathBuf {
    let mut path = package_dir(qualified_class);
    path.set_extension("java");
    path
}

/// Directory of a package relative to the output root.
pub fn package_dir(package: &str) -> PathBuf {
    package.split('.').filter(|s| !s.is_empty()).collect()
}

/// Java string literal for `value`.
pub fn string_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Indented line buffer
#[derive(Debug, Default)]
pub struct CodeBuffer {
    out: String,
    depth: usize,
}

impl CodeBuffer {
    pub fn line(&mut self, text: impl AsRef<str>) -> &mut Self {
        for _ in 0..self.depth {
            self.out.push_str(INDENT);
        }
        self.out.push_str(text.as_ref());
        self.out.push('\n');
        self
    }

    pub fn blank(&mut self) -> &mut Self {
        // collapse runs of blank lines and never open a block with one
        if !self.out.is_empty() && !self.out.ends_with("\n\n") && !self.out.ends_with("{\n") {
            self.out.push('\n');
        }
        self
    }

    /// Write `header {` and indent.
    pub fn open(&mut self, header: impl AsRef<str>) -> &mut Self {
        self.line(format!("{} {{", header.as_ref()));
        self.depth += 1;
        self
    }

    /// Dedent and write `}`.
    pub fn close(&mut self) -> &mut Self {
        if self.out.ends_with("\n\n") {
            self.out.pop();
        }
        self.depth = self.depth.saturating_sub(1);
        self.line("}")
    }

    pub fn as_str(&self) -> &str {
        &self.out
    }
}

/// One Java compilation unit
#[derive(Debug)]
pub struct JavaFile {
    package: String,
    source_name: String,
    imports: BTreeSet<String>,
    annotations: AnnotationPolicy,
    variant: LanguageVariant,
    pub body: CodeBuffer,
}

impl JavaFile {
    /// `source_name` is the qualified model name the file is generated from.
    pub fn new(context: &GenerationContext, package: &str, source_name: &str) -> Self {
        Self {
            package: package.to_string(),
            source_name: source_name.to_string(),
            imports: BTreeSet::new(),
            annotations: context.features().annotations,
            variant: context.variant(),
            body: CodeBuffer::default(),
        }
    }

    /// Import `qualified` if needed and return the name to use in code.
    pub fn import(&mut self, qualified: &str) -> String {
        let (package, simple) = split_qualified_name(qualified);
        if !package.is_empty() && package != self.package && package != "java.lang" {
            self.imports.insert(qualified.to_string());
        }
        simple.to_string()
    }

    /// `new ArrayList<>()` or, for Java 5, with explicit type arguments.
    pub fn new_list(&mut self, element: &str) -> String {
        let list = self.import("java.util.ArrayList");
        match self.variant {
            LanguageVariant::Java5 => format!("new {}<{}>()", list, element),
            LanguageVariant::Java8 => format!("new {}<>()", list),
        }
    }

    /// Class-level annotation lines for generated types.
    pub fn type_annotations(&mut self) -> Vec<String> {
        match self.annotations {
            AnnotationPolicy::None => Vec::new(),
            AnnotationPolicy::Generated => {
                let name = self.import(GENERATED_ANNOTATION);
                vec![format!("@{}(\"modelgen\")", name)]
            }
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "// Generated by modelgen from {}. Do not edit.\n",
            self.source_name
        ));
        if !self.package.is_empty() {
            out.push_str(&format!("package {};\n\n", self.package));
        }
        for import in &self.imports {
            out.push_str(&format!("import {};\n", import));
        }
        if !self.imports.is_empty() {
            out.push('\n');
        }
        out.push_str(self.body.as_str());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextSettings;

    #[test]
    fn test_source_path() {
        assert_eq!(
            source_path("motor.internal.Contract"),
            PathBuf::from("motor/internal/Contract.java")
        );
        assert_eq!(source_path("Contract"), PathBuf::from("Contract.java"));
    }

    #[test]
    fn test_imports_skip_same_package_and_java_lang() {
        let ctx = GenerationContext::with_builtin_datatypes(ContextSettings::new("demo"));
        let mut file = JavaFile::new(&ctx, "motor.internal", "motor.Contract");
        assert_eq!(file.import("motor.internal.Base"), "Base");
        assert_eq!(file.import("java.lang.String"), "String");
        assert_eq!(file.import("java.time.LocalDate"), "LocalDate");
        file.body.open("public class Contract").close();
        let text = file.render();
        assert!(text.contains("import java.time.LocalDate;"));
        assert!(!text.contains("import java.lang.String;"));
        assert!(!text.contains("import motor.internal.Base;"));
    }

    #[test]
    fn test_java5_list_has_type_arguments() {
        let ctx = GenerationContext::with_builtin_datatypes(
            ContextSettings::new("demo").with_variant(LanguageVariant::Java5),
        );
        let mut file = JavaFile::new(&ctx, "motor", "motor.Rates");
        assert_eq!(file.new_list("RatesRow"), "new ArrayList<RatesRow>()");
    }

    #[test]
    fn test_string_literal_escapes() {
        assert_eq!(string_literal("a\"b"), "\"a\\\"b\"");
    }

    #[test]
    fn test_code_buffer_blocks() {
        let mut buf = CodeBuffer::default();
        buf.open("class A");
        buf.blank();
        buf.line("int x;");
        buf.blank();
        buf.close();
        assert_eq!(buf.as_str(), "class A {\n    int x;\n}\n");
    }
}
