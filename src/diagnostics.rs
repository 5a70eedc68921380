//! Build diagnostics
//!
//! Recoverable conditions found while building (unresolved datatypes, dangling
//! references) and per-object builder failures. Collected into the build report;
//! each (object, subject, code) occurrence is reported once.

use crate::types::StableId;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticCode {
    UnresolvedDatatype,
    UnresolvedReference,
    CyclicModel,
    BuilderExecution,
    ArtifactCollision,
    Cancelled,
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DiagnosticCode::UnresolvedDatatype => "unresolved-datatype",
            DiagnosticCode::UnresolvedReference => "unresolved-reference",
            DiagnosticCode::CyclicModel => "cyclic-model",
            DiagnosticCode::BuilderExecution => "builder-execution",
            DiagnosticCode::ArtifactCollision => "artifact-collision",
            DiagnosticCode::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: DiagnosticCode,
    /// Source object the diagnostic is tied to
    #[serde(skip)]
    pub object: Option<StableId>,
    pub object_name: String,
    /// Builder that reported it, if any
    pub builder: Option<String>,
    /// Property, column or builder the diagnostic is about
    pub subject: Option<String>,
    pub message: String,
}

impl Diagnostic {
    pub fn unresolved_datatype(object: StableId, object_name: &str, property: &str, datatype: &str) -> Self {
        Self {
            severity: Severity::Warning,
            code: DiagnosticCode::UnresolvedDatatype,
            object: Some(object),
            object_name: object_name.to_string(),
            builder: None,
            subject: Some(property.to_string()),
            message: format!(
                "datatype '{}' of '{}' is not registered; generic fallback used",
                datatype, property
            ),
        }
    }

    pub fn unresolved_reference(object: StableId, object_name: &str, property: &str, target: &str) -> Self {
        Self {
            severity: Severity::Warning,
            code: DiagnosticCode::UnresolvedReference,
            object: Some(object),
            object_name: object_name.to_string(),
            builder: None,
            subject: Some(property.to_string()),
            message: format!("'{}' refers to unknown type '{}'", property, target),
        }
    }

    /// A second artifact of the pass targets a path already written by `first`.
    pub fn artifact_collision(
        object: Option<StableId>,
        object_name: &str,
        builder: &str,
        path: &Path,
        first: &str,
    ) -> Self {
        Self {
            severity: Severity::Error,
            code: DiagnosticCode::ArtifactCollision,
            object,
            object_name: object_name.to_string(),
            builder: Some(builder.to_string()),
            subject: Some(path.display().to_string()),
            message: format!(
                "{} was already written by {} in this pass; not overwritten",
                path.display(),
                first
            ),
        }
    }

    pub fn error(
        code: DiagnosticCode,
        object: Option<StableId>,
        object_name: &str,
        builder: Option<&str>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity: Severity::Error,
            code,
            object,
            object_name: object_name.to_string(),
            builder: builder.map(str::to_string),
            subject: builder.map(str::to_string),
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.object_name)?;
        if let Some(builder) = &self.builder {
            write!(f, " ({})", builder)?;
        }
        write!(f, ": {}", self.message)
    }
}

type DiagnosticKey = (Option<StableId>, String, Option<String>, DiagnosticCode);

/// Ordered, de-duplicated diagnostic list
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
    seen: HashSet<DiagnosticKey>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a diagnostic. Returns false if the same occurrence was already recorded.
    pub fn push(&mut self, diagnostic: Diagnostic) -> bool {
        let key = (
            diagnostic.object,
            diagnostic.object_name.clone(),
            diagnostic.subject.clone(),
            diagnostic.code,
        );
        if !self.seen.insert(key) {
            return false;
        }
        self.entries.push(diagnostic);
        true
    }

    pub fn extend<I: IntoIterator<Item = Diagnostic>>(&mut self, diagnostics: I) {
        for diagnostic in diagnostics {
            self.push(diagnostic);
        }
    }

    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn count(&self, code: DiagnosticCode) -> usize {
        self.entries.iter().filter(|d| d.code == code).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }
}
