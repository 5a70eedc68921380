//! Datatype Resolution Registry
//!
//! Per-project mapping from a value-datatype identity to the target-language
//! type descriptor used by generated code. Globally registered providers win;
//! project-local generic value datatype declarations only fill the gaps.

pub mod builtin;

pub use builtin::BuiltinDatatypes;

use crate::types::Hash;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Placeholder substituted by the expression templates
pub const VALUE_PLACEHOLDER: &str = "{value}";

/// Target-language idiom selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LanguageVariant {
    /// Legacy date handling (`GregorianCalendar`)
    Java5,
    /// `java.time` based date handling
    #[default]
    Java8,
}

/// Target type and conversion templates for one value datatype
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatatypeDescriptor {
    pub datatype: String,
    /// Fully qualified target class name
    pub class_name: String,
    /// Expression converting a string expression into a value, e.g. `Integer.valueOf({value})`
    pub value_of: String,
    /// Expression converting a value back to a string
    pub to_string: String,
    pub null_expression: String,
    /// Synthesized rather than registered
    #[serde(default)]
    pub generic: bool,
}

impl DatatypeDescriptor {
    /// Generic descriptor for a project-declared value class.
    pub fn generic(datatype: &str, class_name: &str, value_of_method: &str) -> Self {
        let simple = simple_name(class_name);
        Self {
            datatype: datatype.to_string(),
            class_name: class_name.to_string(),
            value_of: format!("{}.{}({})", simple, value_of_method, VALUE_PLACEHOLDER),
            to_string: format!("{}.toString()", VALUE_PLACEHOLDER),
            null_expression: "null".to_string(),
            generic: true,
        }
    }

    /// Descriptor served for datatypes nobody registered or declared.
    pub fn fallback(datatype: &str) -> Self {
        Self {
            datatype: datatype.to_string(),
            class_name: "java.lang.Object".to_string(),
            value_of: VALUE_PLACEHOLDER.to_string(),
            to_string: format!("String.valueOf({})", VALUE_PLACEHOLDER),
            null_expression: "null".to_string(),
            generic: true,
        }
    }

    pub fn simple_class_name(&self) -> &str {
        simple_name(&self.class_name)
    }

    /// Render the value-of template for a string expression.
    pub fn value_of_expr(&self, expr: &str) -> String {
        self.value_of.replace(VALUE_PLACEHOLDER, expr)
    }

    pub fn to_string_expr(&self, expr: &str) -> String {
        self.to_string.replace(VALUE_PLACEHOLDER, expr)
    }
}

fn simple_name(class_name: &str) -> &str {
    class_name.rsplit('.').next().unwrap_or(class_name)
}

/// Generic value datatype declared in the project properties
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueDatatypeDecl {
    pub id: String,
    pub class_name: String,
    #[serde(default = "default_value_of_method")]
    pub value_of_method: String,
}

fn default_value_of_method() -> String {
    "valueOf".to_string()
}

/// Extension point contributing globally registered descriptors
pub trait DatatypeProvider: Send + Sync {
    fn name(&self) -> &str;
    fn descriptors(&self, variant: LanguageVariant) -> Vec<DatatypeDescriptor>;
}

/// Result of a registry lookup
#[derive(Debug, Clone)]
pub struct Resolution {
    pub descriptor: Arc<DatatypeDescriptor>,
    /// True when nothing mapped the datatype and the generic fallback was served
    pub fallback: bool,
}

struct Declarations {
    revision: u64,
    entries: Vec<ValueDatatypeDecl>,
    fingerprint: Hash,
}

struct Table {
    revision: u64,
    entries: HashMap<String, Arc<DatatypeDescriptor>>,
}

/// Per-project datatype registry
pub struct DatatypeRegistry {
    variant: LanguageVariant,
    providers: Vec<Arc<dyn DatatypeProvider>>,
    declarations: RwLock<Declarations>,
    table: RwLock<Option<Table>>,
    rebuilds: AtomicUsize,
}

impl DatatypeRegistry {
    pub fn new(variant: LanguageVariant, providers: Vec<Arc<dyn DatatypeProvider>>) -> Self {
        let fingerprint = declarations_fingerprint(&providers, &[]);
        Self {
            variant,
            providers,
            declarations: RwLock::new(Declarations {
                revision: 0,
                entries: Vec::new(),
                fingerprint,
            }),
            table: RwLock::new(None),
            rebuilds: AtomicUsize::new(0),
        }
    }

    /// Registry with the builtin provider and the given project declarations.
    pub fn with_builtins(variant: LanguageVariant, declarations: Vec<ValueDatatypeDecl>) -> Self {
        let registry = Self::new(variant, vec![Arc::new(BuiltinDatatypes)]);
        registry.set_project_datatypes(declarations);
        registry
    }

    pub fn variant(&self) -> LanguageVariant {
        self.variant
    }

    /// Replace the project-local declarations.
    ///
    /// The lookup table is rebuilt on the next `resolve`.
    pub fn set_project_datatypes(&self, entries: Vec<ValueDatatypeDecl>) {
        let fingerprint = declarations_fingerprint(&self.providers, &entries);
        let mut declarations = self.declarations.write();
        declarations.revision += 1;
        declarations.entries = entries;
        declarations.fingerprint = fingerprint;
    }

    /// Digest of the provider names and the current project declarations.
    ///
    /// Two registries with equal fingerprints resolve every datatype the same way.
    pub fn fingerprint(&self) -> Hash {
        self.declarations.read().fingerprint
    }

    /// Resolve a datatype. Never fails: unknown datatypes get the fallback.
    pub fn resolve(&self, datatype: &str) -> Resolution {
        let revision = self.declarations.read().revision;
        {
            let table = self.table.read();
            if let Some(table) = table.as_ref().filter(|t| t.revision == revision) {
                return lookup(table, datatype);
            }
        }

        let mut table = self.table.write();
        // another caller may have rebuilt while we waited for the write lock
        let stale = table.as_ref().map_or(true, |t| t.revision != revision);
        if stale {
            *table = Some(self.build_table());
        }
        match table.as_ref() {
            Some(table) => lookup(table, datatype),
            None => Resolution {
                descriptor: Arc::new(DatatypeDescriptor::fallback(datatype)),
                fallback: true,
            },
        }
    }

    /// Number of times the lookup table has been (re)built.
    pub fn rebuilds(&self) -> usize {
        self.rebuilds.load(Ordering::Relaxed)
    }

    fn build_table(&self) -> Table {
        let declarations = self.declarations.read();
        let mut entries: HashMap<String, Arc<DatatypeDescriptor>> = HashMap::new();

        for provider in &self.providers {
            for descriptor in provider.descriptors(self.variant) {
                // first registration of an id wins across providers
                entries
                    .entry(descriptor.datatype.clone())
                    .or_insert_with(|| Arc::new(descriptor));
            }
        }

        let mut shadowed = 0usize;
        for decl in &declarations.entries {
            if entries.contains_key(&decl.id) {
                shadowed += 1;
                continue;
            }
            entries.insert(
                decl.id.clone(),
                Arc::new(DatatypeDescriptor::generic(
                    &decl.id,
                    &decl.class_name,
                    &decl.value_of_method,
                )),
            );
        }

        self.rebuilds.fetch_add(1, Ordering::Relaxed);
        debug!(
            revision = declarations.revision,
            descriptors = entries.len(),
            shadowed,
            "Rebuilt datatype table"
        );
        Table {
            revision: declarations.revision,
            entries,
        }
    }
}

fn declarations_fingerprint(providers: &[Arc<dyn DatatypeProvider>], entries: &[ValueDatatypeDecl]) -> Hash {
    let mut hasher = blake3::Hasher::new();
    for provider in providers {
        hasher.update(provider.name().as_bytes());
        hasher.update(b"\0");
    }
    for decl in entries {
        for field in [&decl.id, &decl.class_name, &decl.value_of_method] {
            hasher.update(field.as_bytes());
            hasher.update(b"\0");
        }
    }
    *hasher.finalize().as_bytes()
}

fn lookup(table: &Table, datatype: &str) -> Resolution {
    match table.entries.get(datatype) {
        Some(descriptor) => Resolution {
            descriptor: descriptor.clone(),
            fallback: false,
        },
        None => Resolution {
            descriptor: Arc::new(DatatypeDescriptor::fallback(datatype)),
            fallback: true,
        },
    }
}
