//! File-backed model store: one JSON source document per model element.
//!
//! Documents live anywhere below the model directory. Generations are declared
//! inline on their owning type and exploded into separate source objects.

use crate::error::StorageError;
use crate::source::store::{InMemoryModelStore, KindFilter, ModelStore};
use crate::source::{
    AssociationDef, AttributeDef, ColumnDef, EnumProperties, EnumValueDef, SourceKind,
    SourceObject, TableProperties, TypeProperties,
};
use crate::types::StableId;
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use walkdir::WalkDir;

/// On-disk source document
#[derive(Debug, Deserialize)]
struct SourceDocument {
    kind: SourceKind,
    name: String,
    #[serde(default)]
    supertype: Option<String>,
    #[serde(default, rename = "abstract")]
    is_abstract: bool,
    #[serde(default)]
    attributes: Vec<AttributeDef>,
    #[serde(default)]
    associations: Vec<AssociationDef>,
    #[serde(default)]
    configuration_link: Option<String>,
    #[serde(default)]
    generations: Vec<GenerationDocument>,
    #[serde(default)]
    columns: Vec<ColumnDef>,
    #[serde(default)]
    unique_keys: Vec<Vec<String>>,
    #[serde(default)]
    values: Vec<EnumValueDef>,
}

#[derive(Debug, Deserialize)]
struct GenerationDocument {
    valid_from: NaiveDate,
    #[serde(default)]
    values: BTreeMap<String, String>,
}

impl SourceDocument {
    fn into_objects(self, path: &Path) -> Result<Vec<SourceObject>, StorageError> {
        match self.kind {
            SourceKind::PolicyType | SourceKind::ProductType => {
                let properties = TypeProperties {
                    supertype: self.supertype,
                    is_abstract: self.is_abstract,
                    attributes: self.attributes,
                    associations: self.associations,
                    generations: Vec::new(),
                    configuration_link: self.configuration_link,
                };
                let owner = if self.kind == SourceKind::PolicyType {
                    SourceObject::policy_type(&self.name, properties)
                } else {
                    SourceObject::product_type(&self.name, properties)
                };
                let generations: Vec<SourceObject> = self
                    .generations
                    .into_iter()
                    .map(|g| SourceObject::generation(&owner, g.valid_from, g.values))
                    .collect();
                let ids: Vec<StableId> = generations.iter().map(|g| g.id()).collect();
                let mut objects = vec![owner.with_generations(ids)];
                objects.extend(generations);
                Ok(objects)
            }
            SourceKind::TableStructure => Ok(vec![SourceObject::table_structure(
                &self.name,
                TableProperties {
                    columns: self.columns,
                    unique_keys: self.unique_keys,
                },
            )]),
            SourceKind::EnumType => Ok(vec![SourceObject::enum_type(
                &self.name,
                EnumProperties {
                    attributes: self.attributes,
                    values: self.values,
                },
            )]),
            SourceKind::Generation => Err(StorageError::InvalidDocument {
                path: path.to_path_buf(),
                message: "generations must be declared inline on their owning type".to_string(),
            }),
        }
    }
}

/// Model store reading JSON source documents from a directory tree
pub struct FileModelStore {
    root: PathBuf,
    inner: InMemoryModelStore,
}

impl FileModelStore {
    /// Load every `*.json` document below `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        let inner = load_directory(&root)?;
        info!(root = %root.display(), objects = inner.len(), "Loaded model directory");
        Ok(Self { root, inner })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Re-read the model directory.
    pub fn reload(&mut self) -> Result<(), StorageError> {
        self.inner = load_directory(&self.root)?;
        Ok(())
    }
}

fn load_directory(root: &Path) -> Result<InMemoryModelStore, StorageError> {
    let store = InMemoryModelStore::new();
    let mut paths: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().map_or(false, |ext| ext == "json"))
        .collect();
    // Deterministic load order so duplicate errors always name the same file
    paths.sort();

    for path in paths {
        let text = fs::read_to_string(&path)?;
        let document: SourceDocument =
            serde_json::from_str(&text).map_err(|e| StorageError::InvalidDocument {
                path: path.clone(),
                message: e.to_string(),
            })?;
        debug!(path = %path.display(), name = %document.name, "Parsed source document");
        for object in document.into_objects(&path)? {
            store.insert(object)?;
        }
    }
    Ok(store)
}

impl ModelStore for FileModelStore {
    fn list(&self, filter: &KindFilter) -> Result<Vec<Arc<SourceObject>>, StorageError> {
        self.inner.list(filter)
    }

    fn get(&self, id: &StableId) -> Result<Option<Arc<SourceObject>>, StorageError> {
        self.inner.get(id)
    }

    fn find(&self, qualified_name: &str) -> Result<Option<Arc<SourceObject>>, StorageError> {
        self.inner.find(qualified_name)
    }
}
