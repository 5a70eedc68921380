//! Source Objects
//!
//! Read-only handles to domain model objects as handed over by the model store.
//! The generator never mutates these; it only reads properties and identities.

pub mod files;
pub mod graph;
pub mod store;

pub use files::FileModelStore;
pub use graph::DependencyGraph;
pub use store::{InMemoryModelStore, KindFilter, ModelStore};

use crate::types::{fingerprint, Hash, StableId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Kind tag of a domain model object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    PolicyType,
    ProductType,
    Generation,
    TableStructure,
    EnumType,
}

impl SourceKind {
    pub fn tag(&self) -> &'static str {
        match self {
            SourceKind::PolicyType => "policy-type",
            SourceKind::ProductType => "product-type",
            SourceKind::Generation => "generation",
            SourceKind::TableStructure => "table-structure",
            SourceKind::EnumType => "enum-type",
        }
    }

    /// Policy and product types share the type namespace and supertype rules.
    pub fn is_type(&self) -> bool {
        matches!(self, SourceKind::PolicyType | SourceKind::ProductType)
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDef {
    pub name: String,
    pub datatype: String,
    #[serde(default)]
    pub default_value: Option<String>,
    /// Value may differ per time generation
    #[serde(default)]
    pub changing_over_time: bool,
}

impl AttributeDef {
    pub fn new(name: &str, datatype: &str) -> Self {
        Self {
            name: name.to_string(),
            datatype: datatype.to_string(),
            default_value: None,
            changing_over_time: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociationDef {
    pub name: String,
    /// Qualified name of the target type
    pub target: String,
    #[serde(default)]
    pub min: u32,
    /// None means unbounded
    #[serde(default)]
    pub max: Option<u32>,
}

impl AssociationDef {
    pub fn is_to_many(&self) -> bool {
        self.max.map_or(true, |max| max > 1)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeProperties {
    #[serde(default)]
    pub supertype: Option<String>,
    #[serde(default)]
    pub is_abstract: bool,
    #[serde(default)]
    pub attributes: Vec<AttributeDef>,
    #[serde(default)]
    pub associations: Vec<AssociationDef>,
    /// Ids of the time generations owned by this type
    #[serde(default)]
    pub generations: Vec<StableId>,
    /// Product type configuring this policy type, or policy type configured by this product type
    #[serde(default)]
    pub configuration_link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationProperties {
    pub owner: StableId,
    pub owner_name: String,
    pub valid_from: NaiveDate,
    #[serde(default)]
    pub values: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub datatype: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableProperties {
    #[serde(default)]
    pub columns: Vec<ColumnDef>,
    #[serde(default)]
    pub unique_keys: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumValueDef {
    pub id: String,
    /// Attribute name -> literal
    #[serde(default)]
    pub literals: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumProperties {
    #[serde(default)]
    pub attributes: Vec<AttributeDef>,
    #[serde(default)]
    pub values: Vec<EnumValueDef>,
}

/// Structured, already validated property record of a source object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum SourceProperties {
    Type(TypeProperties),
    Generation(GenerationProperties),
    Table(TableProperties),
    Enum(EnumProperties),
}

/// Read-only handle to one domain model object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceObject {
    id: StableId,
    kind: SourceKind,
    qualified_name: String,
    fingerprint: Hash,
    properties: SourceProperties,
}

impl SourceObject {
    /// Create a source object for a top-level model element.
    pub fn new(kind: SourceKind, qualified_name: &str, properties: SourceProperties) -> Self {
        let id = match &properties {
            SourceProperties::Generation(generation) => {
                StableId::for_generation(&generation.owner_name, generation.valid_from)
            }
            _ => StableId::derive(kind.tag(), qualified_name),
        };
        let fingerprint = compute_fingerprint(kind, qualified_name, &properties);
        Self {
            id,
            kind,
            qualified_name: qualified_name.to_string(),
            fingerprint,
            properties,
        }
    }

    pub fn policy_type(qualified_name: &str, properties: TypeProperties) -> Self {
        Self::new(
            SourceKind::PolicyType,
            qualified_name,
            SourceProperties::Type(properties),
        )
    }

    pub fn product_type(qualified_name: &str, properties: TypeProperties) -> Self {
        Self::new(
            SourceKind::ProductType,
            qualified_name,
            SourceProperties::Type(properties),
        )
    }

    /// Create a time generation of `owner`. Its qualified name is `owner@yyyy-mm-dd`.
    pub fn generation(
        owner: &SourceObject,
        valid_from: NaiveDate,
        values: BTreeMap<String, String>,
    ) -> Self {
        let qualified_name = format!("{}@{}", owner.qualified_name, valid_from.format("%Y-%m-%d"));
        Self::new(
            SourceKind::Generation,
            &qualified_name,
            SourceProperties::Generation(GenerationProperties {
                owner: owner.id,
                owner_name: owner.qualified_name.clone(),
                valid_from,
                values,
            }),
        )
    }

    pub fn table_structure(qualified_name: &str, properties: TableProperties) -> Self {
        Self::new(
            SourceKind::TableStructure,
            qualified_name,
            SourceProperties::Table(properties),
        )
    }

    pub fn enum_type(qualified_name: &str, properties: EnumProperties) -> Self {
        Self::new(
            SourceKind::EnumType,
            qualified_name,
            SourceProperties::Enum(properties),
        )
    }

    pub fn id(&self) -> StableId {
        self.id
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    pub fn qualified_name(&self) -> &str {
        &self.qualified_name
    }

    /// Modification snapshot: changes whenever any property changes.
    pub fn fingerprint(&self) -> &Hash {
        &self.fingerprint
    }

    pub fn properties(&self) -> &SourceProperties {
        &self.properties
    }

    /// Unqualified name (segment after the last '.')
    pub fn name(&self) -> &str {
        split_qualified_name(&self.qualified_name).1
    }

    /// Package part of the qualified name, empty for the default package
    pub fn package(&self) -> &str {
        split_qualified_name(&self.qualified_name).0
    }

    pub fn type_properties(&self) -> Option<&TypeProperties> {
        match &self.properties {
            SourceProperties::Type(props) => Some(props),
            _ => None,
        }
    }

    pub fn generation_properties(&self) -> Option<&GenerationProperties> {
        match &self.properties {
            SourceProperties::Generation(props) => Some(props),
            _ => None,
        }
    }

    pub fn supertype(&self) -> Option<&str> {
        self.type_properties()
            .and_then(|props| props.supertype.as_deref())
    }

    /// Ids of owned time generations (empty for anything but types)
    pub fn generation_ids(&self) -> &[StableId] {
        self.type_properties()
            .map(|props| props.generations.as_slice())
            .unwrap_or(&[])
    }

    /// Return a copy with the generation id list replaced.
    pub fn with_generations(&self, generations: Vec<StableId>) -> Self {
        let mut properties = self.properties.clone();
        if let SourceProperties::Type(props) = &mut properties {
            props.generations = generations;
        }
        Self::new(self.kind, &self.qualified_name, properties)
    }
}

/// Split `a.b.C` into (`a.b`, `C`).
pub fn split_qualified_name(qualified_name: &str) -> (&str, &str) {
    match qualified_name.rfind('.') {
        Some(idx) => (&qualified_name[..idx], &qualified_name[idx + 1..]),
        None => ("", qualified_name),
    }
}

fn compute_fingerprint(kind: SourceKind, qualified_name: &str, properties: &SourceProperties) -> Hash {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(kind.tag().as_bytes());
    bytes.push(0);
    bytes.extend_from_slice(qualified_name.as_bytes());
    bytes.push(0);
    // Serializing plain data structs into a Vec cannot fail.
    if let Ok(encoded) = serde_json::to_vec(properties) {
        bytes.extend_from_slice(&encoded);
    }
    fingerprint(&bytes)
}

/// Tombstone describing a source object removed since the previous build.
///
/// The store no longer knows the object, so the tombstone carries everything
/// the derived builders need to compute the artifacts to remove.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedObject {
    pub id: StableId,
    pub kind: SourceKind,
    pub qualified_name: String,
}

impl From<&SourceObject> for DeletedObject {
    fn from(object: &SourceObject) -> Self {
        Self {
            id: object.id(),
            kind: object.kind(),
            qualified_name: object.qualified_name().to_string(),
        }
    }
}
