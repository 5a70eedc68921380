//! Generator Context
//!
//! Immutable per-build configuration threaded through node construction and
//! builder execution. Created once per (project, configuration) and shared by
//! reference; nothing downstream mutates it.

use crate::config::ModelgenConfig;
use crate::datatype::DatatypeRegistry;
pub use crate::datatype::LanguageVariant;
use crate::types::{fingerprint, Hash};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// How domain member names become target identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberCase {
    /// `payment_mode` -> `paymentMode`
    #[default]
    CamelCase,
    /// Names are used as written
    Verbatim,
}

/// Naming convention for generated types and members
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamingConvention {
    #[serde(default = "default_interface_prefix")]
    pub interface_prefix: String,
    #[serde(default = "default_internal_package")]
    pub internal_package: String,
    #[serde(default = "default_generation_suffix")]
    pub generation_suffix: String,
    #[serde(default)]
    pub member_case: MemberCase,
}

fn default_interface_prefix() -> String {
    "I".to_string()
}

fn default_internal_package() -> String {
    "internal".to_string()
}

fn default_generation_suffix() -> String {
    "Gen".to_string()
}

impl Default for NamingConvention {
    fn default() -> Self {
        Self {
            interface_prefix: default_interface_prefix(),
            internal_package: default_internal_package(),
            generation_suffix: default_generation_suffix(),
            member_case: MemberCase::default(),
        }
    }
}

impl NamingConvention {
    pub fn member_name(&self, name: &str) -> String {
        match self.member_case {
            MemberCase::CamelCase => camel_case(name),
            MemberCase::Verbatim => name.to_string(),
        }
    }

    pub fn getter_name(&self, name: &str) -> String {
        format!("get{}", capitalize(&self.member_name(name)))
    }

    pub fn setter_name(&self, name: &str) -> String {
        format!("set{}", capitalize(&self.member_name(name)))
    }

    /// `premium rate` -> `PREMIUM_RATE`
    pub fn constant_name(&self, name: &str) -> String {
        let mut out = String::new();
        for (i, word) in words(name).iter().enumerate() {
            if i > 0 {
                out.push('_');
            }
            out.push_str(&word.to_uppercase());
        }
        out
    }
}

/// Annotation policy for generated members
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationPolicy {
    None,
    /// Mark generated members with `@Generated`
    #[default]
    Generated,
}

/// Switches controlling which derived members nodes and builders expose
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureFlags {
    #[serde(default = "default_true")]
    pub published_interfaces: bool,
    #[serde(default = "default_true")]
    pub copy_support: bool,
    #[serde(default)]
    pub delta_support: bool,
    #[serde(default)]
    pub visitor_support: bool,
    #[serde(default)]
    pub annotations: AnnotationPolicy,
}

fn default_true() -> bool {
    true
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            published_interfaces: true,
            copy_support: true,
            delta_support: false,
            visitor_support: false,
            annotations: AnnotationPolicy::default(),
        }
    }
}

/// Settings of a context; together with the datatype declarations they make up its identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextSettings {
    pub project: String,
    /// Prefix prepended to every model package
    #[serde(default)]
    pub base_package: String,
    #[serde(default)]
    pub naming: NamingConvention,
    #[serde(default)]
    pub features: FeatureFlags,
    #[serde(default)]
    pub variant: LanguageVariant,
}

impl ContextSettings {
    pub fn new(project: &str) -> Self {
        Self {
            project: project.to_string(),
            base_package: String::new(),
            naming: NamingConvention::default(),
            features: FeatureFlags::default(),
            variant: LanguageVariant::default(),
        }
    }

    pub fn with_published_interfaces(mut self, enabled: bool) -> Self {
        self.features.published_interfaces = enabled;
        self
    }

    pub fn with_base_package(mut self, base_package: &str) -> Self {
        self.base_package = base_package.to_string();
        self
    }

    pub fn with_variant(mut self, variant: LanguageVariant) -> Self {
        self.variant = variant;
        self
    }
}

/// Identity of a generation context, part of every cache key
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(Hash);

impl fmt::Debug for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContextId({})", hex::encode(&self.0[..6]))
    }
}

/// Published-interface and implementation names of one generated type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AspectNames {
    pub interface: String,
    pub implementation: String,
}

pub struct GenerationContext {
    settings_fingerprint: Hash,
    settings: ContextSettings,
    datatypes: Arc<DatatypeRegistry>,
}

impl fmt::Debug for GenerationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationContext")
            .field("id", &self.id())
            .field("project", &self.settings.project)
            .finish()
    }
}

impl GenerationContext {
    pub fn new(settings: ContextSettings, datatypes: Arc<DatatypeRegistry>) -> Arc<Self> {
        let encoded = serde_json::to_vec(&settings).unwrap_or_default();
        Arc::new(Self {
            settings_fingerprint: fingerprint(&encoded),
            settings,
            datatypes,
        })
    }

    /// Context with a builtin-only datatype registry for the settings' variant.
    pub fn with_builtin_datatypes(settings: ContextSettings) -> Arc<Self> {
        let registry = DatatypeRegistry::with_builtins(settings.variant, Vec::new());
        Self::new(settings, Arc::new(registry))
    }

    /// Context of a configured project, with its declared value datatypes
    /// registered next to the builtins.
    pub fn from_config(config: &ModelgenConfig) -> Arc<Self> {
        let settings = ContextSettings {
            project: config.project.name.clone(),
            base_package: config.project.base_package.clone(),
            naming: config.naming.clone(),
            features: config.features.clone(),
            variant: config.variant,
        };
        let registry = DatatypeRegistry::with_builtins(settings.variant, config.datatypes.clone());
        Self::new(settings, Arc::new(registry))
    }

    /// Settings and datatype declarations together; changes when either does.
    pub fn id(&self) -> ContextId {
        let mut bytes = [0u8; 64];
        bytes[..32].copy_from_slice(&self.settings_fingerprint);
        bytes[32..].copy_from_slice(&self.datatypes.fingerprint());
        ContextId(fingerprint(&bytes))
    }

    pub fn project(&self) -> &str {
        &self.settings.project
    }

    pub fn settings(&self) -> &ContextSettings {
        &self.settings
    }

    pub fn naming(&self) -> &NamingConvention {
        &self.settings.naming
    }

    pub fn features(&self) -> &FeatureFlags {
        &self.settings.features
    }

    pub fn variant(&self) -> LanguageVariant {
        self.settings.variant
    }

    pub fn datatypes(&self) -> &DatatypeRegistry {
        &self.datatypes
    }

    /// Target package for a model package.
    pub fn target_package(&self, model_package: &str) -> String {
        join_package(&self.settings.base_package, model_package)
    }

    /// Package holding implementation classes.
    ///
    /// In single-name mode the implementation lives in the published package.
    pub fn implementation_package(&self, model_package: &str) -> String {
        let package = self.target_package(model_package);
        if self.settings.features.published_interfaces {
            join_package(&package, &self.settings.naming.internal_package)
        } else {
            package
        }
    }

    /// Aspect names of a type with the given model package and simple name.
    pub fn type_names(&self, model_package: &str, simple_name: &str) -> AspectNames {
        let implementation = join_package(&self.implementation_package(model_package), simple_name);
        let interface = if self.settings.features.published_interfaces {
            join_package(
                &self.target_package(model_package),
                &format!("{}{}", self.settings.naming.interface_prefix, simple_name),
            )
        } else {
            implementation.clone()
        };
        AspectNames {
            interface,
            implementation,
        }
    }
}

pub fn join_package(package: &str, name: &str) -> String {
    match (package.is_empty(), name.is_empty()) {
        (true, _) => name.to_string(),
        (_, true) => package.to_string(),
        _ => format!("{}.{}", package, name),
    }
}

fn words(name: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut previous_lower = false;
    for c in name.chars() {
        if c == '_' || c == '-' || c == ' ' {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            previous_lower = false;
            continue;
        }
        if c.is_uppercase() && previous_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        previous_lower = c.is_lowercase() || c.is_ascii_digit();
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

pub fn camel_case(name: &str) -> String {
    let mut out = String::new();
    for (i, word) in words(name).iter().enumerate() {
        if i == 0 {
            out.push_str(&word.to_lowercase());
        } else {
            out.push_str(&capitalize(&word.to_lowercase()));
        }
    }
    out
}

pub fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
