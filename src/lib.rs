//! modelgen: model-to-source generation engine
//!
//! Turns a graph of domain model objects (policy types, product types with
//! time generations, table structures and enumeration types) into Java
//! sources. Generator model nodes are built once per object and cached; an
//! ordered set of artefact builders consumes them in a three-phase build pass
//! driven by the orchestrator.

pub mod builder;
pub mod cache;
pub mod cli;
pub mod config;
pub mod context;
pub mod datatype;
pub mod diagnostics;
pub mod emit;
pub mod error;
pub mod logging;
pub mod node;
pub mod orchestrator;
pub mod source;
pub mod types;

pub use cache::ModelCache;
pub use context::GenerationContext;
pub use error::{ApiError, BuildError, ModelError};
pub use orchestrator::{BuildKind, BuildReport, BuildRequest, BuildState, Orchestrator};
