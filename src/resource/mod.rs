//! Resource definitions and their synchronization
//!
//! # Architecture
//!
//! - [`kind`] - Resource kinds (index, source) and their failure policies
//! - [`definition`] - Discovery, parsing and normalization of definition files
//! - [`sync`] - Idempotent apply against the live service
//!
//! # Layout on disk
//!
//! ```text
//! indexes/
//!   app-logs.yaml            index definitions (top level only)
//!   sources/
//!     app-logs/
//!       kafka.yaml           sources of index `app-logs`
//! ```

pub mod definition;
pub mod kind;
pub mod sync;

pub use definition::{
    discover_index_definitions, discover_source_definitions, DefinitionFile, DefinitionFormat,
    MalformedDefinition, ResourceDefinition,
};
pub use kind::{FailurePolicy, ResourceKind};
pub use sync::{ApplyOutcome, ApplyResult, ResourceApi, SyncConfig, SyncReport, Synchronizer};
