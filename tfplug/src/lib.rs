//! tfplug - Terraform Plugin Framework for Rust
//!
//! Types, schema, planning and the resource/provider traits a provider
//! implements. The RPC transport is owned by the host.

// Core modules
pub mod context;
pub mod error;
pub mod logging;
pub mod schema;
pub mod types;

// Provider API modules
pub mod data_source;
pub mod provider;
pub mod resource;
pub mod resource_data;

// Helper modules
pub mod defaults;
pub mod import;
pub mod plan;
pub mod plan_modifier;
pub mod validator;

// Re-exports for convenience
pub use context::{Context, ContextError};
pub use data_source::{DataSource, DataSourceWithConfigure};
pub use error::{Result, TfplugError};
pub use import::{import_state_from_identity, import_state_passthrough_id};
pub use logging::{init_logging, LogLevel};
pub use provider::Provider;
pub use resource::{
    Resource, ResourceWithConfigure, ResourceWithIdentity, ResourceWithImportState,
    ResourceWithUpgradeState,
};
pub use resource_data::ResourceData;
pub use schema::{AttributeBuilder, AttributeType, IdentitySchema, Schema, SchemaBuilder};
pub use types::{AttributePath, Diagnostic, Diagnostics, Dynamic, DynamicValue};
