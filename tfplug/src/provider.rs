//! Provider trait: configuration plus the resource and data source catalogue

use crate::context::Context;
use crate::data_source::DataSource;
use crate::resource::Resource;
use crate::schema::Schema;
use crate::types::{Diagnostics, DynamicValue};
use crate::Result;
use async_trait::async_trait;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

#[async_trait]
pub trait Provider: Send + Sync {
    /// Provider type name, the prefix of every resource type (e.g. "scaleway")
    fn type_name(&self) -> &str;

    async fn metadata(
        &self,
        ctx: Context,
        request: ProviderMetadataRequest,
    ) -> ProviderMetadataResponse;

    async fn schema(&self, ctx: Context, request: ProviderSchemaRequest) -> ProviderSchemaResponse;

    /// Decode the provider block; must be called before any resource is created
    async fn configure(
        &mut self,
        ctx: Context,
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse;

    /// Build a configured resource instance
    /// Fails with ProviderNotConfigured before configure succeeded
    async fn create_resource(&self, ctx: Context, name: &str) -> Result<Box<dyn Resource>>;

    async fn create_data_source(&self, ctx: Context, name: &str) -> Result<Box<dyn DataSource>>;

    async fn resource_schemas(&self) -> HashMap<String, Schema>;

    async fn data_source_schemas(&self) -> HashMap<String, Schema>;
}

pub struct ProviderMetadataRequest;

pub struct ProviderMetadataResponse {
    pub type_name: String,
}

pub struct ProviderSchemaRequest;

pub struct ProviderSchemaResponse {
    pub schema: Schema,
    pub diagnostics: Diagnostics,
}

pub struct ConfigureProviderRequest {
    pub terraform_version: String,
    pub config: DynamicValue,
}

pub struct ConfigureProviderResponse {
    pub diagnostics: Diagnostics,
    /// Handed to every resource and data source through their configure call
    pub provider_data: Option<Arc<dyn Any + Send + Sync>>,
}
