//! Terraform provider for Scaleway
//!
//! [`ScalewayProvider`] decodes the provider block into a shared
//! [`provider_data::ScalewayProviderData`] and hands it to every resource
//! and data source it builds.

pub mod api;
pub mod bridge;
pub mod data_sources;
pub mod errors;
pub mod flatten;
pub mod identity;
pub mod ids;
pub mod locality;
pub mod provider_data;
pub mod resources;
pub mod retry;
pub mod skeleton;
pub mod waiter;

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use tfplug::provider::{
    ConfigureProviderRequest, ConfigureProviderResponse, ProviderMetadataRequest,
    ProviderMetadataResponse, ProviderSchemaRequest, ProviderSchemaResponse,
};
use tfplug::validator::UuidValidator;
use tfplug::{
    AttributeBuilder, AttributePath, AttributeType, Context, DataSource, Diagnostics, DynamicValue,
    Provider, Resource, Schema, SchemaBuilder, TfplugError,
};

use crate::api::aws::MnqClientFactory;
use crate::api::client::DEFAULT_API_URL;
use crate::api::Client;
use crate::data_sources::ScalewayDataSource;
use crate::locality::{Region, Zone};
use crate::provider_data::ScalewayProviderData;
use crate::resources::{account, edge_services, file, function, inference, mnq, registry, sdb};
use crate::skeleton::{boxed, ScalewayResource};

/// Constructor and schema lookup over every resource type
macro_rules! resource_catalogue {
    ($($resource:path),+ $(,)?) => {
        fn build_resource(name: &str, meta: &Arc<ScalewayProviderData>) -> Option<Box<dyn Resource>> {
            match name {
                $(<$resource as ScalewayResource>::TYPE_NAME => Some(boxed($resource, meta)),)+
                _ => None,
            }
        }

        fn resource_schema_map() -> HashMap<String, Schema> {
            HashMap::from([
                $((<$resource as ScalewayResource>::TYPE_NAME.to_string(), <$resource as ScalewayResource>::schema()),)+
            ])
        }
    };
}

resource_catalogue! {
    account::ProjectResource,
    edge_services::PipelineResource,
    edge_services::DnsStageResource,
    edge_services::BackendStageResource,
    edge_services::CacheStageResource,
    edge_services::WafStageResource,
    edge_services::RouteStageResource,
    edge_services::HeadStageResource,
    function::NamespaceResource,
    function::FunctionResource,
    function::CronResource,
    function::DomainResource,
    function::TriggerResource,
    function::TokenResource,
    inference::DeploymentResource,
    inference::ModelResource,
    mnq::NatsAccountResource,
    mnq::NatsCredentialsResource,
    mnq::SqsActivationResource,
    mnq::SnsActivationResource,
    mnq::SqsCredentialsResource,
    mnq::SnsCredentialsResource,
    mnq::SqsQueueResource,
    mnq::SnsTopicResource,
    mnq::SnsTopicSubscriptionResource,
    registry::RegistryNamespaceResource,
    sdb::SqlDatabaseResource,
    file::FilesystemResource,
}

fn build_data_source(name: &str, meta: &Arc<ScalewayProviderData>) -> Option<Box<dyn DataSource>> {
    use crate::data_sources::{boxed, ConsumptionsDataSource, InvoicesDataSource};

    match name {
        ConsumptionsDataSource::TYPE_NAME => Some(boxed(ConsumptionsDataSource, meta)),
        InvoicesDataSource::TYPE_NAME => Some(boxed(InvoicesDataSource, meta)),
        _ => None,
    }
}

fn data_source_schema_map() -> HashMap<String, Schema> {
    use crate::data_sources::{ConsumptionsDataSource, InvoicesDataSource};

    HashMap::from([
        (ConsumptionsDataSource::TYPE_NAME.to_string(), ConsumptionsDataSource::schema()),
        (InvoicesDataSource::TYPE_NAME.to_string(), InvoicesDataSource::schema()),
    ])
}

pub struct ScalewayProvider {
    meta: Option<Arc<ScalewayProviderData>>,
    mnq_clients: Option<Arc<dyn MnqClientFactory>>,
}

impl Default for ScalewayProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ScalewayProvider {
    pub fn new() -> Self {
        Self {
            meta: None,
            mnq_clients: None,
        }
    }

    /// Replace the AWS SDK backed SQS/SNS clients
    pub fn with_mnq_clients(mut self, factory: Arc<dyn MnqClientFactory>) -> Self {
        self.mnq_clients = Some(factory);
        self
    }

    pub fn provider_data(&self) -> Option<Arc<ScalewayProviderData>> {
        self.meta.clone()
    }

    fn provider_schema() -> Schema {
        let optional = |name: &str, description: &str| {
            AttributeBuilder::new(name, AttributeType::String)
                .description(description)
                .optional()
        };
        let uuid = || UuidValidator {
            allow_locality: false,
        };

        SchemaBuilder::new()
            .version(0)
            .description("Scaleway provider")
            .attribute(optional("access_key", "The Scaleway access key").build())
            .attribute(
                optional("secret_key", "The Scaleway secret key")
                    .sensitive()
                    .validator(uuid())
                    .build(),
            )
            .attribute(
                optional("project_id", "Default project of resources")
                    .validator(uuid())
                    .build(),
            )
            .attribute(
                optional("organization_id", "Default organization of data sources")
                    .validator(uuid())
                    .build(),
            )
            .attribute(optional("region", "Default region, fr-par when unset").build())
            .attribute(optional("zone", "Default zone, the first zone of the region when unset").build())
            .attribute(optional("api_url", "Base URL of the Scaleway API").build())
            .build()
    }

    fn decode(
        &self,
        config: &DynamicValue,
    ) -> Result<ScalewayProviderData, Diagnostics> {
        let get = |name: &str| {
            config
                .get_string(&AttributePath::new(name))
                .ok()
                .filter(|s| !s.is_empty())
        };
        let mut diagnostics = Diagnostics::new();

        let Some(secret_key) = get("secret_key") else {
            return Err(Diagnostics::from_error(
                "Missing secret key",
                "Set secret_key in the provider block",
            ));
        };

        let region = match get("region").map(|r| r.parse::<Region>()) {
            None => Region::FrPar,
            Some(Ok(region)) => region,
            Some(Err(e)) => {
                diagnostics.add_error_at(AttributePath::new("region"), "Invalid region", e.to_string());
                Region::FrPar
            }
        };
        let zone = match get("zone").map(|z| z.parse::<Zone>()) {
            None => Zone { region, number: 1 },
            Some(Ok(zone)) => zone,
            Some(Err(e)) => {
                diagnostics.add_error_at(AttributePath::new("zone"), "Invalid zone", e.to_string());
                Zone { region, number: 1 }
            }
        };
        let api_url = get("api_url").unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let client = match Client::new(&api_url, &secret_key) {
            Ok(client) => Some(client),
            Err(e) => {
                diagnostics.add_error_at(AttributePath::new("api_url"), "Failed to create API client", e.to_string());
                None
            }
        };

        let Some(client) = client.filter(|_| !diagnostics.has_errors()) else {
            return Err(diagnostics);
        };

        let mut meta = ScalewayProviderData::new(client);
        meta.access_key = get("access_key");
        meta.default_project_id = get("project_id");
        meta.default_organization_id = get("organization_id");
        meta.default_region = region;
        meta.default_zone = zone;
        if let Some(factory) = &self.mnq_clients {
            meta.mnq_clients = Arc::clone(factory);
        }
        Ok(meta)
    }
}

#[async_trait]
impl Provider for ScalewayProvider {
    fn type_name(&self) -> &str {
        "scaleway"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ProviderMetadataRequest,
    ) -> ProviderMetadataResponse {
        ProviderMetadataResponse {
            type_name: self.type_name().to_string(),
        }
    }

    async fn schema(&self, _ctx: Context, _request: ProviderSchemaRequest) -> ProviderSchemaResponse {
        ProviderSchemaResponse {
            schema: Self::provider_schema(),
            diagnostics: Diagnostics::new(),
        }
    }

    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse {
        tracing::debug!("configuring provider for terraform {}", request.terraform_version);

        match self.decode(&request.config) {
            Ok(meta) => {
                let meta = Arc::new(meta);
                self.meta = Some(Arc::clone(&meta));
                ConfigureProviderResponse {
                    diagnostics: Diagnostics::new(),
                    provider_data: Some(meta),
                }
            }
            Err(diagnostics) => ConfigureProviderResponse {
                diagnostics,
                provider_data: None,
            },
        }
    }

    async fn create_resource(&self, _ctx: Context, name: &str) -> tfplug::Result<Box<dyn Resource>> {
        let meta = self.meta.as_ref().ok_or(TfplugError::ProviderNotConfigured)?;
        build_resource(name, meta).ok_or_else(|| TfplugError::ResourceNotFound(name.to_string()))
    }

    async fn create_data_source(&self, _ctx: Context, name: &str) -> tfplug::Result<Box<dyn DataSource>> {
        let meta = self.meta.as_ref().ok_or(TfplugError::ProviderNotConfigured)?;
        build_data_source(name, meta).ok_or_else(|| TfplugError::DataSourceNotFound(name.to_string()))
    }

    async fn resource_schemas(&self) -> HashMap<String, Schema> {
        static SCHEMAS: OnceLock<HashMap<String, Schema>> = OnceLock::new();
        SCHEMAS.get_or_init(resource_schema_map).clone()
    }

    async fn data_source_schemas(&self) -> HashMap<String, Schema> {
        static SCHEMAS: OnceLock<HashMap<String, Schema>> = OnceLock::new();
        SCHEMAS.get_or_init(data_source_schema_map).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tfplug::Dynamic;

    const SECRET: &str = "11111111-1111-1111-1111-111111111111";

    fn configure_request(entries: Vec<(&str, Dynamic)>) -> ConfigureProviderRequest {
        ConfigureProviderRequest {
            terraform_version: "1.9.0".to_string(),
            config: DynamicValue::new(Dynamic::object(entries)),
        }
    }

    async fn configured() -> ScalewayProvider {
        let mut provider = ScalewayProvider::new();
        let response = provider
            .configure(
                Context::new(),
                configure_request(vec![
                    ("secret_key", Dynamic::from(SECRET)),
                    ("region", Dynamic::from("nl-ams")),
                ]),
            )
            .await;
        assert!(response.diagnostics.is_empty());
        assert!(response.provider_data.is_some());
        provider
    }

    #[tokio::test]
    async fn configure_derives_the_zone_from_the_region() {
        let provider = configured().await;
        let meta = provider.provider_data().unwrap();

        assert_eq!(meta.default_region, Region::NlAms);
        assert_eq!(meta.default_zone.to_string(), "nl-ams-1");
        assert_eq!(meta.client.base_url(), DEFAULT_API_URL);
    }

    #[tokio::test]
    async fn configure_requires_a_secret_key() {
        let mut provider = ScalewayProvider::new();
        let response = provider
            .configure(Context::new(), configure_request(vec![]))
            .await;

        assert!(response.diagnostics.has_errors());
        assert!(provider.provider_data().is_none());
    }

    #[tokio::test]
    async fn configure_rejects_unknown_regions() {
        let mut provider = ScalewayProvider::new();
        let response = provider
            .configure(
                Context::new(),
                configure_request(vec![
                    ("secret_key", Dynamic::from(SECRET)),
                    ("region", Dynamic::from("us-east-1")),
                ]),
            )
            .await;

        let error = response.diagnostics.errors().next().unwrap();
        assert_eq!(error.attribute, Some(AttributePath::new("region")));
    }

    #[tokio::test]
    async fn resources_need_a_configured_provider() {
        let provider = ScalewayProvider::new();
        let result = provider
            .create_resource(Context::new(), "scaleway_account_project")
            .await;

        assert!(matches!(result, Err(TfplugError::ProviderNotConfigured)));
    }

    #[tokio::test]
    async fn every_catalogued_type_can_be_built() {
        let provider = configured().await;

        for name in provider.resource_schemas().await.keys() {
            let resource = provider.create_resource(Context::new(), name).await.unwrap();
            assert_eq!(resource.type_name(), name);
        }
        for name in provider.data_source_schemas().await.keys() {
            let source = provider.create_data_source(Context::new(), name).await.unwrap();
            assert_eq!(source.type_name(), name);
        }

        let unknown = provider.create_resource(Context::new(), "scaleway_instance_server").await;
        assert!(matches!(unknown, Err(TfplugError::ResourceNotFound(_))));
    }

    #[tokio::test]
    async fn catalogue_covers_every_type() {
        let provider = ScalewayProvider::new();
        let resources = provider.resource_schemas().await;

        assert_eq!(resources.len(), 28);
        assert!(resources.contains_key("scaleway_mnq_sns_topic_subscription"));
        assert_eq!(resources["scaleway_mnq_sqs_queue"].version, 1);
        assert_eq!(provider.data_source_schemas().await.len(), 2);
    }
}
