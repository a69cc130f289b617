#![allow(clippy::disallowed_methods)] // Allow unwrap() in tests for clarity

use async_trait::async_trait;
use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tfplug::data_source::DataSource;
use tfplug::plan::plan_resource_change;
use tfplug::provider::{
    ConfigureProviderRequest, ConfigureProviderResponse, ProviderMetadataRequest,
    ProviderMetadataResponse, ProviderSchemaRequest, ProviderSchemaResponse,
};
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse, ReadResourceRequest,
    ReadResourceResponse, ResourceSchemaRequest, ResourceSchemaResponse, UpdateResourceRequest,
    UpdateResourceResponse, ValidateResourceConfigRequest,
};
use tfplug::{
    AttributeBuilder, AttributeType, Context, Diagnostics, Dynamic, DynamicValue, Provider,
    Resource, ResourceData, ResourceWithConfigure, Result, Schema, SchemaBuilder, TfplugError,
};

type Store = Arc<Mutex<HashMap<String, String>>>;

struct KvProvider {
    store: Option<Store>,
}

#[async_trait]
impl Provider for KvProvider {
    fn type_name(&self) -> &str {
        "kv"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ProviderMetadataRequest,
    ) -> ProviderMetadataResponse {
        ProviderMetadataResponse {
            type_name: "kv".to_string(),
        }
    }

    async fn schema(&self, _ctx: Context, _request: ProviderSchemaRequest) -> ProviderSchemaResponse {
        ProviderSchemaResponse {
            schema: SchemaBuilder::new().build(),
            diagnostics: Diagnostics::new(),
        }
    }

    async fn configure(
        &mut self,
        _ctx: Context,
        _request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse {
        let store: Store = Arc::new(Mutex::new(HashMap::new()));
        self.store = Some(store.clone());
        ConfigureProviderResponse {
            diagnostics: Diagnostics::new(),
            provider_data: Some(Arc::new(store)),
        }
    }

    async fn create_resource(&self, ctx: Context, name: &str) -> Result<Box<dyn Resource>> {
        let store = self.store.clone().ok_or(TfplugError::ProviderNotConfigured)?;
        match name {
            "kv_entry" => {
                let mut resource = KvEntry::default();
                resource
                    .configure(
                        ctx,
                        ConfigureResourceRequest {
                            provider_data: Some(Arc::new(store) as Arc<dyn Any + Send + Sync>),
                        },
                    )
                    .await;
                Ok(Box::new(resource))
            }
            other => Err(TfplugError::ResourceNotFound(other.to_string())),
        }
    }

    async fn create_data_source(&self, _ctx: Context, name: &str) -> Result<Box<dyn DataSource>> {
        Err(TfplugError::DataSourceNotFound(name.to_string()))
    }

    async fn resource_schemas(&self) -> HashMap<String, Schema> {
        HashMap::from([("kv_entry".to_string(), entry_schema())])
    }

    async fn data_source_schemas(&self) -> HashMap<String, Schema> {
        HashMap::new()
    }
}

fn entry_schema() -> Schema {
    SchemaBuilder::new()
        .attribute(AttributeBuilder::new("id", AttributeType::String).computed().build())
        .attribute(
            AttributeBuilder::new("key", AttributeType::String)
                .required()
                .force_new()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("value", AttributeType::String)
                .required()
                .build(),
        )
        .build()
}

#[derive(Default)]
struct KvEntry {
    store: Option<Store>,
}

#[async_trait]
impl ResourceWithConfigure for KvEntry {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        let mut diagnostics = Diagnostics::new();
        match request.provider_data.and_then(|d| d.downcast::<Store>().ok()) {
            Some(store) => self.store = Some(store.as_ref().clone()),
            None => diagnostics.add_error("Provider not configured", "missing store"),
        }
        ConfigureResourceResponse { diagnostics }
    }
}

#[async_trait]
impl Resource for KvEntry {
    fn type_name(&self) -> &str {
        "kv_entry"
    }

    async fn schema(&self, _ctx: Context, _r: ResourceSchemaRequest) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: entry_schema(),
            diagnostics: Diagnostics::new(),
        }
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let mut data = ResourceData::for_create(&request);
        ctx.sleep(Duration::from_millis(1)).await.unwrap();
        let key = data.get_string("key").unwrap();
        let value = data.get_string("value").unwrap();
        self.store.as_ref().unwrap().lock().unwrap().insert(key.clone(), value);
        data.set_id(key);
        CreateResourceResponse::from_data(data, vec![], Diagnostics::new())
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let mut data = ResourceData::for_read(&request);
        let found = self.store.as_ref().unwrap().lock().unwrap().get(&data.id()).cloned();
        match found {
            Some(value) => data.set("value", value).unwrap(),
            None => data.set_id(""),
        }
        ReadResourceResponse::from_data(data, request.private, Diagnostics::new())
    }

    async fn update(&self, _ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let data = ResourceData::for_update(&request);
        if data.has_change("value") {
            self.store
                .as_ref()
                .unwrap()
                .lock()
                .unwrap()
                .insert(data.id(), data.get_string("value").unwrap());
        }
        UpdateResourceResponse::from_data(data, vec![], Diagnostics::new())
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let data = ResourceData::for_delete(&request);
        self.store.as_ref().unwrap().lock().unwrap().remove(&data.id());
        DeleteResourceResponse {
            diagnostics: Diagnostics::new(),
        }
    }
}

fn config(key: &str, value: &str) -> DynamicValue {
    DynamicValue::new(Dynamic::object([
        ("key", Dynamic::from(key)),
        ("value", Dynamic::from(value)),
    ]))
}

async fn configured_provider() -> KvProvider {
    let mut provider = KvProvider { store: None };
    let response = provider
        .configure(
            Context::new(),
            ConfigureProviderRequest {
                terraform_version: "1.12.0".to_string(),
                config: DynamicValue::empty_object(),
            },
        )
        .await;
    assert!(!response.diagnostics.has_errors());
    provider
}

#[tokio::test]
async fn unconfigured_provider_refuses_resources() {
    let provider = KvProvider { store: None };

    let err = provider
        .create_resource(Context::new(), "kv_entry")
        .await
        .err()
        .unwrap();

    assert_eq!(err.to_string(), "Provider not configured");
}

#[tokio::test]
async fn plan_create_read_and_tombstone() {
    let provider = configured_provider().await;
    let resource = provider.create_resource(Context::new(), "kv_entry").await.unwrap();
    let config = config("greeting", "hello");

    let plan = plan_resource_change(&entry_schema(), &DynamicValue::null(), &config, &config);
    let created = resource
        .create(
            Context::new(),
            CreateResourceRequest {
                type_name: "kv_entry".to_string(),
                planned_state: plan.planned_state,
                config: config.clone(),
                planned_private: vec![],
                planned_identity: None,
            },
        )
        .await;
    assert!(created.diagnostics.is_empty());

    let read = resource
        .read(
            Context::new(),
            ReadResourceRequest {
                type_name: "kv_entry".to_string(),
                current_state: created.new_state.clone(),
                private: vec![],
                current_identity: None,
            },
        )
        .await;
    let state = read.new_state.unwrap();
    assert_eq!(state, created.new_state);

    let replan = plan_resource_change(&entry_schema(), &state, &config, &config);
    assert_eq!(replan.planned_state, state);
    assert!(replan.requires_replace.is_empty());

    resource
        .delete(
            Context::new(),
            DeleteResourceRequest {
                type_name: "kv_entry".to_string(),
                prior_state: state.clone(),
                planned_private: vec![],
                prior_identity: None,
            },
        )
        .await;

    let gone = resource
        .read(
            Context::new(),
            ReadResourceRequest {
                type_name: "kv_entry".to_string(),
                current_state: state,
                private: vec![],
                current_identity: None,
            },
        )
        .await;
    assert!(gone.new_state.is_none());
    assert!(gone.diagnostics.is_empty());
}

#[tokio::test]
async fn concurrent_resource_creation() {
    let provider = Arc::new(configured_provider().await);
    let mut handles = vec![];

    for i in 0..5 {
        let provider = provider.clone();
        handles.push(tokio::spawn(async move {
            let resource = provider.create_resource(Context::new(), "kv_entry").await.unwrap();
            let config = config(&format!("k{}", i), "v");
            resource
                .create(
                    Context::new(),
                    CreateResourceRequest {
                        type_name: "kv_entry".to_string(),
                        planned_state: config.clone(),
                        config,
                        planned_private: vec![],
                        planned_identity: None,
                    },
                )
                .await
        }));
    }

    for handle in handles {
        assert!(!handle.await.unwrap().diagnostics.has_errors());
    }
    assert_eq!(provider.store.as_ref().unwrap().lock().unwrap().len(), 5);
}

#[tokio::test]
async fn validate_rejects_missing_value() {
    let provider = configured_provider().await;
    let resource = provider.create_resource(Context::new(), "kv_entry").await.unwrap();

    let response = resource
        .validate(
            Context::new(),
            ValidateResourceConfigRequest {
                type_name: "kv_entry".to_string(),
                config: DynamicValue::new(Dynamic::object([("key", Dynamic::from("k"))])),
            },
        )
        .await;

    assert!(response.diagnostics.has_errors());
}
