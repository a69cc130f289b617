//! Managed resources
//!
//! A resource answers the CRUD calls of the plan/apply cycle. Handlers
//! usually wrap the request in a [`ResourceData`], mutate it, and turn it
//! back into a response with the `from_data` constructors below, which
//! take care of tombstones and identities.

use crate::context::Context;
use crate::plan::validate_config;
use crate::resource_data::ResourceData;
use crate::schema::{IdentitySchema, Schema};
use crate::types::{Diagnostics, DynamicValue, RawState, ResourceIdentityData};
use async_trait::async_trait;
use std::any::Any;
use std::sync::Arc;

#[async_trait]
pub trait Resource: Send + Sync {
    /// Name under which the provider hands the resource out, e.g. "scaleway_function"
    fn type_name(&self) -> &str;

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ResourceMetadataRequest,
    ) -> ResourceMetadataResponse {
        ResourceMetadataResponse {
            type_name: self.type_name().to_string(),
        }
    }

    async fn schema(&self, ctx: Context, request: ResourceSchemaRequest) -> ResourceSchemaResponse;

    /// Schema-level checks only; override to add cross-attribute rules
    async fn validate(
        &self,
        ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        let schema = self.schema(ctx, ResourceSchemaRequest).await;
        let mut diagnostics = schema.diagnostics;
        diagnostics.extend(validate_config(&schema.schema, &request.config));
        ValidateResourceConfigResponse { diagnostics }
    }

    /// The new state must carry every computed attribute
    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse;

    /// A `None` state drops the resource from state
    async fn read(&self, ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse;

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse;

    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse;
}

pub struct ResourceMetadataRequest;

pub struct ResourceMetadataResponse {
    pub type_name: String,
}

pub struct ResourceSchemaRequest;

pub struct ResourceSchemaResponse {
    pub schema: Schema,
    pub diagnostics: Diagnostics,
}

pub struct ValidateResourceConfigRequest {
    pub type_name: String,
    pub config: DynamicValue,
}

pub struct ValidateResourceConfigResponse {
    pub diagnostics: Diagnostics,
}

pub struct CreateResourceRequest {
    pub type_name: String,
    pub planned_state: DynamicValue,
    pub config: DynamicValue,
    pub planned_private: Vec<u8>,
    pub planned_identity: Option<ResourceIdentityData>,
}

pub struct CreateResourceResponse {
    pub new_state: DynamicValue,
    pub private: Vec<u8>,
    pub diagnostics: Diagnostics,
    pub new_identity: Option<ResourceIdentityData>,
}

impl CreateResourceResponse {
    /// A create that never set an ID stores nothing
    pub fn from_data(data: ResourceData, private: Vec<u8>, diagnostics: Diagnostics) -> Self {
        let new_identity = data.identity_data();
        let new_state = if data.id().is_empty() {
            DynamicValue::null()
        } else {
            data.into_state().unwrap_or_else(DynamicValue::null)
        };
        Self {
            new_state,
            private,
            diagnostics,
            new_identity,
        }
    }
}

pub struct ReadResourceRequest {
    pub type_name: String,
    pub current_state: DynamicValue,
    pub private: Vec<u8>,
    pub current_identity: Option<ResourceIdentityData>,
}

pub struct ReadResourceResponse {
    pub new_state: Option<DynamicValue>,
    pub diagnostics: Diagnostics,
    pub private: Vec<u8>,
    pub new_identity: Option<ResourceIdentityData>,
}

impl ReadResourceResponse {
    /// A tombstoned `data` yields no state
    pub fn from_data(data: ResourceData, private: Vec<u8>, diagnostics: Diagnostics) -> Self {
        let new_identity = data.identity_data();
        Self {
            new_state: data.into_state(),
            diagnostics,
            private,
            new_identity,
        }
    }
}

pub struct UpdateResourceRequest {
    pub type_name: String,
    pub prior_state: DynamicValue,
    pub planned_state: DynamicValue,
    pub config: DynamicValue,
    pub planned_private: Vec<u8>,
    pub planned_identity: Option<ResourceIdentityData>,
}

pub struct UpdateResourceResponse {
    pub new_state: DynamicValue,
    pub private: Vec<u8>,
    pub diagnostics: Diagnostics,
    pub new_identity: Option<ResourceIdentityData>,
}

impl UpdateResourceResponse {
    pub fn from_data(data: ResourceData, private: Vec<u8>, diagnostics: Diagnostics) -> Self {
        let new_identity = data.identity_data();
        Self {
            new_state: data.into_state().unwrap_or_else(DynamicValue::null),
            private,
            diagnostics,
            new_identity,
        }
    }
}

pub struct DeleteResourceRequest {
    pub type_name: String,
    pub prior_state: DynamicValue,
    pub planned_private: Vec<u8>,
    pub prior_identity: Option<ResourceIdentityData>,
}

pub struct DeleteResourceResponse {
    pub diagnostics: Diagnostics,
}

/// Receives the provider's configured state right after the resource is built
#[async_trait]
pub trait ResourceWithConfigure: Resource {
    async fn configure(
        &mut self,
        ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse;
}

pub struct ConfigureResourceRequest {
    /// `ConfigureProviderResponse::provider_data`, to be downcast
    pub provider_data: Option<Arc<dyn Any + Send + Sync>>,
}

pub struct ConfigureResourceResponse {
    pub diagnostics: Diagnostics,
}

/// Resources publishing a resource identity alongside their ID
pub trait ResourceWithIdentity: Resource {
    fn identity_schema(&self) -> IdentitySchema;
}

/// Migrates state written under an older schema version
#[async_trait]
pub trait ResourceWithUpgradeState: Resource {
    async fn upgrade_state(
        &self,
        ctx: Context,
        request: UpgradeResourceStateRequest,
    ) -> UpgradeResourceStateResponse;
}

pub struct UpgradeResourceStateRequest {
    pub type_name: String,
    pub version: i64,
    pub raw_state: RawState,
}

pub struct UpgradeResourceStateResponse {
    pub upgraded_state: DynamicValue,
    pub diagnostics: Diagnostics,
}

/// `terraform import` by ID or by identity
#[async_trait]
pub trait ResourceWithImportState: Resource {
    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse;
}

pub struct ImportResourceStateRequest {
    pub type_name: String,
    pub id: String,
    pub identity: Option<ResourceIdentityData>,
}

pub struct ImportResourceStateResponse {
    pub imported_resources: Vec<ImportedResource>,
    pub diagnostics: Diagnostics,
}

pub struct ImportedResource {
    pub type_name: String,
    pub state: DynamicValue,
    pub private: Vec<u8>,
    pub identity: Option<ResourceIdentityData>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Dynamic;

    fn planned(entries: Vec<(&str, Dynamic)>) -> CreateResourceRequest {
        CreateResourceRequest {
            type_name: "test_thing".to_string(),
            planned_state: DynamicValue::new(Dynamic::object(entries.clone())),
            config: DynamicValue::new(Dynamic::object(entries)),
            planned_private: vec![],
            planned_identity: None,
        }
    }

    #[test]
    fn create_without_id_stores_nothing() {
        let data = ResourceData::for_create(&planned(vec![("name", Dynamic::from("a"))]));
        let response = CreateResourceResponse::from_data(data, vec![], Diagnostics::new());

        assert!(response.new_state.is_null());
        assert!(response.new_identity.is_none());
    }

    #[test]
    fn create_with_id_keeps_state_and_identity() {
        let mut data = ResourceData::for_create(&planned(vec![("name", Dynamic::from("a"))]));
        data.set_id("fr-par/1");
        data.set_identity("id", "1");
        let response = CreateResourceResponse::from_data(data, vec![7], Diagnostics::new());

        assert_eq!(response.private, vec![7]);
        assert!(response.new_identity.is_some());
        assert!(!response.new_state.is_null());
    }

    #[test]
    fn tombstoned_read_has_no_state() {
        let mut data = ResourceData::from_state(DynamicValue::new(Dynamic::object([(
            "id",
            Dynamic::from("x"),
        )])));
        data.set_id("");
        let response = ReadResourceResponse::from_data(data, vec![], Diagnostics::new());

        assert!(response.new_state.is_none());
    }
}
