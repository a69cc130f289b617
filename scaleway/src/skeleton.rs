//! Lifecycle shared by every Scaleway resource
//!
//! A resource implements [`ScalewayResource`] with plain handlers over a
//! [`ResourceData`]; [`Managed`] adapts it to the tfplug traits. The wrapper
//! applies per-operation timeouts, re-reads after create and update, maps a
//! tombstone to a missing state and keeps the identity in step with the ID.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ReadResourceRequest,
    ReadResourceResponse, ResourceSchemaRequest, ResourceSchemaResponse, UpdateResourceRequest,
    UpdateResourceResponse, UpgradeResourceStateRequest, UpgradeResourceStateResponse,
    ValidateResourceConfigRequest, ValidateResourceConfigResponse,
};
use tfplug::{
    import_state_from_identity, AttributePath, Context, Diagnostics, Dynamic, DynamicValue,
    IdentitySchema, Resource, ResourceData, ResourceWithConfigure, ResourceWithIdentity,
    ResourceWithImportState, ResourceWithUpgradeState, Schema,
};

use crate::api::ApiError;
use crate::errors::{is_not_found, is_not_found_with, ErrorPolicy};
use crate::provider_data::ScalewayProviderData;
use crate::waiter::WaitError;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Deadline of each lifecycle operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub create: Duration,
    pub read: Duration,
    pub update: Duration,
    pub delete: Duration,
}

impl Timeouts {
    pub const fn uniform(timeout: Duration) -> Self {
        Self {
            create: timeout,
            read: timeout,
            update: timeout,
            delete: timeout,
        }
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self::uniform(DEFAULT_TIMEOUT)
    }
}

/// Handlers of one resource type
///
/// Create must persist the ID as soon as the backend returns it; the
/// wrapper reads the resource afterwards. Read tombstones with
/// `data.set_id("")` when the resource is gone.
#[async_trait]
pub trait ScalewayResource: Send + Sync + 'static {
    const TYPE_NAME: &'static str;

    fn schema() -> Schema;

    fn identity_schema() -> IdentitySchema;

    /// Rebuild the primary ID from identity fields during import
    fn compose_id(fields: &HashMap<String, String>) -> Option<String>;

    fn timeouts() -> Timeouts {
        Timeouts::default()
    }

    /// Cross-attribute checks beyond per-attribute validators
    fn validate(_config: &DynamicValue, _diagnostics: &mut Diagnostics) {}

    /// Migrate a stored state of schema `version` to the current schema
    fn upgrade_state(_version: i64, _state: &mut DynamicValue) -> Result<(), String> {
        Ok(())
    }

    async fn create(
        &self,
        ctx: &Context,
        meta: &ScalewayProviderData,
        data: &mut ResourceData,
    ) -> Diagnostics;

    async fn read(
        &self,
        ctx: &Context,
        meta: &ScalewayProviderData,
        data: &mut ResourceData,
    ) -> Diagnostics;

    async fn update(
        &self,
        ctx: &Context,
        meta: &ScalewayProviderData,
        data: &mut ResourceData,
    ) -> Diagnostics;

    async fn delete(
        &self,
        ctx: &Context,
        meta: &ScalewayProviderData,
        data: &mut ResourceData,
    ) -> Diagnostics;
}

/// Adapter from a [`ScalewayResource`] to the tfplug resource traits
pub struct Managed<R> {
    resource: R,
    meta: Option<Arc<ScalewayProviderData>>,
}

impl<R: ScalewayResource> Managed<R> {
    pub fn new(resource: R) -> Self {
        Self {
            resource,
            meta: None,
        }
    }

    pub fn with_meta(resource: R, meta: Arc<ScalewayProviderData>) -> Self {
        Self {
            resource,
            meta: Some(meta),
        }
    }

    /// Provider data whose client is bound to the handler's context
    fn meta(&self, ctx: &Context) -> Result<ScalewayProviderData, Diagnostics> {
        self.meta
            .as_deref()
            .map(|meta| meta.scoped(ctx))
            .ok_or_else(|| {
                Diagnostics::from_error(
                    "Provider not configured",
                    format!("{} was used before the provider was configured", R::TYPE_NAME),
                )
            })
    }

    /// Create followed by a read of what was created
    pub async fn create_data(&self, ctx: &Context, data: &mut ResourceData) -> Diagnostics {
        let ctx = ctx.with_timeout(R::timeouts().create);
        let meta = match self.meta(&ctx) {
            Ok(meta) => meta,
            Err(diagnostics) => return diagnostics,
        };

        tracing::debug!("creating {}", R::TYPE_NAME);
        let mut diagnostics = self.resource.create(&ctx, &meta, data).await;
        if diagnostics.has_errors() || data.id().is_empty() {
            return diagnostics;
        }

        diagnostics.extend(self.resource.read(&ctx, &meta, data).await);
        if data.is_tombstoned() && !diagnostics.has_errors() {
            diagnostics.add_error(
                format!("{} not found after creation", R::TYPE_NAME),
                "The resource was created but could not be read back",
            );
        }
        diagnostics
    }

    pub async fn read_data(&self, ctx: &Context, data: &mut ResourceData) -> Diagnostics {
        let ctx = ctx.with_timeout(R::timeouts().read);
        let meta = match self.meta(&ctx) {
            Ok(meta) => meta,
            Err(diagnostics) => return diagnostics,
        };
        self.resource.read(&ctx, &meta, data).await
    }

    /// Update followed by a read of the new remote state
    pub async fn update_data(&self, ctx: &Context, data: &mut ResourceData) -> Diagnostics {
        let ctx = ctx.with_timeout(R::timeouts().update);
        let meta = match self.meta(&ctx) {
            Ok(meta) => meta,
            Err(diagnostics) => return diagnostics,
        };

        tracing::debug!("updating {} {}", R::TYPE_NAME, data.id());
        let mut diagnostics = self.resource.update(&ctx, &meta, data).await;
        if diagnostics.has_errors() {
            return diagnostics;
        }

        diagnostics.extend(self.resource.read(&ctx, &meta, data).await);
        if data.is_tombstoned() && !diagnostics.has_errors() {
            diagnostics.add_error(
                format!("{} not found after update", R::TYPE_NAME),
                "The resource vanished while it was being updated",
            );
        }
        diagnostics
    }

    pub async fn delete_data(&self, ctx: &Context, data: &mut ResourceData) -> Diagnostics {
        let ctx = ctx.with_timeout(R::timeouts().delete);
        let meta = match self.meta(&ctx) {
            Ok(meta) => meta,
            Err(diagnostics) => return diagnostics,
        };

        tracing::debug!("deleting {} {}", R::TYPE_NAME, data.id());
        self.resource.delete(&ctx, &meta, data).await
    }
}

fn state_or_null(data: ResourceData) -> DynamicValue {
    data.into_state().unwrap_or_else(DynamicValue::null)
}

#[async_trait]
impl<R: ScalewayResource> Resource for Managed<R> {
    fn type_name(&self) -> &str {
        R::TYPE_NAME
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ResourceSchemaRequest,
    ) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: R::schema(),
            diagnostics: Diagnostics::new(),
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        let mut diagnostics = tfplug::plan::validate_config(&R::schema(), &request.config);
        R::validate(&request.config, &mut diagnostics);
        ValidateResourceConfigResponse { diagnostics }
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let mut data = ResourceData::for_create(&request);
        let diagnostics = self.create_data(&ctx, &mut data).await;
        CreateResourceResponse::from_data(data, request.planned_private, diagnostics)
    }

    async fn read(&self, ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let mut data = ResourceData::for_read(&request);
        let diagnostics = self.read_data(&ctx, &mut data).await;

        if data.is_tombstoned() {
            tracing::debug!("{} is gone, removing from state", R::TYPE_NAME);
        }
        ReadResourceResponse::from_data(data, request.private, diagnostics)
    }

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let mut data = ResourceData::for_update(&request);
        let diagnostics = self.update_data(&ctx, &mut data).await;
        UpdateResourceResponse::from_data(data, request.planned_private, diagnostics)
    }

    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let mut data = ResourceData::for_delete(&request);
        DeleteResourceResponse {
            diagnostics: self.delete_data(&ctx, &mut data).await,
        }
    }
}

#[async_trait]
impl<R: ScalewayResource> ResourceWithConfigure for Managed<R> {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        let mut diagnostics = Diagnostics::new();

        match request.provider_data {
            Some(data) => match data.downcast::<ScalewayProviderData>() {
                Ok(meta) => self.meta = Some(meta),
                Err(_) => diagnostics.add_error(
                    "Unexpected provider data",
                    format!("{} expects Scaleway provider data", R::TYPE_NAME),
                ),
            },
            None => diagnostics.add_error(
                "Provider not configured",
                "No provider data was supplied",
            ),
        }

        ConfigureResourceResponse { diagnostics }
    }
}

impl<R: ScalewayResource> ResourceWithIdentity for Managed<R> {
    fn identity_schema(&self) -> IdentitySchema {
        R::identity_schema()
    }
}

#[async_trait]
impl<R: ScalewayResource> ResourceWithImportState for Managed<R> {
    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let mut response = ImportResourceStateResponse {
            imported_resources: Vec::new(),
            diagnostics: Diagnostics::new(),
        };
        import_state_from_identity(
            &ctx,
            AttributePath::new("id"),
            &request,
            &mut response,
            R::compose_id,
        );

        for imported in &mut response.imported_resources {
            let mut data = ResourceData::from_state(imported.state.clone());
            let diagnostics = self.read_data(&ctx, &mut data).await;
            let failed = diagnostics.has_errors();
            response.diagnostics.extend(diagnostics);
            if failed {
                continue;
            }
            if data.is_tombstoned() {
                response.diagnostics.add_error(
                    "Cannot import non-existent remote object",
                    format!("No {} exists with ID {:?}", R::TYPE_NAME, request.id),
                );
                continue;
            }
            imported.identity = data.identity_data().or(imported.identity.take());
            imported.state = state_or_null(data);
        }

        if response.diagnostics.has_errors() {
            response.imported_resources.clear();
        }
        response
    }
}

#[async_trait]
impl<R: ScalewayResource> ResourceWithUpgradeState for Managed<R> {
    async fn upgrade_state(
        &self,
        _ctx: Context,
        request: UpgradeResourceStateRequest,
    ) -> UpgradeResourceStateResponse {
        let mut diagnostics = Diagnostics::new();

        let Some(json) = request.raw_state.json.as_deref() else {
            diagnostics.add_error(
                "Unsupported state format",
                format!("{} state has no JSON form", R::TYPE_NAME),
            );
            return UpgradeResourceStateResponse {
                upgraded_state: DynamicValue::null(),
                diagnostics,
            };
        };

        let mut state = match DynamicValue::decode_json(json) {
            Ok(state) => state,
            Err(err) => {
                return UpgradeResourceStateResponse {
                    upgraded_state: DynamicValue::null(),
                    diagnostics: Diagnostics::from_error("Failed to decode stored state", err),
                }
            }
        };

        if let Err(err) = R::upgrade_state(request.version, &mut state) {
            diagnostics.add_error(
                format!("Failed to upgrade {} state", R::TYPE_NAME),
                err,
            );
        }

        UpgradeResourceStateResponse {
            upgraded_state: state,
            diagnostics,
        }
    }
}

/// Erase a configured resource into the provider's catalogue type
pub fn boxed<R: ScalewayResource>(
    resource: R,
    meta: &Arc<ScalewayProviderData>,
) -> Box<dyn Resource> {
    Box::new(Managed::with_meta(resource, Arc::clone(meta)))
}

/// Tombstone on NotFound, error otherwise
pub fn read_failure(data: &mut ResourceData, summary: &str, err: &ApiError) -> Diagnostics {
    read_failure_with(data, summary, err, &ErrorPolicy::default())
}

pub fn read_failure_with(
    data: &mut ResourceData,
    summary: &str,
    err: &ApiError,
    policy: &ErrorPolicy,
) -> Diagnostics {
    if is_not_found_with(err, policy) {
        data.set_id("");
        return Diagnostics::new();
    }
    Diagnostics::from_error(summary, err)
}

/// Waiter counterpart of [`read_failure`]
pub fn wait_failure(data: &mut ResourceData, summary: &str, err: &WaitError) -> Diagnostics {
    match err {
        WaitError::NotFound => {
            data.set_id("");
            Diagnostics::new()
        }
        WaitError::Api(api) => read_failure(data, summary, api),
        other => Diagnostics::from_error(summary, other),
    }
}

/// Deleting something already gone is success
pub fn ignore_not_found(result: Result<(), ApiError>) -> Result<(), ApiError> {
    match result {
        Err(err) if is_not_found(&err) => Ok(()),
        other => other,
    }
}

pub fn ignore_gone(result: Result<(), WaitError>) -> Result<(), WaitError> {
    match result {
        Err(WaitError::NotFound) => Ok(()),
        Err(WaitError::Api(err)) if is_not_found(&err) => Ok(()),
        other => other,
    }
}

/// Write flattened values into state, collecting failures as one error
pub fn set_values<I>(data: &mut ResourceData, values: I) -> Diagnostics
where
    I: IntoIterator<Item = (&'static str, Dynamic)>,
{
    let mut failures = Vec::new();
    for (path, value) in values {
        if let Err(err) = data.set(path, value) {
            failures.push(format!("{}: {}", path, err));
        }
    }
    if failures.is_empty() {
        return Diagnostics::new();
    }
    Diagnostics::from_error("Failed to set state", failures.join("; "))
}

/// Single error diagnostic for an invalid ID or locality
pub fn id_error(err: impl fmt::Display) -> Diagnostics {
    Diagnostics::from_error("Invalid resource ID", err)
}

/// `project_id` or the provider default, as an error diagnostic when neither is set
pub fn require_project(meta: &ScalewayProviderData, data: &ResourceData) -> Result<String, Diagnostics> {
    meta.project_id(data).ok_or_else(|| {
        Diagnostics::from_error(
            "Missing project",
            "Set project_id on the resource or the provider",
        )
    })
}

/// Downcast helper for data sources and tests
pub fn downcast_meta(data: Option<Arc<dyn Any + Send + Sync>>) -> Option<Arc<ScalewayProviderData>> {
    data?.downcast::<ScalewayProviderData>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Client;
    use std::sync::Mutex;
    use tfplug::{AttributeBuilder, AttributeType, SchemaBuilder};

    const UUID: &str = "11111111-2222-3333-4444-555555555555";

    /// In-memory backend: `None` means the object does not exist
    #[derive(Default)]
    struct Widget {
        remote: Mutex<Option<String>>,
        vanish_after_create: bool,
        updates: Mutex<u32>,
    }

    #[async_trait]
    impl ScalewayResource for Widget {
        const TYPE_NAME: &'static str = "scaleway_widget";

        fn schema() -> Schema {
            SchemaBuilder::new()
                .version(1)
                .attribute(AttributeBuilder::new("id", AttributeType::String).computed().build())
                .attribute(AttributeBuilder::new("name", AttributeType::String).required().build())
                .build()
        }

        fn identity_schema() -> IdentitySchema {
            crate::identity::flat_identity_schema("widget_id")
        }

        fn compose_id(fields: &HashMap<String, String>) -> Option<String> {
            crate::identity::compose_flat(fields, "widget_id")
        }

        fn upgrade_state(version: i64, state: &mut DynamicValue) -> Result<(), String> {
            if version == 0 {
                let old = state.remove_attribute("title").ok_or("missing title")?;
                state
                    .set_value(&AttributePath::new("name"), old)
                    .map_err(|e| e.to_string())?;
            }
            Ok(())
        }

        async fn create(
            &self,
            _ctx: &Context,
            _meta: &ScalewayProviderData,
            data: &mut ResourceData,
        ) -> Diagnostics {
            let name = data.get_string("name").unwrap_or_default();
            if !self.vanish_after_create {
                *self.remote.lock().unwrap() = Some(name);
            }
            crate::identity::persist_flat_identity(data, "widget_id", UUID);
            Diagnostics::new()
        }

        async fn read(
            &self,
            _ctx: &Context,
            _meta: &ScalewayProviderData,
            data: &mut ResourceData,
        ) -> Diagnostics {
            let remote = self.remote.lock().unwrap().clone();
            match remote {
                Some(name) => {
                    crate::identity::persist_flat_identity(data, "widget_id", UUID);
                    set_values(data, [("name", Dynamic::from(name))])
                }
                None => {
                    data.set_id("");
                    Diagnostics::new()
                }
            }
        }

        async fn update(
            &self,
            _ctx: &Context,
            _meta: &ScalewayProviderData,
            data: &mut ResourceData,
        ) -> Diagnostics {
            if data.has_change("name") {
                *self.updates.lock().unwrap() += 1;
                *self.remote.lock().unwrap() = data.get_string("name");
            }
            Diagnostics::new()
        }

        async fn delete(
            &self,
            _ctx: &Context,
            _meta: &ScalewayProviderData,
            _data: &mut ResourceData,
        ) -> Diagnostics {
            *self.remote.lock().unwrap() = None;
            Diagnostics::new()
        }
    }

    fn meta() -> Arc<ScalewayProviderData> {
        Arc::new(ScalewayProviderData::new(
            Client::new("http://localhost", UUID).unwrap(),
        ))
    }

    fn named(name: &str) -> DynamicValue {
        DynamicValue::new(Dynamic::object([
            ("id", Dynamic::Unknown),
            ("name", Dynamic::from(name)),
        ]))
    }

    fn create_request(name: &str) -> CreateResourceRequest {
        CreateResourceRequest {
            type_name: Widget::TYPE_NAME.to_string(),
            planned_state: named(name),
            config: named(name),
            planned_private: Vec::new(),
            planned_identity: None,
        }
    }

    #[tokio::test]
    async fn create_reads_back_and_sets_identity() {
        let resource = Managed::with_meta(Widget::default(), meta());
        let response = resource.create(Context::new(), create_request("w")).await;

        assert!(response.diagnostics.is_empty());
        assert_eq!(
            response.new_state.get_string(&AttributePath::new("id")).unwrap(),
            UUID
        );
        assert!(response.new_identity.is_some());
    }

    #[tokio::test]
    async fn vanishing_after_create_is_an_error() {
        let widget = Widget {
            vanish_after_create: true,
            ..Default::default()
        };
        let resource = Managed::with_meta(widget, meta());
        let response = resource.create(Context::new(), create_request("w")).await;

        assert!(response.diagnostics.has_errors());
    }

    #[tokio::test]
    async fn read_of_missing_object_drops_state() {
        let resource = Managed::with_meta(Widget::default(), meta());
        let response = resource
            .read(
                Context::new(),
                ReadResourceRequest {
                    type_name: Widget::TYPE_NAME.to_string(),
                    current_state: named("w"),
                    private: Vec::new(),
                    current_identity: None,
                },
            )
            .await;

        assert!(response.new_state.is_none());
        assert!(response.diagnostics.is_empty());
        assert!(response.new_identity.is_none());
    }

    #[tokio::test]
    async fn unchanged_update_makes_no_change() {
        let resource = Managed::with_meta(Widget::default(), meta());
        resource.create(Context::new(), create_request("w")).await;

        let mut state = named("w");
        state
            .set_string(&AttributePath::new("id"), UUID.to_string())
            .unwrap();
        let response = resource
            .update(
                Context::new(),
                UpdateResourceRequest {
                    type_name: Widget::TYPE_NAME.to_string(),
                    prior_state: state.clone(),
                    planned_state: state.clone(),
                    config: state,
                    planned_private: Vec::new(),
                    planned_identity: None,
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        assert_eq!(*resource.resource.updates.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn import_of_missing_object_fails() {
        let resource = Managed::with_meta(Widget::default(), meta());
        let response = resource
            .import_state(
                Context::new(),
                ImportResourceStateRequest {
                    type_name: Widget::TYPE_NAME.to_string(),
                    id: UUID.to_string(),
                    identity: None,
                },
            )
            .await;

        assert!(response.imported_resources.is_empty());
        assert_eq!(
            response.diagnostics.errors().next().unwrap().summary,
            "Cannot import non-existent remote object"
        );
    }

    #[tokio::test]
    async fn unconfigured_resource_reports_error() {
        let resource = Managed::new(Widget::default());
        let response = resource.create(Context::new(), create_request("w")).await;

        assert!(response.new_state.is_null());
        assert_eq!(
            response.diagnostics.errors().next().unwrap().summary,
            "Provider not configured"
        );
    }

    #[tokio::test]
    async fn configure_accepts_provider_data() {
        let mut resource = Managed::new(Widget::default());
        let data: Arc<dyn Any + Send + Sync> = meta();
        let response = resource
            .configure(
                Context::new(),
                ConfigureResourceRequest {
                    provider_data: Some(data),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        assert!(resource.meta.is_some());
    }

    #[tokio::test]
    async fn upgrade_runs_resource_migration() {
        let resource = Managed::with_meta(Widget::default(), meta());
        let response = resource
            .upgrade_state(
                Context::new(),
                UpgradeResourceStateRequest {
                    type_name: Widget::TYPE_NAME.to_string(),
                    version: 0,
                    raw_state: tfplug::types::RawState {
                        json: Some(br#"{"id":"x","title":"old"}"#.to_vec()),
                        flatmap: None,
                    },
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        assert_eq!(
            response
                .upgraded_state
                .get_string(&AttributePath::new("name"))
                .unwrap(),
            "old"
        );
    }
}
