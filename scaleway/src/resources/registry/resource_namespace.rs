//! Container registry namespace
//!
//! Deletion is asynchronous: the namespace sits in `deleting` while its
//! images are purged and only then returns 404.

use std::collections::HashMap;

use async_trait::async_trait;
use tfplug::validator::StringPatternValidator;
use tfplug::{
    AttributeBuilder, AttributeType, Context, Diagnostics, Dynamic, IdentitySchema, ResourceData,
    Schema, SchemaBuilder,
};

use crate::api::registry::{CreateNamespaceRequest, Namespace, UpdateNamespaceRequest};
use crate::identity::{compose_regional, persist_regional_identity, regional_identity_schema};
use crate::provider_data::ScalewayProviderData;
use crate::resources::{
    id_attribute, organization_id_attribute, project_id_attribute, region_attribute, regional_id,
    resolve_region, status_attribute,
};
use crate::skeleton::{
    ignore_gone, ignore_not_found, require_project, set_values, wait_failure, ScalewayResource,
};
use crate::waiter::{wait_for, wait_for_deletion, REGISTRY_NAMESPACE};

const NAME_PATTERN: &str = r"^[a-z0-9]+(?:[._-][a-z0-9]+)*$";

pub struct RegistryNamespaceResource;

fn flatten(data: &mut ResourceData, namespace: Namespace) -> Diagnostics {
    set_values(
        data,
        [
            ("name", Dynamic::from(namespace.name)),
            ("description", Dynamic::from(Some(namespace.description).filter(|d| !d.is_empty()))),
            ("is_public", Dynamic::from(namespace.is_public)),
            ("endpoint", Dynamic::from(namespace.endpoint)),
            ("status", Dynamic::from(namespace.status)),
            ("project_id", Dynamic::from(namespace.project_id)),
            ("organization_id", Dynamic::from(namespace.organization_id)),
        ],
    )
}

#[async_trait]
impl ScalewayResource for RegistryNamespaceResource {
    const TYPE_NAME: &'static str = "scaleway_registry_namespace";

    fn schema() -> Schema {
        let mut name = AttributeBuilder::new("name", AttributeType::String)
            .description("The name of the namespace, unique per region")
            .required()
            .force_new();
        let described = "lowercase letters and digits, separated by single dots, dashes or underscores";
        if let Ok(pattern) = StringPatternValidator::new(NAME_PATTERN, described) {
            name = name.validator(pattern);
        }

        SchemaBuilder::new()
            .version(0)
            .description("Manages a container registry namespace")
            .attribute(id_attribute())
            .attribute(name.build())
            .attribute(
                AttributeBuilder::new("description", AttributeType::String)
                    .description("The description of the namespace")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("is_public", AttributeType::Bool)
                    .description("Whether images are pullable without authentication")
                    .optional_computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("endpoint", AttributeType::String)
                    .description("The endpoint to push and pull images")
                    .computed()
                    .build(),
            )
            .attribute(status_attribute())
            .attribute(region_attribute())
            .attribute(project_id_attribute())
            .attribute(organization_id_attribute())
            .build()
    }

    fn identity_schema() -> IdentitySchema {
        regional_identity_schema()
    }

    fn compose_id(fields: &HashMap<String, String>) -> Option<String> {
        compose_regional(fields)
    }

    async fn create(
        &self,
        ctx: &Context,
        meta: &ScalewayProviderData,
        data: &mut ResourceData,
    ) -> Diagnostics {
        let region = match resolve_region(meta, data) {
            Ok(region) => region,
            Err(diagnostics) => return diagnostics,
        };
        let project_id = match require_project(meta, data) {
            Ok(project_id) => project_id,
            Err(diagnostics) => return diagnostics,
        };
        let request = CreateNamespaceRequest {
            name: data.get_string("name").unwrap_or_default(),
            description: data.get_string("description").unwrap_or_default(),
            project_id,
            is_public: data.get_bool("is_public").unwrap_or(false),
        };

        let api = meta.client.registry(region);
        let namespace = match api.create_namespace(&request).await {
            Ok(namespace) => namespace,
            Err(e) => return Diagnostics::from_error("Failed to create registry namespace", e),
        };
        persist_regional_identity(data, region, &namespace.id);

        let interval = REGISTRY_NAMESPACE.interval(meta.wait_retry_interval);
        match wait_for(ctx, &REGISTRY_NAMESPACE, interval, || api.get_namespace(&namespace.id)).await {
            Ok(_) => Diagnostics::new(),
            Err(e) => Diagnostics::from_error("Failed to wait for registry namespace", e),
        }
    }

    async fn read(
        &self,
        ctx: &Context,
        meta: &ScalewayProviderData,
        data: &mut ResourceData,
    ) -> Diagnostics {
        let (region, id) = match regional_id(meta, data) {
            Ok(parsed) => parsed,
            Err(diagnostics) => return diagnostics,
        };
        let api = meta.client.registry(region);
        let interval = REGISTRY_NAMESPACE.interval(meta.wait_retry_interval);

        let namespace = match wait_for(ctx, &REGISTRY_NAMESPACE, interval, || api.get_namespace(&id)).await {
            Ok(namespace) => namespace,
            Err(e) => return wait_failure(data, "Failed to read registry namespace", &e),
        };

        persist_regional_identity(data, region, &namespace.id);
        let mut diagnostics = flatten(data, namespace);
        diagnostics.extend(set_values(data, [("region", Dynamic::from(region.as_str()))]));
        diagnostics
    }

    async fn update(
        &self,
        ctx: &Context,
        meta: &ScalewayProviderData,
        data: &mut ResourceData,
    ) -> Diagnostics {
        let (region, id) = match regional_id(meta, data) {
            Ok(parsed) => parsed,
            Err(diagnostics) => return diagnostics,
        };
        let api = meta.client.registry(region);
        let interval = REGISTRY_NAMESPACE.interval(meta.wait_retry_interval);

        if let Err(e) = wait_for(ctx, &REGISTRY_NAMESPACE, interval, || api.get_namespace(&id)).await {
            return Diagnostics::from_error("Failed to wait for registry namespace", e);
        }
        if !data.has_changes(&["description", "is_public"]) {
            return Diagnostics::new();
        }

        let mut request = UpdateNamespaceRequest::default();
        if data.has_change("description") {
            request.description = Some(data.get_string("description").unwrap_or_default());
        }
        if data.has_change("is_public") {
            request.is_public = data.get_bool("is_public");
        }
        if let Err(e) = api.update_namespace(&id, &request).await {
            return Diagnostics::from_error("Failed to update registry namespace", e);
        }
        match wait_for(ctx, &REGISTRY_NAMESPACE, interval, || api.get_namespace(&id)).await {
            Ok(_) => Diagnostics::new(),
            Err(e) => Diagnostics::from_error("Failed to wait for registry namespace", e),
        }
    }

    async fn delete(
        &self,
        ctx: &Context,
        meta: &ScalewayProviderData,
        data: &mut ResourceData,
    ) -> Diagnostics {
        let (region, id) = match regional_id(meta, data) {
            Ok(parsed) => parsed,
            Err(diagnostics) => return diagnostics,
        };
        let api = meta.client.registry(region);
        let interval = REGISTRY_NAMESPACE.interval(meta.wait_retry_interval);

        let settled = wait_for(ctx, &REGISTRY_NAMESPACE, interval, || api.get_namespace(&id)).await;
        if let Err(e) = ignore_gone(settled.map(|_| ())) {
            return Diagnostics::from_error("Failed to wait for registry namespace", e);
        }
        if let Err(e) = ignore_not_found(api.delete_namespace(&id).await) {
            return Diagnostics::from_error("Failed to delete registry namespace", e);
        }
        match wait_for_deletion(ctx, &REGISTRY_NAMESPACE, interval, || api.get_namespace(&id)).await {
            Ok(()) => Diagnostics::new(),
            Err(e) => Diagnostics::from_error("Failed to wait for registry namespace deletion", e),
        }
    }
}
