//! Serverless Functions namespace resource

use std::collections::HashMap;

use async_trait::async_trait;
use tfplug::{
    AttributeBuilder, AttributeType, Context, Diagnostics, Dynamic, IdentitySchema,
    ResourceData, Schema, SchemaBuilder,
};

use super::{
    environment_variables_attribute, secret_environment_variables_attribute, FUNCTION_TIMEOUTS,
};
use crate::api::function::{Namespace, NamespaceRequest};
use crate::flatten::{
    expand_secrets, flatten_secrets, flatten_time, name_or_random, removed_secrets, string_map,
};
use crate::identity::{compose_regional, persist_regional_identity, regional_identity_schema};
use crate::provider_data::ScalewayProviderData;
use crate::resources::{
    id_attribute, organization_id_attribute, project_id_attribute, region_attribute,
    regional_id, resolve_region, status_attribute, tags_attribute, timestamp_attribute,
};
use crate::skeleton::{
    ignore_gone, ignore_not_found, require_project, set_values, wait_failure, ScalewayResource,
    Timeouts,
};
use crate::waiter::{ensure_ready, wait_for, wait_for_deletion, FUNCTION_NAMESPACE};

pub struct NamespaceResource;

impl NamespaceResource {
    fn flatten(data: &mut ResourceData, namespace: Namespace) -> Diagnostics {
        let secrets = flatten_secrets(
            data,
            "secret_environment_variables",
            &namespace.secret_environment_variables,
        );
        set_values(
            data,
            [
                ("name", Dynamic::from(namespace.name)),
                ("description", Dynamic::from(namespace.description)),
                ("environment_variables", string_map(&namespace.environment_variables)),
                ("secret_environment_variables", secrets),
                ("tags", Dynamic::from(namespace.tags)),
                ("status", Dynamic::from(namespace.status)),
                ("registry_endpoint", Dynamic::from(namespace.registry_endpoint)),
                ("registry_namespace_id", Dynamic::from(namespace.registry_namespace_id)),
                ("project_id", Dynamic::from(namespace.project_id)),
                ("organization_id", Dynamic::from(namespace.organization_id)),
                ("created_at", Dynamic::from(flatten_time(namespace.created_at.as_deref()))),
                ("updated_at", Dynamic::from(flatten_time(namespace.updated_at.as_deref()))),
            ],
        )
    }
}

#[async_trait]
impl ScalewayResource for NamespaceResource {
    const TYPE_NAME: &'static str = "scaleway_function_namespace";

    fn schema() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages a Serverless Functions namespace")
            .attribute(id_attribute())
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("The name of the namespace, generated when omitted")
                    .optional_computed()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("description", AttributeType::String)
                    .description("The description of the namespace")
                    .optional()
                    .build(),
            )
            .attribute(environment_variables_attribute())
            .attribute(secret_environment_variables_attribute())
            .attribute(tags_attribute())
            .attribute(status_attribute())
            .attribute(
                AttributeBuilder::new("registry_endpoint", AttributeType::String)
                    .description("The endpoint of the container registry backing the namespace")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("registry_namespace_id", AttributeType::String)
                    .description("The ID of the registry namespace backing the namespace")
                    .computed()
                    .build(),
            )
            .attribute(region_attribute())
            .attribute(project_id_attribute())
            .attribute(organization_id_attribute())
            .attribute(timestamp_attribute("created_at", "The date and time of the creation of the namespace"))
            .attribute(timestamp_attribute("updated_at", "The date and time of the last update of the namespace"))
            .build()
    }

    fn identity_schema() -> IdentitySchema {
        regional_identity_schema()
    }

    fn compose_id(fields: &HashMap<String, String>) -> Option<String> {
        compose_regional(fields)
    }

    fn timeouts() -> Timeouts {
        FUNCTION_TIMEOUTS
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
        let secrets = expand_secrets(data, "secret_environment_variables");
        let request = NamespaceRequest {
            name: Some(name_or_random(data, "ns")),
            project_id: Some(project_id),
            description: data.get_string_ok("description"),
            environment_variables: Some(data.get_string_map("environment_variables")),
            secret_environment_variables: (!secrets.is_empty()).then_some(secrets),
            tags: Some(data.get_string_list("tags")),
        };

        let api = meta.client.function(region);
        let namespace = match api.create_namespace(&request).await {
            Ok(namespace) => namespace,
            Err(e) => return Diagnostics::from_error("Failed to create function namespace", e),
        };
        persist_regional_identity(data, region, &namespace.id);

        let interval = FUNCTION_NAMESPACE.interval(meta.wait_retry_interval);
        match wait_for(ctx, &FUNCTION_NAMESPACE, interval, || api.get_namespace(&namespace.id))
            .await
            .and_then(|ns| ensure_ready(&FUNCTION_NAMESPACE, ns))
        {
            Ok(_) => Diagnostics::new(),
            Err(e) => Diagnostics::from_error("Function namespace did not become ready", e),
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
        let api = meta.client.function(region);
        let interval = FUNCTION_NAMESPACE.interval(meta.wait_retry_interval);

        let namespace = match wait_for(ctx, &FUNCTION_NAMESPACE, interval, || api.get_namespace(&id)).await {
            Ok(namespace) => namespace,
            Err(e) => return wait_failure(data, "Failed to read function namespace", &e),
        };

        persist_regional_identity(data, region, &namespace.id);
        let mut diagnostics = Self::flatten(data, namespace);
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
        let api = meta.client.function(region);
        let interval = FUNCTION_NAMESPACE.interval(meta.wait_retry_interval);

        if let Err(e) = wait_for(ctx, &FUNCTION_NAMESPACE, interval, || api.get_namespace(&id)).await {
            return Diagnostics::from_error("Failed to wait for function namespace", e);
        }

        let mut request = NamespaceRequest::default();
        if data.has_change("description") {
            request.description = Some(data.get_string("description").unwrap_or_default());
        }
        if data.has_change("environment_variables") {
            request.environment_variables = Some(data.get_string_map("environment_variables"));
        }
        if data.has_change("secret_environment_variables") {
            let mut secrets = expand_secrets(data, "secret_environment_variables");
            secrets.extend(removed_secrets(data, "secret_environment_variables"));
            request.secret_environment_variables = Some(secrets);
        }
        if data.has_change("tags") {
            request.tags = Some(data.get_string_list("tags"));
        }
        if !data.has_changes(&[
            "description",
            "environment_variables",
            "secret_environment_variables",
            "tags",
        ]) {
            return Diagnostics::new();
        }

        if let Err(e) = api.update_namespace(&id, &request).await {
            return Diagnostics::from_error("Failed to update function namespace", e);
        }
        match wait_for(ctx, &FUNCTION_NAMESPACE, interval, || api.get_namespace(&id)).await {
            Ok(_) => Diagnostics::new(),
            Err(e) => Diagnostics::from_error("Failed to wait for function namespace", e),
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
        let api = meta.client.function(region);
        let interval = FUNCTION_NAMESPACE.interval(meta.wait_retry_interval);

        let settled = wait_for(ctx, &FUNCTION_NAMESPACE, interval, || api.get_namespace(&id)).await;
        if let Err(e) = ignore_gone(settled.map(|_| ())) {
            return Diagnostics::from_error("Failed to wait for function namespace", e);
        }
        if let Err(e) = ignore_not_found(api.delete_namespace(&id).await) {
            return Diagnostics::from_error("Failed to delete function namespace", e);
        }
        match wait_for_deletion(ctx, &FUNCTION_NAMESPACE, interval, || api.get_namespace(&id)).await {
            Ok(()) => Diagnostics::new(),
            Err(e) => Diagnostics::from_error("Failed to wait for function namespace deletion", e),
        }
    }
}
