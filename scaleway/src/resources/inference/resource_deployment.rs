//! Managed Inference deployment serving a model on dedicated nodes

use std::collections::HashMap;

use async_trait::async_trait;
use tfplug::plan_modifier::SuppressDiff;
use tfplug::schema::{Attribute, NestedType};
use tfplug::validator::NumberRangeValidator;
use tfplug::{
    AttributeBuilder, AttributePath, AttributeType, Context, Diagnostics, Dynamic, DynamicValue,
    IdentitySchema, ResourceData, Schema, SchemaBuilder,
};

use super::INFERENCE_TIMEOUTS;
use crate::api::inference::{
    CreateDeploymentRequest, Deployment, Endpoint, EndpointSpec, PrivateNetworkDetails,
    UpdateDeploymentRequest,
};
use crate::flatten::{flatten_time, name_or_random};
use crate::identity::{compose_regional, persist_regional_identity, regional_identity_schema};
use crate::ids::{expand_id, keep_reference, locality_insensitive_eq};
use crate::provider_data::ScalewayProviderData;
use crate::resources::{
    id_attribute, project_id_attribute, reference_attribute, region_attribute, regional_id,
    resolve_region, status_attribute, tags_attribute, timestamp_attribute,
};
use crate::skeleton::{
    ignore_gone, ignore_not_found, require_project, set_values, wait_failure, ScalewayResource,
    Timeouts,
};
use crate::waiter::{ensure_ready, wait_for, wait_for_deletion, INFERENCE_DEPLOYMENT};

pub struct DeploymentResource;

fn endpoint_fields(mut fields: Vec<Attribute>) -> NestedType {
    fields.extend([
        AttributeBuilder::new("disable_auth", AttributeType::Bool)
            .description("Serve the endpoint without API key authentication")
            .optional()
            .build(),
        AttributeBuilder::new("id", AttributeType::String)
            .description("The ID of the endpoint")
            .computed()
            .build(),
        AttributeBuilder::new("url", AttributeType::String)
            .description("The URL of the endpoint")
            .computed()
            .build(),
    ]);
    NestedType::single_list(fields)
}

fn expand_endpoints(data: &ResourceData) -> Vec<EndpointSpec> {
    let mut endpoints = Vec::new();
    if data.get_bool("public_endpoint.0.is_enabled").unwrap_or(false) {
        endpoints.push(EndpointSpec {
            public_network: Some(serde_json::json!({})),
            private_network: None,
            disable_auth: data.get_bool("public_endpoint.0.disable_auth").unwrap_or(false),
        });
    }
    if let Some(network) = data.get_string_ok("private_endpoint.0.private_network_id") {
        endpoints.push(EndpointSpec {
            public_network: None,
            private_network: Some(PrivateNetworkDetails {
                private_network_id: expand_id(&network).to_string(),
            }),
            disable_auth: data.get_bool("private_endpoint.0.disable_auth").unwrap_or(false),
        });
    }
    endpoints
}

/// Split endpoints into the `public_endpoint` and `private_endpoint` blocks
fn flatten_endpoints(data: &ResourceData, endpoints: &[Endpoint]) -> (Dynamic, Dynamic) {
    let mut public = Vec::new();
    let mut private = Vec::new();
    for endpoint in endpoints {
        if endpoint.public_network.is_some() {
            public.push(Dynamic::object([
                ("is_enabled", Dynamic::from(true)),
                ("disable_auth", Dynamic::from(endpoint.disable_auth)),
                ("id", Dynamic::from(endpoint.id.clone())),
                ("url", Dynamic::from(endpoint.url.clone())),
            ]));
        }
        if let Some(network) = &endpoint.private_network {
            let network_id = keep_reference(
                data.get_string_ok("private_endpoint.0.private_network_id"),
                &network.private_network_id,
            );
            private.push(Dynamic::object([
                ("private_network_id", Dynamic::from(network_id)),
                ("disable_auth", Dynamic::from(endpoint.disable_auth)),
                ("id", Dynamic::from(endpoint.id.clone())),
                ("url", Dynamic::from(endpoint.url.clone())),
            ]));
        }
    }
    (Dynamic::List(public), Dynamic::List(private))
}

fn flatten(data: &mut ResourceData, deployment: Deployment) -> Diagnostics {
    let (public, private) = flatten_endpoints(data, &deployment.endpoints);
    let model_id = keep_reference(data.get_string("model_id"), &deployment.model_id);
    set_values(
        data,
        [
            ("name", Dynamic::from(deployment.name)),
            ("project_id", Dynamic::from(deployment.project_id)),
            ("node_type", Dynamic::from(deployment.node_type_name)),
            ("model_id", Dynamic::from(model_id)),
            ("model_name", Dynamic::from(deployment.model_name)),
            ("tags", Dynamic::from(deployment.tags)),
            ("min_size", Dynamic::from(deployment.min_size)),
            ("max_size", Dynamic::from(deployment.max_size)),
            ("size", Dynamic::from(deployment.size)),
            ("public_endpoint", public),
            ("private_endpoint", private),
            ("status", Dynamic::from(deployment.status)),
            ("created_at", Dynamic::from(flatten_time(deployment.created_at.as_deref()))),
            ("updated_at", Dynamic::from(flatten_time(deployment.updated_at.as_deref()))),
        ],
    )
}

fn size(data: &ResourceData, key: &str) -> Option<u32> {
    data.get_i64(key).and_then(|n| u32::try_from(n).ok())
}

#[async_trait]
impl ScalewayResource for DeploymentResource {
    const TYPE_NAME: &'static str = "scaleway_inference_deployment";

    fn schema() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages a Managed Inference deployment")
            .attribute(id_attribute())
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("The name of the deployment, generated when omitted")
                    .optional_computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("node_type", AttributeType::String)
                    .description("The node type serving the model, e.g. L4")
                    .required()
                    .force_new()
                    .build(),
            )
            .attribute(
                reference_attribute("model_id", "The model to deploy")
                    .required()
                    .plan_modifier(SuppressDiff::new(locality_insensitive_eq))
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("model_name", AttributeType::String)
                    .description("The name of the deployed model")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("accept_eula", AttributeType::Bool)
                    .description("Accept the license of models that carry one")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("min_size", AttributeType::Number)
                    .description("Minimum number of nodes")
                    .optional_computed()
                    .validator(NumberRangeValidator::between(1.0, 50.0))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("max_size", AttributeType::Number)
                    .description("Maximum number of nodes")
                    .optional_computed()
                    .validator(NumberRangeValidator::between(1.0, 50.0))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("size", AttributeType::Number)
                    .description("Current number of nodes")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::nested(
                    "public_endpoint",
                    endpoint_fields(vec![AttributeBuilder::new("is_enabled", AttributeType::Bool)
                        .description("Expose the deployment publicly")
                        .optional()
                        .build()]),
                )
                .description("Public endpoint")
                .optional()
                .force_new()
                .build(),
            )
            .attribute(
                AttributeBuilder::nested(
                    "private_endpoint",
                    endpoint_fields(vec![reference_attribute(
                        "private_network_id",
                        "The private network to attach",
                    )
                    .optional()
                    .build()]),
                )
                .description("Endpoint inside a private network")
                .optional()
                .force_new()
                .build(),
            )
            .attribute(tags_attribute())
            .attribute(status_attribute())
            .attribute(region_attribute())
            .attribute(project_id_attribute())
            .attribute(timestamp_attribute("created_at", "The date and time of the creation of the deployment"))
            .attribute(timestamp_attribute("updated_at", "The date and time of the last update of the deployment"))
            .build()
    }

    fn identity_schema() -> IdentitySchema {
        regional_identity_schema()
    }

    fn compose_id(fields: &HashMap<String, String>) -> Option<String> {
        compose_regional(fields)
    }

    fn timeouts() -> Timeouts {
        INFERENCE_TIMEOUTS
    }

    fn validate(config: &DynamicValue, diagnostics: &mut Diagnostics) {
        let min = config.get_number(&AttributePath::new("min_size")).ok();
        let max = config.get_number(&AttributePath::new("max_size")).ok();
        if let (Some(min), Some(max)) = (min, max) {
            if min > max {
                diagnostics.add_error_at(
                    AttributePath::new("min_size"),
                    "Invalid deployment size",
                    format!("min_size ({}) is greater than max_size ({})", min, max),
                );
            }
        }
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
        let model = data.get_string("model_id").unwrap_or_default();
        let request = CreateDeploymentRequest {
            name: name_or_random(data, "deployment"),
            project_id,
            model_id: expand_id(&model).to_string(),
            node_type_name: data.get_string("node_type").unwrap_or_default(),
            accept_eula: data.get_bool("accept_eula").unwrap_or(false),
            tags: data.get_string_list("tags"),
            min_size: size(data, "min_size"),
            max_size: size(data, "max_size"),
            endpoints: expand_endpoints(data),
        };

        let api = meta.client.inference(region);
        let deployment = match api.create_deployment(&request).await {
            Ok(deployment) => deployment,
            Err(e) => return Diagnostics::from_error("Failed to create inference deployment", e),
        };
        persist_regional_identity(data, region, &deployment.id);

        let interval = INFERENCE_DEPLOYMENT.interval(meta.wait_retry_interval);
        match wait_for(ctx, &INFERENCE_DEPLOYMENT, interval, || api.get_deployment(&deployment.id))
            .await
            .and_then(|deployment| ensure_ready(&INFERENCE_DEPLOYMENT, deployment))
        {
            Ok(_) => Diagnostics::new(),
            Err(e) => Diagnostics::from_error("Inference deployment did not become ready", e),
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
        let api = meta.client.inference(region);
        let interval = INFERENCE_DEPLOYMENT.interval(meta.wait_retry_interval);

        let deployment = match wait_for(ctx, &INFERENCE_DEPLOYMENT, interval, || api.get_deployment(&id)).await {
            Ok(deployment) => deployment,
            Err(e) => return wait_failure(data, "Failed to read inference deployment", &e),
        };

        persist_regional_identity(data, region, &deployment.id);
        let mut diagnostics = flatten(data, deployment);
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
        let api = meta.client.inference(region);
        let interval = INFERENCE_DEPLOYMENT.interval(meta.wait_retry_interval);

        if let Err(e) = wait_for(ctx, &INFERENCE_DEPLOYMENT, interval, || api.get_deployment(&id)).await {
            return Diagnostics::from_error("Failed to wait for inference deployment", e);
        }

        let mut request = UpdateDeploymentRequest::default();
        if data.has_change("name") {
            request.name = data.get_string_ok("name");
        }
        if data.has_change("tags") {
            request.tags = Some(data.get_string_list("tags"));
        }
        if data.has_change("min_size") {
            request.min_size = size(data, "min_size");
        }
        if data.has_change("max_size") {
            request.max_size = size(data, "max_size");
        }
        if !data.has_changes(&["name", "tags", "min_size", "max_size"]) {
            return Diagnostics::new();
        }

        if let Err(e) = api.update_deployment(&id, &request).await {
            return Diagnostics::from_error("Failed to update inference deployment", e);
        }
        match wait_for(ctx, &INFERENCE_DEPLOYMENT, interval, || api.get_deployment(&id)).await {
            Ok(_) => Diagnostics::new(),
            Err(e) => Diagnostics::from_error("Failed to wait for inference deployment", e),
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
        let api = meta.client.inference(region);
        let interval = INFERENCE_DEPLOYMENT.interval(meta.wait_retry_interval);

        let settled = wait_for(ctx, &INFERENCE_DEPLOYMENT, interval, || api.get_deployment(&id)).await;
        if let Err(e) = ignore_gone(settled.map(|_| ())) {
            return Diagnostics::from_error("Failed to wait for inference deployment", e);
        }
        if let Err(e) = ignore_not_found(api.delete_deployment(&id).await) {
            return Diagnostics::from_error("Failed to delete inference deployment", e);
        }
        match wait_for_deletion(ctx, &INFERENCE_DEPLOYMENT, interval, || api.get_deployment(&id)).await {
            Ok(()) => Diagnostics::new(),
            Err(e) => Diagnostics::from_error("Failed to wait for inference deployment deletion", e),
        }
    }
}
