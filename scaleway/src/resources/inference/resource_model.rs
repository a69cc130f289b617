//! Custom model imported into Managed Inference from a URL

use std::collections::HashMap;

use async_trait::async_trait;
use tfplug::validator::FnValidator;
use tfplug::{
    AttributeBuilder, AttributeType, Context, Diagnostics, Dynamic, IdentitySchema, ResourceData,
    Schema, SchemaBuilder,
};

use super::INFERENCE_TIMEOUTS;
use crate::api::inference::{CreateModelRequest, ModelSource};
use crate::flatten::{flatten_time, name_or_random};
use crate::identity::{compose_regional, persist_regional_identity, regional_identity_schema};
use crate::provider_data::ScalewayProviderData;
use crate::resources::{
    id_attribute, project_id_attribute, region_attribute, regional_id, resolve_region,
    status_attribute, timestamp_attribute,
};
use crate::skeleton::{
    ignore_gone, ignore_not_found, require_project, set_values, wait_failure, ScalewayResource,
    Timeouts,
};
use crate::waiter::{ensure_ready, wait_for, wait_for_deletion, INFERENCE_MODEL};

pub struct ModelResource;

fn https_url(value: &Dynamic) -> Result<(), String> {
    let Some(raw) = value.as_str() else {
        return Ok(());
    };
    match url::Url::parse(raw) {
        Ok(parsed) if parsed.scheme() == "https" => Ok(()),
        Ok(parsed) => Err(format!("unsupported scheme {:?}", parsed.scheme())),
        Err(e) => Err(e.to_string()),
    }
}

#[async_trait]
impl ScalewayResource for ModelResource {
    const TYPE_NAME: &'static str = "scaleway_inference_model";

    fn schema() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages a custom model available to inference deployments")
            .attribute(id_attribute())
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("The name of the model, generated when omitted")
                    .optional_computed()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("url", AttributeType::String)
                    .description("HTTPS source of the model, e.g. a Hugging Face repository")
                    .required()
                    .validator(FnValidator::new("HTTPS URL", https_url))
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("secret", AttributeType::String)
                    .description("Token giving access to a private source")
                    .optional()
                    .sensitive()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("description", AttributeType::String)
                    .description("The description of the model")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("has_eula", AttributeType::Bool)
                    .description("Whether deployments must accept a license")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("parameter_size_bits", AttributeType::Number)
                    .description("Size of one parameter in bits")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("size_bytes", AttributeType::Number)
                    .description("Total size of the model in bytes")
                    .computed()
                    .build(),
            )
            .attribute(status_attribute())
            .attribute(region_attribute())
            .attribute(project_id_attribute())
            .attribute(timestamp_attribute("created_at", "The date and time of the creation of the model"))
            .attribute(timestamp_attribute("updated_at", "The date and time of the last update of the model"))
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
        let request = CreateModelRequest {
            name: name_or_random(data, "model"),
            project_id,
            source: ModelSource {
                url: data.get_string("url").unwrap_or_default(),
                secret: data.get_string_ok("secret"),
            },
        };

        let api = meta.client.inference(region);
        let model = match api.create_model(&request).await {
            Ok(model) => model,
            Err(e) => return Diagnostics::from_error("Failed to create inference model", e),
        };
        persist_regional_identity(data, region, &model.id);

        let interval = INFERENCE_MODEL.interval(meta.wait_retry_interval);
        match wait_for(ctx, &INFERENCE_MODEL, interval, || api.get_model(&model.id))
            .await
            .and_then(|model| ensure_ready(&INFERENCE_MODEL, model))
        {
            Ok(_) => Diagnostics::new(),
            Err(e) => Diagnostics::from_error("Inference model did not become ready", e),
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
        let interval = INFERENCE_MODEL.interval(meta.wait_retry_interval);

        let model = match wait_for(ctx, &INFERENCE_MODEL, interval, || api.get_model(&id)).await {
            Ok(model) => model,
            Err(e) => return wait_failure(data, "Failed to read inference model", &e),
        };

        persist_regional_identity(data, region, &model.id);
        set_values(
            data,
            [
                ("name", Dynamic::from(model.name)),
                ("description", Dynamic::from(model.description)),
                ("has_eula", Dynamic::from(model.has_eula)),
                ("parameter_size_bits", Dynamic::from(model.parameter_size_bits)),
                ("size_bytes", Dynamic::from(model.size_bytes as f64)),
                ("status", Dynamic::from(model.status)),
                ("project_id", Dynamic::from(model.project_id)),
                ("region", Dynamic::from(region.as_str())),
                ("created_at", Dynamic::from(flatten_time(model.created_at.as_deref()))),
                ("updated_at", Dynamic::from(flatten_time(model.updated_at.as_deref()))),
            ],
        )
    }

    /// Models are immutable once imported
    async fn update(
        &self,
        _ctx: &Context,
        _meta: &ScalewayProviderData,
        _data: &mut ResourceData,
    ) -> Diagnostics {
        Diagnostics::new()
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
        let interval = INFERENCE_MODEL.interval(meta.wait_retry_interval);

        let settled = wait_for(ctx, &INFERENCE_MODEL, interval, || api.get_model(&id)).await;
        if let Err(e) = ignore_gone(settled.map(|_| ())) {
            return Diagnostics::from_error("Failed to wait for inference model", e);
        }
        if let Err(e) = ignore_not_found(api.delete_model(&id).await) {
            return Diagnostics::from_error("Failed to delete inference model", e);
        }
        match wait_for_deletion(ctx, &INFERENCE_MODEL, interval, || api.get_model(&id)).await {
            Ok(()) => Diagnostics::new(),
            Err(e) => Diagnostics::from_error("Failed to wait for inference model deletion", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_must_be_https() {
        assert!(https_url(&Dynamic::from("https://huggingface.co/org/model")).is_ok());
        assert!(https_url(&Dynamic::from("http://example.com/model")).is_err());
        assert!(https_url(&Dynamic::from("not a url")).is_err());
    }
}
