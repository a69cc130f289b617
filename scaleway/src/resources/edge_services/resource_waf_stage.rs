//! Edge Services WAF stage resource

use std::collections::HashMap;

use async_trait::async_trait;
use tfplug::validator::{NumberOneOfValidator, StringOneOfValidator};
use tfplug::{
    AttributeBuilder, AttributeType, Context, Diagnostics, Dynamic, IdentitySchema,
    ResourceData, Schema, SchemaBuilder,
};

use super::{pipeline_id_attribute, stage_reference, stage_values};
use crate::api::edge_services::WafStageRequest;
use crate::identity::{compose_flat, flat_identity_schema, persist_flat_identity};
use crate::provider_data::ScalewayProviderData;
use crate::resources::{id_attribute, timestamp_attribute};
use crate::skeleton::{ignore_not_found, read_failure, set_values, ScalewayResource};

const IDENTITY_KEY: &str = "waf_stage_id";

pub struct WafStageResource;

fn paranoia_level(data: &ResourceData) -> Option<u32> {
    data.get_i64("paranoia_level")
        .and_then(|level| u32::try_from(level).ok())
}

#[async_trait]
impl ScalewayResource for WafStageResource {
    const TYPE_NAME: &'static str = "scaleway_edge_services_waf_stage";

    fn schema() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages the WAF stage of an Edge Services pipeline")
            .attribute(id_attribute())
            .attribute(pipeline_id_attribute())
            .attribute(
                AttributeBuilder::new("mode", AttributeType::String)
                    .description("The mode of the WAF: enable, log_only or disable")
                    .optional_computed()
                    .validator(StringOneOfValidator::new(&["enable", "log_only", "disable"]))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("paranoia_level", AttributeType::Number)
                    .description("Sensitivity of the WAF, from 1 to 4")
                    .required()
                    .validator(NumberOneOfValidator {
                        allowed: vec![1.0, 2.0, 3.0, 4.0],
                    })
                    .build(),
            )
            .attribute(stage_reference("backend_stage_id", "The backend stage to forward to"))
            .attribute(timestamp_attribute("created_at", "The date and time of the creation of the stage"))
            .attribute(timestamp_attribute("updated_at", "The date and time of the last update of the stage"))
            .build()
    }

    fn identity_schema() -> IdentitySchema {
        flat_identity_schema(IDENTITY_KEY)
    }

    fn compose_id(fields: &HashMap<String, String>) -> Option<String> {
        compose_flat(fields, IDENTITY_KEY)
    }

    async fn create(
        &self,
        _ctx: &Context,
        meta: &ScalewayProviderData,
        data: &mut ResourceData,
    ) -> Diagnostics {
        let pipeline_id = data.get_string("pipeline_id").unwrap_or_default();
        let request = WafStageRequest {
            mode: data.get_string_ok("mode"),
            paranoia_level: paranoia_level(data),
            backend_stage_id: data.get_string_ok("backend_stage_id"),
        };

        match meta
            .client
            .edge_services()
            .create_waf_stage(&pipeline_id, &request)
            .await
        {
            Ok(stage) => {
                persist_flat_identity(data, IDENTITY_KEY, &stage.id);
                Diagnostics::new()
            }
            Err(e) => Diagnostics::from_error("Failed to create WAF stage", e),
        }
    }

    async fn read(
        &self,
        _ctx: &Context,
        meta: &ScalewayProviderData,
        data: &mut ResourceData,
    ) -> Diagnostics {
        let stage = match meta.client.edge_services().get_waf_stage(&data.id()).await {
            Ok(stage) => stage,
            Err(e) => return read_failure(data, "Failed to read WAF stage", &e),
        };

        persist_flat_identity(data, IDENTITY_KEY, &stage.id);
        let mut diagnostics = set_values(
            data,
            stage_values(
                stage.pipeline_id,
                stage.created_at.as_deref(),
                stage.updated_at.as_deref(),
            ),
        );
        diagnostics.extend(set_values(
            data,
            [
                ("mode", Dynamic::from(stage.mode)),
                ("paranoia_level", Dynamic::from(stage.paranoia_level)),
                ("backend_stage_id", Dynamic::from(stage.backend_stage_id)),
            ],
        ));
        diagnostics
    }

    async fn update(
        &self,
        _ctx: &Context,
        meta: &ScalewayProviderData,
        data: &mut ResourceData,
    ) -> Diagnostics {
        let mut request = WafStageRequest::default();
        if data.has_change("mode") {
            request.mode = data.get_string_ok("mode");
        }
        if data.has_change("paranoia_level") {
            request.paranoia_level = paranoia_level(data);
        }
        if data.has_change("backend_stage_id") {
            request.backend_stage_id = data.get_string_ok("backend_stage_id");
        }
        if request.mode.is_none()
            && request.paranoia_level.is_none()
            && request.backend_stage_id.is_none()
        {
            return Diagnostics::new();
        }

        match meta
            .client
            .edge_services()
            .update_waf_stage(&data.id(), &request)
            .await
        {
            Ok(_) => Diagnostics::new(),
            Err(e) => Diagnostics::from_error("Failed to update WAF stage", e),
        }
    }

    async fn delete(
        &self,
        _ctx: &Context,
        meta: &ScalewayProviderData,
        data: &mut ResourceData,
    ) -> Diagnostics {
        let result = meta.client.edge_services().delete_waf_stage(&data.id()).await;
        match ignore_not_found(result) {
            Ok(()) => Diagnostics::new(),
            Err(e) => Diagnostics::from_error("Failed to delete WAF stage", e),
        }
    }
}
