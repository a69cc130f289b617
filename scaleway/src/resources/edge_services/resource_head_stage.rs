//! Edge Services head stage resource
//!
//! The head stage is the entry point of a pipeline. It has no ID of its
//! own: the resource ID is the pipeline ID and `head_stage_id` designates
//! the DNS stage currently at the head.

use std::collections::HashMap;

use async_trait::async_trait;
use tfplug::{
    AttributeBuilder, AttributeType, Context, Diagnostics, Dynamic, IdentitySchema,
    ResourceData, Schema, SchemaBuilder,
};

use super::pipeline_id_attribute;
use crate::api::edge_services::HeadStageChange;
use crate::api::ApiError;
use crate::identity::{compose_flat, flat_identity_schema, persist_flat_identity};
use crate::provider_data::ScalewayProviderData;
use crate::resources::id_attribute;
use crate::skeleton::{ignore_not_found, read_failure, set_values, ScalewayResource};

const IDENTITY_KEY: &str = "pipeline_id";

pub struct HeadStageResource;

/// The change moving the head from `current` to `target`, if any
pub(crate) fn head_change(current: Option<String>, target: Option<String>) -> Option<HeadStageChange> {
    match (current, target) {
        (None, None) => None,
        (Some(current), Some(target)) if current == target => None,
        (None, Some(target)) => Some(HeadStageChange::AddNewHeadStage {
            new_stage_id: target,
        }),
        (Some(current), Some(target)) => Some(HeadStageChange::SwapHeadStage {
            new_stage_id: target,
            current_stage_id: current,
        }),
        (Some(current), None) => Some(HeadStageChange::RemoveHeadStage {
            remove_stage_id: current,
        }),
    }
}

async fn current_head(meta: &ScalewayProviderData, pipeline_id: &str) -> Result<Option<String>, ApiError> {
    let heads = meta.client.edge_services().list_head_stages(pipeline_id).await?;
    Ok(heads.into_iter().find_map(|head| head.dns_stage_id))
}

async fn move_head(
    meta: &ScalewayProviderData,
    pipeline_id: &str,
    target: Option<String>,
) -> Result<(), ApiError> {
    let current = current_head(meta, pipeline_id).await?;
    match head_change(current, target) {
        Some(change) => {
            tracing::debug!("changing head stage of pipeline {}: {:?}", pipeline_id, change);
            meta.client
                .edge_services()
                .set_head_stage(pipeline_id, &change)
                .await
                .map(|_| ())
        }
        None => Ok(()),
    }
}

#[async_trait]
impl ScalewayResource for HeadStageResource {
    const TYPE_NAME: &'static str = "scaleway_edge_services_head_stage";

    fn schema() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Selects the head stage of an Edge Services pipeline")
            .attribute(id_attribute())
            .attribute(pipeline_id_attribute())
            .attribute(
                AttributeBuilder::new("head_stage_id", AttributeType::String)
                    .description("The DNS stage at the head of the pipeline")
                    .optional()
                    .build(),
            )
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
        if let Err(e) = move_head(meta, &pipeline_id, data.get_string_ok("head_stage_id")).await {
            return Diagnostics::from_error("Failed to set head stage", e);
        }
        persist_flat_identity(data, IDENTITY_KEY, &pipeline_id);
        Diagnostics::new()
    }

    async fn read(
        &self,
        _ctx: &Context,
        meta: &ScalewayProviderData,
        data: &mut ResourceData,
    ) -> Diagnostics {
        let pipeline = match meta.client.edge_services().get_pipeline(&data.id()).await {
            Ok(pipeline) => pipeline,
            Err(e) => return read_failure(data, "Failed to read pipeline", &e),
        };
        let head = match current_head(meta, &pipeline.id).await {
            Ok(head) => head,
            Err(e) => return read_failure(data, "Failed to read head stage", &e),
        };

        persist_flat_identity(data, IDENTITY_KEY, &pipeline.id);
        set_values(
            data,
            [
                ("pipeline_id", Dynamic::from(pipeline.id)),
                ("head_stage_id", Dynamic::from(head)),
            ],
        )
    }

    async fn update(
        &self,
        _ctx: &Context,
        meta: &ScalewayProviderData,
        data: &mut ResourceData,
    ) -> Diagnostics {
        if !data.has_change("head_stage_id") {
            return Diagnostics::new();
        }
        match move_head(meta, &data.id(), data.get_string_ok("head_stage_id")).await {
            Ok(()) => Diagnostics::new(),
            Err(e) => Diagnostics::from_error("Failed to update head stage", e),
        }
    }

    async fn delete(
        &self,
        _ctx: &Context,
        meta: &ScalewayProviderData,
        data: &mut ResourceData,
    ) -> Diagnostics {
        match ignore_not_found(move_head(meta, &data.id(), None).await) {
            Ok(()) => Diagnostics::new(),
            Err(e) => Diagnostics::from_error("Failed to remove head stage", e),
        }
    }
}
