//! Edge Services backend stage resource, an S3 bucket origin

use std::collections::HashMap;

use async_trait::async_trait;
use tfplug::defaults::StaticDefault;
use tfplug::schema::NestedType;
use tfplug::{
    AttributeBuilder, AttributeType, Context, Diagnostics, Dynamic, IdentitySchema,
    ResourceData, Schema, SchemaBuilder,
};

use super::{pipeline_id_attribute, stage_values};
use crate::api::edge_services::{BackendStageRequest, ScalewayS3Backend};
use crate::identity::{compose_flat, flat_identity_schema, persist_flat_identity};
use crate::provider_data::ScalewayProviderData;
use crate::resources::{id_attribute, timestamp_attribute};
use crate::skeleton::{ignore_not_found, read_failure, set_values, ScalewayResource};

const IDENTITY_KEY: &str = "backend_stage_id";

pub struct BackendStageResource;

fn expand_s3(data: &ResourceData) -> Option<ScalewayS3Backend> {
    data.get("s3_backend_config.0")?;
    Some(ScalewayS3Backend {
        bucket_name: data
            .get_string("s3_backend_config.0.bucket_name")
            .unwrap_or_default(),
        bucket_region: data
            .get_string("s3_backend_config.0.bucket_region")
            .unwrap_or_default(),
        is_website: data
            .get_bool("s3_backend_config.0.is_website")
            .unwrap_or(false),
    })
}

fn flatten_s3(backend: Option<ScalewayS3Backend>) -> Dynamic {
    match backend {
        Some(s3) => Dynamic::List(vec![Dynamic::object([
            ("bucket_name", Dynamic::from(s3.bucket_name)),
            ("bucket_region", Dynamic::from(s3.bucket_region)),
            ("is_website", Dynamic::from(s3.is_website)),
        ])]),
        None => Dynamic::List(Vec::new()),
    }
}

#[async_trait]
impl ScalewayResource for BackendStageResource {
    const TYPE_NAME: &'static str = "scaleway_edge_services_backend_stage";

    fn schema() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages the backend stage of an Edge Services pipeline")
            .attribute(id_attribute())
            .attribute(pipeline_id_attribute())
            .attribute(
                AttributeBuilder::nested(
                    "s3_backend_config",
                    NestedType::single_list(vec![
                        AttributeBuilder::new("bucket_name", AttributeType::String)
                            .description("The name of the bucket")
                            .required()
                            .build(),
                        AttributeBuilder::new("bucket_region", AttributeType::String)
                            .description("The region of the bucket")
                            .required()
                            .build(),
                        AttributeBuilder::new("is_website", AttributeType::Bool)
                            .description("Whether the bucket website feature is enabled")
                            .optional()
                            .default(StaticDefault::bool(false))
                            .build(),
                    ]),
                )
                .description("The Scaleway Object Storage origin")
                .optional()
                .build(),
            )
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
        let request = BackendStageRequest {
            scaleway_s3: expand_s3(data),
        };

        match meta
            .client
            .edge_services()
            .create_backend_stage(&pipeline_id, &request)
            .await
        {
            Ok(stage) => {
                persist_flat_identity(data, IDENTITY_KEY, &stage.id);
                Diagnostics::new()
            }
            Err(e) => Diagnostics::from_error("Failed to create backend stage", e),
        }
    }

    async fn read(
        &self,
        _ctx: &Context,
        meta: &ScalewayProviderData,
        data: &mut ResourceData,
    ) -> Diagnostics {
        let stage = match meta.client.edge_services().get_backend_stage(&data.id()).await {
            Ok(stage) => stage,
            Err(e) => return read_failure(data, "Failed to read backend stage", &e),
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
            [("s3_backend_config", flatten_s3(stage.scaleway_s3))],
        ));
        diagnostics
    }

    async fn update(
        &self,
        _ctx: &Context,
        meta: &ScalewayProviderData,
        data: &mut ResourceData,
    ) -> Diagnostics {
        if !data.has_change("s3_backend_config") {
            return Diagnostics::new();
        }
        let request = BackendStageRequest {
            scaleway_s3: expand_s3(data),
        };

        match meta
            .client
            .edge_services()
            .update_backend_stage(&data.id(), &request)
            .await
        {
            Ok(_) => Diagnostics::new(),
            Err(e) => Diagnostics::from_error("Failed to update backend stage", e),
        }
    }

    async fn delete(
        &self,
        _ctx: &Context,
        meta: &ScalewayProviderData,
        data: &mut ResourceData,
    ) -> Diagnostics {
        let result = meta
            .client
            .edge_services()
            .delete_backend_stage(&data.id())
            .await;
        match ignore_not_found(result) {
            Ok(()) => Diagnostics::new(),
            Err(e) => Diagnostics::from_error("Failed to delete backend stage", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tfplug::DynamicValue;

    #[test]
    fn s3_block_round_trips_through_state() {
        let mut data = ResourceData::from_state(DynamicValue::empty_object());
        assert!(expand_s3(&data).is_none());

        let backend = ScalewayS3Backend {
            bucket_name: "assets".to_string(),
            bucket_region: "fr-par".to_string(),
            is_website: false,
        };
        data.set("s3_backend_config", flatten_s3(Some(backend.clone())))
            .unwrap();

        assert_eq!(expand_s3(&data), Some(backend));
    }
}
