//! Edge Services pipeline resource

use std::collections::HashMap;

use async_trait::async_trait;
use tfplug::{
    AttributeBuilder, AttributeType, Context, Diagnostics, Dynamic, IdentitySchema,
    ResourceData, Schema, SchemaBuilder,
};

use crate::api::edge_services::{CreatePipelineRequest, UpdatePipelineRequest};
use crate::flatten::{flatten_time, name_or_random};
use crate::identity::{compose_flat, flat_identity_schema, persist_flat_identity};
use crate::provider_data::ScalewayProviderData;
use crate::resources::{
    id_attribute, organization_id_attribute, project_id_attribute, status_attribute,
    timestamp_attribute,
};
use crate::skeleton::{
    ignore_not_found, read_failure, require_project, set_values, ScalewayResource,
};

const IDENTITY_KEY: &str = "pipeline_id";

pub struct PipelineResource;

#[async_trait]
impl ScalewayResource for PipelineResource {
    const TYPE_NAME: &'static str = "scaleway_edge_services_pipeline";

    fn schema() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages an Edge Services pipeline")
            .attribute(id_attribute())
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("The name of the pipeline")
                    .optional_computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("description", AttributeType::String)
                    .description("The description of the pipeline")
                    .optional()
                    .build(),
            )
            .attribute(status_attribute())
            .attribute(project_id_attribute())
            .attribute(organization_id_attribute())
            .attribute(timestamp_attribute("created_at", "The date and time of the creation of the pipeline"))
            .attribute(timestamp_attribute("updated_at", "The date and time of the last update of the pipeline"))
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
        let project_id = match require_project(meta, data) {
            Ok(project_id) => project_id,
            Err(diagnostics) => return diagnostics,
        };
        let request = CreatePipelineRequest {
            project_id,
            name: name_or_random(data, "pipeline"),
            description: data.get_string("description").unwrap_or_default(),
        };

        match meta.client.edge_services().create_pipeline(&request).await {
            Ok(pipeline) => {
                persist_flat_identity(data, IDENTITY_KEY, &pipeline.id);
                Diagnostics::new()
            }
            Err(e) => Diagnostics::from_error("Failed to create pipeline", e),
        }
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

        persist_flat_identity(data, IDENTITY_KEY, &pipeline.id);
        set_values(
            data,
            [
                ("name", Dynamic::from(pipeline.name)),
                ("description", Dynamic::from(pipeline.description)),
                ("status", Dynamic::from(pipeline.status)),
                ("project_id", Dynamic::from(pipeline.project_id)),
                ("organization_id", Dynamic::from(pipeline.organization_id)),
                ("created_at", Dynamic::from(flatten_time(pipeline.created_at.as_deref()))),
                ("updated_at", Dynamic::from(flatten_time(pipeline.updated_at.as_deref()))),
            ],
        )
    }

    async fn update(
        &self,
        _ctx: &Context,
        meta: &ScalewayProviderData,
        data: &mut ResourceData,
    ) -> Diagnostics {
        if !data.has_changes(&["name", "description"]) {
            return Diagnostics::new();
        }
        let request = UpdatePipelineRequest {
            name: data.get_string("name").filter(|_| data.has_change("name")),
            description: data.has_change("description").then(|| {
                data.get_string("description").unwrap_or_default()
            }),
        };

        match meta
            .client
            .edge_services()
            .update_pipeline(&data.id(), &request)
            .await
        {
            Ok(_) => Diagnostics::new(),
            Err(e) => Diagnostics::from_error("Failed to update pipeline", e),
        }
    }

    async fn delete(
        &self,
        _ctx: &Context,
        meta: &ScalewayProviderData,
        data: &mut ResourceData,
    ) -> Diagnostics {
        let result = meta.client.edge_services().delete_pipeline(&data.id()).await;
        match ignore_not_found(result) {
            Ok(()) => Diagnostics::new(),
            Err(e) => Diagnostics::from_error("Failed to delete pipeline", e),
        }
    }
}
