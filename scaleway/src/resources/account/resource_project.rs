//! Account project resource

use std::collections::HashMap;

use async_trait::async_trait;
use tfplug::{
    AttributeBuilder, AttributeType, Context, Diagnostics, Dynamic, IdentitySchema,
    ResourceData, Schema, SchemaBuilder,
};

use crate::api::account::{CreateProjectRequest, Project, UpdateProjectRequest};
use crate::errors::{is_not_found_with, ErrorPolicy};
use crate::flatten::{flatten_time, name_or_random};
use crate::identity::{compose_flat, flat_identity_schema, persist_flat_identity};
use crate::provider_data::ScalewayProviderData;
use crate::resources::{id_attribute, timestamp_attribute};
use crate::skeleton::{read_failure_with, set_values, ScalewayResource};

const IDENTITY_KEY: &str = "project_id";

pub struct ProjectResource;

impl ProjectResource {
    fn flatten(data: &mut ResourceData, project: Project) -> Diagnostics {
        persist_flat_identity(data, IDENTITY_KEY, &project.id);
        set_values(
            data,
            [
                ("name", Dynamic::from(project.name)),
                ("description", Dynamic::from(project.description)),
                ("organization_id", Dynamic::from(project.organization_id)),
                (
                    "created_at",
                    Dynamic::from(flatten_time(project.created_at.as_deref())),
                ),
                (
                    "updated_at",
                    Dynamic::from(flatten_time(project.updated_at.as_deref())),
                ),
            ],
        )
    }
}

#[async_trait]
impl ScalewayResource for ProjectResource {
    const TYPE_NAME: &'static str = "scaleway_account_project";

    fn schema() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages a Scaleway project")
            .attribute(id_attribute())
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("The name of the project, generated when omitted")
                    .optional_computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("description", AttributeType::String)
                    .description("The description of the project")
                    .optional_computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("organization_id", AttributeType::String)
                    .description("The organization owning the project")
                    .optional_computed()
                    .force_new()
                    .build(),
            )
            .attribute(timestamp_attribute(
                "created_at",
                "The date and time of the creation of the project",
            ))
            .attribute(timestamp_attribute(
                "updated_at",
                "The date and time of the last update of the project",
            ))
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
        let request = CreateProjectRequest {
            name: name_or_random(data, "project"),
            organization_id: meta.organization_id(data),
            description: data.get_string("description").unwrap_or_default(),
        };

        match meta.client.account().create_project(&request).await {
            Ok(project) => {
                persist_flat_identity(data, IDENTITY_KEY, &project.id);
                Diagnostics::new()
            }
            Err(e) => Diagnostics::from_error("Failed to create project", e),
        }
    }

    async fn read(
        &self,
        _ctx: &Context,
        meta: &ScalewayProviderData,
        data: &mut ResourceData,
    ) -> Diagnostics {
        match meta.client.account().get_project(&data.id()).await {
            Ok(project) => Self::flatten(data, project),
            Err(e) => read_failure_with(data, "Failed to read project", &e, &ErrorPolicy::ACCOUNT),
        }
    }

    async fn update(
        &self,
        _ctx: &Context,
        meta: &ScalewayProviderData,
        data: &mut ResourceData,
    ) -> Diagnostics {
        let mut request = UpdateProjectRequest::default();
        if data.has_change("name") {
            request.name = data.get_string("name");
        }
        if data.has_change("description") {
            request.description = Some(data.get_string("description").unwrap_or_default());
        }
        if request.name.is_none() && request.description.is_none() {
            return Diagnostics::new();
        }

        match meta
            .client
            .account()
            .update_project(&data.id(), &request)
            .await
        {
            Ok(_) => Diagnostics::new(),
            Err(e) => Diagnostics::from_error("Failed to update project", e),
        }
    }

    async fn delete(
        &self,
        _ctx: &Context,
        meta: &ScalewayProviderData,
        data: &mut ResourceData,
    ) -> Diagnostics {
        match meta.client.account().delete_project(&data.id()).await {
            Ok(()) => Diagnostics::new(),
            Err(e) if is_not_found_with(&e, &ErrorPolicy::ACCOUNT) => Diagnostics::new(),
            Err(e) => Diagnostics::from_error("Failed to delete project", e),
        }
    }
}
