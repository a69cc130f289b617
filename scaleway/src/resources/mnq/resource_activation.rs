//! Activation of the SQS and SNS compatible services on a project
//!
//! The ID is `<region>/<project-id>`. Read tombstones once the service is
//! no longer enabled.

use std::collections::HashMap;

use async_trait::async_trait;
use tfplug::{
    AttributeBuilder, AttributeType, Context, Diagnostics, Dynamic, IdentitySchema, ResourceData,
    Schema, SchemaBuilder,
};

use crate::api::mnq::MnqService;
use crate::flatten::flatten_time;
use crate::identity::{compose_regional, persist_regional_identity, regional_identity_schema};
use crate::provider_data::ScalewayProviderData;
use crate::resources::{
    id_attribute, project_id_attribute, region_attribute, regional_id, resolve_region,
    timestamp_attribute,
};
use crate::skeleton::{ignore_not_found, read_failure, require_project, set_values, ScalewayResource};

pub struct SqsActivationResource;

pub struct SnsActivationResource;

fn schema(service: MnqService) -> Schema {
    let name = service.as_str().to_uppercase();
    SchemaBuilder::new()
        .version(0)
        .description(&format!("Activates {} on a project", name))
        .attribute(id_attribute())
        .attribute(
            AttributeBuilder::new("endpoint", AttributeType::String)
                .description(&format!("The endpoint of the {} service for this project", name))
                .computed()
                .build(),
        )
        .attribute(region_attribute())
        .attribute(project_id_attribute())
        .attribute(timestamp_attribute("created_at", "The date and time of the activation"))
        .attribute(timestamp_attribute("updated_at", "The date and time of the last update"))
        .build()
}

async fn activate(
    service: MnqService,
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

    match meta.client.mnq(region).activate(service, &project_id).await {
        Ok(info) => {
            persist_regional_identity(data, region, &info.project_id);
            Diagnostics::new()
        }
        Err(e) => Diagnostics::from_error(
            format!("Failed to activate {}", service.as_str().to_uppercase()),
            e,
        ),
    }
}

async fn read_info(
    service: MnqService,
    meta: &ScalewayProviderData,
    data: &mut ResourceData,
) -> Diagnostics {
    let (region, project_id) = match regional_id(meta, data) {
        Ok(parsed) => parsed,
        Err(diagnostics) => return diagnostics,
    };
    let summary = format!("Failed to read {} activation", service.as_str().to_uppercase());
    let info = match meta.client.mnq(region).get_info(service, &project_id).await {
        Ok(info) => info,
        Err(e) => return read_failure(data, &summary, &e),
    };
    if !info.is_enabled() {
        tracing::debug!("{} is {} on project {}", service.as_str(), info.status, project_id);
        data.set_id("");
        return Diagnostics::new();
    }

    persist_regional_identity(data, region, &project_id);
    set_values(
        data,
        [
            ("endpoint", Dynamic::from(info.endpoint_url)),
            ("project_id", Dynamic::from(project_id)),
            ("region", Dynamic::from(region.as_str())),
            ("created_at", Dynamic::from(flatten_time(info.created_at.as_deref()))),
            ("updated_at", Dynamic::from(flatten_time(info.updated_at.as_deref()))),
        ],
    )
}

async fn deactivate(
    service: MnqService,
    meta: &ScalewayProviderData,
    data: &mut ResourceData,
) -> Diagnostics {
    let (region, project_id) = match regional_id(meta, data) {
        Ok(parsed) => parsed,
        Err(diagnostics) => return diagnostics,
    };
    let result = meta.client.mnq(region).deactivate(service, &project_id).await;
    match ignore_not_found(result.map(|_| ())) {
        Ok(()) => Diagnostics::new(),
        Err(e) => Diagnostics::from_error(
            format!("Failed to deactivate {}", service.as_str().to_uppercase()),
            e,
        ),
    }
}

macro_rules! activation_resource {
    ($resource:ty, $type_name:literal, $service:expr) => {
        #[async_trait]
        impl ScalewayResource for $resource {
            const TYPE_NAME: &'static str = $type_name;

            fn schema() -> Schema {
                schema($service)
            }

            fn identity_schema() -> IdentitySchema {
                regional_identity_schema()
            }

            fn compose_id(fields: &HashMap<String, String>) -> Option<String> {
                compose_regional(fields)
            }

            async fn create(
                &self,
                _ctx: &Context,
                meta: &ScalewayProviderData,
                data: &mut ResourceData,
            ) -> Diagnostics {
                activate($service, meta, data).await
            }

            async fn read(
                &self,
                _ctx: &Context,
                meta: &ScalewayProviderData,
                data: &mut ResourceData,
            ) -> Diagnostics {
                read_info($service, meta, data).await
            }

            /// Every argument forces replacement
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
                _ctx: &Context,
                meta: &ScalewayProviderData,
                data: &mut ResourceData,
            ) -> Diagnostics {
                deactivate($service, meta, data).await
            }
        }
    };
}

activation_resource!(SqsActivationResource, "scaleway_mnq_sqs", MnqService::Sqs);
activation_resource!(SnsActivationResource, "scaleway_mnq_sns", MnqService::Sns);
