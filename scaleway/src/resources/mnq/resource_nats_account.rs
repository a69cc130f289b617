//! NATS account, the tenant of a NATS server

use std::collections::HashMap;

use async_trait::async_trait;
use tfplug::{
    AttributeBuilder, AttributeType, Context, Diagnostics, Dynamic, IdentitySchema, ResourceData,
    Schema, SchemaBuilder,
};

use crate::flatten::name_or_random;
use crate::identity::{compose_regional, persist_regional_identity, regional_identity_schema};
use crate::provider_data::ScalewayProviderData;
use crate::resources::{
    id_attribute, project_id_attribute, region_attribute, regional_id, resolve_region,
};
use crate::skeleton::{ignore_not_found, read_failure, require_project, set_values, ScalewayResource};

pub struct NatsAccountResource;

#[async_trait]
impl ScalewayResource for NatsAccountResource {
    const TYPE_NAME: &'static str = "scaleway_mnq_nats_account";

    fn schema() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages a NATS account")
            .attribute(id_attribute())
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("The name of the account, generated when omitted")
                    .optional_computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("endpoint", AttributeType::String)
                    .description("The endpoint of the NATS server")
                    .computed()
                    .build(),
            )
            .attribute(region_attribute())
            .attribute(project_id_attribute())
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
        _ctx: &Context,
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
        let name = name_or_random(data, "nats");

        match meta.client.mnq(region).create_nats_account(&project_id, &name).await {
            Ok(account) => {
                persist_regional_identity(data, region, &account.id);
                Diagnostics::new()
            }
            Err(e) => Diagnostics::from_error("Failed to create NATS account", e),
        }
    }

    async fn read(
        &self,
        _ctx: &Context,
        meta: &ScalewayProviderData,
        data: &mut ResourceData,
    ) -> Diagnostics {
        let (region, id) = match regional_id(meta, data) {
            Ok(parsed) => parsed,
            Err(diagnostics) => return diagnostics,
        };
        let account = match meta.client.mnq(region).get_nats_account(&id).await {
            Ok(account) => account,
            Err(e) => return read_failure(data, "Failed to read NATS account", &e),
        };

        persist_regional_identity(data, region, &account.id);
        set_values(
            data,
            [
                ("name", Dynamic::from(account.name)),
                ("endpoint", Dynamic::from(account.endpoint)),
                ("project_id", Dynamic::from(account.project_id)),
                ("region", Dynamic::from(region.as_str())),
            ],
        )
    }

    async fn update(
        &self,
        _ctx: &Context,
        meta: &ScalewayProviderData,
        data: &mut ResourceData,
    ) -> Diagnostics {
        if !data.has_change("name") {
            return Diagnostics::new();
        }
        let (region, id) = match regional_id(meta, data) {
            Ok(parsed) => parsed,
            Err(diagnostics) => return diagnostics,
        };
        let name = data.get_string("name").unwrap_or_default();
        match meta.client.mnq(region).update_nats_account(&id, &name).await {
            Ok(_) => Diagnostics::new(),
            Err(e) => Diagnostics::from_error("Failed to update NATS account", e),
        }
    }

    async fn delete(
        &self,
        _ctx: &Context,
        meta: &ScalewayProviderData,
        data: &mut ResourceData,
    ) -> Diagnostics {
        let (region, id) = match regional_id(meta, data) {
            Ok(parsed) => parsed,
            Err(diagnostics) => return diagnostics,
        };
        match ignore_not_found(meta.client.mnq(region).delete_nats_account(&id).await) {
            Ok(()) => Diagnostics::new(),
            Err(e) => Diagnostics::from_error("Failed to delete NATS account", e),
        }
    }
}
