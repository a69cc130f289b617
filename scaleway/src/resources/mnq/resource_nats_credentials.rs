//! Credentials of a NATS account
//!
//! The credentials file is only returned at creation; reads keep the
//! stored one.

use std::collections::HashMap;

use async_trait::async_trait;
use tfplug::plan_modifier::SuppressDiff;
use tfplug::{
    AttributeBuilder, AttributeType, Context, Diagnostics, Dynamic, IdentitySchema, ResourceData,
    Schema, SchemaBuilder,
};

use crate::flatten::name_or_random;
use crate::identity::{compose_regional, persist_regional_identity, regional_identity_schema};
use crate::ids::{expand_id, keep_reference, locality_insensitive_eq, parse_regional_id};
use crate::provider_data::ScalewayProviderData;
use crate::resources::{id_attribute, reference_attribute, region_attribute, regional_id};
use crate::skeleton::{id_error, ignore_not_found, read_failure, set_values, ScalewayResource};

pub struct NatsCredentialsResource;

#[async_trait]
impl ScalewayResource for NatsCredentialsResource {
    const TYPE_NAME: &'static str = "scaleway_mnq_nats_credentials";

    fn schema() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages credentials of a NATS account")
            .attribute(id_attribute())
            .attribute(
                reference_attribute("account_id", "The NATS account the credentials belong to")
                    .required()
                    .plan_modifier(SuppressDiff::new(locality_insensitive_eq))
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("The name of the credentials, generated when omitted")
                    .optional_computed()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("file", AttributeType::String)
                    .description("Content of the .creds file")
                    .computed()
                    .sensitive()
                    .build(),
            )
            .attribute(region_attribute())
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
        let account = data.get_string("account_id").unwrap_or_default();
        let (region, account_id) = match data.get_string_ok("region") {
            Some(_) => match meta.region(data) {
                Ok(region) => (region, expand_id(&account).to_string()),
                Err(e) => return id_error(e),
            },
            None => match parse_regional_id(&account, meta.default_region) {
                Ok(parsed) => parsed,
                Err(e) => return id_error(e),
            },
        };
        let name = name_or_random(data, "nats-credentials");

        let credentials = match meta
            .client
            .mnq(region)
            .create_nats_credentials(&account_id, &name)
            .await
        {
            Ok(credentials) => credentials,
            Err(e) => return Diagnostics::from_error("Failed to create NATS credentials", e),
        };
        persist_regional_identity(data, region, &credentials.id);

        let file = credentials.credentials.map(|file| file.content);
        set_values(data, [("file", Dynamic::from(file))])
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
        let credentials = match meta.client.mnq(region).get_nats_credentials(&id).await {
            Ok(credentials) => credentials,
            Err(e) => return read_failure(data, "Failed to read NATS credentials", &e),
        };

        let account_id = keep_reference(data.get_string("account_id"), &credentials.nats_account_id);
        persist_regional_identity(data, region, &credentials.id);
        set_values(
            data,
            [
                ("account_id", Dynamic::from(account_id)),
                ("name", Dynamic::from(credentials.name)),
                ("region", Dynamic::from(region.as_str())),
            ],
        )
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
        let (region, id) = match regional_id(meta, data) {
            Ok(parsed) => parsed,
            Err(diagnostics) => return diagnostics,
        };
        match ignore_not_found(meta.client.mnq(region).delete_nats_credentials(&id).await) {
            Ok(()) => Diagnostics::new(),
            Err(e) => Diagnostics::from_error("Failed to delete NATS credentials", e),
        }
    }
}
