//! Edge Services DNS stage resource
//!
//! The backend normalises the FQDN list; state keeps the order the user
//! wrote and appends names only the server knows about.

use std::collections::HashMap;

use async_trait::async_trait;
use tfplug::{
    AttributeBuilder, AttributeType, Context, Diagnostics, Dynamic, IdentitySchema,
    ResourceData, Schema, SchemaBuilder,
};

use super::{pipeline_id_attribute, stage_reference, stage_values};
use crate::api::edge_services::DnsStageRequest;
use crate::flatten::ordered_merge;
use crate::identity::{compose_flat, flat_identity_schema, persist_flat_identity};
use crate::provider_data::ScalewayProviderData;
use crate::resources::{id_attribute, timestamp_attribute};
use crate::skeleton::{ignore_not_found, read_failure, set_values, ScalewayResource};

const IDENTITY_KEY: &str = "dns_stage_id";

pub struct DnsStageResource;

impl DnsStageResource {
    fn request(data: &ResourceData) -> DnsStageRequest {
        let fqdns = data.get_string_list("fqdns");
        DnsStageRequest {
            fqdns: (!fqdns.is_empty()).then_some(fqdns),
            backend_stage_id: data.get_string_ok("backend_stage_id"),
            cache_stage_id: data.get_string_ok("cache_stage_id"),
            tls_stage_id: data.get_string_ok("tls_stage_id"),
        }
    }
}

#[async_trait]
impl ScalewayResource for DnsStageResource {
    const TYPE_NAME: &'static str = "scaleway_edge_services_dns_stage";

    fn schema() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages the DNS stage of an Edge Services pipeline")
            .attribute(id_attribute())
            .attribute(pipeline_id_attribute())
            .attribute(
                AttributeBuilder::new("fqdns", AttributeType::List(Box::new(AttributeType::String)))
                    .description("Fully qualified domain names served by the pipeline")
                    .optional_computed()
                    .build(),
            )
            .attribute(stage_reference("backend_stage_id", "The backend stage to link"))
            .attribute(stage_reference("cache_stage_id", "The cache stage to link"))
            .attribute(stage_reference("tls_stage_id", "The TLS stage to link"))
            .attribute(
                AttributeBuilder::new("type", AttributeType::String)
                    .description("The type of the DNS stage")
                    .computed()
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
        let request = Self::request(data);

        match meta
            .client
            .edge_services()
            .create_dns_stage(&pipeline_id, &request)
            .await
        {
            Ok(stage) => {
                persist_flat_identity(data, IDENTITY_KEY, &stage.id);
                Diagnostics::new()
            }
            Err(e) => Diagnostics::from_error("Failed to create DNS stage", e),
        }
    }

    async fn read(
        &self,
        _ctx: &Context,
        meta: &ScalewayProviderData,
        data: &mut ResourceData,
    ) -> Diagnostics {
        let stage = match meta.client.edge_services().get_dns_stage(&data.id()).await {
            Ok(stage) => stage,
            Err(e) => return read_failure(data, "Failed to read DNS stage", &e),
        };

        let fqdns = ordered_merge(&data.get_string_list("fqdns"), &stage.fqdns);
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
                ("fqdns", Dynamic::from(fqdns)),
                ("backend_stage_id", Dynamic::from(stage.backend_stage_id)),
                ("cache_stage_id", Dynamic::from(stage.cache_stage_id)),
                ("tls_stage_id", Dynamic::from(stage.tls_stage_id)),
                ("type", Dynamic::from(stage.stage_type)),
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
        let fields = ["fqdns", "backend_stage_id", "cache_stage_id", "tls_stage_id"];
        if !data.has_changes(&fields) {
            return Diagnostics::new();
        }

        let full = Self::request(data);
        let request = DnsStageRequest {
            fqdns: data.has_change("fqdns").then(|| data.get_string_list("fqdns")),
            backend_stage_id: full.backend_stage_id.filter(|_| data.has_change("backend_stage_id")),
            cache_stage_id: full.cache_stage_id.filter(|_| data.has_change("cache_stage_id")),
            tls_stage_id: full.tls_stage_id.filter(|_| data.has_change("tls_stage_id")),
        };

        match meta
            .client
            .edge_services()
            .update_dns_stage(&data.id(), &request)
            .await
        {
            Ok(_) => Diagnostics::new(),
            Err(e) => Diagnostics::from_error("Failed to update DNS stage", e),
        }
    }

    async fn delete(
        &self,
        _ctx: &Context,
        meta: &ScalewayProviderData,
        data: &mut ResourceData,
    ) -> Diagnostics {
        let result = meta.client.edge_services().delete_dns_stage(&data.id()).await;
        match ignore_not_found(result) {
            Ok(()) => Diagnostics::new(),
            Err(e) => Diagnostics::from_error("Failed to delete DNS stage", e),
        }
    }
}
