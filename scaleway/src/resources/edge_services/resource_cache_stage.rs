//! Edge Services cache stage resource
//!
//! `purge_requests` is write-only: each block is sent as a purge when the
//! stage is created or when the blocks change, and the backend never
//! reports it back. A purge that fails only warns.

use std::collections::HashMap;

use async_trait::async_trait;
use tfplug::defaults::StaticDefault;
use tfplug::schema::NestedType;
use tfplug::{
    AttributeBuilder, AttributeType, Context, Diagnostics, Dynamic, IdentitySchema,
    ResourceData, Schema, SchemaBuilder,
};

use super::{pipeline_id_attribute, stage_reference, stage_values};
use crate::api::edge_services::{CacheStageRequest, CreatePurgeRequest};
use crate::identity::{compose_flat, flat_identity_schema, persist_flat_identity};
use crate::provider_data::ScalewayProviderData;
use crate::resources::{id_attribute, timestamp_attribute};
use crate::skeleton::{ignore_not_found, read_failure, set_values, ScalewayResource};
use crate::waiter::{ensure_ready, wait_for, PURGE_REQUEST};

const IDENTITY_KEY: &str = "cache_stage_id";
const DEFAULT_FALLBACK_TTL: i64 = 3600;

pub struct CacheStageResource;

fn expand_purges(data: &ResourceData) -> Vec<CreatePurgeRequest> {
    let count = data.get_list("purge_requests").len();
    (0..count)
        .map(|i| {
            let assets = data.get_string_list(&format!("purge_requests.{}.assets", i));
            CreatePurgeRequest {
                pipeline_id: data
                    .get_string(&format!("purge_requests.{}.pipeline_id", i))
                    .unwrap_or_default(),
                assets: (!assets.is_empty()).then_some(assets),
                all: data.get_bool(&format!("purge_requests.{}.all", i)),
            }
        })
        .collect()
}

/// Send every purge block and wait for each to settle
async fn purge(ctx: &Context, meta: &ScalewayProviderData, data: &ResourceData) -> Diagnostics {
    let api = meta.client.edge_services();
    let interval = PURGE_REQUEST.interval(meta.wait_retry_interval);
    let mut diagnostics = Diagnostics::new();

    for request in expand_purges(data) {
        let created = match api.create_purge_request(&request).await {
            Ok(created) => created,
            Err(e) => {
                diagnostics.add_warning("Failed to create purge request", e.to_string());
                continue;
            }
        };

        let settled = wait_for(ctx, &PURGE_REQUEST, interval, || {
            api.get_purge_request(&created.id)
        })
        .await
        .and_then(|purge| ensure_ready(&PURGE_REQUEST, purge));

        if let Err(e) = settled {
            diagnostics.add_warning(
                format!("Purge request {} did not complete", created.id),
                e.to_string(),
            );
        }
    }
    diagnostics
}

impl CacheStageResource {
    fn request(data: &ResourceData) -> CacheStageRequest {
        CacheStageRequest {
            fallback_ttl: data.get_i64("fallback_ttl"),
            include_cookies: data.get_bool("include_cookies"),
            backend_stage_id: data.get_string_ok("backend_stage_id"),
            waf_stage_id: data.get_string_ok("waf_stage_id"),
            route_stage_id: data.get_string_ok("route_stage_id"),
        }
    }
}

#[async_trait]
impl ScalewayResource for CacheStageResource {
    const TYPE_NAME: &'static str = "scaleway_edge_services_cache_stage";

    fn schema() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages the cache stage of an Edge Services pipeline")
            .attribute(id_attribute())
            .attribute(pipeline_id_attribute())
            .attribute(
                AttributeBuilder::new("fallback_ttl", AttributeType::Number)
                    .description("Time to live of cached objects without a Cache-Control header, in seconds")
                    .optional()
                    .default(StaticDefault::number(DEFAULT_FALLBACK_TTL as f64))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("include_cookies", AttributeType::Bool)
                    .description("Whether cookies are part of the cache key")
                    .optional_computed()
                    .build(),
            )
            .attribute(stage_reference("backend_stage_id", "The backend stage to link"))
            .attribute(stage_reference("waf_stage_id", "The WAF stage to link"))
            .attribute(stage_reference("route_stage_id", "The route stage to link"))
            .attribute(
                AttributeBuilder::nested(
                    "purge_requests",
                    NestedType::list(vec![
                        AttributeBuilder::new("pipeline_id", AttributeType::String)
                            .description("The pipeline whose cache is purged")
                            .required()
                            .build(),
                        AttributeBuilder::new("assets", AttributeType::List(Box::new(AttributeType::String)))
                            .description("Paths of the assets to purge")
                            .optional()
                            .build(),
                        AttributeBuilder::new("all", AttributeType::Bool)
                            .description("Purge the whole cache")
                            .optional()
                            .build(),
                    ]),
                )
                .description("Cache purges to run after create or update")
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
        ctx: &Context,
        meta: &ScalewayProviderData,
        data: &mut ResourceData,
    ) -> Diagnostics {
        let pipeline_id = data.get_string("pipeline_id").unwrap_or_default();
        let request = Self::request(data);

        let stage = match meta
            .client
            .edge_services()
            .create_cache_stage(&pipeline_id, &request)
            .await
        {
            Ok(stage) => stage,
            Err(e) => return Diagnostics::from_error("Failed to create cache stage", e),
        };
        persist_flat_identity(data, IDENTITY_KEY, &stage.id);

        purge(ctx, meta, data).await
    }

    async fn read(
        &self,
        _ctx: &Context,
        meta: &ScalewayProviderData,
        data: &mut ResourceData,
    ) -> Diagnostics {
        let stage = match meta.client.edge_services().get_cache_stage(&data.id()).await {
            Ok(stage) => stage,
            Err(e) => return read_failure(data, "Failed to read cache stage", &e),
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
                ("fallback_ttl", Dynamic::from(stage.fallback_ttl.unwrap_or(DEFAULT_FALLBACK_TTL))),
                ("include_cookies", Dynamic::from(stage.include_cookies)),
                ("backend_stage_id", Dynamic::from(stage.backend_stage_id)),
                ("waf_stage_id", Dynamic::from(stage.waf_stage_id)),
                ("route_stage_id", Dynamic::from(stage.route_stage_id)),
            ],
        ));
        diagnostics
    }

    async fn update(
        &self,
        ctx: &Context,
        meta: &ScalewayProviderData,
        data: &mut ResourceData,
    ) -> Diagnostics {
        let fields = [
            "fallback_ttl",
            "include_cookies",
            "backend_stage_id",
            "waf_stage_id",
            "route_stage_id",
        ];
        if data.has_changes(&fields) {
            let request = Self::request(data);
            if let Err(e) = meta
                .client
                .edge_services()
                .update_cache_stage(&data.id(), &request)
                .await
            {
                return Diagnostics::from_error("Failed to update cache stage", e);
            }
        }

        if data.has_change("purge_requests") {
            return purge(ctx, meta, data).await;
        }
        Diagnostics::new()
    }

    async fn delete(
        &self,
        _ctx: &Context,
        meta: &ScalewayProviderData,
        data: &mut ResourceData,
    ) -> Diagnostics {
        let result = meta.client.edge_services().delete_cache_stage(&data.id()).await;
        match ignore_not_found(result) {
            Ok(()) => Diagnostics::new(),
            Err(e) => Diagnostics::from_error("Failed to delete cache stage", e),
        }
    }
}
