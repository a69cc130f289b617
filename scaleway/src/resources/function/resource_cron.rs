//! Cron trigger of a serverless function

use std::collections::HashMap;

use async_trait::async_trait;
use tfplug::plan_modifier::SuppressDiff;
use tfplug::{
    AttributeBuilder, AttributePath, AttributeType, Context, Diagnostics, Dynamic, DynamicValue,
    IdentitySchema, ResourceData, Schema, SchemaBuilder,
};

use super::{function_id_attribute, FUNCTION_TIMEOUTS};
use crate::api::function::CronRequest;
use crate::flatten::name_or_random;
use crate::identity::{compose_regional, persist_regional_identity, regional_identity_schema};
use crate::ids::{keep_reference, parse_regional_id};
use crate::provider_data::ScalewayProviderData;
use crate::resources::{
    id_attribute, region_attribute, regional_id, resolve_region, status_attribute,
};
use crate::skeleton::{
    id_error, ignore_gone, ignore_not_found, set_values, wait_failure, ScalewayResource, Timeouts,
};
use crate::waiter::{ensure_ready, wait_for, wait_for_deletion, FUNCTION_CRON};

pub struct CronResource;

/// `args` is a JSON document in configuration; the API wants an object
fn parse_args(raw: Option<String>) -> Result<serde_json::Value, String> {
    match raw.filter(|s| !s.trim().is_empty()) {
        Some(raw) => serde_json::from_str(&raw).map_err(|e| format!("args is not valid JSON: {}", e)),
        None => Ok(serde_json::json!({})),
    }
}

/// Canonical JSON keeps the stored `args` stable whatever the spacing
fn same_json(a: &Dynamic, b: &Dynamic) -> bool {
    let parse = |v: &Dynamic| v.as_str().and_then(|s| serde_json::from_str::<serde_json::Value>(s).ok());
    match (parse(a), parse(b)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

#[async_trait]
impl ScalewayResource for CronResource {
    const TYPE_NAME: &'static str = "scaleway_function_cron";

    fn schema() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages a cron trigger of a serverless function")
            .attribute(id_attribute())
            .attribute(function_id_attribute())
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("The name of the cron, generated when omitted")
                    .optional_computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("schedule", AttributeType::String)
                    .description("Cron expression in UTC, e.g. \"0 * * * *\"")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("args", AttributeType::String)
                    .description("JSON object sent as the body of each invocation")
                    .optional_computed()
                    .plan_modifier(SuppressDiff::new(same_json))
                    .build(),
            )
            .attribute(status_attribute())
            .attribute(region_attribute())
            .build()
    }

    fn identity_schema() -> IdentitySchema {
        regional_identity_schema()
    }

    fn compose_id(fields: &HashMap<String, String>) -> Option<String> {
        compose_regional(fields)
    }

    fn timeouts() -> Timeouts {
        FUNCTION_TIMEOUTS
    }

    fn validate(config: &DynamicValue, diagnostics: &mut Diagnostics) {
        let args = config.get_string(&AttributePath::new("args")).ok();
        if let Err(e) = parse_args(args) {
            diagnostics.add_error_at(AttributePath::new("args"), "Invalid cron arguments", e);
        }
    }

    async fn create(
        &self,
        ctx: &Context,
        meta: &ScalewayProviderData,
        data: &mut ResourceData,
    ) -> Diagnostics {
        let default_region = match resolve_region(meta, data) {
            Ok(region) => region,
            Err(diagnostics) => return diagnostics,
        };
        let function = data.get_string("function_id").unwrap_or_default();
        let (region, function_id) = match parse_regional_id(&function, default_region) {
            Ok(parsed) => parsed,
            Err(e) => return id_error(e),
        };
        let args = match parse_args(data.get_string("args")) {
            Ok(args) => args,
            Err(e) => return Diagnostics::from_error("Invalid cron arguments", e),
        };

        let request = CronRequest {
            function_id: Some(function_id),
            schedule: data.get_string("schedule"),
            args: Some(args),
            name: Some(name_or_random(data, "cron")),
        };

        let api = meta.client.function(region);
        let cron = match api.create_cron(&request).await {
            Ok(cron) => cron,
            Err(e) => return Diagnostics::from_error("Failed to create cron", e),
        };
        persist_regional_identity(data, region, &cron.id);

        let interval = FUNCTION_CRON.interval(meta.wait_retry_interval);
        match wait_for(ctx, &FUNCTION_CRON, interval, || api.get_cron(&cron.id))
            .await
            .and_then(|cron| ensure_ready(&FUNCTION_CRON, cron))
        {
            Ok(_) => Diagnostics::new(),
            Err(e) => Diagnostics::from_error("Cron did not become ready", e),
        }
    }

    async fn read(
        &self,
        ctx: &Context,
        meta: &ScalewayProviderData,
        data: &mut ResourceData,
    ) -> Diagnostics {
        let (region, id) = match regional_id(meta, data) {
            Ok(parsed) => parsed,
            Err(diagnostics) => return diagnostics,
        };
        let api = meta.client.function(region);
        let interval = FUNCTION_CRON.interval(meta.wait_retry_interval);

        let cron = match wait_for(ctx, &FUNCTION_CRON, interval, || api.get_cron(&id)).await {
            Ok(cron) => cron,
            Err(e) => return wait_failure(data, "Failed to read cron", &e),
        };

        persist_regional_identity(data, region, &cron.id);
        let function_id = keep_reference(data.get_string("function_id"), &cron.function_id);
        set_values(
            data,
            [
                ("function_id", Dynamic::from(function_id)),
                ("name", Dynamic::from(cron.name)),
                ("schedule", Dynamic::from(cron.schedule)),
                ("args", Dynamic::from(cron.args.to_string())),
                ("status", Dynamic::from(cron.status)),
                ("region", Dynamic::from(region.as_str())),
            ],
        )
    }

    async fn update(
        &self,
        ctx: &Context,
        meta: &ScalewayProviderData,
        data: &mut ResourceData,
    ) -> Diagnostics {
        let (region, id) = match regional_id(meta, data) {
            Ok(parsed) => parsed,
            Err(diagnostics) => return diagnostics,
        };
        let api = meta.client.function(region);
        let interval = FUNCTION_CRON.interval(meta.wait_retry_interval);

        if let Err(e) = wait_for(ctx, &FUNCTION_CRON, interval, || api.get_cron(&id)).await {
            return Diagnostics::from_error("Failed to wait for cron", e);
        }

        let mut request = CronRequest::default();
        if data.has_change("name") {
            request.name = data.get_string_ok("name");
        }
        if data.has_change("schedule") {
            request.schedule = data.get_string("schedule");
        }
        if data.has_change("args") {
            match parse_args(data.get_string("args")) {
                Ok(args) => request.args = Some(args),
                Err(e) => return Diagnostics::from_error("Invalid cron arguments", e),
            }
        }
        if request.name.is_none() && request.schedule.is_none() && request.args.is_none() {
            return Diagnostics::new();
        }

        if let Err(e) = api.update_cron(&id, &request).await {
            return Diagnostics::from_error("Failed to update cron", e);
        }
        match wait_for(ctx, &FUNCTION_CRON, interval, || api.get_cron(&id)).await {
            Ok(_) => Diagnostics::new(),
            Err(e) => Diagnostics::from_error("Failed to wait for cron", e),
        }
    }

    async fn delete(
        &self,
        ctx: &Context,
        meta: &ScalewayProviderData,
        data: &mut ResourceData,
    ) -> Diagnostics {
        let (region, id) = match regional_id(meta, data) {
            Ok(parsed) => parsed,
            Err(diagnostics) => return diagnostics,
        };
        let api = meta.client.function(region);
        let interval = FUNCTION_CRON.interval(meta.wait_retry_interval);

        let settled = wait_for(ctx, &FUNCTION_CRON, interval, || api.get_cron(&id)).await;
        if let Err(e) = ignore_gone(settled.map(|_| ())) {
            return Diagnostics::from_error("Failed to wait for cron", e);
        }
        if let Err(e) = ignore_not_found(api.delete_cron(&id).await) {
            return Diagnostics::from_error("Failed to delete cron", e);
        }
        match wait_for_deletion(ctx, &FUNCTION_CRON, interval, || api.get_cron(&id)).await {
            Ok(()) => Diagnostics::new(),
            Err(e) => Diagnostics::from_error("Failed to wait for cron deletion", e),
        }
    }
}
