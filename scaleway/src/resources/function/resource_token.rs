//! Token authenticating calls to a private function or namespace
//!
//! The secret is only returned on creation and kept from state afterwards.

use std::collections::HashMap;

use async_trait::async_trait;
use tfplug::plan_modifier::SuppressDiff;
use tfplug::validator::FnValidator;
use tfplug::{
    AttributeBuilder, AttributePath, AttributeType, Context, Diagnostics, Dynamic, DynamicValue,
    IdentitySchema, ResourceData, Schema, SchemaBuilder,
};

use super::FUNCTION_TIMEOUTS;
use crate::api::function::CreateTokenRequest;
use crate::flatten::flatten_time;
use crate::identity::{compose_regional, persist_regional_identity, regional_identity_schema};
use crate::ids::{keep_reference, locality_insensitive_eq, parse_regional_id};
use crate::provider_data::ScalewayProviderData;
use crate::resources::{id_attribute, reference_attribute, region_attribute, regional_id, resolve_region};
use crate::skeleton::{id_error, ignore_not_found, read_failure, set_values, ScalewayResource, Timeouts};

pub struct TokenResource;

fn rfc3339(value: &Dynamic) -> Result<(), String> {
    match value.as_str() {
        Some(s) => chrono::DateTime::parse_from_rfc3339(s)
            .map(|_| ())
            .map_err(|e| format!("expires_at must be an RFC 3339 date: {}", e)),
        None => Ok(()),
    }
}

#[async_trait]
impl ScalewayResource for TokenResource {
    const TYPE_NAME: &'static str = "scaleway_function_token";

    fn schema() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages a token for a private function or namespace")
            .attribute(id_attribute())
            .attribute(
                reference_attribute("function_id", "The function the token grants access to")
                    .optional()
                    .plan_modifier(SuppressDiff::new(locality_insensitive_eq))
                    .force_new()
                    .build(),
            )
            .attribute(
                reference_attribute("namespace_id", "The namespace the token grants access to")
                    .optional()
                    .plan_modifier(SuppressDiff::new(locality_insensitive_eq))
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("description", AttributeType::String)
                    .description("The description of the token")
                    .optional()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("expires_at", AttributeType::String)
                    .description("Expiration date of the token, RFC 3339")
                    .optional()
                    .validator(FnValidator::new("RFC 3339 date", rfc3339))
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("token", AttributeType::String)
                    .description("The token value")
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

    fn timeouts() -> Timeouts {
        FUNCTION_TIMEOUTS
    }

    fn validate(config: &DynamicValue, diagnostics: &mut Diagnostics) {
        let set = |name: &str| config.get_string(&AttributePath::new(name)).is_ok();
        if set("function_id") == set("namespace_id") {
            diagnostics.add_error(
                "Invalid token scope",
                "Exactly one of function_id or namespace_id must be set",
            );
        }
    }

    async fn create(
        &self,
        _ctx: &Context,
        meta: &ScalewayProviderData,
        data: &mut ResourceData,
    ) -> Diagnostics {
        let default_region = match resolve_region(meta, data) {
            Ok(region) => region,
            Err(diagnostics) => return diagnostics,
        };

        let mut request = CreateTokenRequest {
            description: data.get_string_ok("description"),
            expires_at: data.get_string_ok("expires_at"),
            ..Default::default()
        };
        let mut region = default_region;
        for (key, slot) in [
            ("function_id", &mut request.function_id),
            ("namespace_id", &mut request.namespace_id),
        ] {
            if let Some(reference) = data.get_string_ok(key) {
                match parse_regional_id(&reference, default_region) {
                    Ok((parsed, uuid)) => {
                        region = parsed;
                        *slot = Some(uuid);
                    }
                    Err(e) => return id_error(e),
                }
            }
        }

        let api = meta.client.function(region);
        let token = match api.create_token(&request).await {
            Ok(token) => token,
            Err(e) => return Diagnostics::from_error("Failed to create function token", e),
        };
        persist_regional_identity(data, region, &token.id);
        set_values(data, [("token", Dynamic::from(token.token))])
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
        let token = match meta.client.function(region).get_token(&id).await {
            Ok(token) => token,
            Err(e) => return read_failure(data, "Failed to read function token", &e),
        };

        persist_regional_identity(data, region, &token.id);
        let scope = |key: &str, server: Option<String>| {
            Dynamic::from(server.map(|id| keep_reference(data.get_string(key), &id)))
        };
        let mut values = vec![
            ("function_id", scope("function_id", token.function_id)),
            ("namespace_id", scope("namespace_id", token.namespace_id)),
            ("description", Dynamic::from(token.description)),
            ("expires_at", Dynamic::from(token.expires_at.as_deref().map(|t| flatten_time(Some(t))))),
            ("region", Dynamic::from(region.as_str())),
        ];
        if let Some(secret) = token.token {
            values.push(("token", Dynamic::from(secret)));
        }
        set_values(data, values)
    }

    /// Every argument forces a new token
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
        match ignore_not_found(meta.client.function(region).delete_token(&id).await) {
            Ok(()) => Diagnostics::new(),
            Err(e) => Diagnostics::from_error("Failed to delete function token", e),
        }
    }
}
