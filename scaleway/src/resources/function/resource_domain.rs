//! Custom domain of a serverless function
//!
//! The backend checks the CNAME before accepting the domain, so creation
//! retries while DNS has not propagated yet.

use std::collections::HashMap;

use async_trait::async_trait;
use tfplug::{
    AttributeBuilder, AttributeType, Context, Diagnostics, Dynamic, IdentitySchema,
    ResourceData, Schema, SchemaBuilder,
};

use super::{function_id_attribute, FUNCTION_TIMEOUTS};
use crate::api::function::CreateDomainRequest;
use crate::identity::{compose_regional, persist_regional_identity, regional_identity_schema};
use crate::ids::{keep_reference, parse_regional_id};
use crate::provider_data::ScalewayProviderData;
use crate::resources::{id_attribute, region_attribute, regional_id, resolve_region};
use crate::retry::retry_while_dns_not_validated;
use crate::skeleton::{
    id_error, ignore_gone, ignore_not_found, set_values, wait_failure, ScalewayResource, Timeouts,
};
use crate::waiter::{ensure_ready, wait_for, wait_for_deletion, FUNCTION_DOMAIN};

pub struct DomainResource;

#[async_trait]
impl ScalewayResource for DomainResource {
    const TYPE_NAME: &'static str = "scaleway_function_domain";

    fn schema() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages a custom domain of a serverless function")
            .attribute(id_attribute())
            .attribute(function_id_attribute())
            .attribute(
                AttributeBuilder::new("hostname", AttributeType::String)
                    .description("The hostname, with a CNAME to the function's domain_name")
                    .required()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("url", AttributeType::String)
                    .description("The URL serving the function on this domain")
                    .computed()
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
        let request = CreateDomainRequest {
            hostname: data.get_string("hostname").unwrap_or_default(),
            function_id,
        };

        let api = meta.client.function(region);
        let created = retry_while_dns_not_validated(ctx, meta.aws_retry_interval, || {
            api.create_domain(&request)
        })
        .await;
        let domain = match created {
            Ok(domain) => domain,
            Err(e) => return Diagnostics::from_error("Failed to create function domain", e),
        };
        persist_regional_identity(data, region, &domain.id);

        let interval = FUNCTION_DOMAIN.interval(meta.wait_retry_interval);
        match wait_for(ctx, &FUNCTION_DOMAIN, interval, || api.get_domain(&domain.id))
            .await
            .and_then(|domain| ensure_ready(&FUNCTION_DOMAIN, domain))
        {
            Ok(_) => Diagnostics::new(),
            Err(e) => Diagnostics::from_error("Function domain did not become ready", e),
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
        let interval = FUNCTION_DOMAIN.interval(meta.wait_retry_interval);

        let domain = match wait_for(ctx, &FUNCTION_DOMAIN, interval, || api.get_domain(&id)).await {
            Ok(domain) => domain,
            Err(e) => return wait_failure(data, "Failed to read function domain", &e),
        };

        persist_regional_identity(data, region, &domain.id);
        let function_id = keep_reference(data.get_string("function_id"), &domain.function_id);
        set_values(
            data,
            [
                ("function_id", Dynamic::from(function_id)),
                ("hostname", Dynamic::from(domain.hostname)),
                ("url", Dynamic::from(domain.url)),
                ("region", Dynamic::from(region.as_str())),
            ],
        )
    }

    /// Every argument forces a new domain
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
        ctx: &Context,
        meta: &ScalewayProviderData,
        data: &mut ResourceData,
    ) -> Diagnostics {
        let (region, id) = match regional_id(meta, data) {
            Ok(parsed) => parsed,
            Err(diagnostics) => return diagnostics,
        };
        let api = meta.client.function(region);
        let interval = FUNCTION_DOMAIN.interval(meta.wait_retry_interval);

        let settled = wait_for(ctx, &FUNCTION_DOMAIN, interval, || api.get_domain(&id)).await;
        if let Err(e) = ignore_gone(settled.map(|_| ())) {
            return Diagnostics::from_error("Failed to wait for function domain", e);
        }
        if let Err(e) = ignore_not_found(api.delete_domain(&id).await) {
            return Diagnostics::from_error("Failed to delete function domain", e);
        }
        match wait_for_deletion(ctx, &FUNCTION_DOMAIN, interval, || api.get_domain(&id)).await {
            Ok(()) => Diagnostics::new(),
            Err(e) => Diagnostics::from_error("Failed to wait for function domain deletion", e),
        }
    }
}
