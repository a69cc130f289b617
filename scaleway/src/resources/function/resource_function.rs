//! Serverless function resource
//!
//! Code is shipped as a zip archive uploaded to a presigned URL and then
//! deployed. Upload and deploy failures after the function exists are
//! reported as warnings so the next apply can retry them.

use std::collections::HashMap;

use async_trait::async_trait;
use tfplug::defaults::StaticDefault;
use tfplug::plan_modifier::SuppressDiff;
use tfplug::validator::{NumberRangeValidator, StringOneOfValidator};
use tfplug::{
    AttributeBuilder, AttributeType, AttributePath, Context, Diagnostic, Diagnostics, Dynamic,
    IdentitySchema, ResourceData, Schema, SchemaBuilder,
};

use super::{
    environment_variables_attribute, secret_environment_variables_attribute, FUNCTION_TIMEOUTS,
};
use crate::api::function::{Function, FunctionApi, FunctionRequest};
use crate::flatten::{
    expand_secrets, flatten_secrets, name_or_random, removed_secrets, string_map,
};
use crate::identity::{compose_regional, persist_regional_identity, regional_identity_schema};
use crate::ids::{keep_reference, locality_insensitive_eq, parse_regional_id};
use crate::locality::Region;
use crate::provider_data::ScalewayProviderData;
use crate::resources::{
    id_attribute, organization_id_attribute, reference_attribute, region_attribute,
    regional_id, resolve_region, status_attribute, tags_attribute,
};
use crate::skeleton::{
    id_error, ignore_gone, ignore_not_found, set_values, wait_failure, ScalewayResource, Timeouts,
};
use crate::waiter::{ensure_ready, wait_for, wait_for_deletion, WaitError, FUNCTION};

const UPDATABLE: &[&str] = &[
    "description",
    "environment_variables",
    "secret_environment_variables",
    "tags",
    "min_scale",
    "max_scale",
    "memory_limit",
    "timeout",
    "runtime",
    "handler",
    "privacy",
    "http_option",
    "sandbox",
];

pub struct FunctionResource;

/// Warnings carried by a function that otherwise settled
pub(crate) fn function_warnings(function: &Function) -> Diagnostics {
    let mut diagnostics = Diagnostics::new();
    if !function.runtime_message.is_empty() {
        diagnostics.push(
            Diagnostic::warning("Runtime notice", function.runtime_message.clone())
                .with_attribute(AttributePath::new("runtime")),
        );
    }
    if let Some(message) = function.error_message.as_deref().filter(|m| !m.is_empty()) {
        diagnostics.push(
            Diagnostic::warning(format!("Function {} reported an error", function.name), message)
                .with_attribute(AttributePath::new("status")),
        );
    }
    diagnostics
}

fn u32_field(data: &ResourceData, path: &str) -> Option<u32> {
    data.get_i64(path).and_then(|v| u32::try_from(v).ok())
}

fn request_from(data: &ResourceData) -> FunctionRequest {
    let secrets = expand_secrets(data, "secret_environment_variables");
    FunctionRequest {
        description: data.get_string_ok("description"),
        environment_variables: Some(data.get_string_map("environment_variables")),
        secret_environment_variables: (!secrets.is_empty()).then_some(secrets),
        tags: Some(data.get_string_list("tags")),
        min_scale: u32_field(data, "min_scale"),
        max_scale: u32_field(data, "max_scale"),
        memory_limit: u32_field(data, "memory_limit"),
        timeout: data.get_i64("timeout"),
        runtime: data.get_string_ok("runtime"),
        handler: data.get_string_ok("handler"),
        privacy: data.get_string_ok("privacy"),
        http_option: data.get_string_ok("http_option"),
        sandbox: data.get_string_ok("sandbox"),
        ..FunctionRequest::default()
    }
}

/// Only the fields that changed since the prior state
fn update_request(data: &ResourceData) -> FunctionRequest {
    let full = request_from(data);
    let changed = |path: &str| data.has_change(path);
    FunctionRequest {
        description: changed("description")
            .then(|| data.get_string("description").unwrap_or_default()),
        environment_variables: full.environment_variables.filter(|_| changed("environment_variables")),
        secret_environment_variables: changed("secret_environment_variables").then(|| {
            let mut secrets = expand_secrets(data, "secret_environment_variables");
            secrets.extend(removed_secrets(data, "secret_environment_variables"));
            secrets
        }),
        tags: full.tags.filter(|_| changed("tags")),
        min_scale: full.min_scale.filter(|_| changed("min_scale")),
        max_scale: full.max_scale.filter(|_| changed("max_scale")),
        memory_limit: full.memory_limit.filter(|_| changed("memory_limit")),
        timeout: full.timeout.filter(|_| changed("timeout")),
        runtime: full.runtime.filter(|_| changed("runtime")),
        handler: full.handler.filter(|_| changed("handler")),
        privacy: full.privacy.filter(|_| changed("privacy")),
        http_option: full.http_option.filter(|_| changed("http_option")),
        sandbox: full.sandbox.filter(|_| changed("sandbox")),
        ..FunctionRequest::default()
    }
}

async fn wait_ready(
    ctx: &Context,
    meta: &ScalewayProviderData,
    api: &FunctionApi<'_>,
    id: &str,
) -> Result<Function, WaitError> {
    let interval = FUNCTION.interval(meta.wait_retry_interval);
    wait_for(ctx, &FUNCTION, interval, || api.get_function(id)).await
}

/// Upload the archive named by `zip_file`
async fn upload(meta: &ScalewayProviderData, api: &FunctionApi<'_>, id: &str, path: &str) -> Result<(), String> {
    let archive = tokio::fs::read(path)
        .await
        .map_err(|e| format!("cannot read {}: {}", path, e))?;
    let target = api
        .get_upload_url(id, archive.len() as u64)
        .await
        .map_err(|e| e.to_string())?;
    tracing::debug!("uploading {} ({} bytes) for function {}", path, archive.len(), id);
    meta.client
        .upload(&target.url, archive, &target.header_pairs())
        .await
        .map_err(|e| e.to_string())
}

/// Upload when asked, deploy when asked, and wait for the result
async fn ship_code(
    ctx: &Context,
    meta: &ScalewayProviderData,
    api: &FunctionApi<'_>,
    id: &str,
    upload_code: bool,
    deploy: bool,
    data: &ResourceData,
) -> Diagnostics {
    let mut diagnostics = Diagnostics::new();

    if upload_code {
        if let Some(path) = data.get_string_ok("zip_file") {
            if let Err(e) = upload(meta, api, id, &path).await {
                diagnostics.push(
                    Diagnostic::warning("Failed to upload function code", e)
                        .with_attribute(AttributePath::new("zip_file")),
                );
                return diagnostics;
            }
        }
    }

    if deploy {
        if let Err(e) = api.deploy_function(id).await {
            diagnostics.push(
                Diagnostic::warning("Failed to deploy function", e.to_string())
                    .with_attribute(AttributePath::new("deploy")),
            );
            return diagnostics;
        }
    }

    match wait_ready(ctx, meta, api, id)
        .await
        .and_then(|function| ensure_ready(&FUNCTION, function))
    {
        Ok(function) => diagnostics.extend(function_warnings(&function)),
        Err(e) => diagnostics.add_warning("Function did not become ready", e.to_string()),
    }
    diagnostics
}

impl FunctionResource {
    fn flatten(data: &mut ResourceData, region: Region, function: Function) -> Diagnostics {
        let secrets = flatten_secrets(
            data,
            "secret_environment_variables",
            &function.secret_environment_variables,
        );
        let namespace_id = keep_reference(data.get_string("namespace_id"), &function.namespace_id);
        set_values(
            data,
            [
                ("name", Dynamic::from(function.name)),
                ("namespace_id", Dynamic::from(namespace_id)),
                ("description", Dynamic::from(function.description)),
                ("environment_variables", string_map(&function.environment_variables)),
                ("secret_environment_variables", secrets),
                ("tags", Dynamic::from(function.tags)),
                ("min_scale", Dynamic::from(function.min_scale)),
                ("max_scale", Dynamic::from(function.max_scale)),
                ("memory_limit", Dynamic::from(function.memory_limit)),
                ("cpu_limit", Dynamic::from(function.cpu_limit)),
                ("timeout", Dynamic::from(function.timeout)),
                ("runtime", Dynamic::from(function.runtime)),
                ("handler", Dynamic::from(function.handler)),
                ("privacy", Dynamic::from(function.privacy)),
                ("domain_name", Dynamic::from(function.domain_name)),
                ("http_option", Dynamic::from(function.http_option)),
                ("sandbox", Dynamic::from(function.sandbox)),
                ("status", Dynamic::from(function.status)),
                ("region", Dynamic::from(region.as_str())),
            ],
        )
    }
}

#[async_trait]
impl ScalewayResource for FunctionResource {
    const TYPE_NAME: &'static str = "scaleway_function";

    fn schema() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages a Serverless function")
            .attribute(id_attribute())
            .attribute(
                reference_attribute("namespace_id", "The namespace the function belongs to")
                    .required()
                    .plan_modifier(SuppressDiff::new(locality_insensitive_eq))
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("The name of the function, generated when omitted")
                    .optional_computed()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("description", AttributeType::String)
                    .description("The description of the function")
                    .optional()
                    .build(),
            )
            .attribute(environment_variables_attribute())
            .attribute(secret_environment_variables_attribute())
            .attribute(tags_attribute())
            .attribute(
                AttributeBuilder::new("runtime", AttributeType::String)
                    .description("The runtime of the function, e.g. go122 or python311")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("handler", AttributeType::String)
                    .description("The entry point of the function")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("privacy", AttributeType::String)
                    .description("Whether the function is public or requires a token")
                    .required()
                    .validator(StringOneOfValidator::new(&["public", "private"]))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("min_scale", AttributeType::Number)
                    .description("Minimum number of instances")
                    .optional_computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("max_scale", AttributeType::Number)
                    .description("Maximum number of instances")
                    .optional_computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("memory_limit", AttributeType::Number)
                    .description("Memory of each instance in MB")
                    .optional_computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("cpu_limit", AttributeType::Number)
                    .description("vCPU of each instance in thousandths, derived from memory_limit")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("timeout", AttributeType::Number)
                    .description("Maximum duration of one invocation, in seconds")
                    .optional_computed()
                    .validator(NumberRangeValidator::between(1.0, 900.0))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("http_option", AttributeType::String)
                    .description("Whether plain HTTP is enabled or redirected to HTTPS")
                    .optional()
                    .default(StaticDefault::string("enabled"))
                    .validator(StringOneOfValidator::new(&["enabled", "redirected"]))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("sandbox", AttributeType::String)
                    .description("The execution environment, v1 or v2")
                    .optional_computed()
                    .validator(StringOneOfValidator::new(&["v1", "v2"]))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("zip_file", AttributeType::String)
                    .description("Path of the zip archive holding the code")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("zip_hash", AttributeType::String)
                    .description("Hash of the archive; a new value uploads the code again")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("deploy", AttributeType::Bool)
                    .description("Deploy the function after each code upload")
                    .optional()
                    .default(StaticDefault::bool(false))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("domain_name", AttributeType::String)
                    .description("The native domain name of the function")
                    .computed()
                    .build(),
            )
            .attribute(status_attribute())
            .attribute(region_attribute())
            .attribute(organization_id_attribute())
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
        let namespace = data.get_string("namespace_id").unwrap_or_default();
        let (region, namespace_id) = match parse_regional_id(&namespace, default_region) {
            Ok(parsed) => parsed,
            Err(e) => return id_error(e),
        };

        let request = FunctionRequest {
            name: Some(name_or_random(data, "fn")),
            namespace_id: Some(namespace_id),
            ..request_from(data)
        };

        let api = meta.client.function(region);
        let function = match api.create_function(&request).await {
            Ok(function) => function,
            Err(e) => return Diagnostics::from_error("Failed to create function", e),
        };
        persist_regional_identity(data, region, &function.id);

        if let Err(e) = wait_ready(ctx, meta, &api, &function.id).await {
            return Diagnostics::from_error("Failed to wait for function", e);
        }

        let has_code = data.get_string_ok("zip_file").is_some();
        let deploy = data.get_bool("deploy").unwrap_or(false);
        ship_code(ctx, meta, &api, &function.id, has_code, deploy && has_code, data).await
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

        let function = match wait_ready(ctx, meta, &api, &id).await {
            Ok(function) => function,
            Err(e) => return wait_failure(data, "Failed to read function", &e),
        };

        persist_regional_identity(data, region, &function.id);
        Self::flatten(data, region, function)
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

        if let Err(e) = wait_ready(ctx, meta, &api, &id).await {
            return Diagnostics::from_error("Failed to wait for function", e);
        }

        if data.has_changes(UPDATABLE) {
            let request = update_request(data);
            if !request.is_empty() {
                if let Err(e) = api.update_function(&id, &request).await {
                    return Diagnostics::from_error("Failed to update function", e);
                }
                // The backend takes a moment to report the function as pending
                if ctx.sleep(meta.post_update_delay).await.is_err() {
                    return Diagnostics::from_error("Failed to update function", WaitError::Canceled);
                }
                if let Err(e) = wait_ready(ctx, meta, &api, &id).await {
                    return Diagnostics::from_error("Failed to wait for function", e);
                }
            }
        }

        let code_changed = data.has_changes(&["zip_file", "zip_hash"]);
        let deploy = data.get_bool("deploy").unwrap_or(false)
            && (code_changed || data.has_changes(&["deploy", "runtime"]));
        if !code_changed && !deploy {
            return Diagnostics::new();
        }
        ship_code(ctx, meta, &api, &id, code_changed, deploy, data).await
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

        if let Err(e) = ignore_gone(wait_ready(ctx, meta, &api, &id).await.map(|_| ())) {
            return Diagnostics::from_error("Failed to wait for function", e);
        }
        if let Err(e) = ignore_not_found(api.delete_function(&id).await) {
            return Diagnostics::from_error("Failed to delete function", e);
        }
        let interval = FUNCTION.interval(meta.wait_retry_interval);
        match wait_for_deletion(ctx, &FUNCTION, interval, || api.get_function(&id)).await {
            Ok(()) => Diagnostics::new(),
            Err(e) => Diagnostics::from_error("Failed to wait for function deletion", e),
        }
    }
}
