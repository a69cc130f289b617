//! Messaging trigger of a serverless function, fed by SQS or NATS

use std::collections::HashMap;

use async_trait::async_trait;
use tfplug::schema::{Attribute, NestedType};
use tfplug::{
    AttributeBuilder, AttributePath, AttributeType, Context, Diagnostic, Diagnostics, Dynamic,
    DynamicValue, IdentitySchema, ResourceData, Schema, SchemaBuilder,
};

use super::{function_id_attribute, FUNCTION_TIMEOUTS};
use crate::api::function::{
    CreateTriggerRequest, NatsTriggerConfig, SqsTriggerConfig, Trigger, UpdateTriggerRequest,
};
use crate::flatten::name_or_random;
use crate::identity::{compose_regional, persist_regional_identity, regional_identity_schema};
use crate::ids::{expand_id, keep_reference, parse_regional_id};
use crate::locality::Region;
use crate::provider_data::ScalewayProviderData;
use crate::resources::{id_attribute, region_attribute, regional_id, resolve_region};
use crate::skeleton::{
    id_error, ignore_gone, ignore_not_found, set_values, wait_failure, ScalewayResource, Timeouts,
};
use crate::waiter::{wait_for, wait_for_deletion, FUNCTION_TRIGGER};

pub struct TriggerResource;

fn source_block(name: &str, description: &str, mut fields: Vec<Attribute>) -> Attribute {
    fields.push(
        AttributeBuilder::new("project_id", AttributeType::String)
            .description("The project of the messaging service, defaults to the provider project")
            .optional_computed()
            .build(),
    );
    fields.push(
        AttributeBuilder::new("region", AttributeType::String)
            .description("The region of the messaging service, defaults to the trigger region")
            .optional_computed()
            .build(),
    );
    AttributeBuilder::nested(name, NestedType::single_list(fields))
        .description(description)
        .optional()
        .force_new()
        .build()
}

fn expand_sqs(data: &ResourceData, meta: &ScalewayProviderData, region: Region) -> Option<SqsTriggerConfig> {
    data.get("sqs.0")?;
    Some(SqsTriggerConfig {
        queue: data.get_string("sqs.0.queue").unwrap_or_default(),
        mnq_project_id: data
            .get_string_ok("sqs.0.project_id")
            .or_else(|| meta.project_id(data))
            .unwrap_or_default(),
        mnq_region: data
            .get_string_ok("sqs.0.region")
            .unwrap_or_else(|| region.to_string()),
    })
}

fn expand_nats(data: &ResourceData, meta: &ScalewayProviderData, region: Region) -> Option<NatsTriggerConfig> {
    data.get("nats.0")?;
    let account = data.get_string("nats.0.account_id").unwrap_or_default();
    Some(NatsTriggerConfig {
        subject: data.get_string("nats.0.subject").unwrap_or_default(),
        mnq_nats_account_id: expand_id(&account).to_string(),
        mnq_project_id: data
            .get_string_ok("nats.0.project_id")
            .or_else(|| meta.project_id(data))
            .unwrap_or_default(),
        mnq_region: data
            .get_string_ok("nats.0.region")
            .unwrap_or_else(|| region.to_string()),
    })
}

/// A trigger in `error` still exists; its message is surfaced as a warning
fn status_warning(trigger: &Trigger) -> Diagnostics {
    if trigger.status != "error" {
        return Diagnostics::new();
    }
    Diagnostic::warning(
        format!("Trigger {} is in error", trigger.name),
        trigger.error_message.clone().unwrap_or_default(),
    )
    .with_attribute(AttributePath::new("function_id"))
    .into()
}

#[async_trait]
impl ScalewayResource for TriggerResource {
    const TYPE_NAME: &'static str = "scaleway_function_trigger";

    fn schema() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages a trigger invoking a serverless function on messages")
            .attribute(id_attribute())
            .attribute(function_id_attribute())
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("The name of the trigger, generated when omitted")
                    .optional_computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("description", AttributeType::String)
                    .description("The description of the trigger")
                    .optional()
                    .build(),
            )
            .attribute(source_block(
                "sqs",
                "Messages of an SQS queue",
                vec![AttributeBuilder::new("queue", AttributeType::String)
                    .description("The name of the queue")
                    .required()
                    .build()],
            ))
            .attribute(source_block(
                "nats",
                "Messages published on a NATS subject",
                vec![
                    AttributeBuilder::new("subject", AttributeType::String)
                        .description("The subject to listen on")
                        .required()
                        .build(),
                    AttributeBuilder::new("account_id", AttributeType::String)
                        .description("The ID of the NATS account")
                        .required()
                        .build(),
                ],
            ))
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
        let has = |name: &str| {
            config
                .get_list(&AttributePath::new(name))
                .map(|blocks| !blocks.is_empty())
                .unwrap_or(false)
        };
        if has("sqs") == has("nats") {
            diagnostics.add_error(
                "Invalid trigger source",
                "Exactly one of sqs or nats must be set",
            );
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

        let request = CreateTriggerRequest {
            name: name_or_random(data, "trigger"),
            description: data.get_string("description").unwrap_or_default(),
            function_id,
            scw_sqs_config: expand_sqs(data, meta, region),
            scw_nats_config: expand_nats(data, meta, region),
        };

        let api = meta.client.function(region);
        let trigger = match api.create_trigger(&request).await {
            Ok(trigger) => trigger,
            Err(e) => return Diagnostics::from_error("Failed to create trigger", e),
        };
        persist_regional_identity(data, region, &trigger.id);

        let interval = FUNCTION_TRIGGER.interval(meta.wait_retry_interval);
        match wait_for(ctx, &FUNCTION_TRIGGER, interval, || api.get_trigger(&trigger.id)).await {
            Ok(trigger) => status_warning(&trigger),
            Err(e) => Diagnostics::from_error("Failed to wait for trigger", e),
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
        let interval = FUNCTION_TRIGGER.interval(meta.wait_retry_interval);

        let trigger = match wait_for(ctx, &FUNCTION_TRIGGER, interval, || api.get_trigger(&id)).await {
            Ok(trigger) => trigger,
            Err(e) => return wait_failure(data, "Failed to read trigger", &e),
        };

        persist_regional_identity(data, region, &trigger.id);
        let sqs = match trigger.scw_sqs_config {
            Some(sqs) => vec![Dynamic::object([
                ("queue", Dynamic::from(sqs.queue)),
                ("project_id", Dynamic::from(sqs.mnq_project_id)),
                ("region", Dynamic::from(sqs.mnq_region)),
            ])],
            None => Vec::new(),
        };
        let nats = match trigger.scw_nats_config {
            Some(nats) => {
                let account = keep_reference(
                    data.get_string_ok("nats.0.account_id"),
                    &nats.mnq_nats_account_id,
                );
                vec![Dynamic::object([
                    ("subject", Dynamic::from(nats.subject)),
                    ("account_id", Dynamic::from(account)),
                    ("project_id", Dynamic::from(nats.mnq_project_id)),
                    ("region", Dynamic::from(nats.mnq_region)),
                ])]
            }
            None => Vec::new(),
        };

        let function_id = keep_reference(data.get_string("function_id"), &trigger.function_id);
        set_values(
            data,
            [
                ("function_id", Dynamic::from(function_id)),
                ("name", Dynamic::from(trigger.name)),
                ("description", Dynamic::from(trigger.description)),
                ("sqs", Dynamic::List(sqs)),
                ("nats", Dynamic::List(nats)),
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
        let interval = FUNCTION_TRIGGER.interval(meta.wait_retry_interval);

        if let Err(e) = wait_for(ctx, &FUNCTION_TRIGGER, interval, || api.get_trigger(&id)).await {
            return Diagnostics::from_error("Failed to wait for trigger", e);
        }

        let mut request = UpdateTriggerRequest::default();
        if data.has_change("name") {
            request.name = data.get_string_ok("name");
        }
        if data.has_change("description") {
            request.description = Some(data.get_string("description").unwrap_or_default());
        }
        if request.name.is_none() && request.description.is_none() {
            return Diagnostics::new();
        }

        if let Err(e) = api.update_trigger(&id, &request).await {
            return Diagnostics::from_error("Failed to update trigger", e);
        }
        match wait_for(ctx, &FUNCTION_TRIGGER, interval, || api.get_trigger(&id)).await {
            Ok(trigger) => status_warning(&trigger),
            Err(e) => Diagnostics::from_error("Failed to wait for trigger", e),
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
        let interval = FUNCTION_TRIGGER.interval(meta.wait_retry_interval);

        let settled = wait_for(ctx, &FUNCTION_TRIGGER, interval, || api.get_trigger(&id)).await;
        if let Err(e) = ignore_gone(settled.map(|_| ())) {
            return Diagnostics::from_error("Failed to wait for trigger", e);
        }
        if let Err(e) = ignore_not_found(api.delete_trigger(&id).await) {
            return Diagnostics::from_error("Failed to delete trigger", e);
        }
        match wait_for_deletion(ctx, &FUNCTION_TRIGGER, interval, || api.get_trigger(&id)).await {
            Ok(()) => Diagnostics::new(),
            Err(e) => Diagnostics::from_error("Failed to wait for trigger deletion", e),
        }
    }
}
