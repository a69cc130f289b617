//! SQS queue on the AWS-compatible endpoint
//!
//! Queue attributes travel through the attribute bridge. Creating a queue
//! under a name deleted less than a minute ago is refused with
//! `QueueDeletedRecently`, which create retries.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;
use tfplug::defaults::StaticDefault;
use tfplug::plan_modifier::RequiresReplaceIfChanged;
use tfplug::schema::Attribute;
use tfplug::validator::NumberRangeValidator;
use tfplug::{
    AttributeBuilder, AttributePath, AttributeType, Context, Diagnostics, Dynamic, DynamicValue,
    IdentitySchema, ResourceData, Schema, SchemaBuilder,
};

use super::{bridge_error, credential_attributes, credentials, endpoint_attribute, mnq_key, require_activated};
use crate::api::aws::{endpoint_for, SqsApi};
use crate::api::mnq::MnqService;
use crate::bridge::{apply_to, attributes_to_schema, changed_attributes, schema_to_attributes, AttributeMap};
use crate::errors::{NON_EXISTENT_QUEUE, QUEUE_DELETED_RECENTLY};
use crate::flatten::random_name;
use crate::identity::{compose_mnq, mnq_identity_schema, persist_mnq_identity};
use crate::locality::Region;
use crate::provider_data::ScalewayProviderData;
use crate::resources::{id_attribute, project_id_attribute, region_attribute, resolve_region};
use crate::retry::retry_when_aws_code_equals;
use crate::skeleton::{ignore_not_found, read_failure, require_project, set_values, ScalewayResource};

const NAME_PATTERN: &str = r"^[a-zA-Z0-9_-]{1,80}$";
const FIFO_NAME_PATTERN: &str = r"^[a-zA-Z0-9_-]{1,75}\.fifo$";

const DEFAULT_RECEIVE_WAIT_TIME: f64 = 0.0;
const DEFAULT_VISIBILITY_TIMEOUT: f64 = 30.0;
const DEFAULT_MESSAGE_MAX_AGE: f64 = 345_600.0;
const DEFAULT_MESSAGE_MAX_SIZE: f64 = 262_144.0;

const SQS_ATTRIBUTES: &AttributeMap = &[
    ("FifoQueue", "fifo_queue"),
    ("ContentBasedDeduplication", "content_based_deduplication"),
    ("ReceiveMessageWaitTimeSeconds", "receive_wait_time_seconds"),
    ("VisibilityTimeout", "visibility_timeout_seconds"),
    ("MessageRetentionPeriod", "message_max_age"),
    ("MaximumMessageSize", "message_max_size"),
    ("QueueArn", "arn"),
];

pub struct SqsQueueResource;

fn bounded(name: &str, description: &str, min: f64, max: f64, default: f64) -> Attribute {
    AttributeBuilder::new(name, AttributeType::Number)
        .description(description)
        .optional_computed()
        .validator(NumberRangeValidator::between(min, max))
        .default(StaticDefault::number(default))
        .build()
}

/// Configured name, or a random one carrying the `.fifo` suffix when needed
fn queue_name(data: &ResourceData) -> String {
    if let Some(name) = data.get_string_ok("name") {
        return name;
    }
    let name = random_name("mnq-sqs");
    if data.get_bool("fifo_queue").unwrap_or(false) {
        format!("{}.fifo", name)
    } else {
        name
    }
}

fn check_name(name: &str, fifo: bool) -> Result<(), String> {
    let (pattern, shape) = if fifo {
        (FIFO_NAME_PATTERN, "1 to 75 letters, digits, dashes or underscores followed by .fifo")
    } else {
        (NAME_PATTERN, "1 to 80 letters, digits, dashes or underscores")
    };
    let regex = Regex::new(pattern).map_err(|e| e.to_string())?;
    if regex.is_match(name) {
        Ok(())
    } else {
        Err(format!("queue name {:?} must be {}", name, shape))
    }
}

fn endpoint(meta: &ScalewayProviderData, data: &ResourceData, region: Region) -> String {
    data.get_string_ok("sqs_endpoint")
        .unwrap_or_else(|| endpoint_for(&meta.sqs_endpoint_template, region))
}

fn client(meta: &ScalewayProviderData, data: &ResourceData, region: Region) -> (String, Arc<dyn SqsApi>) {
    let url = endpoint(meta, data, region);
    let (access_key, secret_key) = credentials(data);
    let client = meta.sqs_client(region, Some(&url), &access_key, &secret_key);
    (url, client)
}

#[async_trait]
impl ScalewayResource for SqsQueueResource {
    const TYPE_NAME: &'static str = "scaleway_mnq_sqs_queue";

    fn schema() -> Schema {
        let [access_key, secret_key] = credential_attributes(MnqService::Sqs);
        SchemaBuilder::new()
            .version(1)
            .description("Manages an SQS queue")
            .attribute(id_attribute())
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("The name of the queue, generated when omitted")
                    .optional_computed()
                    .plan_modifier(RequiresReplaceIfChanged)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("fifo_queue", AttributeType::Bool)
                    .description("Whether the queue is a FIFO queue")
                    .optional_computed()
                    .plan_modifier(RequiresReplaceIfChanged)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("content_based_deduplication", AttributeType::Bool)
                    .description("Deduplicate FIFO messages on a hash of their body")
                    .optional_computed()
                    .build(),
            )
            .attribute(bounded(
                "receive_wait_time_seconds",
                "How long ReceiveMessage waits for messages to arrive",
                0.0,
                20.0,
                DEFAULT_RECEIVE_WAIT_TIME,
            ))
            .attribute(bounded(
                "visibility_timeout_seconds",
                "How long a received message stays hidden from other consumers",
                0.0,
                43_200.0,
                DEFAULT_VISIBILITY_TIMEOUT,
            ))
            .attribute(bounded(
                "message_max_age",
                "How long messages are retained, in seconds",
                60.0,
                1_209_600.0,
                DEFAULT_MESSAGE_MAX_AGE,
            ))
            .attribute(bounded(
                "message_max_size",
                "The largest accepted message, in bytes",
                1_024.0,
                262_144.0,
                DEFAULT_MESSAGE_MAX_SIZE,
            ))
            .attribute(endpoint_attribute("sqs_endpoint", "The endpoint of the SQS service"))
            .attribute(access_key)
            .attribute(secret_key)
            .attribute(
                AttributeBuilder::new("url", AttributeType::String)
                    .description("The URL of the queue")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("arn", AttributeType::String)
                    .description("The ARN of the queue")
                    .computed()
                    .build(),
            )
            .attribute(region_attribute())
            .attribute(project_id_attribute())
            .build()
    }

    fn identity_schema() -> IdentitySchema {
        mnq_identity_schema()
    }

    fn compose_id(fields: &HashMap<String, String>) -> Option<String> {
        compose_mnq(fields)
    }

    fn validate(config: &DynamicValue, diagnostics: &mut Diagnostics) {
        let fifo = matches!(
            config.get(&AttributePath::new("fifo_queue")),
            Some(Dynamic::Bool(true))
        );
        if let Ok(name) = config.get_string(&AttributePath::new("name")) {
            if let Err(detail) = check_name(&name, fifo) {
                diagnostics.add_error_at(AttributePath::new("name"), "Invalid queue name", detail);
            }
        }
        let deduplication = matches!(
            config.get(&AttributePath::new("content_based_deduplication")),
            Some(Dynamic::Bool(true))
        );
        if deduplication && !fifo {
            diagnostics.add_error_at(
                AttributePath::new("content_based_deduplication"),
                "Invalid queue type",
                "content_based_deduplication requires fifo_queue",
            );
        }
    }

    /// Version 0 stored the endpoint as `endpoint`
    fn upgrade_state(version: i64, state: &mut DynamicValue) -> Result<(), String> {
        if version != 0 {
            return Ok(());
        }
        if let Dynamic::Map(entries) = &mut state.value {
            if let Some(endpoint) = entries.remove("endpoint") {
                entries.entry("sqs_endpoint".to_string()).or_insert(endpoint);
            }
        }
        Ok(())
    }

    async fn create(
        &self,
        ctx: &Context,
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
        if let Err(diagnostics) = require_activated(meta, MnqService::Sqs, region, &project_id).await {
            return diagnostics;
        }

        let attributes = match schema_to_attributes(data, &Self::schema(), SQS_ATTRIBUTES) {
            Ok(attributes) => attributes,
            Err(e) => return bridge_error(e),
        };
        let name = queue_name(data);
        let (endpoint, sqs) = client(meta, data, region);

        let created = retry_when_aws_code_equals(ctx, meta.aws_retry_interval, &[QUEUE_DELETED_RECENTLY], || {
            sqs.create_queue(&name, &attributes)
        })
        .await;
        if let Err(e) = created {
            return Diagnostics::from_error("Failed to create SQS queue", e);
        }
        persist_mnq_identity(data, region, &project_id, &name);

        // The queue is not listed by name right away
        let url = match retry_when_aws_code_equals(ctx, meta.aws_retry_interval, &[NON_EXISTENT_QUEUE], || {
            sqs.get_queue_url(&name)
        })
        .await
        {
            Ok(url) => url,
            Err(e) => return Diagnostics::from_error("Failed to get SQS queue URL", e),
        };

        set_values(
            data,
            [
                ("name", Dynamic::from(name)),
                ("url", Dynamic::from(url)),
                ("sqs_endpoint", Dynamic::from(endpoint)),
            ],
        )
    }

    async fn read(
        &self,
        _ctx: &Context,
        meta: &ScalewayProviderData,
        data: &mut ResourceData,
    ) -> Diagnostics {
        let (region, project_id, name) = match mnq_key(data) {
            Ok(key) => key,
            Err(diagnostics) => return diagnostics,
        };
        let (endpoint, sqs) = client(meta, data, region);

        let url = match sqs.get_queue_url(&name).await {
            Ok(url) => url,
            Err(e) => return read_failure(data, "Failed to get SQS queue URL", &e),
        };
        let attributes = match sqs.get_queue_attributes(&url).await {
            Ok(attributes) => attributes,
            Err(e) => return read_failure(data, "Failed to read SQS queue attributes", &e),
        };
        let values = match attributes_to_schema(&attributes, &Self::schema(), SQS_ATTRIBUTES) {
            Ok(values) => values,
            Err(e) => return bridge_error(e),
        };
        if let Err(e) = apply_to(data, values) {
            return Diagnostics::from_error("Failed to set state", e);
        }

        persist_mnq_identity(data, region, &project_id, &name);
        set_values(
            data,
            [
                ("name", Dynamic::from(name)),
                ("url", Dynamic::from(url)),
                ("sqs_endpoint", Dynamic::from(endpoint)),
                ("project_id", Dynamic::from(project_id)),
                ("region", Dynamic::from(region.as_str())),
            ],
        )
    }

    /// All changed attributes go out in one SetQueueAttributes call
    async fn update(
        &self,
        _ctx: &Context,
        meta: &ScalewayProviderData,
        data: &mut ResourceData,
    ) -> Diagnostics {
        let attributes = match changed_attributes(data, &Self::schema(), SQS_ATTRIBUTES) {
            Ok(attributes) => attributes,
            Err(e) => return bridge_error(e),
        };
        if attributes.is_empty() {
            return Diagnostics::new();
        }
        let (region, _, name) = match mnq_key(data) {
            Ok(key) => key,
            Err(diagnostics) => return diagnostics,
        };
        let (_, sqs) = client(meta, data, region);

        let url = match sqs.get_queue_url(&name).await {
            Ok(url) => url,
            Err(e) => return Diagnostics::from_error("Failed to get SQS queue URL", e),
        };
        tracing::debug!("updating {} attributes of queue {}", attributes.len(), name);
        match sqs.set_queue_attributes(&url, &attributes).await {
            Ok(()) => Diagnostics::new(),
            Err(e) => Diagnostics::from_error("Failed to update SQS queue", e),
        }
    }

    async fn delete(
        &self,
        _ctx: &Context,
        meta: &ScalewayProviderData,
        data: &mut ResourceData,
    ) -> Diagnostics {
        let (region, _, name) = match mnq_key(data) {
            Ok(key) => key,
            Err(diagnostics) => return diagnostics,
        };
        let (_, sqs) = client(meta, data, region);

        let url = match sqs.get_queue_url(&name).await {
            Ok(url) => url,
            Err(e) => {
                return match ignore_not_found(Err(e)) {
                    Ok(()) => Diagnostics::new(),
                    Err(e) => Diagnostics::from_error("Failed to get SQS queue URL", e),
                }
            }
        };
        match ignore_not_found(sqs.delete_queue(&url).await) {
            Ok(()) => Diagnostics::new(),
            Err(e) => Diagnostics::from_error("Failed to delete SQS queue", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(entries: Vec<(&str, Dynamic)>) -> DynamicValue {
        DynamicValue::new(Dynamic::object(entries))
    }

    fn errors(config: &DynamicValue) -> Vec<String> {
        let mut diagnostics = Diagnostics::new();
        SqsQueueResource::validate(config, &mut diagnostics);
        diagnostics.errors().map(|d| d.summary.clone()).collect()
    }

    #[test]
    fn queue_names_follow_the_queue_type() {
        assert!(check_name("orders_v2-main", false).is_ok());
        assert!(check_name("orders.fifo", true).is_ok());
        assert!(check_name("orders.fifo", false).is_err());
        assert!(check_name("orders", true).is_err());
        assert!(check_name(&"a".repeat(81), false).is_err());
        assert!(check_name(&format!("{}.fifo", "a".repeat(76)), true).is_err());
    }

    #[test]
    fn deduplication_requires_fifo() {
        let standard = config(vec![
            ("name", Dynamic::from("orders")),
            ("content_based_deduplication", Dynamic::Bool(true)),
        ]);
        assert_eq!(errors(&standard), vec!["Invalid queue type".to_string()]);

        let fifo = config(vec![
            ("name", Dynamic::from("orders.fifo")),
            ("fifo_queue", Dynamic::Bool(true)),
            ("content_based_deduplication", Dynamic::Bool(true)),
        ]);
        assert!(errors(&fifo).is_empty());
    }

    #[test]
    fn version_zero_endpoint_moves_to_sqs_endpoint() {
        let mut state = config(vec![
            ("name", Dynamic::from("orders")),
            ("endpoint", Dynamic::from("https://sqs.mnq.fr-par.scaleway.com")),
        ]);
        SqsQueueResource::upgrade_state(0, &mut state).unwrap();

        assert_eq!(state.get(&AttributePath::new("endpoint")), None);
        assert_eq!(
            state.get(&AttributePath::new("sqs_endpoint")),
            Some(&Dynamic::from("https://sqs.mnq.fr-par.scaleway.com"))
        );
    }

    #[test]
    fn queue_attributes_map_onto_the_schema() {
        let attributes = HashMap::from([
            ("MessageRetentionPeriod".to_string(), "345600".to_string()),
            ("FifoQueue".to_string(), "true".to_string()),
            ("QueueArn".to_string(), "arn:scw:sqs:fr-par:project-x:orders".to_string()),
        ]);
        let values = attributes_to_schema(&attributes, &SqsQueueResource::schema(), SQS_ATTRIBUTES).unwrap();

        assert_eq!(
            values.get(&AttributePath::new("message_max_age")),
            Some(&Dynamic::Number(345_600.0))
        );
        assert_eq!(values.get(&AttributePath::new("fifo_queue")), Some(&Dynamic::Bool(true)));
    }
}
