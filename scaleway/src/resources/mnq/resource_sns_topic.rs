//! SNS topic on the AWS-compatible endpoint
//!
//! Unlike queues, topic attributes are updated one SetTopicAttributes call
//! per changed attribute.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tfplug::plan_modifier::RequiresReplaceIfChanged;
use tfplug::{
    AttributeBuilder, AttributePath, AttributeType, Context, Diagnostics, Dynamic, DynamicValue,
    IdentitySchema, ResourceData, Schema, SchemaBuilder,
};

use super::{bridge_error, credential_attributes, credentials, endpoint_attribute, mnq_key, require_activated};
use crate::api::aws::{endpoint_for, SnsApi};
use crate::api::mnq::MnqService;
use crate::bridge::{apply_to, attributes_to_schema, changed_attributes, schema_to_attributes, AttributeMap};
use crate::flatten::random_name;
use crate::identity::{compose_mnq, mnq_identity_schema, persist_mnq_identity};
use crate::ids::encode_arn;
use crate::locality::Region;
use crate::provider_data::ScalewayProviderData;
use crate::resources::{id_attribute, project_id_attribute, region_attribute, resolve_region};
use crate::skeleton::{ignore_not_found, read_failure, require_project, set_values, ScalewayResource};

const FIFO_SUFFIX: &str = ".fifo";

const SNS_ATTRIBUTES: &AttributeMap = &[
    ("FifoTopic", "fifo_topic"),
    ("ContentBasedDeduplication", "content_based_deduplication"),
];

pub struct SnsTopicResource;

fn topic_name(data: &ResourceData) -> String {
    if let Some(name) = data.get_string_ok("name") {
        return name;
    }
    let name = random_name("mnq-sns");
    if data.get_bool("fifo_topic").unwrap_or(false) {
        format!("{}{}", name, FIFO_SUFFIX)
    } else {
        name
    }
}

pub(crate) fn client(meta: &ScalewayProviderData, data: &ResourceData, region: Region) -> (String, Arc<dyn SnsApi>) {
    let url = data
        .get_string_ok("sns_endpoint")
        .unwrap_or_else(|| endpoint_for(&meta.sns_endpoint_template, region));
    let (access_key, secret_key) = credentials(data);
    let client = meta.sns_client(region, Some(&url), &access_key, &secret_key);
    (url, client)
}

#[async_trait]
impl ScalewayResource for SnsTopicResource {
    const TYPE_NAME: &'static str = "scaleway_mnq_sns_topic";

    fn schema() -> Schema {
        let [access_key, secret_key] = credential_attributes(MnqService::Sns);
        SchemaBuilder::new()
            .version(0)
            .description("Manages an SNS topic")
            .attribute(id_attribute())
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("The name of the topic, generated when omitted")
                    .optional_computed()
                    .plan_modifier(RequiresReplaceIfChanged)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("fifo_topic", AttributeType::Bool)
                    .description("Whether the topic is a FIFO topic")
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
            .attribute(endpoint_attribute("sns_endpoint", "The endpoint of the SNS service"))
            .attribute(access_key)
            .attribute(secret_key)
            .attribute(
                AttributeBuilder::new("arn", AttributeType::String)
                    .description("The ARN of the topic")
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
            config.get(&AttributePath::new("fifo_topic")),
            Some(Dynamic::Bool(true))
        );
        if let Ok(name) = config.get_string(&AttributePath::new("name")) {
            if fifo != name.ends_with(FIFO_SUFFIX) {
                diagnostics.add_error_at(
                    AttributePath::new("name"),
                    "Invalid topic name",
                    format!("only FIFO topic names end with {}", FIFO_SUFFIX),
                );
            }
        }
        let deduplication = matches!(
            config.get(&AttributePath::new("content_based_deduplication")),
            Some(Dynamic::Bool(true))
        );
        if deduplication && !fifo {
            diagnostics.add_error_at(
                AttributePath::new("content_based_deduplication"),
                "Invalid topic type",
                "content_based_deduplication requires fifo_topic",
            );
        }
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
        if let Err(diagnostics) = require_activated(meta, MnqService::Sns, region, &project_id).await {
            return diagnostics;
        }

        let attributes = match schema_to_attributes(data, &Self::schema(), SNS_ATTRIBUTES) {
            Ok(attributes) => attributes,
            Err(e) => return bridge_error(e),
        };
        let name = topic_name(data);
        let (endpoint, sns) = client(meta, data, region);

        let arn = match sns.create_topic(&name, &attributes).await {
            Ok(arn) => arn,
            Err(e) => return Diagnostics::from_error("Failed to create SNS topic", e),
        };
        persist_mnq_identity(data, region, &project_id, &name);

        set_values(
            data,
            [
                ("name", Dynamic::from(name)),
                ("arn", Dynamic::from(arn)),
                ("sns_endpoint", Dynamic::from(endpoint)),
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
        let (endpoint, sns) = client(meta, data, region);
        let arn = encode_arn("sns", region, &project_id, &name, None);

        let attributes = match sns.get_topic_attributes(&arn).await {
            Ok(attributes) => attributes,
            Err(e) => return read_failure(data, "Failed to read SNS topic attributes", &e),
        };
        let values = match attributes_to_schema(&attributes, &Self::schema(), SNS_ATTRIBUTES) {
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
                ("arn", Dynamic::from(arn)),
                ("sns_endpoint", Dynamic::from(endpoint)),
                ("project_id", Dynamic::from(project_id)),
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
        let attributes = match changed_attributes(data, &Self::schema(), SNS_ATTRIBUTES) {
            Ok(attributes) => attributes,
            Err(e) => return bridge_error(e),
        };
        if attributes.is_empty() {
            return Diagnostics::new();
        }
        let (region, project_id, name) = match mnq_key(data) {
            Ok(key) => key,
            Err(diagnostics) => return diagnostics,
        };
        let (_, sns) = client(meta, data, region);
        let arn = encode_arn("sns", region, &project_id, &name, None);

        for (attribute, value) in &attributes {
            if let Err(e) = sns.set_topic_attribute(&arn, attribute, value).await {
                return Diagnostics::from_error(
                    "Failed to update SNS topic",
                    format!("{}: {}", attribute, e),
                );
            }
        }
        Diagnostics::new()
    }

    async fn delete(
        &self,
        _ctx: &Context,
        meta: &ScalewayProviderData,
        data: &mut ResourceData,
    ) -> Diagnostics {
        let (region, project_id, name) = match mnq_key(data) {
            Ok(key) => key,
            Err(diagnostics) => return diagnostics,
        };
        let (_, sns) = client(meta, data, region);
        let arn = encode_arn("sns", region, &project_id, &name, None);

        match ignore_not_found(sns.delete_topic(&arn).await) {
            Ok(()) => Diagnostics::new(),
            Err(e) => Diagnostics::from_error("Failed to delete SNS topic", e),
        }
    }
}
