//! Subscription of an endpoint to an SNS topic
//!
//! The topic is referenced either by its MNQ key (`topic_id`) or by its
//! ARN (`topic_arn`). The ID is `<region>/<project>/<topic>/<subscription>`.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tfplug::plan_modifier::RequiresReplaceIfChanged;
use tfplug::schema::Attribute;
use tfplug::validator::StringOneOfValidator;
use tfplug::{
    AttributeBuilder, AttributePath, AttributeType, Context, Diagnostics, Dynamic, DynamicValue,
    IdentitySchema, ResourceData, Schema, SchemaBuilder,
};

use super::resource_sns_topic::client;
use super::{arn_error, credential_attributes, endpoint_attribute, require_activated};
use crate::api::mnq::MnqService;
use crate::identity::{compose_subscription, persist_subscription_identity, subscription_identity_schema};
use crate::ids::{decode_arn, decode_mnq, decode_mnq_subscription, encode_arn, encode_mnq, Arn, SubscriptionId};
use crate::provider_data::ScalewayProviderData;
use crate::resources::{id_attribute, project_id_attribute, region_attribute};
use crate::skeleton::{id_error, ignore_not_found, read_failure, set_values, ScalewayResource};

const PROTOCOLS: [&str; 4] = ["http", "https", "lambda", "sqs"];

pub struct SnsTopicSubscriptionResource;

/// Topic ARN from whichever reference is set
fn topic_arn(data: &ResourceData) -> Result<Arn, Diagnostics> {
    if let Some(arn) = data.get_string_ok("topic_arn") {
        return decode_arn(&arn).map_err(arn_error);
    }
    let topic_id = data.get_string("topic_id").unwrap_or_default();
    let (region, project_id, name) = decode_mnq(&topic_id).map_err(id_error)?;
    Ok(Arn::new("sns", region, &project_id, &name))
}

fn subscription_id(topic: &Arn, subscription_arn: &str) -> Result<SubscriptionId, Diagnostics> {
    let parsed = decode_arn(subscription_arn).map_err(arn_error)?;
    let Some(subscription_id) = parsed.extra else {
        return Err(Diagnostics::from_error(
            "Invalid subscription ARN",
            format!("{} has no subscription UUID", subscription_arn),
        ));
    };
    Ok(SubscriptionId {
        region: topic.region,
        project_id: topic.project_id.clone(),
        topic_name: topic.name.clone(),
        subscription_id,
    })
}

fn reference(name: &str, description: &str) -> Attribute {
    AttributeBuilder::new(name, AttributeType::String)
        .description(description)
        .optional_computed()
        .plan_modifier(RequiresReplaceIfChanged)
        .build()
}

#[async_trait]
impl ScalewayResource for SnsTopicSubscriptionResource {
    const TYPE_NAME: &'static str = "scaleway_mnq_sns_topic_subscription";

    fn schema() -> Schema {
        let [access_key, secret_key] = credential_attributes(MnqService::Sns);
        SchemaBuilder::new()
            .version(0)
            .description("Manages a subscription to an SNS topic")
            .attribute(id_attribute())
            .attribute(reference("topic_id", "The ID of the topic, conflicts with topic_arn"))
            .attribute(reference("topic_arn", "The ARN of the topic, conflicts with topic_id"))
            .attribute(
                AttributeBuilder::new("protocol", AttributeType::String)
                    .description("Delivery protocol of the subscription")
                    .required()
                    .validator(StringOneOfValidator::new(&PROTOCOLS))
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("endpoint", AttributeType::String)
                    .description("Where messages are delivered, e.g. a URL or a queue ARN")
                    .optional()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("redrive_policy", AttributeType::Bool)
                    .description("Whether undeliverable messages are sent to a dead-letter queue")
                    .optional_computed()
                    .force_new()
                    .build(),
            )
            .attribute(endpoint_attribute("sns_endpoint", "The endpoint of the SNS service"))
            .attribute(access_key)
            .attribute(secret_key)
            .attribute(
                AttributeBuilder::new("arn", AttributeType::String)
                    .description("The ARN of the subscription")
                    .computed()
                    .build(),
            )
            .attribute(region_attribute())
            .attribute(project_id_attribute())
            .build()
    }

    fn identity_schema() -> IdentitySchema {
        subscription_identity_schema()
    }

    fn compose_id(fields: &HashMap<String, String>) -> Option<String> {
        compose_subscription(fields)
    }

    fn validate(config: &DynamicValue, diagnostics: &mut Diagnostics) {
        let set = |name: &str| config.get_string(&AttributePath::new(name)).is_ok();
        match (set("topic_id"), set("topic_arn")) {
            (true, true) => diagnostics.add_error_at(
                AttributePath::new("topic_arn"),
                "Conflicting topic references",
                "Set only one of topic_id and topic_arn",
            ),
            (false, false) => diagnostics.add_error(
                "Missing topic reference",
                "One of topic_id and topic_arn must be set",
            ),
            _ => {}
        }
    }

    async fn create(
        &self,
        _ctx: &Context,
        meta: &ScalewayProviderData,
        data: &mut ResourceData,
    ) -> Diagnostics {
        let topic = match topic_arn(data) {
            Ok(topic) => topic,
            Err(diagnostics) => return diagnostics,
        };
        if let Err(diagnostics) = require_activated(meta, MnqService::Sns, topic.region, &topic.project_id).await {
            return diagnostics;
        }
        let (endpoint, sns) = client(meta, data, topic.region);

        let mut attributes = BTreeMap::new();
        if let Some(redrive) = data.get_bool("redrive_policy") {
            attributes.insert("RedrivePolicy".to_string(), redrive.to_string());
        }
        let protocol = data.get_string("protocol").unwrap_or_default();
        let target = data.get_string_ok("endpoint");

        let subscription_arn = match sns
            .subscribe(&topic.to_string(), &protocol, target.as_deref(), &attributes)
            .await
        {
            Ok(arn) => arn,
            Err(e) => return Diagnostics::from_error("Failed to subscribe to SNS topic", e),
        };
        let id = match subscription_id(&topic, &subscription_arn) {
            Ok(id) => id,
            Err(diagnostics) => return diagnostics,
        };
        persist_subscription_identity(data, &id);

        set_values(
            data,
            [
                ("arn", Dynamic::from(subscription_arn)),
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
        let id = match decode_mnq_subscription(&data.id()) {
            Ok(id) => id,
            Err(e) => return id_error(e),
        };
        let (endpoint, sns) = client(meta, data, id.region);
        let arn = encode_arn("sns", id.region, &id.project_id, &id.topic_name, Some(&id.subscription_id));

        let attributes = match sns.get_subscription_attributes(&arn).await {
            Ok(attributes) => attributes,
            Err(e) => return read_failure(data, "Failed to read SNS subscription", &e),
        };

        persist_subscription_identity(data, &id);
        let mut values = vec![
            ("arn", Dynamic::from(arn)),
            ("topic_id", Dynamic::from(encode_mnq(id.region, &id.project_id, &id.topic_name))),
            ("topic_arn", Dynamic::from(encode_arn("sns", id.region, &id.project_id, &id.topic_name, None))),
            ("sns_endpoint", Dynamic::from(endpoint)),
            ("project_id", Dynamic::from(id.project_id.clone())),
            ("region", Dynamic::from(id.region.as_str())),
        ];
        if let Some(protocol) = attributes.get("Protocol") {
            values.push(("protocol", Dynamic::from(protocol.as_str())));
        }
        if let Some(target) = attributes.get("Endpoint").filter(|e| !e.is_empty()) {
            values.push(("endpoint", Dynamic::from(target.as_str())));
        }
        if let Some(redrive) = attributes.get("RedrivePolicy").and_then(|r| r.parse::<bool>().ok()) {
            values.push(("redrive_policy", Dynamic::from(redrive)));
        }
        set_values(data, values)
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
        let id = match decode_mnq_subscription(&data.id()) {
            Ok(id) => id,
            Err(e) => return id_error(e),
        };
        let (_, sns) = client(meta, data, id.region);
        let arn = encode_arn("sns", id.region, &id.project_id, &id.topic_name, Some(&id.subscription_id));

        match ignore_not_found(sns.unsubscribe(&arn).await) {
            Ok(()) => Diagnostics::new(),
            Err(e) => Diagnostics::from_error("Failed to unsubscribe from SNS topic", e),
        }
    }
}
