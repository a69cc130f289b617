//! Messaging and Queuing: NATS accounts, SQS/SNS activation, credentials,
//! queues, topics and subscriptions

pub mod resource_activation;
pub mod resource_credentials;
pub mod resource_nats_account;
pub mod resource_nats_credentials;
pub mod resource_sns_topic;
pub mod resource_sns_topic_subscription;
pub mod resource_sqs_queue;

pub use resource_activation::{SnsActivationResource, SqsActivationResource};
pub use resource_credentials::{SnsCredentialsResource, SqsCredentialsResource};
pub use resource_nats_account::NatsAccountResource;
pub use resource_nats_credentials::NatsCredentialsResource;
pub use resource_sns_topic::SnsTopicResource;
pub use resource_sns_topic_subscription::SnsTopicSubscriptionResource;
pub use resource_sqs_queue::SqsQueueResource;

use tfplug::plan_modifier::RequiresReplaceIfChanged;
use tfplug::schema::Attribute;
use tfplug::{AttributeBuilder, AttributeType, Diagnostics, ResourceData};

use crate::api::mnq::MnqService;
use crate::bridge::BridgeError;
use crate::ids::{decode_mnq, IdError};
use crate::locality::Region;
use crate::provider_data::ScalewayProviderData;
use crate::skeleton::id_error;

/// `access_key` and `secret_key` of the credentials used against the
/// SQS/SNS compatible endpoint
pub(crate) fn credential_attributes(service: MnqService) -> [Attribute; 2] {
    let access = format!("The access key of the {} credentials", service.as_str().to_uppercase());
    let secret = format!("The secret key of the {} credentials", service.as_str().to_uppercase());
    [
        AttributeBuilder::new("access_key", AttributeType::String)
            .description(&access)
            .required()
            .sensitive()
            .build(),
        AttributeBuilder::new("secret_key", AttributeType::String)
            .description(&secret)
            .required()
            .sensitive()
            .build(),
    ]
}

/// Endpoint override; computed from the provider template when omitted
pub(crate) fn endpoint_attribute(name: &str, description: &str) -> Attribute {
    AttributeBuilder::new(name, AttributeType::String)
        .description(description)
        .optional_computed()
        .plan_modifier(RequiresReplaceIfChanged)
        .build()
}

/// `(region, project, name)` of an existing queue or topic
pub(crate) fn mnq_key(data: &ResourceData) -> Result<(Region, String, String), Diagnostics> {
    decode_mnq(&data.id()).map_err(id_error)
}

pub(crate) fn credentials(data: &ResourceData) -> (String, String) {
    (
        data.get_string("access_key").unwrap_or_default(),
        data.get_string("secret_key").unwrap_or_default(),
    )
}

/// Fails unless SQS or SNS is activated on the project
pub(crate) async fn require_activated(
    meta: &ScalewayProviderData,
    service: MnqService,
    region: Region,
    project_id: &str,
) -> Result<(), Diagnostics> {
    let info = meta
        .client
        .mnq(region)
        .get_info(service, project_id)
        .await
        .map_err(|e| {
            Diagnostics::from_error(
                format!("Failed to check {} activation", service.as_str().to_uppercase()),
                e,
            )
        })?;
    if info.is_enabled() {
        return Ok(());
    }
    Err(Diagnostics::from_error(
        format!("{} is not activated", service.as_str().to_uppercase()),
        format!(
            "Activate it on project {} in {} first, status is {:?}",
            project_id, region, info.status
        ),
    ))
}

pub(crate) fn bridge_error(err: BridgeError) -> Diagnostics {
    Diagnostics::from_error("Invalid attribute mapping", err)
}

pub(crate) fn arn_error(err: IdError) -> Diagnostics {
    Diagnostics::from_error("Invalid ARN", err)
}
