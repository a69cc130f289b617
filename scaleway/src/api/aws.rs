//! SQS and SNS compatible endpoints of Scaleway Messaging and Queuing
//!
//! Clients are built per handler with the queue owner's credentials, not
//! the provider's. The traits are the seam tests replace with fakes.

use async_trait::async_trait;
use aws_sdk_sqs::error::ProvideErrorMetadata;
use aws_sdk_sqs::types::QueueAttributeName;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use super::error::ApiError;
use crate::locality::Region;

pub const DEFAULT_SQS_ENDPOINT: &str = "https://sqs.mnq.{region}.scaleway.com";
pub const DEFAULT_SNS_ENDPOINT: &str = "https://sns.mnq.{region}.scaleway.com";

/// Substitute `{region}` in an endpoint template
pub fn endpoint_for(template: &str, region: Region) -> String {
    template.replace("{region}", region.as_str())
}

/// Where and as whom to reach an SQS/SNS endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MnqEndpoint {
    pub region: Region,
    pub url: String,
    pub access_key: String,
    pub secret_key: String,
}

#[async_trait]
pub trait SqsApi: Send + Sync {
    /// Returns the queue URL
    async fn create_queue(
        &self,
        name: &str,
        attributes: &BTreeMap<String, String>,
    ) -> Result<String, ApiError>;

    async fn get_queue_url(&self, name: &str) -> Result<String, ApiError>;

    async fn get_queue_attributes(&self, url: &str) -> Result<HashMap<String, String>, ApiError>;

    async fn set_queue_attributes(
        &self,
        url: &str,
        attributes: &BTreeMap<String, String>,
    ) -> Result<(), ApiError>;

    async fn delete_queue(&self, url: &str) -> Result<(), ApiError>;
}

#[async_trait]
pub trait SnsApi: Send + Sync {
    /// Returns the topic ARN
    async fn create_topic(
        &self,
        name: &str,
        attributes: &BTreeMap<String, String>,
    ) -> Result<String, ApiError>;

    async fn get_topic_attributes(&self, arn: &str) -> Result<HashMap<String, String>, ApiError>;

    async fn set_topic_attribute(&self, arn: &str, name: &str, value: &str)
        -> Result<(), ApiError>;

    async fn delete_topic(&self, arn: &str) -> Result<(), ApiError>;

    /// Returns the subscription ARN
    async fn subscribe(
        &self,
        topic_arn: &str,
        protocol: &str,
        endpoint: Option<&str>,
        attributes: &BTreeMap<String, String>,
    ) -> Result<String, ApiError>;

    async fn get_subscription_attributes(
        &self,
        arn: &str,
    ) -> Result<HashMap<String, String>, ApiError>;

    async fn unsubscribe(&self, arn: &str) -> Result<(), ApiError>;
}

/// Builds SQS/SNS clients for an endpoint
pub trait MnqClientFactory: Send + Sync {
    fn sqs(&self, endpoint: &MnqEndpoint) -> Arc<dyn SqsApi>;
    fn sns(&self, endpoint: &MnqEndpoint) -> Arc<dyn SnsApi>;
}

/// Factory backed by the AWS SDK
#[derive(Debug, Default, Clone, Copy)]
pub struct AwsMnqClientFactory;

impl MnqClientFactory for AwsMnqClientFactory {
    fn sqs(&self, endpoint: &MnqEndpoint) -> Arc<dyn SqsApi> {
        let config = aws_sdk_sqs::Config::builder()
            .behavior_version(aws_sdk_sqs::config::BehaviorVersion::latest())
            .region(aws_sdk_sqs::config::Region::new(endpoint.region.to_string()))
            .endpoint_url(&endpoint.url)
            .credentials_provider(aws_sdk_sqs::config::Credentials::new(
                &endpoint.access_key,
                &endpoint.secret_key,
                None,
                None,
                "scaleway",
            ))
            .build();
        Arc::new(AwsSqs {
            client: aws_sdk_sqs::Client::from_conf(config),
        })
    }

    fn sns(&self, endpoint: &MnqEndpoint) -> Arc<dyn SnsApi> {
        let config = aws_sdk_sns::Config::builder()
            .behavior_version(aws_sdk_sns::config::BehaviorVersion::latest())
            .region(aws_sdk_sns::config::Region::new(endpoint.region.to_string()))
            .endpoint_url(&endpoint.url)
            .credentials_provider(aws_sdk_sns::config::Credentials::new(
                &endpoint.access_key,
                &endpoint.secret_key,
                None,
                None,
                "scaleway",
            ))
            .build();
        Arc::new(AwsSns {
            client: aws_sdk_sns::Client::from_conf(config),
        })
    }
}

fn aws_error<E>(err: E) -> ApiError
where
    E: ProvideErrorMetadata + std::fmt::Display,
{
    match err.code() {
        Some(code) => ApiError::Aws {
            code: code.to_string(),
            message: err.message().unwrap_or_default().to_string(),
        },
        None => ApiError::AwsTransport(err.to_string()),
    }
}

fn missing(field: &str) -> ApiError {
    ApiError::ParseError(format!("response has no {}", field))
}

struct AwsSqs {
    client: aws_sdk_sqs::Client,
}

fn queue_attributes(attributes: &BTreeMap<String, String>) -> HashMap<QueueAttributeName, String> {
    attributes
        .iter()
        .map(|(k, v)| (QueueAttributeName::from(k.as_str()), v.clone()))
        .collect()
}

#[async_trait]
impl SqsApi for AwsSqs {
    async fn create_queue(
        &self,
        name: &str,
        attributes: &BTreeMap<String, String>,
    ) -> Result<String, ApiError> {
        tracing::debug!("SQS CreateQueue {}", name);
        let output = self
            .client
            .create_queue()
            .queue_name(name)
            .set_attributes(Some(queue_attributes(attributes)))
            .send()
            .await
            .map_err(aws_error)?;
        output
            .queue_url()
            .map(str::to_string)
            .ok_or_else(|| missing("QueueUrl"))
    }

    async fn get_queue_url(&self, name: &str) -> Result<String, ApiError> {
        tracing::debug!("SQS GetQueueUrl {}", name);
        let output = self
            .client
            .get_queue_url()
            .queue_name(name)
            .send()
            .await
            .map_err(aws_error)?;
        output
            .queue_url()
            .map(str::to_string)
            .ok_or_else(|| missing("QueueUrl"))
    }

    async fn get_queue_attributes(&self, url: &str) -> Result<HashMap<String, String>, ApiError> {
        tracing::debug!("SQS GetQueueAttributes {}", url);
        let output = self
            .client
            .get_queue_attributes()
            .queue_url(url)
            .attribute_names(QueueAttributeName::All)
            .send()
            .await
            .map_err(aws_error)?;
        Ok(output
            .attributes()
            .map(|attrs| {
                attrs
                    .iter()
                    .map(|(k, v)| (k.as_str().to_string(), v.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn set_queue_attributes(
        &self,
        url: &str,
        attributes: &BTreeMap<String, String>,
    ) -> Result<(), ApiError> {
        tracing::debug!("SQS SetQueueAttributes {} ({} attributes)", url, attributes.len());
        self.client
            .set_queue_attributes()
            .queue_url(url)
            .set_attributes(Some(queue_attributes(attributes)))
            .send()
            .await
            .map_err(aws_error)?;
        Ok(())
    }

    async fn delete_queue(&self, url: &str) -> Result<(), ApiError> {
        tracing::debug!("SQS DeleteQueue {}", url);
        self.client
            .delete_queue()
            .queue_url(url)
            .send()
            .await
            .map_err(aws_error)?;
        Ok(())
    }
}

struct AwsSns {
    client: aws_sdk_sns::Client,
}

fn string_map(attributes: &BTreeMap<String, String>) -> HashMap<String, String> {
    attributes
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

#[async_trait]
impl SnsApi for AwsSns {
    async fn create_topic(
        &self,
        name: &str,
        attributes: &BTreeMap<String, String>,
    ) -> Result<String, ApiError> {
        tracing::debug!("SNS CreateTopic {}", name);
        let output = self
            .client
            .create_topic()
            .name(name)
            .set_attributes(Some(string_map(attributes)))
            .send()
            .await
            .map_err(aws_error)?;
        output
            .topic_arn()
            .map(str::to_string)
            .ok_or_else(|| missing("TopicArn"))
    }

    async fn get_topic_attributes(&self, arn: &str) -> Result<HashMap<String, String>, ApiError> {
        tracing::debug!("SNS GetTopicAttributes {}", arn);
        let output = self
            .client
            .get_topic_attributes()
            .topic_arn(arn)
            .send()
            .await
            .map_err(aws_error)?;
        Ok(output.attributes().cloned().unwrap_or_default())
    }

    async fn set_topic_attribute(
        &self,
        arn: &str,
        name: &str,
        value: &str,
    ) -> Result<(), ApiError> {
        tracing::debug!("SNS SetTopicAttributes {} {}", arn, name);
        self.client
            .set_topic_attributes()
            .topic_arn(arn)
            .attribute_name(name)
            .attribute_value(value)
            .send()
            .await
            .map_err(aws_error)?;
        Ok(())
    }

    async fn delete_topic(&self, arn: &str) -> Result<(), ApiError> {
        tracing::debug!("SNS DeleteTopic {}", arn);
        self.client
            .delete_topic()
            .topic_arn(arn)
            .send()
            .await
            .map_err(aws_error)?;
        Ok(())
    }

    async fn subscribe(
        &self,
        topic_arn: &str,
        protocol: &str,
        endpoint: Option<&str>,
        attributes: &BTreeMap<String, String>,
    ) -> Result<String, ApiError> {
        tracing::debug!("SNS Subscribe {} via {}", topic_arn, protocol);
        let output = self
            .client
            .subscribe()
            .topic_arn(topic_arn)
            .protocol(protocol)
            .set_endpoint(endpoint.map(str::to_string))
            .set_attributes(Some(string_map(attributes)))
            .return_subscription_arn(true)
            .send()
            .await
            .map_err(aws_error)?;
        output
            .subscription_arn()
            .map(str::to_string)
            .ok_or_else(|| missing("SubscriptionArn"))
    }

    async fn get_subscription_attributes(
        &self,
        arn: &str,
    ) -> Result<HashMap<String, String>, ApiError> {
        tracing::debug!("SNS GetSubscriptionAttributes {}", arn);
        let output = self
            .client
            .get_subscription_attributes()
            .subscription_arn(arn)
            .send()
            .await
            .map_err(aws_error)?;
        Ok(output.attributes().cloned().unwrap_or_default())
    }

    async fn unsubscribe(&self, arn: &str) -> Result<(), ApiError> {
        tracing::debug!("SNS Unsubscribe {}", arn);
        self.client
            .unsubscribe()
            .subscription_arn(arn)
            .send()
            .await
            .map_err(aws_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_region_into_template() {
        assert_eq!(
            endpoint_for(DEFAULT_SQS_ENDPOINT, Region::NlAms),
            "https://sqs.mnq.nl-ams.scaleway.com"
        );
        assert_eq!(
            endpoint_for("http://localhost:9324", Region::FrPar),
            "http://localhost:9324"
        );
    }

    #[test]
    fn queue_attribute_names_keep_their_spelling() {
        let attrs = queue_attributes(&BTreeMap::from([(
            "MessageRetentionPeriod".to_string(),
            "60".to_string(),
        )]));
        let (name, value) = attrs.into_iter().next().unwrap();
        assert_eq!(name.as_str(), "MessageRetentionPeriod");
        assert_eq!(value, "60");
    }

    #[tokio::test]
    async fn sdk_clients_build_without_network() {
        let endpoint = MnqEndpoint {
            region: Region::FrPar,
            url: endpoint_for(DEFAULT_SNS_ENDPOINT, Region::FrPar),
            access_key: "SCWXXXXXXXXXXXXXXXXX".to_string(),
            secret_key: "11111111-1111-1111-1111-111111111111".to_string(),
        };
        let factory = AwsMnqClientFactory;
        let _sqs = factory.sqs(&endpoint);
        let _sns = factory.sns(&endpoint);
    }
}
