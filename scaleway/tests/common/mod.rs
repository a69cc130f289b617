#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use mockito::{Matcher, Mock, ServerGuard};
use scaleway::api::aws::{MnqClientFactory, MnqEndpoint, SnsApi, SqsApi};
use scaleway::api::{ApiError, Client};
use scaleway::errors::{NON_EXISTENT_QUEUE, QUEUE_DELETED_RECENTLY};
use scaleway::provider_data::ScalewayProviderData;
use tfplug::resource::{CreateResourceRequest, DeleteResourceRequest, UpdateResourceRequest};
use tfplug::{Diagnostics, Dynamic, DynamicValue, ResourceData};

pub const SECRET_KEY: &str = "11111111-1111-1111-1111-111111111111";
pub const PROJECT_ID: &str = "22222222-2222-2222-2222-222222222222";
pub const ORGANIZATION_ID: &str = "33333333-3333-3333-3333-333333333333";

fn aws(code: &str, message: &str) -> ApiError {
    ApiError::Aws {
        code: code.to_string(),
        message: message.to_string(),
    }
}

#[derive(Default)]
struct Store {
    queues: HashMap<String, BTreeMap<String, String>>,
    deleted_recently: usize,
    create_queue_calls: usize,
    set_queue_attributes_calls: Vec<BTreeMap<String, String>>,
    topics: HashMap<String, BTreeMap<String, String>>,
    subscriptions: HashMap<String, HashMap<String, String>>,
    next_subscription: u32,
}

/// In-memory SQS and SNS endpoint shared by every client it hands out
#[derive(Clone, Default)]
pub struct FakeMnq {
    store: Arc<Mutex<Store>>,
}

impl FakeMnq {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next `times` CreateQueue calls fail with QueueDeletedRecently
    pub fn refuse_recently_deleted(&self, times: usize) {
        self.store.lock().unwrap().deleted_recently = times;
    }

    pub fn create_queue_calls(&self) -> usize {
        self.store.lock().unwrap().create_queue_calls
    }

    pub fn set_queue_attributes_calls(&self) -> Vec<BTreeMap<String, String>> {
        self.store.lock().unwrap().set_queue_attributes_calls.clone()
    }

    pub fn has_queue(&self, name: &str) -> bool {
        self.store.lock().unwrap().queues.contains_key(name)
    }

    /// Deletes a queue behind the provider's back
    pub fn drop_queue(&self, name: &str) {
        self.store.lock().unwrap().queues.remove(name);
    }

    pub fn subscriptions_of(&self, topic_arn: &str) -> usize {
        self.store
            .lock()
            .unwrap()
            .subscriptions
            .keys()
            .filter(|arn| arn.starts_with(&format!("{}:", topic_arn)))
            .count()
    }
}

fn queue_url(name: &str) -> String {
    format!("https://sqs.mnq.test/{}/{}", PROJECT_ID, name)
}

fn queue_name(url: &str) -> &str {
    url.rsplit('/').next().unwrap_or_default()
}

#[async_trait]
impl SqsApi for FakeMnq {
    async fn create_queue(
        &self,
        name: &str,
        attributes: &BTreeMap<String, String>,
    ) -> Result<String, ApiError> {
        let mut store = self.store.lock().unwrap();
        store.create_queue_calls += 1;
        if store.deleted_recently > 0 {
            store.deleted_recently -= 1;
            return Err(aws(QUEUE_DELETED_RECENTLY, "wait 60 seconds"));
        }

        let mut stored = BTreeMap::from([
            ("ReceiveMessageWaitTimeSeconds".to_string(), "0".to_string()),
            ("VisibilityTimeout".to_string(), "30".to_string()),
            ("MessageRetentionPeriod".to_string(), "345600".to_string()),
            ("MaximumMessageSize".to_string(), "262144".to_string()),
            ("FifoQueue".to_string(), name.ends_with(".fifo").to_string()),
            ("ContentBasedDeduplication".to_string(), "false".to_string()),
            (
                "QueueArn".to_string(),
                format!("arn:scw:sqs:fr-par:project-{}:{}", PROJECT_ID, name),
            ),
        ]);
        stored.extend(attributes.clone());
        store.queues.insert(name.to_string(), stored);
        Ok(queue_url(name))
    }

    async fn get_queue_url(&self, name: &str) -> Result<String, ApiError> {
        let store = self.store.lock().unwrap();
        if store.queues.contains_key(name) {
            Ok(queue_url(name))
        } else {
            Err(aws(NON_EXISTENT_QUEUE, "queue does not exist"))
        }
    }

    async fn get_queue_attributes(&self, url: &str) -> Result<HashMap<String, String>, ApiError> {
        let store = self.store.lock().unwrap();
        store
            .queues
            .get(queue_name(url))
            .map(|attributes| attributes.clone().into_iter().collect())
            .ok_or_else(|| aws(NON_EXISTENT_QUEUE, "queue does not exist"))
    }

    async fn set_queue_attributes(
        &self,
        url: &str,
        attributes: &BTreeMap<String, String>,
    ) -> Result<(), ApiError> {
        let mut store = self.store.lock().unwrap();
        store.set_queue_attributes_calls.push(attributes.clone());
        let queue = store
            .queues
            .get_mut(queue_name(url))
            .ok_or_else(|| aws(NON_EXISTENT_QUEUE, "queue does not exist"))?;
        queue.extend(attributes.clone());
        Ok(())
    }

    async fn delete_queue(&self, url: &str) -> Result<(), ApiError> {
        let mut store = self.store.lock().unwrap();
        match store.queues.remove(queue_name(url)) {
            Some(_) => Ok(()),
            None => Err(aws(NON_EXISTENT_QUEUE, "queue does not exist")),
        }
    }
}

#[async_trait]
impl SnsApi for FakeMnq {
    async fn create_topic(
        &self,
        name: &str,
        attributes: &BTreeMap<String, String>,
    ) -> Result<String, ApiError> {
        let arn = format!("arn:scw:sns:fr-par:project-{}:{}", PROJECT_ID, name);
        let mut stored = BTreeMap::from([
            ("FifoTopic".to_string(), name.ends_with(".fifo").to_string()),
            ("ContentBasedDeduplication".to_string(), "false".to_string()),
        ]);
        stored.extend(attributes.clone());
        self.store.lock().unwrap().topics.insert(arn.clone(), stored);
        Ok(arn)
    }

    async fn get_topic_attributes(&self, arn: &str) -> Result<HashMap<String, String>, ApiError> {
        let store = self.store.lock().unwrap();
        store
            .topics
            .get(arn)
            .map(|attributes| attributes.clone().into_iter().collect())
            .ok_or_else(|| aws("NotFound", "topic does not exist"))
    }

    async fn set_topic_attribute(&self, arn: &str, name: &str, value: &str) -> Result<(), ApiError> {
        let mut store = self.store.lock().unwrap();
        let topic = store
            .topics
            .get_mut(arn)
            .ok_or_else(|| aws("NotFound", "topic does not exist"))?;
        topic.insert(name.to_string(), value.to_string());
        Ok(())
    }

    async fn delete_topic(&self, arn: &str) -> Result<(), ApiError> {
        let mut store = self.store.lock().unwrap();
        store.topics.remove(arn);
        store.subscriptions.retain(|sub, _| !sub.starts_with(&format!("{}:", arn)));
        Ok(())
    }

    async fn subscribe(
        &self,
        topic_arn: &str,
        protocol: &str,
        endpoint: Option<&str>,
        attributes: &BTreeMap<String, String>,
    ) -> Result<String, ApiError> {
        let mut store = self.store.lock().unwrap();
        if !store.topics.contains_key(topic_arn) {
            return Err(aws("NotFound", "topic does not exist"));
        }
        store.next_subscription += 1;
        let arn = format!(
            "{}:44444444-4444-4444-4444-{:012}",
            topic_arn, store.next_subscription
        );

        let mut stored: HashMap<String, String> = attributes.clone().into_iter().collect();
        stored.insert("TopicArn".to_string(), topic_arn.to_string());
        stored.insert("Protocol".to_string(), protocol.to_string());
        stored.insert("Endpoint".to_string(), endpoint.unwrap_or_default().to_string());
        store.subscriptions.insert(arn.clone(), stored);
        Ok(arn)
    }

    async fn get_subscription_attributes(&self, arn: &str) -> Result<HashMap<String, String>, ApiError> {
        let store = self.store.lock().unwrap();
        store
            .subscriptions
            .get(arn)
            .cloned()
            .ok_or_else(|| aws("NotFound", "subscription does not exist"))
    }

    async fn unsubscribe(&self, arn: &str) -> Result<(), ApiError> {
        self.store.lock().unwrap().subscriptions.remove(arn);
        Ok(())
    }
}

impl MnqClientFactory for FakeMnq {
    fn sqs(&self, _endpoint: &MnqEndpoint) -> Arc<dyn SqsApi> {
        Arc::new(self.clone())
    }

    fn sns(&self, _endpoint: &MnqEndpoint) -> Arc<dyn SnsApi> {
        Arc::new(self.clone())
    }
}

/// Provider data pointed at a mock server, polling fast
pub fn meta(server_url: &str, fake: &FakeMnq) -> Arc<ScalewayProviderData> {
    let client = Client::new(server_url, SECRET_KEY).unwrap();
    let mut meta = ScalewayProviderData::new(client);
    meta.default_project_id = Some(PROJECT_ID.to_string());
    meta.default_organization_id = Some(ORGANIZATION_ID.to_string());
    meta.wait_retry_interval = Some(Duration::from_millis(10));
    meta.aws_retry_interval = Duration::from_millis(10);
    meta.post_update_delay = Duration::ZERO;
    meta.mnq_clients = Arc::new(fake.clone());
    Arc::new(meta)
}

/// Mocks `<service>-info` reporting the service as enabled
pub async fn mock_activated(server: &mut ServerGuard, service: &str) -> Mock {
    server
        .mock("GET", format!("/mnq/v1beta1/regions/fr-par/{}-info", service).as_str())
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(format!(
            r#"{{"project_id":"{}","region":"fr-par","status":"enabled","{}_endpoint_url":"https://{}.mnq.fr-par.scaleway.com"}}"#,
            PROJECT_ID, service, service
        ))
        .create_async()
        .await
}

pub fn object(entries: Vec<(&str, Dynamic)>) -> DynamicValue {
    DynamicValue::new(Dynamic::object(entries))
}

pub fn for_create(type_name: &str, planned: DynamicValue) -> ResourceData {
    ResourceData::for_create(&CreateResourceRequest {
        type_name: type_name.to_string(),
        config: planned.clone(),
        planned_state: planned,
        planned_private: Vec::new(),
        planned_identity: None,
    })
}

/// Update from the state a previous handler left, with `changes` applied to the plan
pub fn for_update(type_name: &str, prior: DynamicValue, changes: Vec<(&str, Dynamic)>) -> ResourceData {
    let mut planned = prior.clone();
    if let Dynamic::Map(entries) = &mut planned.value {
        for (key, value) in changes {
            entries.insert(key.to_string(), value);
        }
    }
    ResourceData::for_update(&UpdateResourceRequest {
        type_name: type_name.to_string(),
        prior_state: prior,
        config: planned.clone(),
        planned_state: planned,
        planned_private: Vec::new(),
        planned_identity: None,
    })
}

pub fn for_delete(type_name: &str, prior: DynamicValue) -> ResourceData {
    ResourceData::for_delete(&DeleteResourceRequest {
        type_name: type_name.to_string(),
        prior_state: prior,
        planned_private: Vec::new(),
        prior_identity: None,
    })
}

pub fn error_summaries(diagnostics: &Diagnostics) -> Vec<String> {
    diagnostics.errors().map(|d| d.summary.clone()).collect()
}
