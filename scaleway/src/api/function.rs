//! Serverless Functions API: namespaces, functions, crons, domains, triggers, tokens

use std::collections::HashMap;

use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};

use crate::api::common::{deserialize_duration_opt, serialize_duration_opt, ApiQueryParams, SecretKeyValue};
use crate::api::{ApiError, Client};
use crate::locality::Region;
use crate::waiter::HasStatus;

pub struct FunctionApi<'a> {
    client: &'a Client,
    region: Region,
}

impl<'a> FunctionApi<'a> {
    pub fn new(client: &'a Client, region: Region) -> Self {
        Self { client, region }
    }

    pub fn region(&self) -> Region {
        self.region
    }

    fn path(&self, suffix: &str) -> String {
        format!("/functions/v1beta1/regions/{}/{}", self.region, suffix)
    }

    async fn delete(&self, suffix: &str) -> Result<(), ApiError> {
        self.client
            .delete::<IgnoredAny>(&self.path(suffix))
            .await
            .map(|_| ())
    }

    /// POST /functions/v1beta1/regions/{region}/namespaces
    pub async fn create_namespace(
        &self,
        request: &NamespaceRequest,
    ) -> Result<Namespace, ApiError> {
        self.client.post(&self.path("namespaces"), request).await
    }

    /// GET /functions/v1beta1/regions/{region}/namespaces/{namespace_id}
    pub async fn get_namespace(&self, namespace_id: &str) -> Result<Namespace, ApiError> {
        self.client
            .get(&self.path(&format!("namespaces/{}", namespace_id)))
            .await
    }

    /// PATCH /functions/v1beta1/regions/{region}/namespaces/{namespace_id}
    pub async fn update_namespace(
        &self,
        namespace_id: &str,
        request: &NamespaceRequest,
    ) -> Result<Namespace, ApiError> {
        self.client
            .patch(&self.path(&format!("namespaces/{}", namespace_id)), request)
            .await
    }

    /// DELETE /functions/v1beta1/regions/{region}/namespaces/{namespace_id}
    pub async fn delete_namespace(&self, namespace_id: &str) -> Result<(), ApiError> {
        self.delete(&format!("namespaces/{}", namespace_id)).await
    }

    /// POST /functions/v1beta1/regions/{region}/functions
    pub async fn create_function(&self, request: &FunctionRequest) -> Result<Function, ApiError> {
        self.client.post(&self.path("functions"), request).await
    }

    /// GET /functions/v1beta1/regions/{region}/functions/{function_id}
    pub async fn get_function(&self, function_id: &str) -> Result<Function, ApiError> {
        self.client
            .get(&self.path(&format!("functions/{}", function_id)))
            .await
    }

    /// PATCH /functions/v1beta1/regions/{region}/functions/{function_id}
    pub async fn update_function(
        &self,
        function_id: &str,
        request: &FunctionRequest,
    ) -> Result<Function, ApiError> {
        self.client
            .patch(&self.path(&format!("functions/{}", function_id)), request)
            .await
    }

    /// DELETE /functions/v1beta1/regions/{region}/functions/{function_id}
    pub async fn delete_function(&self, function_id: &str) -> Result<(), ApiError> {
        self.delete(&format!("functions/{}", function_id)).await
    }

    /// POST /functions/v1beta1/regions/{region}/functions/{function_id}/deploy
    pub async fn deploy_function(&self, function_id: &str) -> Result<Function, ApiError> {
        self.client
            .post(
                &self.path(&format!("functions/{}/deploy", function_id)),
                &serde_json::json!({}),
            )
            .await
    }

    /// GET /functions/v1beta1/regions/{region}/functions/{function_id}/upload-url
    pub async fn get_upload_url(
        &self,
        function_id: &str,
        content_length: u64,
    ) -> Result<UploadUrl, ApiError> {
        let params = ApiQueryParams::new().add("content_length", content_length);
        self.client
            .get_with_params(
                &self.path(&format!("functions/{}/upload-url", function_id)),
                &params,
            )
            .await
    }

    /// POST /functions/v1beta1/regions/{region}/crons
    pub async fn create_cron(&self, request: &CronRequest) -> Result<Cron, ApiError> {
        self.client.post(&self.path("crons"), request).await
    }

    /// GET /functions/v1beta1/regions/{region}/crons/{cron_id}
    pub async fn get_cron(&self, cron_id: &str) -> Result<Cron, ApiError> {
        self.client
            .get(&self.path(&format!("crons/{}", cron_id)))
            .await
    }

    /// PATCH /functions/v1beta1/regions/{region}/crons/{cron_id}
    pub async fn update_cron(&self, cron_id: &str, request: &CronRequest) -> Result<Cron, ApiError> {
        self.client
            .patch(&self.path(&format!("crons/{}", cron_id)), request)
            .await
    }

    /// DELETE /functions/v1beta1/regions/{region}/crons/{cron_id}
    pub async fn delete_cron(&self, cron_id: &str) -> Result<(), ApiError> {
        self.delete(&format!("crons/{}", cron_id)).await
    }

    /// POST /functions/v1beta1/regions/{region}/domains
    pub async fn create_domain(&self, request: &CreateDomainRequest) -> Result<Domain, ApiError> {
        self.client.post(&self.path("domains"), request).await
    }

    /// GET /functions/v1beta1/regions/{region}/domains/{domain_id}
    pub async fn get_domain(&self, domain_id: &str) -> Result<Domain, ApiError> {
        self.client
            .get(&self.path(&format!("domains/{}", domain_id)))
            .await
    }

    /// DELETE /functions/v1beta1/regions/{region}/domains/{domain_id}
    pub async fn delete_domain(&self, domain_id: &str) -> Result<(), ApiError> {
        self.delete(&format!("domains/{}", domain_id)).await
    }

    /// POST /functions/v1beta1/regions/{region}/triggers
    pub async fn create_trigger(&self, request: &CreateTriggerRequest) -> Result<Trigger, ApiError> {
        self.client.post(&self.path("triggers"), request).await
    }

    /// GET /functions/v1beta1/regions/{region}/triggers/{trigger_id}
    pub async fn get_trigger(&self, trigger_id: &str) -> Result<Trigger, ApiError> {
        self.client
            .get(&self.path(&format!("triggers/{}", trigger_id)))
            .await
    }

    /// PATCH /functions/v1beta1/regions/{region}/triggers/{trigger_id}
    pub async fn update_trigger(
        &self,
        trigger_id: &str,
        request: &UpdateTriggerRequest,
    ) -> Result<Trigger, ApiError> {
        self.client
            .patch(&self.path(&format!("triggers/{}", trigger_id)), request)
            .await
    }

    /// DELETE /functions/v1beta1/regions/{region}/triggers/{trigger_id}
    pub async fn delete_trigger(&self, trigger_id: &str) -> Result<(), ApiError> {
        self.delete(&format!("triggers/{}", trigger_id)).await
    }

    /// POST /functions/v1beta1/regions/{region}/tokens
    pub async fn create_token(&self, request: &CreateTokenRequest) -> Result<Token, ApiError> {
        self.client.post(&self.path("tokens"), request).await
    }

    /// GET /functions/v1beta1/regions/{region}/tokens/{token_id}
    pub async fn get_token(&self, token_id: &str) -> Result<Token, ApiError> {
        self.client
            .get(&self.path(&format!("tokens/{}", token_id)))
            .await
    }

    /// DELETE /functions/v1beta1/regions/{region}/tokens/{token_id}
    pub async fn delete_token(&self, token_id: &str) -> Result<(), ApiError> {
        self.delete(&format!("tokens/{}", token_id)).await
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Namespace {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub project_id: String,
    #[serde(default)]
    pub organization_id: String,
    pub status: String,
    #[serde(default)]
    pub environment_variables: HashMap<String, String>,
    #[serde(default)]
    pub secret_environment_variables: Vec<SecretKeyValue>,
    #[serde(default)]
    pub registry_endpoint: String,
    #[serde(default)]
    pub registry_namespace_id: String,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl HasStatus for Namespace {
    fn status(&self) -> &str {
        &self.status
    }

    fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct NamespaceRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment_variables: Option<HashMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_environment_variables: Option<Vec<SecretKeyValue>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Function {
    pub id: String,
    pub name: String,
    pub namespace_id: String,
    pub status: String,
    #[serde(default)]
    pub environment_variables: HashMap<String, String>,
    #[serde(default)]
    pub secret_environment_variables: Vec<SecretKeyValue>,
    #[serde(default)]
    pub min_scale: u32,
    #[serde(default)]
    pub max_scale: u32,
    #[serde(default)]
    pub runtime: String,
    #[serde(default)]
    pub memory_limit: u32,
    #[serde(default)]
    pub cpu_limit: u32,
    #[serde(default, deserialize_with = "deserialize_duration_opt")]
    pub timeout: Option<i64>,
    #[serde(default)]
    pub handler: String,
    #[serde(default)]
    pub privacy: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub domain_name: String,
    #[serde(default)]
    pub http_option: String,
    #[serde(default)]
    pub sandbox: String,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub runtime_message: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub region: String,
}

impl HasStatus for Function {
    fn status(&self) -> &str {
        &self.status
    }

    fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FunctionRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handler: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub privacy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment_variables: Option<HashMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_environment_variables: Option<Vec<SecretKeyValue>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_scale: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_scale: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_limit: Option<u32>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_duration_opt"
    )]
    pub timeout: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_option: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sandbox: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl FunctionRequest {
    pub fn is_empty(&self) -> bool {
        serde_json::to_value(self)
            .ok()
            .and_then(|v| v.as_object().map(|o| o.is_empty()))
            .unwrap_or(true)
    }
}

/// Presigned target for a function archive
#[derive(Debug, Clone, Deserialize)]
pub struct UploadUrl {
    pub url: String,
    #[serde(default)]
    pub headers: HashMap<String, Vec<String>>,
}

impl UploadUrl {
    /// Headers flattened to one value per name
    pub fn header_pairs(&self) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = self
            .headers
            .iter()
            .flat_map(|(name, values)| values.iter().map(move |v| (name.clone(), v.clone())))
            .collect();
        pairs.sort();
        pairs
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Cron {
    pub id: String,
    pub function_id: String,
    pub schedule: String,
    #[serde(default)]
    pub args: serde_json::Value,
    pub status: String,
    #[serde(default)]
    pub name: String,
}

impl HasStatus for Cron {
    fn status(&self) -> &str {
        &self.status
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CronRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Domain {
    pub id: String,
    pub hostname: String,
    pub function_id: String,
    #[serde(default)]
    pub url: String,
    pub status: String,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl HasStatus for Domain {
    fn status(&self) -> &str {
        &self.status
    }

    fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateDomainRequest {
    pub hostname: String,
    pub function_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqsTriggerConfig {
    pub queue: String,
    pub mnq_project_id: String,
    pub mnq_region: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NatsTriggerConfig {
    pub subject: String,
    pub mnq_nats_account_id: String,
    pub mnq_project_id: String,
    pub mnq_region: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Trigger {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub function_id: String,
    #[serde(default)]
    pub input_type: String,
    pub status: String,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub scw_sqs_config: Option<SqsTriggerConfig>,
    #[serde(default)]
    pub scw_nats_config: Option<NatsTriggerConfig>,
}

impl HasStatus for Trigger {
    fn status(&self) -> &str {
        &self.status
    }

    fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateTriggerRequest {
    pub name: String,
    pub description: String,
    pub function_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scw_sqs_config: Option<SqsTriggerConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scw_nats_config: Option<NatsTriggerConfig>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateTriggerRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Token {
    pub id: String,
    /// Only returned by create
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub function_id: Option<String>,
    #[serde(default)]
    pub namespace_id: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub expires_at: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CreateTokenRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
}
