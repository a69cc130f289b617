//! Managed Inference API: deployments and custom models

use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};

use crate::api::{ApiError, Client};
use crate::locality::Region;
use crate::waiter::HasStatus;

pub struct InferenceApi<'a> {
    client: &'a Client,
    region: Region,
}

impl<'a> InferenceApi<'a> {
    pub fn new(client: &'a Client, region: Region) -> Self {
        Self { client, region }
    }

    fn path(&self, suffix: &str) -> String {
        format!("/inference/v1/regions/{}/{}", self.region, suffix)
    }

    /// POST /inference/v1/regions/{region}/deployments
    pub async fn create_deployment(
        &self,
        request: &CreateDeploymentRequest,
    ) -> Result<Deployment, ApiError> {
        self.client.post(&self.path("deployments"), request).await
    }

    /// GET /inference/v1/regions/{region}/deployments/{deployment_id}
    pub async fn get_deployment(&self, deployment_id: &str) -> Result<Deployment, ApiError> {
        self.client
            .get(&self.path(&format!("deployments/{}", deployment_id)))
            .await
    }

    /// PATCH /inference/v1/regions/{region}/deployments/{deployment_id}
    pub async fn update_deployment(
        &self,
        deployment_id: &str,
        request: &UpdateDeploymentRequest,
    ) -> Result<Deployment, ApiError> {
        self.client
            .patch(&self.path(&format!("deployments/{}", deployment_id)), request)
            .await
    }

    /// DELETE /inference/v1/regions/{region}/deployments/{deployment_id}
    pub async fn delete_deployment(&self, deployment_id: &str) -> Result<(), ApiError> {
        self.client
            .delete::<IgnoredAny>(&self.path(&format!("deployments/{}", deployment_id)))
            .await
            .map(|_| ())
    }

    /// POST /inference/v1/regions/{region}/models
    pub async fn create_model(&self, request: &CreateModelRequest) -> Result<Model, ApiError> {
        self.client.post(&self.path("models"), request).await
    }

    /// GET /inference/v1/regions/{region}/models/{model_id}
    pub async fn get_model(&self, model_id: &str) -> Result<Model, ApiError> {
        self.client
            .get(&self.path(&format!("models/{}", model_id)))
            .await
    }

    /// DELETE /inference/v1/regions/{region}/models/{model_id}
    pub async fn delete_model(&self, model_id: &str) -> Result<(), ApiError> {
        self.client
            .delete::<IgnoredAny>(&self.path(&format!("models/{}", model_id)))
            .await
            .map(|_| ())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrivateNetworkDetails {
    pub private_network_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Endpoint {
    pub id: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub public_network: Option<serde_json::Value>,
    #[serde(default)]
    pub private_network: Option<PrivateNetworkDetails>,
    #[serde(default)]
    pub disable_auth: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Deployment {
    pub id: String,
    pub name: String,
    pub project_id: String,
    pub status: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub node_type_name: String,
    #[serde(default)]
    pub model_id: String,
    #[serde(default)]
    pub model_name: String,
    #[serde(default)]
    pub min_size: u32,
    #[serde(default)]
    pub max_size: u32,
    #[serde(default)]
    pub size: u32,
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl HasStatus for Deployment {
    fn status(&self) -> &str {
        &self.status
    }

    fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EndpointSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_network: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_network: Option<PrivateNetworkDetails>,
    pub disable_auth: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateDeploymentRequest {
    pub name: String,
    pub project_id: String,
    pub model_id: String,
    pub node_type_name: String,
    pub accept_eula: bool,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_size: Option<u32>,
    pub endpoints: Vec<EndpointSpec>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateDeploymentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_size: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Model {
    pub id: String,
    pub name: String,
    pub project_id: String,
    pub status: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub has_eula: bool,
    #[serde(default)]
    pub parameter_size_bits: u32,
    #[serde(default)]
    pub size_bytes: u64,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl HasStatus for Model {
    fn status(&self) -> &str {
        &self.status
    }

    fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelSource {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateModelRequest {
    pub name: String,
    pub project_id: String,
    pub source: ModelSource,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::client::create_test_client;
    use mockito::{Matcher, Server};
    use serde_json::json;

    #[tokio::test]
    async fn model_create_sends_source() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/inference/v1/regions/fr-par/models")
            .match_body(Matcher::Json(json!({
                "name": "my-model",
                "project_id": "p",
                "source": {"url": "https://huggingface.co/org/model"}
            })))
            .with_status(200)
            .with_body(r#"{"id":"m1","name":"my-model","project_id":"p","status":"preparing"}"#)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let model = client
            .inference(Region::FrPar)
            .create_model(&CreateModelRequest {
                name: "my-model".to_string(),
                project_id: "p".to_string(),
                source: ModelSource {
                    url: "https://huggingface.co/org/model".to_string(),
                    secret: None,
                },
            })
            .await
            .unwrap();

        assert_eq!(model.status(), "preparing");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn deployment_exposes_endpoints() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/inference/v1/regions/fr-par/deployments/d1")
            .with_status(200)
            .with_body(
                r#"{"id":"d1","name":"dep","project_id":"p","status":"ready","node_type_name":"L4",
                "endpoints":[{"id":"e1","url":"https://d1.ai","public_network":{},"disable_auth":true}]}"#,
            )
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let deployment = client
            .inference(Region::FrPar)
            .get_deployment("d1")
            .await
            .unwrap();

        assert_eq!(deployment.endpoints.len(), 1);
        assert!(deployment.endpoints[0].public_network.is_some());
        assert!(deployment.endpoints[0].disable_auth);
    }
}
