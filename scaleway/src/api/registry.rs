//! Container Registry API: namespaces

use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};

use crate::api::{ApiError, Client};
use crate::locality::Region;
use crate::waiter::HasStatus;

pub struct RegistryApi<'a> {
    client: &'a Client,
    region: Region,
}

impl<'a> RegistryApi<'a> {
    pub fn new(client: &'a Client, region: Region) -> Self {
        Self { client, region }
    }

    fn path(&self, suffix: &str) -> String {
        format!("/registry/v1/regions/{}/namespaces{}", self.region, suffix)
    }

    /// POST /registry/v1/regions/{region}/namespaces
    pub async fn create_namespace(
        &self,
        request: &CreateNamespaceRequest,
    ) -> Result<Namespace, ApiError> {
        self.client.post(&self.path(""), request).await
    }

    /// GET /registry/v1/regions/{region}/namespaces/{namespace_id}
    pub async fn get_namespace(&self, namespace_id: &str) -> Result<Namespace, ApiError> {
        self.client
            .get(&self.path(&format!("/{}", namespace_id)))
            .await
    }

    /// PATCH /registry/v1/regions/{region}/namespaces/{namespace_id}
    pub async fn update_namespace(
        &self,
        namespace_id: &str,
        request: &UpdateNamespaceRequest,
    ) -> Result<Namespace, ApiError> {
        self.client
            .patch(&self.path(&format!("/{}", namespace_id)), request)
            .await
    }

    /// DELETE /registry/v1/regions/{region}/namespaces/{namespace_id}
    pub async fn delete_namespace(&self, namespace_id: &str) -> Result<(), ApiError> {
        self.client
            .delete::<IgnoredAny>(&self.path(&format!("/{}", namespace_id)))
            .await
            .map(|_| ())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Namespace {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub project_id: String,
    #[serde(default)]
    pub organization_id: String,
    pub status: String,
    #[serde(default)]
    pub status_message: String,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub region: String,
}

impl HasStatus for Namespace {
    fn status(&self) -> &str {
        &self.status
    }

    fn error_message(&self) -> Option<&str> {
        Some(self.status_message.as_str()).filter(|m| !m.is_empty())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateNamespaceRequest {
    pub name: String,
    pub description: String,
    pub project_id: String,
    pub is_public: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateNamespaceRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,
}
