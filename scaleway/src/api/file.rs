//! File Storage API: filesystems

use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};

use crate::api::{ApiError, Client};
use crate::locality::Region;
use crate::waiter::HasStatus;

pub struct FileApi<'a> {
    client: &'a Client,
    region: Region,
}

impl<'a> FileApi<'a> {
    pub fn new(client: &'a Client, region: Region) -> Self {
        Self { client, region }
    }

    fn path(&self, suffix: &str) -> String {
        format!("/file/v1alpha1/regions/{}/filesystems{}", self.region, suffix)
    }

    /// POST /file/v1alpha1/regions/{region}/filesystems
    pub async fn create_filesystem(
        &self,
        request: &CreateFilesystemRequest,
    ) -> Result<Filesystem, ApiError> {
        self.client.post(&self.path(""), request).await
    }

    /// GET /file/v1alpha1/regions/{region}/filesystems/{filesystem_id}
    pub async fn get_filesystem(&self, filesystem_id: &str) -> Result<Filesystem, ApiError> {
        self.client
            .get(&self.path(&format!("/{}", filesystem_id)))
            .await
    }

    /// PATCH /file/v1alpha1/regions/{region}/filesystems/{filesystem_id}
    pub async fn update_filesystem(
        &self,
        filesystem_id: &str,
        request: &UpdateFilesystemRequest,
    ) -> Result<Filesystem, ApiError> {
        self.client
            .patch(&self.path(&format!("/{}", filesystem_id)), request)
            .await
    }

    /// DELETE /file/v1alpha1/regions/{region}/filesystems/{filesystem_id}
    pub async fn delete_filesystem(&self, filesystem_id: &str) -> Result<(), ApiError> {
        self.client
            .delete::<IgnoredAny>(&self.path(&format!("/{}", filesystem_id)))
            .await
            .map(|_| ())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Filesystem {
    pub id: String,
    pub name: String,
    pub project_id: String,
    #[serde(default)]
    pub organization_id: String,
    /// Size in bytes
    pub size: u64,
    pub status: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub number_of_attachments: u32,
    pub region: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl HasStatus for Filesystem {
    fn status(&self) -> &str {
        &self.status
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateFilesystemRequest {
    pub name: String,
    pub project_id: String,
    pub size: u64,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateFilesystemRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::client::create_test_client;
    use mockito::Server;

    #[tokio::test]
    async fn gets_filesystem_in_region() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/file/v1alpha1/regions/nl-ams/filesystems/fs1")
            .with_status(200)
            .with_body(
                r#"{"id":"fs1","name":"data","project_id":"p","size":100000000000,
                "status":"creating","tags":["a"],"region":"nl-ams"}"#,
            )
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let fs = client.file(Region::NlAms).get_filesystem("fs1").await.unwrap();

        assert_eq!(fs.status(), "creating");
        assert_eq!(fs.size, 100_000_000_000);
    }
}
