//! Account API: projects

use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};

use crate::api::{ApiError, Client};

pub struct AccountApi<'a> {
    client: &'a Client,
}

impl<'a> AccountApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// POST /account/v3/projects
    pub async fn create_project(&self, request: &CreateProjectRequest) -> Result<Project, ApiError> {
        self.client.post("/account/v3/projects", request).await
    }

    /// GET /account/v3/projects/{project_id}
    pub async fn get_project(&self, project_id: &str) -> Result<Project, ApiError> {
        let path = format!("/account/v3/projects/{}", project_id);
        self.client.get(&path).await
    }

    /// PATCH /account/v3/projects/{project_id}
    pub async fn update_project(
        &self,
        project_id: &str,
        request: &UpdateProjectRequest,
    ) -> Result<Project, ApiError> {
        let path = format!("/account/v3/projects/{}", project_id);
        self.client.patch(&path, request).await
    }

    /// DELETE /account/v3/projects/{project_id}
    pub async fn delete_project(&self, project_id: &str) -> Result<(), ApiError> {
        let path = format!("/account/v3/projects/{}", project_id);
        self.client.delete::<IgnoredAny>(&path).await.map(|_| ())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub organization_id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateProjectRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
    pub description: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateProjectRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::client::create_test_client;
    use mockito::{Matcher, Server};

    const PROJECT: &str = r#"{
        "id": "d4730602-0495-4bb6-bb94-de3a9b000660",
        "name": "tf_tests_project_basic",
        "organization_id": "11111111-2222-3333-4444-555555555555",
        "description": "a description",
        "created_at": "2024-05-01T10:00:00Z",
        "updated_at": "2024-05-01T10:00:00Z"
    }"#;

    #[tokio::test]
    async fn creates_project_with_organization() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/account/v3/projects")
            .match_body(Matcher::Json(serde_json::json!({
                "name": "tf_tests_project_basic",
                "organization_id": "11111111-2222-3333-4444-555555555555",
                "description": "a description"
            })))
            .with_status(200)
            .with_body(PROJECT)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let project = client
            .account()
            .create_project(&CreateProjectRequest {
                name: "tf_tests_project_basic".to_string(),
                organization_id: Some("11111111-2222-3333-4444-555555555555".to_string()),
                description: "a description".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(project.id, "d4730602-0495-4bb6-bb94-de3a9b000660");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn update_sends_only_changed_fields() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("PATCH", "/account/v3/projects/abc")
            .match_body(Matcher::Json(serde_json::json!({"description": "new"})))
            .with_status(200)
            .with_body(PROJECT)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        client
            .account()
            .update_project(
                "abc",
                &UpdateProjectRequest {
                    description: Some("new".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn delete_ignores_response_body() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("DELETE", "/account/v3/projects/abc")
            .with_status(200)
            .with_body(PROJECT)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        assert!(client.account().delete_project("abc").await.is_ok());
    }
}
