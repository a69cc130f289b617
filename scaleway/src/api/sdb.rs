//! Serverless SQL Database API

use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};

use crate::api::{ApiError, Client};
use crate::locality::Region;
use crate::waiter::HasStatus;

pub struct SdbApi<'a> {
    client: &'a Client,
    region: Region,
}

impl<'a> SdbApi<'a> {
    pub fn new(client: &'a Client, region: Region) -> Self {
        Self { client, region }
    }

    fn path(&self, suffix: &str) -> String {
        format!(
            "/serverless-sqldb/v1alpha1/regions/{}/databases{}",
            self.region, suffix
        )
    }

    /// POST /serverless-sqldb/v1alpha1/regions/{region}/databases
    pub async fn create_database(
        &self,
        request: &CreateDatabaseRequest,
    ) -> Result<Database, ApiError> {
        self.client.post(&self.path(""), request).await
    }

    /// GET /serverless-sqldb/v1alpha1/regions/{region}/databases/{database_id}
    pub async fn get_database(&self, database_id: &str) -> Result<Database, ApiError> {
        self.client
            .get(&self.path(&format!("/{}", database_id)))
            .await
    }

    /// PATCH /serverless-sqldb/v1alpha1/regions/{region}/databases/{database_id}
    pub async fn update_database(
        &self,
        database_id: &str,
        request: &UpdateDatabaseRequest,
    ) -> Result<Database, ApiError> {
        self.client
            .patch(&self.path(&format!("/{}", database_id)), request)
            .await
    }

    /// DELETE /serverless-sqldb/v1alpha1/regions/{region}/databases/{database_id}
    pub async fn delete_database(&self, database_id: &str) -> Result<(), ApiError> {
        self.client
            .delete::<IgnoredAny>(&self.path(&format!("/{}", database_id)))
            .await
            .map(|_| ())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Database {
    pub id: String,
    pub name: String,
    pub project_id: String,
    #[serde(default)]
    pub organization_id: String,
    pub status: String,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub cpu_min: u32,
    #[serde(default)]
    pub cpu_max: u32,
    #[serde(default)]
    pub cpu_current: u32,
    #[serde(default)]
    pub region: String,
}

impl HasStatus for Database {
    fn status(&self) -> &str {
        &self.status
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateDatabaseRequest {
    pub project_id: String,
    pub name: String,
    pub cpu_min: u32,
    pub cpu_max: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_backup_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateDatabaseRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_min: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_max: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::client::create_test_client;
    use mockito::{Matcher, Server};
    use serde_json::json;

    #[tokio::test]
    async fn create_omits_missing_backup() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/serverless-sqldb/v1alpha1/regions/fr-par/databases")
            .match_body(Matcher::Json(json!({
                "project_id": "p", "name": "db", "cpu_min": 0, "cpu_max": 4
            })))
            .with_status(200)
            .with_body(r#"{"id":"db1","name":"db","project_id":"p","status":"creating","cpu_max":4}"#)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let db = client
            .sdb(Region::FrPar)
            .create_database(&CreateDatabaseRequest {
                project_id: "p".to_string(),
                name: "db".to_string(),
                cpu_min: 0,
                cpu_max: 4,
                from_backup_id: None,
            })
            .await
            .unwrap();

        assert_eq!(db.status(), "creating");
        mock.assert_async().await;
    }
}
