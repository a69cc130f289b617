//! Messaging and Queuing API: NATS accounts, SQS/SNS activation and credentials

use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};

use crate::api::common::ApiQueryParams;
use crate::api::{ApiError, Client};
use crate::locality::Region;

/// Activation status reported once SQS or SNS is enabled on a project
pub const STATUS_ENABLED: &str = "enabled";

/// The two AWS-compatible MNQ surfaces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MnqService {
    Sqs,
    Sns,
}

impl MnqService {
    pub fn as_str(&self) -> &'static str {
        match self {
            MnqService::Sqs => "sqs",
            MnqService::Sns => "sns",
        }
    }
}

pub struct MnqApi<'a> {
    client: &'a Client,
    region: Region,
}

impl<'a> MnqApi<'a> {
    pub fn new(client: &'a Client, region: Region) -> Self {
        Self { client, region }
    }

    fn path(&self, suffix: &str) -> String {
        format!("/mnq/v1beta1/regions/{}/{}", self.region, suffix)
    }

    async fn delete(&self, suffix: &str) -> Result<(), ApiError> {
        self.client
            .delete::<IgnoredAny>(&self.path(suffix))
            .await
            .map(|_| ())
    }

    /// POST /mnq/v1beta1/regions/{region}/nats-accounts
    pub async fn create_nats_account(
        &self,
        project_id: &str,
        name: &str,
    ) -> Result<NatsAccount, ApiError> {
        self.client
            .post(
                &self.path("nats-accounts"),
                &serde_json::json!({"project_id": project_id, "name": name}),
            )
            .await
    }

    /// GET /mnq/v1beta1/regions/{region}/nats-accounts/{nats_account_id}
    pub async fn get_nats_account(&self, account_id: &str) -> Result<NatsAccount, ApiError> {
        self.client
            .get(&self.path(&format!("nats-accounts/{}", account_id)))
            .await
    }

    /// PATCH /mnq/v1beta1/regions/{region}/nats-accounts/{nats_account_id}
    pub async fn update_nats_account(
        &self,
        account_id: &str,
        name: &str,
    ) -> Result<NatsAccount, ApiError> {
        self.client
            .patch(
                &self.path(&format!("nats-accounts/{}", account_id)),
                &serde_json::json!({"name": name}),
            )
            .await
    }

    /// DELETE /mnq/v1beta1/regions/{region}/nats-accounts/{nats_account_id}
    pub async fn delete_nats_account(&self, account_id: &str) -> Result<(), ApiError> {
        self.delete(&format!("nats-accounts/{}", account_id)).await
    }

    /// POST /mnq/v1beta1/regions/{region}/nats-credentials
    pub async fn create_nats_credentials(
        &self,
        account_id: &str,
        name: &str,
    ) -> Result<NatsCredentials, ApiError> {
        self.client
            .post(
                &self.path("nats-credentials"),
                &serde_json::json!({"nats_account_id": account_id, "name": name}),
            )
            .await
    }

    /// GET /mnq/v1beta1/regions/{region}/nats-credentials/{nats_credentials_id}
    pub async fn get_nats_credentials(
        &self,
        credentials_id: &str,
    ) -> Result<NatsCredentials, ApiError> {
        self.client
            .get(&self.path(&format!("nats-credentials/{}", credentials_id)))
            .await
    }

    /// DELETE /mnq/v1beta1/regions/{region}/nats-credentials/{nats_credentials_id}
    pub async fn delete_nats_credentials(&self, credentials_id: &str) -> Result<(), ApiError> {
        self.delete(&format!("nats-credentials/{}", credentials_id))
            .await
    }

    /// POST /mnq/v1beta1/regions/{region}/activate-{sqs,sns}
    pub async fn activate(&self, service: MnqService, project_id: &str) -> Result<ServiceInfo, ApiError> {
        self.client
            .post(
                &self.path(&format!("activate-{}", service.as_str())),
                &serde_json::json!({"project_id": project_id}),
            )
            .await
    }

    /// POST /mnq/v1beta1/regions/{region}/deactivate-{sqs,sns}
    pub async fn deactivate(
        &self,
        service: MnqService,
        project_id: &str,
    ) -> Result<ServiceInfo, ApiError> {
        self.client
            .post(
                &self.path(&format!("deactivate-{}", service.as_str())),
                &serde_json::json!({"project_id": project_id}),
            )
            .await
    }

    /// GET /mnq/v1beta1/regions/{region}/{sqs,sns}-info
    pub async fn get_info(&self, service: MnqService, project_id: &str) -> Result<ServiceInfo, ApiError> {
        let params = ApiQueryParams::new().add("project_id", project_id);
        self.client
            .get_with_params(&self.path(&format!("{}-info", service.as_str())), &params)
            .await
    }

    /// POST /mnq/v1beta1/regions/{region}/{sqs,sns}-credentials
    pub async fn create_credentials(
        &self,
        service: MnqService,
        request: &CredentialsRequest,
    ) -> Result<Credentials, ApiError> {
        self.client
            .post(
                &self.path(&format!("{}-credentials", service.as_str())),
                request,
            )
            .await
    }

    /// GET /mnq/v1beta1/regions/{region}/{sqs,sns}-credentials/{credentials_id}
    pub async fn get_credentials(
        &self,
        service: MnqService,
        credentials_id: &str,
    ) -> Result<Credentials, ApiError> {
        self.client
            .get(&self.path(&format!(
                "{}-credentials/{}",
                service.as_str(),
                credentials_id
            )))
            .await
    }

    /// PATCH /mnq/v1beta1/regions/{region}/{sqs,sns}-credentials/{credentials_id}
    pub async fn update_credentials(
        &self,
        service: MnqService,
        credentials_id: &str,
        request: &CredentialsRequest,
    ) -> Result<Credentials, ApiError> {
        self.client
            .patch(
                &self.path(&format!(
                    "{}-credentials/{}",
                    service.as_str(),
                    credentials_id
                )),
                request,
            )
            .await
    }

    /// DELETE /mnq/v1beta1/regions/{region}/{sqs,sns}-credentials/{credentials_id}
    pub async fn delete_credentials(
        &self,
        service: MnqService,
        credentials_id: &str,
    ) -> Result<(), ApiError> {
        self.delete(&format!("{}-credentials/{}", service.as_str(), credentials_id))
            .await
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NatsAccount {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub endpoint: String,
    pub project_id: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NatsFile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NatsCredentials {
    pub id: String,
    pub name: String,
    pub nats_account_id: String,
    /// Only returned by create
    #[serde(default)]
    pub credentials: Option<NatsFile>,
    #[serde(default)]
    pub checksum: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Activation state of SQS or SNS on a project
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceInfo {
    pub project_id: String,
    #[serde(default)]
    pub region: String,
    pub status: String,
    #[serde(default, alias = "sqs_endpoint_url", alias = "sns_endpoint_url")]
    pub endpoint_url: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl ServiceInfo {
    pub fn is_enabled(&self) -> bool {
        self.status == STATUS_ENABLED
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    #[serde(default)]
    pub can_publish: bool,
    #[serde(default)]
    pub can_receive: bool,
    #[serde(default)]
    pub can_manage: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CredentialsRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Permissions>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub id: String,
    pub name: String,
    pub project_id: String,
    #[serde(default)]
    pub region: String,
    pub access_key: String,
    /// Only returned by create
    #[serde(default)]
    pub secret_key: Option<String>,
    #[serde(default)]
    pub permissions: Option<Permissions>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::client::create_test_client;
    use mockito::{Matcher, Server};
    use serde_json::json;

    #[tokio::test]
    async fn sqs_info_reads_endpoint() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/mnq/v1beta1/regions/fr-par/sqs-info")
            .match_query(Matcher::UrlEncoded("project_id".into(), "p".into()))
            .with_status(200)
            .with_body(
                r#"{"project_id":"p","region":"fr-par","status":"enabled",
                "sqs_endpoint_url":"https://sqs.mnq.fr-par.scaleway.com"}"#,
            )
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let info = client
            .mnq(Region::FrPar)
            .get_info(MnqService::Sqs, "p")
            .await
            .unwrap();

        assert!(info.is_enabled());
        assert_eq!(info.endpoint_url, "https://sqs.mnq.fr-par.scaleway.com");
    }

    #[tokio::test]
    async fn sns_credentials_create_sends_permissions() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/mnq/v1beta1/regions/pl-waw/sns-credentials")
            .match_body(Matcher::Json(json!({
                "project_id": "p",
                "name": "creds",
                "permissions": {"can_publish": true, "can_receive": false, "can_manage": true}
            })))
            .with_status(200)
            .with_body(
                r#"{"id":"c1","name":"creds","project_id":"p","access_key":"AK","secret_key":"SK",
                "permissions":{"can_publish":true,"can_receive":false,"can_manage":true}}"#,
            )
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let credentials = client
            .mnq(Region::PlWaw)
            .create_credentials(
                MnqService::Sns,
                &CredentialsRequest {
                    project_id: Some("p".to_string()),
                    name: Some("creds".to_string()),
                    permissions: Some(Permissions {
                        can_publish: true,
                        can_receive: false,
                        can_manage: true,
                    }),
                },
            )
            .await
            .unwrap();

        assert_eq!(credentials.secret_key.as_deref(), Some("SK"));
        mock.assert_async().await;
    }
}
