use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tfplug::Context;

use super::common::{ApiQueryParams, ScalewayErrorDetails};
use super::error::ApiError;
use crate::locality::Region;

pub const DEFAULT_API_URL: &str = "https://api.scaleway.com";
const AUTH_HEADER: &str = "X-Auth-Token";
const USER_AGENT: &str = concat!("terraform-provider-scaleway-rs/", env!("CARGO_PKG_VERSION"));

/// Scaleway API client
///
/// Clones share the connection pool. A clone made with [`Client::with_context`]
/// stops retrying once that context is done.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
    ctx: Context,
}

/// Failures after which a request may be sent again
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Replay {
    /// Idempotent methods: any transient failure
    Transient,
    /// Only when the connection was never established
    Unsent,
}

struct ClientInner {
    http_client: reqwest::Client,
    base_url: String,
    secret_key: String,
    retry_config: RetryConfig,
}

#[derive(Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub timeout_seconds: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 10000,
            timeout_seconds: 30,
        }
    }
}

impl Client {
    /// Create a new API client with default configuration
    pub fn new(api_url: &str, secret_key: &str) -> Result<Self, ApiError> {
        Self::with_config(api_url, secret_key, RetryConfig::default())
    }

    /// Create a new API client with custom retry configuration
    pub fn with_config(
        api_url: &str,
        secret_key: &str,
        retry_config: RetryConfig,
    ) -> Result<Self, ApiError> {
        url::Url::parse(api_url)
            .map_err(|e| ApiError::InvalidRequest(format!("api_url {:?}: {}", api_url, e)))?;

        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(retry_config.timeout_seconds))
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            inner: Arc::new(ClientInner {
                http_client,
                base_url: api_url.trim_end_matches('/').to_string(),
                secret_key: secret_key.to_string(),
                retry_config,
            }),
            ctx: Context::new(),
        })
    }

    /// A client whose retries give up when `ctx` is cancelled or expires
    pub fn with_context(&self, ctx: &Context) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            ctx: ctx.clone(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Execute a GET request with retry logic
    pub async fn get<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T, ApiError> {
        self.execute_with_retry(
            || async {
                let url = format!("{}{}", self.inner.base_url, path);

                tracing::debug!("GET request to: {}", url);

                self.inner
                    .http_client
                    .get(&url)
                    .header(AUTH_HEADER, &self.inner.secret_key)
                    .send()
                    .await
            },
            path,
            Replay::Transient,
        )
        .await
    }

    /// Execute a GET request with query parameters
    pub async fn get_with_params<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        params: &ApiQueryParams,
    ) -> Result<T, ApiError> {
        let full_path = format!("{}{}", path, params.to_query_string());
        self.get(&full_path).await
    }

    /// Execute a POST request; creates are not idempotent, so only a
    /// connection that never opened is retried
    pub async fn post<T: for<'de> Deserialize<'de>, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.execute_with_retry(
            || async {
                let url = format!("{}{}", self.inner.base_url, path);

                tracing::debug!("POST request to: {}", url);

                self.inner
                    .http_client
                    .post(&url)
                    .header(AUTH_HEADER, &self.inner.secret_key)
                    .json(body)
                    .send()
                    .await
            },
            path,
            Replay::Unsent,
        )
        .await
    }

    /// Execute a PATCH request with retry logic
    pub async fn patch<T: for<'de> Deserialize<'de>, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.execute_with_retry(
            || async {
                let url = format!("{}{}", self.inner.base_url, path);

                tracing::debug!("PATCH request to: {}", url);

                self.inner
                    .http_client
                    .patch(&url)
                    .header(AUTH_HEADER, &self.inner.secret_key)
                    .json(body)
                    .send()
                    .await
            },
            path,
            Replay::Transient,
        )
        .await
    }

    /// Execute a PUT request with retry logic
    pub async fn put<T: for<'de> Deserialize<'de>, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.execute_with_retry(
            || async {
                let url = format!("{}{}", self.inner.base_url, path);

                tracing::debug!("PUT request to: {}", url);

                self.inner
                    .http_client
                    .put(&url)
                    .header(AUTH_HEADER, &self.inner.secret_key)
                    .json(body)
                    .send()
                    .await
            },
            path,
            Replay::Transient,
        )
        .await
    }

    /// Execute a DELETE request with retry logic
    pub async fn delete<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T, ApiError> {
        self.execute_with_retry(
            || async {
                let url = format!("{}{}", self.inner.base_url, path);

                tracing::debug!("DELETE request to: {}", url);

                self.inner
                    .http_client
                    .delete(&url)
                    .header(AUTH_HEADER, &self.inner.secret_key)
                    .send()
                    .await
            },
            path,
            Replay::Transient,
        )
        .await
    }

    /// PUT raw bytes to a presigned URL; the signature replaces the token
    pub async fn upload(
        &self,
        presigned_url: &str,
        body: Vec<u8>,
        headers: &[(String, String)],
    ) -> Result<(), ApiError> {
        let body = Arc::new(body);
        self.execute_raw_with_retry(
            || async {
                tracing::debug!("PUT upload of {} bytes", body.len());

                let mut request = self
                    .inner
                    .http_client
                    .put(presigned_url)
                    .body(body.as_ref().clone());
                for (name, value) in headers {
                    request = request.header(name.as_str(), value.as_str());
                }
                request.send().await
            },
            "upload",
            Replay::Transient,
        )
        .await?;
        Ok(())
    }

    pub fn account(&self) -> crate::api::account::AccountApi<'_> {
        crate::api::account::AccountApi::new(self)
    }

    pub fn billing(&self) -> crate::api::billing::BillingApi<'_> {
        crate::api::billing::BillingApi::new(self)
    }

    pub fn edge_services(&self) -> crate::api::edge_services::EdgeServicesApi<'_> {
        crate::api::edge_services::EdgeServicesApi::new(self)
    }

    pub fn file(&self, region: Region) -> crate::api::file::FileApi<'_> {
        crate::api::file::FileApi::new(self, region)
    }

    pub fn function(&self, region: Region) -> crate::api::function::FunctionApi<'_> {
        crate::api::function::FunctionApi::new(self, region)
    }

    pub fn inference(&self, region: Region) -> crate::api::inference::InferenceApi<'_> {
        crate::api::inference::InferenceApi::new(self, region)
    }

    pub fn mnq(&self, region: Region) -> crate::api::mnq::MnqApi<'_> {
        crate::api::mnq::MnqApi::new(self, region)
    }

    pub fn registry(&self, region: Region) -> crate::api::registry::RegistryApi<'_> {
        crate::api::registry::RegistryApi::new(self, region)
    }

    pub fn sdb(&self, region: Region) -> crate::api::sdb::SdbApi<'_> {
        crate::api::sdb::SdbApi::new(self, region)
    }

    /// Execute request with retry logic and decode the JSON body
    async fn execute_with_retry<F, Fut, T>(
        &self,
        request_fn: F,
        path: &str,
        replay: Replay,
    ) -> Result<T, ApiError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<reqwest::Response, reqwest::Error>>,
        T: for<'de> Deserialize<'de>,
    {
        let response = self.execute_raw_with_retry(request_fn, path, replay).await?;
        self.parse_success_response(response).await
    }

    /// Execute request with retry logic, returning the successful response
    async fn execute_raw_with_retry<F, Fut>(
        &self,
        request_fn: F,
        path: &str,
        replay: Replay,
    ) -> Result<reqwest::Response, ApiError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<reqwest::Response, reqwest::Error>>,
    {
        let mut attempt = 0;
        let mut last_error = None;

        while attempt <= self.inner.retry_config.max_retries {
            if attempt > 0 {
                let backoff = std::cmp::min(
                    self.inner.retry_config.initial_backoff_ms * (2_u64.pow(attempt - 1)),
                    self.inner.retry_config.max_backoff_ms,
                );
                tracing::debug!(
                    "Retrying request to {} after {}ms (attempt {})",
                    path,
                    backoff,
                    attempt
                );
                self.ctx
                    .sleep(Duration::from_millis(backoff))
                    .await
                    .map_err(ApiError::Canceled)?;
            } else if let Some(err) = self.ctx.err() {
                return Err(ApiError::Canceled(err));
            }

            let error = match request_fn().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        return Ok(response);
                    }

                    if status == reqwest::StatusCode::UNAUTHORIZED {
                        return Err(ApiError::AuthError);
                    }

                    let rate_limited = status == reqwest::StatusCode::TOO_MANY_REQUESTS;
                    let error = if rate_limited {
                        ApiError::RateLimited
                    } else {
                        self.handle_error_response(response).await
                    };
                    if replay == Replay::Unsent || !(rate_limited || status.is_server_error()) {
                        return Err(error);
                    }
                    error
                }
                Err(e) if e.is_connect() => ApiError::ServiceUnavailable,
                Err(e) if e.is_timeout() && replay == Replay::Transient => {
                    ApiError::Timeout(self.inner.retry_config.timeout_seconds)
                }
                Err(e) if e.is_timeout() => {
                    tracing::warn!("{} timed out after it was sent, not retrying", path);
                    return Err(ApiError::Timeout(self.inner.retry_config.timeout_seconds));
                }
                Err(e) => return Err(ApiError::RequestError(e)),
            };

            last_error = Some(error);
            attempt += 1;
        }

        Err(last_error.unwrap_or(ApiError::ServiceUnavailable))
    }

    /// Parse successful response; empty bodies decode as JSON null
    async fn parse_success_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let text = response.text().await?;
        tracing::debug!("API response body: {}", text);

        let body = if text.trim().is_empty() { "null" } else { &text };
        serde_json::from_str::<T>(body).map_err(|e| {
            tracing::error!("Failed to deserialize response: {}, body: {}", e, text);
            ApiError::ParseError(format!("Failed to parse response: {}", e))
        })
    }

    /// Handle error response
    async fn handle_error_response(&self, response: reqwest::Response) -> ApiError {
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        let details = serde_json::from_str::<ScalewayErrorDetails>(&text)
            .ok()
            .map(Box::new);
        let message = match &details {
            Some(details) if !details.message.is_empty() => details.message.clone(),
            _ => text,
        };

        ApiError::ApiError {
            status,
            message,
            details,
        }
    }
}

#[cfg(test)]
pub(crate) fn create_test_client(url: &str) -> Client {
    Client::with_config(
        url,
        "11111111-1111-1111-1111-111111111111",
        RetryConfig {
            max_retries: 1,
            initial_backoff_ms: 1,
            max_backoff_ms: 1,
            timeout_seconds: 5,
        },
    )
    .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::Value;

    #[test]
    fn test_retry_config() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.initial_backoff_ms, 100);
        assert_eq!(config.max_backoff_ms, 10000);
        assert_eq!(config.timeout_seconds, 30);
    }

    #[test]
    fn rejects_invalid_api_url() {
        assert!(matches!(
            Client::new("not a url", "secret"),
            Err(ApiError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn sends_auth_token_header() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/account/v3/projects/abc")
            .match_header("x-auth-token", "11111111-1111-1111-1111-111111111111")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id":"abc"}"#)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let body: Value = client.get("/account/v3/projects/abc").await.unwrap();

        assert_eq!(body["id"], "abc");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn decodes_scaleway_error_body() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/account/v3/projects/abc")
            .with_status(404)
            .with_body(r#"{"type":"not_found","message":"resource is not found","resource":"project","resource_id":"abc"}"#)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let err = client
            .get::<Value>("/account/v3/projects/abc")
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(404));
        assert_eq!(err.error_type(), Some("not_found"));
        assert!(err.to_string().contains("resource is not found"));
    }

    #[tokio::test]
    async fn retries_server_errors() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("DELETE", "/registry/v1/regions/fr-par/namespaces/abc")
            .with_status(503)
            .with_body("busy")
            .expect(2)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let err = client
            .delete::<Value>("/registry/v1/regions/fr-par/namespaces/abc")
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(503));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn post_is_not_resent_after_server_error() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/account/v3/projects")
            .with_status(503)
            .with_body(r#"{"type":"unknown","message":"busy"}"#)
            .expect(1)
            .create_async()
            .await;

        let client = Client::new(&server.url(), "11111111-1111-1111-1111-111111111111").unwrap();
        let err = client
            .post::<Value, _>("/account/v3/projects", &serde_json::json!({"name": "billing"}))
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(503));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn post_is_not_resent_when_rate_limited() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/file/v1alpha1/regions/fr-par/filesystems")
            .with_status(429)
            .expect(1)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let err = client
            .post::<Value, _>(
                "/file/v1alpha1/regions/fr-par/filesystems",
                &serde_json::json!({"name": "shared"}),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::RateLimited));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn cancelled_context_stops_retries() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/registry/v1/regions/fr-par/namespaces/abc")
            .with_status(503)
            .expect(1)
            .create_async()
            .await;

        let ctx = Context::new();
        let client = Client::with_config(
            &server.url(),
            "11111111-1111-1111-1111-111111111111",
            RetryConfig {
                max_retries: 3,
                initial_backoff_ms: 60_000,
                max_backoff_ms: 60_000,
                timeout_seconds: 5,
            },
        )
        .unwrap()
        .with_context(&ctx);

        let canceller = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            canceller.cancel();
        });

        let started = std::time::Instant::now();
        let err = client
            .get::<Value>("/registry/v1/regions/fr-par/namespaces/abc")
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Canceled(tfplug::ContextError::Canceled)));
        assert!(started.elapsed() < Duration::from_secs(10));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn expired_context_sends_nothing() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/account/v3/projects")
            .expect(0)
            .create_async()
            .await;

        let ctx = Context::new();
        ctx.cancel();
        let client = create_test_client(&server.url()).with_context(&ctx);
        let err = client
            .post::<Value, _>("/account/v3/projects", &serde_json::json!({}))
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Canceled(_)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn empty_body_decodes_as_unit() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("DELETE", "/account/v3/projects/abc")
            .with_status(204)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let result: Result<(), ApiError> = client.delete("/account/v3/projects/abc").await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn upload_puts_bytes_without_token() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("PUT", "/bucket/function.zip")
            .match_query(Matcher::Any)
            .match_header("x-auth-token", Matcher::Missing)
            .match_header("content-type", "application/octet-stream")
            .match_body("zipdata")
            .with_status(200)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        client
            .upload(
                &format!("{}/bucket/function.zip?X-Amz-Signature=abc", server.url()),
                b"zipdata".to_vec(),
                &[(
                    "content-type".to_string(),
                    "application/octet-stream".to_string(),
                )],
            )
            .await
            .unwrap();

        mock.assert_async().await;
    }
}
