//! Edge Services API: pipelines, their stages, and cache purges

use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};

use crate::api::common::{deserialize_duration_opt, serialize_duration_opt};
use crate::api::{ApiError, Client};
use crate::waiter::HasStatus;

const BASE: &str = "/edge-services/v1beta1";

pub struct EdgeServicesApi<'a> {
    client: &'a Client,
}

impl<'a> EdgeServicesApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// POST /edge-services/v1beta1/pipelines
    pub async fn create_pipeline(&self, request: &CreatePipelineRequest) -> Result<Pipeline, ApiError> {
        self.client.post(&format!("{}/pipelines", BASE), request).await
    }

    /// GET /edge-services/v1beta1/pipelines/{pipeline_id}
    pub async fn get_pipeline(&self, pipeline_id: &str) -> Result<Pipeline, ApiError> {
        self.client
            .get(&format!("{}/pipelines/{}", BASE, pipeline_id))
            .await
    }

    /// PATCH /edge-services/v1beta1/pipelines/{pipeline_id}
    pub async fn update_pipeline(
        &self,
        pipeline_id: &str,
        request: &UpdatePipelineRequest,
    ) -> Result<Pipeline, ApiError> {
        self.client
            .patch(&format!("{}/pipelines/{}", BASE, pipeline_id), request)
            .await
    }

    /// DELETE /edge-services/v1beta1/pipelines/{pipeline_id}
    pub async fn delete_pipeline(&self, pipeline_id: &str) -> Result<(), ApiError> {
        self.delete(&format!("{}/pipelines/{}", BASE, pipeline_id))
            .await
    }

    /// POST /edge-services/v1beta1/pipelines/{pipeline_id}/dns-stages
    pub async fn create_dns_stage(
        &self,
        pipeline_id: &str,
        request: &DnsStageRequest,
    ) -> Result<DnsStage, ApiError> {
        self.client
            .post(&format!("{}/pipelines/{}/dns-stages", BASE, pipeline_id), request)
            .await
    }

    /// GET /edge-services/v1beta1/dns-stages/{dns_stage_id}
    pub async fn get_dns_stage(&self, stage_id: &str) -> Result<DnsStage, ApiError> {
        self.client
            .get(&format!("{}/dns-stages/{}", BASE, stage_id))
            .await
    }

    /// PATCH /edge-services/v1beta1/dns-stages/{dns_stage_id}
    pub async fn update_dns_stage(
        &self,
        stage_id: &str,
        request: &DnsStageRequest,
    ) -> Result<DnsStage, ApiError> {
        self.client
            .patch(&format!("{}/dns-stages/{}", BASE, stage_id), request)
            .await
    }

    /// DELETE /edge-services/v1beta1/dns-stages/{dns_stage_id}
    pub async fn delete_dns_stage(&self, stage_id: &str) -> Result<(), ApiError> {
        self.delete(&format!("{}/dns-stages/{}", BASE, stage_id))
            .await
    }

    /// POST /edge-services/v1beta1/pipelines/{pipeline_id}/backend-stages
    pub async fn create_backend_stage(
        &self,
        pipeline_id: &str,
        request: &BackendStageRequest,
    ) -> Result<BackendStage, ApiError> {
        self.client
            .post(
                &format!("{}/pipelines/{}/backend-stages", BASE, pipeline_id),
                request,
            )
            .await
    }

    /// GET /edge-services/v1beta1/backend-stages/{backend_stage_id}
    pub async fn get_backend_stage(&self, stage_id: &str) -> Result<BackendStage, ApiError> {
        self.client
            .get(&format!("{}/backend-stages/{}", BASE, stage_id))
            .await
    }

    /// PATCH /edge-services/v1beta1/backend-stages/{backend_stage_id}
    pub async fn update_backend_stage(
        &self,
        stage_id: &str,
        request: &BackendStageRequest,
    ) -> Result<BackendStage, ApiError> {
        self.client
            .patch(&format!("{}/backend-stages/{}", BASE, stage_id), request)
            .await
    }

    /// DELETE /edge-services/v1beta1/backend-stages/{backend_stage_id}
    pub async fn delete_backend_stage(&self, stage_id: &str) -> Result<(), ApiError> {
        self.delete(&format!("{}/backend-stages/{}", BASE, stage_id))
            .await
    }

    /// POST /edge-services/v1beta1/pipelines/{pipeline_id}/cache-stages
    pub async fn create_cache_stage(
        &self,
        pipeline_id: &str,
        request: &CacheStageRequest,
    ) -> Result<CacheStage, ApiError> {
        self.client
            .post(
                &format!("{}/pipelines/{}/cache-stages", BASE, pipeline_id),
                request,
            )
            .await
    }

    /// GET /edge-services/v1beta1/cache-stages/{cache_stage_id}
    pub async fn get_cache_stage(&self, stage_id: &str) -> Result<CacheStage, ApiError> {
        self.client
            .get(&format!("{}/cache-stages/{}", BASE, stage_id))
            .await
    }

    /// PATCH /edge-services/v1beta1/cache-stages/{cache_stage_id}
    pub async fn update_cache_stage(
        &self,
        stage_id: &str,
        request: &CacheStageRequest,
    ) -> Result<CacheStage, ApiError> {
        self.client
            .patch(&format!("{}/cache-stages/{}", BASE, stage_id), request)
            .await
    }

    /// DELETE /edge-services/v1beta1/cache-stages/{cache_stage_id}
    pub async fn delete_cache_stage(&self, stage_id: &str) -> Result<(), ApiError> {
        self.delete(&format!("{}/cache-stages/{}", BASE, stage_id))
            .await
    }

    /// POST /edge-services/v1beta1/pipelines/{pipeline_id}/waf-stages
    pub async fn create_waf_stage(
        &self,
        pipeline_id: &str,
        request: &WafStageRequest,
    ) -> Result<WafStage, ApiError> {
        self.client
            .post(&format!("{}/pipelines/{}/waf-stages", BASE, pipeline_id), request)
            .await
    }

    /// GET /edge-services/v1beta1/waf-stages/{waf_stage_id}
    pub async fn get_waf_stage(&self, stage_id: &str) -> Result<WafStage, ApiError> {
        self.client
            .get(&format!("{}/waf-stages/{}", BASE, stage_id))
            .await
    }

    /// PATCH /edge-services/v1beta1/waf-stages/{waf_stage_id}
    pub async fn update_waf_stage(
        &self,
        stage_id: &str,
        request: &WafStageRequest,
    ) -> Result<WafStage, ApiError> {
        self.client
            .patch(&format!("{}/waf-stages/{}", BASE, stage_id), request)
            .await
    }

    /// DELETE /edge-services/v1beta1/waf-stages/{waf_stage_id}
    pub async fn delete_waf_stage(&self, stage_id: &str) -> Result<(), ApiError> {
        self.delete(&format!("{}/waf-stages/{}", BASE, stage_id))
            .await
    }

    /// POST /edge-services/v1beta1/pipelines/{pipeline_id}/route-stages
    pub async fn create_route_stage(
        &self,
        pipeline_id: &str,
        request: &RouteStageRequest,
    ) -> Result<RouteStage, ApiError> {
        self.client
            .post(
                &format!("{}/pipelines/{}/route-stages", BASE, pipeline_id),
                request,
            )
            .await
    }

    /// GET /edge-services/v1beta1/route-stages/{route_stage_id}
    pub async fn get_route_stage(&self, stage_id: &str) -> Result<RouteStage, ApiError> {
        self.client
            .get(&format!("{}/route-stages/{}", BASE, stage_id))
            .await
    }

    /// PATCH /edge-services/v1beta1/route-stages/{route_stage_id}
    pub async fn update_route_stage(
        &self,
        stage_id: &str,
        request: &RouteStageRequest,
    ) -> Result<RouteStage, ApiError> {
        self.client
            .patch(&format!("{}/route-stages/{}", BASE, stage_id), request)
            .await
    }

    /// DELETE /edge-services/v1beta1/route-stages/{route_stage_id}
    pub async fn delete_route_stage(&self, stage_id: &str) -> Result<(), ApiError> {
        self.delete(&format!("{}/route-stages/{}", BASE, stage_id))
            .await
    }

    /// GET /edge-services/v1beta1/route-stages/{route_stage_id}/route-rules
    pub async fn list_route_rules(&self, stage_id: &str) -> Result<Vec<RouteRule>, ApiError> {
        let response: RouteRules = self
            .client
            .get(&format!("{}/route-stages/{}/route-rules", BASE, stage_id))
            .await?;
        Ok(response.route_rules)
    }

    /// PUT /edge-services/v1beta1/route-stages/{route_stage_id}/route-rules
    ///
    /// Replaces the whole rule list; order is significant.
    pub async fn set_route_rules(
        &self,
        stage_id: &str,
        rules: Vec<RouteRule>,
    ) -> Result<Vec<RouteRule>, ApiError> {
        let response: RouteRules = self
            .client
            .put(
                &format!("{}/route-stages/{}/route-rules", BASE, stage_id),
                &RouteRules { route_rules: rules },
            )
            .await?;
        Ok(response.route_rules)
    }

    /// POST /edge-services/v1beta1/purge-requests
    pub async fn create_purge_request(
        &self,
        request: &CreatePurgeRequest,
    ) -> Result<PurgeRequest, ApiError> {
        self.client
            .post(&format!("{}/purge-requests", BASE), request)
            .await
    }

    /// GET /edge-services/v1beta1/purge-requests/{purge_request_id}
    pub async fn get_purge_request(&self, purge_id: &str) -> Result<PurgeRequest, ApiError> {
        self.client
            .get(&format!("{}/purge-requests/{}", BASE, purge_id))
            .await
    }

    /// GET /edge-services/v1beta1/pipelines/{pipeline_id}/head-stages
    pub async fn list_head_stages(&self, pipeline_id: &str) -> Result<Vec<HeadStage>, ApiError> {
        let response: HeadStages = self
            .client
            .get(&format!("{}/pipelines/{}/head-stages", BASE, pipeline_id))
            .await?;
        Ok(response.head_stages)
    }

    /// POST /edge-services/v1beta1/pipelines/{pipeline_id}/set-head-stage
    pub async fn set_head_stage(
        &self,
        pipeline_id: &str,
        change: &HeadStageChange,
    ) -> Result<Pipeline, ApiError> {
        self.client
            .post(
                &format!("{}/pipelines/{}/set-head-stage", BASE, pipeline_id),
                change,
            )
            .await
    }

    async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.client.delete::<IgnoredAny>(path).await.map(|_| ())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Pipeline {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub project_id: String,
    #[serde(default)]
    pub organization_id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatePipelineRequest {
    pub project_id: String,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdatePipelineRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DnsStage {
    pub id: String,
    pub pipeline_id: String,
    #[serde(default)]
    pub fqdns: Vec<String>,
    #[serde(rename = "type", default)]
    pub stage_type: String,
    #[serde(default)]
    pub backend_stage_id: Option<String>,
    #[serde(default)]
    pub cache_stage_id: Option<String>,
    #[serde(default)]
    pub tls_stage_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DnsStageRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fqdns: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend_stage_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_stage_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls_stage_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalewayS3Backend {
    pub bucket_name: String,
    pub bucket_region: String,
    #[serde(default)]
    pub is_website: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendStage {
    pub id: String,
    pub pipeline_id: String,
    #[serde(default)]
    pub scaleway_s3: Option<ScalewayS3Backend>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BackendStageRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scaleway_s3: Option<ScalewayS3Backend>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheStage {
    pub id: String,
    pub pipeline_id: String,
    #[serde(default, deserialize_with = "deserialize_duration_opt")]
    pub fallback_ttl: Option<i64>,
    #[serde(default)]
    pub include_cookies: bool,
    #[serde(default)]
    pub backend_stage_id: Option<String>,
    #[serde(default)]
    pub waf_stage_id: Option<String>,
    #[serde(default)]
    pub route_stage_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStageRequest {
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_duration_opt"
    )]
    pub fallback_ttl: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_cookies: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend_stage_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub waf_stage_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route_stage_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WafStage {
    pub id: String,
    pub pipeline_id: String,
    #[serde(default)]
    pub mode: String,
    #[serde(default)]
    pub paranoia_level: u32,
    #[serde(default)]
    pub backend_stage_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct WafStageRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paranoia_level: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend_stage_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RouteStage {
    pub id: String,
    pub pipeline_id: String,
    #[serde(default)]
    pub waf_stage_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RouteStageRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub waf_stage_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathFilter {
    pub path_filter_type: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleHttpMatch {
    #[serde(default)]
    pub method_filters: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_filter: Option<PathFilter>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_http_match: Option<RuleHttpMatch>,
    pub backend_stage_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct RouteRules {
    #[serde(default)]
    route_rules: Vec<RouteRule>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatePurgeRequest {
    pub pipeline_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assets: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PurgeRequest {
    pub id: String,
    pub pipeline_id: String,
    pub status: String,
    #[serde(default)]
    pub assets: Vec<String>,
    #[serde(default)]
    pub all: bool,
}

impl HasStatus for PurgeRequest {
    fn status(&self) -> &str {
        &self.status
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HeadStage {
    #[serde(default)]
    pub dns_stage_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HeadStages {
    #[serde(default)]
    head_stages: Vec<HeadStage>,
}

/// Body of `set-head-stage`; exactly one variant is sent
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HeadStageChange {
    AddNewHeadStage {
        new_stage_id: String,
    },
    SwapHeadStage {
        new_stage_id: String,
        current_stage_id: String,
    },
    RemoveHeadStage {
        remove_stage_id: String,
    },
}
