use thiserror::Error;

use super::common::ScalewayErrorDetails;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("scaleway API returned error (HTTP {status}): {message}")]
    ApiError {
        status: u16,
        message: String,
        #[source]
        details: Option<Box<ScalewayErrorDetails>>,
    },

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Authentication failed")]
    AuthError,

    #[error("Request timeout after {0} seconds")]
    Timeout(u64),

    #[error("Too many requests, rate limited")]
    RateLimited,

    #[error("Service unavailable, retry later")]
    ServiceUnavailable,

    /// Error returned by the SQS/SNS compatible endpoints
    #[error("{code}: {message}")]
    Aws { code: String, message: String },

    #[error("AWS-compatible request failed: {0}")]
    AwsTransport(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("request abandoned: {0}")]
    Canceled(tfplug::ContextError),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::ApiError { status, .. } => Some(*status),
            ApiError::AuthError => Some(401),
            ApiError::RateLimited => Some(429),
            _ => None,
        }
    }

    /// The `type` field of a Scaleway error body
    pub fn error_type(&self) -> Option<&str> {
        match self {
            ApiError::ApiError {
                details: Some(details),
                ..
            } => Some(details.error_type.as_str()),
            _ => None,
        }
    }

    pub fn aws_code(&self) -> Option<&str> {
        match self {
            ApiError::Aws { code, .. } => Some(code.as_str()),
            _ => None,
        }
    }
}
