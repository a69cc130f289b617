//! Classification of API errors into the kinds handlers act on

use crate::api::ApiError;

pub const QUEUE_DELETED_RECENTLY: &str = "AWS.SimpleQueueService.QueueDeletedRecently";
pub const NON_EXISTENT_QUEUE: &str = "AWS.SimpleQueueService.NonExistentQueue";
pub const ACCESS_DENIED: &str = "AccessDeniedException";

/// AWS-compatible codes meaning the queue, topic or subscription is gone
const AWS_NOT_FOUND_CODES: &[&str] = &[NON_EXISTENT_QUEUE, "QueueDoesNotExist", "NotFound"];

/// Message prefix returned while a custom domain's CNAME is not visible yet
const DNS_NOT_VALIDATED_PREFIX: &str = "could not validate domain";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorClass {
    NotFound,
    Forbidden,
    AwsCode(String),
    DnsNotYetValidated,
    Transient,
    Other,
}

/// Per-service tweaks to classification
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorPolicy {
    /// Error `type` of a 403 body that means the resource is gone
    pub forbidden_as_not_found: Option<&'static str>,
}

impl ErrorPolicy {
    /// The account API answers 403 `permissions_denied` for deleted projects
    pub const ACCOUNT: ErrorPolicy = ErrorPolicy {
        forbidden_as_not_found: Some("permissions_denied"),
    };
}

pub fn classify(err: &ApiError) -> ErrorClass {
    classify_with(err, &ErrorPolicy::default())
}

pub fn classify_with(err: &ApiError, policy: &ErrorPolicy) -> ErrorClass {
    match err {
        ApiError::ApiError { status: 404, .. } => ErrorClass::NotFound,
        ApiError::ApiError { status: 403, .. } => match policy.forbidden_as_not_found {
            Some(sentinel) if err.error_type() == Some(sentinel) => ErrorClass::NotFound,
            _ => ErrorClass::Forbidden,
        },
        ApiError::ApiError { message, .. } if message.starts_with(DNS_NOT_VALIDATED_PREFIX) => {
            ErrorClass::DnsNotYetValidated
        }
        ApiError::ApiError { status, .. } if *status >= 500 => ErrorClass::Transient,
        ApiError::RateLimited | ApiError::ServiceUnavailable | ApiError::Timeout(_) => {
            ErrorClass::Transient
        }
        ApiError::RequestError(e) if e.is_timeout() || e.is_connect() => ErrorClass::Transient,
        ApiError::Aws { code, .. } => ErrorClass::AwsCode(code.clone()),
        _ => ErrorClass::Other,
    }
}

/// NotFound from either the Scaleway or the AWS-compatible surface
pub fn is_not_found(err: &ApiError) -> bool {
    is_not_found_with(err, &ErrorPolicy::default())
}

pub fn is_not_found_with(err: &ApiError, policy: &ErrorPolicy) -> bool {
    match classify_with(err, policy) {
        ErrorClass::NotFound => true,
        ErrorClass::AwsCode(code) => AWS_NOT_FOUND_CODES.contains(&code.as_str()),
        _ => false,
    }
}

pub fn has_aws_code(err: &ApiError, codes: &[&str]) -> bool {
    matches!(classify(err), ErrorClass::AwsCode(code) if codes.contains(&code.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::common::ScalewayErrorDetails;

    fn api_error(status: u16, error_type: &str, message: &str) -> ApiError {
        ApiError::ApiError {
            status,
            message: message.to_string(),
            details: Some(Box::new(ScalewayErrorDetails {
                error_type: error_type.to_string(),
                message: message.to_string(),
                ..Default::default()
            })),
        }
    }

    #[test]
    fn classifies_http_statuses() {
        assert_eq!(
            classify(&api_error(404, "not_found", "gone")),
            ErrorClass::NotFound
        );
        assert_eq!(
            classify(&api_error(403, "permissions_denied", "no")),
            ErrorClass::Forbidden
        );
        assert_eq!(
            classify(&api_error(502, "", "bad gateway")),
            ErrorClass::Transient
        );
        assert_eq!(classify(&ApiError::RateLimited), ErrorClass::Transient);
        assert_eq!(
            classify(&api_error(400, "invalid_arguments", "bad")),
            ErrorClass::Other
        );
    }

    #[test]
    fn account_policy_tombstones_forbidden() {
        let err = api_error(403, "permissions_denied", "insufficient permissions");
        assert_eq!(
            classify_with(&err, &ErrorPolicy::ACCOUNT),
            ErrorClass::NotFound
        );
        assert!(is_not_found_with(&err, &ErrorPolicy::ACCOUNT));
        assert!(!is_not_found(&err));

        let other = api_error(403, "quotas_exceeded", "quota");
        assert_eq!(
            classify_with(&other, &ErrorPolicy::ACCOUNT),
            ErrorClass::Forbidden
        );
    }

    #[test]
    fn recognises_dns_validation_message() {
        let err = api_error(
            400,
            "invalid_arguments",
            "could not validate domain: CNAME not found",
        );
        assert_eq!(classify(&err), ErrorClass::DnsNotYetValidated);
    }

    #[test]
    fn aws_codes_are_surfaced() {
        let err = ApiError::Aws {
            code: QUEUE_DELETED_RECENTLY.to_string(),
            message: "wait 60 seconds".to_string(),
        };
        assert_eq!(
            classify(&err),
            ErrorClass::AwsCode(QUEUE_DELETED_RECENTLY.to_string())
        );
        assert!(has_aws_code(&err, &[QUEUE_DELETED_RECENTLY]));
        assert!(!has_aws_code(&err, &[ACCESS_DENIED]));
        assert!(!is_not_found(&err));

        let gone = ApiError::Aws {
            code: NON_EXISTENT_QUEUE.to_string(),
            message: String::new(),
        };
        assert!(is_not_found(&gone));
    }
}
