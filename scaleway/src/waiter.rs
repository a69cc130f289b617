//! Polling asynchronous Scaleway resources until they settle
//!
//! A family names the statuses at which polling stops. `NotFound` is
//! returned to the caller, which decides between tombstone and error.

use std::future::Future;
use std::time::Duration;

use tfplug::{Context, ContextError};

use crate::api::ApiError;
use crate::errors::{classify, ErrorClass};

const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);
const SLOW_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, thiserror::Error)]
pub enum WaitError {
    #[error("resource not found")]
    NotFound,

    #[error("timeout while waiting for {family} (last status: {})", .last_status.as_deref().unwrap_or("none"))]
    Timeout {
        family: &'static str,
        last_status: Option<String>,
    },

    #[error("context canceled")]
    Canceled,

    #[error("{family} is in status {status}: {message}")]
    Failed {
        family: &'static str,
        status: String,
        message: String,
    },

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl WaitError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, WaitError::NotFound)
    }

    fn from_context(err: ContextError, family: &'static str, last_status: Option<String>) -> Self {
        match err {
            ContextError::Canceled => WaitError::Canceled,
            ContextError::DeadlineExceeded => WaitError::Timeout {
                family,
                last_status,
            },
        }
    }
}

/// Anything carrying a backend status string
pub trait HasStatus {
    fn status(&self) -> &str;

    fn error_message(&self) -> Option<&str> {
        None
    }
}

/// Terminal statuses of one resource family
#[derive(Debug, Clone, Copy)]
pub struct WaitFamily {
    pub name: &'static str,
    pub ready: &'static [&'static str],
    pub failure: &'static [&'static str],
    /// Terminal statuses that still mean "keep polling" after a delete
    pub deletion_hold: &'static [&'static str],
    pub default_interval: Duration,
}

impl WaitFamily {
    pub fn is_terminal(&self, status: &str) -> bool {
        self.ready.contains(&status) || self.failure.contains(&status)
    }

    pub fn is_failure(&self, status: &str) -> bool {
        self.failure.contains(&status)
    }

    /// The configured interval when non-zero, otherwise the family default
    pub fn interval(&self, configured: Option<Duration>) -> Duration {
        configured
            .filter(|d| !d.is_zero())
            .unwrap_or(self.default_interval)
    }
}

pub const FUNCTION: WaitFamily = WaitFamily {
    name: "function",
    ready: &["ready", "created"],
    failure: &["error"],
    deletion_hold: &[],
    default_interval: DEFAULT_INTERVAL,
};

pub const FUNCTION_NAMESPACE: WaitFamily = WaitFamily {
    name: "function namespace",
    ready: &["ready"],
    failure: &["error"],
    deletion_hold: &[],
    default_interval: DEFAULT_INTERVAL,
};

pub const FUNCTION_CRON: WaitFamily = WaitFamily {
    name: "function cron",
    ready: &["ready"],
    failure: &["error"],
    deletion_hold: &[],
    default_interval: DEFAULT_INTERVAL,
};

pub const FUNCTION_DOMAIN: WaitFamily = WaitFamily {
    name: "function domain",
    ready: &["ready"],
    failure: &["error"],
    deletion_hold: &[],
    default_interval: DEFAULT_INTERVAL,
};

pub const FUNCTION_TRIGGER: WaitFamily = WaitFamily {
    name: "function trigger",
    ready: &["ready"],
    failure: &["error"],
    deletion_hold: &[],
    default_interval: DEFAULT_INTERVAL,
};

pub const INFERENCE_DEPLOYMENT: WaitFamily = WaitFamily {
    name: "inference deployment",
    ready: &["ready"],
    failure: &["error"],
    deletion_hold: &[],
    default_interval: SLOW_INTERVAL,
};

pub const INFERENCE_MODEL: WaitFamily = WaitFamily {
    name: "inference model",
    ready: &["ready"],
    failure: &["error"],
    deletion_hold: &[],
    default_interval: SLOW_INTERVAL,
};

pub const PURGE_REQUEST: WaitFamily = WaitFamily {
    name: "purge request",
    ready: &["done", "succeeded"],
    failure: &["error"],
    deletion_hold: &[],
    default_interval: DEFAULT_INTERVAL,
};

pub const FILE_SYSTEM: WaitFamily = WaitFamily {
    name: "file system",
    ready: &["available"],
    failure: &["error"],
    deletion_hold: &[],
    default_interval: DEFAULT_INTERVAL,
};

pub const REGISTRY_NAMESPACE: WaitFamily = WaitFamily {
    name: "registry namespace",
    ready: &["ready", "locked", "error", "unknown", "deleting"],
    failure: &[],
    deletion_hold: &["deleting"],
    default_interval: DEFAULT_INTERVAL,
};

pub const SQL_DATABASE: WaitFamily = WaitFamily {
    name: "serverless sql database",
    ready: &["ready"],
    failure: &["error"],
    deletion_hold: &[],
    default_interval: DEFAULT_INTERVAL,
};

/// Poll `get` until the resource reaches a terminal status
///
/// Transient errors are retried; any other error, `NotFound` included,
/// ends the wait. The context deadline turns into `Timeout`.
pub async fn wait_for<T, F, Fut>(
    ctx: &Context,
    family: &WaitFamily,
    interval: Duration,
    mut get: F,
) -> Result<T, WaitError>
where
    T: HasStatus,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let mut last_status: Option<String> = None;

    loop {
        if let Some(err) = ctx.err() {
            return Err(WaitError::from_context(err, family.name, last_status));
        }

        let result = tokio::select! {
            biased;
            err = ctx.done() => return Err(WaitError::from_context(err, family.name, last_status)),
            result = get() => result,
        };

        match result {
            Ok(resource) => {
                let status = resource.status().to_string();
                tracing::debug!("{} status: {}", family.name, status);
                if family.is_terminal(&status) {
                    return Ok(resource);
                }
                last_status = Some(status);
            }
            Err(err) => match classify(&err) {
                ErrorClass::NotFound => return Err(WaitError::NotFound),
                ErrorClass::Transient => {
                    tracing::debug!("transient error while waiting for {}: {}", family.name, err);
                }
                _ => return Err(WaitError::Api(err)),
            },
        }

        if let Err(err) = ctx.sleep(interval).await {
            return Err(WaitError::from_context(err, family.name, last_status));
        }
    }
}

/// Poll after a delete until the resource is gone
///
/// `NotFound` is success. Non-terminal and hold statuses keep polling;
/// any other terminal status ends the wait.
pub async fn wait_for_deletion<T, F, Fut>(
    ctx: &Context,
    family: &WaitFamily,
    interval: Duration,
    mut get: F,
) -> Result<(), WaitError>
where
    T: HasStatus,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let mut last_status: Option<String> = None;

    loop {
        if let Some(err) = ctx.err() {
            return Err(WaitError::from_context(err, family.name, last_status));
        }

        let result = tokio::select! {
            biased;
            err = ctx.done() => return Err(WaitError::from_context(err, family.name, last_status)),
            result = get() => result,
        };

        match result {
            Ok(resource) => {
                let status = resource.status().to_string();
                tracing::debug!("{} status while deleting: {}", family.name, status);
                let holding = family.deletion_hold.contains(&status.as_str());
                if family.is_terminal(&status) && !holding {
                    return Ok(());
                }
                last_status = Some(status);
            }
            Err(err) => match classify(&err) {
                ErrorClass::NotFound => return Ok(()),
                ErrorClass::Transient => {
                    tracing::debug!("transient error while deleting {}: {}", family.name, err);
                }
                _ => return Err(WaitError::Api(err)),
            },
        }

        if let Err(err) = ctx.sleep(interval).await {
            return Err(WaitError::from_context(err, family.name, last_status));
        }
    }
}

/// Turn a failure status into `Failed`, passing ready resources through
pub fn ensure_ready<T: HasStatus>(family: &WaitFamily, resource: T) -> Result<T, WaitError> {
    if family.is_failure(resource.status()) {
        return Err(WaitError::Failed {
            family: family.name,
            status: resource.status().to_string(),
            message: resource.error_message().unwrap_or_default().to_string(),
        });
    }
    Ok(resource)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::common::ScalewayErrorDetails;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    #[derive(Debug)]
    struct Polled(&'static str);

    impl HasStatus for Polled {
        fn status(&self) -> &str {
            self.0
        }

        fn error_message(&self) -> Option<&str> {
            Some("build failed")
        }
    }

    enum Step {
        Status(&'static str),
        Error(u16),
    }

    fn script(steps: Vec<Step>) -> impl FnMut() -> std::future::Ready<Result<Polled, ApiError>> {
        let steps = Arc::new(Mutex::new(VecDeque::from(steps)));
        move || {
            let step = steps.lock().unwrap().pop_front();
            std::future::ready(match step {
                Some(Step::Status(status)) => Ok(Polled(status)),
                Some(Step::Error(status)) => Err(ApiError::ApiError {
                    status,
                    message: "error".to_string(),
                    details: Some(Box::new(ScalewayErrorDetails::default())),
                }),
                None => Ok(Polled("pending")),
            })
        }
    }

    const TICK: Duration = Duration::from_millis(1);

    #[tokio::test]
    async fn waits_until_terminal_status() {
        let ctx = Context::new();
        let result = wait_for(
            &ctx,
            &FUNCTION,
            TICK,
            script(vec![
                Step::Status("pending"),
                Step::Error(503),
                Step::Status("ready"),
            ]),
        )
        .await
        .unwrap();

        assert_eq!(result.0, "ready");
    }

    #[tokio::test]
    async fn failure_status_is_terminal() {
        let ctx = Context::new();
        let result = wait_for(&ctx, &FUNCTION, TICK, script(vec![Step::Status("error")]))
            .await
            .unwrap();

        assert!(matches!(
            ensure_ready(&FUNCTION, result),
            Err(WaitError::Failed { status, message, .. }) if status == "error" && message == "build failed"
        ));
    }

    #[tokio::test]
    async fn not_found_and_client_errors_stop_polling() {
        let ctx = Context::new();
        let err = wait_for(&ctx, &FUNCTION, TICK, script(vec![Step::Error(404)]))
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        let err = wait_for(&ctx, &FUNCTION, TICK, script(vec![Step::Error(400)]))
            .await
            .unwrap_err();
        assert!(matches!(err, WaitError::Api(_)));
    }

    #[tokio::test]
    async fn deadline_becomes_timeout() {
        let ctx = Context::new().with_timeout(Duration::from_millis(20));
        let err = wait_for(&ctx, &FILE_SYSTEM, TICK, script(vec![]))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            WaitError::Timeout { family: "file system", last_status: Some(ref s) } if s == "pending"
        ));
    }

    #[tokio::test]
    async fn cancellation_stops_waiting() {
        let ctx = Context::new();
        ctx.cancel();
        let err = wait_for(&ctx, &FUNCTION, TICK, script(vec![]))
            .await
            .unwrap_err();

        assert!(matches!(err, WaitError::Canceled));
    }

    #[tokio::test]
    async fn registry_deletion_holds_on_deleting() {
        let ctx = Context::new();
        let calls = Arc::new(Mutex::new(0));
        let counter = calls.clone();
        let mut inner = script(vec![
            Step::Status("deleting"),
            Step::Status("deleting"),
            Step::Error(404),
        ]);

        wait_for_deletion(&ctx, &REGISTRY_NAMESPACE, TICK, move || {
            *counter.lock().unwrap() += 1;
            inner()
        })
        .await
        .unwrap();

        assert_eq!(*calls.lock().unwrap(), 3);
    }

    #[tokio::test]
    async fn deleting_status_is_terminal_outside_deletion() {
        let ctx = Context::new();
        let result = wait_for(
            &ctx,
            &REGISTRY_NAMESPACE,
            TICK,
            script(vec![Step::Status("deleting")]),
        )
        .await
        .unwrap();

        assert_eq!(result.0, "deleting");
    }

    #[test]
    fn interval_falls_back_to_family_default() {
        assert_eq!(INFERENCE_DEPLOYMENT.interval(None), Duration::from_secs(60));
        assert_eq!(
            INFERENCE_DEPLOYMENT.interval(Some(Duration::ZERO)),
            Duration::from_secs(60)
        );
        assert_eq!(FUNCTION.interval(Some(TICK)), TICK);
        assert_eq!(FUNCTION.interval(None), Duration::from_secs(5));
    }
}
