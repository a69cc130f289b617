//! Retrying an action while its error matches a predicate

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tfplug::{Context, ContextError};

use crate::api::ApiError;
use crate::errors::{classify, has_aws_code, ErrorClass};
use crate::waiter::WaitError;

/// Upper bound of the random extra added to each interval, as a fraction
const JITTER: f64 = 0.2;

/// Run `action` until it succeeds or fails with an error `predicate` rejects
///
/// The action runs at least once. When the deadline passes while the
/// predicate still holds, the last error is returned.
pub async fn retry_when<T, F, Fut, P>(
    ctx: &Context,
    interval: Duration,
    predicate: P,
    mut action: F,
) -> Result<T, WaitError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
    P: Fn(&ApiError) -> bool,
{
    let mut attempt: u32 = 0;

    loop {
        if ctx.err() == Some(ContextError::Canceled) {
            return Err(WaitError::Canceled);
        }

        attempt += 1;
        let err = match action().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if !predicate(&err) {
            return Err(WaitError::Api(err));
        }

        tracing::debug!("attempt {} failed with retryable error: {}", attempt, err);

        match ctx.sleep(jittered(interval)).await {
            Ok(()) => {}
            Err(ContextError::Canceled) => return Err(WaitError::Canceled),
            Err(ContextError::DeadlineExceeded) => return Err(WaitError::Api(err)),
        }
    }
}

/// Retry while the AWS-compatible error code is one of `codes`
pub async fn retry_when_aws_code_equals<T, F, Fut>(
    ctx: &Context,
    interval: Duration,
    codes: &[&str],
    action: F,
) -> Result<T, WaitError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    retry_when(ctx, interval, |err| has_aws_code(err, codes), action).await
}

/// Retry while the action fails with anything other than one of `codes`
pub async fn retry_when_aws_code_not_equals<T, F, Fut>(
    ctx: &Context,
    interval: Duration,
    codes: &[&str],
    action: F,
) -> Result<T, WaitError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    retry_when(ctx, interval, |err| !has_aws_code(err, codes), action).await
}

/// Retry while the backend cannot see the custom domain's CNAME yet
pub async fn retry_while_dns_not_validated<T, F, Fut>(
    ctx: &Context,
    interval: Duration,
    action: F,
) -> Result<T, WaitError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    retry_when(
        ctx,
        interval,
        |err| classify(err) == ErrorClass::DnsNotYetValidated,
        action,
    )
    .await
}

fn jittered(interval: Duration) -> Duration {
    let factor = 1.0 + rand::thread_rng().gen_range(0.0..=JITTER);
    interval.mul_f64(factor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{NON_EXISTENT_QUEUE, QUEUE_DELETED_RECENTLY};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    const TICK: Duration = Duration::from_millis(1);

    fn aws(code: &str) -> ApiError {
        ApiError::Aws {
            code: code.to_string(),
            message: String::new(),
        }
    }

    #[tokio::test]
    async fn retries_matching_code_until_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let url = retry_when_aws_code_equals(&Context::new(), TICK, &[QUEUE_DELETED_RECENTLY], || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(aws(QUEUE_DELETED_RECENTLY))
                } else {
                    Ok("https://sqs/q1")
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(url, "https://sqs/q1");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn other_codes_are_returned_immediately() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let err = retry_when_aws_code_equals(&Context::new(), TICK, &[QUEUE_DELETED_RECENTLY], || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(aws("InvalidParameterValue")) }
        })
        .await
        .unwrap_err();

        assert!(matches!(err, WaitError::Api(ApiError::Aws { ref code, .. }) if code == "InvalidParameterValue"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn not_equals_stops_on_listed_code() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let err = retry_when_aws_code_not_equals(&Context::new(), TICK, &[NON_EXISTENT_QUEUE], || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err::<(), _>(aws("QueueStillVisible"))
                } else {
                    Err(aws(NON_EXISTENT_QUEUE))
                }
            }
        })
        .await
        .unwrap_err();

        assert!(matches!(err, WaitError::Api(ref e) if e.aws_code() == Some(NON_EXISTENT_QUEUE)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn runs_once_and_returns_last_error_at_deadline() {
        let ctx = Context::new().with_timeout(Duration::ZERO);
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let err = retry_when_aws_code_equals(&ctx, TICK, &[QUEUE_DELETED_RECENTLY], || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(aws(QUEUE_DELETED_RECENTLY)) }
        })
        .await
        .unwrap_err();

        assert!(matches!(err, WaitError::Api(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancellation_short_circuits() {
        let ctx = Context::new();
        ctx.cancel();

        let err = retry_when_aws_code_equals(&ctx, TICK, &[QUEUE_DELETED_RECENTLY], || async {
            Ok::<_, ApiError>(())
        })
        .await
        .unwrap_err();

        assert!(matches!(err, WaitError::Canceled));
    }

    #[tokio::test]
    async fn dns_retry_matches_message_prefix() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let domain = retry_while_dns_not_validated(&Context::new(), TICK, || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(ApiError::ApiError {
                        status: 400,
                        message: "could not validate domain example.com".to_string(),
                        details: None,
                    })
                } else {
                    Ok("domain-id")
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(domain, "domain-id");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn jitter_stays_within_bounds() {
        for _ in 0..100 {
            let d = jittered(Duration::from_secs(5));
            assert!(d >= Duration::from_secs(5));
            assert!(d <= Duration::from_secs(6));
        }
    }
}
