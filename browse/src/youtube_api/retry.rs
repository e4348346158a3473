//! Key-rotating retry loop shared by the list queries.

use super::ApiError;
use crate::keys::KeyRotator;
use std::future::Future;

/// Runs `attempt` with successive keys from `keys` until it succeeds.
///
/// At most one attempt is made per key in the pool. Each attempt gets a freshly issued
/// key, so the rotator's throttle is the only delay between attempts. Quota and other
/// failures are both recorded and retried; the first success is returned immediately.
/// Once every attempt has failed, the result is [`ApiError::Exhausted`] carrying the last
/// failure reason.
///
/// `what` names the query in log output.
pub async fn with_key_rotation<T, F, Fut>(
    keys: &KeyRotator,
    what: &str,
    mut attempt: F,
) -> Result<T, ApiError>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let max_attempts = keys.len();
    let mut last_error = None;

    for attempt_no in 1..=max_attempts {
        let key = keys.issue().await;
        match attempt(key).await {
            Ok(result) => {
                tracing::debug!(what, attempt = attempt_no, max_attempts, "request succeeded");
                return Ok(result);
            }
            Err(ApiError::QuotaExceeded) => {
                tracing::info!(
                    what,
                    attempt = attempt_no,
                    max_attempts,
                    "API key quota exceeded, trying next key"
                );
                last_error = Some(ApiError::QuotaExceeded.to_string());
            }
            Err(e) => {
                tracing::warn!(
                    what,
                    attempt = attempt_no,
                    max_attempts,
                    error = %e,
                    "request failed with current API key"
                );
                last_error = Some(e.to_string());
            }
        }
    }

    Err(ApiError::Exhausted {
        attempts: max_attempts,
        last: last_error.unwrap_or_else(|| "no attempts made".to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;

    fn pool(n: usize) -> KeyRotator {
        KeyRotator::new((0..n).map(|i| format!("key-{i}")).collect()).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_on_last_key_after_quota_failures() {
        let keys = pool(4);
        let seen = RefCell::new(Vec::new());

        let result = with_key_rotation(&keys, "trending", |key| {
            seen.borrow_mut().push(key.clone());
            async move {
                if key == "key-3" {
                    Ok(vec!["a", "b"])
                } else {
                    Err(ApiError::QuotaExceeded)
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(result, vec!["a", "b"]);
        assert_eq!(*seen.borrow(), vec!["key-0", "key-1", "key-2", "key-3"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_quota_failures_exhaust_after_pool_size_attempts() {
        let keys = pool(3);
        let attempts = RefCell::new(0);

        let err = with_key_rotation(&keys, "search", |_key| {
            *attempts.borrow_mut() += 1;
            async { Err::<(), _>(ApiError::QuotaExceeded) }
        })
        .await
        .unwrap_err();

        assert_eq!(*attempts.borrow(), 3);
        match err {
            ApiError::Exhausted { attempts, last } => {
                assert_eq!(attempts, 3);
                assert_eq!(last, "API key quota exceeded");
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_success_short_circuits() {
        let keys = pool(5);
        let attempts = RefCell::new(0);

        let result = with_key_rotation(&keys, "trending", |key| {
            *attempts.borrow_mut() += 1;
            async move { Ok::<_, ApiError>(key) }
        })
        .await
        .unwrap();

        assert_eq!(result, "key-0");
        assert_eq!(*attempts.borrow(), 1);
        assert_eq!(keys.current_index().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_other_failures_are_retried_and_last_reason_kept() {
        let keys = pool(2);
        let attempts = RefCell::new(0);

        let err = with_key_rotation(&keys, "search", |_key| {
            *attempts.borrow_mut() += 1;
            let n = *attempts.borrow();
            async move {
                Err::<(), _>(if n == 1 {
                    ApiError::QuotaExceeded
                } else {
                    ApiError::from_status(StatusCode::INTERNAL_SERVER_ERROR, "backend error")
                })
            }
        })
        .await
        .unwrap_err();

        assert_eq!(*attempts.borrow(), 2);
        assert!(err.is_exhausted());
        assert!(err.to_string().contains("backend error"), "{err}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempts_are_throttled_by_rotator() {
        let keys = pool(3);
        let start = tokio::time::Instant::now();

        let _ = with_key_rotation(&keys, "trending", |_key| async {
            Err::<(), _>(ApiError::QuotaExceeded)
        })
        .await;

        // the first issuance is free, the other two wait out the interval
        assert!(start.elapsed() >= crate::keys::MIN_KEY_INTERVAL * 2);
    }
}
