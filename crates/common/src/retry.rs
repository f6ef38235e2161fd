use crate::config::RetrySettings;
use sluice_error::{ErrorCode, ErrorContext, Result, SluiceError};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{error, warn};

/// Bounded exponential backoff over an explicit set of retryable error codes.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt; total attempts are `max_retries + 1`.
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_factor: f64,
    /// Apply ±10% random jitter to every computed delay.
    pub jitter: bool,
    pub retryable: Vec<ErrorCode>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: crate::config::DEFAULT_MAX_RETRIES,
            initial_delay: Duration::from_millis(crate::config::DEFAULT_INITIAL_DELAY_MS),
            max_delay: Duration::from_millis(crate::config::DEFAULT_MAX_DELAY_MS),
            backoff_factor: crate::config::DEFAULT_BACKOFF_FACTOR,
            jitter: true,
            retryable: vec![
                ErrorCode::ConnectionFailed,
                ErrorCode::ConnectionTimeout,
                ErrorCode::QueryTimeout,
            ],
        }
    }
}

impl TryFrom<&RetrySettings> for RetryPolicy {
    type Error = SluiceError;

    fn try_from(settings: &RetrySettings) -> Result<Self> {
        let retryable = settings
            .retryable
            .iter()
            .map(|code| {
                ErrorCode::try_from(code.clone()).map_err(|_| {
                    SluiceError::new(
                        ErrorCode::InvalidConfig,
                        format!("Unknown retryable error code '{}'", code),
                    )
                    .with_context(ErrorContext::Config {
                        file_path: None,
                        field: Some("retry.retryable".to_string()),
                    })
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            max_retries: settings.max_retries,
            initial_delay: Duration::from_millis(settings.initial_delay_ms),
            max_delay: Duration::from_millis(settings.max_delay_ms),
            backoff_factor: settings.backoff_factor,
            jitter: settings.jitter,
            retryable,
        })
    }
}

impl RetryPolicy {
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    pub fn is_retryable(&self, err: &SluiceError) -> bool {
        self.retryable.contains(&err.code)
    }

    /// Delay before retry number `retry` (0-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        next_retry_delay(
            retry,
            self.initial_delay,
            self.max_delay,
            self.backoff_factor,
            self.jitter,
        )
    }
}

/// `initial * factor^retry` capped at `max`, with optional ±10% jitter applied after the
/// cap, so a capped delay lands within 10% of `max` on either side.
pub fn next_retry_delay(
    retry: u32,
    initial: Duration,
    max: Duration,
    factor: f64,
    jitter: bool,
) -> Duration {
    let exponent = i32::try_from(retry).unwrap_or(i32::MAX);
    let base = initial.as_secs_f64() * factor.powi(exponent);
    // f64::min yields `max` when `base` is NaN
    let capped = base.min(max.as_secs_f64()).max(0.0);
    let with_jitter = if jitter {
        // uniform in [-0.1, 0.1)
        let spread = rand::random::<f64>() * 0.2 - 0.1;
        capped * (1.0 + spread)
    } else {
        capped
    };
    Duration::try_from_secs_f64(with_jitter).unwrap_or(max)
}

/// Run `operation` until it succeeds, fails with a non-retryable error, runs out of
/// attempts, or `deadline` passes.
///
/// `operation` receives the 1-based attempt number. Each attempt runs under the deadline,
/// and a backoff sleep that would end past the deadline is not started. `on_retry` is
/// called with the failed attempt number, its error and the upcoming delay before each
/// sleep. Returns the value together with the number of attempts used.
pub async fn retry_with_policy<T, F, Fut, R>(
    operation_name: &str,
    policy: &RetryPolicy,
    deadline: Option<Instant>,
    mut on_retry: R,
    mut operation: F,
) -> Result<(T, u32)>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
    R: FnMut(u32, &SluiceError, Duration),
{
    let started = Instant::now();
    let max_attempts = policy.max_attempts();
    let mut attempt = 0;

    loop {
        attempt += 1;

        let result = match deadline {
            Some(deadline) => match tokio::time::timeout_at(deadline, operation(attempt)).await {
                Ok(result) => result,
                Err(_) => {
                    return Err(SluiceError::deadline_exceeded(
                        operation_name,
                        started.elapsed(),
                    ))
                }
            },
            None => operation(attempt).await,
        };

        let err = match result {
            Ok(value) => return Ok((value, attempt)),
            Err(err) => err,
        };

        if !policy.is_retryable(&err) {
            return Err(err);
        }

        if attempt >= max_attempts {
            error!(
                "Failed to execute '{}' after {} attempts: {}",
                operation_name, attempt, err
            );
            return Err(SluiceError::retries_exhausted(attempt, err));
        }

        let delay = policy.delay_for(attempt - 1);
        if let Some(deadline) = deadline {
            if Instant::now() + delay >= deadline {
                return Err(
                    SluiceError::deadline_exceeded(operation_name, started.elapsed())
                        .with_cause(err),
                );
            }
        }

        warn!(
            "Operation '{}' failed. Retrying in {:?} (Attempt {}/{}): {}",
            operation_name, delay, attempt, max_attempts, err
        );
        on_retry(attempt, &err, delay);
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(50),
            jitter: false,
            ..Default::default()
        }
    }

    #[test]
    fn test_delay_grows_and_caps() {
        let policy = RetryPolicy {
            jitter: false,
            ..Default::default()
        };
        assert_eq!(policy.delay_for(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
        assert_eq!(policy.delay_for(5), Duration::from_secs(10));
    }

    #[test]
    fn test_jitter_stays_within_ten_percent() {
        let policy = RetryPolicy::default();
        for _ in 0..200 {
            let d = policy.delay_for(1).as_secs_f64();
            assert!((1.8..=2.2).contains(&d), "delay {} out of range", d);
        }
    }

    #[test]
    fn test_jitter_spreads_around_the_cap() {
        let policy = RetryPolicy::default();
        let (mut below, mut above) = (false, false);
        for _ in 0..500 {
            let d = policy.delay_for(8).as_secs_f64();
            assert!((9.0..=11.0).contains(&d), "delay {} out of range", d);
            below |= d < 10.0;
            above |= d > 10.0;
        }
        assert!(below && above);
    }

    #[test]
    fn test_degenerate_factor_never_panics() {
        let initial = Duration::from_millis(100);
        let max = Duration::from_secs(10);
        assert_eq!(next_retry_delay(3, initial, max, f64::NAN, false), max);
        assert_eq!(next_retry_delay(3, initial, max, f64::INFINITY, false), max);
        let huge = next_retry_delay(u32::MAX, initial, max, 2.0, true).as_secs_f64();
        assert!((9.0..=11.0).contains(&huge), "delay {} out of range", huge);
        assert_eq!(next_retry_delay(1, initial, max, -3.0, false), Duration::ZERO);
    }

    #[test]
    fn test_policy_from_settings() {
        let policy = RetryPolicy::try_from(&RetrySettings::default()).unwrap();
        assert_eq!(policy.max_attempts(), 4);
        assert!(policy.retryable.contains(&ErrorCode::QueryTimeout));

        let bad = RetrySettings {
            retryable: vec!["nope".to_string()],
            ..Default::default()
        };
        assert_eq!(
            RetryPolicy::try_from(&bad).unwrap_err().code,
            ErrorCode::InvalidConfig
        );
    }

    #[tokio::test]
    async fn test_retryable_failure_exhausts_after_max_attempts() {
        let policy = fast_policy();
        let calls = Arc::new(AtomicU32::new(0));
        let mut retries = 0;

        let counter = calls.clone();
        let result: Result<((), u32)> = retry_with_policy(
            "always_down",
            &policy,
            None,
            |_, _, _| retries += 1,
            |_| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(SluiceError::new(ErrorCode::ConnectionFailed, "refused"))
                }
            },
        )
        .await;

        let err = result.unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), policy.max_retries + 1);
        assert_eq!(retries, policy.max_retries);
        assert_eq!(err.code, ErrorCode::RetriesExhausted);
        assert_eq!(err.root_cause().code, ErrorCode::ConnectionFailed);
    }

    #[tokio::test]
    async fn test_non_retryable_failure_is_returned_immediately() {
        let calls = AtomicU32::new(0);
        let result: Result<((), u32)> = retry_with_policy(
            "bad_sql",
            &fast_policy(),
            None,
            |_, _, _| {},
            |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(SluiceError::new(ErrorCode::MalformedSql, "syntax error")) }
            },
        )
        .await;

        assert_eq!(result.unwrap_err().code, ErrorCode::MalformedSql);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_success_after_transient_failure_reports_attempts() {
        let (value, attempts) = retry_with_policy(
            "flaky",
            &fast_policy(),
            None,
            |_, _, _| {},
            |attempt| async move {
                if attempt < 3 {
                    Err(SluiceError::new(ErrorCode::ConnectionTimeout, "slow"))
                } else {
                    Ok(42)
                }
            },
        )
        .await
        .unwrap();

        assert_eq!(value, 42);
        assert_eq!(attempts, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_stops_before_backoff_sleep() {
        let policy = RetryPolicy {
            jitter: false,
            ..Default::default()
        };
        let deadline = Instant::now() + Duration::from_millis(1500);
        let calls = AtomicU32::new(0);

        let result: Result<((), u32)> = retry_with_policy(
            "deadline",
            &policy,
            Some(deadline),
            |_, _, _| {},
            |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(SluiceError::new(ErrorCode::ConnectionFailed, "refused")) }
            },
        )
        .await;

        // 1s first backoff fits; the 2s second one would cross the deadline.
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        let err = result.unwrap_err();
        assert_eq!(err.code, ErrorCode::DeadlineExceeded);
        assert_eq!(err.root_cause().code, ErrorCode::ConnectionFailed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_aborts_hung_attempt() {
        let deadline = Instant::now() + Duration::from_millis(200);
        let result: Result<((), u32)> = retry_with_policy(
            "hung",
            &fast_policy(),
            Some(deadline),
            |_, _, _| {},
            |_| async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(())
            },
        )
        .await;

        assert_eq!(result.unwrap_err().code, ErrorCode::DeadlineExceeded);
    }
}
