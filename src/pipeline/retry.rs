use crate::error::StepError;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Bounded exponential backoff applied to every pipeline activity
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub initial_interval: Duration,
    pub backoff_coefficient: f64,
    pub maximum_interval: Duration,
    pub maximum_attempts: u32,
}

impl RetryPolicy {
    /// Delay to wait after the given (1-based) failed attempt
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(63) as i32;
        let scaled = self.initial_interval.as_secs_f64() * self.backoff_coefficient.powi(exponent);
        let capped = scaled.min(self.maximum_interval.as_secs_f64());
        Duration::from_secs_f64(capped.max(0.0))
    }
}

#[derive(Debug, Clone)]
pub struct ActivityOptions {
    /// Upper bound on a single attempt
    pub step_timeout: Duration,
    pub retry: RetryPolicy,
}

/// Result of driving one activity through its retry policy
#[derive(Debug)]
pub struct ActivityOutcome<T> {
    pub result: Result<T, StepError>,
    pub attempts: u32,
}

/// Execute an activity with a per-attempt timeout and capped exponential backoff.
///
/// Non-retryable errors end the loop immediately. Cancellation is honoured while
/// waiting between attempts; an attempt already in flight runs to completion.
pub async fn run_activity<F, Fut, T>(
    name: &str,
    options: &ActivityOptions,
    cancel: &CancellationToken,
    mut operation: F,
) -> ActivityOutcome<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StepError>>,
{
    let policy = &options.retry;
    let mut attempts = 0;

    loop {
        attempts += 1;

        let result = match timeout(options.step_timeout, operation()).await {
            Ok(result) => result,
            Err(_) => Err(StepError::Timeout(options.step_timeout)),
        };

        let error = match result {
            Ok(value) => {
                return ActivityOutcome {
                    result: Ok(value),
                    attempts,
                }
            }
            Err(e) => e,
        };

        if !error.is_retryable() {
            warn!("{} failed with a permanent error: {}", name, error);
            return ActivityOutcome {
                result: Err(error),
                attempts,
            };
        }
        if attempts >= policy.maximum_attempts {
            warn!("{}: all {} attempts failed: {}", name, attempts, error);
            return ActivityOutcome {
                result: Err(error),
                attempts,
            };
        }

        let delay = policy.delay_for(attempts);
        warn!(
            "{}: attempt {} failed: {}. Retrying in {:?}...",
            name, attempts, error, delay
        );

        tokio::select! {
            _ = cancel.cancelled() => {
                return ActivityOutcome {
                    result: Err(error),
                    attempts,
                };
            }
            _ = sleep(delay) => {}
        }
    }
}
