use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Parameters for a single retry-with-backoff execution.
///
/// The defaults mirror the operational settings used against testnet:
/// five attempts, ten seconds apart, with a factor of 1 (constant delay).
/// The factor stays configurable for chains where growing delays are
/// preferable.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total number of attempts, including the first one.
    pub max_retries: u32,
    pub initial_delay: Duration,
    /// Multiplier applied to the delay after each failed attempt.
    pub backoff_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_delay: Duration::from_millis(10_000),
            backoff_factor: 1.0,
        }
    }
}

/// Execute `operation`, retrying failures until it succeeds or
/// `config.max_retries` attempts have been made.
///
/// Each failed attempt is logged with a warning before sleeping; the final
/// error is returned to the caller unchanged. There is no jitter and no
/// cancellation: once invoked, the caller waits for terminal
/// success or failure.
pub async fn retry_with_backoff<T, E, F, Fut>(config: &RetryConfig, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut current_delay = config.initial_delay;
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) => {
                attempt += 1;
                if attempt >= config.max_retries {
                    return Err(error);
                }
                log::warn!(
                    "attempt {} failed, retrying in {}ms: {}",
                    attempt,
                    current_delay.as_millis(),
                    error
                );
                tokio::time::sleep(current_delay).await;
                current_delay = current_delay.mul_f64(config.backoff_factor);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn fast_config(max_retries: u32) -> RetryConfig {
        RetryConfig {
            max_retries,
            initial_delay: Duration::from_millis(1),
            backoff_factor: 1.0,
        }
    }

    #[tokio::test]
    async fn returns_first_success_without_retrying() {
        let calls = Cell::new(0u32);
        let result: Result<u32, &str> = retry_with_backoff(&fast_config(5), || {
            calls.set(calls.get() + 1);
            async { Ok(7) }
        })
        .await;

        assert_eq!(result, Ok(7));
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test]
    async fn retries_until_operation_succeeds() {
        let calls = Cell::new(0u32);
        let result: Result<u32, &str> = retry_with_backoff(&fast_config(5), || {
            let attempt = calls.get() + 1;
            calls.set(attempt);
            async move {
                if attempt <= 3 {
                    Err("transient")
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;

        // three failures, then the fourth attempt succeeds
        assert_eq!(result, Ok(4));
        assert_eq!(calls.get(), 4);
    }

    #[tokio::test]
    async fn surfaces_last_error_after_max_retries_invocations() {
        let calls = Cell::new(0u32);
        let result: Result<u32, String> = retry_with_backoff(&fast_config(5), || {
            let attempt = calls.get() + 1;
            calls.set(attempt);
            async move { Err(format!("failure {attempt}")) }
        })
        .await;

        assert_eq!(result, Err("failure 5".to_string()));
        assert_eq!(calls.get(), 5);
    }

    #[tokio::test]
    async fn backoff_factor_one_keeps_delay_constant() {
        let config = RetryConfig::default();
        let mut delay = config.initial_delay;
        delay = delay.mul_f64(config.backoff_factor);
        assert_eq!(delay, config.initial_delay);
    }
}
