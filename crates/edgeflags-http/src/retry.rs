//! Retry logic with exponential backoff for HTTP requests, used by
//! non-core call sites (the event flusher has its own bespoke backoff
//! schedule and does not use this helper — see `edgeflags::flusher`).

use reqwest::StatusCode;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub backoff_factor: f64,
    pub jitter: bool,
    pub retryable_statuses: Vec<StatusCode>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
            backoff_factor: 2.0,
            jitter: true,
            retryable_statuses: vec![
                StatusCode::TOO_MANY_REQUESTS,
                StatusCode::REQUEST_TIMEOUT,
                StatusCode::INTERNAL_SERVER_ERROR,
                StatusCode::BAD_GATEWAY,
                StatusCode::SERVICE_UNAVAILABLE,
                StatusCode::GATEWAY_TIMEOUT,
            ],
        }
    }
}

pub trait RetryableError {
    fn is_retryable(&self, cfg: &RetryConfig) -> bool;
}

impl RetryableError for reqwest::Error {
    fn is_retryable(&self, cfg: &RetryConfig) -> bool {
        if self.is_timeout() || self.is_connect() {
            return true;
        }
        if let Some(status) = self.status() {
            return cfg.retryable_statuses.contains(&status);
        }
        false
    }
}

pub fn calculate_delay(cfg: &RetryConfig, attempt: u32) -> Duration {
    let exponential_delay = cfg.base_delay.as_secs_f64() * cfg.backoff_factor.powi(attempt as i32);
    let capped_delay = exponential_delay.min(cfg.max_delay.as_secs_f64());

    let final_delay = if cfg.jitter {
        let jitter_factor = 0.5 + fastrand::f64();
        capped_delay * jitter_factor
    } else {
        capped_delay
    };

    Duration::from_secs_f64(final_delay)
}

pub async fn retry<F, Fut, T, E>(cfg: &RetryConfig, mut f: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: RetryableError + std::fmt::Debug,
{
    let mut attempt = 0;

    loop {
        match f().await {
            Ok(result) => return Ok(result),
            Err(err) => {
                attempt += 1;

                if !err.is_retryable(cfg) {
                    warn!(error = ?err, attempt, "non-retryable error encountered");
                    return Err(err);
                }

                if attempt >= cfg.max_attempts {
                    warn!(error = ?err, attempt, max_attempts = cfg.max_attempts, "max retry attempts exhausted");
                    return Err(err);
                }

                let delay = calculate_delay(cfg, attempt - 1);
                warn!(error = ?err, attempt, delay_ms = delay.as_millis(), "retrying after error");
                tokio::time::sleep(delay).await;
            }
        }
    }
}
