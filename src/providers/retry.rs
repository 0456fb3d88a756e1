// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Retry logic with exponential backoff for provider API calls.
//!
//! Rate-limited calls back off exponentially (1s doubling to 300s) and give up
//! once 300s have elapsed. Transient failures (5xx, network errors) are retried
//! a small number of times. Everything else fails immediately.

use rand::Rng;
use reqwest::StatusCode;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

use crate::constants::{
    BACKOFF_MULTIPLIER, RANDOMIZATION_FACTOR, RATE_LIMIT_INITIAL_INTERVAL_SECS,
    RATE_LIMIT_MAX_ELAPSED_SECS, RATE_LIMIT_MAX_INTERVAL_SECS, TRANSIENT_INITIAL_INTERVAL_MILLIS,
    TRANSIENT_MAX_RETRIES,
};
use crate::errors::ProviderError;

/// Simple exponential backoff implementation.
///
/// Provides exponential backoff with randomization (jitter) to prevent thundering herd.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    /// Current interval duration
    pub current_interval: Duration,
    /// Interval the backoff started with
    pub initial_interval: Duration,
    /// Maximum interval duration
    pub max_interval: Duration,
    /// Maximum total elapsed time
    pub max_elapsed_time: Option<Duration>,
    /// Backoff multiplier (typically 2.0 for doubling)
    pub multiplier: f64,
    /// Randomization factor (e.g., 0.1 for ±10%)
    pub randomization_factor: f64,
    start_time: Instant,
}

impl ExponentialBackoff {
    /// Create a new exponential backoff with specified parameters.
    #[must_use]
    pub fn new(
        initial_interval: Duration,
        max_interval: Duration,
        max_elapsed_time: Option<Duration>,
        multiplier: f64,
        randomization_factor: f64,
    ) -> Self {
        Self {
            current_interval: initial_interval,
            initial_interval,
            max_interval,
            max_elapsed_time,
            multiplier,
            randomization_factor,
            start_time: Instant::now(),
        }
    }

    /// Get the next backoff interval, or None if max elapsed time exceeded.
    pub fn next_backoff(&mut self) -> Option<Duration> {
        if let Some(max_elapsed) = self.max_elapsed_time {
            if self.start_time.elapsed() >= max_elapsed {
                return None;
            }
        }

        let interval = self.current_interval;
        let jittered = self.apply_jitter(interval);

        let next = interval.as_secs_f64() * self.multiplier;
        self.current_interval = Duration::from_secs_f64(next).min(self.max_interval);

        Some(jittered)
    }

    /// Restart the schedule from the initial interval.
    pub fn reset(&mut self) {
        self.current_interval = self.initial_interval;
        self.start_time = Instant::now();
    }

    fn apply_jitter(&self, interval: Duration) -> Duration {
        if self.randomization_factor == 0.0 {
            return interval;
        }

        let secs = interval.as_secs_f64();
        let delta = secs * self.randomization_factor;
        let min = secs - delta;
        let max = secs + delta;

        let mut rng = rand::thread_rng();
        let jittered = rng.gen_range(min..=max);

        Duration::from_secs_f64(jittered.max(0.0))
    }
}

/// Backoff for rate-limited calls.
///
/// # Retry Schedule
///
/// 1s, 2s, 4s, 8s ... capped at 300s, giving up once 300s have elapsed.
#[must_use]
pub fn rate_limit_backoff() -> ExponentialBackoff {
    ExponentialBackoff::new(
        Duration::from_secs(RATE_LIMIT_INITIAL_INTERVAL_SECS),
        Duration::from_secs(RATE_LIMIT_MAX_INTERVAL_SECS),
        Some(Duration::from_secs(RATE_LIMIT_MAX_ELAPSED_SECS)),
        BACKOFF_MULTIPLIER,
        RANDOMIZATION_FACTOR,
    )
}

/// Backoff for transient failures (500ms, 1s).
#[must_use]
pub fn transient_backoff() -> ExponentialBackoff {
    ExponentialBackoff::new(
        Duration::from_millis(TRANSIENT_INITIAL_INTERVAL_MILLIS),
        Duration::from_secs(RATE_LIMIT_MAX_INTERVAL_SECS),
        None,
        BACKOFF_MULTIPLIER,
        RANDOMIZATION_FACTOR,
    )
}

/// Determine if an HTTP status code is retryable.
///
/// 429 and the 5xx gateway/server errors are retryable.
#[must_use]
pub fn is_retryable_http_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}

/// How a provider retries failed calls.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Schedule for rate-limited calls
    pub rate_limit: ExponentialBackoff,
    /// Schedule for transient failures
    pub transient: ExponentialBackoff,
    /// Retries allowed for transient failures
    pub max_transient_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            rate_limit: rate_limit_backoff(),
            transient: transient_backoff(),
            max_transient_retries: TRANSIENT_MAX_RETRIES,
        }
    }
}

impl RetryPolicy {
    /// Run `operation`, retrying rate-limited and transient failures.
    ///
    /// # Errors
    ///
    /// Returns the last error once retries are exhausted, or the first
    /// non-retryable error.
    pub async fn run<T, F, Fut>(&self, operation_name: &str, mut operation: F) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut rate_limit = self.rate_limit.clone();
        rate_limit.reset();
        let mut transient = self.transient.clone();
        transient.reset();
        let start_time = Instant::now();
        let mut attempt = 0u32;
        let mut transient_failures = 0u32;

        loop {
            attempt += 1;
            let err = match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(
                            operation = operation_name,
                            attempt = attempt,
                            elapsed = ?start_time.elapsed(),
                            "provider call succeeded after retries"
                        );
                    }
                    return Ok(value);
                }
                Err(e) => e,
            };

            let delay = match &err {
                ProviderError::RateLimited { retry_after, .. } => rate_limit
                    .next_backoff()
                    .map(|d| retry_after.map_or(d, |r| r.max(d))),
                ProviderError::Transient { .. } if transient_failures < self.max_transient_retries => {
                    transient_failures += 1;
                    transient.next_backoff()
                }
                _ => {
                    if !err.is_transient() {
                        error!(
                            operation = operation_name,
                            error = %err,
                            "non-retryable provider error, failing immediately"
                        );
                    }
                    None
                }
            };

            let Some(duration) = delay else {
                if err.is_transient() {
                    error!(
                        operation = operation_name,
                        attempt = attempt,
                        elapsed = ?start_time.elapsed(),
                        error = %err,
                        "retries exhausted, giving up"
                    );
                }
                return Err(err);
            };

            warn!(
                operation = operation_name,
                attempt = attempt,
                retry_after = ?duration,
                error = %err,
                "retryable provider error, will retry"
            );
            tokio::time::sleep(duration).await;
        }
    }
}

/// Run `operation` under the default retry policy.
///
/// # Errors
///
/// See [`RetryPolicy::run`].
pub async fn with_retry<T, F, Fut>(operation_name: &str, operation: F) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    RetryPolicy::default().run(operation_name, operation).await
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod retry_tests;
