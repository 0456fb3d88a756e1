// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `retry.rs`

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::errors::ProviderError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn fast_policy() -> RetryPolicy {
        let quick = ExponentialBackoff::new(
            Duration::from_millis(1),
            Duration::from_millis(4),
            Some(Duration::from_secs(2)),
            2.0,
            0.0,
        );
        RetryPolicy {
            rate_limit: quick.clone(),
            transient: quick,
            max_transient_retries: 2,
        }
    }

    fn transient() -> ProviderError {
        ProviderError::Transient {
            provider: "test".into(),
            reason: "HTTP 503".into(),
        }
    }

    /// Test that backoff configuration has expected values
    #[test]
    fn test_rate_limit_backoff_configuration() {
        let backoff = rate_limit_backoff();
        assert_eq!(backoff.initial_interval, Duration::from_secs(1));
        assert_eq!(backoff.max_interval, Duration::from_secs(300));
        assert_eq!(backoff.max_elapsed_time, Some(Duration::from_secs(300)));
        #[allow(clippy::float_cmp)]
        {
            assert_eq!(backoff.multiplier, 2.0);
            assert_eq!(backoff.randomization_factor, 0.1);
        }
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let mut backoff = ExponentialBackoff::new(
            Duration::from_secs(1),
            Duration::from_secs(4),
            None,
            2.0,
            0.0,
        );
        let schedule: Vec<Duration> = (0..5).filter_map(|_| backoff.next_backoff()).collect();
        assert_eq!(
            schedule,
            vec![1, 2, 4, 4, 4]
                .into_iter()
                .map(Duration::from_secs)
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_jitter_stays_in_range() {
        let mut backoff = ExponentialBackoff::new(
            Duration::from_secs(10),
            Duration::from_secs(10),
            None,
            1.0,
            0.1,
        );
        for _ in 0..20 {
            let d = backoff.next_backoff().unwrap();
            assert!(d >= Duration::from_secs(9) && d <= Duration::from_secs(11));
        }
    }

    #[test]
    fn test_retryable_http_status() {
        use reqwest::StatusCode;
        assert!(is_retryable_http_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable_http_status(StatusCode::SERVICE_UNAVAILABLE));
        assert!(!is_retryable_http_status(StatusCode::NOT_FOUND));
        assert!(!is_retryable_http_status(StatusCode::UNAUTHORIZED));
    }

    #[tokio::test]
    async fn test_transient_retried_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let result = fast_policy()
            .run("flaky", move || {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(transient())
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_transient_gives_up_after_max_retries() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let result: Result<(), _> = fast_policy()
            .run("down", move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(transient())
                }
            })
            .await;
        assert!(result.unwrap_err().is_transient());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_rate_limited_keeps_retrying() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let result = fast_policy()
            .run("busy", move || {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 5 {
                        Err(ProviderError::RateLimited {
                            provider: "test".into(),
                            retry_after: None,
                        })
                    } else {
                        Ok("done")
                    }
                }
            })
            .await;
        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 6);
    }

    #[tokio::test]
    async fn test_fatal_fails_immediately() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let result: Result<(), _> = fast_policy()
            .run("auth", move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(ProviderError::AuthenticationFailed {
                        provider: "test".into(),
                        reason: "bad key".into(),
                    })
                }
            })
            .await;
        assert!(result.unwrap_err().is_fatal());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
