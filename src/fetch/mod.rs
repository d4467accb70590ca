//! Page fetching with retry and exponential backoff.
//!
//! [`Fetcher`] owns the retry loop; the HTTP exchange itself goes through a
//! [`Transport`], so the loop can be driven by a fake in tests.

mod http;

pub use self::http::ReqwestTransport;

use crate::config::RetryPolicy;
use crate::error::{FetchError, FetchErrorKind};
use async_trait::async_trait;
use tracing::{debug, warn};
use url::Url;

/// Status and body of a completed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// An exchange that produced no response at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    Timeout,
    Network(String),
}

/// One HTTP GET, no retries.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &Url) -> Result<HttpResponse, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn get(&self, url: &Url) -> Result<HttpResponse, TransportError> {
        (**self).get(url).await
    }
}

/// Issues GET requests, retrying failures according to a [`RetryPolicy`].
#[derive(Debug, Clone)]
pub struct Fetcher<T> {
    transport: T,
}

impl<T: Transport> Fetcher<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Fetch `url`, returning the body of the first successful response.
    ///
    /// Network failures, timeouts and non-2xx statuses are retried up to
    /// `policy.max_attempts()` in total. After failed attempt `i` the task
    /// sleeps `policy.delay_for(i)`; there is no sleep after the last one.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] describing the last failure once every
    /// attempt has failed.
    pub async fn fetch(&self, url: &Url, policy: &RetryPolicy) -> Result<String, FetchError> {
        let max_attempts = policy.max_attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;
            debug!(url = %url, attempt, "Fetching page");

            let kind = match self.transport.get(url).await {
                Ok(response) if response.is_success() => return Ok(response.body),
                Ok(response) => FetchErrorKind::HttpStatus(response.status),
                Err(TransportError::Timeout) => FetchErrorKind::Timeout,
                Err(TransportError::Network(message)) => FetchErrorKind::NetworkError(message),
            };

            if attempt >= max_attempts {
                warn!(url = %url, attempts = attempt, error = %kind, "Giving up on page");
                return Err(FetchError {
                    kind,
                    attempts: attempt,
                    url: url.to_string(),
                });
            }

            let delay = policy.delay_for(attempt);
            warn!(
                url = %url,
                attempt,
                error = %kind,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "Attempt failed, backing off"
            );
            tokio::time::sleep(delay).await;
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedTransport;
    use super::*;
    use std::time::Duration;

    fn url() -> Url {
        Url::parse("https://scholar.google.com/scholar?q=x").expect("valid url")
    }

    fn policy(max_attempts: u32, base_ms: u64, multiplier: f64) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::from_millis(base_ms), multiplier)
            .expect("valid policy")
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_success_returns_body() {
        let fetcher = Fetcher::new(ScriptedTransport::always(Ok(HttpResponse::ok("<html/>"))));
        let body = fetcher.fetch(&url(), &policy(3, 10, 2.0)).await.expect("fetch");
        assert_eq!(body, "<html/>");
        assert_eq!(fetcher.transport().call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_k_network_failures_make_k_attempts() {
        for k in 1..=5 {
            let fetcher = Fetcher::new(ScriptedTransport::always(Err(TransportError::Network(
                "connection refused".into(),
            ))));
            let err = fetcher
                .fetch(&url(), &policy(k, 5, 2.0))
                .await
                .expect_err("all attempts fail");

            assert_eq!(fetcher.transport().call_count(), k as usize);
            assert_eq!(err.attempts, k);
            assert_eq!(
                err.kind,
                FetchErrorKind::NetworkError("connection refused".into())
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_transient_failures() {
        let fetcher = Fetcher::new(ScriptedTransport::new(vec![
            Err(TransportError::Timeout),
            Ok(HttpResponse {
                status: 503,
                body: String::new(),
            }),
            Ok(HttpResponse::ok("done")),
        ]));
        let body = fetcher.fetch(&url(), &policy(3, 10, 2.0)).await.expect("fetch");
        assert_eq!(body, "done");
        assert_eq!(fetcher.transport().call_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_kind_reflects_last_attempt() {
        let fetcher = Fetcher::new(ScriptedTransport::new(vec![
            Err(TransportError::Network("reset".into())),
            Err(TransportError::Timeout),
            Ok(HttpResponse {
                status: 429,
                body: String::new(),
            }),
        ]));
        let err = fetcher
            .fetch(&url(), &policy(3, 10, 2.0))
            .await
            .expect_err("exhausted");
        assert_eq!(err.kind, FetchErrorKind::HttpStatus(429));
        assert_eq!(err.attempts, 3);
        assert_eq!(err.url, url().to_string());

        let fetcher = Fetcher::new(ScriptedTransport::always(Err(TransportError::Timeout)));
        let err = fetcher
            .fetch(&url(), &policy(2, 10, 2.0))
            .await
            .expect_err("exhausted");
        assert_eq!(err.kind, FetchErrorKind::Timeout);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_follows_policy() {
        let policy = policy(4, 100, 3.0);
        let fetcher = Fetcher::new(ScriptedTransport::always(Ok(HttpResponse {
            status: 500,
            body: String::new(),
        })));
        let _ = fetcher.fetch(&url(), &policy).await;

        let instants = fetcher.transport().instants();
        assert_eq!(instants.len(), 4);
        for (i, pair) in instants.windows(2).enumerate() {
            let attempt = i as u32 + 1;
            let gap = pair[1] - pair[0];
            let expected = Duration::from_millis(100 * 3u64.pow(attempt - 1));
            assert!(
                gap >= expected && gap < expected + Duration::from_millis(5),
                "attempt {attempt}: waited {gap:?}, expected {expected:?}"
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_attempt_never_sleeps() {
        let start = tokio::time::Instant::now();
        let fetcher = Fetcher::new(ScriptedTransport::always(Err(TransportError::Timeout)));
        let err = fetcher
            .fetch(&url(), &RetryPolicy::no_retry())
            .await
            .expect_err("fails");
        assert_eq!(err.attempts, 1);
        assert_eq!(tokio::time::Instant::now() - start, Duration::ZERO);
    }
}
