// src/services/fetcher.rs

//! Document fetcher with bounded, fixed-delay retries.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::{AppError, Result};
use crate::models::{FetchConfig, SourceConfig};
use crate::pipeline::tracker::{RequestTracker, Service, ServiceStatus};
use crate::utils::http::create_async_client;

/// Status and body of a single HTTP response.
#[derive(Debug, Clone)]
pub struct PageResponse {
    pub status: u16,
    pub body: String,
}

/// One GET attempt, no retries.
#[async_trait]
pub trait PageTransport: Send + Sync {
    async fn get(&self, url: &str) -> Result<PageResponse>;
}

/// `reqwest`-backed transport honoring the configured proxy and timeout.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_config(config: &SourceConfig) -> Result<Self> {
        Ok(Self::new(create_async_client(config)?))
    }
}

#[async_trait]
impl PageTransport for HttpTransport {
    async fn get(&self, url: &str) -> Result<PageResponse> {
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(PageResponse { status, body })
    }
}

/// Retry policy: total attempts and the fixed pause between them.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl From<&FetchConfig> for RetryPolicy {
    fn from(config: &FetchConfig) -> Self {
        Self {
            max_attempts: config.max_retries.max(1),
            delay: config.retry_delay(),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&FetchConfig::default())
    }
}

/// Fetches documents, retrying failed attempts and reporting each one.
pub struct DocumentFetcher {
    transport: Arc<dyn PageTransport>,
    tracker: RequestTracker,
    policy: RetryPolicy,
}

impl DocumentFetcher {
    pub fn new(
        transport: Arc<dyn PageTransport>,
        tracker: RequestTracker,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            transport,
            tracker,
            policy,
        }
    }

    /// Fetch `url` on behalf of `service`.
    ///
    /// Only a 200 counts as success. Anything else is logged and retried
    /// after the fixed delay; once attempts run out the last failure comes
    /// back as `AppError::FetchExhausted`. An error that is not transient is
    /// returned as-is after the first attempt.
    pub async fn fetch(&self, service: Service, url: &str) -> Result<String> {
        let mut last_error = String::new();

        for attempt in 1..=self.policy.max_attempts {
            self.tracker.record(service, ServiceStatus::Fetching);

            match self.attempt(url).await {
                Ok(body) => {
                    self.tracker.record(service, ServiceStatus::Completed);
                    if attempt > 1 {
                        log::info!("Fetched {} on attempt {}", url, attempt);
                    }
                    return Ok(body);
                }
                Err(error) if !error.is_transient() => {
                    self.tracker.record(service, ServiceStatus::Error);
                    log::error!("[{}] request for {} cannot succeed: {}", service, url, error);
                    return Err(error);
                }
                Err(error) => {
                    self.tracker.record(service, ServiceStatus::Error);
                    log::warn!(
                        "[{}] attempt {}/{} for {} failed: {}",
                        service,
                        attempt,
                        self.policy.max_attempts,
                        url,
                        error
                    );
                    last_error = error.to_string();
                }
            }

            if attempt < self.policy.max_attempts {
                tokio::time::sleep(self.policy.delay).await;
            }
        }

        Err(AppError::FetchExhausted {
            url: url.to_string(),
            attempts: self.policy.max_attempts,
            last_error,
        })
    }

    async fn attempt(&self, url: &str) -> Result<String> {
        let response = self.transport.get(url).await?;
        if response.status == 200 {
            Ok(response.body)
        } else {
            Err(AppError::Status {
                url: url.to_string(),
                status: response.status,
            })
        }
    }

    pub fn tracker(&self) -> &RequestTracker {
        &self.tracker
    }
}

#[cfg(test)]
mod tests {
    use tokio::time::Instant;

    use super::*;
    use crate::services::testing::ScriptedTransport;

    fn fetcher(transport: Arc<ScriptedTransport>) -> DocumentFetcher {
        DocumentFetcher::new(transport, RequestTracker::new(), RetryPolicy::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_three_failures_exhaust() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.script("https://list", [Ok(500), Ok(503), Ok(404)]);
        let fetcher = fetcher(Arc::clone(&transport));

        let start = Instant::now();
        let result = fetcher.fetch(Service::ListingSource, "https://list").await;

        assert!(matches!(
            result,
            Err(AppError::FetchExhausted { attempts: 3, .. })
        ));
        assert_eq!(transport.calls("https://list"), 3);
        // Two fixed 2s pauses, none after the last attempt
        assert_eq!(start.elapsed(), Duration::from_secs(4));

        let state = fetcher.tracker().state(Service::ListingSource);
        assert_eq!(state.success_count, 0);
        assert_eq!(state.error_count, 3);
        assert_eq!(state.status, ServiceStatus::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_on_second_attempt() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.script("https://list", [Ok(502), Ok(200)]);
        let fetcher = fetcher(Arc::clone(&transport));

        let start = Instant::now();
        let body = fetcher
            .fetch(Service::ListingSource, "https://list")
            .await
            .unwrap();

        assert_eq!(body, "body of https://list");
        assert_eq!(transport.calls("https://list"), 2);
        assert_eq!(start.elapsed(), Duration::from_secs(2));

        let state = fetcher.tracker().state(Service::ListingSource);
        assert_eq!(state.success_count, 1);
        assert_eq!(state.error_count, 1);
        assert_eq!(state.status, ServiceStatus::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_errors_are_retried() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.script("https://detail", [Err("connection reset"), Ok(200)]);
        let fetcher = fetcher(Arc::clone(&transport));

        let result = fetcher.fetch(Service::DetailSource, "https://detail").await;

        assert!(result.is_ok());
        assert_eq!(transport.calls("https://detail"), 2);
        let state = fetcher.tracker().state(Service::DetailSource);
        assert_eq!((state.success_count, state.error_count), (1, 1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_error_is_not_retried() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.unreachable("ftp://list", "unsupported scheme");
        let fetcher = fetcher(Arc::clone(&transport));

        let start = Instant::now();
        let result = fetcher.fetch(Service::ListingSource, "ftp://list").await;

        assert!(matches!(result, Err(AppError::Config(_))));
        assert_eq!(transport.calls("ftp://list"), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
        let state = fetcher.tracker().state(Service::ListingSource);
        assert_eq!((state.success_count, state.error_count), (0, 1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_attempt_success_has_no_delay() {
        let transport = Arc::new(ScriptedTransport::new());
        let fetcher = fetcher(Arc::clone(&transport));

        let start = Instant::now();
        fetcher
            .fetch(Service::ListingSource, "https://list")
            .await
            .unwrap();

        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(transport.calls("https://list"), 1);
    }

    #[test]
    fn test_policy_never_zero_attempts() {
        let policy = RetryPolicy::from(&FetchConfig {
            max_retries: 0,
            retry_delay_ms: 1,
        });
        assert_eq!(policy.max_attempts, 1);
    }
}
