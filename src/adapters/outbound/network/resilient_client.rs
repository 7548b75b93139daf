use super::rate_limiter::RateLimiter;
use super::retry::{classify, parse_retry_after, ResponseClass, RetryPolicy};
use crate::ports::outbound::CredentialProvider;
use crate::shared::error::FetchError;
use chrono::Utc;
use reqwest::header::{HeaderMap, AUTHORIZATION, RETRY_AFTER};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Snyk's throttling header: seconds until the quota resets
const RATE_LIMIT_RESET: &str = "x-ratelimit-reset";

/// Transport-neutral view of one HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub retry_after: Option<String>,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            retry_after: None,
            body: body.into(),
        }
    }

    pub fn with_retry_after(mut self, value: impl Into<String>) -> Self {
        self.retry_after = Some(value.into());
        self
    }
}

/// Retry, backoff and rate limiting around a single request.
///
/// The limiter is shared by every fetcher talking to the same service; the
/// cancellation token is the run's, checked at every wait.
#[derive(Debug, Clone)]
pub struct ResilientFetcher {
    limiter: Arc<RateLimiter>,
    policy: RetryPolicy,
    cancel: CancellationToken,
}

impl ResilientFetcher {
    pub fn new(limiter: Arc<RateLimiter>, policy: RetryPolicy, cancel: CancellationToken) -> Self {
        Self {
            limiter,
            policy,
            cancel,
        }
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Runs `attempt` until it yields a terminal outcome.
    ///
    /// 2xx returns the body. Not-found and other 4xx responses are terminal
    /// on first sight. 429, 408, 5xx and transport errors (`Err` from
    /// `attempt`) are retried up to `max_attempts`; a retry-after hint on the
    /// response is recorded in the shared limiter and replaces the
    /// exponential delay. Hints are capped by [`RetryPolicy::hinted_delay`].
    pub async fn execute<F, Fut>(&self, target: &str, mut attempt: F) -> Result<String, FetchError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<RawResponse, String>>,
    {
        let mut attempts = 0;

        loop {
            attempts += 1;
            self.limiter
                .acquire(&self.cancel)
                .await
                .map_err(|_| FetchError::Cancelled {
                    target: target.to_string(),
                })?;

            let (class, hint, details) = match attempt().await {
                Ok(response) => match classify(response.status) {
                    ResponseClass::Success => return Ok(response.body),
                    ResponseClass::NotFound => {
                        return Err(FetchError::NotFound {
                            target: target.to_string(),
                        })
                    }
                    ResponseClass::Rejected => {
                        return Err(FetchError::Rejected {
                            target: target.to_string(),
                            status: response.status,
                        })
                    }
                    class => (
                        class,
                        response
                            .retry_after
                            .as_deref()
                            .and_then(|v| parse_retry_after(v, Utc::now())),
                        format!("status {}", response.status),
                    ),
                },
                Err(details) => (ResponseClass::Transient, None, details),
            };

            if attempts >= self.policy.max_attempts {
                warn!(request = target, attempts, %details, "giving up after retries");
                return Err(match class {
                    ResponseClass::RateLimited => FetchError::RateLimited {
                        target: target.to_string(),
                        attempts,
                    },
                    _ => FetchError::Transient {
                        target: target.to_string(),
                        attempts,
                        details,
                    },
                });
            }

            match hint {
                Some(hint) => {
                    let delay = self.policy.hinted_delay(hint);
                    warn!(
                        request = target,
                        attempt = attempts,
                        delay_secs = delay.as_secs_f64(),
                        "server requested backoff"
                    );
                    // The next acquire waits the window out, along with every
                    // other caller of this service.
                    self.limiter.backoff(delay);
                }
                None => {
                    let delay = self.policy.delay_for(attempts);
                    debug!(
                        request = target,
                        attempt = attempts,
                        delay_ms = delay.as_millis() as u64,
                        %details,
                        "retrying"
                    );
                    tokio::select! {
                        _ = self.cancel.cancelled() => {
                            return Err(FetchError::Cancelled { target: target.to_string() });
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }
}

/// JSON-over-HTTP client for one remote service.
pub struct ResilientClient {
    client: reqwest::Client,
    fetcher: ResilientFetcher,
    credentials: Option<Arc<dyn CredentialProvider>>,
    read_rate_limit_reset: bool,
}

impl ResilientClient {
    pub fn new(timeout: Duration, fetcher: ResilientFetcher) -> crate::shared::Result<Self> {
        let version = env!("CARGO_PKG_VERSION");
        let user_agent = format!("sbom-enricher/{}", version);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            client,
            fetcher,
            credentials: None,
            read_rate_limit_reset: false,
        })
    }

    pub fn with_credentials(mut self, credentials: Arc<dyn CredentialProvider>) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Also treat `x-ratelimit-reset` as a retry hint when `Retry-After` is
    /// absent.
    pub fn with_rate_limit_reset(mut self) -> Self {
        self.read_rate_limit_reset = true;
        self
    }

    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        let body = self.send(url, || self.client.get(url)).await?;
        decode(url, &body)
    }

    pub async fn post_json<B, T>(&self, url: &str, payload: &B) -> Result<T, FetchError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let body = self.send(url, || self.client.post(url).json(payload)).await?;
        decode(url, &body)
    }

    async fn send<F>(&self, target: &str, build: F) -> Result<String, FetchError>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        let read_rate_limit_reset = self.read_rate_limit_reset;
        self.fetcher
            .execute(target, || {
                let mut request = build();
                if let Some(credentials) = &self.credentials {
                    request = request.header(AUTHORIZATION, credentials.authorization_header());
                }
                async move {
                    let response = request.send().await.map_err(|e| e.to_string())?;
                    let status = response.status().as_u16();
                    let retry_after = retry_hint(response.headers(), read_rate_limit_reset);
                    let body = response.text().await.map_err(|e| e.to_string())?;
                    Ok(RawResponse {
                        status,
                        retry_after,
                        body,
                    })
                }
            })
            .await
    }
}

fn retry_hint(headers: &HeaderMap, read_rate_limit_reset: bool) -> Option<String> {
    headers
        .get(RETRY_AFTER)
        .or_else(|| {
            read_rate_limit_reset
                .then(|| headers.get(RATE_LIMIT_RESET))
                .flatten()
        })
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn decode<T: DeserializeOwned>(target: &str, body: &str) -> Result<T, FetchError> {
    serde_json::from_str(body).map_err(|e| FetchError::Decode {
        target: target.to_string(),
        details: e.to_string(),
    })
}
