/// Network adapters: the resilient fetch layer shared by all sources
mod credentials;
mod rate_limiter;
mod resilient_client;
mod retry;

pub use credentials::TokenCredentials;
pub use rate_limiter::{Interrupted, RateLimiter, DEFAULT_BURST, DEFAULT_REQUESTS_PER_SECOND};
pub use resilient_client::{RawResponse, ResilientClient, ResilientFetcher};
pub use retry::{
    classify, parse_retry_after, ResponseClass, RetryPolicy, DEFAULT_BASE_DELAY,
    DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_DELAY, MAX_RETRY_AFTER,
};
