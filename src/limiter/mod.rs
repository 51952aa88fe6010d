//! Admission control consulted by callers before they hand a request to the gateway.

pub mod rate_limiter;

pub use rate_limiter::{RateLimitConfig, RateLimitError, RateLimiter, RateLimiterStatus, RatePermit};
