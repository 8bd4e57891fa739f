//! The gateway's closed error taxonomy.
//!
//! Every user-visible failure from the gateway is one of these seven kinds
//! (spec §7). Internal layers (token bucket, circuit breaker, retry engine)
//! have their own narrower error types but always collapse into one of
//! these before crossing the facade boundary, so callers never need to
//! pattern-match on an open-ended error tree.

use std::fmt;
use std::time::Duration;

/// A single provider's contribution to an [`GatewayError::AllProvidersFailed`].
#[derive(Debug, Clone)]
pub struct ProviderFailure {
    pub provider: String,
    pub reason: Box<GatewayError>,
}

impl fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.provider, self.reason)
    }
}

/// Stable error kind code, for callers who want to branch on kind without
/// matching the full enum (e.g. across an FFI or RPC boundary).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Timeout,
    BreakerOpen,
    RateLimited,
    Cancelled,
    Upstream,
    AllProvidersFailed,
    CapacityExceeded,
}

#[derive(Debug, Clone)]
pub enum GatewayError {
    /// The request exceeded its per-request deadline, in queue or mid-call.
    Timeout,
    /// All eligible providers had an open circuit; no call was attempted.
    BreakerOpen { provider: String },
    /// The rate limit could not be satisfied within the allowed wait.
    RateLimited { retry_after: Option<Duration> },
    /// The caller cancelled the request.
    Cancelled,
    /// A non-retryable HTTP status, or a malformed response after retries.
    Upstream { status: Option<u16>, message: String },
    /// Every provider in the failover chain was exhausted.
    AllProvidersFailed { attempts: Vec<ProviderFailure> },
    /// The priority queue was full when the request was submitted.
    CapacityExceeded { limit: usize },
}

impl GatewayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GatewayError::Timeout => ErrorKind::Timeout,
            GatewayError::BreakerOpen { .. } => ErrorKind::BreakerOpen,
            GatewayError::RateLimited { .. } => ErrorKind::RateLimited,
            GatewayError::Cancelled => ErrorKind::Cancelled,
            GatewayError::Upstream { .. } => ErrorKind::Upstream,
            GatewayError::AllProvidersFailed { .. } => ErrorKind::AllProvidersFailed,
            GatewayError::CapacityExceeded { .. } => ErrorKind::CapacityExceeded,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, GatewayError::Timeout)
    }

    pub fn is_breaker_open(&self) -> bool {
        matches!(self, GatewayError::BreakerOpen { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, GatewayError::Cancelled)
    }

    /// Retryable HTTP statuses per spec §6: 408, 429, 500, 502, 503, 504.
    pub fn is_retryable_status(status: u16) -> bool {
        matches!(status, 408 | 429 | 500 | 502 | 503 | 504)
    }
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayError::Timeout => write!(f, "request timed out"),
            GatewayError::BreakerOpen { provider } => {
                write!(f, "circuit breaker open for provider '{}'", provider)
            }
            GatewayError::RateLimited { retry_after } => match retry_after {
                Some(d) => write!(f, "rate limited, retry after {:?}", d),
                None => write!(f, "rate limited"),
            },
            GatewayError::Cancelled => write!(f, "request cancelled"),
            GatewayError::Upstream { status, message } => match status {
                Some(s) => write!(f, "upstream error ({}): {}", s, message),
                None => write!(f, "upstream error: {}", message),
            },
            GatewayError::AllProvidersFailed { attempts } => {
                write!(f, "all providers failed: ")?;
                for (i, a) in attempts.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{}", a)?;
                }
                Ok(())
            }
            GatewayError::CapacityExceeded { limit } => {
                write!(f, "queue capacity exceeded (limit {})", limit)
            }
        }
    }
}

impl std::error::Error for GatewayError {}
