use crate::config::TokenBucketConfig;
use crate::events::TokenBucketEvent;
use parking_lot::Mutex;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

#[cfg(feature = "metrics")]
use metrics::{counter, gauge};

/// Point-in-time view of the bucket's levels and adaptive rates, consulted
/// by the provider client for its pre-call adaptive delay (spec §4.6).
#[derive(Debug, Clone, Copy)]
pub struct TokenBucketSnapshot {
    pub per_second_tokens: f64,
    pub per_minute_tokens: f64,
    pub per_second_capacity: f64,
    pub per_minute_capacity: f64,
    pub per_second_rate: f64,
    pub per_minute_rate: f64,
    pub remaining_requests: Option<u64>,
    pub remaining_tokens: Option<u64>,
    pub reset_hint: Option<Duration>,
}

impl TokenBucketSnapshot {
    /// `remaining/capacity` for the per-second window, used by the
    /// provider client's adaptive-delay formula.
    pub fn remaining_per_second(&self) -> f64 {
        self.per_second_tokens
    }

    pub fn remaining_per_minute(&self) -> f64 {
        self.per_minute_tokens
    }
}

struct HeaderSnapshot {
    remaining_requests: u64,
    remaining_tokens: u64,
    reset_hint: Duration,
    taken_at: Instant,
}

struct State {
    per_second_tokens: f64,
    per_minute_tokens: f64,
    per_second_rate: f64,
    per_minute_rate: f64,
    last_refill: Instant,
    header: Option<HeaderSnapshot>,
}

/// Outcome of [`TokenBucket::try_consume`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeOutcome {
    Granted,
    Cancelled,
}

/// Dual-window (per-second, per-minute) token bucket (spec §3, §4.1).
///
/// A consumption is granted only when both windows have at least one token
/// available; both decrement together. Refill is lazy and computed from
/// elapsed wall-clock time on every check, and the refill rates themselves
/// adapt when a recent upstream rate-limit header snapshot is present.
pub struct TokenBucket {
    config: TokenBucketConfig,
    state: Mutex<State>,
}

/// Headers recognized for adaptive tuning (spec §4.1, §6).
const HEADER_FRESHNESS: Duration = Duration::from_secs(60);
const LOW_WATERMARK: f64 = 0.2;
const HIGH_WATERMARK: f64 = 0.5;
const BACKOFF_MULTIPLIER: f64 = 0.8;
const RECOVERY_MULTIPLIER: f64 = 1.1;

impl TokenBucket {
    pub fn builder() -> crate::config::TokenBucketConfigBuilder {
        crate::config::TokenBucketConfigBuilder::new()
    }

    pub(crate) fn from_config(config: TokenBucketConfig) -> Self {
        let now = Instant::now();
        let state = State {
            per_second_tokens: config.per_second_capacity,
            per_minute_tokens: config.per_minute_capacity,
            per_second_rate: config.base_per_second_rate,
            per_minute_rate: config.base_per_minute_rate,
            last_refill: now,
            header: None,
        };
        Self {
            config,
            state: Mutex::new(state),
        }
    }

    /// Attempts to consume one unit from both windows, polling at
    /// `poll_interval` until granted or until `cancel` fires.
    pub async fn try_consume(&self, cancel: &CancellationToken) -> ConsumeOutcome {
        let started = Instant::now();
        loop {
            if self.try_consume_once() {
                let waited = started.elapsed();
                self.config
                    .event_listeners
                    .emit(&TokenBucketEvent::Consumed {
                        name: self.config.name.clone(),
                        timestamp: Instant::now(),
                        waited,
                    });
                #[cfg(feature = "metrics")]
                counter!("tokenbucket_consumed_total", "bucket" => self.config.name.clone())
                    .increment(1);
                return ConsumeOutcome::Granted;
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    self.config.event_listeners.emit(&TokenBucketEvent::Cancelled {
                        name: self.config.name.clone(),
                        timestamp: Instant::now(),
                    });
                    return ConsumeOutcome::Cancelled;
                }
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }
    }

    /// Non-blocking single attempt: refills, then consumes if both windows
    /// have at least one token.
    fn try_consume_once(&self) -> bool {
        let mut state = self.state.lock();
        self.refill_locked(&mut state);

        if state.per_second_tokens >= 1.0 && state.per_minute_tokens >= 1.0 {
            state.per_second_tokens -= 1.0;
            state.per_minute_tokens -= 1.0;
            true
        } else {
            false
        }
    }

    fn refill_locked(&self, state: &mut State) {
        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill).as_secs_f64();
        state.last_refill = now;

        state.per_second_tokens = (state.per_second_tokens + elapsed * state.per_second_rate)
            .min(self.config.per_second_capacity);
        state.per_minute_tokens = (state.per_minute_tokens
            + elapsed * (state.per_minute_rate / 60.0))
            .min(self.config.per_minute_capacity);

        self.adapt_rates_locked(state);
    }

    /// Adaptive tuning rule from spec §4.1, applied only while a header
    /// snapshot younger than 60s exists.
    fn adapt_rates_locked(&self, state: &mut State) {
        let Some(header) = &state.header else { return };
        if header.taken_at.elapsed() >= HEADER_FRESHNESS {
            return;
        }

        let req_pct = header.remaining_requests as f64
            / self.config.per_minute_capacity.max(1.0);
        let tok_pct = header.remaining_tokens as f64 / self.config.per_minute_capacity.max(1.0);

        let mut changed = false;
        if req_pct < LOW_WATERMARK || tok_pct < LOW_WATERMARK {
            state.per_second_rate *= BACKOFF_MULTIPLIER;
            state.per_minute_rate *= BACKOFF_MULTIPLIER;
            changed = true;
        } else if req_pct > HIGH_WATERMARK && tok_pct > HIGH_WATERMARK {
            state.per_second_rate =
                (state.per_second_rate * RECOVERY_MULTIPLIER).min(self.config.base_per_second_rate);
            state.per_minute_rate =
                (state.per_minute_rate * RECOVERY_MULTIPLIER).min(self.config.base_per_minute_rate);
            changed = true;
        }

        if changed {
            self.config
                .event_listeners
                .emit(&TokenBucketEvent::RateAdapted {
                    name: self.config.name.clone(),
                    timestamp: Instant::now(),
                    per_second_rate: state.per_second_rate,
                    per_minute_rate: state.per_minute_rate,
                });
            #[cfg(feature = "metrics")]
            {
                gauge!("tokenbucket_per_second_rate", "bucket" => self.config.name.clone())
                    .set(state.per_second_rate);
                gauge!("tokenbucket_per_minute_rate", "bucket" => self.config.name.clone())
                    .set(state.per_minute_rate);
            }
        }
    }

    /// Feeds a parsed upstream rate-limit header triple into the bucket
    /// (spec §4.1: `x-ratelimit-remaining-requests`,
    /// `x-ratelimit-remaining-tokens`, `x-ratelimit-reset`). The caller is
    /// expected to have already confirmed all three parsed before calling
    /// this, so the snapshot updates atomically.
    pub fn update_from_headers(
        &self,
        remaining_requests: u64,
        remaining_tokens: u64,
        reset_hint: Duration,
    ) {
        let mut state = self.state.lock();
        state.header = Some(HeaderSnapshot {
            remaining_requests,
            remaining_tokens,
            reset_hint,
            taken_at: Instant::now(),
        });
    }

    pub fn snapshot(&self) -> TokenBucketSnapshot {
        let mut state = self.state.lock();
        self.refill_locked(&mut state);
        TokenBucketSnapshot {
            per_second_tokens: state.per_second_tokens,
            per_minute_tokens: state.per_minute_tokens,
            per_second_capacity: self.config.per_second_capacity,
            per_minute_capacity: self.config.per_minute_capacity,
            per_second_rate: state.per_second_rate,
            per_minute_rate: state.per_minute_rate,
            remaining_requests: state.header.as_ref().map(|h| h.remaining_requests),
            remaining_tokens: state.header.as_ref().map(|h| h.remaining_tokens),
            reset_hint: state.header.as_ref().map(|h| h.reset_hint),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn grants_up_to_burst_capacity_immediately() {
        let bucket = TokenBucket::builder()
            .per_second_capacity(3.0)
            .per_minute_capacity(100.0)
            .build();

        for _ in 0..3 {
            let cancel = CancellationToken::new();
            assert_eq!(bucket.try_consume(&cancel).await, ConsumeOutcome::Granted);
        }

        let snap = bucket.snapshot();
        assert!(snap.per_second_tokens < 1.0);
    }

    #[tokio::test]
    async fn consume_decrements_both_windows_together() {
        let bucket = TokenBucket::builder()
            .per_second_capacity(5.0)
            .per_minute_capacity(5.0)
            .build();

        let cancel = CancellationToken::new();
        bucket.try_consume(&cancel).await;
        let snap = bucket.snapshot();
        assert!((snap.per_second_tokens - 4.0).abs() < 0.01);
        assert!((snap.per_minute_tokens - 4.0).abs() < 0.01);
    }

    #[tokio::test]
    async fn cancellation_stops_the_wait() {
        let bucket = TokenBucket::builder()
            .per_second_capacity(0.0)
            .base_per_second_rate(0.0)
            .per_minute_capacity(0.0)
            .base_per_minute_rate(0.0)
            .poll_interval(Duration::from_millis(5))
            .build();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let outcome = bucket.try_consume(&cancel).await;
        assert_eq!(outcome, ConsumeOutcome::Cancelled);
    }

    #[test]
    fn adaptive_tuning_backs_off_below_low_watermark() {
        let bucket = TokenBucket::builder()
            .per_second_capacity(5.0)
            .per_minute_capacity(100.0)
            .base_per_second_rate(1.0)
            .base_per_minute_rate(50.0)
            .build();

        // 10/100 remaining => 10% < 20% watermark.
        bucket.update_from_headers(10, 10, Duration::from_secs(30));
        let snap = bucket.snapshot();
        assert!(snap.per_second_rate < 1.0);
        assert!(snap.per_minute_rate < 50.0);
    }

    #[test]
    fn adaptive_tuning_recovers_above_high_watermark_but_never_exceeds_base() {
        let bucket = TokenBucket::builder()
            .per_second_capacity(5.0)
            .per_minute_capacity(100.0)
            .base_per_second_rate(1.0)
            .base_per_minute_rate(50.0)
            .build();

        bucket.update_from_headers(90, 90, Duration::from_secs(30));
        let snap = bucket.snapshot();
        assert!(snap.per_second_rate <= 1.0);
        assert!(snap.per_minute_rate <= 50.0);
    }

    #[test]
    fn stale_header_snapshot_is_ignored() {
        let bucket = TokenBucket::builder().build();
        {
            let mut state = bucket.state.lock();
            state.header = Some(HeaderSnapshot {
                remaining_requests: 1,
                remaining_tokens: 1,
                reset_hint: Duration::from_secs(30),
                taken_at: Instant::now() - Duration::from_secs(120),
            });
        }
        let before = bucket.snapshot().per_second_rate;
        assert_eq!(before, 1.0);
    }
}
