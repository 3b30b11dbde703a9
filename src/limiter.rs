// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Per-network token bucket rate limiter.
//!
//! Each client network ([`NetworkId`]) gets its own token bucket, created
//! lazily with a full bucket on first sight. Buckets live in a sharded
//! [`DashMap`], so a check only locks the shard holding its key and clients
//! on other shards never wait on each other. Entries idle for longer than
//! the idle window are removed by [`AddrRateLimiter::reclaim`], normally
//! driven by the background task from [`AddrRateLimiter::spawn_reclaimer`].

use crate::clock::{Clock, MonotonicClock};
use crate::config::TierPolicy;
use crate::network::NetworkId;
use dashmap::DashMap;
use std::net::IpAddr;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

/// Token bucket for a single client network.
#[derive(Debug)]
struct TokenBucket {
    /// Available tokens
    tokens: f64,
    /// Maximum tokens (bucket capacity)
    capacity: f64,
    /// Token refill rate per second
    refill_rate: f64,
    /// Last refill; doubles as the freshness stamp for idle eviction
    last_refill: Instant,
}

impl TokenBucket {
    fn new(policy: &TierPolicy, now: Instant) -> Self {
        let capacity = f64::from(policy.burst);
        Self {
            tokens: capacity,
            capacity,
            refill_rate: policy.rate,
            last_refill: now,
        }
    }

    /// Refill tokens based on elapsed time.
    fn refill(&mut self, now: Instant) {
        if now <= self.last_refill {
            return;
        }
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.capacity);
        self.last_refill = now;
    }

    /// Try to consume a token. Returns true if successful.
    fn try_consume(&mut self, now: Instant) -> bool {
        self.refill(now);
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    fn is_idle(&self, now: Instant, idle_window: Duration) -> bool {
        now.saturating_duration_since(self.last_refill) > idle_window
    }
}

/// Thread-safe rate limiter keyed by client network.
pub struct AddrRateLimiter {
    /// Tier label for logs and metrics
    name: &'static str,
    policy: TierPolicy,
    idle_window: Duration,
    buckets: DashMap<NetworkId, TokenBucket>,
    clock: Arc<dyn Clock>,
}

impl AddrRateLimiter {
    /// Create a limiter using the system clock.
    ///
    /// `policy` is expected to have been validated (positive finite rate,
    /// burst of at least one).
    pub fn new(name: &'static str, policy: TierPolicy, idle_window: Duration) -> Self {
        Self::with_clock(name, policy, idle_window, Arc::new(MonotonicClock))
    }

    pub fn with_clock(
        name: &'static str,
        policy: TierPolicy,
        idle_window: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            name,
            policy,
            idle_window,
            buckets: DashMap::new(),
            clock,
        }
    }

    /// Take one permit for the network `addr` belongs to.
    ///
    /// Returns `false` without consuming anything when the bucket is empty.
    /// Either way the entry's refill and freshness state is updated.
    pub fn allow(&self, addr: IpAddr) -> bool {
        let network = NetworkId::from_addr(addr);
        let now = self.clock.now();

        // The shard stays write-locked until `bucket` drops, which makes the
        // refill-and-draw atomic for this network.
        let allowed = {
            let mut bucket = self
                .buckets
                .entry(network)
                .or_insert_with(|| TokenBucket::new(&self.policy, now));
            bucket.try_consume(now)
        };

        if !allowed {
            debug!(tier = self.name, %network, "Rate limit exceeded");
        }
        allowed
    }

    /// Remove entries idle for longer than the idle window.
    ///
    /// Returns the number of entries removed.
    pub fn reclaim(&self) -> usize {
        let now = self.clock.now();
        let mut removed = 0;
        self.buckets.retain(|_, bucket| {
            let keep = !bucket.is_idle(now, self.idle_window);
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }

    /// Start sweeping idle entries every `every` on the current tokio runtime.
    ///
    /// The task only holds a weak reference and exits on its own once the
    /// limiter is dropped.
    pub fn spawn_reclaimer(self: &Arc<Self>, every: Duration) -> Reclaimer {
        let limiter = Arc::downgrade(self);
        let (stop_tx, stop_rx) = oneshot::channel();
        let every = every.max(Duration::from_millis(1));
        let handle = tokio::spawn(reclaim_loop(limiter, every, stop_rx));

        Reclaimer {
            tier: self.name,
            stop: Some(stop_tx),
            handle: Some(handle),
        }
    }

    /// Number of networks currently tracked.
    pub fn tracked(&self) -> usize {
        self.buckets.len()
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn policy(&self) -> TierPolicy {
        self.policy
    }

    pub fn idle_window(&self) -> Duration {
        self.idle_window
    }
}

impl std::fmt::Debug for AddrRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AddrRateLimiter")
            .field("name", &self.name)
            .field("policy", &self.policy)
            .field("idle_window", &self.idle_window)
            .field("tracked", &self.buckets.len())
            .finish()
    }
}

async fn reclaim_loop(
    limiter: Weak<AddrRateLimiter>,
    every: Duration,
    mut stop: oneshot::Receiver<()>,
) {
    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // First tick completes immediately
    interval.tick().await;

    loop {
        tokio::select! {
            _ = &mut stop => break,
            _ = interval.tick() => {
                let Some(limiter) = limiter.upgrade() else {
                    break;
                };
                let removed = limiter.reclaim();
                if removed > 0 {
                    debug!(
                        tier = limiter.name,
                        removed,
                        remaining = limiter.tracked(),
                        "Reclaimed idle rate limit entries"
                    );
                }
            }
        }
    }
}

/// Handle to a background reclamation task.
///
/// Dropping the handle aborts the task; [`Reclaimer::shutdown`] stops it
/// cleanly and waits for it to finish.
#[derive(Debug)]
pub struct Reclaimer {
    tier: &'static str,
    stop: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Reclaimer {
    pub async fn shutdown(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(handle) = self.handle.take() {
            if let Err(err) = handle.await {
                warn!(tier = self.tier, error = %err, "Reclaimer task failed");
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }
}

impl Drop for Reclaimer {
    fn drop(&mut self) {
        if let Some(handle) = &self.handle {
            handle.abort();
        }
    }
}
