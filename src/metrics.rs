// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Prometheus metrics for admission decisions and paste creation.

use crate::admission::{Admission, Tier};
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder};

/// Service metrics backed by a private registry.
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    checks: IntCounterVec,
    tracked: IntGaugeVec,
    created: IntCounter,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let checks = IntCounterVec::new(
            Opts::new(
                "paste_rate_limit_checks_total",
                "Rate limit checks by tier and outcome",
            ),
            &["tier", "outcome"],
        )?;
        let tracked = IntGaugeVec::new(
            Opts::new(
                "paste_rate_limit_tracked_networks",
                "Client networks currently tracked per tier",
            ),
            &["tier"],
        )?;
        let created = IntCounter::new("paste_created_total", "Pastes stored")?;

        registry.register(Box::new(checks.clone()))?;
        registry.register(Box::new(tracked.clone()))?;
        registry.register(Box::new(created.clone()))?;

        Ok(Self {
            registry,
            checks,
            tracked,
            created,
        })
    }

    pub fn record_check(&self, tier: Tier, allowed: bool) {
        let outcome = if allowed { "allowed" } else { "limited" };
        self.checks
            .with_label_values(&[tier.as_str(), outcome])
            .inc();
    }

    pub fn paste_created(&self) {
        self.created.inc();
    }

    /// Encode all metrics in the Prometheus text format.
    ///
    /// Tracked-network gauges are sampled from `admission` at scrape time.
    pub fn render(&self, admission: &Admission) -> Result<String, prometheus::Error> {
        for tier in Tier::ALL {
            let tracked = i64::try_from(admission.limiter(tier).tracked()).unwrap_or(i64::MAX);
            self.tracked.with_label_values(&[tier.as_str()]).set(tracked);
        }

        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|err| prometheus::Error::Msg(err.to_string()))
    }
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admission::ClientAddrResolver;
    use crate::clock::ManualClock;
    use crate::config::RateLimitConfig;
    use std::net::IpAddr;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_tracked_gauge_follows_reclaim() {
        let clock = ManualClock::new();
        let metrics = Metrics::new().unwrap();
        let admission = Admission::new(
            &RateLimitConfig::default(),
            ClientAddrResolver::default(),
            Arc::new(clock.clone()),
            metrics.clone(),
        );

        for ip in ["10.0.0.1", "10.0.0.2"] {
            admission.admit(Tier::Global, ip.parse::<IpAddr>().unwrap());
        }
        let text = metrics.render(&admission).unwrap();
        assert!(text.contains(r#"paste_rate_limit_tracked_networks{tier="global"} 2"#));
        assert!(text.contains(r#"paste_rate_limit_checks_total{outcome="allowed",tier="global"} 2"#));

        clock.advance(Duration::from_secs(61));
        assert_eq!(admission.limiter(Tier::Global).reclaim(), 2);

        let text = metrics.render(&admission).unwrap();
        assert!(text.contains(r#"paste_rate_limit_tracked_networks{tier="global"} 0"#));
    }
}
