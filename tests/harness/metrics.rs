// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Metrics collection for attack simulation results.

use paste_service::NetworkId;
use std::collections::HashMap;
use std::time::Duration;

/// Collects metrics during attack simulation.
#[derive(Debug, Default)]
pub struct AttackMetrics {
    /// Simulated time the attack spanned
    simulated: Duration,
    /// Count of requests by outcome
    outcomes: HashMap<Outcome, usize>,
    /// Count of requests by network
    requests_per_network: HashMap<NetworkId, usize>,
    /// Count of admitted requests by network
    allowed_per_network: HashMap<NetworkId, usize>,
    /// Latency samples (microseconds)
    latencies: Vec<u64>,
}

/// Possible outcomes for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Allowed,
    LimitedGlobal,
    LimitedCreate,
}

impl AttackMetrics {
    /// Create a new metrics collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the simulated time the attack spanned.
    pub fn finish(&mut self, simulated: Duration) {
        self.simulated = simulated;
    }

    /// Record a request outcome.
    pub fn record(&mut self, outcome: Outcome, network: NetworkId, latency: Duration) {
        *self.outcomes.entry(outcome).or_insert(0) += 1;
        *self.requests_per_network.entry(network).or_insert(0) += 1;
        if outcome == Outcome::Allowed {
            *self.allowed_per_network.entry(network).or_insert(0) += 1;
        }
        self.latencies.push(latency.as_micros() as u64);
    }

    /// Get total request count.
    pub fn total_requests(&self) -> usize {
        self.outcomes.values().sum()
    }

    /// Get count for a specific outcome.
    pub fn count(&self, outcome: Outcome) -> usize {
        self.outcomes.get(&outcome).copied().unwrap_or(0)
    }

    /// Largest number of admitted requests any single network got.
    pub fn max_allowed_per_network(&self) -> usize {
        self.allowed_per_network.values().copied().max().unwrap_or(0)
    }

    /// Get block rate (ratio of blocked to total).
    pub fn block_rate(&self) -> f64 {
        let total = self.total_requests();
        if total == 0 {
            return 0.0;
        }
        let allowed = self.count(Outcome::Allowed);
        (total - allowed) as f64 / total as f64
    }

    /// Get median latency in microseconds.
    pub fn median_latency_us(&self) -> u64 {
        if self.latencies.is_empty() {
            return 0;
        }
        let mut sorted = self.latencies.clone();
        sorted.sort_unstable();
        sorted[sorted.len() / 2]
    }

    /// Get p99 latency in microseconds.
    pub fn p99_latency_us(&self) -> u64 {
        if self.latencies.is_empty() {
            return 0;
        }
        let mut sorted = self.latencies.clone();
        sorted.sort_unstable();
        let idx = (sorted.len() as f64 * 0.99) as usize;
        sorted[idx.min(sorted.len() - 1)]
    }

    /// Get number of distinct networks that made requests.
    pub fn unique_networks(&self) -> usize {
        self.requests_per_network.len()
    }

    /// Generate a summary report.
    pub fn report(&self) -> MetricsReport {
        MetricsReport {
            total_requests: self.total_requests(),
            allowed: self.count(Outcome::Allowed),
            limited_global: self.count(Outcome::LimitedGlobal),
            limited_create: self.count(Outcome::LimitedCreate),
            simulated_ms: self.simulated.as_millis() as u64,
            block_rate: self.block_rate(),
            median_latency_us: self.median_latency_us(),
            p99_latency_us: self.p99_latency_us(),
            unique_networks: self.unique_networks(),
            max_allowed_per_network: self.max_allowed_per_network(),
        }
    }
}

/// Summary report of attack metrics.
#[derive(Debug, Clone)]
pub struct MetricsReport {
    pub total_requests: usize,
    pub allowed: usize,
    pub limited_global: usize,
    pub limited_create: usize,
    pub simulated_ms: u64,
    pub block_rate: f64,
    pub median_latency_us: u64,
    pub p99_latency_us: u64,
    pub unique_networks: usize,
    pub max_allowed_per_network: usize,
}

impl std::fmt::Display for MetricsReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Attack Metrics Report ===")?;
        writeln!(f, "Simulated:         {} ms", self.simulated_ms)?;
        writeln!(f, "Total Requests:    {}", self.total_requests)?;
        writeln!(f)?;
        writeln!(f, "--- Outcomes ---")?;
        writeln!(f, "Allowed:           {} ({:.1}%)",
            self.allowed,
            self.allowed as f64 / self.total_requests.max(1) as f64 * 100.0)?;
        writeln!(f, "Limited (Global):  {}", self.limited_global)?;
        writeln!(f, "Limited (Create):  {}", self.limited_create)?;
        writeln!(f, "Block Rate:        {:.1}%", self.block_rate * 100.0)?;
        writeln!(f)?;
        writeln!(f, "--- Latency ---")?;
        writeln!(f, "Median:            {} us", self.median_latency_us)?;
        writeln!(f, "P99:               {} us", self.p99_latency_us)?;
        writeln!(f)?;
        writeln!(f, "--- Distribution ---")?;
        writeln!(f, "Unique Networks:   {}", self.unique_networks)?;
        writeln!(f, "Max per Network:   {}", self.max_allowed_per_network)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::IpAddr;

    fn network(addr: &str) -> NetworkId {
        NetworkId::from(addr.parse::<IpAddr>().unwrap())
    }

    #[test]
    fn test_metrics_collection() {
        let mut metrics = AttackMetrics::new();

        metrics.record(Outcome::Allowed, network("10.0.0.1"), Duration::from_micros(100));
        metrics.record(Outcome::Allowed, network("2001:db8::1"), Duration::from_micros(150));
        metrics.record(Outcome::LimitedCreate, network("2001:db8::2"), Duration::from_micros(50));

        metrics.finish(Duration::from_secs(1));

        assert_eq!(metrics.total_requests(), 3);
        assert_eq!(metrics.count(Outcome::Allowed), 2);
        assert_eq!(metrics.count(Outcome::LimitedCreate), 1);
        assert_eq!(metrics.unique_networks(), 2);
        assert_eq!(metrics.max_allowed_per_network(), 1);
    }

    #[test]
    fn test_block_rate() {
        let mut metrics = AttackMetrics::new();
        for _ in 0..3 {
            metrics.record(Outcome::Allowed, network("10.0.0.1"), Duration::ZERO);
        }
        for _ in 0..7 {
            metrics.record(Outcome::LimitedGlobal, network("10.0.0.1"), Duration::ZERO);
        }

        assert!((metrics.block_rate() - 0.7).abs() < 0.01);
    }
}
