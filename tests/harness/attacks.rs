// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Attack simulation patterns for security testing.

use std::time::Duration;

/// What each simulated request does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Read-only request, global tier only
    Browse,
    /// Paste creation, global then creation tier
    Create,
}

/// Attack pattern configuration.
#[derive(Debug, Clone)]
pub struct AttackConfig {
    /// Total number of requests to send
    pub total_requests: usize,
    /// Requests per second rate (simulated time)
    pub requests_per_second: f64,
    /// Number of distinct networks (IPv4 address or IPv6 /64)
    pub unique_networks: usize,
    /// Addresses rotated through inside each network
    pub addrs_per_network: usize,
    /// Use IPv6 clients
    pub ipv6: bool,
    /// Request kind
    pub action: Action,
}

impl Default for AttackConfig {
    fn default() -> Self {
        Self {
            total_requests: 100,
            requests_per_second: 10.0,
            unique_networks: 1,
            addrs_per_network: 1,
            ipv6: false,
            action: Action::Browse,
        }
    }
}

/// Predefined attack patterns.
impl AttackConfig {
    /// Single network flood - basic DoS from one address.
    pub fn single_network_flood() -> Self {
        Self {
            total_requests: 1000,
            requests_per_second: 100.0,
            ..Default::default()
        }
    }

    /// IPv6 rotation - one /64, a fresh address for every request.
    pub fn ipv6_rotation() -> Self {
        Self {
            total_requests: 100,
            requests_per_second: 50.0,
            addrs_per_network: 100,
            ipv6: true,
            action: Action::Create,
            ..Default::default()
        }
    }

    /// Distributed clients - many networks, low rate each.
    pub fn distributed_clients() -> Self {
        Self {
            total_requests: 1000,
            requests_per_second: 100.0,
            unique_networks: 100,
            ..Default::default()
        }
    }

    /// Creation spam - one address saving pastes as fast as it can.
    pub fn creation_spam() -> Self {
        Self {
            total_requests: 100,
            requests_per_second: 10.0,
            action: Action::Create,
            ..Default::default()
        }
    }

    /// Slow drip - creation just under the refill rate.
    pub fn slow_drip() -> Self {
        Self {
            total_requests: 50,
            requests_per_second: 0.19,
            action: Action::Create,
            ..Default::default()
        }
    }

    /// Interval between consecutive requests.
    pub fn interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.requests_per_second)
    }

    /// Calculate expected duration for the attack.
    pub fn expected_duration(&self) -> Duration {
        Duration::from_secs_f64(self.total_requests as f64 / self.requests_per_second)
    }

    /// Upper bound on admitted requests per network for a tier with the
    /// given rate and burst over this attack's duration.
    pub fn max_admitted_per_network(&self, rate: f64, burst: u32) -> usize {
        (burst as f64 + rate * self.expected_duration().as_secs_f64()).floor() as usize + 1
    }
}
