// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Client address generators for attack simulation.

use super::attacks::AttackConfig;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Generate a pool of IPv4 addresses, one per network.
pub fn generate_ipv4(count: usize) -> Vec<IpAddr> {
    (0..count)
        .map(|i| {
            // Use 10.x.x.x private range
            let a = ((i >> 16) & 0xFF) as u8;
            let b = ((i >> 8) & 0xFF) as u8;
            let c = (i & 0xFF) as u8;
            IpAddr::V4(Ipv4Addr::new(10, a, b, c))
        })
        .collect()
}

/// Generate IPv6 addresses, `per_network` hosts in each of `networks` /64s.
///
/// Hosts of one network are adjacent so that round-robin over the pool
/// rotates addresses before it rotates networks.
pub fn generate_ipv6(networks: usize, per_network: usize) -> Vec<IpAddr> {
    (0..networks)
        .flat_map(|n| {
            (0..per_network).map(move |h| {
                let hi = ((n >> 16) & 0xFFFF) as u16;
                let lo = (n & 0xFFFF) as u16;
                IpAddr::V6(Ipv6Addr::new(
                    0x2001,
                    0xdb8,
                    hi,
                    lo,
                    0,
                    0,
                    ((h >> 16) & 0xFFFF) as u16,
                    (h & 0xFFFF) as u16,
                ))
            })
        })
        .collect()
}

/// Generate the address pool for an attack pattern.
pub fn generate_addrs(config: &AttackConfig) -> Vec<IpAddr> {
    if config.ipv6 {
        generate_ipv6(config.unique_networks, config.addrs_per_network)
    } else {
        generate_ipv4(config.unique_networks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paste_service::NetworkId;
    use std::collections::HashSet;

    #[test]
    fn test_generate_ipv4() {
        let ips = generate_ipv4(256);
        assert_eq!(ips.len(), 256);
        // All should be unique
        let unique: HashSet<_> = ips.iter().collect();
        assert_eq!(unique.len(), 256);
    }

    #[test]
    fn test_generate_ipv6_networks() {
        let ips = generate_ipv6(3, 10);
        assert_eq!(ips.len(), 30);

        let addrs: HashSet<_> = ips.iter().collect();
        assert_eq!(addrs.len(), 30);

        let networks: HashSet<_> = ips.iter().map(|ip| NetworkId::from(*ip)).collect();
        assert_eq!(networks.len(), 3);
    }
}
