// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Client network identity used as the rate limiting key.
//!
//! IPv4 clients are keyed by their full address (/32). IPv6 clients are keyed
//! by their /64 prefix, since a single subscriber usually controls a whole
//! /64 and could otherwise rotate through addresses to dodge the limit.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Prefix length applied to IPv4 addresses.
pub const IPV4_PREFIX_LEN: u8 = 32;

/// Prefix length applied to IPv6 addresses.
pub const IPV6_PREFIX_LEN: u8 = 64;

/// A client address truncated to its rate limiting prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NetworkId {
    V4(Ipv4Addr),
    V6(Ipv6Addr),
}

impl NetworkId {
    /// Truncate `addr` to its network prefix.
    ///
    /// IPv4-mapped IPv6 addresses (`::ffff:a.b.c.d`) are keyed as the IPv4
    /// address they carry.
    pub fn from_addr(addr: IpAddr) -> Self {
        match addr {
            IpAddr::V4(v4) => Self::V4(v4),
            IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
                Some(v4) => Self::V4(v4),
                None => Self::V6(mask_v6(v6, IPV6_PREFIX_LEN)),
            },
        }
    }

    pub fn prefix_len(&self) -> u8 {
        match self {
            Self::V4(_) => IPV4_PREFIX_LEN,
            Self::V6(_) => IPV6_PREFIX_LEN,
        }
    }
}

impl From<IpAddr> for NetworkId {
    fn from(addr: IpAddr) -> Self {
        Self::from_addr(addr)
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V4(addr) => write!(f, "{}/{}", addr, IPV4_PREFIX_LEN),
            Self::V6(addr) => write!(f, "{}/{}", addr, IPV6_PREFIX_LEN),
        }
    }
}

fn mask_v6(addr: Ipv6Addr, prefix_len: u8) -> Ipv6Addr {
    let bits = u128::from(addr);
    let mask = u128::MAX.checked_shl(128 - u32::from(prefix_len)).unwrap_or(0);
    Ipv6Addr::from(bits & mask)
}
