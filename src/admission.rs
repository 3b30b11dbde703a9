// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Request admission: client address resolution and the two rate limit
//! tiers.
//!
//! Every request passes the global tier before anything else runs,
//! including reading the body. Paste creation additionally passes the
//! creation tier, checked by the save handler once the body is known to be
//! acceptable and before anything is generated or stored.

use crate::clock::Clock;
use crate::config::{ConfigError, RateLimitConfig};
use crate::handlers::AppState;
use crate::limiter::{AddrRateLimiter, Reclaimer};
use crate::metrics::Metrics;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Rate limit tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    /// Every inbound request
    Global,
    /// Paste creation only
    Create,
}

impl Tier {
    pub const ALL: [Tier; 2] = [Tier::Global, Tier::Create];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Global => "global",
            Self::Create => "create",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admit {
    Allowed,
    Limited {
        /// Suggested wait before retrying
        retry_after: Duration,
    },
}

impl Admit {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Admit::Allowed)
    }
}

/// The resolved client address, stored in request extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientIp(pub IpAddr);

/// Why a client address could not be determined.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AddrError {
    #[error("Malformed client address in {header} header")]
    MalformedHeader { header: String },

    #[error("Client address unavailable")]
    Missing,
}

/// Picks the address requests are rate limited by.
#[derive(Debug, Clone, Default)]
pub struct ClientAddrResolver {
    trusted_header: Option<HeaderName>,
}

impl ClientAddrResolver {
    /// `trusted_header` must only be set when the service sits behind a
    /// reverse proxy that always overwrites that header.
    pub fn new(trusted_header: Option<&str>) -> Result<Self, ConfigError> {
        let trusted_header = trusted_header
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(|name| {
                HeaderName::try_from(name).map_err(|_| ConfigError::InvalidHeader(name.to_string()))
            })
            .transpose()?;
        Ok(Self { trusted_header })
    }

    /// Prefer the trusted proxy header when present, else the peer address.
    ///
    /// A trusted header that is present but unparseable is an error rather
    /// than a silent fallback to the proxy's own address, which would lump
    /// every client into one bucket.
    pub fn resolve(&self, headers: &HeaderMap, peer: Option<SocketAddr>) -> Result<IpAddr, AddrError> {
        if let Some(name) = &self.trusted_header {
            if let Some(value) = headers.get(name) {
                return parse_forwarded(value).ok_or_else(|| AddrError::MalformedHeader {
                    header: name.to_string(),
                });
            }
        }
        peer.map(|addr| addr.ip()).ok_or(AddrError::Missing)
    }
}

/// Parse a proxy-supplied address. For list-valued headers the last entry
/// is the one appended by the nearest (trusted) proxy.
fn parse_forwarded(value: &HeaderValue) -> Option<IpAddr> {
    let value = value.to_str().ok()?;
    let last = value.rsplit(',').next()?.trim();
    last.parse::<IpAddr>()
        .ok()
        .or_else(|| last.parse::<SocketAddr>().ok().map(|addr| addr.ip()))
}

/// Both admission tiers plus the address resolver.
#[derive(Debug)]
pub struct Admission {
    global: Arc<AddrRateLimiter>,
    create: Arc<AddrRateLimiter>,
    resolver: ClientAddrResolver,
    metrics: Metrics,
    reclaim_interval: Duration,
}

impl Admission {
    pub fn new(
        config: &RateLimitConfig,
        resolver: ClientAddrResolver,
        clock: Arc<dyn Clock>,
        metrics: Metrics,
    ) -> Self {
        let idle_window = config.idle_window();
        let global = AddrRateLimiter::with_clock(
            Tier::Global.as_str(),
            config.global,
            idle_window,
            clock.clone(),
        );
        let create =
            AddrRateLimiter::with_clock(Tier::Create.as_str(), config.create, idle_window, clock);

        Self {
            global: Arc::new(global),
            create: Arc::new(create),
            resolver,
            metrics,
            reclaim_interval: config.reclaim_interval(),
        }
    }

    pub fn limiter(&self, tier: Tier) -> &Arc<AddrRateLimiter> {
        match tier {
            Tier::Global => &self.global,
            Tier::Create => &self.create,
        }
    }

    pub fn resolver(&self) -> &ClientAddrResolver {
        &self.resolver
    }

    /// Check `ip` against `tier`, consuming a permit when allowed.
    pub fn admit(&self, tier: Tier, ip: IpAddr) -> Admit {
        let limiter = self.limiter(tier);
        let allowed = limiter.allow(ip);
        self.metrics.record_check(tier, allowed);

        if allowed {
            Admit::Allowed
        } else {
            info!(tier = %tier, client_ip = %ip, "Request rate limited");
            Admit::Limited {
                retry_after: limiter.policy().refill_interval(),
            }
        }
    }

    /// Spawn the idle reclamation task for each tier.
    pub fn start_reclaimers(&self) -> Vec<Reclaimer> {
        Tier::ALL
            .iter()
            .map(|tier| self.limiter(*tier).spawn_reclaimer(self.reclaim_interval))
            .collect()
    }
}

/// Whole seconds for a `Retry-After` header, rounded up, at least one.
pub fn retry_after_secs(retry_after: Duration) -> u64 {
    let secs = retry_after.as_secs();
    let secs = if retry_after.subsec_nanos() > 0 { secs.saturating_add(1) } else { secs };
    secs.max(1)
}

/// Resolve the client address and store it as [`ClientIp`].
pub async fn resolve_client_addr(
    State(state): State<Arc<AppState>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    mut request: Request,
    next: Next,
) -> Response {
    let peer = connect_info.map(|ConnectInfo(addr)| addr);

    match state.admission.resolver().resolve(request.headers(), peer) {
        Ok(ip) => {
            request.extensions_mut().insert(ClientIp(ip));
            next.run(request).await
        }
        Err(err) => {
            warn!(
                error = %err,
                method = %request.method(),
                uri = %request.uri(),
                "Rejecting request without usable client address"
            );
            (StatusCode::BAD_REQUEST, "Bad Request").into_response()
        }
    }
}

/// Global tier check, applied before the request reaches any handler.
pub async fn global_rate_limit(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(ClientIp(ip)) = request.extensions().get::<ClientIp>().copied() else {
        return (StatusCode::BAD_REQUEST, "Bad Request").into_response();
    };

    match state.admission.admit(Tier::Global, ip) {
        Admit::Allowed => next.run(request).await,
        Admit::Limited { retry_after } => (
            StatusCode::TOO_MANY_REQUESTS,
            [(header::RETRY_AFTER, retry_after_secs(retry_after).to_string())],
            "Too Many Requests",
        )
            .into_response(),
    }
}
