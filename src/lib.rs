// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Paste Service
//!
//! An anonymous text paste service. Clients submit text, receive a short
//! identifier and anyone holding it can read the paste back, rendered or
//! raw.
//!
//! Abuse is kept in check by two per-network rate limit tiers:
//!
//! - Global tier on every request (5/s, burst 50)
//! - Creation tier on paste creation only (1 per 5s, burst 10)
//!
//! IPv4 clients are limited per address, IPv6 clients per /64.

pub mod admission;
pub mod clock;
pub mod config;
pub mod error;
pub mod handlers;
pub mod id;
pub mod limiter;
pub mod metrics;
pub mod network;
pub mod render;
pub mod store;

pub use admission::{Admission, Admit, Tier};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::{Config, TierPolicy};
pub use handlers::AppState;
pub use limiter::{AddrRateLimiter, Reclaimer};
pub use network::NetworkId;
pub use store::{PasteStore, SqliteStore};

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Request},
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::{DefaultOnResponse, TraceLayer};
use tower_http::LatencyUnit;
use tracing::Level;

/// Build the service router.
///
/// Layers run outermost first: client address resolution, request tracing,
/// then the global rate limit tier, so rejected requests are still logged
/// with the client they came from.
pub fn router(state: Arc<AppState>) -> Router {
    let country_header = state.country_header.clone();
    let trace = TraceLayer::new_for_http()
        .make_span_with(move |request: &Request<Body>| {
            let client_ip = request
                .extensions()
                .get::<admission::ClientIp>()
                .map(|ip| ip.0.to_string())
                .unwrap_or_default();
            let country = request
                .headers()
                .get(&country_header)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default();
            tracing::info_span!(
                "request",
                method = %request.method(),
                uri = %request.uri(),
                client_ip = %client_ip,
                country = %country,
            )
        })
        .on_response(
            DefaultOnResponse::new()
                .level(Level::INFO)
                .latency_unit(LatencyUnit::Micros),
        );

    let mut app = Router::new()
        .route("/", get(handlers::index))
        .route(
            "/save",
            post(handlers::save).layer(DefaultBodyLimit::max(state.config.max_paste_bytes)),
        )
        .route("/health", get(handlers::health))
        .route("/healthz", get(handlers::health))
        .route("/:id", get(handlers::view))
        .route("/raw/:id", get(handlers::raw));

    if state.config.metrics.enabled {
        app = app.route(&state.config.metrics.path, get(handlers::metrics));
    }

    app.fallback(handlers::assets)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            admission::global_rate_limit,
        ))
        .layer(trace)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            admission::resolve_client_addr,
        ))
        .with_state(state)
}
