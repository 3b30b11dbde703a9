// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP handlers for the paste service.

use crate::admission::{Admission, Admit, ClientAddrResolver, ClientIp, Tier};
use crate::clock::Clock;
use crate::config::{Config, ConfigError};
use crate::error::{AppError, PageError, StartupError};
use crate::id;
use crate::metrics::Metrics;
use crate::render;
use crate::store::{NewPaste, Paste, PasteStore, StoreError};
use axum::{
    body::{Body, Bytes},
    extract::{rejection::BytesRejection, Path, Request, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
    Extension, Json,
};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tower::ServiceExt;
use tower_http::services::ServeDir;
use tracing::{debug, error, info};

/// How many fresh ids to try when one is already taken.
const ID_ATTEMPTS: usize = 5;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub admission: Admission,
    pub store: Arc<dyn PasteStore>,
    pub metrics: Metrics,
    pub country_header: HeaderName,
    pub assets: ServeDir,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn PasteStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, StartupError> {
        config.validate()?;

        let metrics = Metrics::new()?;
        let resolver = ClientAddrResolver::new(config.trusted_proxy_header.as_deref())?;
        let admission = Admission::new(&config.rate_limit, resolver, clock, metrics.clone());
        let country_header = HeaderName::try_from(config.country_header.as_str())
            .map_err(|_| ConfigError::InvalidHeader(config.country_header.clone()))?;
        let assets = ServeDir::new(&config.assets_dir);

        Ok(Self {
            config,
            admission,
            store,
            metrics,
            country_header,
            assets,
        })
    }
}

/// Response for a stored paste.
#[derive(Debug, Serialize)]
pub struct SaveResponse {
    pub id: String,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "paste-service",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Editor page.
pub async fn index() -> Html<String> {
    Html(render::index_page())
}

/// Store a paste.
///
/// The creation tier is checked only once the body has been read and found
/// acceptable, and before an id is generated or anything is written.
pub async fn save(
    State(state): State<Arc<AppState>>,
    Extension(ClientIp(ip)): Extension<ClientIp>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<SaveResponse>, AppError> {
    let data = body.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PasteTooLarge
        } else {
            debug!(error = %rejection, "Failed to read paste body");
            AppError::BadBody
        }
    })?;

    if data.is_empty() {
        return Err(AppError::EmptyPaste);
    }

    if let Admit::Limited { retry_after } = state.admission.admit(Tier::Create, ip) {
        return Err(AppError::RateLimited { retry_after });
    }

    let country_code = headers
        .get(&state.country_header)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let created_at = Utc::now();

    for _ in 0..ID_ATTEMPTS {
        let id = id::generate();
        let paste = NewPaste {
            id: &id,
            created_at,
            country_code,
            content: &data,
        };

        match state.store.insert(paste).await {
            Ok(()) => {
                state.metrics.paste_created();
                info!(id = %id, bytes = data.len(), client_ip = %ip, "Paste created");
                return Ok(Json(SaveResponse { id }));
            }
            Err(StoreError::Conflict(id)) => {
                debug!(id = %id, "Paste id collision, retrying");
            }
            Err(err) => return Err(err.into()),
        }
    }

    Err(AppError::IdExhausted(ID_ATTEMPTS))
}

/// Rendered paste page. Paths that are not paste ids fall through to the
/// static assets.
pub async fn view(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    request: Request,
) -> Response {
    if !id::is_valid(&id) {
        return serve_asset(&state, request).await;
    }

    match load_and_count(&state, &id).await {
        Ok(paste) => {
            let content = String::from_utf8_lossy(&paste.content);
            Html(render::paste_page(&id, paste.created_at, &content, Utc::now())).into_response()
        }
        Err(err) => err.into_response(),
    }
}

/// Raw paste content.
pub async fn raw(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, PageError> {
    if !id::is_valid(&id) {
        return Err(PageError::NotFound);
    }

    let paste = load_and_count(&state, &id).await?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        paste.content,
    )
        .into_response())
}

async fn load_and_count(state: &AppState, id: &str) -> Result<Paste, PageError> {
    let paste = state.store.fetch(id).await?.ok_or(PageError::NotFound)?;
    state.store.record_view(id, Utc::now()).await?;
    Ok(paste)
}

/// Prometheus metrics endpoint.
pub async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    match state.metrics.render(&state.admission) {
        Ok(body) => (
            [(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)],
            body,
        )
            .into_response(),
        Err(err) => {
            error!(error = %err, "Failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Fallback for everything that is not a route: static assets.
pub async fn assets(State(state): State<Arc<AppState>>, request: Request) -> Response {
    serve_asset(&state, request).await
}

async fn serve_asset(state: &AppState, request: Request) -> Response {
    let response = match state.assets.clone().oneshot(request).await {
        Ok(response) => response.map(Body::new),
        Err(never) => match never {},
    };

    let mut response = response.into_response();
    if response.status().is_success() {
        let headers = response.headers_mut();
        // CDN keeps assets for 7 days, browsers for 5 minutes
        headers.insert(
            HeaderName::from_static("cloudflare-cdn-cache-control"),
            HeaderValue::from_static("max-age=604800"),
        );
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("max-age=300"));
    }
    response
}
