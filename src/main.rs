// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Paste Service
//!
//! Anonymous text paste service with per-network rate limiting.
//!
//! ## Configuration
//!
//! Configuration is loaded from `paste.toml` (optional) and environment
//! variables prefixed with `PASTE_`:
//!
//! - `PASTE_BIND_ADDR`: Server bind address (default: 0.0.0.0:8080)
//! - `PASTE_DATABASE_PATH`: SQLite database (default: paste.db)
//! - `PASTE_TRUSTED_PROXY_HEADER`: Client address header set by a trusted
//!   reverse proxy, e.g. `CF-Connecting-IP` (default: unset)
//! - `PASTE_RATE_LIMIT__GLOBAL__RATE` / `__BURST`: Global tier (default: 5/s, 50)
//! - `PASTE_RATE_LIMIT__CREATE__RATE` / `__BURST`: Creation tier (default: 0.2/s, 10)

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use paste_service::{config::Config, router, AppState, MonotonicClock, SqliteStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables before anything reads them
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    // Load configuration
    let config = Config::load()?;
    info!(
        bind_addr = %config.bind_addr,
        database = %config.database_path,
        global_rate = config.rate_limit.global.rate,
        global_burst = config.rate_limit.global.burst,
        create_rate = config.rate_limit.create.rate,
        create_burst = config.rate_limit.create.burst,
        trusted_proxy_header = ?config.trusted_proxy_header,
        "Starting paste service"
    );

    let store = SqliteStore::open(&config.database_path).await?;
    info!(path = %config.database_path, "Opened paste database");

    let shutdown_timeout = config.shutdown_timeout();
    let addr: SocketAddr = config.bind_addr.parse()?;

    let state = Arc::new(AppState::new(config, Arc::new(store), Arc::new(MonotonicClock))?);
    let reclaimers = state.admission.start_reclaimers();

    let app = router(state.clone());

    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Server listening");

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let mut server = tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            let _ = stop_rx.await;
        })
        .await
    });

    tokio::select! {
        res = &mut server => {
            // Server stopped on its own
            res??;
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received, draining connections");
            let _ = stop_tx.send(());
            match tokio::time::timeout(shutdown_timeout, &mut server).await {
                Ok(res) => res??,
                Err(_) => {
                    warn!(timeout = ?shutdown_timeout, "Graceful shutdown timed out");
                    server.abort();
                }
            }
        }
    }

    for reclaimer in reclaimers {
        reclaimer.shutdown().await;
    }
    info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
