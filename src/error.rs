// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Error types for the paste service.

use crate::admission::retry_after_secs;
use crate::config::ConfigError;
use crate::store::StoreError;
use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::error;

/// Errors returned by the JSON API.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Your paste is too large.")]
    PasteTooLarge,

    #[error("Please enter something to save.")]
    EmptyPaste,

    #[error("Failed to read request body")]
    BadBody,

    #[error("You have been rate limited.")]
    RateLimited { retry_after: Duration },

    #[error("Could not allocate a paste id after {0} attempts")]
    IdExhausted(usize),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

const GENERIC_ERROR: &str = "Something went wrong. Please try again.";

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::PasteTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::EmptyPaste | Self::BadBody => StatusCode::BAD_REQUEST,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::IdExhausted(_) | Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown to the client; internal details stay in the logs.
    fn public_message(&self) -> String {
        match self {
            Self::BadBody | Self::IdExhausted(_) | Self::Storage(_) => GENERIC_ERROR.to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }

        let body = Json(ErrorResponse {
            error: self.public_message(),
        });

        match self {
            Self::RateLimited { retry_after } => (
                status,
                [(header::RETRY_AFTER, retry_after_secs(retry_after).to_string())],
                body,
            )
                .into_response(),
            _ => (status, body).into_response(),
        }
    }
}

/// Errors returned by HTML and raw page handlers.
#[derive(Debug, Error)]
pub enum PageError {
    #[error("Paste not found")]
    NotFound,

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Storage(err) => {
                error!(error = %err, "Page request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let reason = status.canonical_reason().unwrap_or_default();
        (status, reason).into_response()
    }
}

/// Errors raised while assembling the service.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Metrics registry error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, AppError>;
