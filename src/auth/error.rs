// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication and authorization errors.
//!
//! Failures of the per-request gate render as `401` with a `WWW-Authenticate`
//! header and no body. Failures of the credential exchange render as `400`
//! with a JSON `{"error": ...}` body.

use axum::{
    http::{header::WWW_AUTHENTICATE, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Challenge sent when no token could be pulled from the request.
pub const CHALLENGE_INVALID_REQUEST: &str =
    "error=\"invalid_request\",error_description=\"The access token is missing\"";

/// Challenge sent for forged, malformed or expired tokens.
pub const CHALLENGE_INVALID_TOKEN: &str =
    "error=\"invalid_token\",error_description=\"The access token is invalid\"";

/// Challenge sent when the principal is unknown or lacks the scope.
pub const CHALLENGE_INVALID_SCOPE: &str =
    "error=\"invalid_scope\",error_description=\"The scope is invalid\"";

/// Authentication error type.
///
/// `ExpiredToken` shares its wire form with `InvalidToken`, and
/// `UnknownPrincipal` shares its wire form with `InsufficientScope`, so a
/// client cannot tell expiry from forgery or enumerate configured users.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No token carrier in the request, or the carrier is malformed
    #[error("access token is missing from the request")]
    InvalidRequest,
    /// Token failed decoding, signature verification or claim checks
    #[error("access token is invalid")]
    InvalidToken,
    /// Token was valid once but its lifetime has elapsed
    #[error("access token has expired")]
    ExpiredToken,
    /// Token names a principal that is not configured
    #[error("token principal is not configured")]
    UnknownPrincipal,
    /// Principal has no scope pattern admitting the request
    #[error("principal lacks the required scope")]
    InsufficientScope,
    /// Credential exchange with an unknown name or a wrong secret
    #[error("client credentials are invalid")]
    InvalidCredentials,
    /// Credential exchange body is not `{"name": string, "secret": string}`
    #[error("authentication request body is malformed")]
    MalformedAuthentication,
    /// Misconfiguration or a failure unrelated to the client
    #[error("internal authentication error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: &'static str,
}

impl AuthError {
    /// Get the OAuth-style error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::InvalidRequest | AuthError::MalformedAuthentication => "invalid_request",
            AuthError::InvalidToken | AuthError::ExpiredToken => "invalid_token",
            AuthError::UnknownPrincipal | AuthError::InsufficientScope => "invalid_scope",
            AuthError::InvalidCredentials => "invalid_client",
            AuthError::Internal(_) => "internal_error",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::InvalidRequest
            | AuthError::InvalidToken
            | AuthError::ExpiredToken
            | AuthError::UnknownPrincipal
            | AuthError::InsufficientScope => StatusCode::UNAUTHORIZED,
            AuthError::InvalidCredentials | AuthError::MalformedAuthentication => {
                StatusCode::BAD_REQUEST
            }
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The `WWW-Authenticate` value for errors raised by the request gate.
    pub fn challenge(&self) -> Option<&'static str> {
        match self {
            AuthError::InvalidRequest => Some(CHALLENGE_INVALID_REQUEST),
            AuthError::InvalidToken | AuthError::ExpiredToken => Some(CHALLENGE_INVALID_TOKEN),
            AuthError::UnknownPrincipal | AuthError::InsufficientScope => {
                Some(CHALLENGE_INVALID_SCOPE)
            }
            _ => None,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if let Some(challenge) = self.challenge() {
            return (status, [(WWW_AUTHENTICATE, challenge)]).into_response();
        }

        if let AuthError::Internal(ref msg) = self {
            tracing::error!(error = %msg, "Authentication failed internally");
        }

        let body = Json(AuthErrorBody {
            error: self.error_code(),
        });
        (status, body).into_response()
    }
}
