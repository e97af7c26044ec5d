// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Scope gate middleware for Axum.
//!
//! Apply to every protected route:
//!
//! ```rust,ignore
//! let protected = Router::new()
//!     .route("/time", get(time))
//!     .layer(axum::middleware::from_fn_with_state(state.clone(), require_scope));
//! ```
//!
//! On success the granted principal is inserted into request extensions,
//! where the [`Auth`](super::Auth) extractor picks it up.

use axum::{
    body::{to_bytes, Body, Bytes},
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::{AuthError, AuthRequest, AuthenticatedPrincipal, Authorization, TokenTransport};
use crate::state::AppState;

/// Largest body buffered when the token travels in a form body. Larger
/// bodies are rejected as carrying no readable token.
pub const MAX_FORM_BODY_BYTES: usize = 1024 * 1024;

/// Run the scope gate before the protected handler.
pub async fn require_scope(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let security = state.security.clone();
    if !security.is_enforcing() {
        return next.run(request).await;
    }

    let (mut parts, body) = request.into_parts();

    // Only the form transport needs the body; leave it streaming otherwise.
    let (body_bytes, body) = if security.transport() == TokenTransport::Body {
        match to_bytes(body, MAX_FORM_BODY_BYTES).await {
            Ok(bytes) => (bytes.clone(), Body::from(bytes)),
            Err(e) => {
                tracing::trace!(error = %e, "Request body could not be read for the access token");
                return AuthError::InvalidRequest.into_response();
            }
        }
    } else {
        (Bytes::new(), body)
    };

    let outcome = {
        let auth_request = AuthRequest {
            verb: parts.method.as_str(),
            path: parts.uri.path(),
            headers: &parts.headers,
            query: parts.uri.query(),
            body: &body_bytes,
        };
        // Verification can take milliseconds for asymmetric keys; it stays
        // inline since no I/O is involved.
        security.authorize(&auth_request)
    };

    match outcome {
        Ok(Authorization::Granted { principal }) => {
            parts
                .extensions
                .insert(AuthenticatedPrincipal { name: principal });
            next.run(Request::from_parts(parts, body)).await
        }
        Ok(Authorization::Disabled) => next.run(Request::from_parts(parts, body)).await,
        Err(e) => e.into_response(),
    }
}
