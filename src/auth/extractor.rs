// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Pulling bearer tokens out of requests.
//!
//! The configured [`TokenTransport`] decides where the token lives:
//!
//! - `header`: `Authorization: Bearer <token>`
//! - `body`: `access_token` form field of an `application/x-www-form-urlencoded` body
//! - `url`: `access_token` query parameter
//!
//! Handlers behind the scope gate read the granted principal with the
//! [`Auth`] extractor:
//!
//! ```rust,ignore
//! async fn my_handler(Auth(principal): Auth) -> impl IntoResponse {
//!     // principal is None when authorization is disabled
//! }
//! ```

use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        request::Parts,
        HeaderMap,
    },
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::AuthError;

/// Literal prefix of a bearer `Authorization` header, trailing space included.
pub const BEARER_PREFIX: &str = "Bearer ";

/// Form field and query parameter carrying the token.
pub const ACCESS_TOKEN_PARAMETER: &str = "access_token";

const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// Where clients place the access token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TokenTransport {
    #[default]
    Header,
    Body,
    Url,
}

impl TokenTransport {
    /// Parse a transport name (case-insensitive).
    pub fn from_str(s: &str) -> Option<TokenTransport> {
        match s.to_lowercase().as_str() {
            "header" => Some(TokenTransport::Header),
            "body" => Some(TokenTransport::Body),
            "url" => Some(TokenTransport::Url),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TokenTransport::Header => "header",
            TokenTransport::Body => "body",
            TokenTransport::Url => "url",
        }
    }
}

impl std::fmt::Display for TokenTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The parts of an HTTP request the access-control core looks at.
#[derive(Debug, Clone, Copy)]
pub struct AuthRequest<'a> {
    pub verb: &'a str,
    pub path: &'a str,
    pub headers: &'a HeaderMap,
    pub query: Option<&'a str>,
    /// Raw body; only read for [`TokenTransport::Body`]
    pub body: &'a [u8],
}

/// Extract the access token according to `transport`.
pub fn extract_token(
    request: &AuthRequest<'_>,
    transport: TokenTransport,
) -> Result<String, AuthError> {
    match transport {
        TokenTransport::Header => {
            let header = request
                .headers
                .get(AUTHORIZATION)
                .ok_or_else(|| {
                    tracing::trace!("Failed to find authorization header in request");
                    AuthError::InvalidRequest
                })?
                .to_str()
                .map_err(|_| AuthError::InvalidRequest)?;

            let token = header.strip_prefix(BEARER_PREFIX).ok_or_else(|| {
                tracing::trace!("Authorization type is not Bearer");
                AuthError::InvalidRequest
            })?;

            Ok(token.to_string())
        }
        TokenTransport::Body => {
            let form_encoded = request
                .headers
                .get(CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
                .is_some_and(|value| value.contains(FORM_URLENCODED));

            if !form_encoded {
                tracing::trace!("Access token parameter not encoded in request body");
                return Err(AuthError::InvalidRequest);
            }

            find_parameter(request.body).ok_or_else(|| {
                tracing::trace!("Access token parameter not found in request body");
                AuthError::InvalidRequest
            })
        }
        TokenTransport::Url => request
            .query
            .and_then(|query| find_parameter(query.as_bytes()))
            .ok_or_else(|| {
                tracing::trace!("Access token parameter not found in request URL");
                AuthError::InvalidRequest
            }),
    }
}

fn find_parameter(encoded: &[u8]) -> Option<String> {
    url::form_urlencoded::parse(encoded)
        .find(|(key, _)| key == ACCESS_TOKEN_PARAMETER)
        .map(|(_, value)| value.into_owned())
}

/// Principal granted access by the scope gate, stored in request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedPrincipal {
    pub name: String,
}

/// Extractor for the principal the scope gate admitted.
///
/// Yields `None` when authorization is disabled (no users configured).
pub struct Auth(pub Option<AuthenticatedPrincipal>);

impl<S: Send + Sync> FromRequestParts<S> for Auth {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Auth(parts.extensions.get::<AuthenticatedPrincipal>().cloned()))
    }
}
