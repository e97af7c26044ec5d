// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token claims and their validation.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::codec::Claims;
use super::AuthError;

/// Claims carried by every token this service issues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Principal name
    pub name: String,
    /// Issued at (Unix seconds)
    pub iat: i64,
}

impl TokenClaims {
    pub fn new(name: impl Into<String>, iat: i64) -> Self {
        Self {
            name: name.into(),
            iat,
        }
    }

    /// Unix second at which the token stops being accepted.
    pub fn expires_at(&self, expiration_time: i64) -> i64 {
        self.iat.saturating_add(expiration_time)
    }
}

/// Current wall-clock time in Unix seconds.
pub fn unix_now() -> i64 {
    Utc::now().timestamp()
}

/// Check that decoded claims name a principal and have not expired.
///
/// A token is expired when `now >= iat + expiration_time`; no clock skew
/// is tolerated.
pub fn validate_claims(
    claims: &Claims,
    expiration_time: i64,
    now: i64,
) -> Result<TokenClaims, AuthError> {
    let name = match claims.get("name") {
        Some(Value::String(name)) if !name.is_empty() => name,
        Some(_) => {
            tracing::trace!("Name specified in token must be a non-empty string");
            return Err(AuthError::InvalidToken);
        }
        None => {
            tracing::trace!("User is not specified in access token");
            return Err(AuthError::InvalidToken);
        }
    };

    let Some(iat) = claims.get("iat").and_then(Value::as_i64) else {
        tracing::trace!("Token issuing time is missing or not an integer");
        return Err(AuthError::InvalidToken);
    };

    let claims = TokenClaims::new(name.clone(), iat);
    if now >= claims.expires_at(expiration_time) {
        tracing::trace!(user = %claims.name, "User submitted expired token");
        return Err(AuthError::ExpiredToken);
    }

    Ok(claims)
}
