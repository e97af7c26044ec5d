// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The per-request gate: extract, decode, validate, look up, match scope.

use super::claims::{unix_now, validate_claims};
use super::context::SecurityContext;
use super::extractor::{extract_token, AuthRequest};
use super::scope::{check_scope, required_scope, ScopeDecision};
use super::AuthError;

/// A request that passed the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authorization {
    /// No users are configured, so nothing is checked
    Disabled,
    /// The named principal holds a matching scope
    Granted { principal: String },
}

impl SecurityContext {
    /// Decide whether `request` may proceed, using the current time.
    pub fn authorize(&self, request: &AuthRequest<'_>) -> Result<Authorization, AuthError> {
        self.authorize_at(request, unix_now())
    }

    /// Decide whether `request` may proceed at Unix time `now`.
    pub fn authorize_at(
        &self,
        request: &AuthRequest<'_>,
        now: i64,
    ) -> Result<Authorization, AuthError> {
        if !self.is_enforcing() {
            return Ok(Authorization::Disabled);
        }

        let required = required_scope(request.verb, request.path);

        let codec = self
            .codec()
            .ok_or_else(|| AuthError::Internal("no verification key configured".into()))?;

        let token = extract_token(request, self.transport())?;

        let claims = codec.decode(&token).map_err(|e| {
            tracing::trace!(
                error = %e,
                "Invalid or corrupt token given (unable to decode and verify)"
            );
            AuthError::InvalidToken
        })?;

        let claims = validate_claims(&claims, self.expiration_time(), now)?;

        let principal = self.users().lookup(&claims.name).ok_or_else(|| {
            tracing::trace!(user = %claims.name, "User not found in configured users list");
            AuthError::UnknownPrincipal
        })?;

        match check_scope(&required, principal) {
            ScopeDecision::Permitted => Ok(Authorization::Granted {
                principal: claims.name,
            }),
            ScopeDecision::Denied => {
                tracing::trace!(user = %claims.name, scope = %required, "User does not have scope");
                Err(AuthError::InsufficientScope)
            }
        }
    }
}
