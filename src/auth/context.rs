// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The security context shared by the authenticator and the scope gate.

use crate::config::{ConfigError, JwtSettings};

use super::codec::{parse_algorithm, SigningKeys, TokenCodec};
use super::extractor::TokenTransport;
use super::users::{Principal, UserStore};

/// Default token lifetime in seconds.
pub const DEFAULT_EXPIRATION_TIME: i64 = 3600;

/// Users, signing keys and token policy, built once before serving.
///
/// The context is read-only while requests are in flight, so it is shared
/// through an `Arc` without locking. Dropping it wipes every secret.
#[derive(Debug)]
pub struct SecurityContext {
    users: UserStore,
    codec: Option<TokenCodec>,
    transport: TokenTransport,
    expiration_time: i64,
}

impl SecurityContext {
    pub fn new(
        users: UserStore,
        codec: Option<TokenCodec>,
        transport: TokenTransport,
        expiration_time: i64,
    ) -> Self {
        Self {
            users,
            codec,
            transport,
            expiration_time,
        }
    }

    /// A context with no users: every request passes the gate.
    pub fn disabled() -> Self {
        Self::new(
            UserStore::new(),
            None,
            TokenTransport::default(),
            DEFAULT_EXPIRATION_TIME,
        )
    }

    /// Build the context from the `http.security.jwt` settings.
    pub fn from_settings(jwt: &JwtSettings) -> Result<Self, ConfigError> {
        if jwt.expiration_time <= 0 {
            return Err(ConfigError::Invalid(format!(
                "http.security.jwt.expiration_time must be positive, got {}",
                jwt.expiration_time
            )));
        }

        let mut users = UserStore::new();
        for user in &jwt.users {
            let principal = Principal::new(
                user.name.as_str(),
                user.secret.as_str(),
                user.scope.iter().map(String::as_str),
            )?;
            users.add(principal)?;
        }

        let codec = match jwt.decode_key.as_deref() {
            Some(key) => {
                let algorithm = parse_algorithm(&jwt.algorithm)?;
                let keys = SigningKeys::from_material(
                    algorithm,
                    key.as_bytes(),
                    jwt.public_key.as_deref().map(str::as_bytes),
                )?;
                Some(TokenCodec::new(algorithm, keys))
            }
            None if !users.is_empty() => {
                return Err(ConfigError::Invalid(
                    "http.security.jwt.decode_key is required when users are configured".into(),
                ));
            }
            None => None,
        };

        tracing::trace!(
            users = users.len(),
            method = %jwt.method,
            algorithm = ?codec.as_ref().map(TokenCodec::algorithm),
            "Security context ready"
        );

        Ok(Self::new(users, codec, jwt.method, jwt.expiration_time))
    }

    pub fn users(&self) -> &UserStore {
        &self.users
    }

    pub fn codec(&self) -> Option<&TokenCodec> {
        self.codec.as_ref()
    }

    pub fn transport(&self) -> TokenTransport {
        self.transport
    }

    pub fn expiration_time(&self) -> i64 {
        self.expiration_time
    }

    /// Authorization is disabled when no users are configured.
    pub fn is_enforcing(&self) -> bool {
        !self.users.is_empty()
    }
}
