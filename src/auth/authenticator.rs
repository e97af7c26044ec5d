// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Credential exchange: `{name, secret}` in, signed access token out.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::claims::{unix_now, TokenClaims};
use super::context::SecurityContext;
use super::extractor::TokenTransport;
use super::AuthError;

/// Body of `POST /authenticate`. Exactly these two string keys are accepted.
#[derive(Deserialize, ToSchema, Zeroize, ZeroizeOnDrop)]
#[serde(deny_unknown_fields)]
pub struct Credentials {
    pub name: String,
    pub secret: String,
}

/// Successful credential exchange.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenGrant {
    /// Compact signed token
    pub access_token: String,
    /// How the token must be presented
    pub method: TokenTransport,
    /// Token lifetime in seconds
    pub expires_in: i64,
}

impl SecurityContext {
    /// Verify credentials and mint a token issued now.
    pub fn authenticate(&self, body: &[u8]) -> Result<TokenGrant, AuthError> {
        self.authenticate_at(body, unix_now())
    }

    /// Verify credentials and mint a token issued at `now`.
    pub fn authenticate_at(&self, body: &[u8], now: i64) -> Result<TokenGrant, AuthError> {
        let credentials: Credentials = serde_json::from_slice(body).map_err(|e| {
            tracing::info!(error = %e, "Invalid authentication request body");
            AuthError::MalformedAuthentication
        })?;

        let principal = self
            .users()
            .verify_credentials(&credentials.name, &credentials.secret)
            .ok_or_else(|| {
                tracing::trace!(user = %credentials.name, "User failed to authenticate");
                AuthError::InvalidCredentials
            })?;

        let codec = self
            .codec()
            .ok_or_else(|| AuthError::Internal("no signing key configured".into()))?;

        let claims = TokenClaims::new(principal.name(), now);
        let access_token = codec
            .encode(&claims)
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        tracing::info!(user = %principal.name(), "Access token issued");

        Ok(TokenGrant {
            access_token,
            method: self.transport(),
            expires_in: self.expiration_time(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::claims::validate_claims;
    use crate::auth::codec::{SigningKeys, TokenCodec};
    use crate::auth::users::{Principal, UserStore};
    use jsonwebtoken::Algorithm;

    fn context() -> SecurityContext {
        let mut users = UserStore::new();
        users
            .add(Principal::new("a", "b", ["^GET /time$"]).unwrap())
            .unwrap();
        let keys = SigningKeys::from_material(Algorithm::HS256, b"key", None).unwrap();
        SecurityContext::new(
            users,
            Some(TokenCodec::new(Algorithm::HS256, keys)),
            TokenTransport::Header,
            60,
        )
    }

    #[test]
    fn valid_credentials_mint_decodable_token() {
        let ctx = context();
        let grant = ctx
            .authenticate_at(br#"{"name":"a","secret":"b"}"#, 1000)
            .unwrap();
        assert_eq!(grant.method, TokenTransport::Header);
        assert_eq!(grant.expires_in, 60);

        let claims = ctx.codec().unwrap().decode(&grant.access_token).unwrap();
        assert_eq!(claims.len(), 2);
        let validated = validate_claims(&claims, 60, 1000).unwrap();
        assert_eq!(validated, TokenClaims::new("a", 1000));
    }

    #[test]
    fn wrong_secret_and_unknown_user_look_the_same() {
        let ctx = context();
        assert!(matches!(
            ctx.authenticate_at(br#"{"name":"a","secret":"x"}"#, 1000),
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            ctx.authenticate_at(br#"{"name":"nobody","secret":"b"}"#, 1000),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn malformed_bodies_are_rejected() {
        let ctx = context();
        let bodies: [&[u8]; 8] = [
            b"",
            b"not json",
            b"[]",
            br#"{"name":"a"}"#,
            br#"{"name":"a","secret":"b","extra":1}"#,
            br#"{"name":"a","secret":7}"#,
            br#"{"name":null,"secret":"b"}"#,
            br#"{"name":"a","secret":"b","name":"a"}"#,
        ];
        for body in bodies {
            assert!(
                matches!(
                    ctx.authenticate_at(body, 1000),
                    Err(AuthError::MalformedAuthentication)
                ),
                "{}",
                String::from_utf8_lossy(body)
            );
        }
    }

    #[test]
    fn missing_codec_is_internal_error() {
        let mut users = UserStore::new();
        users.add(Principal::new("a", "b", Vec::<String>::new()).unwrap()).unwrap();
        let ctx = SecurityContext::new(users, None, TokenTransport::Body, 60);
        assert!(matches!(
            ctx.authenticate_at(br#"{"name":"a","secret":"b"}"#, 1000),
            Err(AuthError::Internal(_))
        ));
    }

    #[test]
    fn credentials_wipe_on_drop() {
        fn assert_zeroize_on_drop<T: ZeroizeOnDrop>() {}
        assert_zeroize_on_drop::<Credentials>();
    }

    #[test]
    fn grant_serializes_method_in_lowercase() {
        let grant = TokenGrant {
            access_token: "t".into(),
            method: TokenTransport::Body,
            expires_in: 3600,
        };
        let json = serde_json::to_value(&grant).unwrap();
        assert_eq!(json["method"], "body");
        assert_eq!(json["expires_in"], 3600);
    }
}
