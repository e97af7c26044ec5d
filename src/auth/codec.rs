// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Compact JWS encoding and verification.
//!
//! The codec signs and verifies only. Claim semantics (issuing time,
//! principal name) are checked by [`super::claims`].

use std::collections::HashSet;

use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::Serialize;
use serde_json::{Map, Value};

/// Decoded token payload.
pub type Claims = Map<String, Value>;

/// Errors raised while building keys, signing, or verifying tokens.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("unsupported signing algorithm \"{0}\"")]
    UnsupportedAlgorithm(String),
    #[error("invalid signing key: {0}")]
    InvalidKey(String),
    #[error("algorithm {0:?} needs a verification key")]
    MissingVerificationKey(Algorithm),
    #[error("failed to sign token: {0}")]
    Signing(String),
    #[error("token is malformed")]
    Malformed,
    #[error("token algorithm does not match the configured algorithm")]
    AlgorithmMismatch,
    #[error("token signature does not verify")]
    InvalidSignature,
    #[error("token payload is not a JSON object")]
    InvalidPayload,
}

/// Resolve an algorithm name such as `HS256` or `es256` (case-insensitive).
pub fn parse_algorithm(name: &str) -> Result<Algorithm, TokenError> {
    let algorithm = match name.to_ascii_uppercase().as_str() {
        "HS256" => Algorithm::HS256,
        "HS384" => Algorithm::HS384,
        "HS512" => Algorithm::HS512,
        "RS256" => Algorithm::RS256,
        "RS384" => Algorithm::RS384,
        "RS512" => Algorithm::RS512,
        "PS256" => Algorithm::PS256,
        "PS384" => Algorithm::PS384,
        "PS512" => Algorithm::PS512,
        "ES256" => Algorithm::ES256,
        "ES384" => Algorithm::ES384,
        "EDDSA" => Algorithm::EdDSA,
        _ => return Err(TokenError::UnsupportedAlgorithm(name.to_string())),
    };
    Ok(algorithm)
}

fn is_hmac(algorithm: Algorithm) -> bool {
    matches!(
        algorithm,
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
    )
}

/// Signing and verification keys for one algorithm.
#[derive(Clone)]
pub struct SigningKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl SigningKeys {
    /// Build keys from configuration material.
    ///
    /// For HMAC algorithms `signing_key` is the shared secret and
    /// `verification_key` is ignored. For asymmetric algorithms
    /// `signing_key` is a private key PEM and `verification_key` the
    /// matching public key PEM.
    pub fn from_material(
        algorithm: Algorithm,
        signing_key: &[u8],
        verification_key: Option<&[u8]>,
    ) -> Result<Self, TokenError> {
        if is_hmac(algorithm) {
            if signing_key.is_empty() {
                return Err(TokenError::InvalidKey("HMAC secret is empty".into()));
            }
            return Ok(Self {
                encoding: EncodingKey::from_secret(signing_key),
                decoding: DecodingKey::from_secret(signing_key),
            });
        }

        let public = verification_key.ok_or(TokenError::MissingVerificationKey(algorithm))?;
        let invalid = |e: jsonwebtoken::errors::Error| TokenError::InvalidKey(e.to_string());

        let (encoding, decoding) = match algorithm {
            Algorithm::RS256
            | Algorithm::RS384
            | Algorithm::RS512
            | Algorithm::PS256
            | Algorithm::PS384
            | Algorithm::PS512 => (
                EncodingKey::from_rsa_pem(signing_key).map_err(invalid)?,
                DecodingKey::from_rsa_pem(public).map_err(invalid)?,
            ),
            Algorithm::ES256 | Algorithm::ES384 => (
                EncodingKey::from_ec_pem(signing_key).map_err(invalid)?,
                DecodingKey::from_ec_pem(public).map_err(invalid)?,
            ),
            Algorithm::EdDSA => (
                EncodingKey::from_ed_pem(signing_key).map_err(invalid)?,
                DecodingKey::from_ed_pem(public).map_err(invalid)?,
            ),
            other => return Err(TokenError::UnsupportedAlgorithm(format!("{other:?}"))),
        };

        Ok(Self { encoding, decoding })
    }
}

impl std::fmt::Debug for SigningKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKeys").finish_non_exhaustive()
    }
}

/// Encodes claims to compact tokens and verifies submitted tokens.
///
/// Signature comparison happens inside `jsonwebtoken`, which verifies HMAC
/// tags through `hmac`'s constant-time check.
#[derive(Debug, Clone)]
pub struct TokenCodec {
    algorithm: Algorithm,
    keys: SigningKeys,
    validation: Validation,
}

impl TokenCodec {
    pub fn new(algorithm: Algorithm, keys: SigningKeys) -> Self {
        let mut validation = Validation::new(algorithm);
        // Lifetime and audience are the claim validator's concern.
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims = HashSet::new();

        Self {
            algorithm,
            keys,
            validation,
        }
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Sign `claims` as `base64url(header).base64url(payload).signature`.
    pub fn encode<T: Serialize>(&self, claims: &T) -> Result<String, TokenError> {
        let header = Header::new(self.algorithm);
        encode(&header, claims, &self.keys.encoding).map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verify `token` and return its payload as a JSON object.
    pub fn decode(&self, token: &str) -> Result<Claims, TokenError> {
        let data = decode::<Claims>(token, &self.keys.decoding, &self.validation).map_err(|e| {
            tracing::trace!(error = %e, "Token failed to decode");
            match e.kind() {
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                ErrorKind::InvalidAlgorithm => TokenError::AlgorithmMismatch,
                ErrorKind::Json(_) => TokenError::InvalidPayload,
                _ => TokenError::Malformed,
            }
        })?;
        Ok(data.claims)
    }
}
