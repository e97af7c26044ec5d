// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Access-Control Module
//!
//! Issues signed bearer tokens to configured principals and gates every
//! protected request against the principal's scope patterns.
//!
//! ## Auth Flow
//!
//! 1. Client posts `{"name": ..., "secret": ...}` to `/authenticate`
//! 2. Server checks the credentials against the user store and returns a
//!    JWT whose claims are `{"name", "iat"}`
//! 3. Client presents the token on every other request (header, form body
//!    or query, per the configured method)
//! 4. The scope gate:
//!    - Extracts and verifies the token
//!    - Rejects it once `iat + expiration_time` has passed
//!    - Looks up the principal named in the token
//!    - Matches `"<VERB> <PATH>"` against the principal's scope regexes
//!
//! ## Security
//!
//! - With no users configured the gate lets everything through
//! - Secrets are compared in constant time and wiped on drop
//! - Expired and forged tokens produce the same challenge
//! - Unknown principals and missing scopes produce the same challenge

pub mod authenticator;
pub mod authorizer;
pub mod claims;
pub mod codec;
pub mod context;
pub mod error;
pub mod extractor;
pub mod middleware;
pub mod scope;
pub mod users;

pub use authenticator::{Credentials, TokenGrant};
pub use authorizer::Authorization;
pub use claims::{unix_now, validate_claims, TokenClaims};
pub use codec::{parse_algorithm, Claims, SigningKeys, TokenCodec, TokenError};
pub use context::SecurityContext;
pub use error::{
    AuthError, CHALLENGE_INVALID_REQUEST, CHALLENGE_INVALID_SCOPE, CHALLENGE_INVALID_TOKEN,
};
pub use extractor::{extract_token, Auth, AuthRequest, AuthenticatedPrincipal, TokenTransport};
pub use middleware::require_scope;
pub use scope::{check_scope, required_scope, ScopeDecision, ScopePattern};
pub use users::{Principal, UserStore, UserStoreError};
