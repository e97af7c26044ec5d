// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{body::Bytes, extract::State, Json};

use crate::auth::{AuthError, TokenGrant};
use crate::state::AppState;

/// Exchange `{name, secret}` for an access token.
///
/// The body is read raw so that malformed JSON, missing keys and extra keys
/// all surface as `invalid_request` rather than axum's own rejections.
#[utoipa::path(
    post,
    path = "/authenticate",
    tag = "Auth",
    request_body = crate::auth::Credentials,
    responses(
        (status = 200, description = "Access token issued", body = TokenGrant),
        (status = 400, description = "Malformed request or invalid credentials")
    )
)]
pub async fn authenticate(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<TokenGrant>, AuthError> {
    state.security.authenticate(&body).map(Json)
}
