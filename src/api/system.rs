// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::{unix_now, Auth};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VersionResponse {
    pub version: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TimeResponse {
    /// Seconds since the Unix epoch
    pub time: i64,
}

/// Server version.
#[utoipa::path(
    get,
    path = "/version",
    tag = "System",
    responses(
        (status = 200, description = "Server version", body = VersionResponse),
        (status = 401, description = "Missing, invalid or insufficiently scoped token")
    ),
    security(("bearer_auth" = []))
)]
pub async fn version(Auth(principal): Auth) -> Json<VersionResponse> {
    tracing::debug!(user = ?principal.map(|p| p.name), "Version requested");
    Json(VersionResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Server clock.
#[utoipa::path(
    get,
    path = "/time",
    tag = "System",
    responses(
        (status = 200, description = "Current server time", body = TimeResponse),
        (status = 401, description = "Missing, invalid or insufficiently scoped token")
    ),
    security(("bearer_auth" = []))
)]
pub async fn time(Auth(principal): Auth) -> Json<TimeResponse> {
    tracing::debug!(user = ?principal.map(|p| p.name), "Time requested");
    Json(TimeResponse { time: unix_now() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthenticatedPrincipal;

    #[tokio::test]
    async fn version_reports_crate_version() {
        let Json(body) = version(Auth(None)).await;
        assert_eq!(body.version, env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn time_is_current() {
        let before = unix_now();
        let Json(body) = time(Auth(Some(AuthenticatedPrincipal { name: "a".into() }))).await;
        assert!(body.time >= before);
        assert!(body.time <= unix_now());
    }
}
