// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{require_scope, Credentials, TokenGrant, TokenTransport},
    error::ApiError,
    state::AppState,
};

pub mod authenticate;
pub mod system;

/// Build the HTTP router.
///
/// `/authenticate` and the docs are open. Every other request, including
/// unknown paths and unsupported methods on known paths, passes through the
/// scope gate first.
pub fn router(state: AppState) -> Router {
    let gated = Router::new()
        .route("/version", get(system::version))
        .route("/time", get(system::time))
        .fallback(not_found)
        .layer(from_fn_with_state(state.clone(), require_scope));

    let app = Router::new()
        .route("/authenticate", post(authenticate::authenticate))
        .merge(gated)
        .with_state(state);

    let middleware = ServiceBuilder::new()
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        );

    app.merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .layer(middleware)
}

async fn not_found() -> ApiError {
    ApiError::not_found("no such resource")
}

#[derive(OpenApi)]
#[openapi(
    paths(
        authenticate::authenticate,
        system::version,
        system::time
    ),
    components(
        schemas(
            Credentials,
            TokenGrant,
            TokenTransport,
            system::VersionResponse,
            system::TimeResponse
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Auth", description = "Credential exchange"),
        (name = "System", description = "Scope-gated server information")
    )
)]
struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
