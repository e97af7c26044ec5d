// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! End-to-end access-control scenarios driven through the HTTP router.

use std::{sync::Arc, time::Duration};

use axum::{
    body::{to_bytes, Body},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE, WWW_AUTHENTICATE},
        Request, StatusCode,
    },
    response::Response,
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use restserver_security::{
    api::router,
    auth::{
        SecurityContext, TokenTransport, CHALLENGE_INVALID_REQUEST, CHALLENGE_INVALID_SCOPE,
        CHALLENGE_INVALID_TOKEN,
    },
    config::{JwtSettings, UserSettings},
    state::AppState,
};

fn app(method: TokenTransport, expiration_time: i64, users: Vec<UserSettings>) -> Router {
    let jwt = JwtSettings {
        decode_key: Some("some-very-secret-key".into()),
        method,
        expiration_time,
        users,
        ..JwtSettings::default()
    };
    let context = SecurityContext::from_settings(&jwt).unwrap();
    router(AppState::new(Arc::new(context)))
}

fn user_a() -> Vec<UserSettings> {
    vec![UserSettings {
        name: "a".into(),
        secret: "b".into(),
        scope: vec!["^GET /time$".into()],
    }]
}

async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn authenticate(app: &Router, body: Value) -> Response {
    send(
        app,
        Request::post("/authenticate")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
}

async fn token(app: &Router) -> String {
    let response = authenticate(app, json!({"name": "a", "secret": "b"})).await;
    assert_eq!(response.status(), StatusCode::OK);
    let grant = json_body(response).await;
    grant["access_token"].as_str().unwrap().to_string()
}

fn with_bearer(method: &str, path: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(path)
        .header(AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

fn challenge(response: &Response) -> &str {
    response
        .headers()
        .get(WWW_AUTHENTICATE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
}

#[tokio::test]
async fn happy_path_with_header_transport() {
    let app = app(TokenTransport::Header, 3600, user_a());

    let response = authenticate(&app, json!({"name": "a", "secret": "b"})).await;
    assert_eq!(response.status(), StatusCode::OK);
    let grant = json_body(response).await;
    assert_eq!(grant["method"], "header");
    assert_eq!(grant["expires_in"], 3600);

    let token = grant["access_token"].as_str().unwrap();
    let response = send(&app, with_bearer("GET", "/time", token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(json_body(response).await["time"].is_i64());
}

#[tokio::test]
async fn wrong_secret_is_invalid_client() {
    let app = app(TokenTransport::Header, 3600, user_a());

    let response = authenticate(&app, json!({"name": "a", "secret": "x"})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await, json!({"error": "invalid_client"}));
}

#[tokio::test]
async fn expired_token_is_invalid_token() {
    let app = app(TokenTransport::Header, 1, user_a());
    let token = token(&app).await;

    tokio::time::sleep(Duration::from_secs(2)).await;

    let response = send(&app, with_bearer("GET", "/time", &token)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(challenge(&response), CHALLENGE_INVALID_TOKEN);
}

#[tokio::test]
async fn scope_mismatch_is_invalid_scope() {
    let app = app(TokenTransport::Header, 3600, user_a());
    let token = token(&app).await;

    let response = send(&app, with_bearer("POST", "/time", &token)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(challenge(&response), CHALLENGE_INVALID_SCOPE);
}

#[tokio::test]
async fn body_transport_requires_form_content_type() {
    let app = app(TokenTransport::Body, 3600, user_a());
    let token = token(&app).await;

    let response = send(
        &app,
        Request::get("/time")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(format!("access_token={token}")))
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(challenge(&response), CHALLENGE_INVALID_REQUEST);

    let response = send(
        &app,
        Request::get("/time")
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(format!("access_token={token}")))
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn empty_user_store_admits_everything() {
    let app = app(TokenTransport::Header, 3600, Vec::new());

    for request in [
        Request::get("/time").body(Body::empty()).unwrap(),
        Request::post("/time").body(Body::empty()).unwrap(),
        with_bearer("GET", "/version", "not-a-token"),
    ] {
        let response = send(&app, request).await;
        assert_ne!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().get(WWW_AUTHENTICATE).is_none());
    }
}

#[tokio::test]
async fn url_transport_reads_query_parameter() {
    let app = app(TokenTransport::Url, 3600, user_a());
    let token = token(&app).await;

    let response = send(
        &app,
        Request::get(format!("/time?access_token={token}"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&app, with_bearer("GET", "/time", &token)).await;
    assert_eq!(challenge(&response), CHALLENGE_INVALID_REQUEST);
}

#[tokio::test]
async fn unknown_principal_looks_like_missing_scope() {
    let issuer = app(
        TokenTransport::Header,
        3600,
        vec![UserSettings {
            name: "a".into(),
            secret: "b".into(),
            scope: vec![".*".into()],
        }],
    );
    let token = token(&issuer).await;

    let verifier = app(
        TokenTransport::Header,
        3600,
        vec![UserSettings {
            name: "other".into(),
            secret: "b".into(),
            scope: vec![".*".into()],
        }],
    );
    let response = send(&verifier, with_bearer("GET", "/time", &token)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(challenge(&response), CHALLENGE_INVALID_SCOPE);
}
