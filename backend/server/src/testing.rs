//! Fake Graph API and state builders shared by the route tests.
use std::{collections::HashMap, path::PathBuf, time::Duration};

use axum::{
    Json, Router,
    body::{Body, to_bytes},
    extract::{Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use graph::AppCredentials;
use serde_json::{Value, json};
use tokio::net::TcpListener;

use crate::config::Config;

type Params = Query<HashMap<String, String>>;

fn graph_error(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": { "message": message, "type": "OAuthException", "code": 190 } })),
    )
        .into_response()
}

async fn exchange(Query(params): Params) -> Response {
    match params.get("fb_exchange_token").map(String::as_str) {
        Some("bad") | None => graph_error("Invalid OAuth access token."),
        Some(short) => Json(json!({
            "access_token": short.replacen("short", "long", 1),
            "token_type": "bearer",
            "expires_in": 5183944
        }))
        .into_response(),
    }
}

async fn accounts(Query(params): Params) -> Response {
    let data = match params.get("access_token").map(String::as_str) {
        Some("long-nopages") => json!([]),
        Some("long-notoken") => json!([{ "id": "page-1", "name": "Bakery" }]),
        Some("long-nolink") => json!([
            { "id": "page-1", "name": "Bakery", "access_token": "pt-1" }
        ]),
        _ => json!([
            { "id": "page-1", "name": "Bakery", "access_token": "pt-1" },
            { "id": "page-2", "name": "Cafe", "access_token": "pt-2",
              "instagram_business_account": { "id": "ig-2" } }
        ]),
    };

    Json(json!({ "data": data })).into_response()
}

async fn node(Path(id): Path<String>, Query(params): Query<HashMap<String, String>>) -> Response {
    let fields = params.get("fields").map(String::as_str).unwrap_or_default();

    match id.as_str() {
        "page-1" if fields == "instagram_business_account" => {
            Json(json!({ "id": "page-1", "instagram_business_account": { "id": "ig-1" } }))
                .into_response()
        }
        "page-1" | "page-2" => Json(json!({
            "id": id,
            "name": page_name(&id),
            "fan_count": 900,
            "followers_count": 1000
        }))
        .into_response(),
        "ig-1" | "ig-2" => Json(json!({
            "id": id,
            "username": "cafe.gram",
            "followers_count": 250,
            "media_count": 42
        }))
        .into_response(),
        _ => graph_error("Unsupported get request."),
    }
}

fn page_name(id: &str) -> &'static str {
    if id == "page-1" { "Bakery" } else { "Cafe" }
}

/// Serves a canned Graph API on a random local port and returns its base url.
pub async fn spawn_graph() -> String {
    let app = Router::new()
        .route("/oauth/access_token", get(exchange))
        .route("/me", get(|| async { Json(json!({ "id": "u1", "name": "Ada" })) }))
        .route("/me/accounts", get(accounts))
        .route("/{id}", get(node));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

    format!("http://{address}")
}

pub fn config(graph_url: String) -> Config {
    Config {
        port: 0,
        graph_url,
        graph_timeout: Duration::from_secs(5),
        poll_interval: Duration::from_secs(10),
        static_dir: PathBuf::from("public"),
        app: Some(AppCredentials {
            id: "app".to_string(),
            secret: "secret".to_string(),
        }),
        token_mode: None,
    }
}

pub async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn json_request(uri: &str, body: Value) -> axum::http::Request<Body> {
    axum::http::Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}
