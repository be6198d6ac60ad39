//! In-process fake of the Filecoin penalty API.

use axum::{
    Json, Router,
    extract::Query,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use std::collections::HashMap;

async fn penalty(Query(query): Query<HashMap<String, String>>) -> Response {
    match query.get("miner").map(String::as_str) {
        Some("f01234") => Json(serde_json::json!({
            "miner": "f01234",
            "penalty": "12.5",
            "sectors": 3
        }))
        .into_response(),
        Some("f0999") => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "resolution lookup failed (f0999): actor not found",
        )
            .into_response(),
        Some("f0csv") => "miner,height,penalty\nf0csv,100,1.5\n".into_response(),
        Some("f0text") => "no penalty".into_response(),
        _ => (StatusCode::BAD_GATEWAY, "upstream node unavailable").into_response(),
    }
}

/// Serve the fake API on an ephemeral port and return its base URL.
pub async fn spawn_fake_api() -> String {
    let app = Router::new().route("/penalty", get(penalty));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}
