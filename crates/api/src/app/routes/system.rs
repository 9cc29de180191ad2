//! `GET /ims/api/ping` — unauthenticated health check.

use axum::response::IntoResponse;

pub async fn ping() -> impl IntoResponse {
    ([(axum::http::header::CONTENT_TYPE, "application/json")], "\"ack\"")
}
