//! `GET /ims/api/eventsource` — the server-sent-event change-notification
//! stream (spec §4.E).

use std::sync::Arc;
use std::time::Duration;

use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::extract::State;

use ims_config::Config;
use ims_events::Frame;
use tokio_stream::StreamExt;

pub async fn stream(State(config): State<Arc<Config>>) -> impl IntoResponse {
    let (initial, frames) = config.bus.subscribe().await;

    let rest = frames.filter_map(|frame| match frame {
        Ok(frame) => Some(render(&frame)),
        Err(err) => {
            tracing::warn!(error = %err, "SSE subscriber lagged, frames dropped");
            None
        }
    });

    let combined = tokio_stream::once(render(&initial)).chain(rest).map(Ok::<_, std::convert::Infallible>);

    Sse::new(combined).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}

fn render(frame: &Frame) -> Event {
    let event = Event::default()
        .id(frame.id.to_string())
        .event(frame.event_class)
        .json_data(&frame.data)
        .unwrap_or_else(|_| Event::default().id(frame.id.to_string()).event(frame.event_class));
    match frame.retry_ms {
        Some(retry_ms) => event.retry(Duration::from_millis(retry_ms)),
        None => event,
    }
}
