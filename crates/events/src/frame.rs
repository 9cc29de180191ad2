//! SSE frame protocol: what a store-write signal becomes on the wire.

use ims_core::{EventId, FieldReportNumber, IncidentNumber};
use serde::Serialize;
use serde_json::Value as JsonValue;

/// A store-write signal, before it has been assigned a frame id.
///
/// Every mutating store operation emits one of these per touched top-level
/// entity. The bus is the only thing that turns it into a rendered frame;
/// the store stays unaware the bus exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreWrite {
    Incident { event: EventId, number: IncidentNumber },
    FieldReport { event: EventId, number: FieldReportNumber },
}

/// A rendered, numbered SSE frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame {
    pub id: u64,
    pub event_class: &'static str,
    pub data: JsonValue,
    pub retry_ms: Option<u64>,
}

impl Frame {
    /// The initial frame written immediately on subscribe, carrying the
    /// then-current counter value so clients can detect gaps.
    pub fn initial(counter: u64) -> Self {
        Self {
            id: counter,
            event_class: "InitialEvent",
            data: serde_json::json!({ "id": counter }),
            retry_ms: None,
        }
    }

    pub fn from_store_write(write: &StoreWrite, id: u64) -> Self {
        match write {
            StoreWrite::Incident { event, number } => Self {
                id,
                event_class: "Incident",
                data: serde_json::json!({
                    "event_id": event.as_str(),
                    "incident_number": number.get(),
                }),
                retry_ms: None,
            },
            StoreWrite::FieldReport { event, number } => Self {
                id,
                event_class: "FieldReport",
                data: serde_json::json!({
                    "event_id": event.as_str(),
                    "field_report_number": number.get(),
                }),
                retry_ms: None,
            },
        }
    }

    /// Renders the frame in the raw text/event-stream wire format. Used by
    /// tests and any non-Axum consumer; the Axum SSE handler builds its own
    /// `axum::response::sse::Event` from the same fields instead of calling
    /// this, since Axum handles line-folding and flushing itself.
    pub fn render(&self) -> String {
        let mut out = format!("id: {}\r\nevent: {}\r\n", self.id, self.event_class);
        if let Some(retry) = self.retry_ms {
            out.push_str(&format!("retry: {retry}\r\n"));
        }
        for line in self.data.to_string().lines() {
            out.push_str(&format!("data: {line}\r\n"));
        }
        out.push_str("\r\n");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_frame_carries_counter() {
        let frame = Frame::initial(42);
        assert_eq!(frame.id, 42);
        assert_eq!(frame.event_class, "InitialEvent");
    }

    #[test]
    fn incident_write_renders_expected_shape() {
        let write = StoreWrite::Incident {
            event: EventId::new("2024").unwrap(),
            number: IncidentNumber::new(1).unwrap(),
        };
        let frame = Frame::from_store_write(&write, 7);
        let rendered = frame.render();
        assert!(rendered.starts_with("id: 7\r\nevent: Incident\r\n"));
        assert!(rendered.contains("\"incident_number\":1"));
        assert!(rendered.ends_with("\r\n\r\n"));
    }
}
