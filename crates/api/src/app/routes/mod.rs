pub mod admin;
pub mod auth;
pub mod event_stream;
pub mod events;
pub mod field_reports;
pub mod incident_types;
pub mod incidents;
pub mod personnel;
pub mod system;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use ims_config::Config;

/// Assembles the full `/ims/api/` route tree (spec §4.F's URL shape).
pub fn router() -> Router<Arc<Config>> {
    Router::new()
        .route("/ping", get(system::ping))
        .route("/auth/login", post(auth::login))
        .route("/access", get(admin::read_access).post(admin::edit_access))
        .route("/streets", get(admin::read_streets).post(admin::edit_streets))
        .route("/personnel/", get(personnel::personnel))
        .route("/incident_types/", get(incident_types::list).post(incident_types::edit))
        .route("/events/", get(events::list).post(events::create))
        .route("/events/:event_id/locations/", get(events::locations))
        .route("/events/:event_id/incidents/", get(incidents::list).post(incidents::create))
        .route("/events/:event_id/incidents/:number", get(incidents::get).post(incidents::edit))
        .route(
            "/events/:event_id/field_reports/",
            get(field_reports::list).post(field_reports::create),
        )
        .route(
            "/events/:event_id/field_reports/:number",
            get(field_reports::get).post(field_reports::edit),
        )
        .route("/eventsource", get(event_stream::stream))
}
