//! End-to-end tests over a real TCP listener.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::time::timeout;

use management_api::config::ApiConfig;
use management_api::http::HttpServer;
use management_api::jobs::LoggingPublisher;
use management_api::storage::InMemoryStore;

/// Start a server on an ephemeral port; returns its address and its store.
async fn spawn_server() -> (SocketAddr, Arc<InMemoryStore>) {
    let mut config = ApiConfig::default();
    config.broadcast.poll_interval_secs = 1;

    let store = Arc::new(InMemoryStore::new());
    store.register_catalog("meetbouten", &["metingen", "rollagen"]);
    store.register_job(12);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(config, store.clone(), Arc::new(LoggingPublisher)).unwrap();
    let router = server.into_router();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    (addr, store)
}

#[tokio::test]
async fn test_health_is_public() {
    let (addr, _store) = spawn_server().await;
    let response = reqwest::get(format!("http://{addr}/status/health/"))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "Connectivity OK");
}

#[tokio::test]
async fn test_job_submission_requires_admin_role() {
    let (addr, _store) = spawn_server().await;
    let client = reqwest::Client::new();
    let url = format!("http://{addr}/management/job/");
    let body = json!({
        "action": "import",
        "catalogue": "meetbouten",
        "collection": "metingen",
        "user": "jan",
    });

    // No roles asserted: denied with the fixed generic response.
    let response = client.post(&url).json(&body).send().await.unwrap();
    assert_eq!(response.status(), 403);
    assert_eq!(response.text().await.unwrap(), "Forbidden");

    // Read-only role is not enough for job submission.
    let response = client
        .post(&url)
        .header("X-Auth-Roles", "admin_r")
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);

    // Admin role passes and gets the message header echoed back.
    let response = client
        .post(&url)
        .header("X-Auth-Roles", "admin")
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let header: Value = response.json().await.unwrap();
    assert_eq!(header["catalogue"], "meetbouten");
    assert_eq!(header["user"], "jan");
}

#[tokio::test]
async fn test_invalid_job_is_a_bad_request() {
    let (addr, _store) = spawn_server().await;
    let client = reqwest::Client::new();
    let url = format!("http://{addr}/management/job/");

    let response = client
        .post(&url)
        .header("X-Auth-Roles", "admin")
        .json(&json!({ "action": "frobnicate" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body = response.text().await.unwrap();
    assert!(body.starts_with("Job start failed"), "got {body}");
}

#[tokio::test]
async fn test_catch_all_grants_read_to_admin_read_role() {
    let (addr, _store) = spawn_server().await;
    let client = reqwest::Client::new();
    let url = format!("http://{addr}/management/catalogs/");

    let response = client.get(&url).send().await.unwrap();
    assert_eq!(response.status(), 403);

    let response = client
        .get(&url)
        .header("X-Auth-Roles", "admin_r")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let catalogs: Value = response.json().await.unwrap();
    assert_eq!(catalogs["meetbouten"], json!(["metingen", "rollagen"]));
}

#[tokio::test]
async fn test_method_precedence_has_no_fallback() {
    let (addr, _store) = spawn_server().await;
    let client = reqwest::Client::new();

    // The catch-all authorizes GET and POST only; DELETE is denied even
    // for an admin.
    let response = client
        .delete(format!("http://{addr}/management/catalogs/"))
        .header("X-Auth-Roles", "admin")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);
}

#[tokio::test]
async fn test_authorized_unknown_path_is_not_found_not_forbidden() {
    let (addr, _store) = spawn_server().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("http://{addr}/management/other"))
        .header("X-Auth-Roles", "admin_r")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_preflight_bypasses_authorization() {
    let (addr, _store) = spawn_server().await;
    let client = reqwest::Client::new();

    let response = client
        .request(
            reqwest::Method::OPTIONS,
            format!("http://{addr}/management/job/"),
        )
        .header("Origin", "http://localhost:8080")
        .header("Access-Control-Request-Method", "POST")
        .send()
        .await
        .unwrap();
    assert_ne!(response.status(), 403);
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("http://localhost:8080")
    );
}

#[tokio::test]
async fn test_secure_endpoint_reports_claims() {
    let (addr, _store) = spawn_server().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("http://{addr}/management/secure/"))
        .header("X-Auth-Userid", "jan")
        .header("X-Auth-Roles", "admin")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "Secure access OK");
}

#[tokio::test]
async fn test_job_removal() {
    let (addr, _store) = spawn_server().await;
    let client = reqwest::Client::new();

    let response = client
        .delete(format!("http://{addr}/management/job/12"))
        .header("X-Auth-Roles", "admin")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let response = client
        .delete(format!("http://{addr}/management/job/12"))
        .header("X-Auth-Roles", "admin")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_state_logs_is_public_and_cached() {
    let (addr, store) = spawn_server().await;
    store.append_log("INFO", "import started", Some("p1"), None, None, None);
    store.append_log("INFO", "import done", Some("p1"), None, None, None);

    let url = format!("http://{addr}/management/public/state/logs/");
    let logs: Value = reqwest::get(&url).await.unwrap().json().await.unwrap();
    let records = logs.as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["msg"], "import done");

    // Unchanged fingerprint: same response again.
    let cached: Value = reqwest::get(&url).await.unwrap().json().await.unwrap();
    assert_eq!(cached, logs);

    // New record advances the fingerprint and shows up.
    store.append_log("WARNING", "export stalled", Some("p2"), None, None, None);
    let refreshed: Value = reqwest::get(&url).await.unwrap().json().await.unwrap();
    assert_eq!(refreshed.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_live_connection_receives_change_events() {
    let (addr, store) = spawn_server().await;

    let (mut socket, _response) = tokio_tungstenite::connect_async(format!(
        "ws://{addr}/management/socket.io/"
    ))
    .await
    .unwrap();

    // The first poll reports the current (empty) fingerprints.
    let first = next_event(&mut socket).await;
    assert_eq!(first["event"], "new_logs");
    assert_eq!(first["data"]["last_logid"], Value::Null);

    store.append_log("INFO", "fresh record", None, None, None, None);
    let event = wait_for_event(&mut socket, "new_logs", |data| {
        data["last_logid"] == json!(1)
    })
    .await;
    assert_eq!(event["data"], json!({ "last_logid": 1 }));

    store.touch_services();
    let event = wait_for_event(&mut socket, "update_services", |data| {
        data["last_timestamp"] != Value::Null
    })
    .await;
    assert!(event["data"]["last_timestamp"].is_string());
}

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

async fn next_event(socket: &mut WsStream) -> Value {
    loop {
        let msg = timeout(Duration::from_secs(5), socket.next())
            .await
            .expect("timed out waiting for push event")
            .expect("connection closed")
            .expect("connection errored");
        if let tokio_tungstenite::tungstenite::Message::Text(frame) = msg {
            return serde_json::from_str(frame.as_str()).unwrap();
        }
    }
}

async fn wait_for_event<F>(socket: &mut WsStream, name: &str, matches: F) -> Value
where
    F: Fn(&Value) -> bool,
{
    loop {
        let event = next_event(socket).await;
        if event["event"] == name && matches(&event["data"]) {
            return event;
        }
    }
}
