//! Wiremock responders shaped like the Vault HTTP API

use serde_json::{json, Value};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const ROLE_ID: &str = "role";
pub const ROLE_SECRET_ID: &str = "role-secret";
pub const TOKEN: &str = "hvs.worker-token";
pub const MOUNT: &str = "charm-temporal-worker-k8s";

fn envelope(data: Value, auth: Value) -> Value {
    json!({
        "request_id": "5e1f2c7a-0000-0000-0000-000000000000",
        "lease_id": "",
        "renewable": false,
        "lease_duration": 0,
        "data": data,
        "auth": auth,
        "wrap_info": null,
        "warnings": null
    })
}

fn version_metadata(version: u64) -> Value {
    json!({
        "created_time": "2024-05-01T10:00:00.000000Z",
        "deletion_time": "",
        "custom_metadata": null,
        "destroyed": false,
        "version": version
    })
}

fn data_path(secret_path: &str) -> String {
    format!("/v1/{}/data/{}", MOUNT, secret_path)
}

/// AppRole login accepting only the test role pair
pub async fn mock_approle_login(server: &MockServer) {
    let auth = json!({
        "client_token": TOKEN,
        "accessor": "accessor",
        "policies": ["default", "worker"],
        "token_policies": ["default", "worker"],
        "metadata": {"role_name": "worker"},
        "lease_duration": 3600,
        "renewable": true,
        "entity_id": "entity",
        "token_type": "service",
        "orphan": true
    });

    Mock::given(method("POST"))
        .and(path("/v1/auth/approle/login"))
        .and(body_json(json!({"role_id": ROLE_ID, "secret_id": ROLE_SECRET_ID})))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(Value::Null, auth)))
        .mount(server)
        .await;
}

/// AppRole login rejected with a Vault error body
pub async fn mock_rejected_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/v1/auth/approle/login"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"errors": ["invalid role or secret ID"]})),
        )
        .mount(server)
        .await;
}

/// KV v2 read of `secret_path` returning `data`
pub async fn mock_kv_read(server: &MockServer, secret_path: &str, data: Value) {
    let body = envelope(json!({"data": data, "metadata": version_metadata(1)}), Value::Null);

    Mock::given(method("GET"))
        .and(path(data_path(secret_path)))
        .and(header("X-Vault-Token", TOKEN))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// KV v2 read of a path holding no secret
pub async fn mock_kv_missing(server: &MockServer, secret_path: &str) {
    Mock::given(method("GET"))
        .and(path(data_path(secret_path)))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"errors": []})))
        .mount(server)
        .await;
}

/// KV v2 write to `secret_path`, answered with new version metadata
pub async fn mock_kv_write(server: &MockServer, secret_path: &str) {
    Mock::given(method("POST"))
        .and(path(data_path(secret_path)))
        .and(header("X-Vault-Token", TOKEN))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(envelope(version_metadata(2), Value::Null)),
        )
        .expect(1)
        .mount(server)
        .await;
}

/// `data` object of the single write received for `secret_path`
pub async fn written_data(server: &MockServer, secret_path: &str) -> Value {
    let requests = server.received_requests().await.unwrap_or_default();
    let writes: Vec<_> = requests
        .iter()
        .filter(|r| r.method.as_str() == "POST" && r.url.path() == data_path(secret_path))
        .collect();
    assert_eq!(writes.len(), 1, "expected exactly one write to {}", secret_path);

    let body: Value = serde_json::from_slice(&writes[0].body).unwrap();
    body["data"].clone()
}
