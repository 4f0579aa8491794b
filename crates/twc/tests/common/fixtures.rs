//! Config, model and secret fixtures

use serde_json::{json, Value};
use std::collections::BTreeMap;
use twc::relations::database::DatabaseRelationData;
use twc::relations::vault::VaultRelationData;
use twc::{Model, PeerState};
use twc_core::CharmConfig;
use twc_secrets::SecretContent;

pub const NAMESPACE: &str = "test-namespace";
pub const QUEUE: &str = "test-queue";
pub const NONCE: &str = "3a8f0c2d9b7e4f1a8c6d5e4f3a2b1c0d";
pub const CREDENTIALS_SECRET: &str = "secret:vault-creds";

pub const ACTIVE_MESSAGE: &str =
    "worker listening to namespace 'test-namespace' on queue 'test-queue'";

pub fn valid_config() -> BTreeMap<String, Value> {
    BTreeMap::from([
        ("host".to_string(), json!("temporal-k8s:7233")),
        ("namespace".to_string(), json!(NAMESPACE)),
        ("queue".to_string(), json!(QUEUE)),
    ])
}

pub fn config_with(overrides: &[(&str, Value)]) -> CharmConfig {
    let mut raw = valid_config();
    for (key, value) in overrides {
        raw.insert(key.to_string(), value.clone());
    }
    CharmConfig::from_map(raw).unwrap()
}

/// Leader unit with a formed peer relation and valid config
pub fn ready_model() -> Model {
    model_with(&[])
}

pub fn model_with(overrides: &[(&str, Value)]) -> Model {
    Model {
        app_name: "temporal-worker-k8s".to_string(),
        unit_name: "temporal-worker-k8s/0".to_string(),
        config: config_with(overrides),
        peer: PeerState::new(Some(BTreeMap::new()), true),
        egress_subnet: "10.1.0.0/16".to_string(),
        ..Model::default()
    }
}

pub fn content(pairs: &[(&str, &str)]) -> SecretContent {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Relation data vault publishes once it has issued credentials for [`NONCE`]
pub fn vault_relation() -> VaultRelationData {
    VaultRelationData {
        vault_url: Some("https://vault-k8s:8200".to_string()),
        ca_certificate: Some("-----BEGIN CERTIFICATE-----".to_string()),
        mount: Some("charm-temporal-worker-k8s-temporal-worker-k8s".to_string()),
        credentials: Some(format!(r#"{{"{}": "{}"}}"#, NONCE, CREDENTIALS_SECRET)),
    }
}

pub fn database_relation() -> DatabaseRelationData {
    DatabaseRelationData {
        endpoints: Some("postgresql-k8s-primary:5432,postgresql-k8s-replicas:5432".to_string()),
        username: Some("relation-7".to_string()),
        password: Some("db-password".to_string()),
        tls: Some("False".to_string()),
    }
}
