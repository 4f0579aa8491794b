//! PostgreSQL `database` relation
//!
//! The primary endpoint and credentials are cached in peer state so every
//! unit sees the same connection without re-reading the relation.

use crate::state::DatabaseConnection;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;
use twc_core::config::dual_prefixed;

/// Application data the database provider publishes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseRelationData {
    /// Comma-separated `host:port` list, primary first
    pub endpoints: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub tls: Option<String>,
}

impl DatabaseRelationData {
    /// Connection to the primary endpoint, `None` while the data is incomplete
    pub fn connection(&self, dbname: &str) -> Option<DatabaseConnection> {
        let primary = self.endpoints.as_deref()?.split(',').next()?.trim();
        let Some((host, port)) = primary.rsplit_once(':') else {
            debug!("Database endpoint '{}' has no port", primary);
            return None;
        };
        if host.is_empty() || port.is_empty() {
            return None;
        }

        Some(DatabaseConnection {
            dbname: dbname.to_string(),
            host: host.to_string(),
            port: port.to_string(),
            user: self.username.clone()?,
            password: self.password.clone()?,
            tls: self.tls.clone(),
        })
    }
}

/// Worker variables for a cached connection
pub fn connection_env(connection: &DatabaseConnection) -> BTreeMap<String, String> {
    [
        ("DB_HOST", connection.host.as_str()),
        ("DB_PORT", connection.port.as_str()),
        ("DB_USER", connection.user.as_str()),
        ("DB_PASSWORD", connection.password.as_str()),
        ("DB_TLS", connection.tls.as_deref().unwrap_or("")),
    ]
    .into_iter()
    .flat_map(|(suffix, value)| dual_prefixed(suffix, value))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(endpoints: &str) -> DatabaseRelationData {
        DatabaseRelationData {
            endpoints: Some(endpoints.to_string()),
            username: Some("operator".to_string()),
            password: Some("pw".to_string()),
            tls: Some("True".to_string()),
        }
    }

    #[test]
    fn test_primary_endpoint_used() {
        let connection = data("10.0.0.1:5432,10.0.0.2:5432").connection("worker").unwrap();
        assert_eq!(connection.host, "10.0.0.1");
        assert_eq!(connection.port, "5432");
        assert_eq!(connection.dbname, "worker");
    }

    #[test]
    fn test_incomplete_data_ignored() {
        assert_eq!(data("10.0.0.1").connection("worker"), None);
        assert_eq!(DatabaseRelationData::default().connection("worker"), None);

        let mut no_password = data("10.0.0.1:5432");
        no_password.password = None;
        assert_eq!(no_password.connection("worker"), None);
    }

    #[test]
    fn test_connection_env() {
        let connection = data("db:5432").connection("worker").unwrap();
        let env = connection_env(&connection);

        assert_eq!(env.len(), 10);
        assert_eq!(env["TWC_DB_HOST"], "db");
        assert_eq!(env["TEMPORAL_DB_PASSWORD"], "pw");
        assert_eq!(env["TWC_DB_TLS"], "True");
    }
}
