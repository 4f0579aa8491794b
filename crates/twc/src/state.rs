//! Peer relation state
//!
//! Application data on the `peer` relation is the operator's only durable
//! storage. Values are JSON-encoded strings keyed by name. Every unit can
//! read the bag; only the leader may change it.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

const MODULE_NAME: &str = "module_name";
const UNPACKED_FILE_NAME: &str = "unpacked_file_name";
const SUPPORTED_WORKFLOWS: &str = "supported_workflows";
const SUPPORTED_ACTIVITIES: &str = "supported_activities";
const SUPPORTED_DEPENDENCIES: &str = "supported_dependencies";
const ENV: &str = "env";
const DATABASE_CONNECTION: &str = "database_connection";

#[derive(Error, Debug)]
pub enum StateError {
    #[error("peer relation not ready")]
    NotReady,

    #[error("action cannot be performed on non-leader unit")]
    NotLeader,

    #[error("Invalid state: could not decode peer value '{key}': {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid state: could not encode peer value '{key}': {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Connection parameters cached from the database relation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConnection {
    pub dbname: String,
    pub host: String,
    pub port: String,
    pub user: String,
    pub password: String,
    #[serde(default)]
    pub tls: Option<String>,
}

/// Typed view over the peer relation's application data.
///
/// Loaded once per hook; [`PeerState::is_dirty`] tells the caller whether
/// the bag has to be written back.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PeerState {
    data: Option<BTreeMap<String, String>>,
    leader: bool,
    dirty: bool,
}

impl PeerState {
    /// `data` is `None` until the peer relation has been created
    pub fn new(data: Option<BTreeMap<String, String>>, leader: bool) -> Self {
        Self {
            data,
            leader,
            dirty: false,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.data.is_some()
    }

    pub fn is_leader(&self) -> bool {
        self.leader
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Raw bag, for persisting at the end of a hook
    pub fn data(&self) -> Option<&BTreeMap<String, String>> {
        self.data.as_ref()
    }

    /// Decoded value, `None` when absent or when the relation is not ready
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StateError> {
        let Some(raw) = self.data.as_ref().and_then(|d| d.get(key)) else {
            return Ok(None);
        };
        serde_json::from_str(raw)
            .map(Some)
            .map_err(|source| StateError::Decode {
                key: key.to_string(),
                source,
            })
    }

    pub fn set<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Result<(), StateError> {
        let raw = serde_json::to_string(value).map_err(|source| StateError::Encode {
            key: key.to_string(),
            source,
        })?;
        let data = self.writable()?;
        if data.get(key) != Some(&raw) {
            data.insert(key.to_string(), raw);
            self.dirty = true;
            debug!("Peer state '{}' updated", key);
        }
        Ok(())
    }

    /// Remove a key; removing an absent key is a no-op
    pub fn delete(&mut self, key: &str) -> Result<(), StateError> {
        if self.writable()?.remove(key).is_some() {
            self.dirty = true;
            debug!("Peer state '{}' deleted", key);
        }
        Ok(())
    }

    fn writable(&mut self) -> Result<&mut BTreeMap<String, String>, StateError> {
        if !self.leader {
            return Err(StateError::NotLeader);
        }
        self.data.as_mut().ok_or(StateError::NotReady)
    }

    pub fn module_name(&self) -> Result<Option<String>, StateError> {
        self.get(MODULE_NAME)
    }

    pub fn set_module_name(&mut self, name: Option<&str>) -> Result<(), StateError> {
        match name {
            Some(name) => self.set(MODULE_NAME, name),
            None => self.delete(MODULE_NAME),
        }
    }

    /// File name of the wheel unpacked into the workload container
    pub fn unpacked_file_name(&self) -> Result<Option<String>, StateError> {
        self.get(UNPACKED_FILE_NAME)
    }

    pub fn set_unpacked_file_name(&mut self, name: Option<&str>) -> Result<(), StateError> {
        match name {
            Some(name) => self.set(UNPACKED_FILE_NAME, name),
            None => self.delete(UNPACKED_FILE_NAME),
        }
    }

    pub fn supported_workflows(&self) -> Result<Option<Vec<String>>, StateError> {
        self.get(SUPPORTED_WORKFLOWS)
    }

    pub fn set_supported_workflows(&mut self, workflows: &[String]) -> Result<(), StateError> {
        self.set(SUPPORTED_WORKFLOWS, workflows)
    }

    pub fn supported_activities(&self) -> Result<Option<Vec<String>>, StateError> {
        self.get(SUPPORTED_ACTIVITIES)
    }

    pub fn set_supported_activities(&mut self, activities: &[String]) -> Result<(), StateError> {
        self.set(SUPPORTED_ACTIVITIES, activities)
    }

    pub fn supported_dependencies(&self) -> Result<Option<Vec<String>>, StateError> {
        self.get(SUPPORTED_DEPENDENCIES)
    }

    pub fn set_supported_dependencies(&mut self, dependencies: &[String]) -> Result<(), StateError> {
        self.set(SUPPORTED_DEPENDENCIES, dependencies)
    }

    /// Variables read from the attached env-file resource
    pub fn env(&self) -> Result<Option<BTreeMap<String, String>>, StateError> {
        self.get(ENV)
    }

    pub fn set_env(&mut self, env: Option<&BTreeMap<String, String>>) -> Result<(), StateError> {
        match env {
            Some(env) => self.set(ENV, env),
            None => self.delete(ENV),
        }
    }

    pub fn database_connection(&self) -> Result<Option<DatabaseConnection>, StateError> {
        self.get(DATABASE_CONNECTION)
    }

    pub fn set_database_connection(
        &mut self,
        connection: Option<&DatabaseConnection>,
    ) -> Result<(), StateError> {
        match connection {
            Some(connection) => self.set(DATABASE_CONNECTION, connection),
            None => self.delete(DATABASE_CONNECTION),
        }
    }
}
