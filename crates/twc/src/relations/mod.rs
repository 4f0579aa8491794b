//! Relation data models and handlers

pub mod database;
pub mod vault;

use serde::{Deserialize, Serialize};

/// Which databag a relation write targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataScope {
    App,
    Unit,
}

/// Relation data the hook wants published
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationWrite {
    pub relation: String,
    pub scope: DataScope,
    pub key: String,
    pub value: String,
}

impl RelationWrite {
    pub fn unit(relation: &str, key: &str, value: impl Into<String>) -> Self {
        Self::new(relation, DataScope::Unit, key, value)
    }

    pub fn app(relation: &str, key: &str, value: impl Into<String>) -> Self {
        Self::new(relation, DataScope::App, key, value)
    }

    fn new(relation: &str, scope: DataScope, key: &str, value: impl Into<String>) -> Self {
        Self {
            relation: relation.to_string(),
            scope,
            key: key.to_string(),
            value: value.into(),
        }
    }
}
