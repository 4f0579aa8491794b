//! Static values from the `env` section

use crate::security::SecureString;
use twc_core::value_to_env;

/// Copies `env` values straight through
pub struct EnvSource;

impl EnvSource {
    /// Render a value for the environment; lists and maps become compact JSON
    pub fn resolve(value: &serde_json::Value) -> SecureString {
        SecureString::new(value_to_env(value))
    }
}
