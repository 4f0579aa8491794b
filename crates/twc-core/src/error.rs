//! Error types for twc-core

use thiserror::Error;

/// Result type alias using twc-core's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for the operator
#[derive(Error, Debug)]
pub enum Error {
    /// A config option was given a value of the wrong type
    #[error("Invalid config: option '{option}' expects {expected}")]
    OptionType {
        option: String,
        expected: &'static str,
    },

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlParse(#[from] serde_yaml_ng::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Pebble plan or layer operation failed
    #[error("Pebble error: {message}")]
    Pebble { message: String },
}

impl Error {
    /// Create an option type mismatch error
    pub fn option_type(option: impl Into<String>, expected: &'static str) -> Self {
        Self::OptionType {
            option: option.into(),
            expected,
        }
    }

    /// Create a pebble error
    pub fn pebble(message: impl Into<String>) -> Self {
        Self::Pebble {
            message: message.into(),
        }
    }
}
