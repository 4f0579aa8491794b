//! # twc-core
//!
//! Core library for the Temporal worker operator providing:
//! - Charm configuration parsing with typed defaults
//! - Pebble layer and plan types
//! - Unit status values reported back to Juju
//! - Literals shared by every crate in the workspace

pub mod config;
pub mod error;
pub mod literals;
pub mod pebble;
pub mod status;

pub use config::{value_to_env, CharmConfig};
pub use error::{Error, Result};
pub use pebble::{Layer, Plan, Service};
pub use status::UnitStatus;
