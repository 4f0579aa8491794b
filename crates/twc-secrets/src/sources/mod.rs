//! Resolvers for each section of the environment DSL

pub mod env;
pub mod juju;
pub mod vault;

pub use env::EnvSource;
pub use juju::JujuSource;
pub use vault::VaultSource;
