//! # twc
//!
//! Reconciliation logic of the Temporal worker operator:
//! - Peer state and relation data models
//! - The workflows wheel resource
//! - The reconciler and unit status machine
//! - Operator actions
//! - Hook snapshots replayed by the `twc` binary

pub mod actions;
pub mod charm;
pub mod check;
pub mod container;
pub mod model;
pub mod relations;
pub mod resources;
pub mod state;

pub use actions::{ActionName, ActionOutcome, ActionParams};
pub use charm::{Charm, CharmError, EventOutcome, HookEvent, ValidationError};
pub use container::{Container, ContainerState, SnapshotContainer};
pub use model::{Model, Snapshot};
pub use state::{DatabaseConnection, PeerState, StateError};
