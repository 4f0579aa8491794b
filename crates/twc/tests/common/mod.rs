//! Common test utilities for twc
//!
//! This module provides shared test infrastructure including:
//! - Config and model fixtures
//! - An in-memory vault standing in for a real server
//! - A harness wiring the collaborators into a [`Charm`]

#![allow(dead_code)]
#![allow(unused_imports)]

pub mod fixtures;
pub mod mocks;

pub use fixtures::*;
pub use mocks::*;
