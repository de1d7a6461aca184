//! Common test utilities for patch-dl integration tests

#[allow(dead_code)]
pub mod fixtures;

pub use fixtures::*;
