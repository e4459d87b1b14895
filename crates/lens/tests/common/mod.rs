//! Shared test utilities for lens integration tests.
//!
//! This module provides:
//! - `TestHarness` for isolated runs with temp jobs/runs/cache directories
//! - Builders for catalogs, configs, and step registries

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::TestHarness;
