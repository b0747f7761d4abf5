//! Shared test utilities for the map layer sync workspace.
//!
//! This crate provides:
//! - Layer, drawn-feature and response fixtures
//! - A stub WMS server that answers GetFeatureInfo with canned bodies
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! ```ignore
//! use test_utils::{fixtures, StubWmsServer};
//! ```

pub mod fixtures;
pub mod stub_server;

pub use fixtures::*;
pub use stub_server::{StubResponse, StubWmsServer};
