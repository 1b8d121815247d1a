//! # testbed-common
//!
//! Shared types, error definitions, configuration models, and constants
//! used across the testbed workspace.
//!
//! This crate is the leaf of the dependency graph. The runtime and resource
//! crates build on the primitives defined here.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod config;
pub mod constants;
pub mod error;
pub mod types;
pub mod workload;
