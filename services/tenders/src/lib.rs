//! Tender procurement service library crate.
//!
//! # Purpose
//! Exposes the versioned tender store, the directory lookups, the access
//! policy, configuration, and the HTTP API for use by the binary and tests.
pub mod api;
pub mod app;
pub mod config;
pub mod directory;
pub mod model;
pub mod observability;
pub mod policy;
pub mod store;
