//! `ideascout` crate (library surface).
//!
//! The end-user entrypoint is the `ideascout` binary (HTTP server + CLI). The library
//! exposes the router and configuration so tests and embedders can drive the API in
//! process.

pub use ideascout_core as core;
pub use ideascout_local as local;

pub mod api;
pub mod config;
pub mod persist;
pub mod telemetry;
