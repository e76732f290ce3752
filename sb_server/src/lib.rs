//! Setback table server: an axum WebSocket front end for one table actor.
//!
//! The binary in `main.rs` wires these modules together. They are exposed as a
//! library so integration tests can drive the real router.

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
