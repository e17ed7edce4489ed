//! Orba GW - controller state gateway
//!
//! Normalizes MIDI input from an Orba controller into a single state record
//! and pushes a snapshot of it to WebSocket (and optionally stdout)
//! subscribers whenever an observable field changes.
//!
//! Data flow: device -> [`midi`] -> [`normalizer`] -> [`state`] ->
//! [`broadcast`] -> [`api`] / [`sink`], driven by [`pipeline`].

pub mod api;
pub mod broadcast;
pub mod config;
pub mod device;
pub mod error;
pub mod midi;
pub mod normalizer;
pub mod pipeline;
pub mod sink;
pub mod sniffer;
pub mod state;

pub use error::{GatewayError, Result};
