//! Room-scoped ephemeral chat relay.
//!
//! Clients create short-lived rooms identified by a six-character code, join
//! them under a generated guest name and exchange messages over WebSocket.
//! An administrator holding the shared secret can list and delete rooms, and
//! a background sweeper removes rooms that stayed idle past their expiry.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

pub mod config;
