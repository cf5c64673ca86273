//! Utilities shared between the Hushroom server binary and its tests.

pub mod logger;
pub mod time;
