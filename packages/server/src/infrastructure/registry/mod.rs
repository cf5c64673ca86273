//! Live room registry implementations.

pub mod inmemory;

pub use inmemory::InMemoryRoomRegistry;
