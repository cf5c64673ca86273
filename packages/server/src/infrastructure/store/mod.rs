//! Durable store adapters.
//!
//! - `postgrest`: PostgREST (Supabase) over HTTPS, used by the server binary
//! - `inmemory`: in-process store for tests and local tooling

pub mod inmemory;
pub mod postgrest;

pub use inmemory::InMemoryRoomStore;
pub use postgrest::PostgrestRoomStore;
