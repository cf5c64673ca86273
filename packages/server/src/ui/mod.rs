//! UI layer: axum server, WebSocket handler, Event Router and the expiry sweeper.

mod handler;
pub mod router;
mod server;
mod signal;
pub mod state;
pub mod sweeper;

pub use router::EventRouter;
pub use server::Server;
pub use state::AppState;
