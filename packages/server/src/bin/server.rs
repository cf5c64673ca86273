//! Room-scoped chat relay server.
//!
//! Run with:
//! ```not_rust
//! SUPABASE_URL=https://xyz.supabase.co SUPABASE_ANON_KEY=... cargo run --bin hushroom-server
//! cargo run --bin hushroom-server -- --host 0.0.0.0 --port 3000 --store-url ... --store-key ...
//! ```

use std::sync::Arc;

use clap::Parser;
use hushroom_server::{
    config::Args,
    domain::RandomIdentifierGenerator,
    infrastructure::store::PostgrestRoomStore,
    ui::{AppState, Server},
};
use hushroom_shared::{logger::setup_logger, time::SystemClock};

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();
    let settings = args.settings();

    // Initialize dependencies in order:
    // 1. Durable store
    // 2. AppState (registry, pusher, use cases)
    // 3. Server
    let store = match PostgrestRoomStore::new(
        &args.store_url,
        &args.store_key,
        settings.store_timeout,
    ) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            tracing::error!("Failed to set up the durable store: {}", e);
            std::process::exit(1);
        }
    };
    tracing::info!("Using durable store at {}", args.store_url);

    let state = Arc::new(AppState::build(
        store,
        &settings,
        Arc::new(SystemClock),
        Arc::new(RandomIdentifierGenerator),
    ));

    let server = Server::new(state);
    if let Err(e) = server
        .run(args.host, args.port, settings.sweep_interval)
        .await
    {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
