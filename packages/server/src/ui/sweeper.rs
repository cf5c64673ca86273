//! Expiry sweeper task.
//!
//! Runs the sweep on a fixed interval, independent of any connection, and
//! tells every authenticated admin about each room it removes.

use std::{sync::Arc, time::Duration};

use tokio::time::MissedTickBehavior;

use crate::{
    infrastructure::dto::websocket::{RoomDeletedAdminPayload, event},
    usecase::SweepReport,
};

use super::{router::broadcast_event, state::AppState};

/// Spawn the periodic sweep. The first sweep runs one `period` after start.
pub fn spawn_sweeper(state: Arc<AppState>, period: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // interval の最初の tick は即座に完了する
        ticker.tick().await;
        tracing::info!("Expiry sweeper started (every {:?})", period);

        loop {
            ticker.tick().await;
            run_sweep(&state).await;
        }
    })
}

/// Run one sweep pass and notify admins of removed rooms
pub async fn run_sweep(state: &AppState) -> Option<SweepReport> {
    let report = match state.sweep_expired_rooms_usecase.execute().await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Expiry sweep failed: {}", e);
            return None;
        }
    };

    if !report.swept.is_empty() {
        let admins = state.admin_sessions.all().await;
        for room_id in &report.swept {
            broadcast_event(
                state.message_pusher.as_ref(),
                &admins,
                event::ROOM_DELETED_ADMIN_NOTIFY,
                RoomDeletedAdminPayload {
                    room_id: room_id.to_string(),
                    message: format!(
                        "Room {} was automatically cleaned up due to inactivity.",
                        room_id
                    ),
                },
            )
            .await;
        }
    }

    tracing::info!(
        "Expiry sweep finished: {} removed, {} still live, {} failed",
        report.swept.len(),
        report.skipped_live.len(),
        report.failed.len()
    );
    Some(report)
}
