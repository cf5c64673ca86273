//! Fixed-window rate limiting per connection.
//!
//! A window opens on the first attempt after the previous one elapsed. Every
//! attempt inside the window counts, rejected ones included. Bursts straddling
//! a boundary can reach twice the configured rate.

use std::{collections::HashMap, sync::Arc};

use hushroom_shared::time::Clock;
use tokio::sync::Mutex;

use super::value_object::{ConnectionId, Timestamp};

/// Window length and the number of messages allowed within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub window_millis: i64,
    pub max_messages: u32,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            window_millis: 60_000,
            max_messages: 10,
        }
    }
}

/// Counter state for one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitWindow {
    pub count: u32,
    pub window_start: Timestamp,
}

impl RateLimitWindow {
    pub fn new(now: Timestamp) -> Self {
        Self {
            count: 0,
            window_start: now,
        }
    }

    /// Count one attempt at `now`; returns `false` if it exceeds the policy.
    pub fn hit(&mut self, now: Timestamp, policy: &RateLimitPolicy) -> bool {
        if now.value() - self.window_start.value() > policy.window_millis {
            self.count = 1;
            self.window_start = now;
        } else {
            self.count = self.count.saturating_add(1);
        }
        self.count <= policy.max_messages
    }
}

/// Per-connection fixed-window limiter.
pub struct RateLimiter {
    policy: RateLimitPolicy,
    clock: Arc<dyn Clock>,
    windows: Mutex<HashMap<ConnectionId, RateLimitWindow>>,
}

impl RateLimiter {
    pub fn new(policy: RateLimitPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            policy,
            clock,
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn policy(&self) -> &RateLimitPolicy {
        &self.policy
    }

    /// Open a window for a freshly connected client.
    pub async fn register(&self, connection_id: ConnectionId) {
        let now = self.now();
        self.windows
            .lock()
            .await
            .entry(connection_id)
            .or_insert_with(|| RateLimitWindow::new(now));
    }

    /// Count a message attempt; `false` means the connection is over its limit.
    pub async fn try_acquire(&self, connection_id: &ConnectionId) -> bool {
        let now = self.now();
        let mut windows = self.windows.lock().await;
        let window = windows
            .entry(*connection_id)
            .or_insert_with(|| RateLimitWindow::new(now));
        window.hit(now, &self.policy)
    }

    /// Drop the state of a disconnected client.
    pub async fn forget(&self, connection_id: &ConnectionId) {
        self.windows.lock().await.remove(connection_id);
    }

    pub async fn tracked_connections(&self) -> usize {
        self.windows.lock().await.len()
    }

    fn now(&self) -> Timestamp {
        Timestamp::new(self.clock.now_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hushroom_shared::time::FixedClock;

    fn limiter(window_millis: i64, max_messages: u32) -> (RateLimiter, Arc<FixedClock>) {
        let clock = Arc::new(FixedClock::new(1_000));
        let limiter = RateLimiter::new(
            RateLimitPolicy {
                window_millis,
                max_messages,
            },
            clock.clone(),
        );
        (limiter, clock)
    }

    #[test]
    fn test_window_resets_after_elapsing() {
        // テスト項目: ウィンドウ経過後の最初の試行でカウントが 1 にリセットされる
        // given (前提条件):
        let policy = RateLimitPolicy {
            window_millis: 100,
            max_messages: 1,
        };
        let mut window = RateLimitWindow::new(Timestamp::new(0));
        assert!(window.hit(Timestamp::new(10), &policy));
        assert!(!window.hit(Timestamp::new(20), &policy));

        // when (操作):
        let allowed = window.hit(Timestamp::new(101), &policy);

        // then (期待する結果):
        assert!(allowed);
        assert_eq!(window.count, 1);
        assert_eq!(window.window_start, Timestamp::new(101));
    }

    #[test]
    fn test_window_boundary_is_inclusive() {
        // テスト項目: ちょうどウィンドウ長だけ経過した時点ではまだ同じウィンドウ
        // given (前提条件):
        let policy = RateLimitPolicy {
            window_millis: 100,
            max_messages: 1,
        };
        let mut window = RateLimitWindow::new(Timestamp::new(0));
        assert!(window.hit(Timestamp::new(0), &policy));

        // when (操作):
        let allowed = window.hit(Timestamp::new(100), &policy);

        // then (期待する結果):
        assert!(!allowed);
    }

    #[tokio::test]
    async fn test_rejects_attempt_after_max() {
        // テスト項目: 上限 + 1 回目の送信が拒否される
        // given (前提条件):
        let (limiter, _clock) = limiter(60_000, 10);
        let connection_id = ConnectionId::generate();
        limiter.register(connection_id).await;

        // when (操作):
        let mut results = Vec::new();
        for _ in 0..11 {
            results.push(limiter.try_acquire(&connection_id).await);
        }

        // then (期待する結果):
        assert!(results[..10].iter().all(|allowed| *allowed));
        assert!(!results[10]);
    }

    #[tokio::test]
    async fn test_allows_again_after_window_elapses() {
        // テスト項目: ウィンドウ経過後は再び送信できる
        // given (前提条件):
        let (limiter, clock) = limiter(60_000, 2);
        let connection_id = ConnectionId::generate();
        limiter.register(connection_id).await;
        for _ in 0..3 {
            limiter.try_acquire(&connection_id).await;
        }
        assert!(!limiter.try_acquire(&connection_id).await);

        // when (操作):
        clock.advance(60_001);
        let allowed = limiter.try_acquire(&connection_id).await;

        // then (期待する結果):
        assert!(allowed);
    }

    #[tokio::test]
    async fn test_connections_are_limited_independently() {
        // テスト項目: 接続ごとに独立してカウントされる
        // given (前提条件):
        let (limiter, _clock) = limiter(60_000, 1);
        let alice = ConnectionId::generate();
        let bob = ConnectionId::generate();
        assert!(limiter.try_acquire(&alice).await);
        assert!(!limiter.try_acquire(&alice).await);

        // when (操作):
        let allowed = limiter.try_acquire(&bob).await;

        // then (期待する結果):
        assert!(allowed);
    }

    #[tokio::test]
    async fn test_forget_discards_window() {
        // テスト項目: 切断時にウィンドウ状態が破棄される
        // given (前提条件):
        let (limiter, _clock) = limiter(60_000, 1);
        let connection_id = ConnectionId::generate();
        limiter.register(connection_id).await;

        // when (操作):
        limiter.forget(&connection_id).await;

        // then (期待する結果):
        assert_eq!(limiter.tracked_connections().await, 0);
    }
}
