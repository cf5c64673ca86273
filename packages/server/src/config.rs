//! Command-line and environment configuration.

use std::time::Duration;

use clap::{Parser, builder::NonEmptyStringValueParser};

use crate::domain::RateLimitPolicy;

#[derive(Parser, Debug, Clone)]
#[command(name = "hushroom-server")]
#[command(about = "Room-scoped ephemeral chat relay", long_about = None)]
pub struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, env = "HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Base URL of the durable store (PostgREST / Supabase)
    #[arg(long, env = "SUPABASE_URL", value_parser = NonEmptyStringValueParser::new())]
    pub store_url: String,

    /// API key sent to the durable store
    #[arg(
        long,
        env = "SUPABASE_ANON_KEY",
        hide_env_values = true,
        value_parser = NonEmptyStringValueParser::new()
    )]
    pub store_key: String,

    /// Deadline for a single durable store call, in milliseconds
    #[arg(long, env = "STORE_TIMEOUT_MS", default_value_t = 5000)]
    pub store_timeout_ms: u64,

    /// Rooms idle for longer than this are removed by the sweeper
    #[arg(long, env = "ROOM_EXPIRY_HOURS", default_value_t = 2)]
    pub room_expiry_hours: u64,

    /// Number of recent messages replayed on join
    #[arg(long, env = "MESSAGE_HISTORY_LIMIT", default_value_t = 50)]
    pub history_limit: usize,

    /// Rate limit window, in milliseconds
    #[arg(long, env = "RATE_LIMIT_WINDOW", default_value_t = 60_000)]
    pub rate_limit_window_ms: u64,

    /// Messages allowed per connection per window
    #[arg(long, env = "RATE_LIMIT_MAX", default_value_t = 10)]
    pub rate_limit_max: u32,

    /// Shared secret for admin login; admin login is disabled when unset
    #[arg(long, env = "ADMIN_SECRET", hide_env_values = true)]
    pub admin_secret: Option<String>,

    /// Seconds between expiry sweeps
    #[arg(
        long,
        env = "SWEEP_INTERVAL_SECS",
        default_value_t = 300,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub sweep_interval_secs: u64,
}

/// Runtime settings consumed by the application state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub store_timeout: Duration,
    pub room_expiry: Duration,
    pub history_limit: usize,
    pub rate_limit: RateLimitPolicy,
    pub admin_secret: Option<String>,
    pub sweep_interval: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            store_timeout: Duration::from_millis(5000),
            room_expiry: Duration::from_secs(2 * 60 * 60),
            history_limit: 50,
            rate_limit: RateLimitPolicy::default(),
            admin_secret: None,
            sweep_interval: Duration::from_secs(300),
        }
    }
}

impl Args {
    pub fn settings(&self) -> Settings {
        Settings {
            store_timeout: Duration::from_millis(self.store_timeout_ms),
            room_expiry: Duration::from_secs(self.room_expiry_hours.saturating_mul(60 * 60)),
            history_limit: self.history_limit,
            rate_limit: RateLimitPolicy {
                window_millis: i64::try_from(self.rate_limit_window_ms).unwrap_or(i64::MAX),
                max_messages: self.rate_limit_max,
            },
            admin_secret: self.admin_secret.clone().filter(|secret| !secret.is_empty()),
            sweep_interval: Duration::from_secs(self.sweep_interval_secs),
        }
    }
}
