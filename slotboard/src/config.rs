use std::time::Duration;

use crate::batch::executor::BatchConfig;

#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Database connection string.
    pub database_url: String,

    // =========================
    // Storage configuration
    // =========================
    /// Upper bound on a single slot store call.
    ///
    /// A per-slot call that exceeds it is reported as an `UNKNOWN` failure for
    /// that slot only; the rest of the batch carries on.
    pub store_timeout_ms: u64,

    // =========================
    // Batch configuration
    // =========================
    /// Maximum number of per-slot units of work in flight for one batch.
    ///
    /// Slots never interact, so any value >= 1 is correct; this only bounds
    /// load on the store.
    pub batch_max_concurrency: usize,

    /// Maximum number of IDs accepted in a single request.
    ///
    /// Out-of-range IDs are accepted (and reported per item), so without a cap a
    /// caller could submit an arbitrarily large list.
    pub batch_max_size: usize,

    /// Emit JSON logs instead of pretty output.
    pub log_json: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://slotboard_dev.db?mode=rwc".to_string(),
            store_timeout_ms: 2_000,
            batch_max_concurrency: 8,
            batch_max_size: 100,
            log_json: false,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let database_url = std::env::var("DATABASE_URL").unwrap_or(defaults.database_url);

        Self {
            database_url,
            store_timeout_ms: env_parse("SLOT_STORE_TIMEOUT_MS").unwrap_or(defaults.store_timeout_ms),
            batch_max_concurrency: env_parse("BATCH_MAX_CONCURRENCY")
                .unwrap_or(defaults.batch_max_concurrency)
                .max(1),
            batch_max_size: env_parse("BATCH_MAX_SIZE").unwrap_or(defaults.batch_max_size),
            log_json: std::env::var("APP_ENV").unwrap_or_default() == "production",
        }
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn batch(&self) -> BatchConfig {
        BatchConfig {
            max_concurrency: self.batch_max_concurrency.max(1),
            // one read plus one write per slot
            per_slot_timeout: self.store_timeout() * 2,
            max_batch_size: self.batch_max_size,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}
