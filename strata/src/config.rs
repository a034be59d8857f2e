//! Runtime configuration for a [`Database`](crate::Database).

use std::time::Duration;

/// Pages cached by the buffer pool unless configured otherwise.
pub const DEFAULT_PAGES: usize = 50;

/// How long a blocked lock request sleeps before re-examining the lock table.
pub const DEFAULT_LOCK_RETRY: Duration = Duration::from_millis(50);

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Maximum number of pages resident in the buffer pool.
    pub buffer_pool_pages: usize,
    /// Upper bound on a single lock wait before the conflict is rechecked.
    pub lock_retry_interval: Duration,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            buffer_pool_pages: DEFAULT_PAGES,
            lock_retry_interval: DEFAULT_LOCK_RETRY,
        }
    }
}

impl DatabaseConfig {
    pub fn with_pages(mut self, pages: usize) -> Self {
        self.buffer_pool_pages = pages;
        self
    }

    pub fn with_lock_retry(mut self, interval: Duration) -> Self {
        self.lock_retry_interval = interval;
        self
    }

    /// Defaults overlaid with `STRATA_BUFFER_POOL_PAGES` and `STRATA_LOCK_RETRY_MS`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(pages) = env_number("STRATA_BUFFER_POOL_PAGES") {
            if pages > 0 {
                config.buffer_pool_pages = pages as usize;
            }
        }
        if let Some(ms) = env_number("STRATA_LOCK_RETRY_MS") {
            config.lock_retry_interval = Duration::from_millis(ms);
        }
        config
    }
}

fn env_number(key: &str) -> Option<u64> {
    std::env::var(key).ok()?.trim().parse().ok()
}
