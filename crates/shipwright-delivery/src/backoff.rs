//! Fixed backoff schedule for delivery retries.

use std::time::Duration;

/// Default waits between attempts, in seconds.
const DEFAULT_DELAYS_SECONDS: [u64; 5] = [1, 2, 4, 8, 16];

/// Bounded exponential backoff table.
///
/// The wait before attempt `n + 1` is the `n`-th table entry; attempts past
/// the end of the table reuse the last entry, so the wait never grows
/// beyond the configured maximum.
#[derive(Debug, Clone)]
pub struct BackoffSchedule {
    delays: Vec<Duration>,
}

impl BackoffSchedule {
    /// Creates a schedule from explicit delays.
    pub fn new(delays: Vec<Duration>) -> Self {
        Self { delays }
    }

    /// Returns the wait after the given zero-based attempt index.
    pub fn delay(&self, attempt: u32) -> Duration {
        match self.delays.get(attempt as usize) {
            Some(d) => *d,
            None => self.delays.last().copied().unwrap_or(Duration::from_secs(1)),
        }
    }

    /// Number of entries in the table.
    pub fn len(&self) -> usize {
        self.delays.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.delays.is_empty()
    }
}

impl Default for BackoffSchedule {
    fn default() -> Self {
        Self::new(DEFAULT_DELAYS_SECONDS.iter().map(|s| Duration::from_secs(*s)).collect())
    }
}
