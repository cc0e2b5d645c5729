use std::sync::atomic::{AtomicI64, Ordering};

/// Wall-clock millis that never repeat or go backwards within a process.
#[derive(Debug, Default)]
pub struct MonotonicClock {
    last: AtomicI64,
}

impl MonotonicClock {
    /// Start strictly after `floor`, typically the newest persisted value.
    pub fn starting_after(floor: i64) -> Self {
        Self {
            last: AtomicI64::new(floor),
        }
    }

    pub fn now_ms() -> i64 {
        chrono::Utc::now().timestamp_millis()
    }

    pub fn next(&self) -> i64 {
        let now = Self::now_ms();
        let prev = self
            .last
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |prev| {
                Some(now.max(prev + 1))
            })
            .unwrap_or_else(|prev| prev);
        now.max(prev + 1)
    }

    pub fn last(&self) -> i64 {
        self.last.load(Ordering::Acquire)
    }
}
