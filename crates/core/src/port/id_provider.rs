// ID Provider Port (message ids)

use std::sync::atomic::{AtomicI64, Ordering};

/// Width of a generated id; keeps lexicographic order equal to numeric order
pub const MESSAGE_ID_WIDTH: usize = 20;

/// ID provider interface (allows deterministic IDs in tests)
pub trait IdProvider: Send + Sync {
    /// Generate a new unique message ID
    fn generate_id(&self) -> String;
}

/// Nanosecond-timestamp ids, strictly increasing for the lifetime of the provider
///
/// Two calls landing on the same clock tick (or a clock stepping backwards)
/// get `last + 1`, so ids never repeat even under concurrent sends.
#[derive(Default)]
pub struct TimestampIdProvider {
    last: AtomicI64,
}

impl TimestampIdProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider whose ids all sort after `last`
    ///
    /// Seeded with the newest pending id found at startup, so a clock that
    /// stepped back across a restart cannot reuse a pending key.
    pub fn resuming_after(last: Option<&str>) -> Self {
        let last = last.and_then(|id| id.parse::<i64>().ok()).unwrap_or(0);
        Self {
            last: AtomicI64::new(last),
        }
    }
}

impl IdProvider for TimestampIdProvider {
    fn generate_id(&self) -> String {
        let now = chrono::Utc::now().timestamp_nanos_opt().unwrap_or(0);

        let mut last = self.last.load(Ordering::Acquire);
        loop {
            let next = now.max(last + 1);
            match self
                .last
                .compare_exchange_weak(last, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return format!("{:0width$}", next, width = MESSAGE_ID_WIDTH),
                Err(actual) => last = actual,
            }
        }
    }
}
