/// Millisecond wall clock, injectable so pipeline timing is testable.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

/// Real clock backed by the system time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}
