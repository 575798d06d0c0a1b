//! Wall-clock abstraction.
//!
//! Webhook signatures carry a timestamp that is checked against the current
//! time, and health responses are stamped. Both read time through [`Clock`]
//! so tests can pin it.

use std::sync::{
    atomic::{AtomicI64, Ordering},
    Arc,
};

use chrono::{DateTime, Duration, TimeZone, Utc};

/// Source of the current time.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Returns the current UTC time.
    fn now(&self) -> DateTime<Utc>;

    /// Returns the current time as whole seconds since the Unix epoch.
    fn unix_timestamp(&self) -> i64 {
        self.now().timestamp()
    }
}

/// Production clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock frozen at a settable instant, shared across clones.
///
/// Second resolution is enough for signature tolerance checks.
#[derive(Debug, Clone)]
pub struct FixedClock {
    unix_seconds: Arc<AtomicI64>,
}

impl FixedClock {
    /// Creates a clock frozen at the given Unix timestamp.
    pub fn at(unix_seconds: i64) -> Self {
        Self { unix_seconds: Arc::new(AtomicI64::new(unix_seconds)) }
    }

    /// Creates a clock frozen at the current system time.
    pub fn now_frozen() -> Self {
        Self::at(Utc::now().timestamp())
    }

    /// Moves the clock forward (or backward, for negative durations).
    pub fn advance(&self, by: Duration) {
        self.unix_seconds.fetch_add(by.num_seconds(), Ordering::AcqRel);
    }

    /// Jumps to an absolute Unix timestamp.
    pub fn set(&self, unix_seconds: i64) {
        self.unix_seconds.store(unix_seconds, Ordering::Release);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        let seconds = self.unix_seconds.load(Ordering::Acquire);
        Utc.timestamp_opt(seconds, 0).single().unwrap_or_default()
    }

    fn unix_timestamp(&self) -> i64 {
        self.unix_seconds.load(Ordering::Acquire)
    }
}
