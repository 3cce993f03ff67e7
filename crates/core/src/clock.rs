//! Wall-clock abstraction and cooperative deadlines
//!
//! The Bisection Engine and the Move Detector poll a [`Deadline`] at loop
//! boundaries. The deadline reads time through a [`Clock`] so tests can
//! drive expiry without sleeping.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Source of the current time
pub trait Clock: Send + Sync + fmt::Debug {
    /// Current instant according to this clock
    fn now(&self) -> Instant;
}

/// The real monotonic clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

static SYSTEM_CLOCK: SystemClock = SystemClock;

/// A clock that only moves when told to
///
/// Every call to [`Clock::now`] first advances the clock by the configured
/// auto-advance step, which lets a test simulate a computation that takes
/// longer than its budget.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    offset_nanos: AtomicU64,
    auto_advance_nanos: u64,
}

impl ManualClock {
    /// Create a frozen clock
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset_nanos: AtomicU64::new(0),
            auto_advance_nanos: 0,
        }
    }

    /// Advance by `step` on every reading
    pub fn with_auto_advance(mut self, step: Duration) -> Self {
        self.auto_advance_nanos = duration_nanos(step);
        self
    }

    /// Move the clock forward
    pub fn advance(&self, by: Duration) {
        self.offset_nanos
            .fetch_add(duration_nanos(by), Ordering::SeqCst);
    }

    /// Time elapsed since the clock was created
    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.offset_nanos.load(Ordering::SeqCst))
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let offset = self
            .offset_nanos
            .fetch_add(self.auto_advance_nanos, Ordering::SeqCst)
            + self.auto_advance_nanos;
        self.origin + Duration::from_nanos(offset)
    }
}

fn duration_nanos(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}

/// A point in time after which long-running work should give up
#[derive(Clone, Copy)]
pub struct Deadline<'a> {
    clock: &'a dyn Clock,
    limit: Option<Instant>,
}

impl<'a> Deadline<'a> {
    /// Deadline `timeout` from now on `clock`; `None` never expires
    pub fn after(clock: &'a dyn Clock, timeout: Option<Duration>) -> Self {
        let limit = timeout.and_then(|t| clock.now().checked_add(t));
        Self { clock, limit }
    }

    /// Whether this deadline can ever expire
    pub fn is_bounded(&self) -> bool {
        self.limit.is_some()
    }

    /// Whether the deadline has passed
    pub fn expired(&self) -> bool {
        match self.limit {
            Some(limit) => self.clock.now() > limit,
            None => false,
        }
    }
}

impl Deadline<'static> {
    /// A deadline that never expires
    pub fn unbounded() -> Self {
        Self {
            clock: &SYSTEM_CLOCK,
            limit: None,
        }
    }
}

impl fmt::Debug for Deadline<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deadline")
            .field("bounded", &self.is_bounded())
            .finish()
    }
}
