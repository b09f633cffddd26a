//! Wrapping tick arithmetic
//!
//! Every platform counter is exposed as a free-running 32-bit value that
//! wraps silently. Two instants are only comparable while they are less
//! than half the counter range apart; inside that window the comparisons
//! here agree with infinite-precision arithmetic.

#[cfg(feature = "defmt")]
use defmt::Format;

/// Absolute time in timer ticks
pub type Ticks = u32;

/// Half of the counter range; the largest tolerated distance between two
/// instants being compared
pub const HALF_RANGE: u32 = 0x8000_0000;

/// Returns true if `a` is at or after `b`
#[inline]
pub fn time_ge(a: Ticks, b: Ticks) -> bool {
    a.wrapping_sub(b) < HALF_RANGE
}

/// Ticks remaining from `now` until `target`, or 0 if `target` has passed
#[inline]
pub fn ticks_until(now: Ticks, target: Ticks) -> u32 {
    let diff = target.wrapping_sub(now);
    if diff < HALF_RANGE {
        diff
    } else {
        0
    }
}

/// Deadline tracker for background code polling the same counter as the
/// step timers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(Format))]
pub struct PollTimer {
    deadline: Ticks,
}

impl PollTimer {
    /// Create a timer that is already expired at `now`
    pub const fn new(now: Ticks) -> Self {
        Self { deadline: now }
    }

    /// Expire `ticks` after `now`
    pub fn set_after(&mut self, now: Ticks, ticks: u32) {
        debug_assert!(ticks < HALF_RANGE);
        self.deadline = now.wrapping_add(ticks);
    }

    /// Push the deadline further out by `ticks`
    ///
    /// Used for periodic polling without drift: the next deadline is
    /// derived from the previous one, not from the time it was noticed.
    pub fn add(&mut self, ticks: u32) {
        debug_assert!(ticks < HALF_RANGE);
        self.deadline = self.deadline.wrapping_add(ticks);
    }

    /// Returns true once `now` is at or after the deadline
    pub fn is_expired(&self, now: Ticks) -> bool {
        time_ge(now, self.deadline)
    }

    /// Current deadline
    pub fn deadline(&self) -> Ticks {
        self.deadline
    }
}
