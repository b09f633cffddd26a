//! Wraparound-safe interrupt timer
//!
//! Layers the scheduling contract of a step timer on top of a raw
//! [`CompareUnit`]: the logical time of the next event is remembered as
//! requested, while the compare register is programmed at least
//! `clearance` ticks ahead of the counter so the match can never be
//! missed by landing in the past.
//!
//! Instants are compared modulo 2^32, so a requested time may lag the
//! counter by at most 2^31 ticks before it is mistaken for the future.

use pulsar_hal::time::{time_ge, HALF_RANGE};
use pulsar_hal::{CompareUnit, Ticks};

/// Compare channel with clearance-based rebasing
pub struct InterruptTimer<U> {
    unit: U,
    time: Ticks,
    clearance: u32,
    armed: bool,
}

impl<U: CompareUnit> InterruptTimer<U> {
    /// Take ownership of a compare channel
    pub fn new(mut unit: U, clearance: u32) -> Self {
        debug_assert!(clearance < HALF_RANGE);
        unit.disarm();
        Self {
            unit,
            time: 0,
            clearance,
            armed: false,
        }
    }

    /// Give the compare channel back; the timer must be disarmed
    pub fn release(self) -> U {
        debug_assert!(!self.armed);
        self.unit
    }

    /// Read the free-running counter
    pub fn now(&self) -> Ticks {
        self.unit.now()
    }

    /// Arm for the first event of a run
    pub fn set_first(&mut self, time: Ticks) {
        debug_assert!(!self.armed);
        critical_section::with(|_| {
            self.program(time);
            self.armed = true;
        });
    }

    /// Re-arm from inside the interrupt handler
    pub fn set_next(&mut self, time: Ticks) {
        debug_assert!(self.armed);
        self.program(time);
    }

    /// Disarm; legal from background or interrupt context
    pub fn unset(&mut self) {
        critical_section::with(|_| {
            self.unit.disarm();
            self.armed = false;
        });
    }

    /// Dispatch a compare match
    ///
    /// `handler` re-arms through [`set_next`](Self::set_next) and returns
    /// whether the timer should stay armed. A match that arrives before
    /// the requested time re-programs the compare and skips the handler.
    pub fn irq_handler<F>(&mut self, handler: F)
    where
        F: FnOnce(&mut Self) -> bool,
    {
        self.unit.acknowledge();
        if !self.armed {
            return;
        }
        if !time_ge(self.unit.now(), self.time) {
            let time = self.time;
            self.program(time);
            return;
        }
        if !handler(self) {
            self.unit.disarm();
            self.armed = false;
        }
    }

    /// Logical time of the most recent request
    pub fn last_set_time(&self) -> Ticks {
        self.time
    }

    /// True between `set_first` and `unset` or a handler returning false
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Minimum lead of a programmed compare over the counter
    pub fn clearance(&self) -> u32 {
        self.clearance
    }

    /// Underlying compare channel
    pub fn unit(&self) -> &U {
        &self.unit
    }

    fn program(&mut self, time: Ticks) {
        self.time = time;
        let now = self.unit.now();
        let overrun = now.wrapping_sub(time).wrapping_add(self.clearance);
        let compare = if overrun < HALF_RANGE {
            time.wrapping_add(overrun)
        } else {
            time
        };
        self.unit.arm_at(compare);
    }
}
