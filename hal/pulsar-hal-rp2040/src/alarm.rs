//! TIMER alarm compare units
//!
//! The RP2040 TIMER is a free-running 1 MHz counter with four alarms. An
//! alarm compares only the low 32 bits and fires on equality, so a value
//! already in the past would not fire until the counter wraps about 72
//! minutes later. `InterruptTimer` never programs such a value: it rebases
//! late deadlines to `now + clearance`.

use embassy_rp::interrupt::{Interrupt, InterruptExt, Priority};
use embassy_rp::pac;
use pulsar_hal::{CompareUnit, Ticks};

/// One TIMER alarm, 1 to 3
///
/// Alarm 0 drives the embassy time driver and is not available.
pub struct AlarmUnit<const N: usize> {
    _private: (),
}

impl<const N: usize> AlarmUnit<N> {
    /// Claim alarm `N`, disarmed with its interrupt source enabled
    ///
    /// Each alarm must be claimed once; two units on the same alarm would
    /// fight over its registers.
    pub fn new() -> Self {
        const { assert!(N >= 1 && N <= 3, "alarm 0 belongs to the time driver") };
        let timer = pac::TIMER;
        timer.armed().write(|w| w.set_armed(1u8 << N));
        timer.intr().write(|w| w.set_alarm(N, true));
        timer.inte().modify(|w| w.set_alarm(N, true));
        Self { _private: () }
    }

    /// NVIC line of this alarm
    pub fn interrupt() -> Interrupt {
        match N {
            1 => Interrupt::TIMER_IRQ_1,
            2 => Interrupt::TIMER_IRQ_2,
            _ => Interrupt::TIMER_IRQ_3,
        }
    }

    /// Unmask the alarm interrupt at `priority`
    ///
    /// The handler must already be able to find its axis (see
    /// `pulsar_core::AxisSlot`): a stale pending match runs it right away.
    pub fn enable_interrupt(&self, priority: Priority) {
        let irq = Self::interrupt();
        irq.unpend();
        irq.set_priority(priority);
        // SAFETY: no critical section relies on this line staying masked;
        // the handler only touches its axis through a critical section.
        unsafe { irq.enable() };
    }

    /// Mask the alarm interrupt
    pub fn disable_interrupt(&self) {
        Self::interrupt().disable();
    }
}

impl<const N: usize> CompareUnit for AlarmUnit<N> {
    #[inline]
    fn now(&self) -> Ticks {
        pac::TIMER.timerawl().read()
    }

    #[inline]
    fn arm_at(&mut self, at: Ticks) {
        // writing the alarm register arms it
        pac::TIMER.alarm(N).write_value(at);
    }

    fn disarm(&mut self) {
        pac::TIMER.armed().write(|w| w.set_armed(1u8 << N));
    }

    fn is_armed(&self) -> bool {
        pac::TIMER.armed().read().armed() & (1u8 << N) != 0
    }

    #[inline]
    fn acknowledge(&mut self) {
        pac::TIMER.intr().write(|w| w.set_alarm(N, true));
    }
}

impl<const N: usize> Drop for AlarmUnit<N> {
    fn drop(&mut self) {
        self.disarm();
        pac::TIMER.inte().modify(|w| w.set_alarm(N, false));
    }
}
