//! Step output with a minimum high time
//!
//! The step interrupt raises and drops the step line back to back, which
//! at 125 MHz is a pulse of a few tens of nanoseconds. Driver chips want
//! more (A4988 1 us, TMC2209 100 ns), so the falling edge waits out the
//! configured hold time first.

use core::convert::Infallible;

use embassy_rp::gpio::{Level, Output, Pin};
use embassy_rp::Peri;
use embedded_hal::digital::{ErrorType, OutputPin};

/// System clock assumed when converting the hold time
pub const SYS_CLOCK_HZ: u32 = 125_000_000;

/// GPIO step output that stays high for at least `hold_ns`
pub struct StepOutput<'d> {
    pin: Output<'d>,
    hold_cycles: u32,
}

impl<'d> StepOutput<'d> {
    /// Configure `pin` as a step output, initially low
    pub fn new(pin: Peri<'d, impl Pin>, hold_ns: u32) -> Self {
        Self {
            pin: Output::new(pin, Level::Low),
            hold_cycles: hold_cycles(hold_ns, SYS_CLOCK_HZ),
        }
    }

    /// Busy-wait cycles per pulse
    pub fn hold_cycles(&self) -> u32 {
        self.hold_cycles
    }
}

/// Cycles covering `ns` at `clock_hz`, rounded up
pub const fn hold_cycles(ns: u32, clock_hz: u32) -> u32 {
    let cycles = (ns as u64 * clock_hz as u64).div_ceil(1_000_000_000);
    if cycles > u32::MAX as u64 {
        u32::MAX
    } else {
        cycles as u32
    }
}

impl ErrorType for StepOutput<'_> {
    type Error = Infallible;
}

impl OutputPin for StepOutput<'_> {
    #[inline]
    fn set_high(&mut self) -> Result<(), Infallible> {
        self.pin.set_high();
        Ok(())
    }

    #[inline]
    fn set_low(&mut self) -> Result<(), Infallible> {
        if self.pin.is_set_high() && self.hold_cycles > 0 {
            cortex_m::asm::delay(self.hold_cycles);
        }
        self.pin.set_low();
        Ok(())
    }
}
