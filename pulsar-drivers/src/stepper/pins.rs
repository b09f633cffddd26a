//! Step/dir/enable pin driver
//!
//! Drives any step/dir stepper driver chip (A4988, DRV8825, TMC2209 in
//! standalone mode) directly from GPIO pins.

use embedded_hal::digital::OutputPin;
use pulsar_core::config::AxisConfig;
use pulsar_core::traits::{Direction, StepDriver};

use super::enable::SharedEnable;

/// Stepper driven through three GPIO outputs
///
/// Pin errors are ignored: on the supported targets GPIO writes are
/// infallible, and there is nothing useful to do about a failed write
/// from inside the step interrupt.
pub struct PinStepper<S, D, E> {
    step: S,
    dir: D,
    enable: E,
    /// Forward travel drives the direction pin low
    invert_dir: bool,
    /// Driver enabled = enable pin low
    enable_active_low: bool,
    enabled: bool,
    direction: Direction,
}

impl<S, D, E> PinStepper<S, D, E>
where
    S: OutputPin,
    D: OutputPin,
    E: OutputPin,
{
    /// Create a new pin stepper, initially disabled with the step pin low
    ///
    /// # Arguments
    /// - `invert_dir`: forward travel drives the direction pin low
    /// - `enable_active_low`: the driver is enabled by a low enable pin
    pub fn new(step: S, dir: D, enable: E, invert_dir: bool, enable_active_low: bool) -> Self {
        let mut stepper = Self {
            step,
            dir,
            enable,
            invert_dir,
            enable_active_low,
            enabled: false,
            direction: Direction::Forward,
        };
        let _ = stepper.step.set_low();
        stepper.enable(false);
        stepper.set_direction(Direction::Forward);
        stepper
    }

    /// Create a pin stepper with the polarities from an axis configuration
    pub fn from_config(step: S, dir: D, enable: E, config: &AxisConfig) -> Self {
        Self::new(step, dir, enable, config.invert_dir, config.enable_active_low)
    }

    /// Check if the driver is enabled
    ///
    /// For a shared enable line this is this driver's request; the line
    /// itself may be held by another member or halted.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Current logical direction
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Give back the pins
    pub fn release(self) -> (S, D, E) {
        (self.step, self.dir, self.enable)
    }
}

impl<'g, S, D, P> PinStepper<S, D, SharedEnable<'g, P>>
where
    S: OutputPin,
    D: OutputPin,
    P: OutputPin,
{
    /// Create a pin stepper on a shared enable line, taking the enable
    /// polarity from the group
    pub fn shared(step: S, dir: D, enable: SharedEnable<'g, P>, invert_dir: bool) -> Self {
        let active_low = enable.active_low();
        Self::new(step, dir, enable, invert_dir, active_low)
    }
}

impl<S, D, E> StepDriver for PinStepper<S, D, E>
where
    S: OutputPin,
    D: OutputPin,
    E: OutputPin,
{
    fn set_direction(&mut self, dir: Direction) {
        self.direction = dir;
        let _ = if bool::from(dir) != self.invert_dir {
            self.dir.set_high()
        } else {
            self.dir.set_low()
        };
    }

    #[inline]
    fn step_on(&mut self) {
        let _ = self.step.set_high();
    }

    #[inline]
    fn step_off(&mut self) {
        let _ = self.step.set_low();
    }

    fn enable(&mut self, enabled: bool) {
        self.enabled = enabled;
        let _ = if enabled != self.enable_active_low {
            self.enable.set_high()
        } else {
            self.enable.set_low()
        };
    }
}
