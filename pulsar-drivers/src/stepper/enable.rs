//! Enable lines shared between several drivers
//!
//! Many boards wire one EN signal to every stepper driver. Each axis on
//! such a line gets a [`SharedEnable`] member with its own mask bit; the
//! line is asserted while any member wants it and released only after
//! the last member lets go.
//!
//! [`EnableGroup::emergency`] forces the line off from any context and
//! latches it off until [`EnableGroup::resume`]. Boards whose drivers
//! each have their own EN pin can still put every pin in a group of one
//! to get the same emergency path.
//!
//! ```ignore
//! static STEPPERS_EN: EnableGroup<Output<'static>> = EnableGroup::new(true);
//!
//! STEPPERS_EN.install(Output::new(p.PIN_8, Level::High));
//! let x = PinStepper::shared(x_step, x_dir, STEPPERS_EN.member(0), false);
//! let y = PinStepper::shared(y_step, y_dir, STEPPERS_EN.member(1), true);
//! ```

use core::cell::RefCell;
use core::convert::Infallible;

use critical_section::Mutex;
use embedded_hal::digital::{ErrorType, OutputPin};

/// Level of a shared enable line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EnableState {
    /// No member wants the drivers enabled
    Off,
    /// At least one member holds the line
    On,
    /// Forced off by an emergency
    Halted,
}

struct Line<P> {
    pin: Option<P>,
    mask: u32,
    halted: bool,
}

impl<P: OutputPin> Line<P> {
    fn state(&self) -> EnableState {
        if self.halted {
            EnableState::Halted
        } else if self.mask != 0 {
            EnableState::On
        } else {
            EnableState::Off
        }
    }

    fn drive(&mut self, active_low: bool) {
        let on = self.state() == EnableState::On;
        if let Some(pin) = self.pin.as_mut() {
            let _ = if on != active_low {
                pin.set_high()
            } else {
                pin.set_low()
            };
        }
    }
}

/// One physical enable pin shared by up to 32 drivers
pub struct EnableGroup<P> {
    line: Mutex<RefCell<Line<P>>>,
    active_low: bool,
}

impl<P: OutputPin> EnableGroup<P> {
    /// Empty group, usable in a `static`; the pin comes with `install`
    pub const fn new(active_low: bool) -> Self {
        Self {
            line: Mutex::new(RefCell::new(Line {
                pin: None,
                mask: 0,
                halted: false,
            })),
            active_low,
        }
    }

    /// Hand over the pin and drive it to the current level
    pub fn install(&self, pin: P) {
        critical_section::with(|cs| {
            let mut line = self.line.borrow_ref_mut(cs);
            line.pin = Some(pin);
            line.drive(self.active_low);
        });
    }

    /// Member handle for the driver owning mask bit `bit`
    pub fn member(&self, bit: u8) -> SharedEnable<'_, P> {
        debug_assert!(bit < 32);
        SharedEnable {
            group: self,
            mask: 1 << bit,
        }
    }

    /// The driver's enable input is active-low
    pub fn active_low(&self) -> bool {
        self.active_low
    }

    /// Current line level
    pub fn state(&self) -> EnableState {
        critical_section::with(|cs| self.line.borrow_ref(cs).state())
    }

    /// Members currently holding the line
    pub fn mask(&self) -> u32 {
        critical_section::with(|cs| self.line.borrow_ref(cs).mask)
    }

    /// Force the line off and keep it off until `resume`
    pub fn emergency(&self) {
        critical_section::with(|cs| {
            let mut line = self.line.borrow_ref_mut(cs);
            line.halted = true;
            line.drive(self.active_low);
        });
    }

    /// Leave the emergency state; members that still hold the line
    /// re-enable it
    pub fn resume(&self) {
        critical_section::with(|cs| {
            let mut line = self.line.borrow_ref_mut(cs);
            line.halted = false;
            line.drive(self.active_low);
        });
    }

    fn update(&self, mask: u32, enabled: bool) {
        critical_section::with(|cs| {
            let mut line = self.line.borrow_ref_mut(cs);
            if enabled {
                line.mask |= mask;
            } else {
                line.mask &= !mask;
            }
            line.drive(self.active_low);
        });
    }
}

/// Anything that can cut driver power from an emergency path
pub trait EmergencyStop {
    /// Force the enable line off
    fn emergency(&self);
}

impl<P: OutputPin> EmergencyStop for EnableGroup<P> {
    fn emergency(&self) {
        EnableGroup::emergency(self);
    }
}

/// Force every listed enable line off
pub fn emergency_disable(lines: &[&dyn EmergencyStop]) {
    for line in lines {
        line.emergency();
    }
}

/// One driver's view of a shared enable line
///
/// Behaves as an output pin at the group's polarity, so it plugs into
/// [`PinStepper`](super::PinStepper) as the enable pin.
pub struct SharedEnable<'g, P> {
    group: &'g EnableGroup<P>,
    mask: u32,
}

impl<P: OutputPin> SharedEnable<'_, P> {
    /// The driver's enable input is active-low
    pub fn active_low(&self) -> bool {
        self.group.active_low
    }
}

impl<P> ErrorType for SharedEnable<'_, P> {
    type Error = Infallible;
}

impl<P: OutputPin> OutputPin for SharedEnable<'_, P> {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.group.update(self.mask, self.group.active_low);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.group.update(self.mask, !self.group.active_low);
        Ok(())
    }
}
