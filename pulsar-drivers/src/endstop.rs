//! Endstop switch on a GPIO input

use embedded_hal::digital::InputPin;
use pulsar_core::traits::Endstop;

/// Limit switch read from one input pin
///
/// A read error counts as triggered, so homing stops rather than driving
/// into the frame.
pub struct SwitchEndstop<P> {
    pin: P,
    /// Pressed = pin low (normally-closed switch to ground)
    inverted: bool,
}

impl<P: InputPin> SwitchEndstop<P> {
    /// Create a switch that reads high when pressed, or low if `inverted`
    pub fn new(pin: P, inverted: bool) -> Self {
        Self { pin, inverted }
    }

    /// Give back the pin
    pub fn release(self) -> P {
        self.pin
    }
}

impl<P: InputPin> Endstop for SwitchEndstop<P> {
    fn is_triggered(&mut self) -> bool {
        match self.pin.is_high() {
            Ok(high) => high != self.inverted,
            Err(_) => true,
        }
    }
}
