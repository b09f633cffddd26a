//! Stepper driver implementations

pub mod enable;
pub mod pins;

pub use enable::{emergency_disable, EmergencyStop, EnableGroup, EnableState, SharedEnable};
pub use pins::PinStepper;
