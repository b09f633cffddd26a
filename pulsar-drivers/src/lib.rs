//! Hardware driver implementations
//!
//! This crate provides embedded-hal implementations of the pin traits
//! defined in pulsar-core:
//!
//! - Step/dir/enable stepper driver on plain GPIO outputs
//! - Enable lines shared between drivers, with an emergency off
//! - Endstop switch on a GPIO input

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod endstop;
pub mod stepper;

pub use endstop::SwitchEndstop;
pub use stepper::{EnableGroup, PinStepper, SharedEnable};
