//! RP2040-specific HAL for Pulsar step scheduling
//!
//! This crate provides RP2040 implementations of the shared
//! `pulsar-hal` traits, plus board wiring helpers:
//!
//! - Compare units on TIMER alarms 1 to 3 (alarm 0 belongs to the
//!   embassy time driver)
//! - Step outputs that hold the pulse long enough for external drivers
//! - Axis construction from GPIO pins and an axis configuration

#![no_std]

pub mod alarm;
pub mod axis;
pub mod step_pin;

pub use alarm::AlarmUnit;
pub use axis::{new_axis, RpAxis};
pub use step_pin::StepOutput;
