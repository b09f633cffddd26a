//! Board-agnostic step pulse scheduling core
//!
//! This crate contains all stepping logic that does not depend on a
//! specific microcontroller:
//!
//! - Width-tracked fixed-point arithmetic and a rounded integer square root
//! - Wraparound-safe interrupt timer on top of a platform compare channel
//! - Step commands and the per-axis step scheduler
//! - Consumer dispatch, the planner command feed and endstop homing
//! - Static per-axis instance slots for interrupt wiring
//! - Configuration type definitions
//!
//! With the `sim` feature (always on for unit tests) a simulated timer and
//! pin driver allow running whole axes on the host.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

#[macro_use]
mod fmt;

pub mod command;
pub mod config;
pub mod consumer;
pub mod feed;
pub mod fixed;
pub mod homing;
pub mod slot;
pub mod stepper;
pub mod timer;
pub mod traits;

#[cfg(any(test, feature = "sim"))]
pub mod sim;

pub use command::{Command, CommandError};
pub use consumer::{Consumer, ConsumerId, ConsumerList, Flow, Prestep};
pub use slot::AxisSlot;
pub use stepper::AxisStepper;
pub use timer::InterruptTimer;
