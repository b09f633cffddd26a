//! Pulsar Hardware Abstraction Layer
//!
//! This crate defines the platform-facing traits that chip-specific HALs
//! (RP2040, ...) implement so that the step scheduler in `pulsar-core`
//! can run unchanged on different timers.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  pulsar-core (AxisStepper, timers)      │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  pulsar-hal (this crate - traits)       │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//!             ┌───────────────┐
//!             │ pulsar-hal-   │
//!             │    rp2040     │
//!             └───────────────┘
//! ```
//!
//! # Contents
//!
//! - [`time`] - wrapping 32-bit tick arithmetic and a polling timer
//! - [`compare::CompareUnit`] - one free-running counter plus one
//!   compare-match interrupt, the hardware resource owned by each axis

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod compare;
pub mod time;

// Re-export key items at crate root for convenience
pub use compare::CompareUnit;
pub use time::{time_ge, ticks_until, PollTimer, Ticks, HALF_RANGE};
