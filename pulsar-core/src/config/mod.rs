//! Configuration types
//!
//! Board-agnostic configuration structures for the step timers, the pin
//! polarity of each axis and the homing routine. Values normally come from
//! a board definition or a host-side configuration file, so every struct
//! offers a `validate()` that reports problems as a [`ConfigError`]
//! instead of tripping an assertion later.

pub mod axis;
pub mod homing;

pub use axis::*;
pub use homing::*;

/// Configuration validation failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Timer tick rate is zero
    ZeroTickRate,
    /// Clearance would swallow a whole command
    ClearanceTooLarge,
    /// A homing phase has no steps
    EmptyHomingMove,
    /// A homing phase exceeds the travel limit
    HomingMoveTooLong,
    /// A homing step period is zero or longer than one command
    HomingDurationOutOfRange,
}
