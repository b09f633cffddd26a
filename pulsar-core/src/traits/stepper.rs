//! Stepper pin driver traits
//!
//! These abstract over the step/dir/enable pins of a driver chip (A4988,
//! TMC2209 in step/dir mode, etc.) and over a homing switch. They are
//! called from the timer interrupt, so implementations must be plain
//! register writes.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Logical travel direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Direction {
    /// Increasing position
    #[default]
    Forward,
    /// Decreasing position
    Reverse,
}

impl Direction {
    /// Get the opposite direction
    pub fn opposite(self) -> Self {
        match self {
            Direction::Forward => Direction::Reverse,
            Direction::Reverse => Direction::Forward,
        }
    }
}

impl From<bool> for Direction {
    /// `true` is the forward pin polarity
    fn from(forward: bool) -> Self {
        if forward {
            Direction::Forward
        } else {
            Direction::Reverse
        }
    }
}

impl From<Direction> for bool {
    fn from(dir: Direction) -> Self {
        dir == Direction::Forward
    }
}

/// Trait for step/dir stepper drivers
pub trait StepDriver {
    /// Drive the direction output
    ///
    /// Called once per command, before its first pulse.
    fn set_direction(&mut self, dir: Direction);

    /// Raise the step output
    fn step_on(&mut self);

    /// Lower the step output
    ///
    /// Follows `step_on` immediately; the driver is responsible for
    /// meeting its chip's minimum pulse width.
    fn step_off(&mut self);

    /// Enable or disable the motor driver
    ///
    /// When disabled, the motor is free to rotate and does not hold position.
    fn enable(&mut self, enabled: bool);
}

/// Limit switch sampled synchronously with stepping
pub trait Endstop {
    /// Returns true while the switch is pressed
    fn is_triggered(&mut self) -> bool;
}
