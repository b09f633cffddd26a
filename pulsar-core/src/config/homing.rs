//! Homing configuration

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::command::MAX_TICKS;
use crate::traits::Direction;

/// Longest travel of a single homing phase, in steps
pub const MAX_HOMING_STEPS: u32 = 1 << 24;

/// One constant-speed homing phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HomingMove {
    /// Maximum travel in steps
    pub steps: u32,
    /// Ticks per step
    pub step_ticks: u32,
}

impl HomingMove {
    /// Phase travelling `steps` at `steps_per_s`
    pub fn at_speed(steps: u32, steps_per_s: u32, tick_hz: u32) -> Self {
        let step_ticks = if steps_per_s == 0 {
            0
        } else {
            tick_hz / steps_per_s
        };
        Self { steps, step_ticks }
    }

    /// Check the phase
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.steps == 0 {
            return Err(ConfigError::EmptyHomingMove);
        }
        if self.steps > MAX_HOMING_STEPS {
            return Err(ConfigError::HomingMoveTooLong);
        }
        if self.step_ticks == 0 || self.step_ticks > MAX_TICKS {
            return Err(ConfigError::HomingDurationOutOfRange);
        }
        Ok(())
    }
}

/// Three-phase homing: fast approach, retract, slow approach
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HomingConfig {
    /// Direction toward the switch
    pub home_dir: Direction,
    /// Approach until the switch closes
    pub fast: HomingMove,
    /// Back off until the switch opens
    pub retract: HomingMove,
    /// Approach again at low speed for repeatability
    pub slow: HomingMove,
}

impl Default for HomingConfig {
    fn default() -> Self {
        // 1 MHz ticks: 2 kHz fast, 1 kHz retract, 250 Hz slow
        Self {
            home_dir: Direction::Reverse,
            fast: HomingMove {
                steps: 40_000,
                step_ticks: 500,
            },
            retract: HomingMove {
                steps: 400,
                step_ticks: 1_000,
            },
            slow: HomingMove {
                steps: 800,
                step_ticks: 4_000,
            },
        }
    }
}

impl HomingConfig {
    /// Check all three phases
    pub fn validate(&self) -> Result<(), ConfigError> {
        for phase in [&self.fast, &self.retract, &self.slow] {
            if let Err(e) = phase.validate() {
                warn!("config: invalid homing phase {}", e);
                return Err(e);
            }
        }
        Ok(())
    }
}
