//! Timer and axis configuration

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::command::MAX_TICKS;

/// Step timer configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TimerConfig {
    /// Counter frequency in Hz
    pub tick_hz: u32,
    /// Lower bound on the compare clearance, in ticks
    pub min_clearance_ticks: u32,
    /// Clearance to cover interrupt latency, in microseconds
    pub extra_clearance_us: u32,
}

impl Default for TimerConfig {
    fn default() -> Self {
        // RP2040 TIMER runs at 1 MHz
        Self {
            tick_hz: 1_000_000,
            min_clearance_ticks: 2,
            extra_clearance_us: 3,
        }
    }
}

impl TimerConfig {
    /// Convert microseconds to ticks, rounding down
    pub fn ticks_from_us(&self, us: u32) -> u32 {
        let ticks = u64::from(us) * u64::from(self.tick_hz) / 1_000_000;
        u32::try_from(ticks).unwrap_or(u32::MAX)
    }

    /// Minimum lead of a programmed compare over the counter
    pub fn clearance(&self) -> u32 {
        self.min_clearance_ticks
            .max(self.ticks_from_us(self.extra_clearance_us))
    }

    /// Check the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_hz == 0 {
            warn!("config: zero tick rate");
            return Err(ConfigError::ZeroTickRate);
        }
        if self.clearance() >= MAX_TICKS {
            warn!("config: clearance {} too large", self.clearance());
            return Err(ConfigError::ClearanceTooLarge);
        }
        Ok(())
    }
}

/// Pin polarity and timing for one axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AxisConfig {
    /// Drive the direction pin low for forward travel
    pub invert_dir: bool,
    /// The driver's enable input is active-low
    pub enable_active_low: bool,
    /// Step timer
    pub timer: TimerConfig,
}

impl AxisConfig {
    /// Check the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.timer.validate()
    }
}
