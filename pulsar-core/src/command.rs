//! Step commands
//!
//! A [`Command`] describes one segment of `x` physical steps spread over
//! `t` timer ticks under constant acceleration. With normalized time
//! `tau` in `[0, 1]` the position is
//!
//! ```text
//! p(tau) = (x - a) * tau + a * tau^2        -x <= a <= x
//! ```
//!
//! so the segment starts at velocity `x - a` and ends at `x + a` (in steps
//! per segment). Solving `p(tau) = k` gives
//!
//! ```text
//! tau_k = k / q,   q = ((x - a) + sqrt(D_k)) / 2,   D_k = (x - a)^2 + 4 a k
//! ```
//!
//! `D_k` is maintained incrementally by adding `4a` per step. Segments
//! with `a < 0` are evaluated as the mirror image of an accelerating
//! segment walked backward from the end, which keeps `v0 >= 0` and the
//! same `D_k` sequence.

use crate::fixed::{SBounded, UBounded};
use crate::traits::Direction;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Width of a step count
pub const STEP_BITS: u32 = 11;

/// Width of a segment duration in ticks
pub const TIME_BITS: u32 = 22;

/// Most steps a single command can carry
pub const MAX_STEPS: u32 = (1 << STEP_BITS) - 1;

/// Longest single command in ticks
pub const MAX_TICKS: u32 = (1 << TIME_BITS) - 1;

/// Fractional bits of the normalized time `tau`
pub const FRAC_BITS: u32 = 16;

/// Pre-scale applied to the discriminant before the square root
pub const SQRT_SHIFT: u32 = 8;

/// Width of the packed direction / step count word
pub const DIR_X_BITS: u32 = STEP_BITS + 2;

/// Width of the running discriminant, `(2x)^2`
pub const DISC_BITS: u32 = 2 * (STEP_BITS + 1);

/// Width of the per-step discriminant increment, `4a`
pub const ACCEL_BITS: u32 = STEP_BITS + 2;

const DIR_BIT: i64 = 1 << STEP_BITS;
const ACCEL_BIT: i64 = 1 << (STEP_BITS + 1);

/// Step count of a command
pub type Steps = UBounded<STEP_BITS>;

/// Duration of a command in ticks
pub type Duration = UBounded<TIME_BITS>;

/// Signed acceleration of a command, `-steps ..= steps`
pub type Accel = SBounded<STEP_BITS>;

/// Validation failures for [`Command::try_generate`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandError {
    /// More steps than one command can carry
    StepsOutOfRange,
    /// Duration is zero or longer than one command can carry
    DurationOutOfRange,
    /// Acceleration magnitude exceeds the step count
    AccelOutOfRange,
}

/// One constant-acceleration segment for one axis
///
/// Built once by the producer; the scheduler only adds and shifts the
/// pre-reduced fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Command {
    /// Step count, direction bit and acceleration-sign bit
    pub(crate) dir_x: UBounded<DIR_X_BITS>,
    /// Running radicand, `(x - a)^2` before the first step
    pub(crate) discriminant: SBounded<DISC_BITS>,
    /// Discriminant increment per step, `4a`
    pub(crate) a_mul: SBounded<ACCEL_BITS>,
    /// Segment duration in ticks
    pub(crate) t_mul: Duration,
}

impl Command {
    /// Build a command from already-bounded parameters
    ///
    /// `accel` must satisfy `-steps <= accel <= steps`.
    pub fn generate(steps: Steps, direction: Direction, ticks: Duration, accel: Accel) -> Self {
        debug_assert!(accel.abs().get() <= steps.get());

        let mut dir_x = steps.get();
        if direction == Direction::Forward {
            dir_x |= DIR_BIT;
        }
        if !accel.is_negative() {
            dir_x |= ACCEL_BIT;
        }

        let v0 = steps.to_signed().sub::<STEP_BITS, { STEP_BITS + 1 }>(accel);
        Command {
            dir_x: UBounded::new(dir_x),
            discriminant: v0.mul::<{ STEP_BITS + 1 }, DISC_BITS>(v0),
            a_mul: accel.shl::<2, ACCEL_BITS>(),
            t_mul: ticks,
        }
    }

    /// Build a command from raw integers, validating every range
    pub fn try_generate(
        steps: u32,
        direction: Direction,
        ticks: u32,
        accel: i32,
    ) -> Result<Self, CommandError> {
        if steps > MAX_STEPS {
            return Err(CommandError::StepsOutOfRange);
        }
        if ticks == 0 || ticks > MAX_TICKS {
            return Err(CommandError::DurationOutOfRange);
        }
        if accel.unsigned_abs() > steps {
            return Err(CommandError::AccelOutOfRange);
        }
        Ok(Self::generate(
            Steps::new(i64::from(steps)),
            direction,
            Duration::new(i64::from(ticks)),
            Accel::new(i64::from(accel)),
        ))
    }

    /// A pure delay of `ticks` with no steps
    pub fn empty(ticks: Duration) -> Self {
        Self::generate(Steps::ZERO, Direction::Forward, ticks, Accel::ZERO)
    }

    /// Direction output for this segment
    pub fn direction(&self) -> Direction {
        if self.dir_x.get() & DIR_BIT != 0 {
            Direction::Forward
        } else {
            Direction::Reverse
        }
    }

    /// True if `a >= 0`, i.e. pulses are computed forward from the start
    pub fn is_accelerating(&self) -> bool {
        self.dir_x.get() & ACCEL_BIT != 0
    }

    /// Number of physical steps
    pub fn step_count(&self) -> Steps {
        Steps::new(self.dir_x.get() & i64::from(MAX_STEPS))
    }

    /// Segment duration in ticks
    pub fn duration(&self) -> Duration {
        self.t_mul
    }

    /// Current value of the running discriminant
    pub fn discriminant(&self) -> SBounded<DISC_BITS> {
        self.discriminant
    }
}

impl Default for Command {
    fn default() -> Self {
        Self::empty(Duration::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_packs_fields() {
        let cmd = Command::try_generate(100, Direction::Forward, 50_000, 30).unwrap();
        assert_eq!(cmd.step_count().get(), 100);
        assert_eq!(cmd.direction(), Direction::Forward);
        assert!(cmd.is_accelerating());
        assert_eq!(cmd.duration().get(), 50_000);
        assert_eq!(cmd.discriminant().get(), 70 * 70);
        assert_eq!(cmd.a_mul.get(), 120);
    }

    #[test]
    fn test_decelerating_command() {
        let cmd = Command::try_generate(100, Direction::Reverse, 50_000, -30).unwrap();
        assert_eq!(cmd.direction(), Direction::Reverse);
        assert!(!cmd.is_accelerating());
        assert_eq!(cmd.discriminant().get(), 130 * 130);
        assert_eq!(cmd.a_mul.get(), -120);
    }

    #[test]
    fn test_extreme_discriminant_fits() {
        let cmd = Command::try_generate(MAX_STEPS, Direction::Forward, MAX_TICKS, -(MAX_STEPS as i32))
            .unwrap();
        assert_eq!(cmd.discriminant().get(), 4 * i64::from(MAX_STEPS) * i64::from(MAX_STEPS));
    }

    #[test]
    fn test_empty_command() {
        let cmd = Command::empty(Duration::new(1234));
        assert_eq!(cmd.step_count().get(), 0);
        assert_eq!(cmd.duration().get(), 1234);
        assert!(cmd.is_accelerating());
    }

    #[test]
    fn test_try_generate_rejects_bad_input() {
        assert_eq!(
            Command::try_generate(MAX_STEPS + 1, Direction::Forward, 100, 0),
            Err(CommandError::StepsOutOfRange)
        );
        assert_eq!(
            Command::try_generate(10, Direction::Forward, 0, 0),
            Err(CommandError::DurationOutOfRange)
        );
        assert_eq!(
            Command::try_generate(10, Direction::Forward, MAX_TICKS + 1, 0),
            Err(CommandError::DurationOutOfRange)
        );
        assert_eq!(
            Command::try_generate(10, Direction::Forward, 100, -11),
            Err(CommandError::AccelOutOfRange)
        );
        assert!(Command::try_generate(10, Direction::Forward, 100, -10).is_ok());
    }
}
