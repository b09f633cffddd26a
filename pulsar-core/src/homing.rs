//! Endstop homing
//!
//! [`Homer`] is a consumer that walks an axis through three phases:
//!
//! 1. fast approach toward the switch, aborted by the prestep guard the
//!    moment the switch reads closed
//! 2. retract away from the switch, unguarded, after which the switch must
//!    read open again
//! 3. slow approach, aborted by the guard like the fast one
//!
//! Each phase is a constant-speed move split into as many commands as its
//! length requires. Phase transitions happen in background context: after
//! the axis stops, [`Homer::on_axis_stopped`] says what to run next.

use crate::command::{Command, Duration, Steps, MAX_STEPS, MAX_TICKS};
use crate::config::{HomingConfig, HomingMove};
use crate::consumer::{Consumer, Flow, Prestep};
use crate::fixed::SBounded;
use crate::traits::{Direction, Endstop};

/// Homing failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HomingError {
    /// An approach used up its travel without closing the switch
    EndstopNotTriggered,
    /// The switch stayed closed after retracting
    EndstopTriggeredAfterRetract,
    /// `on_axis_stopped` was called with no homing in progress
    NotStarted,
}

/// What background code should do next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HomingStep {
    /// Start the axis with `command`, with the prestep guard set to
    /// `watch_endstop`
    Move {
        /// First command of the phase
        command: Command,
        /// Whether the prestep guard must be enabled
        watch_endstop: bool,
    },
    /// Homing is over
    Finished(Result<(), HomingError>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum Phase {
    Idle,
    Fast,
    Retract,
    Slow,
}

/// Homing consumer for one axis
pub struct Homer<E> {
    endstop: E,
    config: HomingConfig,
    phase: Phase,
    dir: Direction,
    step_ticks: u32,
    remaining: u32,
    triggered: bool,
    homed: bool,
}

impl<E: Endstop> Homer<E> {
    /// Homer for an already validated configuration
    pub fn new(endstop: E, config: HomingConfig) -> Self {
        debug_assert!(config.validate().is_ok());
        Self {
            endstop,
            config,
            phase: Phase::Idle,
            dir: config.home_dir,
            step_ticks: 0,
            remaining: 0,
            triggered: false,
            homed: false,
        }
    }

    /// Start the fast approach
    pub fn begin(&mut self) -> HomingStep {
        info!("homing: fast approach");
        self.homed = false;
        self.enter(Phase::Fast)
    }

    /// Advance after the axis stopped on its own
    pub fn on_axis_stopped(&mut self) -> HomingStep {
        match self.phase {
            Phase::Idle => HomingStep::Finished(Err(HomingError::NotStarted)),
            Phase::Fast => {
                if !self.triggered {
                    return self.fail(HomingError::EndstopNotTriggered);
                }
                info!("homing: retract");
                self.enter(Phase::Retract)
            }
            Phase::Retract => {
                if self.endstop.is_triggered() {
                    return self.fail(HomingError::EndstopTriggeredAfterRetract);
                }
                info!("homing: slow approach");
                self.enter(Phase::Slow)
            }
            Phase::Slow => {
                if !self.triggered {
                    return self.fail(HomingError::EndstopNotTriggered);
                }
                info!("homing: done");
                self.phase = Phase::Idle;
                self.homed = true;
                HomingStep::Finished(Ok(()))
            }
        }
    }

    /// Abandon homing, e.g. after the axis was stopped externally
    pub fn cancel(&mut self) {
        self.phase = Phase::Idle;
        self.remaining = 0;
    }

    /// True while a phase is in progress
    pub fn is_active(&self) -> bool {
        self.phase != Phase::Idle
    }

    /// True after the last homing completed successfully
    pub fn is_homed(&self) -> bool {
        self.homed
    }

    /// Homing configuration
    pub fn config(&self) -> &HomingConfig {
        &self.config
    }

    /// The switch
    pub fn endstop_mut(&mut self) -> &mut E {
        &mut self.endstop
    }

    fn fail(&mut self, err: HomingError) -> HomingStep {
        warn!("homing: failed in {}: {}", self.phase, err);
        self.phase = Phase::Idle;
        self.homed = false;
        HomingStep::Finished(Err(err))
    }

    fn enter(&mut self, phase: Phase) -> HomingStep {
        let (mv, dir): (HomingMove, Direction) = match phase {
            Phase::Fast | Phase::Idle => (self.config.fast, self.config.home_dir),
            Phase::Retract => (self.config.retract, self.config.home_dir.opposite()),
            Phase::Slow => (self.config.slow, self.config.home_dir),
        };
        self.phase = phase;
        self.dir = dir;
        self.step_ticks = mv.step_ticks;
        self.remaining = mv.steps;
        self.triggered = false;

        match self.next_chunk() {
            Some(command) => HomingStep::Move {
                command,
                watch_endstop: phase != Phase::Retract,
            },
            None => self.fail(HomingError::EndstopNotTriggered),
        }
    }

    /// Next constant-speed piece of the current phase
    fn next_chunk(&mut self) -> Option<Command> {
        if self.remaining == 0 || self.step_ticks == 0 || self.step_ticks > MAX_TICKS {
            return None;
        }
        let n = self.remaining.min(MAX_STEPS).min(MAX_TICKS / self.step_ticks);
        self.remaining -= n;
        Some(Command::generate(
            Steps::new(i64::from(n)),
            self.dir,
            Duration::new(i64::from(n * self.step_ticks)),
            SBounded::ZERO,
        ))
    }
}

impl<E: Endstop> Consumer for Homer<E> {
    fn next_command(&mut self, cmd: &mut Command) -> Flow {
        match self.next_chunk() {
            Some(next) => {
                *cmd = next;
                Flow::Continue
            }
            None => Flow::Stop,
        }
    }

    fn prestep(&mut self) -> Prestep {
        let guarded = matches!(self.phase, Phase::Fast | Phase::Slow);
        if guarded && self.endstop.is_triggered() {
            self.triggered = true;
            self.remaining = 0;
            return Prestep::Abort;
        }
        Prestep::Proceed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consumer::ConsumerId;
    use crate::sim::{self, RecordingDriver, SimClock, SimCompare, SimEndstop};
    use crate::stepper::AxisStepper;
    use crate::timer::InterruptTimer;
    use core::cell::Cell;

    fn config() -> HomingConfig {
        HomingConfig {
            home_dir: Direction::Reverse,
            fast: HomingMove {
                steps: 5000,
                step_ticks: 100,
            },
            retract: HomingMove {
                steps: 20,
                step_ticks: 200,
            },
            slow: HomingMove {
                steps: 60,
                step_ticks: 1000,
            },
        }
    }

    /// Run homing to completion; returns the outcome
    fn home<F: FnMut() -> bool>(
        axis: &mut AxisStepper<SimCompare<'_>, RecordingDriver<'_>, (Homer<SimEndstop<F>>,)>,
    ) -> Result<(), HomingError> {
        let mut step = axis.consumers_mut().0.begin();
        loop {
            match step {
                HomingStep::Move {
                    command,
                    watch_endstop,
                } => {
                    axis.set_prestep_enabled(watch_endstop);
                    let now = axis.now();
                    axis.start(now, command, ConsumerId(0));
                    sim::run(axis, 100_000);
                    assert!(!axis.is_running());
                    step = axis.consumers_mut().0.on_axis_stopped();
                }
                HomingStep::Finished(result) => return result,
            }
        }
    }

    #[test]
    fn test_three_phase_homing() {
        let clock = SimClock::new(0);
        let position = Cell::new(1234i64);
        // switch closes at or below position 0
        let endstop = SimEndstop::new(|| position.get() <= 0);
        let mut axis = AxisStepper::new(
            InterruptTimer::new(SimCompare::new(&clock), 2),
            RecordingDriver::new(&clock).with_shared_position(&position),
            (Homer::new(endstop, config()),),
        );

        assert_eq!(home(&mut axis), Ok(()));
        assert!(axis.consumers().0.is_homed());
        assert!(!axis.consumers().0.is_active());
        // the slow approach stops on the first step that sees the switch
        assert_eq!(position.get(), 0);

        // fast phase spanned several commands
        let fast_pulses = axis
            .driver()
            .pulses()
            .iter()
            .take_while(|p| p.dir == Direction::Reverse)
            .count();
        assert_eq!(fast_pulses, 1234);
    }

    #[test]
    fn test_endstop_never_triggers() {
        let clock = SimClock::new(0);
        let position = Cell::new(1_000_000i64);
        let endstop = SimEndstop::new(|| position.get() <= 0);
        let mut axis = AxisStepper::new(
            InterruptTimer::new(SimCompare::new(&clock), 2),
            RecordingDriver::new(&clock).with_shared_position(&position),
            (Homer::new(endstop, config()),),
        );

        assert_eq!(home(&mut axis), Err(HomingError::EndstopNotTriggered));
        assert_eq!(position.get(), 1_000_000 - 5000);
        assert!(!axis.consumers().0.is_homed());
    }

    #[test]
    fn test_switch_stuck_closed() {
        let clock = SimClock::new(0);
        let endstop = SimEndstop::new(|| true);
        let mut axis = AxisStepper::new(
            InterruptTimer::new(SimCompare::new(&clock), 2),
            RecordingDriver::new(&clock),
            (Homer::new(endstop, config()),),
        );

        assert_eq!(home(&mut axis), Err(HomingError::EndstopTriggeredAfterRetract));
        // only the retract moved the axis
        assert_eq!(axis.driver().pulses().len(), 20);
        assert!(axis
            .driver()
            .pulses()
            .iter()
            .all(|p| p.dir == Direction::Forward));
    }

    #[test]
    fn test_not_started() {
        let mut homer = Homer::new(SimEndstop::new(|| false), config());
        assert_eq!(
            homer.on_axis_stopped(),
            HomingStep::Finished(Err(HomingError::NotStarted))
        );
    }

    #[test]
    fn test_chunks_respect_command_limits() {
        let mut homer = Homer::new(SimEndstop::new(|| false), config());
        let HomingStep::Move { command, watch_endstop } = homer.begin() else {
            panic!("expected a move");
        };
        assert!(watch_endstop);
        assert_eq!(command.step_count().get(), i64::from(MAX_STEPS));
        assert_eq!(command.duration().get(), i64::from(MAX_STEPS * 100));
        assert_eq!(command.direction(), Direction::Reverse);

        let mut cmd = command;
        let mut total = command.step_count().get();
        while homer.next_command(&mut cmd) == Flow::Continue {
            total += cmd.step_count().get();
        }
        assert_eq!(total, 5000);
    }
}
