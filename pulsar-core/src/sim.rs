//! Host-side simulation
//!
//! A simulated counter, compare channel and pin driver, enough to run an
//! [`AxisStepper`] on the host and observe every pulse it emits. Built
//! for unit tests and, with the `sim` feature, for downstream crates.

use core::cell::Cell;

use heapless::Vec;
use pulsar_hal::time::time_ge;
use pulsar_hal::{CompareUnit, Ticks};

use crate::consumer::ConsumerList;
use crate::stepper::AxisStepper;
use crate::traits::{Direction, Endstop, StepDriver};

/// Most pulses a [`RecordingDriver`] keeps
pub const PULSE_CAPACITY: usize = 2048;

/// Free-running counter under test control
#[derive(Debug, Default)]
pub struct SimClock {
    now: Cell<Ticks>,
}

impl SimClock {
    /// Counter starting at `now`
    pub fn new(now: Ticks) -> Self {
        Self {
            now: Cell::new(now),
        }
    }

    /// Current count
    pub fn now(&self) -> Ticks {
        self.now.get()
    }

    /// Jump to `now`
    pub fn set(&self, now: Ticks) {
        self.now.set(now);
    }

    /// Move forward by `ticks`, wrapping
    pub fn advance(&self, ticks: u32) {
        self.now.set(self.now.get().wrapping_add(ticks));
    }
}

/// Compare channel on a [`SimClock`]
///
/// Like a one-shot hardware alarm, a match clears the pending compare;
/// the handler has to re-arm. An optional latency advances the clock on
/// every compare write to model a delayed register access.
#[derive(Debug)]
pub struct SimCompare<'a> {
    clock: &'a SimClock,
    compare: Option<Ticks>,
    latency: u32,
    arm_count: u32,
}

impl<'a> SimCompare<'a> {
    /// Disarmed channel
    pub fn new(clock: &'a SimClock) -> Self {
        Self {
            clock,
            compare: None,
            latency: 0,
            arm_count: 0,
        }
    }

    /// Let every compare write take `ticks`
    pub fn with_latency(mut self, ticks: u32) -> Self {
        self.latency = ticks;
        self
    }

    /// Pending compare value
    pub fn compare(&self) -> Option<Ticks> {
        self.compare
    }

    /// Number of compare writes so far
    pub fn arm_count(&self) -> u32 {
        self.arm_count
    }

    /// Counter this channel runs on
    pub fn clock(&self) -> &'a SimClock {
        self.clock
    }
}

impl CompareUnit for SimCompare<'_> {
    fn now(&self) -> Ticks {
        self.clock.now()
    }

    fn arm_at(&mut self, at: Ticks) {
        self.clock.advance(self.latency);
        self.compare = Some(at);
        self.arm_count += 1;
    }

    fn disarm(&mut self) {
        self.compare = None;
    }

    fn is_armed(&self) -> bool {
        self.compare.is_some()
    }

    fn acknowledge(&mut self) {
        self.compare = None;
    }
}

/// One emitted step pulse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pulse {
    /// Counter value at the rising edge
    pub at: Ticks,
    /// Direction output at the rising edge
    pub dir: Direction,
}

/// Pin driver that timestamps every pulse
#[derive(Debug)]
pub struct RecordingDriver<'a> {
    clock: &'a SimClock,
    pulses: Vec<Pulse, PULSE_CAPACITY>,
    dropped: usize,
    dir: Direction,
    step_high: bool,
    enabled: bool,
    shared_position: Option<&'a Cell<i64>>,
}

impl<'a> RecordingDriver<'a> {
    /// Driver with no pulses recorded
    pub fn new(clock: &'a SimClock) -> Self {
        Self {
            clock,
            pulses: Vec::new(),
            dropped: 0,
            dir: Direction::Forward,
            step_high: false,
            enabled: false,
            shared_position: None,
        }
    }

    /// Also count every pulse into `position`, forward positive
    pub fn with_shared_position(mut self, position: &'a Cell<i64>) -> Self {
        self.shared_position = Some(position);
        self
    }

    /// Recorded pulses in emission order
    pub fn pulses(&self) -> &[Pulse] {
        &self.pulses
    }

    /// Pulses that did not fit the record
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Forget recorded pulses
    pub fn clear(&mut self) {
        self.pulses.clear();
        self.dropped = 0;
    }

    /// Current direction output
    pub fn direction(&self) -> Direction {
        self.dir
    }

    /// Current enable output
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Net displacement in steps, forward positive
    pub fn position(&self) -> i64 {
        self.pulses
            .iter()
            .map(|p| match p.dir {
                Direction::Forward => 1,
                Direction::Reverse => -1,
            })
            .sum()
    }
}

impl StepDriver for RecordingDriver<'_> {
    fn set_direction(&mut self, dir: Direction) {
        self.dir = dir;
    }

    fn step_on(&mut self) {
        debug_assert!(!self.step_high);
        self.step_high = true;
        let pulse = Pulse {
            at: self.clock.now(),
            dir: self.dir,
        };
        if self.pulses.push(pulse).is_err() {
            self.dropped += 1;
        }
        if let Some(position) = self.shared_position {
            let step = match self.dir {
                Direction::Forward => 1,
                Direction::Reverse => -1,
            };
            position.set(position.get() + step);
        }
    }

    fn step_off(&mut self) {
        self.step_high = false;
    }

    fn enable(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
}

/// Switch whose state comes from a closure, typically one reading the
/// position shared by a [`RecordingDriver`]
pub struct SimEndstop<F> {
    probe: F,
}

impl<F: FnMut() -> bool> SimEndstop<F> {
    /// Endstop reporting `probe()`
    pub fn new(probe: F) -> Self {
        Self { probe }
    }
}

impl<F: FnMut() -> bool> Endstop for SimEndstop<F> {
    fn is_triggered(&mut self) -> bool {
        (self.probe)()
    }
}

/// Fire compare matches until the axis disarms or `max_events` is reached
///
/// The clock jumps to each pending compare value (never backward) before
/// the handler runs. Returns the number of matches delivered.
pub fn run<D, C>(axis: &mut AxisStepper<SimCompare<'_>, D, C>, max_events: usize) -> usize
where
    D: StepDriver,
    C: ConsumerList,
{
    let mut events = 0;
    while events < max_events {
        let Some(at) = axis.timer().unit().compare() else {
            break;
        };
        let clock = axis.timer().unit().clock();
        if time_ge(at, clock.now()) {
            clock.set(at);
        }
        axis.irq_handler();
        events += 1;
    }
    events
}
