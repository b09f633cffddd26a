//! Per-axis step pulse scheduler
//!
//! [`AxisStepper`] owns one compare timer, one step/dir driver and the
//! consumers that feed it commands. Each compare match emits at most one
//! pulse and computes when the next one is due from the closed form
//! documented in [`crate::command`]. The cost is one square root and one
//! division per step, with no loops over time.
//!
//! Pulses of a command with `n` steps land where the profile reaches
//! positions `1..=n`; the last one is exactly on the segment end. After
//! the last pulse the timer is re-armed at the segment end, so the next
//! match fetches the following command from the active consumer.

use pulsar_hal::{CompareUnit, Ticks};

use crate::command::{Command, Duration, Steps, FRAC_BITS, SQRT_SHIFT, STEP_BITS, TIME_BITS};
use crate::consumer::{ConsumerId, ConsumerList, Flow, Prestep};
use crate::fixed::UBounded;
use crate::timer::InterruptTimer;
use crate::traits::StepDriver;

/// Width of the velocity intercept `v0`
const V0_BITS: u32 = STEP_BITS + 1;

/// Width of `round(sqrt(D << SQRT_SHIFT))`
const ROOT_BITS: u32 = (2 * (STEP_BITS + 1) + SQRT_SHIFT + 2) / 2;

/// Width of `v0` aligned with the scaled root
const V0S_BITS: u32 = V0_BITS + SQRT_SHIFT / 2;

/// Width of `2q` in root units
const Q_BITS: u32 = ROOT_BITS + 1;

/// Numerator shift: the `FRAC_BITS` of `tau`, the halving in `q`, and
/// the root scale
const TAU_SHIFT: u32 = FRAC_BITS + 1 + SQRT_SHIFT / 2;

/// `tau` never exceeds `1 << FRAC_BITS`
const TAU_BITS: u32 = FRAC_BITS + 1;

/// Per-run scheduler state, kept apart from the timer so the interrupt
/// handler can borrow both
#[derive(Debug, Default)]
struct RunState {
    running: bool,
    current: Command,
    consumer: ConsumerId,
    seg_start: Ticks,
    steps: Steps,
    /// Forward position of the next pulse, or its distance from the end
    /// while decelerating
    pos: Steps,
    v0: UBounded<V0_BITS>,
    not_end: bool,
    not_decel: bool,
    prestep_enabled: bool,
}

impl RunState {
    fn seg_end(&self) -> Ticks {
        self.seg_start.wrapping_add(self.current.duration().get() as u32)
    }

    /// Prepare `current` and return the time of its first event
    fn load<D: StepDriver>(&mut self, driver: &mut D) -> Ticks {
        driver.set_direction(self.current.direction());
        self.steps = self.current.step_count();
        self.not_decel = self.current.is_accelerating();

        if self.steps.get() == 0 {
            self.not_end = false;
            return self.seg_end();
        }

        self.not_end = true;
        let x = self.steps.to_signed();
        let a = self.current.a_mul.shr::<2, STEP_BITS>();
        let v0 = if self.not_decel {
            self.pos = Steps::new(1);
            x.sub::<STEP_BITS, V0_BITS>(a)
        } else {
            self.pos = Steps::new(self.steps.get() - 1);
            x.add::<STEP_BITS, V0_BITS>(a)
        };
        self.v0 = v0.to_unsigned();
        self.advance_discriminant();
        self.pulse_time()
    }

    fn advance_discriminant(&mut self) {
        let d = &mut self.current.discriminant;
        *d = d.add::<{ STEP_BITS + 2 }, { 2 * (STEP_BITS + 1) + 1 }>(self.current.a_mul).narrow();
        debug_assert!(!d.is_negative());
    }

    fn is_last_pulse(&self) -> bool {
        if self.not_decel {
            self.pos == self.steps
        } else {
            self.pos.get() == 0
        }
    }

    fn advance(&mut self) {
        let pos = if self.not_decel {
            self.pos.get() + 1
        } else {
            self.pos.get() - 1
        };
        self.pos = Steps::new(pos);
        self.advance_discriminant();
    }

    /// Offset of the next pulse from the segment start (accelerating) or
    /// end (decelerating)
    fn pulse_offset(&self) -> Duration {
        if self.pos.get() == 0 {
            return Duration::ZERO;
        }
        let disc = self.current.discriminant.to_unsigned();
        let root = disc
            .shl::<SQRT_SHIFT, { 2 * (STEP_BITS + 1) + SQRT_SHIFT }>()
            .isqrt::<ROOT_BITS>();
        let q2 = self
            .v0
            .shl::<{ SQRT_SHIFT / 2 }, V0S_BITS>()
            .add::<ROOT_BITS, Q_BITS>(root);
        let tau = self
            .pos
            .shl::<TAU_SHIFT, { STEP_BITS + TAU_SHIFT }>()
            .div::<Q_BITS, TAU_BITS>(q2);
        self.current
            .t_mul
            .mul::<TAU_BITS, { TIME_BITS + TAU_BITS }>(tau)
            .shr::<FRAC_BITS, { TIME_BITS + 1 }>()
            .narrow()
    }

    fn pulse_time(&self) -> Ticks {
        let offset = self.pulse_offset().get() as u32;
        if self.not_decel {
            self.seg_start.wrapping_add(offset)
        } else {
            self.seg_end().wrapping_sub(offset)
        }
    }

    /// One compare match; returns false to disarm
    fn on_match<U, D, C>(
        &mut self,
        timer: &mut InterruptTimer<U>,
        driver: &mut D,
        consumers: &mut C,
    ) -> bool
    where
        U: CompareUnit,
        D: StepDriver,
        C: ConsumerList,
    {
        if !self.not_end {
            self.seg_start = self.seg_end();
            if consumers.next_command(self.consumer, &mut self.current) == Flow::Stop {
                debug!("axis: consumer {} ended run", self.consumer.0);
                self.running = false;
                return false;
            }
            let first = self.load(driver);
            timer.set_next(first);
            return true;
        }

        if self.prestep_enabled && consumers.prestep(self.consumer) == Prestep::Abort {
            debug!("axis: prestep abort");
            self.running = false;
            return false;
        }

        driver.step_on();
        driver.step_off();

        if self.is_last_pulse() {
            self.not_end = false;
            timer.set_next(self.seg_end());
        } else {
            self.advance();
            timer.set_next(self.pulse_time());
        }
        true
    }
}

/// Step scheduler for one axis
pub struct AxisStepper<U, D, C> {
    timer: InterruptTimer<U>,
    state: RunState,
    driver: D,
    consumers: C,
}

impl<U, D, C> AxisStepper<U, D, C>
where
    U: CompareUnit,
    D: StepDriver,
    C: ConsumerList,
{
    /// Assemble a stopped axis
    pub fn new(timer: InterruptTimer<U>, driver: D, consumers: C) -> Self {
        Self {
            timer,
            state: RunState::default(),
            driver,
            consumers,
        }
    }

    /// Take the axis apart again; it must be stopped
    pub fn release(self) -> (InterruptTimer<U>, D, C) {
        debug_assert!(!self.state.running);
        (self.timer, self.driver, self.consumers)
    }

    /// Begin executing `first` at `start_time` on behalf of `consumer`
    ///
    /// Subsequent commands come from that consumer's
    /// [`next_command`](crate::consumer::Consumer::next_command).
    pub fn start(&mut self, start_time: Ticks, first: Command, consumer: ConsumerId) {
        debug_assert!(!self.state.running);
        debug!("axis: start for consumer {}", consumer.0);

        let state = &mut self.state;
        state.current = first;
        state.consumer = consumer;
        state.seg_start = start_time;
        state.running = true;
        let at = state.load(&mut self.driver);
        self.timer.set_first(at);
    }

    /// Disarm the timer; legal in any state
    pub fn stop(&mut self) {
        if self.state.running {
            debug!("axis: stop");
        }
        self.timer.unset();
        self.state.running = false;
    }

    /// Timer interrupt entry point
    pub fn irq_handler(&mut self) {
        let Self {
            timer,
            state,
            driver,
            consumers,
        } = self;
        timer.irq_handler(|timer| state.on_match(timer, driver, consumers));
    }

    /// True from `start` until the run ends or `stop`
    pub fn is_running(&self) -> bool {
        self.state.running
    }

    /// Owner of the current or most recent run
    pub fn consumer(&self) -> ConsumerId {
        self.state.consumer
    }

    /// Enable the per-step guard; only while stopped
    pub fn set_prestep_enabled(&mut self, enabled: bool) {
        debug_assert!(!self.state.running);
        self.state.prestep_enabled = enabled;
    }

    /// Whether the per-step guard is enabled
    pub fn prestep_enabled(&self) -> bool {
        self.state.prestep_enabled
    }

    /// Read the axis' free-running counter
    pub fn now(&self) -> Ticks {
        self.timer.now()
    }

    /// Logical time at which the segment in progress began
    pub fn segment_start(&self) -> Ticks {
        self.state.seg_start
    }

    /// Registered consumers
    pub fn consumers(&self) -> &C {
        &self.consumers
    }

    /// Registered consumers, mutably
    pub fn consumers_mut(&mut self) -> &mut C {
        &mut self.consumers
    }

    /// Pin driver
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Pin driver, mutably
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Timer
    pub fn timer(&self) -> &InterruptTimer<U> {
        &self.timer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{Accel, MAX_STEPS};
    use crate::consumer::Consumer;
    use crate::sim::{self, RecordingDriver, SimClock, SimCompare};
    use crate::traits::Direction;
    use proptest::prelude::*;

    const CLEARANCE: u32 = 2;

    /// Hands out queued commands, then stops
    struct Script {
        queue: heapless::Deque<Command, 8>,
        calls: u32,
        abort_on_prestep: Option<u32>,
        presteps: u32,
    }

    impl Script {
        fn new() -> Self {
            Self {
                queue: heapless::Deque::new(),
                calls: 0,
                abort_on_prestep: None,
                presteps: 0,
            }
        }
    }

    impl Consumer for Script {
        fn next_command(&mut self, cmd: &mut Command) -> Flow {
            self.calls += 1;
            match self.queue.pop_front() {
                Some(next) => {
                    *cmd = next;
                    Flow::Continue
                }
                None => Flow::Stop,
            }
        }

        fn prestep(&mut self) -> Prestep {
            self.presteps += 1;
            if Some(self.presteps) == self.abort_on_prestep {
                Prestep::Abort
            } else {
                Prestep::Proceed
            }
        }
    }

    type SimAxis<'a> = AxisStepper<SimCompare<'a>, RecordingDriver<'a>, (Script,)>;

    fn axis(clock: &SimClock) -> SimAxis<'_> {
        AxisStepper::new(
            InterruptTimer::new(SimCompare::new(clock), CLEARANCE),
            RecordingDriver::new(clock),
            (Script::new(),),
        )
    }

    fn cmd(steps: u32, ticks: u32, accel: i32) -> Command {
        Command::try_generate(steps, Direction::Forward, ticks, accel).unwrap()
    }

    /// Pulse offsets from `start` for one command run to completion
    fn pulse_offsets(command: Command, start: Ticks) -> Vec<u32> {
        let clock = SimClock::new(start.wrapping_sub(100));
        let mut axis = axis(&clock);
        axis.start(start, command, ConsumerId(0));
        sim::run(&mut axis, 4 * MAX_STEPS as usize);
        assert!(!axis.is_running());
        axis.driver()
            .pulses()
            .iter()
            .map(|p| p.at.wrapping_sub(start))
            .collect()
    }

    /// Continuous-time reference for the k-th pulse offset
    fn ideal_offset(x: u32, t: u32, a: i32, k: u32) -> f64 {
        let (x, a, k) = (f64::from(x), f64::from(a), f64::from(k));
        let v0 = x - a;
        let tau = 2.0 * k / (v0 + (v0 * v0 + 4.0 * a * k).sqrt());
        tau * f64::from(t)
    }

    /// `q` as the scheduler evaluates it for pulse `k`; decelerating
    /// commands are walked from the far end
    fn ideal_q(x: u32, a: i32, k: u32) -> f64 {
        let (xf, af) = (f64::from(x), f64::from(a));
        let (v0, pos) = if a >= 0 {
            (xf - af, f64::from(k))
        } else {
            (xf + af, f64::from(x - k))
        };
        let q = (v0 + (v0 * v0 + 4.0 * af.abs() * pos).sqrt()) / 2.0;
        q.max(1.0)
    }

    fn tolerance(x: u32, t: u32, k: u32) -> f64 {
        let edge = k.min(x - k).max(1);
        f64::from(t) / (32.0 * f64::from(edge)) + f64::from(t) / 32768.0 + 2.0
    }

    #[test]
    fn test_constant_velocity_four_steps() {
        let t = 40_000;
        let clock = SimClock::new(0);
        let mut axis = axis(&clock);
        axis.start(1000, cmd(4, t, 0), ConsumerId(0));
        assert!(axis.is_running());
        assert_eq!(axis.driver().direction(), Direction::Forward);

        sim::run(&mut axis, 100);

        let at: Vec<u32> = axis.driver().pulses().iter().map(|p| p.at).collect();
        let expected = [1000 + t / 4, 1000 + t / 2, 1000 + 3 * t / 4, 1000 + t];
        assert_eq!(at.len(), 4);
        for (got, want) in at.iter().zip(expected.iter()) {
            assert!(got.abs_diff(*want) <= 1, "pulse at {} expected {}", got, want);
        }
        // after the fourth pulse the consumer was asked for more
        assert_eq!(axis.consumers().0.calls, 1);
        assert!(!axis.is_running());
        assert!(!axis.timer().is_armed());
    }

    #[test]
    fn test_zero_step_segment_is_pure_delay() {
        let clock = SimClock::new(0);
        let mut axis = axis(&clock);
        axis.start(500, Command::empty(Duration::new(7000)), ConsumerId(0));
        assert_eq!(axis.timer().unit().compare(), Some(7500));
        assert_eq!(axis.timer().unit().arm_count(), 1);

        let events = sim::run(&mut axis, 100);
        assert_eq!(events, 1);
        assert!(axis.driver().pulses().is_empty());
        assert_eq!(axis.consumers().0.calls, 1);
        assert!(!axis.is_running());
    }

    #[test]
    fn test_prestep_abort_on_second_step() {
        let clock = SimClock::new(0);
        let mut axis = axis(&clock);
        axis.consumers_mut().0.abort_on_prestep = Some(2);
        axis.set_prestep_enabled(true);
        axis.start(0, cmd(4, 10_000, 0), ConsumerId(0));

        sim::run(&mut axis, 100);

        assert_eq!(axis.driver().pulses().len(), 1);
        assert!(!axis.is_running());
        assert!(!axis.timer().is_armed());
        assert_eq!(axis.consumers().0.calls, 0);
    }

    #[test]
    fn test_chained_commands_are_contiguous() {
        let clock = SimClock::new(0);
        let mut axis = axis(&clock);
        {
            let script = &mut axis.consumers_mut().0;
            script.queue.push_back(Command::empty(Duration::new(3000))).unwrap();
            script
                .queue
                .push_back(Command::try_generate(2, Direction::Reverse, 2000, -2).unwrap())
                .unwrap();
        }
        axis.start(0, cmd(10, 10_000, 10), ConsumerId(0));
        sim::run(&mut axis, 100);

        let pulses = axis.driver().pulses();
        assert_eq!(pulses.len(), 12);
        assert_eq!(pulses[9].at, 10_000);
        assert_eq!(pulses[9].dir, Direction::Forward);
        assert_eq!(pulses[11].at, 15_000);
        assert_eq!(pulses[11].dir, Direction::Reverse);
        assert!(pulses[10].at > 13_000 && pulses[10].at < 15_000);
        assert_eq!(axis.consumers().0.calls, 3);
        assert_eq!(axis.segment_start(), 15_000);
    }

    #[test]
    fn test_late_start_is_rebased_not_missed() {
        let clock = SimClock::new(50_000);
        let mut axis = axis(&clock);
        // first pulse is already in the past
        axis.start(0, cmd(4, 40_000, 0), ConsumerId(0));
        assert_eq!(axis.timer().unit().compare(), Some(50_000 + CLEARANCE));

        sim::run(&mut axis, 100);
        assert_eq!(axis.driver().pulses().len(), 4);
        let first = axis.driver().pulses()[0].at;
        assert_eq!(first, 50_000 + CLEARANCE);
    }

    #[test]
    fn test_stop_disarms() {
        let clock = SimClock::new(0);
        let mut axis = axis(&clock);
        axis.start(0, cmd(100, 100_000, 0), ConsumerId(0));
        sim::run(&mut axis, 10);
        axis.stop();
        assert!(!axis.is_running());
        assert!(!axis.timer().is_armed());
        assert_eq!(sim::run(&mut axis, 10), 0);
        let (timer, _, _) = axis.release();
        assert!(!timer.unit().is_armed());
    }

    #[test]
    fn test_full_range_command() {
        let offsets = pulse_offsets(cmd(MAX_STEPS, MAX_TICKS_FOR_TEST, MAX_STEPS as i32), 77);
        assert_eq!(offsets.len(), MAX_STEPS as usize);
        assert_eq!(*offsets.last().unwrap(), MAX_TICKS_FOR_TEST);
    }

    const MAX_TICKS_FOR_TEST: u32 = crate::command::MAX_TICKS;

    #[test]
    fn test_matches_closed_form() {
        for &(x, t, a) in &[(100u32, 200_000u32, 0i32), (100, 200_000, 60), (100, 200_000, -60), (37, 1_000_000, 37), (512, 4_000_000, -512)] {
            let offsets = pulse_offsets(cmd(x, t, a), 0);
            assert_eq!(offsets.len(), x as usize);
            for (i, got) in offsets.iter().enumerate() {
                let k = i as u32 + 1;
                let want = ideal_offset(x, t, a, k);
                let tol = tolerance(x, t, k);
                assert!(
                    (f64::from(*got) - want).abs() <= tol,
                    "x={} a={} k={}: got {} want {:.1}",
                    x, a, k, got, want
                );
            }
        }
    }

    #[test]
    fn test_discriminant_sweep_small_commands() {
        let t = 100_000;
        for x in 0u32..64 {
            for a in -(x as i32)..=(x as i32) {
                let command = if x == 0 {
                    Command::empty(Duration::new(i64::from(t)))
                } else {
                    cmd(x, t, a)
                };
                let offsets = pulse_offsets(command, 1 << 31);
                assert_eq!(offsets.len(), x as usize, "x={} a={}", x, a);
                if x > 0 {
                    assert_eq!(*offsets.last().unwrap(), t, "x={} a={}", x, a);
                }
                assert!(offsets.windows(2).all(|w| w[0] <= w[1]), "x={} a={}", x, a);
            }
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_intervals_track_ideal_profile(
            x in 8u32..400,
            t in 100_000u32..4_000_000,
            frac in -1.0f64..=1.0,
        ) {
            let a = (f64::from(x) * frac) as i32;
            let offsets = pulse_offsets(cmd(x, t, a), 0);
            prop_assert_eq!(offsets.len(), x as usize);
            prop_assert_eq!(*offsets.last().unwrap(), t);

            // per-pulse error: half a unit of the scaled root relative to
            // 32q, plus the floors of the time fraction and the product
            let err = |k: u32| {
                f64::from(t) * (1.0 / 65536.0 + 1.0 / (64.0 * ideal_q(x, a, k) - 1.0)) + 2.0
            };
            for k in 2..=x {
                let i = k as usize;
                let got = f64::from(offsets[i - 1]) - f64::from(offsets[i - 2]);
                let want = ideal_offset(x, t, a, k) - ideal_offset(x, t, a, k - 1);
                let slack = err(k) + err(k - 1);
                prop_assert!(
                    (got - want).abs() <= slack,
                    "k={} interval {} want {:.1} slack {:.1}", k, got, want, slack
                );
            }
        }

        #[test]
        fn prop_mirrored_accel_reverses_intervals(
            x in 1u32..300,
            t in 10_000u32..4_000_000,
            frac in 0.0f64..=1.0,
        ) {
            let a = (f64::from(x) * frac) as i32;
            prop_assume!(a != 0);
            let forward = pulse_offsets(cmd(x, t, a), 0);
            let mirrored = pulse_offsets(cmd(x, t, -a), 0);
            prop_assert_eq!(forward.len(), mirrored.len());
            for k in 1..x as usize {
                // pulse k of the mirror sits where pulse x-k of the original
                // sits, measured from the other end
                prop_assert_eq!(mirrored[k - 1], t - forward[x as usize - k - 1]);
            }
        }

        #[test]
        fn prop_constant_velocity_is_nearly_symmetric(
            x in 1u32..300,
            t in 10_000u32..4_000_000,
        ) {
            // a = 0 runs forward from the start, so the far-end view
            // differs by the truncation of the time fraction on both sides
            let offsets = pulse_offsets(cmd(x, t, 0), 0);
            for k in 1..x as usize {
                let reversed = t - offsets[x as usize - k - 1];
                prop_assert!(offsets[k - 1].abs_diff(reversed) <= t / 32768 + 2);
            }
        }

        #[test]
        fn prop_survives_counter_wrap(
            start in (u32::MAX - 2_000_000)..=u32::MAX,
            x in 1u32..200,
            a_frac in -1.0f64..=1.0,
        ) {
            let t = 3_000_000;
            let a = (f64::from(x) * a_frac) as i32;
            let wrapped = pulse_offsets(cmd(x, t, a), start);
            let plain = pulse_offsets(cmd(x, t, a), 1000);
            prop_assert_eq!(wrapped, plain);
        }
    }

    #[test]
    fn test_constant_velocity_odd_duration() {
        let offsets = pulse_offsets(cmd(2, 400_331, 0), 0);
        // the midpoint rounds down from the start, not from the end
        assert_eq!(offsets, [200_165, 400_331]);
    }

    #[test]
    fn test_accel_bounds_fit_widths() {
        // widest intermediate: a = -x at the maximum step count
        let c = Command::generate(
            Steps::new(i64::from(MAX_STEPS)),
            Direction::Forward,
            Duration::new(i64::from(MAX_TICKS_FOR_TEST)),
            Accel::new(-i64::from(MAX_STEPS)),
        );
        let offsets = pulse_offsets(c, 0);
        assert_eq!(offsets.len(), MAX_STEPS as usize);
        assert_eq!(offsets[MAX_STEPS as usize - 1], MAX_TICKS_FOR_TEST);
    }
}
