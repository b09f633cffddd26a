//! Axis construction from RP2040 pins

use embassy_rp::gpio::{Level, Output, Pin};
use embassy_rp::Peri;
use pulsar_core::config::{AxisConfig, ConfigError};
use pulsar_core::{AxisStepper, ConsumerList, InterruptTimer};
use pulsar_drivers::PinStepper;

use crate::alarm::AlarmUnit;
use crate::step_pin::StepOutput;

/// Axis on TIMER alarm `N` driving a step/dir/enable driver chip
pub type RpAxis<'d, const N: usize, C> =
    AxisStepper<AlarmUnit<N>, PinStepper<StepOutput<'d>, Output<'d>, Output<'d>>, C>;

/// Build an idle axis on alarm `N`
///
/// The driver starts disabled. Install the result in an `AxisSlot` before
/// calling [`AlarmUnit::enable_interrupt`].
pub fn new_axis<'d, const N: usize, C: ConsumerList>(
    step: Peri<'d, impl Pin>,
    dir: Peri<'d, impl Pin>,
    enable: Peri<'d, impl Pin>,
    step_hold_ns: u32,
    config: &AxisConfig,
    consumers: C,
) -> Result<RpAxis<'d, N, C>, ConfigError> {
    config.validate()?;
    let clearance = config.timer.clearance();
    let driver = PinStepper::from_config(
        StepOutput::new(step, step_hold_ns),
        Output::new(dir, Level::Low),
        Output::new(enable, Level::Low),
        config,
    );
    let timer = InterruptTimer::new(AlarmUnit::<N>::new(), clearance);
    Ok(AxisStepper::new(timer, driver, consumers))
}
