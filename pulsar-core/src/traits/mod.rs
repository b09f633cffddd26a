//! Hardware abstraction traits
//!
//! These traits define the interface between the step scheduler and the
//! pin-level driver implementations.

pub mod stepper;

pub use stepper::{Direction, Endstop, StepDriver};
