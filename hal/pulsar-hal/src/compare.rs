//! Per-axis compare channel
//!
//! One free-running counter plus one compare register whose match raises an
//! interrupt. Each stepping axis owns exactly one channel.

use crate::time::Ticks;

/// Hardware compare channel
///
/// Implementations are thin register wrappers. They do not handle
/// wraparound or clearance; that is layered on top by the core's
/// interrupt timer. `arm_at` and `disarm` must be safe to call from the
/// channel's own interrupt handler.
pub trait CompareUnit {
    /// Read the free-running counter
    fn now(&self) -> Ticks;

    /// Program the compare register and enable the match interrupt
    ///
    /// The caller guarantees `at` is ahead of the counter by the
    /// configured clearance.
    fn arm_at(&mut self, at: Ticks);

    /// Disable the match interrupt
    fn disarm(&mut self);

    /// Returns true while a match interrupt is pending or enabled
    fn is_armed(&self) -> bool;

    /// Clear the pending match flag, called at the top of the interrupt
    ///
    /// Channels that clear the flag on re-arm need not override this.
    fn acknowledge(&mut self) {}
}
