//! Static per-axis instance holder
//!
//! Each axis lives in one statically allocated [`AxisSlot`], installed
//! once at boot. Background code reaches it through [`AxisSlot::with`];
//! the timer vector calls [`AxisSlot::on_interrupt`]. Both go through a
//! critical section, which on a single core also keeps the axis' own
//! interrupt from running while background code holds the instance.
//!
//! ```ignore
//! static X_AXIS: AxisSlot<XAxis> = AxisSlot::new();
//!
//! #[interrupt]
//! fn TIMER_IRQ_1() {
//!     X_AXIS.on_interrupt();
//! }
//! ```

use core::cell::RefCell;

use critical_section::Mutex;
use pulsar_hal::CompareUnit;

use crate::consumer::ConsumerList;
use crate::stepper::AxisStepper;
use crate::traits::StepDriver;

/// Holder for one statically allocated instance
pub struct AxisSlot<T> {
    inner: Mutex<RefCell<Option<T>>>,
}

impl<T> AxisSlot<T> {
    /// Empty slot, usable in a `static`
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(None)),
        }
    }

    /// Store the instance, returning whatever was there before
    pub fn install(&self, value: T) -> Option<T> {
        critical_section::with(|cs| self.inner.borrow_ref_mut(cs).replace(value))
    }

    /// Remove the instance
    pub fn take(&self) -> Option<T> {
        critical_section::with(|cs| self.inner.borrow_ref_mut(cs).take())
    }

    /// True once an instance is installed
    pub fn is_installed(&self) -> bool {
        critical_section::with(|cs| self.inner.borrow_ref(cs).is_some())
    }

    /// Run `f` on the instance inside a critical section
    ///
    /// Returns `None` if nothing is installed.
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        critical_section::with(|cs| self.inner.borrow_ref_mut(cs).as_mut().map(f))
    }
}

impl<T> Default for AxisSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<U, D, C> AxisSlot<AxisStepper<U, D, C>>
where
    U: CompareUnit,
    D: StepDriver,
    C: ConsumerList,
{
    /// Timer interrupt entry; a spurious interrupt before `install` is
    /// ignored
    pub fn on_interrupt(&self) {
        self.with(|axis| axis.irq_handler());
    }
}
