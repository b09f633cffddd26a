//! Consumer dispatch
//!
//! Several logical command sources may share one physical axis, e.g. the
//! motion planner feed and the homing routine. They are registered as a
//! tuple fixed at build time; the scheduler records which one owns the
//! active run and routes every callback to it. The last tuple element is
//! the catch-all for ids that match no earlier element.

use crate::command::Command;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Index of a consumer within its axis' consumer tuple
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConsumerId(pub u8);

/// Whether the axis keeps running after a command callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Flow {
    /// The slot holds the next command
    Continue,
    /// No further command; the axis stops
    Stop,
}

/// Verdict of the per-step guard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Prestep {
    /// Emit the pulse
    Proceed,
    /// Stop the axis without pulsing
    Abort,
}

/// A logical source of commands for one axis
///
/// Both callbacks run inside the timer interrupt and must finish in
/// bounded time.
pub trait Consumer {
    /// Replace `cmd` (the command just finished) with the next one
    fn next_command(&mut self, cmd: &mut Command) -> Flow;

    /// Guard sampled before every pulse while enabled on the axis
    fn prestep(&mut self) -> Prestep {
        Prestep::Proceed
    }
}

/// Fixed set of consumers sharing one axis
pub trait ConsumerList {
    /// Number of registered consumers
    const LEN: usize;

    /// Route a command callback to consumer `id`
    fn next_command(&mut self, id: ConsumerId, cmd: &mut Command) -> Flow;

    /// Route a prestep callback to consumer `id`
    fn prestep(&mut self, id: ConsumerId) -> Prestep;
}

macro_rules! impl_consumer_list {
    ($len:expr; [$($idx:tt : $name:ident),*] $last_idx:tt : $last:ident) => {
        impl<$($name: Consumer,)* $last: Consumer> ConsumerList for ($($name,)* $last,) {
            const LEN: usize = $len;

            #[inline]
            fn next_command(&mut self, id: ConsumerId, cmd: &mut Command) -> Flow {
                let _ = id;
                $(
                    if id.0 == $idx {
                        return self.$idx.next_command(cmd);
                    }
                )*
                self.$last_idx.next_command(cmd)
            }

            #[inline]
            fn prestep(&mut self, id: ConsumerId) -> Prestep {
                let _ = id;
                $(
                    if id.0 == $idx {
                        return self.$idx.prestep();
                    }
                )*
                self.$last_idx.prestep()
            }
        }
    };
}

impl_consumer_list!(1; [] 0: A);
impl_consumer_list!(2; [0: A] 1: B);
impl_consumer_list!(3; [0: A, 1: B] 2: C);
impl_consumer_list!(4; [0: A, 1: B, 2: C] 3: D);
