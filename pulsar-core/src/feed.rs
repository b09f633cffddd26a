//! Command feed from the motion planner
//!
//! The planner runs in background context and pushes commands into a
//! bounded single-producer single-consumer ring; the axis interrupt pops
//! them. Running dry stops the axis: there is no spin-wait inside the
//! interrupt, the planner simply restarts the axis once it has caught up.

use heapless::spsc::{Consumer as RingRx, Producer as RingTx, Queue};

use crate::command::Command;
use crate::consumer::{Consumer, Flow};

/// Backing storage for a feed holding up to `N - 1` commands
pub type FeedQueue<const N: usize> = Queue<Command, N>;

/// Split a queue into the planner side and the interrupt side
pub fn split<const N: usize>(queue: &mut FeedQueue<N>) -> (FeedProducer<'_, N>, CommandFeed<'_, N>) {
    let (tx, rx) = queue.split();
    (
        FeedProducer { tx },
        CommandFeed {
            rx,
            underruns: 0,
            delivered: 0,
        },
    )
}

/// Planner-side handle
pub struct FeedProducer<'a, const N: usize> {
    tx: RingTx<'a, Command, N>,
}

impl<const N: usize> FeedProducer<'_, N> {
    /// Queue a command, handing it back if the ring is full
    pub fn push(&mut self, cmd: Command) -> Result<(), Command> {
        self.tx.enqueue(cmd)
    }

    /// Free slots
    pub fn available(&self) -> usize {
        self.tx.capacity() - self.tx.len()
    }

    /// True if at least one command can be queued
    pub fn ready(&self) -> bool {
        self.tx.ready()
    }
}

/// Interrupt-side consumer popping planned commands
pub struct CommandFeed<'a, const N: usize> {
    rx: RingRx<'a, Command, N>,
    underruns: u32,
    delivered: u32,
}

impl<const N: usize> CommandFeed<'_, N> {
    /// Pop the first command of a run, for passing to `start`
    pub fn take_first(&mut self) -> Option<Command> {
        let cmd = self.rx.dequeue()?;
        self.delivered = self.delivered.wrapping_add(1);
        Some(cmd)
    }

    /// Commands waiting in the ring
    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    /// Times the axis stopped because the ring was empty
    pub fn underruns(&self) -> u32 {
        self.underruns
    }

    /// Commands handed to the axis so far
    pub fn delivered(&self) -> u32 {
        self.delivered
    }
}

impl<const N: usize> Consumer for CommandFeed<'_, N> {
    fn next_command(&mut self, cmd: &mut Command) -> Flow {
        match self.rx.dequeue() {
            Some(next) => {
                *cmd = next;
                self.delivered = self.delivered.wrapping_add(1);
                Flow::Continue
            }
            None => {
                self.underruns = self.underruns.wrapping_add(1);
                warn!("feed: underrun, axis stops");
                Flow::Stop
            }
        }
    }
}
