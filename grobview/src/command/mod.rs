//! Cooperative command pipeline
//!
//! A [`Command`] is a unit of work that is driven through a small state
//! machine by the [`CommandQueue`] that owns it:
//!
//! ```text
//! Scheduled ─► Prepared ─► Running ─┬─► Done
//!     │                     ▲       │
//!     │                     └ Yielded ◄┘
//!     └─► Canceled
//! ```
//!
//! Queues are not ticked directly by the application.  Instead, a non-empty
//! queue registers itself with the [`ActiveCommandQueues`] set owned by the
//! [`AppContext`](crate::AppContext), and a single call to
//! [`ActiveCommandQueues::tick`] drives every live queue by one step.
//!
//! Commands come in two flavors (see [`Execution`]), but the queue doesn't
//! care which is which: both obey the same [`Step`] contract.  Asynchronous
//! commands push their work onto a [`WorkerPool`] and poll the resulting
//! [`Job`] from `on_run`.
use crate::Error;

mod active;
mod barrier;
mod factory;
mod group;
mod queue;
mod sequence;
mod worker;

pub use active::ActiveCommandQueues;
pub(crate) use active::{ActiveSet, Tick};
pub use barrier::Barrier;
pub use factory::{
    Arg, ArgDesc, ArgKind, ArgTuple, ArgValue, CommandBuilder, CommandEntry,
    CommandFactory,
};
pub use group::{Group, GroupId, Groups};
pub use queue::CommandQueue;
pub use sequence::Sequence;
pub use worker::{Job, ThreadCount, WorkerPool};

/// How a command's work is executed
#[derive(Copy, Clone, Debug, Eq, PartialEq, strum::Display)]
pub enum Execution {
    /// All work happens within `on_run`, on the ticking thread
    Synchronous,
    /// Work is dispatched to a worker pool and polled from `on_run`
    Asynchronous,
}

/// Result of a single call to [`Command::on_run`]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Step {
    /// The command is finished and may be removed from its queue
    Done,
    /// The command wants to be run again on a later tick
    Yield,
}

/// Externally visible state of a command within its queue
#[derive(Copy, Clone, Debug, Eq, PartialEq, strum::Display)]
pub enum CommandState {
    /// Waiting in the queue (not yet at the head)
    Scheduled,
    /// At the head of the queue; `on_prepare` has fired
    Prepared,
    /// Inside a call to `on_run`
    Running,
    /// Returned [`Step::Yield`] and is waiting for the next tick
    Yielded,
    /// Finished; about to be dropped
    Done,
    /// Removed from the queue before it was prepared
    Canceled,
}

/// A unit of work driven by a [`CommandQueue`]
///
/// Only [`on_run`](Command::on_run) is required.  The other hooks default to
/// doing nothing.
pub trait Command: Send {
    /// Name used in log messages
    fn name(&self) -> &str;

    /// Returns how this command executes
    fn execution(&self) -> Execution {
        Execution::Synchronous
    }

    /// Called once, when the command is added to a queue
    fn on_scheduled(&mut self) {}

    /// Called once, when the command reaches the head of its queue
    ///
    /// If this returns an error, the command skips `on_run` entirely and is
    /// treated as done; it is responsible for recording the failure wherever
    /// the user will see it.
    fn on_prepare(&mut self) -> Result<(), Error> {
        Ok(())
    }

    /// Performs (or polls) the command's work
    fn on_run(&mut self) -> Step;

    /// Called instead of any other hook if the command's queue is cleared or
    /// destroyed while the command is still scheduled
    fn on_canceled(&mut self) {}
}

/// Command which does nothing and finishes on its first run
#[derive(Clone, Debug, Default)]
pub struct NoOp;

impl Command for NoOp {
    fn name(&self) -> &str {
        "noop"
    }
    fn on_run(&mut self) -> Step {
        Step::Done
    }
}
