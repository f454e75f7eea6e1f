use std::collections::VecDeque;

use super::{Command, Execution, Step};
use crate::Error;

/// Composite command which runs a group of commands in order, occupying a
/// single slot in its queue
///
/// Each child sees the same hook sequence it would see in a queue of its own:
/// every child is scheduled when the sequence is scheduled, prepared when it
/// becomes current, and canceled (in reverse order) if the sequence is
/// canceled.  Finishing one child prepares the next one, which runs on the
/// following tick.
///
/// If the sequence is dropped before finishing (e.g. its queue abandons it),
/// children which were scheduled but never prepared are canceled.
pub struct Sequence {
    name: String,
    pending: VecDeque<Box<dyn Command>>,
    current: Option<Box<dyn Command>>,
    scheduled: bool,
}

impl Sequence {
    /// Builds an empty sequence
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            pending: VecDeque::new(),
            current: None,
            scheduled: false,
        }
    }

    /// Appends a child command (builder style)
    pub fn then<C: Command + 'static>(mut self, cmd: C) -> Self {
        self.push(Box::new(cmd));
        self
    }

    /// Appends an already-boxed child command
    pub fn push(&mut self, cmd: Box<dyn Command>) {
        self.pending.push_back(cmd);
    }

    /// Returns the number of children which have not finished
    pub fn len(&self) -> usize {
        self.pending.len() + self.current.is_some() as usize
    }

    /// Checks whether every child has finished
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Prepares the next child, skipping any which fail to prepare
    ///
    /// Returns `true` if a child is now current
    fn prepare_next(&mut self) -> bool {
        while let Some(mut cmd) = self.pending.pop_front() {
            match cmd.on_prepare() {
                Ok(()) => {
                    self.current = Some(cmd);
                    return true;
                }
                Err(e) => log::warn!(
                    "{}: {} failed to prepare: {e}",
                    self.name,
                    cmd.name()
                ),
            }
        }
        false
    }
}

impl Command for Sequence {
    fn name(&self) -> &str {
        &self.name
    }

    fn execution(&self) -> Execution {
        let is_async = self
            .current
            .iter()
            .chain(&self.pending)
            .any(|c| c.execution() == Execution::Asynchronous);
        if is_async {
            Execution::Asynchronous
        } else {
            Execution::Synchronous
        }
    }

    fn on_scheduled(&mut self) {
        self.scheduled = true;
        for c in &mut self.pending {
            c.on_scheduled();
        }
    }

    fn on_prepare(&mut self) -> Result<(), Error> {
        self.prepare_next();
        Ok(())
    }

    fn on_run(&mut self) -> Step {
        let Some(cmd) = self.current.as_mut() else {
            return Step::Done;
        };
        match cmd.on_run() {
            Step::Yield => Step::Yield,
            Step::Done => {
                self.current = None;
                if self.prepare_next() {
                    Step::Yield
                } else {
                    Step::Done
                }
            }
        }
    }

    fn on_canceled(&mut self) {
        self.cancel_pending();
    }
}

impl Sequence {
    fn cancel_pending(&mut self) {
        while let Some(mut c) = self.pending.pop_back() {
            c.on_canceled();
        }
    }
}

impl Drop for Sequence {
    fn drop(&mut self) {
        if self.scheduled && !self.pending.is_empty() {
            log::debug!(
                "{}: dropped with {} pending commands",
                self.name,
                self.pending.len()
            );
            self.cancel_pending();
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::command::{Barrier, CommandQueue, NoOp};

    /// Asynchronous command which never finishes
    struct Endless;

    impl Command for Endless {
        fn name(&self) -> &str {
            "endless"
        }
        fn execution(&self) -> Execution {
            Execution::Asynchronous
        }
        fn on_run(&mut self) -> Step {
            Step::Yield
        }
    }

    #[test]
    fn test_sequence_runs_children_in_order() {
        let q = CommandQueue::detached();
        q.enqueue(Sequence::new("seq").then(NoOp).then(NoOp).then(NoOp));
        let mut ticks = 0;
        while !q.is_empty() {
            q.tick();
            ticks += 1;
        }
        // One tick to prepare, then one per child
        assert_eq!(ticks, 4);
    }

    #[test]
    fn test_empty_sequence() {
        let q = CommandQueue::detached();
        q.enqueue(Sequence::new("empty"));
        q.tick();
        q.tick();
        assert!(q.is_empty());
    }

    #[test]
    fn test_sequence_cancel_forwards() {
        let b = Barrier::new();
        let q = CommandQueue::detached();
        q.enqueue(NoOp);
        q.enqueue(Sequence::new("seq").then(b.sibling()).then(b.sibling()));
        assert_eq!(b.unprepared_instances(), 2);
        q.clear();
        assert_eq!(b.unprepared_instances(), 0);
    }

    #[test]
    fn test_abandoned_sequence_releases_barrier() {
        let b = Barrier::new();
        let q1 = CommandQueue::detached();
        let q2 = CommandQueue::detached();
        q1.enqueue(Sequence::new("seq").then(Endless).then(b.sibling()));
        q2.enqueue(b.sibling());
        assert_eq!(b.unprepared_instances(), 2);

        q1.tick();
        q1.tick();
        // The running child is asynchronous, so clearing abandons the
        // sequence and cancels its pending barrier
        q1.clear();
        assert!(q1.is_empty());
        assert_eq!(b.unprepared_instances(), 1);

        q2.tick();
        q2.tick();
        assert!(q2.is_empty());
    }

    #[test]
    fn test_dropped_queue_releases_sequence_children() {
        let b = Barrier::new();
        let q = CommandQueue::detached();
        q.enqueue(Sequence::new("seq").then(NoOp).then(b.sibling()));
        q.tick();
        assert_eq!(b.unprepared_instances(), 1);
        drop(q);
        assert_eq!(b.unprepared_instances(), 0);
    }

    #[test]
    fn test_unscheduled_sequence_drops_quietly() {
        let b = Barrier::new();
        drop(Sequence::new("seq").then(b.sibling()));
        assert_eq!(b.unprepared_instances(), 0);
    }
}
