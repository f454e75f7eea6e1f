//! Join point across independent queues
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use super::{Command, Step};
use crate::Error;

/// Synchronous command which blocks its queue until every sibling has
/// reached the head of its own queue
///
/// Siblings share a counter of *unprepared instances*: scheduling a barrier
/// increments it, and preparing (or canceling) one decrements it.  A barrier
/// finishes the first time it runs and sees the counter at zero.
///
/// Build the first instance with [`Barrier::new`], then one
/// [`Barrier::sibling`] for each additional queue.  All siblings should be
/// enqueued before any of them can reach the head of its queue; otherwise the
/// early ones may see a zero counter and pass through.
///
/// No sibling finishes before every sibling has been prepared.  Siblings
/// which reach their heads on the same tick all complete together on the
/// following tick.  Otherwise, a sibling which was prepared on an earlier
/// tick and whose queue is ticked after the last one's may finish on the
/// same tick as that last sibling is prepared, one tick ahead of it.
pub struct Barrier {
    unprepared: Arc<AtomicUsize>,
}

impl Default for Barrier {
    fn default() -> Self {
        Self::new()
    }
}

impl Barrier {
    /// Builds a new barrier with no siblings
    pub fn new() -> Self {
        Self {
            unprepared: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Builds a sibling instance which shares this barrier's counter
    pub fn sibling(&self) -> Self {
        Self {
            unprepared: self.unprepared.clone(),
        }
    }

    /// Returns the number of siblings which are scheduled but not yet
    /// prepared
    pub fn unprepared_instances(&self) -> usize {
        self.unprepared.load(Ordering::Acquire)
    }

    fn release(&self) -> usize {
        match self.unprepared.fetch_update(
            Ordering::AcqRel,
            Ordering::Acquire,
            |v| v.checked_sub(1),
        ) {
            Ok(prev) => prev - 1,
            Err(_) => panic!("barrier counter underflow"),
        }
    }
}

impl Command for Barrier {
    fn name(&self) -> &str {
        "barrier"
    }
    fn on_scheduled(&mut self) {
        self.unprepared.fetch_add(1, Ordering::AcqRel);
    }
    fn on_prepare(&mut self) -> Result<(), Error> {
        let remaining = self.release();
        log::debug!("barrier prepared; {remaining} siblings remaining");
        Ok(())
    }
    fn on_run(&mut self) -> Step {
        if self.unprepared_instances() == 0 {
            Step::Done
        } else {
            Step::Yield
        }
    }
    fn on_canceled(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::command::{CommandQueue, CommandState, NoOp};

    #[test]
    fn test_enqueue_then_cancel_is_neutral() {
        let b = Barrier::new();
        let q = CommandQueue::detached();
        q.enqueue(b.sibling());
        assert_eq!(b.unprepared_instances(), 1);
        q.clear();
        assert_eq!(b.unprepared_instances(), 0);
    }

    #[test]
    fn test_last_prepared_sees_zero() {
        let b = Barrier::new();
        let q1 = CommandQueue::detached();
        let q2 = CommandQueue::detached();
        q1.enqueue(b.sibling());
        q2.enqueue(b.sibling());
        assert_eq!(b.unprepared_instances(), 2);

        q1.tick();
        assert_eq!(b.unprepared_instances(), 1);
        q1.tick();
        assert_eq!(q1.head_state(), Some(CommandState::Yielded));

        q2.tick();
        assert_eq!(b.unprepared_instances(), 0);
        q1.tick();
        q2.tick();
        assert!(q1.is_empty());
        assert!(q2.is_empty());
    }

    #[test]
    fn test_early_sibling_finishes_first() {
        let b = Barrier::new();
        let q1 = CommandQueue::detached();
        let q2 = CommandQueue::detached();
        q1.enqueue(NoOp);
        q1.enqueue(b.sibling());
        q2.enqueue(b.sibling());
        let tick = || {
            q1.tick();
            q2.tick();
        };

        tick();
        assert_eq!(b.unprepared_instances(), 1);
        // q1 prepares the last sibling; q2 then sees zero in the same tick
        tick();
        assert_eq!(b.unprepared_instances(), 0);
        assert!(q2.is_empty());
        assert_eq!(q1.len(), 1);
        tick();
        assert!(q1.is_empty());
    }

    #[test]
    #[should_panic(expected = "barrier counter underflow")]
    fn test_underflow_panics() {
        let mut b = Barrier::new();
        b.on_prepare().unwrap();
    }
}
