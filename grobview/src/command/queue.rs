//! FIFO of commands, driven one step per tick
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use super::{
    ActiveCommandQueues, Command, CommandState, Execution, Step,
    active::{Tick, next_id},
};

/// Ordered sequence of commands, executed one at a time
///
/// Only the head of the queue may be past [`CommandState::Scheduled`].  Each
/// tick drives the head through one phase:
///
/// - A scheduled head is prepared, and the tick ends
/// - A prepared or yielded head is run; if it returns [`Step::Done`], it is
///   dropped and the next command (if any) is prepared
///
/// A queue built with [`CommandQueue::new`] registers itself with its
/// [`ActiveCommandQueues`] whenever it goes from empty to non-empty, and
/// deregisters itself at the end of the tick which empties it.  A queue built
/// with [`CommandQueue::detached`] must be ticked by its owner instead.
///
/// Dropping the queue cancels every command which is still scheduled; a head
/// command which has already been prepared is abandoned.
pub struct CommandQueue {
    shared: Arc<QueueShared>,
}

struct QueueShared {
    id: u64,
    registry: Option<ActiveCommandQueues>,
    state: Mutex<QueueState>,
}

#[derive(Default)]
struct QueueState {
    entries: VecDeque<Entry>,
    registered: bool,
}

struct Entry {
    /// The command itself, or `None` while it is out being prepared or run
    cmd: Option<Box<dyn Command>>,
    state: CommandState,
}

/// What to do with the head command after driving it
enum Outcome {
    /// Put the command back in the given state and end the tick
    Park(CommandState),
    /// Drop the command and move on to the next one
    Finished,
}

impl CommandQueue {
    /// Builds a new queue which is ticked by the given active set
    pub fn new(active: &ActiveCommandQueues) -> Self {
        Self::build(Some(active.clone()))
    }

    /// Builds a new queue which is only ticked by explicit calls to
    /// [`CommandQueue::tick`]
    pub fn detached() -> Self {
        Self::build(None)
    }

    fn build(registry: Option<ActiveCommandQueues>) -> Self {
        Self {
            shared: Arc::new(QueueShared {
                id: next_id(),
                registry,
                state: Mutex::new(QueueState::default()),
            }),
        }
    }

    pub(crate) fn id(&self) -> u64 {
        self.shared.id
    }

    /// Appends a command to the queue
    pub fn enqueue<C: Command + 'static>(&self, cmd: C) {
        self.enqueue_boxed(Box::new(cmd))
    }

    /// Appends an already-boxed command to the queue
    ///
    /// `on_scheduled` is called before this function returns.
    pub fn enqueue_boxed(&self, mut cmd: Box<dyn Command>) {
        log::debug!("queue {}: scheduling {}", self.shared.id, cmd.name());
        cmd.on_scheduled();
        let register = {
            let mut s = self.shared.lock();
            s.entries.push_back(Entry {
                cmd: Some(cmd),
                state: CommandState::Scheduled,
            });
            !std::mem::replace(&mut s.registered, true)
        };
        if register {
            self.shared.register();
        }
    }

    /// Drives the head command through one phase
    pub fn tick(&self) {
        self.shared.step()
    }

    /// Checks whether the queue has no commands
    pub fn is_empty(&self) -> bool {
        self.shared.lock().entries.is_empty()
    }

    /// Returns the number of commands in the queue (including the head)
    pub fn len(&self) -> usize {
        self.shared.lock().entries.len()
    }

    /// Returns the state of the head command, if there is one
    pub fn head_state(&self) -> Option<CommandState> {
        self.shared.lock().entries.front().map(|e| e.state)
    }

    /// Cancels every command which has not yet been prepared
    ///
    /// Commands are canceled in reverse order.  A head command which is
    /// already prepared is left to finish if it's synchronous and abandoned
    /// if it's asynchronous; a head command which is currently running (i.e.
    /// the caller of this function) is always left alone.
    pub fn clear(&self) {
        let (canceled, abandoned) = {
            let mut s = self.shared.lock();
            let mut canceled = vec![];
            let mut abandoned = None;
            let mut keep = VecDeque::new();
            for e in std::mem::take(&mut s.entries) {
                match (e.state, e.cmd) {
                    (_, None) => keep.push_back(Entry {
                        cmd: None,
                        state: e.state,
                    }),
                    (CommandState::Scheduled, Some(cmd)) => canceled.push(cmd),
                    (state, Some(cmd)) => {
                        if cmd.execution() == Execution::Synchronous {
                            keep.push_back(Entry {
                                cmd: Some(cmd),
                                state,
                            });
                        } else {
                            abandoned = Some(cmd);
                        }
                    }
                }
            }
            s.entries = keep;
            (canceled, abandoned)
        };
        if let Some(cmd) = abandoned {
            log::debug!(
                "queue {}: abandoning {}",
                self.shared.id,
                cmd.name()
            );
        }
        cancel_all(self.shared.id, canceled);
        self.shared.deregister_if_empty();
    }
}

/// Calls `on_canceled` for each command, last one first
fn cancel_all(id: u64, cmds: Vec<Box<dyn Command>>) {
    for mut cmd in cmds.into_iter().rev() {
        log::debug!("queue {id}: canceling {}", cmd.name());
        cmd.on_canceled();
    }
}

impl QueueShared {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap()
    }

    fn register(self: &Arc<Self>) {
        if let Some(r) = &self.registry {
            let w: Weak<QueueShared> = Arc::downgrade(self);
            r.0.add(self.id, w);
        }
    }

    fn deregister_if_empty(&self) {
        let deregister = {
            let mut s = self.lock();
            s.entries.is_empty() && std::mem::take(&mut s.registered)
        };
        if deregister {
            if let Some(r) = &self.registry {
                r.0.remove(self.id);
            }
        }
    }

    fn step(&self) {
        loop {
            // Take the head command out of the queue, so that the lock isn't
            // held while it runs (it may enqueue into or clear this queue)
            let (mut cmd, state) = {
                let mut s = self.lock();
                let Some(head) = s.entries.front_mut() else {
                    break;
                };
                let Some(cmd) = head.cmd.take() else {
                    panic!("queue {} was ticked re-entrantly", self.id);
                };
                if matches!(
                    head.state,
                    CommandState::Prepared | CommandState::Yielded
                ) {
                    head.state = CommandState::Running;
                }
                (cmd, head.state)
            };

            let outcome = match state {
                CommandState::Scheduled => match cmd.on_prepare() {
                    Ok(()) => {
                        log::debug!(
                            "queue {}: prepared {}",
                            self.id,
                            cmd.name()
                        );
                        Outcome::Park(CommandState::Prepared)
                    }
                    Err(e) => {
                        log::warn!("{} failed to prepare: {e}", cmd.name());
                        Outcome::Finished
                    }
                },
                CommandState::Running => match cmd.on_run() {
                    Step::Done => Outcome::Finished,
                    Step::Yield => Outcome::Park(CommandState::Yielded),
                },
                s => panic!(
                    "queue {}: head command {} in unexpected state {s}",
                    self.id,
                    cmd.name()
                ),
            };

            match outcome {
                Outcome::Park(next) => {
                    let mut s = self.lock();
                    let head = s
                        .entries
                        .front_mut()
                        .expect("in-flight head was removed from its queue");
                    head.cmd = Some(cmd);
                    head.state = next;
                    break;
                }
                Outcome::Finished => {
                    log::debug!("queue {}: finished {}", self.id, cmd.name());
                    self.lock().entries.pop_front();
                    drop(cmd);
                }
            }
        }
        self.deregister_if_empty();
    }
}

impl Tick for QueueShared {
    fn tick(&self) {
        self.step()
    }
}

impl Drop for QueueShared {
    fn drop(&mut self) {
        let s = self.state.get_mut().unwrap_or_else(|e| e.into_inner());
        let mut entries = std::mem::take(&mut s.entries);
        let head = match entries.front() {
            Some(e) if e.state != CommandState::Scheduled => {
                entries.pop_front()
            }
            _ => None,
        };
        if let Some(Entry { cmd: Some(cmd), .. }) = head {
            log::debug!("queue {}: abandoning {}", self.id, cmd.name());
        }
        let canceled = entries.into_iter().filter_map(|e| e.cmd).collect();
        cancel_all(self.id, canceled);
        if s.registered {
            if let Some(r) = &self.registry {
                r.0.remove(self.id);
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::command::NoOp;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Command which records every hook invocation into a shared log
    struct Recorder {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
        yields: usize,
    }

    impl Recorder {
        fn new(name: &'static str, log: &Arc<Mutex<Vec<String>>>) -> Self {
            Self {
                name,
                log: log.clone(),
                yields: 0,
            }
        }
        fn yielding(mut self, n: usize) -> Self {
            self.yields = n;
            self
        }
        fn push(&self, s: &str) {
            self.log.lock().unwrap().push(format!("{}:{s}", self.name));
        }
    }

    impl Command for Recorder {
        fn name(&self) -> &str {
            self.name
        }
        fn on_scheduled(&mut self) {
            self.push("scheduled");
        }
        fn on_prepare(&mut self) -> Result<(), crate::Error> {
            self.push("prepare");
            Ok(())
        }
        fn on_run(&mut self) -> Step {
            self.push("run");
            if self.yields > 0 {
                self.yields -= 1;
                Step::Yield
            } else {
                Step::Done
            }
        }
        fn on_canceled(&mut self) {
            self.push("canceled");
        }
    }

    fn take(log: &Arc<Mutex<Vec<String>>>) -> Vec<String> {
        std::mem::take(&mut *log.lock().unwrap())
    }

    #[test]
    fn test_state_sequence() {
        let log = Arc::new(Mutex::new(vec![]));
        let q = CommandQueue::detached();
        q.enqueue(Recorder::new("a", &log).yielding(2));
        assert_eq!(take(&log), ["a:scheduled"]);
        assert_eq!(q.head_state(), Some(CommandState::Scheduled));

        q.tick();
        assert_eq!(take(&log), ["a:prepare"]);
        assert_eq!(q.head_state(), Some(CommandState::Prepared));

        q.tick();
        assert_eq!(q.head_state(), Some(CommandState::Yielded));
        q.tick();
        assert_eq!(q.head_state(), Some(CommandState::Yielded));
        q.tick();
        assert_eq!(take(&log), ["a:run", "a:run", "a:run"]);
        assert!(q.is_empty());
        assert_eq!(q.head_state(), None);
    }

    #[test]
    fn test_fifo_and_prepare_after_finish() {
        let log = Arc::new(Mutex::new(vec![]));
        let q = CommandQueue::detached();
        q.enqueue(Recorder::new("a", &log));
        q.enqueue(Recorder::new("b", &log));
        take(&log);

        q.tick();
        assert_eq!(take(&log), ["a:prepare"]);
        q.tick();
        assert_eq!(take(&log), ["a:run", "b:prepare"]);
        q.tick();
        assert_eq!(take(&log), ["b:run"]);
        assert!(q.is_empty());
    }

    #[test]
    fn test_clear_cancels_in_reverse() {
        let log = Arc::new(Mutex::new(vec![]));
        let q = CommandQueue::detached();
        q.enqueue(Recorder::new("a", &log).yielding(1));
        q.enqueue(Recorder::new("b", &log));
        q.enqueue(Recorder::new("c", &log));
        q.tick(); // prepares a
        take(&log);

        q.clear();
        assert_eq!(take(&log), ["c:canceled", "b:canceled"]);

        // The synchronous head is allowed to finish
        assert_eq!(q.len(), 1);
        q.tick();
        q.tick();
        assert_eq!(take(&log), ["a:run", "a:run"]);
        assert!(q.is_empty());
    }

    #[test]
    fn test_clear_cancels_unprepared_head() {
        let log = Arc::new(Mutex::new(vec![]));
        let q = CommandQueue::detached();
        q.enqueue(Recorder::new("a", &log));
        take(&log);
        q.clear();
        assert_eq!(take(&log), ["a:canceled"]);
        assert!(q.is_empty());
    }

    struct SlowAsync;
    impl Command for SlowAsync {
        fn name(&self) -> &str {
            "slow"
        }
        fn execution(&self) -> Execution {
            Execution::Asynchronous
        }
        fn on_run(&mut self) -> Step {
            Step::Yield
        }
    }

    #[test]
    fn test_clear_abandons_async_head() {
        let q = CommandQueue::detached();
        q.enqueue(SlowAsync);
        q.tick();
        q.tick();
        assert_eq!(q.head_state(), Some(CommandState::Yielded));
        q.clear();
        assert!(q.is_empty());
    }

    #[test]
    fn test_drop_cancels() {
        let log = Arc::new(Mutex::new(vec![]));
        let q = CommandQueue::detached();
        q.enqueue(Recorder::new("a", &log));
        q.enqueue(Recorder::new("b", &log));
        q.tick();
        take(&log);
        drop(q);
        assert_eq!(take(&log), ["b:canceled"]);
    }

    #[test]
    fn test_registration_follows_contents() {
        let active = ActiveCommandQueues::new();
        let q = CommandQueue::new(&active);
        assert!(!active.contains(&q));

        q.enqueue(NoOp);
        assert!(!active.contains(&q)); // takes effect at the next tick
        active.tick(); // prepares
        assert!(active.contains(&q));
        active.tick(); // runs and empties the queue
        assert!(q.is_empty());
        assert!(!active.contains(&q));
        assert!(active.is_empty());

        q.enqueue(NoOp);
        active.tick();
        assert!(active.contains(&q));
    }

    #[test]
    fn test_drop_deregisters() {
        let active = ActiveCommandQueues::new();
        let q = CommandQueue::new(&active);
        q.enqueue(NoOp);
        active.tick();
        assert_eq!(active.len(), 1);
        drop(q);
        assert_eq!(active.len(), 0);
        active.tick();
    }

    /// Command which enqueues a follow-up into a shared counter queue
    struct Spawner {
        queue: Arc<CommandQueue>,
        runs: Arc<AtomicUsize>,
    }
    impl Command for Spawner {
        fn name(&self) -> &str {
            "spawner"
        }
        fn on_run(&mut self) -> Step {
            self.runs.fetch_add(1, Ordering::Relaxed);
            self.queue.enqueue(NoOp);
            Step::Done
        }
    }

    #[test]
    fn test_enqueue_during_run_is_not_run() {
        let q = Arc::new(CommandQueue::detached());
        let runs = Arc::new(AtomicUsize::new(0));
        q.enqueue(Spawner {
            queue: q.clone(),
            runs: runs.clone(),
        });
        q.tick();
        q.tick();
        assert_eq!(runs.load(Ordering::Relaxed), 1);
        // The follow-up was prepared but not run
        assert_eq!(q.head_state(), Some(CommandState::Prepared));
        q.tick();
        assert!(q.is_empty());
    }
}
