//! Long-lived objects with their own command queue
use std::sync::{
    Arc, Weak,
    atomic::{AtomicBool, Ordering},
};

use crate::command::{ActiveSet, Command, CommandQueue, Tick};

/// The set of [`Actor`]s which currently have work to do
///
/// This is a cheap handle; clones refer to the same set.  Additions and
/// removals are staged exactly as in
/// [`ActiveCommandQueues`](crate::command::ActiveCommandQueues).
#[derive(Clone)]
pub struct ActiveActors(ActiveSet);

impl Default for ActiveActors {
    fn default() -> Self {
        Self::new()
    }
}

impl ActiveActors {
    /// Builds a new, empty set
    pub fn new() -> Self {
        Self(ActiveSet::new("active actors"))
    }

    /// Ticks every actor which was live at the start of this call
    pub fn tick(&self) {
        self.0.tick()
    }

    /// Checks whether the given actor is currently live
    pub fn contains(&self, actor: &Actor) -> bool {
        self.0.contains(actor.shared.id)
    }

    /// Returns the number of live actors
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Checks whether there are no live or pending actors
    pub fn is_empty(&self) -> bool {
        self.0.is_idle()
    }
}

/// An object which owns a command queue and is ticked by [`ActiveActors`]
///
/// The actor registers itself on construction and whenever work arrives
/// while it is deregistered.  It deregisters itself at the end of any tick
/// which leaves its queue empty; the check happens after the whole tick step,
/// so a command which enqueues follow-up work keeps the actor registered.
pub struct Actor {
    shared: Arc<ActorShared>,
}

struct ActorShared {
    id: u64,
    queue: CommandQueue,
    actors: ActiveActors,
    registered: AtomicBool,
}

impl Actor {
    /// Builds a new actor and registers it with the given set
    pub fn new(actors: &ActiveActors) -> Self {
        let queue = CommandQueue::detached();
        let shared = Arc::new(ActorShared {
            id: queue.id(),
            queue,
            actors: actors.clone(),
            registered: AtomicBool::new(false),
        });
        shared.register();
        Self { shared }
    }

    /// Appends a command to the actor's queue
    pub fn enqueue<C: Command + 'static>(&self, cmd: C) {
        self.enqueue_boxed(Box::new(cmd))
    }

    /// Appends an already-boxed command to the actor's queue
    pub fn enqueue_boxed(&self, cmd: Box<dyn Command>) {
        self.shared.queue.enqueue_boxed(cmd);
        self.shared.register();
    }

    /// Ticks the actor's queue directly
    ///
    /// This is normally called by [`ActiveActors::tick`].
    pub fn tick(&self) {
        self.shared.tick()
    }

    /// Returns the actor's queue
    pub fn queue(&self) -> &CommandQueue {
        &self.shared.queue
    }

    /// Checks whether the actor has no work left
    pub fn is_idle(&self) -> bool {
        self.shared.queue.is_empty()
    }
}

impl ActorShared {
    fn register(self: &Arc<Self>) {
        if !self.registered.swap(true, Ordering::AcqRel) {
            let w: Weak<ActorShared> = Arc::downgrade(self);
            self.actors.0.add(self.id, w);
        }
    }
}

impl Tick for ActorShared {
    fn tick(&self) {
        self.queue.tick();
        if self.queue.is_empty()
            && self.registered.swap(false, Ordering::AcqRel)
        {
            self.actors.0.remove(self.id);
        }
    }
}

impl Drop for ActorShared {
    fn drop(&mut self) {
        if *self.registered.get_mut() {
            self.actors.0.remove(self.id);
        }
    }
}
