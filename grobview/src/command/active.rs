//! Registry of objects which want to be ticked
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{
    Arc, Mutex, MutexGuard, Weak,
    atomic::{AtomicU64, Ordering},
};

use super::CommandQueue;

/// Something which receives one tick step per outer tick
pub(crate) trait Tick: Send + Sync {
    fn tick(&self);
}

/// Returns a new process-unique identity for a tickable object
pub(crate) fn next_id() -> u64 {
    static NEXT: AtomicU64 = AtomicU64::new(1);
    NEXT.fetch_add(1, Ordering::Relaxed)
}

/// Set of tickable objects, safe to modify while it is being ticked
///
/// Mutations are staged in the `added` and `removed` buffers and applied at
/// the top of [`ActiveSet::tick`].  Removing an entry that is already live
/// also tombstones it (sets it to `None`), so a removal that happens partway
/// through a tick is respected by the rest of that tick.
///
/// Entries are held weakly: the set never keeps anything alive.
#[derive(Clone)]
pub(crate) struct ActiveSet {
    name: &'static str,
    state: Arc<Mutex<SetState>>,
}

#[derive(Default)]
struct SetState {
    /// Entries being ticked; `None` is a tombstone
    live: BTreeMap<u64, Option<Weak<dyn Tick>>>,
    added: BTreeMap<u64, Weak<dyn Tick>>,
    removed: BTreeSet<u64>,
}

impl ActiveSet {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            state: Arc::new(Mutex::new(SetState::default())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SetState> {
        self.state.lock().unwrap()
    }

    /// Stages an entry for addition at the next tick boundary
    pub fn add(&self, id: u64, item: Weak<dyn Tick>) {
        log::debug!("{}: adding {id}", self.name);
        let mut s = self.lock();
        s.removed.remove(&id);
        s.added.insert(id, item);
    }

    /// Stages an entry for removal, tombstoning it if it is live
    pub fn remove(&self, id: u64) {
        log::debug!("{}: removing {id}", self.name);
        let mut s = self.lock();
        s.added.remove(&id);
        if let Some(v) = s.live.get_mut(&id) {
            *v = None;
            s.removed.insert(id);
        }
    }

    /// Checks whether the given entry is live (i.e. will be ticked)
    pub fn contains(&self, id: u64) -> bool {
        matches!(self.lock().live.get(&id), Some(Some(..)))
    }

    /// Returns the number of live (non-tombstoned) entries
    pub fn len(&self) -> usize {
        self.lock().live.values().filter(|v| v.is_some()).count()
    }

    /// Checks whether there is nothing live or pending
    pub fn is_idle(&self) -> bool {
        let s = self.lock();
        s.added.is_empty() && s.live.values().all(Option::is_none)
    }

    /// Applies staged mutations, then ticks every live entry once
    ///
    /// The lock is not held while an entry is ticking, so entries may add or
    /// remove themselves (or others) freely.
    pub fn tick(&self) {
        let ids: Vec<u64> = {
            let mut s = self.lock();
            let SetState {
                live,
                added,
                removed,
            } = &mut *s;
            for id in std::mem::take(removed) {
                live.remove(&id);
            }
            for (id, item) in std::mem::take(added) {
                live.insert(id, Some(item));
            }
            live.keys().cloned().collect()
        };
        for id in ids {
            let item = self
                .lock()
                .live
                .get(&id)
                .cloned()
                .flatten()
                .and_then(|w| w.upgrade());
            if let Some(item) = item {
                item.tick();
            }
        }
    }
}

////////////////////////////////////////////////////////////////////////////////

/// The set of non-empty [`CommandQueue`]s
///
/// This is a cheap handle; clones refer to the same set.
#[derive(Clone)]
pub struct ActiveCommandQueues(pub(crate) ActiveSet);

impl Default for ActiveCommandQueues {
    fn default() -> Self {
        Self::new()
    }
}

impl ActiveCommandQueues {
    /// Builds a new, empty set
    pub fn new() -> Self {
        Self(ActiveSet::new("active queues"))
    }

    /// Ticks every queue which was live at the start of this call
    ///
    /// Queues which register during the tick are not ticked until the next
    /// call; queues which deregister during the tick are skipped.
    pub fn tick(&self) {
        self.0.tick()
    }

    /// Checks whether the given queue is currently live
    pub fn contains(&self, queue: &CommandQueue) -> bool {
        self.0.contains(queue.id())
    }

    /// Returns the number of live queues
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Checks whether there are no live or pending queues
    pub fn is_empty(&self) -> bool {
        self.0.is_idle()
    }
}
