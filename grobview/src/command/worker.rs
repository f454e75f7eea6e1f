//! Worker pool for asynchronous command bodies
use crossbeam_channel::{Receiver, TryRecvError};
use std::sync::Arc;

/// Number of threads to use for asynchronous work
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ThreadCount {
    /// Perform all work inline, on the thread which dispatches it
    ///
    /// Asynchronous commands still obey the yield-then-poll protocol, so this
    /// is useful for deterministic tests.
    One,

    /// Spawn some number of worker threads
    Many(std::num::NonZeroUsize),
}

impl From<std::num::NonZeroUsize> for ThreadCount {
    fn from(v: std::num::NonZeroUsize) -> Self {
        match v.get() {
            0 => unreachable!(),
            1 => ThreadCount::One,
            _ => ThreadCount::Many(v),
        }
    }
}

/// Single-threaded mode is shown as `-`; otherwise, an integer
impl std::fmt::Display for ThreadCount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ThreadCount::One => write!(f, "-"),
            ThreadCount::Many(n) => write!(f, "{n}"),
        }
    }
}

impl ThreadCount {
    /// Gets the thread count
    ///
    /// Returns `None` if we are required to be single-threaded
    pub fn get(&self) -> Option<usize> {
        match self {
            ThreadCount::One => None,
            ThreadCount::Many(v) => Some(v.get()),
        }
    }
}

impl Default for ThreadCount {
    fn default() -> Self {
        Self::Many(std::num::NonZeroUsize::new(4).unwrap())
    }
}

#[derive(Clone)]
enum Pool {
    Inline,
    Global,
    Custom(Arc<rayon::ThreadPool>),
}

/// Handle to a pool of worker threads
///
/// Cloning the handle shares the underlying pool.
#[derive(Clone)]
pub struct WorkerPool {
    pool: Pool,
}

impl WorkerPool {
    /// Builds a pool with the given number of threads
    ///
    /// If a dedicated pool can't be built, falls back to rayon's global pool.
    pub fn new(threads: ThreadCount) -> Self {
        let pool = match threads.get() {
            None => Pool::Inline,
            Some(n) => match rayon::ThreadPoolBuilder::new()
                .num_threads(n)
                .thread_name(|i| format!("grobview-worker-{i}"))
                .build()
            {
                Ok(p) => Pool::Custom(Arc::new(p)),
                Err(e) => {
                    log::warn!(
                        "could not build worker pool ({e}); using global"
                    );
                    Pool::Global
                }
            },
        };
        Self { pool }
    }

    /// Builds a pool that runs every job inline
    pub fn inline() -> Self {
        Self { pool: Pool::Inline }
    }

    /// Checks whether jobs run inline
    pub fn is_inline(&self) -> bool {
        matches!(self.pool, Pool::Inline)
    }

    /// Dispatches `f` and returns a handle to its eventual result
    pub fn spawn<T, F>(&self, f: F) -> Job<T>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let run = move || {
            // The receiver is gone if the command was abandoned; that's fine
            let _ = tx.send(f());
        };
        match &self.pool {
            Pool::Inline => run(),
            Pool::Global => rayon::spawn(run),
            Pool::Custom(p) => p.spawn(run),
        }
        Job { rx }
    }
}

/// Pending result of work dispatched to a [`WorkerPool`]
pub struct Job<T> {
    rx: Receiver<T>,
}

impl<T> Job<T> {
    /// Returns the result if the worker has finished, without blocking
    ///
    /// # Panics
    /// If the worker dropped its sender without producing a result, which
    /// only happens if the job itself panicked.
    pub fn poll(&mut self) -> Option<T> {
        match self.rx.try_recv() {
            Ok(v) => Some(v),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                panic!("worker exited without producing a result")
            }
        }
    }
}
