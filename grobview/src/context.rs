//! Application-wide state shared by the pipeline and the scene
use nalgebra::Vector2;

use crate::{
    actor::ActiveActors,
    command::{ActiveCommandQueues, CommandFactory, ThreadCount, WorkerPool},
    scene::register_builtin,
};

/// Settings used to build an [`AppContext`] and its views
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Config {
    /// Number of worker threads for asynchronous commands
    pub threads: ThreadCount,
    /// Near and far clip distances
    pub clip: Vector2<f32>,
    /// Vertical field of view, in radians
    pub fov: f32,
    /// Viewport clear color (RGBA)
    pub background: [f32; 4],
}

impl Default for Config {
    fn default() -> Self {
        Self {
            threads: ThreadCount::default(),
            clip: Vector2::new(0.01, 1000.0),
            fov: std::f32::consts::FRAC_PI_4,
            background: [0.12, 0.12, 0.14, 1.0],
        }
    }
}

/// Registries which would otherwise be process-wide
///
/// The host builds one context at startup and calls [`AppContext::tick`] once
/// per frame.  Contexts are independent, so tests may build as many as they
/// like.
pub struct AppContext {
    config: Config,
    queues: ActiveCommandQueues,
    actors: ActiveActors,
    factory: CommandFactory,
    workers: WorkerPool,
}

impl Default for AppContext {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl AppContext {
    /// Builds a context, including its worker pool and built-in commands
    pub fn new(config: Config) -> Self {
        let workers = WorkerPool::new(config.threads);
        let mut factory = CommandFactory::new();
        register_builtin(&mut factory, &workers);
        log::debug!(
            "built context with {} commands, {} worker threads",
            factory.iter().count(),
            config.threads
        );
        Self {
            config,
            queues: ActiveCommandQueues::new(),
            actors: ActiveActors::new(),
            factory,
            workers,
        }
    }

    /// Drives every live actor, then every live command queue, by one step
    pub fn tick(&self) {
        self.actors.tick();
        self.queues.tick();
    }

    /// Checks whether no actor or queue has work left
    pub fn is_idle(&self) -> bool {
        self.actors.is_empty() && self.queues.is_empty()
    }

    /// Returns the configuration used to build this context
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the set of live command queues
    pub fn queues(&self) -> &ActiveCommandQueues {
        &self.queues
    }

    /// Returns the set of live actors
    pub fn actors(&self) -> &ActiveActors {
        &self.actors
    }

    /// Returns the command factory
    pub fn factory(&self) -> &CommandFactory {
        &self.factory
    }

    /// Returns the command factory, for registering more commands
    pub fn factory_mut(&mut self) -> &mut CommandFactory {
        &mut self.factory
    }

    /// Returns the worker pool used by asynchronous commands
    pub fn workers(&self) -> &WorkerPool {
        &self.workers
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        actor::Actor,
        command::{CommandQueue, GroupId, NoOp},
    };

    #[test]
    fn test_builtin_commands() {
        let ctx = AppContext::new(Config {
            threads: ThreadCount::One,
            ..Default::default()
        });
        let f = ctx.factory();
        assert_eq!(f.groups().get(GroupId::FileLoad).commands(), ["load"]);
        assert_eq!(
            f.groups().get(GroupId::FileSave).commands(),
            ["save_stl", "save_obj"]
        );
        assert_eq!(f.groups().get(GroupId::SceneMesh).commands(), ["refine"]);
        assert_eq!(
            f.groups().get(GroupId::Debug).commands(),
            ["noop", "barrier"]
        );
        assert!(ctx.workers().is_inline());
    }

    #[test]
    fn test_tick_drives_actors_and_queues() {
        let ctx = AppContext::new(Config {
            threads: ThreadCount::One,
            ..Default::default()
        });
        assert!(ctx.is_idle());
        let q = CommandQueue::new(ctx.queues());
        let a = Actor::new(ctx.actors());
        q.enqueue(NoOp);
        a.enqueue(NoOp);
        ctx.tick();
        ctx.tick();
        assert!(q.is_empty());
        assert!(a.is_idle());
        assert!(ctx.is_idle());
    }
}
