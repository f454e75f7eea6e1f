//! Asynchronous commands which operate on a [`MeshContent`](super::MeshContent)
//!
//! Each command holds a weak [`MeshHandle`].  Heavy work is pushed onto a
//! [`WorkerPool`] from `on_run`, then polled on later ticks; the worker only
//! sees owned data, never the content itself.  If the content is dropped
//! while the command is pending, the command quietly finishes.
use std::{
    collections::HashMap,
    path::PathBuf,
    sync::{Arc, Mutex},
};

use log::{debug, info};

use super::mesh_content::{MeshHandle, MeshStatus, lock};
use crate::{
    Error,
    command::{
        Barrier, Command, CommandFactory, Execution, GroupId, Job, NoOp, Step,
        WorkerPool,
    },
    mesh::{Format, Mesh, refine_triangles},
};

/// Polls a pending job, or dispatches a new one built by `start`
///
/// `start` returns `None` if there's nothing to do, in which case the command
/// is finished.
fn drive<T, S, F>(job: &mut Option<Job<T>>, start: S, finish: F) -> Step
where
    S: FnOnce() -> Option<Job<T>>,
    F: FnOnce(T),
{
    match job {
        None => match start() {
            Some(j) => {
                *job = Some(j);
                Step::Yield
            }
            None => Step::Done,
        },
        Some(j) => match j.poll() {
            Some(out) => {
                finish(out);
                Step::Done
            }
            None => Step::Yield,
        },
    }
}

/// Reads a mesh file on a worker thread and installs it in the target
pub struct LoadFromFile {
    target: MeshHandle,
    path: PathBuf,
    workers: WorkerPool,
    job: Option<Job<Result<Mesh, Error>>>,
}

impl LoadFromFile {
    /// Builds a new load command
    pub fn new(target: MeshHandle, path: PathBuf, workers: WorkerPool) -> Self {
        Self {
            target,
            path,
            workers,
            job: None,
        }
    }
}

impl Command for LoadFromFile {
    fn name(&self) -> &str {
        "load"
    }

    fn execution(&self) -> Execution {
        Execution::Asynchronous
    }

    fn on_prepare(&mut self) -> Result<(), Error> {
        if let Some(data) = self.target.upgrade() {
            lock(&data).begin(MeshStatus::Loading);
        }
        Ok(())
    }

    fn on_run(&mut self) -> Step {
        let Self {
            target,
            path,
            workers,
            job,
        } = self;
        drive(
            job,
            || {
                if !target.is_alive() {
                    debug!("load target expired before dispatch");
                    return None;
                }
                let path = path.clone();
                Some(workers.spawn(move || Mesh::from_file(path)))
            },
            |result| {
                let Some(data) = target.upgrade() else {
                    debug!("load target expired; discarding result");
                    return;
                };
                let mut d = lock(&data);
                match result {
                    Ok(mesh) => {
                        info!(
                            "loaded {} ({} vertices, {} grobs)",
                            path.display(),
                            mesh.num_vertices(),
                            mesh.num_grobs()
                        );
                        d.set_mesh(mesh);
                        d.set_filename(path.clone());
                    }
                    Err(e) => d.fail(format!("Loading failed: {e}")),
                }
            },
        )
    }
}

/// Refines the target's mesh by one level on a worker thread
pub struct Refine {
    target: MeshHandle,
    workers: WorkerPool,
    job: Option<Job<Result<Mesh, Error>>>,
}

impl Refine {
    /// Builds a new refinement command
    pub fn new(target: MeshHandle, workers: WorkerPool) -> Self {
        Self {
            target,
            workers,
            job: None,
        }
    }
}

impl Command for Refine {
    fn name(&self) -> &str {
        "refine"
    }

    fn execution(&self) -> Execution {
        Execution::Asynchronous
    }

    fn on_prepare(&mut self) -> Result<(), Error> {
        let Some(data) = self.target.upgrade() else {
            return Ok(());
        };
        let mut d = lock(&data);
        if d.mesh().is_none() {
            d.fail(format!("Refining failed: {}", Error::NoMesh));
            return Err(Error::NoMesh);
        }
        d.begin(MeshStatus::Refining);
        Ok(())
    }

    fn on_run(&mut self) -> Step {
        let Self {
            target,
            workers,
            job,
        } = self;
        drive(
            job,
            || {
                let data = target.upgrade()?;
                let mesh: Arc<Mesh> = lock(&data).mesh()?.clone();
                Some(workers.spawn(move || refine_any(&mesh)))
            },
            |result| {
                let Some(data) = target.upgrade() else {
                    debug!("refine target expired; discarding result");
                    return;
                };
                let mut d = lock(&data);
                match result {
                    Ok(mesh) => {
                        info!(
                            "refined mesh to {} triangles",
                            mesh.num_triangles()
                        );
                        d.set_mesh(mesh);
                    }
                    Err(e) => d.fail(format!("Refining failed: {e}")),
                }
            },
        )
    }
}

/// Refines surfaces and lines in place; meshes with cells are reduced to
/// their refined surface
fn refine_any(mesh: &Mesh) -> Result<Mesh, Error> {
    if mesh.max_dim() == Some(3) {
        refine_triangles(mesh)
    } else {
        mesh.refined()
    }
}

/// Writes the target's mesh to a file on a worker thread
pub struct SaveMesh {
    target: MeshHandle,
    path: PathBuf,
    format: Format,
    workers: WorkerPool,
    job: Option<Job<Result<(), Error>>>,
}

impl SaveMesh {
    /// Builds a new save command
    pub fn new(
        target: MeshHandle,
        path: PathBuf,
        format: Format,
        workers: WorkerPool,
    ) -> Self {
        Self {
            target,
            path,
            format,
            workers,
            job: None,
        }
    }
}

impl Command for SaveMesh {
    fn name(&self) -> &str {
        match self.format {
            Format::Stl => "save_stl",
            Format::Obj => "save_obj",
        }
    }

    fn execution(&self) -> Execution {
        Execution::Asynchronous
    }

    fn on_prepare(&mut self) -> Result<(), Error> {
        let Some(data) = self.target.upgrade() else {
            return Ok(());
        };
        let mut d = lock(&data);
        if d.mesh().is_none() {
            d.fail(format!("Saving failed: {}", Error::NoMesh));
            return Err(Error::NoMesh);
        }
        d.begin(MeshStatus::Saving);
        Ok(())
    }

    fn on_run(&mut self) -> Step {
        let Self {
            target,
            path,
            format,
            workers,
            job,
        } = self;
        let format = *format;
        drive(
            job,
            || {
                let data = target.upgrade()?;
                let mesh = lock(&data).mesh()?.clone();
                let path = path.clone();
                Some(workers.spawn(move || {
                    let mut f = std::fs::File::create(&path)?;
                    match format {
                        Format::Stl => mesh.write_stl(&mut f),
                        Format::Obj => mesh.write_obj(&mut f),
                    }
                }))
            },
            |result| {
                let Some(data) = target.upgrade() else {
                    return;
                };
                let mut d = lock(&data);
                match result {
                    Ok(()) => {
                        info!("saved {}", path.display());
                        d.finish();
                    }
                    Err(e) => d.fail(format!("Saving failed: {e}")),
                }
            },
        )
    }
}

/// Registers the built-in commands with a factory
///
/// Asynchronous commands capture a handle to `workers`.
pub fn register_builtin(factory: &mut CommandFactory, workers: &WorkerPool) {
    let w = workers.clone();
    factory
        .add_command(
            "load",
            GroupId::FileLoad,
            move |(target, path): (MeshHandle, String)| {
                LoadFromFile::new(target, path.into(), w.clone())
            },
        )
        .help("Loads a mesh from an OBJ or STL file")
        .arg("target", "Mesh content to fill")
        .arg("path", "File to read");

    for format in [Format::Stl, Format::Obj] {
        let w = workers.clone();
        let (name, help) = match format {
            Format::Stl => ("save_stl", "Saves the mesh surface as binary STL"),
            Format::Obj => ("save_obj", "Saves the mesh as Wavefront OBJ"),
        };
        factory
            .add_command(
                name,
                GroupId::FileSave,
                move |(target, path): (MeshHandle, String)| {
                    SaveMesh::new(target, path.into(), format, w.clone())
                },
            )
            .help(help)
            .arg("target", "Mesh content to save")
            .arg("path", "File to write");
    }

    let w = workers.clone();
    factory
        .add_command(
            "refine",
            GroupId::SceneMesh,
            move |(target,): (MeshHandle,)| Refine::new(target, w.clone()),
        )
        .help(
            "Splits every edge, triangle, and quad; \
             meshes with cells are reduced to their refined surface",
        )
        .arg("target", "Mesh content to refine");

    factory
        .add_command("noop", GroupId::Debug, |()| NoOp)
        .help("Does nothing");
    // Barriers built with the same key share a counter
    let joins: Mutex<HashMap<i64, Barrier>> = Mutex::new(HashMap::new());
    factory
        .add_command("barrier", GroupId::Debug, move |(key,): (i64,)| {
            let mut joins = joins.lock().unwrap_or_else(|e| e.into_inner());
            joins.entry(key).or_default().sibling()
        })
        .help("Waits for barriers with the same key on other queues")
        .arg("key", "Barriers with the same key wait for each other");
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        command::{ArgValue, CommandQueue},
        mesh::{GrobType, test::two_triangles},
        scene::MeshData,
    };

    fn tick_until_empty(q: &CommandQueue) -> usize {
        let mut n = 0;
        while !q.is_empty() {
            q.tick();
            n += 1;
            assert!(n < 1000, "queue never drained");
        }
        n
    }

    fn target(mesh: Option<Mesh>) -> (Arc<Mutex<MeshData>>, MeshHandle) {
        let data = Arc::new(Mutex::new(MeshData::default()));
        if let Some(m) = mesh {
            lock(&data).set_mesh(m);
        }
        let h = MeshHandle(Arc::downgrade(&data));
        (data, h)
    }

    #[test]
    fn test_refine_inline() {
        let (data, h) = target(Some(two_triangles()));
        let q = CommandQueue::detached();
        q.enqueue(Refine::new(h, WorkerPool::inline()));
        q.tick();
        assert_eq!(lock(&data).status(), MeshStatus::Refining);
        assert_eq!(tick_until_empty(&q), 2);
        let d = lock(&data);
        assert_eq!(d.status(), MeshStatus::Idle);
        assert_eq!(d.mesh().unwrap().num_triangles(), 8);
        assert_eq!(d.revision(), 2);
    }

    #[test]
    fn test_refine_without_mesh_fails() {
        let (data, h) = target(None);
        let q = CommandQueue::detached();
        q.enqueue(Refine::new(h, WorkerPool::inline()));
        tick_until_empty(&q);
        let d = lock(&data);
        assert_eq!(d.status(), MeshStatus::Idle);
        assert!(d.error().unwrap().starts_with("Refining failed"));
    }

    #[test]
    fn test_refine_cells_as_surface() {
        let mut m = Mesh::new();
        for p in [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]] {
            m.add_vertex(p.into());
        }
        m.add_vertex([0.0, 0.0, 1.0].into());
        m.add_grob(GrobType::Tetrahedron, &[0, 1, 2, 3]).unwrap();

        let (data, h) = target(Some(m));
        let q = CommandQueue::detached();
        q.enqueue(Refine::new(h, WorkerPool::inline()));
        tick_until_empty(&q);
        let d = lock(&data);
        assert!(d.error().is_none(), "{:?}", d.error());
        let mesh = d.mesh().unwrap();
        assert_eq!(mesh.num_triangles(), 16);
        assert_eq!(mesh.num(GrobType::Tetrahedron), 0);
    }

    #[test]
    fn test_load_failure_sets_status() {
        let (data, h) = target(None);
        let q = CommandQueue::detached();
        q.enqueue(LoadFromFile::new(
            h,
            "/nonexistent/grobview.obj".into(),
            WorkerPool::inline(),
        ));
        tick_until_empty(&q);
        let d = lock(&data);
        assert!(d.mesh().is_none());
        assert!(d.error().unwrap().starts_with("Loading failed: "));
        assert_eq!(d.status(), MeshStatus::Idle);
    }

    #[test]
    fn test_save_and_reload() {
        let path = std::env::temp_dir()
            .join(format!("grobview-save-{}.obj", std::process::id()));
        let (data, h) = target(Some(two_triangles()));
        let q = CommandQueue::detached();
        q.enqueue(SaveMesh::new(
            h.clone(),
            path.clone(),
            Format::Obj,
            WorkerPool::inline(),
        ));
        q.enqueue(LoadFromFile::new(h, path.clone(), WorkerPool::inline()));
        tick_until_empty(&q);
        let d = lock(&data);
        assert!(d.error().is_none(), "{:?}", d.error());
        assert_eq!(d.mesh().unwrap().num_triangles(), 2);
        assert_eq!(d.filename(), Some(path.as_path()));
        drop(d);
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_expired_target_is_noop() {
        let (data, h) = target(Some(two_triangles()));
        let q = CommandQueue::detached();
        q.enqueue(Refine::new(h, WorkerPool::inline()));
        q.tick();
        drop(data);
        assert_eq!(tick_until_empty(&q), 1);
    }

    #[test]
    fn test_factory_builds_commands() {
        let mut f = CommandFactory::new();
        register_builtin(&mut f, &WorkerPool::inline());
        let (_data, h) = target(None);
        let cmd = f
            .create(
                "save_obj",
                vec![
                    ArgValue::MeshContent(h.clone()),
                    ArgValue::String("out.obj".to_owned()),
                ],
            )
            .unwrap();
        assert_eq!(cmd.name(), "save_obj");
        assert_eq!(cmd.execution(), Execution::Asynchronous);
        let cmd = f.create("refine", vec![ArgValue::MeshContent(h)]).unwrap();
        assert_eq!(cmd.name(), "refine");
        assert!(matches!(
            f.create("refine", vec![ArgValue::Bool(true)]),
            Err(Error::BadArgKind { index: 0, .. })
        ));
    }

    #[test]
    fn test_factory_barriers_join_by_key() {
        let mut f = CommandFactory::new();
        register_builtin(&mut f, &WorkerPool::inline());
        let barrier =
            |k| f.create("barrier", vec![ArgValue::Integer(k)]).unwrap();

        let q1 = CommandQueue::detached();
        let q2 = CommandQueue::detached();
        let q3 = CommandQueue::detached();
        q1.enqueue_boxed(barrier(7));
        q2.enqueue(NoOp);
        q2.enqueue(NoOp);
        q2.enqueue_boxed(barrier(7));
        q3.enqueue_boxed(barrier(8));

        let tick_all = || {
            for q in [&q1, &q2, &q3] {
                q.tick();
            }
        };
        for _ in 0..3 {
            tick_all();
        }
        // Key 8 has no siblings; key 7 waits for the second queue
        assert!(q3.is_empty());
        assert_eq!(q1.len(), 1);
        assert_eq!(q2.len(), 1);

        tick_all();
        assert!(q1.is_empty());
        assert!(q2.is_empty());
    }
}
