//! Scene content holding a single mesh
use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard, Weak},
};

use log::{info, warn};
use strum::IntoEnumIterator;

use super::{Content, LoadFromFile, Refine, SaveMesh};
use crate::{
    AppContext, BoundingBox, Error,
    command::{ArgKind, ArgValue, CommandFactory, CommandQueue, GroupId},
    mesh::{Format, GrobType, Mesh},
    render::{Gpu, TriangleRenderer, View},
};

/// What a [`MeshContent`] is currently busy with
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, strum::Display)]
pub enum MeshStatus {
    /// Not waiting on any command
    #[default]
    Idle,
    /// A file is being read
    Loading,
    /// The mesh is being refined
    Refining,
    /// The mesh is being written to disk
    Saving,
}

/// State shared between a [`MeshContent`] and the commands targeting it
#[derive(Debug, Default)]
pub struct MeshData {
    mesh: Option<Arc<Mesh>>,
    bbox: Option<BoundingBox>,
    filename: Option<PathBuf>,
    status: MeshStatus,
    error: Option<String>,
    revision: u64,
}

impl MeshData {
    /// Returns the current mesh, if one is loaded
    pub fn mesh(&self) -> Option<&Arc<Mesh>> {
        self.mesh.as_ref()
    }

    /// Returns the bounding box of the current mesh
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        self.bbox
    }

    /// Returns the file from which the mesh was loaded
    pub fn filename(&self) -> Option<&Path> {
        self.filename.as_deref()
    }

    /// Returns the current status
    pub fn status(&self) -> MeshStatus {
        self.status
    }

    /// Returns the message from the most recent failure, if any
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Returns a counter which changes whenever the mesh is replaced
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Replaces the mesh, recomputing its bounding box and returning to idle
    pub(crate) fn set_mesh(&mut self, mesh: Mesh) {
        self.bbox = mesh.bounding_box();
        self.mesh = Some(Arc::new(mesh));
        self.revision += 1;
        self.status = MeshStatus::Idle;
        self.error = None;
    }

    pub(crate) fn set_filename(&mut self, path: PathBuf) {
        self.filename = Some(path);
    }

    pub(crate) fn begin(&mut self, status: MeshStatus) {
        self.status = status;
        self.error = None;
    }

    /// Records a failure and returns to idle
    pub(crate) fn fail(&mut self, msg: String) {
        warn!("{msg}");
        self.error = Some(msg);
        self.status = MeshStatus::Idle;
    }

    /// Returns to idle without touching the mesh or error
    pub(crate) fn finish(&mut self) {
        self.status = MeshStatus::Idle;
    }
}

/// Weak handle to a [`MeshContent`]'s shared data
///
/// Commands hold this instead of the content itself; if the content has been
/// dropped by the time they run, [`MeshHandle::upgrade`] returns `None` and
/// the command does nothing.
#[derive(Clone, Debug)]
pub struct MeshHandle(pub(crate) Weak<Mutex<MeshData>>);

impl MeshHandle {
    /// Returns a strong reference, if the content is still alive
    pub fn upgrade(&self) -> Option<Arc<Mutex<MeshData>>> {
        self.0.upgrade()
    }

    /// Checks whether the content is still alive
    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }

    /// Builds a handle which never upgrades
    pub fn dangling() -> Self {
        Self(Weak::new())
    }
}

/// Locks shared mesh data, ignoring poisoning
///
/// Workers never hold this lock, so a poisoned lock only means that a
/// GUI-thread panic is already unwinding.
pub(crate) fn lock(data: &Mutex<MeshData>) -> MutexGuard<'_, MeshData> {
    data.lock().unwrap_or_else(|e| e.into_inner())
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
enum Tab {
    #[default]
    Info,
    Grobs,
    Bounds,
}

/// Scene content which draws a single [`Mesh`]
///
/// Each content owns a command queue, so that its loads, refinements, and
/// saves run in order without blocking other contents.
pub struct MeshContent {
    name: String,
    data: Arc<Mutex<MeshData>>,
    renderer: TriangleRenderer,
    queue: CommandQueue,
    workers: crate::command::WorkerPool,
    tab: Tab,
}

impl MeshContent {
    /// Builds an empty mesh content
    pub fn new(ctx: &AppContext, name: &str) -> Self {
        Self {
            name: name.to_owned(),
            data: Arc::new(Mutex::new(MeshData::default())),
            renderer: TriangleRenderer::new(),
            queue: CommandQueue::new(ctx.queues()),
            workers: ctx.workers().clone(),
            tab: Tab::default(),
        }
    }

    /// Builds a mesh content which already holds a mesh
    pub fn from_mesh(ctx: &AppContext, name: &str, mesh: Mesh) -> Self {
        let out = Self::new(ctx, name);
        lock(&out.data).set_mesh(mesh);
        out
    }

    /// Loads a mesh from a file immediately, on the calling thread
    ///
    /// The content is named after the file's stem.
    pub fn from_file<P: AsRef<Path>>(
        ctx: &AppContext,
        path: P,
    ) -> Result<Self, Error> {
        let path = path.as_ref();
        let mesh = Mesh::from_file(path)?;
        info!(
            "loaded {} ({} vertices, {} grobs)",
            path.display(),
            mesh.num_vertices(),
            mesh.num_grobs()
        );
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "mesh".to_owned());
        let out = Self::from_mesh(ctx, &name, mesh);
        lock(&out.data).set_filename(path.to_owned());
        Ok(out)
    }

    /// Returns a weak handle to this content's data
    pub fn handle(&self) -> MeshHandle {
        MeshHandle(Arc::downgrade(&self.data))
    }

    /// Returns the queue on which this content's commands run
    pub fn queue(&self) -> &CommandQueue {
        &self.queue
    }

    /// Locks and returns the content's shared data
    pub fn data(&self) -> MutexGuard<'_, MeshData> {
        lock(&self.data)
    }

    /// Enqueues an asynchronous load from the given file
    pub fn load<P: Into<PathBuf>>(&self, path: P) {
        self.queue.enqueue(LoadFromFile::new(
            self.handle(),
            path.into(),
            self.workers.clone(),
        ));
    }

    /// Enqueues one level of asynchronous refinement
    pub fn refine(&self) {
        self.queue
            .enqueue(Refine::new(self.handle(), self.workers.clone()));
    }

    /// Enqueues an asynchronous save in the given format
    pub fn save<P: Into<PathBuf>>(&self, path: P, format: Format) {
        self.queue.enqueue(SaveMesh::new(
            self.handle(),
            path.into(),
            format,
            self.workers.clone(),
        ));
    }

    fn info_tab(&self, ui: &mut egui::Ui, d: &MeshData) {
        egui::Grid::new("info").num_columns(2).show(ui, |ui| {
            ui.label("File");
            match d.filename() {
                Some(f) => ui.label(f.display().to_string()),
                None => ui.weak("(none)"),
            };
            ui.end_row();
            ui.label("Status");
            ui.label(d.status().to_string());
            ui.end_row();
            ui.label("Vertices");
            let n = d.mesh().map(|m| m.num_vertices()).unwrap_or(0);
            ui.label(n.to_string());
            ui.end_row();
        });
        if !self.renderer.is_operational() {
            ui.colored_label(egui::Color32::YELLOW, "Renderer disabled");
        }
    }

    fn grobs_tab(ui: &mut egui::Ui, d: &MeshData) {
        let Some(mesh) = d.mesh() else {
            ui.weak("No mesh loaded");
            return;
        };
        egui::Grid::new("grobs")
            .num_columns(2)
            .striped(true)
            .show(ui, |ui| {
                for ty in GrobType::iter() {
                    ui.label(ty.name());
                    ui.label(mesh.num(ty).to_string());
                    ui.end_row();
                }
            });
    }

    fn bounds_tab(ui: &mut egui::Ui, d: &MeshData) {
        let Some(b) = d.bounding_box() else {
            ui.weak("Empty");
            return;
        };
        egui::Grid::new("bounds").num_columns(4).show(ui, |ui| {
            ui.label("");
            for axis in ["x", "y", "z"] {
                ui.label(axis);
            }
            ui.end_row();
            for (label, p) in [("min", b.min()), ("max", b.max())] {
                ui.label(label);
                for i in 0..3 {
                    ui.label(format!("{:.4}", p[i]));
                }
                ui.end_row();
            }
        });
    }
}

impl Content for MeshContent {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn bounding_box(&self) -> Option<BoundingBox> {
        self.data().bounding_box()
    }

    fn render(&mut self, view: &View, gpu: &mut dyn Gpu) {
        let (mesh, revision) = {
            let d = lock(&self.data);
            (d.mesh.clone(), d.revision)
        };
        if let Some(mesh) = mesh {
            self.renderer.draw(gpu, view, &mesh, revision);
        }
    }

    fn has_imgui(&self) -> bool {
        true
    }

    fn do_imgui(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.selectable_value(&mut self.tab, Tab::Info, "Info");
            ui.selectable_value(&mut self.tab, Tab::Grobs, "Grobs");
            ui.selectable_value(&mut self.tab, Tab::Bounds, "Bounds");
        });
        ui.separator();
        let data = self.data.clone();
        let d = lock(&data);
        match self.tab {
            Tab::Info => self.info_tab(ui, &d),
            Tab::Grobs => Self::grobs_tab(ui, &d),
            Tab::Bounds => Self::bounds_tab(ui, &d),
        }
        if let Some(e) = d.error() {
            ui.colored_label(egui::Color32::RED, e);
        }
    }

    fn do_command_menu(
        &mut self,
        ui: &mut egui::Ui,
        factory: &CommandFactory,
    ) {
        let group = factory.groups().get(GroupId::SceneMesh);
        for name in group.commands() {
            let Some(entry) = factory.get(name) else {
                continue;
            };
            let [arg] = entry.args() else {
                continue;
            };
            if arg.kind != ArgKind::MeshContent {
                continue;
            }
            let button = ui.button(name);
            let button = if entry.help().is_empty() {
                button
            } else {
                button.on_hover_text(entry.help())
            };
            if button.clicked() {
                match entry.build(vec![ArgValue::MeshContent(self.handle())]) {
                    Ok(cmd) => self.queue.enqueue_boxed(cmd),
                    Err(e) => warn!("could not build {name}: {e}"),
                }
                ui.close_menu();
            }
        }
    }

    fn mesh_handle(&self) -> Option<MeshHandle> {
        Some(self.handle())
    }

    fn release(&mut self, gpu: &mut dyn Gpu) {
        self.renderer.release(gpu);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        Config,
        command::ThreadCount,
        mesh::test::two_triangles,
        render::gpu::recording::RecordingGpu,
    };

    fn ctx() -> AppContext {
        AppContext::new(Config {
            threads: ThreadCount::One,
            ..Default::default()
        })
    }

    #[test]
    fn test_handle_expires_with_content() {
        let ctx = ctx();
        let c = MeshContent::new(&ctx, "m");
        let h = c.handle();
        assert!(h.is_alive());
        assert!(h.upgrade().is_some());
        drop(c);
        assert!(!h.is_alive());
        assert!(h.upgrade().is_none());
        assert!(MeshHandle::dangling().upgrade().is_none());
    }

    #[test]
    fn test_from_mesh() {
        let ctx = ctx();
        let c = MeshContent::from_mesh(&ctx, "tris", two_triangles());
        assert_eq!(c.name(), "tris");
        let b = c.bounding_box().unwrap();
        assert_eq!(b.max(), nalgebra::Point3::new(1.0, 1.0, 0.5));
        let d = c.data();
        assert_eq!(d.status(), MeshStatus::Idle);
        assert_eq!(d.revision(), 1);
        assert_eq!(d.mesh().unwrap().num_triangles(), 2);
    }

    #[test]
    fn test_empty_content_has_no_bbox() {
        let ctx = ctx();
        let mut c = MeshContent::new(&ctx, "empty");
        assert!(c.bounding_box().is_none());
        let mut gpu = RecordingGpu::default();
        let view = View::new(
            Default::default(),
            Default::default(),
            nalgebra::Vector2::new(0.1, 10.0),
            1.0,
        );
        c.render(&view, &mut gpu);
        assert!(gpu.calls.is_empty());
    }

    #[test]
    fn test_from_file_missing() {
        let ctx = ctx();
        let r = MeshContent::from_file(&ctx, "/nonexistent/mesh.obj");
        assert!(matches!(r, Err(Error::IoError(..))));
    }

    #[test]
    fn test_fail_records_error() {
        let mut d = MeshData::default();
        d.begin(MeshStatus::Loading);
        d.fail("Loading failed: oops".to_owned());
        assert_eq!(d.status(), MeshStatus::Idle);
        assert_eq!(d.error(), Some("Loading failed: oops"));
        d.set_mesh(two_triangles());
        assert!(d.error().is_none());
    }

    #[test]
    fn test_imgui_tabs_headless() {
        let ctx = ctx();
        let mut c = MeshContent::from_mesh(&ctx, "m", two_triangles());
        let egui_ctx = egui::Context::default();
        for tab in [Tab::Info, Tab::Grobs, Tab::Bounds] {
            c.tab = tab;
            let _ = egui_ctx.run(egui::RawInput::default(), |ectx| {
                egui::CentralPanel::default().show(ectx, |ui| {
                    c.do_imgui(ui);
                    c.do_command_menu(ui, ctx.factory());
                });
            });
            assert_eq!(c.tab, tab);
        }
        // Nothing was clicked
        assert!(c.queue().is_empty());
    }
}
