use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use clap::Parser;
use eframe::egui;
use env_logger::Env;
use log::{info, warn};

use grobview::{
    AppContext, Config,
    command::{CommandQueue, GroupId, ThreadCount},
    editor::{EguiInput, Editor, EventListener, SceneEditor},
    render::{GlowGpu, GlowStore},
    scene::{MeshContent, MeshHandle, Node},
};

mod menu;

/// Mesh viewer
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Mesh files (`.obj` or `.stl`) to load at startup
    files: Vec<PathBuf>,

    /// Number of worker threads to use
    #[clap(short, long)]
    threads: Option<NonZeroUsize>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .init();
    let args = Args::parse();

    let ctx = AppContext::new(Config {
        threads: args.threads.map(ThreadCount::from).unwrap_or_default(),
        ..Default::default()
    });

    let mut options = eframe::NativeOptions {
        depth_buffer: 24,
        ..Default::default()
    };
    let size = egui::Vec2::new(1024.0, 768.0);
    options.viewport.inner_size = Some(size);

    eframe::run_native(
        "grobview",
        options,
        Box::new(move |_cc| Ok(Box::new(ViewerApp::new(ctx, &args.files)))),
    )
    .map_err(|e| anyhow!("{e}"))?;

    Ok(())
}

////////////////////////////////////////////////////////////////////////////////

fn stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "mesh".to_owned())
}

struct ViewerApp {
    ctx: AppContext,

    /// Shared with the paint callback, which runs on the GPU thread
    editor: Arc<Mutex<SceneEditor>>,
    store: Arc<Mutex<GlowStore>>,

    /// Queue for commands launched from the menu bar
    queue: CommandQueue,

    /// Path used by commands which take a file name
    path: String,

    /// Frame the scene once startup loads have finished
    frame_pending: bool,
}

impl ViewerApp {
    fn new(ctx: AppContext, files: &[PathBuf]) -> Self {
        let mut editor = SceneEditor::new(ctx.config());
        for f in files {
            let content = MeshContent::new(&ctx, &stem(f));
            content.load(f);
            editor
                .root_mut()
                .add_child(Node::with_content(Box::new(content)));
        }
        let queue = CommandQueue::new(ctx.queues());
        Self {
            ctx,
            editor: Arc::new(Mutex::new(editor)),
            store: Arc::new(Mutex::new(GlowStore::new())),
            queue,
            path: String::new(),
            frame_pending: !files.is_empty(),
        }
    }

    /// Builds and enqueues a command picked from the menu bar
    ///
    /// Load commands target a new mesh content; other mesh commands target
    /// every selected mesh, or every mesh if nothing is selected.
    fn run_command(&mut self, name: &str) {
        let Some(entry) = self.ctx.factory().get(name) else {
            return;
        };
        let mut editor = self.editor.lock().unwrap();
        let targets: Vec<MeshHandle> = if entry.group() == GroupId::FileLoad {
            let content =
                MeshContent::new(&self.ctx, &stem(Path::new(&self.path)));
            let h = content.handle();
            editor
                .root_mut()
                .add_child(Node::with_content(Box::new(content)));
            self.frame_pending = true;
            vec![h]
        } else {
            let mut s = editor.root().selected_meshes();
            if s.is_empty() {
                editor.root().traverse(|n| {
                    s.extend(n.content().and_then(|c| c.mesh_handle()))
                });
            }
            s
        };

        let takes_mesh = entry
            .args()
            .iter()
            .any(|a| a.kind == grobview::command::ArgKind::MeshContent);
        let targets: Vec<Option<&MeshHandle>> = if takes_mesh {
            targets.iter().map(Some).collect()
        } else {
            vec![None]
        };
        for t in targets {
            let cmd = menu::args_for(entry, t, &self.path)
                .and_then(|args| Ok(entry.build(args)?));
            match cmd {
                Ok(cmd) => {
                    info!("enqueueing {name}");
                    self.queue.enqueue_boxed(cmd);
                }
                Err(e) => warn!("could not run {name}: {e}"),
            }
        }
    }

    fn draw_menu(&mut self, ctx: &egui::Context) {
        let mut clicked = None;
        egui::TopBottomPanel::top("menu").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                clicked = menu::draw(ui, self.ctx.factory());
                ui.separator();
                ui.label("Path:");
                ui.text_edit_singleline(&mut self.path);
            });
            self.editor.lock().unwrap().do_toolbar(ui);
        });
        if let Some(name) = clicked {
            self.run_command(&name);
        }
    }

    fn draw_scene_panel(&mut self, ctx: &egui::Context) {
        egui::SidePanel::left("scene").show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                let mut editor = self.editor.lock().unwrap();
                editor.do_scene_panel(ui);
                ui.separator();
                let factory = self.ctx.factory();
                editor.root_mut().traverse_mut(|n| {
                    if let Some(c) = n.content_mut() {
                        ui.menu_button(c.name(), |ui| {
                            c.do_command_menu(ui, factory)
                        });
                    }
                });
            });
        });
    }

    fn draw_viewport(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| {
                let rect = ui.max_rect();
                let response =
                    ui.allocate_rect(rect, egui::Sense::click_and_drag());

                let ppp = ctx.pixels_per_point();
                let input =
                    EguiInput::new(ppp, ctx.screen_rect().height() * ppp);
                {
                    let mut editor = self.editor.lock().unwrap();
                    editor.set_viewport(input.viewport(rect));
                    if response.hovered() || editor.is_dragging() {
                        let mut events = ctx.input(|i| i.events.clone());
                        if ctx.wants_keyboard_input() {
                            events.retain(|e| {
                                !matches!(
                                    e,
                                    egui::Event::Key { .. }
                                        | egui::Event::Text(..)
                                )
                            });
                        }
                        input.forward(&events, &mut *editor);
                    }
                }

                let editor = self.editor.clone();
                let store = self.store.clone();
                let cb = eframe::egui_glow::CallbackFn::new(
                    move |_info, painter| {
                        let mut store = store.lock().unwrap();
                        let mut gpu = GlowGpu::new(painter.gl(), &mut store);
                        editor.lock().unwrap().render(&mut gpu);
                    },
                );
                ui.painter().add(egui::PaintCallback {
                    rect,
                    callback: Arc::new(cb),
                });
            });
    }
}

impl eframe::App for ViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.ctx.tick();
        if self.frame_pending && self.ctx.is_idle() {
            self.editor.lock().unwrap().frame_all();
            self.frame_pending = false;
        }

        self.draw_menu(ctx);
        self.draw_scene_panel(ctx);
        self.draw_viewport(ctx);

        // Keep ticking while commands are in flight
        if !self.ctx.is_idle() {
            ctx.request_repaint();
        }
    }

    fn on_exit(&mut self, gl: Option<&eframe::glow::Context>) {
        let Some(gl) = gl else {
            return;
        };
        let mut store = self.store.lock().unwrap();
        {
            let mut gpu = GlowGpu::new(gl, &mut store);
            self.editor.lock().unwrap().release(&mut gpu);
        }
        store.destroy(gl);
    }
}
