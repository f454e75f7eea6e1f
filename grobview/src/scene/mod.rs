//! Scene tree and renderable content
//!
//! A scene is a tree of [`Node`]s.  Each node may own one [`Content`], which
//! knows its own bounding box, how to draw itself, and how to show itself in
//! the GUI; the node composes these over its children.
use crate::{
    BoundingBox,
    command::CommandFactory,
    render::{Gpu, View},
};

mod commands;
mod mesh_content;
mod node;

pub use commands::{LoadFromFile, Refine, SaveMesh, register_builtin};
pub use mesh_content::{MeshContent, MeshData, MeshHandle, MeshStatus};
pub use node::Node;

/// Polymorphic payload of a scene [`Node`]
///
/// Content is owned by the scene and lives on the GUI thread; work that
/// happens elsewhere must reach it through a weak handle (see
/// [`MeshHandle`]).
pub trait Content: Send {
    /// Returns a name for display
    fn name(&self) -> String;

    /// Returns the content's bounding box, or `None` if it's empty
    fn bounding_box(&self) -> Option<BoundingBox>;

    /// Draws the content
    fn render(&mut self, view: &View, gpu: &mut dyn Gpu);

    /// Checks whether [`do_imgui`](Content::do_imgui) draws anything
    fn has_imgui(&self) -> bool {
        false
    }

    /// Draws the content's properties panel
    fn do_imgui(&mut self, _ui: &mut egui::Ui) {}

    /// Draws menu entries for commands that apply to this content
    fn do_command_menu(
        &mut self,
        _ui: &mut egui::Ui,
        _factory: &CommandFactory,
    ) {
    }

    /// Returns a weak handle if this content holds a mesh
    fn mesh_handle(&self) -> Option<MeshHandle> {
        None
    }

    /// Releases GPU resources; called on the GPU thread before the content
    /// is dropped
    fn release(&mut self, _gpu: &mut dyn Gpu) {}
}
