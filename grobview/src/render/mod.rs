//! Camera math and GPU rendering
//!
//! Everything here runs on the thread which owns the GPU context.  Rendering
//! goes through the object-safe [`Gpu`] trait; [`GlowGpu`] implements it for
//! a `glow` context.
mod arcball;
mod camera;
mod gl;
pub(crate) mod gpu;
mod triangles;
mod view;

pub use arcball::ArcBall;
pub use camera::Camera;
pub use gl::{GlowGpu, GlowStore};
pub use gpu::{
    BindScope, Bindable, BufferData, BufferId, Gpu, ProgramId, VertexArrayId,
};
pub use triangles::{TriangleRenderer, vertex_data};
pub use view::{View, Viewport};
