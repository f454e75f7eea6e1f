//! Narrow interface to the GPU
//!
//! Rendering code talks to the [`Gpu`] trait rather than to a concrete
//! graphics API, so that it can be exercised without a window.  Resources are
//! referred to by small integer ids, which the implementation maps to its own
//! handles.
use nalgebra::{Matrix4, Vector4};

use crate::Error;

/// Handle to a linked shader program
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct ProgramId(pub usize);

/// Handle to a vertex or index buffer
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct BufferId(pub usize);

/// Handle to a vertex array object
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct VertexArrayId(pub usize);

/// Contents of a buffer to upload
#[derive(Copy, Clone, Debug)]
pub enum BufferData<'a> {
    /// Interleaved vertex attributes
    Vertices(&'a [f32]),
    /// Triangle corner indices
    Indices(&'a [u32]),
}

/// A GPU object which can be bound
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Bindable {
    /// Shader program (`glUseProgram`)
    Program(ProgramId),
    /// Vertex array object
    VertexArray(VertexArrayId),
    /// Vertex attribute buffer
    VertexBuffer(BufferId),
    /// Element (index) buffer
    IndexBuffer(BufferId),
}

/// Object-safe interface to a GPU context
///
/// Every function must be called from the thread which owns the context.
pub trait Gpu {
    /// Compiles and links a program from vertex and fragment shader source
    fn create_program(
        &mut self,
        vertex: &str,
        fragment: &str,
    ) -> Result<ProgramId, Error>;

    /// Allocates a buffer and uploads data into it
    fn create_buffer(&mut self, data: BufferData) -> Result<BufferId, Error>;

    /// Allocates an empty vertex array object
    fn create_vertex_array(&mut self) -> Result<VertexArrayId, Error>;

    /// Binds an object
    fn bind(&mut self, b: Bindable);

    /// Unbinds whatever object is bound at `b`'s binding point
    fn unbind(&mut self, b: Bindable);

    /// Releases an object
    fn delete(&mut self, b: Bindable);

    /// Describes a float attribute within the bound vertex buffer
    ///
    /// `stride` and `offset` are in floats, not bytes.
    fn vertex_attrib(
        &mut self,
        index: u32,
        size: i32,
        stride: i32,
        offset: i32,
    );

    /// Sets a 4×4 matrix uniform on the bound program
    fn set_uniform_mat4(&mut self, p: ProgramId, name: &str, m: &Matrix4<f32>);

    /// Sets a 4-vector uniform on the bound program
    fn set_uniform_vec4(&mut self, p: ProgramId, name: &str, v: &Vector4<f32>);

    /// Draws `count` indices from the bound index buffer as triangles
    fn draw_triangles(&mut self, count: usize);

    /// Enables or disables depth testing
    fn set_depth_test(&mut self, enabled: bool);

    /// Clears the color buffer (if a color is given) and the depth buffer
    /// (if `depth` is true)
    fn clear(&mut self, color: Option<[f32; 4]>, depth: bool);

    /// Reads the depth buffer at a single pixel, in window coordinates
    ///
    /// Returns a value in `[0, 1]`, or `None` if the pixel can't be read.
    fn read_depth(&mut self, x: i32, y: i32) -> Option<f32>;
}

/// Guard which binds an object on construction and unbinds it on drop
///
/// The guard dereferences to the GPU, so it can be used (and nested) in
/// place of it:
///
/// ```ignore
/// let mut gpu = BindScope::new(gpu, Bindable::Program(p));
/// let mut gpu = BindScope::new(&mut *gpu, Bindable::VertexArray(v));
/// gpu.draw_triangles(n);
/// // unbinds the vertex array, then the program
/// ```
pub struct BindScope<'a, G: Gpu + ?Sized> {
    gpu: &'a mut G,
    target: Bindable,
}

impl<'a, G: Gpu + ?Sized> BindScope<'a, G> {
    /// Binds `target` until the returned guard is dropped
    pub fn new(gpu: &'a mut G, target: Bindable) -> Self {
        gpu.bind(target);
        Self { gpu, target }
    }
}

impl<G: Gpu + ?Sized> std::ops::Deref for BindScope<'_, G> {
    type Target = G;
    fn deref(&self) -> &G {
        self.gpu
    }
}

impl<G: Gpu + ?Sized> std::ops::DerefMut for BindScope<'_, G> {
    fn deref_mut(&mut self) -> &mut G {
        self.gpu
    }
}

impl<G: Gpu + ?Sized> Drop for BindScope<'_, G> {
    fn drop(&mut self) {
        self.gpu.unbind(self.target);
    }
}

/// [`Gpu`] which records every call, for tests
#[cfg(test)]
pub(crate) mod recording {
    use super::*;

    #[derive(Default)]
    pub(crate) struct RecordingGpu {
        pub calls: Vec<String>,
        pub next_id: usize,
        pub fail_programs: bool,
        pub fail_vertex_arrays: bool,
        pub depth: Option<f32>,
    }

    impl RecordingGpu {
        fn id(&mut self) -> usize {
            self.next_id += 1;
            self.next_id
        }

        /// Returns (and clears) calls whose text starts with `prefix`
        pub fn take(&mut self, prefix: &str) -> Vec<String> {
            let (out, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.calls)
                .into_iter()
                .partition(|c| c.starts_with(prefix));
            self.calls = rest;
            out
        }
    }

    impl Gpu for RecordingGpu {
        fn create_program(
            &mut self,
            _v: &str,
            _f: &str,
        ) -> Result<ProgramId, Error> {
            if self.fail_programs {
                self.calls.push("create_program failed".to_owned());
                return Err(Error::ShaderCompile("no GPU".to_owned()));
            }
            let id = self.id();
            self.calls.push(format!("create_program {id}"));
            Ok(ProgramId(id))
        }
        fn create_buffer(
            &mut self,
            data: BufferData,
        ) -> Result<BufferId, Error> {
            let id = self.id();
            let n = match data {
                BufferData::Vertices(v) => v.len(),
                BufferData::Indices(i) => i.len(),
            };
            self.calls.push(format!("create_buffer {id} {n}"));
            Ok(BufferId(id))
        }
        fn create_vertex_array(&mut self) -> Result<VertexArrayId, Error> {
            if self.fail_vertex_arrays {
                self.calls.push("create_vertex_array failed".to_owned());
                return Err(Error::GpuAlloc("no vertex arrays".to_owned()));
            }
            let id = self.id();
            self.calls.push(format!("create_vertex_array {id}"));
            Ok(VertexArrayId(id))
        }
        fn bind(&mut self, b: Bindable) {
            self.calls.push(format!("bind {b:?}"));
        }
        fn unbind(&mut self, b: Bindable) {
            self.calls.push(format!("unbind {b:?}"));
        }
        fn delete(&mut self, b: Bindable) {
            self.calls.push(format!("delete {b:?}"));
        }
        fn vertex_attrib(&mut self, i: u32, size: i32, stride: i32, off: i32) {
            self.calls
                .push(format!("vertex_attrib {i} {size} {stride} {off}"));
        }
        fn set_uniform_mat4(
            &mut self,
            _: ProgramId,
            n: &str,
            _: &Matrix4<f32>,
        ) {
            self.calls.push(format!("uniform {n}"));
        }
        fn set_uniform_vec4(
            &mut self,
            _: ProgramId,
            n: &str,
            _: &Vector4<f32>,
        ) {
            self.calls.push(format!("uniform {n}"));
        }
        fn draw_triangles(&mut self, count: usize) {
            self.calls.push(format!("draw {count}"));
        }
        fn set_depth_test(&mut self, enabled: bool) {
            self.calls.push(format!("depth_test {enabled}"));
        }
        fn clear(&mut self, color: Option<[f32; 4]>, depth: bool) {
            self.calls.push(format!("clear {} {depth}", color.is_some()));
        }
        fn read_depth(&mut self, x: i32, y: i32) -> Option<f32> {
            self.calls.push(format!("read_depth {x} {y}"));
            self.depth
        }
    }
}
