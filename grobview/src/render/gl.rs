//! [`Gpu`] implementation on top of `glow`
use glow::HasContext;
use nalgebra::{Matrix4, Vector4};

use super::gpu::{
    Bindable, BufferData, BufferId, Gpu, ProgramId, VertexArrayId,
};
use crate::Error;

/// Slab of GL objects, indexed by [`Gpu`] ids
///
/// The store outlives individual frames; a [`GlowGpu`] borrows it together
/// with the GL context for the duration of a paint callback.
#[derive(Default)]
pub struct GlowStore {
    programs: Vec<Option<glow::Program>>,
    buffers: Vec<Option<glow::Buffer>>,
    arrays: Vec<Option<glow::VertexArray>>,
}

fn insert<T>(slab: &mut Vec<Option<T>>, t: T) -> usize {
    if let Some(i) = slab.iter().position(Option::is_none) {
        slab[i] = Some(t);
        i
    } else {
        slab.push(Some(t));
        slab.len() - 1
    }
}

fn get<T: Copy>(slab: &[Option<T>], i: usize) -> Option<T> {
    slab.get(i).copied().flatten()
}

impl GlowStore {
    /// Builds an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Releases every object in the store
    pub fn destroy(&mut self, gl: &glow::Context) {
        unsafe {
            for p in self.programs.drain(..).flatten() {
                gl.delete_program(p);
            }
            for b in self.buffers.drain(..).flatten() {
                gl.delete_buffer(b);
            }
            for a in self.arrays.drain(..).flatten() {
                gl.delete_vertex_array(a);
            }
        }
    }
}

/// A GL context plus the object store, for one frame
pub struct GlowGpu<'a> {
    gl: &'a glow::Context,
    store: &'a mut GlowStore,
}

impl<'a> GlowGpu<'a> {
    /// Wraps a GL context and an object store
    pub fn new(gl: &'a glow::Context, store: &'a mut GlowStore) -> Self {
        Self { gl, store }
    }

    fn compile(&self, kind: u32, src: &str) -> Result<glow::Shader, Error> {
        unsafe {
            let shader =
                self.gl.create_shader(kind).map_err(Error::ShaderCompile)?;
            self.gl.shader_source(shader, src);
            self.gl.compile_shader(shader);
            if self.gl.get_shader_compile_status(shader) {
                Ok(shader)
            } else {
                let log = self.gl.get_shader_info_log(shader);
                self.gl.delete_shader(shader);
                Err(Error::ShaderCompile(log))
            }
        }
    }
}

impl Gpu for GlowGpu<'_> {
    fn create_program(
        &mut self,
        vertex: &str,
        fragment: &str,
    ) -> Result<ProgramId, Error> {
        let vs = self.compile(glow::VERTEX_SHADER, vertex)?;
        let fs = match self.compile(glow::FRAGMENT_SHADER, fragment) {
            Ok(fs) => fs,
            Err(e) => {
                unsafe { self.gl.delete_shader(vs) };
                return Err(e);
            }
        };
        let gl = self.gl;
        let program = unsafe {
            let program = gl.create_program().map_err(Error::ShaderLink)?;
            gl.attach_shader(program, vs);
            gl.attach_shader(program, fs);
            gl.link_program(program);
            for s in [vs, fs] {
                gl.detach_shader(program, s);
                gl.delete_shader(s);
            }
            if !gl.get_program_link_status(program) {
                let log = gl.get_program_info_log(program);
                gl.delete_program(program);
                return Err(Error::ShaderLink(log));
            }
            program
        };
        Ok(ProgramId(insert(&mut self.store.programs, program)))
    }

    fn create_buffer(&mut self, data: BufferData) -> Result<BufferId, Error> {
        let (target, bytes): (u32, Vec<u8>) = match data {
            BufferData::Vertices(v) => (
                glow::ARRAY_BUFFER,
                v.iter().flat_map(|f| f.to_ne_bytes()).collect(),
            ),
            BufferData::Indices(i) => (
                glow::ELEMENT_ARRAY_BUFFER,
                i.iter().flat_map(|f| f.to_ne_bytes()).collect(),
            ),
        };
        let buf = unsafe {
            let buf = self.gl.create_buffer().map_err(Error::GpuAlloc)?;
            self.gl.bind_buffer(target, Some(buf));
            self.gl.buffer_data_u8_slice(target, &bytes, glow::STATIC_DRAW);
            self.gl.bind_buffer(target, None);
            buf
        };
        Ok(BufferId(insert(&mut self.store.buffers, buf)))
    }

    fn create_vertex_array(&mut self) -> Result<VertexArrayId, Error> {
        let vao = unsafe {
            self.gl.create_vertex_array().map_err(Error::GpuAlloc)?
        };
        Ok(VertexArrayId(insert(&mut self.store.arrays, vao)))
    }

    fn bind(&mut self, b: Bindable) {
        let s = &self.store;
        unsafe {
            match b {
                Bindable::Program(p) => {
                    self.gl.use_program(get(&s.programs, p.0));
                }
                Bindable::VertexArray(a) => {
                    self.gl.bind_vertex_array(get(&s.arrays, a.0));
                }
                Bindable::VertexBuffer(v) => self
                    .gl
                    .bind_buffer(glow::ARRAY_BUFFER, get(&s.buffers, v.0)),
                Bindable::IndexBuffer(i) => self.gl.bind_buffer(
                    glow::ELEMENT_ARRAY_BUFFER,
                    get(&s.buffers, i.0),
                ),
            }
        }
    }

    fn unbind(&mut self, b: Bindable) {
        unsafe {
            match b {
                Bindable::Program(..) => self.gl.use_program(None),
                Bindable::VertexArray(..) => self.gl.bind_vertex_array(None),
                Bindable::VertexBuffer(..) => {
                    self.gl.bind_buffer(glow::ARRAY_BUFFER, None)
                }
                Bindable::IndexBuffer(..) => {
                    self.gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, None)
                }
            }
        }
    }

    fn delete(&mut self, b: Bindable) {
        let s = &mut self.store;
        unsafe {
            match b {
                Bindable::Program(p) => {
                    let slot = s.programs.get_mut(p.0);
                    if let Some(p) = slot.and_then(Option::take) {
                        self.gl.delete_program(p);
                    }
                }
                Bindable::VertexArray(a) => {
                    let slot = s.arrays.get_mut(a.0);
                    if let Some(a) = slot.and_then(Option::take) {
                        self.gl.delete_vertex_array(a);
                    }
                }
                Bindable::VertexBuffer(v) | Bindable::IndexBuffer(v) => {
                    let slot = s.buffers.get_mut(v.0);
                    if let Some(v) = slot.and_then(Option::take) {
                        self.gl.delete_buffer(v);
                    }
                }
            }
        }
    }

    fn vertex_attrib(
        &mut self,
        index: u32,
        size: i32,
        stride: i32,
        offset: i32,
    ) {
        const F: i32 = std::mem::size_of::<f32>() as i32;
        unsafe {
            self.gl.enable_vertex_attrib_array(index);
            self.gl.vertex_attrib_pointer_f32(
                index,
                size,
                glow::FLOAT,
                false,
                stride * F,
                offset * F,
            );
        }
    }

    fn set_uniform_mat4(&mut self, p: ProgramId, name: &str, m: &Matrix4<f32>) {
        let Some(program) = get(&self.store.programs, p.0) else {
            return;
        };
        unsafe {
            let loc = self.gl.get_uniform_location(program, name);
            self.gl
                .uniform_matrix_4_f32_slice(loc.as_ref(), false, m.as_slice());
        }
    }

    fn set_uniform_vec4(&mut self, p: ProgramId, name: &str, v: &Vector4<f32>) {
        let Some(program) = get(&self.store.programs, p.0) else {
            return;
        };
        unsafe {
            let loc = self.gl.get_uniform_location(program, name);
            self.gl.uniform_4_f32(loc.as_ref(), v.x, v.y, v.z, v.w);
        }
    }

    fn draw_triangles(&mut self, count: usize) {
        unsafe {
            self.gl.draw_elements(
                glow::TRIANGLES,
                count as i32,
                glow::UNSIGNED_INT,
                0,
            );
        }
    }

    fn set_depth_test(&mut self, enabled: bool) {
        unsafe {
            if enabled {
                self.gl.enable(glow::DEPTH_TEST);
                self.gl.depth_func(glow::LEQUAL);
            } else {
                self.gl.disable(glow::DEPTH_TEST);
            }
        }
    }

    fn clear(&mut self, color: Option<[f32; 4]>, depth: bool) {
        let mut mask = 0;
        unsafe {
            if let Some([r, g, b, a]) = color {
                self.gl.clear_color(r, g, b, a);
                mask |= glow::COLOR_BUFFER_BIT;
            }
            if depth {
                self.gl.depth_mask(true);
                mask |= glow::DEPTH_BUFFER_BIT;
            }
            if mask != 0 {
                self.gl.clear(mask);
            }
        }
    }

    fn read_depth(&mut self, x: i32, y: i32) -> Option<f32> {
        let mut out = [0u8; 4];
        unsafe {
            self.gl.read_pixels(
                x,
                y,
                1,
                1,
                glow::DEPTH_COMPONENT,
                glow::FLOAT,
                glow::PixelPackData::Slice(&mut out),
            );
            if self.gl.get_error() != glow::NO_ERROR {
                return None;
            }
        }
        Some(f32::from_ne_bytes(out))
    }
}
