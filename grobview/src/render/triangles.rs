//! Shaded triangle rendering for meshes
use log::{debug, error};
use nalgebra::{Matrix4, Vector3, Vector4};

use super::{
    View,
    gpu::{
        BindScope, Bindable, BufferData, BufferId, Gpu, ProgramId,
        VertexArrayId,
    },
};
use crate::{Error, mesh::Mesh};

const VERTEX_SHADER: &str = r#"#version 330
uniform mat4 view_proj;
layout(location = 0) in vec3 pos;
layout(location = 1) in vec3 normal;
out vec3 v_normal;
void main() {
    gl_Position = view_proj * vec4(pos, 1.0);
    v_normal = normal;
}
"#;

const FRAGMENT_SHADER: &str = r#"#version 330
uniform mat4 view;
uniform vec4 color;
in vec3 v_normal;
out vec4 frag_color;
void main() {
    vec3 n = normalize((view * vec4(v_normal, 0.0)).xyz);
    float d = 0.25 + 0.75 * abs(n.z);
    frag_color = vec4(color.rgb * d, color.a);
}
"#;

/// Floats per vertex: position then normal
const STRIDE: usize = 6;

/// Builds interleaved `[position, normal]` vertex data and triangle indices
///
/// Normals are per-vertex, averaged from the (area-weighted) normals of the
/// surrounding triangles.
pub fn vertex_data(mesh: &Mesh) -> (Vec<f32>, Vec<u32>) {
    let tris = mesh.surface_triangles();
    let verts = mesh.vertices();
    let mut normals = vec![Vector3::<f32>::zeros(); verts.len()];
    for t in &tris {
        let [a, b, c] = t.map(|i| verts[i]);
        let n = (b - a).cross(&(c - a));
        for i in t {
            normals[*i] += n;
        }
    }
    let data = verts
        .iter()
        .zip(&normals)
        .flat_map(|(p, n)| {
            let n = n.try_normalize(0.0).unwrap_or_else(Vector3::z);
            [p.x, p.y, p.z, n.x, n.y, n.z]
        })
        .collect();
    let indices = tris.iter().flatten().map(|i| *i as u32).collect();
    (data, indices)
}

struct Buffers {
    program: ProgramId,
    vao: VertexArrayId,
    vbo: BufferId,
    ibo: BufferId,
    count: usize,
    revision: u64,
}

enum State {
    Empty,
    Ready(Buffers),
    Failed,
}

/// Draws the surface of a [`Mesh`] with simple headlight shading
///
/// GPU resources are created lazily on the first draw, and recreated when
/// the mesh's revision changes.  If the GPU reports an error, the renderer
/// logs it and becomes inoperative; later draws do nothing.
pub struct TriangleRenderer {
    state: State,
    color: [f32; 4],
}

impl Default for TriangleRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl TriangleRenderer {
    /// Builds a renderer with no GPU resources yet
    pub fn new() -> Self {
        Self {
            state: State::Empty,
            color: [0.8, 0.8, 0.85, 1.0],
        }
    }

    /// Returns the surface color
    pub fn color(&self) -> [f32; 4] {
        self.color
    }

    /// Sets the surface color
    pub fn set_color(&mut self, color: [f32; 4]) {
        self.color = color;
    }

    /// Checks whether the renderer can still draw
    pub fn is_operational(&self) -> bool {
        !matches!(self.state, State::Failed)
    }

    /// Draws a mesh, uploading it first if `revision` has changed
    pub fn draw(
        &mut self,
        gpu: &mut dyn Gpu,
        view: &View,
        mesh: &Mesh,
        revision: u64,
    ) {
        let stale = match &self.state {
            State::Failed => return,
            State::Ready(b) => b.revision != revision,
            State::Empty => true,
        };
        if stale {
            let old = std::mem::replace(&mut self.state, State::Empty);
            let program = match old {
                State::Ready(b) => {
                    release_buffers(gpu, &b);
                    Some(b.program)
                }
                _ => None,
            };
            match upload(gpu, program, mesh, revision) {
                Ok(b) => {
                    debug!("uploaded {} triangle corners", b.count);
                    self.state = State::Ready(b);
                }
                Err(e) => {
                    error!("triangle renderer disabled: {e}");
                    self.state = State::Failed;
                    return;
                }
            }
        }
        let State::Ready(b) = &self.state else {
            unreachable!()
        };
        if b.count == 0 {
            return;
        }

        let mut gpu = BindScope::new(gpu, Bindable::Program(b.program));
        let view_matrix = view.camera().view_matrix();
        let view_proj: Matrix4<f32> = view.view_projection();
        gpu.set_uniform_mat4(b.program, "view_proj", &view_proj);
        gpu.set_uniform_mat4(b.program, "view", &view_matrix);
        gpu.set_uniform_vec4(b.program, "color", &Vector4::from(self.color));

        let mut gpu = BindScope::new(&mut *gpu, Bindable::VertexArray(b.vao));
        // The index buffer binding lives in the VAO; bind it explicitly in
        // case another renderer replaced it
        let mut gpu = BindScope::new(&mut *gpu, Bindable::IndexBuffer(b.ibo));
        gpu.draw_triangles(b.count);
    }

    /// Releases every GPU resource
    pub fn release(&mut self, gpu: &mut dyn Gpu) {
        if let State::Ready(b) =
            std::mem::replace(&mut self.state, State::Empty)
        {
            release_buffers(gpu, &b);
            gpu.delete(Bindable::Program(b.program));
        }
    }
}

fn release_buffers(gpu: &mut dyn Gpu, b: &Buffers) {
    gpu.delete(Bindable::VertexArray(b.vao));
    gpu.delete(Bindable::VertexBuffer(b.vbo));
    gpu.delete(Bindable::IndexBuffer(b.ibo));
}

fn create_objects(
    gpu: &mut dyn Gpu,
    data: &[f32],
    indices: &[u32],
    created: &mut Vec<Bindable>,
) -> Result<(BufferId, BufferId, VertexArrayId), Error> {
    let vbo = gpu.create_buffer(BufferData::Vertices(data))?;
    created.push(Bindable::VertexBuffer(vbo));
    let ibo = gpu.create_buffer(BufferData::Indices(indices))?;
    created.push(Bindable::IndexBuffer(ibo));
    let vao = gpu.create_vertex_array()?;
    Ok((vbo, ibo, vao))
}

fn upload(
    gpu: &mut dyn Gpu,
    program: Option<ProgramId>,
    mesh: &Mesh,
    revision: u64,
) -> Result<Buffers, Error> {
    let program = match program {
        Some(p) => p,
        None => gpu.create_program(VERTEX_SHADER, FRAGMENT_SHADER)?,
    };
    let (data, indices) = vertex_data(mesh);

    // Everything created so far, deleted if a later step fails
    let mut created = vec![Bindable::Program(program)];
    let (vbo, ibo, vao) =
        match create_objects(gpu, &data, &indices, &mut created) {
            Ok(v) => v,
            Err(e) => {
                for b in created.into_iter().rev() {
                    gpu.delete(b);
                }
                return Err(e);
            }
        };
    {
        let mut gpu = BindScope::new(gpu, Bindable::VertexArray(vao));
        let mut gpu = BindScope::new(&mut *gpu, Bindable::VertexBuffer(vbo));
        gpu.vertex_attrib(0, 3, STRIDE as i32, 0);
        gpu.vertex_attrib(1, 3, STRIDE as i32, 3);
    }
    Ok(Buffers {
        program,
        vao,
        vbo,
        ibo,
        count: indices.len(),
        revision,
    })
}
