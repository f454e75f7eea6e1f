//! Unstructured meshes made of grid objects ("grobs")
//!
//! A [`Mesh`] is a flat list of vertex positions plus, for each
//! [`GrobType`], a flat array of corner indices into that list.  Grobs of
//! mixed type and dimension may coexist in a single mesh.
//!
//! ```
//! use grobview::mesh::{GrobType, Mesh};
//! use nalgebra::Vector3;
//!
//! let mut m = Mesh::new();
//! let a = m.add_vertex(Vector3::new(0.0, 0.0, 0.0));
//! let b = m.add_vertex(Vector3::new(1.0, 0.0, 0.0));
//! let c = m.add_vertex(Vector3::new(0.0, 1.0, 0.0));
//! m.add_grob(GrobType::Triangle, &[a, b, c]).unwrap();
//! assert_eq!(m.num_triangles(), 1);
//! assert_eq!(m.grob(GrobType::Triangle, 0).corner(2), c);
//! ```
use enum_map::{Enum, EnumMap};
use nalgebra::{Point3, Vector3};
use strum::IntoEnumIterator;

use crate::{BoundingBox, Error};

mod input;
mod output;
mod refine;

pub use input::Format;
pub use refine::{refine, refine_triangles};

/// Type of a grid object
#[derive(
    Copy,
    Clone,
    Debug,
    Eq,
    PartialEq,
    Hash,
    Enum,
    strum::EnumIter,
    strum::Display,
)]
pub enum GrobType {
    /// Single point
    Vertex,
    /// Line segment
    Edge,
    /// Three-cornered face
    Triangle,
    /// Four-cornered face
    Quadrilateral,
    /// Four-cornered cell
    Tetrahedron,
    /// Five-cornered cell with a quadrilateral base
    Pyramid,
    /// Six-cornered cell with two triangular caps
    Prism,
    /// Eight-cornered cell
    Hexahedron,
}

impl GrobType {
    /// Returns the number of corners of this grob type
    pub const fn num_corners(self) -> usize {
        match self {
            GrobType::Vertex => 1,
            GrobType::Edge => 2,
            GrobType::Triangle => 3,
            GrobType::Quadrilateral => 4,
            GrobType::Tetrahedron => 4,
            GrobType::Pyramid => 5,
            GrobType::Prism => 6,
            GrobType::Hexahedron => 8,
        }
    }

    /// Returns the topological dimension of this grob type
    pub const fn dim(self) -> usize {
        match self {
            GrobType::Vertex => 0,
            GrobType::Edge => 1,
            GrobType::Triangle | GrobType::Quadrilateral => 2,
            GrobType::Tetrahedron
            | GrobType::Pyramid
            | GrobType::Prism
            | GrobType::Hexahedron => 3,
        }
    }

    /// Returns the name used in messages
    pub const fn name(self) -> &'static str {
        match self {
            GrobType::Vertex => "vertex",
            GrobType::Edge => "edge",
            GrobType::Triangle => "triangle",
            GrobType::Quadrilateral => "quadrilateral",
            GrobType::Tetrahedron => "tetrahedron",
            GrobType::Pyramid => "pyramid",
            GrobType::Prism => "prism",
            GrobType::Hexahedron => "hexahedron",
        }
    }

    /// Returns the boundary faces of a cell, as lists of local corners
    ///
    /// Faces are wound counter-clockwise when seen from outside the
    /// reference element.  Returns an empty slice for grobs of dimension
    /// below 3.
    pub const fn faces(self) -> &'static [&'static [usize]] {
        match self {
            GrobType::Vertex
            | GrobType::Edge
            | GrobType::Triangle
            | GrobType::Quadrilateral => &[],
            GrobType::Tetrahedron => {
                &[&[0, 2, 1], &[0, 1, 3], &[1, 2, 3], &[0, 3, 2]]
            }
            GrobType::Pyramid => &[
                &[0, 3, 2, 1],
                &[0, 1, 4],
                &[1, 2, 4],
                &[2, 3, 4],
                &[3, 0, 4],
            ],
            GrobType::Prism => &[
                &[0, 2, 1],
                &[3, 4, 5],
                &[0, 1, 4, 3],
                &[1, 2, 5, 4],
                &[2, 0, 3, 5],
            ],
            GrobType::Hexahedron => &[
                &[0, 3, 2, 1],
                &[4, 5, 6, 7],
                &[0, 1, 5, 4],
                &[1, 2, 6, 5],
                &[2, 3, 7, 6],
                &[3, 0, 4, 7],
            ],
        }
    }
}

/// Borrowed view of a single grob within a [`Mesh`]
#[derive(Copy, Clone, Debug)]
pub struct Grob<'a> {
    ty: GrobType,
    corners: &'a [usize],
}

impl Grob<'_> {
    /// Returns the grob's type
    pub fn grob_type(&self) -> GrobType {
        self.ty
    }

    /// Returns the number of corners
    pub fn num_corners(&self) -> usize {
        self.corners.len()
    }

    /// Returns the vertex index of the given corner
    ///
    /// # Panics
    /// If `i >= self.num_corners()`
    pub fn corner(&self, i: usize) -> usize {
        self.corners[i]
    }

    /// Returns every corner's vertex index
    pub fn corners(&self) -> &[usize] {
        self.corners
    }
}

/// An unstructured mesh
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Mesh {
    vertices: Vec<Vector3<f32>>,
    corners: EnumMap<GrobType, Vec<usize>>,
}

impl Mesh {
    /// Builds a new, empty mesh
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a vertex, returning its index
    pub fn add_vertex(&mut self, p: Vector3<f32>) -> usize {
        self.vertices.push(p);
        self.vertices.len() - 1
    }

    /// Adds a grob, returning its index among grobs of the same type
    ///
    /// Every corner must refer to an existing vertex.
    pub fn add_grob(
        &mut self,
        ty: GrobType,
        corners: &[usize],
    ) -> Result<usize, Error> {
        if corners.len() != ty.num_corners() {
            return Err(Error::BadCornerCount(
                corners.len(),
                ty.num_corners(),
            ));
        }
        if let Some(c) = corners.iter().find(|c| **c >= self.vertices.len()) {
            return Err(Error::BadCorner(*c, self.vertices.len()));
        }
        self.corners[ty].extend_from_slice(corners);
        Ok(self.num(ty) - 1)
    }

    /// Builds a mesh from vertices and raw corner arrays
    ///
    /// Each array is validated: its length must be a multiple of the grob
    /// type's corner count, and every index must be in range.
    pub fn from_parts(
        vertices: Vec<Vector3<f32>>,
        corners: EnumMap<GrobType, Vec<usize>>,
    ) -> Result<Self, Error> {
        for (ty, cs) in &corners {
            if cs.len() % ty.num_corners() != 0 {
                return Err(Error::BadCornerCount(cs.len(), ty.num_corners()));
            }
            if let Some(c) = cs.iter().find(|c| **c >= vertices.len()) {
                return Err(Error::BadCorner(*c, vertices.len()));
            }
        }
        Ok(Self { vertices, corners })
    }

    /// Returns vertex positions
    pub fn vertices(&self) -> &[Vector3<f32>] {
        &self.vertices
    }

    /// Returns the number of vertices
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Returns the number of grobs of the given type
    pub fn num(&self, ty: GrobType) -> usize {
        self.corners[ty].len() / ty.num_corners()
    }

    /// Returns the number of triangles
    pub fn num_triangles(&self) -> usize {
        self.num(GrobType::Triangle)
    }

    /// Returns the total number of grobs of every type
    pub fn num_grobs(&self) -> usize {
        GrobType::iter().map(|ty| self.num(ty)).sum()
    }

    /// Returns the raw corner array for a grob type
    pub fn corner_array(&self, ty: GrobType) -> &[usize] {
        &self.corners[ty]
    }

    /// Returns a view of the `i`th grob of the given type
    ///
    /// # Panics
    /// If `i >= self.num(ty)`
    pub fn grob(&self, ty: GrobType, i: usize) -> Grob<'_> {
        let n = ty.num_corners();
        Grob {
            ty,
            corners: &self.corners[ty][i * n..(i + 1) * n],
        }
    }

    /// Iterates over every grob of the given type
    pub fn grobs(&self, ty: GrobType) -> impl Iterator<Item = Grob<'_>> {
        self.corners[ty]
            .chunks_exact(ty.num_corners())
            .map(move |corners| Grob { ty, corners })
    }

    /// Returns the highest dimension of any grob in the mesh
    pub fn max_dim(&self) -> Option<usize> {
        GrobType::iter()
            .filter(|ty| self.num(*ty) > 0)
            .map(|ty| ty.dim())
            .max()
    }

    /// Returns the bounding box of every vertex, or `None` if the mesh has no
    /// vertices
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(self.vertices.iter().map(|v| Point3::from(*v)))
    }

    /// Returns the mesh's surface as a list of triangles
    ///
    /// Triangles are passed through, quadrilaterals are split along their
    /// `0-2` diagonal, and cells contribute every boundary face (faces shared
    /// between two cells are emitted twice).
    pub fn surface_triangles(&self) -> Vec<[usize; 3]> {
        let mut out = vec![];
        let mut push_face = |f: &[usize]| {
            for i in 1..f.len() - 1 {
                out.push([f[0], f[i], f[i + 1]]);
            }
        };
        for ty in GrobType::iter() {
            match ty.dim() {
                2 => self.grobs(ty).for_each(|g| push_face(g.corners())),
                3 => {
                    for g in self.grobs(ty) {
                        for face in ty.faces() {
                            let f: Vec<usize> =
                                face.iter().map(|i| g.corner(*i)).collect();
                            push_face(&f);
                        }
                    }
                }
                _ => (),
            }
        }
        out
    }
}
