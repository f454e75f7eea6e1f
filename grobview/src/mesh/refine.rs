//! Regular refinement of edges and faces
use super::{GrobType, Mesh};
use crate::Error;
use nalgebra::Vector3;
use std::collections::HashMap;

/// Output mesh under construction, with shared edge midpoints
struct Refiner<'a> {
    src: &'a Mesh,
    out: Mesh,
    midpoints: HashMap<(usize, usize), usize>,
}

impl Refiner<'_> {
    fn midpoint(&mut self, a: usize, b: usize) -> usize {
        let key = (a.min(b), a.max(b));
        if let Some(m) = self.midpoints.get(&key) {
            return *m;
        }
        let v = self.src.vertices();
        let m = self.out.add_vertex((v[a] + v[b]) / 2.0);
        self.midpoints.insert(key, m);
        m
    }

    fn centroid(&mut self, corners: &[usize]) -> usize {
        let v = self.src.vertices();
        let sum: Vector3<f32> = corners.iter().map(|c| v[*c]).sum();
        self.out.add_vertex(sum / corners.len() as f32)
    }

    fn push(&mut self, ty: GrobType, corners: &[usize]) -> Result<(), Error> {
        self.out.add_grob(ty, corners)?;
        Ok(())
    }
}

/// Performs one level of regular refinement
///
/// Vertices are kept, edges are split in two, and triangles and
/// quadrilaterals are split into four children with the parent's winding.
/// Midpoints of edges shared between grobs are only created once.
///
/// Returns [`Error::UnsupportedRefinement`] if the mesh contains cells.
pub fn refine(mesh: &Mesh) -> Result<Mesh, Error> {
    if let Some(ty) = [
        GrobType::Tetrahedron,
        GrobType::Pyramid,
        GrobType::Prism,
        GrobType::Hexahedron,
    ]
    .into_iter()
    .find(|ty| mesh.num(*ty) > 0)
    {
        return Err(Error::UnsupportedRefinement(ty.name()));
    }

    let mut r = Refiner {
        src: mesh,
        out: Mesh::new(),
        midpoints: HashMap::new(),
    };
    for v in mesh.vertices() {
        r.out.add_vertex(*v);
    }
    for g in mesh.grobs(GrobType::Vertex) {
        r.push(GrobType::Vertex, g.corners())?;
    }
    for g in mesh.grobs(GrobType::Edge) {
        let [a, b] = [g.corner(0), g.corner(1)];
        let m = r.midpoint(a, b);
        r.push(GrobType::Edge, &[a, m])?;
        r.push(GrobType::Edge, &[m, b])?;
    }
    for g in mesh.grobs(GrobType::Triangle) {
        let [a, b, c] = [g.corner(0), g.corner(1), g.corner(2)];
        let ab = r.midpoint(a, b);
        let bc = r.midpoint(b, c);
        let ca = r.midpoint(c, a);
        for t in [[a, ab, ca], [ab, b, bc], [ca, bc, c], [ab, bc, ca]] {
            r.push(GrobType::Triangle, &t)?;
        }
    }
    for g in mesh.grobs(GrobType::Quadrilateral) {
        let [a, b, c, d] = [g.corner(0), g.corner(1), g.corner(2), g.corner(3)];
        let ab = r.midpoint(a, b);
        let bc = r.midpoint(b, c);
        let cd = r.midpoint(c, d);
        let da = r.midpoint(d, a);
        let mid = r.centroid(g.corners());
        for q in [
            [a, ab, mid, da],
            [ab, b, bc, mid],
            [mid, bc, c, cd],
            [da, mid, cd, d],
        ] {
            r.push(GrobType::Quadrilateral, &q)?;
        }
    }
    Ok(r.out)
}

/// Refines the triangulated surface of a mesh
///
/// The result holds only triangles: faces are taken from
/// [`Mesh::surface_triangles`], so quadrilaterals and cell faces are
/// triangulated before being split.  Unlike [`refine`], this accepts meshes
/// with cells.
pub fn refine_triangles(mesh: &Mesh) -> Result<Mesh, Error> {
    let mut surface = Mesh::new();
    for v in mesh.vertices() {
        surface.add_vertex(*v);
    }
    for t in mesh.surface_triangles() {
        surface.add_grob(GrobType::Triangle, &t)?;
    }
    refine(&surface)
}

impl Mesh {
    /// Returns a copy of this mesh after one level of refinement
    ///
    /// See [`refine`] for details.
    pub fn refined(&self) -> Result<Mesh, Error> {
        refine(self)
    }
}
