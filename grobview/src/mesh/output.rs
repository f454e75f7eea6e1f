//! Mesh output implementation
use super::{GrobType, Mesh, input::Format};
use std::{
    io::{BufWriter, Write},
    path::Path,
};

impl Mesh {
    /// Writes the mesh to a file, picking the format from its extension
    pub fn write_file<P: AsRef<Path>>(
        &self,
        path: P,
    ) -> Result<(), crate::Error> {
        let path = path.as_ref();
        let format = Format::from_path(path)?;
        let mut f = std::fs::File::create(path)?;
        match format {
            Format::Obj => self.write_obj(&mut f),
            Format::Stl => self.write_stl(&mut f),
        }
    }

    /// Writes the mesh's surface as a binary STL to the given output
    ///
    /// Only the triangles from [`Mesh::surface_triangles`] are written;
    /// vertex and edge grobs have no STL representation.
    pub fn write_stl<F: std::io::Write>(
        &self,
        out: &mut F,
    ) -> Result<(), crate::Error> {
        // Many small writes, typically to a file
        let mut out = BufWriter::new(out);
        const HEADER: &[u8] = b"This is a binary STL file exported by grobview";
        static_assertions::const_assert!(HEADER.len() <= 80);
        out.write_all(HEADER)?;
        out.write_all(&[0u8; 80 - HEADER.len()])?;
        let tris = self.surface_triangles();
        out.write_all(&(tris.len() as u32).to_le_bytes())?;
        for t in &tris {
            let [a, b, c] = t.map(|i| self.vertices[i]);
            let normal = (b - a).cross(&(c - a));
            let normal = normal.try_normalize(0.0).unwrap_or(normal);
            for p in &normal {
                out.write_all(&p.to_le_bytes())?;
            }
            for v in [a, b, c] {
                for p in &v {
                    out.write_all(&p.to_le_bytes())?;
                }
            }
            out.write_all(&[0u8; std::mem::size_of::<u16>()])?; // attributes
        }
        out.flush()?;
        Ok(())
    }

    /// Writes the mesh as a Wavefront OBJ to the given output
    ///
    /// Vertices, edges and faces are preserved.  OBJ has no notion of cells,
    /// so volume grobs are skipped with a warning.
    pub fn write_obj<F: std::io::Write>(
        &self,
        out: &mut F,
    ) -> Result<(), crate::Error> {
        let mut out = BufWriter::new(out);
        writeln!(out, "# exported by grobview")?;
        for v in &self.vertices {
            writeln!(out, "v {} {} {}", v.x, v.y, v.z)?;
        }
        for (ty, tag) in [
            (GrobType::Vertex, "p"),
            (GrobType::Edge, "l"),
            (GrobType::Triangle, "f"),
            (GrobType::Quadrilateral, "f"),
        ] {
            for g in self.grobs(ty) {
                write!(out, "{tag}")?;
                for c in g.corners() {
                    write!(out, " {}", c + 1)?;
                }
                writeln!(out)?;
            }
        }
        let skipped: usize = [
            GrobType::Tetrahedron,
            GrobType::Pyramid,
            GrobType::Prism,
            GrobType::Hexahedron,
        ]
        .into_iter()
        .map(|ty| self.num(ty))
        .sum();
        if skipped > 0 {
            log::warn!("skipped {skipped} volume grobs when writing OBJ");
        }
        out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mesh::test::two_triangles;

    #[test]
    fn test_stl_export() {
        let mut m = two_triangles();
        m.add_grob(GrobType::Quadrilateral, &[0, 1, 3, 2]).unwrap();
        let mut buf = vec![];
        m.write_stl(&mut buf).unwrap();
        assert_eq!(buf.len(), 84 + 50 * 4);
        assert_eq!(u32::from_le_bytes([buf[80], buf[81], buf[82], buf[83]]), 4);

        let back = Mesh::read_stl(&buf).unwrap();
        assert_eq!(back.num_triangles(), 4);
        assert_eq!(back.num_vertices(), 4);
        assert_eq!(back.bounding_box(), m.bounding_box());
    }

    #[test]
    fn test_obj_export_keeps_grobs() {
        let mut m = two_triangles();
        m.add_grob(GrobType::Edge, &[0, 3]).unwrap();
        m.add_grob(GrobType::Vertex, &[2]).unwrap();
        let mut buf = vec![];
        m.write_obj(&mut buf).unwrap();
        let text = String::from_utf8(buf.clone()).unwrap();
        assert!(text.contains("\nf 2 4 3\n"));
        assert!(text.contains("\nl 1 4\n"));

        let back = Mesh::read_obj(buf.as_slice()).unwrap();
        assert_eq!(back, m);
    }
}
