//! Mesh input implementation
use super::{GrobType, Mesh};
use crate::Error;
use nalgebra::Vector3;
use std::{
    collections::HashMap,
    io::{BufRead, BufReader, Read},
    path::Path,
};

/// Mesh file formats that can be read and written
#[derive(Copy, Clone, Debug, Eq, PartialEq, strum::Display)]
pub enum Format {
    /// Wavefront OBJ
    Obj,
    /// Stereolithography (binary or ASCII)
    Stl,
}

impl Format {
    /// Picks a format from a file extension (case-insensitive)
    pub fn from_path(path: &Path) -> Result<Self, Error> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("obj") => Ok(Format::Obj),
            Some("stl") => Ok(Format::Stl),
            _ => Err(Error::UnsupportedFormat(path.display().to_string())),
        }
    }
}

fn parse_error(line: usize, msg: impl Into<String>) -> Error {
    Error::ParseError {
        line,
        msg: msg.into(),
    }
}

impl Mesh {
    /// Loads a mesh from a file, picking the format from its extension
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        let format = Format::from_path(path)?;
        let f = std::fs::File::open(path)?;
        let mesh = match format {
            Format::Obj => Self::read_obj(BufReader::new(f))?,
            Format::Stl => {
                let mut data = vec![];
                BufReader::new(f).read_to_end(&mut data)?;
                Self::read_stl(&data)?
            }
        };
        log::debug!(
            "read {} vertices and {} grobs from {path:?}",
            mesh.num_vertices(),
            mesh.num_grobs()
        );
        Ok(mesh)
    }

    /// Reads a Wavefront OBJ file
    ///
    /// Points (`p`), polylines (`l`) and polygonal faces (`f`) are read;
    /// faces with more than four corners are fan-triangulated.  Texture and
    /// normal references (`v/vt/vn`) are ignored, and negative indices count
    /// back from the most recent vertex.  Other statements are skipped.
    pub fn read_obj<R: BufRead>(reader: R) -> Result<Self, Error> {
        let mut mesh = Mesh::new();
        let mut grobs: Vec<(usize, GrobType, Vec<usize>)> = vec![];
        for (i, line) in reader.lines().enumerate() {
            let lineno = i + 1;
            let line = line?;
            let line = line.split('#').next().unwrap_or("");
            let mut words = line.split_whitespace();
            let Some(tag) = words.next() else {
                continue;
            };
            match tag {
                "v" => {
                    let mut xyz = [0.0f32; 3];
                    for v in &mut xyz {
                        let w = words.next().ok_or_else(|| {
                            parse_error(lineno, "short vertex")
                        })?;
                        *v = w.parse().map_err(|e| {
                            parse_error(lineno, format!("bad coordinate: {e}"))
                        })?;
                    }
                    mesh.add_vertex(xyz.into());
                }
                "f" | "l" | "p" => {
                    let n = mesh.num_vertices();
                    let corners = words
                        .map(|w| obj_index(w, n, lineno))
                        .collect::<Result<Vec<_>, _>>()?;
                    match (tag, corners.len()) {
                        ("p", _) => grobs.extend(
                            corners
                                .iter()
                                .map(|c| (lineno, GrobType::Vertex, vec![*c])),
                        ),
                        ("l", 2..) => grobs.extend(corners.windows(2).map(
                            |w| (lineno, GrobType::Edge, w.to_vec()),
                        )),
                        ("f", 3) => {
                            grobs.push((lineno, GrobType::Triangle, corners))
                        }
                        ("f", 4) => grobs.push((
                            lineno,
                            GrobType::Quadrilateral,
                            corners,
                        )),
                        ("f", 5..) => {
                            for w in corners[1..].windows(2) {
                                let t = vec![corners[0], w[0], w[1]];
                                grobs.push((lineno, GrobType::Triangle, t));
                            }
                        }
                        (_, n) => {
                            return Err(parse_error(
                                lineno,
                                format!("{tag:?} statement with {n} corners"),
                            ));
                        }
                    }
                }
                _ => (),
            }
        }
        for (lineno, ty, corners) in grobs {
            mesh.add_grob(ty, &corners)
                .map_err(|e| parse_error(lineno, e.to_string()))?;
        }
        Ok(mesh)
    }

    /// Reads an STL file, detecting whether it's binary or ASCII
    ///
    /// Vertices with bitwise-identical coordinates are merged.
    pub fn read_stl(data: &[u8]) -> Result<Self, Error> {
        let is_binary = data.len() >= 84 && {
            let n = [data[80], data[81], data[82], data[83]];
            84 + 50 * u32::from_le_bytes(n) as usize == data.len()
        };
        if is_binary || !data.starts_with(b"solid") {
            read_binary_stl(data)
        } else {
            read_ascii_stl(data)
        }
    }
}

/// Converts a 1-indexed (or negative, relative) OBJ index to a vertex index
fn obj_index(
    word: &str,
    num_verts: usize,
    line: usize,
) -> Result<usize, Error> {
    let s = word.split('/').next().unwrap_or("");
    let i: i64 = s
        .parse()
        .map_err(|e| parse_error(line, format!("bad index {word:?}: {e}")))?;
    let out = match i {
        0 => None,
        i if i > 0 => Some(i as usize - 1),
        i => num_verts.checked_sub(i.unsigned_abs() as usize),
    };
    out.ok_or_else(|| parse_error(line, format!("index {i} is out of range")))
}

/// Accumulates triangle corners while merging duplicate vertices
#[derive(Default)]
struct StlBuilder {
    mesh: Mesh,
    seen: HashMap<[u32; 3], usize>,
}

impl StlBuilder {
    fn vertex(&mut self, p: [f32; 3]) -> usize {
        let Self { mesh, seen } = self;
        *seen
            .entry(p.map(f32::to_bits))
            .or_insert_with(|| mesh.add_vertex(Vector3::from(p)))
    }

    fn triangle(&mut self, t: [[f32; 3]; 3]) -> Result<(), Error> {
        let corners = t.map(|p| self.vertex(p));
        self.mesh.add_grob(GrobType::Triangle, &corners)?;
        Ok(())
    }
}

fn read_binary_stl(data: &[u8]) -> Result<Mesh, Error> {
    let Some(count) = data.get(80..84) else {
        return Err(Error::UnexpectedEof);
    };
    let count = u32::from_le_bytes([count[0], count[1], count[2], count[3]]);
    let mut b = StlBuilder::default();
    let mut offset = 84;
    for _ in 0..count {
        let Some(record) = data.get(offset..offset + 50) else {
            return Err(Error::UnexpectedEof);
        };
        // Skip the stored normal; it's recomputed when rendering
        let f = |i: usize| {
            let j = 12 + i * 4;
            f32::from_le_bytes([
                record[j],
                record[j + 1],
                record[j + 2],
                record[j + 3],
            ])
        };
        b.triangle([
            [f(0), f(1), f(2)],
            [f(3), f(4), f(5)],
            [f(6), f(7), f(8)],
        ])?;
        offset += 50;
    }
    Ok(b.mesh)
}

fn read_ascii_stl(data: &[u8]) -> Result<Mesh, Error> {
    let text = std::str::from_utf8(data)
        .map_err(|e| parse_error(0, format!("invalid UTF-8: {e}")))?;
    let mut b = StlBuilder::default();
    let mut pending = vec![];
    for (i, line) in text.lines().enumerate() {
        let lineno = i + 1;
        let mut words = line.split_whitespace();
        match words.next() {
            Some("vertex") => {
                let mut xyz = [0.0f32; 3];
                for v in &mut xyz {
                    let w = words
                        .next()
                        .ok_or_else(|| parse_error(lineno, "short vertex"))?;
                    *v = w.parse().map_err(|e| {
                        parse_error(lineno, format!("bad coordinate: {e}"))
                    })?;
                }
                pending.push(xyz);
            }
            Some("endloop") => {
                let &[p0, p1, p2] = pending.as_slice() else {
                    return Err(parse_error(
                        lineno,
                        format!("facet with {} vertices", pending.len()),
                    ));
                };
                b.triangle([p0, p1, p2])?;
                pending.clear();
            }
            _ => (),
        }
    }
    if !pending.is_empty() {
        return Err(Error::UnexpectedEof);
    }
    Ok(b.mesh)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_format_from_path() {
        let f = |s: &str| Format::from_path(Path::new(s));
        assert_eq!(f("a/b.OBJ").unwrap(), Format::Obj);
        assert_eq!(f("x.stl").unwrap(), Format::Stl);
        assert!(matches!(f("x.ugx"), Err(Error::UnsupportedFormat(..))));
        assert!(f("noext").is_err());
    }

    #[test]
    fn test_read_obj() {
        let src = "\
# a unit square with a pentagon fan and a polyline
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
v 0.5 1.5 0
f 1/1/1 2/2/1 3/3/1 4/4/1
f -5 -4 -3 -1 -2   # pentagon
l 1 2 3
p 5
vn 0 0 1
usemtl whatever
";
        let m = Mesh::read_obj(src.as_bytes()).unwrap();
        assert_eq!(m.num_vertices(), 5);
        assert_eq!(m.num(GrobType::Quadrilateral), 1);
        assert_eq!(m.num(GrobType::Triangle), 3);
        assert_eq!(m.grob(GrobType::Triangle, 0).corners(), [0, 1, 2]);
        assert_eq!(m.grob(GrobType::Triangle, 1).corners(), [0, 2, 4]);
        assert_eq!(m.num(GrobType::Edge), 2);
        assert_eq!(m.grob(GrobType::Vertex, 0).corner(0), 4);
    }

    #[test]
    fn test_read_obj_errors() {
        let e = Mesh::read_obj("v 0 0 0\nv 1 x 0\n".as_bytes()).unwrap_err();
        assert!(matches!(e, Error::ParseError { line: 2, .. }));

        let e = Mesh::read_obj("v 0 0 0\nf 1 2 3\n".as_bytes()).unwrap_err();
        assert!(matches!(e, Error::ParseError { line: 2, .. }));

        let e = Mesh::read_obj("v 0 0 0\nf 1 -2 1\n".as_bytes()).unwrap_err();
        assert!(matches!(e, Error::ParseError { line: 2, .. }));

        let e = Mesh::read_obj("v 0 0 0\nf 1 1\n".as_bytes()).unwrap_err();
        assert!(matches!(e, Error::ParseError { line: 2, .. }));
    }

    #[test]
    fn test_read_ascii_stl() {
        let src = "\
solid square
  facet normal 0 0 1
    outer loop
      vertex 0 0 0
      vertex 1 0 0
      vertex 1 1 0
    endloop
  endfacet
  facet normal 0 0 1
    outer loop
      vertex 0 0 0
      vertex 1 1 0
      vertex 0 1 0
    endloop
  endfacet
endsolid square
";
        let m = Mesh::read_stl(src.as_bytes()).unwrap();
        assert_eq!(m.num_triangles(), 2);
        assert_eq!(m.num_vertices(), 4);
        assert_eq!(m.grob(GrobType::Triangle, 1).corners(), [0, 2, 3]);
    }

    #[test]
    fn test_read_truncated_binary_stl() {
        let mut data = vec![0u8; 80];
        data.extend(2u32.to_le_bytes());
        data.extend([0u8; 50]);
        assert!(matches!(Mesh::read_stl(&data), Err(Error::UnexpectedEof)));
        assert!(matches!(
            Mesh::read_stl(&data[..40]),
            Err(Error::UnexpectedEof)
        ));
    }
}
