//! Wavefront OBJ reader and writer
//!
//! The reader is line oriented: each record is parsed on its own with
//! `nom`, and any malformed record aborts the whole load with its line
//! number. Only positions, texture coordinates, normals and faces are
//! understood; every other record type is skipped.
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use nalgebra::{Point2, Point3, Vector3};
use nom::{
    character::complete::{char, i64 as int64, space0, space1},
    combinator::{all_consuming, opt},
    multi::separated_list1,
    number::complete::float,
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};
use tracing::debug;

use crate::error::{MeshError, MeshResult};
use crate::geometry::{Corner, Face, Mesh};

/// Which records the reader keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjDetail {
    /// `v` and `f` only; attribute references inside faces are ignored.
    Geometry,
    /// `v`, `vt`, `vn` and `f`, with attribute references resolved.
    Textured,
}

/// Which records the writer emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjExport {
    /// `v` and `f` only. Texture coordinates and normals are dropped and
    /// counted in the returned [`ExportReport`].
    GeometryOnly,
    /// `v`, `vt`, `vn` and `f v/vt/vn` when the mesh carries attributes.
    WithAttributes,
}

/// Summary of what an export wrote and what it left out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportReport {
    pub vertices: usize,
    pub faces: usize,
    pub dropped_texcoords: usize,
    pub dropped_normals: usize,
}

impl ExportReport {
    pub fn is_lossy(&self) -> bool {
        self.dropped_texcoords > 0 || self.dropped_normals > 0
    }
}

type FaceRef = (i64, Option<i64>, Option<i64>);

/// Read and parse an OBJ file.
pub fn load_obj(path: impl AsRef<Path>, detail: ObjDetail) -> MeshResult<Mesh> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| MeshError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mesh = parse_obj(&text, detail)?;
    debug!(
        path = %path.display(),
        vertices = mesh.vertex_count(),
        faces = mesh.face_count(),
        "Loaded OBJ"
    );
    Ok(mesh)
}

/// Parse OBJ text into a validated mesh.
pub fn parse_obj(input: &str, detail: ObjDetail) -> MeshResult<Mesh> {
    let mut mesh = Mesh::new();
    let textured = detail == ObjDetail::Textured;

    for (n, raw) in input.lines().enumerate() {
        let line_no = n + 1;
        let line = raw.split('#').next().unwrap_or_default().trim_end();

        if let Some(rest) = line.strip_prefix("v ") {
            let (x, y, z) = run(vector3, rest, line_no, "v")?;
            mesh.add_position(x, y, z);
        } else if let Some(rest) = line.strip_prefix("f ") {
            let refs = run(face_refs, rest, line_no, "f")?;
            let face = resolve_face(&mesh, &refs, textured, line_no)?;
            mesh.add_face(face);
        } else if !textured {
            continue;
        } else if let Some(rest) = line.strip_prefix("vt ") {
            let (u, v) = run(texcoord, rest, line_no, "vt")?;
            mesh.texcoords.push(Point2::new(u, v));
        } else if let Some(rest) = line.strip_prefix("vn ") {
            let (x, y, z) = run(vector3, rest, line_no, "vn")?;
            mesh.normals.push(Vector3::new(x, y, z));
        }
    }

    mesh.validate()?;
    Ok(mesh)
}

fn run<'a, T>(
    parser: impl Fn(&'a str) -> IResult<&'a str, T>,
    input: &'a str,
    line: usize,
    record: &str,
) -> MeshResult<T> {
    all_consuming(terminated(parser, space0))(input)
        .map(|(_, value)| value)
        .map_err(|_| MeshError::parse(line, format!("malformed `{record}` record: {record} {input}")))
}

fn vector3(input: &str) -> IResult<&str, (f32, f32, f32)> {
    tuple((
        preceded(space0, float),
        preceded(space1, float),
        preceded(space1, float),
    ))(input)
}

fn texcoord(input: &str) -> IResult<&str, (f32, f32)> {
    let (input, (u, v)) = pair(preceded(space0, float), preceded(space1, float))(input)?;
    // Optional depth component, unused.
    let (input, _) = opt(preceded(space1, float))(input)?;
    Ok((input, (u, v)))
}

/// `v`, `v/vt`, `v//vn` or `v/vt/vn`
fn face_ref(input: &str) -> IResult<&str, FaceRef> {
    let (input, position) = int64(input)?;
    let (input, rest) = opt(preceded(
        char('/'),
        pair(opt(int64), opt(preceded(char('/'), int64))),
    ))(input)?;
    let (texcoord, normal) = rest.unwrap_or((None, None));
    Ok((input, (position, texcoord, normal)))
}

fn face_refs(input: &str) -> IResult<&str, Vec<FaceRef>> {
    delimited(space0, separated_list1(space1, face_ref), space0)(input)
}

fn resolve_face(mesh: &Mesh, refs: &[FaceRef], textured: bool, line: usize) -> MeshResult<Face> {
    let mut corners = Vec::with_capacity(refs.len());
    for &(position, texcoord, normal) in refs {
        let mut corner = Corner::new(resolve(position, mesh.positions.len(), line)?);
        if textured {
            corner.texcoord = texcoord
                .map(|t| resolve(t, mesh.texcoords.len(), line))
                .transpose()?;
            corner.normal = normal
                .map(|n| resolve(n, mesh.normals.len(), line))
                .transpose()?;
        }
        corners.push(corner);
    }
    Ok(Face::new(corners))
}

/// Convert a 1-based (or negative, relative) OBJ reference to a 0-based
/// index. Positive references are range-checked later by `Mesh::validate`.
fn resolve(raw: i64, count: usize, line: usize) -> MeshResult<usize> {
    match raw {
        0 => Err(MeshError::parse(line, "OBJ indices are 1-based; found 0")),
        r if r > 0 => Ok((r - 1) as usize),
        r => {
            let index = count as i64 + r;
            if index < 0 {
                Err(MeshError::parse(
                    line,
                    format!("relative index {r} reaches before the first record"),
                ))
            } else {
                Ok(index as usize)
            }
        }
    }
}

/// Write a mesh as OBJ text.
pub fn write_obj<W: Write>(mesh: &Mesh, mode: ObjExport, writer: &mut W) -> std::io::Result<ExportReport> {
    let mut report = ExportReport {
        vertices: mesh.vertex_count(),
        faces: mesh.face_count(),
        ..ExportReport::default()
    };

    for p in &mesh.positions {
        write_point(writer, p)?;
    }

    match mode {
        ObjExport::GeometryOnly => {
            report.dropped_texcoords = mesh.texcoords.len();
            report.dropped_normals = mesh.normals.len();
            for face in &mesh.faces {
                write!(writer, "f")?;
                for index in face.positions() {
                    write!(writer, " {}", index + 1)?;
                }
                writeln!(writer)?;
            }
        }
        ObjExport::WithAttributes => {
            for t in &mesh.texcoords {
                writeln!(writer, "vt {} {}", t.x, t.y)?;
            }
            for n in &mesh.normals {
                writeln!(writer, "vn {} {} {}", n.x, n.y, n.z)?;
            }
            for face in &mesh.faces {
                write!(writer, "f")?;
                for corner in &face.corners {
                    write!(writer, " {}", corner.position + 1)?;
                    match (corner.texcoord, corner.normal) {
                        (None, None) => {}
                        (Some(t), None) => write!(writer, "/{}", t + 1)?,
                        (None, Some(n)) => write!(writer, "//{}", n + 1)?,
                        (Some(t), Some(n)) => write!(writer, "/{}/{}", t + 1, n + 1)?,
                    }
                }
                writeln!(writer)?;
            }
        }
    }

    Ok(report)
}

fn write_point<W: Write>(writer: &mut W, p: &Point3<f32>) -> std::io::Result<()> {
    writeln!(writer, "v {} {} {}", p.x, p.y, p.z)
}

/// Write a mesh to an OBJ file, replacing any existing file.
pub fn save_obj(path: impl AsRef<Path>, mesh: &Mesh, mode: ObjExport) -> MeshResult<ExportReport> {
    let file = fs::File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);
    let report = write_obj(mesh, mode, &mut writer)?;
    writer.flush()?;
    Ok(report)
}
