/// Example: render a single turntable frame to PNG
///
/// Usage: cargo run --example preview_frame -- [path/to/file.obj] [angle] [out.png]
///
/// Without an OBJ the built-in cube is rendered.
use std::env;
use std::path::PathBuf;

use anyhow::Context;
use meshtools_core::obj::load_obj;
use meshtools_core::{Axis, Mesh, ObjDetail, Transform};
use meshtools_turntable::{RenderSurface, Resolution, SceneSetup};

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();

    let mut mesh = match args.get(1) {
        Some(path) => {
            println!("Loading OBJ file: {path}");
            load_obj(path, ObjDetail::Textured).with_context(|| format!("loading {path}"))?
        }
        None => {
            eprintln!("Usage: {} [obj-file] [angle] [out.png]", args[0]);
            eprintln!("\nNo OBJ file provided, using default cube...");
            Mesh::cube(2.0)
        }
    };
    let angle: f64 = match args.get(2) {
        Some(a) => a.parse().context("angle must be a number of degrees")?,
        None => 30.0,
    };
    let output = args
        .get(3)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("preview.png"));

    println!("Loaded {} vertices, {} faces", mesh.vertex_count(), mesh.face_count());
    mesh.transform(&Transform::rotation_degrees(Axis::Y, angle));

    let mut surface = RenderSurface::open(&SceneSetup::new(Resolution::new(640, 480), true))?;
    surface.add_mesh(mesh);
    surface.render();
    surface.screenshot(&output)?;
    surface.close();

    println!("Wrote {}", output.display());
    Ok(())
}
