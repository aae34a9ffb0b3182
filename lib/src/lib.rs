#![deny(clippy::all)]
#![warn(clippy::cargo)]
#![warn(clippy::complexity)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::perf)]
#![warn(missing_debug_implementations)]
#![warn(missing_docs)]
#![allow(clippy::many_single_char_names)]
#![doc = include_str!("../../README.md")]

/// Failures of the conversion pipeline.
pub mod error;
/// Load points and save meshes.
pub mod io;
/// Point cloud, facets and the triangulation that joins them.
pub mod mesh;
#[cfg(test)]
mod test;

use std::path::Path;

pub use error::Error;
pub use error::Result;
use io::LoadOptions;
use io::WriteOptions;
use io::load_xyz_csv;
use io::save_mesh;
use log::info;
use mesh::build_mesh;

/// Settings for a whole conversion run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Options {
    /// How the input table is read.
    pub load: LoadOptions,
    /// How the mesh is written.
    pub write: WriteOptions,
}

/// What a conversion run produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Summary {
    /// Points that made it into the triangulation.
    pub points: usize,
    /// Rows dropped for a missing coordinate.
    pub dropped_rows: usize,
    /// Facets written.
    pub facets: usize,
}

/// Convert a CSV point table into an STL surface.
///
/// Main entry point for this library: load, triangulate, write, in that
/// order. The first failing stage ends the run.
///
/// # Errors
///   Any [`Error`] raised by [`load_xyz_csv`], [`build_mesh`] or
///   [`save_mesh`].
pub fn convert(input: &Path, output: &Path, options: &Options) -> Result<Summary> {
    let loaded = load_xyz_csv(input, &options.load)?;
    let mesh = build_mesh(&loaded.points)?;
    save_mesh(output, &mesh, &options.write)?;

    info!(
        "converted {} points into {} facets",
        loaded.points.len(),
        mesh.len()
    );

    Ok(Summary {
        points: loaded.points.len(),
        dropped_rows: loaded.dropped_rows,
        facets: mesh.len(),
    })
}
