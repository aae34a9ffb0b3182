use core::fmt;
use std::fs::File;
use std::io::BufReader;
use std::io::BufWriter;
use std::io::Read;
use std::io::Write;
use std::path::Path;

use csv::ReaderBuilder;
use csv::StringRecord;
use csv::Trim;
use glam::DVec3;
use log::info;
use log::warn;

use crate::Error;
use crate::Result;
use crate::mesh::Mesh;
use crate::mesh::PointCloud;

static ATTRIBUTE_COUNT: [u8; 2] = [0; 2];

static AXES: [&str; 3] = ["x", "y", "z"];

/// Cell values read as "no value", in addition to empty cells.
static NA_MARKERS: [&str; 18] = [
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// How the input table is split into fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoadOptions {
    /// Field delimiter, a single ASCII byte.
    pub delimiter: u8,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

/// Points read from a table, with the bookkeeping of the rows seen.
#[derive(Clone, Debug, PartialEq)]
pub struct LoadedPoints {
    /// Complete rows, in file order.
    pub points: PointCloud,
    /// Data rows read, header excluded.
    pub rows_read: usize,
    /// Rows dropped because x, y or z was missing.
    pub dropped_rows: usize,
}

/// Return the x, y, z columns stored in a CSV file.
///
/// The file must start with a header row. Columns are taken by position:
/// the first three are x, y and z whatever their header says; any further
/// columns are ignored. A row missing a value in one of the first three
/// columns is dropped and counted.
///
/// # Errors
///   `InputNotFound` if the path is not a readable file, otherwise see
///   [`read_xyz_csv`].
pub fn load_xyz_csv(path: &Path, options: &LoadOptions) -> Result<LoadedPoints> {
    let file = open_input(path)?;
    let loaded = read_xyz_csv(BufReader::new(file), options)?;
    info!(
        "load_xyz_csv - extracted {} points from {}",
        loaded.points.len(),
        path.display()
    );
    Ok(loaded)
}

fn open_input(path: &Path) -> Result<File> {
    let not_found = |source| Error::InputNotFound {
        path: path.to_path_buf(),
        source,
    };

    let metadata = std::fs::metadata(path).map_err(not_found)?;
    if !metadata.is_file() {
        return Err(not_found(std::io::Error::other(format!(
            "{} is not a regular file",
            path.display()
        ))));
    }
    File::open(path).map_err(not_found)
}

/// Read x, y, z columns from CSV text.
///
/// # Errors
///   `MalformedInput` when there is no header, when a record cannot be read,
///   or when a present coordinate is not a number.
///   `InsufficientColumns` when the header has fewer than three fields.
pub fn read_xyz_csv<R: Read>(reader: R, options: &LoadOptions) -> Result<LoadedPoints> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .delimiter(options.delimiter)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let columns = reader
        .headers()
        .map_err(|e| Error::malformed_by("could not read the header row", e))?
        .len();
    if columns == 0 {
        return Err(Error::malformed("no columns to parse from file"));
    }
    if columns < 3 {
        return Err(Error::InsufficientColumns { found: columns });
    }

    let mut points = PointCloud::new();
    let mut rows_read = 0;
    let mut dropped_rows = 0;
    for (i, result) in reader.records().enumerate() {
        let row = i + 1;
        let record =
            result.map_err(|e| Error::malformed_by(format!("could not read row {row}"), e))?;
        rows_read += 1;
        match parse_xyz(&record, row)? {
            Some(pos) => points.push(pos),
            None => dropped_rows += 1,
        }
    }

    if dropped_rows > 0 {
        warn!("Found {dropped_rows} rows with missing values. Removing these rows.");
    }

    Ok(LoadedPoints {
        points,
        rows_read,
        dropped_rows,
    })
}

fn is_missing(cell: &str) -> bool {
    cell.is_empty() || NA_MARKERS.contains(&cell)
}

// None when any of the three cells is absent or missing.
fn xyz_cells(record: &StringRecord) -> Option<[&str; 3]> {
    let cell = |i| record.get(i).filter(|c| !is_missing(c));
    Some([cell(0)?, cell(1)?, cell(2)?])
}

fn parse_xyz(record: &StringRecord, row: usize) -> Result<Option<DVec3>> {
    let Some(cells) = xyz_cells(record) else {
        return Ok(None);
    };

    let mut xyz = [0_f64; 3];
    for (axis, (value, cell)) in xyz.iter_mut().zip(cells).enumerate() {
        *value = cell.parse().map_err(|e| {
            Error::malformed_by(
                format!("row {row}, column {}: {cell:?} is not a number", AXES[axis]),
                e,
            )
        })?;
    }
    // Any spelling `f64` reads as NaN ("NAN", "+nan") is a missing value too.
    if xyz.iter().any(|v| v.is_nan()) {
        return Ok(None);
    }
    Ok(Some(DVec3::from_array(xyz)))
}

/// Text rendering of numbers in ASCII STL.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NumberFormat {
    /// Shortest decimal that reads back as the same `f64` (`1`, `0.5`).
    #[default]
    Shortest,
    /// Scientific notation with this many fractional digits (`1.000e0`).
    Scientific(usize),
}

impl NumberFormat {
    const fn triple(self, v: DVec3) -> Triple {
        Triple(v, self)
    }
}

struct Triple(DVec3, NumberFormat);

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self(v, format) = *self;
        for (i, value) in v.to_array().into_iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            // Turns -0.0 into 0.0, STL output never carries "-0".
            let value = value + 0.0;
            match format {
                NumberFormat::Shortest => write!(f, "{value}")?,
                NumberFormat::Scientific(digits) => write!(f, "{value:.digits$e}")?,
            }
        }
        Ok(())
    }
}

/// STL flavour to produce.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StlEncoding {
    /// Plain text.
    #[default]
    Ascii,
    /// Little-endian binary, coordinates narrowed to `f32`.
    Binary,
}

/// How a mesh is saved.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Text or binary STL.
    pub encoding: StlEncoding,
    /// Number rendering, ASCII only.
    pub numbers: NumberFormat,
}

/// Write a mesh to file in the requested encoding.
///
/// # Errors
///   `OutputWriteFailed` when the file cannot be created or written to.
pub fn save_mesh(path: &Path, mesh: &Mesh, options: &WriteOptions) -> Result<()> {
    match options.encoding {
        StlEncoding::Ascii => save_mesh_ascii(path, mesh, options.numbers),
        StlEncoding::Binary => save_mesh_binary(path, mesh),
    }
}

fn create_output(path: &Path) -> Result<BufWriter<File>> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| Error::output(path, e))?;
    }
    let file = File::create(path).map_err(|e| Error::output(path, e))?;
    Ok(BufWriter::new(file))
}

/// Write a mesh as an ASCII STL file.
///
/// The file is created or truncated. A failure part way through can leave
/// a partial file behind.
///
/// # Errors
///   `OutputWriteFailed` when the file cannot be created or written to.
pub fn save_mesh_ascii(path: &Path, mesh: &Mesh, numbers: NumberFormat) -> Result<()> {
    let mut writer = create_output(path)?;
    write_ascii(&mut writer, mesh, numbers)
        .and_then(|()| writer.flush())
        .map_err(|e| Error::output(path, e))?;
    info!("wrote {} facets to {}", mesh.len(), path.display());
    Ok(())
}

/// Serialize a mesh as ASCII STL.
///
/// # Errors
///   Whatever `writer` reports.
pub fn write_ascii<W: Write>(
    writer: &mut W,
    mesh: &Mesh,
    numbers: NumberFormat,
) -> std::io::Result<()> {
    writeln!(writer, "solid {}", mesh.name)?;

    for facet in &mesh.facets {
        let [v0, v1, v2] = facet.vertices;
        writeln!(writer, "  facet normal {}", numbers.triple(facet.normal))?;
        writeln!(writer, "    outer loop")?;
        writeln!(writer, "      vertex {}", numbers.triple(v0))?;
        writeln!(writer, "      vertex {}", numbers.triple(v1))?;
        writeln!(writer, "      vertex {}", numbers.triple(v2))?;
        writeln!(writer, "    endloop")?;
        writeln!(writer, "  endfacet")?;
    }
    writeln!(writer, "endsolid {}", mesh.name)?;

    Ok(())
}

/// Write a mesh as a binary STL file.
///
/// # Errors
///   `OutputWriteFailed` when the file cannot be created or written to, or
///   when the mesh holds more facets than the format can count.
pub fn save_mesh_binary(path: &Path, mesh: &Mesh) -> Result<()> {
    let mut writer = create_output(path)?;
    write_binary(&mut writer, mesh)
        .and_then(|()| writer.flush())
        .map_err(|e| Error::output(path, e))?;
    info!("wrote {} facets to {}", mesh.len(), path.display());
    Ok(())
}

/// Serialize a mesh as binary STL.
///
/// # Errors
///   Whatever `writer` reports, or `InvalidInput` past 4,294,967,295 facets.
pub fn write_binary<W: Write>(writer: &mut W, mesh: &Mesh) -> std::io::Result<()> {
    // Header
    writer.write_all(&[b' '; 80])?;

    let count = u32::try_from(mesh.len()).map_err(|_| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "stl file format cannot contain more than 4,294,967,295 triangles",
        )
    })?;
    writer.write_all(&count.to_le_bytes())?;

    for facet in &mesh.facets {
        // Normals
        let normal_bytes = facet
            .normal
            .as_vec3()
            .to_array()
            .map(f32::to_le_bytes)
            .concat();
        writer.write_all(&normal_bytes)?;
        // Triangles
        let triangle_bytes = facet
            .vertices
            .map(|v| v.as_vec3().to_array())
            .iter()
            .flatten()
            .map(|f| f.to_le_bytes())
            .collect::<Vec<_>>()
            .concat();
        writer.write_all(&triangle_bytes)?;

        // Attribute count
        writer.write_all(&ATTRIBUTE_COUNT)?;
    }

    Ok(())
}
