use glam::DVec3;
use insta::assert_snapshot;
use tempfile::tempdir;

use crate::Error;
use crate::io::NumberFormat;
use crate::io::StlEncoding;
use crate::io::WriteOptions;
use crate::io::save_mesh;
use crate::io::save_mesh_ascii;
use crate::io::save_mesh_binary;
use crate::io::write_ascii;
use crate::io::write_binary;
use crate::mesh::Facet;
use crate::mesh::Mesh;
use crate::mesh::PointCloud;
use crate::mesh::SOLID_NAME;
use crate::mesh::Triangle;
use crate::mesh::build_mesh;

fn mesh(facets: Vec<Facet>) -> Mesh {
    Mesh {
        name: SOLID_NAME.to_string(),
        facets,
    }
}

fn right_triangle() -> Facet {
    Facet::new(
        Triangle([0, 1, 2]),
        [
            DVec3::new(0.0, 0.0, 0.0),
            DVec3::new(1.0, 0.0, 0.0),
            DVec3::new(0.0, 1.0, 0.0),
        ],
    )
}

fn ascii(mesh: &Mesh, numbers: NumberFormat) -> String {
    let mut out = Vec::new();
    write_ascii(&mut out, mesh, numbers).expect("writing to a Vec");
    String::from_utf8(out).expect("ascii output")
}

#[test]
fn ascii_layout() {
    let text = ascii(&mesh(vec![right_triangle()]), NumberFormat::Shortest);

    assert_snapshot!(text, @r"
    solid STL_from_CSV
      facet normal 0 0 1
        outer loop
          vertex 0 0 0
          vertex 1 0 0
          vertex 0 1 0
        endloop
      endfacet
    endsolid STL_from_CSV
    ");
    assert!(text.ends_with("endsolid STL_from_CSV\n"));
}

#[test]
fn empty_solid() {
    let text = ascii(&mesh(vec![]), NumberFormat::Shortest);

    assert_eq!(text, "solid STL_from_CSV\nendsolid STL_from_CSV\n");
}

#[test]
fn shortest_numbers_round_trip() {
    let facet = Facet::new(
        Triangle([0, 1, 2]),
        [
            DVec3::new(0.1, -2.5, 1e-7),
            DVec3::new(1.0 / 3.0, 0.0, 12_345.678),
            DVec3::new(-0.0, 1.0, 0.0),
        ],
    );

    let text = ascii(&mesh(vec![facet.clone()]), NumberFormat::Shortest);

    let vertex_lines: Vec<&str> = text
        .lines()
        .filter_map(|l| l.trim_start().strip_prefix("vertex "))
        .collect();
    assert_eq!(vertex_lines.len(), 3);
    assert_eq!(vertex_lines[0], "0.1 -2.5 0.0000001");
    assert_eq!(vertex_lines[2], "0 1 0");
    for (line, expected) in vertex_lines.iter().zip(facet.vertices) {
        let parsed: Vec<f64> = line
            .split(' ')
            .map(|s| s.parse().expect("a number"))
            .collect();
        assert_eq!(parsed, expected.to_array());
    }
}

#[test]
fn scientific_numbers() {
    let text = ascii(&mesh(vec![right_triangle()]), NumberFormat::Scientific(3));

    assert!(text.contains("  facet normal 0.000e0 0.000e0 1.000e0\n"), "{text}");
    assert!(text.contains("      vertex 1.000e0 0.000e0 0.000e0\n"), "{text}");
}

#[test]
fn degenerate_facet_writes_zero_normal() {
    let p = DVec3::new(2.0, 2.0, 2.0);
    let facet = Facet::new(Triangle([0, 1, 2]), [p, p, p]);
    assert!(facet.is_degenerate());

    let text = ascii(&mesh(vec![facet]), NumberFormat::Shortest);

    assert!(text.contains("  facet normal 0 0 0\n"));
}

#[test]
fn one_facet_block_per_triangle() {
    let points: PointCloud = (0..8)
        .flat_map(|i| {
            (0..8).map(move |j| {
                let (x, y) = (f64::from(i) * 1.1, f64::from(j) + 0.05 * f64::from(i % 3));
                DVec3::new(x, y, (x * y).sqrt())
            })
        })
        .collect();
    let mesh = build_mesh(&points).expect("grid triangulates");

    let text = ascii(&mesh, NumberFormat::Shortest);

    assert_eq!(text.matches("facet normal").count(), mesh.len());
    assert_eq!(text.matches("endfacet").count(), mesh.len());
    assert_eq!(text.matches("vertex").count(), 3 * mesh.len());
    for line in text.lines().filter(|l| l.contains("facet normal")) {
        let n: Vec<f64> = line
            .trim_start()
            .trim_start_matches("facet normal ")
            .split(' ')
            .map(|s| s.parse().expect("a number"))
            .collect();
        let norm = n.iter().map(|c| c * c).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 1e-9, "{line}");
    }
}

#[test]
fn binary_layout() {
    let mesh = mesh(vec![right_triangle(), right_triangle()]);
    let mut out = Vec::new();

    write_binary(&mut out, &mesh).expect("writing to a Vec");

    assert_eq!(out.len(), 84 + 50 * 2);
    assert!(out[..80].iter().all(|&b| b == b' '));
    assert_eq!(&out[80..84], &2_u32.to_le_bytes());
    // Normal z of the first facet.
    assert_eq!(&out[92..96], &1_f32.to_le_bytes());
    // Second vertex x of the first facet.
    assert_eq!(&out[108..112], &1_f32.to_le_bytes());
    assert_eq!(&out[132..134], &[0, 0]);
}

#[test]
fn save_ascii_creates_parent_dirs() {
    let dir = tempdir().expect("Cannot create temp dir");
    let path = dir.path().join("nested/deeper/out.stl");

    save_mesh_ascii(&path, &mesh(vec![right_triangle()]), NumberFormat::Shortest)
        .expect("writable dir");

    let text = std::fs::read_to_string(&path).expect("file written");
    assert!(text.starts_with("solid STL_from_CSV\n"));
}

#[test]
fn save_dispatches_on_encoding() {
    let dir = tempdir().expect("Cannot create temp dir");
    let ascii_path = dir.path().join("ascii.stl");
    let binary_path = dir.path().join("binary.stl");
    let mesh = mesh(vec![right_triangle()]);

    save_mesh(&ascii_path, &mesh, &WriteOptions::default()).expect("ascii written");
    save_mesh(
        &binary_path,
        &mesh,
        &WriteOptions {
            encoding: StlEncoding::Binary,
            ..WriteOptions::default()
        },
    )
    .expect("binary written");

    let text = std::fs::read_to_string(&ascii_path).expect("ascii readable");
    assert_eq!(text.matches("facet normal").count(), 1);
    let bytes = std::fs::read(&binary_path).expect("binary readable");
    assert_eq!(bytes.len(), 84 + 50);
}

#[test]
fn overwrites_existing_file() {
    let dir = tempdir().expect("Cannot create temp dir");
    let path = dir.path().join("out.stl");
    std::fs::write(&path, "x".repeat(10_000)).expect("seed file");

    save_mesh_ascii(&path, &mesh(vec![]), NumberFormat::Shortest).expect("overwrite");

    let text = std::fs::read_to_string(&path).expect("file written");
    assert_eq!(text, "solid STL_from_CSV\nendsolid STL_from_CSV\n");
}

#[test]
fn unwritable_path_fails() {
    let dir = tempdir().expect("Cannot create temp dir");
    let blocker = dir.path().join("a_file");
    std::fs::write(&blocker, "not a directory").expect("seed file");
    let path = blocker.join("out.stl");

    let err = save_mesh_ascii(&path, &mesh(vec![right_triangle()]), NumberFormat::Shortest)
        .expect_err("parent is a file");
    match err {
        Error::OutputWriteFailed { path: failed, .. } => assert_eq!(failed, path),
        other => panic!("unexpected error {other:?}"),
    }

    let err = save_mesh_binary(&path, &mesh(vec![])).expect_err("parent is a file");
    assert!(matches!(err, Error::OutputWriteFailed { .. }));
}
