use cloudpick_core::{Colors, Normals, PointCloud, Scalar, ScalarKind};
use cloudpick_export::{
    export_filtered_sources, ExportConfig, ExportError, ExportEvent, Exporter, FileStore,
    SourceReference,
};
use cloudpick_io::{load, read_pcd, save, Encoding};
use std::path::PathBuf;
use tempfile::tempdir;

fn line(n: usize, offset: f32) -> PointCloud {
    let pts: Vec<[f32; 3]> = (0..n).map(|i| [i as f32 + offset, 0.0, 0.0]).collect();
    PointCloud::from_points(&pts)
}

/// A viewer showed part of two scans; the display is cropped and holds a
/// duplicated point. Each scan is cut down to the points still shown.
#[test]
fn pipeline_two_sources_cropped_display() {
    let dir = tempdir().unwrap();
    let left = dir.path().join("left.pcd");
    let right = dir.path().join("right.pcd");
    save(&left, &line(4, 0.0), Encoding::Binary).unwrap();
    save(&right, &line(4, 100.0), Encoding::Ascii).unwrap();

    // Left scan: keep points 0 and 3. Right scan: keep 101 and 102.
    let shown: Vec<[f64; 3]> = vec![
        [0.1, 0.0, 0.0],
        [2.9, 0.0, 0.0],
        [2.9, 0.0, 0.0],
        [101.0, 0.0, 0.0],
        [102.2, 0.0, 0.0],
    ];
    let names = vec![
        format!("{}", left.display()),
        "grid".to_string(),
        format!("{}-1", right.display()),
    ];
    let sources = SourceReference::from_names(names, "pcd");
    let prefix = dir.path().join("crop_").to_string_lossy().into_owned();

    let mut events = Vec::new();
    let summary = Exporter::new(FileStore)
        .with_reporter(|e: &ExportEvent<'_>| events.push(e.to_string()))
        .run(&shown, &sources, &prefix)
        .unwrap();

    assert_eq!(summary.pruned, 1);
    assert_eq!(summary.displayed, 4);
    assert_eq!(summary.outputs.len(), 2);

    let first = read_pcd(&summary.outputs[0].output).unwrap();
    assert_eq!(
        first.iter_points().collect::<Vec<_>>(),
        vec![[0.0, 0.0, 0.0], [3.0, 0.0, 0.0]]
    );

    // Every displayed point has a nearest neighbour in every source cloud,
    // so the left-hand points pull in 100.
    let second = read_pcd(&summary.outputs[1].output).unwrap();
    assert_eq!(
        second.iter_points().collect::<Vec<_>>(),
        vec![[100.0, 0.0, 0.0], [101.0, 0.0, 0.0], [102.0, 0.0, 0.0]]
    );

    assert_eq!(summary.outputs[0].output, PathBuf::from(format!("{prefix}1.pcd")));
    assert_eq!(summary.outputs[1].output, PathBuf::from(format!("{prefix}2.pcd")));
    assert!(events.iter().any(|e| e.starts_with("skipping \"grid\"")));
}

#[test]
fn pipeline_preserves_point_fields() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("rich.pcd");
    let mut cloud = line(5, 0.0);
    cloud.normals = Some(Normals {
        nx: vec![0.0; 5],
        ny: vec![0.0; 5],
        nz: vec![1.0, 0.5, -1.0, 0.25, 0.0],
    });
    cloud.colors = Some(Colors {
        r: vec![10, 20, 30, 40, 50],
        g: vec![1, 2, 3, 4, 5],
        b: vec![0, 0, 0, 0, 255],
    });
    cloud.intensity = Some(vec![0.1, 0.2, 0.3, 0.4, 0.5]);
    save(&src, &cloud, Encoding::Binary).unwrap();

    let shown: Vec<[f64; 3]> = vec![[4.0, 0.0, 0.0], [1.0, 0.0, 0.0]];
    let prefix = dir.path().join("f").to_string_lossy().into_owned();
    let sources = SourceReference::from_names([src.to_string_lossy().into_owned()], "pcd");
    assert!(export_filtered_sources(&shown, &sources, &prefix));

    let out = load(format!("{prefix}1.pcd")).unwrap();
    assert_eq!(out, cloud.select(&[1, 4]));
}

/// Lidar scans carry per-point fields the exporter knows nothing about.
/// They are written back with their declared SIZE and TYPE.
#[test]
fn pipeline_keeps_unrecognized_fields() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("lidar.pcd");
    std::fs::write(
        &src,
        "VERSION 0.7\nFIELDS x y z intensity ring label\nSIZE 4 4 4 4 2 4\n\
         TYPE F F F F U U\nCOUNT 1 1 1 1 1 1\nWIDTH 3\nHEIGHT 1\nPOINTS 3\nDATA ascii\n\
         0 0 0 0.5 3 11\n1 0 0 0.75 12 4000000000\n2 0 0 1 65535 13\n",
    )
    .unwrap();

    let shown: Vec<[f64; 3]> = vec![[1.0, 0.0, 0.0]];
    let prefix = dir.path().join("lidar_").to_string_lossy().into_owned();
    let sources = SourceReference::from_names([src.to_string_lossy().into_owned()], "pcd");
    let summary = Exporter::new(FileStore).run(&shown, &sources, &prefix).unwrap();
    assert_eq!(summary.outputs[0].matched, 1);

    let written = std::fs::read(&summary.outputs[0].output).unwrap();
    let text = String::from_utf8_lossy(&written);
    assert!(text.contains("FIELDS x y z intensity ring label\n"));
    assert!(text.contains("SIZE 4 4 4 4 2 4\n"));
    assert!(text.contains("TYPE F F F F U U\n"));

    let out = read_pcd(&summary.outputs[0].output).unwrap();
    assert_eq!(out.iter_points().collect::<Vec<_>>(), vec![[1.0, 0.0, 0.0]]);
    assert_eq!(out.intensity, Some(vec![0.75]));
    let ring = out.extra_field("ring").unwrap();
    assert_eq!((ring.kind, ring.size), (ScalarKind::Unsigned, 2));
    assert_eq!(ring.element(0, 0), Scalar::Unsigned(12));
    let label = out.extra_field("label").unwrap();
    assert_eq!((label.kind, label.size), (ScalarKind::Unsigned, 4));
    assert_eq!(label.element(0, 0), Scalar::Unsigned(4_000_000_000));
}

#[test]
fn pipeline_ply_sources() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("mesh.ply");
    save(&src, &line(10, 0.0), Encoding::Binary).unwrap();

    let config = ExportConfig {
        extension: "ply".into(),
        tolerance: 0.5,
        encoding: Encoding::Ascii,
    };
    let shown: Vec<[f64; 3]> = vec![[5.0, 0.0, 0.0], [5.2, 0.0, 0.0], [9.0, 0.0, 0.0]];
    let sources = SourceReference::from_names([format!("{}#0", src.display())], &config.extension);
    let prefix = dir.path().join("m").to_string_lossy().into_owned();

    let summary = Exporter::new(FileStore)
        .with_config(config)
        .run(&shown, &sources, &prefix)
        .unwrap();

    assert_eq!(summary.pruned, 1);
    let out = load(&summary.outputs[0].output).unwrap();
    assert_eq!(
        out.iter_points().collect::<Vec<_>>(),
        vec![[5.0, 0.0, 0.0], [9.0, 0.0, 0.0]]
    );
}

#[test]
fn pipeline_stops_on_missing_source() {
    let dir = tempdir().unwrap();
    let a = dir.path().join("a.pcd");
    let c = dir.path().join("c.pcd");
    save(&a, &line(3, 0.0), Encoding::Binary).unwrap();
    save(&c, &line(3, 0.0), Encoding::Binary).unwrap();
    let missing = dir.path().join("b.pcd");

    let sources = SourceReference::from_names(
        [&a, &missing, &c].map(|p| p.to_string_lossy().into_owned()),
        "pcd",
    );
    let prefix = dir.path().join("out").to_string_lossy().into_owned();
    let shown: Vec<[f64; 3]> = vec![[1.0, 0.0, 0.0]];

    let err = Exporter::new(FileStore)
        .run(&shown, &sources, &prefix)
        .unwrap_err();

    assert!(matches!(err, ExportError::Load { .. }));
    assert!(PathBuf::from(format!("{prefix}1.pcd")).exists());
    assert!(!PathBuf::from(format!("{prefix}2.pcd")).exists());
    assert!(!export_filtered_sources(&shown, &sources, &prefix));
}

#[test]
fn pipeline_display_equal_to_source_keeps_everything() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("same.pcd");
    let pts: Vec<[f32; 3]> = (0..200)
        .map(|i| [i as f32 * 0.5, (i as f32 * 0.3).sin(), (i as f32 * 0.7).cos()])
        .collect();
    let cloud = PointCloud::from_points(&pts);
    save(&src, &cloud, Encoding::Binary).unwrap();

    let prefix = dir.path().join("s").to_string_lossy().into_owned();
    let sources = SourceReference::from_names([src.to_string_lossy().into_owned()], "pcd");
    assert!(export_filtered_sources(&cloud, &sources, &prefix));

    let out = load(format!("{prefix}1.pcd")).unwrap();
    assert_eq!(out.iter_points().collect::<Vec<_>>(), cloud.iter_points().collect::<Vec<_>>());
}
