//! End-to-end interpolation behaviour on small synthetic rasters.

mod common;

use approx::assert_relative_eq;
use coastmesh_algorithms::interpolation::{
    DEFAULT_NODATA, Griddata, InterpolationMethod, ThresholdPolicy,
};
use coastmesh_core::{
    CRS, Element, ErrorKind, GeoTransform, KdTree, LookupTable, Mesh, Node, Raster,
    RasterHandle, RasterMode,
};
use common::{handle, noise, points, raster, write_f32, write_f32_epsg, write_u8};
use std::io::Write;

fn grid(raster: RasterHandle, coords: &[(f64, f64)], resolution: f64) -> Griddata {
    let pts = points(coords);
    let n = pts.len();
    let mut g = Griddata::new(pts, vec![resolution; n]).unwrap();
    g.set_raster(raster);
    g
}

// ---------------------------------------------------------------------------
// Uniform raster
// ---------------------------------------------------------------------------

#[test]
fn uniform_raster_every_method_returns_value() {
    let coords = [(25.0, 25.0), (12.3, 40.1), (48.0, 3.0)];
    let methods = [
        InterpolationMethod::Average,
        InterpolationMethod::Nearest,
        InterpolationMethod::Highest,
        InterpolationMethod::OutsideStandardDeviation,
        InterpolationMethod::BilskieAveraging,
        InterpolationMethod::InverseDistanceWeighted,
        InterpolationMethod::InverseDistanceWeightedNPoints,
        InterpolationMethod::AverageNearestN,
    ];

    for method in methods {
        // radius 4 with unit cells captures dozens of cells
        let mut g = grid(handle(vec![5.0; 2500], 50, 50, 1.0), &coords, 4.0);
        g.set_methods(method);
        g.set_filters(if method.is_point_count() { 12.0 } else { 1.0 });
        for v in g.compute_values(false).unwrap() {
            assert_relative_eq!(v, 5.0, epsilon = 1e-12);
        }
    }
}

#[test]
fn average_with_cell_radius_covers_full_raster() {
    let data: Vec<f32> = noise(900, 7).into_iter().map(|v| v as f32 * 100.0).collect();
    let coords: Vec<(f64, f64)> = noise(200, 11)
        .chunks(2)
        .map(|c| (c[0] * 30.0, c[1] * 30.0))
        .collect();
    let g = grid(handle(data, 30, 30, 1.0), &coords, 1.0);
    let values = g.compute_values(false).unwrap();
    assert!(values.iter().all(|v| *v != DEFAULT_NODATA));
}

// ---------------------------------------------------------------------------
// Lookup tables
// ---------------------------------------------------------------------------

#[test]
fn lookup_average_with_default() {
    let dir = tempfile::tempdir().unwrap();
    let tif = dir.path().join("landcover.tif");
    write_u8(&tif, &[1, 2, 3], 3, 1, GeoTransform::new(0.0, 1.0, 1.0, -1.0));

    let table_path = dir.path().join("landcover.table");
    let mut f = std::fs::File::create(&table_path).unwrap();
    writeln!(f, "# code value\n1 10.0\n2 20.0").unwrap();

    let mut g = Griddata::new(points(&[(1.5, 0.5)]), vec![1.0]).unwrap();
    g.params_mut().lookup_default = 0.0;
    g.open_raster(&tif).unwrap();
    g.read_lookup_table(&table_path).unwrap();

    let values = g.compute_values(true).unwrap();
    assert_relative_eq!(values[0], 10.0);

    // the raw codes average to 2
    assert_relative_eq!(g.compute_values(false).unwrap()[0], 2.0);
}

#[test]
fn lookup_changes_values_not_selection() {
    let codes: Vec<f32> = noise(400, 3)
        .into_iter()
        .map(|v| (v * 5.0).floor() as f32 + 1.0)
        .collect();
    let coords = [(5.5, 5.5), (12.2, 7.9), (17.0, 16.0)];
    let table = LookupTable::from_pairs((1..=5).map(|c| (c, c as f64 * 10.0)), -1.0);

    for method in [
        InterpolationMethod::Average,
        InterpolationMethod::Nearest,
        InterpolationMethod::Highest,
        InterpolationMethod::AverageNearestN,
    ] {
        let mut lookup = grid(handle(codes.clone(), 20, 20, 1.0), &coords, 3.0);
        lookup.set_methods(method);
        lookup.set_filters(if method.is_point_count() { 6.0 } else { 1.0 });
        lookup.set_lookup_table(table.clone());

        let mut direct = grid(handle(codes.clone(), 20, 20, 1.0), &coords, 3.0);
        direct.set_methods(method);
        direct.set_filters(if method.is_point_count() { 6.0 } else { 1.0 });
        direct.params_mut().multiplier = 10.0;

        let a = lookup.compute_values(true).unwrap();
        let b = direct.compute_values(false).unwrap();
        for (x, y) in a.iter().zip(&b) {
            assert_relative_eq!(x, y, epsilon = 1e-9);
        }
    }
}

// ---------------------------------------------------------------------------
// Edge cases
// ---------------------------------------------------------------------------

#[test]
fn empty_point_set_is_structure_error() {
    let err = KdTree::build(Vec::new()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Structure);
}

#[test]
fn zero_radius_without_coincident_sample_is_nodata() {
    let mut g = grid(handle(vec![1.0; 100], 10, 10, 1.0), &[(3.2, 4.7), (3.5, 4.5)], 0.0);
    g.set_methods(InterpolationMethod::Average);
    let values = g.compute_values(false).unwrap();
    assert_eq!(values, vec![DEFAULT_NODATA, 1.0]);
}

#[test]
fn nodata_pixels_are_skipped() {
    let mut data = vec![4.0_f32; 25];
    data[12] = -9999.0;
    let mut r = raster(data, 5, 5, 1.0);
    r.set_nodata(Some(-9999.0));

    let mut g = Griddata::new(points(&[(2.5, 2.5)]), vec![1.0]).unwrap();
    g.set_raster(RasterHandle::from_raster(r).unwrap());
    g.set_methods(InterpolationMethod::Nearest);
    // the centre is missing: nearest is one of its four neighbours
    assert_eq!(g.compute_values(false).unwrap(), vec![4.0]);
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

#[test]
fn nearest_unchanged_by_upsampling() {
    // 4x4 cells of 3 m, refined to 12x12 cells of 1 m with the same values
    let coarse: Vec<f32> = (0..16).map(|v| v as f32 * 1.5).collect();
    let mut fine = vec![0.0_f32; 144];
    for row in 0..12 {
        for col in 0..12 {
            fine[row * 12 + col] = coarse[(row / 3) * 4 + col / 3];
        }
    }
    let centres: Vec<(f64, f64)> = (0..4)
        .flat_map(|r| (0..4).map(move |c| (c as f64 * 3.0 + 1.5, 12.0 - (r as f64 * 3.0 + 1.5))))
        .collect();

    let mut a = grid(handle(coarse, 4, 4, 3.0), &centres, 0.5);
    let mut b = grid(handle(fine, 12, 12, 1.0), &centres, 0.5);
    a.set_methods(InterpolationMethod::Nearest);
    b.set_methods(InterpolationMethod::Nearest);
    assert_eq!(a.compute_values(false).unwrap(), b.compute_values(false).unwrap());
}

#[test]
fn idw_stays_within_sample_range() {
    let data: Vec<f32> = noise(1600, 5).into_iter().map(|v| (v * 50.0 - 10.0) as f32).collect();
    let r = raster(data.clone(), 40, 40, 1.0);
    let coords: Vec<(f64, f64)> = noise(60, 9)
        .chunks(2)
        .map(|c| (5.0 + c[0] * 30.0, 5.0 + c[1] * 30.0))
        .collect();

    let mut g = grid(RasterHandle::from_raster(r.clone()).unwrap(), &coords, 3.0);
    g.set_methods(InterpolationMethod::InverseDistanceWeighted);
    g.params_mut().reduce.idw_power = 2.0;
    let values = g.compute_values(false).unwrap();

    for (&(x, y), v) in coords.iter().zip(&values) {
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for row in 0..40 {
            for col in 0..40 {
                let (cx, cy) = r.pixel_to_geo(col, row);
                if (cx - x).hypot(cy - y) <= 3.0 {
                    let z = data[row * 40 + col] as f64;
                    lo = lo.min(z);
                    hi = hi.max(z);
                }
            }
        }
        assert!(*v >= lo - 1e-9 && *v <= hi + 1e-9, "{v} outside [{lo}, {hi}]");
    }
}

#[test]
fn n_point_methods_use_exactly_n() {
    let data: Vec<f32> = (0..400).map(|v| v as f32).collect();
    let r = raster(data, 20, 20, 1.0);
    let (x, y) = (7.3, 11.6);

    // brute-force nearest four
    let mut all: Vec<(f64, f64)> = (0..20)
        .flat_map(|row| (0..20).map(move |col| (row, col)))
        .map(|(row, col)| {
            let (cx, cy) = r.pixel_to_geo(col, row);
            ((cx - x).hypot(cy - y), (row * 20 + col) as f64)
        })
        .collect();
    all.sort_by(|a, b| a.0.total_cmp(&b.0));
    let expected = all[..4].iter().map(|p| p.1).sum::<f64>() / 4.0;

    let mut g = grid(RasterHandle::from_raster(r).unwrap(), &[(x, y)], 1.0);
    g.set_methods(InterpolationMethod::AverageNearestN);
    g.set_filters(4.0);
    assert_relative_eq!(g.compute_values(false).unwrap()[0], expected);

    // more samples than the raster holds: all of them
    g.set_filters(1000.0);
    assert_relative_eq!(g.compute_values(false).unwrap()[0], 199.5);
}

#[test]
fn threshold_equals_masking_the_raster() {
    let data: Vec<f32> = noise(900, 21).into_iter().map(|v| (v * 100.0) as f32).collect();
    let masked: Vec<f32> = data.iter().map(|&v| if v > 60.0 { -9999.0 } else { v }).collect();
    let coords: Vec<(f64, f64)> = noise(40, 4)
        .chunks(2)
        .map(|c| (c[0] * 30.0, c[1] * 30.0))
        .collect();

    let mut filtered = grid(handle(data, 30, 30, 1.0), &coords, 2.5);
    filtered.params_mut().threshold = ThresholdPolicy::Above(60.0);

    let mut m = raster(masked, 30, 30, 1.0);
    m.set_nodata(Some(-9999.0));
    let unfiltered = grid(RasterHandle::from_raster(m).unwrap(), &coords, 2.5);

    assert_eq!(
        filtered.compute_values(false).unwrap(),
        unfiltered.compute_values(false).unwrap()
    );
}

#[test]
fn directional_sector_counts_sum_to_samples() {
    let data: Vec<f32> = noise(3600, 13).into_iter().map(|v| v as f32).collect();
    let r = raster(data, 60, 60, 100.0);
    let coords = [(3000.0, 3000.0), (1234.0, 4321.0), (50.0, 50.0)];

    let mut g = grid(RasterHandle::from_raster(r.clone()).unwrap(), &coords, 100.0);
    g.params_mut().directional.radius = 1500.0;
    let results = g.compute_directional(false).unwrap();

    for (&(x, y), res) in coords.iter().zip(&results) {
        let inside = (0..60)
            .flat_map(|row| (0..60).map(move |col| (row, col)))
            .filter(|&(row, col)| {
                let (cx, cy) = r.pixel_to_geo(col, row);
                (cx - x).hypot(cy - y) <= 1500.0
            })
            .count();
        assert_eq!(res.total_samples(), inside);
        assert_eq!(res.values.len(), 12);
        assert!(res.values.iter().all(|v| (0.0..1.0).contains(v)));
    }
}

// ---------------------------------------------------------------------------
// Raster modes, meshes and coordinate systems
// ---------------------------------------------------------------------------

#[test]
fn streaming_matches_in_memory() {
    let dir = tempfile::tempdir().unwrap();
    let tif = dir.path().join("dem.tif");
    let data: Vec<f32> = noise(32 * 24, 17).into_iter().map(|v| v as f32 * 10.0).collect();
    write_f32(&tif, &data, 32, 24, GeoTransform::new(1000.0, 2400.0, 100.0, -100.0));

    let coords: Vec<(f64, f64)> = noise(80, 2)
        .chunks(2)
        .map(|c| (1000.0 + c[0] * 3200.0, c[1] * 2400.0))
        .collect();

    let run = |mode: RasterMode, method: InterpolationMethod| {
        let mut g = Griddata::new(points(&coords), vec![250.0; coords.len()]).unwrap();
        g.params_mut().raster_mode = mode;
        g.set_methods(method);
        g.open_raster(&tif).unwrap();
        g.compute_values(false).unwrap()
    };

    for method in [
        InterpolationMethod::Average,
        InterpolationMethod::BilskieAveraging,
        InterpolationMethod::InverseDistanceWeightedNPoints,
    ] {
        assert_eq!(
            run(RasterMode::InMemory, method),
            run(RasterMode::Streaming { cache_chunks: 2 }, method),
            "{method}"
        );
    }
}

#[test]
fn mesh_driven_run() {
    // 3x3 nodes on a 10 m grid, eight triangles
    let mut nodes = Vec::new();
    for j in 0..3 {
        for i in 0..3 {
            nodes.push(Node::new(j * 3 + i, 20.0 + i as f64 * 10.0, 20.0 + j as f64 * 10.0, 0.0));
        }
    }
    let mut elements = Vec::new();
    for j in 0..2 {
        for i in 0..2 {
            let a = j * 3 + i;
            elements.push(Element::new(elements.len(), vec![a, a + 1, a + 4]).unwrap());
            elements.push(Element::new(elements.len(), vec![a, a + 4, a + 3]).unwrap());
        }
    }
    // the element table is built by the first topology query
    let mesh = Mesh::new(nodes, elements, Some(CRS::from_epsg(26915))).unwrap();
    assert!(!mesh.has_element_table());

    let mut r = raster(vec![2.0; 64 * 64], 64, 64, 1.0);
    r.set_crs(Some(CRS::from_epsg(26915)));

    let mut g = Griddata::from_mesh(&mesh).unwrap();
    assert_eq!(g.len(), 9);
    assert!(g.resolutions().iter().all(|h| *h >= 10.0));
    g.set_raster(RasterHandle::from_raster(r).unwrap());
    g.set_methods(InterpolationMethod::BilskieAveraging);
    assert_eq!(g.compute_values(false).unwrap(), vec![2.0; 9]);
}

#[test]
fn mismatched_crs_is_reported_before_work() {
    let mut r: Raster<f32> = raster(vec![1.0; 16], 4, 4, 1.0);
    r.set_crs(Some(CRS::from_epsg(26915)));

    let mut g = grid(RasterHandle::from_raster(r).unwrap(), &[(1.0, 1.0)], 1.0);
    g.set_query_crs(Some(CRS::from_epsg(32616)));
    let calls = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let seen = calls.clone();
    g.set_progress(move |_, _| {
        seen.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    });

    let err = g.compute_values(false).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
    let msg = err.to_string();
    assert!(msg.contains("EPSG:26915") && msg.contains("EPSG:32616"), "{msg}");
    assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[test]
fn file_raster_keeps_georeference() {
    let dir = tempfile::tempdir().unwrap();
    let tif = dir.path().join("dem.tif");
    let mut data: Vec<f32> = (0..25).map(|v| v as f32).collect();
    data[12] = -9999.0;
    write_f32(&tif, &data, 5, 5, GeoTransform::new(1000.0, 2050.0, 10.0, -10.0));

    for mode in [RasterMode::InMemory, RasterMode::streaming()] {
        let mut g = Griddata::new(points(&[(1025.0, 2025.0), (1005.0, 2045.0)]), vec![10.0; 2])
            .unwrap();
        g.params_mut().raster_mode = mode;
        g.open_raster(&tif).unwrap();
        let raster = g.raster().unwrap();
        assert_eq!(raster.crs().and_then(CRS::epsg), Some(26915));
        assert_eq!(raster.extent().xmin, 1000.0);
        assert_eq!(raster.extent().ymax, 2050.0);

        // the centre cell is no-data: its four neighbours average to 12
        g.set_methods(InterpolationMethod::Average);
        let values = g.compute_values(false).unwrap();
        assert_relative_eq!(values[0], 12.0);

        g.set_methods(InterpolationMethod::Nearest);
        assert_eq!(g.compute_values(false).unwrap()[1], 0.0);

        g.set_query_crs(Some(CRS::wgs84()));
        let err = g.compute_values(false).unwrap_err();
        assert!(matches!(err, coastmesh_core::Error::CrsMismatch { .. }), "{err}");
    }
}

// ---------------------------------------------------------------------------
// Geographic rasters
// ---------------------------------------------------------------------------

/// 60x60 lon/lat raster of 0.001 degree cells around (-80.03, 30.0)
fn lonlat_raster(dir: &std::path::Path, value: impl Fn(usize) -> f32) -> std::path::PathBuf {
    let tif = dir.join("lonlat.tif");
    let data: Vec<f32> = (0..3600).map(|i| value(i % 60)).collect();
    let gt = GeoTransform::new(-80.06, 30.03, 0.001, -0.001);
    write_f32_epsg(&tif, &data, 60, 60, gt, 4326);
    tif
}

#[test]
fn geographic_raster_uniform_field() {
    let dir = tempfile::tempdir().unwrap();
    let tif = lonlat_raster(dir.path(), |_| 5.0);
    let coords = [(-80.0293, 29.9996), (-80.041, 30.012)];

    for (method, filter) in [
        (InterpolationMethod::Average, 1.0),
        (InterpolationMethod::BilskieAveraging, 1.0),
        (InterpolationMethod::AverageNearestN, 9.0),
    ] {
        // mesh resolution in metres, a few cells wide
        let mut g = Griddata::new(points(&coords), vec![300.0; 2]).unwrap();
        g.set_query_crs(Some(CRS::wgs84()));
        g.open_raster(&tif).unwrap();
        g.set_methods(method);
        g.set_filters(filter);
        for v in g.compute_values(false).unwrap() {
            assert_relative_eq!(v, 5.0, epsilon = 1e-9);
        }
    }
}

#[test]
fn geographic_raster_gradient() {
    let dir = tempfile::tempdir().unwrap();
    let tif = lonlat_raster(dir.path(), |col| col as f32);
    // centre of column 30, row 30
    let centre = (-80.0295, 29.9995);

    let mut g = Griddata::new(points(&[centre]), vec![300.0]).unwrap();
    g.set_query_crs(Some(CRS::wgs84()));
    g.open_raster(&tif).unwrap();

    // samples are symmetric east/west of the point
    g.set_methods(InterpolationMethod::Average);
    assert_relative_eq!(g.compute_values(false).unwrap()[0], 30.0, epsilon = 1e-9);

    g.set_methods(InterpolationMethod::AverageNearestN);
    g.set_filters(1.0);
    assert_eq!(g.compute_values(false).unwrap(), vec![30.0]);

    // a mesh far finer than the ~100 m cells falls back to the nearest cell
    let mut fine = Griddata::new(points(&[(-80.0293, 29.9996)]), vec![1.0]).unwrap();
    fine.set_query_crs(Some(CRS::wgs84()));
    fine.open_raster(&tif).unwrap();
    fine.set_methods(InterpolationMethod::BilskieAveraging);
    assert_eq!(fine.compute_values(false).unwrap(), vec![30.0]);

    g.set_methods(InterpolationMethod::Average);
    g.params_mut().directional.radius = 500.0;
    let r = &g.compute_directional(false).unwrap()[0];
    assert_eq!(r.sectors(), 12);
    assert!(r.total_samples() > 0);
    assert_eq!(r.counts.iter().sum::<usize>(), r.total_samples());
    // sector 0 faces east, sector 6 west
    assert!(r.values[0] > 30.0 && r.values[6] < 30.0);
    assert_relative_eq!(r.values[3], 30.0, epsilon = 1e-6);
    assert_relative_eq!(r.values[9], 30.0, epsilon = 1e-6);
}
