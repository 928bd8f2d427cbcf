//! Shared fixtures for the interpolation integration tests

#![allow(dead_code)]

use coastmesh_core::{GeoTransform, Point, Raster, RasterHandle};
use std::fs::File;
use std::path::Path;
use tiff::encoder::TiffEncoder;
use tiff::encoder::colortype::{ColorType, Gray8, Gray32Float};
use tiff::tags::Tag;

const GEOGRAPHIC_TYPE_KEY: u16 = 2048;
const PROJECTED_CS_TYPE_KEY: u16 = 3072;

/// Write a single-band GeoTIFF with a north-up transform and EPSG code
pub fn write_geotiff<C: ColorType>(
    path: &Path,
    data: &[C::Inner],
    cols: u32,
    rows: u32,
    transform: GeoTransform,
    epsg: u16,
    nodata: &str,
) where
    [C::Inner]: tiff::encoder::TiffValue,
{
    let file = File::create(path).unwrap();
    let mut encoder = TiffEncoder::new(file).unwrap();
    let mut image = encoder.new_image::<C>(cols, rows).unwrap();
    image.rows_per_strip(3).unwrap();

    let scale = [transform.pixel_width, -transform.pixel_height, 0.0];
    let tiepoint = [0.0, 0.0, 0.0, transform.origin_x, transform.origin_y, 0.0];
    let key = if epsg == 4326 { GEOGRAPHIC_TYPE_KEY } else { PROJECTED_CS_TYPE_KEY };
    let keys = [1u16, 1, 0, 1, key, 0, 1, epsg];
    let enc = image.encoder();
    enc.write_tag(Tag::ModelPixelScaleTag, &scale[..]).unwrap();
    enc.write_tag(Tag::ModelTiepointTag, &tiepoint[..]).unwrap();
    enc.write_tag(Tag::GeoKeyDirectoryTag, &keys[..]).unwrap();
    enc.write_tag(Tag::GdalNodata, nodata).unwrap();
    image.write_data(data).unwrap();
}

pub fn write_f32(path: &Path, data: &[f32], cols: u32, rows: u32, transform: GeoTransform) {
    write_geotiff::<Gray32Float>(path, data, cols, rows, transform, 26915, "-9999");
}

pub fn write_f32_epsg(
    path: &Path,
    data: &[f32],
    cols: u32,
    rows: u32,
    transform: GeoTransform,
    epsg: u16,
) {
    write_geotiff::<Gray32Float>(path, data, cols, rows, transform, epsg, "-9999");
}

pub fn write_u8(path: &Path, data: &[u8], cols: u32, rows: u32, transform: GeoTransform) {
    write_geotiff::<Gray8>(path, data, cols, rows, transform, 26915, "255");
}

/// In-memory raster of unit-free cells of size `cell`, origin at the
/// top-left corner `(0, rows · cell)`
pub fn raster(data: Vec<f32>, rows: usize, cols: usize, cell: f64) -> Raster<f32> {
    let mut r = Raster::from_vec(data, rows, cols).unwrap();
    r.set_transform(GeoTransform::new(0.0, rows as f64 * cell, cell, -cell));
    r
}

pub fn handle(data: Vec<f32>, rows: usize, cols: usize, cell: f64) -> RasterHandle {
    RasterHandle::from_raster(raster(data, rows, cols, cell)).unwrap()
}

pub fn points(coords: &[(f64, f64)]) -> Vec<Point> {
    coords.iter().map(|&(x, y)| Point { x, y }).collect()
}

/// Small deterministic pseudo-random sequence in `[0, 1)`
pub fn noise(n: usize, seed: u64) -> Vec<f64> {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    (0..n)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (state >> 11) as f64 / (1u64 << 53) as f64
        })
        .collect()
}
