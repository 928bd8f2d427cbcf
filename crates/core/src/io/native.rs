//! Native GeoTIFF decoding
//!
//! Uses the `tiff` crate. Georeferencing is read from the pixel scale and
//! tie point tags, the coordinate system from the GeoKey directory and the
//! no-data value from the `GDAL_NODATA` tag.

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster, RasterElement};
use num_traits::NumCast;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;
use tracing::debug;

const GEOGRAPHIC_TYPE_KEY: u16 = 2048;
const PROJECTED_CS_TYPE_KEY: u16 = 3072;
const USER_DEFINED: u16 = 32767;

/// Georeferencing metadata carried by a GeoTIFF
#[derive(Debug, Clone, Default)]
pub struct Georeference {
    pub transform: GeoTransform,
    pub crs: Option<CRS>,
    pub nodata: Option<f64>,
}

pub(crate) type FileDecoder = Decoder<BufReader<File>>;

/// Error for a raster that could not be opened or decoded
pub(crate) fn open_error(path: &Path, reason: impl ToString) -> Error {
    Error::RasterOpen {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

/// Open a TIFF decoder over a file
pub(crate) fn open_decoder(path: &Path) -> Result<FileDecoder> {
    let file = File::open(path).map_err(|e| open_error(path, e))?;
    Decoder::new(BufReader::new(file)).map_err(|e| open_error(path, e))
}

/// Read a GeoTIFF file into a Raster
pub fn read_geotiff<T, P>(path: P) -> Result<Raster<T>>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let mut decoder = open_decoder(path)?;

    let (width, height) = decoder.dimensions().map_err(|e| open_error(path, e))?;
    let rows = height as usize;
    let cols = width as usize;

    let georef = read_georeference(&mut decoder);
    let image = decoder.read_image().map_err(|e| open_error(path, e))?;
    let data: Vec<T> = convert(image)?;

    if data.len() != rows * cols {
        return Err(Error::InvalidDimensions {
            width: cols,
            height: rows,
        });
    }

    let mut raster = Raster::from_vec(data, rows, cols)?;
    raster.set_transform(georef.transform);
    raster.set_crs(georef.crs);
    raster.set_nodata(georef.nodata.and_then(num_traits::cast));

    debug!(path = %path.display(), rows, cols, "decoded GeoTIFF");
    Ok(raster)
}

/// Convert any decoded sample buffer into cell values of type `T`
pub(crate) fn convert<T: RasterElement>(result: DecodingResult) -> Result<Vec<T>> {
    fn cast_all<S: NumCast + Copy, T: RasterElement>(buf: Vec<S>) -> Vec<T> {
        buf.into_iter()
            .map(|v| num_traits::cast(v).unwrap_or_else(T::default_nodata))
            .collect()
    }

    Ok(match result {
        DecodingResult::U8(buf) => cast_all(buf),
        DecodingResult::U16(buf) => cast_all(buf),
        DecodingResult::U32(buf) => cast_all(buf),
        DecodingResult::I8(buf) => cast_all(buf),
        DecodingResult::I16(buf) => cast_all(buf),
        DecodingResult::I32(buf) => cast_all(buf),
        DecodingResult::F32(buf) => cast_all(buf),
        DecodingResult::F64(buf) => cast_all(buf),
        _ => {
            return Err(Error::UnsupportedDataType(
                "Unsupported TIFF pixel format".to_string(),
            ));
        }
    })
}

/// Read whatever georeferencing the file carries; missing tags leave defaults
pub(crate) fn read_georeference<R: Read + Seek>(decoder: &mut Decoder<R>) -> Georeference {
    let transform = read_geotransform(decoder).unwrap_or_else(|| {
        debug!("no pixel scale / tie point tags, using unit geotransform");
        GeoTransform::default()
    });
    let crs = read_epsg(decoder).map(CRS::from_epsg);
    let nodata = decoder
        .get_tag_ascii_string(Tag::GdalNodata)
        .ok()
        .and_then(|s| s.trim_matches(char::from(0)).trim().parse::<f64>().ok());

    Georeference {
        transform,
        crs,
        nodata,
    }
}

fn read_geotransform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<GeoTransform> {
    let scale = decoder.get_tag_f64_vec(Tag::ModelPixelScaleTag).ok()?;
    let tiepoint = decoder.get_tag_f64_vec(Tag::ModelTiepointTag).ok()?;

    if scale.len() < 2 || tiepoint.len() < 6 {
        return None;
    }

    // tiepoint: [I, J, K, X, Y, Z], scale: [ScaleX, ScaleY, ScaleZ]
    let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
    let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
    Some(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1]))
}

/// EPSG code from the GeoKey directory (projected system preferred)
fn read_epsg<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<u32> {
    let keys = decoder.get_tag_u16_vec(Tag::GeoKeyDirectoryTag).ok()?;
    if keys.len() < 4 {
        return None;
    }
    let count = keys[3] as usize;
    let entries: Vec<&[u16]> = keys[4..].chunks_exact(4).take(count).collect();

    let lookup = |id: u16| {
        entries
            .iter()
            .find(|e| e[0] == id && e[1] == 0 && e[3] != 0 && e[3] != USER_DEFINED)
            .map(|e| <u32 as From<u16>>::from(e[3]))
    };
    lookup(PROJECTED_CS_TYPE_KEY).or_else(|| lookup(GEOGRAPHIC_TYPE_KEY))
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use tiff::encoder::TiffEncoder;
    use tiff::encoder::colortype::{ColorType, Gray32Float, Gray8};

    /// Write a georeferenced single-band GeoTIFF in rows-per-strip chunks
    pub(crate) fn write<C: ColorType>(
        path: &Path,
        data: &[C::Inner],
        cols: u32,
        rows: u32,
        transform: GeoTransform,
        epsg: Option<u16>,
        nodata: Option<&str>,
    ) where
        [C::Inner]: tiff::encoder::TiffValue,
    {
        let file = File::create(path).unwrap();
        let mut encoder = TiffEncoder::new(file).unwrap();
        let mut image = encoder.new_image::<C>(cols, rows).unwrap();
        image.rows_per_strip(2).unwrap();

        let scale = [transform.pixel_width, -transform.pixel_height, 0.0];
        let tiepoint = [0.0, 0.0, 0.0, transform.origin_x, transform.origin_y, 0.0];
        let enc = image.encoder();
        enc.write_tag(Tag::ModelPixelScaleTag, &scale[..]).unwrap();
        enc.write_tag(Tag::ModelTiepointTag, &tiepoint[..]).unwrap();
        if let Some(code) = epsg {
            let keys = [1u16, 1, 0, 1, PROJECTED_CS_TYPE_KEY, 0, 1, code];
            enc.write_tag(Tag::GeoKeyDirectoryTag, &keys[..]).unwrap();
        }
        if let Some(nd) = nodata {
            enc.write_tag(Tag::GdalNodata, nd).unwrap();
        }
        image.write_data(data).unwrap();
    }

    pub(crate) fn write_f32(path: &Path, data: &[f32], cols: u32, rows: u32, t: GeoTransform) {
        write::<Gray32Float>(path, data, cols, rows, t, Some(26915), Some("-9999"));
    }

    pub(crate) fn write_u8(path: &Path, data: &[u8], cols: u32, rows: u32, t: GeoTransform) {
        write::<Gray8>(path, data, cols, rows, t, None, Some("255"));
    }
}
