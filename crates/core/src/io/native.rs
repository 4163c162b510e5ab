//! Native GeoTIFF reading/writing
//!
//! Uses the `tiff` crate for basic TIFF I/O. Only the georeferencing needed
//! to rebuild a [`Region`] is understood (ModelPixelScale + ModelTiepoint);
//! the optional GDAL no-data tag is honoured on read.

use std::fs::File;
use std::io::Cursor;
use std::path::Path;

use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::Gray32Float;
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;
use tracing::debug;

use crate::error::{Error, Result};
use crate::raster::{Grid, Region};

const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const GEO_KEY_DIRECTORY: u16 = 34735;
const GDAL_NODATA: u16 = 42113;

/// Read a GeoTIFF file into a Grid
pub fn read_geotiff<P: AsRef<Path>>(path: P) -> Result<Grid> {
    let file = File::open(path.as_ref())?;
    decode_geotiff(file)
}

/// Read a GeoTIFF from an in-memory buffer into a Grid
pub fn read_geotiff_from_buffer(data: &[u8]) -> Result<Grid> {
    decode_geotiff(Cursor::new(data))
}

fn decode_geotiff<R>(reader: R) -> Result<Grid>
where
    R: std::io::Read + std::io::Seek,
{
    let mut decoder = Decoder::new(reader)
        .map_err(|e| Error::Other(format!("TIFF decode error: {}", e)))?;

    let (width, height) = decoder
        .dimensions()
        .map_err(|e| Error::Other(format!("Cannot read dimensions: {}", e)))?;
    let rows = height as usize;
    let cols = width as usize;

    let region = match read_region(&mut decoder, rows, cols) {
        Ok(region) => region,
        Err(e) => {
            debug!("No usable georeferencing ({}), using unit cells", e);
            Region::from_shape(rows, cols, 0.0, rows as f64, 1.0, 1.0)?
        }
    };

    let nodata = decoder
        .get_tag_ascii_string(Tag::Unknown(GDAL_NODATA))
        .ok()
        .and_then(|s| s.trim_matches(char::from(0)).trim().parse::<f64>().ok());

    let result = decoder
        .read_image()
        .map_err(|e| Error::Other(format!("Cannot read image data: {}", e)))?;

    let data: Vec<f64> = match result {
        DecodingResult::F32(buf) => buf.iter().map(|&v| v as f64).collect(),
        DecodingResult::F64(buf) => buf,
        DecodingResult::U8(buf) => buf.iter().map(|&v| v as f64).collect(),
        DecodingResult::U16(buf) => buf.iter().map(|&v| v as f64).collect(),
        DecodingResult::U32(buf) => buf.iter().map(|&v| v as f64).collect(),
        DecodingResult::I8(buf) => buf.iter().map(|&v| v as f64).collect(),
        DecodingResult::I16(buf) => buf.iter().map(|&v| v as f64).collect(),
        DecodingResult::I32(buf) => buf.iter().map(|&v| v as f64).collect(),
        _ => return Err(Error::UnsupportedDataType("Unsupported TIFF pixel format".to_string())),
    };

    let data = match nodata {
        Some(nd) => data
            .into_iter()
            .map(|v| if v == nd { f64::NAN } else { v })
            .collect(),
        None => data,
    };

    Grid::from_vec(region, data)
}

/// Rebuild the region from ModelTiepointTag + ModelPixelScaleTag
fn read_region<R: std::io::Read + std::io::Seek>(
    decoder: &mut Decoder<R>,
    rows: usize,
    cols: usize,
) -> Result<Region> {
    let scale = decoder
        .get_tag_f64_vec(Tag::Unknown(MODEL_PIXEL_SCALE))
        .map_err(|_| Error::Other("No pixel scale tag".into()))?;
    let tiepoint = decoder
        .get_tag_f64_vec(Tag::Unknown(MODEL_TIEPOINT))
        .map_err(|_| Error::Other("No tiepoint tag".into()))?;

    if scale.len() < 2 || tiepoint.len() < 6 {
        return Err(Error::Other("Cannot determine region".into()));
    }

    // tiepoint: [I, J, K, X, Y, Z], scale: [ScaleX, ScaleY, ScaleZ]
    let west = tiepoint[3] - tiepoint[0] * scale[0];
    let north = tiepoint[4] + tiepoint[1] * scale[1];
    Region::from_shape(rows, cols, west, north, scale[1], scale[0])
}

/// Write a Grid to a GeoTIFF file as 32-bit float
pub fn write_geotiff<P: AsRef<Path>>(grid: &Grid, path: P) -> Result<()> {
    let file = File::create(path.as_ref())?;
    encode_geotiff(grid, file)
}

/// Write a Grid to an in-memory GeoTIFF buffer
pub fn write_geotiff_to_buffer(grid: &Grid) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    encode_geotiff(grid, Cursor::new(&mut buf))?;
    Ok(buf)
}

fn encode_geotiff<W>(grid: &Grid, writer: W) -> Result<()>
where
    W: std::io::Write + std::io::Seek,
{
    let mut encoder = TiffEncoder::new(writer)
        .map_err(|e| Error::Other(format!("TIFF encoder error: {}", e)))?;

    let (rows, cols) = grid.shape();
    let data: Vec<f32> = grid.data().iter().map(|&v| v as f32).collect();

    let mut image = encoder
        .new_image::<Gray32Float>(cols as u32, rows as u32)
        .map_err(|e| Error::Other(format!("Cannot create TIFF image: {}", e)))?;

    let region = grid.region();

    let scale = vec![region.ew_res, region.ns_res, 0.0];
    image
        .encoder()
        .write_tag(Tag::Unknown(MODEL_PIXEL_SCALE), scale.as_slice())
        .map_err(|e| Error::Other(format!("Cannot write scale tag: {}", e)))?;

    let tiepoint = vec![0.0, 0.0, 0.0, region.west, region.north, 0.0];
    image
        .encoder()
        .write_tag(Tag::Unknown(MODEL_TIEPOINT), tiepoint.as_slice())
        .map_err(|e| Error::Other(format!("Cannot write tiepoint tag: {}", e)))?;

    // Minimal GeoKey directory: projected model, pixel-is-area
    let geokeys: Vec<u16> = vec![
        1, 1, 0, 2,
        1024, 0, 1, 1,
        1025, 0, 1, 1,
    ];
    image
        .encoder()
        .write_tag(Tag::Unknown(GEO_KEY_DIRECTORY), geokeys.as_slice())
        .map_err(|e| Error::Other(format!("Cannot write geokey tag: {}", e)))?;

    image
        .write_data(&data)
        .map_err(|e| Error::Other(format!("Cannot write image data: {}", e)))?;

    Ok(())
}
