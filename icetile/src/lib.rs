//! Geo-referenced raster tiles stored as GeoTIFF.
//!
//! Only what ice-sheet mosaics need is supported: one band of samples
//! per page, geo-referenced through the ModelPixelScale/ModelTiepoint
//! tag pair (north-up, no rotation).
//!
//! # References
//!
//! 1. [GeoTIFF format specification](http://geotiff.maptools.org/spec/geotiff2.6.html)
//! 1. [GDAL_NODATA tag](https://gdal.org/drivers/raster/gtiff.html#nodata-value)
//! 1. [MEaSUREs Greenland Monthly Ice Sheet Velocity Mosaics](https://nsidc.org/data/nsidc-0731)
//! 1. [ATL15 product data dictionary](https://nsidc.org/data/atl15)

#[cfg(feature = "netcdf")]
mod atl15;
mod error;
mod series;

pub use crate::{error::TileError, series::TileSeries};
use log::debug;
use memmap2::Mmap;
use ndarray::{Array2, ArrayView2};
use std::{
    fs::File,
    io::{BufReader, Cursor, Read, Seek},
    path::Path,
};
use tiff::{
    decoder::{Decoder, DecodingResult, Limits},
    tags::Tag,
    TiffError,
};

fn model_pixel_scale() -> Tag {
    Tag::from_u16_exhaustive(33_550)
}

fn model_tiepoint() -> Tag {
    Tag::from_u16_exhaustive(33_922)
}

fn gdal_nodata() -> Tag {
    Tag::from_u16_exhaustive(42_113)
}

/// Affine mapping from pixel corners to projected coordinates.
///
/// Follows the GDAL convention: `origin_*` is the outer corner of
/// pixel `(0, 0)` and `pixel_height` is negative for north-up
/// rasters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub pixel_width: f64,
    pub origin_y: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    /// Builds a transform from the raw ModelPixelScale and
    /// ModelTiepoint tag values.
    fn from_tags(scale: &[f64], tiepoint: &[f64]) -> Option<Self> {
        let (&[sx, sy, ..], &[i, j, _, x, y, ..]) = (scale, tiepoint) else {
            return None;
        };
        let valid = [sx, sy, i, j, x, y].iter().all(|v| v.is_finite()) && sx > 0.0 && sy > 0.0;
        valid.then_some(Self {
            origin_x: x - i * sx,
            pixel_width: sx,
            origin_y: y + j * sy,
            pixel_height: -sy,
        })
    }

    /// Returns the x coordinate of each column's pixel center.
    #[allow(clippy::cast_precision_loss)]
    pub fn x_axis(&self, cols: usize) -> Vec<f64> {
        (0..cols)
            .map(|col| self.origin_x + (col as f64 + 0.5) * self.pixel_width)
            .collect()
    }

    /// Returns the y coordinate of each row's pixel center.
    #[allow(clippy::cast_precision_loss)]
    pub fn y_axis(&self, rows: usize) -> Vec<f64> {
        (0..rows)
            .map(|row| self.origin_y + (row as f64 + 0.5) * self.pixel_height)
            .collect()
    }
}

/// A single-band raster tile.
#[derive(Debug, Clone)]
pub struct Tile {
    transform: GeoTransform,

    /// Samples indexed `[row, col]`, row 0 being the northern edge.
    samples: Array2<f32>,
}

impl Tile {
    /// Returns a Tile read from the file at `path` through a buffered
    /// reader.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, TileError> {
        let path = path.as_ref();
        let file = BufReader::new(File::open(path)?);
        Self::decode(file, path)
    }

    /// Returns a Tile decoded from a memory map of the file at `path`.
    pub fn memmap<P: AsRef<Path>>(path: P) -> Result<Self, TileError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };
        Self::decode(Cursor::new(&mmap[..]), path)
    }

    pub fn new(transform: GeoTransform, samples: Array2<f32>) -> Self {
        Self { transform, samples }
    }

    /// Returns the number of (rows, columns) in this tile.
    pub fn dimensions(&self) -> (usize, usize) {
        self.samples.dim()
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn x_axis(&self) -> Vec<f64> {
        self.transform.x_axis(self.samples.ncols())
    }

    pub fn y_axis(&self) -> Vec<f64> {
        self.transform.y_axis(self.samples.nrows())
    }

    pub fn samples(&self) -> ArrayView2<'_, f32> {
        self.samples.view()
    }
}

/// Private API
impl Tile {
    fn decode<R: Read + Seek>(rdr: R, path: &Path) -> Result<Self, TileError> {
        let mut decoder = open_decoder(rdr, path)?;
        let Page {
            transform, samples, ..
        } = read_page(&mut decoder, path)?;
        debug!("decoded {path:?}; dimensions: {:?}", samples.dim());
        Ok(Self { transform, samples })
    }
}

/// One decoded TIFF page (image file directory).
struct Page {
    transform: GeoTransform,
    nodata: Option<f32>,
    description: Option<String>,
    samples: Array2<f32>,
}

impl Page {
    /// Replaces every sample equal to the nodata value with NaN.
    fn mask_nodata(&mut self) {
        if let Some(nodata) = self.nodata {
            self.samples
                .mapv_inplace(|sample| if sample == nodata { f32::NAN } else { sample });
        }
    }
}

fn open_decoder<R: Read + Seek>(rdr: R, path: &Path) -> Result<Decoder<R>, TileError> {
    Ok(Decoder::new(rdr)
        .map_err(tiff_err(path))?
        .with_limits(Limits::unlimited()))
}

fn read_page<R: Read + Seek>(decoder: &mut Decoder<R>, path: &Path) -> Result<Page, TileError> {
    let (cols, rows) = decoder.dimensions().map_err(tiff_err(path))?;
    let transform = {
        let scale = find_f64_vec(decoder, model_pixel_scale(), path)?;
        let tiepoint = find_f64_vec(decoder, model_tiepoint(), path)?;
        GeoTransform::from_tags(&scale, &tiepoint)
            .ok_or_else(|| TileError::GeoReference(path.to_owned()))?
    };
    #[allow(clippy::cast_possible_truncation)]
    let nodata = find_ascii(decoder, gdal_nodata(), path)?
        .and_then(|raw| raw.trim_matches('\0').trim().parse::<f64>().ok())
        .map(|nodata| nodata as f32);
    let description = find_ascii(decoder, Tag::ImageDescription, path)?;
    let samples = into_f32(decoder.read_image().map_err(tiff_err(path))?)
        .ok_or_else(|| TileError::SampleFormat(path.to_owned()))?;
    let samples = Array2::from_shape_vec((rows as usize, cols as usize), samples)?;
    Ok(Page {
        transform,
        nodata,
        description,
        samples,
    })
}

fn find_f64_vec<R: Read + Seek>(
    decoder: &mut Decoder<R>,
    tag: Tag,
    path: &Path,
) -> Result<Vec<f64>, TileError> {
    decoder
        .find_tag(tag)
        .and_then(|value| value.map(|value| value.into_f64_vec()).transpose())
        .map_err(tiff_err(path))?
        .ok_or_else(|| TileError::GeoReference(path.to_owned()))
}

fn find_ascii<R: Read + Seek>(
    decoder: &mut Decoder<R>,
    tag: Tag,
    path: &Path,
) -> Result<Option<String>, TileError> {
    decoder
        .find_tag(tag)
        .and_then(|value| value.map(|value| value.into_string()).transpose())
        .map_err(tiff_err(path))
}

#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
fn into_f32(result: DecodingResult) -> Option<Vec<f32>> {
    let samples = match result {
        DecodingResult::F32(samples) => samples,
        DecodingResult::F64(samples) => samples.into_iter().map(|s| s as f32).collect(),
        DecodingResult::I16(samples) => samples.into_iter().map(f32::from).collect(),
        DecodingResult::I32(samples) => samples.into_iter().map(|s| s as f32).collect(),
        DecodingResult::U8(samples) => samples.into_iter().map(f32::from).collect(),
        DecodingResult::U16(samples) => samples.into_iter().map(f32::from).collect(),
        _ => return None,
    };
    Some(samples)
}

fn tiff_err(path: &Path) -> impl Fn(TiffError) -> TileError + '_ {
    move |source| TileError::Tiff {
        path: path.to_owned(),
        source,
    }
}

/// GeoTIFF writers for tests.
#[cfg(any(test, feature = "test-utils"))]
pub mod fixtures {
    use super::{gdal_nodata, model_pixel_scale, model_tiepoint};
    use std::{fs::File, path::Path};
    use tiff::{
        encoder::{colortype::Gray32Float, TiffEncoder},
        tags::Tag,
    };

    /// A page to write: `(description, nodata, rows, cols, samples)`.
    pub type FixturePage<'a> = (Option<&'a str>, Option<&'a str>, u32, u32, &'a [f32]);

    /// Writes a north-up GeoTIFF whose pixel `(0, 0)` has its outer
    /// corner at `corner` and whose pixels are `posting` wide.
    pub fn write(path: &Path, corner: (f64, f64), posting: f64, pages: &[FixturePage]) {
        let mut encoder = TiffEncoder::new(File::create(path).unwrap()).unwrap();
        for (description, nodata, rows, cols, samples) in pages {
            let mut image = encoder.new_image::<Gray32Float>(*cols, *rows).unwrap();
            let dir = image.encoder();
            dir.write_tag(model_pixel_scale(), &[posting, posting, 0.0][..])
                .unwrap();
            dir.write_tag(
                model_tiepoint(),
                &[0.0, 0.0, 0.0, corner.0, corner.1, 0.0][..],
            )
            .unwrap();
            if let Some(description) = description {
                dir.write_tag(Tag::ImageDescription, *description).unwrap();
            }
            if let Some(nodata) = nodata {
                dir.write_tag(gdal_nodata(), *nodata).unwrap();
            }
            image.write_data(samples).unwrap();
        }
    }

    /// Writes a single-page tile without time or nodata tags.
    pub fn write_tile(
        path: &Path,
        corner: (f64, f64),
        posting: f64,
        (rows, cols): (u32, u32),
        samples: &[f32],
    ) {
        write(path, corner, posting, &[(None, None, rows, cols, samples)]);
    }
}

#[cfg(test)]
mod tests {
    use super::{fixtures, GeoTransform, Tile, TileError};
    use approx::assert_relative_eq;
    use std::{fs::File, path::PathBuf};
    use tempfile::TempDir;
    use tiff::encoder::{colortype::Gray32Float, TiffEncoder};

    fn velocity_tile(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("GL_vel_mosaic_Monthly_01Dec14_31Dec14_vx_v04.0.tif");
        let samples: Vec<f32> = (0..12).map(|v| v as f32).collect();
        fixtures::write_tile(&path, (-200_000.0, -2_000_000.0), 100.0, (3, 4), &samples);
        path
    }

    #[test]
    fn test_geo_transform_from_tags() {
        let transform =
            GeoTransform::from_tags(&[50.0, 50.0, 0.0], &[2.0, 1.0, 0.0, 1000.0, 500.0, 0.0])
                .unwrap();
        assert_eq!(
            transform,
            GeoTransform {
                origin_x: 900.0,
                pixel_width: 50.0,
                origin_y: 550.0,
                pixel_height: -50.0,
            }
        );
        assert!(GeoTransform::from_tags(&[0.0, 50.0, 0.0], &[0.0; 6]).is_none());
        assert!(GeoTransform::from_tags(&[50.0], &[0.0; 6]).is_none());
    }

    #[test]
    fn test_tile_open() {
        let dir = TempDir::new().unwrap();
        let path = velocity_tile(&dir);
        let loaded = Tile::load(&path).unwrap();
        let mapped = Tile::memmap(&path).unwrap();
        assert_eq!(loaded.dimensions(), (3, 4));
        assert_eq!(loaded.samples(), mapped.samples());
        assert_eq!(loaded.samples()[[1, 2]], 6.0);
        assert_eq!(loaded.transform(), mapped.transform());
    }

    #[test]
    fn test_tile_axes_are_pixel_centers() {
        let dir = TempDir::new().unwrap();
        let tile = Tile::load(velocity_tile(&dir)).unwrap();
        let x = tile.x_axis();
        let y = tile.y_axis();
        assert_eq!(x.len(), 4);
        assert_eq!(y.len(), 3);
        assert_relative_eq!(x[0], -199_950.0);
        assert_relative_eq!(x[3], -199_650.0);
        // North-up, so y descends.
        assert_relative_eq!(y[0], -2_000_050.0);
        assert_relative_eq!(y[2], -2_000_250.0);
    }

    #[test]
    fn test_missing_geo_reference() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("plain.tif");
        let mut encoder = TiffEncoder::new(File::create(&path).unwrap()).unwrap();
        encoder
            .write_image::<Gray32Float>(2, 2, &[0.0, 1.0, 2.0, 3.0])
            .unwrap();
        assert!(matches!(
            Tile::load(&path),
            Err(TileError::GeoReference(p)) if p == path
        ));
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            Tile::load(dir.path().join("nope.tif")),
            Err(TileError::Io(_))
        ));
    }
}
