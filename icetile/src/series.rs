//! Time-indexed stacks of tiles.
//!
//! A GeoTIFF series is a multi-page file holding one page per time
//! slice. Every page shares the first page's grid, and each page's
//! `ImageDescription` holds its time offset as decimal days since the
//! series epoch. With the `netcdf` feature, ATL15 products can be read
//! directly (see [`TileSeries::load_atl15`]).

use crate::{open_decoder, read_page, tiff_err, TileError};
use log::debug;
use memmap2::Mmap;
use ndarray::{Array3, ArrayView3, Axis, ErrorKind, ShapeError};
use std::{
    fs::File,
    io::{BufReader, Cursor, Read, Seek},
    path::Path,
};

pub struct TileSeries {
    /// Column pixel centers.
    x: Vec<f64>,

    /// Row pixel centers.
    y: Vec<f64>,

    /// Time offset of each page, in days since the series epoch.
    times: Vec<f64>,

    /// Samples indexed `[time, row, col]`, nodata replaced by NaN.
    samples: Array3<f32>,
}

impl TileSeries {
    /// Returns a TileSeries read from the file at `path` through a
    /// buffered reader.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, TileError> {
        let path = path.as_ref();
        let file = BufReader::new(File::open(path)?);
        Self::decode(file, path)
    }

    /// Returns a TileSeries decoded from a memory map of the file at
    /// `path`.
    pub fn memmap<P: AsRef<Path>>(path: P) -> Result<Self, TileError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };
        Self::decode(Cursor::new(&mmap[..]), path)
    }

    pub fn x_axis(&self) -> &[f64] {
        &self.x
    }

    pub fn y_axis(&self) -> &[f64] {
        &self.y
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn samples(&self) -> ArrayView3<'_, f32> {
        self.samples.view()
    }
}

/// Crate API
impl TileSeries {
    /// Assembles a series from its parts, checking `samples` is
    /// `(times, y, x)` shaped.
    #[cfg_attr(not(feature = "netcdf"), allow(dead_code))]
    pub(crate) fn from_parts(
        x: Vec<f64>,
        y: Vec<f64>,
        times: Vec<f64>,
        samples: Array3<f32>,
    ) -> Result<Self, TileError> {
        if samples.dim() != (times.len(), y.len(), x.len()) {
            return Err(ShapeError::from_kind(ErrorKind::IncompatibleShape).into());
        }
        Ok(Self {
            x,
            y,
            times,
            samples,
        })
    }
}

/// Private API
impl TileSeries {
    fn decode<R: Read + Seek>(rdr: R, path: &Path) -> Result<Self, TileError> {
        let mut decoder = open_decoder(rdr, path)?;
        let mut pages = vec![read_page(&mut decoder, path)?];
        while decoder.more_images() {
            decoder.next_image().map_err(tiff_err(path))?;
            pages.push(read_page(&mut decoder, path)?);
        }

        let transform = pages[0].transform;
        let (rows, cols) = pages[0].samples.dim();
        let mut times = Vec::with_capacity(pages.len());
        for (page_idx, page) in pages.iter_mut().enumerate() {
            if page.transform != transform || page.samples.dim() != (rows, cols) {
                return Err(TileError::PageGrid {
                    path: path.to_owned(),
                    page: page_idx,
                });
            }
            let time = page
                .description
                .as_deref()
                .and_then(|raw| raw.trim_matches('\0').trim().parse::<f64>().ok())
                .filter(|days| days.is_finite())
                .ok_or_else(|| TileError::PageTime {
                    path: path.to_owned(),
                    page: page_idx,
                })?;
            times.push(time);
            page.mask_nodata();
        }

        let views: Vec<_> = pages.iter().map(|page| page.samples.view()).collect();
        let samples = ndarray::stack(Axis(0), &views)?;
        debug!("decoded {path:?}; dimensions: {:?}", samples.dim());
        Ok(Self {
            x: transform.x_axis(cols),
            y: transform.y_axis(rows),
            times,
            samples,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::TileSeries;
    use crate::{fixtures, TileError};
    use approx::assert_relative_eq;
    use tempfile::TempDir;

    #[test]
    fn test_series_open() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ATL15_GL_0314_01km_002_01.tif");
        let first = [1.0, 2.0, -9999.0, 4.0];
        let second = [5.0, 6.0, 7.0, 8.0];
        fixtures::write(
            &path,
            (0.0, 100.0),
            50.0,
            &[
                (Some("0.0"), Some("-9999"), 2, 2, &first),
                (Some("91.3125"), Some("-9999"), 2, 2, &second),
            ],
        );

        for series in [
            TileSeries::load(&path).unwrap(),
            TileSeries::memmap(&path).unwrap(),
        ] {
            assert_eq!(series.samples().dim(), (2, 2, 2));
            assert_eq!(series.times(), &[0.0, 91.3125]);
            assert!(series.samples()[[0, 1, 0]].is_nan());
            assert_eq!(series.samples()[[1, 1, 1]], 8.0);
            assert_relative_eq!(series.x_axis()[1], 75.0);
            assert_relative_eq!(series.y_axis()[0], 75.0);
        }
    }

    #[test]
    fn test_page_without_time() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("series.tif");
        let samples = [0.0; 4];
        fixtures::write(
            &path,
            (0.0, 100.0),
            50.0,
            &[
                (Some("3.5"), None, 2, 2, &samples),
                (None, None, 2, 2, &samples),
            ],
        );
        assert!(matches!(
            TileSeries::load(&path),
            Err(TileError::PageTime { page: 1, .. })
        ));
    }

    #[test]
    fn test_pages_must_share_grid() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("series.tif");
        fixtures::write(
            &path,
            (0.0, 100.0),
            50.0,
            &[
                (Some("0"), None, 2, 2, &[0.0; 4]),
                (Some("1"), None, 1, 2, &[0.0; 2]),
            ],
        );
        assert!(matches!(
            TileSeries::load(&path),
            Err(TileError::PageGrid { page: 1, .. })
        ));
    }
}
