//! Region of interest and the grids stacks are built on.

use crate::{math::linspace, StackError};
use log::debug;
use serde::{Deserialize, Serialize};
use std::{fmt, fs::File, io::BufReader, path::Path, str::FromStr};

/// Which ice sheet a region lies on.
///
/// Only supplies defaults and file naming conventions; all regions
/// are processed the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionKind {
    Antarctic,
    Greenland,
}

impl RegionKind {
    /// Default grid spacing, in meters.
    pub fn posting(self) -> f64 {
        match self {
            Self::Antarctic => 100.0,
            Self::Greenland => 50.0,
        }
    }

    /// EPSG code of the polar stereographic projection.
    pub fn epsg(self) -> u32 {
        match self {
            Self::Antarctic => 3031,
            Self::Greenland => 3413,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Antarctic => "Antarctic",
            Self::Greenland => "Greenland",
        }
    }

    /// Ice sheet marker embedded in elevation-change file names.
    pub fn file_marker(self) -> &'static str {
        match self {
            Self::Antarctic => "AA",
            Self::Greenland => "GL",
        }
    }
}

/// A rectangular region of interest in projected coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl Extent {
    pub fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Result<Self, StackError> {
        let extent = Self {
            xmin,
            ymin,
            xmax,
            ymax,
        };
        extent.validate()?;
        Ok(extent)
    }

    fn validate(&self) -> Result<(), StackError> {
        let Self {
            xmin,
            ymin,
            xmax,
            ymax,
        } = *self;
        let finite = [xmin, ymin, xmax, ymax].iter().all(|v| v.is_finite());
        if finite && xmin < xmax && ymin < ymax {
            Ok(())
        } else {
            Err(StackError::Extent {
                xmin,
                ymin,
                xmax,
                ymax,
            })
        }
    }
}

/// The regular grid a stack is delivered on.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetGrid {
    /// Column coordinates, ascending.
    pub x: Vec<f64>,

    /// Row coordinates, descending (north-up).
    pub y: Vec<f64>,

    /// Grid spacing, in the same units as `x` and `y`.
    pub posting: f64,

    pub epsg: u32,
}

impl TargetGrid {
    /// Returns a grid anchored at the extent's upper-left corner with
    /// `posting` spacing, covering the extent to the nearest posting.
    pub fn from_extent(extent: &Extent, posting: f64, epsg: u32) -> Result<Self, StackError> {
        extent.validate()?;
        if !(posting.is_finite() && posting > 0.0) {
            return Err(StackError::Posting(posting));
        }
        let samples = |span: f64| {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let steps = (span / posting).round().max(1.0) as usize;
            steps + 1
        };
        let (nx, ny) = (
            samples(extent.xmax - extent.xmin),
            samples(extent.ymax - extent.ymin),
        );
        #[allow(clippy::cast_precision_loss)]
        let x = linspace(extent.xmin, extent.xmin + (nx - 1) as f64 * posting, nx).collect();
        #[allow(clippy::cast_precision_loss)]
        let y = linspace(extent.ymax, extent.ymax - (ny - 1) as f64 * posting, ny).collect();
        Ok(Self {
            x,
            y,
            posting,
            epsg,
        })
    }

    /// Returns the (rows, columns) of this grid.
    pub fn shape(&self) -> (usize, usize) {
        (self.y.len(), self.x.len())
    }
}

/// Selects which of a region's grids governs cropping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Velocity,
    Elevation,
}

impl FromStr for DataType {
    type Err = StackError;

    fn from_str(tag: &str) -> Result<Self, StackError> {
        match tag.to_ascii_lowercase().as_str() {
            "velocity" => Ok(Self::Velocity),
            "elevation" => Ok(Self::Elevation),
            _ => Err(StackError::DataType(tag.to_owned())),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Velocity => f.write_str("velocity"),
            Self::Elevation => f.write_str("elevation"),
        }
    }
}

/// Immutable description of one region of interest.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionConfig {
    name: String,
    kind: RegionKind,
    extent: Extent,
    velocity_grid: TargetGrid,
    elevation_grid: TargetGrid,
}

/// On-disk (JSON) form of a [`RegionConfig`].
#[derive(Debug, Deserialize)]
struct RegionFile {
    name: String,
    kind: RegionKind,
    extent: Extent,
    #[serde(default)]
    posting: Option<f64>,
}

impl RegionConfig {
    /// Returns a region whose grids span `extent` at `posting`, or at
    /// the ice sheet's default posting when `None`.
    pub fn new(
        name: impl Into<String>,
        kind: RegionKind,
        extent: Extent,
        posting: Option<f64>,
    ) -> Result<Self, StackError> {
        let posting = posting.unwrap_or_else(|| kind.posting());
        let velocity_grid = TargetGrid::from_extent(&extent, posting, kind.epsg())?;
        let elevation_grid = velocity_grid.clone();
        Ok(Self {
            name: name.into(),
            kind,
            extent,
            velocity_grid,
            elevation_grid,
        })
    }

    /// Reads a region from a JSON document such as:
    ///
    /// ```json
    /// {
    ///   "name": "Jakobshavn",
    ///   "kind": "greenland",
    ///   "extent": { "xmin": -210000, "ymin": -2290000, "xmax": -140000, "ymax": -2240000 },
    ///   "posting": 100
    /// }
    /// ```
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, StackError> {
        let rdr = BufReader::new(File::open(path.as_ref())?);
        let RegionFile {
            name,
            kind,
            extent,
            posting,
        } = serde_json::from_reader(rdr)?;
        let region = Self::new(name, kind, extent, posting)?;
        debug!(
            "region {}; grid (rows, cols): {:?}",
            region.name,
            region.velocity_grid.shape()
        );
        Ok(region)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> RegionKind {
        self.kind
    }

    pub fn extent(&self) -> &Extent {
        &self.extent
    }

    /// Returns the grid that governs cropping for `data_type`.
    pub fn grid(&self, data_type: DataType) -> &TargetGrid {
        match data_type {
            DataType::Velocity => &self.velocity_grid,
            DataType::Elevation => &self.elevation_grid,
        }
    }
}
