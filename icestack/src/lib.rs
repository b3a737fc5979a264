//! Time stacks of ice-sheet velocity and elevation-change rasters.
//!
//! Velocity mosaics arrive as one GeoTIFF per variable per period.
//! [`match_tile_sets`] groups them into complete [`TileSet`]s,
//! [`StackAssembler`] crops, masks and stacks them, and [`order`]
//! sorts the result by time.
//!
//! Elevation change arrives as one time series on its own grid.
//! [`crop_series`] narrows it to the region and [`build_stack`]
//! resamples every slice onto the region's grid with a
//! [`ScatteredRegridder`].
//!
//! # References
//!
//! 1. [MEaSUREs Greenland Monthly Ice Sheet Velocity Mosaics](https://nsidc.org/data/nsidc-0731)
//! 1. [ATLAS/ICESat-2 L3B Gridded Antarctic and Arctic Land Ice Height Change (ATL15)](https://nsidc.org/data/atl15)

mod assembler;
mod axis;
mod date_pair;
mod elevation;
mod error;
mod matcher;
mod math;
mod order;
mod regrid;
mod region;
mod source;
mod stack;

pub use crate::{
    assembler::{
        magnitude, mask, Assembly, SliceReport, StackAssembler, ERROR_MIN, VELOCITY_SENTINEL_MIN,
    },
    axis::{resolve, CropWindow, PADDING},
    date_pair::DatePair,
    elevation::{build_stack, crop_series, slice_times, CroppedSeries, ATL15_EPOCH_UNIX_MS},
    error::StackError,
    matcher::{match_tile_sets, Role, TileSet},
    order::order,
    regrid::{NanPolicy, ScatteredRegridder},
    region::{DataType, Extent, RegionConfig, RegionKind, TargetGrid},
    source::{find_series, read_series, TileMode, TileReader, Tiles, SERIES_EXTENSIONS},
    stack::{Field, SliceTime, Stack},
};
pub use icetile;
