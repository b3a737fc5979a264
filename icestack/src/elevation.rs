//! Elevation-change stacks from ATL15 time series.

use crate::{
    axis::CropWindow,
    regrid::ScatteredRegridder,
    region::TargetGrid,
    stack::{Field, SliceTime, Stack},
    StackError,
};
use chrono::DateTime;
use icetile::TileSeries;
use log::debug;
use ndarray::Array3;
use std::collections::BTreeMap;

/// 2018-01-01T00:00:00Z, the ATL15 time origin, in Unix milliseconds.
pub const ATL15_EPOCH_UNIX_MS: i64 = 1_514_764_800_000;

const MS_PER_DAY: f64 = 86_400_000.0;

/// Converts ATL15 time offsets, in decimal days, into slice times.
pub fn slice_times(days: &[f64]) -> Result<Vec<SliceTime>, StackError> {
    days.iter()
        .map(|&day| {
            let ms = (day * MS_PER_DAY).round();
            // Comfortably inside chrono's representable range.
            if !ms.is_finite() || ms.abs() > 1.0e15 {
                return Err(StackError::Time(day));
            }
            #[allow(clippy::cast_possible_truncation)]
            let ms = ms as i64;
            DateTime::from_timestamp_millis(ATL15_EPOCH_UNIX_MS + ms)
                .map(|time| SliceTime::Instant(time.naive_utc()))
                .ok_or(StackError::Time(day))
        })
        .collect()
}

/// An elevation-change series cropped to a region, still on its
/// native grid.
#[derive(Debug, Clone)]
pub struct CroppedSeries {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub times: Vec<SliceTime>,

    /// Height change indexed `[time, y, x]`, nodata as NaN.
    pub delta_h: Array3<f32>,
}

/// Crops `series` to the padded window covering `grid`.
pub fn crop_series(series: &TileSeries, grid: &TargetGrid) -> Result<CroppedSeries, StackError> {
    let (x, y) = (series.x_axis(), series.y_axis());
    let window = CropWindow::for_grid(x, y, grid)?;
    let delta_h = window.crop_stack(series.samples()).to_owned();
    debug!("cropped series to {:?}", delta_h.dim());
    Ok(CroppedSeries {
        x: window.crop_x(x),
        y: window.crop_y(y),
        times: slice_times(series.times())?,
        delta_h,
    })
}

/// Regrids a cropped series onto `grid`, producing a
/// [`Field::DeltaH`] stack.
pub fn build_stack<F>(
    cropped: &CroppedSeries,
    grid: &TargetGrid,
    regridder: &ScatteredRegridder,
    on_slice: F,
) -> Result<Stack, StackError>
where
    F: Fn(usize) + Sync,
{
    let delta_h = regridder.regrid(
        &cropped.x,
        &cropped.y,
        cropped.delta_h.view(),
        grid,
        on_slice,
    )?;
    Stack::new(
        grid.x.clone(),
        grid.y.clone(),
        cropped.times.clone(),
        BTreeMap::from([(Field::DeltaH, delta_h)]),
    )
}
