//! Padded index windows over coordinate axes.

use crate::{
    region::{DataType, Extent, RegionConfig, TargetGrid},
    StackError,
};
use log::debug;
use ndarray::{s, ArrayView2, ArrayView3};
use std::ops::Range;

/// Samples added beyond each nearest-index bound.
pub const PADDING: usize = 10;

/// Returns the half-open index range `(index_min, index_max)` of
/// `axis` covering `[lower_bound, upper_bound]`, padded by
/// [`PADDING`] samples on each side.
///
/// Bounds are matched to their nearest sample by absolute difference,
/// so the axis may ascend or descend and the bounds may be given in
/// either order. A padded lower index within `PADDING` of the start
/// snaps to 0; a padded upper index at or past the end snaps to
/// `axis.len()`.
pub fn resolve(
    axis: &[f64],
    lower_bound: f64,
    upper_bound: f64,
) -> Result<(usize, usize), StackError> {
    if !(lower_bound.is_finite() && upper_bound.is_finite()) {
        return Err(StackError::Bound);
    }
    let lower = nearest_index(axis, lower_bound).ok_or(StackError::EmptyAxis)?;
    let upper = nearest_index(axis, upper_bound).ok_or(StackError::EmptyAxis)?;
    let (lo, hi) = (lower.min(upper), lower.max(upper));
    let index_min = if lo <= PADDING { 0 } else { lo - PADDING };
    let index_max = if hi + PADDING >= axis.len() {
        axis.len()
    } else {
        hi + PADDING
    };
    Ok((index_min, index_max))
}

/// Returns the index of the first sample nearest to `value`.
fn nearest_index(axis: &[f64], value: f64) -> Option<usize> {
    axis.iter()
        .enumerate()
        .filter(|(_, coord)| !coord.is_nan())
        .min_by(|(_, a), (_, b)| (*a - value).abs().total_cmp(&(*b - value).abs()))
        .map(|(idx, _)| idx)
}

/// Row and column ranges selecting a region from a native grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CropWindow {
    pub rows: Range<usize>,
    pub cols: Range<usize>,
}

impl CropWindow {
    /// Returns the window of the native `(x, y)` axes covering
    /// `extent`.
    pub fn for_extent(x: &[f64], y: &[f64], extent: &Extent) -> Result<Self, StackError> {
        Self::resolve(x, y, (extent.xmin, extent.xmax), (extent.ymax, extent.ymin))
    }

    /// Returns the window of the native `(x, y)` axes covering the
    /// first through last samples of `grid`.
    pub fn for_grid(x: &[f64], y: &[f64], grid: &TargetGrid) -> Result<Self, StackError> {
        let (Some(&x0), Some(&x1), Some(&y0), Some(&y1)) =
            (grid.x.first(), grid.x.last(), grid.y.first(), grid.y.last())
        else {
            return Err(StackError::EmptyAxis);
        };
        Self::resolve(x, y, (x0, x1), (y0, y1))
    }

    /// Returns the window covering the region grid selected by the
    /// `data_type` tag.
    ///
    /// Fails on any tag other than velocity or elevation.
    pub fn for_data_type(
        region: &RegionConfig,
        data_type: &str,
        x: &[f64],
        y: &[f64],
    ) -> Result<Self, StackError> {
        let data_type: DataType = data_type.parse()?;
        Self::for_grid(x, y, region.grid(data_type))
    }

    fn resolve(
        x: &[f64],
        y: &[f64],
        x_bounds: (f64, f64),
        y_bounds: (f64, f64),
    ) -> Result<Self, StackError> {
        let (col_min, col_max) = resolve(x, x_bounds.0, x_bounds.1)?;
        let (row_min, row_max) = resolve(y, y_bounds.0, y_bounds.1)?;
        let window = Self {
            rows: row_min..row_max,
            cols: col_min..col_max,
        };
        debug!("crop window; rows: {:?}, cols: {:?}", window.rows, window.cols);
        Ok(window)
    }

    /// Returns the (rows, columns) selected by this window.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows.len(), self.cols.len())
    }

    pub fn crop_x(&self, x: &[f64]) -> Vec<f64> {
        x[self.cols.clone()].to_vec()
    }

    pub fn crop_y(&self, y: &[f64]) -> Vec<f64> {
        y[self.rows.clone()].to_vec()
    }

    /// Crops a `[row, col]` grid.
    pub fn crop<'a>(&self, grid: ArrayView2<'a, f32>) -> ArrayView2<'a, f32> {
        grid.slice_move(s![self.rows.clone(), self.cols.clone()])
    }

    /// Crops every slice of a `[time, row, col]` stack.
    pub fn crop_stack<'a>(&self, stack: ArrayView3<'a, f32>) -> ArrayView3<'a, f32> {
        stack.slice_move(s![.., self.rows.clone(), self.cols.clone()])
    }
}
