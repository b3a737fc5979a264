//! Scattered-data regridding of time slices onto a target grid.
//!
//! Every source pixel centre becomes one scattered sample. Each slice
//! is interpolated piecewise-linearly on the Delaunay triangulation
//! of its samples; target cells outside the samples' convex hull are
//! NaN.

use crate::{region::TargetGrid, StackError};
use log::{debug, info};
use ndarray::{Array2, Array3, ArrayView2, ArrayView3, Axis};
use rayon::prelude::*;
use spade::{DelaunayTriangulation, FloatTriangulation, HasPosition, Point2, Triangulation};

/// What to do with NaN source samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NanPolicy {
    /// Triangulate NaN samples like any other. Every target cell whose
    /// interpolation touches one is NaN.
    #[default]
    Propagate,

    /// Remove NaN samples before triangulating, so their neighbours
    /// interpolate across the gap.
    Drop,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ScatteredRegridder {
    nan_policy: NanPolicy,
}

/// A scattered sample.
#[derive(Debug, Clone, Copy)]
struct Sample {
    position: Point2<f64>,
    value: f64,
}

impl HasPosition for Sample {
    type Scalar = f64;

    fn position(&self) -> Point2<f64> {
        self.position
    }
}

impl ScatteredRegridder {
    pub fn new(nan_policy: NanPolicy) -> Self {
        Self { nan_policy }
    }

    /// Returns `slices`, indexed `[time, y, x]` over the source axes,
    /// resampled onto `target`.
    ///
    /// Slices are interpolated independently and in parallel;
    /// `on_slice` is called with each slice's index as it completes.
    pub fn regrid<F>(
        &self,
        source_x: &[f64],
        source_y: &[f64],
        slices: ArrayView3<'_, f32>,
        target: &TargetGrid,
        on_slice: F,
    ) -> Result<Array3<f32>, StackError>
    where
        F: Fn(usize) + Sync,
    {
        let (times, rows, cols) = slices.dim();
        if (rows, cols) != (source_y.len(), source_x.len()) {
            return Err(StackError::Shape {
                what: "source slices".to_owned(),
                expected: vec![times, source_y.len(), source_x.len()],
                found: vec![times, rows, cols],
            });
        }

        let shape = target.shape();
        let target_points: Vec<Point2<f64>> = target
            .y
            .iter()
            .flat_map(|&y| target.x.iter().map(move |&x| Point2::new(x, y)))
            .collect();
        info!(
            "regridding {times} slices of {rows} x {cols} onto {} x {}",
            shape.0, shape.1
        );

        let regridded = (0..times)
            .into_par_iter()
            .map(|time| -> Result<_, StackError> {
                let grid = self.regrid_slice(
                    source_x,
                    source_y,
                    slices.index_axis(Axis(0), time),
                    &target_points,
                    shape,
                )?;
                on_slice(time);
                Ok(grid)
            })
            .collect::<Result<Vec<_>, StackError>>()?;

        let mut output = Array3::from_elem((times, shape.0, shape.1), f32::NAN);
        for (time, grid) in regridded.into_iter().enumerate() {
            output.index_axis_mut(Axis(0), time).assign(&grid);
        }
        Ok(output)
    }
}

/// Private API.
impl ScatteredRegridder {
    fn regrid_slice(
        &self,
        source_x: &[f64],
        source_y: &[f64],
        slice: ArrayView2<'_, f32>,
        target_points: &[Point2<f64>],
        shape: (usize, usize),
    ) -> Result<Array2<f32>, StackError> {
        let samples: Vec<Sample> = slice
            .indexed_iter()
            .filter(|(_, value)| self.nan_policy == NanPolicy::Propagate || !value.is_nan())
            .map(|((row, col), &value)| Sample {
                position: Point2::new(source_x[col], source_y[row]),
                value: f64::from(value),
            })
            .collect();
        debug!("triangulating {} samples", samples.len());
        let triangulation: DelaunayTriangulation<Sample> =
            DelaunayTriangulation::bulk_load(samples).map_err(StackError::Triangulation)?;
        let interpolator = triangulation.barycentric();

        #[allow(clippy::cast_possible_truncation)]
        let values: Vec<f32> = target_points
            .iter()
            .map(|&point| {
                interpolator
                    .interpolate(|vertex| vertex.data().value, point)
                    .map_or(f32::NAN, |value| value as f32)
            })
            .collect();
        Ok(Array2::from_shape_vec(shape, values)?)
    }
}
