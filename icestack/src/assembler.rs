//! Velocity stack assembly from matched tile sets.

use crate::{
    axis::CropWindow,
    matcher::{Role, TileSet},
    region::Extent,
    source::TileReader,
    stack::{Field, SliceTime, Stack},
    StackError,
};
use log::{info, warn};
use ndarray::{Array3, ArrayView2, ArrayViewMut2, Axis, Zip};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;

/// Velocity components below this value are nodata.
pub const VELOCITY_SENTINEL_MIN: f32 = -1.0e9;

/// Error components below this value are nodata.
pub const ERROR_MIN: f32 = 0.0;

/// Replaces nodata samples of a `role` grid with NaN.
pub fn mask(role: Role, mut grid: ArrayViewMut2<'_, f32>) {
    let min = match role {
        Role::Vx | Role::Vy => VELOCITY_SENTINEL_MIN,
        Role::Ex | Role::Ey => ERROR_MIN,
        Role::DeltaH => return,
    };
    grid.mapv_inplace(|v| if v < min { f32::NAN } else { v });
}

/// Writes the elementwise euclidean norm of `a` and `b` to `out`.
///
/// NaN in either component yields NaN.
pub fn magnitude(a: ArrayView2<'_, f32>, b: ArrayView2<'_, f32>, out: ArrayViewMut2<'_, f32>) {
    Zip::from(out)
        .and(a)
        .and(b)
        .for_each(|out, &a, &b| *out = (a * a + b * b).sqrt());
}

/// Mutable views of one slice of every velocity field, in
/// [`Field::VELOCITY`] order.
type SliceViews<'a> = [ArrayViewMut2<'a, f32>; 6];

/// Provenance of one assembled slice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SliceReport {
    /// Position of the slice in assembly order.
    pub index: usize,
    pub label: String,
    pub file_id: String,

    /// Cells with a defined velocity magnitude.
    pub valid_cells: usize,

    /// Cells whose velocity magnitude is NaN.
    pub masked_cells: usize,
}

/// Outcome of a velocity assembly run.
#[derive(Debug)]
pub enum Assembly {
    /// No tile set had all four velocity roles.
    NoCompleteSets,

    Built {
        stack: Stack,
        report: Vec<SliceReport>,
    },
}

/// Builds velocity stacks over one extent.
pub struct StackAssembler<'a, R> {
    reader: &'a R,
    extent: Extent,
}

impl<'a, R: TileReader> StackAssembler<'a, R> {
    pub fn new(reader: &'a R, extent: Extent) -> Self {
        Self { reader, extent }
    }

    /// Assembles one slice per tile set, in `sets` order.
    ///
    /// Every tile must share the native grid of the first set's
    /// x-velocity tile. `on_slice` is called as each slice completes,
    /// possibly from several threads and in any order.
    ///
    /// Any tile read failure fails the whole assembly.
    pub fn assemble<F>(&self, sets: &[TileSet], on_slice: F) -> Result<Assembly, StackError>
    where
        F: Fn(&SliceReport) + Sync,
    {
        let Some(first) = sets.first() else {
            warn!("no complete tile sets to assemble");
            return Ok(Assembly::NoCompleteSets);
        };

        let native = self.reader.read(&first.vx, Role::Vx)?;
        let (native_x, native_y) = (native.x_axis(), native.y_axis());
        let window = CropWindow::for_extent(&native_x, &native_y, &self.extent)?;
        let native_dim = native.dimensions();
        drop(native);

        let (rows, cols) = window.shape();
        let mut grids =
            Field::VELOCITY.map(|_| Array3::from_elem((sets.len(), rows, cols), f32::NAN));

        let total = sets.len();
        let [vx, vy, v, ex, ey, e] = &mut grids;
        let views: Vec<SliceViews<'_>> = vx
            .axis_iter_mut(Axis(0))
            .zip(vy.axis_iter_mut(Axis(0)))
            .zip(v.axis_iter_mut(Axis(0)))
            .zip(ex.axis_iter_mut(Axis(0)))
            .zip(ey.axis_iter_mut(Axis(0)))
            .zip(e.axis_iter_mut(Axis(0)))
            .map(|(((((vx, vy), v), ex), ey), e)| [vx, vy, v, ex, ey, e])
            .collect();
        let report = sets
            .par_iter()
            .zip(views)
            .enumerate()
            .map(|(index, (set, views))| -> Result<_, StackError> {
                info!(
                    "assembling slice {} of {total}: {}",
                    index + 1,
                    set.date_pair
                );
                let masked_cells = self.slice(set, &window, native_dim, views)?;
                let report = SliceReport {
                    index,
                    label: set.date_pair.to_string(),
                    file_id: set.file_id.clone(),
                    valid_cells: rows * cols - masked_cells,
                    masked_cells,
                };
                on_slice(&report);
                Ok(report)
            })
            .collect::<Result<Vec<_>, StackError>>()?;

        let times = sets
            .iter()
            .map(|set| SliceTime::Period(set.date_pair))
            .collect();
        let fields: BTreeMap<Field, Array3<f32>> = Field::VELOCITY.into_iter().zip(grids).collect();
        let stack = Stack::new(window.crop_x(&native_x), window.crop_y(&native_y), times, fields)?;
        Ok(Assembly::Built { stack, report })
    }
}

/// Private API.
impl<'a, R: TileReader> StackAssembler<'a, R> {
    /// Writes the cropped, masked grids of one slice to `views` and
    /// returns the number of cells whose velocity magnitude is NaN.
    fn slice(
        &self,
        set: &TileSet,
        window: &CropWindow,
        native_dim: (usize, usize),
        views: SliceViews<'_>,
    ) -> Result<usize, StackError> {
        let read = |(role, name): (Role, &str),
                    mut out: ArrayViewMut2<'_, f32>|
         -> Result<(), StackError> {
            let tile = self.reader.read(name, role)?;
            if tile.dimensions() != native_dim {
                let (rows, cols) = tile.dimensions();
                return Err(StackError::Shape {
                    what: format!("tile {name}"),
                    expected: vec![native_dim.0, native_dim.1],
                    found: vec![rows, cols],
                });
            }
            out.assign(&window.crop(tile.samples()));
            mask(role, out);
            Ok(())
        };
        let [mut vx, mut vy, mut v, mut ex, mut ey, mut e] = views;
        let [vx_file, vy_file, ex_file, ey_file] = set.files();
        read(vx_file, vx.view_mut())?;
        read(vy_file, vy.view_mut())?;
        read(ex_file, ex.view_mut())?;
        read(ey_file, ey.view_mut())?;
        magnitude(vx.view(), vy.view(), v.view_mut());
        magnitude(ex.view(), ey.view(), e.view_mut());
        Ok(v.iter().filter(|v| v.is_nan()).count())
    }
}

#[cfg(test)]
mod tests {
    use super::{magnitude, mask, Assembly, SliceReport, StackAssembler, ERROR_MIN};
    use crate::{
        axis::CropWindow,
        matcher::{match_tile_sets, Role},
        region::Extent,
        source::TileReader,
        stack::Field,
        StackError,
    };
    use approx::assert_relative_eq;
    use icetile::{GeoTransform, Tile};
    use ndarray::{array, Array2};
    use std::{collections::HashMap, sync::Mutex};

    const NATIVE: GeoTransform = GeoTransform {
        origin_x: 0.0,
        pixel_width: 1.0,
        origin_y: 30.0,
        pixel_height: -1.0,
    };

    #[derive(Default)]
    struct MemTiles(HashMap<String, Tile>);

    impl MemTiles {
        fn insert(&mut self, name: &str, samples: Array2<f32>) {
            self.0.insert(name.to_owned(), Tile::new(NATIVE, samples));
        }
    }

    impl TileReader for MemTiles {
        fn read(&self, name: &str, _role: Role) -> Result<Tile, StackError> {
            self.0
                .get(name)
                .cloned()
                .ok_or_else(|| StackError::Path(name.into()))
        }
    }

    fn file_name(period: &str, role: &str) -> String {
        format!("GL_vel_mosaic_Monthly_{period}_{role}_v04.0.tif")
    }

    /// Three periods, out of chronological order, on a 30 x 30 grid.
    fn fixture_tiles() -> (MemTiles, Vec<String>) {
        let mut tiles = MemTiles::default();
        let mut names = Vec::new();
        for period in ["01Mar15_31Mar15", "01Jan15_31Jan15", "01Feb15_28Feb15"] {
            for (role, value) in [("vx", 3.0), ("vy", 4.0), ("ex", 1.0), ("ey", 1.0)] {
                let name = file_name(period, role);
                tiles.insert(
                    &name,
                    Array2::from_elem((30, 30), value),
                );
                names.push(name);
            }
        }
        (tiles, names)
    }

    fn extent() -> Extent {
        Extent::new(12.5, 12.5, 16.5, 16.5).unwrap()
    }

    #[test]
    fn test_mask() {
        let mut velocity = array![[-2.0e9, -5.0e8, 10.0]];
        mask(Role::Vx, velocity.view_mut());
        assert!(velocity[[0, 0]].is_nan());
        assert_eq!(velocity[[0, 1]], -5.0e8);

        let mut error = array![[-0.5, ERROR_MIN, 2.0]];
        mask(Role::Ey, error.view_mut());
        assert!(error[[0, 0]].is_nan());
        assert_eq!(error[[0, 1]], 0.0);

        let mut delta = array![[-3.0e9]];
        mask(Role::DeltaH, delta.view_mut());
        assert_eq!(delta[[0, 0]], -3.0e9);
    }

    #[test]
    fn test_magnitude_in_place() {
        let a = array![[3.0, f32::NAN], [0.0, -6.0]];
        let b = array![[4.0, 1.0], [0.0, 8.0]];
        let mut out = Array2::from_elem((2, 2), -1.0);
        magnitude(a.view(), b.view(), out.view_mut());
        assert_eq!(out[[0, 0]], 5.0);
        assert!(out[[0, 1]].is_nan());
        assert_eq!(out[[1, 0]], 0.0);
        assert_eq!(out[[1, 1]], 10.0);
    }

    #[test]
    fn test_assemble_shapes() {
        let (tiles, names) = fixture_tiles();
        let sets = match_tile_sets(&names).unwrap();
        let calls = Mutex::new(Vec::new());
        let Assembly::Built { stack, report } = StackAssembler::new(&tiles, extent())
            .assemble(&sets, |slice: &SliceReport| {
                calls.lock().unwrap().push(slice.index)
            })
            .unwrap()
        else {
            panic!("expected a stack");
        };

        let native = &tiles.0[&names[0]];
        let window = CropWindow::for_extent(&native.x_axis(), &native.y_axis(), &extent()).unwrap();
        let (rows, cols) = window.shape();
        assert_eq!((rows, cols), (24, 24));
        assert_eq!(stack.len(), 3);
        assert_eq!(stack.x().len(), cols);
        assert_eq!(stack.y().len(), rows);
        assert_relative_eq!(stack.x()[0], 2.5);
        assert_relative_eq!(stack.y()[0], 26.5);
        for (_, samples) in stack.fields() {
            assert_eq!(samples.dim(), (3, rows, cols));
        }
        assert_eq!(stack.fields().count(), 6);

        // Slices stay in tile set order until ordered.
        assert_eq!(stack.times()[0].label(), "20150301-20150331");
        assert_eq!(report.len(), 3);
        assert_eq!(report[1].label, "20150101-20150131");
        assert!(report.iter().all(|r| r.valid_cells == rows * cols && r.masked_cells == 0));
        let mut calls = calls.into_inner().unwrap();
        calls.sort_unstable();
        assert_eq!(calls, [0, 1, 2]);
    }

    #[test]
    fn test_magnitude_and_masking() {
        let (mut tiles, names) = fixture_tiles();
        let period = "01Jan15_31Jan15";
        // Native (15, 14) is cropped (12, 12).
        let mut vx = Array2::from_elem((30, 30), 3.0);
        vx[[15, 14]] = -3.0e9;
        tiles.insert(&file_name(period, "vx"), vx);
        let mut ex = Array2::from_elem((30, 30), 1.0);
        ex[[16, 14]] = -1.0;
        tiles.insert(&file_name(period, "ex"), ex);

        let sets = match_tile_sets(&names).unwrap();
        let Assembly::Built { stack, report } = StackAssembler::new(&tiles, extent())
            .assemble(&sets, |_| ())
            .unwrap()
        else {
            panic!("expected a stack");
        };
        let field = |field| stack.field(field).unwrap();

        assert_relative_eq!(field(Field::V)[[0, 0, 0]], 5.0);
        assert_relative_eq!(field(Field::E)[[0, 0, 0]], 2.0_f32.sqrt());

        assert!(field(Field::Vx)[[1, 12, 12]].is_nan());
        assert!(field(Field::V)[[1, 12, 12]].is_nan());
        assert_eq!(field(Field::Vy)[[1, 12, 12]], 4.0);
        assert_relative_eq!(field(Field::E)[[1, 12, 12]], 2.0_f32.sqrt());

        assert!(field(Field::Ex)[[1, 13, 12]].is_nan());
        assert!(field(Field::E)[[1, 13, 12]].is_nan());
        assert_relative_eq!(field(Field::V)[[1, 13, 12]], 5.0);

        // Magnitudes are NaN exactly where a component is.
        for (a, b, norm) in [
            (Field::Vx, Field::Vy, Field::V),
            (Field::Ex, Field::Ey, Field::E),
        ] {
            ndarray::Zip::from(field(a))
                .and(field(b))
                .and(field(norm))
                .for_each(|&a, &b, &norm| {
                    assert_eq!(norm.is_nan(), a.is_nan() || b.is_nan());
                });
        }
        assert_eq!(report[1].masked_cells, 1);
    }

    #[test]
    fn test_no_complete_sets() {
        let tiles = MemTiles::default();
        assert!(matches!(
            StackAssembler::new(&tiles, extent()).assemble(&[], |_| ()),
            Ok(Assembly::NoCompleteSets)
        ));
    }

    #[test]
    fn test_tile_failures_are_fatal() {
        let (mut tiles, names) = fixture_tiles();
        tiles.insert(&file_name("01Feb15_28Feb15", "ey"), Array2::zeros((30, 29)));
        let sets = match_tile_sets(&names).unwrap();
        assert!(matches!(
            StackAssembler::new(&tiles, extent()).assemble(&sets, |_| ()),
            Err(StackError::Shape { .. })
        ));

        let (mut tiles, _) = fixture_tiles();
        tiles.0.remove(&file_name("01Jan15_31Jan15", "vy"));
        assert!(matches!(
            StackAssembler::new(&tiles, extent()).assemble(&sets, |_| ()),
            Err(StackError::Path(_))
        ));
    }
}
