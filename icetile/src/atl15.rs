//! ATL15 gridded height-change products (NetCDF-4).
//!
//! The `delta_h` group holds the `x`, `y` and `time` coordinates and
//! the `delta_h` variable dimensioned `(time, y, x)`. `time` counts
//! decimal days since 2018-01-01.

use crate::{TileError, TileSeries};
use log::debug;
use ndarray::Array3;
use netcdf::Variable;
use std::path::Path;

/// Group holding the height-change grids.
const DELTA_H_GROUP: &str = "delta_h";

impl TileSeries {
    /// Returns the `delta_h` series of the ATL15 file at `path`.
    ///
    /// Samples equal to the variable's `_FillValue` become NaN.
    pub fn load_atl15<P: AsRef<Path>>(path: P) -> Result<Self, TileError> {
        let path = path.as_ref();
        let nc_err = |source| TileError::NetCdf {
            path: path.to_owned(),
            source,
        };
        let missing = |name: &str| TileError::Variable {
            path: path.to_owned(),
            name: name.to_owned(),
        };

        let file = netcdf::open(path).map_err(nc_err)?;
        let group = file
            .group(DELTA_H_GROUP)
            .map_err(nc_err)?
            .ok_or_else(|| missing(DELTA_H_GROUP))?;
        let variable = |name: &str| group.variable(name).ok_or_else(|| missing(name));

        let x: Vec<f64> = variable("x")?.get_values(..).map_err(nc_err)?;
        let y: Vec<f64> = variable("y")?.get_values(..).map_err(nc_err)?;
        let times: Vec<f64> = variable("time")?.get_values(..).map_err(nc_err)?;

        let delta_h = variable("delta_h")?;
        let fill = fill_value(&delta_h);
        let mut samples: Vec<f32> = delta_h.get_values(..).map_err(nc_err)?;
        if let Some(fill) = fill {
            for sample in samples.iter_mut().filter(|sample| **sample == fill) {
                *sample = f32::NAN;
            }
        }
        let samples = Array3::from_shape_vec((times.len(), y.len(), x.len()), samples)?;
        debug!("read {path:?}; dimensions: {:?}", samples.dim());
        TileSeries::from_parts(x, y, times, samples)
    }
}

fn fill_value(var: &Variable) -> Option<f32> {
    // Probing an absent attribute makes HDF5 print to stderr.
    if !var.attributes().any(|attr| attr.name() == "_FillValue") {
        return None;
    }
    let value = var.attribute_value("_FillValue")?.ok()?;
    f32::try_from(value).ok()
}
