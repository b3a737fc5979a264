//! NetCDF-4 stack files.
//!
//! Dimensions are `(time, y, x)`. Slice bounds are stored as
//! `time_start` and `time_end`, and `time` holds their midpoint.

use super::Header;
use anyhow::{anyhow, Result};
use chrono::NaiveDateTime;
use icestack::Stack;
use std::path::Path;

const TIME_UNITS: &str = "seconds since 1970-01-01 00:00:00";

#[allow(clippy::cast_precision_loss)]
fn unix_seconds(time: NaiveDateTime) -> f64 {
    time.and_utc().timestamp() as f64
}

pub(super) fn write_stack(header: &Header, stack: &Stack, path: &Path) -> Result<()> {
    let mut file = netcdf::create(path)?;
    file.add_attribute("title", header.title.as_str())?;
    file.add_attribute("data_type", header.data_type.as_str())?;
    let crs = format!("urn:ogc:def:crs:EPSG::{}", header.epsg);
    file.add_attribute("crs", crs.as_str())?;

    file.add_dimension("time", header.dims.time)?;
    file.add_dimension("y", header.dims.y)?;
    file.add_dimension("x", header.dims.x)?;

    for (attrs, coords) in header.axes.iter().zip([stack.x(), stack.y()]) {
        let name = attrs.name.as_str();
        let mut var = file.add_variable::<f64>(name, &[name])?;
        var.put_attribute("long_name", attrs.long_name.as_str())?;
        var.put_attribute("standard_name", attrs.standard_name.as_str())?;
        var.put_attribute("units", attrs.units.as_str())?;
        var.put_attribute("axis", attrs.axis.as_str())?;
        var.put_attribute("coverage_content_type", attrs.coverage_content_type.as_str())?;
        var.put_attribute("valid_min", attrs.valid_min)?;
        var.put_attribute("valid_max", attrs.valid_max)?;
        var.put_attribute("comment", attrs.comment.as_str())?;
        var.put_values(coords, ..)?;
    }

    let starts: Vec<f64> = header.slices.iter().map(|s| unix_seconds(s.start)).collect();
    let ends: Vec<f64> = header.slices.iter().map(|s| unix_seconds(s.end)).collect();
    let mids: Vec<f64> = starts
        .iter()
        .zip(&ends)
        .map(|(start, end)| (start + end) / 2.0)
        .collect();
    for (name, long_name, values) in [
        ("time", "slice midpoint", mids),
        ("time_start", "slice start", starts),
        ("time_end", "slice end", ends),
    ] {
        let mut var = file.add_variable::<f64>(name, &["time"])?;
        var.put_attribute("long_name", long_name)?;
        var.put_attribute("units", TIME_UNITS)?;
        var.put_attribute("calendar", "standard")?;
        var.put_values(&values, ..)?;
    }

    for (field, samples) in stack.fields() {
        let mut var = file.add_variable::<f32>(field.name(), &["time", "y", "x"])?;
        var.put_attribute("_FillValue", f32::NAN)?;
        var.put_attribute("long_name", field.long_name())?;
        var.put_attribute("units", field.units())?;
        let samples = samples.as_standard_layout();
        let values = samples
            .as_slice()
            .ok_or_else(|| anyhow!("{} samples are not contiguous", field.name()))?;
        var.put_values(values, ..)?;
    }
    Ok(())
}
