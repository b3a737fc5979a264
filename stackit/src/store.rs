//! Stack file writer.
//!
//! A stack file is a gzip stream holding:
//!
//! 1. header length, `u64` LE
//! 1. [`Header`], JSON
//! 1. x coordinates, `f64` LE
//! 1. y coordinates, `f64` LE
//! 1. each field in header order, `(time, y, x)` samples as `f32` LE
//!
//! With the `netcdf` feature, stacks may instead be written as NetCDF-4
//! files carrying the same header as attributes.

#[cfg(feature = "netcdf")]
mod nc;

use crate::options::StackFormat;
use anyhow::Result;
use byteorder::{LittleEndian as LE, WriteBytesExt};
use chrono::NaiveDateTime;
use flate2::{write::GzEncoder, Compression};
use icestack::{DataType, RegionConfig, Stack};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Header {
    pub title: String,
    pub data_type: String,
    pub epsg: u32,
    pub dims: Dims,
    pub axes: Vec<AxisAttrs>,
    pub slices: Vec<SliceMeta>,
    pub fields: Vec<FieldMeta>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dims {
    pub time: usize,
    pub y: usize,
    pub x: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisAttrs {
    pub name: String,
    pub long_name: String,
    pub standard_name: String,
    pub units: String,
    pub axis: String,
    pub coverage_content_type: String,
    pub valid_min: f64,
    pub valid_max: f64,
    pub comment: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SliceMeta {
    pub label: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMeta {
    pub name: String,
    pub long_name: String,
    pub units: String,
}

impl Header {
    pub fn new(region: &RegionConfig, data_type: DataType, short_name: &str, stack: &Stack) -> Self {
        let axis = |name: &str, coords: &[f64], comment: &str| {
            let (valid_min, valid_max) = coords
                .iter()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &c| {
                    (lo.min(c), hi.max(c))
                });
            AxisAttrs {
                name: name.to_owned(),
                long_name: format!("Cartesian {name}-coordinate"),
                standard_name: format!("projection_{name}_coordinate"),
                units: "meters".to_owned(),
                axis: name.to_uppercase(),
                coverage_content_type: "coordinate".to_owned(),
                valid_min,
                valid_max,
                comment: comment.to_owned(),
            }
        };
        Self {
            title: format!(
                "{} {data_type} {} {short_name} Stack",
                region.kind().name(),
                region.name()
            ),
            data_type: data_type.to_string(),
            epsg: region.kind().epsg(),
            dims: Dims {
                time: stack.len(),
                y: stack.y().len(),
                x: stack.x().len(),
            },
            axes: vec![
                axis("x", stack.x(), "Projected horizontal coordinates of the grid"),
                axis("y", stack.y(), "Projected vertical coordinates of the grid"),
            ],
            slices: stack
                .times()
                .iter()
                .map(|time| SliceMeta {
                    label: time.label(),
                    start: time.start(),
                    end: time.end(),
                })
                .collect(),
            fields: stack
                .fields()
                .map(|(field, _)| FieldMeta {
                    name: field.name().to_owned(),
                    long_name: field.long_name().to_owned(),
                    units: field.units().to_owned(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct StackWriter {
    format: StackFormat,
    compression: u32,
    overwrite: bool,
}

impl StackWriter {
    pub fn new(format: StackFormat, compression: u32, overwrite: bool) -> Self {
        Self {
            format,
            compression,
            overwrite,
        }
    }

    /// Returns the path a stack named `short_name` is written to.
    pub fn out_path(&self, out_dir: &Path, short_name: &str) -> PathBuf {
        out_dir.join(format!("{short_name}_stack.{}", self.format.extension()))
    }

    /// Writes `stack` to `out_dir`, returning the written path, or
    /// `None` if the output exists and overwriting is disabled.
    pub fn write(
        &self,
        out_dir: &Path,
        short_name: &str,
        header: &Header,
        stack: &Stack,
    ) -> Result<Option<PathBuf>> {
        let out_file_path = self.out_path(out_dir, short_name);
        if out_file_path.exists() && !self.overwrite {
            warn!("skipping existing {out_file_path:?}");
            return Ok(None);
        }
        fs::create_dir_all(out_dir)?;

        let out_file_tmp_path = {
            let mut p = out_file_path.clone();
            p.set_extension("tmp");
            p
        };
        match self.format {
            StackFormat::Stk => {
                let tmp_out_file = File::create(&out_file_tmp_path)?;
                let tmp_out_wtr = GzEncoder::new(tmp_out_file, Compression::new(self.compression));
                let mut wtr = BufWriter::new(tmp_out_wtr);
                Self::write_stack(header, stack, &mut wtr)?;
                wtr.into_inner().map_err(|e| e.into_error())?.finish()?;
            }
            #[cfg(feature = "netcdf")]
            StackFormat::Nc => nc::write_stack(header, stack, &out_file_tmp_path)?,
        }
        fs::rename(out_file_tmp_path, &out_file_path)?;

        info!("saved {out_file_path:?}");
        Ok(Some(out_file_path))
    }

    fn write_stack(header: &Header, stack: &Stack, mut out: impl Write) -> Result<()> {
        let header = serde_json::to_vec(header)?;
        out.write_u64::<LE>(u64::try_from(header.len())?)?;
        out.write_all(&header)?;
        for coord in stack.x().iter().chain(stack.y()) {
            out.write_f64::<LE>(*coord)?;
        }
        for (_, samples) in stack.fields() {
            for sample in samples.iter() {
                out.write_f32::<LE>(*sample)?;
            }
        }
        out.flush()?;
        Ok(())
    }
}
