use clap::{Args, Parser, ValueEnum};
use icestack::{NanPolicy, TileMode};
use std::path::PathBuf;

/// Build time stacks of ice-sheet velocity and elevation change over a
/// region of interest.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub enum Cli {
    /// Crop, mask and stack monthly velocity mosaics.
    Velocity(Velocity),

    /// Crop and regrid an ATL15 elevation-change series onto the
    /// region grid.
    Elevation(Elevation),

    /// Print the padded crop window of a tile against the region grid.
    Window(Window),
}

/// Options shared by every stack-producing command.
#[derive(Debug, Clone, Args)]
pub struct Output {
    /// Region configuration (JSON).
    #[arg(short, long)]
    pub region: PathBuf,

    /// Memory map tiles instead of reading them into memory.
    #[arg(long)]
    pub memmap: bool,

    /// Rebuild the stack even if the output already exists.
    #[arg(short = 'O', long)]
    pub overwrite: bool,

    /// Amount of compression.
    #[arg(short, long, default_value_t = 6)]
    pub compression: u32,

    /// Stack file format.
    #[arg(long, value_enum, default_value_t = StackFormat::Stk)]
    pub format: StackFormat,

    /// Output directory.
    #[arg(short, long)]
    pub out_dir: PathBuf,
}

impl Output {
    pub fn tile_mode(&self) -> TileMode {
        if self.memmap {
            TileMode::MemMap
        } else {
            TileMode::InMem
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StackFormat {
    /// Gzipped header and little-endian samples.
    Stk,

    /// NetCDF-4.
    #[cfg(feature = "netcdf")]
    Nc,
}

impl StackFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Stk => "stk",
            #[cfg(feature = "netcdf")]
            Self::Nc => "nc",
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct Velocity {
    #[command(flatten)]
    pub output: Output,

    /// Collection name; the stack is written to
    /// `<out_dir>/<short_name>_stack.<format>`.
    #[arg(short, long, default_value = "NSIDC-0731")]
    pub short_name: String,

    /// Print the per-slice assembly report to stdout as JSON.
    #[arg(long)]
    pub report: bool,

    /// Directory of velocity mosaic tiles (.tif).
    pub tile_dir: PathBuf,
}

#[derive(Debug, Clone, Args)]
pub struct Elevation {
    #[command(flatten)]
    pub output: Output,

    /// Collection name; the stack is written to
    /// `<out_dir>/<short_name>_stack.<format>`.
    #[arg(short, long, default_value = "ATL15")]
    pub short_name: String,

    /// Remove NaN samples before interpolating instead of letting
    /// them spread to neighbouring cells.
    #[arg(long)]
    pub drop_nan: bool,

    /// Directory holding the ATL15 series (.tif, or .nc when built
    /// with NetCDF support).
    pub source_dir: PathBuf,
}

impl Elevation {
    pub fn nan_policy(&self) -> NanPolicy {
        if self.drop_nan {
            NanPolicy::Drop
        } else {
            NanPolicy::Propagate
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct Window {
    /// Region configuration (JSON).
    #[arg(short, long)]
    pub region: PathBuf,

    /// Which region grid governs the window: 'velocity' or
    /// 'elevation'.
    #[arg(short, long, default_value = "velocity")]
    pub data_type: String,

    /// GeoTIFF tile to window.
    pub tile: PathBuf,
}
