use std::path::PathBuf;
use thiserror::Error;
use tiff::TiffError;

#[derive(Error, Debug)]
pub enum TileError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{path:?}: {source}")]
    Tiff {
        path: PathBuf,
        #[source]
        source: TiffError,
    },

    #[cfg(feature = "netcdf")]
    #[error("{path:?}: {source}")]
    NetCdf {
        path: PathBuf,
        #[source]
        source: netcdf::Error,
    },

    #[error("{path:?} has no variable '{name}'")]
    Variable { path: PathBuf, name: String },

    #[error("missing or invalid geo-referencing tags in {0:?}")]
    GeoReference(PathBuf),

    #[error("unsupported sample format in {0:?}")]
    SampleFormat(PathBuf),

    #[error("{0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("page {page} of {path:?} has no time description")]
    PageTime { path: PathBuf, page: usize },

    #[error("page {page} of {path:?} does not share the first page's grid")]
    PageGrid { path: PathBuf, page: usize },
}
