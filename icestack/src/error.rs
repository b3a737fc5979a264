use icetile::TileError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StackError {
    #[error("unrecognized data type '{0}', expected 'velocity' or 'elevation'")]
    DataType(String),

    #[error("malformed extent ({xmin}, {ymin}, {xmax}, {ymax})")]
    Extent {
        xmin: f64,
        ymin: f64,
        xmax: f64,
        ymax: f64,
    },

    #[error("posting must be positive and finite, got {0}")]
    Posting(f64),

    #[error("empty coordinate axis")]
    EmptyAxis,

    #[error("non-finite axis bound")]
    Bound,

    #[error("file name too short to carry a role suffix: {0}")]
    FileName(String),

    #[error("malformed date token in '{0}'")]
    DateToken(String),

    #[error("unrecognized month abbreviation '{0}'")]
    Month(String),

    #[error("invalid calendar date '{0}'")]
    Date(String),

    #[error("date pair starts after it ends: {0}")]
    ReversedDatePair(String),

    #[error("invalid time offset {0} days")]
    Time(f64),

    #[error("{what}: expected shape {expected:?}, found {found:?}")]
    Shape {
        what: String,
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    #[error("triangulation failed: {0:?}")]
    Triangulation(spade::InsertionError),

    #[error("no GeoTIFF files in {0:?}")]
    Path(PathBuf),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Tile(#[from] TileError),

    #[error("{0}")]
    Array(#[from] ndarray::ShapeError),

    #[error("invalid region config: {0}")]
    Config(#[from] serde_json::Error),
}
