//! Tile directory and elevation-change series access.

use crate::{matcher::Role, StackError};
use icetile::{Tile, TileSeries};
use log::debug;
use std::{
    ffi::OsStr,
    path::{Path, PathBuf},
};

/// Reads the tile holding `role` from the file called `name`.
///
/// Implementors must be shareable across the threads assembling
/// slices.
pub trait TileReader: Sync {
    fn read(&self, name: &str, role: Role) -> Result<Tile, StackError>;
}

#[derive(Debug, Clone)]
pub struct Tiles {
    /// Directory containing GeoTIFF tile files.
    tile_dir: PathBuf,

    /// How to load tiles (in-memory or mapped).
    tile_mode: TileMode,
}

impl Tiles {
    pub fn new(tile_dir: PathBuf, tile_mode: TileMode) -> Result<Self, StackError> {
        // Fail early if tile_dir has no `tif` file.
        if file_names(&tile_dir, &["tif"])?.is_empty() {
            return Err(StackError::Path(tile_dir));
        }
        Ok(Self {
            tile_dir,
            tile_mode,
        })
    }

    /// Returns the names of every GeoTIFF in the tile directory,
    /// sorted.
    pub fn file_names(&self) -> Result<Vec<String>, StackError> {
        file_names(&self.tile_dir, &["tif"])
    }
}

impl TileReader for Tiles {
    fn read(&self, name: &str, role: Role) -> Result<Tile, StackError> {
        let path = self.tile_dir.join(name);
        debug!("loading {role:?} tile {path:?}");
        Ok(match self.tile_mode {
            TileMode::InMem => Tile::load(path)?,
            TileMode::MemMap => Tile::memmap(path)?,
        })
    }
}

/// How to handle tiles.
///
/// The trade off between loading tile data into memory versus memory
/// mapping is not obvious, and you should measure both before
/// deciding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TileMode {
    /// Decode tile through a buffered reader.
    #[default]
    InMem,

    /// Decode tile from a memory map of the file.
    MemMap,
}

/// File extensions an elevation-change series may carry.
#[cfg(feature = "netcdf")]
pub const SERIES_EXTENSIONS: &[&str] = &["nc", "tif"];
#[cfg(not(feature = "netcdf"))]
pub const SERIES_EXTENSIONS: &[&str] = &["tif"];

/// Returns the paths, sorted, of the elevation-change series in `dir`
/// whose names carry the [`Role::DeltaH`] marker and `marker`.
pub fn find_series(dir: &Path, marker: &str) -> Result<Vec<PathBuf>, StackError> {
    Ok(file_names(dir, SERIES_EXTENSIONS)?
        .into_iter()
        .filter(|name| name.contains(Role::DeltaH.marker()) && name.contains(marker))
        .map(|name| dir.join(name))
        .collect())
}

/// Reads the elevation-change series at `path`.
///
/// NetCDF (`.nc`) files are read as ATL15 products; anything else as a
/// multi-page GeoTIFF through `tile_mode`.
pub fn read_series(path: &Path, tile_mode: TileMode) -> Result<TileSeries, StackError> {
    debug!("loading series {path:?}");
    #[cfg(feature = "netcdf")]
    if path
        .extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| ext.eq_ignore_ascii_case("nc"))
    {
        return Ok(TileSeries::load_atl15(path)?);
    }
    Ok(match tile_mode {
        TileMode::InMem => TileSeries::load(path)?,
        TileMode::MemMap => TileSeries::memmap(path)?,
    })
}

fn file_names(dir: &Path, extensions: &[&str]) -> Result<Vec<String>, StackError> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let wanted = path
            .extension()
            .and_then(OsStr::to_str)
            .is_some_and(|ext| extensions.iter().any(|want| ext.eq_ignore_ascii_case(want)));
        if let (true, Some(name)) = (wanted, path.file_name().and_then(OsStr::to_str)) {
            names.push(name.to_owned());
        }
    }
    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::{find_series, read_series, TileMode, TileReader, Tiles};
    use crate::{matcher::Role, StackError};
    use icetile::fixtures;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_empty_dir_fails_early() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("README.txt"), "no tiles here").unwrap();
        assert!(matches!(
            Tiles::new(dir.path().to_owned(), TileMode::InMem),
            Err(StackError::Path(_))
        ));
    }

    #[test]
    fn test_read() {
        let dir = TempDir::new().unwrap();
        let name = "GL_vel_mosaic_Monthly_01Dec14_31Dec14_vx_v04.0.tif";
        fixtures::write_tile(
            &dir.path().join(name),
            (0.0, 200.0),
            100.0,
            (2, 3),
            &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
        );
        fs::write(dir.path().join("notes.txt"), "").unwrap();

        for mode in [TileMode::InMem, TileMode::MemMap] {
            let tiles = Tiles::new(dir.path().to_owned(), mode).unwrap();
            assert_eq!(tiles.file_names().unwrap(), [name]);
            let tile = tiles.read(name, Role::Vx).unwrap();
            assert_eq!(tile.dimensions(), (2, 3));
            assert_eq!(tile.samples()[[1, 0]], 4.0);
            assert!(matches!(
                tiles.read("missing.tif", Role::Vy),
                Err(StackError::Tile(_))
            ));
        }
    }

    #[test]
    fn test_find_and_read_series() {
        let dir = TempDir::new().unwrap();
        let samples = [1.0, 2.0, 3.0, 4.0];
        for name in [
            "ATL15_GL_0318_01km_002_01.tif",
            "ATL15_AA_0318_01km_002_01.tif",
            "ATL15_GL_0318_10km_002_01.tif",
        ] {
            fixtures::write(
                &dir.path().join(name),
                (0.0, 100.0),
                50.0,
                &[(Some("0.5"), None, 2, 2, &samples)],
            );
        }
        fs::write(dir.path().join("ATL15_GL_0318_01km_002_01.txt"), "").unwrap();

        let found = find_series(dir.path(), "GL").unwrap();
        assert_eq!(found, [dir.path().join("ATL15_GL_0318_01km_002_01.tif")]);
        let series = read_series(&found[0], TileMode::MemMap).unwrap();
        assert_eq!(series.times(), [0.5]);
        assert_eq!(series.samples()[[0, 1, 1]], 4.0);
    }
}
