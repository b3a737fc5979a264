//! Grouping per-variable tile files into complete per-period sets.

use crate::{date_pair::DatePair, StackError};
use log::{debug, info};
use std::{collections::HashSet, path::Path};

/// Width of the role-and-version suffix (e.g. `_vx_v04.0.tif`) that
/// follows a file identifier.
pub const ROLE_SUFFIX_LEN: usize = 13;

/// The variable a tile holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Vx,
    Vy,
    Ex,
    Ey,
    DeltaH,
}

impl Role {
    /// The four roles a velocity tile set requires.
    pub const VELOCITY: [Role; 4] = [Role::Vx, Role::Vy, Role::Ex, Role::Ey];

    /// Substring marking a file as holding this role.
    pub fn marker(self) -> &'static str {
        match self {
            Self::Vx => "_vx",
            Self::Vy => "_vy",
            Self::Ex => "_ex",
            Self::Ey => "_ey",
            Self::DeltaH => "_01km_",
        }
    }
}

/// One complete set of velocity tiles covering a single period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileSet {
    pub date_pair: DatePair,

    /// File name prefix shared by every tile in the set.
    pub file_id: String,

    pub vx: String,
    pub vy: String,
    pub ex: String,
    pub ey: String,
}

impl TileSet {
    /// Returns each role with its file name, in [`Role::VELOCITY`]
    /// order.
    pub fn files(&self) -> [(Role, &str); 4] {
        [
            (Role::Vx, self.vx.as_str()),
            (Role::Vy, self.vy.as_str()),
            (Role::Ex, self.ex.as_str()),
            (Role::Ey, self.ey.as_str()),
        ]
    }
}

/// Returns the complete tile sets found in `file_names`.
///
/// Sets are ordered by the first appearance of their period in
/// `file_names`, then by the first appearance of their file
/// identifier. File identifiers lacking any of the four velocity roles
/// are dropped. Any file name whose period cannot be parsed fails the
/// whole batch.
pub fn match_tile_sets<S: AsRef<str>>(file_names: &[S]) -> Result<Vec<TileSet>, StackError> {
    let names: Vec<&str> = file_names
        .iter()
        .map(|name| base_name(name.as_ref()))
        .collect();

    // (period, file identifiers) in first-seen order.
    let mut periods: Vec<(DatePair, Vec<&str>)> = Vec::new();
    for &name in &names {
        let file_id = file_id(name)?;
        let date_pair = DatePair::parse(file_id)?;
        match periods.iter_mut().find(|(period, _)| *period == date_pair) {
            Some((_, ids)) => ids.push(file_id),
            None => periods.push((date_pair, vec![file_id])),
        }
    }

    let mut seen = HashSet::new();
    let mut sets = Vec::new();
    for (date_pair, ids) in periods {
        for file_id in ids {
            if !seen.insert(file_id) {
                continue;
            }
            let find = |role: Role| {
                let pattern = format!("{file_id}{}", role.marker());
                names
                    .iter()
                    .find(|name| name.contains(&pattern))
                    .map(|name| (*name).to_owned())
            };
            match (
                find(Role::Vx),
                find(Role::Vy),
                find(Role::Ex),
                find(Role::Ey),
            ) {
                (Some(vx), Some(vy), Some(ex), Some(ey)) => sets.push(TileSet {
                    date_pair,
                    file_id: file_id.to_owned(),
                    vx,
                    vy,
                    ex,
                    ey,
                }),
                _ => debug!("dropping incomplete tile set {file_id}"),
            }
        }
    }

    info!(
        "matched {} complete tile sets from {} files",
        sets.len(),
        names.len()
    );
    Ok(sets)
}

fn base_name(name: &str) -> &str {
    Path::new(name)
        .file_name()
        .and_then(|base| base.to_str())
        .unwrap_or(name)
}

fn file_id(name: &str) -> Result<&str, StackError> {
    name.len()
        .checked_sub(ROLE_SUFFIX_LEN)
        .filter(|&end| end > 0)
        .and_then(|end| name.get(..end))
        .ok_or_else(|| StackError::FileName(name.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::{match_tile_sets, Role, TileSet};
    use crate::StackError;

    const PREFIX: &str = "GL_vel_mosaic_Monthly";

    fn names(period: &str, roles: &[&str]) -> Vec<String> {
        roles
            .iter()
            .map(|role| format!("{PREFIX}_{period}_{role}_v04.0.tif"))
            .collect()
    }

    #[test]
    fn test_complete_set() {
        let files = names("01Jan15_31Jan15", &["vx", "vy", "ex", "ey"]);
        let sets = match_tile_sets(&files).unwrap();
        assert_eq!(sets.len(), 1);
        let TileSet {
            date_pair,
            file_id,
            vx,
            ey,
            ..
        } = &sets[0];
        assert_eq!(date_pair.to_string(), "20150101-20150131");
        assert_eq!(file_id, "GL_vel_mosaic_Monthly_01Jan15_31Jan15");
        assert_eq!(vx, &files[0]);
        assert_eq!(ey, &files[3]);
        assert_eq!(
            sets[0].files().map(|(role, _)| role),
            Role::VELOCITY
        );
    }

    #[test]
    fn test_incomplete_set_is_dropped() {
        let files = names("01Jan15_31Jan15", &["vx", "vy", "ex"]);
        assert!(match_tile_sets(&files).unwrap().is_empty());
        assert!(match_tile_sets::<String>(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_order_independent_count() {
        let mut files = names("01Jan15_31Jan15", &["vx", "vy", "ex", "ey"]);
        files.extend(names("01Feb15_28Feb15", &["vx", "vy", "ex", "ey"]));
        files.extend(names("01Mar15_31Mar15", &["vx", "ey"]));
        files.extend(names("01Apr15_30Apr15", &["vx", "vy", "ex", "ey"]));

        let sets = match_tile_sets(&files).unwrap();
        assert_eq!(sets.len(), 3);
        let labels: Vec<String> = sets.iter().map(|set| set.date_pair.to_string()).collect();
        assert_eq!(
            labels,
            ["20150101-20150131", "20150201-20150228", "20150401-20150430"]
        );

        files.reverse();
        let sets = match_tile_sets(&files).unwrap();
        assert_eq!(sets.len(), 3);
        assert_eq!(sets[0].date_pair.to_string(), "20150401-20150430");
        assert!(sets.iter().all(|set| set.files().iter().all(|(role, name)| {
            name.contains(role.marker()) && name.starts_with(&set.file_id)
        })));
    }

    #[test]
    fn test_duplicates_and_paths() {
        let mut files: Vec<String> = names("01Jan15_31Jan15", &["vx", "vy", "ex", "ey"])
            .into_iter()
            .map(|name| format!("/data/tiles/{name}"))
            .collect();
        files.push(files[0].clone());
        let sets = match_tile_sets(&files).unwrap();
        assert_eq!(sets.len(), 1);
        assert!(!sets[0].vx.contains('/'));
    }

    #[test]
    fn test_bad_file_name_fails_batch() {
        let mut files = names("01Jan15_31Jan15", &["vx", "vy", "ex", "ey"]);
        files.push("short.tif".to_owned());
        assert!(matches!(
            match_tile_sets(&files),
            Err(StackError::FileName(_))
        ));

        let mut files = names("01Jan15_31Jan15", &["vx", "vy", "ex", "ey"]);
        files.extend(names("01Xyz15_31Jan15", &["vx"]));
        assert!(matches!(match_tile_sets(&files), Err(StackError::Month(_))));
    }
}
