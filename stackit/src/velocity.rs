use crate::{
    options::Velocity,
    progress,
    store::{Header, StackWriter},
};
use anyhow::Result;
use icestack::{
    match_tile_sets, order, Assembly, DataType, RegionConfig, Role, StackAssembler, Tiles,
};
use log::{debug, info, warn};

/// Returns the names carrying a velocity role marker. Browse images
/// and other products sharing the directory are left out.
fn velocity_file_names(names: Vec<String>) -> Vec<String> {
    names
        .into_iter()
        .filter(|name| {
            let keep = Role::VELOCITY.iter().any(|role| name.contains(role.marker()));
            if !keep {
                debug!("ignoring {name}");
            }
            keep
        })
        .collect()
}

impl Velocity {
    pub fn run(&self) -> Result<()> {
        let region = RegionConfig::from_path(&self.output.region)?;
        let tiles = Tiles::new(self.tile_dir.clone(), self.output.tile_mode())?;
        let sets = match_tile_sets(&velocity_file_names(tiles.file_names()?))?;

        let pb = progress::bar(format!("Assemble {}", region.name()), sets.len() as u64);
        let assembly =
            StackAssembler::new(&tiles, *region.extent()).assemble(&sets, |_| pb.inc(1))?;
        pb.finish();

        let (stack, report) = match assembly {
            Assembly::NoCompleteSets => {
                warn!(
                    "no complete velocity tile sets in {:?}, nothing to write",
                    self.tile_dir
                );
                return Ok(());
            }
            Assembly::Built { stack, report } => (stack, report),
        };
        let stack = order(stack);
        info!("assembled {} slices for {}", stack.len(), region.name());
        if self.report {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        let header = Header::new(&region, DataType::Velocity, &self.short_name, &stack);
        StackWriter::new(
            self.output.format,
            self.output.compression,
            self.output.overwrite,
        )
        .write(&self.output.out_dir, &self.short_name, &header, &stack)?;
        Ok(())
    }
}
