use crate::{
    options::Elevation,
    progress,
    store::{Header, StackWriter},
};
use anyhow::{anyhow, Result};
use icestack::{
    build_stack, crop_series, find_series, order, read_series, DataType, RegionConfig,
    ScatteredRegridder,
};
use log::warn;

impl Elevation {
    pub fn run(&self) -> Result<()> {
        let region = RegionConfig::from_path(&self.output.region)?;
        let candidates = find_series(&self.source_dir, region.kind().file_marker())?;
        let source = candidates.first().ok_or_else(|| {
            anyhow!(
                "no {} elevation-change series in {:?}",
                region.kind().name(),
                self.source_dir
            )
        })?;
        if candidates.len() > 1 {
            warn!(
                "found {} elevation-change series, using {source:?}",
                candidates.len()
            );
        }

        let grid = region.grid(DataType::Elevation);
        let cropped = crop_series(&read_series(source, self.output.tile_mode())?, grid)?;
        let regridder = ScatteredRegridder::new(self.nan_policy());
        let label = source.file_name().map_or_else(
            || source.display().to_string(),
            |name| name.to_string_lossy().into_owned(),
        );
        let pb = progress::bar(format!("Regrid {label}"), cropped.times.len() as u64);
        let stack = build_stack(&cropped, grid, &regridder, |_| pb.inc(1))?;
        pb.finish();
        let stack = order(stack);

        let header = Header::new(&region, DataType::Elevation, &self.short_name, &stack);
        StackWriter::new(
            self.output.format,
            self.output.compression,
            self.output.overwrite,
        )
        .write(&self.output.out_dir, &self.short_name, &header, &stack)?;
        Ok(())
    }
}
