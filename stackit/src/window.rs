use crate::options::Window;
use anyhow::Result;
use icestack::{icetile::Tile, CropWindow, RegionConfig};
use serde::Serialize;

impl Window {
    pub fn run(&self) -> Result<()> {
        #[derive(Serialize)]
        struct JsonWindow {
            rows: [usize; 2],
            cols: [usize; 2],
            x: [f64; 2],
            y: [f64; 2],
        }

        let region = RegionConfig::from_path(&self.region)?;
        let tile = Tile::load(&self.tile)?;
        let (x, y) = (tile.x_axis(), tile.y_axis());
        let window = CropWindow::for_data_type(&region, &self.data_type, &x, &y)?;
        let (x, y) = (window.crop_x(&x), window.crop_y(&y));
        let bounds = |axis: &[f64]| match (axis.first(), axis.last()) {
            (Some(&first), Some(&last)) => [first, last],
            _ => [f64::NAN; 2],
        };
        let json = serde_json::to_string(&JsonWindow {
            rows: [window.rows.start, window.rows.end],
            cols: [window.cols.start, window.cols.end],
            x: bounds(&x),
            y: bounds(&y),
        })?;
        println!("{json}");
        Ok(())
    }
}
