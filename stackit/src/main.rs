mod elevation;
mod options;
mod progress;
mod store;
mod velocity;
mod window;

use anyhow::Result;
use clap::Parser;
use options::Cli;
#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli {
        Cli::Velocity(velocity) => velocity.run(),
        Cli::Elevation(elevation) => elevation.run(),
        Cli::Window(window) => window.run(),
    }
}
