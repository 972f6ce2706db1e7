use anyhow::Result;

mod camera;
mod controls;
mod environment;
mod lighting;
mod loader;
mod model;
mod registry;
mod rendering;
mod scene_graph;
mod viewer;
mod window;

fn main() -> Result<()> {
    pretty_env_logger::init();

    let requested: Vec<String> = std::env::args().skip(1).collect();

    pollster::block_on(window::run(requested))?;

    Ok(())
}
