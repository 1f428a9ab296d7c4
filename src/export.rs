use crate::config::AppConfig;
use crate::controller::ViewController;
use crate::engine::{CommandQueue, MapCommand};
use crate::feature;
use crate::types::Neighborhood;
use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

pub const GEOJSON_FILE: &str = "neighborhoods.geojson";
pub const LAYERS_FILE: &str = "layers.json";

/// The commands a freshly loaded renderer would receive.
pub fn registration_commands(
    config: &AppConfig,
    neighborhoods: Arc<Vec<Neighborhood>>,
) -> Result<Vec<MapCommand>> {
    let mut engine = CommandQueue::new();
    engine.mark_loaded();
    let mut controller = ViewController::mount(engine, neighborhoods, config.map.default_center());
    controller
        .on_ready()
        .context("Failed to register neighborhood layers")?;
    let mut engine = controller
        .teardown()
        .ok_or_else(|| anyhow!("View released its map handle early"))?;
    Ok(engine.drain())
}

pub fn export(config: &AppConfig, neighborhoods: Vec<Neighborhood>, out_dir: &Path) -> Result<()> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create output directory: {:?}", out_dir))?;

    let collection = feature::neighborhood_collection(&neighborhoods);
    let geojson_path = out_dir.join(GEOJSON_FILE);
    fs::write(&geojson_path, serde_json::to_string_pretty(&collection)?)
        .with_context(|| format!("Failed to write {:?}", geojson_path))?;

    let commands = registration_commands(config, Arc::new(neighborhoods))?;
    let layers_path = out_dir.join(LAYERS_FILE);
    fs::write(&layers_path, serde_json::to_string_pretty(&commands)?)
        .with_context(|| format!("Failed to write {:?}", layers_path))?;

    info!(
        features = collection.features.len(),
        commands = commands.len(),
        ?out_dir,
        "export complete"
    );
    Ok(())
}
