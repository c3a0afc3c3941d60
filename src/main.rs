use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use glam::Vec3;
use log::{info, trace, warn};
use sargerust_files::extracted::JsonDecoder;

use sargerust_world::demos::{DemoAssetStore, DemoWorldBuilder};
use sargerust_world::io::FileId;
use sargerust_world::io::file_list::FileList;
use sargerust_world::io::fs::loader::FileSystemFetcher;
use sargerust_world::rendering::asset_graph::cache::AssetCache;
use sargerust_world::rendering::camera::FlyCamera;
use sargerust_world::rendering::common::coordinate_systems::{TileCoord, world_to_tile};
use sargerust_world::rendering::gfx::headless::HeadlessBackend;
use sargerust_world::rendering::scene::WdtScene;
use sargerust_world::settings::{CliArgs, OperationMode};

/// world units per frame
const CAMERA_SPEED: f32 = 16.0;
/// The fixed frame time of the headless loop, in milliseconds
const FRAME_TIME: f64 = 1000.0 / 60.0;
const STATS_INTERVAL: u32 = 30;

async fn open_assets(operation_mode: &OperationMode) -> anyhow::Result<(Arc<AssetCache>, FileId, Vec3)> {
    match operation_mode {
        OperationMode::Demo {
            grid,
            start_x,
            start_y,
        } => {
            let store = Arc::new(DemoAssetStore::new());
            let origin = TileCoord::new(0, 0).context("The map origin")?;
            let world = DemoWorldBuilder::new(origin, *grid).build(&store)?;
            let start = TileCoord::new(*start_x, *start_y)
                .with_context(|| format!("Tile {}_{} is outside of the map", start_x, start_y))?;

            info!("Generated a {}x{} demo world ({} files)", grid, grid, store.len());
            Ok((store.cache(), world.wdt_id, start.world_center() + Vec3::Z * 60.0))
        }
        OperationMode::Extracted {
            data_dir,
            listfile,
            wdt_file_id,
            coordinates,
        } => {
            let file_list = FileList::load(Path::new(listfile))
                .await
                .with_context(|| format!("Loading the listfile {}", listfile))?;
            info!("Loaded {} file names from {}", file_list.len(), listfile);

            let fetcher = FileSystemFetcher::new(data_dir, Arc::new(file_list));
            let cache = AssetCache::new(Arc::new(fetcher), Arc::new(JsonDecoder::default()));
            Ok((Arc::new(cache), *wdt_file_id, Vec3::from(*coordinates)))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = CliArgs::parse();
    trace!("Starting with args: {:?}", args);

    let (cache, wdt_id, camera_location) = open_assets(&args.operation_mode).await?;

    let start = if args.eager {
        None
    } else {
        Some(world_to_tile(camera_location).context("The camera starts outside of the map")?)
    };
    let world = WdtScene::load_world(Arc::clone(&cache), wdt_id, start, args.radius, &args.scene).await?;

    let mut device = HeadlessBackend::new();
    let mut scene = WdtScene::new(&mut device, cache, world, args.scene)?;
    // north
    let mut camera = FlyCamera::new(camera_location, 0.0);

    let started = Instant::now();
    let mut draw_calls = 0;
    for frame in 0..args.frames {
        camera.fly(CAMERA_SPEED);
        let stats = scene.render(&mut device, &camera.view(FRAME_TIME))?;
        draw_calls += stats.draw_calls;

        if frame % STATS_INTERVAL == 0 {
            info!(
                "Frame {}: {} of {} tiles visible, {} WMO groups, {} doodads, {} draw calls",
                frame,
                stats.visible_tiles,
                stats.resident_tiles,
                stats.visible_wmo_groups,
                stats.visible_doodads,
                stats.draw_calls
            );
        }

        // the streaming tasks run on the same runtime
        tokio::task::yield_now().await;
    }

    if let Some(outcome) = scene.finish_streaming(&mut device).await? {
        info!(
            "The last expansion merged {} tiles ({} failed)",
            outcome.merged.len(),
            outcome.failed.len()
        );
    }

    info!(
        "Rendered {} frames with {} draw calls in {:.2?}, {} tiles resident",
        args.frames,
        draw_calls,
        started.elapsed(),
        scene.world().resident_tile_count()
    );

    scene.destroy(&mut device)?;
    if !device.is_empty() {
        warn!(
            "The scene leaked {} buffers and {} textures",
            device.live_buffers(),
            device.live_textures()
        );
    }

    Ok(())
}
