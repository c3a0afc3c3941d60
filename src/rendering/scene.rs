use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Context;
use glam::Vec3;
use log::{debug, error, info};

use crate::io::FileId;
use crate::rendering::asset_graph::cache::AssetCache;
use crate::rendering::asset_graph::nodes::placement::WmoDefinition;
use crate::rendering::camera::View;
use crate::rendering::common::coordinate_systems::{TileCoord, world_to_tile};
use crate::rendering::culling::{CullingState, VisibilityCuller};
use crate::rendering::gfx::{GfxError, GpuBackend};
use crate::rendering::renderers::model::ModelRenderer;
use crate::rendering::renderers::skybox::SkyboxRenderer;
use crate::rendering::renderers::terrain::TerrainRenderer;
use crate::rendering::renderers::texture_cache::TextureCache;
use crate::rendering::renderers::wmo::WmoRenderer;
use crate::settings::SceneSettings;
use crate::world::{ExpansionOutcome, ExpansionRequest, LazyWorldData, SceneWorld, WorldData};

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub resident_tiles: usize,
    pub visible_tiles: usize,
    pub visible_chunks: usize,
    pub visible_wmo_groups: usize,
    pub visible_doodads: usize,
    pub skybox_draws: usize,
    pub terrain_draws: usize,
    pub wmo_draws: usize,
    pub model_draws: usize,
    /// As reported by the backend
    pub draw_calls: usize,
}

impl FrameStats {
    pub fn submitted_draws(&self) -> usize {
        self.skybox_draws + self.terrain_draws + self.wmo_draws + self.model_draws
    }
}

/// One map, from the WDT down to the doodads, with everything that is needed to draw it every frame.
pub struct WdtScene {
    cache: Arc<AssetCache>,
    world: SceneWorld,
    culler: VisibilityCuller,
    textures: TextureCache,
    skybox: SkyboxRenderer,
    terrain: TerrainRenderer,
    wmos: WmoRenderer,
    models: ModelRenderer,
    prepared_tiles: HashSet<TileCoord>,
    camera_tile: Option<TileCoord>,
    /// The tile to stream around, until an expansion has been accepted for it
    stream_target: Option<TileCoord>,
    frame: u64,
}

impl WdtScene {
    /// Loads a world, either every tile up front (eager) or the window around `start`.
    pub async fn load_world(
        cache: Arc<AssetCache>,
        wdt_id: FileId,
        start: Option<TileCoord>,
        radius: u8,
        settings: &SceneSettings,
    ) -> anyhow::Result<SceneWorld> {
        let world = match start {
            Some(start) => SceneWorld::Lazy(
                LazyWorldData::load_with_doodad_size(cache, wdt_id, start, radius, settings.large_doodad_size)
                    .await
                    .context("Loading the streamed world")?,
            ),
            None => SceneWorld::Eager(
                WorldData::load(&cache, wdt_id, settings.large_doodad_size)
                    .await
                    .context("Loading the world")?,
            ),
        };

        info!("Loaded WDT {} with {} resident tiles", wdt_id, world.resident_tile_count());
        Ok(world)
    }

    pub fn new(
        device: &mut dyn GpuBackend,
        cache: Arc<AssetCache>,
        world: SceneWorld,
        settings: SceneSettings,
    ) -> Result<Self, GfxError> {
        let mut scene = WdtScene {
            cache,
            world,
            culler: VisibilityCuller::new(settings),
            textures: TextureCache::new(device)?,
            skybox: SkyboxRenderer::new(device)?,
            terrain: TerrainRenderer::new(device)?,
            wmos: WmoRenderer::new(device)?,
            models: ModelRenderer::new(device)?,
            prepared_tiles: HashSet::new(),
            camera_tile: None,
            stream_target: None,
            frame: 0,
        };

        scene.prepare_resident(device)?;
        Ok(scene)
    }

    pub fn world(&self) -> &SceneWorld {
        &self.world
    }

    pub fn cache(&self) -> &Arc<AssetCache> {
        &self.cache
    }

    pub fn camera_tile(&self) -> Option<TileCoord> {
        self.camera_tile
    }

    pub fn culling_state(&self) -> CullingState {
        self.culler.state()
    }

    pub fn set_culling_state(&mut self, state: CullingState) {
        self.culler.set_state(state);
    }

    pub fn set_sky_colors(&mut self, colors: [u32; 3]) {
        self.skybox.set_colors(colors);
    }

    /// Creates the GPU resources of tiles that became resident since the last call.
    fn prepare_resident(&mut self, device: &mut dyn GpuBackend) -> Result<(), GfxError> {
        let world = self.world.world();

        if let Some(global) = &world.global_wmo {
            self.wmos.prepare(device, &mut self.textures, &global.wmo)?;
            for model in global.wmo.models.values() {
                self.models.prepare(device, &mut self.textures, model)?;
            }
        }

        for adt in &world.adts {
            if self.prepared_tiles.contains(&adt.tile) {
                continue;
            }

            self.terrain.prepare(device, &mut self.textures, adt)?;
            for model in adt.models.values() {
                self.models.prepare(device, &mut self.textures, model)?;
            }
            for wmo in adt.wmos.values() {
                self.wmos.prepare(device, &mut self.textures, wmo)?;
                for model in wmo.models.values() {
                    self.models.prepare(device, &mut self.textures, model)?;
                }
            }

            debug!("Prepared the resources of tile {}", adt.tile);
            self.prepared_tiles.insert(adt.tile);
        }

        Ok(())
    }

    fn merge_streamed_tiles(&mut self) {
        let Some(lazy) = self.world.lazy_mut() else {
            return;
        };

        if let Some(outcome) = lazy.poll_expansion() {
            Self::report(&outcome);
        }
    }

    fn report(outcome: &ExpansionOutcome) {
        for (tile, err) in &outcome.failed {
            error!("Failed to stream tile {}: {}", tile, err);
        }
    }

    /// Requests streaming around the camera. Requests that hit a running expansion are repeated on later frames.
    fn stream(&mut self, camera_position: Vec3) {
        // outside of the map, there is nothing to stream
        let Some(tile) = world_to_tile(camera_position) else {
            return;
        };

        if self.camera_tile != Some(tile) {
            debug!("The camera entered tile {}", tile);
            self.camera_tile = Some(tile);
            self.stream_target = Some(tile);
        }

        let Some(lazy) = self.world.lazy_mut() else {
            return;
        };
        lazy.set_camera_tile(tile);

        if let Some(target) = self.stream_target {
            match lazy.request_expansion(target) {
                ExpansionRequest::InFlight => {}
                ExpansionRequest::Started | ExpansionRequest::AlreadyResident => self.stream_target = None,
            }
        }
    }

    /// Waits for the running expansion and makes its tiles drawable.
    pub async fn finish_streaming(&mut self, device: &mut dyn GpuBackend) -> Result<Option<ExpansionOutcome>, GfxError> {
        let outcome = match self.world.lazy_mut() {
            Some(lazy) => lazy.finish_expansion().await,
            None => None,
        };

        if let Some(outcome) = &outcome {
            Self::report(outcome);
        }

        self.prepare_resident(device)?;
        Ok(outcome)
    }

    pub fn render(&mut self, device: &mut dyn GpuBackend, view: &View) -> Result<FrameStats, GfxError> {
        profiling::scope!("WdtScene::render");
        self.frame += 1;
        self.merge_streamed_tiles();
        self.prepare_resident(device)?;

        // off screen models are animated as well
        for model in self.cache.loaded_models() {
            model.update_animation(view.delta_time);
        }

        if self.culler.should_cull() {
            self.culler.cull_world(view, self.world.world_mut());
        }

        self.stream(view.camera_position);

        let mut stats = FrameStats {
            resident_tiles: self.world.resident_tile_count(),
            ..FrameStats::default()
        };

        self.skybox.submit(device, view, &mut stats)?;

        let world = self.world.world();
        for adt in &world.adts {
            self.terrain.submit(device, &mut self.textures, adt, &mut stats)?;
            if !adt.visible {
                continue;
            }
            stats.visible_tiles += 1;

            let lod = adt.active_lod();
            for def in &lod.wmo_defs {
                Self::submit_definition(&self.wmos, &mut self.models, device, &mut self.textures, def, &mut stats)?;
            }
            for doodad in &lod.doodads {
                self.models.queue(doodad);
            }
        }

        if let Some(global) = &world.global_wmo {
            Self::submit_definition(
                &self.wmos,
                &mut self.models,
                device,
                &mut self.textures,
                &global.definition,
                &mut stats,
            )?;
        }

        self.models.submit(device, &mut self.textures, &mut stats)?;
        stats.draw_calls = device.execute_frame()?;

        debug!("Frame {}: {:?}", self.frame, stats);
        Ok(stats)
    }

    fn submit_definition(
        wmos: &WmoRenderer,
        models: &mut ModelRenderer,
        device: &mut dyn GpuBackend,
        textures: &mut TextureCache,
        def: &WmoDefinition,
        stats: &mut FrameStats,
    ) -> Result<(), GfxError> {
        if !def.visible {
            return Ok(());
        }

        wmos.submit(device, textures, def, stats)?;
        for doodad in &def.doodads {
            models.queue(doodad);
        }

        Ok(())
    }

    /// Releases every GPU resource of this scene and drops the cached assets.
    pub fn destroy(self, device: &mut dyn GpuBackend) -> Result<(), GfxError> {
        self.models.destroy(device)?;
        self.wmos.destroy(device)?;
        self.terrain.destroy(device)?;
        self.skybox.destroy(device)?;
        self.textures.destroy(device)?;
        self.cache.clear();

        info!("Destroyed the scene after {} frames", self.frame);
        Ok(())
    }
}
