use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Context;
use log::{debug, error, info, trace};
use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;

use crate::io::FileId;
use crate::rendering::asset_graph::cache::AssetCache;
use crate::rendering::asset_graph::error::AssetError;
use crate::rendering::asset_graph::nodes::adt_node::AdtData;
use crate::rendering::common::coordinate_systems::TileCoord;
use crate::world::world_data::WorldData;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpansionRequest {
    /// A new expansion has been spawned
    Started,
    /// Another expansion is still running, the request has been dropped
    InFlight,
    /// Every tile of the window is resident (or known to be broken) already
    AlreadyResident,
}

#[derive(Debug, Default)]
pub struct ExpansionOutcome {
    pub center: Option<TileCoord>,
    /// Tiles that have been added to the world
    pub merged: Vec<TileCoord>,
    pub failed: Vec<(TileCoord, AssetError)>,
    /// The camera left the window before all tiles were loaded
    pub stale: bool,
}

struct ExpansionResult {
    loaded: Vec<AdtData>,
    failed: Vec<(TileCoord, AssetError)>,
    stale: bool,
}

struct Expansion {
    center: TileCoord,
    receiver: oneshot::Receiver<ExpansionResult>,
}

/// A world that only keeps the tiles around the camera resident. Tiles are never evicted, the window only grows.
pub struct LazyWorldData {
    cache: Arc<AssetCache>,
    pub world: WorldData,
    loaded_tiles: HashSet<TileCoord>,
    failed_tiles: HashSet<TileCoord>,
    radius: u8,
    /// Bumped whenever the camera enters another tile, expansions of older generations stop loading tiles.
    generation: Arc<AtomicU64>,
    camera_tile: Option<TileCoord>,
    expansion: Option<Expansion>,
}

impl LazyWorldData {
    /// Loads the WDT and the tiles within `radius` of `start`, before returning.
    pub async fn load(cache: Arc<AssetCache>, wdt_id: FileId, start: TileCoord, radius: u8) -> anyhow::Result<Self> {
        Self::load_with_doodad_size(cache, wdt_id, start, radius, crate::rendering::culling::DEFAULT_LARGE_DOODAD_SIZE)
            .await
    }

    pub async fn load_with_doodad_size(
        cache: Arc<AssetCache>,
        wdt_id: FileId,
        start: TileCoord,
        radius: u8,
        large_doodad_size: f32,
    ) -> anyhow::Result<Self> {
        let world = WorldData::load_descriptor(&cache, wdt_id, large_doodad_size)
            .await
            .with_context(|| format!("Loading WDT {}", wdt_id))?;

        let mut lazy = LazyWorldData {
            cache,
            world,
            loaded_tiles: HashSet::new(),
            failed_tiles: HashSet::new(),
            radius,
            generation: Arc::new(AtomicU64::new(0)),
            camera_tile: Some(start),
            expansion: None,
        };

        let missing = lazy.missing_tiles(start);
        info!("Loading {} tiles around {} (radius {})", missing.len(), start, radius);

        for tile in missing {
            let Some(files) = lazy.world.tile_files(tile) else {
                continue;
            };

            let adt = AdtData::load(&lazy.cache, tile, &files, large_doodad_size)
                .await
                .with_context(|| format!("Loading tile {}", tile))?;
            lazy.merge(adt);
        }

        Ok(lazy)
    }

    /// The tiles of the window around `center` that exist in the WDT but are not resident yet.
    fn missing_tiles(&self, center: TileCoord) -> Vec<TileCoord> {
        center
            .window(self.radius)
            .filter(|tile| !self.loaded_tiles.contains(tile) && !self.failed_tiles.contains(tile))
            .filter(|tile| self.world.tile_files(*tile).is_some())
            .collect()
    }

    fn merge(&mut self, adt: AdtData) {
        // tiles are never loaded twice
        if self.loaded_tiles.insert(adt.tile) {
            debug!("Tile {} is resident now", adt.tile);
            self.world.add_adt(adt);
        }
    }

    /// Records the tile the camera is in. Entering another tile makes running expansions stale.
    pub fn set_camera_tile(&mut self, tile: TileCoord) {
        if self.camera_tile != Some(tile) {
            self.camera_tile = Some(tile);
            self.generation.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Starts loading the window around `center` in the background. Only one expansion runs at a time, requests in
    /// the meantime are dropped and need to be issued again.
    pub fn request_expansion(&mut self, center: TileCoord) -> ExpansionRequest {
        if let Some(expansion) = &self.expansion {
            trace!(
                "Dropping the expansion request for {}, {} is still in flight",
                center, expansion.center
            );
            return ExpansionRequest::InFlight;
        }

        let missing = self.missing_tiles(center);
        if missing.is_empty() {
            return ExpansionRequest::AlreadyResident;
        }

        let jobs = missing
            .into_iter()
            .filter_map(|tile| self.world.tile_files(tile).map(|files| (tile, files)))
            .collect::<Vec<_>>();

        debug!("Expanding the world around {} by {} tiles", center, jobs.len());

        let (sender, receiver) = oneshot::channel();
        let cache = self.cache.clone();
        let generation = self.generation.clone();
        let started_in = generation.load(Ordering::SeqCst);
        let large_doodad_size = self.world.large_doodad_size();

        tokio::spawn(async move {
            let mut result = ExpansionResult {
                loaded: vec![],
                failed: vec![],
                stale: false,
            };

            for (tile, files) in jobs {
                if generation.load(Ordering::SeqCst) != started_in {
                    result.stale = true;
                    break;
                }

                match AdtData::load(&cache, tile, &files, large_doodad_size).await {
                    Ok(adt) => result.loaded.push(adt),
                    Err(err) => result.failed.push((tile, err)),
                }
            }

            // the receiver is gone when the world has been dropped in the meantime
            let _ = sender.send(result);
        });

        self.expansion = Some(Expansion { center, receiver });
        ExpansionRequest::Started
    }

    pub fn is_expanding(&self) -> bool {
        self.expansion.is_some()
    }

    /// Merges the result of a finished expansion, without waiting for a running one.
    pub fn poll_expansion(&mut self) -> Option<ExpansionOutcome> {
        let expansion = self.expansion.as_mut()?;
        match expansion.receiver.try_recv() {
            Ok(result) => {
                let center = expansion.center;
                self.expansion = None;
                Some(self.apply(center, result))
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Closed) => {
                error!("The expansion around {} has been aborted", expansion.center);
                self.expansion = None;
                None
            }
        }
    }

    /// Waits for the running expansion (if any) and merges it.
    pub async fn finish_expansion(&mut self) -> Option<ExpansionOutcome> {
        let expansion = self.expansion.take()?;
        match expansion.receiver.await {
            Ok(result) => Some(self.apply(expansion.center, result)),
            Err(_) => {
                error!("The expansion around {} has been aborted", expansion.center);
                None
            }
        }
    }

    fn apply(&mut self, center: TileCoord, result: ExpansionResult) -> ExpansionOutcome {
        let mut outcome = ExpansionOutcome {
            center: Some(center),
            stale: result.stale,
            ..ExpansionOutcome::default()
        };

        // stale expansions are merged as well, the tiles have been loaded already
        for adt in result.loaded {
            outcome.merged.push(adt.tile);
            self.merge(adt);
        }

        for (tile, err) in result.failed {
            self.failed_tiles.insert(tile);
            outcome.failed.push((tile, err));
        }

        debug!(
            "Expansion around {} merged {} tiles ({} failed{})",
            center,
            outcome.merged.len(),
            outcome.failed.len(),
            if outcome.stale { ", stale" } else { "" }
        );

        outcome
    }

    pub fn is_resident(&self, tile: TileCoord) -> bool {
        self.loaded_tiles.contains(&tile)
    }

    pub fn resident_tiles(&self) -> &HashSet<TileCoord> {
        &self.loaded_tiles
    }

    pub fn radius(&self) -> u8 {
        self.radius
    }

    pub fn cache(&self) -> &Arc<AssetCache> {
        &self.cache
    }
}
