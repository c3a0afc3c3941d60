use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Context;
use log::{debug, info};
use sargerust_files::wdt::types::{MapFileDataIDs, WDTAsset};

use crate::io::FileId;
use crate::rendering::asset_graph::cache::AssetCache;
use crate::rendering::asset_graph::error::AssetError;
use crate::rendering::asset_graph::nodes::adt_node::AdtData;
use crate::rendering::asset_graph::nodes::placement::WmoDefinition;
use crate::rendering::asset_graph::nodes::wmo_node::WmoData;
use crate::rendering::common::coordinate_systems::TileCoord;

/// The single WMO of maps without terrain (dungeons, most instances).
#[derive(Debug)]
pub struct GlobalWmo {
    pub wmo: Arc<WmoData>,
    pub definition: WmoDefinition,
}

/// The resident part of one map. The eager variant loads every tile on construction, [`super::LazyWorldData`]
/// adds tiles as the camera moves.
#[derive(Debug)]
pub struct WorldData {
    pub wdt_id: FileId,
    pub wdt: WDTAsset,
    pub adts: Vec<AdtData>,
    pub global_wmo: Option<GlobalWmo>,
    /// MODF uniqueIds that are already placed by a resident tile
    placed_wmos: HashSet<u32>,
    large_doodad_size: f32,
}

impl WorldData {
    /// Loads the WDT and every tile it references before returning.
    pub async fn load(cache: &AssetCache, wdt_id: FileId, large_doodad_size: f32) -> anyhow::Result<WorldData> {
        let mut world = Self::load_descriptor(cache, wdt_id, large_doodad_size)
            .await
            .with_context(|| format!("Loading WDT {}", wdt_id))?;

        let tiles = world.existing_tiles().collect::<Vec<_>>();
        info!("Loading all {} tiles of WDT {}", tiles.len(), wdt_id);

        for (tile, files) in tiles {
            let adt = AdtData::load(cache, tile, &files, large_doodad_size)
                .await
                .with_context(|| format!("Loading tile {}", tile))?;
            world.add_adt(adt);
        }

        Ok(world)
    }

    /// The WDT and the global WMO, but no tiles.
    pub async fn load_descriptor(
        cache: &AssetCache,
        wdt_id: FileId,
        large_doodad_size: f32,
    ) -> Result<WorldData, AssetError> {
        let wdt = cache
            .fetch_decoded(wdt_id, |decoder, data| decoder.decode_wdt(data))
            .await?;

        let global_wmo = match (wdt.globalWmoFileId, wdt.globalWmoDef.as_ref()) {
            (Some(wmo_id), Some(def)) => {
                let wmo = cache
                    .get_wmo(wmo_id)
                    .await
                    .map_err(|err| AssetError::dependency("WDT", wdt_id, err))?;
                let definition = WmoDefinition::from_map_obj_def(&wmo, def, false, large_doodad_size);
                Some(GlobalWmo { wmo, definition })
            }
            _ => None,
        };

        debug!(
            "WDT {} has {} tiles and {} global WMO",
            wdt_id,
            wdt.tiles.iter().filter(|tile| tile.exists()).count(),
            if global_wmo.is_some() { "a" } else { "no" }
        );

        Ok(WorldData {
            wdt_id,
            wdt,
            adts: vec![],
            global_wmo,
            placed_wmos: HashSet::new(),
            large_doodad_size,
        })
    }

    /// Every tile the WDT marks as existing, with a valid grid coordinate.
    pub fn existing_tiles(&self) -> impl Iterator<Item = (TileCoord, MapFileDataIDs)> + '_ {
        self.wdt
            .tiles
            .iter()
            .filter(|files| files.exists())
            .filter_map(|files| TileCoord::new(files.x, files.y).map(|tile| (tile, *files)))
    }

    pub fn tile_files(&self, tile: TileCoord) -> Option<MapFileDataIDs> {
        self.wdt.tile(tile.x(), tile.y()).copied()
    }

    pub fn adt(&self, tile: TileCoord) -> Option<&AdtData> {
        self.adts.iter().find(|adt| adt.tile == tile)
    }

    pub fn large_doodad_size(&self) -> f32 {
        self.large_doodad_size
    }

    /// WMOs that span multiple tiles are part of every tile's MODF, they are only placed by the first resident one.
    pub fn add_adt(&mut self, mut adt: AdtData) {
        let mut placed_by_tile = HashSet::new();
        for lod in &mut adt.lods {
            lod.wmo_defs
                .retain(|def| def.unique_id == 0 || !self.placed_wmos.contains(&def.unique_id));
            placed_by_tile.extend(lod.wmo_defs.iter().map(|def| def.unique_id));
        }

        self.placed_wmos.extend(placed_by_tile);
        self.adts.push(adt);
    }
}
