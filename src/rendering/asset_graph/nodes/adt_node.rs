use std::collections::HashMap;
use std::ops::Range;
use std::sync::Arc;

use log::{trace, warn};
use sargerust_files::adt::types::{ADTAsset, ADTObjectLayer, MCNKChunk};
use sargerust_files::decoder::ADTFiles;
use sargerust_files::wdt::types::MapFileDataIDs;

use crate::io::FileId;
use crate::rendering::asset_graph::cache::AssetCache;
use crate::rendering::asset_graph::error::AssetError;
use crate::rendering::asset_graph::nodes::model_node::ModelData;
use crate::rendering::asset_graph::nodes::placement::{DoodadData, WmoDefinition};
use crate::rendering::asset_graph::nodes::texture_node::TextureReference;
use crate::rendering::asset_graph::nodes::wmo_node::WmoData;
use crate::rendering::common::coordinate_systems::TileCoord;
use crate::rendering::common::geometry::Aabb;
use crate::rendering::common::mesh_merger::MeshMerger;
use crate::rendering::common::types::{Mesh, TerrainVertex};
use crate::rendering::importer::adt_importer::ADTImporter;

/// MCAL maps are 64x64
pub const ALPHA_MAP_SIZE: usize = 64;
/// The base layer and up to three blended layers
pub const MAX_TERRAIN_LAYERS: usize = 4;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum LodLevel {
    #[default]
    Near,
    Far,
}

impl LodLevel {
    pub fn index(self) -> usize {
        match self {
            LodLevel::Near => 0,
            LodLevel::Far => 1,
        }
    }
}

/// The placements of one level of detail. LOD 0 comes from obj0, LOD 1 from obj1.
#[derive(Debug, Clone, Default)]
pub struct AdtLod {
    pub doodads: Vec<DoodadData>,
    pub wmo_defs: Vec<WmoDefinition>,
}

#[derive(Debug, Clone)]
pub struct TerrainLayer {
    pub texture: TextureReference,
    pub flags: u32,
    pub effect_id: u32,
}

#[derive(Debug, Clone)]
pub struct ChunkData {
    pub index_x: u32,
    pub index_y: u32,
    /// The slice of [`TerrainData::indices`]
    pub index_range: Range<u32>,
    pub layers: Vec<TerrainLayer>,
    /// RGBA8 64x64, the alpha of layer 1, 2 and 3 in r, g and b. None when the chunk has a single layer.
    pub alpha_mask: Option<Vec<u8>>,
    pub world_aabb: Aabb,
    pub visible: bool,
}

/// All 16x16 chunks of a tile share one vertex and one index buffer.
#[derive(Debug, Clone, Default)]
pub struct TerrainData {
    pub vertices: Vec<TerrainVertex>,
    pub indices: Vec<u16>,
    pub chunks: Vec<ChunkData>,
    pub world_aabb: Aabb,
}

#[derive(Debug)]
pub struct AdtData {
    pub tile: TileCoord,
    pub world_aabb: Aabb,
    pub visible: bool,
    /// Exactly one LOD is active at any time
    pub active_lod: LodLevel,
    pub lods: [AdtLod; 2],
    pub terrain: TerrainData,
    /// The models and WMOs placed on this tile, kept alive for as long as the tile is resident
    pub models: HashMap<FileId, Arc<ModelData>>,
    pub wmos: HashMap<FileId, Arc<WmoData>>,
}

fn invalid(file_id: FileId, reason: String) -> AssetError {
    AssetError::Invalid {
        kind: "ADT",
        file_id,
        reason,
    }
}

impl AdtData {
    /// Fetches and decodes the companion files of a tile and resolves everything that is placed on it.
    pub async fn load(
        cache: &AssetCache,
        tile: TileCoord,
        files: &MapFileDataIDs,
        large_doodad_size: f32,
    ) -> Result<AdtData, AssetError> {
        let root_id = files.rootADT;
        let root = cache.fetch(root_id).await?;
        let obj0 = cache.fetch(files.obj0ADT).await?;
        let obj1 = match files.obj1ADT {
            0 => None,
            obj1_id => Some(cache.fetch(obj1_id).await?),
        };
        let tex0 = cache.fetch(files.tex0ADT).await?;

        let asset = cache
            .decoder()
            .decode_adt(&ADTFiles {
                root: &root,
                obj0: &obj0,
                obj1: obj1.as_deref(),
                tex0: &tex0,
            })
            .map_err(|err| AssetError::Decode {
                file_id: root_id,
                reason: err.to_string(),
            })?;

        // the raw buffers are not needed anymore
        drop((root, obj0, obj1, tex0));

        let mut textures = HashMap::new();
        for &texture_id in &asset.textureFileIds {
            if !textures.contains_key(&texture_id) {
                textures.insert(texture_id, TextureReference::resolve(cache, texture_id).await);
            }
        }

        let terrain = Self::create_terrain(root_id, &asset, &textures)?;

        let mut models = HashMap::new();
        let mut wmos = HashMap::new();
        let [near, far] = &asset.objects;
        let lods = [
            Self::load_lod(cache, root_id, near, large_doodad_size, &mut models, &mut wmos).await?,
            Self::load_lod(cache, root_id, far, large_doodad_size, &mut models, &mut wmos).await?,
        ];

        let world_aabb = lods
            .iter()
            .flat_map(|lod| {
                lod.doodads
                    .iter()
                    .map(|doodad| doodad.world_aabb)
                    .chain(lod.wmo_defs.iter().map(|def| def.world_aabb))
            })
            .fold(terrain.world_aabb, |aabb, other| aabb.union(&other));

        let world_aabb = if world_aabb.is_empty() {
            let (min, max) = tile.world_bounds();
            Aabb::new(min.extend(0.0), max.extend(0.0))
        } else {
            world_aabb
        };

        trace!(
            "Loaded tile {} with {} chunks, {}/{} doodads and {}/{} WMOs",
            tile,
            terrain.chunks.len(),
            lods[0].doodads.len(),
            lods[1].doodads.len(),
            lods[0].wmo_defs.len(),
            lods[1].wmo_defs.len()
        );

        Ok(AdtData {
            tile,
            world_aabb,
            visible: true,
            active_lod: LodLevel::Near,
            lods,
            terrain,
            models,
            wmos,
        })
    }

    async fn load_lod(
        cache: &AssetCache,
        root_id: FileId,
        layer: &ADTObjectLayer,
        large_doodad_size: f32,
        models: &mut HashMap<FileId, Arc<ModelData>>,
        wmos: &mut HashMap<FileId, Arc<WmoData>>,
    ) -> Result<AdtLod, AssetError> {
        let mut lod = AdtLod::default();

        for def in &layer.doodadDefs {
            let model_id = *layer
                .modelFileIds
                .get(def.nameId as usize)
                .ok_or_else(|| invalid(root_id, format!("MDDF {} references model {}", def.uniqueId, def.nameId)))?;

            let model = match models.get(&model_id) {
                Some(model) => Arc::clone(model),
                None => match cache.get_model(model_id).await {
                    Ok(model) => {
                        models.insert(model_id, Arc::clone(&model));
                        model
                    }
                    Err(err) => {
                        warn!("ADT {}: skipping doodad {}: {}", root_id, def.uniqueId, err);
                        continue;
                    }
                },
            };

            lod.doodads
                .push(DoodadData::from_adt(&model, def, large_doodad_size));
        }

        for def in &layer.mapObjDefs {
            let wmo_id = *layer
                .wmoFileIds
                .get(def.nameId as usize)
                .ok_or_else(|| invalid(root_id, format!("MODF {} references WMO {}", def.uniqueId, def.nameId)))?;

            let wmo = match wmos.get(&wmo_id) {
                Some(wmo) => Arc::clone(wmo),
                None => {
                    let wmo = cache
                        .get_wmo(wmo_id)
                        .await
                        .map_err(|err| AssetError::dependency("ADT", root_id, err))?;
                    wmos.insert(wmo_id, Arc::clone(&wmo));
                    wmo
                }
            };

            lod.wmo_defs
                .push(WmoDefinition::from_map_obj_def(&wmo, def, true, large_doodad_size));
        }

        Ok(lod)
    }

    fn create_terrain(
        root_id: FileId,
        asset: &ADTAsset,
        textures: &HashMap<FileId, TextureReference>,
    ) -> Result<TerrainData, AssetError> {
        let meshes = asset
            .mcnks
            .iter()
            .map(ADTImporter::create_mesh)
            .collect::<Result<Vec<Mesh>, _>>()
            .map_err(|err| invalid(root_id, format!("{err:#}")))?;

        let chunk_aabbs = meshes
            .iter()
            .map(|mesh| Aabb::from_points(mesh.vertex_buffers.position_buffer.iter().copied()))
            .collect::<Vec<_>>();

        let (merged, ranges) = MeshMerger::merge_meshes_vertices_only(&meshes)
            .ok_or_else(|| invalid(root_id, "the terrain exceeds u16 indices".into()))?;

        let buffers = &merged.vertex_buffers;
        let vertices = (0..buffers.len())
            .map(|i| TerrainVertex {
                position: buffers.position_buffer[i].to_array(),
                normal: buffers.normals_buffer[i].to_array(),
                color: buffers.vertex_color_0[i],
                chunk_uv: buffers.texcoord_buffer_0[i].to_array(),
            })
            .collect::<Vec<_>>();

        let chunks = asset
            .mcnks
            .iter()
            .zip(ranges)
            .zip(chunk_aabbs.iter())
            .map(|((mcnk, index_range), &world_aabb)| ChunkData {
                index_x: mcnk.indexX,
                index_y: mcnk.indexY,
                index_range,
                layers: Self::create_layers(asset, mcnk, textures),
                alpha_mask: Self::create_alpha_mask(mcnk),
                world_aabb,
                visible: true,
            })
            .collect::<Vec<_>>();

        let world_aabb = chunk_aabbs
            .iter()
            .fold(Aabb::EMPTY, |aabb, chunk| aabb.union(chunk));

        Ok(TerrainData {
            vertices,
            indices: merged.index_buffer,
            chunks,
            world_aabb,
        })
    }

    fn create_layers(
        asset: &ADTAsset,
        mcnk: &MCNKChunk,
        textures: &HashMap<FileId, TextureReference>,
    ) -> Vec<TerrainLayer> {
        mcnk.layers
            .iter()
            .take(MAX_TERRAIN_LAYERS)
            .map(|layer| {
                let texture = asset
                    .textureFileIds
                    .get(layer.textureId as usize)
                    .and_then(|texture_id| textures.get(texture_id))
                    .cloned()
                    .unwrap_or(TextureReference::NONE);

                TerrainLayer {
                    texture,
                    flags: layer.flags,
                    effect_id: layer.effectId,
                }
            })
            .collect()
    }

    fn create_alpha_mask(mcnk: &MCNKChunk) -> Option<Vec<u8>> {
        let blended = &mcnk.layers[1.min(mcnk.layers.len())..];
        let blended = &blended[..blended.len().min(MAX_TERRAIN_LAYERS - 1)];
        if blended.iter().all(|layer| layer.alphaMap.is_none()) {
            return None;
        }

        let mut mask = vec![0u8; ALPHA_MAP_SIZE * ALPHA_MAP_SIZE * 4];
        for (channel, layer) in blended.iter().enumerate() {
            let Some(alpha) = &layer.alphaMap else {
                continue;
            };

            for (texel, &value) in alpha.iter().take(ALPHA_MAP_SIZE * ALPHA_MAP_SIZE).enumerate() {
                mask[texel * 4 + channel] = value;
            }
        }

        for texel in mask.chunks_exact_mut(4) {
            texel[3] = 0xFF;
        }

        Some(mask)
    }

    pub fn active_lod(&self) -> &AdtLod {
        &self.lods[self.active_lod.index()]
    }

    pub fn active_lod_mut(&mut self) -> &mut AdtLod {
        &mut self.lods[self.active_lod.index()]
    }
}
