//! Generated worlds for the `demo` mode and the tests. Every asset is serialized into the JSON records of the
//! extracted assets and served from memory, so loading runs through the real decoder.
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use anyhow::{anyhow, bail};
use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use glam::Vec3;
use itertools::Itertools;
use log::debug;
use sargerust_files::adt::types::{ADTObjectLayer, ADTRootFile, ADTTextureFile, MCNKChunk, SMDoodadDef, SMLayer};
use sargerust_files::blp::types::{BlpAsset, BlpPixelFormat};
use sargerust_files::common::types::{C2Vector, C3Vector, C4Quaternion, CAaBox, CImVector, M2Track};
use sargerust_files::extracted::{JsonDecoder, MCVT_HEIGHT_COUNT};
use sargerust_files::m2::types::{
    M2Asset, M2Batch, M2CompBone, M2Material, M2Sequence, M2SequenceFlags, M2SkinProfile, M2SkinSection, M2Vertex,
};
use sargerust_files::wdt::types::{MapFileDataIDs, SMMapObjDef, WDTAsset};
use sargerust_files::wmo::types::{
    SMOBatch, SMODoodadDef, SMODoodadSet, SMOGroupFlags, SMOGroupInfo, SMOMaterial, WMOGroupAsset, WMORootAsset,
};
use serde::Serialize;

use crate::io::FileId;
use crate::io::common::loader::ByteFetcher;
use crate::rendering::asset_graph::cache::AssetCache;
use crate::rendering::common::coordinate_systems::{CHUNK_SIZE, GRID_SIZE, TileCoord, world_to_placement};

/// MDDF/MODF scale of 1.0
const PLACEMENT_SCALE_ONE: u16 = 1024;
/// MCLY flag: the layer is blended by its alpha map
const LAYER_USE_ALPHA_MAP: u32 = 0x100;
const ALPHA_MAP_TEXELS: usize = 64 * 64;
const STAND_ANIMATION_DURATION: u32 = 2000;

/// An in-memory file system. Fetches are counted per file, and files can be made to fail on demand.
#[derive(Debug)]
pub struct DemoAssetStore {
    files: DashMap<FileId, Vec<u8>>,
    fetches: DashMap<FileId, usize>,
    failing: DashSet<FileId>,
    next_id: AtomicU32,
}

impl Default for DemoAssetStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DemoAssetStore {
    pub fn new() -> Self {
        DemoAssetStore {
            files: DashMap::new(),
            fetches: DashMap::new(),
            failing: DashSet::new(),
            // 0 is "no file" everywhere
            next_id: AtomicU32::new(1),
        }
    }

    /// A cache that reads from this store through the JSON decoder.
    pub fn cache(self: &Arc<Self>) -> Arc<AssetCache> {
        Arc::new(AssetCache::new(
            Arc::clone(self) as Arc<dyn ByteFetcher>,
            Arc::new(JsonDecoder::default()),
        ))
    }

    pub fn allocate(&self) -> FileId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    pub fn insert<T: Serialize>(&self, record: &T) -> anyhow::Result<FileId> {
        let file_id = self.allocate();
        self.replace(file_id, record)?;
        Ok(file_id)
    }

    pub fn replace<T: Serialize>(&self, file_id: FileId, record: &T) -> anyhow::Result<()> {
        self.insert_raw(file_id, serde_json::to_vec(record)?);
        Ok(())
    }

    pub fn insert_raw(&self, file_id: FileId, data: Vec<u8>) {
        self.files.insert(file_id, data);
    }

    pub fn remove(&self, file_id: FileId) -> Option<Vec<u8>> {
        self.files.remove(&file_id).map(|(_, data)| data)
    }

    /// Every fetch of `file_id` fails from now on.
    pub fn fail(&self, file_id: FileId) {
        self.failing.insert(file_id);
    }

    pub fn restore(&self, file_id: FileId) {
        self.failing.remove(&file_id);
    }

    pub fn fetch_count(&self, file_id: FileId) -> usize {
        self.fetches.get(&file_id).map(|count| *count).unwrap_or(0)
    }

    pub fn total_fetches(&self) -> usize {
        self.fetches.iter().map(|count| *count.value()).sum()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// A texture with a full mip chain, `color` is 0xAARRGGBB.
    pub fn add_texture(&self, size: u32, color: u32) -> anyhow::Result<FileId> {
        self.insert(&checker_texture(size, color))
    }

    /// A box shaped model standing on its origin, with one skin and one root bone. Animated models rotate the bone
    /// around Z in their stand animation. A `texture_id` of 0 makes an untextured model.
    pub fn add_model(&self, name: &str, half_extent: f32, texture_id: FileId, animated: bool) -> anyhow::Result<FileId> {
        let skin_id = self.insert(&box_skin(texture_id != 0))?;
        let model_id = self.insert(&box_model(name, half_extent, texture_id, skin_id, animated))?;
        debug!("Generated model {} ({}) with skin {}", name, model_id, skin_id);
        Ok(model_id)
    }

    pub fn add_wmo(&self, wmo: &DemoWmo) -> anyhow::Result<FileId> {
        let group_ids = (0..wmo.groups)
            .map(|group| self.insert(&wmo_group(wmo, group)))
            .collect::<anyhow::Result<Vec<_>>>()?;

        self.insert(&wmo_root(wmo, group_ids))
    }

    /// The four companion files of a tile. WMOs are placed in both LODs, like the far placements do in the client.
    pub fn add_tile(&self, tile: TileCoord, layout: &TileLayout) -> anyhow::Result<MapFileDataIDs> {
        if layout.textures.is_empty() {
            bail!("Tile {} needs at least a base texture", tile);
        }

        let (mcnks, chunk_layers): (Vec<_>, Vec<_>) = (0..layout.chunks_per_side)
            .cartesian_product(0..layout.chunks_per_side)
            .map(|(index_y, index_x)| terrain_chunk(tile, index_x, index_y, layout.textures.len()))
            .unzip();

        let root = ADTRootFile { mcnks };
        let tex0 = ADTTextureFile {
            textureFileIds: layout.textures.clone(),
            chunkLayers: chunk_layers,
        };
        let obj0 = object_layer(&layout.near_doodads, &layout.wmos);
        let obj1 = object_layer(&layout.far_doodads, &layout.wmos);

        Ok(MapFileDataIDs {
            x: tile.x(),
            y: tile.y(),
            rootADT: self.insert(&root)?,
            obj0ADT: self.insert(&obj0)?,
            obj1ADT: self.insert(&obj1)?,
            tex0ADT: self.insert(&tex0)?,
            lodADT: 0,
        })
    }

    pub fn add_wdt(&self, tiles: &[MapFileDataIDs], global_wmo: Option<&DemoPlacement>) -> anyhow::Result<FileId> {
        let wdt = WDTAsset {
            mphd: if global_wmo.is_some() { 0x1 } else { 0 },
            tiles: tiles.to_vec(),
            globalWmoFileId: global_wmo.map(|placement| placement.file_id),
            globalWmoDef: global_wmo.map(|placement| map_obj_def(0, placement)),
        };

        self.insert(&wdt)
    }
}

#[async_trait]
impl ByteFetcher for DemoAssetStore {
    async fn fetch(&self, file_id: FileId) -> Result<Vec<u8>, anyhow::Error> {
        // concurrent loads interleave at every fetch, like they do on a real file system
        tokio::task::yield_now().await;
        *self.fetches.entry(file_id).or_default() += 1;

        if self.failing.contains(&file_id) {
            bail!("File {} is unavailable", file_id);
        }

        self.files
            .get(&file_id)
            .map(|data| data.clone())
            .ok_or_else(|| anyhow!("File {} does not exist", file_id))
    }
}

/// Something placed on a tile or in the WDT, at a world space position.
#[derive(Debug, Copy, Clone)]
pub struct DemoPlacement {
    pub file_id: FileId,
    pub unique_id: u32,
    pub position: Vec3,
}

#[derive(Debug, Clone, Default)]
pub struct TileLayout {
    /// 16 for a full tile
    pub chunks_per_side: u32,
    /// The base layer first, every further texture becomes a blended layer
    pub textures: Vec<FileId>,
    pub near_doodads: Vec<DemoPlacement>,
    pub far_doodads: Vec<DemoPlacement>,
    pub wmos: Vec<DemoPlacement>,
}

/// A building: one group per `groups` in a row along X, the first one exterior, the others interior.
#[derive(Debug, Clone)]
pub struct DemoWmo {
    pub groups: usize,
    pub group_half_extent: f32,
    pub texture_id: FileId,
    /// One doodad per model, spread over the groups. Doodads past `referenced_doodads` belong to no group.
    pub doodad_models: Vec<FileId>,
    pub referenced_doodads: usize,
}

/// The gentle hills every generated tile is made of.
pub fn terrain_height(x: f32, y: f32) -> f32 {
    8.0 * (x / 90.0).sin() * (y / 70.0).cos()
}

fn c3(vector: Vec3) -> C3Vector {
    C3Vector::new(vector.x, vector.y, vector.z)
}

fn checker_texture(size: u32, color: u32) -> BlpAsset {
    let [b, g, r, a] = color.to_le_bytes();
    let mut mips = Vec::new();
    let mut level_size = size.max(1);
    loop {
        let texels = (0..level_size)
            .cartesian_product(0..level_size)
            .flat_map(|(row, column)| {
                let shade = if (row / 4 + column / 4) % 2 == 0 { 0 } else { 32 };
                [b.saturating_sub(shade), g.saturating_sub(shade), r.saturating_sub(shade), a]
            })
            .collect_vec();
        mips.push(texels);

        if level_size == 1 {
            break;
        }
        level_size /= 2;
    }

    BlpAsset {
        width: size.max(1),
        height: size.max(1),
        format: BlpPixelFormat::Bgra8,
        mips,
    }
}

/// Corner `c` has the bits x, y, z
const BOX_FACES: [[u16; 4]; 6] = [
    [0, 2, 3, 1],
    [4, 5, 7, 6],
    [0, 1, 5, 4],
    [2, 6, 7, 3],
    [0, 4, 6, 2],
    [1, 3, 7, 5],
];

fn box_corners(center: Vec3, half_extent: Vec3) -> [Vec3; 8] {
    std::array::from_fn(|corner| {
        let sign = Vec3::new(
            if corner & 1 != 0 { 1.0 } else { -1.0 },
            if corner & 2 != 0 { 1.0 } else { -1.0 },
            if corner & 4 != 0 { 1.0 } else { -1.0 },
        );
        center + sign * half_extent
    })
}

fn box_indices() -> Vec<u16> {
    BOX_FACES
        .iter()
        .flat_map(|&[a, b, c, d]| [a, b, c, a, c, d])
        .collect()
}

fn box_model(name: &str, half_extent: f32, texture_id: FileId, skin_id: FileId, animated: bool) -> M2Asset {
    let half = Vec3::splat(half_extent);
    let center = Vec3::new(0.0, 0.0, half_extent);
    let vertices = box_corners(center, half)
        .iter()
        .enumerate()
        .map(|(corner, &position)| {
            let uv = C2Vector {
                x: (corner & 1) as f32,
                y: ((corner >> 1) & 1) as f32,
            };
            M2Vertex {
                pos: c3(position),
                bone_weights: [255, 0, 0, 0],
                bone_indices: [0; 4],
                normal: c3((position - center).normalize_or_zero()),
                tex_coords: [uv, uv],
            }
        })
        .collect_vec();

    let mut root_bone = M2CompBone::with_parent(-1);
    let mut sequences = vec![];
    if animated {
        let turn = |angle: f32| {
            let (sin, cos) = (angle * 0.5).sin_cos();
            C4Quaternion {
                x: 0.0,
                y: 0.0,
                z: sin,
                w: cos,
            }
        };

        root_bone.rotation = M2Track {
            interpolation_type: 1,
            global_sequence: -1,
            timestamps: vec![vec![0, STAND_ANIMATION_DURATION / 2, STAND_ANIMATION_DURATION]],
            values: vec![vec![turn(0.0), turn(0.3), turn(0.0)]],
        };
        sequences.push(M2Sequence {
            id: 0,
            duration: STAND_ANIMATION_DURATION,
            flags: M2SequenceFlags::LOADED.bits(),
            frequency: 0x7fff,
            variation_next: -1,
            ..M2Sequence::default()
        });
    }

    let textured = texture_id != 0;
    M2Asset {
        name: name.to_string(),
        vertices,
        bounding_box: CAaBox {
            min: c3(center - half),
            max: c3(center + half),
        },
        bones: vec![root_bone],
        sequences,
        materials: vec![M2Material {
            flags: 0,
            blending_mode: 0,
        }],
        texture_file_ids: if textured { vec![texture_id] } else { vec![] },
        skin_file_ids: vec![skin_id],
        texture_lookup_table: if textured { vec![0] } else { vec![] },
        ..M2Asset::default()
    }
}

fn box_skin(textured: bool) -> M2SkinProfile {
    let indices = box_indices();
    M2SkinProfile {
        vertices: (0..8).collect(),
        submeshes: vec![M2SkinSection {
            vertex_start: 0,
            vertex_count: 8,
            index_start: 0,
            index_count: indices.len() as u16,
            bone_count: 1,
            ..M2SkinSection::default()
        }],
        batches: vec![M2Batch {
            skin_section_index: 0,
            color_index: -1,
            material_index: 0,
            texture_count: u16::from(textured),
            texture_combo_index: 0,
            ..M2Batch::default()
        }],
        indices,
        bone_count_max: 1,
    }
}

fn group_center(wmo: &DemoWmo, group: usize) -> Vec3 {
    let extent = wmo.group_half_extent;
    Vec3::new(2.0 * extent * group as f32, 0.0, extent)
}

fn group_flags(group: usize) -> u32 {
    let placement = if group == 0 {
        SMOGroupFlags::EXTERIOR
    } else {
        SMOGroupFlags::INTERIOR
    };
    (placement | SMOGroupFlags::HAS_DOODADS).bits()
}

fn group_bounds(wmo: &DemoWmo, group: usize) -> CAaBox {
    let center = group_center(wmo, group);
    let half = Vec3::splat(wmo.group_half_extent);
    CAaBox {
        min: c3(center - half),
        max: c3(center + half),
    }
}

fn wmo_group(wmo: &DemoWmo, group: usize) -> WMOGroupAsset {
    let center = group_center(wmo, group);
    let corners = box_corners(center, Vec3::splat(wmo.group_half_extent));
    let indices = box_indices();

    let doodad_refs = (0..wmo.referenced_doodads.min(wmo.doodad_models.len()))
        .filter(|doodad| doodad % wmo.groups == group)
        .map(|doodad| doodad as u16)
        .collect();

    WMOGroupAsset {
        flags: group_flags(group),
        bounding_box: group_bounds(wmo, group),
        positions: corners.iter().copied().map(c3).collect(),
        normals: corners
            .iter()
            .map(|&corner| c3((corner - center).normalize_or_zero()))
            .collect(),
        texCoords: (0..corners.len())
            .map(|corner| C2Vector {
                x: (corner & 1) as f32,
                y: ((corner >> 1) & 1) as f32,
            })
            .collect(),
        vertexColors: vec![],
        batches: vec![SMOBatch {
            startIndex: 0,
            count: indices.len() as u16,
            minIndex: 0,
            maxIndex: 7,
            material_id: 0,
        }],
        indices,
        doodadRefs: doodad_refs,
    }
}

fn wmo_root(wmo: &DemoWmo, group_ids: Vec<FileId>) -> WMORootAsset {
    let bounds = (0..wmo.groups).map(|group| group_bounds(wmo, group)).collect_vec();
    let bounding_box = bounds
        .iter()
        .copied()
        .reduce(|a, b| CAaBox {
            min: C3Vector::new(a.min.x.min(b.min.x), a.min.y.min(b.min.y), a.min.z.min(b.min.z)),
            max: C3Vector::new(a.max.x.max(b.max.x), a.max.y.max(b.max.y), a.max.z.max(b.max.z)),
        })
        .unwrap_or_default();

    let doodad_defs = wmo
        .doodad_models
        .iter()
        .enumerate()
        .map(|(doodad, &model_id)| {
            // on the floor of the group that references the doodad
            let group = doodad % wmo.groups.max(1);
            let offset = Vec3::new(0.0, (doodad / wmo.groups.max(1)) as f32 * 2.0, 0.0);
            SMODoodadDef {
                modelFileId: model_id,
                position: c3(group_center(wmo, group) - Vec3::new(0.0, 0.0, wmo.group_half_extent) + offset),
                orientation: C4Quaternion::default(),
                scale: 1.0,
                color: CImVector::from(0xFF7F7F7F),
            }
        })
        .collect_vec();

    WMORootAsset {
        flags: 0,
        ambColor: CImVector::from(0xFF404858),
        bounding_box,
        materials: vec![SMOMaterial {
            texture_1: wmo.texture_id,
            diffColor: CImVector::from(0xFFFFFFFF),
            ..SMOMaterial::default()
        }],
        groupFileIds: group_ids,
        groupInfos: (0..wmo.groups)
            .map(|group| SMOGroupInfo {
                flags: group_flags(group),
                bounding_box: bounds[group],
            })
            .collect(),
        doodadSets: vec![SMODoodadSet {
            name: "Set_$DefaultGlobal".to_string(),
            startIndex: 0,
            count: doodad_defs.len() as u32,
        }],
        doodadDefs: doodad_defs,
    }
}

fn terrain_chunk(tile: TileCoord, index_x: u32, index_y: u32, texture_count: usize) -> (MCNKChunk, Vec<SMLayer>) {
    let (_, max) = tile.world_bounds();
    // rows go south (-x), columns go east (-y)
    let corner = Vec3::new(
        max.x - CHUNK_SIZE * index_y as f32,
        max.y - CHUNK_SIZE * index_x as f32,
        0.0,
    );

    let heights = (0..MCVT_HEIGHT_COUNT)
        .map(|index| {
            // 9 outer vertices, then 8 inner ones shifted by half a cell
            let (row, column) = match index % 17 {
                outer @ 0..9 => ((index / 17) as f32, outer as f32),
                inner => ((index / 17) as f32 + 0.5, (inner - 9) as f32 + 0.5),
            };
            terrain_height(corner.x - GRID_SIZE * row, corner.y - GRID_SIZE * column)
        })
        .collect_vec();

    let mcnk = MCNKChunk {
        indexX: index_x,
        indexY: index_y,
        holes_low_res: 0,
        position: c3(corner),
        heights,
        normals: vec![],
        vertexColors: None,
        layers: vec![],
    };

    let layers = (0..texture_count)
        .map(|texture| {
            // only the diagonal is blended, to keep the records small
            let blended = texture > 0 && index_x == index_y;
            SMLayer {
                textureId: texture as u32,
                flags: if blended { LAYER_USE_ALPHA_MAP } else { 0 },
                effectId: 0,
                alphaMap: blended.then(|| (0..ALPHA_MAP_TEXELS).map(|texel| (texel % 64 * 4) as u8).collect()),
            }
        })
        .filter(|layer| layer.textureId == 0 || layer.alphaMap.is_some())
        .collect_vec();

    (mcnk, layers)
}

fn object_layer(doodads: &[DemoPlacement], wmos: &[DemoPlacement]) -> ADTObjectLayer {
    let model_ids = doodads.iter().map(|doodad| doodad.file_id).unique().collect_vec();
    let wmo_ids = wmos.iter().map(|wmo| wmo.file_id).unique().collect_vec();

    let name_id = |ids: &[FileId], file_id: FileId| ids.iter().position(|&id| id == file_id).unwrap_or(0) as u32;

    ADTObjectLayer {
        doodadDefs: doodads
            .iter()
            .map(|doodad| SMDoodadDef {
                nameId: name_id(&model_ids, doodad.file_id),
                uniqueId: doodad.unique_id,
                position: c3(world_to_placement(doodad.position)),
                rotation: C3Vector::default(),
                scale: PLACEMENT_SCALE_ONE,
                flags: 0,
            })
            .collect(),
        mapObjDefs: wmos
            .iter()
            .map(|wmo| map_obj_def(name_id(&wmo_ids, wmo.file_id), wmo))
            .collect(),
        modelFileIds: model_ids,
        wmoFileIds: wmo_ids,
    }
}

fn map_obj_def(name_id: u32, placement: &DemoPlacement) -> SMMapObjDef {
    let position = world_to_placement(placement.position);
    SMMapObjDef {
        nameId: name_id,
        uniqueId: placement.unique_id,
        pos: c3(position),
        rot: C3Vector::default(),
        // only used when the WMO has no bounds of its own
        extents: CAaBox {
            min: c3(position),
            max: c3(position),
        },
        flags: 0,
        doodadSet: 0,
        nameSet: 0,
        scale: PLACEMENT_SCALE_ONE,
    }
}

/// The file ids of a generated world.
#[derive(Debug, Clone)]
pub struct DemoWorld {
    pub wdt_id: FileId,
    pub tiles: Vec<TileCoord>,
    pub textures: Vec<FileId>,
    pub models: Vec<FileId>,
    pub wmo_id: FileId,
    /// The tile the building stands on
    pub center: TileCoord,
}

impl DemoWorld {
    /// Above the center tile, high enough to see the hills around it.
    pub fn camera_start(&self) -> Vec3 {
        self.center.world_center() + Vec3::new(0.0, 0.0, 60.0)
    }
}

/// Generates a square of `grid` x `grid` tiles, starting at `first` and clipped to the map.
#[derive(Debug, Clone)]
pub struct DemoWorldBuilder {
    first: TileCoord,
    grid: u8,
    chunks_per_side: u32,
    doodads_per_tile: usize,
    with_wmo: bool,
}

impl DemoWorldBuilder {
    pub fn new(first: TileCoord, grid: u8) -> Self {
        DemoWorldBuilder {
            first,
            grid,
            chunks_per_side: 16,
            doodads_per_tile: 4,
            with_wmo: true,
        }
    }

    /// Fewer chunks keep the records small, the tiles are only partially covered then.
    pub fn chunks_per_side(mut self, chunks: u32) -> Self {
        self.chunks_per_side = chunks.clamp(1, 16);
        self
    }

    pub fn doodads_per_tile(mut self, doodads: usize) -> Self {
        self.doodads_per_tile = doodads;
        self
    }

    pub fn with_wmo(mut self, with_wmo: bool) -> Self {
        self.with_wmo = with_wmo;
        self
    }

    pub fn build(&self, store: &DemoAssetStore) -> anyhow::Result<DemoWorld> {
        let grass = store.add_texture(64, 0xFF3A7D2C)?;
        let dirt = store.add_texture(64, 0xFF7A5A3A)?;
        let bark = store.add_texture(32, 0xFF5B3A1E)?;
        let stone = store.add_texture(32, 0xFF8C8C8C)?;
        let plaster = store.add_texture(64, 0xFFD8CFB8)?;

        let tree = store.add_model("Tree", 6.0, bark, true)?;
        let rock = store.add_model("Rock", 1.5, stone, false)?;
        let lamp = store.add_model("Lamp", 0.5, stone, true)?;
        let barrel = store.add_model("Barrel", 0.75, bark, false)?;
        let models = vec![tree, rock, lamp, barrel];

        let wmo_id = if self.with_wmo {
            store.add_wmo(&DemoWmo {
                groups: 2,
                group_half_extent: 12.0,
                texture_id: plaster,
                doodad_models: vec![lamp, barrel, rock],
                referenced_doodads: 3,
            })?
        } else {
            0
        };

        let tiles = (0..self.grid)
            .cartesian_product(0..self.grid)
            .filter_map(|(dx, dy)| {
                TileCoord::from_signed(self.first.x() as i32 + dx as i32, self.first.y() as i32 + dy as i32)
            })
            .collect_vec();

        let center = TileCoord::from_signed(
            self.first.x() as i32 + self.grid as i32 / 2,
            self.first.y() as i32 + self.grid as i32 / 2,
        )
        .filter(|center| tiles.contains(center))
        .unwrap_or(self.first);

        let mut unique_id = 0;
        let mut next_unique_id = || {
            unique_id += 1;
            unique_id
        };

        // one building, referenced by its own tile and the one east of it, like WMOs that span tile borders
        let wmo = DemoPlacement {
            file_id: wmo_id,
            unique_id: next_unique_id(),
            position: center.world_center().with_z(terrain_height(center.world_center().x, center.world_center().y)),
        };

        let mut tile_files = Vec::with_capacity(tiles.len());
        for &tile in &tiles {
            let tile_center = tile.world_center();
            let near_doodads = (0..self.doodads_per_tile)
                .map(|doodad| {
                    let angle = doodad as f32 / self.doodads_per_tile as f32 * std::f32::consts::TAU;
                    let position = tile_center + Vec3::new(angle.cos(), angle.sin(), 0.0) * 120.0;
                    DemoPlacement {
                        file_id: models[doodad % models.len()],
                        unique_id: next_unique_id(),
                        position: position.with_z(terrain_height(position.x, position.y)),
                    }
                })
                .collect_vec();

            // the far LOD keeps the trees only
            let far_doodads = near_doodads
                .iter()
                .filter(|doodad| doodad.file_id == tree)
                .copied()
                .collect_vec();

            let east = TileCoord::new(center.x() + 1, center.y());
            let wmos = if self.with_wmo && (tile == center || Some(tile) == east) {
                vec![wmo]
            } else {
                vec![]
            };

            tile_files.push(store.add_tile(
                tile,
                &TileLayout {
                    chunks_per_side: self.chunks_per_side,
                    textures: vec![grass, dirt],
                    near_doodads,
                    far_doodads,
                    wmos,
                },
            )?);
        }

        let wdt_id = store.add_wdt(&tile_files, None)?;
        debug!(
            "Generated WDT {} with {} tiles ({} files)",
            wdt_id,
            tiles.len(),
            store.len()
        );

        Ok(DemoWorld {
            wdt_id,
            tiles,
            textures: vec![grass, dirt, bark, stone, plaster],
            models,
            wmo_id,
            center,
        })
    }
}
