use std::ops::Range;
use std::sync::{RwLock, RwLockReadGuard};

use log::{trace, warn};
use sargerust_files::m2::types::{M2Asset, M2Batch, M2MaterialFlags, M2SkinProfile};

use crate::io::FileId;
use crate::rendering::animation::AnimationManager;
use crate::rendering::asset_graph::cache::AssetCache;
use crate::rendering::asset_graph::error::AssetError;
use crate::rendering::asset_graph::nodes::texture_node::TextureReference;
use crate::rendering::common::geometry::Aabb;
use crate::rendering::common::types::ModelVertex;
use crate::rendering::gfx::BlendMode;
use crate::rendering::importer::m2_importer::M2Importer;

/// A batch can combine up to 4 texture units
pub const MAX_TEXTURE_UNITS: usize = 4;
const NO_LOOKUP: u16 = 0xFFFF;

#[derive(Debug)]
pub struct ModelData {
    pub file_id: FileId,
    pub name: String,
    pub vertices: Vec<ModelVertex>,
    pub skins: Vec<SkinData>,
    pub textures: Vec<TextureReference>,
    pub bounding_box: Aabb,
    pub bone_count: usize,
    animation: RwLock<AnimationManager>,
}

/// One skin profile: an index buffer over the shared vertex buffer, split into render passes.
#[derive(Debug)]
pub struct SkinData {
    pub file_id: FileId,
    /// Already translated into the model's vertex buffer
    pub index_buffer: Vec<u16>,
    pub render_passes: Vec<ModelRenderPass>,
}

#[derive(Debug, Clone)]
pub struct ModelRenderPass {
    pub index_range: Range<u32>,
    pub blend_mode: BlendMode,
    pub material_flags: M2MaterialFlags,
    /// Indices into [`ModelData::textures`]
    pub textures: Vec<usize>,
    pub texture_weight_index: Option<usize>,
    /// Per texture unit
    pub texture_transform_indices: Vec<Option<usize>>,
    pub color_index: Option<usize>,
    pub shader_id: u16,
    pub priority_plane: i8,
    pub layer: u16,
}

impl ModelRenderPass {
    /// Passes that reference a texture which failed to load are not drawn at all.
    pub fn is_drawable(&self, model: &ModelData) -> bool {
        self.textures
            .iter()
            .all(|&texture| model.textures.get(texture).is_some_and(|t| !t.is_missing()))
    }
}

fn invalid(file_id: FileId, reason: String) -> AssetError {
    AssetError::Invalid {
        kind: "Model",
        file_id,
        reason,
    }
}

fn lookup(table: &[u16], index: usize) -> Option<usize> {
    table
        .get(index)
        .copied()
        .filter(|&value| value != NO_LOOKUP)
        .map(|value| value as usize)
}

impl ModelData {
    pub async fn load(cache: &AssetCache, file_id: FileId) -> Result<ModelData, AssetError> {
        let asset = cache
            .fetch_decoded(file_id, |decoder, data| decoder.decode_m2(data))
            .await?;

        let mut skins = Vec::with_capacity(asset.skin_file_ids.len());
        for &skin_id in &asset.skin_file_ids {
            let skin = cache
                .fetch_decoded(skin_id, |decoder, data| decoder.decode_skin(data))
                .await
                .map_err(|err| AssetError::dependency("Model", file_id, err))?;

            skins.push(Self::create_skin(&asset, file_id, skin_id, &skin)?);
        }

        // texture failures are not fatal, the passes using them are skipped at draw time
        let mut textures = Vec::with_capacity(asset.texture_file_ids.len());
        for &texture_id in &asset.texture_file_ids {
            textures.push(TextureReference::resolve(cache, texture_id).await);
        }

        if let Some(missing) = textures.iter().find(|texture| texture.is_missing()) {
            warn!(
                "Model {} ({}) is missing texture {}, some of its passes won't be drawn",
                asset.name, file_id, missing.file_id
            );
        }

        trace!(
            "Loaded model {} ({}) with {} skins and {} bones",
            asset.name,
            file_id,
            skins.len(),
            asset.bones.len()
        );

        Ok(ModelData {
            file_id,
            vertices: M2Importer::create_vertices(&asset),
            bounding_box: M2Importer::bounding_box(&asset),
            bone_count: asset.bones.len(),
            animation: RwLock::new(AnimationManager::new(&asset)),
            name: asset.name,
            skins,
            textures,
        })
    }

    fn create_skin(
        asset: &M2Asset,
        file_id: FileId,
        skin_id: FileId,
        skin: &M2SkinProfile,
    ) -> Result<SkinData, AssetError> {
        let index_buffer = M2Importer::create_index_buffer(asset, skin)
            .map_err(|err| invalid(file_id, format!("skin {}: {:#}", skin_id, err)))?;

        let render_passes = skin
            .batches
            .iter()
            .map(|batch| Self::create_render_pass(asset, skin, batch, index_buffer.len()))
            .collect::<Result<Vec<_>, String>>()
            .map_err(|reason| invalid(file_id, format!("skin {}: {}", skin_id, reason)))?;

        Ok(SkinData {
            file_id: skin_id,
            index_buffer,
            render_passes,
        })
    }

    fn create_render_pass(
        asset: &M2Asset,
        skin: &M2SkinProfile,
        batch: &M2Batch,
        index_count: usize,
    ) -> Result<ModelRenderPass, String> {
        let section = skin
            .submeshes
            .get(batch.skin_section_index as usize)
            .ok_or_else(|| format!("batch references submesh {}", batch.skin_section_index))?;

        let start = section.first_index();
        let end = start + section.index_count as u32;
        if end as usize > index_count {
            return Err(format!("submesh {}..{} exceeds {} indices", start, end, index_count));
        }

        let material = asset
            .materials
            .get(batch.material_index as usize)
            .ok_or_else(|| format!("batch references material {}", batch.material_index))?;

        let unit_count = (batch.texture_count as usize).min(MAX_TEXTURE_UNITS);
        let combo = batch.texture_combo_index as usize;
        let textures = (combo..combo + unit_count)
            .map(|unit| {
                lookup(&asset.texture_lookup_table, unit)
                    .filter(|&texture| texture < asset.texture_file_ids.len())
                    .ok_or_else(|| format!("texture lookup {} is invalid", unit))
            })
            .collect::<Result<Vec<_>, String>>()?;

        let transform_combo = batch.texture_transform_combo_index as usize;
        let texture_transform_indices = (transform_combo..transform_combo + unit_count)
            .map(|unit| {
                lookup(&asset.texture_transforms_lookup_table, unit)
                    .filter(|&transform| transform < asset.texture_transforms.len())
            })
            .collect();

        let texture_weight_index = lookup(
            &asset.transparency_lookup_table,
            batch.texture_weight_combo_index as usize,
        )
        .filter(|&weight| weight < asset.texture_weights.len());

        let color_index = usize::try_from(batch.color_index)
            .ok()
            .filter(|&color| color < asset.colors.len());

        Ok(ModelRenderPass {
            index_range: start..end,
            blend_mode: BlendMode::from_m2(material.blending_mode),
            material_flags: material.material_flags(),
            textures,
            texture_weight_index,
            texture_transform_indices,
            color_index,
            shader_id: batch.shader_id,
            priority_plane: batch.priority_plane,
            layer: batch.material_layer,
        })
    }

    /// Advances the animation clock in milliseconds. The pose is shared by every placement of this model.
    pub fn update_animation(&self, delta_time: f64) {
        self.animation
            .write()
            .expect("Animation Write Lock")
            .update(delta_time);
    }

    pub fn animation(&self) -> RwLockReadGuard<'_, AnimationManager> {
        self.animation.read().expect("Animation Read Lock")
    }

    /// The skin used for rendering, the other ones are lower detail variants.
    pub fn active_skin(&self) -> Option<&SkinData> {
        self.skins.first()
    }
}
