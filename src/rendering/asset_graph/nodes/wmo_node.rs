use std::collections::HashMap;
use std::ops::Range;
use std::sync::Arc;

use glam::Vec4;
use log::{trace, warn};
use sargerust_files::common::types::CImVector;
use sargerust_files::wmo::types::{SMODoodadDef, SMOGroupFlags, WMOGroupAsset, WMORootAsset};

use crate::io::FileId;
use crate::rendering::asset_graph::cache::AssetCache;
use crate::rendering::asset_graph::error::AssetError;
use crate::rendering::asset_graph::nodes::model_node::ModelData;
use crate::rendering::asset_graph::nodes::texture_node::TextureReference;
use crate::rendering::common::geometry::{Aabb, vec3};
use crate::rendering::common::types::WmoVertex;
use crate::rendering::gfx::BlendMode;
use crate::rendering::importer::wmo_importer::WMOGroupImporter;

const NO_MATERIAL: u8 = 0xFF;

pub fn color_to_vec4(color: &CImVector) -> Vec4 {
    Vec4::new(
        color.r as f32 / 255.0,
        color.g as f32 / 255.0,
        color.b as f32 / 255.0,
        color.a as f32 / 255.0,
    )
}

#[derive(Debug)]
pub struct WmoData {
    pub file_id: FileId,
    pub flags: u16,
    /// Applied to interior groups and the doodads within
    pub ambient_color: Vec4,
    pub bounding_box: Aabb,
    pub materials: Vec<WmoMaterial>,
    pub groups: Vec<Arc<WmoGroupData>>,
    pub doodad_defs: Vec<SMODoodadDef>,
    /// The doodad def indices to furnish, per doodad set
    doodad_set_refs: Vec<Vec<usize>>,
    /// Only the doodad models that could be loaded
    pub models: HashMap<FileId, Arc<ModelData>>,
}

#[derive(Debug)]
pub struct WmoMaterial {
    pub blend_mode: BlendMode,
    pub flags: u32,
    pub shader: u32,
    pub diffuse_color: Vec4,
    /// A missing texture is replaced by a white placeholder at draw time
    pub textures: [TextureReference; 3],
}

#[derive(Debug)]
pub struct WmoGroupData {
    pub file_id: FileId,
    pub flags: SMOGroupFlags,
    pub vertices: Vec<WmoVertex>,
    pub indices: Vec<u16>,
    pub batches: Vec<WmoBatch>,
    pub bounding_box: Aabb,
    /// Indices into [`WmoData::doodad_defs`]
    pub doodad_refs: Vec<u16>,
}

#[derive(Debug, Clone)]
pub struct WmoBatch {
    pub index_range: Range<u32>,
    pub material_id: Option<usize>,
}

impl WmoGroupData {
    pub async fn load(cache: &AssetCache, file_id: FileId) -> Result<WmoGroupData, AssetError> {
        let group = cache
            .fetch_decoded(file_id, |decoder, data| decoder.decode_wmo_group(data))
            .await?;

        Self::from_asset(file_id, &group).map_err(|reason| AssetError::Invalid {
            kind: "WMO Group",
            file_id,
            reason,
        })
    }

    fn from_asset(file_id: FileId, group: &WMOGroupAsset) -> Result<WmoGroupData, String> {
        let batches = group
            .batches
            .iter()
            .map(|batch| {
                let index_range = WMOGroupImporter::batch_range(group, batch).map_err(|err| format!("{err:#}"))?;
                let material_id = (batch.material_id != NO_MATERIAL).then_some(batch.material_id as usize);
                Ok(WmoBatch {
                    index_range,
                    material_id,
                })
            })
            .collect::<Result<Vec<_>, String>>()?;

        if let Some(&index) = group
            .indices
            .iter()
            .find(|&&index| index as usize >= group.positions.len())
        {
            return Err(format!("index {} exceeds {} vertices", index, group.positions.len()));
        }

        let mut bounding_box = Aabb::from(&group.bounding_box);
        if bounding_box.is_degenerate() {
            bounding_box = Aabb::from_points(group.positions.iter().map(vec3));
        }

        Ok(WmoGroupData {
            file_id,
            flags: group.group_flags(),
            vertices: WMOGroupImporter::create_vertices(group),
            indices: group.indices.clone(),
            batches,
            bounding_box,
            doodad_refs: group.doodadRefs.clone(),
        })
    }

    pub fn is_interior(&self) -> bool {
        self.flags.contains(SMOGroupFlags::INTERIOR) && !self.flags.contains(SMOGroupFlags::EXTERIOR)
    }

    pub fn is_exterior_lit(&self) -> bool {
        self.flags.contains(SMOGroupFlags::EXTERIOR_LIT)
    }
}

impl WmoData {
    /// Loads the root, all groups, the material textures and the doodad models of every doodad set.
    /// Group failures fail the whole WMO, texture and doodad failures only leave a gap.
    pub async fn load(cache: &AssetCache, file_id: FileId) -> Result<WmoData, AssetError> {
        let root = cache
            .fetch_decoded(file_id, |decoder, data| decoder.decode_wmo_root(data))
            .await?;

        let mut groups = Vec::with_capacity(root.groupFileIds.len());
        for &group_id in &root.groupFileIds {
            let group = cache
                .get_wmo_group(group_id)
                .await
                .map_err(|err| AssetError::dependency("WMO", file_id, err))?;
            groups.push(group);
        }

        let mut materials = Vec::with_capacity(root.materials.len());
        for material in &root.materials {
            let textures = [
                TextureReference::resolve(cache, material.texture_1).await,
                TextureReference::resolve(cache, material.texture_2).await,
                TextureReference::resolve(cache, material.texture_3).await,
            ];

            materials.push(WmoMaterial {
                blend_mode: BlendMode::from_wmo(material.blendMode),
                flags: material.flags,
                shader: material.shader,
                diffuse_color: color_to_vec4(&material.diffColor),
                textures,
            });
        }

        let doodad_set_refs = Self::collect_doodad_set_refs(&root);

        let mut models = HashMap::new();
        let mut failed = Vec::new();
        for def in &root.doodadDefs {
            let model_id = def.modelFileId;
            if models.contains_key(&model_id) || failed.contains(&model_id) {
                continue;
            }

            match cache.get_model(model_id).await {
                Ok(model) => {
                    models.insert(model_id, model);
                }
                Err(err) => {
                    warn!("WMO {}: skipping doodad model {}: {}", file_id, model_id, err);
                    failed.push(model_id);
                }
            }
        }

        let mut bounding_box = Aabb::from(&root.bounding_box);
        if bounding_box.is_degenerate() {
            bounding_box = groups
                .iter()
                .fold(Aabb::EMPTY, |aabb, group| aabb.union(&group.bounding_box));
        }

        trace!(
            "Loaded WMO {} with {} groups, {} materials and {} doodad models",
            file_id,
            groups.len(),
            materials.len(),
            models.len()
        );

        Ok(WmoData {
            file_id,
            flags: root.flags,
            ambient_color: color_to_vec4(&root.ambColor),
            bounding_box,
            materials,
            groups,
            doodad_defs: root.doodadDefs,
            doodad_set_refs,
            models,
        })
    }

    fn collect_doodad_set_refs(root: &WMORootAsset) -> Vec<Vec<usize>> {
        (0..root.doodadSets.len().max(1))
            .map(|set| root.doodad_set_refs(set as u16))
            .collect()
    }

    /// The doodad defs furnished by a placement that selected `doodad_set`. Unknown sets only yield the default set.
    pub fn doodad_set_refs(&self, doodad_set: u16) -> &[usize] {
        self.doodad_set_refs
            .get(doodad_set as usize)
            .or_else(|| self.doodad_set_refs.first())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}
