use std::collections::HashMap;

use glam::{Mat3, Mat4, Quat, Vec3, Vec4};
use log::trace;
use sargerust_files::adt::types::SMDoodadDef;
use sargerust_files::wdt::types::SMMapObjDef;

use crate::io::FileId;
use crate::rendering::asset_graph::nodes::model_node::ModelData;
use crate::rendering::asset_graph::nodes::wmo_node::WmoData;
use crate::rendering::common::coordinate_systems::{placement_to_world, placement_transform};
use crate::rendering::common::geometry::{Aabb, vec3};

/// MDDF scale, 1024 is 1.0
const DOODAD_SCALE_ONE: f32 = 1024.0;

fn normal_matrix(model_matrix: &Mat4) -> Mat3 {
    Mat3::from_mat4(*model_matrix).inverse().transpose()
}

/// One placement of a model. Many doodads share the same [`ModelData`].
#[derive(Debug, Clone)]
pub struct DoodadData {
    pub model_id: FileId,
    pub model_matrix: Mat4,
    pub normal_matrix: Mat3,
    pub world_aabb: Aabb,
    pub visible: bool,
    pub ambient_color: Vec4,
    pub apply_interior_lighting: bool,
    pub apply_exterior_lighting: bool,
    /// Large doodads are additionally tested against the frustum on their own
    pub cull_individually: bool,
}

impl DoodadData {
    pub fn new(model: &ModelData, model_matrix: Mat4, large_doodad_size: f32) -> Self {
        let world_aabb = model.bounding_box.transform(&model_matrix);

        DoodadData {
            model_id: model.file_id,
            model_matrix,
            normal_matrix: normal_matrix(&model_matrix),
            world_aabb,
            visible: true,
            ambient_color: Vec4::ZERO,
            apply_interior_lighting: false,
            apply_exterior_lighting: true,
            cull_individually: world_aabb.diagonal() > large_doodad_size,
        }
    }

    /// A doodad placed directly on the terrain (MDDF)
    pub fn from_adt(model: &ModelData, def: &SMDoodadDef, large_doodad_size: f32) -> Self {
        let scale = def.scale as f32 / DOODAD_SCALE_ONE;
        let model_matrix = placement_transform(vec3(&def.position), vec3(&def.rotation), scale);
        Self::new(model, model_matrix, large_doodad_size)
    }
}

/// One group of a placed WMO, with its bounds in world space.
#[derive(Debug, Clone)]
pub struct PlacedWmoGroup {
    pub group_index: usize,
    pub world_aabb: Aabb,
    pub interior: bool,
    pub exterior_lit: bool,
    pub ambient_color: Vec4,
    pub visible: bool,
    /// Indices into [`WmoDefinition::doodads`]
    pub doodad_indices: Vec<usize>,
}

/// One placement of a [`WmoData`]. It only references the WMO by id, the data itself is owned by the cache.
#[derive(Debug, Clone)]
pub struct WmoDefinition {
    pub wmo_id: FileId,
    pub unique_id: u32,
    pub doodad_set: u16,
    pub model_matrix: Mat4,
    pub normal_matrix: Mat3,
    pub world_aabb: Aabb,
    pub groups: Vec<PlacedWmoGroup>,
    pub doodads: Vec<DoodadData>,
    /// Doodads that no group references, they follow the visibility of the whole definition
    pub orphan_doodads: Vec<usize>,
    pub visible: bool,
}

impl WmoDefinition {
    /// A MODF entry. ADT placements carry a scale (1024 is 1.0), WDT placements only padding.
    pub fn from_map_obj_def(wmo: &WmoData, def: &SMMapObjDef, scaled: bool, large_doodad_size: f32) -> Self {
        let scale = if scaled && def.scale != 0 {
            def.scale as f32 / DOODAD_SCALE_ONE
        } else {
            1.0
        };

        let model_matrix = placement_transform(vec3(&def.pos), vec3(&def.rot), scale);
        let mut definition = Self::new(wmo, model_matrix, def.doodadSet, large_doodad_size);
        definition.unique_id = def.uniqueId;

        if definition.world_aabb.is_degenerate() {
            definition.world_aabb = Aabb::from_points([
                placement_to_world(vec3(&def.extents.min)),
                placement_to_world(vec3(&def.extents.max)),
            ]);
        }

        definition
    }

    pub fn new(wmo: &WmoData, model_matrix: Mat4, doodad_set: u16, large_doodad_size: f32) -> Self {
        let mut groups = wmo
            .groups
            .iter()
            .enumerate()
            .map(|(group_index, group)| {
                let interior = group.is_interior();
                PlacedWmoGroup {
                    group_index,
                    world_aabb: group.bounding_box.transform(&model_matrix),
                    interior,
                    exterior_lit: group.is_exterior_lit(),
                    ambient_color: if interior { wmo.ambient_color } else { Vec4::ZERO },
                    visible: true,
                    doodad_indices: vec![],
                }
            })
            .collect::<Vec<_>>();

        let mut doodads = Vec::new();
        // doodad def index -> index into doodads
        let mut materialized = HashMap::new();
        for &def_index in wmo.doodad_set_refs(doodad_set) {
            let def = &wmo.doodad_defs[def_index];
            let Some(model) = wmo.models.get(&def.modelFileId) else {
                // the model failed to load, which has been logged already
                continue;
            };

            let local = Mat4::from_scale_rotation_translation(
                Vec3::splat(def.scale),
                Quat::from_xyzw(
                    def.orientation.x,
                    def.orientation.y,
                    def.orientation.z,
                    def.orientation.w,
                )
                .normalize(),
                vec3(&def.position),
            );

            materialized.insert(def_index, doodads.len());
            doodads.push(DoodadData::new(model, model_matrix * local, large_doodad_size));
        }

        let mut referenced = vec![false; doodads.len()];
        for (group, placed) in wmo.groups.iter().zip(groups.iter_mut()) {
            for &def_index in &group.doodad_refs {
                let Some(&doodad_index) = materialized.get(&(def_index as usize)) else {
                    continue;
                };

                if !referenced[doodad_index] {
                    let doodad = &mut doodads[doodad_index];
                    doodad.ambient_color = placed.ambient_color;
                    doodad.apply_interior_lighting = placed.interior;
                    doodad.apply_exterior_lighting = !placed.interior || placed.exterior_lit;
                    referenced[doodad_index] = true;
                }

                placed.doodad_indices.push(doodad_index);
            }
        }

        let orphan_doodads = referenced
            .iter()
            .enumerate()
            .filter_map(|(index, &referenced)| (!referenced).then_some(index))
            .collect::<Vec<_>>();

        let world_aabb = wmo.bounding_box.transform(&model_matrix);
        trace!(
            "Placed WMO {} with {} doodads (set {})",
            wmo.file_id,
            doodads.len(),
            doodad_set
        );

        WmoDefinition {
            wmo_id: wmo.file_id,
            unique_id: 0,
            doodad_set,
            model_matrix,
            normal_matrix: normal_matrix(&model_matrix),
            world_aabb,
            groups,
            doodads,
            orphan_doodads,
            visible: true,
        }
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
        for group in &mut self.groups {
            group.visible = visible;
        }
        for doodad in &mut self.doodads {
            doodad.visible = visible;
        }
    }
}
