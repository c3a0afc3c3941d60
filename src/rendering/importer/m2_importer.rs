use anyhow::{Context, Error};
use itertools::Itertools;
use sargerust_files::m2::types::{M2Asset, M2SkinProfile};

use crate::rendering::common::geometry::Aabb;
use crate::rendering::common::types::ModelVertex;

pub struct M2Importer {}

impl M2Importer {
    /// The vertex buffer is shared by all skins, they only differ in their index buffers.
    pub fn create_vertices(asset: &M2Asset) -> Vec<ModelVertex> {
        asset
            .vertices
            .iter()
            .map(|v| ModelVertex {
                position: [v.pos.x, v.pos.y, v.pos.z],
                bone_weights: v.bone_weights,
                bone_indices: v.bone_indices,
                normal: [v.normal.x, v.normal.y, v.normal.z],
                tex_coords: v.tex_coords.map(|uv| [uv.x, uv.y]),
            })
            .collect_vec()
    }

    /// the indices are local to the values in skin.vertices, so we need to translate the index buffer
    pub fn create_index_buffer(asset: &M2Asset, skin: &M2SkinProfile) -> Result<Vec<u16>, Error> {
        let indices = skin
            .global_indices()
            .with_context(|| format!("Invalid skin of {}", asset.name))?;

        if let Some(&index) = indices.iter().find(|&&idx| idx as usize >= asset.vertices.len()) {
            anyhow::bail!(
                "{}: skin references vertex {}, but there are only {}",
                asset.name,
                index,
                asset.vertices.len()
            );
        }

        Ok(indices)
    }

    pub fn bounding_box(asset: &M2Asset) -> Aabb {
        let aabb = Aabb::from(&asset.bounding_box);
        if !aabb.is_degenerate() {
            return aabb;
        }

        Aabb::from_points(
            asset
                .vertices
                .iter()
                .map(|v| glam::Vec3::new(v.pos.x, v.pos.y, v.pos.z)),
        )
    }
}
