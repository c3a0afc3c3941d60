use std::ops::Range;

use log::warn;

use crate::rendering::common::types::{Mesh, VertexBuffers};

pub enum MeshMerger {}

impl MeshMerger {
    /// Merge multiple meshes by combining the vertex buffers and counting up the index buffers.
    /// Returns the merged mesh and, per input mesh, its range inside the merged index buffer. The caller needs to
    /// ensure the combined vertex count fits into u16 indices, otherwise None is returned.
    pub fn merge_meshes_vertices_only(input_meshes: &[Mesh]) -> Option<(Mesh, Vec<Range<u32>>)> {
        let vertex_count: usize = input_meshes.iter().map(|m| m.vertex_buffers.len()).sum();
        if vertex_count > u16::MAX as usize + 1 {
            warn!("Cannot merge {} vertices into a u16 indexed mesh", vertex_count);
            return None;
        }

        let mut merged_mesh = Mesh {
            vertex_buffers: VertexBuffers::default(),
            index_buffer: Vec::with_capacity(input_meshes.iter().map(|m| m.index_buffer.len()).sum()),
        };
        let mut ranges = Vec::with_capacity(input_meshes.len());

        if input_meshes.is_empty() {
            warn!("Merging 0 meshes");
            return Some((merged_mesh, ranges));
        }

        for mesh in input_meshes {
            let base_vertex = merged_mesh.vertex_buffers.len() as u16;
            let index_start = merged_mesh.index_buffer.len() as u32;

            merged_mesh
                .vertex_buffers
                .position_buffer
                .extend_from_slice(&mesh.vertex_buffers.position_buffer);
            merged_mesh
                .vertex_buffers
                .normals_buffer
                .extend_from_slice(&mesh.vertex_buffers.normals_buffer);
            merged_mesh
                .vertex_buffers
                .texcoord_buffer_0
                .extend_from_slice(&mesh.vertex_buffers.texcoord_buffer_0);
            merged_mesh
                .vertex_buffers
                .vertex_color_0
                .extend_from_slice(&mesh.vertex_buffers.vertex_color_0);

            for &index in &mesh.index_buffer {
                merged_mesh.index_buffer.push(index + base_vertex);
            }

            ranges.push(index_start..merged_mesh.index_buffer.len() as u32);
        }

        Some((merged_mesh, ranges))
    }
}
