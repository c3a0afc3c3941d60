use std::collections::HashMap;

use log::trace;

use crate::rendering::asset_graph::nodes::adt_node::{AdtData, MAX_TERRAIN_LAYERS};
use crate::rendering::common::coordinate_systems::TileCoord;
use crate::rendering::gfx::{
    BufferHandle, BufferUsage, DrawSource, DrawSubmission, GfxError, GpuBackend, InputLayoutDescriptor,
    InputLayoutHandle, PassMaterial, TextureHandle, VertexFormat, WrapMode,
};
use crate::rendering::renderers::texture_cache::TextureCache;
use crate::rendering::scene::FrameStats;

#[derive(Debug)]
struct TileResources {
    vertex_buffer: BufferHandle,
    index_buffer: BufferHandle,
    /// Per chunk, None when the chunk has no blended layers
    alpha_masks: Vec<Option<TextureHandle>>,
}

/// Draws the terrain of the resident tiles, one draw per visible chunk.
#[derive(Debug)]
pub struct TerrainRenderer {
    input_layout: InputLayoutHandle,
    /// None for tiles without terrain
    tiles: HashMap<TileCoord, Option<TileResources>>,
}

impl TerrainRenderer {
    pub fn new(device: &mut dyn GpuBackend) -> Result<Self, GfxError> {
        let input_layout = device.create_input_layout(&InputLayoutDescriptor::packed(&[
            VertexFormat::Float32x3,
            VertexFormat::Float32x3,
            VertexFormat::Unorm8x4,
            VertexFormat::Float32x2,
        ]))?;

        Ok(TerrainRenderer {
            input_layout,
            tiles: HashMap::new(),
        })
    }

    pub fn is_prepared(&self, tile: TileCoord) -> bool {
        self.tiles.contains_key(&tile)
    }

    /// Uploads the terrain of a tile that just became resident.
    pub fn prepare(
        &mut self,
        device: &mut dyn GpuBackend,
        textures: &mut TextureCache,
        adt: &AdtData,
    ) -> Result<(), GfxError> {
        if self.is_prepared(adt.tile) {
            return Ok(());
        }

        let terrain = &adt.terrain;
        if terrain.vertices.is_empty() || terrain.indices.is_empty() {
            self.tiles.insert(adt.tile, None);
            return Ok(());
        }

        let vertex_buffer = device.create_buffer(
            &format!("terrain {} vertices", adt.tile),
            BufferUsage::Vertex,
            bytemuck::cast_slice(&terrain.vertices),
        )?;
        let index_buffer = device.create_buffer(
            &format!("terrain {} indices", adt.tile),
            BufferUsage::Index,
            bytemuck::cast_slice(&terrain.indices),
        )?;

        let mut alpha_masks = Vec::with_capacity(terrain.chunks.len());
        for chunk in &terrain.chunks {
            let mask = chunk
                .alpha_mask
                .as_ref()
                .map(|mask| {
                    textures.create_alpha_mask(
                        device,
                        format!("alpha {} {}_{}", adt.tile, chunk.index_x, chunk.index_y),
                        mask,
                    )
                })
                .transpose()?;
            alpha_masks.push(mask);
        }

        // upload the layer textures up front, so the first frame does not stall on them
        for layer in terrain.chunks.iter().flat_map(|chunk| &chunk.layers) {
            textures.resolve(device, &layer.texture)?;
        }

        trace!("Prepared the terrain of tile {}", adt.tile);
        self.tiles.insert(
            adt.tile,
            Some(TileResources {
                vertex_buffer,
                index_buffer,
                alpha_masks,
            }),
        );
        Ok(())
    }

    pub fn submit(
        &self,
        device: &mut dyn GpuBackend,
        textures: &mut TextureCache,
        adt: &AdtData,
        stats: &mut FrameStats,
    ) -> Result<(), GfxError> {
        profiling::scope!("TerrainRenderer::submit");
        if !adt.visible {
            return Ok(());
        }

        let resources = self
            .tiles
            .get(&adt.tile)
            .unwrap_or_else(|| panic!("Tile {} is resident, but its terrain has never been prepared", adt.tile));
        let Some(resources) = resources else {
            return Ok(());
        };

        for (chunk_index, chunk) in adt.terrain.chunks.iter().enumerate() {
            if !chunk.visible {
                continue;
            }
            stats.visible_chunks += 1;

            let mut bindings = Vec::with_capacity(MAX_TERRAIN_LAYERS + 1);
            let mut layer_flags = [0u32; MAX_TERRAIN_LAYERS];
            for (layer, flags) in chunk.layers.iter().zip(layer_flags.iter_mut()) {
                let texture = textures.resolve_or_placeholder(device, &layer.texture)?;
                bindings.push(textures.binding(device, texture, WrapMode::Repeat)?);
                *flags = layer.flags;
            }

            if bindings.is_empty() {
                let placeholder = textures.placeholder();
                bindings.push(textures.binding(device, placeholder, WrapMode::Repeat)?);
            }

            let alpha_mask = resources.alpha_masks[chunk_index].unwrap_or(textures.default_alpha_mask());
            bindings.push(textures.binding(device, alpha_mask, WrapMode::Clamp)?);

            device.submit(DrawSubmission {
                source: DrawSource::Terrain {
                    tile: adt.tile,
                    chunk: chunk_index,
                },
                material: PassMaterial::Terrain {
                    layer_count: chunk.layers.len().min(MAX_TERRAIN_LAYERS) as u32,
                },
                input_layout: self.input_layout,
                vertex_buffer: resources.vertex_buffer,
                index_buffer: resources.index_buffer,
                index_range: chunk.index_range.clone(),
                textures: bindings,
                uniforms: bytemuck::cast_slice(&layer_flags).to_vec(),
                instance_count: 1,
            })?;
            stats.terrain_draws += 1;
        }

        Ok(())
    }

    pub fn destroy(self, device: &mut dyn GpuBackend) -> Result<(), GfxError> {
        for resources in self.tiles.into_values().flatten() {
            device.destroy_buffer(resources.vertex_buffer)?;
            device.destroy_buffer(resources.index_buffer)?;
            for mask in resources.alpha_masks.into_iter().flatten() {
                device.destroy_texture(mask)?;
            }
        }

        device.destroy_input_layout(self.input_layout)
    }
}
