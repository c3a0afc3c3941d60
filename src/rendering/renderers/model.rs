use std::collections::HashMap;
use std::sync::Arc;

use glam::{Mat4, Vec4};
use log::trace;

use crate::io::FileId;
use crate::rendering::asset_graph::nodes::model_node::ModelData;
use crate::rendering::asset_graph::nodes::placement::DoodadData;
use crate::rendering::gfx::{
    BufferHandle, BufferUsage, DrawSource, DrawSubmission, GfxError, GpuBackend, InputLayoutDescriptor,
    InputLayoutHandle, PassMaterial, VertexFormat, WrapMode,
};
use crate::rendering::renderers::texture_cache::TextureCache;
use crate::rendering::scene::FrameStats;
use crate::util::map_array::MapArray;

/// The amount of instances whose transforms fit into the uniforms of one draw.
pub const MAX_INSTANCES_PER_DRAW: usize = 32;
pub const MAX_BONE_TRANSFORMS: usize = 256;

#[derive(Debug)]
struct GpuModel {
    vertex_buffer: BufferHandle,
    index_buffer: BufferHandle,
}

#[derive(Debug)]
struct ModelResources {
    model: Arc<ModelData>,
    /// None for models without a skin or without geometry
    gpu: Option<GpuModel>,
}

#[derive(Debug, Copy, Clone)]
struct Instance {
    model_matrix: Mat4,
    ambient_color: Vec4,
}

/// Draws doodads. Visible placements are collected per model every frame and drawn instanced, in batches of
/// [`MAX_INSTANCES_PER_DRAW`].
#[derive(Debug)]
pub struct ModelRenderer {
    input_layout: InputLayoutHandle,
    models: HashMap<FileId, ModelResources>,
    instances: MapArray<FileId, Instance>,
}

impl ModelRenderer {
    pub fn new(device: &mut dyn GpuBackend) -> Result<Self, GfxError> {
        let input_layout = device.create_input_layout(&InputLayoutDescriptor::packed(&[
            VertexFormat::Float32x3,
            VertexFormat::Unorm8x4,
            VertexFormat::Uint8x4,
            VertexFormat::Float32x3,
            VertexFormat::Float32x2,
            VertexFormat::Float32x2,
        ]))?;

        Ok(ModelRenderer {
            input_layout,
            models: HashMap::new(),
            instances: MapArray::new(),
        })
    }

    pub fn is_prepared(&self, model_id: FileId) -> bool {
        self.models.contains_key(&model_id)
    }

    pub fn prepare(
        &mut self,
        device: &mut dyn GpuBackend,
        textures: &mut TextureCache,
        model: &Arc<ModelData>,
    ) -> Result<(), GfxError> {
        if self.is_prepared(model.file_id) {
            return Ok(());
        }

        let gpu = match model.active_skin() {
            Some(skin) if !model.vertices.is_empty() && !skin.index_buffer.is_empty() => Some(GpuModel {
                vertex_buffer: device.create_buffer(
                    &format!("model {} vertices", model.name),
                    BufferUsage::Vertex,
                    bytemuck::cast_slice(&model.vertices),
                )?,
                index_buffer: device.create_buffer(
                    &format!("model {} indices", model.name),
                    BufferUsage::Index,
                    bytemuck::cast_slice(&skin.index_buffer),
                )?,
            }),
            _ => None,
        };

        for texture in &model.textures {
            textures.resolve(device, texture)?;
        }

        trace!("Prepared model {} ({})", model.name, model.file_id);
        self.models.insert(
            model.file_id,
            ModelResources {
                model: Arc::clone(model),
                gpu,
            },
        );
        Ok(())
    }

    /// Schedules a placement for this frame, if it is visible.
    pub fn queue(&mut self, doodad: &DoodadData) {
        if !doodad.visible {
            return;
        }

        assert!(
            self.is_prepared(doodad.model_id),
            "Doodad references model {} which has never been prepared",
            doodad.model_id
        );

        self.instances.push(
            doodad.model_id,
            Instance {
                model_matrix: doodad.model_matrix,
                ambient_color: doodad.ambient_color,
            },
        );
    }

    /// Submits everything that has been queued since the last call.
    pub fn submit(
        &mut self,
        device: &mut dyn GpuBackend,
        textures: &mut TextureCache,
        stats: &mut FrameStats,
    ) -> Result<(), GfxError> {
        profiling::scope!("ModelRenderer::submit");
        for (model_id, instances) in self.instances.iter() {
            if instances.is_empty() {
                continue;
            }
            stats.visible_doodads += instances.len();

            let resources = &self.models[model_id];
            let model = &resources.model;
            let (Some(gpu), Some(skin)) = (&resources.gpu, model.active_skin()) else {
                continue;
            };

            let animation = model.animation();
            let bones = animation.bone_matrices();
            assert!(
                bones.len() <= MAX_BONE_TRANSFORMS,
                "Model {} ({}) has {} bones, at most {} fit into one draw",
                model.name,
                model.file_id,
                bones.len(),
                MAX_BONE_TRANSFORMS
            );

            for (pass_index, pass) in skin.render_passes.iter().enumerate() {
                if !pass.is_drawable(model) {
                    continue;
                }

                let mut bindings = Vec::with_capacity(pass.textures.len().max(1));
                for &texture in &pass.textures {
                    let handle = textures.resolve_or_placeholder(device, &model.textures[texture])?;
                    bindings.push(textures.binding(device, handle, WrapMode::Repeat)?);
                }
                if bindings.is_empty() {
                    let placeholder = textures.placeholder();
                    bindings.push(textures.binding(device, placeholder, WrapMode::Repeat)?);
                }

                let color = pass
                    .color_index
                    .map(|index| animation.colors()[index])
                    .unwrap_or(Vec4::ONE);
                let weight = pass
                    .texture_weight_index
                    .map(|index| animation.texture_weights()[index])
                    .unwrap_or(1.0);

                let mut pass_uniforms = Vec::with_capacity(4 + 16 * pass.texture_transform_indices.len());
                pass_uniforms.extend_from_slice(&(color * Vec4::new(1.0, 1.0, 1.0, weight)).to_array());
                for transform in &pass.texture_transform_indices {
                    let matrix = transform
                        .map(|index| animation.texture_matrices()[index])
                        .unwrap_or(Mat4::IDENTITY);
                    pass_uniforms.extend_from_slice(&matrix.to_cols_array());
                }
                for bone in bones {
                    pass_uniforms.extend_from_slice(&bone.to_cols_array());
                }

                for batch in instances.chunks(MAX_INSTANCES_PER_DRAW) {
                    let mut uniforms = pass_uniforms.clone();
                    for instance in batch {
                        uniforms.extend_from_slice(&instance.model_matrix.to_cols_array());
                        uniforms.extend_from_slice(&instance.ambient_color.to_array());
                    }

                    device.submit(DrawSubmission {
                        source: DrawSource::Model {
                            model_id: *model_id,
                            pass: pass_index,
                        },
                        material: PassMaterial::Model {
                            shader_id: pass.shader_id,
                            blend_mode: pass.blend_mode,
                            flags: pass.material_flags,
                        },
                        input_layout: self.input_layout,
                        vertex_buffer: gpu.vertex_buffer,
                        index_buffer: gpu.index_buffer,
                        index_range: pass.index_range.clone(),
                        textures: bindings.clone(),
                        uniforms: bytemuck::cast_slice(&uniforms).to_vec(),
                        instance_count: batch.len() as u32,
                    })?;
                    stats.model_draws += 1;
                }
            }
        }

        self.instances.clear_values();
        Ok(())
    }

    pub fn destroy(self, device: &mut dyn GpuBackend) -> Result<(), GfxError> {
        for resources in self.models.into_values() {
            if let Some(gpu) = resources.gpu {
                device.destroy_buffer(gpu.vertex_buffer)?;
                device.destroy_buffer(gpu.index_buffer)?;
            }
        }

        device.destroy_input_layout(self.input_layout)
    }
}
