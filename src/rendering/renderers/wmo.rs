use std::collections::HashMap;
use std::sync::Arc;

use glam::Vec4;
use log::trace;

use crate::io::FileId;
use crate::rendering::asset_graph::nodes::placement::WmoDefinition;
use crate::rendering::asset_graph::nodes::wmo_node::WmoData;
use crate::rendering::gfx::{
    BlendMode, BufferHandle, BufferUsage, DrawSource, DrawSubmission, GfxError, GpuBackend, InputLayoutDescriptor,
    InputLayoutHandle, PassMaterial, VertexFormat, WrapMode,
};
use crate::rendering::renderers::texture_cache::TextureCache;
use crate::rendering::scene::FrameStats;

#[derive(Debug)]
struct GroupResources {
    vertex_buffer: BufferHandle,
    index_buffer: BufferHandle,
}

#[derive(Debug)]
struct WmoResources {
    wmo: Arc<WmoData>,
    /// Per group, None for groups without geometry
    groups: Vec<Option<GroupResources>>,
}

/// Draws the groups of placed WMOs. The geometry is uploaded once per WMO, every placement only differs in its
/// model matrix.
#[derive(Debug)]
pub struct WmoRenderer {
    input_layout: InputLayoutHandle,
    wmos: HashMap<FileId, WmoResources>,
}

impl WmoRenderer {
    pub fn new(device: &mut dyn GpuBackend) -> Result<Self, GfxError> {
        let input_layout = device.create_input_layout(&InputLayoutDescriptor::packed(&[
            VertexFormat::Float32x3,
            VertexFormat::Float32x3,
            VertexFormat::Float32x2,
            VertexFormat::Unorm8x4,
        ]))?;

        Ok(WmoRenderer {
            input_layout,
            wmos: HashMap::new(),
        })
    }

    pub fn is_prepared(&self, wmo_id: FileId) -> bool {
        self.wmos.contains_key(&wmo_id)
    }

    pub fn prepare(
        &mut self,
        device: &mut dyn GpuBackend,
        textures: &mut TextureCache,
        wmo: &Arc<WmoData>,
    ) -> Result<(), GfxError> {
        if self.is_prepared(wmo.file_id) {
            return Ok(());
        }

        let mut groups = Vec::with_capacity(wmo.groups.len());
        for group in &wmo.groups {
            if group.vertices.is_empty() || group.indices.is_empty() {
                groups.push(None);
                continue;
            }

            groups.push(Some(GroupResources {
                vertex_buffer: device.create_buffer(
                    &format!("wmo group {} vertices", group.file_id),
                    BufferUsage::Vertex,
                    bytemuck::cast_slice(&group.vertices),
                )?,
                index_buffer: device.create_buffer(
                    &format!("wmo group {} indices", group.file_id),
                    BufferUsage::Index,
                    bytemuck::cast_slice(&group.indices),
                )?,
            }));
        }

        for texture in wmo.materials.iter().flat_map(|material| &material.textures) {
            textures.resolve(device, texture)?;
        }

        trace!("Prepared WMO {} with {} groups", wmo.file_id, groups.len());
        self.wmos.insert(
            wmo.file_id,
            WmoResources {
                wmo: Arc::clone(wmo),
                groups,
            },
        );
        Ok(())
    }

    pub fn submit(
        &self,
        device: &mut dyn GpuBackend,
        textures: &mut TextureCache,
        def: &WmoDefinition,
        stats: &mut FrameStats,
    ) -> Result<(), GfxError> {
        profiling::scope!("WmoRenderer::submit");
        if !def.visible {
            return Ok(());
        }

        let resources = self.wmos.get(&def.wmo_id).unwrap_or_else(|| {
            panic!(
                "WMO definition {} references WMO {} which has never been prepared",
                def.unique_id, def.wmo_id
            )
        });
        let wmo = &resources.wmo;

        for placed in def.groups.iter().filter(|group| group.visible) {
            stats.visible_wmo_groups += 1;

            let Some(group_resources) = &resources.groups[placed.group_index] else {
                continue;
            };
            let group = &wmo.groups[placed.group_index];

            let mut uniforms = Vec::with_capacity(20);
            uniforms.extend_from_slice(&def.model_matrix.to_cols_array());
            uniforms.extend_from_slice(&placed.ambient_color.to_array());

            for (batch_index, batch) in group.batches.iter().enumerate() {
                let material = batch.material_id.and_then(|id| wmo.materials.get(id));

                let mut bindings = Vec::with_capacity(3);
                let (material_kind, diffuse_color) = match material {
                    Some(material) => {
                        for (slot, texture) in material.textures.iter().enumerate() {
                            // the first slot is always bound, the others only when in use
                            if slot > 0 && texture.file_id == 0 {
                                continue;
                            }
                            let handle = textures.resolve_or_placeholder(device, texture)?;
                            bindings.push(textures.binding(device, handle, WrapMode::Repeat)?);
                        }

                        (
                            PassMaterial::Wmo {
                                shader: material.shader,
                                blend_mode: material.blend_mode,
                                flags: material.flags,
                            },
                            material.diffuse_color,
                        )
                    }
                    None => {
                        let placeholder = textures.placeholder();
                        bindings.push(textures.binding(device, placeholder, WrapMode::Repeat)?);
                        (
                            PassMaterial::Wmo {
                                shader: 0,
                                blend_mode: BlendMode::Opaque,
                                flags: 0,
                            },
                            Vec4::ONE,
                        )
                    }
                };

                let mut batch_uniforms = uniforms.clone();
                batch_uniforms.extend_from_slice(&diffuse_color.to_array());

                device.submit(DrawSubmission {
                    source: DrawSource::Wmo {
                        wmo_id: wmo.file_id,
                        group: placed.group_index,
                        batch: batch_index,
                    },
                    material: material_kind,
                    input_layout: self.input_layout,
                    vertex_buffer: group_resources.vertex_buffer,
                    index_buffer: group_resources.index_buffer,
                    index_range: batch.index_range.clone(),
                    textures: bindings,
                    uniforms: bytemuck::cast_slice(&batch_uniforms).to_vec(),
                    instance_count: 1,
                })?;
                stats.wmo_draws += 1;
            }
        }

        Ok(())
    }

    pub fn destroy(self, device: &mut dyn GpuBackend) -> Result<(), GfxError> {
        for resources in self.wmos.into_values() {
            for group in resources.groups.into_iter().flatten() {
                device.destroy_buffer(group.vertex_buffer)?;
                device.destroy_buffer(group.index_buffer)?;
            }
        }

        device.destroy_input_layout(self.input_layout)
    }
}
