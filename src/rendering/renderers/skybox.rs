use std::f32::consts::{FRAC_PI_2, TAU};

use glam::{Mat4, Vec3, Vec4};

use crate::rendering::camera::View;
use crate::rendering::common::types::SkyboxVertex;
use crate::rendering::gfx::{
    BufferHandle, BufferUsage, DrawSource, DrawSubmission, GfxError, GpuBackend, InputLayoutDescriptor,
    InputLayoutHandle, PassMaterial, VertexFormat,
};
use crate::rendering::scene::FrameStats;
use crate::util::int_as_color;

const SEGMENTS: usize = 32;
/// top, middle, horizon
const RINGS: usize = 3;
const DOME_RADIUS: f32 = 2000.0;

/// Default daylight colors, as 0xAARRGGBB
pub const DEFAULT_SKY_COLORS: [u32; RINGS] = [0xFF2C5C96, 0xFF6C9DCC, 0xFFB5D2E8];

/// A dome around the camera, colored by a vertical gradient. It is drawn first and without depth.
#[derive(Debug)]
pub struct SkyboxRenderer {
    input_layout: InputLayoutHandle,
    vertex_buffer: BufferHandle,
    index_buffer: BufferHandle,
    index_count: u32,
    colors: [Vec4; RINGS],
}

/// A unit dome: a pole on top and one ring per sky color, the last one at the horizon.
fn create_dome() -> (Vec<SkyboxVertex>, Vec<u16>) {
    let mut vertices = vec![SkyboxVertex {
        position: [0.0, 0.0, 1.0],
        color_index: 0.0,
    }];

    for ring in 1..=RINGS {
        let elevation = FRAC_PI_2 * (1.0 - ring as f32 / RINGS as f32);
        for segment in 0..SEGMENTS {
            let azimuth = TAU * segment as f32 / SEGMENTS as f32;
            vertices.push(SkyboxVertex {
                position: [
                    elevation.cos() * azimuth.cos(),
                    elevation.cos() * azimuth.sin(),
                    elevation.sin(),
                ],
                color_index: (ring - 1) as f32,
            });
        }
    }

    let ring_start = |ring: usize| (1 + (ring - 1) * SEGMENTS) as u16;
    let mut indices = Vec::new();
    for segment in 0..SEGMENTS {
        let next = (segment + 1) % SEGMENTS;
        indices.extend_from_slice(&[0, ring_start(1) + segment as u16, ring_start(1) + next as u16]);
    }

    for ring in 1..RINGS {
        let (upper, lower) = (ring_start(ring), ring_start(ring + 1));
        for segment in 0..SEGMENTS {
            let next = (segment + 1) % SEGMENTS;
            let (segment, next) = (segment as u16, next as u16);
            indices.extend_from_slice(&[upper + segment, lower + segment, lower + next]);
            indices.extend_from_slice(&[upper + segment, lower + next, upper + next]);
        }
    }

    (vertices, indices)
}

impl SkyboxRenderer {
    pub fn new(device: &mut dyn GpuBackend) -> Result<Self, GfxError> {
        let (vertices, indices) = create_dome();

        Ok(SkyboxRenderer {
            input_layout: device.create_input_layout(&InputLayoutDescriptor::packed(&[
                VertexFormat::Float32x3,
                VertexFormat::Float32,
            ]))?,
            vertex_buffer: device.create_buffer("skybox vertices", BufferUsage::Vertex, bytemuck::cast_slice(&vertices))?,
            index_buffer: device.create_buffer("skybox indices", BufferUsage::Index, bytemuck::cast_slice(&indices))?,
            index_count: indices.len() as u32,
            colors: DEFAULT_SKY_COLORS.map(int_as_color),
        })
    }

    pub fn set_colors(&mut self, colors: [u32; RINGS]) {
        self.colors = colors.map(int_as_color);
    }

    pub fn submit(&self, device: &mut dyn GpuBackend, view: &View, stats: &mut FrameStats) -> Result<(), GfxError> {
        let model_matrix =
            Mat4::from_scale_rotation_translation(Vec3::splat(DOME_RADIUS), glam::Quat::IDENTITY, view.camera_position);

        let mut uniforms = Vec::with_capacity(16 + 4 * RINGS);
        uniforms.extend_from_slice(&model_matrix.to_cols_array());
        for color in &self.colors {
            uniforms.extend_from_slice(&color.to_array());
        }

        device.submit(DrawSubmission {
            source: DrawSource::Skybox,
            material: PassMaterial::Skybox,
            input_layout: self.input_layout,
            vertex_buffer: self.vertex_buffer,
            index_buffer: self.index_buffer,
            index_range: 0..self.index_count,
            textures: vec![],
            uniforms: bytemuck::cast_slice(&uniforms).to_vec(),
            instance_count: 1,
        })?;
        stats.skybox_draws += 1;
        Ok(())
    }

    pub fn destroy(self, device: &mut dyn GpuBackend) -> Result<(), GfxError> {
        device.destroy_buffer(self.vertex_buffer)?;
        device.destroy_buffer(self.index_buffer)?;
        device.destroy_input_layout(self.input_layout)
    }
}

#[cfg(test)]
mod tests {
    use super::create_dome;

    #[test]
    fn dome_indices_stay_within_the_vertices() {
        let (vertices, indices) = create_dome();
        assert_eq!(vertices.len(), 1 + 3 * 32);
        assert_eq!(indices.len(), 3 * 32 + 2 * 6 * 32);
        assert!(indices.iter().all(|&index| (index as usize) < vertices.len()));
        // the last ring is the horizon
        assert!(vertices.last().is_some_and(|vertex| vertex.position[2].abs() < 1e-6));
    }
}
