use anyhow::{Error, bail};
use glam::{Vec2, Vec3};
use sargerust_files::adt::types::{MCNKChunk, MCNREntry};
use sargerust_files::common::types::CImVector;

use crate::rendering::common::coordinate_systems::GRID_SIZE;
use crate::rendering::common::types::{Mesh, VertexBuffers};

/// 9x9 outer and 8x8 inner vertices
pub const CHUNK_VERTEX_COUNT: usize = 145;

/// MCCV is centered around 0x7F, which is a neutral color.
const NEUTRAL_VERTEX_COLOR: u32 = 0x7F7F7F7F;

pub struct ADTImporter {}

fn calculate_normal(entry: &MCNREntry) -> Vec3 {
    // TODO: Comment from Nieriel suggests a special re-calculation of z from x and y:
    //  float Z = sqrt(1 - (X / 127)² - (Y / 127)²), Z >= 0)
    let normal = Vec3::new(
        entry.normal_x as f32 / 127.0,
        entry.normal_y as f32 / 127.0,
        entry.normal_z as f32 / 127.0,
    );

    normal.try_normalize().unwrap_or(Vec3::Z)
}

/// The low resolution hole mask covers the chunk in 4x4 blocks of 2x2 cells each.
fn is_hole(holes_low_res: u16, row: u8, column: u8) -> bool {
    let bit = (row / 2) * 4 + column / 2;
    holes_low_res & (1 << bit) != 0
}

impl ADTImporter {
    /// The mesh of one MCNK in world space. The vertex order is the interleaved MCVT order: 9 outer vertices of a
    /// row, followed by the 8 inner vertices between this row and the next one.
    pub fn create_mesh(mcnk: &MCNKChunk) -> Result<Mesh, Error> {
        if mcnk.heights.len() != CHUNK_VERTEX_COUNT {
            bail!(
                "MCNK {}_{} has {} heights instead of {}",
                mcnk.indexX,
                mcnk.indexY,
                mcnk.heights.len(),
                CHUNK_VERTEX_COUNT
            );
        }

        let mut position_buffer = Vec::with_capacity(CHUNK_VERTEX_COUNT);
        let mut normals_buffer = Vec::with_capacity(CHUNK_VERTEX_COUNT);
        let mut texcoord_buffer_0 = Vec::with_capacity(CHUNK_VERTEX_COUNT);
        let mut vertex_color_0 = Vec::with_capacity(CHUNK_VERTEX_COUNT);

        let origin = Vec3::new(mcnk.position.x, mcnk.position.y, mcnk.position.z);
        let has_normals = mcnk.normals.len() == CHUNK_VERTEX_COUNT;
        let colors = mcnk
            .vertexColors
            .as_ref()
            .filter(|colors| colors.len() == CHUNK_VERTEX_COUNT);

        let mut push_vertex = |index: usize, row: f32, column: f32| {
            // Here we're in ADT Terrain space, that is +x -> north, +y -> west. Thus rows grow in -x, columns go to -y.
            position_buffer.push(origin + Vec3::new(-GRID_SIZE * row, -GRID_SIZE * column, mcnk.heights[index]));
            normals_buffer.push(if has_normals {
                calculate_normal(&mcnk.normals[index])
            } else {
                Vec3::Z
            });
            texcoord_buffer_0.push(Vec2::new(column / 8.0, row / 8.0));

            let color = colors
                .map(|colors| colors[index])
                .unwrap_or(CImVector::from(NEUTRAL_VERTEX_COLOR));
            vertex_color_0.push([color.r, color.g, color.b, color.a]);
        };

        for row in 0..9u8 {
            for column in 0..9u8 {
                let low = MCNKChunk::get_index_low(row, column) as usize;
                push_vertex(low, row as f32, column as f32);
            }

            if row == 8 {
                continue;
            }

            for column in 0..8u8 {
                let high = MCNKChunk::get_index_high(row, column) as usize;
                push_vertex(high, row as f32 + 0.5, column as f32 + 0.5);
            }
        }

        let mut index_buffer = Vec::<u16>::with_capacity(8 * 8 * 4 * 3);
        for row in 0..8u8 {
            for column in 0..8u8 {
                if is_hole(mcnk.holes_low_res, row, column) {
                    continue;
                }

                let center = MCNKChunk::get_index_high(row, column) as u16;
                let top_left = MCNKChunk::get_index_low(row, column) as u16;
                let top_right = MCNKChunk::get_index_low(row, column + 1) as u16;
                let bottom_left = MCNKChunk::get_index_low(row + 1, column) as u16;
                let bottom_right = MCNKChunk::get_index_low(row + 1, column + 1) as u16;

                // W, N, E, S, counter clockwise when looking down on the terrain
                index_buffer.extend_from_slice(&[top_left, bottom_left, center]);
                index_buffer.extend_from_slice(&[top_left, center, top_right]);
                index_buffer.extend_from_slice(&[top_right, center, bottom_right]);
                index_buffer.extend_from_slice(&[bottom_left, bottom_right, center]);
            }
        }

        Ok(Mesh {
            vertex_buffers: VertexBuffers {
                position_buffer,
                normals_buffer,
                texcoord_buffer_0,
                vertex_color_0,
            },
            index_buffer,
        })
    }
}
