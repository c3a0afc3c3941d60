//! The seam towards the graphics API. The renderers only ever talk to a [`GpuBackend`]: they create static buffers
//! and textures from bytes, describe vertex layouts and submit draws with their bindings and index range.
pub mod headless;

use std::ops::Range;

use sargerust_files::blp::types::BlpPixelFormat;
use sargerust_files::m2::types::M2MaterialFlags;
use thiserror::Error;

use crate::io::FileId;
use crate::rendering::common::coordinate_systems::TileCoord;

macro_rules! handle {
    ($name: ident) => {
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);
    };
}

handle!(BufferHandle);
handle!(TextureHandle);
handle!(SamplerHandle);
handle!(InputLayoutHandle);

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GfxError {
    #[error("Unknown {kind} handle {id}, it has never been created or is destroyed already")]
    UnknownHandle { kind: &'static str, id: u32 },
    #[error("Invalid {kind}: {reason}")]
    InvalidDescriptor { kind: &'static str, reason: String },
    #[error("The frame submits unknown resources: {0}")]
    InvalidSubmission(String),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BufferUsage {
    Vertex,
    Index,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    Bc1,
    Bc2,
    Bc3,
    Bgra8,
    Rgba8,
}

impl From<BlpPixelFormat> for TextureFormat {
    fn from(value: BlpPixelFormat) -> Self {
        match value {
            BlpPixelFormat::Dxt1 => TextureFormat::Bc1,
            BlpPixelFormat::Dxt3 => TextureFormat::Bc2,
            BlpPixelFormat::Dxt5 => TextureFormat::Bc3,
            BlpPixelFormat::Bgra8 => TextureFormat::Bgra8,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TextureDescriptor {
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum WrapMode {
    #[default]
    Repeat,
    Clamp,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct SamplerDescriptor {
    pub wrap_u: WrapMode,
    pub wrap_v: WrapMode,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum VertexFormat {
    Float32,
    Float32x2,
    Float32x3,
    /// normalized
    Unorm8x4,
    Uint8x4,
}

impl VertexFormat {
    pub fn size(&self) -> u32 {
        match self {
            VertexFormat::Float32 => 4,
            VertexFormat::Float32x2 => 8,
            VertexFormat::Float32x3 => 12,
            VertexFormat::Unorm8x4 | VertexFormat::Uint8x4 => 4,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct VertexAttribute {
    pub location: u32,
    pub format: VertexFormat,
    pub offset: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputLayoutDescriptor {
    pub stride: u32,
    pub attributes: Vec<VertexAttribute>,
}

impl InputLayoutDescriptor {
    /// Tightly packed attributes with ascending locations.
    pub fn packed(formats: &[VertexFormat]) -> Self {
        let mut offset = 0;
        let attributes = formats
            .iter()
            .enumerate()
            .map(|(location, &format)| {
                let attribute = VertexAttribute {
                    location: location as u32,
                    format,
                    offset,
                };
                offset += format.size();
                attribute
            })
            .collect();

        InputLayoutDescriptor {
            stride: offset,
            attributes,
        }
    }
}

/// The blending modes shared by M2 materials and WMO materials.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum BlendMode {
    #[default]
    Opaque,
    AlphaKey,
    Alpha,
    NoAlphaAdd,
    Add,
    Mod,
    Mod2x,
    BlendAdd,
}

impl BlendMode {
    fn from_index(value: u32) -> Self {
        match value {
            1 => BlendMode::AlphaKey,
            2 => BlendMode::Alpha,
            3 => BlendMode::NoAlphaAdd,
            4 => BlendMode::Add,
            5 => BlendMode::Mod,
            6 => BlendMode::Mod2x,
            7 => BlendMode::BlendAdd,
            _ => BlendMode::Opaque,
        }
    }

    pub fn from_m2(value: u16) -> Self {
        Self::from_index(value as u32)
    }

    pub fn from_wmo(value: u32) -> Self {
        Self::from_index(value)
    }

    /// Opaque and alpha tested geometry writes depth, everything else is blended on top.
    pub fn is_opaque(&self) -> bool {
        matches!(self, BlendMode::Opaque | BlendMode::AlphaKey)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum CullMode {
    None,
    Back,
}

/// The fixed function state of a draw.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct MegaState {
    pub blend_mode: BlendMode,
    pub depth_write: bool,
    pub depth_test: bool,
    pub cull_mode: CullMode,
}

/// WMO material flag: render both faces
const WMO_MATERIAL_UNCULLED: u32 = 0x4;

/// What a draw renders with. The variant specific state lives in the variant, the backend picks its pipeline
/// based on the variant.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum PassMaterial {
    Terrain {
        layer_count: u32,
    },
    Wmo {
        shader: u32,
        blend_mode: BlendMode,
        flags: u32,
    },
    Model {
        shader_id: u16,
        blend_mode: BlendMode,
        flags: M2MaterialFlags,
    },
    Skybox,
}

impl PassMaterial {
    pub fn mega_state(&self) -> MegaState {
        match *self {
            PassMaterial::Terrain { .. } => MegaState {
                blend_mode: BlendMode::Opaque,
                depth_write: true,
                depth_test: true,
                cull_mode: CullMode::Back,
            },
            PassMaterial::Wmo {
                blend_mode, flags, ..
            } => MegaState {
                blend_mode,
                depth_write: blend_mode.is_opaque(),
                depth_test: true,
                cull_mode: if flags & WMO_MATERIAL_UNCULLED != 0 {
                    CullMode::None
                } else {
                    CullMode::Back
                },
            },
            PassMaterial::Model {
                blend_mode, flags, ..
            } => MegaState {
                blend_mode,
                depth_write: blend_mode.is_opaque() && !flags.contains(M2MaterialFlags::DEPTH_WRITE_DISABLED),
                depth_test: !flags.contains(M2MaterialFlags::DEPTH_TEST_DISABLED),
                cull_mode: if flags.contains(M2MaterialFlags::TWO_SIDED) {
                    CullMode::None
                } else {
                    CullMode::Back
                },
            },
            PassMaterial::Skybox => MegaState {
                blend_mode: BlendMode::Opaque,
                depth_write: false,
                depth_test: false,
                cull_mode: CullMode::None,
            },
        }
    }
}

/// Which node a draw belongs to, for statistics and debugging.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum DrawSource {
    Skybox,
    Terrain { tile: TileCoord, chunk: usize },
    Wmo { wmo_id: FileId, group: usize, batch: usize },
    Model { model_id: FileId, pass: usize },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TextureBinding {
    pub texture: TextureHandle,
    pub sampler: SamplerHandle,
}

#[derive(Debug, Clone)]
pub struct DrawSubmission {
    pub source: DrawSource,
    pub material: PassMaterial,
    pub input_layout: InputLayoutHandle,
    pub vertex_buffer: BufferHandle,
    pub index_buffer: BufferHandle,
    pub index_range: Range<u32>,
    pub textures: Vec<TextureBinding>,
    /// Per draw uniform data (transforms, bone matrices, colors), already laid out for the shader
    pub uniforms: Vec<u8>,
    pub instance_count: u32,
}

impl DrawSubmission {
    pub fn index_count(&self) -> u32 {
        self.index_range.end - self.index_range.start
    }
}

/// A graphics API. Resources are created from CPU side data once and destroyed explicitly, draws are collected
/// into the current frame until [`GpuBackend::execute_frame`].
pub trait GpuBackend {
    fn create_buffer(&mut self, label: &str, usage: BufferUsage, data: &[u8]) -> Result<BufferHandle, GfxError>;
    fn destroy_buffer(&mut self, handle: BufferHandle) -> Result<(), GfxError>;

    /// `mips` holds the data of every mip level, level 0 first.
    fn create_texture(&mut self, descriptor: &TextureDescriptor, mips: &[Vec<u8>]) -> Result<TextureHandle, GfxError>;
    fn destroy_texture(&mut self, handle: TextureHandle) -> Result<(), GfxError>;

    fn create_sampler(&mut self, descriptor: &SamplerDescriptor) -> Result<SamplerHandle, GfxError>;
    fn destroy_sampler(&mut self, handle: SamplerHandle) -> Result<(), GfxError>;

    fn create_input_layout(&mut self, descriptor: &InputLayoutDescriptor) -> Result<InputLayoutHandle, GfxError>;
    fn destroy_input_layout(&mut self, handle: InputLayoutHandle) -> Result<(), GfxError>;

    fn submit(&mut self, draw: DrawSubmission) -> Result<(), GfxError>;

    /// Executes every draw submitted since the last frame, returns the amount of draws.
    fn execute_frame(&mut self) -> Result<usize, GfxError>;
}

#[cfg(test)]
mod tests {
    use sargerust_files::m2::types::M2MaterialFlags;

    use super::*;

    #[test]
    fn packed_layouts_accumulate_offsets() {
        let layout = InputLayoutDescriptor::packed(&[
            VertexFormat::Float32x3,
            VertexFormat::Unorm8x4,
            VertexFormat::Float32x2,
        ]);

        assert_eq!(layout.stride, 24);
        assert_eq!(layout.attributes[1].offset, 12);
        assert_eq!(layout.attributes[2].offset, 16);
        assert_eq!(layout.attributes[2].location, 2);
    }

    #[test]
    fn blended_materials_do_not_write_depth() {
        let alpha = PassMaterial::Model {
            shader_id: 0,
            blend_mode: BlendMode::from_m2(2),
            flags: M2MaterialFlags::TWO_SIDED,
        };
        let state = alpha.mega_state();
        assert_eq!(state.blend_mode, BlendMode::Alpha);
        assert!(!state.depth_write);
        assert_eq!(state.cull_mode, CullMode::None);

        let opaque = PassMaterial::Wmo {
            shader: 0,
            blend_mode: BlendMode::from_wmo(0),
            flags: 0,
        };
        assert!(opaque.mega_state().depth_write);
        assert_eq!(opaque.mega_state().cull_mode, CullMode::Back);
        assert_eq!(BlendMode::from_wmo(42), BlendMode::Opaque);
    }
}
