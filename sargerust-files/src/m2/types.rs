use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::common::types::{C2Vector, C3Vector, C4Quaternion, CAaBox, M2Track};
use crate::ParserError;

// https://wowdev.wiki/M2

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct M2Asset {
    pub name: String,
    pub vertices: Vec<M2Vertex>,
    pub bounding_box: CAaBox,
    #[serde(default)]
    pub bones: Vec<M2CompBone>,
    #[serde(default)]
    pub sequences: Vec<M2Sequence>,
    #[serde(default)]
    pub global_sequence_durations: Vec<u32>,
    #[serde(default)]
    pub colors: Vec<M2Color>,
    #[serde(default)]
    pub texture_weights: Vec<M2TextureWeight>,
    #[serde(default)]
    pub texture_transforms: Vec<M2TextureTransform>,
    #[serde(default)]
    pub materials: Vec<M2Material>,
    /// File ids of the textures, 0 for textures whose type is resolved at runtime (e.g. character skins)
    #[serde(default)]
    pub texture_file_ids: Vec<u32>,
    /// Wotlk+ stores the skin profiles in their own files.
    pub skin_file_ids: Vec<u32>,
    #[serde(default)]
    pub texture_lookup_table: Vec<u16>,
    #[serde(default)]
    pub transparency_lookup_table: Vec<u16>,
    #[serde(default)]
    pub texture_transforms_lookup_table: Vec<u16>,
}

#[derive(Debug, Copy, Clone, Default, Serialize, Deserialize)]
pub struct M2Vertex {
    /// friendly reminder that WoW is right handed (Z Up)
    pub pos: C3Vector,
    pub bone_weights: [u8; 4],
    pub bone_indices: [u8; 4],
    pub normal: C3Vector,
    pub tex_coords: [C2Vector; 2],
}

bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct M2BoneFlags: u32 {
        const IGNORE_PARENT_TRANSLATE = 0x1;
        const IGNORE_PARENT_SCALE = 0x2;
        const IGNORE_PARENT_ROTATION = 0x4;
        const SPHERICAL_BILLBOARD = 0x8;
        const CYLINDRICAL_BILLBOARD_LOCK_X = 0x10;
        const CYLINDRICAL_BILLBOARD_LOCK_Y = 0x20;
        const CYLINDRICAL_BILLBOARD_LOCK_Z = 0x40;
        const TRANSFORMED = 0x200;
        const KINEMATIC_BONE = 0x400;
        const HELMET_ANIM_SCALED = 0x1000;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct M2CompBone {
    #[serde(default = "default_key_bone")]
    pub key_bone_id: i32,
    #[serde(default)]
    pub flags: u32,
    pub parent_bone: i16,
    #[serde(default)]
    pub submesh_id: u16,
    #[serde(default)]
    pub translation: M2Track<C3Vector>,
    #[serde(default)]
    pub rotation: M2Track<C4Quaternion>,
    #[serde(default)]
    pub scaling: M2Track<C3Vector>,
    #[serde(default)]
    pub pivot: C3Vector,
}

fn default_key_bone() -> i32 {
    -1
}

impl M2CompBone {
    pub fn bone_flags(&self) -> M2BoneFlags {
        M2BoneFlags::from_bits_retain(self.flags)
    }

    pub fn with_parent(parent_bone: i16) -> Self {
        M2CompBone {
            key_bone_id: -1,
            flags: 0,
            parent_bone,
            submesh_id: 0,
            translation: M2Track::default(),
            rotation: M2Track::default(),
            scaling: M2Track::default(),
            pivot: C3Vector::default(),
        }
    }
}

bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct M2SequenceFlags: u32 {
        const BLENDED_ANIMATION = 0x4;
        /// The sequence carries its own keyframes (not stored in an external .anim)
        const LOADED = 0x20;
        /// Alias of the sequence at `alias_next`
        const ALIAS = 0x40;
        const BLENDED = 0x80;
    }
}

#[derive(Debug, Copy, Clone, Default, Serialize, Deserialize)]
pub struct M2Sequence {
    pub id: u16,
    #[serde(default)]
    pub sub_id: u16,
    pub duration: u32,
    #[serde(default)]
    pub movespeed: f32,
    #[serde(default)]
    pub flags: u32,
    /// chance this variation is picked, out of 0x7fff
    #[serde(default)]
    pub frequency: i16,
    #[serde(default)]
    pub replay_min: u32,
    #[serde(default)]
    pub replay_max: u32,
    #[serde(default)]
    pub blend_time: u32,
    #[serde(default = "no_sequence")]
    pub variation_next: i16,
    #[serde(default)]
    pub alias_next: u16,
}

impl M2Sequence {
    pub fn sequence_flags(&self) -> M2SequenceFlags {
        M2SequenceFlags::from_bits_retain(self.flags)
    }
}

fn no_sequence() -> i16 {
    -1
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct M2Color {
    pub color: M2Track<C3Vector>,
    /// 0x7fff is fully opaque
    pub alpha: M2Track<u16>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct M2TextureWeight {
    pub weights: M2Track<u16>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct M2TextureTransform {
    pub translation: M2Track<C3Vector>,
    pub rotation: M2Track<C4Quaternion>,
    pub scaling: M2Track<C3Vector>,
}

bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct M2MaterialFlags: u16 {
        const UNLIT = 0x1;
        const UNFOGGED = 0x2;
        const TWO_SIDED = 0x4;
        const DEPTH_TEST_DISABLED = 0x8;
        const DEPTH_WRITE_DISABLED = 0x10;
    }
}

#[derive(Debug, Copy, Clone, Default, Serialize, Deserialize)]
pub struct M2Material {
    pub flags: u16,
    /// 0 opaque, 1 alpha key, 2 alpha, 3 no alpha add, 4 add, 5 mod, 6 mod2x, 7 blend add
    pub blending_mode: u16,
}

impl M2Material {
    pub fn material_flags(&self) -> M2MaterialFlags {
        M2MaterialFlags::from_bits_retain(self.flags)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct M2SkinProfile {
    /// indices into M2Asset::vertices
    pub vertices: Vec<u16>,
    /// indices into vertices
    pub indices: Vec<u16>,
    pub submeshes: Vec<M2SkinSection>,
    pub batches: Vec<M2Batch>,
    #[serde(default)]
    pub bone_count_max: u32,
}

impl M2SkinProfile {
    /// The index buffer translated into M2Asset::vertices space
    pub fn global_indices(&self) -> Result<Vec<u16>, ParserError> {
        self.indices
            .iter()
            .map(|&idx| {
                self.vertices
                    .get(idx as usize)
                    .copied()
                    .ok_or(ParserError::FormatError {
                        reason: "skin index outside of the skin vertex list",
                    })
            })
            .collect()
    }
}

#[derive(Debug, Copy, Clone, Default, Serialize, Deserialize)]
pub struct M2SkinSection {
    #[serde(default)]
    pub skin_section_id: u16,
    /// (level << 16) is added to index_start, to work around the u16 limit
    #[serde(default)]
    pub level: u16,
    pub vertex_start: u16,
    pub vertex_count: u16,
    pub index_start: u16,
    pub index_count: u16,
    #[serde(default)]
    pub bone_count: u16,
    #[serde(default)]
    pub bone_combo_index: u16,
    #[serde(default)]
    pub center_bone_index: u16,
}

impl M2SkinSection {
    pub fn first_index(&self) -> u32 {
        self.index_start as u32 + ((self.level as u32) << 16)
    }
}

#[derive(Debug, Copy, Clone, Default, Serialize, Deserialize)]
pub struct M2Batch {
    #[serde(default)]
    pub flags: u8,
    #[serde(default)]
    pub priority_plane: i8,
    #[serde(default)]
    pub shader_id: u16,
    pub skin_section_index: u16,
    #[serde(default)]
    pub geoset_index: u16,
    #[serde(default = "no_index")]
    pub color_index: i16,
    pub material_index: u16,
    #[serde(default)]
    pub material_layer: u16,
    pub texture_count: u16,
    pub texture_combo_index: u16,
    #[serde(default)]
    pub texture_coord_combo_index: u16,
    #[serde(default)]
    pub texture_weight_combo_index: u16,
    #[serde(default)]
    pub texture_transform_combo_index: u16,
}

fn no_index() -> i16 {
    -1
}
