// we use the exact wording from wowdev.wiki
#![allow(non_snake_case)]

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::common::types::{C2Vector, C3Vector, C4Quaternion, CAaBox, CImVector};

// https://wowdev.wiki/WMO

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WMORootAsset {
  #[serde(default)]
  pub flags: u16,
  /// MOHD ambColor, applied to interior groups
  pub ambColor: CImVector,
  pub bounding_box: CAaBox,
  pub materials: Vec<SMOMaterial>,
  /// One file per group (_000.wmo, _001.wmo, ...)
  pub groupFileIds: Vec<u32>,
  #[serde(default)]
  pub groupInfos: Vec<SMOGroupInfo>,
  #[serde(default)]
  pub doodadSets: Vec<SMODoodadSet>,
  #[serde(default)]
  pub doodadDefs: Vec<SMODoodadDef>,
}

impl WMORootAsset {
  /// The default set (0) is always furnished, the selected one is added on top.
  pub fn doodad_set_refs(&self, doodad_set: u16) -> Vec<usize> {
    let mut sets = vec![0usize];
    if doodad_set != 0 {
      sets.push(doodad_set as usize);
    }

    sets
      .into_iter()
      .filter_map(|set| self.doodadSets.get(set))
      .flat_map(|set| set.startIndex as usize..(set.startIndex + set.count) as usize)
      .filter(|&idx| idx < self.doodadDefs.len())
      .collect()
  }
}

#[derive(Debug, Copy, Clone, Default, Serialize, Deserialize)]
pub struct SMOMaterial {
  #[serde(default)]
  pub flags: u32,
  #[serde(default)]
  pub shader: u32,
  /// 0 opaque, 1 alpha key, 2 alpha, ...
  #[serde(default)]
  pub blendMode: u32,
  /// file id, 0 when unused
  pub texture_1: u32,
  #[serde(default)]
  pub sidnColor: CImVector,
  #[serde(default)]
  pub frameSidnColor: CImVector,
  #[serde(default)]
  pub texture_2: u32,
  #[serde(default)]
  pub diffColor: CImVector,
  #[serde(default)]
  pub groundType: u32,
  #[serde(default)]
  pub texture_3: u32,
}

#[derive(Debug, Copy, Clone, Default, Serialize, Deserialize)]
pub struct SMOGroupInfo {
  pub flags: u32,
  pub bounding_box: CAaBox,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SMODoodadSet {
  pub name: String,
  /// index of the first doodad instance in this set, into MODD
  pub startIndex: u32,
  pub count: u32,
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
pub struct SMODoodadDef {
  /// Resolved from the MODN name offset
  pub modelFileId: u32,
  pub position: C3Vector,
  pub orientation: C4Quaternion,
  pub scale: f32,
  #[serde(default)]
  pub color: CImVector,
}

bitflags! {
  /// https://wowdev.wiki/WMO#group_flags
  #[derive(Debug, Copy, Clone, PartialEq, Eq)]
  pub struct SMOGroupFlags: u32 {
    const HAS_BSP_TREE = 0x1;
    const HAS_LIGHT_MAP = 0x2;
    const HAS_VERTEX_COLORS = 0x4;
    const EXTERIOR = 0x8;
    const EXTERIOR_LIT = 0x40;
    const UNREACHABLE = 0x80;
    const SHOW_EXTERIOR_SKYBOX = 0x100;
    const HAS_LIGHTS = 0x200;
    const HAS_DOODADS = 0x800;
    const HAS_WATER = 0x1000;
    const INTERIOR = 0x2000;
    const ALWAYS_DRAW = 0x10000;
  }
}

impl WMOGroupAsset {
  pub fn group_flags(&self) -> SMOGroupFlags {
    SMOGroupFlags::from_bits_retain(self.flags)
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WMOGroupAsset {
  pub flags: u32,
  pub bounding_box: CAaBox,
  pub positions: Vec<C3Vector>,
  #[serde(default)]
  pub normals: Vec<C3Vector>,
  #[serde(default)]
  pub texCoords: Vec<C2Vector>,
  /// MOCV, only when HAS_VERTEX_COLORS
  #[serde(default)]
  pub vertexColors: Vec<CImVector>,
  pub indices: Vec<u16>,
  pub batches: Vec<SMOBatch>,
  /// MODR, indices into the root's MODD
  #[serde(default)]
  pub doodadRefs: Vec<u16>,
}

#[derive(Debug, Copy, Clone, Default, Serialize, Deserialize)]
pub struct SMOBatch {
  pub startIndex: u32,
  pub count: u16,
  #[serde(default)]
  pub minIndex: u16,
  #[serde(default)]
  pub maxIndex: u16,
  pub material_id: u8,
}
