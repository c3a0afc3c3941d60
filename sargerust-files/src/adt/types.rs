// we use the exact wording from wowdev.wiki
#![allow(non_snake_case)]

use serde::{Deserialize, Serialize};

use crate::common::types::{C3Vector, CImVector};
use crate::wdt::types::SMMapObjDef;

// https://wowdev.wiki/ADT/v18

/// The merged view over the companion files of one tile: the root file carries the terrain, obj0/obj1 the
/// placements (near/far), tex0 the texture layers.
#[derive(Debug, Clone, Default)]
pub struct ADTAsset {
  pub mcnks: Vec<MCNKChunk>,
  /// MTEX, resolved to file ids
  pub textureFileIds: Vec<u32>,
  /// [obj0, obj1]
  pub objects: [ADTObjectLayer; 2],
}

/// Contents of the root file (_xx_yy.adt)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ADTRootFile {
  pub mcnks: Vec<MCNKChunk>,
}

/// Contents of a _obj0.adt or _obj1.adt file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ADTObjectLayer {
  /// MMDX, resolved to file ids
  #[serde(default)]
  pub modelFileIds: Vec<u32>,
  /// MDDF
  #[serde(default)]
  pub doodadDefs: Vec<SMDoodadDef>,
  /// MWMO, resolved to file ids
  #[serde(default)]
  pub wmoFileIds: Vec<u32>,
  /// MODF
  #[serde(default)]
  pub mapObjDefs: Vec<SMMapObjDef>,
}

/// Contents of a _tex0.adt file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ADTTextureFile {
  pub textureFileIds: Vec<u32>,
  /// MCLY + MCAL per MCNK, in the same order as the root's MCNKs
  pub chunkLayers: Vec<Vec<SMLayer>>,
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
pub struct SMDoodadDef {
  pub nameId: u32, // MMDX entry on which model to use
  pub uniqueId: u32,
  pub position: C3Vector, // even that is relative to the corner of a map
  pub rotation: C3Vector, // degrees
  pub scale: u16, // 1024 is the default, scale 1.0
  #[serde(default)]
  pub flags: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MCNKChunk {
  pub indexX: u32,
  pub indexY: u32,
  #[serde(default)]
  pub holes_low_res: u16,
  /// world space corner of the chunk (north-west, the maximum x and y)
  pub position: C3Vector,
  /// MCVT, float height[9*9 + 8*8], relative to position.z
  pub heights: MCVTSubChunk,
  /// MCNR, 127 = 1, -127 = -1
  #[serde(default)]
  pub normals: Vec<MCNREntry>,
  /// MCCV, 0x7F is 1.0
  #[serde(default)]
  pub vertexColors: Option<Vec<CImVector>>,
  /// Filled from the tex0 file
  #[serde(skip)]
  pub layers: Vec<SMLayer>,
}

impl MCNKChunk {
  pub fn get_index_low(row: u8, column: u8) -> u8 {
    17 * row + column
  }

  pub fn get_index_high(row: u8, column: u8) -> u8 {
    17 * row + column + 9
  }
}

/// float height[9\*9 + 8\*8]
pub type MCVTSubChunk = Vec<f32>;

#[derive(Debug, Copy, Clone, Default, Serialize, Deserialize)]
pub struct MCNREntry {
  pub normal_x: i8,
  pub normal_z: i8,
  pub normal_y: i8,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SMLayer {
  /// index into MTEX
  pub textureId: u32,
  #[serde(default)]
  pub flags: u32,
  #[serde(default)]
  pub effectId: u32,
  /// MCAL, uncompressed 64x64, absent for the base layer
  #[serde(default)]
  pub alphaMap: Option<Vec<u8>>,
}
