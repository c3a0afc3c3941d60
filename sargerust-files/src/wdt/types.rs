#![allow(non_snake_case)] // we use the exact wording from wowdev.wiki

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::common::types::{C3Vector, CAaBox};

// https://wowdev.wiki/WDT

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WDTAsset {
  /// MPHD flags
  pub mphd: u32,
  /// Only the tiles that exist, in no particular order
  pub tiles: Vec<MapFileDataIDs>,
  /// MWMO resolved to a file id, for maps that are a single global WMO
  #[serde(default)]
  pub globalWmoFileId: Option<u32>,
  /// MODF
  #[serde(default)]
  pub globalWmoDef: Option<SMMapObjDef>,
}

bitflags! {
  #[derive(Debug, Copy, Clone, PartialEq, Eq)]
  pub struct MPHDFlags: u32 {
    const WDT_USES_GLOBAL_MAP_OBJ = 0x1;
    const ADT_HAS_MCCV = 0x2;
    const ADT_HAS_BIG_ALPHA = 0x4;
    const ADT_HAS_DOODADREFS_SORTED_BY_SIZE_CAT = 0x8;
    const ADT_HAS_MCLV = 0x10;
    const ADT_HAS_UPSIDE_DOWN_GROUND = 0x20;
    const UNK_40 = 0x40;
    const ADT_HAS_HEIGHT_TEXTURING = 0x80;
  }
}

/// MAID: the companion file ids of one tile. 0 means "no such file".
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapFileDataIDs {
  pub x: u8,
  pub y: u8,
  pub rootADT: u32,
  pub obj0ADT: u32,
  #[serde(default)]
  pub obj1ADT: u32,
  pub tex0ADT: u32,
  #[serde(default)]
  pub lodADT: u32,
}

impl MapFileDataIDs {
  pub fn exists(&self) -> bool {
    self.rootADT != 0
  }
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
pub struct SMMapObjDef {
  pub nameId: u32,
  pub uniqueId: u32,
  pub pos: C3Vector,
  pub rot: C3Vector,
  pub extents: CAaBox,
  #[serde(default)]
  pub flags: u16,
  #[serde(default)]
  pub doodadSet: u16,
  #[serde(default)]
  pub nameSet: u16,
  /// when in ADT, scale, in WDT potentially padding
  #[serde(default)]
  pub scale: u16,
}

impl WDTAsset {
  pub fn flags(&self) -> MPHDFlags {
    MPHDFlags::from_bits_retain(self.mphd)
  }

  pub fn has_chunk(&self, chunk_x: u8, chunk_y: u8) -> bool {
    self.tile(chunk_x, chunk_y).is_some()
  }

  pub fn tile(&self, chunk_x: u8, chunk_y: u8) -> Option<&MapFileDataIDs> {
    self.tiles
      .iter()
      .find(|tile| tile.x == chunk_x && tile.y == chunk_y && tile.exists())
  }
}
