//! Decoding of assets that have been extracted from the archives and converted into JSON records, one record
//! per file.

use serde::de::DeserializeOwned;

use crate::ParserError;
use crate::adt::types::{ADTAsset, ADTObjectLayer, ADTRootFile, ADTTextureFile};
use crate::blp::types::{BlpAsset, BlpPixelFormat};
use crate::decoder::{ADTFiles, AssetDecoder};
use crate::m2::types::{M2Asset, M2SkinProfile};
use crate::wdt::types::WDTAsset;
use crate::wmo::types::{WMOGroupAsset, WMORootAsset};

/// 9x9 + 8x8
pub const MCVT_HEIGHT_COUNT: usize = 145;

#[derive(Debug, Default, Copy, Clone)]
pub struct JsonDecoder {}

fn parse<T: DeserializeOwned>(data: &[u8]) -> Result<T, ParserError> {
    if data.is_empty() {
        return Err(ParserError::EmptySource);
    }

    Ok(serde_json::from_slice(data)?)
}

fn invalid(asset: &'static str, reason: String) -> ParserError {
    ParserError::InvalidRecord { asset, reason }
}

impl AssetDecoder for JsonDecoder {
    fn decode_m2(&self, data: &[u8]) -> Result<M2Asset, ParserError> {
        let asset: M2Asset = parse(data)?;

        if let Some(idx) = asset
            .texture_lookup_table
            .iter()
            .find(|&&idx| idx as usize >= asset.texture_file_ids.len())
        {
            return Err(invalid(
                "M2",
                format!("texture lookup {idx} exceeds {} textures", asset.texture_file_ids.len()),
            ));
        }

        Ok(asset)
    }

    fn decode_skin(&self, data: &[u8]) -> Result<M2SkinProfile, ParserError> {
        let skin: M2SkinProfile = parse(data)?;

        for batch in &skin.batches {
            if batch.skin_section_index as usize >= skin.submeshes.len() {
                return Err(invalid(
                    "skin",
                    format!("batch references submesh {}", batch.skin_section_index),
                ));
            }
        }

        for submesh in &skin.submeshes {
            if submesh.first_index() as usize + submesh.index_count as usize > skin.indices.len() {
                return Err(invalid(
                    "skin",
                    format!("submesh {} exceeds the index buffer", submesh.skin_section_id),
                ));
            }
        }

        Ok(skin)
    }

    fn decode_wmo_root(&self, data: &[u8]) -> Result<WMORootAsset, ParserError> {
        let root: WMORootAsset = parse(data)?;

        if !root.groupInfos.is_empty() && root.groupInfos.len() != root.groupFileIds.len() {
            return Err(invalid(
                "WMO root",
                format!(
                    "{} group infos for {} groups",
                    root.groupInfos.len(),
                    root.groupFileIds.len()
                ),
            ));
        }

        Ok(root)
    }

    fn decode_wmo_group(&self, data: &[u8]) -> Result<WMOGroupAsset, ParserError> {
        let group: WMOGroupAsset = parse(data)?;

        for batch in &group.batches {
            if batch.startIndex as usize + batch.count as usize > group.indices.len() {
                return Err(invalid(
                    "WMO group",
                    format!("batch at {} exceeds the index buffer", batch.startIndex),
                ));
            }
        }

        Ok(group)
    }

    fn decode_adt(&self, files: &ADTFiles<'_>) -> Result<ADTAsset, ParserError> {
        let root: ADTRootFile = parse(files.root)?;
        let obj0: ADTObjectLayer = parse(files.obj0)?;
        let obj1: ADTObjectLayer = match files.obj1 {
            Some(data) => parse(data)?,
            None => ADTObjectLayer::default(),
        };
        let tex0: ADTTextureFile = parse(files.tex0)?;

        let mut mcnks = root.mcnks;
        if tex0.chunkLayers.len() > mcnks.len() {
            return Err(ParserError::FormatError {
                reason: "tex0 has more chunks than the root file",
            });
        }

        for (mcnk, layers) in mcnks.iter_mut().zip(tex0.chunkLayers) {
            if mcnk.heights.len() != MCVT_HEIGHT_COUNT {
                return Err(invalid(
                    "MCNK",
                    format!("chunk {}_{} has {} heights", mcnk.indexX, mcnk.indexY, mcnk.heights.len()),
                ));
            }

            if let Some(layer) = layers
                .iter()
                .find(|layer| layer.textureId as usize >= tex0.textureFileIds.len())
            {
                return Err(invalid(
                    "MCLY",
                    format!("layer references texture {}", layer.textureId),
                ));
            }

            mcnk.layers = layers;
        }

        Ok(ADTAsset {
            mcnks,
            textureFileIds: tex0.textureFileIds,
            objects: [obj0, obj1],
        })
    }

    fn decode_wdt(&self, data: &[u8]) -> Result<WDTAsset, ParserError> {
        let wdt: WDTAsset = parse(data)?;

        if let Some(tile) = wdt.tiles.iter().find(|tile| tile.x >= 64 || tile.y >= 64) {
            return Err(invalid("WDT", format!("tile {}_{} is outside of the map", tile.x, tile.y)));
        }

        if wdt.globalWmoDef.is_some() != wdt.globalWmoFileId.is_some() {
            return Err(ParserError::FormatError {
                reason: "MODF and MWMO need to be present together",
            });
        }

        Ok(wdt)
    }

    fn decode_blp(&self, data: &[u8]) -> Result<BlpAsset, ParserError> {
        let blp: BlpAsset = parse(data)?;

        let Some(level0) = blp.mips.first() else {
            return Err(ParserError::FormatError {
                reason: "BLP without any mip level",
            });
        };

        // DXTn content is stored in 4x4 blocks
        let blocks = blp.width.div_ceil(4) as usize * blp.height.div_ceil(4) as usize;
        let expected = match blp.format {
            BlpPixelFormat::Dxt1 => blocks * 8,
            BlpPixelFormat::Dxt3 | BlpPixelFormat::Dxt5 => blocks * 16,
            BlpPixelFormat::Bgra8 => blp.width as usize * blp.height as usize * 4,
        };

        if level0.len() < expected {
            return Err(invalid(
                "BLP",
                format!("mip 0 has {} bytes, expected {expected}", level0.len()),
            ));
        }

        Ok(blp)
    }
}

#[cfg(test)]
mod tests;
