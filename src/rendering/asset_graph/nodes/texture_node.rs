use std::sync::Arc;

use sargerust_files::blp::types::BlpPixelFormat;

use crate::io::FileId;
use crate::rendering::asset_graph::cache::AssetCache;
use crate::rendering::asset_graph::error::AssetError;

#[derive(Debug)]
pub struct TextureData {
    pub file_id: FileId,
    pub width: u32,
    pub height: u32,
    pub format: BlpPixelFormat,
    /// Mip level 0 first
    pub mips: Vec<Vec<u8>>,
}

impl TextureData {
    pub async fn load(cache: &AssetCache, file_id: FileId) -> Result<TextureData, AssetError> {
        let blp = cache
            .fetch_decoded(file_id, |decoder, data| decoder.decode_blp(data))
            .await?;

        if blp.mips.is_empty() {
            return Err(AssetError::Invalid {
                kind: "Texture",
                file_id,
                reason: "no mip levels".into(),
            });
        }

        Ok(TextureData {
            file_id,
            width: blp.width,
            height: blp.height,
            format: blp.format,
            mips: blp.mips,
        })
    }
}

/// A texture slot of a model, WMO material or terrain layer. The file id 0 means the slot is unused, a non-zero
/// file id without texture means the load has failed.
#[derive(Debug, Clone)]
pub struct TextureReference {
    pub file_id: FileId,
    pub texture: Option<Arc<TextureData>>,
}

impl TextureReference {
    pub const NONE: TextureReference = TextureReference {
        file_id: 0,
        texture: None,
    };

    pub async fn resolve(cache: &AssetCache, file_id: FileId) -> TextureReference {
        if file_id == 0 {
            return Self::NONE;
        }

        TextureReference {
            file_id,
            texture: cache.get_texture_or_none(file_id).await,
        }
    }

    pub fn is_missing(&self) -> bool {
        self.file_id != 0 && self.texture.is_none()
    }
}
