use std::sync::Arc;

use log::{trace, warn};
use sargerust_files::ParserError;
use sargerust_files::decoder::AssetDecoder;

use crate::io::FileId;
use crate::io::common::loader::ByteFetcher;
use crate::rendering::asset_graph::error::AssetError;
use crate::rendering::asset_graph::nodes::model_node::ModelData;
use crate::rendering::asset_graph::nodes::texture_node::TextureData;
use crate::rendering::asset_graph::nodes::wmo_node::{WmoData, WmoGroupData};
use crate::rendering::asset_graph::resolver::{LoadResult, Resolver};

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub models: usize,
    pub wmos: usize,
    pub wmo_groups: usize,
    pub textures: usize,
}

/// The per scene asset cache. Every asset type has its own key space, and every key is loaded at most once: the
/// nodes resolve their dependencies through this very cache, so shared doodads and textures are deduplicated.
/// There is no eviction, the cache lives as long as the scene that owns it.
pub struct AssetCache {
    fetcher: Arc<dyn ByteFetcher>,
    decoder: Arc<dyn AssetDecoder>,
    models: Resolver<ModelData>,
    wmos: Resolver<WmoData>,
    wmo_groups: Resolver<WmoGroupData>,
    textures: Resolver<TextureData>,
}

impl AssetCache {
    pub fn new(fetcher: Arc<dyn ByteFetcher>, decoder: Arc<dyn AssetDecoder>) -> Self {
        Self {
            fetcher,
            decoder,
            models: Resolver::new(),
            wmos: Resolver::new(),
            wmo_groups: Resolver::new(),
            textures: Resolver::new(),
        }
    }

    pub fn decoder(&self) -> &dyn AssetDecoder {
        self.decoder.as_ref()
    }

    pub async fn fetch(&self, file_id: FileId) -> Result<Vec<u8>, AssetError> {
        trace!("Fetching file {}", file_id);
        self.fetcher
            .fetch(file_id)
            .await
            .map_err(|err| AssetError::Fetch {
                file_id,
                reason: format!("{err:#}"),
            })
    }

    /// Fetches a file and hands it to one of the decoder entry points. The buffer is dropped right after decoding.
    pub async fn fetch_decoded<T, F>(&self, file_id: FileId, decode: F) -> Result<T, AssetError>
    where
        F: FnOnce(&dyn AssetDecoder, &[u8]) -> Result<T, ParserError>,
    {
        let data = self.fetch(file_id).await?;
        decode(self.decoder.as_ref(), &data).map_err(|err| AssetError::Decode {
            file_id,
            reason: err.to_string(),
        })
    }

    pub async fn get_model(&self, file_id: FileId) -> LoadResult<ModelData> {
        self.models
            .resolve(file_id, ModelData::load(self, file_id))
            .await
    }

    pub async fn get_wmo(&self, file_id: FileId) -> LoadResult<WmoData> {
        self.wmos
            .resolve(file_id, WmoData::load(self, file_id))
            .await
    }

    pub async fn get_wmo_group(&self, file_id: FileId) -> LoadResult<WmoGroupData> {
        self.wmo_groups
            .resolve(file_id, WmoGroupData::load(self, file_id))
            .await
    }

    pub async fn get_texture(&self, file_id: FileId) -> LoadResult<TextureData> {
        self.textures
            .resolve(file_id, TextureData::load(self, file_id))
            .await
    }

    /// Missing textures are a valid state, the failure is logged and the caller proceeds without the texture.
    pub async fn get_texture_or_none(&self, file_id: FileId) -> Option<Arc<TextureData>> {
        match self.get_texture(file_id).await {
            Ok(texture) => Some(texture),
            Err(err) => {
                warn!("Texture {} is missing: {}", file_id, err);
                None
            }
        }
    }

    /// Already loaded models, e.g. to advance their animations.
    pub fn loaded_models(&self) -> Vec<Arc<ModelData>> {
        self.models.loaded()
    }

    pub fn model(&self, file_id: FileId) -> Option<Arc<ModelData>> {
        self.models.get(file_id)
    }

    pub fn wmo(&self, file_id: FileId) -> Option<Arc<WmoData>> {
        self.wmos.get(file_id)
    }

    pub fn texture(&self, file_id: FileId) -> Option<Arc<TextureData>> {
        self.textures.get(file_id)
    }

    /// The amount of requested keys per asset type, including failed loads.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            models: self.models.len(),
            wmos: self.wmos.len(),
            wmo_groups: self.wmo_groups.len(),
            textures: self.textures.len(),
        }
    }

    /// Drops every cached asset. Assets that are still referenced elsewhere stay alive until those references go.
    pub fn clear(&self) {
        self.models.clear();
        self.wmos.clear();
        self.wmo_groups.clear();
        self.textures.clear();
    }
}
