use std::collections::HashMap;

use log::trace;

use crate::io::FileId;
use crate::rendering::asset_graph::nodes::adt_node::ALPHA_MAP_SIZE;
use crate::rendering::asset_graph::nodes::texture_node::{TextureData, TextureReference};
use crate::rendering::gfx::{
    GfxError, GpuBackend, SamplerDescriptor, SamplerHandle, TextureBinding, TextureDescriptor, TextureFormat,
    TextureHandle, WrapMode,
};

/// The GPU side of the textures. Every texture file is uploaded once, no matter how many models, WMOs or tiles
/// use it.
#[derive(Debug)]
pub struct TextureCache {
    textures: HashMap<FileId, TextureHandle>,
    samplers: HashMap<SamplerDescriptor, SamplerHandle>,
    placeholder: TextureHandle,
    default_alpha_mask: TextureHandle,
}

fn single_texel(device: &mut dyn GpuBackend, label: &str, texel: [u8; 4]) -> Result<TextureHandle, GfxError> {
    device.create_texture(
        &TextureDescriptor {
            label: label.to_string(),
            width: 1,
            height: 1,
            format: TextureFormat::Rgba8,
        },
        &[texel.to_vec()],
    )
}

impl TextureCache {
    pub fn new(device: &mut dyn GpuBackend) -> Result<Self, GfxError> {
        Ok(TextureCache {
            textures: HashMap::new(),
            samplers: HashMap::new(),
            placeholder: single_texel(device, "white placeholder", [0xFF; 4])?,
            // no blended layers
            default_alpha_mask: single_texel(device, "default alpha mask", [0x00, 0x00, 0x00, 0xFF])?,
        })
    }

    pub fn placeholder(&self) -> TextureHandle {
        self.placeholder
    }

    pub fn default_alpha_mask(&self) -> TextureHandle {
        self.default_alpha_mask
    }

    pub fn upload(&mut self, device: &mut dyn GpuBackend, texture: &TextureData) -> Result<TextureHandle, GfxError> {
        if let Some(&handle) = self.textures.get(&texture.file_id) {
            return Ok(handle);
        }

        trace!(
            "Uploading texture {} ({}x{}, {} mips)",
            texture.file_id,
            texture.width,
            texture.height,
            texture.mips.len()
        );

        let handle = device.create_texture(
            &TextureDescriptor {
                label: format!("texture {}", texture.file_id),
                width: texture.width,
                height: texture.height,
                format: texture.format.into(),
            },
            &texture.mips,
        )?;

        self.textures.insert(texture.file_id, handle);
        Ok(handle)
    }

    /// The texture of a slot, uploading it on first use. None for unused slots and failed loads.
    pub fn resolve(
        &mut self,
        device: &mut dyn GpuBackend,
        reference: &TextureReference,
    ) -> Result<Option<TextureHandle>, GfxError> {
        reference
            .texture
            .as_ref()
            .map(|texture| self.upload(device, texture))
            .transpose()
    }

    pub fn resolve_or_placeholder(
        &mut self,
        device: &mut dyn GpuBackend,
        reference: &TextureReference,
    ) -> Result<TextureHandle, GfxError> {
        Ok(self.resolve(device, reference)?.unwrap_or(self.placeholder))
    }

    pub fn sampler(
        &mut self,
        device: &mut dyn GpuBackend,
        wrap_u: WrapMode,
        wrap_v: WrapMode,
    ) -> Result<SamplerHandle, GfxError> {
        let descriptor = SamplerDescriptor { wrap_u, wrap_v };
        if let Some(&sampler) = self.samplers.get(&descriptor) {
            return Ok(sampler);
        }

        let sampler = device.create_sampler(&descriptor)?;
        self.samplers.insert(descriptor, sampler);
        Ok(sampler)
    }

    pub fn binding(
        &mut self,
        device: &mut dyn GpuBackend,
        texture: TextureHandle,
        wrap: WrapMode,
    ) -> Result<TextureBinding, GfxError> {
        Ok(TextureBinding {
            texture,
            sampler: self.sampler(device, wrap, wrap)?,
        })
    }

    /// An RGBA8 alpha mask of one terrain chunk. These are owned by the terrain renderer, not by this cache.
    pub fn create_alpha_mask(
        &self,
        device: &mut dyn GpuBackend,
        label: String,
        data: &[u8],
    ) -> Result<TextureHandle, GfxError> {
        device.create_texture(
            &TextureDescriptor {
                label,
                width: ALPHA_MAP_SIZE as u32,
                height: ALPHA_MAP_SIZE as u32,
                format: TextureFormat::Rgba8,
            },
            &[data.to_vec()],
        )
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    pub fn destroy(self, device: &mut dyn GpuBackend) -> Result<(), GfxError> {
        for (_, texture) in self.textures {
            device.destroy_texture(texture)?;
        }
        for (_, sampler) in self.samplers {
            device.destroy_sampler(sampler)?;
        }

        device.destroy_texture(self.placeholder)?;
        device.destroy_texture(self.default_alpha_mask)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use sargerust_files::blp::types::BlpPixelFormat;

    use crate::rendering::asset_graph::nodes::texture_node::{TextureData, TextureReference};
    use crate::rendering::gfx::headless::HeadlessBackend;
    use crate::rendering::gfx::{GfxError, WrapMode};
    use crate::rendering::renderers::texture_cache::TextureCache;

    #[test]
    fn textures_and_samplers_are_created_once() -> Result<(), GfxError> {
        let mut device = HeadlessBackend::new();
        let mut cache = TextureCache::new(&mut device)?;

        let reference = TextureReference {
            file_id: 7,
            texture: Some(Arc::new(TextureData {
                file_id: 7,
                width: 4,
                height: 4,
                format: BlpPixelFormat::Bgra8,
                mips: vec![vec![0; 64]],
            })),
        };

        let first = cache.resolve(&mut device, &reference)?;
        let second = cache.resolve(&mut device, &reference)?;
        assert_eq!(first, second);
        assert_eq!(cache.len(), 1);

        let missing = TextureReference {
            file_id: 8,
            texture: None,
        };
        assert_eq!(cache.resolve(&mut device, &missing)?, None);
        assert_eq!(cache.resolve_or_placeholder(&mut device, &missing)?, cache.placeholder());

        let repeat = cache.sampler(&mut device, WrapMode::Repeat, WrapMode::Repeat)?;
        assert_eq!(cache.sampler(&mut device, WrapMode::Repeat, WrapMode::Repeat)?, repeat);
        assert_ne!(cache.sampler(&mut device, WrapMode::Clamp, WrapMode::Clamp)?, repeat);

        cache.destroy(&mut device)?;
        assert!(device.is_empty());
        Ok(())
    }
}
