use std::collections::HashMap;

use log::trace;

use crate::rendering::gfx::{
    BufferHandle, BufferUsage, DrawSubmission, GfxError, GpuBackend, InputLayoutDescriptor, InputLayoutHandle,
    SamplerDescriptor, SamplerHandle, TextureDescriptor, TextureHandle,
};

#[derive(Debug, Clone)]
pub struct RecordedBuffer {
    pub label: String,
    pub usage: BufferUsage,
    pub size: usize,
}

/// A backend without a GPU. It validates handles, keeps track of every live resource and records the draws of
/// the last executed frame.
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    next_handle: u32,
    buffers: HashMap<BufferHandle, RecordedBuffer>,
    textures: HashMap<TextureHandle, TextureDescriptor>,
    samplers: HashMap<SamplerHandle, SamplerDescriptor>,
    input_layouts: HashMap<InputLayoutHandle, InputLayoutDescriptor>,
    pending: Vec<DrawSubmission>,
    last_frame: Vec<DrawSubmission>,
    frames: u64,
    textures_created: usize,
}

fn unknown(kind: &'static str, id: u32) -> GfxError {
    GfxError::UnknownHandle { kind, id }
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self) -> u32 {
        self.next_handle += 1;
        self.next_handle
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    pub fn live_samplers(&self) -> usize {
        self.samplers.len()
    }

    pub fn live_input_layouts(&self) -> usize {
        self.input_layouts.len()
    }

    /// Whether every resource that has been created is destroyed again.
    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
            && self.textures.is_empty()
            && self.samplers.is_empty()
            && self.input_layouts.is_empty()
    }

    /// All textures that have ever been created, destroyed ones included.
    pub fn textures_created(&self) -> usize {
        self.textures_created
    }

    pub fn buffer(&self, handle: BufferHandle) -> Option<&RecordedBuffer> {
        self.buffers.get(&handle)
    }

    pub fn texture(&self, handle: TextureHandle) -> Option<&TextureDescriptor> {
        self.textures.get(&handle)
    }

    /// The draws of the last executed frame, in submission order.
    pub fn last_frame(&self) -> &[DrawSubmission] {
        &self.last_frame
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    fn validate(&self, draw: &DrawSubmission) -> Result<(), GfxError> {
        if !self.input_layouts.contains_key(&draw.input_layout) {
            return Err(GfxError::InvalidSubmission(format!(
                "{:?} uses input layout {:?}",
                draw.source, draw.input_layout
            )));
        }

        for buffer in [draw.vertex_buffer, draw.index_buffer] {
            if !self.buffers.contains_key(&buffer) {
                return Err(GfxError::InvalidSubmission(format!("{:?} uses buffer {:?}", draw.source, buffer)));
            }
        }

        if let Some(binding) = draw.textures.iter().find(|binding| {
            !self.textures.contains_key(&binding.texture) || !self.samplers.contains_key(&binding.sampler)
        }) {
            return Err(GfxError::InvalidSubmission(format!("{:?} binds {:?}", draw.source, binding)));
        }

        let index_bytes = self
            .buffers
            .get(&draw.index_buffer)
            .map(|buffer| buffer.size)
            .unwrap_or_default();
        if draw.index_range.start > draw.index_range.end || draw.index_range.end as usize * 2 > index_bytes {
            return Err(GfxError::InvalidSubmission(format!(
                "{:?} draws indices {:?} of a buffer with {} bytes",
                draw.source, draw.index_range, index_bytes
            )));
        }

        Ok(())
    }
}

impl GpuBackend for HeadlessBackend {
    fn create_buffer(&mut self, label: &str, usage: BufferUsage, data: &[u8]) -> Result<BufferHandle, GfxError> {
        if data.is_empty() {
            return Err(GfxError::InvalidDescriptor {
                kind: "buffer",
                reason: format!("{} is empty", label),
            });
        }

        let handle = BufferHandle(self.allocate());
        self.buffers.insert(
            handle,
            RecordedBuffer {
                label: label.to_string(),
                usage,
                size: data.len(),
            },
        );
        Ok(handle)
    }

    fn destroy_buffer(&mut self, handle: BufferHandle) -> Result<(), GfxError> {
        self.buffers
            .remove(&handle)
            .map(|_| ())
            .ok_or_else(|| unknown("buffer", handle.0))
    }

    fn create_texture(&mut self, descriptor: &TextureDescriptor, mips: &[Vec<u8>]) -> Result<TextureHandle, GfxError> {
        if descriptor.width == 0 || descriptor.height == 0 || mips.is_empty() {
            return Err(GfxError::InvalidDescriptor {
                kind: "texture",
                reason: format!(
                    "{} is {}x{} with {} mips",
                    descriptor.label,
                    descriptor.width,
                    descriptor.height,
                    mips.len()
                ),
            });
        }

        let handle = TextureHandle(self.allocate());
        self.textures.insert(handle, descriptor.clone());
        self.textures_created += 1;
        Ok(handle)
    }

    fn destroy_texture(&mut self, handle: TextureHandle) -> Result<(), GfxError> {
        self.textures
            .remove(&handle)
            .map(|_| ())
            .ok_or_else(|| unknown("texture", handle.0))
    }

    fn create_sampler(&mut self, descriptor: &SamplerDescriptor) -> Result<SamplerHandle, GfxError> {
        let handle = SamplerHandle(self.allocate());
        self.samplers.insert(handle, *descriptor);
        Ok(handle)
    }

    fn destroy_sampler(&mut self, handle: SamplerHandle) -> Result<(), GfxError> {
        self.samplers
            .remove(&handle)
            .map(|_| ())
            .ok_or_else(|| unknown("sampler", handle.0))
    }

    fn create_input_layout(&mut self, descriptor: &InputLayoutDescriptor) -> Result<InputLayoutHandle, GfxError> {
        let handle = InputLayoutHandle(self.allocate());
        self.input_layouts.insert(handle, descriptor.clone());
        Ok(handle)
    }

    fn destroy_input_layout(&mut self, handle: InputLayoutHandle) -> Result<(), GfxError> {
        self.input_layouts
            .remove(&handle)
            .map(|_| ())
            .ok_or_else(|| unknown("input layout", handle.0))
    }

    fn submit(&mut self, draw: DrawSubmission) -> Result<(), GfxError> {
        self.validate(&draw)?;
        self.pending.push(draw);
        Ok(())
    }

    fn execute_frame(&mut self) -> Result<usize, GfxError> {
        self.frames += 1;
        self.last_frame = std::mem::take(&mut self.pending);
        trace!("Frame {}: {} draws", self.frames, self.last_frame.len());
        Ok(self.last_frame.len())
    }
}

#[cfg(test)]
mod tests {
    use crate::rendering::gfx::headless::HeadlessBackend;
    use crate::rendering::gfx::*;

    #[test]
    fn resources_can_only_be_destroyed_once() -> Result<(), GfxError> {
        let mut backend = HeadlessBackend::new();
        let buffer = backend.create_buffer("vertices", BufferUsage::Vertex, &[0; 16])?;
        assert_eq!(backend.live_buffers(), 1);

        backend.destroy_buffer(buffer)?;
        assert!(backend.is_empty());
        assert_eq!(
            backend.destroy_buffer(buffer),
            Err(GfxError::UnknownHandle { kind: "buffer", id: buffer.0 })
        );
        Ok(())
    }

    #[test]
    fn submissions_are_validated_and_recorded_per_frame() -> Result<(), GfxError> {
        let mut backend = HeadlessBackend::new();
        let layout = backend.create_input_layout(&InputLayoutDescriptor::packed(&[VertexFormat::Float32x3]))?;
        let vertices = backend.create_buffer("vertices", BufferUsage::Vertex, &[0; 36])?;
        let indices = backend.create_buffer("indices", BufferUsage::Index, &[0; 6])?;

        let draw = DrawSubmission {
            source: DrawSource::Skybox,
            material: PassMaterial::Skybox,
            input_layout: layout,
            vertex_buffer: vertices,
            index_buffer: indices,
            index_range: 0..3,
            textures: vec![],
            uniforms: vec![],
            instance_count: 1,
        };

        backend.submit(draw.clone())?;
        assert!(
            backend
                .submit(DrawSubmission {
                    index_range: 0..4,
                    ..draw.clone()
                })
                .is_err()
        );
        assert_eq!(backend.execute_frame()?, 1);
        assert_eq!(backend.last_frame()[0].index_count(), 3);

        assert_eq!(backend.execute_frame()?, 0);
        assert_eq!(backend.frames(), 2);
        Ok(())
    }
}
