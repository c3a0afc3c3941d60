use serde::{Deserialize, Serialize};

// https://wowdev.wiki/BLP

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlpPixelFormat {
    Dxt1,
    Dxt3,
    Dxt5,
    /// Palettized and raw content is expanded to BGRA by the decoder
    Bgra8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlpAsset {
    pub width: u32,
    pub height: u32,
    pub format: BlpPixelFormat,
    /// Mip level 0 first
    pub mips: Vec<Vec<u8>>,
}

impl BlpAsset {
    pub fn mip_dimensions(&self, level: usize) -> (u32, u32) {
        ((self.width >> level).max(1), (self.height >> level).max(1))
    }
}
