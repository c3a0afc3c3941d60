use crate::ParserError;
use crate::adt::types::ADTAsset;
use crate::blp::types::BlpAsset;
use crate::m2::types::{M2Asset, M2SkinProfile};
use crate::wdt::types::WDTAsset;
use crate::wmo::types::{WMOGroupAsset, WMORootAsset};

/// The companion buffers of one terrain tile. obj1 (the far LOD placements) is optional.
#[derive(Debug, Copy, Clone)]
pub struct ADTFiles<'a> {
    pub root: &'a [u8],
    pub obj0: &'a [u8],
    pub obj1: Option<&'a [u8]>,
    pub tex0: &'a [u8],
}

/// One entry point per asset type. Implementations return owned records, so callers never hold on to the
/// input buffers.
pub trait AssetDecoder: Send + Sync {
    fn decode_m2(&self, data: &[u8]) -> Result<M2Asset, ParserError>;
    fn decode_skin(&self, data: &[u8]) -> Result<M2SkinProfile, ParserError>;
    fn decode_wmo_root(&self, data: &[u8]) -> Result<WMORootAsset, ParserError>;
    fn decode_wmo_group(&self, data: &[u8]) -> Result<WMOGroupAsset, ParserError>;
    fn decode_adt(&self, files: &ADTFiles<'_>) -> Result<ADTAsset, ParserError>;
    fn decode_wdt(&self, data: &[u8]) -> Result<WDTAsset, ParserError>;
    fn decode_blp(&self, data: &[u8]) -> Result<BlpAsset, ParserError>;
}
