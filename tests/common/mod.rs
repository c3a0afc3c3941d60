// every test binary compiles its own copy and uses a different part of it
#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use sargerust_files::ParserError;
use sargerust_files::adt::types::ADTAsset;
use sargerust_files::blp::types::BlpAsset;
use sargerust_files::decoder::{ADTFiles, AssetDecoder};
use sargerust_files::extracted::JsonDecoder;
use sargerust_files::m2::types::{M2Asset, M2SkinProfile};
use sargerust_files::wdt::types::WDTAsset;
use sargerust_files::wmo::types::{WMOGroupAsset, WMORootAsset};
use sargerust_world::demos::{DemoAssetStore, DemoWorld, DemoWorldBuilder};
use sargerust_world::io::common::loader::ByteFetcher;
use sargerust_world::rendering::asset_graph::cache::AssetCache;
use sargerust_world::rendering::common::coordinate_systems::TileCoord;

/// The JSON decoder, counting how often every entry point has been called.
#[derive(Debug, Default)]
pub struct CountingDecoder {
    inner: JsonDecoder,
    pub models: AtomicUsize,
    pub skins: AtomicUsize,
    pub wmo_roots: AtomicUsize,
    pub wmo_groups: AtomicUsize,
    pub adts: AtomicUsize,
    pub wdts: AtomicUsize,
    pub textures: AtomicUsize,
}

fn count(counter: &AtomicUsize) {
    counter.fetch_add(1, Ordering::SeqCst);
}

pub fn read(counter: &AtomicUsize) -> usize {
    counter.load(Ordering::SeqCst)
}

impl AssetDecoder for CountingDecoder {
    fn decode_m2(&self, data: &[u8]) -> Result<M2Asset, ParserError> {
        count(&self.models);
        self.inner.decode_m2(data)
    }

    fn decode_skin(&self, data: &[u8]) -> Result<M2SkinProfile, ParserError> {
        count(&self.skins);
        self.inner.decode_skin(data)
    }

    fn decode_wmo_root(&self, data: &[u8]) -> Result<WMORootAsset, ParserError> {
        count(&self.wmo_roots);
        self.inner.decode_wmo_root(data)
    }

    fn decode_wmo_group(&self, data: &[u8]) -> Result<WMOGroupAsset, ParserError> {
        count(&self.wmo_groups);
        self.inner.decode_wmo_group(data)
    }

    fn decode_adt(&self, files: &ADTFiles<'_>) -> Result<ADTAsset, ParserError> {
        count(&self.adts);
        self.inner.decode_adt(files)
    }

    fn decode_wdt(&self, data: &[u8]) -> Result<WDTAsset, ParserError> {
        count(&self.wdts);
        self.inner.decode_wdt(data)
    }

    fn decode_blp(&self, data: &[u8]) -> Result<BlpAsset, ParserError> {
        count(&self.textures);
        self.inner.decode_blp(data)
    }
}

pub struct Fixture {
    pub store: Arc<DemoAssetStore>,
    pub decoder: Arc<CountingDecoder>,
    pub cache: Arc<AssetCache>,
}

impl Fixture {
    pub fn new() -> Self {
        let store = Arc::new(DemoAssetStore::new());
        let decoder = Arc::new(CountingDecoder::default());
        let cache = Arc::new(AssetCache::new(
            Arc::clone(&store) as Arc<dyn ByteFetcher>,
            Arc::clone(&decoder) as Arc<dyn AssetDecoder>,
        ));

        Fixture { store, decoder, cache }
    }

    /// A world of small tiles (2x2 chunks) with two doodads per tile.
    pub fn world(&self, first: TileCoord, grid: u8) -> anyhow::Result<DemoWorld> {
        DemoWorldBuilder::new(first, grid)
            .chunks_per_side(2)
            .doodads_per_tile(2)
            .build(&self.store)
    }
}

pub fn tile(x: u8, y: u8) -> TileCoord {
    TileCoord::new(x, y).expect("valid tile coordinate")
}
