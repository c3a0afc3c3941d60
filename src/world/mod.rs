//! Which terrain tiles are resident. [`WorldData`] loads a whole map up front, which suits small maps and
//! instances, [`LazyWorldData`] pages tiles in around the camera.
pub mod lazy_world_data;
pub mod world_data;

pub use lazy_world_data::{ExpansionOutcome, ExpansionRequest, LazyWorldData};
pub use world_data::{GlobalWmo, WorldData};

use crate::rendering::common::coordinate_systems::TileCoord;

pub enum SceneWorld {
    Eager(WorldData),
    Lazy(LazyWorldData),
}

impl SceneWorld {
    pub fn world(&self) -> &WorldData {
        match self {
            SceneWorld::Eager(world) => world,
            SceneWorld::Lazy(lazy) => &lazy.world,
        }
    }

    pub fn world_mut(&mut self) -> &mut WorldData {
        match self {
            SceneWorld::Eager(world) => world,
            SceneWorld::Lazy(lazy) => &mut lazy.world,
        }
    }

    pub fn lazy_mut(&mut self) -> Option<&mut LazyWorldData> {
        match self {
            SceneWorld::Eager(_) => None,
            SceneWorld::Lazy(lazy) => Some(lazy),
        }
    }

    pub fn resident_tile_count(&self) -> usize {
        self.world().adts.len()
    }

    pub fn is_resident(&self, tile: TileCoord) -> bool {
        self.world().adt(tile).is_some()
    }
}
