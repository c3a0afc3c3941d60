use glam::{EulerRot, Mat4, Quat, Vec3};

/// The length of one ADT tile's edge in world units.
pub const TILE_SIZE: f32 = 1600.0 / 3.0;
/// One MCNK, 16x16 per tile
pub const CHUNK_SIZE: f32 = TILE_SIZE / 16.0;
/// The distance between two outer vertices of an MCNK.
pub const GRID_SIZE: f32 = CHUNK_SIZE / 8.0;
/// The map origin sits in the center of the 64x64 tile grid.
pub const MAP_HALF_EXTENT: f32 = 32.0 * TILE_SIZE;
pub const TILES_PER_SIDE: u8 = 64;

/// A position on the 64x64 ADT grid. Only valid coordinates can be constructed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoord {
    x: u8,
    y: u8,
}

impl TileCoord {
    pub fn new(x: u8, y: u8) -> Option<Self> {
        (x < TILES_PER_SIDE && y < TILES_PER_SIDE).then_some(TileCoord { x, y })
    }

    pub fn from_signed(x: i32, y: i32) -> Option<Self> {
        let x = u8::try_from(x).ok()?;
        let y = u8::try_from(y).ok()?;
        Self::new(x, y)
    }

    pub fn x(&self) -> u8 {
        self.x
    }

    pub fn y(&self) -> u8 {
        self.y
    }

    pub fn chebyshev_distance(&self, other: &TileCoord) -> u8 {
        self.x.abs_diff(other.x).max(self.y.abs_diff(other.y))
    }

    /// All valid coordinates within `radius` (Chebyshev distance) of this tile, clipped to the grid.
    pub fn window(&self, radius: u8) -> impl Iterator<Item = TileCoord> {
        let radius = radius as i32;
        let (cx, cy) = (self.x as i32, self.y as i32);

        (cx - radius..=cx + radius)
            .flat_map(move |x| (cy - radius..=cy + radius).map(move |y| (x, y)))
            .filter_map(|(x, y)| TileCoord::from_signed(x, y))
    }

    /// The world space xy extents of this tile, as (min, max).
    pub fn world_bounds(&self) -> (glam::Vec2, glam::Vec2) {
        let max = glam::Vec2::new(
            MAP_HALF_EXTENT - TILE_SIZE * self.y as f32,
            MAP_HALF_EXTENT - TILE_SIZE * self.x as f32,
        );
        (max - glam::Vec2::splat(TILE_SIZE), max)
    }

    /// The center of the tile at height 0.
    pub fn world_center(&self) -> Vec3 {
        let (min, max) = self.world_bounds();
        ((min + max) * 0.5).extend(0.0)
    }
}

impl std::fmt::Display for TileCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}", self.x, self.y)
    }
}

/// World space is RH, Z Up, North: +X, West: +Y. Tile (0, 0) is the north-west corner of the map.
/// Positions outside of the map yield None.
pub fn world_to_tile(position: Vec3) -> Option<TileCoord> {
    let x = ((MAP_HALF_EXTENT - position.y) / TILE_SIZE).floor();
    let y = ((MAP_HALF_EXTENT - position.x) / TILE_SIZE).floor();

    if !x.is_finite() || !y.is_finite() {
        return None;
    }

    TileCoord::from_signed(x as i32, y as i32)
}

/// MDDF/MODF positions are stored relative to the map corner with Y up.
#[inline]
pub fn placement_to_world(source: Vec3) -> Vec3 {
    Vec3::new(
        MAP_HALF_EXTENT - source.z,
        MAP_HALF_EXTENT - source.x,
        source.y,
    )
}

/// The inverse of [`placement_to_world`].
#[inline]
pub fn world_to_placement(world: Vec3) -> Vec3 {
    Vec3::new(MAP_HALF_EXTENT - world.y, world.z, MAP_HALF_EXTENT - world.x)
}

/// The model matrix of an MDDF/MODF placement. The rotation is in degrees, scale is 1.0 for 1024.
pub fn placement_transform(position: Vec3, rotation: Vec3, scale: f32) -> Mat4 {
    let rotation = Quat::from_euler(
        EulerRot::ZYX,
        (rotation.y + 90.0).to_radians(),
        (-rotation.x).to_radians(),
        rotation.z.to_radians(),
    );

    Mat4::from_scale_rotation_translation(Vec3::splat(scale), rotation, placement_to_world(position))
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;

    #[test]
    fn tile_lookup_round_trips_through_the_tile_center() {
        let tile = TileCoord::new(32, 48).expect("valid");
        assert_eq!(world_to_tile(tile.world_center()), Some(tile));

        // the map origin is the corner of tile 32_32
        assert_eq!(world_to_tile(Vec3::new(-1.0, -1.0, 0.0)), TileCoord::new(32, 32));
        assert_eq!(world_to_tile(Vec3::new(1.0, 1.0, 0.0)), TileCoord::new(31, 31));
    }

    #[test]
    fn positions_outside_of_the_map_are_rejected() {
        assert_eq!(world_to_tile(Vec3::new(MAP_HALF_EXTENT + 1.0, 0.0, 0.0)), None);
        assert_eq!(world_to_tile(Vec3::new(0.0, -MAP_HALF_EXTENT - 1.0, 0.0)), None);
        assert_eq!(world_to_tile(Vec3::new(f32::NAN, 0.0, 0.0)), None);
        assert_eq!(TileCoord::new(64, 0), None);
        assert_eq!(TileCoord::from_signed(-1, 5), None);
    }

    #[test]
    fn window_is_clipped_to_the_grid() {
        let corner = TileCoord::new(0, 63).expect("valid");
        let window: Vec<_> = corner.window(1).collect();
        assert_eq!(window.len(), 4);
        assert!(window.iter().all(|tile| tile.chebyshev_distance(&corner) <= 1));

        let center = TileCoord::new(5, 5).expect("valid");
        assert_eq!(center.window(2).count(), 25);
    }

    #[test]
    fn placements_map_into_the_tile_they_are_placed_in() {
        // 1.5 tiles east and 2.5 tiles south of the map corner
        let placement = Vec3::new(1.5 * TILE_SIZE, 12.0, 2.5 * TILE_SIZE);
        let world = placement_to_world(placement);

        assert_eq!(world.z, 12.0);
        assert_eq!(world_to_tile(world), TileCoord::new(1, 2));
    }

    #[test]
    fn placement_space_is_inverted() {
        let world = Vec3::new(-250.0, 1200.5, 37.0);
        assert!(placement_to_world(world_to_placement(world)).abs_diff_eq(world, 1e-3));
    }
}
