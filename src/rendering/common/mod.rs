/// The game uses far too many coordinate systems, and so we regularly need to transform between them.
/// This module will do so. Our convention is the one of the game's world space (RHS, Z Up, North being +X).
pub mod coordinate_systems;
/// Bounding volumes and the view frustum.
pub mod geometry;
pub mod mesh_merger;
/// basic types (e.g. mesh, vertex layouts) to abstract away from both the asset format and the render backend.
pub mod types;
