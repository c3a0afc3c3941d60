pub mod animation;
pub mod asset_graph;
pub mod camera;
pub mod common;
pub mod culling;
pub mod gfx;
pub mod importer;
pub mod renderers;
pub mod scene;
