//! The draw submitters. Each one owns the GPU resources of one kind of node: they are created once per asset when
//! it becomes resident and destroyed together with the scene.
pub mod model;
pub mod skybox;
pub mod terrain;
pub mod texture_cache;
pub mod wmo;
