//! Streaming, culling and animation for World of Warcraft maps. A [`rendering::scene::WdtScene`] owns the resident
//! part of a map and submits it to a [`rendering::gfx::GpuBackend`] every frame.
pub mod demos;
pub mod io;
pub mod rendering;
pub mod settings;
pub mod util;
pub mod world;
