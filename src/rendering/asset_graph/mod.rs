//! This module contains the directional acyclic graph that is built to keep track of dependencies
//! and to provide asset deduplication and streaming ("async loading").
//!
//! To achieve the first goal of deduplication, the graph will mostly consist of [`std::sync::Arc`]s.
//! Whoever has the first reference to any specific asset takes care of fetching, decoding and
//! importing it and storing it behind an [`std::sync::Arc`]. The [`cache::AssetCache`] is the lookup
//! storage, where future reference resolutions will [`std::sync::Arc::clone()`] from.
//!
//! The goal of streaming comes in naturally, provided the graph's reference resolution is thread-safe.
//! [`resolver::Resolver`] stores the pending load per key _before_ the load starts, so a second
//! request for the same key awaits the first one instead of racing it. Failed loads are stored as
//! well, so a broken file is only fetched once per scene.
//!
//! Hint: Considering how typical assets use the same doodad and textures in sequence, deduplication
//! matters a lot: a forest tile places the same few tree models hundreds of times.
//!
//! The graph, leaf first:
//! - [`nodes::texture_node::TextureData`]: one BLP.
//! - [`nodes::model_node::ModelData`]: one M2 with its skins, textures and animation state.
//! - [`nodes::wmo_node::WmoGroupData`]: one WMO group file.
//! - [`nodes::wmo_node::WmoData`]: one WMO root, its groups and the models of its doodads.
//! - [`nodes::adt_node::AdtData`]: one terrain tile. Tiles are not cached, the world keeps track of
//!   which tiles are resident.
//!
//! Placements ([`nodes::placement::DoodadData`], [`nodes::placement::WmoDefinition`]) are not part of
//! the cache, they are owned by the tile (or the world, for global WMOs) that placed them and only
//! reference the cached asset by its file id. WMO references are a speciality, because they may be
//! referenced from multiple ADT files, but still must only be placed once. There's a specific
//! uniqueId for that case.
//!
//! Failures follow the asset type: a missing texture is a valid state (logged, then rendered with a
//! placeholder or skipped), a missing doodad model only leaves a gap, everything else fails the load
//! of the asset that needed it.
pub mod cache;
pub mod error;
pub mod nodes;
pub mod resolver;
