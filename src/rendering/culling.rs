use log::trace;

use crate::rendering::asset_graph::nodes::adt_node::{AdtData, LodLevel};
use crate::rendering::asset_graph::nodes::placement::{DoodadData, WmoDefinition};
use crate::rendering::camera::View;
use crate::settings::SceneSettings;
use crate::world::WorldData;

pub const DEFAULT_ADT_LOD0_DISTANCE: f32 = 1000.0;
pub const DEFAULT_MAX_EXTERIOR_WMO_DISTANCE: f32 = 1000.0;
pub const DEFAULT_MAX_INTERIOR_WMO_DISTANCE: f32 = 500.0;
pub const DEFAULT_LARGE_DOODAD_SIZE: f32 = 150.0;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum CullingState {
    #[default]
    Running,
    /// The visibility of the last culled frame is kept
    Paused,
    /// Cull the next frame, then pause
    OneShot,
}

/// Updates the visibility flags of everything that is resident. Nothing is ranked or sorted, each node only knows
/// whether it is visible this frame.
#[derive(Debug, Default)]
pub struct VisibilityCuller {
    settings: SceneSettings,
    state: CullingState,
}

impl VisibilityCuller {
    pub fn new(settings: SceneSettings) -> Self {
        VisibilityCuller {
            settings,
            state: CullingState::Running,
        }
    }

    pub fn state(&self) -> CullingState {
        self.state
    }

    pub fn set_state(&mut self, state: CullingState) {
        self.state = state;
    }

    pub fn settings(&self) -> &SceneSettings {
        &self.settings
    }

    /// Whether this frame is to be culled. A one shot request pauses culling after it has been consumed.
    pub fn should_cull(&mut self) -> bool {
        match self.state {
            CullingState::Running => true,
            CullingState::Paused => false,
            CullingState::OneShot => {
                self.state = CullingState::Paused;
                true
            }
        }
    }

    pub fn cull_world(&self, view: &View, world: &mut WorldData) {
        profiling::scope!("VisibilityCuller::cull_world");
        for adt in &mut world.adts {
            self.cull_adt(view, adt);
        }

        if let Some(global) = &mut world.global_wmo {
            self.cull_wmo_definition(view, &mut global.definition);
        }
    }

    pub fn cull_adt(&self, view: &View, adt: &mut AdtData) {
        adt.visible = view.frustum.contains_aabb(&adt.world_aabb);
        if !adt.visible {
            for chunk in &mut adt.terrain.chunks {
                chunk.visible = false;
            }
            for lod in &mut adt.lods {
                hide_lod(&mut lod.doodads, &mut lod.wmo_defs);
            }
            return;
        }

        let distance = adt.world_aabb.center_distance(view.camera_position);
        adt.active_lod = if distance < self.settings.adt_lod0_distance {
            LodLevel::Near
        } else {
            LodLevel::Far
        };

        for chunk in &mut adt.terrain.chunks {
            chunk.visible = view.frustum.contains_aabb(&chunk.world_aabb);
        }

        let active = adt.active_lod.index();
        for (index, lod) in adt.lods.iter_mut().enumerate() {
            if index != active {
                hide_lod(&mut lod.doodads, &mut lod.wmo_defs);
                continue;
            }

            for def in &mut lod.wmo_defs {
                self.cull_wmo_definition(view, def);
            }

            // doodads placed on the terrain belong to the visible tile
            for doodad in &mut lod.doodads {
                doodad.visible = true;
                cull_large_doodad(view, doodad);
            }
        }

        trace!("Tile {} is visible, using {:?}", adt.tile, adt.active_lod);
    }

    pub fn cull_wmo_definition(&self, view: &View, def: &mut WmoDefinition) {
        let visible = view.frustum.contains_aabb(&def.world_aabb)
            && def.world_aabb.center_distance(view.camera_position) < self.settings.max_exterior_wmo_distance;

        if !visible {
            def.set_visible(false);
            return;
        }

        def.visible = true;
        for doodad in &mut def.doodads {
            doodad.visible = false;
        }

        for group in &mut def.groups {
            group.visible = view.frustum.contains_aabb(&group.world_aabb) && {
                let max_distance = if group.interior {
                    self.settings.max_interior_wmo_distance
                } else {
                    self.settings.max_exterior_wmo_distance
                };
                group.world_aabb.center_distance(view.camera_position) < max_distance
            };

            if group.visible {
                for &doodad in &group.doodad_indices {
                    def.doodads[doodad].visible = true;
                }
            }
        }

        for &doodad in &def.orphan_doodads {
            def.doodads[doodad].visible = true;
        }

        for doodad in &mut def.doodads {
            cull_large_doodad(view, doodad);
        }
    }
}

fn hide_lod(doodads: &mut [DoodadData], wmo_defs: &mut [WmoDefinition]) {
    for doodad in doodads {
        doodad.visible = false;
    }
    for def in wmo_defs {
        def.set_visible(false);
    }
}

/// Large doodads are tested on their own, on top of the visibility they inherited.
fn cull_large_doodad(view: &View, doodad: &mut DoodadData) {
    if doodad.visible && doodad.cull_individually {
        doodad.visible = view.frustum.contains_aabb(&doodad.world_aabb);
    }
}

#[cfg(test)]
mod tests;
