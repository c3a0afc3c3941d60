use std::collections::HashMap;

use glam::{Mat3, Mat4, Vec3, Vec4};

use crate::rendering::asset_graph::nodes::adt_node::{AdtData, AdtLod, ChunkData, LodLevel, TerrainData};
use crate::rendering::asset_graph::nodes::placement::{DoodadData, PlacedWmoGroup, WmoDefinition};
use crate::rendering::camera::View;
use crate::rendering::common::coordinate_systems::TileCoord;
use crate::rendering::common::geometry::Aabb;
use crate::rendering::culling::{CullingState, VisibilityCuller};
use crate::settings::SceneSettings;

/// At the origin, looking north (+X)
fn view() -> View {
    View::new(
        Mat4::look_to_rh(Vec3::ZERO, Vec3::X, Vec3::Z),
        Mat4::perspective_rh(90f32.to_radians(), 1.0, 0.5, 3000.0),
        16.0,
    )
}

fn around(center: Vec3, half_extent: f32) -> Aabb {
    Aabb::new(center - Vec3::splat(half_extent), center + Vec3::splat(half_extent))
}

fn doodad(world_aabb: Aabb, cull_individually: bool) -> DoodadData {
    DoodadData {
        model_id: 1,
        model_matrix: Mat4::IDENTITY,
        normal_matrix: Mat3::IDENTITY,
        world_aabb,
        visible: true,
        ambient_color: Vec4::ZERO,
        apply_interior_lighting: false,
        apply_exterior_lighting: true,
        cull_individually,
    }
}

fn group(group_index: usize, world_aabb: Aabb, interior: bool, doodad_indices: Vec<usize>) -> PlacedWmoGroup {
    PlacedWmoGroup {
        group_index,
        world_aabb,
        interior,
        exterior_lit: false,
        ambient_color: Vec4::ZERO,
        visible: true,
        doodad_indices,
    }
}

fn definition(world_aabb: Aabb, groups: Vec<PlacedWmoGroup>, doodads: Vec<DoodadData>, orphans: Vec<usize>) -> WmoDefinition {
    WmoDefinition {
        wmo_id: 100,
        unique_id: 1,
        doodad_set: 0,
        model_matrix: Mat4::IDENTITY,
        normal_matrix: Mat3::IDENTITY,
        world_aabb,
        groups,
        doodads,
        orphan_doodads: orphans,
        visible: true,
    }
}

fn chunk(world_aabb: Aabb) -> ChunkData {
    ChunkData {
        index_x: 0,
        index_y: 0,
        index_range: 0..0,
        layers: vec![],
        alpha_mask: None,
        world_aabb,
        visible: true,
    }
}

fn adt(world_aabb: Aabb, chunks: Vec<ChunkData>) -> AdtData {
    let lod = || AdtLod {
        doodads: vec![doodad(around(world_aabb.center(), 1.0), false)],
        wmo_defs: vec![definition(world_aabb, vec![], vec![], vec![])],
    };

    AdtData {
        tile: TileCoord::new(32, 32).expect("valid"),
        world_aabb,
        visible: true,
        active_lod: LodLevel::Near,
        lods: [lod(), lod()],
        terrain: TerrainData {
            chunks,
            ..TerrainData::default()
        },
        models: HashMap::new(),
        wmos: HashMap::new(),
    }
}

#[test]
fn one_shot_culls_a_single_frame() {
    let mut culler = VisibilityCuller::new(SceneSettings::default());
    assert!(culler.should_cull());
    assert!(culler.should_cull());

    culler.set_state(CullingState::OneShot);
    assert!(culler.should_cull());
    assert_eq!(culler.state(), CullingState::Paused);
    assert!(!culler.should_cull());
}

#[test]
fn exactly_one_lod_is_active() {
    let culler = VisibilityCuller::new(SceneSettings::default());
    let view = view();

    let mut near = adt(Aabb::new(Vec3::new(10.0, -50.0, -10.0), Vec3::new(200.0, 50.0, 10.0)), vec![]);
    culler.cull_adt(&view, &mut near);
    assert_eq!(near.active_lod, LodLevel::Near);
    assert!(near.lods[0].doodads[0].visible);
    assert!(near.lods[0].wmo_defs[0].visible);
    assert!(!near.lods[1].doodads[0].visible);
    assert!(!near.lods[1].wmo_defs[0].visible);

    let mut far = adt(Aabb::new(Vec3::new(1400.0, -50.0, -10.0), Vec3::new(1600.0, 50.0, 10.0)), vec![]);
    culler.cull_adt(&view, &mut far);
    assert!(far.visible);
    assert_eq!(far.active_lod, LodLevel::Far);
    assert!(!far.lods[0].doodads[0].visible);
    assert!(far.lods[1].doodads[0].visible);
}

#[test]
fn tiles_outside_of_the_frustum_hide_everything() {
    let culler = VisibilityCuller::new(SceneSettings::default());
    let behind = Aabb::new(Vec3::new(-200.0, -50.0, -10.0), Vec3::new(-10.0, 50.0, 10.0));
    let mut tile = adt(behind, vec![chunk(behind)]);

    culler.cull_adt(&view(), &mut tile);

    assert!(!tile.visible);
    assert!(!tile.terrain.chunks[0].visible);
    assert!(tile.lods.iter().all(|lod| lod.doodads.iter().all(|d| !d.visible)));
    assert!(tile.lods.iter().all(|lod| lod.wmo_defs.iter().all(|d| !d.visible)));
}

#[test]
fn chunks_are_culled_individually() {
    let culler = VisibilityCuller::new(SceneSettings::default());
    let ahead = around(Vec3::new(100.0, 0.0, 0.0), 10.0);
    let behind = around(Vec3::new(-100.0, 0.0, 0.0), 10.0);
    let mut tile = adt(ahead.union(&behind), vec![chunk(ahead), chunk(behind)]);

    culler.cull_adt(&view(), &mut tile);

    assert!(tile.visible);
    assert!(tile.terrain.chunks[0].visible);
    assert!(!tile.terrain.chunks[1].visible);
}

#[test]
fn group_distance_thresholds_are_exclusive() {
    let culler = VisibilityCuller::new(SceneSettings::default());
    // the group centers are exactly 500 units away
    let at_threshold = around(Vec3::new(500.0, 0.0, 0.0), 5.0);
    let mut def = definition(
        Aabb::new(Vec3::new(90.0, -10.0, -10.0), Vec3::new(510.0, 10.0, 10.0)),
        vec![
            group(0, at_threshold, true, vec![]),
            group(1, at_threshold, false, vec![]),
            group(2, around(Vec3::new(499.0, 0.0, 0.0), 5.0), true, vec![]),
        ],
        vec![],
        vec![],
    );

    culler.cull_wmo_definition(&view(), &mut def);

    assert!(def.visible);
    assert!(!def.groups[0].visible, "interior groups at the threshold are culled");
    assert!(def.groups[1].visible, "exterior groups use the larger threshold");
    assert!(def.groups[2].visible);
}

#[test]
fn definitions_beyond_the_exterior_distance_are_culled() {
    let culler = VisibilityCuller::new(SceneSettings::default());
    let mut def = definition(
        around(Vec3::new(1000.0, 0.0, 0.0), 10.0),
        vec![group(0, around(Vec3::new(1000.0, 0.0, 0.0), 5.0), false, vec![0])],
        vec![doodad(around(Vec3::new(1000.0, 0.0, 0.0), 1.0), false)],
        vec![],
    );

    culler.cull_wmo_definition(&view(), &mut def);

    assert!(!def.visible);
    assert!(!def.groups[0].visible);
    assert!(!def.doodads[0].visible);
}

#[test]
fn doodads_inherit_the_visibility_of_their_group() {
    let culler = VisibilityCuller::new(SceneSettings::default());
    let ahead = around(Vec3::new(100.0, 0.0, 0.0), 10.0);
    let behind = around(Vec3::new(-100.0, 0.0, 0.0), 10.0);

    let mut def = definition(
        ahead.union(&behind),
        vec![group(0, ahead, false, vec![0, 2]), group(1, behind, false, vec![1])],
        vec![
            doodad(around(Vec3::new(100.0, 0.0, 0.0), 1.0), false),
            // in front of the camera, but only the culled group references it
            doodad(around(Vec3::new(100.0, 0.0, 0.0), 1.0), false),
            // a large doodad that sticks out of its group and is fully outside of the frustum
            doodad(around(Vec3::new(-300.0, 0.0, 0.0), 100.0), true),
            doodad(around(Vec3::new(-100.0, 0.0, 0.0), 1.0), false),
        ],
        vec![3],
    );

    culler.cull_wmo_definition(&view(), &mut def);

    assert!(def.groups[0].visible);
    assert!(!def.groups[1].visible);
    assert!(def.doodads[0].visible);
    assert!(!def.doodads[1].visible, "only referenced by the culled group");
    assert!(!def.doodads[2].visible, "large doodads are tested on their own");
    assert!(def.doodads[3].visible, "orphans follow the definition");
}
