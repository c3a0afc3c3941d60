//! Skeletal, color, texture weight and texture transform animation of M2 models.
//! Every [`crate::rendering::asset_graph::nodes::model_node::ModelData`] owns one [`AnimationManager`] that is
//! advanced once per rendered frame, before any draw of that model is submitted.
pub mod manager;
pub mod track;

pub use manager::AnimationManager;

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_1_SQRT_2;

    use glam::Vec3;
    use sargerust_files::common::types::{C3Vector, C4Quaternion, M2Track};
    use sargerust_files::m2::types::{M2Asset, M2CompBone, M2Sequence, M2TextureWeight};

    use crate::rendering::animation::AnimationManager;
    use crate::rendering::animation::track::{AnimationTrack, Interpolation};

    fn sequence(duration: u32) -> M2Sequence {
        M2Sequence {
            duration,
            flags: 0x20,
            frequency: 0x7fff,
            ..M2Sequence::default()
        }
    }

    fn bone_chain() -> M2Asset {
        let mut root = M2CompBone::with_parent(-1);
        root.rotation = M2Track::constant(C4Quaternion {
            x: 0.0,
            y: 0.0,
            z: FRAC_1_SQRT_2,
            w: FRAC_1_SQRT_2,
        });

        let mut arm = M2CompBone::with_parent(0);
        arm.translation = M2Track::constant(C3Vector::new(1.0, 0.0, 0.0));

        let mut hand = M2CompBone::with_parent(1);
        hand.translation = M2Track::constant(C3Vector::new(0.0, 2.0, 0.0));

        M2Asset {
            name: "chain.m2".into(),
            bones: vec![root, arm, hand],
            sequences: vec![sequence(1000)],
            ..M2Asset::default()
        }
    }

    #[test]
    fn bones_are_composed_with_their_parents() {
        let mut manager = AnimationManager::new(&bone_chain());
        manager.update(16.0);

        let matrices = manager.bone_matrices();
        assert_eq!(matrices.len(), 3);

        let origin = matrices[2].transform_point3(Vec3::ZERO);
        assert!(origin.abs_diff_eq(Vec3::new(-2.0, 1.0, 0.0), 1e-5), "{origin}");

        let arm_origin = matrices[1].transform_point3(Vec3::ZERO);
        assert!(arm_origin.abs_diff_eq(Vec3::new(0.0, 1.0, 0.0), 1e-5), "{arm_origin}");
    }

    #[test]
    #[should_panic(expected = "parent first")]
    fn bones_referencing_later_parents_are_rejected() {
        let asset = M2Asset {
            name: "broken.m2".into(),
            bones: vec![M2CompBone::with_parent(1), M2CompBone::with_parent(-1)],
            ..M2Asset::default()
        };

        AnimationManager::new(&asset);
    }

    #[test]
    fn texture_weights_are_normalized() {
        let asset = M2Asset {
            name: "weights.m2".into(),
            sequences: vec![sequence(1000)],
            texture_weights: vec![
                M2TextureWeight {
                    weights: M2Track::constant(0x7fff),
                },
                M2TextureWeight::default(),
            ],
            ..M2Asset::default()
        };

        let mut manager = AnimationManager::new(&asset);
        manager.update(10.0);
        assert_eq!(manager.texture_weights(), &[1.0, 1.0]);
    }

    #[test]
    fn global_sequences_loop_independently() {
        let mut color = sargerust_files::m2::types::M2Color::default();
        color.alpha = M2Track {
            interpolation_type: 1,
            global_sequence: 0,
            timestamps: vec![vec![0, 100]],
            values: vec![vec![0, 0x7fff]],
        };

        let asset = M2Asset {
            name: "pulse.m2".into(),
            sequences: vec![sequence(5000)],
            global_sequence_durations: vec![100],
            colors: vec![color],
            ..M2Asset::default()
        };

        let mut manager = AnimationManager::new(&asset);
        manager.update(150.0);
        // 150 ms wrap around to 50 ms of the 100 ms global clock
        assert!((manager.colors()[0].w - 0.5).abs() < 1e-3, "{}", manager.colors()[0].w);
        assert_eq!(manager.current_time(), 150.0);
    }

    #[test]
    fn models_without_sequences_keep_their_bind_pose() {
        let asset = M2Asset {
            name: "static.m2".into(),
            bones: vec![M2CompBone::with_parent(-1)],
            ..M2Asset::default()
        };

        let mut manager = AnimationManager::new(&asset);
        manager.update(1000.0);
        assert_eq!(manager.current_sequence(), None);
        assert_eq!(manager.bone_matrices()[0], glam::Mat4::IDENTITY);
    }

    #[test]
    fn variations_are_picked_deterministically() {
        let mut main = sequence(100);
        main.frequency = 0x3fff;
        main.variation_next = 1;
        let mut variation = sequence(100);
        variation.frequency = 0x4000;

        let asset = M2Asset {
            name: "idle.m2".into(),
            sequences: vec![main, variation],
            ..M2Asset::default()
        };

        let play = || {
            let mut manager = AnimationManager::new(&asset);
            (0..50)
                .map(|_| {
                    manager.update(60.0);
                    manager.current_sequence()
                })
                .collect::<Vec<_>>()
        };

        let first = play();
        assert_eq!(first, play());
        assert!(first.iter().all(|sequence| matches!(sequence, Some(0) | Some(1))));
    }

    fn play(asset: &M2Asset, frames: usize, delta_time: f64) -> Vec<Option<usize>> {
        let mut manager = AnimationManager::new(asset);
        (0..frames)
            .map(|_| {
                manager.update(delta_time);
                manager.current_sequence()
            })
            .collect()
    }

    #[test]
    fn looping_variation_chains_play_the_main_variation() {
        let mut only = sequence(100);
        only.frequency = 0;
        only.variation_next = 0;

        let asset = M2Asset {
            name: "self.m2".into(),
            sequences: vec![only],
            ..M2Asset::default()
        };
        assert!(play(&asset, 10, 60.0).iter().all(|&sequence| sequence == Some(0)));

        // the frequencies of this cycle never add up to the roll
        let mut first = sequence(100);
        first.frequency = 1;
        first.variation_next = 1;
        let mut second = sequence(100);
        second.frequency = 1;
        second.variation_next = 0;

        let asset = M2Asset {
            name: "cycle.m2".into(),
            sequences: vec![first, second],
            ..M2Asset::default()
        };
        assert!(play(&asset, 10, 60.0).iter().all(|&sequence| sequence == Some(0)));
    }

    #[test]
    fn aliases_are_followed_to_a_loaded_sequence() {
        let mut main = sequence(100);
        main.frequency = 0;
        main.variation_next = 1;

        let alias = |alias_next| M2Sequence {
            duration: 100,
            flags: 0x40,
            frequency: 0x7fff,
            alias_next,
            variation_next: -1,
            ..M2Sequence::default()
        };

        let mut target = alias(0);
        target.flags = 0x60;

        let asset = M2Asset {
            name: "alias.m2".into(),
            sequences: vec![main, alias(3), target, alias(2)],
            ..M2Asset::default()
        };

        assert_eq!(play(&asset, 2, 60.0), vec![Some(0), Some(2)]);
    }

    #[test]
    fn replays_repeat_the_sequence_before_a_variation_is_picked() {
        let mut main = sequence(100);
        main.frequency = 0;
        main.variation_next = 1;
        let mut variation = sequence(100);
        variation.variation_next = -1;

        let asset = M2Asset {
            name: "replay.m2".into(),
            sequences: vec![main, variation],
            ..M2Asset::default()
        };
        assert_eq!(play(&asset, 2, 60.0), vec![Some(0), Some(1)]);

        main.replay_min = 2;
        main.replay_max = 2;
        let asset = M2Asset {
            name: "replay.m2".into(),
            sequences: vec![main, variation],
            ..M2Asset::default()
        };
        assert_eq!(play(&asset, 5, 60.0), vec![Some(0), Some(0), Some(0), Some(0), Some(1)]);
    }

    #[test]
    fn sequences_blend_into_the_next_one() {
        let mut main = sequence(1000);
        main.frequency = 0;
        main.variation_next = 1;
        let mut variation = sequence(1000);
        variation.variation_next = -1;
        variation.blend_time = 200;

        let mut root = M2CompBone::with_parent(-1);
        root.translation = M2Track {
            interpolation_type: 1,
            global_sequence: -1,
            timestamps: vec![vec![0], vec![0]],
            values: vec![vec![C3Vector::new(0.0, 0.0, 0.0)], vec![C3Vector::new(10.0, 0.0, 0.0)]],
        };

        let asset = M2Asset {
            name: "blend.m2".into(),
            bones: vec![root],
            sequences: vec![main, variation],
            ..M2Asset::default()
        };

        let mut manager = AnimationManager::new(&asset);
        manager.update(900.0);
        assert_eq!(manager.current_sequence(), Some(0));
        assert!((manager.blend_factor() - 0.5).abs() < 1e-5, "{}", manager.blend_factor());
        let origin = manager.bone_matrices()[0].transform_point3(Vec3::ZERO);
        assert!(origin.abs_diff_eq(Vec3::new(5.0, 0.0, 0.0), 1e-4), "{origin}");

        manager.update(150.0);
        assert_eq!(manager.current_sequence(), Some(1));
        assert_eq!(manager.blend_factor(), 1.0);
        let origin = manager.bone_matrices()[0].transform_point3(Vec3::ZERO);
        assert!(origin.abs_diff_eq(Vec3::new(10.0, 0.0, 0.0), 1e-4), "{origin}");
    }

    #[test]
    fn bezier_and_hermite_tracks_are_sampled_linearly() {
        assert_eq!(Interpolation::from(0), Interpolation::None);
        assert_eq!(Interpolation::from(1), Interpolation::Linear);
        assert_eq!(Interpolation::from(2), Interpolation::Linear);
        assert_eq!(Interpolation::from(3), Interpolation::Linear);

        let m2 = M2Track {
            interpolation_type: 3,
            global_sequence: -1,
            timestamps: vec![vec![0, 100]],
            values: vec![vec![0.0f32, 1.0]],
        };
        let track = AnimationTrack::from_m2(&m2, |&value| value);
        assert_eq!(track.sample(0, 25.0), Some(0.25));
    }
}
