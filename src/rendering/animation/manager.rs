use glam::{Mat4, Quat, Vec3, Vec4};
use sargerust_files::common::types::C4Quaternion;
use sargerust_files::m2::types::{M2Asset, M2Sequence, M2SequenceFlags};

use crate::rendering::animation::track::{AnimationTrack, Lerp};
use crate::rendering::common::geometry::vec3;

const OPAQUE: f32 = 0x7fff as f32;
const RNG_SEED: u32 = 1312;

/// The texture coordinate space pivots around its center.
const TEXTURE_PIVOT: Vec3 = Vec3::new(0.5, 0.5, 0.0);

fn quat(value: &C4Quaternion) -> Quat {
    Quat::from_xyzw(value.x, value.y, value.z, value.w)
}

/// The classic LCG, so that variation picking is deterministic between runs.
#[derive(Debug, Clone)]
struct LcgRng {
    state: u32,
}

impl LcgRng {
    fn new(seed: u32) -> Self {
        LcgRng { state: seed }
    }

    fn next_u16(&mut self) -> u16 {
        self.state = self.state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
        self.state %= 1 << 31;
        self.state as u16
    }

    fn next_f32(&mut self) -> f32 {
        self.next_u16() as f32 / u16::MAX as f32
    }
}

#[derive(Debug, Clone, Default)]
struct AnimationState {
    sequence_index: Option<usize>,
    repeat_times: i32,
    /// milliseconds into the sequence
    time: f64,
    main_variation_index: usize,
}

impl AnimationState {
    fn calculate_repeats(&mut self, sequences: &[M2Sequence], rng: &mut LcgRng) {
        if let Some(record) = self.sequence_index.and_then(|index| sequences.get(index)) {
            let times = record.replay_max.saturating_sub(record.replay_min) as f32;
            self.repeat_times = record.replay_min as i32 + (times * rng.next_f32()) as i32;
        }
    }
}

#[derive(Debug, Clone)]
struct BoneAnimation {
    parent: Option<usize>,
    pivot: Vec3,
    translation: AnimationTrack<Vec3>,
    rotation: AnimationTrack<Quat>,
    scaling: AnimationTrack<Vec3>,
}

#[derive(Debug, Clone)]
struct ColorAnimation {
    color: AnimationTrack<Vec3>,
    alpha: AnimationTrack<f32>,
}

#[derive(Debug, Clone)]
struct TextureTransformAnimation {
    translation: AnimationTrack<Vec3>,
    rotation: AnimationTrack<Quat>,
    scaling: AnimationTrack<Vec3>,
}

/// Plays the sequences of one model and evaluates its tracks. The results are written into buffers that are
/// allocated once, at construction.
#[derive(Debug, Clone)]
pub struct AnimationManager {
    sequences: Vec<M2Sequence>,
    global_sequence_durations: Vec<u32>,
    global_sequence_times: Vec<f64>,
    current: AnimationState,
    next: AnimationState,
    /// The weight of the current sequence while blending into the next one.
    blend_factor: f32,
    rng: LcgRng,

    bones: Vec<BoneAnimation>,
    colors: Vec<ColorAnimation>,
    texture_weights: Vec<AnimationTrack<f32>>,
    texture_transforms: Vec<TextureTransformAnimation>,

    bone_matrices: Vec<Mat4>,
    color_values: Vec<Vec4>,
    texture_weight_values: Vec<f32>,
    texture_matrices: Vec<Mat4>,
}

impl AnimationManager {
    /// Panics when a bone references a parent that does not precede it.
    pub fn new(asset: &M2Asset) -> Self {
        let bones = asset
            .bones
            .iter()
            .enumerate()
            .map(|(index, bone)| {
                let parent = usize::try_from(bone.parent_bone).ok();
                if let Some(parent) = parent {
                    assert!(
                        parent < index,
                        "{}: bone {} has the parent {}, bones need to be sorted parent first",
                        asset.name,
                        index,
                        parent
                    );
                }

                BoneAnimation {
                    parent,
                    pivot: vec3(&bone.pivot),
                    translation: AnimationTrack::from_m2(&bone.translation, vec3),
                    rotation: AnimationTrack::from_m2(&bone.rotation, quat),
                    scaling: AnimationTrack::from_m2(&bone.scaling, vec3),
                }
            })
            .collect::<Vec<_>>();

        let colors = asset
            .colors
            .iter()
            .map(|color| ColorAnimation {
                color: AnimationTrack::from_m2(&color.color, vec3),
                alpha: AnimationTrack::from_m2(&color.alpha, |&alpha| alpha as f32 / OPAQUE),
            })
            .collect::<Vec<_>>();

        let texture_weights = asset
            .texture_weights
            .iter()
            .map(|weight| AnimationTrack::from_m2(&weight.weights, |&weight| weight as f32 / OPAQUE))
            .collect::<Vec<_>>();

        let texture_transforms = asset
            .texture_transforms
            .iter()
            .map(|transform| TextureTransformAnimation {
                translation: AnimationTrack::from_m2(&transform.translation, vec3),
                rotation: AnimationTrack::from_m2(&transform.rotation, quat),
                scaling: AnimationTrack::from_m2(&transform.scaling, vec3),
            })
            .collect::<Vec<_>>();

        let mut rng = LcgRng::new(RNG_SEED);
        let mut current = AnimationState {
            sequence_index: (!asset.sequences.is_empty()).then_some(0),
            ..AnimationState::default()
        };
        current.calculate_repeats(&asset.sequences, &mut rng);

        let mut manager = AnimationManager {
            sequences: asset.sequences.clone(),
            global_sequence_durations: asset.global_sequence_durations.clone(),
            global_sequence_times: vec![0.0; asset.global_sequence_durations.len()],
            current,
            next: AnimationState::default(),
            blend_factor: 1.0,
            rng,
            bone_matrices: vec![Mat4::IDENTITY; bones.len()],
            color_values: vec![Vec4::ONE; colors.len()],
            texture_weight_values: vec![1.0; texture_weights.len()],
            texture_matrices: vec![Mat4::IDENTITY; texture_transforms.len()],
            bones,
            colors,
            texture_weights,
            texture_transforms,
        };

        manager.evaluate();
        manager
    }

    /// Advances the clocks by `delta_time` milliseconds and re-evaluates every track.
    pub fn update(&mut self, delta_time: f64) {
        profiling::scope!("AnimationManager::update");
        self.current.time += delta_time;

        for (time, &duration) in self
            .global_sequence_times
            .iter_mut()
            .zip(self.global_sequence_durations.iter())
        {
            *time += delta_time;
            if duration > 0 {
                *time %= duration as f64;
            }
        }

        self.advance_sequences();
        self.evaluate();
    }

    fn advance_sequences(&mut self) {
        let Some(current_index) = self.current.sequence_index else {
            return;
        };

        let current_record = self.sequences[current_index];
        let main_variation = self.sequences[self.current.main_variation_index];

        // If we don't have a next animation yet, and this animation isn't set to repeat again, choose the next one
        if self.next.sequence_index.is_none() && main_variation.variation_next > -1 && self.current.repeat_times <= 0 {
            let probability = (self.rng.next_f32() * OPAQUE) as i32;

            let next_index = self.pick_variation(probability);

            self.next = AnimationState {
                sequence_index: Some(next_index),
                repeat_times: 0,
                time: 0.0,
                main_variation_index: self.current.main_variation_index,
            };
            self.next.calculate_repeats(&self.sequences, &mut self.rng);
        } else if self.current.repeat_times > 0 && self.next.sequence_index.is_none() {
            self.next = AnimationState {
                time: 0.0,
                repeat_times: self.current.repeat_times - 1,
                ..self.current.clone()
            };
        }

        let duration = current_record.duration as f64;
        let time_left = duration - self.current.time;

        let blend_time = self
            .next
            .sequence_index
            .map(|index| self.sequences[index].blend_time as f64)
            .unwrap_or(0.0);

        // if it's time to start blending into the next animation, setup an appropriate blend factor
        if blend_time > 0.0 && time_left < blend_time {
            let next_duration = self.next.sequence_index.map_or(0, |index| self.sequences[index].duration) as f64;
            self.next.time = if next_duration > 0.0 {
                (blend_time - time_left) % next_duration
            } else {
                0.0
            };
            self.blend_factor = (time_left / blend_time).max(0.0) as f32;
        } else {
            self.blend_factor = 1.0;
        }

        // if the current animation is done and we have a next animation, swap them. otherwise, loop the current one
        if self.current.time >= duration {
            self.current.repeat_times -= 1;

            if let Some(next_index) = self.next.sequence_index {
                let overflow = self.current.time - duration;
                let mut next = std::mem::take(&mut self.next);
                next.sequence_index = Some(self.resolve_alias(next_index));
                if blend_time <= 0.0 {
                    next.time = overflow;
                }

                self.current = next;
                self.blend_factor = 1.0;
            } else if duration > 0.0 {
                self.current.time %= duration;
            }
        }
    }

    /// Walks the variation chain of the main variation until the summed frequencies reach `probability`. Chains that
    /// loop without getting there play the main variation.
    fn pick_variation(&self, probability: i32) -> usize {
        let main_index = self.current.main_variation_index;
        let mut next_index = main_index;
        let mut calculated = self.sequences[next_index].frequency as i32;

        for _ in 0..self.sequences.len() {
            if calculated >= probability {
                return next_index;
            }

            let Some(variation) = usize::try_from(self.sequences[next_index].variation_next)
                .ok()
                .filter(|&variation| variation < self.sequences.len())
            else {
                return next_index;
            };

            next_index = variation;
            if Some(next_index) != self.current.sequence_index {
                calculated += self.sequences[next_index].frequency as i32;
            }
        }

        if calculated >= probability { next_index } else { main_index }
    }

    /// Follows the alias chain until a sequence with its own keyframes.
    fn resolve_alias(&self, mut index: usize) -> usize {
        for _ in 0..self.sequences.len() {
            let flags = self.sequences[index].sequence_flags();
            if flags.contains(M2SequenceFlags::LOADED) || !flags.contains(M2SequenceFlags::ALIAS) {
                break;
            }

            let alias = self.sequences[index].alias_next as usize;
            if alias >= self.sequences.len() {
                break;
            }
            index = alias;
        }

        index
    }

    fn sample<T: Lerp>(&self, track: &AnimationTrack<T>, default: T) -> T {
        let (current_index, current_time) = match track.global_sequence() {
            Some(global) => (
                0,
                self.global_sequence_times
                    .get(global)
                    .copied()
                    .unwrap_or(self.current.time),
            ),
            None => (self.current.sequence_index.unwrap_or(0), self.current.time),
        };

        let result = track.sample(current_index, current_time).unwrap_or(default);

        if track.global_sequence().is_none() && self.blend_factor < 0.999 {
            if let Some(next_index) = self.next.sequence_index {
                let next_result = track.sample(next_index, self.next.time).unwrap_or(default);
                return next_result.lerp(result, self.blend_factor);
            }
        }

        result
    }

    /// Bones are processed in index order: a parent always precedes its children, so the parent matrix of this frame is
    /// already known.
    fn evaluate(&mut self) {
        for index in 0..self.colors.len() {
            let color = &self.colors[index];
            let rgb = self.sample(&color.color, Vec3::ONE);
            let alpha = self.sample(&color.alpha, 1.0);
            self.color_values[index] = rgb.extend(alpha);
        }

        for index in 0..self.texture_weights.len() {
            self.texture_weight_values[index] = self.sample(&self.texture_weights[index], 1.0);
        }

        for index in 0..self.texture_transforms.len() {
            let transform = &self.texture_transforms[index];
            let translation = self.sample(&transform.translation, Vec3::ZERO);
            let rotation = self.sample(&transform.rotation, Quat::IDENTITY).normalize();
            let scaling = self.sample(&transform.scaling, Vec3::ONE);

            self.texture_matrices[index] = Mat4::from_translation(translation)
                * Mat4::from_translation(TEXTURE_PIVOT)
                * Mat4::from_scale_rotation_translation(scaling, rotation, Vec3::ZERO)
                * Mat4::from_translation(-TEXTURE_PIVOT);
        }

        for index in 0..self.bones.len() {
            let bone = &self.bones[index];
            let translation = self.sample(&bone.translation, Vec3::ZERO);
            let rotation = self.sample(&bone.rotation, Quat::IDENTITY).normalize();
            let scaling = self.sample(&bone.scaling, Vec3::ONE);

            let local = Mat4::from_translation(bone.pivot)
                * Mat4::from_scale_rotation_translation(scaling, rotation, translation)
                * Mat4::from_translation(-bone.pivot);

            let world = match bone.parent {
                Some(parent) => self.bone_matrices[parent] * local,
                None => local,
            };
            self.bone_matrices[index] = world;
        }
    }

    pub fn bone_matrices(&self) -> &[Mat4] {
        &self.bone_matrices
    }

    pub fn colors(&self) -> &[Vec4] {
        &self.color_values
    }

    pub fn texture_weights(&self) -> &[f32] {
        &self.texture_weight_values
    }

    pub fn texture_matrices(&self) -> &[Mat4] {
        &self.texture_matrices
    }

    pub fn blend_factor(&self) -> f32 {
        self.blend_factor
    }

    pub fn current_sequence(&self) -> Option<usize> {
        self.current.sequence_index
    }

    pub fn current_time(&self) -> f64 {
        self.current.time
    }
}
