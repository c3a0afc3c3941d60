use glam::{Quat, Vec3};
use sargerust_files::common::types::M2Track;

pub trait Lerp: Copy {
    fn lerp(self, other: Self, t: f32) -> Self;
}

impl Lerp for f32 {
    fn lerp(self, other: Self, t: f32) -> Self {
        self + (other - self) * t
    }
}

impl Lerp for Vec3 {
    fn lerp(self, other: Self, t: f32) -> Self {
        Vec3::lerp(self, other, t)
    }
}

impl Lerp for Quat {
    fn lerp(self, other: Self, t: f32) -> Self {
        self.slerp(other, t)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Interpolation {
    None,
    Linear,
}

impl From<u16> for Interpolation {
    fn from(value: u16) -> Self {
        match value {
            0 => Interpolation::None,
            // TODO: bezier (2) and hermite (3) need the in/out tangents, which are not decoded yet.
            _ => Interpolation::Linear,
        }
    }
}

/// Keyframes of one animated value, one list of keys per sequence.
#[derive(Debug, Clone)]
pub struct AnimationTrack<T> {
    interpolation: Interpolation,
    global_sequence: Option<usize>,
    timestamps: Vec<Vec<u32>>,
    values: Vec<Vec<T>>,
}

impl<T: Lerp> AnimationTrack<T> {
    pub fn from_m2<S>(track: &M2Track<S>, convert: impl Fn(&S) -> T) -> Self {
        let (timestamps, values): (Vec<Vec<u32>>, Vec<Vec<T>>) = track
            .timestamps
            .iter()
            .zip(track.values.iter())
            .map(|(times, values)| {
                // mismatching key counts are cut to the shorter list
                let count = times.len().min(values.len());
                (
                    times[..count].to_vec(),
                    values[..count].iter().map(&convert).collect::<Vec<T>>(),
                )
            })
            .unzip();

        AnimationTrack {
            interpolation: track.interpolation_type.into(),
            global_sequence: usize::try_from(track.global_sequence).ok(),
            timestamps,
            values,
        }
    }

    pub fn global_sequence(&self) -> Option<usize> {
        self.global_sequence
    }

    /// The value at `time` (milliseconds) of the sequence `animation_index`. Tracks that don't have keys for that
    /// sequence use the keys of the first one, and None means the track is not animated at all.
    pub fn sample(&self, animation_index: usize, time: f64) -> Option<T> {
        let index = if animation_index < self.timestamps.len() {
            animation_index
        } else {
            0
        };

        let times = self.timestamps.get(index)?;
        let values = self.values.get(index)?;
        let last = times.len().checked_sub(1)?;

        if last == 0 || time >= times[last] as f64 {
            return Some(values[last]);
        }

        // the amount of keys at or before time
        let next = times.partition_point(|&key| key as f64 <= time);
        if next == 0 {
            return Some(values[0]);
        }

        let previous = next - 1;
        match self.interpolation {
            Interpolation::None => Some(values[previous]),
            Interpolation::Linear => {
                let (time1, time2) = (times[previous] as f64, times[next] as f64);
                let t = ((time - time1) / (time2 - time1)) as f32;
                Some(values[previous].lerp(values[next], t))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;
    use sargerust_files::common::types::{C3Vector, M2Track};

    use crate::rendering::animation::track::AnimationTrack;

    fn track(interpolation_type: u16) -> AnimationTrack<Vec3> {
        let m2 = M2Track {
            interpolation_type,
            global_sequence: -1,
            timestamps: vec![vec![0, 100, 200]],
            values: vec![vec![
                C3Vector::new(0.0, 0.0, 0.0),
                C3Vector::new(10.0, 0.0, 0.0),
                C3Vector::new(10.0, 20.0, 0.0),
            ]],
        };

        AnimationTrack::from_m2(&m2, |v| Vec3::new(v.x, v.y, v.z))
    }

    #[test]
    fn linear_tracks_interpolate_between_keys() {
        let track = track(1);
        assert_eq!(track.sample(0, 50.0), Some(Vec3::new(5.0, 0.0, 0.0)));
        assert_eq!(track.sample(0, 150.0), Some(Vec3::new(10.0, 10.0, 0.0)));
        // past the last key, the last value is held
        assert_eq!(track.sample(0, 500.0), Some(Vec3::new(10.0, 20.0, 0.0)));
    }

    #[test]
    fn stepped_tracks_hold_the_previous_key() {
        let track = track(0);
        assert_eq!(track.sample(0, 99.0), Some(Vec3::ZERO));
        assert_eq!(track.sample(0, 100.0), Some(Vec3::new(10.0, 0.0, 0.0)));
    }

    #[test]
    fn missing_sequences_fall_back_to_the_first_one() {
        let track = track(1);
        assert_eq!(track.sample(3, 50.0), track.sample(0, 50.0));

        let empty = AnimationTrack::<Vec3>::from_m2(&M2Track::<C3Vector>::default(), |_| Vec3::ONE);
        assert_eq!(empty.sample(0, 50.0), None);
    }
}
