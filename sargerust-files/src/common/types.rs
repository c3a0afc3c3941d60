use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct C3Vector {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl C3Vector {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct C2Vector {
    pub x: f32,
    pub y: f32,
}

// could also call this CBgra, but we keep consistency with WoWDevWiki
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CImVector {
    pub b: u8,
    pub g: u8,
    pub r: u8,
    pub a: u8,
}

impl From<u32> for CImVector {
    fn from(value: u32) -> Self {
        let [b, g, r, a] = value.to_le_bytes();
        CImVector { b, g, r, a }
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CAaBox {
    pub min: C3Vector,
    pub max: C3Vector,
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct C4Quaternion {
    /// https://wowdev.wiki/WMO#MODD_chunk
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Default for C4Quaternion {
    fn default() -> Self {
        C4Quaternion {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            w: 1.0,
        }
    }
}

/// An animated value: one list of keyframe timestamps and values per animation sequence.
/// Tracks that reference a global sequence ignore the sequence index and use the list at 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct M2Track<T> {
    /// 0 = none, 1 = linear, 2 = bezier, 3 = hermite
    #[serde(default)]
    pub interpolation_type: u16,
    /// -1 when the track runs on the sequence clock
    #[serde(default = "no_global_sequence")]
    pub global_sequence: i16,
    #[serde(default)]
    pub timestamps: Vec<Vec<u32>>,
    #[serde(default)]
    pub values: Vec<Vec<T>>,
}

fn no_global_sequence() -> i16 {
    -1
}

impl<T> Default for M2Track<T> {
    fn default() -> Self {
        M2Track {
            interpolation_type: 0,
            global_sequence: -1,
            timestamps: vec![],
            values: vec![],
        }
    }
}

impl<T> M2Track<T> {
    /// A single keyframe at t = 0 for the first sequence.
    pub fn constant(value: T) -> Self {
        M2Track {
            interpolation_type: 0,
            global_sequence: -1,
            timestamps: vec![vec![0]],
            values: vec![vec![value]],
        }
    }

    pub fn is_animated(&self) -> bool {
        self.timestamps.iter().any(|t| !t.is_empty())
    }
}
