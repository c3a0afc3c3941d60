use glam::{Mat4, Vec3, Vec4};
use sargerust_files::common::types::{C3Vector, CAaBox};

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Aabb {
    /// The neutral element of `union`
    pub const EMPTY: Aabb = Aabb {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    pub fn new(min: Vec3, max: Vec3) -> Self {
        Aabb { min, max }
    }

    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Self {
        points.into_iter().fold(Self::EMPTY, |aabb, point| Aabb {
            min: aabb.min.min(point),
            max: aabb.max.max(point),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.min.cmpgt(self.max).any()
    }

    /// Empty, or collapsed into a single point (as unset bounding boxes in asset files are)
    pub fn is_degenerate(&self) -> bool {
        self.is_empty() || self.min == self.max
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn extents(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn diagonal(&self) -> f32 {
        self.extents().length()
    }

    pub fn corners(&self) -> [Vec3; 8] {
        let (min, max) = (self.min, self.max);
        [
            Vec3::new(min.x, min.y, min.z),
            Vec3::new(max.x, min.y, min.z),
            Vec3::new(min.x, max.y, min.z),
            Vec3::new(max.x, max.y, min.z),
            Vec3::new(min.x, min.y, max.z),
            Vec3::new(max.x, min.y, max.z),
            Vec3::new(min.x, max.y, max.z),
            Vec3::new(max.x, max.y, max.z),
        ]
    }

    /// The axis aligned box enclosing this box after transforming it.
    pub fn transform(&self, matrix: &Mat4) -> Aabb {
        if self.is_empty() {
            return *self;
        }

        Aabb::from_points(self.corners().map(|corner| matrix.transform_point3(corner)))
    }

    /// The distance between `point` and the center of the box.
    pub fn center_distance(&self, point: Vec3) -> f32 {
        self.center().distance(point)
    }
}

impl From<&CAaBox> for Aabb {
    fn from(value: &CAaBox) -> Self {
        Aabb::new(vec3(&value.min), vec3(&value.max))
    }
}

#[inline]
pub fn vec3(value: &C3Vector) -> Vec3 {
    Vec3::new(value.x, value.y, value.z)
}

/// A plane in Hessian normal form, the normal pointing into the inside.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Plane {
    pub normal: Vec3,
    pub d: f32,
}

impl Plane {
    fn from_vec4(value: Vec4) -> Self {
        let length = value.truncate().length();
        Plane {
            normal: value.truncate() / length,
            d: value.w / length,
        }
    }

    pub fn new(normal: Vec3, point_on_plane: Vec3) -> Self {
        let normal = normal.normalize();
        Plane {
            normal,
            d: -normal.dot(point_on_plane),
        }
    }

    pub fn signed_distance(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.d
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Frustum {
    pub planes: [Plane; 6],
}

impl Frustum {
    /// Gribb/Hartmann plane extraction for a projection with a [0, 1] depth range (as glam's perspective_rh).
    pub fn from_clip_from_world(clip_from_world: &Mat4) -> Self {
        let row0 = clip_from_world.row(0);
        let row1 = clip_from_world.row(1);
        let row2 = clip_from_world.row(2);
        let row3 = clip_from_world.row(3);

        Frustum {
            planes: [
                Plane::from_vec4(row3 + row0), // left
                Plane::from_vec4(row3 - row0), // right
                Plane::from_vec4(row3 + row1), // bottom
                Plane::from_vec4(row3 - row1), // top
                Plane::from_vec4(row2),        // near
                Plane::from_vec4(row3 - row2), // far
            ],
        }
    }

    pub fn from_planes(planes: [Plane; 6]) -> Self {
        Frustum { planes }
    }

    /// Conservative: a box is only rejected when it is fully outside of at least one plane, so boxes straddling a
    /// plane count as contained.
    pub fn contains_aabb(&self, aabb: &Aabb) -> bool {
        self.planes.iter().all(|plane| {
            // the corner that is furthest along the plane normal
            let positive = Vec3::select(plane.normal.cmpge(Vec3::ZERO), aabb.max, aabb.min);
            plane.signed_distance(positive) >= 0.0
        })
    }

    pub fn contains_point(&self, point: Vec3) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.signed_distance(point) >= 0.0)
    }
}

#[cfg(test)]
mod tests {
    use glam::{Mat4, Vec3};

    use super::*;

    fn camera_looking_down_x() -> Frustum {
        let view = Mat4::look_at_rh(Vec3::ZERO, Vec3::X, Vec3::Z);
        let projection = Mat4::perspective_rh(90f32.to_radians(), 1.0, 1.0, 1000.0);
        Frustum::from_clip_from_world(&(projection * view))
    }

    #[test]
    fn box_fully_inside_is_visible() {
        let frustum = camera_looking_down_x();
        let aabb = Aabb::new(Vec3::new(100.0, -5.0, -5.0), Vec3::new(110.0, 5.0, 5.0));
        assert!(frustum.contains_aabb(&aabb));
    }

    #[test]
    fn box_behind_the_camera_is_culled() {
        let frustum = camera_looking_down_x();
        let aabb = Aabb::new(Vec3::new(-110.0, -5.0, -5.0), Vec3::new(-100.0, 5.0, 5.0));
        assert!(!frustum.contains_aabb(&aabb));

        let beyond_far = Aabb::new(Vec3::new(1100.0, -5.0, -5.0), Vec3::new(1200.0, 5.0, 5.0));
        assert!(!frustum.contains_aabb(&beyond_far));
    }

    #[test]
    fn box_straddling_a_plane_is_visible() {
        let frustum = camera_looking_down_x();
        // crosses the left plane (y = x) at x = 100
        let aabb = Aabb::new(Vec3::new(95.0, 90.0, -5.0), Vec3::new(105.0, 130.0, 5.0));
        assert!(frustum.contains_aabb(&aabb));
        assert!(!frustum.contains_point(Vec3::new(100.0, 130.0, 0.0)));
    }

    #[test]
    fn transformed_boxes_enclose_the_rotated_corners() {
        let aabb = Aabb::new(Vec3::new(-1.0, -2.0, 0.0), Vec3::new(1.0, 2.0, 1.0));
        let rotated = aabb.transform(&Mat4::from_rotation_z(90f32.to_radians()));

        assert!(rotated.min.abs_diff_eq(Vec3::new(-2.0, -1.0, 0.0), 1e-5));
        assert!(rotated.max.abs_diff_eq(Vec3::new(2.0, 1.0, 1.0), 1e-5));
        assert!(Aabb::EMPTY.transform(&Mat4::IDENTITY).is_empty());
    }
}
