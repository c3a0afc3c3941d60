use glam::{Mat4, Vec3};

use crate::rendering::common::geometry::Frustum;

/// What the camera hands to the scene every frame. The world space camera position and the frustum are derived from
/// the matrices.
#[derive(Debug, Copy, Clone)]
pub struct View {
    pub view_matrix: Mat4,
    pub projection_matrix: Mat4,
    pub clip_from_world: Mat4,
    pub camera_position: Vec3,
    pub frustum: Frustum,
    /// milliseconds since the last frame
    pub delta_time: f64,
}

impl View {
    pub fn new(view_matrix: Mat4, projection_matrix: Mat4, delta_time: f64) -> Self {
        let clip_from_world = projection_matrix * view_matrix;
        View {
            view_matrix,
            projection_matrix,
            clip_from_world,
            camera_position: view_matrix.inverse().w_axis.truncate(),
            frustum: Frustum::from_clip_from_world(&clip_from_world),
            delta_time,
        }
    }
}

/// A free flying camera, in world space (Z up).
#[derive(Debug, Copy, Clone)]
pub struct FlyCamera {
    pub location: Vec3,
    /// radians, 0 looks north (+X)
    pub yaw: f32,
    /// radians, positive looks up
    pub pitch: f32,
    pub fov_y: f32,
    pub aspect_ratio: f32,
    pub near: f32,
    pub far: f32,
}

impl FlyCamera {
    pub fn new(location: Vec3, yaw: f32) -> Self {
        FlyCamera {
            location,
            yaw,
            pitch: 0.0,
            fov_y: 60.0f32.to_radians(),
            aspect_ratio: 16.0 / 9.0,
            near: 0.5,
            far: 3000.0,
        }
    }

    pub fn forward(&self) -> Vec3 {
        Vec3::new(
            self.yaw.cos() * self.pitch.cos(),
            self.yaw.sin() * self.pitch.cos(),
            self.pitch.sin(),
        )
    }

    pub fn fly(&mut self, distance: f32) {
        self.location += self.forward() * distance;
    }

    pub fn view(&self, delta_time: f64) -> View {
        let view_matrix = Mat4::look_to_rh(self.location, self.forward(), Vec3::Z);
        let projection_matrix = Mat4::perspective_rh(self.fov_y, self.aspect_ratio, self.near, self.far);
        View::new(view_matrix, projection_matrix, delta_time)
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use crate::rendering::camera::FlyCamera;

    #[test]
    fn the_view_knows_where_the_camera_is() {
        let camera = FlyCamera::new(Vec3::new(100.0, -50.0, 20.0), 0.0);
        let view = camera.view(16.0);

        assert!(view.camera_position.abs_diff_eq(camera.location, 1e-3));
        assert!(view.frustum.contains_point(camera.location + Vec3::X * 10.0));
        assert!(!view.frustum.contains_point(camera.location - Vec3::X * 10.0));
    }
}
