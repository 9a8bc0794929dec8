//! Perspective camera for the particle pass

use glam::{Mat4, Vec2, Vec3};
use spirit_core::Pointer;

/// Perspective camera looking at a target point
#[derive(Clone, Debug)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    /// Vertical field of view in radians
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
    /// Viewport size in physical pixels
    pub viewport: Vec2,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 150.0),
            target: Vec3::ZERO,
            fov_y: 60f32.to_radians(),
            near: 0.1,
            far: 10000.0,
            viewport: Vec2::new(800.0, 600.0),
        }
    }
}

impl Camera {
    /// Set the viewport size in pixels
    pub fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport = Vec2::new(width as f32, height as f32);
        self
    }

    pub fn aspect(&self) -> f32 {
        self.viewport.x / self.viewport.y.max(1.0)
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, Vec3::Y)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect(), self.near, self.far)
    }

    pub fn view_proj(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Intersect the ray through a normalized device coordinate with the
    /// `z = 0` plane
    pub fn ray_to_plane(&self, ndc: Vec2) -> Option<Vec3> {
        let inverse = self.view_proj().inverse();
        let near = inverse.project_point3(ndc.extend(0.0));
        let far = inverse.project_point3(ndc.extend(1.0));
        let dir = far - near;
        if dir.z.abs() < f32::EPSILON {
            return None;
        }

        let t = -near.z / dir.z;
        (t >= 0.0).then(|| near + dir * t)
    }

    /// Pointer for a cursor at pixel `(x, y)`, origin top-left
    pub fn pointer_at(&self, x: f32, y: f32) -> Option<Pointer> {
        let ndc = Vec2::new(
            x / self.viewport.x * 2.0 - 1.0,
            1.0 - y / self.viewport.y * 2.0,
        );
        self.ray_to_plane(ndc).map(Pointer::at)
    }
}
