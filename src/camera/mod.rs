//! Camera payloads. A camera is a scene-graph node whose payload carries
//! the projection; the view matrix is the inverse of the node's world
//! matrix.

use crate::math::Matrix4;

/// Projection parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    /// Perspective projection. `fov` is the vertical field of view in
    /// degrees.
    Perspective {
        /// Vertical field of view in degrees.
        fov: f32,
        /// Width / height.
        aspect: f32,
        /// Near clip distance.
        near: f32,
        /// Far clip distance.
        far: f32,
    },
    /// Orthographic projection.
    Orthographic {
        /// Left clip plane.
        left: f32,
        /// Right clip plane.
        right: f32,
        /// Top clip plane.
        top: f32,
        /// Bottom clip plane.
        bottom: f32,
        /// Near clip distance.
        near: f32,
        /// Far clip distance.
        far: f32,
    },
}

/// Camera payload: projection plus the derived matrices the renderer
/// consumes.
#[derive(Debug, Clone)]
pub struct Camera {
    /// Projection parameters.
    pub projection: Projection,
    /// Projection matrix, derived from `projection`.
    pub projection_matrix: Matrix4,
    /// Inverse of the camera node's world matrix; refreshed by the
    /// renderer every frame.
    pub matrix_world_inverse: Matrix4,
}

impl Camera {
    /// Perspective camera. `fov` in degrees.
    pub fn perspective(fov: f32, aspect: f32, near: f32, far: f32) -> Self {
        let mut camera = Self {
            projection: Projection::Perspective { fov, aspect, near, far },
            projection_matrix: Matrix4::IDENTITY,
            matrix_world_inverse: Matrix4::IDENTITY,
        };
        camera.update_projection_matrix();
        camera
    }

    /// Orthographic camera.
    pub fn orthographic(left: f32, right: f32, top: f32, bottom: f32, near: f32, far: f32) -> Self {
        let mut camera = Self {
            projection: Projection::Orthographic { left, right, top, bottom, near, far },
            projection_matrix: Matrix4::IDENTITY,
            matrix_world_inverse: Matrix4::IDENTITY,
        };
        camera.update_projection_matrix();
        camera
    }

    /// Recompute the projection matrix from the projection parameters.
    pub fn update_projection_matrix(&mut self) {
        self.projection_matrix = match self.projection {
            Projection::Perspective { fov, aspect, near, far } => {
                Matrix4::make_perspective(fov, aspect, near, far)
            }
            Projection::Orthographic { left, right, top, bottom, near, far } => {
                Matrix4::make_orthographic(left, right, top, bottom, near, far)
            }
        };
    }

    /// Near clip distance.
    pub fn near(&self) -> f32 {
        match self.projection {
            Projection::Perspective { near, .. } => near,
            Projection::Orthographic { near, .. } => near,
        }
    }

    /// Far clip distance.
    pub fn far(&self) -> f32 {
        match self.projection {
            Projection::Perspective { far, .. } => far,
            Projection::Orthographic { far, .. } => far,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vector3;

    #[test]
    fn test_perspective_projection_depth_range() {
        let camera = Camera::perspective(60.0, 1.0, 1.0, 100.0);
        let p = camera.projection_matrix.transform_point(&Vector3::new(0.0, 0.0, -1.0));
        assert!((p.z + 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_orthographic_units() {
        let camera = Camera::orthographic(-2.0, 2.0, 2.0, -2.0, 0.1, 10.0);
        let p = camera.projection_matrix.transform_point(&Vector3::new(2.0, 0.0, -1.0));
        assert!((p.x - 1.0).abs() < 1e-5);
    }
}
