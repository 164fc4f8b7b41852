//! Euler-angle transforms shared by cameras and models.
//!
//! Rotations are stored as three angles in radians and always composed in the
//! same order: a point is rotated about Z first, then X, then Y, then
//! translated. Models scale before rotating. The coordinate system is
//! left-handed (X right, Y up, Z forward).

use cgmath::{InnerSpace, Matrix4, Rad, Vector3, Zero};

/// Turn rate for key control in radians per second.
pub const ROTATION_SPEED: f32 = 2.0;
/// Movement rate for key control in units per second.
pub const MOVEMENT_SPEED: f32 = 50.0;

/// Position, Euler rotation and non-uniform scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vector3<f32>,
    pub rotation: Vector3<f32>,
    pub scale: Vector3<f32>,
}

impl Transform {
    pub fn new(position: Vector3<f32>, rotation: Vector3<f32>, scale: Vector3<f32>) -> Self {
        Self {
            position,
            rotation,
            scale,
        }
    }

    /// Rotation part only: Z, then X, then Y.
    pub fn rotation_matrix(&self) -> Matrix4<f32> {
        Matrix4::from_angle_y(Rad(self.rotation.y))
            * Matrix4::from_angle_x(Rad(self.rotation.x))
            * Matrix4::from_angle_z(Rad(self.rotation.z))
    }

    /// Full world matrix: scale, rotate (Z, X, Y), translate.
    pub fn to_matrix(&self) -> Matrix4<f32> {
        Matrix4::from_translation(self.position)
            * self.rotation_matrix()
            * Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }

    /// Orient the local Z axis along `direction`. Position and scale are kept.
    ///
    /// A zero direction leaves the rotation unchanged.
    pub fn face_direction(&mut self, direction: Vector3<f32>) {
        if direction.is_zero() {
            return;
        }
        let z = direction.normalize();
        // Pick a different up vector when looking straight up or down
        let up = if z.y.abs() > 0.999 {
            Vector3::unit_z()
        } else {
            Vector3::unit_y()
        };
        let x = up.cross(z).normalize();
        let y = z.cross(x);
        self.rotation = euler_from_axes(x, y, z);
    }

    /// Orient the local Z axis towards `point`.
    pub fn face_point(&mut self, point: Vector3<f32>) {
        self.face_direction(point - self.position);
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vector3::zero(),
            rotation: Vector3::zero(),
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }
}

/// Local axis `index` (0 = X, 1 = Y, 2 = Z) of a world matrix in world space.
pub fn local_axis(world: &Matrix4<f32>, index: usize) -> Vector3<f32> {
    world[index].truncate()
}

/// Decompose an orthonormal basis into Euler angles for the Z, X, Y order.
pub fn euler_from_axes(x: Vector3<f32>, y: Vector3<f32>, z: Vector3<f32>) -> Vector3<f32> {
    // z = (cos(rx) sin(ry), -sin(rx), cos(rx) cos(ry))
    let rx = (-z.y).clamp(-1.0, 1.0).asin();
    if z.y.abs() < 0.9999 {
        let ry = z.x.atan2(z.z);
        let rz = x.y.atan2(y.y);
        Vector3::new(rx, ry, rz)
    } else {
        // Gimbal lock: fold the Z rotation into Y
        let ry = (-x.z).atan2(x.x);
        Vector3::new(rx, ry, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use cgmath::{SquareMatrix, Vector4};

    use super::*;

    const EPSILON: f32 = 1e-4;

    fn assert_vec_eq(actual: Vector3<f32>, expected: Vector3<f32>) {
        assert!(
            (actual - expected).magnitude() < EPSILON,
            "{actual:?} != {expected:?}"
        );
    }

    #[test]
    fn default_transform_is_identity() {
        assert_eq!(Transform::default().to_matrix(), Matrix4::identity());
    }

    #[test]
    fn rotation_order_is_z_then_x_then_y() {
        let transform = Transform {
            rotation: Vector3::new(0.3, -1.1, 0.7),
            ..Default::default()
        };
        let point = Vector4::new(1.0, 2.0, 3.0, 1.0);
        let stepwise = Matrix4::from_angle_y(Rad(-1.1))
            * (Matrix4::from_angle_x(Rad(0.3)) * (Matrix4::from_angle_z(Rad(0.7)) * point));
        let composed = transform.to_matrix() * point;
        assert_vec_eq(composed.truncate(), stepwise.truncate());
    }

    #[test]
    fn scale_is_applied_before_translation() {
        let transform = Transform {
            position: Vector3::new(10.0, 0.0, 0.0),
            scale: Vector3::new(2.0, 3.0, 4.0),
            ..Default::default()
        };
        let moved = transform.to_matrix() * Vector4::new(1.0, 1.0, 1.0, 1.0);
        assert_vec_eq(moved.truncate(), Vector3::new(12.0, 3.0, 4.0));
    }

    #[test]
    fn face_direction_points_local_z() {
        let directions = [
            Vector3::new(0.0, 0.707107, -0.707107),
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(-3.0, -2.0, 5.0),
            Vector3::new(0.0, 0.0, -1.0),
            Vector3::new(0.0, -1.0, 0.0),
        ];
        for direction in directions {
            let mut transform = Transform {
                position: Vector3::new(4.0, 5.0, 6.0),
                ..Default::default()
            };
            transform.face_direction(direction);
            let z = local_axis(&transform.to_matrix(), 2);
            assert_vec_eq(z, direction.normalize());
            assert_eq!(transform.position, Vector3::new(4.0, 5.0, 6.0));
        }
    }

    #[test]
    fn face_point_looks_at_target() {
        let mut transform = Transform {
            position: Vector3::new(60.0, 20.0, -60.0),
            ..Default::default()
        };
        let target = Vector3::new(0.0, 0.0, 0.0);
        transform.face_point(target);
        let z = local_axis(&transform.to_matrix(), 2);
        assert_vec_eq(z, (target - transform.position).normalize());
    }

    #[test]
    fn euler_round_trip() {
        let transform = Transform {
            rotation: Vector3::new(0.4, 2.0, -0.9),
            ..Default::default()
        };
        let world = transform.rotation_matrix();
        let rotation = euler_from_axes(
            local_axis(&world, 0),
            local_axis(&world, 1),
            local_axis(&world, 2),
        );
        assert_vec_eq(rotation, transform.rotation);
    }
}
