//! Camera state, derived matrices and the per-view GPU uniform.
//!
//! The camera is treated like a model with a world matrix; the view matrix is
//! the inverse of that world matrix. Matrices are never cached: every accessor
//! rebuilds them from the current position, rotation and lens settings.

use cgmath::{Matrix4, Rad, SquareMatrix, Vector3, Zero};
use wgpu::util::DeviceExt;
use winit::keyboard::KeyCode;

use crate::{
    data_structures::transform::{MOVEMENT_SPEED, ROTATION_SPEED, Transform, local_axis},
    input::Input,
};

/// Width / height used by every perspective projection.
pub const ASPECT_RATIO: f32 = 1.33;

/// Key bindings for [`Camera::control`].
#[derive(Debug, Clone, Copy)]
pub struct CameraControls {
    pub turn_up: KeyCode,
    pub turn_down: KeyCode,
    pub turn_left: KeyCode,
    pub turn_right: KeyCode,
    pub move_forward: KeyCode,
    pub move_backward: KeyCode,
    pub move_left: KeyCode,
    pub move_right: KeyCode,
}

impl Default for CameraControls {
    fn default() -> Self {
        Self {
            turn_up: KeyCode::KeyW,
            turn_down: KeyCode::KeyS,
            turn_left: KeyCode::KeyA,
            turn_right: KeyCode::KeyD,
            move_forward: KeyCode::KeyE,
            move_backward: KeyCode::KeyQ,
            move_left: KeyCode::KeyZ,
            move_right: KeyCode::KeyX,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Vector3<f32>,
    /// Euler angles in radians
    pub rotation: Vector3<f32>,
    pub fov: Rad<f32>,
    pub near_clip: f32,
    pub far_clip: f32,
}

impl Camera {
    pub fn new(
        position: Vector3<f32>,
        rotation: Vector3<f32>,
        fov: Rad<f32>,
        near_clip: f32,
        far_clip: f32,
    ) -> Self {
        Self {
            position,
            rotation,
            fov,
            near_clip,
            far_clip,
        }
    }

    pub fn world_matrix(&self) -> Matrix4<f32> {
        Transform {
            position: self.position,
            rotation: self.rotation,
            ..Default::default()
        }
        .to_matrix()
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        // A rotation followed by a translation is always invertible
        self.world_matrix()
            .invert()
            .unwrap_or_else(Matrix4::identity)
    }

    pub fn projection_matrix(&self) -> Matrix4<f32> {
        perspective_lh(self.fov, ASPECT_RATIO, self.near_clip, self.far_clip)
    }

    pub fn view_projection_matrix(&self) -> Matrix4<f32> {
        self.projection_matrix() * self.view_matrix()
    }

    /// Turn and move the camera with held keys. Motion scales with `dt` seconds.
    ///
    /// Movement follows the local axes of the world matrix as it was on entry,
    /// so turning and moving in the same frame moves along the old heading.
    pub fn control(&mut self, input: &mut Input, dt: f32, keys: &CameraControls) {
        let world = self.world_matrix();

        if input.key_held(keys.turn_down) {
            self.rotation.x += ROTATION_SPEED * dt;
        }
        if input.key_held(keys.turn_up) {
            self.rotation.x -= ROTATION_SPEED * dt;
        }
        if input.key_held(keys.turn_right) {
            self.rotation.y += ROTATION_SPEED * dt;
        }
        if input.key_held(keys.turn_left) {
            self.rotation.y -= ROTATION_SPEED * dt;
        }

        let right = local_axis(&world, 0) * MOVEMENT_SPEED * dt;
        if input.key_held(keys.move_right) {
            self.position += right;
        }
        if input.key_held(keys.move_left) {
            self.position -= right;
        }

        let forward = local_axis(&world, 2) * MOVEMENT_SPEED * dt;
        if input.key_held(keys.move_forward) {
            self.position += forward;
        }
        if input.key_held(keys.move_backward) {
            self.position -= forward;
        }
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(
            Vector3::zero(),
            Vector3::zero(),
            Rad(std::f32::consts::FRAC_PI_4),
            0.1,
            10000.0,
        )
    }
}

/// Left-handed perspective projection mapping depth to `[0, 1]`.
pub fn perspective_lh(fov: Rad<f32>, aspect: f32, near: f32, far: f32) -> Matrix4<f32> {
    let y_scale = 1.0 / (fov.0 / 2.0).tan();
    let x_scale = y_scale / aspect;
    let q = far / (far - near);
    #[rustfmt::skip]
    let projection = Matrix4::new(
        x_scale, 0.0,     0.0,       0.0,
        0.0,     y_scale, 0.0,       0.0,
        0.0,     0.0,     q,         1.0,
        0.0,     0.0,     -near * q, 0.0,
    );
    projection
}

/// Matrices of one view as the shaders see them.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ViewUniform {
    view: [[f32; 4]; 4],
    projection: [[f32; 4]; 4],
    view_projection: [[f32; 4]; 4],
    position: [f32; 3],
    // Due to uniforms requiring 16 byte (4 float) spacing, we need to use a padding field here
    _padding: u32,
}

impl ViewUniform {
    pub fn new() -> Self {
        let identity: [[f32; 4]; 4] = Matrix4::<f32>::identity().into();
        Self {
            view: identity,
            projection: identity,
            view_projection: identity,
            position: [0.0; 3],
            _padding: 0,
        }
    }

    pub fn from_matrices(
        view: Matrix4<f32>,
        projection: Matrix4<f32>,
        position: Vector3<f32>,
    ) -> Self {
        Self {
            view: view.into(),
            projection: projection.into(),
            view_projection: (projection * view).into(),
            position: position.into(),
            _padding: 0,
        }
    }

    pub fn view_projection(&self) -> Matrix4<f32> {
        self.view_projection.into()
    }

    pub fn update_view_proj(&mut self, camera: &Camera) {
        *self = Self::from_matrices(
            camera.view_matrix(),
            camera.projection_matrix(),
            camera.position,
        );
    }
}

impl Default for ViewUniform {
    fn default() -> Self {
        Self::new()
    }
}

/// GPU side of one view: the uniform buffer and its bind group.
#[derive(Debug)]
pub struct ViewResources {
    pub uniform: ViewUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

impl ViewResources {
    pub fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, label: &str) -> Self {
        let uniform = ViewUniform::new();
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} View Buffer")),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some(&format!("{label} view_bind_group")),
        });
        Self {
            uniform,
            buffer,
            bind_group,
        }
    }

    pub fn write(&mut self, queue: &wgpu::Queue, uniform: ViewUniform) {
        self.uniform = uniform;
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
    }
}

pub fn mk_view_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
        label: Some("view_bind_group_layout"),
    })
}

#[cfg(test)]
mod tests {
    use cgmath::{InnerSpace, Vector4};

    use super::*;

    const EPSILON: f32 = 1e-4;

    fn assert_matrix_eq(actual: Matrix4<f32>, expected: Matrix4<f32>) {
        let actual: [[f32; 4]; 4] = actual.into();
        let expected: [[f32; 4]; 4] = expected.into();
        for (a, e) in actual.iter().flatten().zip(expected.iter().flatten()) {
            assert!((a - e).abs() < EPSILON, "{actual:?} != {expected:?}");
        }
    }

    #[test]
    fn camera_at_origin_has_identity_matrices() {
        let camera = Camera::default();
        assert_eq!(camera.world_matrix(), Matrix4::identity());
        assert_eq!(camera.view_matrix(), Matrix4::identity());
    }

    #[test]
    fn matrices_are_stable_between_calls() {
        let camera = Camera::new(
            Vector3::new(40.0, 30.0, -90.0),
            Vector3::new(0.14, -0.31, 0.05),
            Rad(0.9),
            0.1,
            1000.0,
        );
        assert_eq!(camera.view_matrix(), camera.view_matrix());
        assert_eq!(camera.projection_matrix(), camera.projection_matrix());
        assert_eq!(camera.view_projection_matrix(), camera.view_projection_matrix());
    }

    #[test]
    fn view_is_inverse_of_world() {
        let poses = [
            (Vector3::new(40.0, 30.0, -90.0), Vector3::new(0.14, -0.31, 0.0)),
            (Vector3::new(-5.0, 0.0, 12.5), Vector3::new(1.2, 2.9, -0.7)),
            (Vector3::new(0.0, 100.0, 0.0), Vector3::new(-1.5, 0.0, 3.0)),
        ];
        for (position, rotation) in poses {
            let camera = Camera {
                position,
                rotation,
                ..Default::default()
            };
            assert_matrix_eq(camera.view_matrix() * camera.world_matrix(), Matrix4::identity());
        }
    }

    #[test]
    fn matrices_follow_position_changes() {
        let mut camera = Camera::default();
        let before = camera.view_matrix();
        camera.position = Vector3::new(1.0, 2.0, 3.0);
        assert_ne!(camera.view_matrix(), before);
        let eye = camera.view_matrix() * Vector4::new(1.0, 2.0, 3.0, 1.0);
        assert!(eye.truncate().magnitude() < EPSILON);
    }

    #[test]
    fn projection_maps_clip_planes_to_unit_depth() {
        let camera = Camera::default();
        let projection = camera.projection_matrix();
        let near = projection * Vector4::new(0.0, 0.0, camera.near_clip, 1.0);
        let far = projection * Vector4::new(0.0, 0.0, camera.far_clip, 1.0);
        assert!((near.z / near.w).abs() < EPSILON);
        assert!((far.z / far.w - 1.0).abs() < EPSILON);
    }

    #[test]
    fn move_forward_steps_along_local_z() {
        let mut camera = Camera::default();
        let mut input = Input::new();
        let keys = CameraControls::default();
        input.key_down_event(keys.move_forward);
        camera.control(&mut input, 1.0, &keys);
        assert_eq!(camera.position, Vector3::new(0.0, 0.0, MOVEMENT_SPEED));
        assert_eq!(camera.rotation, Vector3::zero());
    }

    #[test]
    fn turning_and_strafing() {
        let mut camera = Camera::default();
        let mut input = Input::new();
        let keys = CameraControls::default();
        input.key_down_event(keys.turn_right);
        input.key_down_event(keys.move_right);
        camera.control(&mut input, 0.5, &keys);
        // Strafing uses the heading from before this frame's turn
        assert_eq!(camera.position, Vector3::new(MOVEMENT_SPEED * 0.5, 0.0, 0.0));
        assert_eq!(camera.rotation.y, ROTATION_SPEED * 0.5);

        input.key_up_event(keys.turn_right);
        input.key_up_event(keys.move_right);
        input.key_down_event(keys.move_backward);
        camera.control(&mut input, 1.0, &keys);
        let heading = local_axis(&camera.world_matrix(), 2);
        let expected = Vector3::new(MOVEMENT_SPEED * 0.5, 0.0, 0.0) - heading * MOVEMENT_SPEED;
        assert!((camera.position - expected).magnitude() < EPSILON);
    }

    #[test]
    fn view_uniform_combines_view_and_projection() {
        let camera = Camera {
            position: Vector3::new(3.0, -2.0, 8.0),
            ..Default::default()
        };
        let mut uniform = ViewUniform::new();
        uniform.update_view_proj(&camera);
        let expected: [[f32; 4]; 4] = camera.view_projection_matrix().into();
        assert_eq!(uniform.view_projection, expected);
        assert_eq!(uniform.position, [3.0, -2.0, 8.0]);
    }
}
