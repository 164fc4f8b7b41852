//! Scene-wide and per-object uniforms, laid out as `lit.wgsl` reads them.

use cgmath::{Matrix4, SquareMatrix, Vector3};
use wgpu::util::DeviceExt;

use crate::data_structures::light::{Light, LightRaw, MAX_LIGHTS};

/// Object flag: scroll the texture coordinates.
pub const EFFECT_MOVER: u32 = 1;
/// Object flag: ripple the surface.
pub const EFFECT_WIGGLE: u32 = 2;

/// Depth offset applied when comparing against the shadow map.
pub const SHADOW_BIAS: f32 = 0.0005;

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SceneUniform {
    pub shadow_view_projection: [[f32; 4]; 4],
    pub lights: [LightRaw; MAX_LIGHTS],
    pub ambient: [f32; 3],
    pub specular_power: f32,
    pub parallax_depth: f32,
    pub mover: f32,
    pub wiggle: f32,
    pub wiggle_amplitude: f32,
    pub light_count: u32,
    pub enabled_effects: u32,
    pub shadow_bias: f32,
    _padding: u32,
}

impl SceneUniform {
    pub fn new() -> Self {
        Self {
            shadow_view_projection: Matrix4::<f32>::identity().into(),
            shadow_bias: SHADOW_BIAS,
            ..bytemuck::Zeroable::zeroed()
        }
    }

    /// Copy the first [`MAX_LIGHTS`] lights. Later slots are zeroed.
    pub fn set_lights(&mut self, lights: &[Light]) {
        self.lights = [bytemuck::Zeroable::zeroed(); MAX_LIGHTS];
        for (slot, light) in self.lights.iter_mut().zip(lights) {
            *slot = light.to_raw();
        }
        self.light_count = lights.len().min(MAX_LIGHTS) as u32;
    }
}

impl Default for SceneUniform {
    fn default() -> Self {
        Self::new()
    }
}

/// The effect parameters of [`SceneUniform`] that deform vertices, for the
/// depth-only pass which cannot bind the scene group.
#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct EffectsUniform {
    pub wiggle: f32,
    pub wiggle_amplitude: f32,
    pub enabled_effects: u32,
    _padding: u32,
}

impl EffectsUniform {
    pub fn from_scene(scene: &SceneUniform) -> Self {
        Self {
            wiggle: scene.wiggle,
            wiggle_amplitude: scene.wiggle_amplitude,
            enabled_effects: scene.enabled_effects,
            _padding: 0,
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ObjectUniform {
    pub world: [[f32; 4]; 4],
    pub tint: [f32; 3],
    pub effects: u32,
}

impl ObjectUniform {
    pub fn new(world: Matrix4<f32>, tint: Vector3<f32>, effects: u32) -> Self {
        Self {
            world: world.into(),
            tint: tint.into(),
            effects,
        }
    }
}

/// Uniform buffer and bind group of one object.
#[derive(Debug)]
pub struct ObjectResources {
    pub uniform: ObjectUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

impl ObjectResources {
    pub fn new(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        uniform: ObjectUniform,
        label: &str,
    ) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} Object Buffer")),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some(&format!("{label} object_bind_group")),
        });
        Self {
            uniform,
            buffer,
            bind_group,
        }
    }

    pub fn write(&mut self, queue: &wgpu::Queue, uniform: ObjectUniform) {
        self.uniform = uniform;
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
    }
}

#[cfg(test)]
mod tests {
    use cgmath::{Rad, Zero};

    use super::*;
    use crate::data_structures::light::{LightAnimation, LightKind};

    #[test]
    fn uniform_sizes_match_shader_structs() {
        // mat4 + 8 lights of 48 bytes + 4 rows of scalars
        assert_eq!(std::mem::size_of::<SceneUniform>(), 64 + 8 * 48 + 48);
        assert_eq!(std::mem::size_of::<SceneUniform>() % 16, 0);
        assert_eq!(std::mem::size_of::<ObjectUniform>(), 80);
        assert_eq!(std::mem::size_of::<EffectsUniform>(), 16);
    }

    #[test]
    fn depth_pass_sees_the_scene_wiggle() {
        let mut scene = SceneUniform::new();
        scene.wiggle = 1.5;
        scene.wiggle_amplitude = 0.3;
        scene.enabled_effects = EFFECT_WIGGLE;
        let effects = EffectsUniform::from_scene(&scene);
        assert_eq!(effects.wiggle, 1.5);
        assert_eq!(effects.wiggle_amplitude, 0.3);
        assert_eq!(effects.enabled_effects, EFFECT_WIGGLE);
    }

    #[test]
    fn effect_flags_are_distinct_bits() {
        assert_eq!(EFFECT_MOVER & EFFECT_WIGGLE, 0);
        assert_eq!((EFFECT_MOVER | EFFECT_WIGGLE).count_ones(), 2);
    }

    #[test]
    fn lights_beyond_capacity_are_dropped() {
        let light = Light::new(
            LightKind::Spot { cone: Rad(0.52) },
            Vector3::new(1.0, 1.0, 1.0),
            1.0,
            Vector3::unit_z(),
            LightAnimation::None,
        );
        let lights = vec![light; MAX_LIGHTS + 3];
        let mut uniform = SceneUniform::new();
        uniform.set_lights(&lights);
        assert_eq!(uniform.light_count, MAX_LIGHTS as u32);

        uniform.set_lights(&lights[..2]);
        assert_eq!(uniform.light_count, 2);
        assert_eq!(uniform.lights[2], <LightRaw as bytemuck::Zeroable>::zeroed());
    }

    #[test]
    fn new_scene_uniform_has_identity_shadow_matrix() {
        let uniform = SceneUniform::new();
        let identity: [[f32; 4]; 4] = Matrix4::<f32>::identity().into();
        assert_eq!(uniform.shadow_view_projection, identity);
        assert_eq!(uniform.shadow_bias, SHADOW_BIAS);
        assert_eq!(uniform.light_count, 0);
        let object = ObjectUniform::new(Matrix4::identity(), Vector3::zero(), EFFECT_WIGGLE);
        assert_eq!(object.effects, EFFECT_WIGGLE);
    }
}
