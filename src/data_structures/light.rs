use cgmath::{InnerSpace, Rad, Vector3, Zero};

use crate::colour::{Hsl, hsl_to_rgb, rgb_to_hsl};

/// Most lights the shaders evaluate.
pub const MAX_LIGHTS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightKind {
    Point,
    /// Parallel light along the light's direction, without a position.
    Directional,
    /// Point light restricted to `cone`, the angle between the axis and
    /// the edge of the lit area.
    Spot { cone: Rad<f32> },
}

impl LightKind {
    fn id(&self) -> u32 {
        match self {
            LightKind::Point => 0,
            LightKind::Directional => 1,
            LightKind::Spot { .. } => 2,
        }
    }
}

/// How a light's colour changes over time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightAnimation {
    None,
    /// Intensity follows `|sin(t)|`.
    Pulse,
    /// Hue turns at `rate` degrees per second, scaled by `power`.
    HueRotate { rate: f32, power: f32 },
}

#[derive(Debug, Clone)]
pub struct Light {
    pub kind: LightKind,
    /// Colour before intensity and animation are applied.
    pub base_colour: Vector3<f32>,
    /// Current colour, what the shaders see.
    pub colour: Vector3<f32>,
    pub position: Vector3<f32>,
    /// Direction the light travels in; unused by point lights.
    pub direction: Vector3<f32>,
    pub animation: LightAnimation,
    /// Index of the model drawn at the light, which also positions it.
    pub model: Option<usize>,
    pub casts_shadow: bool,
    phase: f32,
    hsl: Hsl,
}

impl Light {
    pub fn new(
        kind: LightKind,
        colour: Vector3<f32>,
        intensity: f32,
        direction: Vector3<f32>,
        animation: LightAnimation,
    ) -> Self {
        let base_colour = colour * intensity;
        let direction = if direction.is_zero() {
            Vector3::unit_z()
        } else {
            direction.normalize()
        };
        Self {
            kind,
            base_colour,
            colour: base_colour,
            position: Vector3::zero(),
            direction,
            animation,
            model: None,
            casts_shadow: false,
            phase: 0.0,
            // The hue rotation works on the colour before intensity
            hsl: rgb_to_hsl(colour.into()),
        }
    }

    /// Advance the colour animation by `dt` seconds.
    pub fn animate(&mut self, dt: f32) {
        match self.animation {
            LightAnimation::None => (),
            LightAnimation::Pulse => {
                self.phase += dt;
                self.colour = self.base_colour * self.phase.sin().abs();
            }
            LightAnimation::HueRotate { rate, power } => {
                self.hsl.h = (self.hsl.h + dt * rate).rem_euclid(360.0);
                self.colour = Vector3::from(hsl_to_rgb(self.hsl)) * power;
            }
        }
    }

    pub fn hsl(&self) -> Hsl {
        self.hsl
    }

    pub fn to_raw(&self) -> LightRaw {
        let cos_cone = match self.kind {
            LightKind::Spot { cone } => cone.0.cos(),
            _ => -1.0,
        };
        LightRaw {
            position: self.position.into(),
            kind: self.kind.id(),
            colour: self.colour.into(),
            cos_cone,
            direction: self.direction.into(),
            casts_shadow: self.casts_shadow as u32,
        }
    }
}

/// One light as the shaders see it.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightRaw {
    position: [f32; 3],
    kind: u32,
    colour: [f32; 3],
    cos_cone: f32,
    direction: [f32; 3],
    casts_shadow: u32,
}
