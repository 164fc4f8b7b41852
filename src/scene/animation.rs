//! Per-frame scene state that does not touch the GPU: moving actors,
//! orbits, light animation, effect phases and the effect toggles.

use cgmath::Vector3;
use winit::keyboard::KeyCode;

use crate::{
    data_structures::{
        light::Light,
        model::{Model, ModelControls},
    },
    input::Input,
    scene::uniforms::{EFFECT_MOVER, EFFECT_WIGGLE},
};

/// Texture scroll per second.
pub const MOVER_RATE: f32 = 0.1;
/// Wiggle phase advance in radians per second.
pub const WIGGLE_RATE: f32 = 6.0;
/// Change of the wiggle amplitude per key press.
pub const WIGGLE_STEP: f32 = 0.1;

/// Point on the horizontal circle of `radius` around `centre`.
pub fn orbit_position(centre: Vector3<f32>, radius: f32, angle: f32) -> Vector3<f32> {
    centre + Vector3::new(angle.cos() * radius, 0.0, angle.sin() * radius)
}

/// An entity circling another one.
#[derive(Debug, Clone, PartialEq)]
pub struct Orbit {
    /// Index of the entity circled.
    pub target: usize,
    pub radius: f32,
    /// Radians per second, clockwise seen from above.
    pub speed: f32,
    pub angle: f32,
}

impl Orbit {
    pub fn new(target: usize, radius: f32, speed: f32) -> Self {
        Self {
            target,
            radius,
            speed,
            angle: 0.0,
        }
    }

    /// Position for this frame, then step the angle by `dt` seconds.
    pub fn advance(&mut self, centre: Vector3<f32>, dt: f32) -> Vector3<f32> {
        let position = orbit_position(centre, self.radius, self.angle);
        self.angle -= self.speed * dt;
        position
    }
}

/// The part of a scene entity that changes from frame to frame.
#[derive(Debug)]
pub struct Actor {
    pub model: Model,
    /// Colour multiplied into the shading. Light models take their light's colour.
    pub tint: Vector3<f32>,
    pub controls: Option<ModelControls>,
    pub orbit: Option<Orbit>,
}

// Field-wise default; cgmath's `Vector3` has no `Default`, so the derive can't be used.
impl Default for Actor {
    fn default() -> Self {
        Self {
            model: Model::default(),
            tint: Vector3::new(0.0, 0.0, 0.0),
            controls: None,
            orbit: None,
        }
    }
}

/// Advance `actors` and `lights` by `dt` seconds.
///
/// In order: actors with key bindings react to held keys, orbiting actors
/// circle their target, then every light moves to its model, animates its
/// colour and tints its model with that colour.
///
/// # Arguments
///
/// * `actors` are indexed like the scene's entities; orbit targets and
///   light models refer to these indices
/// * `lights` may point at an actor through [`Light::model`]
/// * `input` is polled for held keys only, so pending hits survive
pub fn step_actors(actors: &mut [Actor], lights: &mut [Light], input: &mut Input, dt: f32) {
    for actor in actors.iter_mut() {
        if let Some(keys) = &actor.controls {
            actor.model.control(input, dt, keys);
        }
    }

    for index in 0..actors.len() {
        let Some(target) = actors[index].orbit.as_ref().map(|o| o.target) else {
            continue;
        };
        let Some(centre) = actors.get(target).map(|a| a.model.position()) else {
            continue;
        };
        let actor = &mut actors[index];
        if let Some(orbit) = actor.orbit.as_mut() {
            let position = orbit.advance(centre, dt);
            actor.model.set_position(position);
        }
    }

    for light in lights.iter_mut() {
        let actor = light.model.and_then(|m| actors.get_mut(m));
        if let Some(actor) = &actor {
            light.position = actor.model.position();
        }
        light.animate(dt);
        if let Some(actor) = actor {
            actor.tint = light.colour;
        }
    }
}

/// Running phases of the animated effects.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Phases {
    pub mover: f32,
    pub wiggle: f32,
}

impl Phases {
    pub fn advance(&mut self, dt: f32) {
        self.mover += MOVER_RATE * dt;
        self.wiggle += WIGGLE_RATE * dt;
    }
}

/// Keys toggling and tuning the effects.
#[derive(Debug, Clone, Copy)]
pub struct EffectKeys {
    pub toggle_parallax: KeyCode,
    pub toggle_mover: KeyCode,
    pub toggle_wiggle: KeyCode,
    pub wiggle_down: KeyCode,
    pub wiggle_up: KeyCode,
}

impl Default for EffectKeys {
    fn default() -> Self {
        Self {
            toggle_parallax: KeyCode::Digit1,
            toggle_mover: KeyCode::Digit2,
            toggle_wiggle: KeyCode::Digit3,
            wiggle_down: KeyCode::Digit4,
            wiggle_up: KeyCode::Digit5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectSettings {
    pub parallax: bool,
    pub mover: bool,
    pub wiggle: bool,
    pub wiggle_amplitude: f32,
}

impl EffectSettings {
    pub fn new(wiggle_amplitude: f32) -> Self {
        Self {
            parallax: true,
            mover: true,
            wiggle: true,
            wiggle_amplitude: wiggle_amplitude.max(0.0),
        }
    }

    /// Apply the toggles hit since the last frame.
    pub fn handle_keys(&mut self, input: &mut Input, keys: &EffectKeys) {
        if input.key_hit(keys.toggle_parallax) {
            self.parallax = !self.parallax;
            log::info!("Parallax mapping {}", on_off(self.parallax));
        }
        if input.key_hit(keys.toggle_mover) {
            self.mover = !self.mover;
            log::info!("Mover {}", on_off(self.mover));
        }
        if input.key_hit(keys.toggle_wiggle) {
            self.wiggle = !self.wiggle;
            log::info!("Wiggle {}", on_off(self.wiggle));
        }
        if input.key_hit(keys.wiggle_down) {
            self.wiggle_amplitude = (self.wiggle_amplitude - WIGGLE_STEP).max(0.0);
        }
        if input.key_hit(keys.wiggle_up) {
            self.wiggle_amplitude += WIGGLE_STEP;
        }
    }

    /// Effect bits the shaders may apply.
    pub fn enabled_effects(&self) -> u32 {
        let mut effects = 0;
        if self.mover {
            effects |= EFFECT_MOVER;
        }
        if self.wiggle {
            effects |= EFFECT_WIGGLE;
        }
        effects
    }

    /// Zero depth turns parallax mapping into plain normal mapping.
    pub fn parallax_depth(&self, depth: f32) -> f32 {
        if self.parallax { depth } else { 0.0 }
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled { "on" } else { "off" }
}
