//! Data-driven description of everything in a scene.
//!
//! [`SceneDescription::default`] is the demo scene: two cubes, a teapot, a
//! sphere on hilly ground, three point lights, a directional light and a
//! shadow-casting spot light, plus a portal showing the scene from above.

use std::collections::HashSet;

use anyhow::bail;
use cgmath::{Deg, Rad, Vector3, Zero};

use crate::{
    camera::CameraControls,
    data_structures::{
        light::{LightAnimation, LightKind, MAX_LIGHTS},
        model::ModelControls,
    },
    pipelines::TechniqueKind,
};

/// Radius of the circle orbiting lights move on.
pub const LIGHT_ORBIT_RADIUS: f32 = 20.0;
/// Orbit speed in radians per second.
pub const LIGHT_ORBIT_SPEED: f32 = 0.7;
/// Hue rotation of the first light in degrees per second.
pub const COLOUR_ROTATE_RATE: f32 = 1000.0;

#[derive(Debug, Clone)]
pub struct CameraDesc {
    pub position: Vector3<f32>,
    /// Euler angles in radians
    pub rotation: Vector3<f32>,
    pub fov: Rad<f32>,
    pub near_clip: f32,
    pub far_clip: f32,
    pub controls: Option<CameraControls>,
}

impl Default for CameraDesc {
    fn default() -> Self {
        Self {
            position: Vector3::zero(),
            rotation: Vector3::zero(),
            fov: Rad(std::f32::consts::FRAC_PI_4),
            near_clip: 0.1,
            far_clip: 10000.0,
            controls: Some(CameraControls::default()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TextureSource {
    /// An image in the asset folder.
    File(String),
    /// The live image rendered by the portal camera.
    Portal,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Effects {
    /// Scroll the texture coordinates.
    pub mover: bool,
    /// Ripple the surface along its normals.
    pub wiggle: bool,
}

#[derive(Debug, Clone)]
pub struct OrbitDesc {
    /// Name of the entity circled.
    pub around: String,
    pub radius: f32,
    pub speed: f32,
}

#[derive(Debug, Clone)]
pub struct EntityDesc {
    pub name: String,
    pub mesh: String,
    pub technique: TechniqueKind,
    pub tangents: bool,
    pub position: Vector3<f32>,
    pub rotation: Vector3<f32>,
    pub scale: Vector3<f32>,
    pub diffuse: TextureSource,
    pub normal: Option<String>,
    pub tint: Vector3<f32>,
    pub effects: Effects,
    pub casts_shadow: bool,
    pub controls: Option<ModelControls>,
    pub orbit: Option<OrbitDesc>,
}

impl EntityDesc {
    /// An entity at `position` with no rotation, unit scale and no extras.
    pub fn new(
        name: &str,
        mesh: &str,
        technique: TechniqueKind,
        position: Vector3<f32>,
        diffuse: TextureSource,
    ) -> Self {
        Self {
            name: name.to_string(),
            mesh: mesh.to_string(),
            technique,
            tangents: technique == TechniqueKind::ParallaxMapping,
            position,
            rotation: Vector3::zero(),
            scale: Vector3::new(1.0, 1.0, 1.0),
            diffuse,
            normal: None,
            tint: Vector3::zero(),
            effects: Effects::default(),
            casts_shadow: false,
            controls: None,
            orbit: None,
        }
    }

    fn with_normal(mut self, normal: &str) -> Self {
        self.normal = Some(normal.to_string());
        self
    }

    fn with_scale(mut self, scale: f32) -> Self {
        self.scale = Vector3::new(scale, scale, scale);
        self
    }

    fn casting_shadow(mut self) -> Self {
        self.casts_shadow = true;
        self
    }
}

#[derive(Debug, Clone)]
pub struct LightDesc {
    pub kind: LightKind,
    pub colour: Vector3<f32>,
    pub intensity: f32,
    /// Direction the light travels in.
    pub direction: Vector3<f32>,
    /// Name of the entity drawn at the light and positioning it.
    pub model: Option<String>,
    pub animation: LightAnimation,
}

#[derive(Debug, Clone)]
pub struct ShadowDesc {
    /// Index into the light list.
    pub light: usize,
    /// Width and height of the shadow map.
    pub size: u32,
    /// Field of view of the light camera.
    pub cone: Rad<f32>,
    pub near_clip: f32,
    pub far_clip: f32,
}

#[derive(Debug, Clone)]
pub struct PortalDesc {
    pub camera: CameraDesc,
    pub size: [u32; 2],
}

#[derive(Debug, Clone)]
pub struct SceneDescription {
    pub camera: CameraDesc,
    pub entities: Vec<EntityDesc>,
    pub lights: Vec<LightDesc>,
    pub ambient: Vector3<f32>,
    pub specular_power: f32,
    pub parallax_depth: f32,
    pub wiggle_amplitude: f32,
    pub background: wgpu::Color,
    pub shadow: Option<ShadowDesc>,
    pub portal: Option<PortalDesc>,
}

impl SceneDescription {
    pub fn entity_index(&self, name: &str) -> Option<usize> {
        self.entities.iter().position(|e| e.name == name)
    }

    /// Every distinct mesh file in first-use order, with whether any entity
    /// showing it wants tangents.
    ///
    /// Each file is imported once with these flags and its geometry shared.
    pub fn mesh_files(&self) -> Vec<(&str, bool)> {
        let mut files: Vec<(&str, bool)> = Vec::new();
        for entity in &self.entities {
            match files.iter_mut().find(|(file, _)| *file == entity.mesh) {
                Some((_, tangents)) => *tangents |= entity.tangents,
                None => files.push((entity.mesh.as_str(), entity.tangents)),
            }
        }
        files
    }

    /// Every distinct texture file with whether it is a normal map, in
    /// first-use order.
    pub fn texture_files(&self) -> Vec<(&str, bool)> {
        let mut seen = HashSet::new();
        let mut files = Vec::new();
        for entity in &self.entities {
            if let TextureSource::File(file) = &entity.diffuse {
                if seen.insert((file.as_str(), false)) {
                    files.push((file.as_str(), false));
                }
            }
            if let Some(file) = &entity.normal {
                if seen.insert((file.as_str(), true)) {
                    files.push((file.as_str(), true));
                }
            }
        }
        files
    }

    /// Check that every name and index refers to something that exists.
    pub fn validate(&self) -> anyhow::Result<()> {
        let mut names = HashSet::new();
        for entity in &self.entities {
            if !names.insert(entity.name.as_str()) {
                bail!("entity name {} is used twice", entity.name);
            }
        }
        for entity in &self.entities {
            if let Some(orbit) = &entity.orbit {
                if self.entity_index(&orbit.around).is_none() {
                    bail!("{} orbits unknown entity {}", entity.name, orbit.around);
                }
                if orbit.around == entity.name {
                    bail!("{} cannot orbit itself", entity.name);
                }
            }
            if entity.diffuse == TextureSource::Portal && self.portal.is_none() {
                bail!("{} shows the portal but the scene has none", entity.name);
            }
        }
        if self.lights.len() > MAX_LIGHTS {
            bail!(
                "{} lights described, at most {} are supported",
                self.lights.len(),
                MAX_LIGHTS
            );
        }
        for light in &self.lights {
            if let Some(model) = &light.model {
                if self.entity_index(model).is_none() {
                    bail!("light model {model} is not an entity");
                }
            }
        }
        if let Some(shadow) = &self.shadow {
            if shadow.light >= self.lights.len() {
                bail!("shadow light {} does not exist", shadow.light);
            }
            if shadow.size == 0 {
                bail!("shadow map size must not be zero");
            }
        }
        if let Some(portal) = &self.portal {
            if portal.size.contains(&0) {
                bail!("portal size must not be zero");
            }
        }
        Ok(())
    }
}

impl Default for SceneDescription {
    fn default() -> Self {
        use TechniqueKind::*;
        use TextureSource::File;
        let file = |name: &str| File(name.to_string());
        let light_model = |name: &str, position: Vector3<f32>, scale: f32| {
            EntityDesc::new(
                name,
                "Light.obj",
                AdditiveTintTex,
                position,
                file("flare.jpg"),
            )
            .with_scale(scale)
        };

        let mut cube = EntityDesc::new(
            "Cube",
            "Cube.obj",
            ParallaxMapping,
            Vector3::new(10.0, 15.0, -40.0),
            file("TechDiffuseSpecular.png"),
        )
        .with_normal("TechNormalDepth.png")
        .casting_shadow();
        cube.controls = Some(ModelControls::default());

        let mut cube2 = EntityDesc::new(
            "Cube2",
            "Cube.obj",
            VertexLitTex,
            Vector3::new(10.0, 15.0, -80.0),
            file("StoneDiffuseSpecular.png"),
        )
        .casting_shadow();
        cube2.tangents = true;

        let mut sphere = EntityDesc::new(
            "Sphere",
            "Sphere.obj",
            ParallaxMapping,
            Vector3::new(0.0, 20.0, 10.0),
            file("BrainDiffuseSpecular.png"),
        )
        .with_normal("BrainNormalDepth.png")
        .casting_shadow();
        sphere.tint = Vector3::new(1.0, 0.41, 0.7) * 0.3;
        sphere.effects = Effects {
            mover: true,
            wiggle: true,
        };

        let orbit = |around: &str| OrbitDesc {
            around: around.to_string(),
            radius: LIGHT_ORBIT_RADIUS,
            speed: LIGHT_ORBIT_SPEED,
        };
        let mut light1 = light_model("Light1", Vector3::new(30.0, 15.0, -40.0), 5.0);
        light1.orbit = Some(orbit("Cube"));
        let mut light3 = light_model("Light3", Vector3::new(30.0, 15.0, -80.0), 5.0);
        light3.orbit = Some(orbit("Cube2"));

        let mut portal = EntityDesc::new(
            "Portal",
            "Cube.obj",
            VertexLitTex,
            Vector3::new(-30.0, 20.0, -20.0),
            TextureSource::Portal,
        );
        portal.scale = Vector3::new(2.0, 2.0, 0.1);
        portal.rotation = Vector3::new(0.0, Rad::from(Deg(20.0)).0, 0.0);

        let entities = vec![
            cube,
            cube2,
            EntityDesc::new(
                "Teapot",
                "Teapot.obj",
                ParallaxMapping,
                Vector3::new(40.0, 10.0, 10.0),
                file("PatternDiffuseSpecular.png"),
            )
            .with_normal("PatternNormalDepth.png")
            .casting_shadow(),
            sphere,
            EntityDesc::new(
                "Floor",
                "Hills.obj",
                ParallaxMapping,
                Vector3::zero(),
                file("CobbleDiffuseSpecular.png"),
            )
            .with_normal("CobbleNormalDepth.png")
            .casting_shadow(),
            portal,
            light1,
            light_model("Light2", Vector3::new(20.0, 40.0, -20.0), 12.0),
            light3,
            light_model("SpotLight", Vector3::new(60.0, 20.0, -60.0), 12.0),
        ];

        let light = |colour: Vector3<f32>, intensity: f32, model: &str, animation| LightDesc {
            kind: LightKind::Point,
            colour,
            intensity,
            direction: Vector3::zero(),
            model: Some(model.to_string()),
            animation,
        };
        let lights = vec![
            light(
                Vector3::new(0.8, 0.8, 1.0),
                1.0,
                "Light1",
                LightAnimation::HueRotate {
                    rate: COLOUR_ROTATE_RATE,
                    power: 20.0,
                },
            ),
            light(
                Vector3::new(1.0, 0.8, 0.2),
                30.0,
                "Light2",
                LightAnimation::Pulse,
            ),
            light(
                Vector3::new(0.8, 0.8, 1.0),
                20.0,
                "Light3",
                LightAnimation::None,
            ),
            LightDesc {
                kind: LightKind::Directional,
                colour: Vector3::new(0.0, 0.0, 1.0),
                intensity: 0.1,
                direction: Vector3::new(0.0, -1.0, 0.0),
                model: None,
                animation: LightAnimation::None,
            },
            LightDesc {
                kind: LightKind::Spot { cone: Rad(0.52) },
                colour: Vector3::new(1.0, 1.0, 1.0),
                intensity: 50.0,
                direction: Vector3::new(0.0, -0.707107, 0.707107),
                model: Some("SpotLight".to_string()),
                animation: LightAnimation::None,
            },
        ];

        Self {
            camera: CameraDesc {
                position: Vector3::new(40.0, 30.0, -90.0),
                rotation: Vector3::new(Rad::from(Deg(8.0)).0, Rad::from(Deg(-18.0)).0, 0.0),
                ..Default::default()
            },
            entities,
            lights,
            ambient: Vector3::new(0.2, 0.2, 0.3),
            specular_power: 256.0,
            parallax_depth: 0.08,
            wiggle_amplitude: 0.5,
            background: wgpu::Color {
                r: 0.0,
                g: 0.125,
                b: 0.3,
                a: 1.0,
            },
            shadow: Some(ShadowDesc {
                light: 4,
                size: 2048,
                cone: Deg(90.0).into(),
                near_clip: 0.1,
                far_clip: 1000.0,
            }),
            portal: Some(PortalDesc {
                camera: CameraDesc {
                    position: Vector3::new(-30.0, 80.0, -120.0),
                    rotation: Vector3::new(Rad::from(Deg(30.0)).0, Rad::from(Deg(20.0)).0, 0.0),
                    controls: None,
                    ..Default::default()
                },
                size: [512, 512],
            }),
        }
    }
}
