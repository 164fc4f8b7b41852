//! The live scene: camera, entities, lights and render targets built from a
//! [`SceneDescription`], advanced by [`Scene::update`] and drawn by
//! [`Scene::render`].
//!
//! Every frame is drawn in three passes:
//!
//! 1. shadow pass, shadow casters into the spot light's depth map
//! 2. portal pass, the scene seen by the portal camera into a texture
//! 3. main pass, everything seen by the main camera into the frame
//!
//! The first two only run when the description asks for them.

use std::collections::HashMap;

use anyhow::{Context as _, bail};
use cgmath::{Matrix4, Rad, SquareMatrix, Vector3};
use wgpu::util::DeviceExt;

use crate::{
    camera::{Camera, CameraControls, ViewResources, ViewUniform, perspective_lh},
    context::InitContext,
    data_structures::{
        light::{Light, LightKind},
        model::{Geometry, Model},
        texture::Texture,
        transform::Transform,
    },
    input::Input,
    pipelines::{Binding, Layouts, TechniqueKind, Techniques},
    resources,
};

pub mod animation;
pub mod description;
pub mod uniforms;

use animation::{Actor, EffectKeys, EffectSettings, Orbit, Phases, step_actors};
use description::{CameraDesc, SceneDescription, TextureSource};
use uniforms::{
    EFFECT_MOVER, EFFECT_WIGGLE, EffectsUniform, ObjectResources, ObjectUniform, SceneUniform,
};

/// Where the main pass draws to.
///
/// The colour view must have the format the scene was created with, the
/// depth view [`Texture::DEPTH_FORMAT`] and the same size.
pub struct Frame<'a> {
    pub colour: &'a wgpu::TextureView,
    pub depth: &'a wgpu::TextureView,
    pub clear_colour: wgpu::Color,
}

/// The GPU side of a scene object. Its [`Actor`] sits at the same index in
/// the scene's actor list and holds everything that moves.
///
/// * `technique` draws it in the portal and main passes
/// * `material` binds its diffuse and normal maps
/// * `object` holds its world matrix, tint and effect bits
/// * `shows_portal` is set when its diffuse map is the portal texture, which
///   keeps it out of the portal pass
struct Entity {
    name: String,
    technique: TechniqueKind,
    material: wgpu::BindGroup,
    object: ObjectResources,
    effects: u32,
    casts_shadow: bool,
    shows_portal: bool,
}

impl Entity {
    fn uniform(&self, actor: &Actor) -> ObjectUniform {
        ObjectUniform::new(actor.model.world_matrix(), actor.tint, self.effects)
    }
}

struct Shadow {
    light: usize,
    map: Texture,
    view: ViewResources,
    cone: Rad<f32>,
    near_clip: f32,
    far_clip: f32,
}

struct Portal {
    camera: Camera,
    colour: Texture,
    depth: Texture,
    view: ViewResources,
}

/// A loaded scene, ready to be updated and drawn every frame.
///
/// The set of entities and lights is fixed once [`Scene::init`] returns.
/// Dropping the scene releases every GPU resource it created.
pub struct Scene {
    pub camera: Camera,
    camera_controls: Option<CameraControls>,
    pub effect_keys: EffectKeys,
    entities: Vec<Entity>,
    actors: Vec<Actor>,
    lights: Vec<Light>,
    techniques: Techniques,
    view: ViewResources,
    scene_uniform: SceneUniform,
    scene_buffer: wgpu::Buffer,
    scene_bind_group: wgpu::BindGroup,
    effects_buffer: wgpu::Buffer,
    effects_bind_group: wgpu::BindGroup,
    shadow: Option<Shadow>,
    portal: Option<Portal>,
    settings: EffectSettings,
    phases: Phases,
    ambient: Vector3<f32>,
    specular_power: f32,
    parallax_depth: f32,
    background: wgpu::Color,
}

fn camera_from(desc: &CameraDesc) -> Camera {
    Camera::new(
        desc.position,
        desc.rotation,
        desc.fov,
        desc.near_clip,
        desc.far_clip,
    )
}

impl Scene {
    /// Load every mesh and texture the description names and create the
    /// GPU resources to draw them.
    ///
    /// Each mesh file is imported once and its geometry shared by every
    /// entity showing it; each texture file is loaded once as well. All
    /// loads are attempted. Failures are logged together and startup stops
    /// after meshes or textures if anything is missing.
    ///
    /// # Arguments
    ///
    /// * `gpu` provides the device, the queue and the colour format of the
    ///   frames [`Scene::render`] will draw to
    /// * `description` is checked with [`SceneDescription::validate`] before
    ///   anything is loaded
    pub async fn init(gpu: &InitContext, description: SceneDescription) -> anyhow::Result<Self> {
        description.validate()?;
        let device = &gpu.device;
        let queue = &gpu.queue;
        let layouts = Layouts::new(device);
        let mut techniques = Techniques::new(device, &layouts, gpu.color_format);

        let mesh_files = description.mesh_files();
        log::info!("Loading {} meshes", mesh_files.len());
        let mut geometries = HashMap::new();
        let mut failed = Vec::new();
        for (file, want_tangents) in mesh_files {
            match Geometry::load(device, file, want_tangents).await {
                Ok(geometry) => {
                    geometries.insert(file, geometry);
                }
                Err(e) => failed.push(format!("{e:#}")),
            }
        }

        let mut models = Vec::with_capacity(description.entities.len());
        for entity in &description.entities {
            let mut model = Model::new(entity.position, entity.rotation, entity.scale);
            if let Some(geometry) = geometries.get(entity.mesh.as_str()) {
                let mut attached =
                    model.attach(device, geometry.clone(), techniques.get_mut(entity.technique));
                if attached.is_ok() && entity.casts_shadow {
                    attached = techniques
                        .get_mut(TechniqueKind::DepthOnly)
                        .prepare(device, &geometry.layout);
                }
                if let Err(e) = attached {
                    failed.push(format!("{} for {} ({e:#})", entity.mesh, entity.name));
                }
            }
            models.push(model);
        }
        if !failed.is_empty() {
            log::error!("Failed to load meshes: {}", failed.join("; "));
            bail!("could not load {} mesh(es)", failed.len());
        }

        log::info!("Loading textures");
        let mut textures = HashMap::new();
        let mut failed = Vec::new();
        for (file, is_normal_map) in description.texture_files() {
            match resources::load_texture(file, is_normal_map, device, queue).await {
                Ok(texture) => {
                    textures.insert((file, is_normal_map), texture);
                }
                Err(e) => failed.push(format!("{e:#}")),
            }
        }
        if !failed.is_empty() {
            log::error!("Failed to load textures: {}", failed.join("; "));
            bail!("could not load {} texture(s)", failed.len());
        }
        let flat_normals = Texture::create_default_normal_map(1, 1, device, queue);

        let portal = description.portal.as_ref().map(|desc| Portal {
            camera: camera_from(&desc.camera),
            colour: Texture::create_render_target(
                device,
                desc.size,
                gpu.color_format,
                "Portal Texture",
            ),
            depth: Texture::create_depth_texture(device, desc.size, "Portal Depth"),
            view: ViewResources::new(device, &layouts.view, "Portal"),
        });

        let mut lights = Vec::with_capacity(description.lights.len());
        for (index, desc) in description.lights.iter().enumerate() {
            let mut light = Light::new(
                desc.kind,
                desc.colour,
                desc.intensity,
                desc.direction,
                desc.animation,
            );
            light.model = desc
                .model
                .as_deref()
                .and_then(|name| description.entity_index(name));
            light.casts_shadow = description
                .shadow
                .as_ref()
                .is_some_and(|shadow| shadow.light == index);
            if let Some(model) = light.model.and_then(|m| models.get_mut(m)) {
                light.position = model.position();
                if light.kind != LightKind::Point {
                    model.face_direction(light.direction);
                }
            }
            lights.push(light);
        }

        let mut entities = Vec::with_capacity(models.len());
        let mut actors = Vec::with_capacity(models.len());
        for (index, (desc, model)) in description.entities.iter().zip(models).enumerate() {
            let diffuse = match &desc.diffuse {
                TextureSource::File(file) => textures.get(&(file.as_str(), false)),
                TextureSource::Portal => portal.as_ref().map(|p| &p.colour),
            }
            .with_context(|| format!("no diffuse texture for {}", desc.name))?;
            let normal = match &desc.normal {
                Some(file) => textures
                    .get(&(file.as_str(), true))
                    .with_context(|| format!("no normal map for {}", desc.name))?,
                None => &flat_normals,
            };
            let material =
                mk_material_bind_group(device, &layouts.material, diffuse, normal, &desc.name);

            let mut effects = 0;
            if desc.effects.mover {
                effects |= EFFECT_MOVER;
            }
            if desc.effects.wiggle {
                effects |= EFFECT_WIGGLE;
            }
            // Light models glow in their light's colour
            let tint = lights
                .iter()
                .find(|light| light.model == Some(index))
                .map_or(desc.tint, |light| light.colour);
            let uniform = ObjectUniform::new(model.world_matrix(), tint, effects);
            let object = ObjectResources::new(device, &layouts.object, uniform, &desc.name);
            let orbit = desc.orbit.as_ref().and_then(|orbit| {
                description
                    .entity_index(&orbit.around)
                    .map(|target| Orbit::new(target, orbit.radius, orbit.speed))
            });

            entities.push(Entity {
                name: desc.name.clone(),
                technique: desc.technique,
                material,
                object,
                effects,
                casts_shadow: desc.casts_shadow,
                shows_portal: desc.diffuse == TextureSource::Portal,
            });
            actors.push(Actor {
                model,
                tint,
                controls: desc.controls,
                orbit,
            });
        }

        let shadow = description.shadow.as_ref().map(|desc| Shadow {
            light: desc.light,
            map: Texture::create_depth_texture(device, [desc.size, desc.size], "Shadow Map"),
            view: ViewResources::new(device, &layouts.view, "Shadow"),
            cone: desc.cone,
            near_clip: desc.near_clip,
            far_clip: desc.far_clip,
        });
        // The scene group always needs a depth texture, even without shadows
        let placeholder;
        let shadow_map = match &shadow {
            Some(shadow) => &shadow.map,
            None => {
                placeholder = Texture::create_depth_texture(device, [1, 1], "No Shadow Map");
                &placeholder
            }
        };
        let shadow_sampler = shadow_map
            .sampler
            .as_ref()
            .context("depth textures carry a comparison sampler")?;

        let scene_uniform = SceneUniform::new();
        let scene_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Scene Buffer"),
            contents: bytemuck::cast_slice(&[scene_uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let scene_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &layouts.scene,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: scene_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&shadow_map.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(shadow_sampler),
                },
            ],
            label: Some("scene_bind_group"),
        });

        let effects_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Effects Buffer"),
            contents: bytemuck::cast_slice(&[EffectsUniform::from_scene(&scene_uniform)]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let effects_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &layouts.effects,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: effects_buffer.as_entire_binding(),
            }],
            label: Some("effects_bind_group"),
        });

        log::info!(
            "Scene ready: {} entities, {} lights",
            entities.len(),
            lights.len()
        );
        Ok(Self {
            camera: camera_from(&description.camera),
            camera_controls: description.camera.controls,
            effect_keys: EffectKeys::default(),
            entities,
            actors,
            lights,
            techniques,
            view: ViewResources::new(device, &layouts.view, "Main"),
            scene_uniform,
            scene_buffer,
            scene_bind_group,
            effects_buffer,
            effects_bind_group,
            shadow,
            portal,
            settings: EffectSettings::new(description.wiggle_amplitude),
            phases: Phases::default(),
            ambient: description.ambient,
            specular_power: description.specular_power,
            parallax_depth: description.parallax_depth,
            background: description.background,
        })
    }

    pub fn background(&self) -> wgpu::Color {
        self.background
    }

    pub fn settings(&self) -> &EffectSettings {
        &self.settings
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    /// The model of the entity called `name`.
    pub fn model(&self, name: &str) -> Option<&Model> {
        let index = self.entities.iter().position(|e| e.name == name)?;
        self.actors.get(index).map(|a| &a.model)
    }

    /// Advance the scene by `dt` seconds and react to the keys.
    ///
    /// The camera and entities with key bindings move first, then orbits,
    /// lights and effect phases advance. Effect toggles are read last.
    pub fn update(&mut self, dt: f32, input: &mut Input) {
        if let Some(keys) = &self.camera_controls {
            self.camera.control(input, dt, keys);
        }
        step_actors(&mut self.actors, &mut self.lights, input, dt);
        self.phases.advance(dt);
        self.settings.handle_keys(input, &self.effect_keys);
    }

    fn shadow_view(&self, shadow: &Shadow) -> ViewUniform {
        let Some(light) = self.lights.get(shadow.light) else {
            return ViewUniform::new();
        };
        let mut transform = Transform {
            position: light.position,
            ..Default::default()
        };
        transform.face_direction(light.direction);
        let view = transform
            .to_matrix()
            .invert()
            .unwrap_or_else(Matrix4::identity);
        let projection = perspective_lh(shadow.cone, 1.0, shadow.near_clip, shadow.far_clip);
        ViewUniform::from_matrices(view, projection, light.position)
    }

    fn write_uniforms(&mut self, queue: &wgpu::Queue) {
        for (entity, actor) in self.entities.iter_mut().zip(&self.actors) {
            let uniform = entity.uniform(actor);
            if uniform != entity.object.uniform {
                entity.object.write(queue, uniform);
            }
        }

        let mut main_view = ViewUniform::new();
        main_view.update_view_proj(&self.camera);
        self.view.write(queue, main_view);

        if let Some(portal) = &mut self.portal {
            let mut portal_view = ViewUniform::new();
            portal_view.update_view_proj(&portal.camera);
            portal.view.write(queue, portal_view);
        }

        let mut shadow_view_projection = Matrix4::identity();
        let shadow_view = self.shadow.as_ref().map(|shadow| self.shadow_view(shadow));
        if let (Some(shadow), Some(uniform)) = (&mut self.shadow, shadow_view) {
            shadow_view_projection = uniform.view_projection();
            shadow.view.write(queue, uniform);
        }

        let uniform = &mut self.scene_uniform;
        uniform.shadow_view_projection = shadow_view_projection.into();
        uniform.set_lights(&self.lights);
        uniform.ambient = self.ambient.into();
        uniform.specular_power = self.specular_power;
        uniform.parallax_depth = self.settings.parallax_depth(self.parallax_depth);
        uniform.mover = self.phases.mover;
        uniform.wiggle = self.phases.wiggle;
        uniform.wiggle_amplitude = self.settings.wiggle_amplitude;
        uniform.enabled_effects = self.settings.enabled_effects();
        queue.write_buffer(
            &self.scene_buffer,
            0,
            bytemuck::cast_slice(&[self.scene_uniform]),
        );
        queue.write_buffer(
            &self.effects_buffer,
            0,
            bytemuck::cast_slice(&[EffectsUniform::from_scene(&self.scene_uniform)]),
        );
    }

    /// Draw every entity whose `filter` returns true with the bind groups
    /// its technique expects.
    fn draw_entities(
        &self,
        render_pass: &mut wgpu::RenderPass<'_>,
        view: &wgpu::BindGroup,
        technique: Option<TechniqueKind>,
        filter: impl Fn(&Entity) -> bool,
    ) {
        let drawn = self.entities.iter().zip(&self.actors);
        for (entity, actor) in drawn.filter(|(e, _)| filter(e)) {
            let technique = self.techniques.get(technique.unwrap_or(entity.technique));
            for (slot, binding) in technique.bindings().iter().enumerate() {
                let group = match binding {
                    Binding::Material => &entity.material,
                    Binding::View => view,
                    Binding::Scene => &self.scene_bind_group,
                    Binding::Effects => &self.effects_bind_group,
                    Binding::Object => &entity.object.bind_group,
                };
                render_pass.set_bind_group(slot as u32, group, &[]);
            }
            actor.model.render(render_pass, technique);
        }
    }

    /// Upload this frame's uniforms and draw the shadow, portal and main
    /// passes into `frame`. Presenting is left to the caller.
    ///
    /// # Arguments
    ///
    /// * `gpu` must be the context the scene was initialised with
    /// * `frame` receives the main pass, cleared to its `clear_colour`
    pub fn render(&mut self, gpu: &InitContext, frame: Frame<'_>) {
        self.write_uniforms(&gpu.queue);

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Scene Encoder"),
            });

        if let Some(shadow) = &self.shadow {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Shadow Pass"),
                color_attachments: &[],
                depth_stencil_attachment: Some(depth_attachment(&shadow.map.view)),
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            self.draw_entities(
                &mut render_pass,
                &shadow.view.bind_group,
                Some(TechniqueKind::DepthOnly),
                |e| e.casts_shadow,
            );
        }

        if let Some(portal) = &self.portal {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Portal Pass"),
                color_attachments: &[Some(colour_attachment(
                    &portal.colour.view,
                    self.background,
                ))],
                depth_stencil_attachment: Some(depth_attachment(&portal.depth.view)),
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            // The portal can't show itself
            self.draw_entities(&mut render_pass, &portal.view.bind_group, None, |e| {
                !e.shows_portal
            });
        }

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Main Pass"),
                color_attachments: &[Some(colour_attachment(frame.colour, frame.clear_colour))],
                depth_stencil_attachment: Some(depth_attachment(frame.depth)),
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            self.draw_entities(&mut render_pass, &self.view.bind_group, None, |_| true);
        }

        gpu.queue.submit(std::iter::once(encoder.finish()));
    }
}

fn colour_attachment(
    view: &wgpu::TextureView,
    clear: wgpu::Color,
) -> wgpu::RenderPassColorAttachment<'_> {
    wgpu::RenderPassColorAttachment {
        view,
        resolve_target: None,
        ops: wgpu::Operations {
            load: wgpu::LoadOp::Clear(clear),
            store: wgpu::StoreOp::Store,
        },
        depth_slice: None,
    }
}

fn depth_attachment(view: &wgpu::TextureView) -> wgpu::RenderPassDepthStencilAttachment<'_> {
    wgpu::RenderPassDepthStencilAttachment {
        view,
        depth_ops: Some(wgpu::Operations {
            load: wgpu::LoadOp::Clear(1.0),
            store: wgpu::StoreOp::Store,
        }),
        stencil_ops: None,
    }
}

fn mk_material_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    diffuse: &Texture,
    normal: &Texture,
    label: &str,
) -> wgpu::BindGroup {
    let diffuse_sampler = diffuse.sampler_or_default(device);
    let normal_sampler = normal.sampler_or_default(device);
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&diffuse.view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(&diffuse_sampler),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::TextureView(&normal.view),
            },
            wgpu::BindGroupEntry {
                binding: 3,
                resource: wgpu::BindingResource::Sampler(&normal_sampler),
            },
        ],
        label: Some(&format!("{label} material_bind_group")),
    })
}
