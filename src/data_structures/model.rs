//! A positioned mesh that can be drawn with any compatible technique.
//!
//! A model only knows its transform and its geometry. Everything a shader
//! needs besides the vertices (matrices, textures, lights, tints) is bound by
//! the caller before [`Model::render`].

use std::sync::Arc;

use cgmath::{InnerSpace, Matrix4, Vector3};
use wgpu::util::DeviceExt;
use winit::keyboard::KeyCode;

use crate::{
    data_structures::{
        transform::{MOVEMENT_SPEED, ROTATION_SPEED, Transform, local_axis},
        vertex::{VertexLayout, interleave},
    },
    input::Input,
    pipelines::Technique,
    resources::mesh::{SubMesh, load_sub_mesh},
};

/// Key bindings for [`Model::control`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelControls {
    pub turn_up: KeyCode,
    pub turn_down: KeyCode,
    pub turn_left: KeyCode,
    pub turn_right: KeyCode,
    pub turn_cw: KeyCode,
    pub turn_ccw: KeyCode,
    pub move_forward: KeyCode,
    pub move_backward: KeyCode,
}

impl Default for ModelControls {
    fn default() -> Self {
        Self {
            turn_up: KeyCode::KeyI,
            turn_down: KeyCode::KeyK,
            turn_left: KeyCode::KeyJ,
            turn_right: KeyCode::KeyL,
            turn_cw: KeyCode::KeyU,
            turn_ccw: KeyCode::KeyO,
            move_forward: KeyCode::Comma,
            move_backward: KeyCode::Period,
        }
    }
}

/// GPU buffers of a loaded mesh.
///
/// Geometry is immutable once uploaded and shared between every model that
/// shows the same mesh file.
#[derive(Debug)]
pub struct Geometry {
    pub name: String,
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub num_vertices: u32,
    pub num_indices: u32,
    pub layout: VertexLayout,
}

impl Geometry {
    /// Interleave the attributes `sub_mesh` provides and upload them with
    /// its indices.
    pub fn new(device: &wgpu::Device, sub_mesh: &SubMesh) -> Self {
        let layout = VertexLayout::new(sub_mesh.attributes());
        let vertices = interleave(
            &layout,
            &sub_mesh.positions,
            &sub_mesh.normals,
            &sub_mesh.tangents,
            &sub_mesh.tex_coords,
            &sub_mesh.colours,
        );
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Vertex Buffer", sub_mesh.name)),
            contents: &vertices,
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Index Buffer", sub_mesh.name)),
            contents: bytemuck::cast_slice(&sub_mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        log::info!(
            "Uploaded {} ({} vertices, {} byte stride)",
            sub_mesh.name,
            sub_mesh.num_vertices(),
            layout.stride
        );
        Self {
            name: sub_mesh.name.clone(),
            vertex_buffer,
            index_buffer,
            num_vertices: sub_mesh.num_vertices() as u32,
            num_indices: sub_mesh.indices.len() as u32,
            layout,
        }
    }

    /// Import the first sub-mesh of `file_name` from the asset folder and
    /// upload it.
    ///
    /// # Arguments
    ///
    /// * `file_name` is the obj file, relative to the asset folder
    /// * `want_tangents` generates tangents when the mesh has normals and
    ///   texture coordinates
    pub async fn load(
        device: &wgpu::Device,
        file_name: &str,
        want_tangents: bool,
    ) -> anyhow::Result<Arc<Self>> {
        let sub_mesh = load_sub_mesh(file_name, want_tangents).await?;
        Ok(Arc::new(Self::new(device, &sub_mesh)))
    }
}

/// A transform plus optional, shared geometry.
///
/// A model without geometry is valid: it can be moved around and is
/// silently skipped when drawn.
#[derive(Debug, Default)]
pub struct Model {
    pub transform: Transform,
    geometry: Option<Arc<Geometry>>,
}

impl Model {
    pub fn new(position: Vector3<f32>, rotation: Vector3<f32>, scale: Vector3<f32>) -> Self {
        Self {
            transform: Transform::new(position, rotation, scale),
            geometry: None,
        }
    }

    pub fn with_uniform_scale(position: Vector3<f32>, rotation: Vector3<f32>, scale: f32) -> Self {
        Self::new(position, rotation, Vector3::new(scale, scale, scale))
    }

    /// Load the first sub-mesh of `file_name` and upload it.
    ///
    /// Any previous geometry is dropped first, so on error the model is left
    /// without geometry.
    ///
    /// # Arguments
    ///
    /// * `device` creates the vertex and index buffers
    /// * `file_name` is the obj file, relative to the asset folder
    /// * `technique` is only used to check that the mesh provides what its
    ///   shaders read and to create its pipelines for this vertex layout.
    ///   The model does not remember it.
    /// * `want_tangents` generates tangents for techniques that read them
    pub async fn load(
        &mut self,
        device: &wgpu::Device,
        file_name: &str,
        technique: &mut Technique,
        want_tangents: bool,
    ) -> anyhow::Result<()> {
        self.geometry = None;
        let geometry = Geometry::load(device, file_name, want_tangents).await?;
        self.attach(device, geometry, technique)
    }

    /// Upload an already imported sub-mesh, see [`Model::load`].
    pub fn set_geometry(
        &mut self,
        device: &wgpu::Device,
        sub_mesh: &SubMesh,
        technique: &mut Technique,
    ) -> anyhow::Result<()> {
        self.geometry = None;
        self.attach(device, Arc::new(Geometry::new(device, sub_mesh)), technique)
    }

    /// Show already uploaded `geometry`, which other models may share.
    ///
    /// Fails and leaves the model without geometry if the layout lacks an
    /// attribute `technique` reads.
    pub fn attach(
        &mut self,
        device: &wgpu::Device,
        geometry: Arc<Geometry>,
        technique: &mut Technique,
    ) -> anyhow::Result<()> {
        self.geometry = None;
        technique.prepare(device, &geometry.layout)?;
        self.geometry = Some(geometry);
        Ok(())
    }

    pub fn geometry(&self) -> Option<&Geometry> {
        self.geometry.as_deref()
    }

    pub fn is_renderable(&self) -> bool {
        self.geometry.is_some()
    }

    pub fn position(&self) -> Vector3<f32> {
        self.transform.position
    }

    pub fn set_position(&mut self, position: Vector3<f32>) {
        self.transform.position = position;
    }

    pub fn rotation(&self) -> Vector3<f32> {
        self.transform.rotation
    }

    pub fn set_rotation(&mut self, rotation: Vector3<f32>) {
        self.transform.rotation = rotation;
    }

    pub fn set_scale(&mut self, scale: f32) {
        self.transform.scale = Vector3::new(scale, scale, scale);
    }

    pub fn world_matrix(&self) -> Matrix4<f32> {
        self.transform.to_matrix()
    }

    /// Unit vector along the local Z axis.
    pub fn facing(&self) -> Vector3<f32> {
        local_axis(&self.world_matrix(), 2).normalize()
    }

    pub fn face_point(&mut self, point: Vector3<f32>) {
        self.transform.face_point(point);
    }

    pub fn face_direction(&mut self, direction: Vector3<f32>) {
        self.transform.face_direction(direction);
    }

    /// Turn and move the model with held keys. Motion scales with `dt` seconds.
    pub fn control(&mut self, input: &mut Input, dt: f32, keys: &ModelControls) {
        let world = self.world_matrix();
        let rotation = &mut self.transform.rotation;

        if input.key_held(keys.turn_down) {
            rotation.x += ROTATION_SPEED * dt;
        }
        if input.key_held(keys.turn_up) {
            rotation.x -= ROTATION_SPEED * dt;
        }
        if input.key_held(keys.turn_right) {
            rotation.y += ROTATION_SPEED * dt;
        }
        if input.key_held(keys.turn_left) {
            rotation.y -= ROTATION_SPEED * dt;
        }
        if input.key_held(keys.turn_cw) {
            rotation.z += ROTATION_SPEED * dt;
        }
        if input.key_held(keys.turn_ccw) {
            rotation.z -= ROTATION_SPEED * dt;
        }

        // The Z column includes the scale, as does the step
        let forward = local_axis(&world, 2) * MOVEMENT_SPEED * dt;
        if input.key_held(keys.move_forward) {
            self.transform.position += forward;
        }
        if input.key_held(keys.move_backward) {
            self.transform.position -= forward;
        }
    }

    /// Draw the whole mesh once per pass of `technique`.
    ///
    /// Does nothing without geometry. Bind groups must already be set.
    pub fn render(&self, render_pass: &mut wgpu::RenderPass<'_>, technique: &Technique) {
        let Some(geometry) = &self.geometry else {
            return;
        };
        let Some(pipelines) = technique.pipelines(&geometry.layout) else {
            log::warn!(
                "{} was not prepared for technique {}, skipping.",
                geometry.name,
                technique.kind().label()
            );
            return;
        };

        render_pass.set_vertex_buffer(0, geometry.vertex_buffer.slice(..));
        render_pass.set_index_buffer(geometry.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        for pipeline in pipelines {
            render_pass.set_pipeline(pipeline);
            render_pass.draw_indexed(0..geometry.num_indices, 0, 0..1);
        }
    }
}
