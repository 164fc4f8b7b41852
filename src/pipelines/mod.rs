//! Rendering techniques: shader entry points plus render state.
//!
//! A [`Technique`] is selected at draw time. It knows which vertex
//! attributes its shaders read and which bind groups it expects, and keeps
//! one set of render pipelines per vertex layout it was prepared for.
//!
//! Bind group slots of the lit and tinted techniques:
//!
//! | group | contents                                             |
//! |-------|------------------------------------------------------|
//! | 0     | diffuse/specular map, normal/depth map, samplers     |
//! | 1     | view matrices and camera position                    |
//! | 2     | lights, shadow map and scene parameters              |
//! | 3     | world matrix, tint colour and effect flags           |
//!
//! The depth-only technique uses the view at group 0, the effect
//! parameters at 1 and the object at 2. It cannot bind group 2 of the lit
//! techniques, which holds the shadow map it renders into.

use std::collections::HashMap;

use anyhow::bail;

use crate::{
    camera::mk_view_bind_group_layout,
    data_structures::{
        texture::Texture,
        vertex::{VertexAttributes, VertexLayout},
    },
};

/// Bind group layouts shared by every technique.
#[derive(Debug)]
pub struct Layouts {
    pub material: wgpu::BindGroupLayout,
    pub view: wgpu::BindGroupLayout,
    pub scene: wgpu::BindGroupLayout,
    pub effects: wgpu::BindGroupLayout,
    pub object: wgpu::BindGroupLayout,
}

impl Layouts {
    pub fn new(device: &wgpu::Device) -> Self {
        Self {
            material: diffuse_normal_layout(device),
            view: mk_view_bind_group_layout(device),
            scene: mk_scene_bind_group_layout(device),
            effects: mk_uniform_bind_group_layout(device, "effects_bind_group_layout"),
            object: mk_object_bind_group_layout(device),
        }
    }

    fn get(&self, binding: Binding) -> &wgpu::BindGroupLayout {
        match binding {
            Binding::Material => &self.material,
            Binding::View => &self.view,
            Binding::Scene => &self.scene,
            Binding::Effects => &self.effects,
            Binding::Object => &self.object,
        }
    }
}

pub fn diffuse_normal_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 3,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
        label: Some("Model texture_bind_group_layout"),
    })
}

pub fn mk_scene_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Depth,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                count: None,
            },
        ],
        label: Some("scene_bind_group_layout"),
    })
}

pub fn mk_object_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    mk_uniform_bind_group_layout(device, "object_bind_group_layout")
}

/// A single uniform buffer at binding 0, visible to both shader stages.
pub fn mk_uniform_bind_group_layout(device: &wgpu::Device, label: &str) -> wgpu::BindGroupLayout {
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
        label: Some(label),
    })
}

/// A bind group a technique expects, in slot order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Binding {
    Material,
    View,
    Scene,
    /// Effect phases and toggles without the shadow map.
    Effects,
    Object,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TechniqueKind {
    /// Normal mapping with a height-based texture offset, per-pixel lights
    /// and the spot light shadow.
    ParallaxMapping,
    /// Lighting evaluated per vertex on a plain diffuse texture.
    VertexLitTex,
    /// Texture times tint colour, added onto what is already drawn.
    AdditiveTintTex,
    /// Writes depth only, used to fill the shadow map.
    DepthOnly,
}

impl TechniqueKind {
    pub const ALL: [TechniqueKind; 4] = [
        TechniqueKind::ParallaxMapping,
        TechniqueKind::VertexLitTex,
        TechniqueKind::AdditiveTintTex,
        TechniqueKind::DepthOnly,
    ];

    pub fn label(self) -> &'static str {
        match self {
            TechniqueKind::ParallaxMapping => "Parallax Mapping",
            TechniqueKind::VertexLitTex => "Vertex Lit Tex",
            TechniqueKind::AdditiveTintTex => "Additive Tint Tex",
            TechniqueKind::DepthOnly => "Depth Only",
        }
    }

    /// Vertex attributes the shaders read besides the position.
    pub fn signature(self) -> VertexAttributes {
        match self {
            TechniqueKind::ParallaxMapping => VertexAttributes::new(true, true, true, false),
            TechniqueKind::VertexLitTex => VertexAttributes::new(true, false, true, false),
            TechniqueKind::AdditiveTintTex => VertexAttributes::new(false, false, true, false),
            // Normals feed the wiggle displacement
            TechniqueKind::DepthOnly => VertexAttributes::new(true, false, false, false),
        }
    }

    pub fn bindings(self) -> Vec<Binding> {
        match self {
            TechniqueKind::DepthOnly => vec![Binding::View, Binding::Effects, Binding::Object],
            _ => vec![
                Binding::Material,
                Binding::View,
                Binding::Scene,
                Binding::Object,
            ],
        }
    }

    /// True if the technique renders into a colour target.
    pub fn has_colour(self) -> bool {
        self != TechniqueKind::DepthOnly
    }

    pub fn passes(self) -> Vec<PassState> {
        match self {
            TechniqueKind::ParallaxMapping => vec![PassState {
                vs_entry: "vs_parallax",
                fs_entry: Some("fs_parallax"),
                ..Default::default()
            }],
            TechniqueKind::VertexLitTex => vec![PassState {
                vs_entry: "vs_lit",
                fs_entry: Some("fs_lit"),
                ..Default::default()
            }],
            TechniqueKind::AdditiveTintTex => vec![PassState {
                vs_entry: "vs_main",
                fs_entry: Some("fs_main"),
                blend: Some(ADDITIVE_BLENDING),
                depth_write: false,
                cull_mode: None,
                ..Default::default()
            }],
            TechniqueKind::DepthOnly => vec![PassState {
                vs_entry: "vs_main",
                fs_entry: None,
                blend: None,
                depth_bias: wgpu::DepthBiasState {
                    constant: 2,
                    slope_scale: 2.0,
                    clamp: 0.0,
                },
                ..Default::default()
            }],
        }
    }

    fn shader(self) -> wgpu::ShaderModuleDescriptor<'static> {
        match self {
            TechniqueKind::ParallaxMapping | TechniqueKind::VertexLitTex => {
                wgpu::ShaderModuleDescriptor {
                    label: Some("Lit Shader"),
                    source: wgpu::ShaderSource::Wgsl(include_str!("lit.wgsl").into()),
                }
            }
            TechniqueKind::AdditiveTintTex => wgpu::ShaderModuleDescriptor {
                label: Some("Tint Shader"),
                source: wgpu::ShaderSource::Wgsl(include_str!("tint.wgsl").into()),
            },
            TechniqueKind::DepthOnly => wgpu::ShaderModuleDescriptor {
                label: Some("Depth Shader"),
                source: wgpu::ShaderSource::Wgsl(include_str!("depth.wgsl").into()),
            },
        }
    }
}

/// Adds the source colour onto the target, ignoring alpha.
pub const ADDITIVE_BLENDING: wgpu::BlendState = wgpu::BlendState {
    color: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
    alpha: wgpu::BlendComponent::REPLACE,
};

/// Entry points and fixed-function state of one rendering pass.
#[derive(Debug, Clone, Copy)]
pub struct PassState {
    pub vs_entry: &'static str,
    pub fs_entry: Option<&'static str>,
    pub blend: Option<wgpu::BlendState>,
    pub depth_write: bool,
    pub cull_mode: Option<wgpu::Face>,
    pub depth_bias: wgpu::DepthBiasState,
}

impl Default for PassState {
    fn default() -> Self {
        Self {
            vs_entry: "vs_main",
            fs_entry: Some("fs_main"),
            blend: Some(wgpu::BlendState::REPLACE),
            depth_write: true,
            cull_mode: Some(wgpu::Face::Back),
            depth_bias: wgpu::DepthBiasState::default(),
        }
    }
}

/// A compiled shader with its passes, ready to draw any mesh whose vertex
/// layout it was prepared for.
///
/// The technique owns the shader module and the pipeline layout built from
/// its [`Binding`] slots. Render pipelines depend on the vertex layout as
/// well, so they are created lazily by [`Technique::prepare`] and cached per
/// [`VertexLayout`]. Models never hold on to a technique; the caller picks
/// one per draw.
pub struct Technique {
    kind: TechniqueKind,
    shader: wgpu::ShaderModule,
    layout: wgpu::PipelineLayout,
    passes: Vec<PassState>,
    signature: VertexAttributes,
    bindings: Vec<Binding>,
    color_format: Option<wgpu::TextureFormat>,
    pipelines: HashMap<VertexLayout, Vec<wgpu::RenderPipeline>>,
}

impl Technique {
    /// Compile the shader of `kind` and create its pipeline layout.
    ///
    /// # Arguments
    ///
    /// * `kind` selects the shader, passes, signature and bind group slots
    /// * `layouts` provides the bind group layout of every slot
    /// * `color_format` is the format of the colour targets it will draw
    ///   to; it is ignored for depth-only techniques
    pub fn new(
        device: &wgpu::Device,
        kind: TechniqueKind,
        layouts: &Layouts,
        color_format: wgpu::TextureFormat,
    ) -> Self {
        let bindings = kind.bindings();
        let bind_group_layouts: Vec<&wgpu::BindGroupLayout> =
            bindings.iter().map(|&b| layouts.get(b)).collect();
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("{} Pipeline Layout", kind.label())),
            bind_group_layouts: &bind_group_layouts,
            ..Default::default()
        });
        let shader = device.create_shader_module(kind.shader());
        log::info!("Compiled technique {}", kind.label());

        Self {
            kind,
            shader,
            layout,
            passes: kind.passes(),
            signature: kind.signature(),
            bindings,
            color_format: kind.has_colour().then_some(color_format),
            pipelines: HashMap::new(),
        }
    }

    pub fn kind(&self) -> TechniqueKind {
        self.kind
    }

    pub fn signature(&self) -> VertexAttributes {
        self.signature
    }

    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    pub fn passes(&self) -> &[PassState] {
        &self.passes
    }

    /// Check that `layout` feeds every attribute the shaders read and create
    /// the pipelines for it, one per pass.
    ///
    /// Attributes the layout has beyond the signature are skipped by the
    /// vertex state. Preparing the same layout twice is cheap.
    ///
    /// # Arguments
    ///
    /// * `device` creates the render pipelines
    /// * `layout` is the vertex layout of a mesh about to be drawn with this
    ///   technique
    ///
    /// # Errors
    ///
    /// Fails, naming the missing attributes, if the layout lacks one the
    /// shaders read. Nothing is cached in that case.
    pub fn prepare(&mut self, device: &wgpu::Device, layout: &VertexLayout) -> anyhow::Result<()> {
        let missing = layout.attributes.missing(&self.signature);
        if !missing.is_empty() {
            bail!(
                "technique {} needs vertex attributes {:?} that the mesh does not have",
                self.kind.label(),
                missing
            );
        }
        if self.pipelines.contains_key(layout) {
            return Ok(());
        }

        let attributes = layout.wgpu_attributes(&self.signature);
        let vertex_layouts = [layout.desc(&attributes)];
        let pipelines = self
            .passes
            .iter()
            .map(|pass| {
                mk_render_pipeline(
                    device,
                    &self.layout,
                    &self.shader,
                    pass,
                    self.color_format,
                    Some(Texture::DEPTH_FORMAT),
                    &vertex_layouts,
                    self.kind.label(),
                )
            })
            .collect();
        self.pipelines.insert(*layout, pipelines);
        Ok(())
    }

    /// Pipelines for `layout`, one per pass, if it was prepared.
    pub fn pipelines(&self, layout: &VertexLayout) -> Option<&[wgpu::RenderPipeline]> {
        self.pipelines.get(layout).map(Vec::as_slice)
    }
}

/// All techniques a scene can draw with, one per [`TechniqueKind`],
/// created up front.
pub struct Techniques {
    techniques: HashMap<TechniqueKind, Technique>,
}

impl Techniques {
    pub fn new(
        device: &wgpu::Device,
        layouts: &Layouts,
        color_format: wgpu::TextureFormat,
    ) -> Self {
        let techniques = TechniqueKind::ALL
            .into_iter()
            .map(|kind| (kind, Technique::new(device, kind, layouts, color_format)))
            .collect();
        Self { techniques }
    }

    pub fn get(&self, kind: TechniqueKind) -> &Technique {
        &self.techniques[&kind]
    }

    pub fn get_mut(&mut self, kind: TechniqueKind) -> &mut Technique {
        self.techniques
            .get_mut(&kind)
            .unwrap_or_else(|| unreachable!("every technique kind is created up front"))
    }
}

/// Create the render pipeline of one pass.
///
/// # Arguments
///
/// * `layout` is the pipeline layout of the technique
/// * `pass` holds the entry points and fixed-function state
/// * `color_format` is `None` for depth-only pipelines, which then get no
///   fragment stage
/// * `depth_format` of the depth attachment, if any
/// * `vertex_layouts` describes the vertex buffer, filtered to the
///   attributes the shader reads
/// * `label` is used as a debug label for the GPU resource
#[allow(clippy::too_many_arguments)]
pub fn mk_render_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    pass: &PassState,
    color_format: Option<wgpu::TextureFormat>,
    depth_format: Option<wgpu::TextureFormat>,
    vertex_layouts: &[wgpu::VertexBufferLayout],
    label: &str,
) -> wgpu::RenderPipeline {
    let targets = [color_format.map(|format| wgpu::ColorTargetState {
        format,
        blend: pass.blend,
        write_mask: wgpu::ColorWrites::ALL,
    })];
    let fragment = match (pass.fs_entry, color_format) {
        (Some(entry_point), Some(_)) => Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some(entry_point),
            targets: &targets,
            compilation_options: Default::default(),
        }),
        _ => None,
    };

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        cache: None,
        label: Some(&format!("{label} Render Pipeline")),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some(pass.vs_entry),
            buffers: vertex_layouts,
            compilation_options: Default::default(),
        },
        fragment,
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            // Meshes are authored for a left-handed system
            front_face: wgpu::FrontFace::Cw,
            cull_mode: pass.cull_mode,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: depth_format.map(|format| wgpu::DepthStencilState {
            format,
            depth_write_enabled: pass.depth_write,
            depth_compare: wgpu::CompareFunction::LessEqual,
            stencil: wgpu::StencilState::default(),
            bias: pass.depth_bias,
        }),
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signatures_match_the_techniques() {
        let parallax = TechniqueKind::ParallaxMapping.signature();
        assert!(parallax.normal && parallax.tangent && parallax.tex_coord);
        assert!(!TechniqueKind::VertexLitTex.signature().tangent);
        assert_eq!(
            TechniqueKind::DepthOnly.signature(),
            VertexAttributes::new(true, false, false, false)
        );
    }

    #[test]
    fn depth_only_has_no_colour_or_material() {
        let kind = TechniqueKind::DepthOnly;
        assert!(!kind.has_colour());
        assert_eq!(
            kind.bindings(),
            vec![Binding::View, Binding::Effects, Binding::Object]
        );
        assert!(!kind.bindings().contains(&Binding::Scene));
        assert!(kind.passes().iter().all(|p| p.fs_entry.is_none()));
    }

    #[test]
    fn additive_pass_keeps_depth_buffer() {
        let passes = TechniqueKind::AdditiveTintTex.passes();
        assert_eq!(passes.len(), 1);
        assert!(!passes[0].depth_write);
        assert_eq!(passes[0].blend, Some(ADDITIVE_BLENDING));
    }

    #[test]
    fn main_techniques_share_slot_order() {
        for kind in TechniqueKind::ALL.into_iter().filter(|k| k.has_colour()) {
            assert_eq!(
                kind.bindings(),
                vec![
                    Binding::Material,
                    Binding::View,
                    Binding::Scene,
                    Binding::Object
                ]
            );
        }
    }
}
