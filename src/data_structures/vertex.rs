//! Per-vertex attribute layouts built at load time.
//!
//! Meshes carry a varying set of attributes. Position is always present,
//! normals, tangents, texture coordinates and vertex colours are appended in
//! that order when the mesh provides them. Each attribute has a fixed size
//! and a fixed shader location, so a shader can read any subset of a layout.

/// A single kind of per-vertex data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Semantic {
    Position,
    Normal,
    Tangent,
    TexCoord,
    Colour,
}

impl Semantic {
    pub const ALL: [Semantic; 5] = [
        Semantic::Position,
        Semantic::Normal,
        Semantic::Tangent,
        Semantic::TexCoord,
        Semantic::Colour,
    ];

    /// Corresponds to the `@location` in the shader files.
    pub fn shader_location(self) -> wgpu::ShaderLocation {
        match self {
            Semantic::Position => 0,
            Semantic::Normal => 1,
            Semantic::Tangent => 2,
            Semantic::TexCoord => 3,
            Semantic::Colour => 4,
        }
    }

    pub fn format(self) -> wgpu::VertexFormat {
        match self {
            Semantic::Position | Semantic::Normal | Semantic::Tangent => {
                wgpu::VertexFormat::Float32x3
            }
            Semantic::TexCoord => wgpu::VertexFormat::Float32x2,
            // One byte (0-255) per component
            Semantic::Colour => wgpu::VertexFormat::Unorm8x4,
        }
    }

    pub fn size(self) -> wgpu::BufferAddress {
        self.format().size()
    }
}

/// Which optional attributes a vertex carries. Position is implied.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexAttributes {
    pub normal: bool,
    pub tangent: bool,
    pub tex_coord: bool,
    pub colour: bool,
}

impl VertexAttributes {
    pub fn new(normal: bool, tangent: bool, tex_coord: bool, colour: bool) -> Self {
        Self {
            normal,
            tangent,
            tex_coord,
            colour,
        }
    }

    pub fn contains(&self, semantic: Semantic) -> bool {
        match semantic {
            Semantic::Position => true,
            Semantic::Normal => self.normal,
            Semantic::Tangent => self.tangent,
            Semantic::TexCoord => self.tex_coord,
            Semantic::Colour => self.colour,
        }
    }

    pub fn missing(&self, required: &VertexAttributes) -> Vec<Semantic> {
        Semantic::ALL
            .into_iter()
            .filter(|&s| required.contains(s) && !self.contains(s))
            .collect()
    }
}

/// Byte layout of one interleaved vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexLayout {
    pub attributes: VertexAttributes,
    pub stride: wgpu::BufferAddress,
}

impl VertexLayout {
    pub fn new(attributes: VertexAttributes) -> Self {
        let stride = Semantic::ALL
            .iter()
            .filter(|&&s| attributes.contains(s))
            .map(|s| s.size())
            .sum();
        Self { attributes, stride }
    }

    /// Byte offset of `semantic` within a vertex, if present.
    pub fn offset(&self, semantic: Semantic) -> Option<wgpu::BufferAddress> {
        if !self.attributes.contains(semantic) {
            return None;
        }
        let offset = Semantic::ALL
            .iter()
            .take_while(|&&s| s != semantic)
            .filter(|&&s| self.attributes.contains(s))
            .map(|s| s.size())
            .sum();
        Some(offset)
    }

    /// Vertex attributes for a shader reading only `signature`.
    ///
    /// The stride stays that of the full vertex so unused attributes are
    /// skipped over. Semantics missing from this layout are left out.
    pub fn wgpu_attributes(&self, signature: &VertexAttributes) -> Vec<wgpu::VertexAttribute> {
        Semantic::ALL
            .into_iter()
            .filter(|&s| signature.contains(s))
            .filter_map(|s| {
                self.offset(s).map(|offset| wgpu::VertexAttribute {
                    offset,
                    shader_location: s.shader_location(),
                    format: s.format(),
                })
            })
            .collect()
    }

    pub fn desc<'a>(&self, attributes: &'a [wgpu::VertexAttribute]) -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: self.stride,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes,
        }
    }
}

/// Interleave separate attribute arrays into vertex bytes matching `layout`.
///
/// Attributes the layout does not contain are ignored. Arrays that are
/// shorter than `positions` are padded with zeroes.
pub fn interleave(
    layout: &VertexLayout,
    positions: &[[f32; 3]],
    normals: &[[f32; 3]],
    tangents: &[[f32; 3]],
    tex_coords: &[[f32; 2]],
    colours: &[[u8; 4]],
) -> Vec<u8> {
    let attributes = layout.attributes;
    let mut bytes = Vec::with_capacity(positions.len() * layout.stride as usize);
    for (i, position) in positions.iter().enumerate() {
        bytes.extend_from_slice(bytemuck::bytes_of(position));
        if attributes.normal {
            let normal = normals.get(i).copied().unwrap_or_default();
            bytes.extend_from_slice(bytemuck::bytes_of(&normal));
        }
        if attributes.tangent {
            let tangent = tangents.get(i).copied().unwrap_or_default();
            bytes.extend_from_slice(bytemuck::bytes_of(&tangent));
        }
        if attributes.tex_coord {
            let uv = tex_coords.get(i).copied().unwrap_or_default();
            bytes.extend_from_slice(bytemuck::bytes_of(&uv));
        }
        if attributes.colour {
            let colour = colours.get(i).copied().unwrap_or_default();
            bytes.extend_from_slice(&colour);
        }
    }
    debug_assert_eq!(
        bytes.len(),
        positions.len() * layout.stride as usize,
        "interleaved size must match stride"
    );
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    const FLOAT_SIZE: usize = std::mem::size_of::<f32>();

    #[test]
    fn position_only_layout() {
        let layout = VertexLayout::new(VertexAttributes::default());
        assert_eq!(layout.stride, 12);
        assert_eq!(layout.offset(Semantic::Position), Some(0));
        assert_eq!(layout.offset(Semantic::Normal), None);
    }

    #[test]
    fn full_layout_offsets() {
        let layout = VertexLayout::new(VertexAttributes::new(true, true, true, true));
        assert_eq!(layout.offset(Semantic::Position), Some(0));
        assert_eq!(layout.offset(Semantic::Normal), Some(12));
        assert_eq!(layout.offset(Semantic::Tangent), Some(24));
        assert_eq!(layout.offset(Semantic::TexCoord), Some(36));
        assert_eq!(layout.offset(Semantic::Colour), Some(44));
        assert_eq!(layout.stride, 48);
    }

    #[test]
    fn offsets_skip_absent_attributes() {
        // position, uv, colour
        let layout = VertexLayout::new(VertexAttributes::new(false, false, true, true));
        assert_eq!(layout.offset(Semantic::TexCoord), Some(12));
        assert_eq!(layout.offset(Semantic::Colour), Some(20));
        assert_eq!(layout.stride, 24);

        // position, normal, uv (a lit mesh without tangents)
        let layout = VertexLayout::new(VertexAttributes::new(true, false, true, false));
        assert_eq!(layout.offset(Semantic::TexCoord), Some(24));
        assert_eq!(layout.stride, 32);
    }

    #[test]
    fn shader_subset_keeps_full_stride() {
        let layout = VertexLayout::new(VertexAttributes::new(true, true, true, false));
        let depth_only = VertexAttributes::default();
        let attributes = layout.wgpu_attributes(&depth_only);
        assert_eq!(attributes.len(), 1);
        assert_eq!(attributes[0].shader_location, 0);
        assert_eq!(layout.desc(&attributes).array_stride, 44);

        let tinted = VertexAttributes::new(false, false, true, false);
        let attributes = layout.wgpu_attributes(&tinted);
        assert_eq!(attributes.len(), 2);
        assert_eq!(attributes[1].offset, 36);
        assert_eq!(attributes[1].shader_location, 3);
    }

    #[test]
    fn missing_lists_absent_attributes() {
        let parallax = VertexAttributes::new(true, true, true, false);
        let lit = VertexAttributes::new(true, false, true, false);
        assert!(parallax.missing(&lit).is_empty());
        assert_eq!(lit.missing(&parallax), vec![Semantic::Tangent]);
        assert!(lit.missing(&VertexAttributes::default()).is_empty());
    }

    #[test]
    fn interleaves_in_layout_order() {
        let layout = VertexLayout::new(VertexAttributes::new(true, false, true, true));
        let bytes = interleave(
            &layout,
            &[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]],
            &[[0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            &[],
            &[[0.5, 0.25]],
            &[[255, 0, 128, 255], [1, 2, 3, 4]],
        );
        assert_eq!(bytes.len(), 2 * layout.stride as usize);

        let second = &bytes[layout.stride as usize..];
        let floats: Vec<f32> = second[..8 * FLOAT_SIZE]
            .chunks_exact(FLOAT_SIZE)
            .map(|c| f32::from_ne_bytes(c.try_into().unwrap()))
            .collect();
        // position, normal, uv padded with zeroes
        assert_eq!(floats, vec![4.0, 5.0, 6.0, 0.0, 0.0, 1.0, 0.0, 0.0]);
        assert_eq!(&second[8 * FLOAT_SIZE..], &[1, 2, 3, 4]);
    }
}
