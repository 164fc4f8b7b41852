use std::io::{BufReader, Cursor};

use anyhow::{Context, bail};
use cgmath::{InnerSpace, Vector2, Vector3, Zero};

use crate::{data_structures::vertex::VertexAttributes, resources::load_string};

/// Geometry of one sub-mesh as produced by the importer.
///
/// Optional attribute arrays are either empty or have one entry per position.
#[derive(Debug, Default, Clone)]
pub struct SubMesh {
    pub name: String,
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub tangents: Vec<[f32; 3]>,
    pub tex_coords: Vec<[f32; 2]>,
    pub colours: Vec<[u8; 4]>,
    pub indices: Vec<u32>,
}

impl SubMesh {
    pub fn attributes(&self) -> VertexAttributes {
        VertexAttributes {
            normal: !self.normals.is_empty(),
            tangent: !self.tangents.is_empty(),
            tex_coord: !self.tex_coords.is_empty(),
            colour: !self.colours.is_empty(),
        }
    }

    pub fn num_vertices(&self) -> usize {
        self.positions.len()
    }

    /// Convert an imported mesh. Tangents are generated when requested and
    /// the mesh has both normals and texture coordinates.
    pub fn from_tobj(name: &str, mesh: &tobj::Mesh, want_tangents: bool) -> anyhow::Result<Self> {
        let num_vertices = mesh.positions.len() / 3;
        if num_vertices == 0 || mesh.indices.is_empty() {
            bail!("sub-mesh {name} has no geometry");
        }
        if let Some(index) = mesh.indices.iter().find(|&&i| i as usize >= num_vertices) {
            bail!("sub-mesh {name} references vertex {index} of {num_vertices}");
        }
        if mesh.indices.len() % 3 != 0 {
            bail!("sub-mesh {name} is not a triangle list");
        }

        let positions = mesh
            .positions
            .chunks_exact(3)
            .map(|p| [p[0], p[1], p[2]])
            .collect();
        let normals = if mesh.normals.len() >= num_vertices * 3 {
            mesh.normals
                .chunks_exact(3)
                .take(num_vertices)
                .map(|n| [n[0], n[1], n[2]])
                .collect()
        } else {
            Vec::new()
        };
        let tex_coords = if mesh.texcoords.len() >= num_vertices * 2 {
            mesh.texcoords
                .chunks_exact(2)
                .take(num_vertices)
                // Obj texture coordinates start at the bottom, wgpu's at the top
                .map(|t| [t[0], 1.0 - t[1]])
                .collect()
        } else {
            Vec::new()
        };
        let colours = if mesh.vertex_color.len() >= num_vertices * 3 {
            mesh.vertex_color
                .chunks_exact(3)
                .take(num_vertices)
                .map(|c| {
                    let to_u8 = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
                    [to_u8(c[0]), to_u8(c[1]), to_u8(c[2]), 255]
                })
                .collect()
        } else {
            Vec::new()
        };

        let mut sub_mesh = SubMesh {
            name: name.to_string(),
            positions,
            normals,
            tangents: Vec::new(),
            tex_coords,
            colours,
            indices: mesh.indices.clone(),
        };
        if want_tangents {
            if sub_mesh.normals.is_empty() || sub_mesh.tex_coords.is_empty() {
                log::warn!(
                    "Tangents requested for {name} but it lacks normals or texture coordinates."
                );
            } else {
                sub_mesh.tangents = compute_tangents(
                    &sub_mesh.positions,
                    &sub_mesh.normals,
                    &sub_mesh.tex_coords,
                    &sub_mesh.indices,
                );
            }
        }
        Ok(sub_mesh)
    }
}

/**
 * Obj files don't come with tangents so they have to be calculated for
 * normal and parallax maps to work correctly.
 *
 * Each triangle contributes its tangent to its three vertices. The sums are
 * then made orthogonal to the vertex normal and normalised.
 */
pub fn compute_tangents(
    positions: &[[f32; 3]],
    normals: &[[f32; 3]],
    tex_coords: &[[f32; 2]],
    indices: &[u32],
) -> Vec<[f32; 3]> {
    let mut tangents = vec![Vector3::<f32>::zero(); positions.len()];

    for c in indices.chunks_exact(3) {
        let (i0, i1, i2) = (c[0] as usize, c[1] as usize, c[2] as usize);
        let pos0: Vector3<_> = positions[i0].into();
        let pos1: Vector3<_> = positions[i1].into();
        let pos2: Vector3<_> = positions[i2].into();

        let uv0: Vector2<_> = tex_coords[i0].into();
        let uv1: Vector2<_> = tex_coords[i1].into();
        let uv2: Vector2<_> = tex_coords[i2].into();

        // Calculate the edges of the triangle
        let delta_pos1 = pos1 - pos0;
        let delta_pos2 = pos2 - pos0;
        let delta_uv1 = uv1 - uv0;
        let delta_uv2 = uv2 - uv0;

        // Solving
        //     delta_pos1 = delta_uv1.x * T + delta_uv1.y * B
        //     delta_pos2 = delta_uv2.x * T + delta_uv2.y * B
        // for T
        let det = delta_uv1.x * delta_uv2.y - delta_uv1.y * delta_uv2.x;
        if det.abs() < f32::EPSILON {
            continue;
        }
        let tangent = (delta_pos1 * delta_uv2.y - delta_pos2 * delta_uv1.y) / det;

        tangents[i0] += tangent;
        tangents[i1] += tangent;
        tangents[i2] += tangent;
    }

    tangents
        .into_iter()
        .zip(normals)
        .map(|(t, n)| {
            let n: Vector3<f32> = (*n).into();
            // Gram-Schmidt
            let t = t - n * n.dot(t);
            if t.magnitude2() > f32::EPSILON {
                t.normalize().into()
            } else {
                any_perpendicular(n).into()
            }
        })
        .collect()
}

fn any_perpendicular(n: Vector3<f32>) -> Vector3<f32> {
    let axis = if n.x.abs() < 0.9 {
        Vector3::unit_x()
    } else {
        Vector3::unit_y()
    };
    let t = axis - n * n.dot(axis);
    if t.is_zero() { axis } else { t.normalize() }
}

/// Parse obj text and return its first sub-mesh.
///
/// Materials referenced by the file are not loaded; textures come from the
/// scene description instead.
pub async fn parse_obj(
    text: String,
    file_name: &str,
    want_tangents: bool,
) -> anyhow::Result<SubMesh> {
    let obj_cursor = Cursor::new(text);
    let mut obj_reader = BufReader::new(obj_cursor);
    let (models, _materials) = tobj::load_obj_buf_async(
        &mut obj_reader,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
        |_| async move { Ok(Default::default()) },
    )
    .await
    .with_context(|| format!("{file_name} is not a valid obj file"))?;

    let first = models
        .first()
        .with_context(|| format!("{file_name} contains no meshes"))?;
    if models.len() > 1 {
        log::info!(
            "{} contains {} sub-meshes, only '{}' is used.",
            file_name,
            models.len(),
            first.name
        );
    }
    SubMesh::from_tobj(&first.name, &first.mesh, want_tangents)
        .with_context(|| format!("could not import {file_name}"))
}

/// Load `file_name` from the asset folder and import its first sub-mesh.
pub async fn load_sub_mesh(file_name: &str, want_tangents: bool) -> anyhow::Result<SubMesh> {
    let text = load_string(file_name).await?;
    parse_obj(text, file_name, want_tangents).await
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;

    use super::*;

    const QUAD: &str = "\
o Quad
v -1.0 0.0 -1.0
v 1.0 0.0 -1.0
v 1.0 0.0 1.0
v -1.0 0.0 1.0
vt 0.0 0.0
vt 1.0 0.0
vt 1.0 1.0
vt 0.0 1.0
vn 0.0 1.0 0.0
f 1/1/1 2/2/1 3/3/1
f 1/1/1 3/3/1 4/4/1
";

    const TWO_OBJECTS: &str = "\
o First
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v 0.0 1.0 0.0
f 1 2 3
o Second
v 0.0 0.0 1.0
v 1.0 0.0 1.0
v 0.0 1.0 1.0
f 4 5 6
";

    #[test]
    fn imports_attributes_of_first_sub_mesh() {
        let mesh = block_on(parse_obj(QUAD.to_string(), "quad.obj", false)).unwrap();
        assert_eq!(mesh.num_vertices(), 4);
        assert_eq!(mesh.indices.len(), 6);
        let attributes = mesh.attributes();
        assert!(attributes.normal);
        assert!(attributes.tex_coord);
        assert!(!attributes.tangent);
        assert!(!attributes.colour);
    }

    #[test]
    fn generates_tangents_on_request() {
        let mesh = block_on(parse_obj(QUAD.to_string(), "quad.obj", true)).unwrap();
        assert!(mesh.attributes().tangent);
        assert_eq!(mesh.tangents.len(), mesh.num_vertices());
        for (t, n) in mesh.tangents.iter().zip(&mesh.normals) {
            let t: Vector3<f32> = (*t).into();
            let n: Vector3<f32> = (*n).into();
            assert!((t.magnitude() - 1.0).abs() < 1e-4);
            assert!(t.dot(n).abs() < 1e-4);
            // u grows along +x in this quad
            assert!((t.x - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn positions_only_mesh_gets_no_tangents() {
        let mesh = block_on(parse_obj(TWO_OBJECTS.to_string(), "two.obj", true)).unwrap();
        assert_eq!(mesh.name, "First");
        assert_eq!(mesh.num_vertices(), 3);
        assert_eq!(mesh.attributes(), VertexAttributes::default());
    }

    #[test]
    fn rejects_empty_files() {
        assert!(block_on(parse_obj(String::new(), "empty.obj", false)).is_err());
    }

    #[test]
    fn rejects_out_of_range_indices() {
        let mesh = tobj::Mesh {
            positions: vec![0.0; 9],
            indices: vec![0, 1, 7],
            ..Default::default()
        };
        assert!(SubMesh::from_tobj("broken", &mesh, false).is_err());
    }

    #[test]
    fn converts_vertex_colours() {
        let mesh = tobj::Mesh {
            positions: vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            vertex_color: vec![1.0, 0.0, 0.5, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
            indices: vec![0, 1, 2],
            ..Default::default()
        };
        let sub_mesh = SubMesh::from_tobj("coloured", &mesh, false).unwrap();
        assert!(sub_mesh.attributes().colour);
        assert_eq!(sub_mesh.colours[0], [255, 0, 128, 255]);
    }
}
