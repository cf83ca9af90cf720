//! Geometry: vertices, indexed meshes, and a few built-in shapes.

use glam::{DVec2, DVec3, DVec4};

use crate::error::SoftrasError;

/// A single mesh vertex.
///
/// When normal, tangent, and bitangent are all present they form an
/// orthonormal frame used for tangent-space normal mapping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    /// Object-space position.
    pub position: DVec3,
    /// Texture coordinate, v = 0 at the bottom.
    pub tex_coord: DVec2,
    /// Unit surface normal.
    pub normal: DVec3,
    /// Unit tangent (u-gradient direction).
    pub tangent: DVec3,
    /// Unit bitangent (v-gradient direction).
    pub bitangent: DVec3,
    /// Vertex color, each component in [0, 1].
    pub color: DVec4,
}

impl Default for Vertex {
    fn default() -> Self {
        Self {
            position: DVec3::ZERO,
            tex_coord: DVec2::ZERO,
            normal: DVec3::ZERO,
            tangent: DVec3::ZERO,
            bitangent: DVec3::ZERO,
            color: DVec4::new(0.0, 0.0, 0.0, 1.0),
        }
    }
}

impl Vertex {
    /// Vertex at a position with everything else defaulted.
    pub fn at(position: DVec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }
}

/// What the index list describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshKind {
    /// Index triples forming triangles.
    Triangles,
    /// Index pairs forming line segments.
    Lines,
}

/// An immutable indexed mesh.
///
/// Construction validates the index list against the kind and the vertex
/// count; after that the mesh never changes, which is what lets the
/// rasterizer share it freely across parallel pixel work.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    kind: MeshKind,
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
}

impl Mesh {
    /// Build a triangle mesh. The index count must be a multiple of three
    /// and every index must be in range.
    ///
    /// If no vertex carries a tangent, per-triangle tangents and bitangents
    /// are derived from the position and texture-coordinate gradients so
    /// that normal mapping has a frame to work with.
    pub fn triangles(
        vertices: Vec<Vertex>,
        indices: Vec<u32>,
    ) -> Result<Self, SoftrasError> {
        if indices.len() % 3 != 0 {
            return Err(SoftrasError::InvalidMesh(format!(
                "triangle mesh index count {} is not a multiple of 3",
                indices.len()
            )));
        }
        Self::check_indices(&vertices, &indices)?;
        let mut mesh = Self {
            kind: MeshKind::Triangles,
            vertices,
            indices,
        };
        if !mesh.has_tangents() {
            mesh.generate_tangents();
        }
        Ok(mesh)
    }

    /// Build a line mesh. The index count must be even and every index must
    /// be in range.
    pub fn lines(
        vertices: Vec<Vertex>,
        indices: Vec<u32>,
    ) -> Result<Self, SoftrasError> {
        if indices.len() % 2 != 0 {
            return Err(SoftrasError::InvalidMesh(format!(
                "line mesh index count {} is not a multiple of 2",
                indices.len()
            )));
        }
        Self::check_indices(&vertices, &indices)?;
        Ok(Self {
            kind: MeshKind::Lines,
            vertices,
            indices,
        })
    }

    fn check_indices(
        vertices: &[Vertex],
        indices: &[u32],
    ) -> Result<(), SoftrasError> {
        if let Some(&bad) =
            indices.iter().find(|&&i| i as usize >= vertices.len())
        {
            return Err(SoftrasError::InvalidMesh(format!(
                "index {bad} out of range for {} vertices",
                vertices.len()
            )));
        }
        Ok(())
    }

    /// The primitive kind of the index list.
    pub fn kind(&self) -> MeshKind {
        self.kind
    }

    /// The vertex list.
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// The index list.
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    fn has_tangents(&self) -> bool {
        self.vertices.iter().any(|v| v.tangent != DVec3::ZERO)
    }

    /// Derive per-triangle tangent frames from position and uv gradients.
    /// Triangles with degenerate uv area keep zero tangents.
    fn generate_tangents(&mut self) {
        for tri in self.indices.clone().chunks_exact(3) {
            let (i1, i2, i3) =
                (tri[0] as usize, tri[1] as usize, tri[2] as usize);
            let v1 = self.vertices[i1];
            let v2 = self.vertices[i2];
            let v3 = self.vertices[i3];

            let edge1 = v2.position - v1.position;
            let edge2 = v3.position - v1.position;
            let duv1 = v2.tex_coord - v1.tex_coord;
            let duv2 = v3.tex_coord - v1.tex_coord;

            let det = duv1.x * duv2.y - duv2.x * duv1.y;
            if det == 0.0 {
                continue;
            }
            let f = 1.0 / det;

            let tangent = f * (duv2.y * edge1 - duv1.y * edge2);
            let bitangent = f * (-duv2.x * edge1 + duv1.x * edge2);
            // Collapsed triangles (e.g. at a sphere pole) yield zero
            // gradients; leave those vertices to a neighboring triangle.
            if tangent.length_squared() == 0.0
                || bitangent.length_squared() == 0.0
            {
                continue;
            }
            let tangent = tangent.normalize();
            let bitangent = bitangent.normalize();

            for &i in &[i1, i2, i3] {
                self.vertices[i].tangent = tangent;
                self.vertices[i].bitangent = bitangent;
            }
        }
    }

    /// A unit-colored UV sphere centered at the origin.
    ///
    /// Generates `(rings + 1) x (sectors + 1)` vertices so the seam and the
    /// poles land on exact grid positions; texture coordinates span the
    /// full [0, 1] range.
    pub fn sphere(
        radius: f64,
        rings: usize,
        sectors: usize,
    ) -> Result<Self, SoftrasError> {
        use std::f64::consts::PI;

        let ring_count = rings + 1;
        let sector_count = sectors + 1;
        let ring_step = 1.0 / (ring_count - 1) as f64;
        let sector_step = 1.0 / (sector_count - 1) as f64;

        let mut vertices = Vec::with_capacity(ring_count * sector_count);
        for r in 0..ring_count {
            for s in 0..sector_count {
                let polar = PI * r as f64 * ring_step;
                let azimuth = 2.0 * PI * s as f64 * sector_step;

                let y = (PI / 2.0 + polar).sin();
                let x = azimuth.cos() * polar.sin();
                let z = azimuth.sin() * polar.sin();

                let position = DVec3::new(x, y, z) * radius;
                vertices.push(Vertex {
                    position,
                    tex_coord: DVec2::new(
                        s as f64 * sector_step,
                        r as f64 * ring_step,
                    ),
                    normal: DVec3::new(x, y, z).normalize(),
                    color: DVec4::ONE,
                    ..Default::default()
                });
            }
        }

        let mut indices = Vec::new();
        for r in 0..ring_count - 1 {
            for s in 0..sector_count - 1 {
                let ia = (r * sector_count + s) as u32;
                let ib = (r * sector_count + s + 1) as u32;
                let ic = ((r + 1) * sector_count + s + 1) as u32;
                let id = ((r + 1) * sector_count + s) as u32;

                indices.extend_from_slice(&[id, ia, ib]);
                indices.extend_from_slice(&[ib, ic, id]);
            }
        }

        Self::triangles(vertices, indices)
    }

    /// A unit quad in the z = 0 plane spanning NDC x/y, facing +Z.
    pub fn quad() -> Result<Self, SoftrasError> {
        let corners = [
            (DVec3::new(-1.0, -1.0, 0.0), DVec2::new(0.0, 0.0)),
            (DVec3::new(1.0, -1.0, 0.0), DVec2::new(1.0, 0.0)),
            (DVec3::new(1.0, 1.0, 0.0), DVec2::new(1.0, 1.0)),
            (DVec3::new(-1.0, 1.0, 0.0), DVec2::new(0.0, 1.0)),
        ];
        let vertices = corners
            .into_iter()
            .map(|(position, tex_coord)| Vertex {
                position,
                tex_coord,
                normal: DVec3::Z,
                color: DVec4::ONE,
                ..Default::default()
            })
            .collect();
        Self::triangles(vertices, vec![0, 1, 2, 0, 2, 3])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triangle_index_count_is_validated() {
        let verts = vec![Vertex::default(); 3];
        assert!(Mesh::triangles(verts.clone(), vec![0, 1]).is_err());
        assert!(Mesh::triangles(verts, vec![0, 1, 2]).is_ok());
    }

    #[test]
    fn line_index_count_is_validated() {
        let verts = vec![Vertex::default(); 2];
        assert!(Mesh::lines(verts.clone(), vec![0]).is_err());
        assert!(Mesh::lines(verts, vec![0, 1]).is_ok());
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        let verts = vec![Vertex::default(); 3];
        assert!(matches!(
            Mesh::triangles(verts, vec![0, 1, 3]),
            Err(SoftrasError::InvalidMesh(_))
        ));
    }

    #[test]
    fn tangents_are_generated_from_uv_gradients() {
        let quad = Mesh::quad().unwrap();
        for v in quad.vertices() {
            // For the axis-aligned quad the tangent frame is the world
            // frame: tangent +X, bitangent +Y.
            assert!((v.tangent - DVec3::X).length() < 1e-12);
            assert!((v.bitangent - DVec3::Y).length() < 1e-12);
            // Orthonormal with the +Z normal.
            assert!(v.tangent.dot(v.normal).abs() < 1e-12);
            assert!(v.bitangent.dot(v.normal).abs() < 1e-12);
        }
    }

    #[test]
    fn sphere_has_a_front_pole_vertex() {
        let sphere = Mesh::sphere(1.0, 16, 32).unwrap();
        // With 16 rings and 32 sectors the equator ring and quarter sector
        // land exactly on (0, 0, 1).
        assert!(sphere
            .vertices()
            .iter()
            .any(|v| (v.position - DVec3::Z).length() < 1e-9));
        // Normals point away from the center.
        for v in sphere.vertices() {
            assert!((v.normal - v.position.normalize()).length() < 1e-9);
        }
    }

    #[test]
    fn sphere_triangle_count() {
        let sphere = Mesh::sphere(1.0, 4, 8).unwrap();
        // rings * sectors quads, two triangles each
        assert_eq!(sphere.indices().len(), 4 * 8 * 2 * 3);
    }
}
