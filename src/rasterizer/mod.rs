//! The primitive rasterizer: draws triangle and line meshes into a
//! framebuffer with hidden-surface removal and per-pixel shading.

mod line;
pub(crate) mod primitive;
mod triangle;

use std::sync::Arc;

use glam::{DMat3, DMat4, DVec3, DVec4};
use serde::{Deserialize, Serialize};

use crate::camera::Camera;
use crate::framebuffer::Framebuffer;
use crate::ibl::IblTextures;
use crate::material::Material;
use crate::mesh::{Mesh, MeshKind};
use crate::scene::Model;
use crate::shading::LightEnvironment;

/// How the per-pixel normal is chosen for triangles.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum NormalMode {
    /// Interpolate the vertex normals.
    Smooth,
    /// Use the triangle's face normal.
    #[default]
    Coarse,
}

/// A software rasterizer with a fixed-function vertex stage and a
/// programmable-in-spirit shading stage (Phong or PBR per material).
///
/// Draw calls consume the current matrices, light, material, and normal
/// mode; results accumulate in the owned framebuffer until
/// [`Rasterizer::clear`].
pub struct Rasterizer {
    framebuffer: Framebuffer,
    model_matrix: DMat4,
    view_matrix: DMat4,
    projection_matrix: DMat4,
    camera_matrix: DMat4,
    normal_matrix: DMat3,
    camera_position: DVec3,
    light_direction: DVec3,
    material: Material,
    normal_mode: NormalMode,
    ibl: Option<Arc<IblTextures>>,
}

impl Rasterizer {
    /// Create a rasterizer with a cleared framebuffer of the given size.
    ///
    /// Defaults: camera three units back along +Z with a 45 degree perspective,
    /// light shining along -Z, a white-diffuse Phong material, coarse
    /// normals, no IBL.
    pub fn new(width: usize, height: usize) -> Self {
        let aspect = if height == 0 {
            1.0
        } else {
            width as f64 / height as f64
        };
        let mut rasterizer = Self {
            framebuffer: Framebuffer::new(width, height),
            model_matrix: DMat4::IDENTITY,
            view_matrix: DMat4::from_translation(DVec3::new(0.0, 0.0, -3.0)),
            projection_matrix: DMat4::perspective_rh_gl(
                std::f64::consts::FRAC_PI_4,
                aspect,
                0.1,
                150.0,
            ),
            camera_matrix: DMat4::IDENTITY,
            normal_matrix: DMat3::IDENTITY,
            camera_position: DVec3::ZERO,
            light_direction: DVec3::new(0.0, 0.0, -1.0),
            material: Material::phong(crate::material::PhongMaterial {
                diffuse: DVec3::ONE,
                ..Default::default()
            }),
            normal_mode: NormalMode::default(),
            ibl: None,
        };
        rasterizer.update_matrices();
        rasterizer
    }

    /// Reset the framebuffer to transparent black and infinite depth.
    pub fn clear(&mut self) {
        self.framebuffer.clear();
    }

    /// Set the model matrix.
    pub fn set_model_matrix(&mut self, model: DMat4) {
        self.model_matrix = model;
        self.update_matrices();
    }

    /// Set the view matrix.
    pub fn set_view_matrix(&mut self, view: DMat4) {
        self.view_matrix = view;
        self.update_matrices();
    }

    /// Set the projection matrix.
    pub fn set_projection_matrix(&mut self, projection: DMat4) {
        self.projection_matrix = projection;
        self.update_matrices();
    }

    /// Set view and projection from a camera.
    pub fn set_camera(&mut self, camera: &Camera) {
        self.view_matrix = camera.view_matrix();
        self.projection_matrix = camera.projection_matrix();
        self.update_matrices();
    }

    /// Set the material used by subsequent draw calls.
    pub fn set_material(&mut self, material: Material) {
        self.material = material;
    }

    /// Set the normal selection mode.
    pub fn set_normal_mode(&mut self, normal_mode: NormalMode) {
        self.normal_mode = normal_mode;
    }

    /// Set the direction the light travels (the light shines along this
    /// vector).
    pub fn set_light_direction(&mut self, direction: DVec3) {
        self.light_direction = direction.normalize_or_zero();
    }

    /// Attach (or detach) the precomputed IBL textures consumed by PBR
    /// materials. The bundle is read-only and shared.
    pub fn set_ibl(&mut self, ibl: Option<Arc<IblTextures>>) {
        self.ibl = ibl;
    }

    fn update_matrices(&mut self) {
        self.camera_matrix =
            self.projection_matrix * self.view_matrix * self.model_matrix;
        self.normal_matrix =
            DMat3::from_mat4(self.model_matrix).inverse().transpose();
        self.camera_position = self
            .view_matrix
            .inverse()
            .transform_point3(DVec3::ZERO);
    }

    /// Rasterize a triangle mesh with the current state.
    ///
    /// Line meshes are rejected with a diagnostic; invalid primitives
    /// (degenerate or non-finite) are skipped individually and rendering
    /// continues.
    pub fn draw_filled_triangle_mesh(&mut self, mesh: &Mesh) {
        if mesh.kind() != MeshKind::Triangles {
            log::warn!("draw_filled_triangle_mesh called with a line mesh");
            return;
        }
        let draw = triangle::TriangleDraw {
            camera_matrix: self.camera_matrix,
            model_matrix: self.model_matrix,
            normal_matrix: self.normal_matrix,
            material: &self.material,
            normal_mode: self.normal_mode,
            lights: LightEnvironment {
                light_direction: self.light_direction,
                camera_position: self.camera_position,
                ibl: self.ibl.as_deref(),
            },
        };
        triangle::rasterize_triangle_mesh(&mut self.framebuffer, mesh, &draw);
    }

    /// Rasterize a line mesh with the current camera state. Lines are
    /// flat-shaded from their vertex colors.
    pub fn draw_line_mesh(&mut self, mesh: &Mesh) {
        if mesh.kind() != MeshKind::Lines {
            log::warn!("draw_line_mesh called with a triangle mesh");
            return;
        }
        line::rasterize_line_mesh(&mut self.framebuffer, mesh, &self.camera_matrix);
    }

    /// Rasterize the edges of a triangle mesh as white lines (wireframe).
    pub fn draw_edge_line_triangle_mesh(&mut self, mesh: &Mesh) {
        if mesh.kind() != MeshKind::Triangles {
            log::warn!(
                "draw_edge_line_triangle_mesh called with a line mesh"
            );
            return;
        }

        let mut vertices = Vec::with_capacity(mesh.indices().len());
        let mut indices = Vec::with_capacity(mesh.indices().len() * 2);
        for tri in mesh.indices().chunks_exact(3) {
            let base = vertices.len() as u32;
            for &i in tri {
                let mut v = mesh.vertices()[i as usize];
                v.color = DVec4::ONE;
                vertices.push(v);
            }
            indices.extend_from_slice(&[
                base,
                base + 1,
                base + 1,
                base + 2,
                base + 2,
                base,
            ]);
        }
        match Mesh::lines(vertices, indices) {
            Ok(line_mesh) => self.draw_line_mesh(&line_mesh),
            Err(e) => log::warn!("failed to derive edge mesh: {e}"),
        }
    }

    /// Draw every model in a scene, taking material and transform from
    /// each.
    pub fn draw_models(&mut self, models: &[Model]) {
        for model in models {
            log::debug!("drawing model '{}'", model.name);
            self.set_model_matrix(model.transform.matrix());
            self.set_material(model.material.clone());
            self.draw_filled_triangle_mesh(&model.mesh);
        }
    }

    /// The render targets.
    pub fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }

    /// Resize the framebuffer, clearing it.
    pub fn resize(&mut self, width: usize, height: usize) {
        self.framebuffer = Framebuffer::new(width, height);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::{MaterialModel, PhongMaterial};
    use crate::mesh::Vertex;
    use glam::DVec2;

    fn unlit_vertex_color_material() -> Material {
        // Ambient and specular off, diffuse straight from the vertex
        // color: with a light hitting head-on the output equals the
        // interpolated vertex color.
        Material::phong(PhongMaterial {
            diffuse_from_vertex: true,
            ambient: DVec3::ZERO,
            specular: DVec3::ZERO,
            ..Default::default()
        })
    }

    fn identity_rasterizer(size: usize) -> Rasterizer {
        let mut r = Rasterizer::new(size, size);
        r.set_model_matrix(DMat4::IDENTITY);
        r.set_view_matrix(DMat4::IDENTITY);
        r.set_projection_matrix(DMat4::IDENTITY);
        r.set_material(unlit_vertex_color_material());
        r
    }

    fn tri_vertex(x: f64, y: f64, z: f64, color: DVec4) -> Vertex {
        Vertex {
            position: DVec3::new(x, y, z),
            normal: DVec3::Z,
            color,
            ..Default::default()
        }
    }

    #[test]
    fn constant_color_triangle_covers_half_the_screen() {
        let red = DVec4::new(1.0, 0.0, 0.0, 1.0);
        let mesh = Mesh::triangles(
            vec![
                tri_vertex(-1.0, -1.0, 0.0, red),
                tri_vertex(1.0, -1.0, 0.0, red),
                tri_vertex(0.0, 1.0, 0.0, red),
            ],
            vec![0, 1, 2],
        )
        .unwrap();

        let mut r = identity_rasterizer(100);
        r.draw_filled_triangle_mesh(&mesh);

        let mut red_count = 0usize;
        for y in 0..100 {
            for x in 0..100 {
                let p = r.framebuffer().color().texel(x, y);
                if p == [255, 0, 0, 255] {
                    red_count += 1;
                } else {
                    assert_eq!(p, [0, 0, 0, 0], "stray pixel at {x},{y}");
                }
            }
        }
        assert!(
            (red_count as i64 - 5000).abs() <= 1,
            "expected 5000 +/- 1 red pixels, found {red_count}"
        );
    }

    #[test]
    fn adjacent_triangles_tile_without_overlap_or_gaps() {
        // Two half-quad triangles sharing the diagonal: the top-left rule
        // must hand every pixel to exactly one of them.
        let a = DVec4::new(1.0, 0.0, 0.0, 1.0);
        let b = DVec4::new(0.0, 1.0, 0.0, 1.0);
        let mesh_a = Mesh::triangles(
            vec![
                tri_vertex(-1.0, -1.0, 0.0, a),
                tri_vertex(1.0, -1.0, 0.0, a),
                tri_vertex(1.0, 1.0, 0.0, a),
            ],
            vec![0, 1, 2],
        )
        .unwrap();
        let mesh_b = Mesh::triangles(
            vec![
                tri_vertex(-1.0, -1.0, 0.0, b),
                tri_vertex(1.0, 1.0, 0.0, b),
                tri_vertex(-1.0, 1.0, 0.0, b),
            ],
            vec![0, 1, 2],
        )
        .unwrap();

        let mut once = identity_rasterizer(64);
        once.draw_filled_triangle_mesh(&mesh_a);
        once.draw_filled_triangle_mesh(&mesh_b);

        for y in 0..64 {
            for x in 0..64 {
                let p = once.framebuffer().color().texel(x, y);
                assert!(
                    p == [255, 0, 0, 255] || p == [0, 255, 0, 255],
                    "pixel {x},{y} not covered exactly once: {p:?}"
                );
            }
        }

        // Same scene with draw order reversed: coverage must be identical
        // because no pixel is contested (both triangles sit at z = 0 but
        // each pixel passes coverage for exactly one of them).
        let mut swapped = identity_rasterizer(64);
        swapped.draw_filled_triangle_mesh(&mesh_b);
        swapped.draw_filled_triangle_mesh(&mesh_a);
        assert_eq!(
            once.framebuffer().color().pixels(),
            swapped.framebuffer().color().pixels()
        );
    }

    #[test]
    fn depth_occlusion_is_order_independent() {
        let blue = DVec4::new(0.0, 0.0, 1.0, 1.0);
        let red = DVec4::new(1.0, 0.0, 0.0, 1.0);

        // Full-screen quad at z = 2.
        let far = Mesh::triangles(
            vec![
                tri_vertex(-1.0, -1.0, 2.0, blue),
                tri_vertex(1.0, -1.0, 2.0, blue),
                tri_vertex(1.0, 1.0, 2.0, blue),
                tri_vertex(-1.0, 1.0, 2.0, blue),
            ],
            vec![0, 1, 2, 0, 2, 3],
        )
        .unwrap();
        // Right-half quad at z = 1.
        let near = Mesh::triangles(
            vec![
                tri_vertex(0.0, -1.0, 1.0, red),
                tri_vertex(1.0, -1.0, 1.0, red),
                tri_vertex(1.0, 1.0, 1.0, red),
                tri_vertex(0.0, 1.0, 1.0, red),
            ],
            vec![0, 1, 2, 0, 2, 3],
        )
        .unwrap();

        let render = |front_to_back: bool| {
            let mut r = identity_rasterizer(64);
            if front_to_back {
                r.draw_filled_triangle_mesh(&near);
                r.draw_filled_triangle_mesh(&far);
            } else {
                r.draw_filled_triangle_mesh(&far);
                r.draw_filled_triangle_mesh(&near);
            }
            r
        };

        let a = render(true);
        let b = render(false);
        assert_eq!(
            a.framebuffer().color().pixels(),
            b.framebuffer().color().pixels()
        );
        assert_eq!(
            a.framebuffer().depth().pixels(),
            b.framebuffer().depth().pixels()
        );

        for y in 0..64i32 {
            for x in 0..64i32 {
                let p = a.framebuffer().color().texel(x, y);
                let d = a.framebuffer().depth().texel(x, y)[0];
                if x < 32 {
                    assert_eq!(p, [0, 0, 255, 255], "left half at {x},{y}");
                    assert_eq!(d, 2.0);
                } else {
                    assert_eq!(p, [255, 0, 0, 255], "right half at {x},{y}");
                    assert_eq!(d, 1.0);
                }
            }
        }
    }

    #[test]
    fn perspective_correct_uv_differs_from_affine_at_the_center() {
        use crate::sampler::{RgbaSampler, Sampler};
        use crate::texture::Texture2D;

        // A 256x256 map whose red channel encodes u and green channel v,
        // so the shaded color reads back the sampled texture coordinate.
        let mut map: Texture2D<u8, 4> = Texture2D::new(256, 256);
        for y in 0..256 {
            for x in 0..256 {
                assert!(map.set_texel(x, y, [x as u8, (255 - y) as u8, 0, 255]));
            }
        }
        let sampler: RgbaSampler = Sampler::new(map);

        // Quad pitched 45 degrees away from the camera, seen in
        // perspective.
        let mut quad_vertices = Vec::new();
        let angle = std::f64::consts::FRAC_PI_4;
        for (corner, uv) in [
            (DVec3::new(-1.0, -1.0, 0.0), DVec2::new(0.0, 0.0)),
            (DVec3::new(1.0, -1.0, 0.0), DVec2::new(1.0, 0.0)),
            (DVec3::new(1.0, 1.0, 0.0), DVec2::new(1.0, 1.0)),
            (DVec3::new(-1.0, 1.0, 0.0), DVec2::new(0.0, 1.0)),
        ] {
            let rotated = DVec3::new(
                corner.x,
                corner.y * angle.cos(),
                corner.y * angle.sin(),
            );
            quad_vertices.push(Vertex {
                position: rotated,
                tex_coord: uv,
                normal: DVec3::Z,
                color: DVec4::ONE,
                ..Default::default()
            });
        }
        let quad =
            Mesh::triangles(quad_vertices, vec![0, 1, 2, 0, 2, 3]).unwrap();

        let size = 101usize;
        let mut r = Rasterizer::new(size, size);
        r.set_camera(&crate::camera::Camera {
            position: DVec3::new(0.0, 0.0, 3.0),
            ..Default::default()
        });
        // Light straight against the pitched face so n.l = 1 and the
        // framebuffer reads back the sampled texture coordinate.
        r.set_light_direction(DVec3::new(0.0, angle.sin(), -angle.cos()));
        r.set_material(Material {
            model: MaterialModel::Phong(PhongMaterial {
                diffuse_from_vertex: false,
                ambient: DVec3::ZERO,
                specular: DVec3::ZERO,
                diffuse: DVec3::ONE,
                diffuse_map: Some(sampler),
                ..Default::default()
            }),
            ..Default::default()
        });
        r.draw_filled_triangle_mesh(&quad);

        // The world-space quad center projects to the image center; the
        // perspective-correct interpolated texture coordinate there is
        // (0.5, 0.5) within a texel.
        let center = (size / 2) as i32;
        let p = r.framebuffer().color().texel(center, center);
        let u = f64::from(p[0]) / 255.0;
        let v = f64::from(p[1]) / 255.0;
        let texel = 1.0 / 256.0;
        assert!(
            (u - 0.5).abs() <= texel && (v - 0.5).abs() <= texel,
            "center uv = ({u:.4}, {v:.4})"
        );

        // An affine interpolation would land noticeably elsewhere: the
        // screen-space midpoint of the diagonal maps to uv 0.5 only under
        // perspective division. Check against the affine prediction at the
        // same pixel, which differs by more than one texel.
        let p1 = DVec3::new(-1.0, -angle.cos(), -angle.sin());
        let p3 = DVec3::new(1.0, angle.cos(), angle.sin());
        let near1 = 3.0 - p1.z;
        let near3 = 3.0 - p3.z;
        // Screen positions of the diagonal corners (camera at z = 3).
        let s1 = p1.truncate() / near1;
        let s3 = p3.truncate() / near3;
        // Fraction along the screen diagonal where the center pixel sits.
        let t = -s1.y / (s3.y - s1.y);
        let affine_v = t;
        assert!(
            (affine_v - v).abs() > texel,
            "affine and perspective uv should disagree: {affine_v:.4} vs {v:.4}"
        );
    }

    #[test]
    fn phong_sphere_brightness_profile() {
        let sphere = Mesh::sphere(1.0, 16, 32).unwrap();
        let size = 101usize;
        let mut r = Rasterizer::new(size, size);
        r.set_camera(&crate::camera::Camera {
            position: DVec3::new(0.0, 0.0, 5.0),
            ..Default::default()
        });
        r.set_normal_mode(NormalMode::Smooth);
        r.set_light_direction(DVec3::new(0.0, 0.0, -1.0));
        r.set_material(Material::phong(PhongMaterial {
            ambient: DVec3::ZERO,
            diffuse: DVec3::ONE,
            specular: DVec3::ZERO,
            ..Default::default()
        }));
        r.draw_filled_triangle_mesh(&sphere);

        let center = (size / 2) as i32;
        let center_pixel = r.framebuffer().color().texel(center, center);
        assert_eq!(center_pixel[0], 255, "center should be fully lit");
        assert_eq!(center_pixel[1], 255);
        assert_eq!(center_pixel[2], 255);

        // Walk right from the center to the last covered pixel: that is
        // the silhouette, where the normal is perpendicular to the light.
        let mut silhouette = None;
        for x in (center..size as i32).rev() {
            let d = r.framebuffer().depth().texel(x, center)[0];
            if d.is_finite() {
                silhouette = Some(r.framebuffer().color().texel(x, center));
                break;
            }
        }
        let silhouette = silhouette.unwrap();
        // The limb normal is perpendicular to the viewing ray, not to the
        // light: from 5 units away it still catches cos = r/d = 0.2 of the
        // head-on light, so "dark" here means about 51, not 0.
        assert!(
            silhouette[0] <= 60,
            "silhouette should be dark, got {silhouette:?}"
        );
        assert!(
            u32::from(center_pixel[0]) > 4 * u32::from(silhouette[0]),
            "center should clearly outshine the limb"
        );
    }

    #[test]
    fn pbr_sphere_lights_up_under_a_white_environment() {
        use crate::ibl::{CancelToken, IblConfig, IblTextures};
        use crate::material::PbrMaterial;
        use crate::texture::mapping::CubeFace;
        use crate::texture::TextureCube;

        let mut background: TextureCube<f64, 4> = TextureCube::new(8, 8);
        for face in CubeFace::ALL {
            background.face_mut(face).clear([1.0, 1.0, 1.0, 1.0]);
        }
        let config = IblConfig {
            irradiance_size: 4,
            prefilter_size: 16,
            brdf_size: 8,
        };
        let ibl =
            IblTextures::compute(&background, &config, &CancelToken::default())
                .unwrap();

        let sphere = Mesh::sphere(1.0, 8, 16).unwrap();
        let mut r = Rasterizer::new(64, 64);
        r.set_camera(&crate::camera::Camera {
            position: DVec3::new(0.0, 0.0, 5.0),
            ..Default::default()
        });
        r.set_normal_mode(NormalMode::Smooth);
        r.set_ibl(Some(std::sync::Arc::new(ibl)));
        r.set_material(Material::pbr(PbrMaterial {
            albedo: DVec3::splat(0.8),
            roughness: 0.5,
            metalness: 0.0,
            ..Default::default()
        }));
        r.draw_filled_triangle_mesh(&sphere);

        // Even the silhouette receives ambient light from the white
        // environment, unlike the directional-only Phong case.
        let center = r.framebuffer().color().texel(32, 32);
        assert!(center[0] > 100, "center too dark: {center:?}");
        assert_eq!(center[3], 255);
    }

    #[test]
    fn wireframe_draws_edges_only() {
        let quad = Mesh::quad().unwrap();
        let mut r = identity_rasterizer(32);
        r.draw_edge_line_triangle_mesh(&quad);
        // Border pixels are covered by the quad edges.
        assert_eq!(r.framebuffer().color().texel(0, 16), [255; 4]);
        // An interior pixel away from the diagonal stays clear.
        assert_eq!(r.framebuffer().color().texel(8, 4), [0, 0, 0, 0]);
    }

    #[test]
    fn mismatched_mesh_kinds_are_rejected() {
        let quad = Mesh::quad().unwrap();
        let lines = Mesh::lines(
            vec![Vertex::default(), Vertex::default()],
            vec![0, 1],
        )
        .unwrap();
        let mut r = identity_rasterizer(8);
        // Wrong-kind draws are no-ops.
        r.draw_filled_triangle_mesh(&lines);
        r.draw_line_mesh(&quad);
        assert!(r
            .framebuffer()
            .color()
            .pixels()
            .iter()
            .all(|&b| b == 0));
    }
}
