//! Axis-aligned bounds and camera framing helpers.

use glam::DVec3;

use crate::mesh::Mesh;
use crate::scene::Model;

/// An axis-aligned bounding box grown point by point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Smallest corner.
    pub min: DVec3,
    /// Largest corner.
    pub max: DVec3,
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::new()
    }
}

impl BoundingBox {
    /// An empty box: grows to fit the first update.
    pub fn new() -> Self {
        Self {
            min: DVec3::splat(f64::MAX),
            max: DVec3::splat(f64::MIN),
        }
    }

    /// Whether no point has been added yet.
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x
    }

    /// Grow the box to contain a point.
    pub fn update(&mut self, p: DVec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    /// Grow the box to contain every vertex of a mesh.
    pub fn update_mesh(&mut self, mesh: &Mesh) {
        for v in mesh.vertices() {
            self.update(v.position);
        }
    }

    /// Center of the box.
    pub fn center(&self) -> DVec3 {
        (self.min + self.max) * 0.5
    }

    /// Edge lengths of the box.
    pub fn size(&self) -> DVec3 {
        self.max - self.min
    }

    /// The bounds of a whole scene, each mesh taken through its model
    /// transform.
    pub fn of_models(models: &[Model]) -> Self {
        let mut bb = Self::new();
        for model in models {
            let matrix = model.transform.matrix();
            for v in model.mesh.vertices() {
                bb.update(matrix.transform_point3(v.position));
            }
        }
        bb
    }
}

/// Distance at which a camera with the given horizontal field of view (in
/// degrees) sees the whole `size.x x size.y` extent.
///
/// For narrow viewports the vertical field of view is the limiting one.
pub fn fitting_distance(
    size: glam::DVec2,
    aspect_ratio: f64,
    field_of_view: f64,
) -> f64 {
    let radius = size.x.max(size.y * aspect_ratio) / 2.0;

    let mut fov = 0.5 * field_of_view.to_radians();
    if aspect_ratio < 1.0 {
        fov = (aspect_ratio * fov.tan()).atan();
    }
    radius / fov.sin()
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec2;

    #[test]
    fn box_grows_to_contain_points() {
        let mut bb = BoundingBox::new();
        assert!(bb.is_empty());
        bb.update(DVec3::new(1.0, -2.0, 3.0));
        bb.update(DVec3::new(-1.0, 4.0, 0.0));
        assert!(!bb.is_empty());
        assert_eq!(bb.min, DVec3::new(-1.0, -2.0, 0.0));
        assert_eq!(bb.max, DVec3::new(1.0, 4.0, 3.0));
        assert_eq!(bb.center(), DVec3::new(0.0, 1.0, 1.5));
        assert_eq!(bb.size(), DVec3::new(2.0, 6.0, 3.0));
    }

    #[test]
    fn sphere_mesh_bounds_match_its_radius() {
        let sphere = Mesh::sphere(2.0, 8, 16).unwrap();
        let mut bb = BoundingBox::new();
        bb.update_mesh(&sphere);
        assert!((bb.max.y - 2.0).abs() < 1e-9);
        assert!((bb.min.y + 2.0).abs() < 1e-9);
        // The equator ring touches the x extent exactly.
        assert!((bb.max.x - 2.0).abs() < 1e-9);
    }

    #[test]
    fn fitting_distance_frames_the_extent() {
        // A 2-unit-wide object seen with a 90 degree horizontal fov fits
        // at distance 1/sin(45 degrees).
        let d = fitting_distance(DVec2::new(2.0, 1.0), 1.0, 90.0);
        assert!((d - 1.0 / (std::f64::consts::FRAC_PI_4).sin()).abs() < 1e-9);
        // A wider fov allows a closer camera.
        let closer = fitting_distance(DVec2::new(2.0, 1.0), 1.0, 120.0);
        assert!(closer < d);
    }
}
