//! Scene data consumed by the rasterizer: transforms and imported models.
//!
//! Model import itself lives outside this crate; an importer hands the
//! rasterizer a list of [`Model`]s and the rasterizer never parses a mesh
//! format.

use std::sync::Arc;

use glam::{DMat4, DQuat, DVec3};

use crate::material::Material;
use crate::mesh::Mesh;

/// Position, orientation, and scale of a model in the world.
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    /// Translation.
    pub position: DVec3,
    /// Orientation.
    pub rotation: DQuat,
    /// Per-axis scale.
    pub scale: DVec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: DVec3::ZERO,
            rotation: DQuat::IDENTITY,
            scale: DVec3::ONE,
        }
    }
}

impl Transform {
    /// The model matrix: translate x rotate x scale.
    pub fn matrix(&self) -> DMat4 {
        DMat4::from_scale_rotation_translation(
            self.scale,
            self.rotation,
            self.position,
        )
    }
}

/// One renderable object as delivered by an importer.
#[derive(Debug, Clone)]
pub struct Model {
    /// Display name, for diagnostics.
    pub name: String,
    /// The geometry. Shared: meshes are immutable after construction.
    pub mesh: Arc<Mesh>,
    /// The surface material.
    pub material: Material,
    /// Placement in the world.
    pub transform: Transform,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transform_matrix_composes_trs() {
        let t = Transform {
            position: DVec3::new(1.0, 2.0, 3.0),
            rotation: DQuat::from_axis_angle(
                DVec3::Z,
                std::f64::consts::FRAC_PI_2,
            ),
            scale: DVec3::splat(2.0),
        };
        // Scale then rotate then translate: X -> 2X -> 2Y -> 2Y + offset.
        let p = t.matrix() * DVec3::X.extend(1.0);
        assert!((p.truncate() - DVec3::new(1.0, 4.0, 3.0)).length() < 1e-12);
    }

    #[test]
    fn default_transform_is_identity() {
        assert_eq!(Transform::default().matrix(), DMat4::IDENTITY);
    }
}
