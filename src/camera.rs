//! Cameras: the scene perspective camera and the six-face cube camera used
//! by the IBL passes.

use glam::{DMat4, DQuat, DVec3};

/// Perspective camera defined by a world transform and projection
/// parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    /// Eye position in world space.
    pub position: DVec3,
    /// Orientation applied to the world in the view transform.
    pub rotation: DQuat,
    /// Horizontal field of view in degrees.
    pub field_of_view: f64,
    /// Viewport aspect ratio (width / height).
    pub aspect_ratio: f64,
    /// Near clipping plane distance.
    pub near_plane: f64,
    /// Far clipping plane distance.
    pub far_plane: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: DVec3::new(0.0, 0.0, 5.0),
            rotation: DQuat::IDENTITY,
            field_of_view: 45.0,
            aspect_ratio: 1.0,
            near_plane: 0.1,
            far_plane: 75.0,
        }
    }
}

impl Camera {
    /// The world-to-view matrix.
    pub fn view_matrix(&self) -> DMat4 {
        DMat4::from_quat(self.rotation)
            * DMat4::from_translation(-self.position)
    }

    /// The perspective projection matrix (OpenGL clip conventions).
    ///
    /// The stored field of view is horizontal; it is converted to the
    /// vertical field of view through the aspect ratio.
    pub fn projection_matrix(&self) -> DMat4 {
        let horizontal = self.field_of_view.to_radians();
        let vertical =
            2.0 * ((horizontal / 2.0).tan() / self.aspect_ratio).atan();
        DMat4::perspective_rh_gl(
            vertical,
            self.aspect_ratio,
            self.near_plane,
            self.far_plane,
        )
    }

    /// The combined camera matrix: projection x view.
    pub fn camera_matrix(&self) -> DMat4 {
        self.projection_matrix() * self.view_matrix()
    }
}

/// A camera rig rendering the six cubemap faces from the origin.
///
/// Face order and axis conventions follow the standard OpenGL cubemap:
/// {+X, -X, +Y, -Y, +Z, -Z}, each face with a 90 degree field of view.
#[derive(Debug, Clone, PartialEq)]
pub struct CubeCamera {
    projection_matrix: DMat4,
    view_matrices: [DMat4; 6],
}

impl CubeCamera {
    /// Build the rig for square faces (aspect ratio 1) by default; pass the
    /// actual aspect for non-square targets.
    pub fn new(aspect_ratio: f64) -> Self {
        // The classic cubemap capture table: every face looks down its
        // axis with -Y up, except the Y faces which roll onto +/-Z. The
        // axis-aligned look-at form keeps the view matrices exact, so
        // face-boundary ties in the cube passes stay exact too.
        let faces: [(DVec3, DVec3); 6] = [
            (DVec3::X, -DVec3::Y),
            (-DVec3::X, -DVec3::Y),
            (DVec3::Y, DVec3::Z),
            (-DVec3::Y, -DVec3::Z),
            (DVec3::Z, -DVec3::Y),
            (-DVec3::Z, -DVec3::Y),
        ];

        let near_plane = 0.1;
        let far_plane = 150.0;

        // A 90 degree frustum has unit focal length. Building the matrix
        // directly (instead of via tan) keeps the focal terms exact, so a
        // cube face spans NDC [-1, 1] without rounding slop on its edges.
        let mut projection = DMat4::ZERO;
        projection.x_axis.x = 1.0 / aspect_ratio;
        projection.y_axis.y = 1.0;
        projection.z_axis.z =
            (far_plane + near_plane) / (near_plane - far_plane);
        projection.z_axis.w = -1.0;
        projection.w_axis.z =
            2.0 * far_plane * near_plane / (near_plane - far_plane);

        Self {
            projection_matrix: projection,
            view_matrices: faces.map(|(forward, up)| {
                DMat4::look_at_rh(DVec3::ZERO, forward, up)
            }),
        }
    }

    /// The camera matrix (projection x view) for a face index in
    /// {+X, -X, +Y, -Y, +Z, -Z} order.
    pub fn camera_matrix(&self, face: usize) -> DMat4 {
        self.projection_matrix * self.view_matrices[face]
    }
}
