use glam::{Mat3, Mat4, Quat, Vec3};

pub fn safe_normalize(v: Vec3, fallback: Vec3) -> Vec3 {
    let n = v.normalize_or_zero();
    if n.length_squared() > 0.0 {
        n
    } else {
        fallback
    }
}

/// Orthonormal (right, up) basis on a plane, preferring alignment with
/// `preferred_right`. Falls back to an arbitrary perpendicular when the
/// preference is parallel to the normal.
pub fn plane_basis(normal: Vec3, preferred_right: Vec3) -> (Vec3, Vec3) {
    let projected = preferred_right - normal * preferred_right.dot(normal);
    let right = if projected.length_squared() > 1.0e-6 {
        projected.normalize()
    } else {
        normal.any_orthonormal_vector()
    };
    let up = normal.cross(right);
    (right, up)
}

/// Position + orientation of an object or a virtual camera. Forward is
/// local -Z, up is local +Y.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }
}

impl Pose {
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    pub fn look_to(position: Vec3, forward: Vec3, up: Vec3) -> Self {
        let forward = safe_normalize(forward, Vec3::NEG_Z);
        let mut right = forward.cross(safe_normalize(up, Vec3::Y));
        if right.length_squared() < 1.0e-6 {
            right = forward.any_orthonormal_vector();
        }
        let right = right.normalize();
        let up = right.cross(forward);
        let rotation = Quat::from_mat3(&Mat3::from_cols(right, up, -forward));
        Self { position, rotation }
    }

    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }

    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }

    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::X
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_to_rh(self.position, self.forward(), self.up())
    }

    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.rotation.is_finite()
    }
}

pub fn mat4_is_finite(m: &Mat4) -> bool {
    m.x_axis.is_finite() && m.y_axis.is_finite() && m.z_axis.is_finite() && m.w_axis.is_finite()
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::{plane_basis, safe_normalize, Pose};

    #[test]
    fn safe_normalize_falls_back_on_zero_input() {
        assert_eq!(safe_normalize(Vec3::ZERO, Vec3::Z), Vec3::Z);
        let n = safe_normalize(Vec3::new(0.0, 3.0, 0.0), Vec3::Z);
        assert!((n - Vec3::Y).length() < 1.0e-6);
    }

    #[test]
    fn plane_basis_is_orthonormal_and_right_handed() {
        let normal = Vec3::Z;
        let (right, up) = plane_basis(normal, Vec3::new(0.8, 0.1, 0.3));

        assert!((right.length() - 1.0).abs() < 1.0e-5);
        assert!((up.length() - 1.0).abs() < 1.0e-5);
        assert!(right.dot(normal).abs() < 1.0e-5);
        assert!(up.dot(normal).abs() < 1.0e-5);
        assert!((right.cross(up) - normal).length() < 1.0e-5);
    }

    #[test]
    fn plane_basis_survives_grazing_preference() {
        let normal = Vec3::Y;
        let (right, up) = plane_basis(normal, Vec3::Y);
        assert!((right.cross(up) - normal).length() < 1.0e-5);
    }

    #[test]
    fn look_to_recovers_forward_and_up() {
        let pose = Pose::look_to(Vec3::new(1.0, 2.0, 3.0), Vec3::X, Vec3::Y);
        assert!((pose.forward() - Vec3::X).length() < 1.0e-5);
        assert!((pose.up() - Vec3::Y).length() < 1.0e-5);
    }
}
