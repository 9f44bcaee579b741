//! Platform orientation in either of the two accepted representations.
//!
//! Euler angles compose intrinsic XYZ, `R = Rx(a) * Ry(b) * Rz(c)`. Quaternions are given
//! in `[x, y, z, w]` order. Whatever the representation, the rest of the pipeline only
//! ever sees the rotation matrix returned by [`Orientation::rotation`].

use nalgebra::{Quaternion, Rotation3, UnitQuaternion, Vector3, Vector4};

use crate::error::{CompileError, Result};

/// Below this norm a quaternion is treated as not representing any rotation.
const MIN_QUATERNION_NORM: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Orientation {
    /// Intrinsic XYZ Euler angles in radians.
    Euler(Vector3<f64>),
    /// Quaternion components `[x, y, z, w]`, not necessarily normalized.
    Quaternion(Vector4<f64>),
}

impl Default for Orientation {
    fn default() -> Self {
        Orientation::Euler(Vector3::zeros())
    }
}

impl Orientation {
    pub fn euler(rx: f64, ry: f64, rz: f64) -> Self {
        Orientation::Euler(Vector3::new(rx, ry, rz))
    }

    /// Quaternion from `[x, y, z, w]` components. Fails for a zero or non-finite quaternion.
    pub fn quaternion(x: f64, y: f64, z: f64, w: f64) -> Result<Self> {
        let q = Vector4::new(x, y, z, w);
        if !q.iter().all(|c| c.is_finite()) || q.norm() < MIN_QUATERNION_NORM {
            return Err(CompileError::InvalidOrientation { found: 4 });
        }
        Ok(Orientation::Quaternion(q))
    }

    /// Picks the representation by arity: 3 values are Euler angles, 4 are a quaternion.
    pub fn from_slice(values: &[f64]) -> Result<Self> {
        match *values {
            [rx, ry, rz] => Ok(Orientation::euler(rx, ry, rz)),
            [x, y, z, w] => Orientation::quaternion(x, y, z, w),
            _ => Err(CompileError::InvalidOrientation { found: values.len() }),
        }
    }

    pub fn is_quaternion(&self) -> bool {
        matches!(self, Orientation::Quaternion(_))
    }

    /// Rotation matrix of this orientation.
    pub fn rotation(&self) -> Rotation3<f64> {
        match self {
            Orientation::Euler(angles) => euler_xyz_intrinsic(angles),
            Orientation::Quaternion(q) => {
                UnitQuaternion::from_quaternion(Quaternion::new(q.w, q.x, q.y, q.z)).to_rotation_matrix()
            }
        }
    }

    /// Same rotation as Euler angles.
    pub fn to_euler(&self) -> Orientation {
        match self {
            Orientation::Euler(_) => *self,
            Orientation::Quaternion(_) => Orientation::Euler(euler_xyz_from_rotation(&self.rotation())),
        }
    }

    /// Same rotation as a unit quaternion.
    pub fn to_quaternion(&self) -> Orientation {
        match self {
            Orientation::Quaternion(_) => *self,
            Orientation::Euler(_) => {
                let q = UnitQuaternion::from_rotation_matrix(&self.rotation());
                Orientation::Quaternion(Vector4::new(q.i, q.j, q.k, q.w))
            }
        }
    }

    /// Converts to the representation used by `like`.
    pub fn same_representation_as(&self, like: &Orientation) -> Orientation {
        if like.is_quaternion() { self.to_quaternion() } else { self.to_euler() }
    }

    /// Component-wise linear blend between two orientations (not a spherical interpolation).
    /// `self` is converted to the representation of `end` first. Quaternion ends are put
    /// into the same hemisphere so the blend never passes through the zero quaternion.
    /// `t = 0` returns `self` and `t = 1` returns `end` exactly.
    pub fn lerp(&self, end: &Orientation, t: f64) -> Orientation {
        let start = self.same_representation_as(end);
        if t <= 0.0 {
            return start;
        }
        if t >= 1.0 {
            return *end;
        }
        match (start, end) {
            (Orientation::Euler(a), Orientation::Euler(b)) => Orientation::Euler(a + (b - a) * t),
            (Orientation::Quaternion(a), Orientation::Quaternion(b)) => {
                let b = if a.dot(b) < 0.0 { -b } else { *b };
                Orientation::Quaternion(a + (b - a) * t)
            }
            _ => unreachable!("representations aligned above"),
        }
    }

    /// Raw components in the stored representation.
    pub fn components(&self) -> Vec<f64> {
        match self {
            Orientation::Euler(v) => v.iter().copied().collect(),
            Orientation::Quaternion(v) => v.iter().copied().collect(),
        }
    }
}

fn euler_xyz_intrinsic(angles: &Vector3<f64>) -> Rotation3<f64> {
    Rotation3::from_axis_angle(&Vector3::x_axis(), angles.x)
        * Rotation3::from_axis_angle(&Vector3::y_axis(), angles.y)
        * Rotation3::from_axis_angle(&Vector3::z_axis(), angles.z)
}

/// Inverse of [`euler_xyz_intrinsic`]. For `R = Rx(a) Ry(b) Rz(c)`:
/// `R02 = sin b`, `R12 = -sin a cos b`, `R22 = cos a cos b`, `R01 = -cos b sin c`,
/// `R00 = cos b cos c`.
fn euler_xyz_from_rotation(rotation: &Rotation3<f64>) -> Vector3<f64> {
    let m = rotation.matrix();
    let b = m[(0, 2)].clamp(-1.0, 1.0).asin();
    let a = f64::atan2(-m[(1, 2)], m[(2, 2)]);
    let c = f64::atan2(-m[(0, 1)], m[(0, 0)]);
    Vector3::new(a, b, c)
}
