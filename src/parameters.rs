//! Defines the mechanism geometry data structure

use nalgebra::Vector3;

use crate::kinematic_traits::{Leg, LegJoints, LEG_COUNT};
use crate::parameter_error::ParameterError;
use crate::utils::deg;

/// Fixed geometry of the platform and its four legs. All values are given for the
/// front-left leg and mirrored onto the others with [`Leg::mirror`]. See
/// [parameters_platforms.rs](parameters_platforms.rs) for the built-in mechanism.
///
/// Lengths are in meters, angles in radians, all positions in the mechanism base frame
/// (Z up, X towards the front legs, Y towards the left legs).
#[derive(Debug, Clone, PartialEq)]
pub struct MechanismGeometry {
    /// Platform reference point when the platform is at its home pose. Waypoint positions
    /// are offsets from here.
    pub home_position: Vector3<f64>,

    /// Ball joint centre of the front-left leg relative to the platform reference point,
    /// in platform coordinates.
    pub attachment: Vector3<f64>,

    /// Hip abduction axis origin of the front-left leg in the base frame.
    pub base_mount: Vector3<f64>,

    /// Lateral distance between the hip abduction axis and the plane of the upper and
    /// lower leg. Mirrored with the leg side.
    pub hip_offset: f64,

    /// Upper leg length (hip flexion axis to knee axis).
    pub upper_length: f64,

    /// Lower leg length (knee axis to ball joint centre).
    pub lower_length: f64,

    /// Per leg direction of positive rotation for hip, upper and lower joint. A value of
    /// `-1` reverses the direction so that mirrored legs bend symmetrically.
    pub sign_corrections: [[i8; 3]; LEG_COUNT],

    /// Known good joint configuration of each leg at the home pose (knees bent inwards).
    /// Used to seed the very first inverse kinematics solve.
    pub home_joints: [LegJoints; LEG_COUNT],
}

impl MechanismGeometry {
    /// Ball joint target of the given leg relative to the platform reference point.
    pub fn attachment_of(&self, leg: Leg) -> Vector3<f64> {
        self.attachment.component_mul(&leg.mirror())
    }

    /// Hip abduction axis origin of the given leg in the base frame.
    pub fn base_mount_of(&self, leg: Leg) -> Vector3<f64> {
        self.base_mount.component_mul(&leg.mirror())
    }

    pub fn sign_corrections_of(&self, leg: Leg) -> [f64; 3] {
        self.sign_corrections[leg.index()].map(f64::from)
    }

    pub fn home_joints_of(&self, leg: Leg) -> LegJoints {
        self.home_joints[leg.index()]
    }

    /// Longest distance the ball joint can be from the hip.
    pub fn reach(&self) -> f64 {
        (self.hip_offset.powi(2) + (self.upper_length + self.lower_length).powi(2)).sqrt()
    }

    /// Checks the geometry for values that cannot describe a physical mechanism.
    pub fn validate(&self) -> Result<(), ParameterError> {
        for (name, value) in [
            ("hip_offset", self.hip_offset),
            ("upper_length", self.upper_length),
            ("lower_length", self.lower_length),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ParameterError::InvalidValue(format!(
                    "{} must be finite and non-negative (got {})", name, value
                )));
            }
        }
        if self.upper_length == 0.0 || self.lower_length == 0.0 {
            return Err(ParameterError::InvalidValue("leg links must have a length".into()));
        }
        for (name, v) in [
            ("home_position", &self.home_position),
            ("attachment", &self.attachment),
            ("base_mount", &self.base_mount),
        ] {
            if !v.iter().all(|c| c.is_finite()) {
                return Err(ParameterError::InvalidValue(format!("{} must be finite", name)));
            }
        }
        for (leg, signs) in self.sign_corrections.iter().enumerate() {
            if signs.iter().any(|&s| s != 1 && s != -1) {
                return Err(ParameterError::InvalidValue(format!(
                    "sign_corrections[{}] must be 1 or -1 (got {:?})", leg, signs
                )));
            }
        }
        if !self.home_joints.iter().flatten().all(|q| q.is_finite()) {
            return Err(ParameterError::InvalidValue("home_joints must be finite".into()));
        }
        Ok(())
    }

    /// Convert to string yaml representation (quick viewing, etc).
    pub fn to_yaml(&self) -> String {
        fn vec3(v: &Vector3<f64>) -> String {
            format!("[{:?}, {:?}, {:?}]", v.x, v.y, v.z)
        }
        format!(
            "home_position: {}\n\
            attachment: {}\n\
            base_mount: {}\n\
            hip_offset: {:?}\n\
            upper_length: {:?}\n\
            lower_length: {:?}\n\
            sign_corrections: [{}]\n\
            # home joints in degrees: [{}]\n\
            home_joints: [{}]\n",
            vec3(&self.home_position),
            vec3(&self.attachment),
            vec3(&self.base_mount),
            self.hip_offset,
            self.upper_length,
            self.lower_length,
            self.sign_corrections.iter()
                .map(|s| format!("[{}, {}, {}]", s[0], s[1], s[2]))
                .collect::<Vec<_>>().join(", "),
            self.home_joints.iter()
                .map(|q| format!("[{}]", q.iter().map(deg).collect::<Vec<_>>().join(", ")))
                .collect::<Vec<_>>().join(", "),
            self.home_joints.iter()
                .map(|q| format!("[{:?}, {:?}, {:?}]", q[0], q[1], q[2]))
                .collect::<Vec<_>>().join(", "),
        )
    }
}
