//! Supports reading mechanism geometry and compiler configuration from YAML (optional)

use std::path::Path;
use nalgebra::Vector3;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::config::CompilerConfig;
use crate::kinematic_traits::{LegJoints, LEG_COUNT};
use crate::parameter_error::ParameterError;
use crate::parameters::MechanismGeometry;

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct GeometryRoot {
    home_position: Vec<f64>,
    attachment: Vec<f64>,
    base_mount: Vec<f64>,
    hip_offset: f64,
    upper_length: f64,
    lower_length: f64,
    sign_corrections: Vec<Vec<i8>>,
    home_joints: Vec<Vec<f64>>,
}

/// Parses YAML with the `deg(angle)` extension enabled.
fn parse_yaml<T: DeserializeOwned>(contents: &str) -> Result<T, ParameterError> {
    serde_saphyr::from_str_with_options(contents, serde_saphyr::options! { angle_conversions: true })
        .map_err(|e| ParameterError::ParseError(format!("{}", e)))
}

impl MechanismGeometry {
    /// Read the mechanism geometry from YAML file. YAML file like this is supported:
    /// ```yaml
    /// # Values of the front-left leg, mirrored onto the other legs
    /// home_position: [0.0, 0.0, 0.25]
    /// attachment: [0.18165, 0.11889, 0.00673]
    /// base_mount: [0.1858, 0.0961, 0.0369]
    /// hip_offset: 0.0146
    /// upper_length: 0.16
    /// lower_length: 0.16
    /// # fl, fr, bl, br
    /// sign_corrections: [[1, 1, 1], [-1, -1, -1], [-1, -1, -1], [1, 1, 1]]
    /// home_joints: [[deg(-2.13), deg(47.5), deg(-92.83)], [deg(1.96), deg(-47.42), deg(92.69)],
    ///               [deg(2.14), deg(-47.5), deg(92.86)], [deg(-1.97), deg(47.42), deg(-92.7)]]
    /// ```
    /// Angles are radians unless written with the `deg()` extension. The geometry is
    /// validated before it is returned.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, ParameterError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    /// Same as [`MechanismGeometry::from_yaml_file`], from a string.
    pub fn from_yaml_str(contents: &str) -> Result<Self, ParameterError> {
        let root: GeometryRoot = parse_yaml(contents)?;

        let sign_corrections = vec_to_array::<_, LEG_COUNT>(root.sign_corrections, "sign_corrections")?
            .into_iter()
            .enumerate()
            .map(|(leg, signs)| vec_to_array::<_, 3>(signs, &format!("sign_corrections[{}]", leg)))
            .collect::<Result<Vec<_>, _>>()?;
        let home_joints = vec_to_array::<_, LEG_COUNT>(root.home_joints, "home_joints")?
            .into_iter()
            .enumerate()
            .map(|(leg, joints)| vec_to_array::<_, 3>(joints, &format!("home_joints[{}]", leg)))
            .collect::<Result<Vec<LegJoints>, _>>()?;

        let geometry = MechanismGeometry {
            home_position: to_vector(root.home_position, "home_position")?,
            attachment: to_vector(root.attachment, "attachment")?,
            base_mount: to_vector(root.base_mount, "base_mount")?,
            hip_offset: root.hip_offset,
            upper_length: root.upper_length,
            lower_length: root.lower_length,
            sign_corrections: vec_to_array(sign_corrections, "sign_corrections")?,
            home_joints: vec_to_array(home_joints, "home_joints")?,
        };
        geometry.validate()?;
        Ok(geometry)
    }
}

impl CompilerConfig {
    /// Read the compiler configuration from YAML file. Every field is optional:
    /// ```yaml
    /// frequency: 240.0
    /// settle_seconds: 2.0
    /// amplitude_threshold: 30.0
    /// flip_threshold: deg(11.5)
    /// ik:
    ///   tolerance: 1.0e-6
    ///   max_iterations: 10000
    /// gains:
    ///   kp: 20.0
    ///   kd: 0.2
    ///   torque_saturation: 2.0
    /// tracking_tolerance: 0.1
    /// simulator:
    ///   inertia: 0.01
    /// ```
    /// Unknown keys are rejected. The configuration is validated before it is returned.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, ParameterError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    /// Same as [`CompilerConfig::from_yaml_file`], from a string.
    pub fn from_yaml_str(contents: &str) -> Result<Self, ParameterError> {
        let config: CompilerConfig = parse_yaml(contents)?;
        config.validate()?;
        Ok(config)
    }
}

fn to_vector(v: Vec<f64>, label: &str) -> Result<Vector3<f64>, ParameterError> {
    let [x, y, z] = vec_to_array(v, label)?;
    Ok(Vector3::new(x, y, z))
}

/// Convert a vector to an N-element array, failing with the field label for context.
fn vec_to_array<T, const N: usize>(v: Vec<T>, label: &str) -> Result<[T; N], ParameterError> {
    let found = v.len();
    v.try_into().map_err(|_| ParameterError::InvalidLength {
        field: label.to_string(),
        expected: N,
        found,
    })
}
