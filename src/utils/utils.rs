//! Helper functions

use nalgebra::Vector3;

use crate::kinematic_traits::{Leg, LegJoints, MechanismJoints, leg_joints};

/// Checks if all joint values are finite
pub fn is_valid(qs: &[f64]) -> bool {
    qs.iter().all(|&q| q.is_finite())
}

/// Largest absolute per-joint difference between two leg configurations.
pub fn max_joint_delta(from: &LegJoints, to: &LegJoints) -> f64 {
    from.iter()
        .zip(to.iter())
        .map(|(a, b)| (a - b).abs())
        .fold(0.0, f64::max)
}

/// Print joint values of one leg, converting radians to degrees.
pub fn dump_leg_joints(leg: Leg, joints: &LegJoints) {
    println!("{}: [{}]", leg, joints.iter()
        .map(|q| format!("{:6.2}", q.to_degrees()))
        .collect::<Vec<_>>().join(" "));
}

/// Print all joint values leg by leg, converting radians to degrees.
pub fn dump_joints(joints: &MechanismJoints) {
    for leg in Leg::ALL {
        dump_leg_joints(leg, &leg_joints(joints, leg));
    }
}

pub fn dump_point(label: &str, p: &Vector3<f64>) {
    println!("{}: x: {:.5}, y: {:.5}, z: {:.5}", label, p.x, p.y, p.z);
}

/// formatting for YAML output
pub(crate) fn deg(x: &f64) -> String {
    if *x == 0.0 {
        return "0".to_string();
    }
    format!("{:.4}", x.to_degrees())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_is_valid_with_all_finite() {
        let qs = [0.0, 1.0, -1.0, 0.5, -0.5, PI];
        assert!(is_valid(&qs));
    }

    #[test]
    fn test_is_valid_with_nan() {
        let qs = [0.0, f64::NAN, 1.0];
        assert!(!is_valid(&qs));
    }

    #[test]
    fn test_is_valid_with_infinity() {
        let qs = [0.0, f64::INFINITY, 1.0];
        assert!(!is_valid(&qs));
    }

    #[test]
    fn test_max_joint_delta() {
        assert_eq!(max_joint_delta(&[0.0, 1.0, 2.0], &[0.5, 1.0, 1.0]), 1.0);
        assert_eq!(max_joint_delta(&[0.1; 3], &[0.1; 3]), 0.0);
    }
}
