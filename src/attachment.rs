//! Platform pose to leg attachment points.

use nalgebra::{Rotation3, Vector3};

use crate::error::Result;
use crate::kinematic_traits::{Leg, LEG_COUNT};
use crate::orientation::Orientation;
use crate::parameters::MechanismGeometry;
use crate::path_plan::interpolator::Pose;

/// Point in the base frame the ball joint of one leg must reach.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LegTarget {
    pub leg: Leg,
    pub position: Vector3<f64>,
}

/// Targets of all four legs for the given pose, in [`Leg::ALL`] order:
/// `home_position + pose.position + R * attachment_of(leg)`.
pub fn leg_targets(geometry: &MechanismGeometry, pose: &Pose) -> [LegTarget; LEG_COUNT] {
    targets_for(geometry, &pose.position, &pose.rotation)
}

/// Same as [`leg_targets`] for a loosely typed orientation (3 Euler angles or a 4 component
/// quaternion). Fails with `InvalidOrientation` on any other arity.
pub fn leg_targets_raw(
    geometry: &MechanismGeometry,
    position: &Vector3<f64>,
    orientation: &[f64],
) -> Result<[LegTarget; LEG_COUNT]> {
    let rotation = Orientation::from_slice(orientation)?.rotation();
    Ok(targets_for(geometry, position, &rotation))
}

fn targets_for(geometry: &MechanismGeometry, position: &Vector3<f64>, rotation: &Rotation3<f64>)
               -> [LegTarget; LEG_COUNT] {
    let centre = geometry.home_position + position;
    Leg::ALL.map(|leg| LegTarget {
        leg,
        position: centre + rotation * geometry.attachment_of(leg),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompileError;
    use approx::assert_relative_eq;
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

    #[test]
    fn test_home_pose_targets() {
        let geometry = MechanismGeometry::solo_platform();
        let targets = leg_targets(&geometry, &Pose::home());
        for target in targets {
            assert_eq!(target.position, geometry.home_position + geometry.attachment_of(target.leg));
        }
    }

    #[test]
    fn test_translation_only() {
        let geometry = MechanismGeometry::solo_platform();
        let offset = Vector3::new(0.0, 0.0, 0.01);
        let targets = leg_targets(&geometry, &Pose::new(offset, &Orientation::default()));
        for target in targets {
            assert_relative_eq!(target.position,
                geometry.home_position + offset + geometry.attachment_of(target.leg), epsilon = 1e-15);
        }
    }

    #[test]
    fn test_euler_and_quaternion_targets_agree() {
        let geometry = MechanismGeometry::solo_platform();
        let position = Vector3::new(0.005, -0.002, 0.01);
        let from_euler = leg_targets_raw(&geometry, &position, &[0.0, 0.0, FRAC_PI_2]).unwrap();
        let from_quat = leg_targets_raw(&geometry, &position,
                                        &[0.0, 0.0, FRAC_PI_4.sin(), FRAC_PI_4.cos()]).unwrap();
        for (a, b) in from_euler.iter().zip(from_quat.iter()) {
            assert_eq!(a.leg, b.leg);
            assert_relative_eq!(a.position, b.position, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_yaw_swaps_attachment_quadrant() {
        let geometry = MechanismGeometry::solo_platform();
        let targets = leg_targets_raw(&geometry, &Vector3::zeros(), &[0.0, 0.0, FRAC_PI_2]).unwrap();
        // 90 deg yaw maps (x, y) to (-y, x)
        let fl = geometry.attachment_of(Leg::FrontLeft);
        let expected = geometry.home_position + Vector3::new(-fl.y, fl.x, fl.z);
        assert_relative_eq!(targets[Leg::FrontLeft.index()].position, expected, epsilon = 1e-12);
    }

    #[test]
    fn test_bad_orientation_arity() {
        let geometry = MechanismGeometry::solo_platform();
        let result = leg_targets_raw(&geometry, &Vector3::zeros(), &[0.0, 0.0, 0.0, 0.0, 1.0]);
        assert!(matches!(result, Err(CompileError::InvalidOrientation { found: 5 })));
    }
}
