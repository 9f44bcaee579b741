//! Forward kinematics of a single platform leg.

use nalgebra::{Rotation3, Vector3};

use crate::kinematic_traits::{Leg, LegJoints, LegKinematics};
use crate::parameters::MechanismGeometry;

/// One leg as a serial chain: hip abduction about the base X axis, then upper and lower
/// leg rotating about the (abducted) Y axis, ending in the passive ball joint.
///
/// With effective angles `e = q * sign_corrections`, side `σ` (+1 left) and end `ρ`
/// (+1 front):
///
/// ```text
/// p = mount + Rx(σ e0) * ([0, σ h, 0] + Ry(-ρ e1) * ([0, 0, L1] + Ry(-ρ e2) * [0, 0, L2]))
/// ```
///
/// so that the same joint values bend every leg the same way relative to the centre of
/// the mechanism.
#[derive(Debug, Clone, PartialEq)]
pub struct LegChain {
    leg: Leg,
    mount: Vector3<f64>,
    hip_offset: f64,
    upper_length: f64,
    lower_length: f64,
    sign_corrections: [f64; 3],
}

impl LegChain {
    pub fn new(geometry: &MechanismGeometry, leg: Leg) -> Self {
        LegChain {
            leg,
            mount: geometry.base_mount_of(leg),
            hip_offset: geometry.hip_offset,
            upper_length: geometry.upper_length,
            lower_length: geometry.lower_length,
            sign_corrections: geometry.sign_corrections_of(leg),
        }
    }

    /// Chains of all four legs in [`Leg::ALL`] order.
    pub fn all(geometry: &MechanismGeometry) -> [LegChain; 4] {
        Leg::ALL.map(|leg| LegChain::new(geometry, leg))
    }

    pub fn leg(&self) -> Leg {
        self.leg
    }

    pub fn mount(&self) -> Vector3<f64> {
        self.mount
    }

    fn rotations(&self, qs: &LegJoints) -> (Rotation3<f64>, Rotation3<f64>, Rotation3<f64>) {
        let e = [
            qs[0] * self.sign_corrections[0],
            qs[1] * self.sign_corrections[1],
            qs[2] * self.sign_corrections[2],
        ];
        let side = self.leg.side();
        let end = self.leg.end();
        let hip = Rotation3::from_axis_angle(&Vector3::x_axis(), side * e[0]);
        let upper = hip * Rotation3::from_axis_angle(&Vector3::y_axis(), -end * e[1]);
        let lower = upper * Rotation3::from_axis_angle(&Vector3::y_axis(), -end * e[2]);
        (hip, upper, lower)
    }
}

impl LegKinematics for LegChain {
    fn forward(&self, qs: &LegJoints) -> Vector3<f64> {
        let [_, _, _, ball] = self.forward_with_joint_positions(qs);
        ball
    }

    fn forward_with_joint_positions(&self, qs: &LegJoints) -> [Vector3<f64>; 4] {
        let (hip, upper, lower) = self.rotations(qs);
        let upper_origin = self.mount + hip * Vector3::new(0.0, self.leg.side() * self.hip_offset, 0.0);
        let knee = upper_origin + upper * Vector3::new(0.0, 0.0, self.upper_length);
        let ball = knee + lower * Vector3::new(0.0, 0.0, self.lower_length);
        [self.mount, upper_origin, knee, ball]
    }
}
