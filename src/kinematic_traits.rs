//! Joint enumeration and the leg kinematics trait.
//!
//! Legs and joints are fixed at compile time: the mechanism always has four legs with
//! three actuated revolute joints each (hip abduction, upper leg, lower leg) and one
//! passive ball joint that attaches the leg to the platform. All per-joint data in this
//! crate is stored in arrays indexed by [`JointId::index`].

use std::fmt;
use nalgebra::Vector3;

/// Joint values of a single leg (hip, upper, lower) in radians.
pub type LegJoints = [f64; 3];

/// Number of legs of the mechanism.
pub const LEG_COUNT: usize = 4;

/// Actuated joints in each leg. The terminal ball joint is passive and not counted.
pub const ACTUATED_JOINTS_PER_LEG: usize = 3;

/// Passive (unconstrained orientation) joints at the end of each leg.
pub const PASSIVE_JOINTS_PER_LEG: usize = 1;

/// Total actuated joints, the width of every output frame.
pub const JOINT_COUNT: usize = LEG_COUNT * ACTUATED_JOINTS_PER_LEG;

/// All joint values of the mechanism, indexed by [`JointId::index`].
pub type MechanismJoints = [f64; JOINT_COUNT];

/// Leg configuration with all joints at zero.
pub const LEG_JOINTS_AT_ZERO: LegJoints = [0.0; 3];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Leg {
    FrontLeft,
    FrontRight,
    RearLeft,
    RearRight,
}

impl Leg {
    /// Legs in output column order.
    pub const ALL: [Leg; LEG_COUNT] = [Leg::FrontLeft, Leg::FrontRight, Leg::RearLeft, Leg::RearRight];

    pub const fn index(self) -> usize {
        match self {
            Leg::FrontLeft => 0,
            Leg::FrontRight => 1,
            Leg::RearLeft => 2,
            Leg::RearRight => 3,
        }
    }

    /// Short prefix used in artifact column names.
    pub const fn prefix(self) -> &'static str {
        match self {
            Leg::FrontLeft => "fl",
            Leg::FrontRight => "fr",
            Leg::RearLeft => "bl",
            Leg::RearRight => "br",
        }
    }

    /// +1 for legs on the left side, -1 for the right side.
    pub const fn side(self) -> f64 {
        match self {
            Leg::FrontLeft | Leg::RearLeft => 1.0,
            Leg::FrontRight | Leg::RearRight => -1.0,
        }
    }

    /// +1 for front legs, -1 for rear legs.
    pub const fn end(self) -> f64 {
        match self {
            Leg::FrontLeft | Leg::FrontRight => 1.0,
            Leg::RearLeft | Leg::RearRight => -1.0,
        }
    }

    /// Sign pattern that maps the front-left geometry onto this leg. Front-right mirrors Y,
    /// rear-left mirrors X, rear-right mirrors both.
    pub fn mirror(self) -> Vector3<f64> {
        Vector3::new(self.end(), self.side(), 1.0)
    }
}

impl fmt::Display for Leg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Actuated joint position within a leg, from the base outwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LegJoint {
    /// Hip abduction/adduction, rotates about the base X axis.
    Hip,
    /// Upper leg (hip flexion), rotates about the leg Y axis.
    Upper,
    /// Lower leg (knee), rotates about the leg Y axis.
    Lower,
}

impl LegJoint {
    pub const ALL: [LegJoint; ACTUATED_JOINTS_PER_LEG] = [LegJoint::Hip, LegJoint::Upper, LegJoint::Lower];

    pub const fn index(self) -> usize {
        match self {
            LegJoint::Hip => 0,
            LegJoint::Upper => 1,
            LegJoint::Lower => 2,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            LegJoint::Hip => "hip",
            LegJoint::Upper => "upper",
            LegJoint::Lower => "lower",
        }
    }
}

/// Identifies one actuated joint of the mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JointId {
    pub leg: Leg,
    pub joint: LegJoint,
}

/// Column names of the output artifact, in [`JointId::index`] order.
pub const JOINT_NAMES: [&str; JOINT_COUNT] = [
    "fl_hip", "fl_upper", "fl_lower",
    "fr_hip", "fr_upper", "fr_lower",
    "bl_hip", "bl_upper", "bl_lower",
    "br_hip", "br_upper", "br_lower",
];

impl JointId {
    pub const fn new(leg: Leg, joint: LegJoint) -> Self {
        JointId { leg, joint }
    }

    /// Index into [`MechanismJoints`] and the artifact column order.
    pub const fn index(self) -> usize {
        self.leg.index() * ACTUATED_JOINTS_PER_LEG + self.joint.index()
    }

    pub fn from_index(index: usize) -> Option<Self> {
        if index >= JOINT_COUNT {
            return None;
        }
        Some(JointId {
            leg: Leg::ALL[index / ACTUATED_JOINTS_PER_LEG],
            joint: LegJoint::ALL[index % ACTUATED_JOINTS_PER_LEG],
        })
    }

    pub const fn name(self) -> &'static str {
        JOINT_NAMES[self.index()]
    }

    /// Iterates over all actuated joints in column order.
    pub fn all() -> impl Iterator<Item = JointId> {
        Leg::ALL.into_iter()
            .flat_map(|leg| LegJoint::ALL.into_iter().map(move |joint| JointId { leg, joint }))
    }
}

impl fmt::Display for JointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Copies the joints of one leg out of the full mechanism array.
pub fn leg_joints(joints: &MechanismJoints, leg: Leg) -> LegJoints {
    let start = leg.index() * ACTUATED_JOINTS_PER_LEG;
    [joints[start], joints[start + 1], joints[start + 2]]
}

/// Writes the joints of one leg into the full mechanism array.
pub fn set_leg_joints(joints: &mut MechanismJoints, leg: Leg, values: &LegJoints) {
    let start = leg.index() * ACTUATED_JOINTS_PER_LEG;
    joints[start..start + ACTUATED_JOINTS_PER_LEG].copy_from_slice(values);
}

/// Forward kinematics of one serial leg chain. Only the position of the end effector
/// (the ball joint centre) is defined, its orientation is free.
pub trait LegKinematics {
    /// Ball joint position in the mechanism base frame.
    fn forward(&self, qs: &LegJoints) -> Vector3<f64>;

    /// Positions of the hip, upper leg origin, knee and ball joint, base frame.
    fn forward_with_joint_positions(&self, qs: &LegJoints) -> [Vector3<f64>; ACTUATED_JOINTS_PER_LEG + PASSIVE_JOINTS_PER_LEG];
}
