use bitflags::bitflags;
use std::fmt;

use crate::path_plan::interpolator::Pose;

bitflags! {
    /// Flags that can be set on poses and joint frames in the output
    #[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FrameFlags: u32 {
        const NONE = 0b0000_0000;

        /// Frame belongs to the initial settle segment where the platform holds the home
        /// pose before real motion begins.
        const SETTLE =               0b0000_0001;

        /// First frame of a segment (equal to the last frame of the previous segment).
        const SEGMENT_START =        0b0000_0010;

        /// Segment start pose was supplied by the caller but did not match the previous
        /// segment end, and has been replaced by it.
        const CONTINUITY_CORRECTED = 0b0000_0100;

        /// Inverse kinematics did not reach the tolerance for at least one leg. The best
        /// configuration found is used.
        const IK_BEST_EFFORT =       0b0000_1000;

        /// Some leg joint moved more than the flip threshold since the previous frame.
        const JOINT_JUMP =           0b0001_0000;

        /// The tracking validator saw a joint error above the tolerance on this frame.
        const TRACKING_EXCEEDED =    0b0010_0000;

        /// Any of the flags that indicate numerical trouble.
        const PROBLEM = Self::IK_BEST_EFFORT.bits() | Self::JOINT_JUMP.bits()
            | Self::TRACKING_EXCEEDED.bits();
    }
}

fn flag_representation(flags: &FrameFlags) -> String {
    const FLAG_MAP: &[(FrameFlags, &str)] = &[
        // Interpolation flags
        (FrameFlags::SETTLE, "SETTLE"),
        (FrameFlags::SEGMENT_START, "SEGMENT_START"),
        (FrameFlags::CONTINUITY_CORRECTED, "CONTINUITY_CORRECTED"),
        // Solver and validator flags
        (FrameFlags::IK_BEST_EFFORT, "IK_BEST_EFFORT"),
        (FrameFlags::JOINT_JUMP, "JOINT_JUMP"),
        (FrameFlags::TRACKING_EXCEEDED, "TRACKING_EXCEEDED"),
    ];

    FLAG_MAP
        .iter()
        .filter(|(flag, _)| flags.contains(*flag))
        .map(|(_, name)| *name)
        .collect::<Vec<_>>()
        .join(" | ")
}

impl fmt::Debug for FrameFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", flag_representation(self))
    }
}

/// Interpolated platform pose with flags describing where it came from.
#[derive(Clone, Copy, PartialEq)]
pub struct AnnotatedPose {
    pub pose: Pose,
    pub flags: FrameFlags,
}

impl fmt::Debug for AnnotatedPose {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let translation = self.pose.position;
        let (roll, pitch, yaw) = self.pose.rotation.euler_angles();
        write!(
            formatter,
            "{}: [{:.4}, {:.4}, {:.4}], rpy [{:.2}, {:.2}, {:.2}]",
            flag_representation(&self.flags),
            translation.x,
            translation.y,
            translation.z,
            roll.to_degrees(),
            pitch.to_degrees(),
            yaw.to_degrees(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_representation() {
        let flags = FrameFlags::SEGMENT_START | FrameFlags::IK_BEST_EFFORT;
        assert_eq!(format!("{:?}", flags), "SEGMENT_START | IK_BEST_EFFORT");
        assert_eq!(format!("{:?}", FrameFlags::NONE), "");
    }

    #[test]
    fn test_problem_mask() {
        assert!(FrameFlags::JOINT_JUMP.intersects(FrameFlags::PROBLEM));
        assert!(!(FrameFlags::SETTLE | FrameFlags::SEGMENT_START).intersects(FrameFlags::PROBLEM));
    }
}
