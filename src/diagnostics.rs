//! Non-fatal findings collected while compiling a trajectory.
//!
//! None of these stop the run. They are aggregated into a [`CompileReport`] that is
//! returned alongside the trajectory so the caller can decide whether the result is
//! acceptable.

use tracing::{info, warn};

use crate::kinematic_traits::{JointId, Leg};
use crate::path_plan::interpolator::Pose;

/// A caller supplied segment start that did not match the previous segment end.
#[derive(Debug, Clone, PartialEq)]
pub struct ContinuityCorrection {
    /// Index of the corrected segment in the trajectory.
    pub segment: usize,
    /// Frame where the segment starts.
    pub frame: usize,
    /// Start pose given by the caller, discarded.
    pub supplied: Pose,
    /// Previous segment end, used instead.
    pub used: Pose,
}

/// Inverse kinematics did not reach the tolerance for one leg on one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct IkConvergenceWarning {
    pub frame: usize,
    pub leg: Leg,
    /// Remaining distance between the ball joint and its target, meters.
    pub residual: f64,
    pub iterations: usize,
}

/// A leg joint moved further than the flip threshold between two consecutive frames.
#[derive(Debug, Clone, PartialEq)]
pub struct JointJumpWarning {
    pub frame: usize,
    pub leg: Leg,
    /// Largest absolute joint change of the leg, radians.
    pub delta: f64,
}

/// The tracking validator saw a joint far from its target.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackingWarning {
    pub frame: usize,
    pub joint: JointId,
    /// Target minus simulated position, radians.
    pub error: f64,
}

/// Outcome of the tracking validation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    /// Number of frames driven through the evaluator.
    pub frames: usize,
    /// Worst joint (per frame) whose error exceeded the tracking tolerance.
    pub warnings: Vec<TrackingWarning>,
    /// Largest absolute position error seen over all joints and frames.
    pub max_error: f64,
    /// Largest absolute torque applied, never above the saturation.
    pub max_torque: f64,
    /// Number of joint torque commands that hit the saturation.
    pub saturated: usize,
}

impl ValidationReport {
    pub fn is_trackable(&self) -> bool {
        self.warnings.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompileReport {
    pub frames: usize,
    pub continuity_corrections: Vec<ContinuityCorrection>,
    pub ik_warnings: Vec<IkConvergenceWarning>,
    pub joint_jumps: Vec<JointJumpWarning>,
    pub validation: ValidationReport,
}

impl CompileReport {
    /// True if nothing worth a second look happened.
    pub fn is_clean(&self) -> bool {
        self.continuity_corrections.is_empty()
            && self.ik_warnings.is_empty()
            && self.joint_jumps.is_empty()
            && self.validation.is_trackable()
    }

    /// Frames with at least one best effort leg solution, deduplicated, ascending.
    pub fn best_effort_frames(&self) -> Vec<usize> {
        let mut frames: Vec<usize> = self.ik_warnings.iter().map(|w| w.frame).collect();
        frames.dedup();
        frames
    }

    pub fn log_summary(&self) {
        info!(
            frames = self.frames,
            continuity_corrections = self.continuity_corrections.len(),
            best_effort_frames = self.best_effort_frames().len(),
            joint_jumps = self.joint_jumps.len(),
            max_tracking_error = self.validation.max_error,
            max_torque = self.validation.max_torque,
            "trajectory compiled"
        );
        if !self.validation.is_trackable() {
            warn!(
                frames = self.validation.warnings.len(),
                "tracking error exceeded the tolerance"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinematic_traits::LegJoint;

    #[test]
    fn test_clean_report() {
        let mut report = CompileReport { frames: 10, ..Default::default() };
        assert!(report.is_clean());
        report.validation.warnings.push(TrackingWarning {
            frame: 3,
            joint: JointId::new(Leg::RearLeft, LegJoint::Upper),
            error: 0.4,
        });
        assert!(!report.is_clean());
    }

    #[test]
    fn test_best_effort_frames_dedup() {
        let warning = |frame, leg| IkConvergenceWarning { frame, leg, residual: 0.01, iterations: 10 };
        let report = CompileReport {
            ik_warnings: vec![
                warning(4, Leg::FrontLeft),
                warning(4, Leg::RearRight),
                warning(9, Leg::FrontLeft),
            ],
            ..Default::default()
        };
        assert_eq!(report.best_effort_frames(), vec![4, 9]);
    }
}
