//! Tracking validation of a solved joint trajectory.
//!
//! Every frame the validator reads the joint states from a rigid body evaluator, computes
//! a saturated PD torque towards the solved angles (velocity target is always zero) and
//! advances the evaluator by one step. Large tracking errors are reported, never fatal.

use serde::Deserialize;
use tracing::{debug, warn};

use crate::diagnostics::{TrackingWarning, ValidationReport};
use crate::kinematic_traits::{JointId, Leg, LegJoint, MechanismJoints};
use crate::parameter_error::ParameterError;

/// Position and velocity of one joint as seen by the evaluator.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct JointState {
    pub position: f64,
    pub velocity: f64,
}

/// Anything that can simulate the joints of the mechanism under applied torques.
/// The validator drives it frame by frame and releases it when done, on every exit path.
pub trait RigidBodyEvaluator {
    /// Informs the evaluator of the joint target of the current frame. Engines with their
    /// own position control may use it, the default ignores it.
    fn set_joint_target(&mut self, _joint: JointId, _angle: f64) {}

    fn joint_state(&self, joint: JointId) -> JointState;

    /// Torque to apply to the joint during the next step.
    fn apply_torque(&mut self, joint: JointId, torque: f64);

    /// Advances the simulation by one frame period.
    fn step(&mut self);

    /// Called once when the validator is done with the evaluator.
    fn release(&mut self) {}
}

fn default_kp() -> f64 { 20.0 }
fn default_kd() -> f64 { 0.2 }
fn default_torque_saturation() -> f64 { 2.0 }

/// Conservative PD gains of the validation controller.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PdGains {
    #[serde(default = "default_kp")]
    pub kp: f64,
    #[serde(default = "default_kd")]
    pub kd: f64,
    /// Torque is clamped to `[-torque_saturation, torque_saturation]`.
    #[serde(default = "default_torque_saturation")]
    pub torque_saturation: f64,
}

impl Default for PdGains {
    fn default() -> Self {
        PdGains {
            kp: default_kp(),
            kd: default_kd(),
            torque_saturation: default_torque_saturation(),
        }
    }
}

impl PdGains {
    pub fn validate(&self) -> Result<(), ParameterError> {
        for (name, value) in [("gains.kp", self.kp), ("gains.kd", self.kd)] {
            if !value.is_finite() || value < 0.0 {
                return Err(ParameterError::InvalidValue(format!(
                    "{} must be finite and non-negative (got {})", name, value
                )));
            }
        }
        if !self.torque_saturation.is_finite() || self.torque_saturation <= 0.0 {
            return Err(ParameterError::InvalidValue(format!(
                "gains.torque_saturation must be positive (got {})", self.torque_saturation
            )));
        }
        Ok(())
    }

    /// `kp * position_error + kd * velocity_error`, clamped to the saturation.
    /// A NaN error produces no torque.
    pub fn torque(&self, position_error: f64, velocity_error: f64) -> f64 {
        let torque = self.kp * position_error + self.kd * velocity_error;
        if torque.is_nan() {
            return 0.0;
        }
        torque.clamp(-self.torque_saturation, self.torque_saturation)
    }
}

/// Tracking result of one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTracking {
    /// Joint with the largest absolute position error and that error.
    pub worst: (JointId, f64),
    pub exceeded: bool,
}

/// Drives a [`RigidBodyEvaluator`] through the solved frames. Holds the evaluator
/// exclusively for its lifetime and releases it when dropped.
pub struct TrackingValidator<'a, E: RigidBodyEvaluator + ?Sized> {
    evaluator: &'a mut E,
    gains: PdGains,
    tolerance: f64,
    report: ValidationReport,
}

impl<'a, E: RigidBodyEvaluator + ?Sized> TrackingValidator<'a, E> {
    pub fn new(evaluator: &'a mut E, gains: PdGains, tracking_tolerance: f64) -> Result<Self, ParameterError> {
        gains.validate()?;
        if !tracking_tolerance.is_finite() || tracking_tolerance <= 0.0 {
            return Err(ParameterError::InvalidValue(format!(
                "tracking_tolerance must be positive (got {})", tracking_tolerance
            )));
        }
        Ok(TrackingValidator { evaluator, gains, tolerance: tracking_tolerance, report: ValidationReport::default() })
    }

    /// Applies one frame of joint targets and advances the evaluator by one step.
    pub fn track_frame(&mut self, frame: usize, targets: &MechanismJoints) -> FrameTracking {
        let mut worst = (JointId::new(Leg::FrontLeft, LegJoint::Hip), 0.0_f64);
        for joint in JointId::all() {
            let target = targets[joint.index()];
            self.evaluator.set_joint_target(joint, target);
            let state = self.evaluator.joint_state(joint);

            let position_error = target - state.position;
            let velocity_error = 0.0 - state.velocity;
            let torque = self.gains.torque(position_error, velocity_error);
            self.evaluator.apply_torque(joint, torque);

            if torque.abs() >= self.gains.torque_saturation {
                self.report.saturated += 1;
            }
            self.report.max_torque = self.report.max_torque.max(torque.abs());
            if position_error.is_finite() {
                self.report.max_error = self.report.max_error.max(position_error.abs());
            }
            if !worst.1.is_nan() && (position_error.is_nan() || position_error.abs() > worst.1.abs()) {
                worst = (joint, position_error);
            }
        }
        self.evaluator.step();
        self.report.frames += 1;

        let (joint, error) = worst;
        let exceeded = error.is_nan() || error.abs() > self.tolerance;
        if exceeded {
            warn!(frame, joint = %joint, error, "tracking error above tolerance");
            self.report.warnings.push(TrackingWarning { frame, joint, error });
        } else {
            debug!(frame, joint = %joint, error, "frame tracked");
        }
        FrameTracking { worst: (joint, error), exceeded }
    }

    pub fn report(&self) -> &ValidationReport {
        &self.report
    }

    /// Ends the validation, releasing the evaluator.
    pub fn finish(mut self) -> ValidationReport {
        std::mem::take(&mut self.report)
    }
}

impl<E: RigidBodyEvaluator + ?Sized> Drop for TrackingValidator<'_, E> {
    fn drop(&mut self) {
        self.evaluator.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinematic_traits::JOINT_COUNT;

    /// Evaluator that never moves and remembers the last torques and calls.
    #[derive(Default)]
    struct FrozenEvaluator {
        torques: Vec<f64>,
        steps: usize,
        releases: usize,
    }

    impl RigidBodyEvaluator for FrozenEvaluator {
        fn joint_state(&self, _joint: JointId) -> JointState {
            JointState::default()
        }

        fn apply_torque(&mut self, _joint: JointId, torque: f64) {
            self.torques.push(torque);
        }

        fn step(&mut self) {
            self.steps += 1;
        }

        fn release(&mut self) {
            self.releases += 1;
        }
    }

    #[test]
    fn test_torque_saturates_on_huge_error() {
        let gains = PdGains::default();
        assert_eq!(gains.torque(1e9, 0.0), 2.0);
        assert_eq!(gains.torque(-1e9, 0.0), -2.0);
        assert_eq!(gains.torque(0.0, -1e12), -2.0);
        assert_eq!(gains.torque(f64::NAN, 0.0), 0.0);
        assert!((gains.torque(0.01, -0.5) - (0.2 - 0.1)).abs() < 1e-15);
    }

    #[test]
    fn test_validator_reports_and_releases() {
        let mut evaluator = FrozenEvaluator::default();
        {
            let mut validator = TrackingValidator::new(&mut evaluator, PdGains::default(), 0.1).unwrap();
            let mut targets = [0.0; JOINT_COUNT];
            assert!(!validator.track_frame(0, &targets).exceeded);

            let lower = JointId::new(Leg::FrontRight, LegJoint::Lower);
            targets[lower.index()] = 50.0;
            let tracking = validator.track_frame(1, &targets);
            assert!(tracking.exceeded);
            assert_eq!(tracking.worst, (lower, 50.0));

            let report = validator.finish();
            assert_eq!(report.frames, 2);
            assert_eq!(report.warnings.len(), 1);
            assert_eq!(report.warnings[0].frame, 1);
            assert_eq!(report.max_torque, 2.0);
            assert_eq!(report.saturated, 1);
            assert_eq!(report.max_error, 50.0);
        }
        assert_eq!(evaluator.steps, 2);
        assert_eq!(evaluator.releases, 1);
        assert!(evaluator.torques.iter().all(|t| t.abs() <= 2.0));
    }

    #[test]
    fn test_release_when_dropped_early() {
        let mut evaluator = FrozenEvaluator::default();
        {
            let _validator = TrackingValidator::new(&mut evaluator, PdGains::default(), 0.1).unwrap();
        }
        assert_eq!(evaluator.releases, 1);
    }

    #[test]
    fn test_invalid_gains() {
        let mut evaluator = FrozenEvaluator::default();
        let gains = PdGains { torque_saturation: 0.0, ..Default::default() };
        assert!(TrackingValidator::new(&mut evaluator, gains, 0.1).is_err());
        assert!(TrackingValidator::new(&mut evaluator, PdGains::default(), -1.0).is_err());
        // A validator that was never built does not release
        assert_eq!(evaluator.releases, 0);
    }
}
