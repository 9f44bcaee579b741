//! Built-in joint space rigid body evaluator.
//!
//! Every actuated joint is modelled as an independent rotor with inertia and viscous
//! damping, integrated with semi-implicit Euler at the trajectory frame period:
//!
//! ```text
//! a = (torque - damping * v) / inertia
//! v += a * dt
//! q += v * dt
//! ```
//!
//! Applied torques hold for one step only.

use serde::Deserialize;
use tracing::debug;

use crate::kinematic_traits::{JointId, MechanismJoints, JOINT_COUNT};
use crate::parameter_error::ParameterError;
use crate::validator::{JointState, RigidBodyEvaluator};

fn default_inertia() -> f64 { 0.01 }
fn default_damping() -> f64 { 0.01 }

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulatorConfig {
    /// Rotational inertia seen by every joint, kg m^2.
    #[serde(default = "default_inertia")]
    pub inertia: f64,
    /// Viscous damping of every joint, N m s / rad.
    #[serde(default = "default_damping")]
    pub damping: f64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        SimulatorConfig { inertia: default_inertia(), damping: default_damping() }
    }
}

impl SimulatorConfig {
    pub fn validate(&self) -> Result<(), ParameterError> {
        if !self.inertia.is_finite() || self.inertia <= 0.0 {
            return Err(ParameterError::InvalidValue(format!(
                "simulator.inertia must be positive (got {})", self.inertia
            )));
        }
        if !self.damping.is_finite() || self.damping < 0.0 {
            return Err(ParameterError::InvalidValue(format!(
                "simulator.damping must be finite and non-negative (got {})", self.damping
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct JointSimulator {
    config: SimulatorConfig,
    dt: f64,
    positions: MechanismJoints,
    velocities: MechanismJoints,
    torques: MechanismJoints,
    targets: MechanismJoints,
    steps: usize,
    released: bool,
}

impl JointSimulator {
    /// Simulator at rest in the given configuration, stepping at `frequency`.
    pub fn new(config: SimulatorConfig, frequency: f64, initial: &MechanismJoints) -> Result<Self, ParameterError> {
        config.validate()?;
        if !frequency.is_finite() || frequency <= 0.0 {
            return Err(ParameterError::InvalidValue(format!(
                "frequency must be positive (got {})", frequency
            )));
        }
        Ok(JointSimulator {
            config,
            dt: 1.0 / frequency,
            positions: *initial,
            velocities: [0.0; JOINT_COUNT],
            torques: [0.0; JOINT_COUNT],
            targets: *initial,
            steps: 0,
            released: false,
        })
    }

    pub fn positions(&self) -> &MechanismJoints {
        &self.positions
    }

    pub fn velocities(&self) -> &MechanismJoints {
        &self.velocities
    }

    /// Last targets received through [`RigidBodyEvaluator::set_joint_target`].
    pub fn targets(&self) -> &MechanismJoints {
        &self.targets
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl RigidBodyEvaluator for JointSimulator {
    fn set_joint_target(&mut self, joint: JointId, angle: f64) {
        self.targets[joint.index()] = angle;
    }

    fn joint_state(&self, joint: JointId) -> JointState {
        JointState {
            position: self.positions[joint.index()],
            velocity: self.velocities[joint.index()],
        }
    }

    fn apply_torque(&mut self, joint: JointId, torque: f64) {
        self.torques[joint.index()] = torque;
    }

    fn step(&mut self) {
        let SimulatorConfig { inertia, damping } = self.config;
        for i in 0..JOINT_COUNT {
            let acceleration = (self.torques[i] - damping * self.velocities[i]) / inertia;
            self.velocities[i] += acceleration * self.dt;
            self.positions[i] += self.velocities[i] * self.dt;
        }
        self.torques = [0.0; JOINT_COUNT];
        self.steps += 1;
    }

    fn release(&mut self) {
        debug!(steps = self.steps, "joint simulator released");
        self.released = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::{PdGains, TrackingValidator};
    use approx::assert_relative_eq;

    #[test]
    fn test_free_rotor_integration() {
        let config = SimulatorConfig { inertia: 2.0, damping: 0.0 };
        let mut simulator = JointSimulator::new(config, 10.0, &[0.0; JOINT_COUNT]).unwrap();
        let joint = JointId::from_index(4).unwrap();
        simulator.apply_torque(joint, 1.0);
        simulator.step();
        // v = 1 / 2 * 0.1, q = v * 0.1
        assert_relative_eq!(simulator.joint_state(joint).velocity, 0.05, epsilon = 1e-15);
        assert_relative_eq!(simulator.joint_state(joint).position, 0.005, epsilon = 1e-15);
        // Torque lasts one step, velocity is kept
        simulator.step();
        assert_relative_eq!(simulator.joint_state(joint).position, 0.01, epsilon = 1e-15);
        assert_eq!(simulator.joint_state(JointId::from_index(0).unwrap()), JointState::default());
    }

    #[test]
    fn test_pd_settles_on_target() {
        let mut simulator = JointSimulator::new(SimulatorConfig::default(), 240.0, &[0.0; JOINT_COUNT]).unwrap();
        let targets = [0.05; JOINT_COUNT];
        let report = {
            let mut validator = TrackingValidator::new(&mut simulator, PdGains::default(), 0.1).unwrap();
            for frame in 0..480 {
                validator.track_frame(frame, &targets);
            }
            validator.finish()
        };
        assert!(report.is_trackable());
        assert!(simulator.is_released());
        assert_eq!(simulator.steps(), 480);
        assert_eq!(simulator.targets(), &targets);
        for q in simulator.positions() {
            assert!((q - 0.05).abs() < 1e-3, "{}", q);
        }
        assert!(simulator.velocities().iter().all(|v| v.abs() < 1e-2));
    }

    #[test]
    fn test_invalid_config() {
        let config = SimulatorConfig { inertia: 0.0, ..Default::default() };
        assert!(JointSimulator::new(config, 240.0, &[0.0; JOINT_COUNT]).is_err());
        assert!(JointSimulator::new(SimulatorConfig::default(), 0.0, &[0.0; JOINT_COUNT]).is_err());
    }
}
