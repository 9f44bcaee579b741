//! Iterative inverse kinematics of the platform legs.
//!
//! Each leg has three actuated joints and only its ball joint position is constrained, so
//! the problem is square (3 equations, 3 unknowns). It is solved with damped least
//! squares on the numerical position Jacobian, adapting the damping the
//! Levenberg-Marquardt way: a step that reduces the error is accepted and the damping
//! relaxed, a step that does not is rejected and the damping doubled. Only error reducing
//! steps are ever accepted, so the current iterate is always the best one seen.
//!
//! The solver keeps no state of its own. Continuity between frames comes from
//! [`SolverState`], which seeds every leg with its previous solution.

use nalgebra::Vector3;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::attachment::LegTarget;
use crate::diagnostics::IkConvergenceWarning;
use crate::jacobian::Jacobian;
use crate::kinematic_traits::{
    Leg, LegJoints, LegKinematics, MechanismJoints, LEG_COUNT, JOINT_COUNT, set_leg_joints,
};
use crate::kinematics_impl::LegChain;
use crate::parameter_error::ParameterError;
use crate::parameters::MechanismGeometry;
use crate::utils::is_valid;

/// Damping never relaxes below this.
const MIN_DAMPING: f64 = 1e-9;

/// Once the damping grows past this, steps are too small to make progress.
const STALL_DAMPING: f64 = 1e4;

fn default_tolerance() -> f64 { 1e-6 }
fn default_max_iterations() -> usize { 10_000 }
fn default_damping() -> f64 { 1e-3 }
fn default_jacobian_epsilon() -> f64 { 1e-7 }
fn default_max_step() -> f64 { 0.2 }

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IkConfig {
    /// Accepted distance between the ball joint and its target, meters.
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    /// Initial damping factor.
    #[serde(default = "default_damping")]
    pub damping: f64,
    /// Joint perturbation for the finite difference Jacobian, radians.
    #[serde(default = "default_jacobian_epsilon")]
    pub jacobian_epsilon: f64,
    /// Largest joint space step per iteration (Euclidean norm), radians.
    #[serde(default = "default_max_step")]
    pub max_step: f64,
}

impl Default for IkConfig {
    fn default() -> Self {
        IkConfig {
            tolerance: default_tolerance(),
            max_iterations: default_max_iterations(),
            damping: default_damping(),
            jacobian_epsilon: default_jacobian_epsilon(),
            max_step: default_max_step(),
        }
    }
}

impl IkConfig {
    pub fn validate(&self) -> Result<(), ParameterError> {
        for (name, value) in [
            ("ik.tolerance", self.tolerance),
            ("ik.damping", self.damping),
            ("ik.jacobian_epsilon", self.jacobian_epsilon),
            ("ik.max_step", self.max_step),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ParameterError::InvalidValue(format!(
                    "{} must be positive (got {})", name, value
                )));
            }
        }
        if self.max_iterations == 0 {
            return Err(ParameterError::InvalidValue("ik.max_iterations must be at least 1".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IkOutcome {
    /// Ball joint within tolerance of the target.
    Converged,
    /// Iteration cap or stall reached, the lowest error configuration found is returned.
    BestEffort,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IkSolution {
    pub joints: LegJoints,
    /// Distance between the reached and the target ball joint position, meters.
    pub residual: f64,
    pub iterations: usize,
    pub outcome: IkOutcome,
}

impl IkSolution {
    pub fn converged(&self) -> bool {
        self.outcome == IkOutcome::Converged
    }
}

/// Previous joint solution of every leg, used as the seed of the next solve.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverState {
    home: [LegJoints; LEG_COUNT],
    previous: [LegJoints; LEG_COUNT],
    solved_frames: usize,
}

impl SolverState {
    /// Fresh state seeded with the known good home configuration.
    pub fn new(geometry: &MechanismGeometry) -> Self {
        SolverState {
            home: geometry.home_joints,
            previous: geometry.home_joints,
            solved_frames: 0,
        }
    }

    /// Forgets all previous solutions, the next frame is seeded from home again.
    pub fn reset(&mut self) {
        self.previous = self.home;
        self.solved_frames = 0;
    }

    pub fn seed(&self, leg: Leg) -> LegJoints {
        self.previous[leg.index()]
    }

    pub fn solved_frames(&self) -> usize {
        self.solved_frames
    }

    /// Previous solution of all legs as one mechanism configuration.
    pub fn joints(&self) -> MechanismJoints {
        let mut joints = [0.0; JOINT_COUNT];
        for leg in Leg::ALL {
            set_leg_joints(&mut joints, leg, &self.previous[leg.index()]);
        }
        joints
    }

    fn update(&mut self, leg: Leg, joints: &LegJoints) {
        self.previous[leg.index()] = *joints;
    }
}

/// Solution of one frame for all legs.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSolution {
    pub joints: MechanismJoints,
    pub legs: [IkSolution; LEG_COUNT],
}

impl FrameSolution {
    pub fn all_converged(&self) -> bool {
        self.legs.iter().all(IkSolution::converged)
    }

    /// Convergence warnings for the legs that ended as best effort.
    pub fn warnings(&self, frame: usize) -> Vec<IkConvergenceWarning> {
        Leg::ALL.iter()
            .zip(self.legs.iter())
            .filter(|(_, solution)| !solution.converged())
            .map(|(&leg, solution)| IkConvergenceWarning {
                frame,
                leg,
                residual: solution.residual,
                iterations: solution.iterations,
            })
            .collect()
    }
}

pub struct IkSolver {
    config: IkConfig,
    chains: [LegChain; LEG_COUNT],
}

impl IkSolver {
    pub fn new(geometry: &MechanismGeometry, config: IkConfig) -> Self {
        IkSolver { config, chains: LegChain::all(geometry) }
    }

    pub fn config(&self) -> &IkConfig {
        &self.config
    }

    pub fn chain(&self, leg: Leg) -> &LegChain {
        &self.chains[leg.index()]
    }

    /// Solves one leg from the given seed. Identical inputs always give identical output.
    pub fn solve_leg(&self, target: &LegTarget, seed: &LegJoints) -> IkSolution {
        solve_chain(self.chain(target.leg), &self.config, &target.position, seed)
    }

    /// Solves all legs of one frame, seeding from and then updating `state`.
    pub fn solve_frame(&self, frame: usize, targets: &[LegTarget; LEG_COUNT], state: &mut SolverState)
                       -> FrameSolution {
        let mut joints = [0.0; JOINT_COUNT];
        let legs = (*targets).map(|target| {
            let solution = self.solve_leg(&target, &state.seed(target.leg));
            if !solution.converged() {
                warn!(frame, leg = %target.leg, residual = solution.residual,
                    iterations = solution.iterations, "inverse kinematics did not converge, using best effort");
            } else {
                debug!(frame, leg = %target.leg, iterations = solution.iterations, "leg solved");
            }
            solution
        });
        for (target, solution) in targets.iter().zip(legs.iter()) {
            set_leg_joints(&mut joints, target.leg, &solution.joints);
            state.update(target.leg, &solution.joints);
        }
        state.solved_frames += 1;
        FrameSolution { joints, legs }
    }
}

/// Damped least squares from `seed` towards `target`.
pub fn solve_chain(
    chain: &impl LegKinematics,
    config: &IkConfig,
    target: &Vector3<f64>,
    seed: &LegJoints,
) -> IkSolution {
    let mut qs = *seed;
    let mut error_vector = target - chain.forward(&qs);
    let mut error = error_vector.norm();

    if !error.is_finite() {
        return IkSolution {
            joints: qs,
            residual: f64::INFINITY,
            iterations: 0,
            outcome: IkOutcome::BestEffort,
        };
    }

    let mut damping = config.damping;
    let mut iterations = 0;
    while iterations < config.max_iterations {
        if error <= config.tolerance {
            break;
        }
        iterations += 1;

        let jacobian = Jacobian::new(chain, &qs, config.jacobian_epsilon);
        let mut step = Vector3::from(jacobian.damped_step(&error_vector, damping));
        let step_norm = step.norm();
        if step_norm > config.max_step {
            step *= config.max_step / step_norm;
        }

        let candidate = [qs[0] + step.x, qs[1] + step.y, qs[2] + step.z];
        let candidate_error_vector = target - chain.forward(&candidate);
        let candidate_error = candidate_error_vector.norm();

        if is_valid(&candidate) && candidate_error < error {
            qs = candidate;
            error_vector = candidate_error_vector;
            error = candidate_error;
            damping = (damping * 0.5).max(MIN_DAMPING);
        } else {
            damping *= 2.0;
            if damping > STALL_DAMPING {
                break;
            }
        }
    }

    IkSolution {
        joints: qs,
        residual: error,
        iterations,
        outcome: if error <= config.tolerance { IkOutcome::Converged } else { IkOutcome::BestEffort },
    }
}
