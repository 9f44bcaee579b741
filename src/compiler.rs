//! The pose to joint trajectory compiler.
//!
//! Runs the stages in order: waypoint interpolation, leg attachment transform, per leg
//! inverse kinematics and tracking validation. Interpolation is completed before anything
//! else starts; the remaining stages run together frame by frame because the warm-started
//! solver and the evaluator both carry state from one frame to the next.

use tracing::{info, warn};

use crate::annotations::FrameFlags;
use crate::attachment::leg_targets;
use crate::config::CompilerConfig;
use crate::diagnostics::{CompileReport, JointJumpWarning};
use crate::error::{CompileError, Result};
use crate::ik_solver::{IkSolver, SolverState};
use crate::kinematic_traits::{JointId, Leg, LegJoints, MechanismJoints, leg_joints};
use crate::parameters::MechanismGeometry;
use crate::path_plan::interpolator::{Trajectory, interpolate};
use crate::simulator::JointSimulator;
use crate::utils::max_joint_delta;
use crate::validator::{RigidBodyEvaluator, TrackingValidator};
use crate::waypoint::Waypoint;

/// One row of the output: all actuated joint angles at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointAngleFrame {
    pub index: usize,
    /// Seconds from the start of the trajectory.
    pub time: f64,
    /// Radians, indexed by [`JointId::index`].
    pub angles: MechanismJoints,
    pub flags: FrameFlags,
}

impl JointAngleFrame {
    pub fn angle(&self, joint: JointId) -> f64 {
        self.angles[joint.index()]
    }

    pub fn leg_angles(&self, leg: Leg) -> LegJoints {
        leg_joints(&self.angles, leg)
    }
}

/// Joint angle frames sampled at a fixed frequency.
#[derive(Debug, Clone, PartialEq)]
pub struct JointTrajectory {
    pub frequency: f64,
    pub frames: Vec<JointAngleFrame>,
}

impl JointTrajectory {
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Result of a successful run: the trajectory and everything worth knowing about it.
#[derive(Debug, Clone)]
pub struct Compilation {
    pub trajectory: JointTrajectory,
    pub report: CompileReport,
}

pub struct TrajectoryCompiler {
    geometry: MechanismGeometry,
    config: CompilerConfig,
    solver: IkSolver,
}

impl TrajectoryCompiler {
    /// Checks geometry and configuration up front, nothing is computed yet.
    pub fn new(geometry: MechanismGeometry, config: CompilerConfig) -> Result<Self> {
        geometry.validate()?;
        config.validate()?;
        let solver = IkSolver::new(&geometry, config.ik.clone());
        Ok(TrajectoryCompiler { geometry, config, solver })
    }

    pub fn geometry(&self) -> &MechanismGeometry {
        &self.geometry
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    pub fn solver(&self) -> &IkSolver {
        &self.solver
    }

    /// Interpolates the waypoints, applying the configured amplitude clamp first.
    pub fn interpolate(&self, waypoints: &[Waypoint]) -> Result<Trajectory> {
        let trajectory = match self.config.amplitude_clamp() {
            Some(clamp) => {
                let clamped: Vec<Waypoint> = waypoints.iter().map(|w| w.clamped(&clamp)).collect();
                interpolate(&clamped, self.config.frequency, self.config.settle_seconds)?
            }
            None => interpolate(waypoints, self.config.frequency, self.config.settle_seconds)?,
        };
        Ok(trajectory)
    }

    /// Compiles the waypoints, validating against the built-in [`JointSimulator`] that
    /// starts at rest in the first frame's configuration.
    pub fn compile(&self, waypoints: &[Waypoint]) -> Result<Compilation> {
        let trajectory = self.interpolate(waypoints)?;
        let first_pose = &trajectory.poses()[0].pose;
        let initial = self.solver
            .solve_frame(0, &leg_targets(&self.geometry, first_pose), &mut SolverState::new(&self.geometry))
            .joints;
        let mut simulator = JointSimulator::new(self.config.simulator, self.config.frequency, &initial)?;
        self.run(&trajectory, &mut simulator, |_| true)
    }

    /// Compiles the waypoints validating against the given evaluator. `should_continue` is
    /// asked before every frame; returning `false` aborts the run with
    /// [`CompileError::Aborted`] and no trajectory. The evaluator is released on every
    /// exit path.
    pub fn compile_with<E, F>(&self, waypoints: &[Waypoint], evaluator: &mut E, should_continue: F)
                              -> Result<Compilation>
    where
        E: RigidBodyEvaluator + ?Sized,
        F: FnMut(usize) -> bool,
    {
        let trajectory = match self.interpolate(waypoints) {
            Ok(trajectory) => trajectory,
            Err(err) => {
                evaluator.release();
                return Err(err);
            }
        };
        self.run(&trajectory, evaluator, should_continue)
    }

    fn run<E, F>(&self, trajectory: &Trajectory, evaluator: &mut E, mut should_continue: F) -> Result<Compilation>
    where
        E: RigidBodyEvaluator + ?Sized,
        F: FnMut(usize) -> bool,
    {
        let mut validator = 'init: {
            let err = match TrackingValidator::new(&mut *evaluator, self.config.gains, self.config.tracking_tolerance) {
                Ok(validator) => break 'init validator,
                Err(err) => err,
            };
            evaluator.release();
            return Err(err.into());
        };
        let mut state = SolverState::new(&self.geometry);
        let mut report = CompileReport {
            frames: trajectory.len(),
            continuity_corrections: trajectory.corrections().to_vec(),
            ..Default::default()
        };
        let mut frames = Vec::with_capacity(trajectory.len());
        let mut previous: Option<MechanismJoints> = None;

        info!(frames = trajectory.len(), frequency = trajectory.frequency(), "solving joint trajectory");
        for (index, annotated) in trajectory.poses().iter().enumerate() {
            if !should_continue(index) {
                info!(frame = index, "compilation aborted");
                return Err(CompileError::Aborted { frame: index });
            }

            let targets = leg_targets(&self.geometry, &annotated.pose);
            let solution = self.solver.solve_frame(index, &targets, &mut state);
            let mut flags = annotated.flags;

            if !solution.all_converged() {
                flags |= FrameFlags::IK_BEST_EFFORT;
                report.ik_warnings.extend(solution.warnings(index));
            }

            if let Some(previous) = &previous {
                for leg in Leg::ALL {
                    let delta = max_joint_delta(&leg_joints(previous, leg), &leg_joints(&solution.joints, leg));
                    if delta > self.config.flip_threshold {
                        warn!(frame = index, leg = %leg, delta, "joint jump above flip threshold");
                        report.joint_jumps.push(JointJumpWarning { frame: index, leg, delta });
                        flags |= FrameFlags::JOINT_JUMP;
                    }
                }
            }

            if validator.track_frame(index, &solution.joints).exceeded {
                flags |= FrameFlags::TRACKING_EXCEEDED;
            }

            frames.push(JointAngleFrame {
                index,
                time: trajectory.time_of(index),
                angles: solution.joints,
                flags,
            });
            previous = Some(solution.joints);
        }

        report.validation = validator.finish();
        report.log_summary();
        Ok(Compilation {
            trajectory: JointTrajectory { frequency: trajectory.frequency(), frames },
            report,
        })
    }
}
