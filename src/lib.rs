//! Rust compiler of sparse platform poses into validated joint trajectories for a four-legged
//! 6-DOF motion platform.
//!
//! The platform is carried by four quadruped legs standing on a fixed base. Every leg has an
//! actuated hip abduction, upper and lower joint and is connected to the platform through a
//! passive ball joint. Given a short list of target platform poses, each with the time the
//! platform should take to reach it, the crate produces the dense sequence of twelve joint
//! angles that realizes the motion, and checks in a rigid body evaluator that a conservative
//! PD controller can actually track those angles before they are trusted.
//!
//! # Features
//!
//! - Waypoint input as position offsets (mm) and Euler angles (deg) with transition durations,
//!   read from CSV with an optional amplitude clamp. Quaternion orientation is supported too.
//! - Fixed rate interpolation (240 Hz by default) with an optional settle phase at the home
//!   pose. Consecutive segments always join without a jump; inconsistent waypoint chains
//!   are corrected and reported.
//! - Per leg damped least squares inverse kinematics on a finite difference Jacobian,
//!   warm-started from the previous frame so that the legs never flip between kinematically
//!   equivalent configurations. The very first frame is seeded with a known good home
//!   configuration (knees bent inwards).
//! - Tracking validation against any [`validator::RigidBodyEvaluator`]. A simple joint space
//!   simulator is built in.
//! - Everything non-fatal (unreachable targets, joint jumps, tracking excursions, corrected
//!   continuity) is collected in a [`diagnostics::CompileReport`] and flagged per frame.
//! - Trajectories are written atomically as CSV artifacts with a history copy.
//! - Mechanism geometry and compiler settings can be loaded from YAML.
//!
//! # Geometry
//!
//! All geometry is given for the front-left leg and mirrored onto the others: front-right
//! mirrors Y, rear-left mirrors X and rear-right mirrors both. See
//! [`parameters::MechanismGeometry`] and the built-in
//! [`parameters::MechanismGeometry::solo_platform`].
//!
//! ## Examples
//!
//! - **compile_waypoints.rs**: Reads waypoints from CSV, compiles them with the built-in
//!   simulator and writes the artifact with its history copy.

pub mod parameters;
pub mod parameters_platforms;

#[cfg(feature = "allow_filesystem")]
pub mod parameters_from_file;
pub mod parameter_error;

#[path = "utils/utils.rs"]
pub mod utils;
pub mod kinematic_traits;
pub mod kinematics_impl;

pub mod jacobian;

pub mod orientation;
pub mod waypoint;
pub mod annotations;

pub mod path_plan {
    pub mod interpolator;
}

pub mod attachment;
pub mod ik_solver;

pub mod validator;
pub mod simulator;

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod compiler;
pub mod trajectory_store;

#[cfg(test)]
#[cfg(feature = "allow_filesystem")]
mod tests;
