#[cfg(test)]
mod tests {
    use std::path::Path;

    use approx::assert_relative_eq;
    use nalgebra::Vector3;
    use test_log::test;

    use crate::annotations::FrameFlags;
    use crate::attachment::leg_targets;
    use crate::compiler::TrajectoryCompiler;
    use crate::error::CompileError;
    use crate::ik_solver::SolverState;
    use crate::kinematic_traits::{Leg, LegKinematics};
    use crate::kinematics_impl::LegChain;
    use crate::parameters::MechanismGeometry;
    use crate::simulator::{JointSimulator, SimulatorConfig};
    use crate::tests::test_utils::{HOLD_AND_RISE_CSV, SHORT_ROW_CSV, no_settle, write_file};
    use crate::trajectory_store::{Environment, StoredArtifact, TrajectoryStore, read_artifact};
    use crate::waypoint::{parse_waypoints_csv, read_waypoints_csv};

    #[test]
    fn test_hold_and_rise_poses() {
        let waypoints = parse_waypoints_csv(HOLD_AND_RISE_CSV, None).unwrap();
        let compiler = TrajectoryCompiler::new(MechanismGeometry::solo_platform(), no_settle()).unwrap();
        let trajectory = compiler.interpolate(&waypoints).unwrap();

        assert_eq!(trajectory.len(), 1200);
        let poses = trajectory.poses();
        // First waypoint is the home pose itself, held for 480 samples
        for pose in &poses[..480] {
            assert_eq!(pose.pose.position, Vector3::zeros());
        }
        // Then z ramps linearly over the remaining 720 samples
        for k in 0..720 {
            let z = poses[480 + k].pose.position.z;
            assert_relative_eq!(z, 0.01 * k as f64 / 719.0, epsilon = 1e-15);
        }
        assert_eq!(poses[1199].pose.position, Vector3::new(0.0, 0.0, 0.01));
        assert!(poses[480].flags.contains(FrameFlags::SEGMENT_START));

        let geometry = compiler.geometry();
        let last = leg_targets(geometry, &poses[1199].pose);
        for target in last {
            let expected = geometry.home_position + Vector3::new(0.0, 0.0, 0.01)
                + geometry.attachment_of(target.leg);
            assert_relative_eq!(target.position, expected, epsilon = 1e-15);
        }
    }

    #[test]
    fn test_hold_and_rise_compiles_clean() {
        let waypoints = parse_waypoints_csv(HOLD_AND_RISE_CSV, None).unwrap();
        let compiler = TrajectoryCompiler::new(MechanismGeometry::solo_platform(), no_settle()).unwrap();
        let compilation = compiler.compile(&waypoints).unwrap();

        assert_eq!(compilation.trajectory.len(), 1200);
        assert!(compilation.report.is_clean(), "{:?}", compilation.report);
        assert!(compilation.report.validation.is_trackable());

        // The solved joints put every ball joint on its target
        let geometry = compiler.geometry();
        let last = &compilation.trajectory.frames[1199];
        for leg in Leg::ALL {
            let reached = LegChain::new(geometry, leg).forward(&last.leg_angles(leg));
            let expected = geometry.home_position + Vector3::new(0.0, 0.0, 0.01) + geometry.attachment_of(leg);
            assert!((reached - expected).norm() <= compiler.config().ik.tolerance,
                    "{} off by {}", leg, (reached - expected).norm());
        }
    }

    /// Reads, compiles and stores in one go, stopping at the first error.
    fn compile_to_store(input: &Path, store: &TrajectoryStore, run_id: &str) -> Result<StoredArtifact, CompileError> {
        let waypoints = read_waypoints_csv(input, None)?;
        let compiler = TrajectoryCompiler::new(MechanismGeometry::solo_platform(), no_settle())?;
        let compilation = compiler.compile(&waypoints)?;
        store.write(Environment::Simulation, &compilation.trajectory, run_id)
    }

    #[test]
    fn test_short_row_leaves_no_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_file(dir.path(), "waypoints.csv", SHORT_ROW_CSV).unwrap();
        let store = TrajectoryStore::new(dir.path().join("trajectory.csv"), dir.path().join("history"));

        match compile_to_store(&input, &store, "short") {
            Err(CompileError::MalformedWaypoint { index, .. }) => assert_eq!(index, Some(1)),
            other => panic!("expected malformed waypoint, got {:?}", other),
        }
        assert!(!store.artifact_path().exists());
        assert!(!store.history_path(Environment::Simulation, "short").exists());
        assert!(!dir.path().join("history").exists());

        // The same store accepts the well formed input
        let input = write_file(dir.path(), "waypoints.csv", HOLD_AND_RISE_CSV).unwrap();
        let stored = compile_to_store(&input, &store, "short").unwrap();
        assert!(stored.artifact.exists() && stored.history.exists());
    }

    #[test]
    fn test_external_evaluator_released_on_bad_input() {
        let dir = tempfile::tempdir().unwrap();
        // One waypoint shorter than a frame at 240 Hz
        let input = write_file(dir.path(), "waypoints.csv", "dx,dy,dz,rx,ry,rz,t\n0,0,5,0,0,0,0.001\n").unwrap();
        let waypoints = read_waypoints_csv(&input, None).unwrap();
        let compiler = TrajectoryCompiler::new(MechanismGeometry::solo_platform(), no_settle()).unwrap();
        let home = SolverState::new(compiler.geometry()).joints();
        let mut simulator = JointSimulator::new(SimulatorConfig::default(), 240.0, &home).unwrap();

        let result = compiler.compile_with(&waypoints, &mut simulator, |_| true);
        assert!(matches!(result, Err(CompileError::MalformedWaypoint { index: Some(0), .. })));
        assert!(simulator.is_released());
        assert_eq!(simulator.steps(), 0);
    }

    #[test]
    fn test_compile_store_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_file(dir.path(), "waypoints.csv", "\
dx,dy,dz,rx,ry,rz,t
0,0,0,0,0,0,0.1
5,-5,8,2,-1,3,0.4
").unwrap();
        let waypoints = read_waypoints_csv(&input, None).unwrap();
        let compiler = TrajectoryCompiler::new(MechanismGeometry::solo_platform(), no_settle()).unwrap();
        let compilation = compiler.compile(&waypoints).unwrap();
        assert!(compilation.report.is_clean(), "{:?}", compilation.report);

        let store = TrajectoryStore::new(dir.path().join("trajectory.csv"), dir.path().join("history"));
        let stored = store.write(Environment::Simulation, &compilation.trajectory, "e2e").unwrap();
        assert!(stored.history.ends_with("sim_e2e.csv"));

        let (environment, read) = read_artifact(&stored.artifact).unwrap();
        assert_eq!(environment, Environment::Simulation);
        assert_eq!(read.len(), compilation.trajectory.len());
        // Rust float formatting round trips exactly
        for (a, b) in read.frames.iter().zip(compilation.trajectory.frames.iter()) {
            assert_eq!(a.angles, b.angles);
            assert_eq!(a.time, b.time);
        }
    }
}
