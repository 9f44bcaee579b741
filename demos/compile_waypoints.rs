use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use rs_platform_trajectory::compiler::TrajectoryCompiler;
use rs_platform_trajectory::config::CompilerConfig;
use rs_platform_trajectory::kinematic_traits::Leg;
use rs_platform_trajectory::parameters::MechanismGeometry;
use rs_platform_trajectory::trajectory_store::{Environment, TrajectoryStore};
use rs_platform_trajectory::utils::{dump_joints, dump_point};
use rs_platform_trajectory::waypoint::read_waypoints_csv;

/// Usage: compile_waypoints [waypoints.csv] [config.yaml]
fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let input = args.next().unwrap_or_else(|| "demos/data/waypoints.csv".to_string());
    let config = match args.next() {
        Some(path) => CompilerConfig::from_yaml_file(&path)
            .with_context(|| format!("reading configuration {}", path))?,
        None => CompilerConfig::default(),
    };

    let geometry = MechanismGeometry::solo_platform();
    println!("Ball joint targets at the home pose:");
    for leg in Leg::ALL {
        dump_point(leg.prefix(), &(geometry.home_position + geometry.attachment_of(leg)));
    }

    let waypoints = read_waypoints_csv(&input, config.amplitude_clamp().as_ref())
        .with_context(|| format!("reading waypoints {}", input))?;
    let compiler = TrajectoryCompiler::new(geometry, config)?;
    let compilation = compiler.compile(&waypoints)?;

    let trajectory = &compilation.trajectory;
    println!("\n{} frames at {} Hz, {:.2} s", trajectory.len(), trajectory.frequency,
             trajectory.len() as f64 / trajectory.frequency);
    if let Some(last) = trajectory.frames.last() {
        println!("Joints of the last frame (degrees):");
        dump_joints(&last.angles);
    }
    let report = &compilation.report;
    println!("\nClean: {}, best effort frames: {:?}, joint jumps: {}, max tracking error: {:.4} rad",
             report.is_clean(), report.best_effort_frames(), report.joint_jumps.len(),
             report.validation.max_error);

    let run_id = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs().to_string();
    let store = TrajectoryStore::new("target/platform/trajectory.csv", "target/platform/history");
    let stored = store.write(Environment::Simulation, trajectory, &run_id)?;
    println!("Written {} (history {})", stored.artifact.display(), stored.history.display());
    Ok(())
}
