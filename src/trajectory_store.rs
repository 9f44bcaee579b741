//! Persistence of compiled joint trajectories.
//!
//! An artifact is a CSV file. The first record holds the environment label, the second
//! the column header (`frame`, `time_s`, then the twelve joint names in
//! [`JointId::index`] order), then one record per frame with angles in radians.
//! Every write produces the artifact and a history copy with the same content. Both are
//! written to `.partial` files first and renamed once complete, so a reader never sees
//! a truncated artifact.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::{info, warn};

use crate::annotations::FrameFlags;
use crate::compiler::{JointAngleFrame, JointTrajectory};
use crate::error::{CompileError, Result};
use crate::kinematic_traits::{JOINT_COUNT, JOINT_NAMES};
use crate::parameter_error::ParameterError;

/// Where the trajectory is meant to be played back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Simulation,
    Physical,
}

impl Environment {
    pub fn label(&self) -> &'static str {
        match self {
            Environment::Simulation => "simulation",
            Environment::Physical => "physical",
        }
    }

    /// Short prefix of history file names.
    pub fn history_prefix(&self) -> &'static str {
        match self {
            Environment::Simulation => "sim",
            Environment::Physical => "phys",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Environment {
    type Err = ParameterError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "simulation" => Ok(Environment::Simulation),
            "physical" => Ok(Environment::Physical),
            other => Err(ParameterError::ParseError(format!("unknown environment '{}'", other))),
        }
    }
}

/// Paths of a successfully written artifact pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredArtifact {
    pub artifact: PathBuf,
    pub history: PathBuf,
}

pub struct TrajectoryStore {
    artifact_path: PathBuf,
    history_dir: PathBuf,
}

impl TrajectoryStore {
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(artifact_path: P, history_dir: Q) -> Self {
        TrajectoryStore {
            artifact_path: artifact_path.as_ref().to_path_buf(),
            history_dir: history_dir.as_ref().to_path_buf(),
        }
    }

    pub fn artifact_path(&self) -> &Path {
        &self.artifact_path
    }

    /// History copy location for the given environment and run.
    pub fn history_path(&self, environment: Environment, run_id: &str) -> PathBuf {
        self.history_dir.join(format!("{}_{}.csv", environment.history_prefix(), run_id))
    }

    /// Writes the artifact and its history copy. On failure neither file is left behind
    /// and a previous artifact at the same path is kept untouched.
    pub fn write(&self, environment: Environment, trajectory: &JointTrajectory, run_id: &str)
                 -> Result<StoredArtifact> {
        let history = self.history_path(environment, run_id);
        let partials = [partial_path(&history), partial_path(&self.artifact_path)];

        // The artifact is renamed last so a failure never replaces a previous artifact
        let written = partials.iter().try_for_each(|partial| write_partial(partial, environment, trajectory))
            .and_then(|_| rename(&partials[0], &history))
            .and_then(|_| rename(&partials[1], &self.artifact_path).inspect_err(|_| {
                if let Err(cleanup) = fs::remove_file(&history) {
                    warn!(path = %history.display(), error = %cleanup, "could not remove history copy");
                }
            }));

        if let Err(e) = written {
            for partial in &partials {
                if let Err(cleanup) = fs::remove_file(partial) {
                    if cleanup.kind() != io::ErrorKind::NotFound {
                        warn!(path = %partial.display(), error = %cleanup, "could not remove partial artifact");
                    }
                }
            }
            return Err(e);
        }

        info!(artifact = %self.artifact_path.display(), history = %history.display(),
            frames = trajectory.len(), %environment, "trajectory artifact written");
        Ok(StoredArtifact { artifact: self.artifact_path.clone(), history })
    }
}

fn rename(partial: &Path, target: &Path) -> Result<()> {
    fs::rename(partial, target).map_err(|e| CompileError::StoreWrite {
        path: target.to_path_buf(),
        source: e.into(),
    })
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".partial");
    path.with_file_name(name)
}

fn write_partial(path: &Path, environment: Environment, trajectory: &JointTrajectory) -> Result<()> {
    let store_error = |source: csv::Error| CompileError::StoreWrite { path: path.to_path_buf(), source };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| store_error(e.into()))?;
    }
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(store_error)?;

    writer.write_record([environment.label()]).map_err(store_error)?;
    writer.write_record(["frame", "time_s"].into_iter().chain(JOINT_NAMES)).map_err(store_error)?;
    for frame in &trajectory.frames {
        let mut record = Vec::with_capacity(JOINT_COUNT + 2);
        record.push(frame.index.to_string());
        record.push(format!("{}", frame.time));
        record.extend(frame.angles.iter().map(|q| format!("{}", q)));
        writer.write_record(&record).map_err(store_error)?;
    }
    writer.flush().map_err(|e| store_error(e.into()))?;
    Ok(())
}

/// Reads an artifact written by [`TrajectoryStore::write`]. Frame flags are not stored
/// and come back empty; the frequency is recovered from the frame times.
pub fn read_artifact<P: AsRef<Path>>(path: P) -> std::result::Result<(Environment, JointTrajectory), ParameterError> {
    let path = path.as_ref();
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|e| ParameterError::ParseError(format!("{}: {}", path.display(), e)))?;
    let mut records = reader.records();

    let mut next_record = |what: &str| -> std::result::Result<csv::StringRecord, ParameterError> {
        records.next()
            .ok_or_else(|| ParameterError::ParseError(format!("{}: missing {}", path.display(), what)))?
            .map_err(|e| ParameterError::ParseError(format!("{}: {}", path.display(), e)))
    };

    let environment: Environment = next_record("environment record")?
        .get(0)
        .unwrap_or_default()
        .parse()?;

    let header = next_record("header")?;
    let expected: Vec<&str> = ["frame", "time_s"].into_iter().chain(JOINT_NAMES).collect();
    if header.iter().collect::<Vec<_>>() != expected {
        return Err(ParameterError::ParseError(format!(
            "{}: unexpected header {:?}", path.display(), header
        )));
    }

    let mut frames = Vec::new();
    for record in records {
        let record = record.map_err(|e| ParameterError::ParseError(format!("{}: {}", path.display(), e)))?;
        if record.len() != JOINT_COUNT + 2 {
            return Err(ParameterError::InvalidLength {
                field: format!("frame {}", frames.len()),
                expected: JOINT_COUNT + 2,
                found: record.len(),
            });
        }
        let parse = |i: usize| -> std::result::Result<f64, ParameterError> {
            record[i].parse::<f64>()
                .map_err(|e| ParameterError::ParseError(format!("'{}': {}", &record[i], e)))
        };
        let index = record[0].parse::<usize>()
            .map_err(|e| ParameterError::ParseError(format!("'{}': {}", &record[0], e)))?;
        let mut angles = [0.0; JOINT_COUNT];
        for (i, angle) in angles.iter_mut().enumerate() {
            *angle = parse(i + 2)?;
        }
        frames.push(JointAngleFrame { index, time: parse(1)?, angles, flags: FrameFlags::NONE });
    }

    let frequency = match frames.as_slice() {
        [first, second, ..] if second.time > first.time => 1.0 / (second.time - first.time),
        _ => 0.0,
    };
    Ok((environment, JointTrajectory { frequency, frames }))
}
