//! Sparse target poses of the platform, as given by the user.
//!
//! The input schema is one row per waypoint:
//! `[dx_mm, dy_mm, dz_mm, rx_deg, ry_deg, rz_deg, duration_s]`. Positions are offsets from
//! the platform home pose. Rows are converted to meters and radians on parsing, and can
//! optionally be passed through an [`AmplitudeClamp`] that limits every value to the
//! range the mechanism has been tested with.

use std::path::Path;

use nalgebra::Vector3;
use tracing::warn;

use crate::error::{CompileError, Result};
use crate::orientation::Orientation;

/// Number of fields in one waypoint input row.
pub const WAYPOINT_ROW_FIELDS: usize = 7;

/// Target pose of the platform together with the time to get there from the previous one.
#[derive(Debug, Clone, PartialEq)]
pub struct Waypoint {
    /// Offset from the platform home position, meters.
    pub position: Vector3<f64>,
    pub orientation: Orientation,
    /// Transition time from the previous waypoint, seconds. Always positive.
    pub duration: f64,
}

impl Waypoint {
    pub fn new(position: Vector3<f64>, orientation: Orientation, duration: f64) -> Result<Self> {
        if !duration.is_finite() || duration <= 0.0 {
            return Err(CompileError::malformed(None, format!(
                "duration must be positive (got {})", duration
            )));
        }
        if !position.iter().all(|p| p.is_finite()) {
            return Err(CompileError::malformed(None, "position must be finite"));
        }
        Ok(Waypoint { position, orientation, duration })
    }

    /// Builds a waypoint from loosely typed parts, checking their arity.
    pub fn from_parts(position: &[f64], orientation: &[f64], duration: f64) -> Result<Self> {
        let position = match *position {
            [x, y, z] => Vector3::new(x, y, z),
            _ => return Err(CompileError::malformed(None, format!(
                "expected 3 position values, found {}", position.len()
            ))),
        };
        Waypoint::new(position, Orientation::from_slice(orientation)?, duration)
    }

    /// Parses one input row `[dx_mm, dy_mm, dz_mm, rx_deg, ry_deg, rz_deg, duration_s]`.
    pub fn from_row(row: &[f64], clamp: Option<&AmplitudeClamp>) -> Result<Self> {
        if row.len() != WAYPOINT_ROW_FIELDS {
            return Err(CompileError::malformed(None, format!(
                "expected {} fields, found {}", WAYPOINT_ROW_FIELDS, row.len()
            )));
        }
        let position_mm: [f64; 3] = std::array::from_fn(|i| match clamp {
            Some(clamp) => clamp.millimeters(row[i]),
            None => row[i],
        });
        let angles_deg: [f64; 3] = std::array::from_fn(|i| match clamp {
            Some(clamp) => clamp.degrees(row[3 + i]),
            None => row[3 + i],
        });
        Waypoint::new(
            Vector3::from(position_mm.map(|mm| mm / 1000.0)),
            Orientation::Euler(Vector3::from(angles_deg.map(f64::to_radians))),
            row[6],
        )
    }

    /// Applies the clamp to a waypoint that is already in meters and radians. Quaternion
    /// orientations are clamped through their Euler angles.
    pub fn clamped(&self, clamp: &AmplitudeClamp) -> Waypoint {
        let position = self.position.map(|m| clamp.millimeters(m * 1000.0) / 1000.0);
        let orientation = match self.orientation.to_euler() {
            Orientation::Euler(angles) => {
                let limited = angles.map(|r| clamp.degrees(r.to_degrees()).to_radians());
                if limited.iter().zip(angles.iter()).all(|(a, b)| (a - b).abs() < 1e-12) {
                    self.orientation
                } else {
                    Orientation::Euler(limited).same_representation_as(&self.orientation)
                }
            }
            Orientation::Quaternion(_) => self.orientation,
        };
        Waypoint { position, orientation, duration: self.duration }
    }
}

/// Limits position (mm) and angle (deg) magnitudes to the physically tested amplitude.
/// Values outside are replaced by the signed threshold rather than rejected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmplitudeClamp {
    pub threshold: f64,
}

impl AmplitudeClamp {
    pub fn new(threshold: f64) -> Self {
        AmplitudeClamp { threshold: threshold.abs() }
    }

    pub fn millimeters(&self, value: f64) -> f64 {
        let clamped = value.clamp(-self.threshold, self.threshold);
        if clamped != value {
            warn!(value, threshold = self.threshold,
                "position exceeds the tested amplitude, using the threshold instead (mm)");
        }
        clamped
    }

    pub fn degrees(&self, value: f64) -> f64 {
        let clamped = value.clamp(-self.threshold, self.threshold);
        if clamped != value {
            warn!(value, threshold = self.threshold,
                "orientation exceeds the tested amplitude, using the threshold instead (deg)");
        }
        clamped
    }
}

/// Reads waypoints from a CSV file with a header line. Any row that does not parse into
/// a waypoint fails the whole read, the error carries the zero based data row index.
pub fn read_waypoints_csv<P: AsRef<Path>>(path: P, clamp: Option<&AmplitudeClamp>) -> Result<Vec<Waypoint>> {
    let path = path.as_ref();
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| CompileError::malformed(None, format!("cannot read {}: {}", path.display(), e)))?;
    parse_waypoint_records(&mut reader, clamp)
}

/// Same as [`read_waypoints_csv`] for CSV content already in memory.
pub fn parse_waypoints_csv(content: &str, clamp: Option<&AmplitudeClamp>) -> Result<Vec<Waypoint>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());
    parse_waypoint_records(&mut reader, clamp)
}

fn parse_waypoint_records<R: std::io::Read>(
    reader: &mut csv::Reader<R>,
    clamp: Option<&AmplitudeClamp>,
) -> Result<Vec<Waypoint>> {
    let mut waypoints = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record.map_err(|e| CompileError::malformed(Some(index), e.to_string()))?;
        let mut fields: Vec<&str> = record.iter().collect();
        // A trailing comma leaves one empty field at the end
        if fields.last() == Some(&"") {
            fields.pop();
        }
        let row = fields.into_iter()
            .map(|field| field.parse::<f64>().map_err(|e| CompileError::malformed(
                Some(index), format!("'{}' is not a number: {}", field, e))))
            .collect::<Result<Vec<f64>>>()?;
        waypoints.push(Waypoint::from_row(&row, clamp).map_err(|e| e.at_index(index))?);
    }
    Ok(waypoints)
}
